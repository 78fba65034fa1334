// src/error.rs

use reqwest::StatusCode;
use thiserror::Error;

/// The primary error type for the `supabase-bff` library.
#[derive(Debug, Error)]
pub enum BffError {
    /// The `Authorization` header is absent or does not carry a bearer token.
    #[error("Missing bearer token")]
    MissingCredential,

    /// The token's JOSE header could not be decoded.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token names a key id the key directory does not publish.
    #[error("Invalid kid: {0}")]
    UnknownKeyId(String),

    /// Every key-directory candidate failed.
    #[error("Failed to fetch JWKS: {0}")]
    KeyFetch(String),

    /// Bad signature, audience, issuer or time claims.
    #[error("Invalid token: {0}")]
    SignatureOrClaimInvalid(String),

    /// The profile row disappeared between the update and the re-select.
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    /// The persistence service answered with a non-success status.
    #[error("Profile store error: {0}")]
    Store(String),

    /// An error occurred during an HTTP request.
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required configuration field is missing.
    #[error("A required configuration field is missing: {0}")]
    MissingConfiguration(String),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl BffError {
    /// Whether this error means the caller is not authenticated.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            BffError::MissingCredential
                | BffError::MalformedToken(_)
                | BffError::UnknownKeyId(_)
                | BffError::KeyFetch(_)
                | BffError::SignatureOrClaimInvalid(_)
        )
    }

    /// The HTTP status a router should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_auth_failure() => StatusCode::UNAUTHORIZED,
            BffError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

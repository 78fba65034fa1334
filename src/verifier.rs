// src/verifier.rs

pub mod cache;
pub mod directory;
pub mod model;

use crate::config::{KeySourceConfig, Settings};
use crate::error::BffError;
use cache::KeyCache;
use directory::KeyDirectoryClient;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use model::UnverifiedHeader;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, instrument};

/// Algorithm name picked for a shared-secret token whose header omits `alg`.
///
/// This never lets such a token through: decoding requires the JOSE header
/// to name its algorithm, so the token still fails as
/// [`BffError::SignatureOrClaimInvalid`].
pub const DEFAULT_SYMMETRIC_ALGORITHM: &str = "HS256";
/// Algorithm assumed for directory keys that do not declare `alg`.
pub const DEFAULT_ASYMMETRIC_ALGORITHM: &str = "RS256";

/// The caller identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthedIdentity {
    /// The `sub` claim. Never empty.
    pub sub: String,
    pub email: Option<String>,
    /// `app_metadata.provider`, e.g. `github`.
    pub provider: Option<String>,
    /// Every claim in the token, kept for profile derivation.
    pub raw: Map<String, Value>,
}

impl AuthedIdentity {
    /// Looks up a string value under `user_metadata`. Empty strings count as absent.
    pub fn user_metadata(&self, field: &str) -> Option<&str> {
        self.raw
            .get("user_metadata")
            .and_then(|meta| meta.get(field))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    fn from_claims(raw: Map<String, Value>) -> Result<Self, BffError> {
        let sub = raw
            .get("sub")
            .and_then(Value::as_str)
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| BffError::SignatureOrClaimInvalid("token has no subject".to_string()))?
            .to_string();
        let email = raw.get("email").and_then(Value::as_str).map(str::to_string);
        let provider = raw
            .get("app_metadata")
            .and_then(|meta| meta.get("provider"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(Self { sub, email, provider, raw })
    }
}

/// How token signatures are checked. Chosen once from configuration.
#[derive(Clone)]
pub enum VerificationMode {
    /// Tokens are HMAC-signed with a secret shared with the provider.
    Symmetric { secret: Vec<u8> },
    /// Tokens are signed with a key published in the provider's key directory.
    Asymmetric { cache: KeyCache },
}

/// Verifies bearer tokens and turns them into [`AuthedIdentity`] values.
///
/// Create it once at startup and share it across requests; cloning is cheap
/// and clones share the same key cache.
#[derive(Clone)]
pub struct TokenVerifier {
    mode: VerificationMode,
    audience: String,
    issuer: String,
    leeway: u64,
}

impl TokenVerifier {
    /// Creates a verifier, building a key cache when no shared secret is configured.
    pub fn new(settings: &Settings) -> Result<Self, BffError> {
        let mode = match &settings.key_source {
            KeySourceConfig::SharedSecret(secret) => VerificationMode::Symmetric {
                secret: secret.clone(),
            },
            KeySourceConfig::Jwks { .. } => VerificationMode::Asymmetric {
                cache: KeyCache::new(KeyDirectoryClient::new(settings)?),
            },
        };
        Ok(Self::with_mode(settings, mode))
    }

    /// Creates a verifier with an explicit mode, e.g. an existing shared cache.
    pub fn with_mode(settings: &Settings, mode: VerificationMode) -> Self {
        Self {
            mode,
            audience: settings.audience.clone(),
            issuer: settings.issuer.clone(),
            leeway: settings.leeway.as_secs(),
        }
    }

    pub fn mode(&self) -> &VerificationMode {
        &self.mode
    }

    /// Verifies the value of an `Authorization` header.
    pub async fn verify(&self, authorization: Option<&str>) -> Result<AuthedIdentity, BffError> {
        let token = bearer_token(authorization)?;
        self.verify_token(token).await
    }

    /// Verifies a raw compact JWT.
    ///
    /// The signature, `aud` and `iss` are always checked; `exp` and `nbf`
    /// are checked when present. Any failure there is reported as
    /// [`BffError::SignatureOrClaimInvalid`].
    #[instrument(skip(self, token), err)]
    pub async fn verify_token(&self, token: &str) -> Result<AuthedIdentity, BffError> {
        let header = UnverifiedHeader::parse(token)?;

        let (algorithm, decoding_key) = match &self.mode {
            VerificationMode::Symmetric { secret } => {
                let alg = header.alg.as_deref().unwrap_or(DEFAULT_SYMMETRIC_ALGORITHM);
                (parse_algorithm(alg)?, DecodingKey::from_secret(secret))
            }
            VerificationMode::Asymmetric { cache } => {
                let kid = header.kid.as_deref().unwrap_or_default();
                let record = cache.resolve(kid).await?;
                let alg = record.algorithm.as_deref().unwrap_or(DEFAULT_ASYMMETRIC_ALGORITHM);
                let key = DecodingKey::from_jwk(&record.jwk).map_err(|e| {
                    BffError::SignatureOrClaimInvalid(format!("key '{kid}' is unusable: {e}"))
                })?;
                (parse_algorithm(alg)?, key)
            }
        };
        debug!("Verifying token with {:?}", algorithm);

        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["aud", "iss", "sub"]);

        let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation)
            .map_err(|e| BffError::SignatureOrClaimInvalid(describe(e.kind())))?;

        AuthedIdentity::from_claims(token_data.claims)
    }
}

/// Splits the token off an `Authorization: Bearer <token>` header value.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, BffError> {
    let value = authorization.ok_or(BffError::MissingCredential)?;
    let (scheme, token) = value.split_once(' ').ok_or(BffError::MissingCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(BffError::MissingCredential);
    }
    Ok(token.trim())
}

fn parse_algorithm(name: &str) -> Result<Algorithm, BffError> {
    Algorithm::from_str(name)
        .map_err(|_| BffError::SignatureOrClaimInvalid(format!("unsupported algorithm '{name}'")))
}

fn describe(kind: &ErrorKind) -> String {
    match kind {
        ErrorKind::InvalidSignature => "signature verification failed".to_string(),
        ErrorKind::InvalidAudience => "audience mismatch".to_string(),
        ErrorKind::InvalidIssuer => "issuer mismatch".to_string(),
        ErrorKind::ExpiredSignature => "token expired".to_string(),
        ErrorKind::ImmatureSignature => "token not yet valid".to_string(),
        ErrorKind::InvalidAlgorithm => "algorithm does not match the key".to_string(),
        ErrorKind::MissingRequiredClaim(claim) => format!("missing '{claim}' claim"),
        other => format!("{other:?}"),
    }
}

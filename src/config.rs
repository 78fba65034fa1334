// src/config.rs

use crate::error::BffError;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Audience Supabase stamps on end-user access tokens.
pub const DEFAULT_AUDIENCE: &str = "authenticated";

/// Per-request timeout for key-directory and persistence calls.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Defines the source for JWT validation keys.
#[derive(Clone)]
pub enum KeySourceConfig {
    /// Keys are fetched from the provider's key directory.
    Jwks {
        /// The first candidate tried when the key set is fetched.
        jwks_uri: Url,
    },
    /// A shared secret is used for symmetric key algorithms (e.g., HS256).
    SharedSecret(Vec<u8>),
}

/// Process-wide settings for the BFF.
///
/// Built once at startup through [`ConfigBuilder`] or [`Settings::from_env`]
/// and never mutated afterwards. `Debug` output redacts every credential.
#[derive(Clone)]
pub struct Settings {
    /// Project base URL, without a trailing slash.
    pub base_url: String,
    /// Public (anonymous) API key. Only used as a credential when fetching keys.
    pub anon_key: String,
    /// Service-role key used against the REST persistence service.
    pub service_role_key: String,
    /// Expected `aud` claim.
    pub audience: String,
    /// Expected `iss` claim.
    pub issuer: String,
    /// Where verification keys come from.
    pub key_source: KeySourceConfig,
    /// Timeout applied to every outbound HTTP call.
    pub fetch_timeout: Duration,
    /// Clock skew tolerance for `exp` and `nbf`.
    pub leeway: Duration,
}

// Secrets are never printed, only whether one is set.
fn redacted(secret: &[u8]) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl fmt::Debug for KeySourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwks { jwks_uri } => f
                .debug_struct("Jwks")
                .field("jwks_uri", &jwks_uri.as_str())
                .finish(),
            Self::SharedSecret(secret) => f
                .debug_tuple("SharedSecret")
                .field(&redacted(secret))
                .finish(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("base_url", &self.base_url)
            .field("anon_key", &redacted(self.anon_key.as_bytes()))
            .field("service_role_key", &redacted(self.service_role_key.as_bytes()))
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("key_source", &self.key_source)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("leeway", &self.leeway)
            .finish()
    }
}

impl Settings {
    /// Loads settings from the `SUPABASE_*` environment variables.
    ///
    /// `SUPABASE_URL` is required. Empty variables are treated as unset.
    pub fn from_env() -> Result<Self, BffError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let base_url = var("SUPABASE_URL")
            .ok_or_else(|| BffError::MissingConfiguration("SUPABASE_URL".to_string()))?;
        let mut builder = ConfigBuilder::new().base_url(&base_url)?;

        if let Some(key) = var("SUPABASE_ANON_KEY") {
            builder = builder.anon_key(key);
        }
        if let Some(key) = var("SUPABASE_SERVICE_ROLE_KEY") {
            builder = builder.service_role_key(key);
        }
        if let Some(aud) = var("SUPABASE_JWT_AUD") {
            builder = builder.audience(aud);
        }
        if let Some(iss) = var("SUPABASE_JWT_ISS") {
            builder = builder.issuer(iss);
        }
        if let Some(url) = var("SUPABASE_JWKS_URL") {
            builder = builder.jwks_uri(&url)?;
        }
        if let Some(secret) = var("SUPABASE_JWT_SECRET") {
            builder = builder.shared_secret(secret.into_bytes());
        }
        builder.build()
    }

    /// The configured key-directory URL, whether or not a shared secret is in use.
    pub fn jwks_uri(&self) -> Result<Url, BffError> {
        match &self.key_source {
            KeySourceConfig::Jwks { jwks_uri } => Ok(jwks_uri.clone()),
            KeySourceConfig::SharedSecret(_) => default_jwks_uri(&self.base_url),
        }
    }
}

fn default_jwks_uri(base_url: &str) -> Result<Url, BffError> {
    Url::parse(&format!("{base_url}/auth/v1/keys")).map_err(|e| BffError::InvalidUrl(e.to_string()))
}

/// A builder for creating a `Settings` instance.
#[derive(Default)]
pub struct ConfigBuilder {
    base_url: Option<String>,
    anon_key: String,
    service_role_key: String,
    audience: Option<String>,
    issuer: Option<String>,
    jwks_uri: Option<Url>,
    shared_secret: Option<Vec<u8>>,
    fetch_timeout: Option<Duration>,
    leeway: Option<Duration>,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project base URL. This is a required field.
    ///
    /// Trailing slashes are stripped so derived paths can be appended verbatim.
    pub fn base_url(mut self, url: &str) -> Result<Self, BffError> {
        let trimmed = url.trim().trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| BffError::InvalidUrl(e.to_string()))?;
        self.base_url = Some(trimmed.to_string());
        Ok(self)
    }

    pub fn anon_key(mut self, key: String) -> Self {
        self.anon_key = key;
        self
    }

    pub fn service_role_key(mut self, key: String) -> Self {
        self.service_role_key = key;
        self
    }

    /// Sets the expected audience. Defaults to `authenticated`.
    pub fn audience(mut self, audience: String) -> Self {
        self.audience = Some(audience);
        self
    }

    /// Sets the expected issuer. Defaults to `{base_url}/auth/v1`.
    pub fn issuer(mut self, issuer: String) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Sets an explicit key-directory URL. Defaults to `{base_url}/auth/v1/keys`.
    pub fn jwks_uri(mut self, url: &str) -> Result<Self, BffError> {
        let parsed = Url::parse(url).map_err(|e| BffError::InvalidUrl(e.to_string()))?;
        self.jwks_uri = Some(parsed);
        Ok(self)
    }

    /// Sets the shared secret. When present, tokens are verified with it and
    /// the key directory is never contacted.
    pub fn shared_secret(mut self, secret: Vec<u8>) -> Self {
        self.shared_secret = Some(secret);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Sets the clock skew tolerance. Defaults to 60 seconds.
    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.leeway = Some(leeway);
        self
    }

    /// Consumes the builder and returns a `Settings` object.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is missing or a derived URL is invalid.
    pub fn build(self) -> Result<Settings, BffError> {
        let base_url = self
            .base_url
            .ok_or_else(|| BffError::MissingConfiguration("base_url".to_string()))?;

        let key_source = match self.shared_secret {
            Some(secret) => KeySourceConfig::SharedSecret(secret),
            None => KeySourceConfig::Jwks {
                jwks_uri: match self.jwks_uri {
                    Some(uri) => uri,
                    None => default_jwks_uri(&base_url)?,
                },
            },
        };

        Ok(Settings {
            issuer: self.issuer.unwrap_or_else(|| format!("{base_url}/auth/v1")),
            audience: self.audience.unwrap_or_else(|| DEFAULT_AUDIENCE.to_string()),
            anon_key: self.anon_key,
            service_role_key: self.service_role_key,
            key_source,
            fetch_timeout: self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT),
            leeway: self.leeway.unwrap_or(Duration::from_secs(60)),
            base_url,
        })
    }
}

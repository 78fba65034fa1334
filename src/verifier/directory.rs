// src/verifier/directory.rs

use super::model::{KeySet, RawKeySet};
use crate::config::Settings;
use crate::error::BffError;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Fetches the provider's key set, walking a fixed list of candidate URLs.
///
/// Providers disagree on where the key directory lives, so the configured
/// URL is tried first and then the well-known locations under the base URL.
/// A failing candidate is logged and skipped; only the last error surfaces.
#[derive(Clone)]
pub struct KeyDirectoryClient {
    http_client: reqwest::Client,
    candidates: Vec<Url>,
    anon_key: String,
}

impl KeyDirectoryClient {
    /// Creates a client for the key directory described by `settings`.
    pub fn new(settings: &Settings) -> Result<Self, BffError> {
        let http_client = reqwest::Client::builder()
            .timeout(settings.fetch_timeout)
            .build()?;
        Ok(Self {
            http_client,
            candidates: candidate_urls(settings)?,
            anon_key: settings.anon_key.clone(),
        })
    }

    /// The URLs tried by [`fetch`](Self::fetch), in order.
    pub fn candidates(&self) -> &[Url] {
        &self.candidates
    }

    /// Returns the first key set any candidate serves successfully.
    #[instrument(skip(self), err)]
    pub async fn fetch(&self) -> Result<KeySet, BffError> {
        self.walk(false).await.map(|(_, keys)| keys)
    }

    /// Like [`fetch`](Self::fetch), but an empty key list also counts as a
    /// failure. Returns the URL that answered.
    #[instrument(skip(self), err)]
    pub async fn probe(&self) -> Result<(Url, KeySet), BffError> {
        self.walk(true).await
    }

    async fn walk(&self, require_keys: bool) -> Result<(Url, KeySet), BffError> {
        let mut last_error = None;

        for url in &self.candidates {
            match self.fetch_from(url).await {
                Ok(keys) if require_keys && keys.is_empty() => {
                    warn!("JWKS at {} contains no usable keys", url);
                    last_error = Some(format!("{url} returned an empty key set"));
                }
                Ok(keys) => {
                    info!("JWKS fetched from {} ({} keys)", url, keys.len());
                    return Ok((url.clone(), keys));
                }
                Err(e) => {
                    warn!("JWKS fetch failed from {}: {}", url, e);
                    last_error = Some(e.to_string());
                }
            }
        }

        Err(BffError::KeyFetch(
            last_error.unwrap_or_else(|| "no key directory candidates".to_string()),
        ))
    }

    async fn fetch_from(&self, url: &Url) -> Result<KeySet, BffError> {
        debug!("Requesting JWKS from {}", url);
        let mut request = self.http_client.get(url.clone());
        if !self.anon_key.is_empty() {
            request = request.header("apikey", &self.anon_key);
        }
        let response = request.send().await?.error_for_status()?;
        let raw: RawKeySet = response.json().await?;
        Ok(KeySet::from(raw))
    }
}

/// The configured key-directory URL followed by the well-known fallbacks,
/// with duplicates removed.
fn candidate_urls(settings: &Settings) -> Result<Vec<Url>, BffError> {
    let base = &settings.base_url;
    let mut candidates = vec![settings.jwks_uri()?];
    for path in [
        "/auth/v1/.well-known/jwks.json",
        "/auth/v1/jwks",
        "/.well-known/jwks.json",
    ] {
        let url = Url::parse(&format!("{base}{path}")).map_err(|e| BffError::InvalidUrl(e.to_string()))?;
        if !candidates.contains(&url) {
            candidates.push(url);
        }
    }
    Ok(candidates)
}

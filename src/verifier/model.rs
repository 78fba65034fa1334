// src/verifier/model.rs

use crate::error::BffError;
use jsonwebtoken::jwk::Jwk;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// The JOSE header of a token, read without any signature check.
#[derive(Debug, Default, Deserialize)]
pub struct UnverifiedHeader {
    pub alg: Option<String>,
    pub kid: Option<String>,
}

impl UnverifiedHeader {
    /// Decodes the first segment of a compact JWS.
    pub fn parse(token: &str) -> Result<Self, BffError> {
        let segment = token
            .split('.')
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BffError::MalformedToken("empty token".to_string()))?;
        let bytes = base64_url::decode(segment)
            .map_err(|e| BffError::MalformedToken(format!("header is not base64url: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| BffError::MalformedToken(format!("header is not a JSON object: {e}")))
    }
}

/// The wire shape of a key directory response.
#[derive(Debug, Deserialize)]
pub struct RawKeySet {
    pub keys: Vec<Value>,
}

/// A single verification key published by the key directory.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub kid: String,
    /// The `alg` the directory declares for this key, if any.
    pub algorithm: Option<String>,
    pub jwk: Jwk,
    /// The key exactly as published.
    pub raw: Value,
}

impl TryFrom<Value> for KeyRecord {
    type Error = String;

    fn try_from(raw: Value) -> Result<Self, Self::Error> {
        let kid = raw
            .get("kid")
            .and_then(Value::as_str)
            .filter(|kid| !kid.is_empty())
            .ok_or("key has no 'kid'")?
            .to_string();
        let algorithm = raw.get("alg").and_then(Value::as_str).map(str::to_string);
        let jwk: Jwk = serde_json::from_value(raw.clone())
            .map_err(|e| format!("key '{kid}' is not a usable JWK: {e}"))?;
        Ok(Self { kid, algorithm, jwk, raw })
    }
}

/// A parsed key set. Unusable entries are dropped when the set is built.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Arc<KeyRecord>>,
}

impl KeySet {
    pub fn find(&self, kid: &str) -> Option<Arc<KeyRecord>> {
        self.keys.iter().find(|key| key.kid == kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|key| key.kid.as_str())
    }
}

impl From<RawKeySet> for KeySet {
    fn from(raw: RawKeySet) -> Self {
        let keys = raw
            .keys
            .into_iter()
            .filter_map(|value| match KeyRecord::try_from(value) {
                Ok(record) => Some(Arc::new(record)),
                Err(reason) => {
                    warn!("Skipping key directory entry: {}", reason);
                    None
                }
            })
            .collect();
        Self { keys }
    }
}

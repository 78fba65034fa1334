// src/verifier/cache.rs

use super::directory::KeyDirectoryClient;
use super::model::{KeyRecord, KeySet};
use crate::error::BffError;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

/// Process-wide cache of verification keys, keyed by `kid`.
///
/// The cache starts empty and is only ever refreshed on a miss: the whole
/// key set is fetched and replaces the previous one. Keys never expire on
/// their own, so a provider that reuses a `kid` for a rotated key is not
/// picked up until [`invalidate`](Self::invalidate) is called or the process
/// restarts.
///
/// Refreshes are single-flight. Callers that queue behind a running refresh
/// search its result instead of fetching again, and share its error when the
/// refresh failed.
#[derive(Clone)]
pub struct KeyCache {
    // The cache is internally ref-counted to allow for cheap cloning.
    inner: Arc<Inner>,
}

struct Inner {
    directory: KeyDirectoryClient,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
}

#[derive(Default)]
struct CacheState {
    keys: Option<KeySet>,
    // Reason the latest refresh failed; cleared by a successful one.
    last_error: Option<String>,
    // Bumped on every completed refresh, failed or not, and on invalidation.
    generation: u64,
}

impl KeyCache {
    /// Creates an empty cache backed by `directory`.
    pub fn new(directory: KeyDirectoryClient) -> Self {
        Self {
            inner: Arc::new(Inner {
                directory,
                state: RwLock::new(CacheState::default()),
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    /// Retrieves the key record for `kid`, refreshing the key set on a miss.
    #[instrument(skip(self), err)]
    pub async fn resolve(&self, kid: &str) -> Result<Arc<KeyRecord>, BffError> {
        if kid.is_empty() {
            return Err(BffError::UnknownKeyId("token header has no kid".to_string()));
        }

        let seen_generation = {
            let state = self.inner.state.read().await;
            if let Some(key) = state.keys.as_ref().and_then(|keys| keys.find(kid)) {
                debug!("JWK cache hit for kid: {}", kid);
                return Ok(key);
            }
            state.generation
        };

        debug!("JWK cache miss for kid: {}", kid);
        let keys = self.refresh_since(seen_generation).await?;
        keys.find(kid)
            .ok_or_else(|| BffError::UnknownKeyId(kid.to_string()))
    }

    /// Unconditionally fetches the key set and replaces the cached one.
    pub async fn refresh(&self) -> Result<KeySet, BffError> {
        let _guard = self.inner.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Drops every cached key. The next `resolve` fetches again.
    pub async fn invalidate(&self) {
        let mut state = self.inner.state.write().await;
        state.keys = None;
        state.last_error = None;
        state.generation += 1;
    }

    /// The key ids currently cached, if a key set has been fetched.
    pub async fn cached_kids(&self) -> Option<Vec<String>> {
        let state = self.inner.state.read().await;
        state
            .keys
            .as_ref()
            .map(|keys| keys.kids().map(str::to_string).collect())
    }

    // Fetches unless another caller already refreshed after `seen_generation`.
    async fn refresh_since(&self, seen_generation: u64) -> Result<KeySet, BffError> {
        let _guard = self.inner.refresh_lock.lock().await;
        {
            let state = self.inner.state.read().await;
            if state.generation != seen_generation {
                if let Some(reason) = &state.last_error {
                    debug!("JWKS refresh by a concurrent caller failed; sharing its error");
                    return Err(BffError::KeyFetch(reason.clone()));
                }
                if let Some(keys) = &state.keys {
                    debug!("JWKS refreshed by a concurrent caller; reusing it");
                    return Ok(keys.clone());
                }
            }
        }
        self.fetch_and_store().await
    }

    // Caller must hold `refresh_lock`.
    async fn fetch_and_store(&self) -> Result<KeySet, BffError> {
        let fetched = self.inner.directory.fetch().await;
        let mut state = self.inner.state.write().await;
        state.generation += 1;
        match fetched {
            Ok(keys) => {
                state.keys = Some(keys.clone());
                state.last_error = None;
                Ok(keys)
            }
            Err(e) => {
                let reason = match &e {
                    BffError::KeyFetch(reason) => reason.clone(),
                    other => other.to_string(),
                };
                state.last_error = Some(reason);
                Err(e)
            }
        }
    }
}

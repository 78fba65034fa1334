// src/service.rs

use crate::config::Settings;
use crate::error::BffError;
use crate::profile::model::{Page, Profile, ProfilePage, ProfileUpdate};
use crate::profile::rest::RestProfileStore;
use crate::profile::store::ProfileStore;
use crate::profile::ProfileSynchronizer;
use crate::verifier::TokenVerifier;
use serde_json::{json, Value};
use std::sync::Arc;

/// The operations behind the BFF's HTTP routes, independent of any web framework.
///
/// Every method except [`health`](Self::health) takes the raw `Authorization`
/// header. Errors carry their own status via [`BffError::status_code`].
#[derive(Clone)]
pub struct BffService {
    verifier: TokenVerifier,
    profiles: ProfileSynchronizer,
}

impl BffService {
    pub fn new(verifier: TokenVerifier, store: Arc<dyn ProfileStore>) -> Self {
        Self {
            verifier,
            profiles: ProfileSynchronizer::new(store),
        }
    }

    /// Wires the verifier and a PostgREST-backed store from `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, BffError> {
        let store = RestProfileStore::new(settings)?;
        Ok(Self::new(TokenVerifier::new(settings)?, Arc::new(store)))
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// `GET /health`
    pub fn health(&self) -> Value {
        json!({"status": "ok"})
    }

    /// `GET /users/me`
    pub async fn me(&self, authorization: Option<&str>) -> Result<Profile, BffError> {
        let identity = self.verifier.verify(authorization).await?;
        self.profiles.get_or_create(&identity).await
    }

    /// `PUT /users/me`
    pub async fn update_me(
        &self,
        authorization: Option<&str>,
        changes: &ProfileUpdate,
    ) -> Result<Profile, BffError> {
        let identity = self.verifier.verify(authorization).await?;
        self.profiles.update(&identity, changes).await
    }

    /// `GET /users?limit=&offset=`
    pub async fn list_users(
        &self,
        authorization: Option<&str>,
        page: Page,
    ) -> Result<ProfilePage, BffError> {
        self.verifier.verify(authorization).await?;
        self.profiles.list(page).await
    }
}

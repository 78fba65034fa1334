// src/profile.rs

pub mod memory;
pub mod model;
pub mod rest;
pub mod store;

use crate::error::BffError;
use crate::verifier::AuthedIdentity;
use model::{Page, Profile, ProfilePage, ProfileUpdate};
use std::sync::Arc;
use store::ProfileStore;
use tracing::{debug, info, instrument};

/// Provider recorded when the token carries no `app_metadata.provider`.
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Keeps the `profiles` row of an authenticated identity in sync with its claims.
#[derive(Clone)]
pub struct ProfileSynchronizer {
    store: Arc<dyn ProfileStore>,
}

impl ProfileSynchronizer {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Builds the row an identity would get on first access.
    ///
    /// Display name falls back through `user_metadata.full_name`, `name`,
    /// `user_name` and then the email; the avatar through `avatar_url` and
    /// `picture`. The provider id is `user_metadata.sub` when the provider
    /// sets one, otherwise the subject itself.
    pub fn derive_payload(identity: &AuthedIdentity) -> Profile {
        let email = identity.email.clone().filter(|email| !email.is_empty());
        let display_name = ["full_name", "name", "user_name"]
            .into_iter()
            .find_map(|field| identity.user_metadata(field))
            .map(str::to_string)
            .or_else(|| email.clone());
        let avatar_url = ["avatar_url", "picture"]
            .into_iter()
            .find_map(|field| identity.user_metadata(field))
            .map(str::to_string);

        Profile {
            id: identity.sub.clone(),
            provider: identity
                .provider
                .clone()
                .filter(|provider| !provider.is_empty())
                .unwrap_or_else(|| UNKNOWN_PROVIDER.to_string()),
            provider_id: identity
                .user_metadata("sub")
                .unwrap_or(identity.sub.as_str())
                .to_string(),
            email: identity.email.clone(),
            display_name,
            avatar_url,
        }
    }

    /// Returns the stored profile, creating it from the claims on first access.
    ///
    /// An existing row is returned as stored; claims are not re-applied.
    #[instrument(skip(self, identity), fields(sub = %identity.sub), err)]
    pub async fn get_or_create(&self, identity: &AuthedIdentity) -> Result<Profile, BffError> {
        if let Some(existing) = self.store.select_by_id(&identity.sub).await? {
            debug!("Profile {} already exists", identity.sub);
            return Ok(existing);
        }

        let payload = Self::derive_payload(identity);
        info!("Creating profile for {}", identity.sub);
        Ok(self.store.upsert(&payload).await?.unwrap_or(payload))
    }

    /// Applies caller overrides to the identity's profile.
    ///
    /// With nothing to change this behaves like [`get_or_create`](Self::get_or_create)
    /// and writes nothing.
    #[instrument(skip(self, identity, changes), fields(sub = %identity.sub), err)]
    pub async fn update(
        &self,
        identity: &AuthedIdentity,
        changes: &ProfileUpdate,
    ) -> Result<Profile, BffError> {
        if changes.is_empty() {
            return self.get_or_create(identity).await;
        }

        if let Some(row) = self.store.update(&identity.sub, changes).await? {
            return Ok(row);
        }

        debug!("Update of {} returned no row; re-selecting", identity.sub);
        self.store
            .select_by_id(&identity.sub)
            .await?
            .ok_or_else(|| BffError::ProfileNotFound(identity.sub.clone()))
    }

    /// Returns one page of profiles.
    #[instrument(skip(self), err)]
    pub async fn list(&self, page: Page) -> Result<ProfilePage, BffError> {
        if page.limit == 0 {
            return Ok(ProfilePage::from(Vec::new()));
        }
        let rows = self.store.list(page.offset, page.limit).await?;
        Ok(ProfilePage::from(rows))
    }
}

// src/profile/store.rs

use super::model::{Profile, ProfileUpdate};
use crate::error::BffError;
use async_trait::async_trait;

/// Row-level access to the `profiles` relation.
///
/// Write methods return `None` when the backend is configured not to send
/// rows back (PostgREST `return=minimal`), which callers must tolerate.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn select_by_id(&self, id: &str) -> Result<Option<Profile>, BffError>;

    /// Inserts `profile`, or merges it into the existing row with the same id.
    async fn upsert(&self, profile: &Profile) -> Result<Option<Profile>, BffError>;

    /// Applies the non-null fields of `changes` to the row `id`.
    async fn update(&self, id: &str, changes: &ProfileUpdate) -> Result<Option<Profile>, BffError>;

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Profile>, BffError>;
}

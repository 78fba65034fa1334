// src/profile/memory.rs

use super::model::{Profile, ProfileUpdate};
use super::store::ProfileStore;
use crate::error::BffError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process [`ProfileStore`], ordered by id.
///
/// Useful for local runs and tests. With `returning_rows(false)` it mimics a
/// backend that acknowledges writes without sending rows back.
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    rows: RwLock<BTreeMap<String, Profile>>,
    writes: AtomicUsize,
    minimal_returns: bool,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether writes hand back the affected row.
    pub fn returning_rows(returning: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                minimal_returns: !returning,
                ..Inner::default()
            }),
        }
    }

    /// Number of upserts and updates issued so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.inner.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.rows.read().await.is_empty()
    }

    /// Removes a row, as a concurrent delete would.
    pub async fn remove(&self, id: &str) -> Option<Profile> {
        self.inner.rows.write().await.remove(id)
    }

    fn returned(&self, row: Option<Profile>) -> Option<Profile> {
        if self.inner.minimal_returns {
            None
        } else {
            row
        }
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn select_by_id(&self, id: &str) -> Result<Option<Profile>, BffError> {
        Ok(self.inner.rows.read().await.get(id).cloned())
    }

    async fn upsert(&self, profile: &Profile) -> Result<Option<Profile>, BffError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.inner.rows.write().await;
        rows.insert(profile.id.clone(), profile.clone());
        Ok(self.returned(Some(profile.clone())))
    }

    async fn update(&self, id: &str, changes: &ProfileUpdate) -> Result<Option<Profile>, BffError> {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.inner.rows.write().await;
        let row = rows.get_mut(id).map(|row| {
            changes.apply_to(row);
            row.clone()
        });
        Ok(self.returned(row))
    }

    async fn list(&self, offset: u64, limit: u64) -> Result<Vec<Profile>, BffError> {
        let rows = self.inner.rows.read().await;
        Ok(rows
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// src/lib.rs


pub mod config;
pub mod error;
pub mod profile;
pub mod service;
pub mod verifier;

/// The public prelude for the `supabase-bff` crate.
///
/// This module re-exports the most commonly used types for convenience.
pub mod prelude {
    pub use crate::config::{ConfigBuilder, KeySourceConfig, Settings};
    pub use crate::error::BffError;
    pub use crate::profile::memory::MemoryProfileStore;
    pub use crate::profile::model::{Page, Profile, ProfilePage, ProfileUpdate};
    pub use crate::profile::rest::{RestProfileStore, ReturnPreference};
    pub use crate::profile::store::ProfileStore;
    pub use crate::profile::ProfileSynchronizer;
    pub use crate::service::BffService;
    pub use crate::verifier::cache::KeyCache;
    pub use crate::verifier::directory::KeyDirectoryClient;
    pub use crate::verifier::{AuthedIdentity, TokenVerifier, VerificationMode};
    pub use jsonwebtoken::Algorithm;
}

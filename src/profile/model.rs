// src/profile/model.rs

use serde::{Deserialize, Serialize};

/// A row of the `profiles` relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same as the identity's subject id.
    pub id: String,
    pub provider: String,
    pub provider_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Caller-supplied overrides for `PUT /users/me`. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.avatar_url.is_none()
    }

    /// Writes the present fields onto `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(name) = &self.display_name {
            profile.display_name = Some(name.clone());
        }
        if let Some(avatar) = &self.avatar_url {
            profile.avatar_url = Some(avatar.clone());
        }
    }
}

/// Offset/limit paging for `GET /users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default = "Page::default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Page {
    fn default_limit() -> u64 {
        20
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::default_limit(),
            offset: 0,
        }
    }
}

/// One page of profiles. `count` is the size of this page, not a total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePage {
    pub items: Vec<Profile>,
    pub count: usize,
}

impl From<Vec<Profile>> for ProfilePage {
    fn from(items: Vec<Profile>) -> Self {
        Self {
            count: items.len(),
            items,
        }
    }
}

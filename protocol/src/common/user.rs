//! User and profile structures
//!
//! The backend stores the profile as a loosely-typed attribute bag; the known
//! fields are modelled explicitly and everything else is kept in `extra` so a
//! newer server never breaks an older client.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logged-in user record, the single source of client-side truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile: Profile,
}

impl User {
    /// Whether the profile satisfies the chat photo precondition.
    pub fn has_photos(&self) -> bool {
        !self.profile.photos.is_empty()
    }
}

/// Free-form profile attribute set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub top_size: Option<String>,
    #[serde(default)]
    pub bottom_size: Option<String>,
    #[serde(default)]
    pub shoe_size: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    /// Photo reference strings (S3 object URLs).
    #[serde(default)]
    pub photos: Vec<String>,
    /// Identifiers of liked items.
    #[serde(default)]
    pub liked: Vec<String>,
    /// Attributes the client does not interpret.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

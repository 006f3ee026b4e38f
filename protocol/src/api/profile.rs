//! Profile and photo API DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::User;

/// Profile field update for `PUT /api/update/{user}`.
///
/// Sent as multipart form fields; `None` fields are left untouched server
/// side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 32))]
    pub top_size: Option<String>,
    #[validate(length(max = 32))]
    pub bottom_size: Option<String>,
    #[validate(length(max = 32))]
    pub shoe_size: Option<String>,
    #[validate(length(max = 64))]
    pub region: Option<String>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[validate(length(max = 32))]
    pub age_group: Option<String>,
}

impl ProfileUpdate {
    /// Named (field, value) pairs for the multipart form, skipping unset
    /// fields.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::new();
        let mut push = |name: &'static str, value: &Option<String>| {
            if let Some(v) = value {
                fields.push((name, v.clone()));
            }
        };
        push("top_size", &self.top_size);
        push("bottom_size", &self.bottom_size);
        push("shoe_size", &self.shoe_size);
        push("region", &self.region);
        push("gender", &self.gender);
        push("age_group", &self.age_group);
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.form_fields().is_empty()
    }
}

/// Response for `GET /api/upload-url/{user}`: a presigned upload target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    pub url: String,
    #[serde(default)]
    pub key: Option<String>,
}

/// Response for `GET /api/image-url/{user}`: the user's photo references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrlsResponse {
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Acknowledgement for `POST /api/like/{user}/{imageId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LikeResponse {
    #[serde(default)]
    pub liked: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_skip_unset() {
        let update = ProfileUpdate {
            region: Some("EU".to_string()),
            gender: Some("female".to_string()),
            ..Default::default()
        };
        let fields = update.form_fields();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&("region", "EU".to_string())));
        assert!(!update.is_empty());
    }

    #[test]
    fn default_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
    }
}

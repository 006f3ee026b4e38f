//! Profile and photo management service
//!
//! Every mutating call returns the updated user from the server and
//! persists it through the session store, keeping the local record the
//! single source of client-side truth.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use stylemuse_protocol::api::ProfileUpdate;
use stylemuse_protocol::common::User;

use crate::client::ApiClient;
use crate::error::{MuseError, Result};
use crate::session::SessionStore;
use crate::ui::UI;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Profile service for updates, photos and likes
pub struct ProfileService<C: ApiClient + ?Sized> {
    client: Arc<C>,
    store: SessionStore,
    progress_enabled: bool,
    ui: UI,
}

impl<C: ApiClient + ?Sized> ProfileService<C> {
    pub fn new(client: Arc<C>, store: SessionStore) -> Self {
        Self {
            client,
            store,
            progress_enabled: true,
            ui: UI::new(),
        }
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress_enabled = enabled;
        self
    }

    /// Apply profile field updates and persist the returned user.
    pub async fn update(&self, user: &User, update: &ProfileUpdate) -> Result<User> {
        if update.is_empty() {
            return Err(MuseError::invalid_input(
                "Nothing to update. Pass at least one profile field.",
            ));
        }

        let updated = self.client.update_profile(&user.username, update).await?;
        self.store.save(&updated)?;
        Ok(updated)
    }

    /// Upload one photo file, or every image file at the top level of a
    /// directory, and persist the final user record.
    pub async fn upload_photos(&self, user: &User, path: &Path) -> Result<User> {
        let files = if path.is_dir() {
            scan_photo_dir(path)?
        } else {
            if !path.exists() {
                return Err(MuseError::file_not_found(path.display().to_string()));
            }
            vec![path.to_path_buf()]
        };

        let progress_bar = if self.progress_enabled && files.len() > 1 {
            Some(crate::ui::create_progress_bar(
                files.len() as u64,
                "Uploading photos...",
            ))
        } else {
            None
        };

        let mut updated = user.clone();
        for file in &files {
            updated = self.client.upload_photo(&user.username, file).await?;
            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Upload completed");
        }

        self.store.save(&updated)?;
        self.ui.success(&format!(
            "Uploaded {} photo{}; profile now has {}",
            files.len(),
            if files.len() == 1 { "" } else { "s" },
            updated.profile.photos.len()
        ));
        Ok(updated)
    }

    /// Remove a photo by its reference (a photo URL or a bare object key)
    /// and persist the returned user.
    pub async fn remove_photo(&self, user: &User, reference: &str) -> Result<User> {
        let key = extract_s3_key(reference)
            .ok_or_else(|| MuseError::invalid_input(format!("Not a photo reference: {reference}")))?;

        let updated = self.client.delete_photo(&user.username, key).await?;
        self.store.save(&updated)?;
        Ok(updated)
    }

    /// Like a recommended item. Fire-and-forget: a failure is logged, never
    /// surfaced.
    pub async fn like(&self, user: &User, image_id: &str) {
        if let Err(e) = self.client.like_image(&user.username, image_id).await {
            tracing::warn!(image_id, "like request failed: {e}");
        }
    }
}

/// Extract the S3 object key from a photo reference.
///
/// References arrive either as full (possibly presigned) object URLs or as
/// bare keys; the key is the final path segment with query and fragment
/// stripped.
pub fn extract_s3_key(reference: &str) -> Option<&str> {
    let stripped = reference.split(['?', '#']).next().unwrap_or(reference);

    // For a URL the key lives in the path, after the host.
    let path = match stripped.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p)?,
        None => stripped,
    };

    let key = path.trim_end_matches('/').rsplit('/').next()?.trim();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

/// List image files at the top level of a directory.
fn scan_photo_dir(path: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkDir::new(path)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok());

    let mut files = Vec::new();
    for entry in walker {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_path = entry.path();
        if let Some(ext) = file_path.extension().and_then(|e| e.to_str()) {
            if IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                files.push(file_path.to_path_buf());
            }
        }
    }

    if files.is_empty() {
        return Err(MuseError::file_not_found(format!(
            "No image files found in {}",
            path.display()
        )));
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockApiClient;
    use crate::tests::utils::test_helpers::*;
    use reqwest::Method;
    use serde_json::json;

    fn service_with_store(
        client: Arc<MockApiClient>,
    ) -> (ProfileService<MockApiClient>, tempfile::TempDir) {
        let dir = create_temp_dir();
        let store = SessionStore::new(dir.path().join("session.json"));
        let service = ProfileService::new(client, store).with_progress(false);
        (service, dir)
    }

    fn updated_user_json(photos: &[&str]) -> serde_json::Value {
        json!({
            "id": "u1",
            "username": "alice",
            "profile": {"photos": photos, "liked": []}
        })
    }

    #[test]
    fn extract_s3_key_handles_urls_and_bare_keys() {
        assert_eq!(
            extract_s3_key("https://muse-photos.s3.amazonaws.com/alice-p1.jpg"),
            Some("alice-p1.jpg")
        );
        assert_eq!(
            extract_s3_key("https://cdn.example.com/users/alice/p1.jpg?X-Amz-Signature=abc#frag"),
            Some("p1.jpg")
        );
        assert_eq!(extract_s3_key("alice-p1.jpg"), Some("alice-p1.jpg"));
        assert_eq!(extract_s3_key("https://cdn.example.com/"), None);
        assert_eq!(extract_s3_key(""), None);
    }

    #[test]
    fn scan_finds_only_top_level_images() {
        let dir = create_temp_dir();
        create_photo_file(&dir, "a.jpg");
        create_photo_file(&dir, "b.PNG");
        std::fs::write(dir.path().join("notes.txt"), b"not a photo").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.jpg"), b"deep").unwrap();

        let files = scan_photo_dir(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn scan_with_no_images_fails() {
        let dir = create_temp_dir();
        std::fs::write(dir.path().join("notes.txt"), b"not a photo").unwrap();
        assert!(scan_photo_dir(dir.path()).is_err());
    }

    #[tokio::test]
    async fn upload_persists_updated_user() {
        let client = Arc::new(MockApiClient::new());
        client.add_response("api/upload", updated_user_json(&["p1.jpg", "p2.jpg"]));
        let (service, dir) = service_with_store(client.clone());

        let user = user_fixture("u1", "alice", &["p1.jpg"]);
        let photo_dir = create_temp_dir();
        let photo = create_photo_file(&photo_dir, "p2.jpg");

        let updated = service.upload_photos(&user, &photo).await.unwrap();
        assert_eq!(updated.profile.photos.len(), 2);

        let store = SessionStore::new(dir.path().join("session.json"));
        let persisted = store.load().unwrap().unwrap();
        assert_eq!(persisted.user.profile.photos.len(), 2);

        let uploads: Vec<_> = client
            .get_requests()
            .into_iter()
            .filter(|r| r.endpoint == "api/upload")
            .collect();
        assert_eq!(uploads.len(), 1);
    }

    #[tokio::test]
    async fn remove_photo_uses_extracted_key() {
        let client = Arc::new(MockApiClient::new());
        client.add_response("api/image/alice/p1.jpg", updated_user_json(&[]));
        let (service, _dir) = service_with_store(client.clone());

        let user = user_fixture("u1", "alice", &["p1.jpg"]);
        let updated = service
            .remove_photo(&user, "https://cdn.example.com/users/alice/p1.jpg?sig=x")
            .await
            .unwrap();
        assert!(updated.profile.photos.is_empty());

        let requests = client.get_requests();
        assert_eq!(requests[0].method, Method::DELETE);
        assert_eq!(requests[0].endpoint, "api/image/alice/p1.jpg");
    }

    #[tokio::test]
    async fn empty_update_is_rejected_before_network() {
        let client = Arc::new(MockApiClient::new());
        let (service, _dir) = service_with_store(client.clone());
        let user = user_fixture("u1", "alice", &[]);

        let err = service
            .update(&user, &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(client.get_requests().is_empty());
    }

    #[tokio::test]
    async fn like_failure_is_swallowed() {
        let client = Arc::new(MockApiClient::new());
        client.add_error(
            "api/like/alice/prod-9",
            MuseError::api(500, "like service down"),
        );
        let (service, _dir) = service_with_store(client.clone());
        let user = user_fixture("u1", "alice", &["p1.jpg"]);

        // Does not panic, does not return an error.
        service.like(&user, "prod-9").await;
        assert_eq!(client.get_requests().len(), 1);
    }
}

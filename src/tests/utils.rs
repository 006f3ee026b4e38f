//! Test utilities and helpers for unit tests

#[cfg(test)]
pub mod test_helpers {
    use std::path::PathBuf;
    use tempfile::TempDir;

    use stylemuse_protocol::common::{Profile, User};

    /// Create a temporary directory for testing
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    /// Create a small stand-in photo file
    pub fn create_photo_file(dir: &TempDir, filename: &str) -> PathBuf {
        let file_path = dir.path().join(filename);
        // A JPEG magic prefix is enough for the client, which never decodes.
        std::fs::write(&file_path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
            .expect("Failed to write photo file");
        file_path
    }

    /// User fixture with at least one photo reference
    pub fn user_fixture(id: &str, username: &str, photos: &[&str]) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            display_name: None,
            profile: Profile {
                photos: photos.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
        }
    }
}

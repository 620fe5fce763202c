//! Opaque blob store for item images
//!
//! A store accepts the uploaded bytes and returns a stable reference string;
//! serving files back is left to whatever fronts the upload directory.

use crate::core::error::{DeliveryResult, ValidationError};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Largest accepted image, in bytes
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist `bytes` and return the reference to record on the item
    async fn save(&self, original_name: &str, bytes: &[u8]) -> DeliveryResult<String>;
}

/// Stores images as files in one directory
///
/// File names are `<unix millis>-<uuid><original extension>`, so concurrent
/// uploads of the same file never collide.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        format!(
            "{}-{}{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension
        )
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn save(&self, original_name: &str, bytes: &[u8]) -> DeliveryResult<String> {
        if bytes.is_empty() {
            return Err(ValidationError::InvalidUpload {
                message: "image file is empty".to_string(),
            }
            .into());
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::InvalidUpload {
                message: format!("image exceeds {} bytes", MAX_IMAGE_BYTES),
            }
            .into());
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let name = Self::file_name(original_name);
        tokio::fs::write(self.root.join(&name), bytes).await?;
        tracing::debug!(file = %name, size = bytes.len(), "stored item image");
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_writes_file_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        let reference = store.save("pizza.PNG", b"\x89PNG....").await.unwrap();
        assert!(reference.ends_with(".png"));
        let written = tokio::fs::read(dir.path().join(&reference)).await.unwrap();
        assert_eq!(written, b"\x89PNG....");
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        let a = store.save("a.jpg", b"1").await.unwrap();
        let b = store.save("a.jpg", b"1").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_strips_odd_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path());
        assert!(store.save("a.png", b"").await.is_err());
        let reference = store.save("../../etc/passwd", b"x").await.unwrap();
        assert!(!reference.contains('/'));
        assert!(!reference.contains('.'));
    }
}

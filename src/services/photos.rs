use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::UploadConfig;

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("File must be an image")]
    NotAnImage,

    #[error("File larger than {max_bytes} bytes")]
    TooLarge { max_bytes: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Bootcamp photos kept in a local directory
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    max_bytes: usize,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.path, config.max_bytes)
    }

    pub fn check(&self, content_type: Option<&str>, len: usize) -> Result<(), PhotoError> {
        if !content_type.is_some_and(|ct| ct.starts_with("image")) {
            return Err(PhotoError::NotAnImage);
        }
        if len > self.max_bytes {
            return Err(PhotoError::TooLarge { max_bytes: self.max_bytes });
        }
        Ok(())
    }

    /// `bootcampPhoto_<id><ext>`, keeping the uploaded file's extension
    pub fn file_name_for(bootcamp_id: Uuid, original: Option<&str>) -> String {
        let ext = original
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        format!("bootcampPhoto_{}{}", bootcamp_id, ext)
    }

    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<(), PhotoError> {
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(file_name), bytes).await?;
        info!("Stored photo {}", file_name);
        Ok(())
    }

    /// A file already gone counts as removed
    pub async fn remove(&self, file_name: &str) -> Result<(), PhotoError> {
        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_images_within_limit_pass() {
        let store = PhotoStore::new("/tmp", 1000);
        assert!(store.check(Some("image/png"), 1000).is_ok());
        assert!(matches!(store.check(Some("text/plain"), 10), Err(PhotoError::NotAnImage)));
        assert!(matches!(store.check(None, 10), Err(PhotoError::NotAnImage)));
        assert!(matches!(
            store.check(Some("image/jpeg"), 1001),
            Err(PhotoError::TooLarge { max_bytes: 1000 })
        ));
    }

    #[test]
    fn file_name_keeps_extension() {
        let id = Uuid::nil();
        assert_eq!(
            PhotoStore::file_name_for(id, Some("camp.JPG")),
            "bootcampPhoto_00000000-0000-0000-0000-000000000000.JPG"
        );
        assert_eq!(
            PhotoStore::file_name_for(id, Some("../../etc/passwd")),
            "bootcampPhoto_00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            PhotoStore::file_name_for(id, None),
            "bootcampPhoto_00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn save_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path().join("uploads"), 1000);
        store.save("bootcampPhoto_x.png", b"png").await.unwrap();
        assert!(dir.path().join("uploads/bootcampPhoto_x.png").exists());
        store.remove("bootcampPhoto_x.png").await.unwrap();
        assert!(!dir.path().join("uploads/bootcampPhoto_x.png").exists());
        store.remove("bootcampPhoto_x.png").await.unwrap();
    }
}

use crate::errors::CameraError;
use chrono::Local;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};

/// The user's media library
pub trait MediaStore: Send + Sync {
    /// Ask for write access to the library
    fn request_access(&self) -> BoxFuture<'_, bool>;

    /// Add the processed file as a new asset, with the raw file attached
    /// as its alternate resource. Returns the asset location.
    fn commit<'a>(
        &'a self,
        processed: &'a Path,
        raw: Option<&'a Path>,
    ) -> BoxFuture<'a, Result<PathBuf, CameraError>>;
}

/// Media store backed by a plain album directory
#[derive(Debug, Clone)]
pub struct DirectoryMediaStore {
    root: PathBuf,
    dated_folders: bool,
    date_format: String,
}

impl DirectoryMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dated_folders: false,
            date_format: "%Y-%m-%d".to_string(),
        }
    }

    /// Place each asset under a sub-folder named by the current date
    pub fn with_dated_folders(mut self, date_format: impl Into<String>) -> Self {
        self.dated_folders = true;
        self.date_format = date_format.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target_dir(&self) -> PathBuf {
        if self.dated_folders {
            self.root
                .join(Local::now().format(&self.date_format).to_string())
        } else {
            self.root.clone()
        }
    }

    async fn copy_into(dir: &Path, source: &Path) -> Result<PathBuf, CameraError> {
        let name = source.file_name().ok_or_else(|| {
            CameraError::StorageError(format!("Not a file path: {}", source.display()))
        })?;
        let target = dir.join(name);
        tokio::fs::copy(source, &target).await?;
        Ok(target)
    }
}

impl MediaStore for DirectoryMediaStore {
    fn request_access(&self) -> BoxFuture<'_, bool> {
        async move {
            match tokio::fs::create_dir_all(&self.root).await {
                Ok(()) => true,
                Err(e) => {
                    log::error!("Album directory {} unavailable: {}", self.root.display(), e);
                    false
                }
            }
        }
        .boxed()
    }

    fn commit<'a>(
        &'a self,
        processed: &'a Path,
        raw: Option<&'a Path>,
    ) -> BoxFuture<'a, Result<PathBuf, CameraError>> {
        async move {
            let dir = self.target_dir();
            tokio::fs::create_dir_all(&dir).await?;

            let asset = Self::copy_into(&dir, processed).await?;
            if let Some(raw) = raw {
                Self::copy_into(&dir, raw).await?;
            }

            log::info!("Committed {} to album", asset.display());
            Ok(asset)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_commit_copies_processed_and_raw() {
        let scratch = tempdir().unwrap();
        let album = tempdir().unwrap();
        let processed = scratch.path().join("a.heic");
        let raw = scratch.path().join("a.dng");
        std::fs::write(&processed, b"heic").unwrap();
        std::fs::write(&raw, b"dng").unwrap();

        let store = DirectoryMediaStore::new(album.path());
        assert!(store.request_access().await);
        let asset = store.commit(&processed, Some(&raw)).await.unwrap();

        assert_eq!(asset, album.path().join("a.heic"));
        assert_eq!(std::fs::read(&asset).unwrap(), b"heic");
        assert!(album.path().join("a.dng").exists());
    }

    #[tokio::test]
    async fn test_dated_folders() {
        let scratch = tempdir().unwrap();
        let album = tempdir().unwrap();
        let processed = scratch.path().join("b.heic");
        std::fs::write(&processed, b"x").unwrap();

        let store = DirectoryMediaStore::new(album.path()).with_dated_folders("%Y");
        let asset = store.commit(&processed, None).await.unwrap();

        let year = Local::now().format("%Y").to_string();
        assert_eq!(asset, album.path().join(year).join("b.heic"));
    }

    #[tokio::test]
    async fn test_missing_source_is_error() {
        let album = tempdir().unwrap();
        let store = DirectoryMediaStore::new(album.path());
        let result = store.commit(Path::new("/nonexistent/c.heic"), None).await;
        assert!(matches!(result, Err(CameraError::Io(_))));
    }
}

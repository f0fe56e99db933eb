use super::media_store::{DirectoryMediaStore, MediaStore};
use super::{PersistOutcome, Persistence};
use crate::config::StorageConfig;
use crate::errors::CameraError;
use crate::types::{Deliverable, DeliverableSet};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Writes each deliverable to a scratch file, then commits the pair to a
/// media store.
pub struct FilePersistence {
    storage: StorageConfig,
    media_store: Arc<dyn MediaStore>,
}

impl FilePersistence {
    pub fn new(storage: StorageConfig, media_store: Arc<dyn MediaStore>) -> Self {
        Self {
            storage,
            media_store,
        }
    }

    /// Persistence committing into the configured album directory
    pub fn from_config(storage: &StorageConfig) -> Self {
        let mut album = DirectoryMediaStore::new(&storage.album_directory);
        if storage.auto_organize_by_date {
            album = album.with_dated_folders(storage.date_format.clone());
        }
        Self::new(storage.clone(), Arc::new(album))
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.storage
    }

    async fn write_scratch(
        &self,
        dir: &Path,
        deliverable: &Deliverable,
        extension: &str,
    ) -> Result<PathBuf, CameraError> {
        if deliverable.data.is_empty() {
            return Err(CameraError::StorageError(format!(
                "{} deliverable has no file representation",
                deliverable.kind
            )));
        }

        let path = dir.join(format!("{}.{}", uuid::Uuid::new_v4(), extension));
        tokio::fs::write(&path, &deliverable.data).await?;
        log::debug!(
            "Wrote {} deliverable ({} bytes) to {}",
            deliverable.kind,
            deliverable.data.len(),
            path.display()
        );
        Ok(path)
    }

    async fn write_optional(
        &self,
        dir: &Path,
        deliverable: Option<&Deliverable>,
        extension: &str,
    ) -> Option<PathBuf> {
        let deliverable = deliverable?;
        match self.write_scratch(dir, deliverable, extension).await {
            Ok(path) => Some(path),
            Err(e) => {
                log::error!("Failed to write {} deliverable: {}", deliverable.kind, e);
                None
            }
        }
    }

    async fn save(&self, set: DeliverableSet) -> PersistOutcome {
        let dir = self.storage.scratch_dir();
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            log::error!("Scratch directory {} unavailable: {}", dir.display(), e);
            return PersistOutcome::failed();
        }

        let raw_file = self
            .write_optional(&dir, set.raw.as_ref(), &self.storage.raw_extension)
            .await;
        let processed_file = self
            .write_optional(&dir, set.processed.as_ref(), &self.storage.processed_extension)
            .await;

        let Some(processed_file) = processed_file else {
            log::warn!("Capture {} has no processed image; nothing committed", set.id);
            if let Some(raw_file) = raw_file {
                if self.storage.delete_intermediates {
                    self.remove_scratch(&[raw_file]).await;
                } else {
                    log::warn!("Uncommitted raw image left at {}", raw_file.display());
                }
            }
            return PersistOutcome::failed();
        };

        let outcome = if !self.media_store.request_access().await {
            log::warn!("Media store access denied; capture {} not committed", set.id);
            PersistOutcome::failed()
        } else {
            match self
                .media_store
                .commit(&processed_file, raw_file.as_deref())
                .await
            {
                Ok(location) => PersistOutcome::saved(location),
                Err(e) => {
                    log::error!("Failed to commit capture {}: {}", set.id, e);
                    PersistOutcome::failed()
                }
            }
        };

        if self.storage.delete_intermediates {
            let scratch: Vec<PathBuf> = std::iter::once(processed_file).chain(raw_file).collect();
            self.remove_scratch(&scratch).await;
        }

        outcome
    }

    async fn remove_scratch(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(path).await {
                log::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}

impl Persistence for FilePersistence {
    fn persist(&self, set: DeliverableSet) -> BoxFuture<'_, PersistOutcome> {
        self.save(set).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CorrelationId;
    use tempfile::tempdir;

    fn storage_in(scratch: &Path, album: &Path) -> StorageConfig {
        StorageConfig {
            scratch_directory: scratch.to_path_buf(),
            album_directory: album.to_path_buf(),
            auto_organize_by_date: false,
            ..StorageConfig::default()
        }
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_pair_is_committed_and_scratch_cleared() {
        let scratch = tempdir().unwrap();
        let album = tempdir().unwrap();
        let storage = storage_in(scratch.path(), album.path());
        let persistence = FilePersistence::from_config(&storage);

        let mut set = DeliverableSet::empty(CorrelationId(7));
        set.raw = Some(Deliverable::raw(vec![1u8, 2, 3]));
        set.processed = Some(Deliverable::processed(vec![4u8, 5]));

        let outcome = persistence.persist(set).await;
        assert!(outcome.success);
        let location = outcome.location.unwrap();
        assert_eq!(location.extension().unwrap(), "heic");
        assert_eq!(std::fs::read(&location).unwrap(), vec![4u8, 5]);

        assert_eq!(files_in(album.path()).len(), 2);
        assert!(files_in(&storage.scratch_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_raw_only_set_is_not_committed() {
        let scratch = tempdir().unwrap();
        let album = tempdir().unwrap();
        let storage = storage_in(scratch.path(), album.path());
        let persistence = FilePersistence::from_config(&storage);

        let mut set = DeliverableSet::empty(CorrelationId(2));
        set.raw = Some(Deliverable::raw(vec![9u8]));

        assert_eq!(persistence.persist(set).await, PersistOutcome::failed());
        assert!(files_in(album.path()).is_empty());
        assert!(files_in(&storage.scratch_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_unwritable_processed_image_clears_raw_scratch() {
        let scratch = tempdir().unwrap();
        let album = tempdir().unwrap();
        let storage = storage_in(scratch.path(), album.path());
        let persistence = FilePersistence::from_config(&storage);

        let mut set = DeliverableSet::empty(CorrelationId(3));
        set.raw = Some(Deliverable::raw(vec![9u8]));
        set.processed = Some(Deliverable::processed(Vec::<u8>::new()));

        assert_eq!(persistence.persist(set).await, PersistOutcome::failed());
        assert!(files_in(album.path()).is_empty());
        assert!(files_in(&storage.scratch_dir()).is_empty());
    }

    #[tokio::test]
    async fn test_uncommitted_raw_kept_when_intermediates_retained() {
        let scratch = tempdir().unwrap();
        let album = tempdir().unwrap();
        let storage = StorageConfig {
            delete_intermediates: false,
            ..storage_in(scratch.path(), album.path())
        };
        let persistence = FilePersistence::from_config(&storage);

        let mut set = DeliverableSet::empty(CorrelationId(4));
        set.raw = Some(Deliverable::raw(vec![9u8]));
        set.processed = Some(Deliverable::processed(Vec::<u8>::new()));

        assert_eq!(persistence.persist(set).await, PersistOutcome::failed());
        let kept = files_in(&storage.scratch_dir());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].extension().unwrap(), "dng");
    }
}

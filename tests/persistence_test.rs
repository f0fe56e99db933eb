use crabshutter::persistence::{FilePersistence, MediaStore, PersistOutcome, Persistence};
use crabshutter::testing::{synthetic_processed_payload, synthetic_raw_payload};
use crabshutter::{CameraError, CorrelationId, Deliverable, DeliverableSet, StorageConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

/// Media store that refuses access or fails commits on demand
struct ScriptedStore {
    grant: bool,
    fail_commit: bool,
    commits: AtomicUsize,
}

impl MediaStore for ScriptedStore {
    fn request_access(&self) -> BoxFuture<'_, bool> {
        let grant = self.grant;
        async move { grant }.boxed()
    }

    fn commit<'a>(
        &'a self,
        processed: &'a Path,
        _raw: Option<&'a Path>,
    ) -> BoxFuture<'a, Result<PathBuf, CameraError>> {
        async move {
            self.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_commit {
                Err(CameraError::StorageError("album full".to_string()))
            } else {
                Ok(processed.to_path_buf())
            }
        }
        .boxed()
    }
}

fn storage(scratch: &TempDir, album: &TempDir) -> StorageConfig {
    StorageConfig {
        scratch_directory: scratch.path().to_path_buf(),
        album_directory: album.path().to_path_buf(),
        auto_organize_by_date: false,
        ..StorageConfig::default()
    }
}

fn full_set(id: i64) -> DeliverableSet {
    let id = CorrelationId(id);
    DeliverableSet {
        id,
        raw: Some(Deliverable::raw(synthetic_raw_payload(id, 128))),
        processed: Some(Deliverable::processed(synthetic_processed_payload(id, 128))),
    }
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_commit_writes_album_and_clears_scratch() {
    let scratch = tempdir().unwrap();
    let album = tempdir().unwrap();
    let config = storage(&scratch, &album);
    let persistence = FilePersistence::from_config(&config);

    let outcome = persistence.persist(full_set(7)).await;

    assert!(outcome.success);
    let location = outcome.location.unwrap();
    assert!(location.starts_with(album.path()));
    assert_eq!(location.extension().unwrap(), "heic");
    let dng_files = std::fs::read_dir(album.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |x| x == "dng"))
        .count();
    assert_eq!(dng_files, 1);
    assert_eq!(count_files(album.path()), 2);
    assert_eq!(count_files(&config.scratch_dir()), 0);
}

#[tokio::test]
async fn test_intermediates_kept_when_configured() {
    let scratch = tempdir().unwrap();
    let album = tempdir().unwrap();
    let config = StorageConfig {
        delete_intermediates: false,
        ..storage(&scratch, &album)
    };
    let persistence = FilePersistence::from_config(&config);

    assert!(persistence.persist(full_set(1)).await.success);
    assert_eq!(count_files(&config.scratch_dir()), 2);
}

#[tokio::test]
async fn test_denied_media_store_reports_failure() {
    let scratch = tempdir().unwrap();
    let album = tempdir().unwrap();
    let config = storage(&scratch, &album);
    let store = Arc::new(ScriptedStore {
        grant: false,
        fail_commit: false,
        commits: AtomicUsize::new(0),
    });
    let persistence = FilePersistence::new(config.clone(), store.clone());

    assert_eq!(persistence.persist(full_set(2)).await, PersistOutcome::failed());
    assert_eq!(store.commits.load(Ordering::SeqCst), 0);
    // Intermediates are removed whatever the commit result.
    assert_eq!(count_files(&config.scratch_dir()), 0);
}

#[tokio::test]
async fn test_failed_commit_reports_failure() {
    let scratch = tempdir().unwrap();
    let album = tempdir().unwrap();
    let store = Arc::new(ScriptedStore {
        grant: true,
        fail_commit: true,
        commits: AtomicUsize::new(0),
    });
    let persistence = FilePersistence::new(storage(&scratch, &album), store.clone());

    assert!(!persistence.persist(full_set(3)).await.success);
    assert_eq!(store.commits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_set_commits_nothing() {
    let scratch = tempdir().unwrap();
    let album = tempdir().unwrap();
    let persistence = FilePersistence::from_config(&storage(&scratch, &album));

    let outcome = persistence.persist(DeliverableSet::empty(CorrelationId(4))).await;
    assert!(!outcome.success);
    assert_eq!(count_files(album.path()), 0);
}

#[tokio::test]
async fn test_empty_payload_is_not_written() {
    let scratch = tempdir().unwrap();
    let album = tempdir().unwrap();
    let persistence = FilePersistence::from_config(&storage(&scratch, &album));

    let set = DeliverableSet {
        id: CorrelationId(5),
        raw: None,
        processed: Some(Deliverable::processed(Vec::<u8>::new())),
    };
    assert!(!persistence.persist(set).await.success);
    assert_eq!(count_files(album.path()), 0);
}

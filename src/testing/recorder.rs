//! In-memory persistence collaborator

use crate::persistence::{PersistOutcome, Persistence};
use crate::types::{CorrelationId, DeliverableSet};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// Records every finalized set instead of writing files.
///
/// `started` is appended when persistence begins and `persisted` when it
/// ends, so tests can observe overlapping saves. Per-id delays simulate a
/// slow media store.
#[derive(Default)]
pub struct RecordingPersistence {
    started: Mutex<Vec<CorrelationId>>,
    persisted: Mutex<Vec<DeliverableSet>>,
    delays: Mutex<HashMap<CorrelationId, Duration>>,
    fail: AtomicBool,
    notify: Notify,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report failure for every following set
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Hold persistence of capture `id` for `delay`
    pub fn delay(&self, id: CorrelationId, delay: Duration) {
        lock(&self.delays).insert(id, delay);
    }

    pub fn started(&self) -> Vec<CorrelationId> {
        lock(&self.started).clone()
    }

    pub fn persisted(&self) -> Vec<DeliverableSet> {
        lock(&self.persisted).clone()
    }

    pub fn persisted_count(&self) -> usize {
        lock(&self.persisted).len()
    }

    /// Wait until at least `count` sets were persisted; false on timeout
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.persisted_count() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Location reported for capture `id`
    pub fn location_for(id: CorrelationId) -> PathBuf {
        PathBuf::from(format!("memory/{}.heic", id.0))
    }

    async fn record(&self, set: DeliverableSet) -> PersistOutcome {
        let id = set.id;
        lock(&self.started).push(id);

        let delay = lock(&self.delays).get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let success = !self.fail.load(Ordering::SeqCst) && set.processed.is_some();
        lock(&self.persisted).push(set);
        self.notify.notify_waiters();

        if success {
            PersistOutcome::saved(Self::location_for(id))
        } else {
            PersistOutcome::failed()
        }
    }
}

impl Persistence for RecordingPersistence {
    fn persist(&self, set: DeliverableSet) -> BoxFuture<'_, PersistOutcome> {
        self.record(set).boxed()
    }
}

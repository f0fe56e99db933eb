//! Persistence collaborator
//!
//! A finalized [`DeliverableSet`] is handed to a [`Persistence`]
//! implementation off the correlation event path. The collaborator reports
//! one success flag and, when something was committed, the location of the
//! saved artifact.

mod file;
mod media_store;

pub use file::FilePersistence;
pub use media_store::{DirectoryMediaStore, MediaStore};

use crate::types::DeliverableSet;
use futures::future::BoxFuture;
use std::path::PathBuf;

/// Result of persisting one deliverable set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub success: bool,
    /// Location of the committed processed artifact
    pub location: Option<PathBuf>,
}

impl PersistOutcome {
    pub fn saved(location: impl Into<PathBuf>) -> Self {
        Self {
            success: true,
            location: Some(location.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            location: None,
        }
    }
}

/// Durable storage for finalized captures.
///
/// Invoked once per finalized capture, possibly concurrently for different
/// captures.
pub trait Persistence: Send + Sync {
    fn persist(&self, set: DeliverableSet) -> BoxFuture<'_, PersistOutcome>;
}

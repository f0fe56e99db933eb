//! CrabShutter: still-capture coordination for callback-driven camera hardware
//!
//! The hardware reports each still capture as a stream of independent
//! callbacks: a begin event, a raw and/or a processed image in any order,
//! and a terminal event. This crate turns that stream into one awaited
//! boolean per capture and one paired, persisted artifact.
//!
//! # Features
//! - Device catalog with primary/front/back classification
//! - Session controller with a reuse fast path, lens switching with
//!   rollback, and the raw Zoom Guard
//! - Correlation engine pairing raw and processed deliverables by id
//! - File persistence committing into a media store
//! - Simulated hardware for offline testing
//!
//! # Usage
//! ```rust,no_run
//! use crabshutter::testing::{RecordingPersistence, SimulatedBackend};
//! use crabshutter::{CameraApp, CameraSettings, PresetPermissionGate};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), crabshutter::CameraError> {
//! let app = CameraApp::new(
//!     Arc::new(SimulatedBackend::new()),
//!     Arc::new(PresetPermissionGate::granted()),
//!     Arc::new(RecordingPersistence::new()),
//!     CameraSettings::default(),
//! )?;
//! app.setup_camera().await?;
//! let saved = app.capture().await;
//! # let _ = saved;
//! # Ok(())
//! # }
//! ```
pub mod app;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod correlation;
pub mod errors;
pub mod permissions;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod signals;
pub mod types;

// Testing utilities - simulated hardware for offline testing
pub mod testing;

// Re-exports for convenience
pub use app::CameraApp;
pub use catalog::DeviceCatalog;
pub use completion::{capture_request, CaptureCompletion, CaptureRequestHandle};
pub use config::{CameraSettings, CrabShutterConfig, StorageConfig};
pub use correlation::{CaptureEvent, CorrelationEngine, Transition};
pub use errors::CameraError;
pub use permissions::{PermissionGate, PermissionStatus, PresetPermissionGate};
pub use persistence::{DirectoryMediaStore, FilePersistence, MediaStore, PersistOutcome, Persistence};
pub use platform::{CaptureBackend, HardwareSession};
pub use session::{CameraSession, SessionState, SwitchOutcome};
pub use types::{
    CorrelationId, Deliverable, DeliverableKind, DeliverableSet, DeviceDescriptor,
    DevicePosition, DeviceType, PhotoSettings, PreviewFrame,
};

/// Initialize logging, defaulting to `crabshutter=info` when `RUST_LOG` is unset
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("crabshutter=info"),
    )
    .try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

use thiserror::Error;

/// Failures surfaced by the session controller, catalog and persistence layers.
///
/// Correlation anomalies (orphaned or duplicate deliverables) are never
/// represented here: they are logged and discarded by the correlation engine.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Permission denied error: {0}")]
    PermissionDenied(String),
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Camera configuration error: {0}")]
    ConfigurationError(String),
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("Invalid session state: {0}")]
    InvalidState(String),
    #[error("Hardware error: {0}")]
    HardwareError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// Configuration errors abort an operation before any hardware call.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            CameraError::ConfigurationError(_) | CameraError::DeviceNotFound(_)
        )
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, CameraError::PermissionDenied(_))
    }
}

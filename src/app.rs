//! Application facade
//!
//! The flow a camera screen drives: set up on appear, stop on disappear,
//! capture on shutter, and the capture preference toggles.

use crate::config::{CameraSettings, CrabShutterConfig};
use crate::errors::CameraError;
use crate::permissions::PermissionGate;
use crate::persistence::{FilePersistence, Persistence};
use crate::platform::CaptureBackend;
use crate::session::{format::NEUTRAL_ZOOM, CameraSession};
use crate::types::DeviceDescriptor;
use std::sync::Arc;

pub struct CameraApp {
    session: CameraSession,
    permissions: Arc<dyn PermissionGate>,
}

impl CameraApp {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        permissions: Arc<dyn PermissionGate>,
        persistence: Arc<dyn Persistence>,
        settings: CameraSettings,
    ) -> Result<Self, CameraError> {
        let session = CameraSession::new(backend, permissions.clone(), persistence, settings)?;
        Ok(Self {
            session,
            permissions,
        })
    }

    /// App persisting through files and the configured album directory
    pub fn from_config(
        backend: Arc<dyn CaptureBackend>,
        permissions: Arc<dyn PermissionGate>,
        config: &CrabShutterConfig,
    ) -> Result<Self, CameraError> {
        config
            .validate()
            .map_err(CameraError::ConfigurationError)?;
        let persistence = Arc::new(FilePersistence::from_config(&config.storage));
        Self::new(backend, permissions, persistence, config.camera.clone())
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    /// Request access, bind the primary camera with a fresh session and
    /// apply the raw-shift fix when enabled. Returns the bound device.
    pub async fn setup_camera(&self) -> Result<DeviceDescriptor, CameraError> {
        if !self.permissions.request_authorization().await {
            return Err(CameraError::PermissionDenied(
                "camera access not granted".to_string(),
            ));
        }

        let devices = self.session.discover_devices();
        if devices.is_empty() {
            return Err(CameraError::DeviceNotFound(
                "no capture devices available".to_string(),
            ));
        }
        let main = devices
            .into_iter()
            .find(|d| d.is_primary)
            .ok_or_else(|| CameraError::DeviceNotFound("no primary camera".to_string()))?;

        self.session.setup_session(&main, true).await?;

        if self.session.settings().fix_raw_shift {
            self.apply_raw_shift_fix();
        }

        log::info!("Camera ready with {}", main);
        Ok(main)
    }

    pub async fn stop_camera(&self) -> bool {
        self.session.stop()
    }

    pub async fn capture(&self) -> bool {
        self.session.capture_photo().await
    }

    /// Toggle the raw framing workaround. Enabling it moves the zoom off
    /// neutral, which also turns raw capture off.
    pub fn set_fix_raw_shift(&self, enabled: bool) {
        self.update_settings(|s| s.fix_raw_shift = enabled);
        if enabled {
            self.apply_raw_shift_fix();
        } else {
            self.session.zoom(NEUTRAL_ZOOM, false);
        }
    }

    pub fn set_use_raw(&self, enabled: bool) {
        self.update_settings(|s| s.use_raw = enabled);
    }

    pub fn set_fix_zoomed_exposure(&self, enabled: bool) {
        self.update_settings(|s| s.fix_zoomed_exposure = enabled);
    }

    fn apply_raw_shift_fix(&self) {
        let factor = self.session.settings().raw_shift_zoom_factor;
        self.session.zoom(factor, false);
    }

    fn update_settings(&self, update: impl FnOnce(&mut CameraSettings)) {
        let mut settings = self.session.settings();
        update(&mut settings);
        self.session.set_settings(settings);
    }
}

//! Configuration management for CrabShutter
//!
//! Provides configuration loading, saving, and validation for the capture
//! preferences read by the session controller and the storage layout used
//! by the file persistence collaborator.

use crate::errors::CameraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabShutterConfig {
    pub camera: CameraSettings,
    pub storage: StorageConfig,
}

/// Capture preferences consulted on every still capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Request a raw deliverable alongside the processed one when possible
    pub use_raw: bool,
    /// Nudge the zoom factor off 1.0 to work around the raw framing shift
    pub fix_raw_shift: bool,
    /// Capture at the smallest photo tier when zoomed past 1.0
    pub fix_zoomed_exposure: bool,
    /// Zoom ramp rate used for animated zoom changes
    pub zoom_ramp_rate: f32,
    /// Zoom factor applied when `fix_raw_shift` is enabled
    pub raw_shift_zoom_factor: f64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            use_raw: true,
            fix_raw_shift: false,
            fix_zoomed_exposure: false,
            zoom_ramp_rate: 30.0,
            raw_shift_zoom_factor: 1.0001,
        }
    }
}

/// Storage layout for intermediate files and the media album
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding intermediate files before they are committed
    pub scratch_directory: PathBuf,
    /// Sub-directory of `scratch_directory` for this application
    pub scratch_subdir: String,
    /// Extension for raw deliverables
    pub raw_extension: String,
    /// Extension for processed deliverables
    pub processed_extension: String,
    /// Album directory used by the directory media store
    pub album_directory: PathBuf,
    /// Auto-organize committed files by date
    pub auto_organize_by_date: bool,
    /// chrono format string for date folders
    pub date_format: String,
    /// Remove intermediate files once the commit attempt is over
    pub delete_intermediates: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            scratch_directory: std::env::temp_dir().join("crabshutter"),
            scratch_subdir: "demo".to_string(),
            raw_extension: "dng".to_string(),
            processed_extension: "heic".to_string(),
            album_directory: PathBuf::from("./captures"),
            auto_organize_by_date: true,
            date_format: "%Y-%m-%d".to_string(),
            delete_intermediates: true,
        }
    }
}

impl StorageConfig {
    /// Directory intermediate files are written to
    pub fn scratch_dir(&self) -> PathBuf {
        if self.scratch_subdir.is_empty() {
            self.scratch_directory.clone()
        } else {
            self.scratch_directory.join(&self.scratch_subdir)
        }
    }
}

impl CrabShutterConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CameraError::InitializationError(format!("Failed to read config file: {}", e))
        })?;

        let config: CrabShutterConfig = toml::from_str(&contents).map_err(|e| {
            CameraError::InitializationError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CameraError::InitializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabshutter.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.zoom_ramp_rate.is_nan() || self.camera.zoom_ramp_rate <= 0.0 {
            return Err("Zoom ramp rate must be positive".to_string());
        }
        if self.camera.raw_shift_zoom_factor.is_nan() || self.camera.raw_shift_zoom_factor <= 0.0 {
            return Err("Raw shift zoom factor must be positive".to_string());
        }

        if self.storage.raw_extension.is_empty() || self.storage.processed_extension.is_empty() {
            return Err("File extensions must not be empty".to_string());
        }
        if self.storage.date_format.is_empty() {
            return Err("Date format must not be empty".to_string());
        }

        Ok(())
    }
}

//! Hardware abstraction
//!
//! The capture hardware is callback driven: the backend owns device
//! discovery and the hardware session, and reports capture lifecycle
//! events and preview frames through the [`SessionSinks`] it is given when
//! a session is created. Everything above this module only talks to these
//! traits, so a platform backend and the simulated backend in
//! [`crate::testing`] are interchangeable.

mod sinks;

pub use sinks::{EventSink, FrameSink, SessionSinks};

use crate::errors::CameraError;
use crate::types::{
    CorrelationId, DevicePosition, DeviceType, Dimensions, HardwareDevice, PhotoCodec,
    PhotoSettings, RawPixelFormat, VideoOrientation,
};

/// Opaque handle to a device input attached to a hardware session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputHandle(pub u64);

/// Opaque handle to an output attached to a hardware session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Still photo output producing raw and processed deliverables
    Photo,
    /// Video data output feeding the preview sink
    VideoData,
}

/// Output tuning applied after (re)binding a device
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfiguration {
    /// Turn on the enhanced raw variant where the output supports it
    pub enhanced_raw_if_supported: bool,
    /// Turn on distortion correction where the output supports it
    pub distortion_correction_if_supported: bool,
    pub prioritize_quality: bool,
    /// Largest photo tier of the bound device, when known
    pub max_photo_dimensions: Option<Dimensions>,
    /// Ask the video output for preview-sized buffers
    pub preview_sized_buffers: bool,
    pub orientation: VideoOrientation,
}

impl OutputConfiguration {
    /// Configuration used for every bind: quality first, preview-sized
    /// frames, portrait orientation, largest available photo tier.
    pub fn for_device(supported_dimensions: &[Dimensions]) -> Self {
        Self {
            enhanced_raw_if_supported: true,
            distortion_correction_if_supported: true,
            prioritize_quality: true,
            max_photo_dimensions: supported_dimensions.last().copied(),
            preview_sized_buffers: true,
            orientation: VideoOrientation::Portrait,
        }
    }
}

/// Device discovery and session factory
pub trait CaptureBackend: Send + Sync {
    /// The platform default device of the given type and position
    fn default_device(
        &self,
        device_type: DeviceType,
        position: DevicePosition,
    ) -> Option<HardwareDevice>;

    /// All devices of the given types at the given position
    fn discover(&self, device_types: &[DeviceType], position: DevicePosition)
        -> Vec<HardwareDevice>;

    /// Create an empty hardware session that reports into `sinks`
    fn create_session(&self, sinks: SessionSinks) -> Result<Box<dyn HardwareSession>, CameraError>;
}

/// A live hardware capture session.
///
/// Only mutated by the session controller inside its configuration
/// critical section. Calls between `begin_configuration` and
/// `commit_configuration` are applied atomically by the hardware.
pub trait HardwareSession: Send {
    fn begin_configuration(&mut self);

    fn commit_configuration(&mut self);

    /// Open the device identified by `model_id` and attach it as input
    fn add_input(&mut self, model_id: &str) -> Result<InputHandle, CameraError>;

    fn remove_input(&mut self, input: InputHandle);

    fn add_output(&mut self, kind: OutputKind) -> Result<OutputHandle, CameraError>;

    fn remove_output(&mut self, output: OutputHandle);

    fn configure_outputs(&mut self, configuration: &OutputConfiguration);

    fn start_running(&mut self);

    fn stop_running(&mut self);

    fn is_running(&self) -> bool;

    /// Raw formats the photo output can currently deliver
    fn available_raw_formats(&self) -> Vec<RawPixelFormat>;

    /// Embedded thumbnail codecs offered for a raw format
    fn raw_thumbnail_codecs(&self, format: RawPixelFormat) -> Vec<PhotoCodec>;

    /// Photo tiers of the bound device, smallest first
    fn supported_max_photo_dimensions(&self) -> Vec<Dimensions>;

    /// Apply a zoom factor, ramping at `ramp_rate` when given
    fn set_zoom_factor(&mut self, factor: f64, ramp_rate: Option<f32>) -> Result<(), CameraError>;

    /// Issue a still capture; lifecycle events follow on the event sink
    fn capture_photo(&mut self, settings: &PhotoSettings) -> Result<CorrelationId, CameraError>;
}

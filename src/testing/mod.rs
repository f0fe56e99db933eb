//! Testing utilities for CrabShutter
//!
//! A simulated capture backend, synthetic payloads and an in-memory
//! persistence collaborator, so every layer can run without camera
//! hardware.

pub mod recorder;
pub mod simulated;
pub mod synthetic_data;

pub use recorder::RecordingPersistence;
pub use simulated::{CaptureScript, SimulatedBackend, SimulatedStats};
pub use synthetic_data::{
    synthetic_preview_frame, synthetic_processed_payload, synthetic_raw_payload, BAYER_RAW_FOURCC,
    ENHANCED_RAW_FOURCC,
};

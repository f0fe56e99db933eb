//! Capture session controller
//!
//! Owns the hardware session and its device bindings, runs every
//! reconfiguration as a critical section, and turns a still capture into a
//! single awaited boolean.

mod controller;
pub mod format;
mod preview;

pub use controller::{ActiveBinding, ActiveOutputs, CameraSession, SessionState, SwitchOutcome};

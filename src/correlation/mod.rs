//! Capture correlation
//!
//! Hardware reports each still capture as a begin event, zero or more
//! deliverables (raw and/or processed, in any order) and a terminal event.
//! [`CorrelationEngine`] pairs those by correlation id; the driver runs it
//! on a single serial task, hands finished sets to persistence and resolves
//! the caller's capture handle.

mod driver;
mod engine;
mod events;

pub(crate) use driver::CorrelationDriver;
pub use engine::{Anomaly, CorrelationEngine, FailureReason, Transition};
pub(crate) use events::EngineMessage;
pub use events::CaptureEvent;

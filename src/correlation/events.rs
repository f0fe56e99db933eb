use crate::completion::CaptureCompletion;
use crate::types::{CorrelationId, Deliverable};

/// Capture lifecycle callbacks from the hardware, flattened into one
/// ordered stream.
///
/// For a single id the hardware sends `Begin`, then zero or more
/// `DeliverableArrived`, then at most one of `TerminalFailure` / `Finished`.
/// Any other order is handled as an anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The hardware accepted the request and announced how many
    /// deliverables it will produce
    Begin { id: CorrelationId, expected: usize },
    DeliverableArrived {
        id: CorrelationId,
        deliverable: Deliverable,
    },
    /// The hardware reported an error for the request
    TerminalFailure { id: CorrelationId, reason: String },
    /// The hardware finished the request without error
    Finished { id: CorrelationId },
}

impl CaptureEvent {
    pub fn id(&self) -> CorrelationId {
        match self {
            CaptureEvent::Begin { id, .. }
            | CaptureEvent::DeliverableArrived { id, .. }
            | CaptureEvent::TerminalFailure { id, .. }
            | CaptureEvent::Finished { id } => *id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CaptureEvent::Begin { .. } => "begin",
            CaptureEvent::DeliverableArrived { .. } => "deliverable",
            CaptureEvent::TerminalFailure { .. } => "failure",
            CaptureEvent::Finished { .. } => "finished",
        }
    }
}

/// Everything the correlation driver consumes, in arrival order
#[derive(Debug)]
pub(crate) enum EngineMessage {
    Hardware(CaptureEvent),
    /// Register the waiter of the capture about to be issued
    Arm(CaptureCompletion),
    /// The hardware accepted the armed capture under this id
    Bind(CorrelationId),
    /// The capture never reached the hardware; fail the armed waiter
    Disarm,
    /// A finalized set's persistence step ended
    Persisted { id: CorrelationId, success: bool },
}

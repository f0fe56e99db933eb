use crate::correlation::{CaptureEvent, EngineMessage};
use crate::types::PreviewFrame;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receives preview frames from the hardware's frame delivery thread.
///
/// Implementations must not block; delivery is fire-and-forget.
pub trait FrameSink: Send + Sync {
    fn deliver(&self, frame: PreviewFrame);
}

/// Feeds capture lifecycle events into the correlation engine's serial
/// queue. Cloneable; all clones feed the same queue, and events sent from
/// one thread keep their relative order.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EngineMessage>,
}

impl EventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<EngineMessage>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, event: CaptureEvent) {
        if self.tx.send(EngineMessage::Hardware(event)).is_err() {
            log::warn!("Capture event dropped: correlation engine has shut down");
        }
    }
}

/// Delivery endpoints handed to a backend when a session is created
#[derive(Clone)]
pub struct SessionSinks {
    pub events: EventSink,
    pub frames: Arc<dyn FrameSink>,
}

use crate::platform::FrameSink;
use crate::signals::SessionSignals;
use crate::types::PreviewFrame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Routes hardware preview frames to the UI callbacks.
///
/// Runs on the hardware's frame thread; never blocks.
pub(crate) struct PreviewDispatcher {
    signals: Arc<SessionSignals>,
    suppressed: AtomicBool,
    first_frame_sent: AtomicBool,
}

impl PreviewDispatcher {
    pub fn new(signals: Arc<SessionSignals>) -> Self {
        Self {
            signals,
            suppressed: AtomicBool::new(false),
            first_frame_sent: AtomicBool::new(false),
        }
    }

    /// Drop incoming frames while a lens switch is in progress
    pub fn set_suppressed(&self, suppressed: bool) {
        self.suppressed.store(suppressed, Ordering::SeqCst);
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// Re-arm the first-frame signal for the next running transition
    pub fn reset_first_frame(&self) {
        self.first_frame_sent.store(false, Ordering::SeqCst);
    }

    /// Send the "cleared" value to the preview sink
    pub fn clear(&self) {
        self.signals.emit_preview(None);
    }
}

impl FrameSink for PreviewDispatcher {
    fn deliver(&self, frame: PreviewFrame) {
        if self.is_suppressed() {
            log::trace!("Preview frame {} dropped during lens switch", frame.sequence);
            return;
        }

        if !self.signals.has_preview() {
            return;
        }

        if self.signals.has_first_frame()
            && self
                .first_frame_sent
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            self.signals.emit_first_frame();
        }

        self.signals.emit_preview(Some(frame));
    }
}

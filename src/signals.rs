//! UI-facing notification hooks
//!
//! Callbacks are invoked on the thread that produced the event (the
//! hardware's frame thread for preview, the correlation driver for capture
//! begin). They must return quickly and hand heavy work elsewhere.

use crate::types::PreviewFrame;
use std::sync::{Arc, RwLock};

/// Receives each preview frame, or `None` once when the session stops
pub type PreviewCallback = Arc<dyn Fn(Option<PreviewFrame>) + Send + Sync>;

pub type SignalCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct SessionSignals {
    preview: RwLock<Option<PreviewCallback>>,
    first_frame: RwLock<Option<SignalCallback>>,
    begin_capture: RwLock<Option<SignalCallback>>,
}

impl SessionSignals {
    pub fn set_preview(&self, callback: Option<PreviewCallback>) {
        if let Ok(mut slot) = self.preview.write() {
            *slot = callback;
        }
    }

    pub fn set_first_frame(&self, callback: Option<SignalCallback>) {
        if let Ok(mut slot) = self.first_frame.write() {
            *slot = callback;
        }
    }

    pub fn set_begin_capture(&self, callback: Option<SignalCallback>) {
        if let Ok(mut slot) = self.begin_capture.write() {
            *slot = callback;
        }
    }

    pub fn has_preview(&self) -> bool {
        self.preview.read().map(|s| s.is_some()).unwrap_or(false)
    }

    pub fn has_first_frame(&self) -> bool {
        self.first_frame.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Returns false when no preview callback is installed
    pub fn emit_preview(&self, frame: Option<PreviewFrame>) -> bool {
        match Self::current(&self.preview) {
            Some(callback) => {
                callback(frame);
                true
            }
            None => false,
        }
    }

    pub fn emit_first_frame(&self) -> bool {
        match Self::current(&self.first_frame) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    pub fn emit_begin_capture(&self) -> bool {
        match Self::current(&self.begin_capture) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    // Clone out of the lock so callbacks may re-register themselves.
    fn current<T: Clone>(slot: &RwLock<Option<T>>) -> Option<T> {
        slot.read().ok().and_then(|s| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_without_callback_reports_false() {
        let signals = SessionSignals::default();
        assert!(!signals.emit_preview(None));
        assert!(!signals.emit_first_frame());
        assert!(!signals.emit_begin_capture());
    }

    #[test]
    fn test_callback_may_replace_itself() {
        let signals = Arc::new(SessionSignals::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let inner_signals = signals.clone();
        let inner_calls = calls.clone();
        signals.set_begin_capture(Some(Arc::new(move || {
            inner_calls.fetch_add(1, Ordering::SeqCst);
            inner_signals.set_begin_capture(None);
        })));

        assert!(signals.emit_begin_capture());
        assert!(!signals.emit_begin_capture());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

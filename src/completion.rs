//! Single-shot capture result channel
//!
//! A still capture reports its outcome exactly once. The resolving side,
//! [`CaptureCompletion`], is consumed by [`CaptureCompletion::resolve`], so a
//! second resolution does not type-check. The waiting side,
//! [`CaptureRequestHandle`], reads `false` if the completion is dropped
//! without being resolved.

use tokio::sync::oneshot;

/// Create a linked completion/handle pair for one capture request
pub fn capture_request() -> (CaptureCompletion, CaptureRequestHandle) {
    let (tx, rx) = oneshot::channel();
    (CaptureCompletion { tx }, CaptureRequestHandle { rx })
}

/// Resolving half, owned by whoever observes the capture's terminal event
#[derive(Debug)]
pub struct CaptureCompletion {
    tx: oneshot::Sender<bool>,
}

impl CaptureCompletion {
    pub fn resolve(self, success: bool) {
        if self.tx.send(success).is_err() {
            log::debug!("Capture result {} dropped: caller stopped waiting", success);
        }
    }

    /// True once the waiting side has gone away
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Waiting half, held by the caller of `capture_photo`
#[derive(Debug)]
pub struct CaptureRequestHandle {
    rx: oneshot::Receiver<bool>,
}

impl CaptureRequestHandle {
    pub async fn wait(self) -> bool {
        self.rx.await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn test_handle_pending_until_resolved() {
        let (completion, handle) = capture_request();
        let mut wait = task::spawn(handle.wait());

        assert_pending!(wait.poll());
        completion.resolve(true);
        assert!(wait.is_woken());
        assert_ready_eq!(wait.poll(), true);
    }

    #[test]
    fn test_dropped_completion_reads_as_failure() {
        let (completion, handle) = capture_request();
        let mut wait = task::spawn(handle.wait());

        drop(completion);
        assert_ready_eq!(wait.poll(), false);
    }

    #[test]
    fn test_resolve_after_caller_left_is_harmless() {
        let (completion, handle) = capture_request();
        drop(handle);
        assert!(completion.is_abandoned());
        completion.resolve(true);
    }
}

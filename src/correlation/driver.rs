use super::engine::{Anomaly, CorrelationEngine, FailureReason, Transition};
use super::events::{CaptureEvent, EngineMessage};
use crate::completion::CaptureCompletion;
use crate::persistence::Persistence;
use crate::signals::SessionSignals;
use crate::types::{CorrelationId, DeliverableSet};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

/// Waiter of the capture currently in flight.
///
/// Bound to the correlation id the hardware call returned. Events emitted
/// while that call was still running settle before the bind arrives; their
/// outcomes are held in `early` and only the bound id's is kept.
struct ArmedCapture {
    completion: CaptureCompletion,
    bound: Option<CorrelationId>,
    early: HashMap<CorrelationId, bool>,
}

/// Outputs the UI observes: last saved artifact and the processing flag
struct Publisher {
    saved_file: watch::Sender<Option<PathBuf>>,
    processing: watch::Sender<bool>,
    in_flight: AtomicUsize,
}

impl Publisher {
    fn begin_processing(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.processing.send_replace(true);
    }

    fn finish_processing(&self, saved: Option<PathBuf>) {
        if let Some(path) = saved {
            self.saved_file.send_replace(Some(path));
        }
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.processing.send_replace(false);
        }
    }
}

/// Receivers and sender returned by [`CorrelationDriver::spawn`]
pub(crate) struct DriverHandle {
    pub tx: mpsc::UnboundedSender<EngineMessage>,
    pub saved_file: watch::Receiver<Option<PathBuf>>,
    pub processing: watch::Receiver<bool>,
}

/// Serial execution context for capture delegate events.
///
/// Owns the correlation engine outright; the pending table is never shared,
/// so no locking is needed around it. Persistence runs on separate tasks
/// so a slow save never delays events for other ids.
pub(crate) struct CorrelationDriver {
    engine: CorrelationEngine,
    rx: mpsc::UnboundedReceiver<EngineMessage>,
    waiter: Option<ArmedCapture>,
    persistence: Arc<dyn Persistence>,
    signals: Arc<SessionSignals>,
    publisher: Arc<Publisher>,
    /// Ids whose persistence task has not reported back yet
    persisting: HashSet<CorrelationId>,
    reply: mpsc::WeakUnboundedSender<EngineMessage>,
    runtime: Handle,
}

impl CorrelationDriver {
    pub fn spawn(
        runtime: &Handle,
        persistence: Arc<dyn Persistence>,
        signals: Arc<SessionSignals>,
    ) -> DriverHandle {
        let (driver, handle) = Self::new(runtime, persistence, signals);
        runtime.spawn(driver.run());
        handle
    }

    fn new(
        runtime: &Handle,
        persistence: Arc<dyn Persistence>,
        signals: Arc<SessionSignals>,
    ) -> (Self, DriverHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (saved_tx, saved_rx) = watch::channel(None);
        let (processing_tx, processing_rx) = watch::channel(false);

        let driver = CorrelationDriver {
            engine: CorrelationEngine::new(),
            rx,
            waiter: None,
            persistence,
            signals,
            publisher: Arc::new(Publisher {
                saved_file: saved_tx,
                processing: processing_tx,
                in_flight: AtomicUsize::new(0),
            }),
            persisting: HashSet::new(),
            reply: tx.downgrade(),
            runtime: runtime.clone(),
        };

        let handle = DriverHandle {
            tx,
            saved_file: saved_rx,
            processing: processing_rx,
        };
        (driver, handle)
    }

    async fn run(mut self) {
        log::debug!("Correlation driver started");
        while let Some(message) = self.rx.recv().await {
            match message {
                EngineMessage::Arm(completion) => self.arm(completion),
                EngineMessage::Bind(id) => self.bind(id),
                EngineMessage::Disarm => {
                    if let Some(armed) = self.waiter.take() {
                        armed.completion.resolve(false);
                    }
                }
                EngineMessage::Hardware(event) => self.handle_event(event),
                EngineMessage::Persisted { id, success } => {
                    self.persisting.remove(&id);
                    self.settle(id, success);
                }
            }
        }
        log::debug!("Correlation driver stopped: all event sources closed");
    }

    fn arm(&mut self, completion: CaptureCompletion) {
        if let Some(previous) = self.waiter.take() {
            log::warn!(
                "Capture armed while another waiter (bound to {:?}) was unresolved; failing the older one",
                previous.bound
            );
            previous.completion.resolve(false);
        }
        self.waiter = Some(ArmedCapture {
            completion,
            bound: None,
            early: HashMap::new(),
        });
    }

    fn bind(&mut self, id: CorrelationId) {
        let Some(mut armed) = self.waiter.take() else {
            log::debug!("Bind for {} with no armed capture", id);
            return;
        };
        match armed.early.remove(&id) {
            Some(success) => armed.completion.resolve(success),
            None => {
                armed.bound = Some(id);
                armed.early.clear();
                self.waiter = Some(armed);
            }
        }
    }

    /// Route the final outcome of `id` to the waiter that owns it
    fn settle(&mut self, id: CorrelationId, success: bool) {
        match self.waiter.as_ref().map(|armed| armed.bound) {
            Some(Some(bound)) if bound == id => {
                if let Some(armed) = self.waiter.take() {
                    armed.completion.resolve(success);
                }
            }
            Some(None) => {
                if let Some(armed) = self.waiter.as_mut() {
                    armed.early.entry(id).or_insert(success);
                }
            }
            _ => log::debug!("Outcome of {} has no waiting capture", id),
        }
    }

    fn handle_event(&mut self, event: CaptureEvent) {
        log::debug!("Capture event {} for {}", event.name(), event.id());

        if let CaptureEvent::Begin { .. } = &event {
            self.signals.emit_begin_capture();
        }

        match self.engine.apply(event) {
            Transition::Began {
                id,
                expected,
                replaced,
            } => {
                if replaced {
                    log::warn!("Begin for {} replaced an existing pending set", id);
                }
                if expected > 2 {
                    log::warn!(
                        "Begin for {} expects {} deliverables; at most one raw and one processed can arrive",
                        id,
                        expected
                    );
                }
                log::info!("Capture {} began, expected deliverables: {}", id, expected);
            }
            Transition::Accumulated {
                id,
                received,
                expected,
            } => {
                log::info!(
                    "Capture {} incomplete, current count: {}, expected: {}",
                    id,
                    received,
                    expected
                );
            }
            Transition::Finalize(set) => self.finalize(set),
            Transition::Failed {
                id,
                reason,
                had_pending,
            } => {
                match &reason {
                    FailureReason::Hardware(message) => {
                        log::error!("Capture {} failed in hardware: {}", id, message)
                    }
                    FailureReason::Incomplete { received, expected } => log::warn!(
                        "Capture {} finished with {} of {} deliverables; dropping it",
                        id,
                        received,
                        expected
                    ),
                }
                if !had_pending {
                    log::debug!("No pending set was tracked for failed capture {}", id);
                }
                self.settle_unless_persisting(id, false);
            }
            Transition::Completed { id } => self.settle_unless_persisting(id, false),
            Transition::Discarded { id, anomaly } => match anomaly {
                Anomaly::UnknownCorrelation => log::warn!(
                    "Deliverable for {} discarded: no pending capture (already finalized or never begun)",
                    id
                ),
                Anomaly::DuplicateKind(kind) => {
                    log::warn!("Duplicate {} deliverable for {} discarded", kind, id)
                }
            },
        }
    }

    // A finalized id is settled by its persistence result, never by a
    // later hardware event.
    fn settle_unless_persisting(&mut self, id: CorrelationId, success: bool) {
        if self.persisting.contains(&id) {
            log::debug!("Capture {} already finalized, awaiting persistence", id);
            return;
        }
        self.settle(id, success);
    }

    fn finalize(&mut self, set: DeliverableSet) {
        let id = set.id;
        log::info!("Capture {} complete with {:?}, persisting", id, set.kinds());

        self.persisting.insert(id);
        self.publisher.begin_processing();
        let persistence = self.persistence.clone();
        let publisher = self.publisher.clone();
        let reply = self.reply.clone();

        self.runtime.spawn(async move {
            let outcome = persistence.persist(set).await;
            if outcome.success {
                log::info!("Capture {} persisted to {:?}", id, outcome.location);
            } else {
                log::error!("Capture {} could not be persisted", id);
            }
            let success = outcome.success;
            publisher.finish_processing(outcome.location);

            if let Some(tx) = reply.upgrade() {
                let _ = tx.send(EngineMessage::Persisted { id, success });
            }
        });
    }
}

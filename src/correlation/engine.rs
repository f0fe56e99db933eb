use super::events::CaptureEvent;
use crate::types::{CorrelationId, DeliverableKind, DeliverableSet};
use std::collections::HashMap;

/// Deliverables collected so far for one in-flight capture
#[derive(Debug, Clone)]
struct PendingDeliverables {
    expected: usize,
    set: DeliverableSet,
}

/// Out-of-contract event, logged and otherwise ignored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Deliverable for an id with no pending set
    UnknownCorrelation,
    /// Second deliverable of a kind already received
    DuplicateKind(DeliverableKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Hardware(String),
    /// Hardware finished before every expected deliverable arrived
    Incomplete { received: usize, expected: usize },
}

/// Outcome of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Pending set created; `replaced` when one already existed for the id
    Began {
        id: CorrelationId,
        expected: usize,
        replaced: bool,
    },
    /// Deliverable stored, more expected
    Accumulated {
        id: CorrelationId,
        received: usize,
        expected: usize,
    },
    /// Expected count reached; the pending set has been released
    Finalize(DeliverableSet),
    /// Pending set (if any) released without finalizing
    Failed {
        id: CorrelationId,
        reason: FailureReason,
        had_pending: bool,
    },
    /// Hardware finished a request that was already finalized
    Completed { id: CorrelationId },
    Discarded { id: CorrelationId, anomaly: Anomaly },
}

/// Pairs deliverables by correlation id.
///
/// Pure state machine: no I/O, no locking. It must only be driven from a
/// single serial context.
#[derive(Debug, Default)]
pub struct CorrelationEngine {
    pending: HashMap<CorrelationId, PendingDeliverables>,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn apply(&mut self, event: CaptureEvent) -> Transition {
        match event {
            CaptureEvent::Begin { id, expected } => self.begin(id, expected),
            CaptureEvent::DeliverableArrived { id, deliverable } => {
                let Some(pending) = self.pending.get_mut(&id) else {
                    return Transition::Discarded {
                        id,
                        anomaly: Anomaly::UnknownCorrelation,
                    };
                };

                let slot = pending.set.slot_mut(deliverable.kind);
                if slot.is_some() {
                    return Transition::Discarded {
                        id,
                        anomaly: Anomaly::DuplicateKind(deliverable.kind),
                    };
                }
                *slot = Some(deliverable);

                let received = pending.set.len();
                let expected = pending.expected;
                if received == expected {
                    self.release(id)
                } else {
                    Transition::Accumulated {
                        id,
                        received,
                        expected,
                    }
                }
            }
            CaptureEvent::TerminalFailure { id, reason } => {
                let had_pending = self.pending.remove(&id).is_some();
                Transition::Failed {
                    id,
                    reason: FailureReason::Hardware(reason),
                    had_pending,
                }
            }
            CaptureEvent::Finished { id } => match self.pending.remove(&id) {
                Some(pending) => Transition::Failed {
                    id,
                    reason: FailureReason::Incomplete {
                        received: pending.set.len(),
                        expected: pending.expected,
                    },
                    had_pending: true,
                },
                None => Transition::Completed { id },
            },
        }
    }

    fn begin(&mut self, id: CorrelationId, expected: usize) -> Transition {
        let replaced = self
            .pending
            .insert(
                id,
                PendingDeliverables {
                    expected,
                    set: DeliverableSet::empty(id),
                },
            )
            .is_some();

        // Nothing to wait for.
        if expected == 0 {
            return self.release(id);
        }

        Transition::Began {
            id,
            expected,
            replaced,
        }
    }

    fn release(&mut self, id: CorrelationId) -> Transition {
        match self.pending.remove(&id) {
            Some(pending) => Transition::Finalize(pending.set),
            None => Transition::Finalize(DeliverableSet::empty(id)),
        }
    }
}

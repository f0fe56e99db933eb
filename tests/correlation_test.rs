//! Property-based tests for the capture correlation engine
//!
//! Run with: cargo test --test correlation_test

use crabshutter::correlation::{Anomaly, FailureReason};
use crabshutter::{CaptureEvent, CorrelationEngine, CorrelationId, Deliverable, DeliverableKind, Transition};
use proptest::prelude::*;

fn begin(id: i64, expected: usize) -> CaptureEvent {
    CaptureEvent::Begin {
        id: CorrelationId(id),
        expected,
    }
}

fn arrive(id: i64, kind: DeliverableKind) -> CaptureEvent {
    CaptureEvent::DeliverableArrived {
        id: CorrelationId(id),
        deliverable: Deliverable::new(kind, vec![id as u8]),
    }
}

fn kinds_strategy() -> impl Strategy<Value = Vec<DeliverableKind>> {
    prop_oneof![
        Just(vec![DeliverableKind::Processed]),
        Just(vec![DeliverableKind::Raw]),
        Just(vec![DeliverableKind::Raw, DeliverableKind::Processed]),
        Just(vec![DeliverableKind::Processed, DeliverableKind::Raw]),
    ]
}

fn count_finalized(transitions: &[Transition]) -> usize {
    transitions
        .iter()
        .filter(|t| matches!(t, Transition::Finalize(_)))
        .count()
}

// ═══════════════════════════════════════════════════════════════════════════
// PAIRING INVARIANTS
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// begin(id, n) followed by n distinct kinds finalizes exactly once,
    /// on the last arrival, with all n deliverables
    #[test]
    fn finalizes_once_with_full_set(id in any::<i64>(), kinds in kinds_strategy()) {
        let mut engine = CorrelationEngine::new();
        let n = kinds.len();

        let mut transitions = vec![engine.apply(begin(id, n))];
        for kind in &kinds {
            transitions.push(engine.apply(arrive(id, *kind)));
        }

        prop_assert_eq!(count_finalized(&transitions), 1);
        match transitions.last() {
            Some(Transition::Finalize(set)) => {
                prop_assert_eq!(set.id, CorrelationId(id));
                prop_assert_eq!(set.len(), n);
                for kind in &kinds {
                    prop_assert!(set.contains(*kind));
                }
            }
            other => prop_assert!(false, "last transition was {:?}", other),
        }
        prop_assert!(!engine.is_pending(CorrelationId(id)));

        // Nothing more can finalize this id.
        for kind in &kinds {
            let late = engine.apply(arrive(id, *kind));
            prop_assert!(
                matches!(late, Transition::Discarded { anomaly: Anomaly::UnknownCorrelation, .. }),
                "late arrival gave {:?}",
                late
            );
        }
    }

    /// Arrivals for ids that never began are discarded and leave no state
    #[test]
    fn unknown_ids_never_create_state(
        ids in prop::collection::vec(any::<i64>(), 1..20),
        raw in any::<bool>(),
    ) {
        let mut engine = CorrelationEngine::new();
        let kind = if raw { DeliverableKind::Raw } else { DeliverableKind::Processed };

        for id in ids {
            let transition = engine.apply(arrive(id, kind));
            prop_assert_eq!(
                transition,
                Transition::Discarded { id: CorrelationId(id), anomaly: Anomaly::UnknownCorrelation }
            );
        }
        prop_assert_eq!(engine.pending_count(), 0);
    }

    /// A terminal failure before the expected count removes the set and
    /// nothing finalizes afterwards
    #[test]
    fn failure_before_completion_never_finalizes(
        id in any::<i64>(),
        delivered_before_failure in 0usize..2,
    ) {
        let mut engine = CorrelationEngine::new();
        let kinds = [DeliverableKind::Raw, DeliverableKind::Processed];

        let mut transitions = vec![engine.apply(begin(id, 2))];
        for kind in &kinds[..delivered_before_failure] {
            transitions.push(engine.apply(arrive(id, *kind)));
        }

        let failed = engine.apply(CaptureEvent::TerminalFailure {
            id: CorrelationId(id),
            reason: "sensor".to_string(),
        });
        prop_assert_eq!(
            failed,
            Transition::Failed {
                id: CorrelationId(id),
                reason: FailureReason::Hardware("sensor".to_string()),
                had_pending: true,
            }
        );
        prop_assert!(!engine.is_pending(CorrelationId(id)));

        for kind in &kinds[delivered_before_failure..] {
            transitions.push(engine.apply(arrive(id, *kind)));
        }
        prop_assert_eq!(count_finalized(&transitions), 0);
    }

    /// Interleaved captures each finalize exactly once with their own
    /// deliverables
    #[test]
    fn interleaved_captures_stay_separate(
        order in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let mut engine = CorrelationEngine::new();
        for id in 0..3 {
            engine.apply(begin(id, 2));
        }

        // Arrival i belongs to capture i / 2 and has kind i % 2.
        let mut finalized = Vec::new();
        for slot in order {
            let id = (slot / 2) as i64;
            let kind = if slot % 2 == 0 { DeliverableKind::Raw } else { DeliverableKind::Processed };
            if let Transition::Finalize(set) = engine.apply(arrive(id, kind)) {
                prop_assert_eq!(set.len(), 2);
                for d in set.raw.iter().chain(set.processed.iter()) {
                    prop_assert_eq!(&d.data[..], &[id as u8][..]);
                }
                finalized.push(set.id);
            }
        }

        finalized.sort();
        prop_assert_eq!(finalized, vec![CorrelationId(0), CorrelationId(1), CorrelationId(2)]);
        prop_assert_eq!(engine.pending_count(), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_scenario_raw_then_processed() {
    let mut engine = CorrelationEngine::new();
    engine.apply(begin(7, 2));
    assert!(matches!(
        engine.apply(arrive(7, DeliverableKind::Raw)),
        Transition::Accumulated { received: 1, expected: 2, .. }
    ));

    match engine.apply(arrive(7, DeliverableKind::Processed)) {
        Transition::Finalize(set) => {
            assert_eq!(set.kinds(), vec![DeliverableKind::Raw, DeliverableKind::Processed]);
        }
        other => panic!("expected finalize, got {:?}", other),
    }
}

#[test]
fn test_scenario_processed_only() {
    let mut engine = CorrelationEngine::new();
    engine.apply(begin(9, 1));

    match engine.apply(arrive(9, DeliverableKind::Processed)) {
        Transition::Finalize(set) => {
            assert!(set.raw.is_none());
            assert_eq!(set.kinds(), vec![DeliverableKind::Processed]);
        }
        other => panic!("expected finalize, got {:?}", other),
    }
}

#[test]
fn test_failure_without_pending_set() {
    let mut engine = CorrelationEngine::new();
    assert_eq!(
        engine.apply(CaptureEvent::TerminalFailure {
            id: CorrelationId(3),
            reason: "late".to_string(),
        }),
        Transition::Failed {
            id: CorrelationId(3),
            reason: FailureReason::Hardware("late".to_string()),
            had_pending: false,
        }
    );
}

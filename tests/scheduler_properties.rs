//! Property tests over randomly generated workloads

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use tickwork::runtime::action::Action;
use tickwork::runtime::error::{ActionError, ActionResult};
use tickwork::runtime::readiness::ReadinessFlag;
use tickwork::runtime::scheduler::Populator;
use tickwork::runtime::RuntimeConfig;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Finishes after this many advances
    FinishAfter(u8),
    /// Fails on this advance
    FailAt(u8),
}

fn behavior() -> impl Strategy<Value = Behavior> {
    prop_oneof![
        4 => (1u8..6).prop_map(Behavior::FinishAfter),
        1 => (1u8..4).prop_map(Behavior::FailAt),
    ]
}

/// Records every advance as `(id, finished_before)` in a shared log.
struct Recorder {
    id: usize,
    behavior: Behavior,
    advances: u8,
    finished: bool,
    log: Arc<Mutex<Vec<(usize, bool)>>>,
}

impl Action for Recorder {
    fn advance(&mut self) -> ActionResult<()> {
        self.log.lock().push((self.id, self.finished));
        self.advances += 1;
        match self.behavior {
            Behavior::FinishAfter(n) if self.advances >= n => self.finished = true,
            Behavior::FailAt(n) if self.advances >= n => {
                return Err(ActionError::failed("scripted failure"));
            }
            _ => {}
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

proptest! {
    #[test]
    fn prop_fifo_and_monotonic_finish(
        workload in prop::collection::vec((behavior(), any::<bool>()), 1..30),
        ready_at in 0usize..8,
    ) {
        let handshake = ReadinessFlag::new();
        let mut sched = Populator::new(&RuntimeConfig::default(), handshake.shared());
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut gated_ids = Vec::new();
        for (id, (behavior, gated)) in workload.iter().enumerate() {
            if *gated {
                gated_ids.push(id);
            }
            sched.add_action(
                Recorder { id, behavior: *behavior, advances: 0, finished: false, log: log.clone() },
                *gated,
            );
        }

        let mut ticks = 0;
        while sched.has_pending_work() {
            if ticks == ready_at {
                handshake.set_ready(true);
            }
            let before = log.lock().len();
            sched.tick();
            let pass: Vec<usize> = log.lock()[before..].iter().map(|(id, _)| *id).collect();

            // Default lane entries come first and each lane advances in id order
            let (gated, default): (Vec<usize>, Vec<usize>) =
                pass.iter().copied().partition(|id| gated_ids.contains(id));
            prop_assert!(default.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(gated.windows(2).all(|w| w[0] < w[1]));
            if let (Some(last_default), Some(first_gated)) = (
                pass.iter().rposition(|id| !gated_ids.contains(id)),
                pass.iter().position(|id| gated_ids.contains(id)),
            ) {
                prop_assert!(last_default < first_gated);
            }
            if ticks < ready_at {
                prop_assert!(gated.is_empty());
            }

            ticks += 1;
            prop_assert!(ticks < 50, "scheduler failed to make progress");
        }

        // Nothing is ever advanced after reporting finished
        prop_assert!(log.lock().iter().all(|(_, finished_before)| !finished_before));

        let stats = sched.stats();
        prop_assert_eq!((stats.completed + stats.failed) as usize, workload.len());
    }
}

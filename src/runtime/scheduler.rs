//! Tick-driven action scheduler
//!
//! The [`Populator`] owns two lanes of deferred actions: an unconditional
//! lane and a lane gated on an external readiness predicate. Each lane has an
//! active queue, driven only by the tick thread, and a lock-protected pending
//! buffer that any thread may append to. Pending buffers are flushed once, at
//! the start of a tick, so work queued while a tick is running waits for the
//! next one.

use std::collections::VecDeque;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::RuntimeConfig;
use super::action::{Action, BoxedAction};
use super::error::{ActionError, ActionResult, panic_message};
use super::readiness::SharedReadiness;

/// Which queue an action belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Driven every tick
    Default,
    /// Driven only while the readiness predicate holds
    Gated,
}

/// Counters accumulated over the scheduler's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Calls to `tick`
    pub ticks: u64,
    /// Individual `advance` calls, forced or not
    pub advances: u64,
    /// Actions removed because they reported finished
    pub completed: u64,
    /// Actions dropped because `advance` failed or panicked
    pub failed: u64,
    /// Actions thrown away unfinished by a forced drain
    pub discarded: u64,
}

#[derive(Default)]
struct PendingBuffers {
    default: Mutex<Vec<BoxedAction>>,
    gated: Mutex<Vec<BoxedAction>>,
}

impl PendingBuffers {
    fn buffer(&self, lane: Lane) -> &Mutex<Vec<BoxedAction>> {
        match lane {
            Lane::Default => &self.default,
            Lane::Gated => &self.gated,
        }
    }

    fn push(&self, lane: Lane, action: BoxedAction) {
        self.buffer(lane).lock().push(action);
    }

    fn take(&self, lane: Lane) -> Vec<BoxedAction> {
        mem::take(&mut *self.buffer(lane).lock())
    }

    fn len(&self, lane: Lane) -> usize {
        self.buffer(lane).lock().len()
    }
}

/// Cloneable handle for queueing actions from any thread
#[derive(Clone)]
pub struct Submitter {
    pending: Arc<PendingBuffers>,
}

impl Submitter {
    /// Queue an action; it becomes visible at the start of the next tick
    pub fn add_action(&self, action: impl Action + 'static, gated: bool) {
        self.add_boxed(Box::new(action), gated);
    }

    /// Queue an already boxed action
    pub fn add_boxed(&self, action: BoxedAction, gated: bool) {
        let lane = if gated { Lane::Gated } else { Lane::Default };
        self.pending.push(lane, action);
    }
}

/// Cooperative cycle scheduler driven by the host tick
pub struct Populator {
    default_active: VecDeque<BoxedAction>,
    gated_active: VecDeque<BoxedAction>,
    pending: Arc<PendingBuffers>,
    readiness: SharedReadiness,
    tick_budget: Duration,
    force_drain_passes: usize,
    stats: SchedulerStats,
}

impl Populator {
    /// Create a scheduler reading gated-lane readiness from `readiness`
    pub fn new(config: &RuntimeConfig, readiness: SharedReadiness) -> Self {
        Self {
            default_active: VecDeque::new(),
            gated_active: VecDeque::new(),
            pending: Arc::new(PendingBuffers::default()),
            readiness,
            tick_budget: config.tick_budget(),
            force_drain_passes: config.force_drain_passes,
            stats: SchedulerStats::default(),
        }
    }

    /// Handle for submitting actions from other threads or from inside an
    /// action's `advance`
    pub fn submitter(&self) -> Submitter {
        Submitter {
            pending: self.pending.clone(),
        }
    }

    /// Queue an action on the default lane, or the gated lane if `gated`
    pub fn add_action(&self, action: impl Action + 'static, gated: bool) {
        self.submitter().add_action(action, gated);
    }

    /// Run one scheduling cycle.
    ///
    /// Flushes pending actions, drives the default lane, then drives the gated
    /// lane if ready. Each drive pass stops once its budget is spent, leaving
    /// the rest for later ticks.
    pub fn tick(&mut self) {
        self.stats.ticks += 1;
        let ready = self.readiness.is_ready();

        self.flush(Lane::Default);
        if ready {
            self.flush(Lane::Gated);
        }

        let budget = Some(self.tick_budget);
        let outcome = drive(&mut self.default_active, false, budget, &mut self.stats);
        debug!(
            lane = "default",
            driven = outcome.driven,
            remaining = self.default_active.len(),
            "drive pass complete"
        );

        if ready {
            let outcome = drive(&mut self.gated_active, false, budget, &mut self.stats);
            debug!(
                lane = "gated",
                driven = outcome.driven,
                remaining = self.gated_active.len(),
                "drive pass complete"
            );
        }
    }

    /// Best-effort flush of all outstanding work at shutdown.
    ///
    /// Moves every pending action into its active queue regardless of
    /// readiness, then runs forced passes over both lanes until they are
    /// empty or the pass cap is reached. Whatever is left afterwards, including
    /// actions queued during the drain, is discarded.
    pub fn force_drain(&mut self) {
        self.flush(Lane::Default);
        self.flush(Lane::Gated);

        let mut passes = 0;
        while passes < self.force_drain_passes
            && !(self.default_active.is_empty() && self.gated_active.is_empty())
        {
            drive(&mut self.default_active, true, None, &mut self.stats);
            drive(&mut self.gated_active, true, None, &mut self.stats);
            passes += 1;
        }

        let leftover = self.default_active.len()
            + self.gated_active.len()
            + self.pending.len(Lane::Default)
            + self.pending.len(Lane::Gated);

        if leftover > 0 {
            for action in self.default_active.iter().chain(self.gated_active.iter()) {
                warn!(action = action.label(), "discarding unfinished action at shutdown");
            }
            warn!(
                passes,
                discarded = leftover,
                "forced drain hit its pass cap; discarding remaining actions"
            );
        } else {
            debug!(passes, "forced drain completed");
        }

        self.default_active.clear();
        self.gated_active.clear();
        self.pending.take(Lane::Default);
        self.pending.take(Lane::Gated);
        self.stats.discarded += leftover as u64;
    }

    /// True if any active queue or pending buffer holds an action
    pub fn has_pending_work(&self) -> bool {
        !self.default_active.is_empty()
            || !self.gated_active.is_empty()
            || self.pending.len(Lane::Default) > 0
            || self.pending.len(Lane::Gated) > 0
    }

    /// Number of actions in a lane, active and pending
    pub fn queued(&self, lane: Lane) -> usize {
        let active = match lane {
            Lane::Default => self.default_active.len(),
            Lane::Gated => self.gated_active.len(),
        };
        active + self.pending.len(lane)
    }

    /// Lifetime counters
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    fn flush(&mut self, lane: Lane) {
        let pending = self.pending.take(lane);
        if pending.is_empty() {
            return;
        }
        let active = match lane {
            Lane::Default => &mut self.default_active,
            Lane::Gated => &mut self.gated_active,
        };
        active.extend(pending);
    }
}

struct DriveOutcome {
    driven: usize,
}

/// One pass over a queue in FIFO order.
///
/// The first action is always advanced; after that the pass stops as soon as
/// `budget` has elapsed. Finished and failed actions are removed, the rest
/// keep their order.
fn drive(
    queue: &mut VecDeque<BoxedAction>,
    force: bool,
    budget: Option<Duration>,
    stats: &mut SchedulerStats,
) -> DriveOutcome {
    let start = Instant::now();
    let mut kept = VecDeque::with_capacity(queue.len());
    let mut driven = 0;

    while let Some(mut action) = queue.pop_front() {
        if driven > 0 && budget.is_some_and(|b| start.elapsed() >= b) {
            queue.push_front(action);
            break;
        }

        if action.is_finished() {
            stats.completed += 1;
            continue;
        }

        driven += 1;
        stats.advances += 1;
        match advance_isolated(&mut action, force) {
            Ok(()) if action.is_finished() => stats.completed += 1,
            Ok(()) => kept.push_back(action),
            Err(e) => {
                stats.failed += 1;
                warn!(action = action.label(), error = %e, "dropping failed action");
            }
        }
    }

    kept.append(queue);
    *queue = kept;
    DriveOutcome { driven }
}

fn advance_isolated(action: &mut BoxedAction, force: bool) -> ActionResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| action.advance_with_force(force))) {
        Ok(result) => result,
        Err(payload) => Err(ActionError::Panicked(panic_message(payload.as_ref()))),
    }
}

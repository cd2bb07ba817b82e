//! Runtime orchestrator and public API
//!
//! This module provides the [`ActionRuntime`] that owns the tick-driven
//! [`Populator`] and the background [`AsyncWorker`], and exposes the
//! lifecycle hooks a host service calls at startup, on every tick and at
//! shutdown.

use tracing::info;

// Submodules
pub mod action;
pub mod config;
pub mod decorators;
pub mod error;
pub mod readiness;
pub mod scheduler;
pub mod worker;

pub use config::RuntimeConfig;

use action::Action;
use error::{Result, WorkerResult};
use readiness::SharedReadiness;
use scheduler::{Populator, SchedulerStats, Submitter};
use worker::{AsyncWorker, WorkerHandle};

/// Owner of the action scheduler and the background worker
///
/// Coordinates both halves: tick-driven deferred actions and the async work
/// queue, started and stopped together.
pub struct ActionRuntime {
    config: RuntimeConfig,
    populator: Populator,
    worker: AsyncWorker,
}

impl ActionRuntime {
    /// Validate the config, build the scheduler and start the worker thread
    pub fn start(config: RuntimeConfig, readiness: SharedReadiness) -> Result<Self> {
        config.validate()?;

        let populator = Populator::new(&config, readiness);
        let worker = AsyncWorker::spawn(&config)?;

        info!(
            tick_budget_ms = config.tick_budget_ms,
            force_drain_passes = config.force_drain_passes,
            "action runtime started"
        );

        Ok(Self {
            config,
            populator,
            worker,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run one scheduling cycle; called by the host's tick driver
    pub fn tick(&mut self) {
        self.populator.tick();
    }

    /// Queue a deferred action for the tick thread
    pub fn add_action(&self, action: impl Action + 'static, gated: bool) {
        self.populator.add_action(action, gated);
    }

    /// Queue work on the background thread
    pub fn submit<F>(&self, item: F) -> WorkerResult<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.worker.submit(item)
    }

    /// Cross-thread handle for deferred actions
    pub fn submitter(&self) -> Submitter {
        self.populator.submitter()
    }

    /// Cross-thread handle for background work
    pub fn worker_handle(&self) -> WorkerHandle {
        self.worker.handle()
    }

    /// Whether any deferred action is still queued
    pub fn has_pending_work(&self) -> bool {
        self.populator.has_pending_work()
    }

    /// Scheduler counters
    pub fn stats(&self) -> SchedulerStats {
        self.populator.stats()
    }

    /// Get the scheduler
    pub fn populator(&self) -> &Populator {
        &self.populator
    }

    /// Get the worker
    pub fn worker(&self) -> &AsyncWorker {
        &self.worker
    }

    /// Force-drain deferred actions, then stop the worker after it empties
    /// its queue
    pub fn shutdown(mut self) -> Result<SchedulerStats> {
        self.populator.force_drain();
        self.worker.shutdown()?;
        let stats = self.populator.stats();
        info!(
            completed = stats.completed,
            failed = stats.failed,
            discarded = stats.discarded,
            "action runtime stopped"
        );
        Ok(stats)
    }
}

// Re-export commonly used types
pub use action::{BoxedAction, LeafAction, RepeatingEffect};
pub use decorators::{ActionBatch, DelayedAction, GatedAction, RepeatUntil};
pub use readiness::{Readiness, ReadinessFlag};
pub use scheduler::Lane;

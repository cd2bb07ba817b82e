//! Error types for the tickwork runtime
//!
//! Domain errors use thiserror; file and IO boundaries add anyhow context
//! and convert at the edge.

use std::io;
use thiserror::Error;

/// Top-level runtime error
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Action failures surfaced outside the scheduler
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    /// Background worker errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failure raised while advancing a single action
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action reported a failure
    #[error("Action failed: {0}")]
    Failed(String),

    /// The action panicked inside `advance`
    #[error("Action panicked: {0}")]
    Panicked(String),

    /// Failure bubbled up from the wrapped effect
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    /// Shorthand for [`ActionError::Failed`]
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed(detail.into())
    }
}

/// Convenience result alias for action operations
pub type ActionResult<T> = std::result::Result<T, ActionError>;

/// Background worker errors
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Work was submitted after the worker was disabled
    #[error("Worker is disabled")]
    Disabled,

    /// The worker thread is gone and nothing drains the queue
    #[error("Worker queue disconnected")]
    Disconnected,

    /// The worker thread could not be started
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    /// The worker thread panicked outside of a work item
    #[error("Worker thread panicked")]
    Panicked,
}

/// Convenience result alias for worker operations
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;

/// Invalid configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The per-lane time budget is zero
    #[error("tick_budget_ms must be greater than zero")]
    ZeroTickBudget,

    /// The forced drain would never run a pass
    #[error("force_drain_passes must be greater than zero")]
    ZeroDrainPasses,

    /// A bounded worker queue with no room
    #[error("worker_queue_capacity must be greater than zero when set")]
    ZeroQueueCapacity,
}

/// Convenience result alias for configuration checks
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type using RuntimeError
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Render a panic payload as text for logs and errors.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

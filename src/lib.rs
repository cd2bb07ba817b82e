//! Tickwork – a cooperative, tick-driven action scheduler
//!
//! This crate defers, batches, force-terminates and isolates discrete units
//! of work across repeated invocations of a host's tick entrypoint:
//! - Actions advanced once per tick, with delay, repeat-until and gating
//!   wrappers composed around them
//! - A two-lane cycle scheduler with a per-tick time budget and a gated lane
//!   that waits on an injected readiness predicate
//! - A bounded forced drain for shutdown
//! - A background worker draining a blocking queue on its own thread

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Runtime core modules: actions, scheduler and background worker
pub mod runtime;

// Re-export key types for convenience
pub use runtime::{ActionRuntime, RuntimeConfig};

/// Current version of the tickwork runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Readiness predicate for the gated queue
//!
//! Whatever component resolves the host's network identity owns the flag;
//! the scheduler only reads it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Reports whether gated work may run
pub trait Readiness: Send + Sync {
    /// Current readiness.
    ///
    /// The populator reads it once at the start of each tick. A
    /// [`GatedAction`](super::decorators::GatedAction) reads it on every
    /// advance, so it may be called more often than that.
    fn is_ready(&self) -> bool;
}

impl<F> Readiness for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_ready(&self) -> bool {
        self()
    }
}

/// Shared readiness predicate
pub type SharedReadiness = Arc<dyn Readiness>;

/// Cloneable boolean flag flipped by the handshake owner.
#[derive(Debug, Clone, Default)]
pub struct ReadinessFlag {
    ready: Arc<AtomicBool>,
}

impl ReadinessFlag {
    /// Create a flag that starts out not ready
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag that is already ready
    pub fn ready() -> Self {
        let flag = Self::new();
        flag.set_ready(true);
        flag
    }

    /// Update the flag
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Wrap a clone of this flag for injection into a scheduler
    pub fn shared(&self) -> SharedReadiness {
        Arc::new(self.clone())
    }
}

impl Readiness for ReadinessFlag {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Readiness that is always true
pub fn always_ready() -> SharedReadiness {
    Arc::new(|| true)
}

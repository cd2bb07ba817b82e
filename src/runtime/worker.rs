//! Background worker draining a blocking work queue on its own thread
//!
//! Producers on any thread submit opaque work items; a single dedicated
//! thread executes them one at a time, independent of the tick cadence.
//! Shutdown flips an enabled flag and enqueues a wake-up sentinel so a
//! consumer blocked on an empty queue notices, then drains what is left.
//! Submission and the flag flip are serialized by a gate lock, so nothing is
//! accepted once the sentinel is queued.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle, ThreadId};

use flume::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::RuntimeConfig;
use super::error::{WorkerError, WorkerResult, panic_message};

/// Opaque unit of background work. Success is returning `Ok`.
pub type WorkItem = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

enum Job {
    Run(WorkItem),
    /// No-op that unblocks a consumer waiting on an empty queue
    Wake,
}

/// Counters for executed work items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Items that returned `Ok`
    pub completed: u64,
    /// Items that returned `Err` or panicked
    pub failed: u64,
}

#[derive(Default)]
struct Shared {
    enabled: AtomicBool,
    /// Held shared across check-and-send in `submit`, exclusively by `disable`
    gate: RwLock<()>,
    wake_queued: AtomicBool,
    consumer: OnceLock<ThreadId>,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Cloneable producer handle for the worker queue
#[derive(Clone)]
pub struct WorkerHandle {
    sender: Sender<Job>,
    shared: Arc<Shared>,
}

impl WorkerHandle {
    /// Enqueue a work item. Blocks only when the queue is bounded and full.
    pub fn submit<F>(&self, item: F) -> WorkerResult<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        // A work item submitting from the consumer thread must not queue
        // behind a waiting `disable`, or the queue would never drain
        let on_consumer = self.shared.consumer.get() == Some(&thread::current().id());
        let _gate = if on_consumer {
            self.shared.gate.read_recursive()
        } else {
            self.shared.gate.read()
        };
        if !self.shared.enabled.load(Ordering::Acquire) {
            return Err(WorkerError::Disabled);
        }
        self.sender
            .send(Job::Run(Box::new(item)))
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Whether the worker still accepts items
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    /// Work items waiting in the queue, not counting the shutdown sentinel
    pub fn pending(&self) -> usize {
        let sentinel = usize::from(self.shared.wake_queued.load(Ordering::Acquire));
        self.sender.len().saturating_sub(sentinel)
    }
}

/// Owner of the background worker thread
pub struct AsyncWorker {
    handle: WorkerHandle,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncWorker {
    /// Start the worker thread
    pub fn spawn(config: &RuntimeConfig) -> WorkerResult<Self> {
        let (sender, receiver) = match config.worker_queue_capacity {
            Some(capacity) => flume::bounded(capacity),
            None => flume::unbounded(),
        };
        let shared = Arc::new(Shared {
            enabled: AtomicBool::new(true),
            ..Default::default()
        });

        let loop_shared = shared.clone();
        let thread = thread::Builder::new()
            .name(config.worker_thread_name.clone())
            .spawn(move || run_loop(receiver, loop_shared))?;

        info!(thread = %config.worker_thread_name, "async worker started");
        Ok(Self {
            handle: WorkerHandle { sender, shared },
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Producer handle that can be cloned across threads
    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Enqueue a work item
    pub fn submit<F>(&self, item: F) -> WorkerResult<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.handle.submit(item)
    }

    /// Stop accepting work and wake the consumer so it can drain and exit.
    ///
    /// Items already queued still run. Calling this more than once is a
    /// no-op.
    pub fn disable(&self) {
        let shared = &self.handle.shared;
        let _gate = shared.gate.write();
        if !shared.enabled.swap(false, Ordering::AcqRel) {
            return;
        }
        // A full queue means the consumer is not parked and will see the flag
        // once it drains, so the sentinel is only needed when there is room
        shared.wake_queued.store(true, Ordering::Release);
        if self.handle.sender.try_send(Job::Wake).is_err() {
            shared.wake_queued.store(false, Ordering::Release);
            debug!("async worker queue full or gone while disabling");
        }
    }

    /// Wait for the worker thread to exit
    pub fn join(&self) -> WorkerResult<()> {
        let Some(thread) = self.thread.lock().take() else {
            return Ok(());
        };
        thread.join().map_err(|_| {
            error!("async worker thread panicked");
            WorkerError::Panicked
        })
    }

    /// Disable, then wait for the queue to drain
    pub fn shutdown(&self) -> WorkerResult<()> {
        self.disable();
        self.join()?;
        info!("async worker stopped");
        Ok(())
    }

    /// Whether the worker still accepts items
    pub fn is_enabled(&self) -> bool {
        self.handle.is_enabled()
    }

    /// Items waiting in the queue
    pub fn pending(&self) -> usize {
        self.handle.pending()
    }

    /// Lifetime counters
    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            completed: self.handle.shared.completed.load(Ordering::Relaxed),
            failed: self.handle.shared.failed.load(Ordering::Relaxed),
        }
    }
}

impl Drop for AsyncWorker {
    fn drop(&mut self) {
        self.disable();
    }
}

fn run_loop(receiver: Receiver<Job>, shared: Arc<Shared>) {
    let _ = shared.consumer.set(thread::current().id());
    while shared.enabled.load(Ordering::Acquire) || !receiver.is_empty() {
        let job = match receiver.recv() {
            Ok(job) => job,
            // Every producer handle is gone; nothing more can arrive
            Err(_) => break,
        };

        let item = match job {
            Job::Run(item) => item,
            Job::Wake => {
                shared.wake_queued.store(false, Ordering::Release);
                continue;
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(item)) {
            Ok(Ok(())) => {
                shared.completed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                shared.failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %format!("{e:#}"), "async work item failed");
            }
            Err(payload) => {
                shared.failed.fetch_add(1, Ordering::Relaxed);
                warn!(panic = %panic_message(payload.as_ref()), "async work item panicked");
            }
        }
    }
    debug!("async worker loop exited");
}

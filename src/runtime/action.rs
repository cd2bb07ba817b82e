//! Deferred units of work
//!
//! An [`Action`] is driven forward one step at a time by the scheduler and
//! reports when it is done. Policies such as delays or gating are layered on
//! by wrapping one action in another (see [`super::decorators`]).

use super::error::ActionResult;

/// A unit of deferred work driven by repeated `advance` calls.
///
/// `is_finished` is monotonic: once it returns true the action is never
/// advanced again. Implementations must not block inside `advance`; long
/// running work belongs on the [`super::worker::AsyncWorker`].
pub trait Action: Send {
    /// Perform one increment of progress.
    fn advance(&mut self) -> ActionResult<()>;

    /// Perform one increment of progress, completing immediately when
    /// `force_end` is set.
    ///
    /// The default ignores the flag and calls [`Action::advance`]. Actions
    /// that cannot skip their policy are still terminated by the scheduler's
    /// bounded forced drain.
    fn advance_with_force(&mut self, force_end: bool) -> ActionResult<()> {
        let _ = force_end;
        self.advance()
    }

    /// Whether the work is complete. Must not have side effects.
    fn is_finished(&self) -> bool;

    /// Short name used in log lines
    fn label(&self) -> &str {
        "action"
    }
}

impl<A: Action + ?Sized> Action for Box<A> {
    fn advance(&mut self) -> ActionResult<()> {
        (**self).advance()
    }

    fn advance_with_force(&mut self, force_end: bool) -> ActionResult<()> {
        (**self).advance_with_force(force_end)
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

/// Boxed action as stored in scheduler queues
pub type BoxedAction = Box<dyn Action>;

/// One-shot external effect, such as committing a pending state change.
///
/// Runs its effect on the first advance and is finished once the effect
/// returns `Ok`. Force has nothing to skip, so it behaves like a plain
/// advance.
pub struct LeafAction<F> {
    effect: F,
    label: String,
    finished: bool,
}

impl<F> LeafAction<F>
where
    F: FnMut() -> ActionResult<()> + Send,
{
    /// Wrap an effect
    pub fn new(effect: F) -> Self {
        Self::labeled("leaf", effect)
    }

    /// Wrap an effect with a log label
    pub fn labeled(label: impl Into<String>, effect: F) -> Self {
        Self {
            effect,
            label: label.into(),
            finished: false,
        }
    }
}

impl<F> Action for LeafAction<F>
where
    F: FnMut() -> ActionResult<()> + Send,
{
    fn advance(&mut self) -> ActionResult<()> {
        if self.finished {
            return Ok(());
        }
        (self.effect)()?;
        self.finished = true;
        Ok(())
    }

    fn advance_with_force(&mut self, _force_end: bool) -> ActionResult<()> {
        self.advance()
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Effect that runs on every advance and never finishes by itself.
///
/// Meant to sit inside [`super::decorators::RepeatUntil`], which decides when
/// to stop. A forced advance completes it without running the effect.
pub struct RepeatingEffect<F> {
    effect: F,
    label: String,
    finished: bool,
}

impl<F> RepeatingEffect<F>
where
    F: FnMut() -> ActionResult<()> + Send,
{
    /// Wrap an effect
    pub fn new(effect: F) -> Self {
        Self {
            effect,
            label: "repeating".to_string(),
            finished: false,
        }
    }

    /// Set the log label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl<F> Action for RepeatingEffect<F>
where
    F: FnMut() -> ActionResult<()> + Send,
{
    fn advance(&mut self) -> ActionResult<()> {
        if self.finished {
            return Ok(());
        }
        (self.effect)()
    }

    fn advance_with_force(&mut self, force_end: bool) -> ActionResult<()> {
        if force_end {
            self.finished = true;
            return Ok(());
        }
        self.advance()
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn label(&self) -> &str {
        &self.label
    }
}

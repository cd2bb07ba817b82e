//! Policy wrappers around an inner action
//!
//! Each decorator exclusively owns the action it wraps and adds one policy:
//! a fixed tick delay, repetition until a predicate holds, gating on an
//! external readiness flag, or ordered batching.

use std::collections::VecDeque;

use super::action::{Action, BoxedAction};
use super::error::ActionResult;
use super::readiness::SharedReadiness;

/// Runs the inner action after a fixed number of advances.
///
/// With a delay of `n`, the inner action is first advanced on the `n`th call.
/// Force skips the remaining delay.
pub struct DelayedAction<A> {
    inner: A,
    remaining: u32,
}

impl<A: Action> DelayedAction<A> {
    /// Delay `inner` by `ticks` advances
    pub fn new(ticks: u32, inner: A) -> Self {
        Self {
            inner,
            remaining: ticks,
        }
    }

    /// Advances left before the inner action runs
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl<A: Action> Action for DelayedAction<A> {
    fn advance(&mut self) -> ActionResult<()> {
        self.advance_with_force(false)
    }

    fn advance_with_force(&mut self, force_end: bool) -> ActionResult<()> {
        if force_end {
            self.remaining = 0;
        } else if self.remaining > 0 {
            self.remaining -= 1;
        }

        if self.remaining == 0 && !self.inner.is_finished() {
            self.inner.advance_with_force(force_end)?;
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.remaining == 0 && self.inner.is_finished()
    }

    fn label(&self) -> &str {
        self.inner.label()
    }
}

/// Nudges the inner action every advance until a stop predicate holds.
///
/// The predicate is evaluated fresh on every advance, before the inner
/// action runs. The task also ends once the inner action reports finished.
pub struct RepeatUntil<A, P> {
    inner: A,
    stop: P,
    finished: bool,
}

impl<A, P> RepeatUntil<A, P>
where
    A: Action,
    P: Fn() -> bool + Send,
{
    /// Repeat `inner` until `stop` returns true
    pub fn new(inner: A, stop: P) -> Self {
        Self {
            inner,
            stop,
            finished: false,
        }
    }
}

impl<A, P> Action for RepeatUntil<A, P>
where
    A: Action,
    P: Fn() -> bool + Send,
{
    fn advance(&mut self) -> ActionResult<()> {
        self.advance_with_force(false)
    }

    fn advance_with_force(&mut self, force_end: bool) -> ActionResult<()> {
        if self.finished {
            return Ok(());
        }
        if force_end || (self.stop)() {
            self.finished = true;
            return Ok(());
        }

        self.inner.advance()?;
        if self.inner.is_finished() {
            self.finished = true;
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn label(&self) -> &str {
        self.inner.label()
    }
}

/// Holds the inner action back until readiness is reported.
///
/// While not ready, advancing is a no-op. Force runs the inner action
/// regardless of readiness.
pub struct GatedAction<A> {
    inner: A,
    readiness: SharedReadiness,
}

impl<A: Action> GatedAction<A> {
    /// Gate `inner` behind `readiness`
    pub fn new(readiness: SharedReadiness, inner: A) -> Self {
        Self { inner, readiness }
    }
}

impl<A: Action> Action for GatedAction<A> {
    fn advance(&mut self) -> ActionResult<()> {
        self.advance_with_force(false)
    }

    fn advance_with_force(&mut self, force_end: bool) -> ActionResult<()> {
        if !force_end && !self.readiness.is_ready() {
            return Ok(());
        }
        if !self.inner.is_finished() {
            self.inner.advance_with_force(force_end)?;
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    fn label(&self) -> &str {
        self.inner.label()
    }
}

/// Ordered group of actions driven one at a time.
///
/// Each advance drives the head member and pops it once finished, so a
/// member only starts after the previous one completed.
pub struct ActionBatch {
    members: VecDeque<BoxedAction>,
    label: String,
}

impl ActionBatch {
    /// Create an empty batch
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            members: VecDeque::new(),
            label: label.into(),
        }
    }

    /// Append a member, builder style
    pub fn with(mut self, action: impl Action + 'static) -> Self {
        self.push(action);
        self
    }

    /// Append a member
    pub fn push(&mut self, action: impl Action + 'static) {
        self.members.push_back(Box::new(action));
    }

    /// Members not yet finished
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True once every member finished
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn pop_finished(&mut self) {
        while self.members.front().is_some_and(|a| a.is_finished()) {
            self.members.pop_front();
        }
    }
}

impl Action for ActionBatch {
    fn advance(&mut self) -> ActionResult<()> {
        self.advance_with_force(false)
    }

    fn advance_with_force(&mut self, force_end: bool) -> ActionResult<()> {
        if force_end {
            while let Some(mut member) = self.members.pop_front() {
                if !member.is_finished() {
                    member.advance_with_force(true)?;
                }
            }
            return Ok(());
        }

        self.pop_finished();
        if let Some(head) = self.members.front_mut() {
            head.advance()?;
        }
        self.pop_finished();
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.members.is_empty()
    }

    fn label(&self) -> &str {
        &self.label
    }
}

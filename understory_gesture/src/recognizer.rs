// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The [`Recognizer`] trait and the [`Context`] handed to every recognizer call.
//!
//! ## Protocol
//!
//! A recognizer consumes pointer events through [`Recognizer::handle_event`], registers the
//! pointers it cares about with [`Context::register`], and reports its decision per pointer with
//! [`Context::resolve`]. Verdicts come back later through [`Recognizer::on_accepted`],
//! [`Recognizer::on_rejected`], and [`Recognizer::on_pending`].
//!
//! Disposals are queued, not applied in place: a recognizer never observes a verdict during the
//! call that requested it. The engine drains the queue before the public call that started the
//! chain returns, so every cascade (rejection, unblock, promotion) completes before the next
//! event is processed.
//!
//! Composite recognizers list their children through [`Recognizer::children`], feed them events
//! with [`Context::deliver`], and act as the arbitration scope for them: a disposal from a child
//! arrives at [`Recognizer::on_child_disposal`] on its parent instead of at the referee, and the
//! parent answers with [`Context::apply`].

use core::any::Any;
use core::fmt::Debug;
use core::time::Duration;

use crate::engine::{Core, Effect};
use crate::scope::{DetectLookup, Transition};
use crate::timer::Scheduler;
use crate::types::{
    DetectState, Disposal, Outcome, PointerEvent, PointerId, RecognizerId, RefereeState, TimerId,
};

/// A gesture state machine driven by the [`GestureEngine`](crate::engine::GestureEngine).
pub trait Recognizer: Any + Debug {
    /// Consume one pointer event.
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>);

    /// The recognizer won `pointer`.
    fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>);

    /// The recognizer lost `pointer`.
    fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>);

    /// The recognizer is the pending candidate for `pointer`.
    fn on_pending(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        let _ = (pointer, cx);
    }

    /// A timer scheduled through [`Context::schedule`] elapsed.
    fn on_timer(&mut self, timer: TimerId, cx: &mut Context<'_>) {
        let _ = (timer, cx);
    }

    /// First-pass look at an event, before any recognizer handles it.
    ///
    /// Returning [`Outcome::Stop`] or [`Outcome::StopAndConsume`] ends the filter pass.
    fn filter(&mut self, event: &PointerEvent) -> Outcome {
        let _ = event;
        Outcome::Continue
    }

    /// Current detection progress.
    fn detect_state(&self) -> DetectState;

    /// Child recognizers, for composites.
    fn children(&self) -> &[RecognizerId] {
        &[]
    }

    /// A child reported `disposal` for `pointer`.
    ///
    /// Only composites receive this; leaves keep the default.
    fn on_child_disposal(
        &mut self,
        child: RecognizerId,
        pointer: PointerId,
        disposal: Disposal,
        cx: &mut Context<'_>,
    ) {
        let _ = (child, pointer, disposal, cx);
    }

    /// Returns true if `old` has the same type and configuration as `self`.
    ///
    /// Composites compare only themselves; the engine walks their children.
    fn can_reconcile(&self, old: &dyn Recognizer) -> bool;

    /// Absorb callbacks and in-flight tracking from `old`.
    ///
    /// Called only after [`can_reconcile`](Self::can_reconcile) returned true for the whole
    /// subtree. Composites map child ids positionally: `old.children()[i]` becomes
    /// `self.children()[i]`.
    fn reconcile_from(&mut self, old: &mut dyn Recognizer);

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

impl dyn Recognizer {
    /// Downcast to a concrete recognizer type.
    pub fn downcast_ref<R: Recognizer>(&self) -> Option<&R> {
        (self as &dyn Any).downcast_ref::<R>()
    }

    /// Downcast to a concrete recognizer type, mutably.
    pub fn downcast_mut<R: Recognizer>(&mut self) -> Option<&mut R> {
        (self as &mut dyn Any).downcast_mut::<R>()
    }
}

/// Engine access for the recognizer currently being called.
pub struct Context<'a> {
    id: RecognizerId,
    core: &'a mut Core,
    scheduler: &'a mut dyn Scheduler,
    consumed: bool,
}

impl Debug for Context<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        id: RecognizerId,
        core: &'a mut Core,
        scheduler: &'a mut dyn Scheduler,
    ) -> Self {
        Self {
            id,
            core,
            scheduler,
            consumed: false,
        }
    }

    pub(crate) fn consumed(&self) -> bool {
        self.consumed
    }

    /// Id of the recognizer being called.
    pub fn id(&self) -> RecognizerId {
        self.id
    }

    /// Join arbitration for `pointer`.
    ///
    /// The outermost ancestor is what enters the referee, with its own priority; a nested
    /// recognizer is arbitrated by its parent. Registering twice is a no-op.
    pub fn register(&mut self, pointer: PointerId) -> bool {
        self.core.register(pointer, self.id)
    }

    /// Leave arbitration for `pointer` without a verdict.
    ///
    /// Only a top-level recognizer has a referee membership to drop; for a nested one this
    /// does nothing.
    pub fn unregister(&mut self, pointer: PointerId) -> bool {
        self.core.unregister(pointer, self.id)
    }

    /// Report a disposal for `pointer`. Applied after the current call returns.
    pub fn resolve(&mut self, pointer: PointerId, disposal: Disposal) {
        self.core.effects.push_back(Effect::Resolve {
            from: self.id,
            pointer,
            disposal,
        });
    }

    /// Request a one-shot timer; [`Recognizer::on_timer`] receives the returned id.
    pub fn schedule(&mut self, delay: Duration) -> TimerId {
        let timer = TimerId(self.core.next_timer);
        self.core.next_timer += 1;
        self.core.timers.insert(timer, self.id);
        self.scheduler.schedule(timer, delay);
        timer
    }

    /// Cancel a timer this recognizer scheduled. Unknown or fired timers are ignored.
    pub fn cancel(&mut self, timer: TimerId) {
        if self.core.timers.get(&timer) == Some(&self.id) {
            self.core.timers.remove(&timer);
            self.scheduler.cancel(timer);
        }
    }

    /// Synchronously feed `event` to `child`. Returns false for a stale or busy child.
    pub fn deliver(&mut self, child: RecognizerId, event: &PointerEvent) -> bool {
        self.core
            .call(&mut *self.scheduler, child, |r, cx| r.handle_event(event, cx))
            .is_some()
    }

    /// Record a child's new referee state and queue its notice, if any.
    pub fn apply(&mut self, transition: Transition) {
        self.core.apply(transition);
    }

    /// Detection progress of another recognizer, as of its last call.
    pub fn detect_state(&self, id: RecognizerId) -> Option<DetectState> {
        self.core.arena.detect_state(id)
    }

    /// Last referee state assigned to `id` for `pointer`.
    pub fn referee_state(&self, id: RecognizerId, pointer: PointerId) -> Option<RefereeState> {
        self.core.referee_state(id, pointer)
    }

    /// Mark the event fully consumed; the handling pass stops after this recognizer.
    pub fn consume(&mut self) {
        self.consumed = true;
    }
}

impl DetectLookup for Context<'_> {
    fn detect_state(&self, id: RecognizerId) -> Option<DetectState> {
        self.core.arena.detect_state(id)
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The gesture engine: recognizer storage, event dispatch, and the effect queue.
//!
//! ## Overview
//!
//! [`GestureEngine`] owns every recognizer in a generational arena, the
//! [`GestureReferee`], and the table of outstanding timers. All public entry points
//! ([`dispatch`](GestureEngine::dispatch), [`fire_timer`](GestureEngine::fire_timer),
//! [`resolve`](GestureEngine::resolve), …) run to completion: disposals and verdicts raised
//! along the way are queued and drained in FIFO order before the call returns.
//!
//! ## Dispatch
//!
//! The host supplies, per event, the ordered list of interested recognizers, most specific first.
//! An entry whose mask is [`GestureMask::IgnoreInternal`] hides every entry before it.
//! The event then goes through a filter pass (each entry's [`Recognizer::filter`], stopping at the
//! first `Stop`/`StopAndConsume`) and a handling pass (each entry's
//! [`Recognizer::handle_event`], stopping after an entry calls
//! [`Context::consume`](crate::recognizer::Context::consume)). UP and CANCEL close the scope for
//! their pointer once the queue is drained.
//!
//! ## Example
//!
//! ```
//! use core::time::Duration;
//! use understory_gesture::engine::GestureEngine;
//! use understory_gesture::recognizers::{LongPress, Tap};
//! use understory_gesture::types::{PointerEvent, PointerId, RefereeState};
//!
//! let mut engine = GestureEngine::new();
//! let tap = engine.insert(Tap::default());
//! let long_press = engine.insert(LongPress::default());
//! let targets = [tap, long_press];
//!
//! engine.dispatch(&PointerEvent::down(1, 10.0, 10.0, Duration::ZERO), &targets);
//! // Holding past the long-press deadline decides the contest.
//! engine.advance_time(Duration::from_millis(600));
//! assert_eq!(engine.referee_state(long_press, PointerId(1)), Some(RefereeState::Succeeded));
//! assert_eq!(engine.referee_state(tap, PointerId(1)), Some(RefereeState::Failed));
//! ```

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;
use core::time::Duration;

use crate::arena::Arena;
use crate::recognizer::{Context, Recognizer};
use crate::referee::{CloseOutcome, GestureReferee};
use crate::scope::Transition;
use crate::timer::{ManualScheduler, Scheduler};
use crate::types::{
    DetectState, Disposal, GestureMask, GesturePriority, Notice, Outcome, PointerEvent, PointerId,
    RecognizerId, RefereeState, TimerId,
};

/// Queued work produced while a recognizer is being called.
#[derive(Copy, Clone, Debug)]
pub(crate) enum Effect {
    /// A disposal, routed to the parent group or to the referee.
    Resolve {
        from: RecognizerId,
        pointer: PointerId,
        disposal: Disposal,
    },
    /// A verdict to deliver.
    Notify {
        id: RecognizerId,
        pointer: PointerId,
        notice: Notice,
    },
}

/// Engine state reachable from a [`Context`].
#[derive(Debug, Default)]
pub(crate) struct Core {
    pub(crate) arena: Arena,
    pub(crate) referee: GestureReferee,
    pub(crate) timers: BTreeMap<TimerId, RecognizerId>,
    pub(crate) next_timer: u64,
    pub(crate) effects: VecDeque<Effect>,
}

impl Core {
    /// Lend `id` out of the arena and run `f` with a context for it.
    ///
    /// Returns `None` if `id` is stale or already lent out; otherwise the closure's value and
    /// whether the recognizer consumed the event.
    pub(crate) fn call<T>(
        &mut self,
        scheduler: &mut dyn Scheduler,
        id: RecognizerId,
        f: impl FnOnce(&mut dyn Recognizer, &mut Context<'_>) -> T,
    ) -> Option<(T, bool)> {
        let Some(mut boxed) = self.arena.take(id) else {
            if self.arena.is_alive(id) {
                log::warn!("re-entrant call into {id:?} ignored");
            }
            return None;
        };
        let (value, consumed) = {
            let mut cx = Context::new(id, self, scheduler);
            let value = f(&mut *boxed, &mut cx);
            (value, cx.consumed())
        };
        self.arena.restore(id, boxed);
        Some((value, consumed))
    }

    pub(crate) fn apply(&mut self, t: Transition) {
        if let Some(slot) = self.arena.get_mut(t.id) {
            slot.referee.insert(t.pointer, t.state);
        }
        if let Some(notice) = t.notice {
            self.effects.push_back(Effect::Notify {
                id: t.id,
                pointer: t.pointer,
                notice,
            });
        }
    }

    fn apply_all(&mut self, transitions: Vec<Transition>) {
        for t in transitions {
            self.apply(t);
        }
    }

    pub(crate) fn register(&mut self, pointer: PointerId, id: RecognizerId) -> bool {
        if !self.arena.is_alive(id) {
            log::warn!("registration of stale recognizer {id:?} for {pointer:?} ignored");
            return false;
        }
        let path = self.arena.ancestry(id);
        let root = path.last().copied().unwrap_or(id);
        let priority = self
            .arena
            .get(root)
            .map(|slot| slot.priority)
            .unwrap_or_default();
        let added = self.referee.register(pointer, root, priority);
        // Groups between the recognizer and the root learn the pointer through their mirror.
        for target in path {
            if let Some(slot) = self.arena.get_mut(target) {
                let fresh = slot.detect == DetectState::Ready;
                if fresh {
                    // A new cycle starts; verdicts from the previous one are stale.
                    slot.referee.clear();
                }
                if fresh || (added && target == root) || !slot.referee.contains_key(&pointer) {
                    slot.referee.insert(pointer, RefereeState::Detecting);
                }
            }
        }
        added
    }

    pub(crate) fn unregister(&mut self, pointer: PointerId, id: RecognizerId) -> bool {
        if self.arena.root_of(id) != id {
            return false;
        }
        let mut out = Vec::new();
        let removed = self
            .referee
            .unregister(pointer, id, &self.arena, &mut out);
        if removed {
            if let Some(slot) = self.arena.get_mut(id) {
                slot.referee.remove(&pointer);
            }
        }
        self.apply_all(out);
        removed
    }

    pub(crate) fn referee_state(
        &self,
        id: RecognizerId,
        pointer: PointerId,
    ) -> Option<RefereeState> {
        self.arena.get(id)?.referee.get(&pointer).copied()
    }

    /// Run queued effects until the queue is empty.
    pub(crate) fn drain(&mut self, scheduler: &mut dyn Scheduler) {
        while let Some(effect) = self.effects.pop_front() {
            match effect {
                Effect::Resolve {
                    from,
                    pointer,
                    disposal,
                } => {
                    let Some(slot) = self.arena.get(from) else {
                        continue;
                    };
                    match slot.parent.filter(|p| self.arena.is_alive(*p)) {
                        Some(parent) => {
                            self.call(scheduler, parent, |r, cx| {
                                r.on_child_disposal(from, pointer, disposal, cx);
                            });
                        }
                        None => {
                            let mut out = Vec::new();
                            self.referee
                                .resolve(pointer, from, disposal, &self.arena, &mut out);
                            self.apply_all(out);
                        }
                    }
                }
                Effect::Notify {
                    id,
                    pointer,
                    notice,
                } => {
                    self.call(scheduler, id, |r, cx| match notice {
                        Notice::Accepted => r.on_accepted(pointer, cx),
                        Notice::Rejected => r.on_rejected(pointer, cx),
                        Notice::Pending => r.on_pending(pointer, cx),
                    });
                }
            }
        }
    }
}

/// Owner of recognizers, the referee, and the timer table.
pub struct GestureEngine<S: Scheduler = ManualScheduler> {
    core: Core,
    scheduler: S,
}

impl<S: Scheduler> core::fmt::Debug for GestureEngine<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GestureEngine")
            .field("recognizers", &self.core.arena.len())
            .field("scopes", &self.core.referee.len())
            .field("timers", &self.core.timers.len())
            .finish_non_exhaustive()
    }
}

impl Default for GestureEngine<ManualScheduler> {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureEngine<ManualScheduler> {
    /// Create an engine driven by a virtual clock.
    pub fn new() -> Self {
        Self::with_scheduler(ManualScheduler::new())
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Move the virtual clock forward by `by`, firing every timer that comes due on the way
    /// (including timers scheduled by the ones that fire). Returns the number fired.
    pub fn advance_time(&mut self, by: Duration) -> usize {
        let until = self.scheduler.now() + by;
        let mut fired = 0;
        while let Some(timer) = self.scheduler.pop_due(until) {
            if self.fire_timer(timer) {
                fired += 1;
            }
        }
        self.scheduler.set_now(until);
        fired
    }
}

impl<S: Scheduler> GestureEngine<S> {
    /// Create an engine that schedules timers through `scheduler`.
    pub fn with_scheduler(scheduler: S) -> Self {
        Self {
            core: Core::default(),
            scheduler,
        }
    }

    /// The timer scheduler.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// The timer scheduler, mutably.
    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Read access to the referee.
    pub fn referee(&self) -> &GestureReferee {
        &self.core.referee
    }

    /// Number of live recognizers.
    pub fn len(&self) -> usize {
        self.core.arena.len()
    }

    /// Returns true if no recognizer is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a recognizer. Its children (for composites) are linked to it as their parent.
    pub fn insert<R: Recognizer>(&mut self, recognizer: R) -> RecognizerId {
        self.insert_boxed(Box::new(recognizer))
    }

    /// Add a boxed recognizer.
    pub fn insert_boxed(&mut self, recognizer: Box<dyn Recognizer>) -> RecognizerId {
        let children = recognizer.children().to_vec();
        let id = self.core.arena.insert(recognizer);
        for child in children {
            match self.core.arena.get_mut(child) {
                Some(slot) => {
                    if let Some(previous) = slot.parent.replace(id) {
                        log::warn!("{child:?} moved from group {previous:?} to {id:?}");
                    }
                }
                None => log::warn!("group {id:?} lists stale child {child:?}"),
            }
        }
        id
    }

    /// Remove a recognizer and its children.
    ///
    /// Memberships are dropped without a verdict and outstanding timers are canceled.
    pub fn remove(&mut self, id: RecognizerId) -> bool {
        if !self.core.arena.is_alive(id) {
            return false;
        }
        let ids = self.core.arena.subtree(id);
        self.discard(&ids);
        self.core.drain(&mut self.scheduler);
        true
    }

    fn discard(&mut self, ids: &[RecognizerId]) {
        let core = &mut self.core;
        let mut out = Vec::new();
        for &id in ids {
            core.referee.unregister_everywhere(id, &core.arena, &mut out);
        }
        let scheduler = &mut self.scheduler;
        core.timers.retain(|timer, owner| {
            let keep = !ids.contains(owner);
            if !keep {
                scheduler.cancel(*timer);
            }
            keep
        });
        for &id in ids {
            core.arena.remove(id);
        }
        for t in out {
            core.apply(t);
        }
    }

    /// Returns true if `id` refers to a live recognizer.
    pub fn is_alive(&self, id: RecognizerId) -> bool {
        self.core.arena.is_alive(id)
    }

    /// Borrow a recognizer as its concrete type.
    pub fn get<R: Recognizer>(&self, id: RecognizerId) -> Option<&R> {
        self.core.arena.recognizer(id)?.downcast_ref::<R>()
    }

    /// Borrow a recognizer as its concrete type, mutably (for example to attach callbacks).
    pub fn get_mut<R: Recognizer>(&mut self, id: RecognizerId) -> Option<&mut R> {
        self.core.arena.recognizer_mut(id)?.downcast_mut::<R>()
    }

    /// Parent group of `id`.
    pub fn parent(&self, id: RecognizerId) -> Option<RecognizerId> {
        self.core.arena.get(id)?.parent
    }

    /// Priority class used when `id` registers at the top level.
    pub fn priority(&self, id: RecognizerId) -> Option<GesturePriority> {
        Some(self.core.arena.get(id)?.priority)
    }

    /// Set the priority class of `id`. Takes effect at its next registration.
    pub fn set_priority(&mut self, id: RecognizerId, priority: GesturePriority) -> bool {
        match self.core.arena.get_mut(id) {
            Some(slot) => {
                slot.priority = priority;
                true
            }
            None => false,
        }
    }

    /// Dispatch mask of `id`.
    pub fn mask(&self, id: RecognizerId) -> Option<GestureMask> {
        Some(self.core.arena.get(id)?.mask)
    }

    /// Set the dispatch mask of `id`.
    pub fn set_mask(&mut self, id: RecognizerId, mask: GestureMask) -> bool {
        match self.core.arena.get_mut(id) {
            Some(slot) => {
                slot.mask = mask;
                true
            }
            None => false,
        }
    }

    /// Detection progress of `id` as of its last call.
    pub fn detect_state(&self, id: RecognizerId) -> Option<DetectState> {
        Some(self.core.arena.get(id)?.detect)
    }

    /// Last referee state assigned to `id` for `pointer`.
    pub fn referee_state(&self, id: RecognizerId, pointer: PointerId) -> Option<RefereeState> {
        self.core.referee_state(id, pointer)
    }

    /// Deliver `event` to `targets` (most specific first). Returns true if it was consumed.
    pub fn dispatch(&mut self, event: &PointerEvent, targets: &[RecognizerId]) -> bool {
        let start = targets
            .iter()
            .rposition(|&id| self.mask(id) == Some(GestureMask::IgnoreInternal))
            .unwrap_or(0);
        let targets = &targets[start..];

        let mut consumed = false;
        for &id in targets {
            let Some(recognizer) = self.core.arena.recognizer_mut(id) else {
                continue;
            };
            match recognizer.filter(event) {
                Outcome::Continue => {}
                Outcome::Stop => break,
                Outcome::StopAndConsume => {
                    consumed = true;
                    break;
                }
            }
        }

        for &id in targets {
            let handled = self
                .core
                .call(&mut self.scheduler, id, |r, cx| r.handle_event(event, cx));
            if let Some(((), true)) = handled {
                consumed = true;
                break;
            }
        }
        self.core.drain(&mut self.scheduler);

        if event.kind.is_terminal() {
            self.close(event.pointer);
        }
        consumed
    }

    /// Feed `event` to one recognizer outside of a dispatch. The scope is not closed on UP.
    pub fn handle_event(&mut self, id: RecognizerId, event: &PointerEvent) -> bool {
        let handled = self
            .core
            .call(&mut self.scheduler, id, |r, cx| r.handle_event(event, cx))
            .is_some();
        self.core.drain(&mut self.scheduler);
        handled
    }

    /// Register `id` (through its outermost ancestor) for `pointer`.
    pub fn register(&mut self, pointer: PointerId, id: RecognizerId) -> bool {
        let added = self.core.register(pointer, id);
        self.core.drain(&mut self.scheduler);
        added
    }

    /// Remove a top-level recognizer from the scope for `pointer` without a verdict.
    pub fn unregister(&mut self, pointer: PointerId, id: RecognizerId) -> bool {
        let removed = self.core.unregister(pointer, id);
        self.core.drain(&mut self.scheduler);
        removed
    }

    /// Report a disposal on behalf of `id`, then drain.
    pub fn resolve(&mut self, pointer: PointerId, id: RecognizerId, disposal: Disposal) -> bool {
        if !self.is_alive(id) {
            log::warn!("disposal {disposal:?} from stale recognizer {id:?} ignored");
            return false;
        }
        self.core.effects.push_back(Effect::Resolve {
            from: id,
            pointer,
            disposal,
        });
        self.core.drain(&mut self.scheduler);
        true
    }

    /// Force-close the scope for `pointer`. Deferred while a member is pending.
    pub fn close(&mut self, pointer: PointerId) -> CloseOutcome {
        let mut out = Vec::new();
        let outcome = self.core.referee.close(pointer, &mut out);
        self.core.apply_all(out);
        self.core.drain(&mut self.scheduler);
        outcome
    }

    /// Run the owner of `timer`. Returns false for a canceled, fired, or unknown timer.
    pub fn fire_timer(&mut self, timer: TimerId) -> bool {
        let Some(owner) = self.core.timers.remove(&timer) else {
            return false;
        };
        let ran = self
            .core
            .call(&mut self.scheduler, owner, |r, cx| r.on_timer(timer, cx))
            .is_some();
        self.core.drain(&mut self.scheduler);
        ran
    }

    /// Let `new` take over from `old` after a rebuild.
    ///
    /// When every recognizer in `new`'s subtree can reconcile with its positional counterpart
    /// under `old`, each new recognizer absorbs the old one's state, and the engine moves scope
    /// memberships, timers, priority, mask, and mirrored states over to the new ids before freeing
    /// the old subtree. Otherwise the old subtree is removed (no verdicts) and `new` starts cold.
    pub fn reconcile(&mut self, new: RecognizerId, old: RecognizerId) -> bool {
        if new == old || !self.is_alive(new) || !self.is_alive(old) {
            log::warn!("reconcile of {new:?} from {old:?} ignored");
            return false;
        }
        let Some(pairs) = self.reconcile_pairs(new, old) else {
            log::debug!("{new:?} cannot reconcile from {old:?}; starting cold");
            self.remove(old);
            return false;
        };
        let arena = &mut self.core.arena;
        for &(n, o) in &pairs {
            if let Some(mut fresh) = arena.take(n) {
                if let Some(mut stale) = arena.take(o) {
                    fresh.reconcile_from(&mut *stale);
                    arena.restore(o, stale);
                }
                arena.restore(n, fresh);
            }
            let Some(old_slot) = arena.get_mut(o) else {
                continue;
            };
            let priority = old_slot.priority;
            let mask = old_slot.mask;
            let mirrored = core::mem::take(&mut old_slot.referee);
            if let Some(slot) = arena.get_mut(n) {
                slot.priority = priority;
                slot.mask = mask;
                slot.referee = mirrored;
            }
            self.core.referee.replace(o, n);
            for owner in self.core.timers.values_mut() {
                if *owner == o {
                    *owner = n;
                }
            }
        }
        for &(_, o) in &pairs {
            self.core.arena.remove(o);
        }
        self.core.drain(&mut self.scheduler);
        true
    }

    fn reconcile_pairs(
        &self,
        new: RecognizerId,
        old: RecognizerId,
    ) -> Option<Vec<(RecognizerId, RecognizerId)>> {
        let arena = &self.core.arena;
        let mut pairs = Vec::new();
        let mut stack = Vec::from([(new, old)]);
        while let Some((n, o)) = stack.pop() {
            if n == o {
                return None;
            }
            let fresh = arena.recognizer(n)?;
            let stale = arena.recognizer(o)?;
            if !fresh.can_reconcile(stale) || fresh.children().len() != stale.children().len() {
                return None;
            }
            stack.extend(
                fresh
                    .children()
                    .iter()
                    .copied()
                    .zip(stale.children().iter().copied()),
            );
            pairs.push((n, o));
        }
        Some(pairs)
    }
}

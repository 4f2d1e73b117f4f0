// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-finger aggregation: one gesture-level decision from per-pointer verdicts.
//!
//! A recognizer that follows several pointers sits in one scope per pointer and receives one
//! verdict per pointer. [`MultiFinger`] turns those into a single outcome:
//!
//! - the gesture is accepted exactly once, when every registered pointer has been accepted;
//! - the gesture is rejected on the first rejected pointer, and the recognizer then withdraws
//!   from every other scope it is still undecided in.
//!
//! It also keeps the down and last positions of the fingers currently in contact.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::time::Duration;

use kurbo::{Point, Vec2};

use crate::recognizer::Context;
use crate::types::{Disposal, PointerEvent, PointerId};

/// A finger in contact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Finger {
    /// Position at DOWN.
    pub down: Point,
    /// Most recent position.
    pub last: Point,
    /// Time of DOWN.
    pub down_time: Duration,
    /// Time of the most recent event.
    pub last_time: Duration,
}

/// Gesture-level decision.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Every registered pointer was accepted.
    Accepted,
    /// At least one pointer was rejected.
    Rejected,
}

/// Pointer bookkeeping and verdict aggregation for one gesture cycle.
#[derive(Clone, Debug, Default)]
pub struct MultiFinger {
    fingers: BTreeMap<PointerId, Finger>,
    registered: BTreeSet<PointerId>,
    accepted: BTreeSet<PointerId>,
    decision: Option<Decision>,
}

impl MultiFinger {
    /// Start following the pointer of a DOWN event and register it with the referee.
    ///
    /// Returns false if the pointer is already in contact.
    pub fn track(&mut self, event: &PointerEvent, cx: &mut Context<'_>) -> bool {
        if self.fingers.contains_key(&event.pointer) {
            return false;
        }
        self.fingers.insert(
            event.pointer,
            Finger {
                down: event.position,
                last: event.position,
                down_time: event.time,
                last_time: event.time,
            },
        );
        if self.registered.insert(event.pointer) {
            cx.register(event.pointer);
        }
        true
    }

    /// Record a MOVE; returns the displacement since the previous event of that finger.
    pub fn update(&mut self, event: &PointerEvent) -> Option<Vec2> {
        let finger = self.fingers.get_mut(&event.pointer)?;
        let delta = event.position - finger.last;
        finger.last = event.position;
        finger.last_time = event.time;
        Some(delta)
    }

    /// The finger lifted. Its registration (and pending verdict) stays.
    pub fn lift(&mut self, pointer: PointerId) -> Option<Finger> {
        self.fingers.remove(&pointer)
    }

    /// The finger lifted before the gesture was decided: forget it entirely.
    ///
    /// Returns true if dropping it completes a gesture-level acceptance.
    pub fn untrack(&mut self, pointer: PointerId, cx: &mut Context<'_>) -> bool {
        self.fingers.remove(&pointer);
        if !self.registered.remove(&pointer) {
            return false;
        }
        self.accepted.remove(&pointer);
        cx.unregister(pointer);
        self.check_accepted()
    }

    /// Fingers in contact.
    pub fn fingers(&self) -> impl Iterator<Item = (PointerId, &Finger)> + '_ {
        self.fingers.iter().map(|(p, f)| (*p, f))
    }

    /// A finger in contact.
    pub fn finger(&self, pointer: PointerId) -> Option<&Finger> {
        self.fingers.get(&pointer)
    }

    /// Number of fingers in contact.
    pub fn finger_count(&self) -> usize {
        self.fingers.len()
    }

    /// Returns true if `pointer` is in contact.
    pub fn is_down(&self, pointer: PointerId) -> bool {
        self.fingers.contains_key(&pointer)
    }

    /// Pointers registered this cycle, including lifted ones.
    pub fn registered(&self) -> impl Iterator<Item = PointerId> + '_ {
        self.registered.iter().copied()
    }

    /// Returns true if `pointer` was registered this cycle.
    pub fn is_registered(&self, pointer: PointerId) -> bool {
        self.registered.contains(&pointer)
    }

    /// Gesture-level decision, once made.
    pub fn decision(&self) -> Option<Decision> {
        self.decision
    }

    /// Returns true once the gesture was accepted.
    pub fn is_accepted(&self) -> bool {
        self.decision == Some(Decision::Accepted)
    }

    /// Returns true once the gesture was rejected.
    pub fn is_rejected(&self) -> bool {
        self.decision == Some(Decision::Rejected)
    }

    /// Centroid of the fingers in contact.
    pub fn centroid(&self) -> Option<Point> {
        if self.fingers.is_empty() {
            return None;
        }
        let sum = self
            .fingers
            .values()
            .fold(Vec2::ZERO, |acc, f| acc + f.last.to_vec2());
        Some((sum / self.fingers.len() as f64).to_point())
    }

    /// Ask to win every registered, not yet accepted pointer.
    pub fn claim(&self, cx: &mut Context<'_>) {
        self.resolve_undecided(Disposal::Accept, cx);
    }

    /// Ask to wait on every registered, not yet accepted pointer.
    pub fn pend(&self, cx: &mut Context<'_>) {
        self.resolve_undecided(Disposal::Pending, cx);
    }

    /// Give up the gesture: reject every registered, not yet accepted pointer.
    pub fn withdraw(&mut self, cx: &mut Context<'_>) {
        if self.decision.is_none() {
            self.decision = Some(Decision::Rejected);
        }
        self.resolve_undecided(Disposal::Reject, cx);
    }

    fn resolve_undecided(&self, disposal: Disposal, cx: &mut Context<'_>) {
        for pointer in self.registered.difference(&self.accepted) {
            cx.resolve(*pointer, disposal);
        }
    }

    /// Record an accepted pointer. Returns true exactly once: when the last one is accepted.
    pub fn on_accepted(&mut self, pointer: PointerId) -> bool {
        if !self.registered.contains(&pointer) {
            return false;
        }
        self.accepted.insert(pointer);
        self.check_accepted()
    }

    fn check_accepted(&mut self) -> bool {
        if self.decision.is_some() || self.registered.is_empty() {
            return false;
        }
        if self.registered.is_subset(&self.accepted) {
            self.decision = Some(Decision::Accepted);
            return true;
        }
        false
    }

    /// Record a rejected pointer. Returns true exactly once: on the first rejection of an
    /// undecided gesture, after withdrawing from the other pointers. Registrations are then
    /// forgotten; fingers in contact stay.
    ///
    /// A pointer that joined an already accepted gesture and then lost is simply dropped.
    pub fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) -> bool {
        match self.decision {
            Some(Decision::Rejected) => false,
            Some(Decision::Accepted) => {
                self.registered.remove(&pointer);
                self.fingers.remove(&pointer);
                false
            }
            None => {
                self.accepted.remove(&pointer);
                self.registered.remove(&pointer);
                self.withdraw(cx);
                self.registered.clear();
                self.accepted.clear();
                true
            }
        }
    }

    /// Forget everything but the fingers still in contact.
    pub fn end_cycle(&mut self) {
        self.registered.clear();
        self.accepted.clear();
        self.decision = None;
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.fingers.clear();
        self.end_cycle();
    }

    /// Returns the pointers in contact in ascending id order.
    pub fn pointers(&self) -> Vec<PointerId> {
        self.fingers.keys().copied().collect()
    }
}

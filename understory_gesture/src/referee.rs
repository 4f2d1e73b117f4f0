// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gesture referee: the table of live [`GestureScope`]s keyed by pointer id.
//!
//! Scopes are created lazily by [`GestureReferee::register`] and removed as soon as they
//! empty, either through resolution or through [`GestureReferee::close`].
//! A close request against a pending scope is refused and remembered; the referee retries it
//! after each later resolution in that scope.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::scope::{DetectLookup, GestureScope, Resolution, Transition};
use crate::types::{Disposal, GesturePriority, PointerId, RecognizerId};

/// Outcome of a [`GestureReferee::close`] request.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CloseOutcome {
    /// No scope exists for the pointer.
    Absent,
    /// Every member was rejected and the scope was removed.
    Closed,
    /// The scope is pending; closure is retried once the pending member resolves.
    Deferred,
}

/// Registry mapping pointer ids to their arbitration scopes.
#[derive(Clone, Debug, Default)]
pub struct GestureReferee {
    scopes: BTreeMap<PointerId, GestureScope>,
}

impl GestureReferee {
    /// Create an empty referee.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns true if no scope is live.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scope for `pointer`, if live.
    pub fn scope(&self, pointer: PointerId) -> Option<&GestureScope> {
        self.scopes.get(&pointer)
    }

    /// Pointers that currently have a scope.
    pub fn pointers(&self) -> impl Iterator<Item = PointerId> + '_ {
        self.scopes.keys().copied()
    }

    /// Returns true if `id` is a member of the scope for `pointer`.
    pub fn contains(&self, pointer: PointerId, id: RecognizerId) -> bool {
        self.scopes.get(&pointer).is_some_and(|s| s.contains(id))
    }

    /// Add `id` to the scope for `pointer`, creating the scope if needed.
    ///
    /// Duplicate registration is a no-op and returns false.
    pub fn register(
        &mut self,
        pointer: PointerId,
        id: RecognizerId,
        priority: GesturePriority,
    ) -> bool {
        let scope = self.scopes.entry(pointer).or_insert_with(|| {
            log::debug!("scope created for {pointer:?}");
            GestureScope::new(pointer)
        });
        scope.add(id, priority)
    }

    /// Remove `id` from the scope for `pointer` without a verdict.
    pub fn unregister(
        &mut self,
        pointer: PointerId,
        id: RecognizerId,
        lookup: &impl DetectLookup,
        out: &mut Vec<Transition>,
    ) -> bool {
        let Some(scope) = self.scopes.get_mut(&pointer) else {
            return false;
        };
        let removed = scope.remove(id, lookup, out);
        self.settle(pointer, out);
        removed
    }

    /// Forward `disposal` from `id` to the scope for `pointer`.
    pub fn resolve(
        &mut self,
        pointer: PointerId,
        id: RecognizerId,
        disposal: Disposal,
        lookup: &impl DetectLookup,
        out: &mut Vec<Transition>,
    ) -> Resolution {
        let Some(scope) = self.scopes.get_mut(&pointer) else {
            log::warn!("disposal {disposal:?} from {id:?} for {pointer:?}, which has no scope");
            return Resolution::Ignored;
        };
        let resolution = scope.resolve(id, disposal, lookup, out);
        if resolution == Resolution::Exhausted {
            log::debug!("no high or low member left for {pointer:?}");
        }
        self.settle(pointer, out);
        resolution
    }

    /// Force-close the scope for `pointer`, rejecting every remaining member.
    pub fn close(&mut self, pointer: PointerId, out: &mut Vec<Transition>) -> CloseOutcome {
        let Some(scope) = self.scopes.get_mut(&pointer) else {
            return CloseOutcome::Absent;
        };
        if scope.is_pending() {
            log::debug!("closure of {pointer:?} deferred while a member is pending");
            scope.request_close();
            return CloseOutcome::Deferred;
        }
        scope.close(out);
        self.scopes.remove(&pointer);
        log::debug!("scope closed for {pointer:?}");
        CloseOutcome::Closed
    }

    /// Substitute `new` for `old` in every scope, keeping class and state.
    pub fn replace(&mut self, old: RecognizerId, new: RecognizerId) -> usize {
        self.scopes
            .values_mut()
            .filter(|scope| !scope.contains(new))
            .map(|scope| scope.replace(old, new))
            .filter(|replaced| *replaced)
            .count()
    }

    /// Remove `id` from every scope without a verdict.
    pub fn unregister_everywhere(
        &mut self,
        id: RecognizerId,
        lookup: &impl DetectLookup,
        out: &mut Vec<Transition>,
    ) {
        let pointers: Vec<PointerId> = self
            .scopes
            .iter()
            .filter(|(_, scope)| scope.contains(id))
            .map(|(p, _)| *p)
            .collect();
        for pointer in pointers {
            self.unregister(pointer, id, lookup, out);
        }
    }

    /// Retry a refused close and drop the scope once empty.
    fn settle(&mut self, pointer: PointerId, out: &mut Vec<Transition>) {
        let Some(scope) = self.scopes.get_mut(&pointer) else {
            return;
        };
        if scope.close_requested() && !scope.is_pending() {
            scope.close(out);
        }
        if scope.is_empty() {
            self.scopes.remove(&pointer);
            log::debug!("scope removed for {pointer:?}");
        }
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gesture scope: the arbitration unit for one pointer id.
//!
//! ## Overview
//!
//! A [`GestureScope`] holds the recognizers competing for one pointer, split into
//! three priority classes, and resolves their [`Disposal`]s:
//!
//! - `Parallel` members are accepted or rejected on their own and never affect the other classes.
//! - An `Accept` from a `High` or `Low` member wins its class unless another member of the
//!   same class is pending, in which case the acceptor is blocked.
//!   A `High` winner also rejects the whole `Low` class.
//! - A `Pending` from a member behind another pending member degrades to blocked.
//! - A `Reject` removes the member. If it was pending, the first blocked member of its class
//!   is promoted to the winner (when its own [`DetectState`] is already `Detected`) or
//!   demoted to pending (otherwise).
//!
//! The scope never calls recognizers. Every state change is appended to an output list of
//! [`Transition`]s that the caller applies and delivers; this keeps resolution re-entrancy free
//! and makes the algorithm testable in isolation.

use alloc::vec::Vec;

use crate::types::{
    DetectState, Disposal, GesturePriority, Notice, PointerId, RecognizerId, RefereeState,
};

/// Look up the detection progress of a recognizer.
///
/// The scope consults this when it unblocks a member and to drop members whose recognizer
/// no longer exists. Returning `None` marks the id as stale.
pub trait DetectLookup {
    /// Returns the current [`DetectState`] of `id`, or `None` if `id` is stale.
    fn detect_state(&self, id: RecognizerId) -> Option<DetectState>;
}

/// One referee state change produced by a scope or group.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    /// Recognizer whose state changed.
    pub id: RecognizerId,
    /// Pointer the change applies to.
    pub pointer: PointerId,
    /// New referee state.
    pub state: RefereeState,
    /// Verdict to deliver to the recognizer, if any (blocking is silent).
    pub notice: Option<Notice>,
}

impl Transition {
    pub(crate) const fn new(
        id: RecognizerId,
        pointer: PointerId,
        state: RefereeState,
        notice: Option<Notice>,
    ) -> Self {
        Self {
            id,
            pointer,
            state,
            notice,
        }
    }

    pub(crate) const fn accepted(id: RecognizerId, pointer: PointerId) -> Self {
        Self::new(id, pointer, RefereeState::Succeeded, Some(Notice::Accepted))
    }

    pub(crate) const fn rejected(id: RecognizerId, pointer: PointerId) -> Self {
        Self::new(id, pointer, RefereeState::Failed, Some(Notice::Rejected))
    }

    pub(crate) const fn pending(id: RecognizerId, pointer: PointerId) -> Self {
        Self::new(id, pointer, RefereeState::Pending, Some(Notice::Pending))
    }

    pub(crate) const fn blocked(id: RecognizerId, pointer: PointerId) -> Self {
        Self::new(id, pointer, RefereeState::Blocked, None)
    }
}

/// Result of feeding one disposal to a scope.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    /// The recognizer is not a member; nothing changed.
    Ignored,
    /// The disposal was applied.
    Applied,
    /// A rejection left no `High` or `Low` member: nobody will win this pointer.
    Exhausted,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Member {
    pub(crate) id: RecognizerId,
    pub(crate) state: RefereeState,
}

/// Ordered membership list with per-member referee state.
///
/// Shared by the scope classes and by the groups that arbitrate among their children.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MemberList {
    members: Vec<Member>,
}

impl MemberList {
    pub(crate) fn from_ids(ids: &[RecognizerId]) -> Self {
        Self {
            members: ids
                .iter()
                .map(|&id| Member {
                    id,
                    state: RefereeState::Detecting,
                })
                .collect(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn contains(&self, id: RecognizerId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    pub(crate) fn state(&self, id: RecognizerId) -> Option<RefereeState> {
        self.members.iter().find(|m| m.id == id).map(|m| m.state)
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = RecognizerId> + '_ {
        self.members.iter().map(|m| m.id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Member> + '_ {
        self.members.iter()
    }

    /// Append `id` in `Detecting`; returns false for a duplicate.
    pub(crate) fn insert(&mut self, id: RecognizerId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(Member {
            id,
            state: RefereeState::Detecting,
        });
        true
    }

    pub(crate) fn set(&mut self, id: RecognizerId, state: RefereeState) {
        if let Some(m) = self.members.iter_mut().find(|m| m.id == id) {
            m.state = state;
        }
    }

    pub(crate) fn remove(&mut self, id: RecognizerId) -> Option<Member> {
        let pos = self.members.iter().position(|m| m.id == id)?;
        Some(self.members.remove(pos))
    }

    pub(crate) fn replace(&mut self, old: RecognizerId, new: RecognizerId) -> bool {
        match self.members.iter_mut().find(|m| m.id == old) {
            Some(m) => {
                m.id = new;
                true
            }
            None => false,
        }
    }

    pub(crate) fn has_pending_except(&self, id: RecognizerId) -> bool {
        self.members
            .iter()
            .any(|m| m.id != id && m.state == RefereeState::Pending)
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.members
            .iter()
            .any(|m| m.state == RefereeState::Pending)
    }

    pub(crate) fn first_blocked(&self) -> Option<RecognizerId> {
        self.members
            .iter()
            .find(|m| m.state == RefereeState::Blocked)
            .map(|m| m.id)
    }

    /// Reject every member except `keep`, then clear the list.
    pub(crate) fn reject_all_except(
        &mut self,
        keep: Option<RecognizerId>,
        pointer: PointerId,
        out: &mut Vec<Transition>,
    ) {
        for m in self.members.drain(..) {
            if Some(m.id) != keep {
                out.push(Transition::rejected(m.id, pointer));
            }
        }
    }

    /// Drop members whose recognizer is gone; returns true if a pending member was dropped.
    pub(crate) fn prune(&mut self, lookup: &impl DetectLookup) -> bool {
        let mut dropped_pending = false;
        self.members.retain(|m| {
            let alive = lookup.detect_state(m.id).is_some();
            if !alive {
                log::debug!("dropping stale member {:?}", m.id);
                dropped_pending |= m.state == RefereeState::Pending;
            }
            alive
        });
        dropped_pending
    }
}

/// Arbitration context for a single pointer id.
///
/// Created lazily by the [`GestureReferee`](crate::referee::GestureReferee) on the first
/// registration for a pointer, and removed once every list is empty.
#[derive(Clone, Debug)]
pub struct GestureScope {
    pointer: PointerId,
    high: MemberList,
    low: MemberList,
    parallel: MemberList,
    close_requested: bool,
}

impl GestureScope {
    /// Create an empty scope for `pointer`.
    pub fn new(pointer: PointerId) -> Self {
        Self {
            pointer,
            high: MemberList::default(),
            low: MemberList::default(),
            parallel: MemberList::default(),
            close_requested: false,
        }
    }

    /// Pointer this scope arbitrates.
    pub fn pointer(&self) -> PointerId {
        self.pointer
    }

    /// Add `id` to the list for `priority` in `Detecting`.
    ///
    /// Returns false (and changes nothing) if `id` is already a member of any list.
    pub fn add(&mut self, id: RecognizerId, priority: GesturePriority) -> bool {
        if self.contains(id) {
            return false;
        }
        self.list_mut(priority).insert(id)
    }

    /// Returns true if `id` is a member of any list.
    pub fn contains(&self, id: RecognizerId) -> bool {
        self.class_of(id).is_some()
    }

    /// Priority class `id` was registered with.
    pub fn class_of(&self, id: RecognizerId) -> Option<GesturePriority> {
        if self.high.contains(id) {
            Some(GesturePriority::High)
        } else if self.low.contains(id) {
            Some(GesturePriority::Low)
        } else if self.parallel.contains(id) {
            Some(GesturePriority::Parallel)
        } else {
            None
        }
    }

    /// Current referee state of a member.
    pub fn state_of(&self, id: RecognizerId) -> Option<RefereeState> {
        self.high
            .state(id)
            .or_else(|| self.low.state(id))
            .or_else(|| self.parallel.state(id))
    }

    /// Ids of every member, `High` first, then `Low`, then `Parallel`.
    pub fn members(&self) -> impl Iterator<Item = RecognizerId> + '_ {
        self.high
            .ids()
            .chain(self.low.ids())
            .chain(self.parallel.ids())
    }

    /// Number of members across all lists.
    pub fn len(&self) -> usize {
        self.high.len() + self.low.len() + self.parallel.len()
    }

    /// Returns true once every list is empty.
    pub fn is_empty(&self) -> bool {
        self.high.is_empty() && self.low.is_empty() && self.parallel.is_empty()
    }

    /// Returns true while any member is pending; such a scope refuses to close.
    pub fn is_pending(&self) -> bool {
        self.high.has_pending() || self.low.has_pending() || self.parallel.has_pending()
    }

    /// Returns true if a close was refused and must be retried.
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    pub(crate) fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// Resolve `disposal` from member `id`.
    pub fn resolve(
        &mut self,
        id: RecognizerId,
        disposal: Disposal,
        lookup: &impl DetectLookup,
        out: &mut Vec<Transition>,
    ) -> Resolution {
        self.prune(lookup, out);
        let Some(class) = self.class_of(id) else {
            log::warn!(
                "disposal {disposal:?} from {id:?}, which is not a member of the scope for {:?}",
                self.pointer
            );
            return Resolution::Ignored;
        };
        if class == GesturePriority::Parallel {
            self.resolve_parallel(id, disposal, out);
            return Resolution::Applied;
        }
        match disposal {
            Disposal::Accept => self.accept(class, id, out),
            Disposal::Pending => self.pending(class, id, out),
            Disposal::Reject => {
                let start = out.len();
                self.reject(class, id, lookup, out);
                // A promoted peer may have won and emptied the lists on its way out.
                let promoted = out[start..]
                    .iter()
                    .any(|t| t.notice == Some(Notice::Accepted));
                if self.high.is_empty() && self.low.is_empty() && !promoted {
                    return Resolution::Exhausted;
                }
            }
        }
        Resolution::Applied
    }

    /// Remove `id` without a verdict.
    ///
    /// If `id` was pending, its class is re-evaluated for a blocked member that can proceed.
    pub fn remove(
        &mut self,
        id: RecognizerId,
        lookup: &impl DetectLookup,
        out: &mut Vec<Transition>,
    ) -> bool {
        let Some(class) = self.class_of(id) else {
            return false;
        };
        let was_pending = self
            .list_mut(class)
            .remove(id)
            .is_some_and(|m| m.state == RefereeState::Pending);
        if was_pending && class != GesturePriority::Parallel {
            self.unblock(class, lookup, out);
        }
        true
    }

    /// Reject every remaining member and clear all lists.
    pub fn close(&mut self, out: &mut Vec<Transition>) {
        self.high.reject_all_except(None, self.pointer, out);
        self.low.reject_all_except(None, self.pointer, out);
        self.parallel.reject_all_except(None, self.pointer, out);
        self.close_requested = false;
    }

    /// Substitute `new` for `old`, keeping class and state.
    pub fn replace(&mut self, old: RecognizerId, new: RecognizerId) -> bool {
        self.high.replace(old, new) || self.low.replace(old, new) || self.parallel.replace(old, new)
    }

    fn prune(&mut self, lookup: &impl DetectLookup, out: &mut Vec<Transition>) {
        if self.high.prune(lookup) {
            self.unblock(GesturePriority::High, lookup, out);
        }
        if self.low.prune(lookup) {
            self.unblock(GesturePriority::Low, lookup, out);
        }
        self.parallel.prune(lookup);
    }

    fn list_mut(&mut self, class: GesturePriority) -> &mut MemberList {
        match class {
            GesturePriority::High => &mut self.high,
            GesturePriority::Low => &mut self.low,
            GesturePriority::Parallel => &mut self.parallel,
        }
    }

    fn resolve_parallel(
        &mut self,
        id: RecognizerId,
        disposal: Disposal,
        out: &mut Vec<Transition>,
    ) {
        let pointer = self.pointer;
        match disposal {
            Disposal::Accept => {
                self.parallel.remove(id);
                out.push(Transition::accepted(id, pointer));
            }
            Disposal::Reject => {
                self.parallel.remove(id);
                out.push(Transition::rejected(id, pointer));
            }
            Disposal::Pending => {
                if self.parallel.state(id) != Some(RefereeState::Pending) {
                    self.parallel.set(id, RefereeState::Pending);
                    out.push(Transition::pending(id, pointer));
                }
            }
        }
    }

    fn accept(&mut self, class: GesturePriority, id: RecognizerId, out: &mut Vec<Transition>) {
        let pointer = self.pointer;
        let list = self.list_mut(class);
        if list.has_pending_except(id) {
            if list.state(id) != Some(RefereeState::Blocked) {
                list.set(id, RefereeState::Blocked);
                out.push(Transition::blocked(id, pointer));
            }
            return;
        }
        list.reject_all_except(Some(id), pointer, out);
        if class == GesturePriority::High {
            self.low.reject_all_except(None, pointer, out);
        }
        out.push(Transition::accepted(id, pointer));
    }

    fn pending(&mut self, class: GesturePriority, id: RecognizerId, out: &mut Vec<Transition>) {
        let pointer = self.pointer;
        let list = self.list_mut(class);
        match list.state(id) {
            Some(RefereeState::Pending | RefereeState::Blocked) => {}
            _ if list.has_pending_except(id) => {
                list.set(id, RefereeState::Blocked);
                out.push(Transition::blocked(id, pointer));
            }
            _ => {
                list.set(id, RefereeState::Pending);
                out.push(Transition::pending(id, pointer));
            }
        }
    }

    fn reject(
        &mut self,
        class: GesturePriority,
        id: RecognizerId,
        lookup: &impl DetectLookup,
        out: &mut Vec<Transition>,
    ) {
        let pointer = self.pointer;
        let Some(removed) = self.list_mut(class).remove(id) else {
            return;
        };
        out.push(Transition::rejected(id, pointer));
        if removed.state == RefereeState::Pending {
            self.unblock(class, lookup, out);
        }
    }

    fn unblock(
        &mut self,
        class: GesturePriority,
        lookup: &impl DetectLookup,
        out: &mut Vec<Transition>,
    ) {
        let pointer = self.pointer;
        let list = self.list_mut(class);
        let Some(blocked) = list.first_blocked() else {
            return;
        };
        if lookup.detect_state(blocked) == Some(DetectState::Detected) {
            // It already asked to win; promote through the accept path.
            list.set(blocked, RefereeState::Detecting);
            self.accept(class, blocked, out);
        } else {
            list.set(blocked, RefereeState::Pending);
            out.push(Transition::pending(blocked, pointer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;

    #[derive(Default)]
    struct States(BTreeMap<RecognizerId, DetectState>);

    impl States {
        fn with(ids: &[RecognizerId], state: DetectState) -> Self {
            Self(ids.iter().map(|&id| (id, state)).collect())
        }
    }

    impl DetectLookup for States {
        fn detect_state(&self, id: RecognizerId) -> Option<DetectState> {
            self.0.get(&id).copied()
        }
    }

    fn ids(n: u32) -> Vec<RecognizerId> {
        (0..n).map(|i| RecognizerId::new(i, 1)).collect()
    }

    fn notices(out: &[Transition]) -> Vec<(u32, Option<Notice>)> {
        out.iter().map(|t| (t.id.0, t.notice)).collect()
    }

    #[test]
    fn duplicate_registration_is_a_noop() {
        let r = ids(1);
        let mut scope = GestureScope::new(PointerId(1));
        assert!(scope.add(r[0], GesturePriority::Low));
        assert!(!scope.add(r[0], GesturePriority::Low));
        assert!(!scope.add(r[0], GesturePriority::High));
        assert_eq!(scope.len(), 1);

        let mut out = Vec::new();
        scope.close(&mut out);
        assert_eq!(out.len(), 1, "one rejection, not two");
    }

    #[test]
    fn first_accept_wins_and_rejects_class_peers() {
        let r = ids(3);
        let lookup = States::with(&r, DetectState::Detecting);
        let mut scope = GestureScope::new(PointerId(2));
        for &id in &r {
            scope.add(id, GesturePriority::Low);
        }
        let mut out = Vec::new();
        assert_eq!(
            scope.resolve(r[2], Disposal::Accept, &lookup, &mut out),
            Resolution::Applied
        );
        assert_eq!(
            notices(&out),
            vec![
                (0, Some(Notice::Rejected)),
                (1, Some(Notice::Rejected)),
                (2, Some(Notice::Accepted)),
            ]
        );
        assert!(scope.is_empty());

        // Later disposals from losers are ignored.
        out.clear();
        assert_eq!(
            scope.resolve(r[1], Disposal::Accept, &lookup, &mut out),
            Resolution::Ignored
        );
        assert!(out.is_empty());
    }

    #[test]
    fn high_accept_preempts_pending_low() {
        let r = ids(3);
        let lookup = States::with(&r, DetectState::Detected);
        let mut scope = GestureScope::new(PointerId(3));
        scope.add(r[0], GesturePriority::Low);
        scope.add(r[1], GesturePriority::High);
        scope.add(r[2], GesturePriority::Parallel);
        let mut out = Vec::new();
        scope.resolve(r[0], Disposal::Pending, &lookup, &mut out);
        assert_eq!(scope.state_of(r[0]), Some(RefereeState::Pending));
        out.clear();

        scope.resolve(r[1], Disposal::Accept, &lookup, &mut out);
        assert_eq!(
            notices(&out),
            vec![(0, Some(Notice::Rejected)), (1, Some(Notice::Accepted))]
        );
        // The parallel member is untouched.
        assert_eq!(scope.state_of(r[2]), Some(RefereeState::Detecting));
    }

    #[test]
    fn low_accept_leaves_high_alone() {
        let r = ids(2);
        let lookup = States::with(&r, DetectState::Detected);
        let mut scope = GestureScope::new(PointerId(3));
        scope.add(r[0], GesturePriority::High);
        scope.add(r[1], GesturePriority::Low);
        let mut out = Vec::new();
        scope.resolve(r[1], Disposal::Accept, &lookup, &mut out);
        assert_eq!(notices(&out), vec![(1, Some(Notice::Accepted))]);
        assert_eq!(scope.state_of(r[0]), Some(RefereeState::Detecting));
    }

    #[test]
    fn parallel_members_resolve_independently() {
        let r = ids(3);
        let lookup = States::with(&r, DetectState::Detected);
        let mut scope = GestureScope::new(PointerId(4));
        scope.add(r[0], GesturePriority::Parallel);
        scope.add(r[1], GesturePriority::Parallel);
        scope.add(r[2], GesturePriority::Low);
        let mut out = Vec::new();
        scope.resolve(r[0], Disposal::Accept, &lookup, &mut out);
        scope.resolve(r[1], Disposal::Reject, &lookup, &mut out);
        assert_eq!(
            notices(&out),
            vec![(0, Some(Notice::Accepted)), (1, Some(Notice::Rejected))]
        );
        assert_eq!(scope.state_of(r[2]), Some(RefereeState::Detecting));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn pending_behind_pending_blocks_then_rejection_demotes() {
        let r = ids(2);
        let lookup = States::with(&r, DetectState::Detecting);
        let mut scope = GestureScope::new(PointerId(5));
        scope.add(r[0], GesturePriority::Low);
        scope.add(r[1], GesturePriority::Low);
        let mut out = Vec::new();
        scope.resolve(r[0], Disposal::Pending, &lookup, &mut out);
        scope.resolve(r[1], Disposal::Pending, &lookup, &mut out);
        assert_eq!(scope.state_of(r[1]), Some(RefereeState::Blocked));
        assert_eq!(out[1], Transition::blocked(r[1], PointerId(5)));

        out.clear();
        scope.resolve(r[0], Disposal::Reject, &lookup, &mut out);
        // Blocked peer is still detecting: it becomes the pending candidate.
        assert_eq!(
            notices(&out),
            vec![(0, Some(Notice::Rejected)), (1, Some(Notice::Pending))]
        );
        assert_eq!(scope.state_of(r[1]), Some(RefereeState::Pending));
    }

    #[test]
    fn rejection_of_pending_promotes_detected_blocked_peer() {
        let r = ids(2);
        let lookup = States::with(&r, DetectState::Detected);
        let mut scope = GestureScope::new(PointerId(6));
        scope.add(r[0], GesturePriority::Low);
        scope.add(r[1], GesturePriority::Low);
        let mut out = Vec::new();
        scope.resolve(r[0], Disposal::Pending, &lookup, &mut out);
        scope.resolve(r[1], Disposal::Accept, &lookup, &mut out);
        assert_eq!(scope.state_of(r[1]), Some(RefereeState::Blocked));

        out.clear();
        let res = scope.resolve(r[0], Disposal::Reject, &lookup, &mut out);
        assert_eq!(res, Resolution::Applied, "the promoted peer won");
        assert_eq!(
            notices(&out),
            vec![(0, Some(Notice::Rejected)), (1, Some(Notice::Accepted))]
        );
        assert!(scope.is_empty());
    }

    #[test]
    fn rejection_of_the_last_member_exhausts_the_scope() {
        let r = ids(2);
        let lookup = States::with(&r, DetectState::Detecting);
        let mut scope = GestureScope::new(PointerId(6));
        scope.add(r[0], GesturePriority::Low);
        scope.add(r[1], GesturePriority::High);
        let mut out = Vec::new();
        let res = scope.resolve(r[0], Disposal::Reject, &lookup, &mut out);
        assert_eq!(res, Resolution::Applied);
        let res = scope.resolve(r[1], Disposal::Reject, &lookup, &mut out);
        assert_eq!(res, Resolution::Exhausted);
        assert!(scope.is_empty());
    }

    #[test]
    fn three_low_members_scenario() {
        // A pending, B pending (blocked), C rejected, then A accepts.
        let r = ids(3);
        let (a, b, c) = (r[0], r[1], r[2]);
        let lookup = States::with(&r, DetectState::Detecting);
        let mut scope = GestureScope::new(PointerId(7));
        for &id in &r {
            scope.add(id, GesturePriority::Low);
        }
        let mut out = Vec::new();
        scope.resolve(a, Disposal::Pending, &lookup, &mut out);
        scope.resolve(b, Disposal::Pending, &lookup, &mut out);
        scope.resolve(c, Disposal::Reject, &lookup, &mut out);
        assert_eq!(scope.state_of(a), Some(RefereeState::Pending));
        assert_eq!(scope.state_of(b), Some(RefereeState::Blocked));
        assert_eq!(scope.state_of(c), None);

        out.clear();
        scope.resolve(a, Disposal::Accept, &lookup, &mut out);
        assert_eq!(
            out,
            vec![Transition::rejected(b, PointerId(7)), Transition::accepted(a, PointerId(7))]
        );
        assert!(scope.is_empty());
    }

    #[test]
    fn removing_pending_member_unblocks_without_verdict() {
        let r = ids(2);
        let lookup = States::with(&r, DetectState::Detected);
        let mut scope = GestureScope::new(PointerId(8));
        scope.add(r[0], GesturePriority::High);
        scope.add(r[1], GesturePriority::High);
        let mut out = Vec::new();
        scope.resolve(r[0], Disposal::Pending, &lookup, &mut out);
        scope.resolve(r[1], Disposal::Accept, &lookup, &mut out);
        out.clear();

        assert!(scope.remove(r[0], &lookup, &mut out));
        assert_eq!(notices(&out), vec![(1, Some(Notice::Accepted))]);
        assert!(!scope.remove(r[0], &lookup, &mut out));
    }

    #[test]
    fn stale_pending_member_is_pruned() {
        let r = ids(2);
        let mut lookup = States::with(&r, DetectState::Detecting);
        let mut scope = GestureScope::new(PointerId(9));
        scope.add(r[0], GesturePriority::Low);
        scope.add(r[1], GesturePriority::Low);
        let mut out = Vec::new();
        scope.resolve(r[0], Disposal::Pending, &lookup, &mut out);
        assert!(scope.is_pending());

        lookup.0.remove(&r[0]);
        out.clear();
        scope.resolve(r[1], Disposal::Accept, &lookup, &mut out);
        assert_eq!(notices(&out), vec![(1, Some(Notice::Accepted))]);
        assert!(!scope.is_pending());
        assert!(scope.is_empty());
    }

    #[test]
    fn close_rejects_everyone_once() {
        let r = ids(3);
        let mut scope = GestureScope::new(PointerId(10));
        scope.add(r[0], GesturePriority::High);
        scope.add(r[1], GesturePriority::Low);
        scope.add(r[2], GesturePriority::Parallel);
        let mut out = Vec::new();
        scope.close(&mut out);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|t| t.notice == Some(Notice::Rejected)));
        assert!(scope.is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn disposal() -> impl Strategy<Value = Disposal> {
            prop_oneof![
                Just(Disposal::Accept),
                Just(Disposal::Reject),
                Just(Disposal::Pending)
            ]
        }

        fn priority() -> impl Strategy<Value = GesturePriority> {
            prop_oneof![Just(GesturePriority::Low), Just(GesturePriority::High)]
        }

        proptest! {
            #[test]
            fn at_most_one_winner_and_winner_is_final(
                classes in proptest::collection::vec(priority(), 1..6),
                detected in proptest::collection::vec(any::<bool>(), 6),
                steps in proptest::collection::vec((0usize..6, disposal()), 0..24),
            ) {
                let r = ids(u32::try_from(classes.len()).expect("small"));
                let lookup = States(
                    r.iter()
                        .zip(&detected)
                        .map(|(&id, &d)| (id, if d { DetectState::Detected } else { DetectState::Detecting }))
                        .collect(),
                );
                let mut scope = GestureScope::new(PointerId(0));
                for (&id, &class) in r.iter().zip(&classes) {
                    scope.add(id, class);
                }
                let mut out = Vec::new();
                for (who, d) in steps {
                    if let Some(&id) = r.get(who) {
                        scope.resolve(id, d, &lookup, &mut out);
                    }
                }
                let mut verdicts: BTreeMap<RecognizerId, Notice> = BTreeMap::new();
                for t in &out {
                    match t.notice {
                        Some(Notice::Accepted) | Some(Notice::Rejected) => {
                            let n = t.notice.expect("matched");
                            prop_assert!(
                                verdicts.insert(t.id, n).is_none(),
                                "a member got two terminal verdicts"
                            );
                        }
                        _ => {}
                    }
                }
                let winners: Vec<_> = verdicts
                    .iter()
                    .filter(|(_, n)| **n == Notice::Accepted)
                    .map(|(id, _)| *id)
                    .collect();
                // At most one High winner and at most one Low winner, and a High winner means
                // every Low member has a verdict.
                let high_winners = winners
                    .iter()
                    .filter(|id| classes[id.idx()] == GesturePriority::High)
                    .count();
                let low_winners = winners.len() - high_winners;
                prop_assert!(high_winners <= 1);
                prop_assert!(low_winners <= 1);
                if high_winners == 1 {
                    for (i, class) in classes.iter().enumerate() {
                        if *class == GesturePriority::Low {
                            prop_assert!(verdicts.contains_key(&r[i]));
                        }
                    }
                }
                // Every member with a verdict has left the scope.
                for id in verdicts.keys() {
                    prop_assert!(!scope.contains(*id));
                }
            }

            #[test]
            fn rejecting_everyone_always_empties_the_scope(
                classes in proptest::collection::vec(priority(), 1..6),
                detected in proptest::collection::vec(any::<bool>(), 6),
                pendings in proptest::collection::vec(any::<bool>(), 6),
            ) {
                let r = ids(u32::try_from(classes.len()).expect("small"));
                let lookup = States(
                    r.iter()
                        .zip(&detected)
                        .map(|(&id, &d)| (id, if d { DetectState::Detected } else { DetectState::Detecting }))
                        .collect(),
                );
                let mut scope = GestureScope::new(PointerId(0));
                for (&id, &class) in r.iter().zip(&classes) {
                    scope.add(id, class);
                }
                let mut out = Vec::new();
                for (&id, &p) in r.iter().zip(&pendings) {
                    if p {
                        scope.resolve(id, Disposal::Pending, &lookup, &mut out);
                    }
                }
                // Each step removes at least the rejected member, so this loop is bounded by
                // the member count.
                let mut steps = 0;
                loop {
                    let next = scope.members().next();
                    let Some(id) = next else { break };
                    scope.resolve(id, Disposal::Reject, &lookup, &mut out);
                    steps += 1;
                    prop_assert!(steps <= r.len());
                }
                prop_assert!(scope.is_empty());
                prop_assert!(!scope.is_pending());
            }
        }
    }
}

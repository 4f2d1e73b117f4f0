// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composite recognizers built from child recognizers.
//!
//! ## Overview
//!
//! A group is itself a [`Recognizer`](crate::recognizer::Recognizer): it takes part in its
//! parent's arbitration like any leaf, and in turn arbitrates among its own children.
//! Children are inserted into the engine first; inserting the group links them to it.
//!
//! | Group | Routing | Claims upward |
//! |---|---|---|
//! | [`Exclusive`] | the one detected child, else every child | when one child wins locally |
//! | [`Parallel`] | every child not yet failed | on the first child accept |
//! | [`Sequence`] | the current stage (plus earlier stages still tracking) | when the last stage accepts |
//! | [`Timeout`] | the single child until the deadline | relays the child |
//!
//! UP and CANCEL always reach every child, so a child that lost can still end its cycle.
//! Nesting is arbitrary: a group may list other groups as children.
//!
//! ```
//! use understory_gesture::engine::GestureEngine;
//! use understory_gesture::groups::Exclusive;
//! use understory_gesture::recognizers::{LongPress, Tap};
//!
//! let mut engine = GestureEngine::new();
//! let long_press = engine.insert(LongPress::default());
//! let tap = engine.insert(Tap::default());
//! let group = engine.insert(Exclusive::new([long_press, tap]));
//! assert_eq!(engine.parent(tap), Some(group));
//! ```

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::recognizer::Context;
use crate::scope::{DetectLookup, MemberList, Transition};
use crate::types::{DetectState, Disposal, Notice, PointerId, RecognizerId, RefereeState};

mod exclusive;
mod parallel;
mod sequence;
mod timeout;

pub use exclusive::Exclusive;
pub use parallel::Parallel;
pub use sequence::Sequence;
pub use timeout::{DEFAULT_GESTURE_TIMEOUT, Timeout, TimeoutConfig};

/// A group's arbitration state for one pointer.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Lane {
    /// Children registered for the pointer and not yet decided.
    pub(crate) members: MemberList,
    /// Child that asked to win and is waiting for the group's own verdict.
    pub(crate) winner: Option<RecognizerId>,
    /// `Accept` was sent upward.
    pub(crate) claimed: bool,
    /// `Pending` was sent upward.
    pub(crate) pending: bool,
    /// Verdict the group received for the pointer.
    pub(crate) verdict: Option<Notice>,
}

impl Lane {
    /// Ask to win upward, once.
    pub(crate) fn claim(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if !self.claimed && self.verdict.is_none() {
            self.claimed = true;
            cx.resolve(pointer, Disposal::Accept);
        }
    }

    /// Ask to wait upward, once, unless already claimed.
    pub(crate) fn pend(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if !self.claimed && !self.pending && self.verdict.is_none() {
            self.pending = true;
            cx.resolve(pointer, Disposal::Pending);
        }
    }

    /// Give up upward, unless a verdict already arrived.
    pub(crate) fn withdraw(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if self.verdict.is_none() {
            self.verdict = Some(Notice::Rejected);
            cx.resolve(pointer, Disposal::Reject);
        }
    }

    /// Reject every remaining member and clear the list.
    pub(crate) fn reject_members(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        let mut out = Vec::new();
        self.members.reject_all_except(None, pointer, &mut out);
        for t in out {
            cx.apply(t);
        }
        self.winner = None;
    }

    /// Accept `child`, reject everyone else.
    pub(crate) fn crown(&mut self, child: RecognizerId, pointer: PointerId, cx: &mut Context<'_>) {
        self.members.remove(child);
        self.reject_members(pointer, cx);
        cx.apply(Transition::accepted(child, pointer));
    }
}

/// Per-pointer lanes of one group.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Roster {
    lanes: BTreeMap<PointerId, Lane>,
}

impl Roster {
    /// Add every child that registered for `pointer` and is not in the lane yet.
    ///
    /// The group registers itself for the pointer when a child joins, so an enclosing group
    /// sees it the same way.
    pub(crate) fn enlist(
        &mut self,
        children: &[RecognizerId],
        pointer: PointerId,
        cx: &mut Context<'_>,
    ) {
        let mut joined = false;
        for &child in children {
            if cx.referee_state(child, pointer) != Some(RefereeState::Detecting) {
                continue;
            }
            joined |= self.lanes.entry(pointer).or_default().members.insert(child);
        }
        if joined {
            cx.register(pointer);
        }
    }

    pub(crate) fn lane(&self, pointer: PointerId) -> Option<&Lane> {
        self.lanes.get(&pointer)
    }

    /// The lane for `pointer`, with `child` in it.
    pub(crate) fn join(&mut self, child: RecognizerId, pointer: PointerId) -> &mut Lane {
        let lane = self.lanes.entry(pointer).or_default();
        if lane.verdict.is_none() {
            lane.members.insert(child);
        }
        lane
    }

    pub(crate) fn lane_mut(&mut self, pointer: PointerId) -> Option<&mut Lane> {
        self.lanes.get_mut(&pointer)
    }

    pub(crate) fn lanes_mut(&mut self) -> impl Iterator<Item = (PointerId, &mut Lane)> + '_ {
        self.lanes.iter_mut().map(|(p, lane)| (*p, lane))
    }

    pub(crate) fn clear(&mut self) {
        self.lanes.clear();
    }

    /// Drop members whose recognizer was removed.
    pub(crate) fn prune(&mut self, lookup: &impl DetectLookup) {
        for lane in self.lanes.values_mut() {
            lane.members.prune(lookup);
            if lane.winner.is_some_and(|w| lookup.detect_state(w).is_none()) {
                lane.winner = None;
            }
        }
    }

    /// Rename child ids positionally after a rebuild.
    pub(crate) fn remap(&mut self, old: &[RecognizerId], new: &[RecognizerId]) {
        for lane in self.lanes.values_mut() {
            for (&o, &n) in old.iter().zip(new) {
                lane.members.replace(o, n);
                if lane.winner == Some(o) {
                    lane.winner = Some(n);
                }
            }
        }
    }
}

/// Most advanced detection progress among `children`.
pub(crate) fn combined_state(children: &[RecognizerId], cx: &Context<'_>) -> DetectState {
    let mut state = DetectState::Ready;
    for &child in children {
        match cx.detect_state(child) {
            Some(DetectState::Detected) => return DetectState::Detected,
            Some(DetectState::Detecting) => state = DetectState::Detecting,
            _ => {}
        }
    }
    state
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parallel group: children recognize side by side.

use alloc::vec::Vec;

use crate::recognizer::{Context, Recognizer};
use crate::scope::Transition;
use crate::types::{
    DetectState, Disposal, Notice, PointerEvent, PointerId, PointerKind, RecognizerId,
    RefereeState,
};

use super::{Roster, combined_state};

/// Children resolve independently of each other, like `Parallel` members of a scope.
///
/// The group asks its parent to win on the first child accept. Once it wins, every child that
/// asked is accepted, and children that ask later are accepted at once. It gives up only when
/// every child registered for the pointer has failed.
#[derive(Debug)]
pub struct Parallel {
    children: Vec<RecognizerId>,
    roster: Roster,
    /// Children rejected during the current cycle; they stop receiving DOWN and MOVE.
    failed: Vec<RecognizerId>,
    /// Children waiting for the group's own verdict, per pointer.
    claimants: Vec<(PointerId, RecognizerId)>,
    state: DetectState,
}

impl Parallel {
    /// Create a group over already inserted recognizers.
    pub fn new(children: impl IntoIterator<Item = RecognizerId>) -> Self {
        Self {
            children: children.into_iter().collect(),
            roster: Roster::default(),
            failed: Vec::new(),
            claimants: Vec::new(),
            state: DetectState::Ready,
        }
    }

    fn reset(&mut self) {
        self.roster.clear();
        self.failed.clear();
        self.claimants.clear();
    }
}

impl Recognizer for Parallel {
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        self.roster.prune(&*cx);
        if event.kind == PointerKind::Down
            && combined_state(&self.children, cx) == DetectState::Ready
        {
            self.reset();
        }
        for &child in &self.children {
            if event.kind.is_terminal() || !self.failed.contains(&child) {
                cx.deliver(child, event);
            }
        }
        self.roster.enlist(&self.children, event.pointer, cx);
        self.state = combined_state(&self.children, cx);
    }

    fn on_child_disposal(
        &mut self,
        child: RecognizerId,
        pointer: PointerId,
        disposal: Disposal,
        cx: &mut Context<'_>,
    ) {
        self.roster.prune(&*cx);
        let lane = self.roster.join(child, pointer);
        match (disposal, lane.verdict) {
            (Disposal::Reject, _) | (_, Some(Notice::Rejected)) => {
                lane.members.remove(child);
                cx.apply(Transition::rejected(child, pointer));
                self.claimants.retain(|&(p, c)| (p, c) != (pointer, child));
                if !self.failed.contains(&child) {
                    self.failed.push(child);
                }
                if lane.members.is_empty() && lane.verdict.is_none() {
                    log::debug!("parallel: every child failed for {pointer:?}");
                    lane.withdraw(pointer, cx);
                }
            }
            (Disposal::Accept, Some(_)) => {
                lane.members.remove(child);
                cx.apply(Transition::accepted(child, pointer));
            }
            (Disposal::Accept, None) => {
                if !self.claimants.contains(&(pointer, child)) {
                    self.claimants.push((pointer, child));
                }
                lane.claim(pointer, cx);
            }
            (Disposal::Pending, _) => {
                if lane.members.state(child) != Some(RefereeState::Pending) {
                    lane.members.set(child, RefereeState::Pending);
                    cx.apply(Transition::pending(child, pointer));
                }
                lane.pend(pointer, cx);
            }
        }
        self.state = combined_state(&self.children, cx);
    }

    fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        let Some(lane) = self.roster.lane_mut(pointer) else {
            return;
        };
        lane.verdict = Some(Notice::Accepted);
        let (accepted, waiting): (Vec<_>, Vec<_>) = core::mem::take(&mut self.claimants)
            .into_iter()
            .partition(|&(p, _)| p == pointer);
        self.claimants = waiting;
        for (_, child) in accepted {
            lane.members.remove(child);
            cx.apply(Transition::accepted(child, pointer));
        }
        self.state = combined_state(&self.children, cx);
    }

    fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if let Some(lane) = self.roster.lane_mut(pointer) {
            lane.verdict = Some(Notice::Rejected);
            for member in lane.members.ids() {
                if !self.failed.contains(&member) {
                    self.failed.push(member);
                }
            }
            lane.reject_members(pointer, cx);
        }
        self.claimants.retain(|&(p, _)| p != pointer);
        self.state = combined_state(&self.children, cx);
    }

    fn detect_state(&self) -> DetectState {
        self.state
    }

    fn children(&self) -> &[RecognizerId] {
        &self.children
    }

    fn can_reconcile(&self, old: &dyn Recognizer) -> bool {
        old.downcast_ref::<Self>().is_some()
    }

    fn reconcile_from(&mut self, old: &mut dyn Recognizer) {
        let Some(old) = old.downcast_mut::<Self>() else {
            return;
        };
        let rename = |id: RecognizerId| {
            old.children
                .iter()
                .position(|&o| o == id)
                .and_then(|i| self.children.get(i).copied())
                .unwrap_or(id)
        };
        self.failed = old.failed.iter().map(|&c| rename(c)).collect();
        self.claimants = old.claimants.iter().map(|&(p, c)| (p, rename(c))).collect();
        self.roster = core::mem::take(&mut old.roster);
        self.roster.remap(&old.children, &self.children);
        self.state = old.state;
    }

    fn name(&self) -> &'static str {
        "parallel"
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exclusive group: at most one child wins.

use alloc::vec::Vec;

use crate::recognizer::{Context, Recognizer};
use crate::scope::Transition;
use crate::types::{
    DetectState, Disposal, Notice, PointerEvent, PointerId, PointerKind, RecognizerId,
    RefereeState,
};

use super::{Roster, combined_state};

/// Children compete; the first to win locally claims for the whole group.
///
/// Inside the group, children arbitrate like the members of one scope class: an accept behind a
/// pending sibling is blocked, and a pending sibling's rejection promotes or demotes the first
/// blocked one. The local winner is confirmed only once the group itself is accepted by its
/// own parent; every other child is then rejected.
///
/// Earlier children take precedence when several are already detected at the moment the group
/// is accepted.
#[derive(Debug)]
pub struct Exclusive {
    children: Vec<RecognizerId>,
    roster: Roster,
    state: DetectState,
}

impl Exclusive {
    /// Create a group over already inserted recognizers, in precedence order.
    pub fn new(children: impl IntoIterator<Item = RecognizerId>) -> Self {
        Self {
            children: children.into_iter().collect(),
            roster: Roster::default(),
            state: DetectState::Ready,
        }
    }

    fn refresh(&mut self, cx: &Context<'_>) {
        self.state = combined_state(&self.children, cx);
    }

    /// The single detected child, which then receives DOWN and MOVE alone.
    fn active(&self, event: &PointerEvent, cx: &Context<'_>) -> Option<RecognizerId> {
        if event.kind.is_terminal() {
            return None;
        }
        let mut detected = self
            .children
            .iter()
            .copied()
            .filter(|&c| cx.detect_state(c) == Some(DetectState::Detected));
        match (detected.next(), detected.next()) {
            (Some(active), None) => Some(active),
            _ => None,
        }
    }

    fn accept(&mut self, child: RecognizerId, pointer: PointerId, cx: &mut Context<'_>) {
        let lane = self.roster.join(child, pointer);
        if lane.members.has_pending_except(child) {
            if lane.members.state(child) != Some(RefereeState::Blocked) {
                lane.members.set(child, RefereeState::Blocked);
                cx.apply(Transition::blocked(child, pointer));
            }
            return;
        }
        match lane.verdict {
            Some(Notice::Accepted) => lane.crown(child, pointer, cx),
            Some(_) => {
                lane.members.remove(child);
                cx.apply(Transition::rejected(child, pointer));
            }
            // The first child to accept keeps the claim; later ones lose when it is crowned.
            None if lane.winner.is_some_and(|w| w != child) => {
                lane.members.set(child, RefereeState::Detecting);
            }
            None => {
                lane.members.set(child, RefereeState::Detecting);
                lane.winner = Some(child);
                lane.claim(pointer, cx);
            }
        }
    }

    fn pend(&mut self, child: RecognizerId, pointer: PointerId, cx: &mut Context<'_>) {
        let lane = self.roster.join(child, pointer);
        match lane.members.state(child) {
            None | Some(RefereeState::Pending | RefereeState::Blocked) => {}
            _ if lane.members.has_pending_except(child) => {
                lane.members.set(child, RefereeState::Blocked);
                cx.apply(Transition::blocked(child, pointer));
            }
            _ => {
                lane.members.set(child, RefereeState::Pending);
                cx.apply(Transition::pending(child, pointer));
                lane.pend(pointer, cx);
            }
        }
    }

    fn reject(&mut self, child: RecognizerId, pointer: PointerId, cx: &mut Context<'_>) {
        let Some(lane) = self.roster.lane_mut(pointer) else {
            cx.apply(Transition::rejected(child, pointer));
            return;
        };
        let was_pending = lane
            .members
            .remove(child)
            .is_some_and(|m| m.state == RefereeState::Pending);
        if lane.winner == Some(child) {
            lane.winner = None;
        }
        cx.apply(Transition::rejected(child, pointer));

        if was_pending {
            if let Some(next) = lane.members.first_blocked() {
                if cx.detect_state(next) == Some(DetectState::Detected) {
                    log::debug!("exclusive: promoting {next:?} for {pointer:?}");
                    lane.members.set(next, RefereeState::Detecting);
                    self.accept(next, pointer, cx);
                    return;
                }
                lane.members.set(next, RefereeState::Pending);
                cx.apply(Transition::pending(next, pointer));
            }
        }
        if lane.members.is_empty() {
            lane.withdraw(pointer, cx);
        }
    }
}

impl Recognizer for Exclusive {
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        self.roster.prune(&*cx);
        if event.kind == PointerKind::Down
            && combined_state(&self.children, cx) == DetectState::Ready
        {
            self.roster.clear();
        }
        match self.active(event, cx) {
            Some(active) => {
                cx.deliver(active, event);
            }
            None => {
                for &child in &self.children {
                    cx.deliver(child, event);
                }
            }
        }
        self.roster.enlist(&self.children, event.pointer, cx);
        self.refresh(cx);
    }

    fn on_child_disposal(
        &mut self,
        child: RecognizerId,
        pointer: PointerId,
        disposal: Disposal,
        cx: &mut Context<'_>,
    ) {
        self.roster.prune(&*cx);
        match disposal {
            Disposal::Accept => self.accept(child, pointer, cx),
            Disposal::Pending => self.pend(child, pointer, cx),
            Disposal::Reject => self.reject(child, pointer, cx),
        }
        self.refresh(cx);
    }

    fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        self.roster.prune(&*cx);
        let Some(lane) = self.roster.lane_mut(pointer) else {
            return;
        };
        lane.verdict = Some(Notice::Accepted);
        let fallback = lane
            .members
            .ids()
            .find(|&c| cx.detect_state(c) == Some(DetectState::Detected))
            .or_else(|| {
                lane.members
                    .iter()
                    .find(|m| m.state == RefereeState::Pending)
                    .map(|m| m.id)
            });
        // Without a candidate the lane stays open: the next child to accept wins at once.
        if let Some(winner) = lane.winner.or(fallback) {
            lane.crown(winner, pointer, cx);
        }
        self.refresh(cx);
    }

    fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if let Some(lane) = self.roster.lane_mut(pointer) {
            lane.verdict = Some(Notice::Rejected);
            lane.reject_members(pointer, cx);
        }
        self.refresh(cx);
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
        if let Some(old) = old.downcast_mut::<Self>() {
            self.roster = core::mem::take(&mut old.roster);
            self.roster.remap(&old.children, &self.children);
            self.state = old.state;
        }
    }

    fn name(&self) -> &'static str {
        "exclusive"
    }
}

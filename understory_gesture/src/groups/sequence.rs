// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sequence group: children must recognize one after another.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::recognizer::{Context, Recognizer};
use crate::scope::Transition;
use crate::types::{
    DetectState, Disposal, Notice, PointerEvent, PointerId, PointerKind, RecognizerId,
    RefereeState,
};

use super::Roster;

/// Runs its children as stages, in order.
///
/// Only the current stage sees new pointers. When a stage other than the last accepts, it is
/// accepted on the spot and the group stays pending with its parent; the next stage then
/// starts from the pointers already down, each replayed to it as a DOWN at its last position.
/// Earlier stages keep receiving events until their own cycle ends. The last stage's accept
/// is what the group claims upward. Any rejection fails the whole sequence.
///
/// A long press followed by a drag of the same finger is the typical use.
#[derive(Debug)]
pub struct Sequence {
    children: Vec<RecognizerId>,
    roster: Roster,
    stage: usize,
    /// Last event of every pointer currently down.
    down: BTreeMap<PointerId, PointerEvent>,
    failed: bool,
    state: DetectState,
}

impl Sequence {
    /// Create a sequence over already inserted recognizers, in stage order.
    pub fn new(children: impl IntoIterator<Item = RecognizerId>) -> Self {
        Self {
            children: children.into_iter().collect(),
            roster: Roster::default(),
            stage: 0,
            down: BTreeMap::new(),
            failed: false,
            state: DetectState::Ready,
        }
    }

    /// Index of the stage currently being attempted.
    pub fn stage(&self) -> usize {
        self.stage
    }

    fn is_last(&self, index: usize) -> bool {
        index + 1 == self.children.len()
    }

    fn refresh(&mut self, cx: &Context<'_>) {
        let idle = self.down.is_empty()
            && self
                .children
                .iter()
                .all(|&c| cx.detect_state(c).is_none_or(|s| s == DetectState::Ready));
        let last_detected = self
            .children
            .last()
            .is_some_and(|&c| cx.detect_state(c) == Some(DetectState::Detected));
        self.state = if idle {
            DetectState::Ready
        } else if last_detected && !self.failed {
            DetectState::Detected
        } else {
            DetectState::Detecting
        };
    }

    fn fail(&mut self, cx: &mut Context<'_>) {
        if !self.failed {
            log::debug!("sequence failed at stage {}", self.stage);
        }
        self.failed = true;
        for (pointer, lane) in self.roster.lanes_mut() {
            lane.reject_members(pointer, cx);
            lane.withdraw(pointer, cx);
        }
    }

    /// Move to the next stage and replay the pointers already down to it.
    fn advance(&mut self, cx: &mut Context<'_>) {
        self.stage += 1;
        let Some(&next) = self.children.get(self.stage) else {
            return;
        };
        log::debug!("sequence advancing to stage {}", self.stage);
        for event in self.down.values() {
            let replay = PointerEvent {
                kind: PointerKind::Down,
                ..*event
            };
            cx.deliver(next, &replay);
        }
        let pointers: Vec<_> = self.down.keys().copied().collect();
        for pointer in pointers {
            self.roster.enlist(&[next], pointer, cx);
        }
    }
}

impl Recognizer for Sequence {
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        self.roster.prune(&*cx);
        if event.kind == PointerKind::Down && self.down.is_empty() {
            self.roster.clear();
            self.stage = 0;
            self.failed = false;
        }
        if event.kind.is_terminal() {
            self.down.remove(&event.pointer);
        } else {
            self.down.insert(event.pointer, *event);
        }

        for (index, &child) in self.children.iter().enumerate() {
            let deliver = match event.kind {
                PointerKind::Up | PointerKind::Cancel => true,
                _ if self.failed => false,
                PointerKind::Down => index == self.stage,
                PointerKind::Move => {
                    index == self.stage
                        || (index < self.stage
                            && cx.detect_state(child) != Some(DetectState::Ready))
                }
            };
            if deliver {
                cx.deliver(child, event);
            }
        }
        if let Some(&current) = self.children.get(self.stage) {
            self.roster.enlist(&[current], event.pointer, cx);
        }
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
        let Some(index) = self.children.iter().position(|&c| c == child) else {
            return;
        };
        if self.failed {
            cx.apply(Transition::rejected(child, pointer));
            return;
        }
        let last = self.is_last(index);
        let lane = self.roster.join(child, pointer);
        match disposal {
            Disposal::Reject => {
                lane.members.remove(child);
                cx.apply(Transition::rejected(child, pointer));
                self.fail(cx);
            }
            Disposal::Pending => {
                if lane.members.state(child) != Some(RefereeState::Pending) {
                    lane.members.set(child, RefereeState::Pending);
                    cx.apply(Transition::pending(child, pointer));
                }
                lane.pend(pointer, cx);
            }
            Disposal::Accept if !last => {
                lane.members.remove(child);
                cx.apply(Transition::accepted(child, pointer));
                lane.pend(pointer, cx);
                if index == self.stage {
                    self.advance(cx);
                }
            }
            Disposal::Accept => match lane.verdict {
                Some(Notice::Accepted) => {
                    lane.members.remove(child);
                    cx.apply(Transition::accepted(child, pointer));
                }
                _ => {
                    lane.winner = Some(child);
                    lane.claim(pointer, cx);
                }
            },
        }
        self.refresh(cx);
    }

    fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if let Some(lane) = self.roster.lane_mut(pointer) {
            lane.verdict = Some(Notice::Accepted);
            if let Some(winner) = lane.winner {
                lane.crown(winner, pointer, cx);
            }
        }
        self.refresh(cx);
    }

    fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if let Some(lane) = self.roster.lane_mut(pointer) {
            lane.verdict = Some(Notice::Rejected);
        }
        self.fail(cx);
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
            self.stage = old.stage;
            self.down = core::mem::take(&mut old.down);
            self.failed = old.failed;
            self.state = old.state;
        }
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

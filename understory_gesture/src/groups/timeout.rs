// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deadline wrapper around a single recognizer.

use alloc::vec::Vec;
use core::time::Duration;

use crate::recognizer::{Context, Recognizer};
use crate::scope::Transition;
use crate::types::{
    DetectState, Disposal, Notice, PointerEvent, PointerId, PointerKind, RecognizerId, TimerId,
};

use super::{Roster, combined_state};

/// Default time a wrapped recognizer has to decide.
pub const DEFAULT_GESTURE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Configuration for [`Timeout`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Time from the first DOWN within which the child must accept or reject.
    pub timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_GESTURE_TIMEOUT,
        }
    }
}

/// Fails its child when it has not decided by a deadline.
///
/// The first DOWN starts the deadline. Until then the child's disposals are relayed to the
/// parent unchanged and the parent's verdicts relayed back. Once the child accepts or rejects,
/// the deadline is canceled. If it elapses first, the child is rejected and so is the group.
#[derive(Debug)]
pub struct Timeout {
    config: TimeoutConfig,
    children: [RecognizerId; 1],
    roster: Roster,
    deadline: Option<TimerId>,
    down: Vec<PointerId>,
    expired: bool,
    state: DetectState,
}

impl Timeout {
    /// Wrap an already inserted recognizer.
    pub fn new(child: RecognizerId, config: TimeoutConfig) -> Self {
        Self {
            config,
            children: [child],
            roster: Roster::default(),
            deadline: None,
            down: Vec::new(),
            expired: false,
            state: DetectState::Ready,
        }
    }

    /// The wrapped recognizer.
    pub fn child(&self) -> RecognizerId {
        self.children[0]
    }

    /// The configuration.
    pub fn config(&self) -> &TimeoutConfig {
        &self.config
    }

    /// Returns true if the deadline elapsed during the current cycle.
    pub fn expired(&self) -> bool {
        self.expired
    }

    fn disarm(&mut self, cx: &mut Context<'_>) {
        if let Some(timer) = self.deadline.take() {
            cx.cancel(timer);
        }
    }

    fn refresh(&mut self, cx: &Context<'_>) {
        self.state = if self.expired && !self.down.is_empty() {
            DetectState::Detecting
        } else {
            combined_state(&self.children, cx)
        };
    }
}

impl Recognizer for Timeout {
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        self.roster.prune(&*cx);
        let child = self.child();
        if event.kind == PointerKind::Down
            && self.down.is_empty()
            && cx.detect_state(child) == Some(DetectState::Ready)
        {
            self.disarm(cx);
            self.roster.clear();
            self.expired = false;
            self.deadline = Some(cx.schedule(self.config.timeout));
        }
        match event.kind {
            PointerKind::Down => {
                if !self.down.contains(&event.pointer) {
                    self.down.push(event.pointer);
                }
            }
            PointerKind::Up | PointerKind::Cancel => self.down.retain(|&p| p != event.pointer),
            PointerKind::Move => {}
        }
        if !self.expired || event.kind.is_terminal() {
            cx.deliver(child, event);
        }
        if !self.expired {
            self.roster.enlist(&self.children, event.pointer, cx);
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
        if self.expired {
            cx.apply(Transition::rejected(child, pointer));
            return;
        }
        let lane = self.roster.join(child, pointer);
        match disposal {
            Disposal::Accept => {
                lane.claim(pointer, cx);
                self.disarm(cx);
            }
            Disposal::Pending => lane.pend(pointer, cx),
            Disposal::Reject => {
                lane.members.remove(child);
                cx.apply(Transition::rejected(child, pointer));
                lane.withdraw(pointer, cx);
                self.disarm(cx);
            }
        }
        self.refresh(cx);
    }

    fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        let child = self.child();
        if let Some(lane) = self.roster.lane_mut(pointer) {
            lane.verdict = Some(Notice::Accepted);
            if lane.members.remove(child).is_some() {
                cx.apply(Transition::accepted(child, pointer));
            }
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

    fn on_pending(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        let child = self.child();
        if self
            .roster
            .lane(pointer)
            .is_some_and(|lane| lane.members.contains(child))
        {
            cx.apply(Transition::pending(child, pointer));
        }
    }

    fn on_timer(&mut self, timer: TimerId, cx: &mut Context<'_>) {
        if self.deadline != Some(timer) {
            return;
        }
        self.deadline = None;
        log::debug!("timeout: child undecided after {:?}", self.config.timeout);
        self.expired = true;
        for (pointer, lane) in self.roster.lanes_mut() {
            lane.reject_members(pointer, cx);
            lane.withdraw(pointer, cx);
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
        old.downcast_ref::<Self>()
            .is_some_and(|old| old.config == self.config)
    }

    fn reconcile_from(&mut self, old: &mut dyn Recognizer) {
        if let Some(old) = old.downcast_mut::<Self>() {
            self.roster = core::mem::take(&mut old.roster);
            self.roster.remap(&old.children, &self.children);
            self.deadline = old.deadline.take();
            self.down = core::mem::take(&mut old.down);
            self.expired = old.expired;
            self.state = old.state;
        }
    }

    fn name(&self) -> &'static str {
        "timeout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::GestureCallbacks;
    use crate::engine::GestureEngine;
    use crate::recognizers::{LongPress, LongPressConfig, Tap};
    use crate::types::RefereeState;
    use alloc::rc::Rc;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn record(log: &Log, tag: &'static str) -> GestureCallbacks {
        let log = log.clone();
        GestureCallbacks::default().on_action(move |_| log.borrow_mut().push(tag))
    }

    #[test]
    fn deadline_rejects_an_undecided_child() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let slow = engine.insert(
            LongPress::new(LongPressConfig {
                duration: ms(2000),
                ..LongPressConfig::default()
            })
            .with_callbacks(record(&log, "long-press")),
        );
        let group = engine.insert(Timeout::new(slow, TimeoutConfig { timeout: ms(1000) }));
        let p = PointerId(1);

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[group]);
        engine.advance_time(ms(1100));
        assert_eq!(engine.referee_state(slow, p), Some(RefereeState::Failed));
        assert_eq!(engine.referee_state(group, p), Some(RefereeState::Failed));
        assert!(engine.get::<Timeout>(group).is_some_and(Timeout::expired));

        engine.advance_time(ms(2000));
        assert!(log.borrow().is_empty());
        engine.dispatch(&PointerEvent::up(1, 0.0, 0.0, ms(3200)), &[group]);
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn decision_in_time_cancels_the_deadline() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let tap = engine.insert(Tap::default().with_callbacks(record(&log, "tap")));
        let group = engine.insert(Timeout::new(tap, TimeoutConfig::default()));

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[group]);
        engine.dispatch(&PointerEvent::up(1, 0.0, 0.0, ms(100)), &[group]);
        assert_eq!(engine.advance_time(DEFAULT_GESTURE_TIMEOUT * 2), 0);
        assert_eq!(*log.borrow(), ["tap"]);
        assert_eq!(
            engine.referee_state(tap, PointerId(1)),
            Some(RefereeState::Succeeded)
        );
        assert!(engine.get::<Timeout>(group).is_some_and(|t| !t.expired()));
    }
}

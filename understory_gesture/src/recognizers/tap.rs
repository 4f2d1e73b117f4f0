// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tap and multi-tap recognition.
//!
//! A tap completes when the configured fingers have all touched down and all lifted again
//! without drifting. A multi-tap waits, PENDING, between taps: that keeps its scopes open across
//! the intermediate releases, and lets a peer that wants the same pointers claim them only once
//! the multi-tap gives up.

use core::time::Duration;

use crate::callbacks::{FingerInfo, GestureCallbacks, GestureEvent};
use crate::recognizer::{Context, Recognizer};
use crate::types::{
    DetectState, Disposal, MAX_FINGERS, PointerEvent, PointerId, PointerKind, SourceType, TimerId,
};

use super::Cycle;

/// Movement, in pixels, that turns a tap into something else.
pub const TAP_SLOP: f64 = 20.0;

/// Time allowed for all fingers of a multi-finger tap to touch down.
pub const MULTI_FINGER_TIMEOUT: Duration = Duration::from_millis(300);

/// Time allowed between the taps of a multi-tap.
pub const MULTI_TAP_TIMEOUT: Duration = Duration::from_millis(300);

/// Configuration for [`Tap`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TapConfig {
    /// Taps required. `0` is treated as `1`.
    pub count: usize,
    /// Fingers per tap. `0` is treated as `1`; above [`MAX_FINGERS`] disables the recognizer.
    pub fingers: usize,
    /// Allowed drift from each finger's DOWN position.
    pub slop: f64,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            count: 1,
            fingers: 1,
            slop: TAP_SLOP,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Tracking {
    taps_done: usize,
    fingers_reached: bool,
    finger_timer: Option<TimerId>,
    tap_timer: Option<TimerId>,
    last_up: Option<(Duration, SourceType, FingerInfo)>,
}

/// Recognizes one or more quick contacts.
#[derive(Debug)]
pub struct Tap {
    config: TapConfig,
    callbacks: GestureCallbacks,
    cycle: Cycle,
    tracking: Tracking,
}

impl Default for Tap {
    fn default() -> Self {
        Self::new(TapConfig::default())
    }
}

impl Tap {
    /// Create a tap recognizer.
    pub fn new(mut config: TapConfig) -> Self {
        config.count = config.count.max(1);
        config.fingers = config.fingers.max(1);
        Self {
            config,
            callbacks: GestureCallbacks::default(),
            cycle: Cycle::default(),
            tracking: Tracking::default(),
        }
    }

    /// Attach callbacks; only `action` is fired.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: GestureCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// The normalized configuration.
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    fn down(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if self.config.fingers > MAX_FINGERS || self.cycle.state == DetectState::Detected {
            return;
        }
        if !self.cycle.begin(event, cx) {
            return;
        }
        if let Some(timer) = self.tracking.tap_timer.take() {
            cx.cancel(timer);
        }
        let count = self.cycle.fingers.finger_count();
        if count > self.config.fingers {
            log::debug!("tap: {count} fingers down, {} wanted", self.config.fingers);
            self.fail(cx);
        } else if count == self.config.fingers {
            self.tracking.fingers_reached = true;
            if let Some(timer) = self.tracking.finger_timer.take() {
                cx.cancel(timer);
            }
        } else if count == 1 {
            self.tracking.finger_timer = Some(cx.schedule(MULTI_FINGER_TIMEOUT));
        }
    }

    fn up(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if !self.tracking.fingers_reached {
            self.fail(cx);
            self.cycle.lift(event.pointer);
            return;
        }
        self.tracking.last_up = Some((
            event.time,
            event.source,
            FingerInfo {
                pointer: event.pointer,
                position: event.position,
            },
        ));
        self.cycle.lift(event.pointer);
        if self.cycle.fingers.finger_count() > 0 {
            // Keep the lifted finger's scope open until the rest of the tap lands.
            cx.resolve(event.pointer, Disposal::Pending);
            return;
        }
        self.tracking.taps_done += 1;
        self.tracking.fingers_reached = false;
        if self.tracking.taps_done >= self.config.count {
            self.cycle.claim(cx);
        } else {
            self.cycle.fingers.pend(cx);
            self.tracking.tap_timer = Some(cx.schedule(MULTI_TAP_TIMEOUT));
        }
    }

    fn fail(&mut self, cx: &mut Context<'_>) {
        self.cancel_timers(cx);
        self.tracking = Tracking::default();
        self.cycle.fail(cx);
    }

    fn cancel_timers(&mut self, cx: &mut Context<'_>) {
        for timer in [
            self.tracking.finger_timer.take(),
            self.tracking.tap_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            cx.cancel(timer);
        }
    }
}

impl Recognizer for Tap {
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if event.kind == PointerKind::Down {
            self.down(event, cx);
            return;
        }
        if !self.cycle.follows(event) {
            if event.kind.is_terminal() {
                self.cycle.lift(event.pointer);
            }
            return;
        }
        match event.kind {
            PointerKind::Move => {
                self.cycle.fingers.update(event);
                let drifted = self
                    .cycle
                    .fingers
                    .finger(event.pointer)
                    .is_some_and(|f| (f.last - f.down).hypot() > self.config.slop);
                if drifted {
                    self.fail(cx);
                }
            }
            PointerKind::Up => self.up(event, cx),
            PointerKind::Cancel => {
                self.fail(cx);
                self.cycle.lift(event.pointer);
            }
            PointerKind::Down => {}
        }
    }

    fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if !self.cycle.fingers.on_accepted(pointer) {
            return;
        }
        self.cancel_timers(cx);
        if let Some((time, source, finger)) = self.tracking.last_up {
            self.callbacks.action(&GestureEvent {
                time,
                source,
                fingers: alloc::vec![finger],
                position: finger.position,
                ..GestureEvent::default()
            });
        }
        self.tracking = Tracking::default();
        self.cycle.finish();
    }

    fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if self.cycle.rejected(pointer, cx) {
            self.cancel_timers(cx);
            self.tracking = Tracking::default();
        }
    }

    fn on_timer(&mut self, timer: TimerId, cx: &mut Context<'_>) {
        if self.tracking.finger_timer == Some(timer) {
            self.tracking.finger_timer = None;
            if !self.tracking.fingers_reached {
                log::debug!("tap: fingers did not all arrive in time");
                self.fail(cx);
            }
        } else if self.tracking.tap_timer == Some(timer) {
            self.tracking.tap_timer = None;
            log::debug!("tap: next tap did not start in time");
            self.fail(cx);
        }
    }

    fn detect_state(&self) -> DetectState {
        self.cycle.state
    }

    fn can_reconcile(&self, old: &dyn Recognizer) -> bool {
        old.downcast_ref::<Self>()
            .is_some_and(|old| old.config == self.config)
    }

    fn reconcile_from(&mut self, old: &mut dyn Recognizer) {
        if let Some(old) = old.downcast_mut::<Self>() {
            self.cycle = core::mem::take(&mut old.cycle);
            self.tracking = core::mem::take(&mut old.tracking);
            self.callbacks.absorb(&mut old.callbacks);
        }
    }

    fn name(&self) -> &'static str {
        "tap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::GestureEngine;
    use crate::types::RefereeState;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use kurbo::Point;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn tap(config: TapConfig, log: &Rc<RefCell<Vec<GestureEvent>>>) -> Tap {
        let log = log.clone();
        Tap::new(config)
            .with_callbacks(GestureCallbacks::default().on_action(move |e| {
                log.borrow_mut().push(e.clone());
            }))
    }

    fn taps(count: usize, fingers: usize) -> TapConfig {
        TapConfig {
            count,
            fingers,
            ..TapConfig::default()
        }
    }

    #[test]
    fn single_tap_reports_the_release() {
        let log = Rc::default();
        let mut engine = GestureEngine::new();
        let t = engine.insert(tap(TapConfig::default(), &log));

        engine.dispatch(&PointerEvent::down(0, 100.0, 100.0, ms(0)), &[t]);
        engine.dispatch(&PointerEvent::moved(0, 105.0, 100.0, ms(20)), &[t]);
        engine.dispatch(&PointerEvent::up(0, 106.0, 101.0, ms(50)), &[t]);

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].time, ms(50));
        assert_eq!(log[0].position, Point::new(106.0, 101.0));
        assert_eq!(log[0].fingers[0].pointer, PointerId(0));
        assert_eq!(engine.detect_state(t), Some(DetectState::Ready));
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn drifting_finger_fails() {
        let log = Rc::default();
        let mut engine = GestureEngine::new();
        let t = engine.insert(tap(TapConfig::default(), &log));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[t]);
        engine.dispatch(&PointerEvent::moved(0, 0.0, 21.0, ms(20)), &[t]);
        assert_eq!(
            engine.referee_state(t, PointerId(0)),
            Some(RefereeState::Failed)
        );
        engine.dispatch(&PointerEvent::up(0, 0.0, 0.0, ms(50)), &[t]);
        assert!(log.borrow().is_empty());

        // Next contact starts over.
        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(100)), &[t]);
        engine.dispatch(&PointerEvent::up(1, 0.0, 0.0, ms(150)), &[t]);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn double_tap_stays_pending_between_taps() {
        let log = Rc::default();
        let mut engine = GestureEngine::new();
        let t = engine.insert(tap(taps(2, 1), &log));

        engine.dispatch(&PointerEvent::down(0, 10.0, 10.0, ms(0)), &[t]);
        engine.dispatch(&PointerEvent::up(0, 10.0, 10.0, ms(40)), &[t]);
        assert!(log.borrow().is_empty());
        assert_eq!(
            engine.referee_state(t, PointerId(0)),
            Some(RefereeState::Pending)
        );
        assert!(engine.referee().scope(PointerId(0)).is_some(), "close deferred");

        engine.dispatch(&PointerEvent::down(1, 12.0, 10.0, ms(150)), &[t]);
        engine.dispatch(&PointerEvent::up(1, 12.0, 10.0, ms(190)), &[t]);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].time, ms(190));
        assert!(engine.referee().is_empty());
        assert_eq!(engine.scheduler().pending(), 0);
    }

    #[test]
    fn double_tap_times_out_between_taps() {
        let log = Rc::default();
        let mut engine = GestureEngine::new();
        let t = engine.insert(tap(taps(2, 1), &log));

        engine.dispatch(&PointerEvent::down(0, 10.0, 10.0, ms(0)), &[t]);
        engine.dispatch(&PointerEvent::up(0, 10.0, 10.0, ms(40)), &[t]);
        engine.advance_time(MULTI_TAP_TIMEOUT);
        assert!(log.borrow().is_empty());
        assert!(engine.referee().is_empty());
        assert_eq!(engine.detect_state(t), Some(DetectState::Ready));
    }

    #[test]
    fn single_tap_waits_for_double_tap_to_give_up() {
        let singles = Rc::default();
        let doubles = Rc::default();
        let mut engine = GestureEngine::new();
        let double = engine.insert(tap(taps(2, 1), &doubles));
        let single = engine.insert(tap(TapConfig::default(), &singles));
        let targets = [double, single];

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &targets);
        engine.dispatch(&PointerEvent::up(0, 0.0, 0.0, ms(40)), &targets);
        assert_eq!(
            engine.referee_state(single, PointerId(0)),
            Some(RefereeState::Blocked)
        );
        assert!(singles.borrow().is_empty());

        engine.advance_time(ms(300));
        assert_eq!(singles.borrow().len(), 1);
        assert!(doubles.borrow().is_empty());
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn double_tap_beats_single_tap() {
        let singles = Rc::default();
        let doubles = Rc::default();
        let mut engine = GestureEngine::new();
        let double = engine.insert(tap(taps(2, 1), &doubles));
        let single = engine.insert(tap(TapConfig::default(), &singles));
        let targets = [double, single];

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &targets);
        engine.dispatch(&PointerEvent::up(0, 0.0, 0.0, ms(40)), &targets);
        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(100)), &targets);
        engine.dispatch(&PointerEvent::up(1, 0.0, 0.0, ms(140)), &targets);

        assert_eq!(doubles.borrow().len(), 1);
        assert!(singles.borrow().is_empty());
        assert_eq!(engine.detect_state(single), Some(DetectState::Ready));
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn two_finger_tap_needs_both_fingers_in_time() {
        let log = Rc::default();
        let mut engine = GestureEngine::new();
        let t = engine.insert(tap(taps(1, 2), &log));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[t]);
        engine.dispatch(&PointerEvent::down(1, 30.0, 0.0, ms(50)), &[t]);
        engine.dispatch(&PointerEvent::up(0, 0.0, 0.0, ms(90)), &[t]);
        engine.dispatch(&PointerEvent::up(1, 30.0, 0.0, ms(100)), &[t]);
        assert_eq!(log.borrow().len(), 1);

        engine.dispatch(&PointerEvent::down(2, 0.0, 0.0, ms(200)), &[t]);
        engine.advance_time(MULTI_FINGER_TIMEOUT);
        assert_eq!(
            engine.referee_state(t, PointerId(2)),
            Some(RefereeState::Failed)
        );
        engine.dispatch(&PointerEvent::up(2, 0.0, 0.0, ms(600)), &[t]);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn lifting_early_in_a_two_finger_tap_fails() {
        let log = Rc::default();
        let mut engine = GestureEngine::new();
        let t = engine.insert(tap(taps(1, 2), &log));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[t]);
        engine.dispatch(&PointerEvent::up(0, 0.0, 0.0, ms(30)), &[t]);
        assert!(log.borrow().is_empty());
        assert!(engine.referee().is_empty());
        assert_eq!(engine.scheduler().pending(), 0);
    }
}

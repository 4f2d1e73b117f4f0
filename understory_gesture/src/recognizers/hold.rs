// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hold gestures: [`LongPress`] and [`Press`].
//!
//! Both wait for their fingers to stay put past a deadline. The deadline starts when the
//! configured finger count is reached; reaching it claims the gesture, and the action fires once
//! the referee accepts. Moving beyond the slop or lifting a finger first gives the gesture up.

use core::time::Duration;

use crate::callbacks::GestureCallbacks;
use crate::recognizer::{Context, Recognizer};
use crate::types::{
    DetectState, MAX_FINGERS, PointerEvent, PointerId, PointerKind, SourceType, TimerId,
};

use super::{Cycle, snapshot};

/// Default hold time before a long press triggers.
pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(500);

/// Default movement, in pixels, that cancels a long press before it triggers.
pub const LONG_PRESS_SLOP: f64 = 15.0;

/// Default interval between repeated long-press actions.
pub const LONG_PRESS_REPEAT_INTERVAL: Duration = Duration::from_millis(300);

/// Default hold time before a press triggers.
pub const PRESS_TIMEOUT: Duration = Duration::from_millis(30);

/// Default movement, in pixels, that cancels a press before it triggers.
pub const PRESS_SLOP: f64 = 2.0;

/// Configuration for [`LongPress`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LongPressConfig {
    /// Hold time, counted from the moment the finger count is reached.
    pub duration: Duration,
    /// Fingers that must be held. `0` is treated as `1`; above [`MAX_FINGERS`] disables the
    /// recognizer.
    pub fingers: usize,
    /// Movement from the DOWN position that gives the gesture up.
    pub slop: f64,
    /// Fire the action again every `repeat_interval` while held.
    pub repeat: bool,
    /// Interval for repeated actions.
    pub repeat_interval: Duration,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            duration: LONG_PRESS_DURATION,
            fingers: 1,
            slop: LONG_PRESS_SLOP,
            repeat: false,
            repeat_interval: LONG_PRESS_REPEAT_INTERVAL,
        }
    }
}

/// Configuration for [`Press`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PressConfig {
    /// Hold time before the press triggers.
    pub timeout: Duration,
    /// Movement from the DOWN position that gives the gesture up.
    pub slop: f64,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            timeout: PRESS_TIMEOUT,
            slop: PRESS_SLOP,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct HoldConfig {
    duration: Duration,
    fingers: usize,
    slop: f64,
    repeat: Option<Duration>,
}

#[derive(Clone, Debug, Default)]
struct Tracking {
    deadline: Option<TimerId>,
    repeat: Option<TimerId>,
    /// Timestamp reported by the next timer-driven action.
    due: Duration,
    source: SourceType,
    triggered: bool,
    released: bool,
}

/// The state machine behind both hold recognizers.
#[derive(Debug)]
struct Hold {
    config: HoldConfig,
    callbacks: GestureCallbacks,
    cycle: Cycle,
    tracking: Tracking,
}

impl Hold {
    fn new(config: HoldConfig) -> Self {
        Self {
            config,
            callbacks: GestureCallbacks::default(),
            cycle: Cycle::default(),
            tracking: Tracking::default(),
        }
    }

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
                if self.cycle.state == DetectState::Detecting && self.drifted(event.pointer) {
                    log::debug!("hold on {:?} moved beyond slop", event.pointer);
                    self.fail(cx);
                }
            }
            PointerKind::Up | PointerKind::Cancel => {
                if !self.tracking.triggered {
                    self.fail(cx);
                    self.cycle.lift(event.pointer);
                    return;
                }
                if !self.tracking.released {
                    self.tracking.released = true;
                    self.cancel_timers(cx);
                    let payload = snapshot(event.time, event.source, &self.cycle.fingers);
                    if event.kind == PointerKind::Up {
                        self.callbacks.end(&payload);
                    } else {
                        self.callbacks.cancel(&payload);
                    }
                }
                self.cycle.lift(event.pointer);
                if self.cycle.fingers.finger_count() == 0 {
                    self.cycle.finish();
                    self.tracking = Tracking::default();
                }
            }
            PointerKind::Down => {}
        }
    }

    fn down(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if self.config.fingers > MAX_FINGERS || self.cycle.state == DetectState::Detected {
            return;
        }
        if !self.cycle.begin(event, cx) {
            return;
        }
        self.tracking.source = event.source;
        let count = self.cycle.fingers.finger_count();
        if count > self.config.fingers {
            self.fail(cx);
        } else if count == self.config.fingers && self.tracking.deadline.is_none() {
            self.tracking.due = event.time + self.config.duration;
            self.tracking.deadline = Some(cx.schedule(self.config.duration));
        }
    }

    fn drifted(&self, pointer: PointerId) -> bool {
        self.cycle
            .fingers
            .finger(pointer)
            .is_some_and(|f| (f.last - f.down).hypot() > self.config.slop)
    }

    fn fail(&mut self, cx: &mut Context<'_>) {
        self.cancel_timers(cx);
        self.tracking = Tracking::default();
        self.cycle.fail(cx);
    }

    fn cancel_timers(&mut self, cx: &mut Context<'_>) {
        for timer in [self.tracking.deadline.take(), self.tracking.repeat.take()]
            .into_iter()
            .flatten()
        {
            cx.cancel(timer);
        }
    }

    fn fire(&mut self, repeat: bool) {
        let mut payload = snapshot(
            self.tracking.due,
            self.tracking.source,
            &self.cycle.fingers,
        );
        payload.repeat = repeat;
        self.callbacks.action(&payload);
    }

    fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if !self.cycle.fingers.on_accepted(pointer) {
            return;
        }
        self.tracking.triggered = true;
        self.fire(false);
        if let Some(interval) = self.config.repeat {
            self.tracking.due += interval;
            self.tracking.repeat = Some(cx.schedule(interval));
        }
    }

    fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if self.cycle.rejected(pointer, cx) {
            self.cancel_timers(cx);
            self.tracking = Tracking::default();
        }
    }

    fn on_timer(&mut self, timer: TimerId, cx: &mut Context<'_>) {
        if self.tracking.deadline == Some(timer) {
            self.tracking.deadline = None;
            if self.cycle.state == DetectState::Detecting {
                self.cycle.claim(cx);
            }
        } else if self.tracking.repeat == Some(timer) {
            self.tracking.repeat = None;
            if let (Some(interval), false) = (self.config.repeat, self.tracking.released) {
                self.fire(true);
                self.tracking.due += interval;
                self.tracking.repeat = Some(cx.schedule(interval));
            }
        }
    }

    fn absorb(&mut self, old: &mut Self) {
        self.cycle = core::mem::take(&mut old.cycle);
        self.tracking = core::mem::take(&mut old.tracking);
        self.callbacks.absorb(&mut old.callbacks);
    }
}

/// Recognizes fingers held in place for a while.
#[derive(Debug)]
pub struct LongPress {
    config: LongPressConfig,
    hold: Hold,
}

impl Default for LongPress {
    fn default() -> Self {
        Self::new(LongPressConfig::default())
    }
}

impl LongPress {
    /// Create a long press recognizer.
    pub fn new(mut config: LongPressConfig) -> Self {
        config.fingers = config.fingers.max(1);
        let hold = Hold::new(HoldConfig {
            duration: config.duration,
            fingers: config.fingers,
            slop: config.slop,
            repeat: config.repeat.then_some(config.repeat_interval),
        });
        Self { config, hold }
    }

    /// Attach callbacks: `action` on trigger (and on each repeat), `end` on release,
    /// `cancel` on CANCEL after the trigger.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: GestureCallbacks) -> Self {
        self.hold.callbacks = callbacks;
        self
    }

    /// The normalized configuration.
    pub fn config(&self) -> &LongPressConfig {
        &self.config
    }
}

/// Recognizes a single finger held still for a short moment.
#[derive(Debug)]
pub struct Press {
    config: PressConfig,
    hold: Hold,
}

impl Default for Press {
    fn default() -> Self {
        Self::new(PressConfig::default())
    }
}

impl Press {
    /// Create a press recognizer.
    pub fn new(config: PressConfig) -> Self {
        let hold = Hold::new(HoldConfig {
            duration: config.timeout,
            fingers: 1,
            slop: config.slop,
            repeat: None,
        });
        Self { config, hold }
    }

    /// Attach callbacks: `action` on trigger, `end` on release, `cancel` on CANCEL.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: GestureCallbacks) -> Self {
        self.hold.callbacks = callbacks;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &PressConfig {
        &self.config
    }
}

macro_rules! hold_recognizer {
    ($ty:ident, $name:literal) => {
        impl Recognizer for $ty {
            fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
                self.hold.handle_event(event, cx);
            }

            fn on_accepted(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
                self.hold.on_accepted(pointer, cx);
            }

            fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
                self.hold.on_rejected(pointer, cx);
            }

            fn on_timer(&mut self, timer: TimerId, cx: &mut Context<'_>) {
                self.hold.on_timer(timer, cx);
            }

            fn detect_state(&self) -> DetectState {
                self.hold.cycle.state
            }

            fn can_reconcile(&self, old: &dyn Recognizer) -> bool {
                old.downcast_ref::<Self>()
                    .is_some_and(|old| old.config == self.config)
            }

            fn reconcile_from(&mut self, old: &mut dyn Recognizer) {
                if let Some(old) = old.downcast_mut::<Self>() {
                    self.hold.absorb(&mut old.hold);
                }
            }

            fn name(&self) -> &'static str {
                $name
            }
        }
    };
}

hold_recognizer!(LongPress, "long-press");
hold_recognizer!(Press, "press");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::GestureEvent;
    use crate::engine::GestureEngine;
    use crate::types::RefereeState;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    type Log = Rc<RefCell<Vec<(&'static str, GestureEvent)>>>;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn recording(log: &Log) -> GestureCallbacks {
        let (a, e, c) = (log.clone(), log.clone(), log.clone());
        GestureCallbacks::default()
            .on_action(move |ev| a.borrow_mut().push(("action", ev.clone())))
            .on_end(move |ev| e.borrow_mut().push(("end", ev.clone())))
            .on_cancel(move |ev| c.borrow_mut().push(("cancel", ev.clone())))
    }

    fn kinds(log: &Log) -> Vec<&'static str> {
        log.borrow().iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn long_press_fires_after_duration_then_ends_on_release() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let lp = engine.insert(LongPress::default().with_callbacks(recording(&log)));

        engine.dispatch(&PointerEvent::down(1, 50.0, 60.0, ms(0)), &[lp]);
        engine.dispatch(&PointerEvent::moved(1, 55.0, 60.0, ms(100)), &[lp]);
        assert_eq!(engine.advance_time(ms(499)), 0);
        assert!(log.borrow().is_empty());
        engine.advance_time(ms(1));
        assert_eq!(kinds(&log), ["action"]);
        {
            let (_, action) = &log.borrow()[0];
            assert_eq!(action.time, ms(500));
            assert_eq!(action.fingers.len(), 1);
            assert!(!action.repeat);
        }
        assert_eq!(
            engine.referee_state(lp, PointerId(1)),
            Some(RefereeState::Succeeded)
        );

        engine.dispatch(&PointerEvent::up(1, 55.0, 60.0, ms(700)), &[lp]);
        assert_eq!(kinds(&log), ["action", "end"]);
        assert_eq!(engine.detect_state(lp), Some(DetectState::Ready));
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn moving_beyond_slop_gives_up() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let lp = engine.insert(LongPress::default().with_callbacks(recording(&log)));

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[lp]);
        engine.dispatch(&PointerEvent::moved(1, 16.0, 0.0, ms(50)), &[lp]);
        assert_eq!(
            engine.referee_state(lp, PointerId(1)),
            Some(RefereeState::Failed)
        );
        engine.advance_time(ms(1000));
        assert!(log.borrow().is_empty());
        assert_eq!(engine.scheduler().pending(), 0, "deadline canceled");

        // The lost cycle ends with the lift; a new one starts cleanly.
        engine.dispatch(&PointerEvent::up(1, 16.0, 0.0, ms(1100)), &[lp]);
        engine.dispatch(&PointerEvent::down(2, 0.0, 0.0, ms(1200)), &[lp]);
        assert_eq!(engine.detect_state(lp), Some(DetectState::Detecting));
    }

    #[test]
    fn release_before_deadline_fails() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let lp = engine.insert(LongPress::default().with_callbacks(recording(&log)));

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[lp]);
        engine.dispatch(&PointerEvent::up(1, 0.0, 0.0, ms(200)), &[lp]);
        engine.advance_time(ms(1000));
        assert!(log.borrow().is_empty());
        assert_eq!(engine.detect_state(lp), Some(DetectState::Ready));
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn repeat_fires_while_held_and_cancel_reports() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let lp = engine.insert(
            LongPress::new(LongPressConfig {
                repeat: true,
                ..LongPressConfig::default()
            })
            .with_callbacks(recording(&log)),
        );

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[lp]);
        engine.advance_time(ms(1150));
        assert_eq!(kinds(&log), ["action", "action", "action"]);
        let times: Vec<_> = log.borrow().iter().map(|(_, e)| e.time).collect();
        assert_eq!(times, [ms(500), ms(800), ms(1100)]);
        assert!(log.borrow()[2].1.repeat);

        engine.dispatch(&PointerEvent::cancel(1, 0.0, 0.0, ms(1200)), &[lp]);
        assert_eq!(kinds(&log).last(), Some(&"cancel"));
        assert_eq!(engine.scheduler().pending(), 0);
    }

    #[test]
    fn multi_finger_deadline_starts_with_the_last_finger() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let lp = engine.insert(
            LongPress::new(LongPressConfig {
                fingers: 2,
                ..LongPressConfig::default()
            })
            .with_callbacks(recording(&log)),
        );

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[lp]);
        engine.advance_time(ms(200));
        engine.dispatch(&PointerEvent::down(2, 40.0, 0.0, ms(200)), &[lp]);
        engine.advance_time(ms(499));
        assert!(log.borrow().is_empty());
        engine.advance_time(ms(1));
        assert_eq!(kinds(&log), ["action"]);
        assert_eq!(log.borrow()[0].1.fingers.len(), 2);
        for p in [1, 2] {
            assert_eq!(
                engine.referee_state(lp, PointerId(p)),
                Some(RefereeState::Succeeded)
            );
        }
    }

    #[test]
    fn too_many_fingers_never_detects() {
        let mut engine = GestureEngine::new();
        let lp = engine.insert(LongPress::new(LongPressConfig {
            fingers: MAX_FINGERS + 1,
            ..LongPressConfig::default()
        }));
        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[lp]);
        assert_eq!(engine.detect_state(lp), Some(DetectState::Ready));
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn press_triggers_quickly_and_is_strict_about_movement() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let press = engine.insert(Press::default().with_callbacks(recording(&log)));

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[press]);
        engine.advance_time(PRESS_TIMEOUT);
        assert_eq!(kinds(&log), ["action"]);
        engine.dispatch(&PointerEvent::up(1, 0.0, 0.0, ms(40)), &[press]);

        engine.dispatch(&PointerEvent::down(2, 0.0, 0.0, ms(100)), &[press]);
        engine.dispatch(&PointerEvent::moved(2, 3.0, 0.0, ms(110)), &[press]);
        engine.advance_time(ms(200));
        assert_eq!(kinds(&log), ["action", "end"]);
    }

    #[test]
    fn reconcile_keeps_the_running_deadline() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let old = engine.insert(LongPress::default());
        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[old]);
        engine.advance_time(ms(300));

        let new = engine.insert(LongPress::default().with_callbacks(recording(&log)));
        assert!(engine.reconcile(new, old));
        assert!(!engine.is_alive(old));
        engine.advance_time(ms(200));
        assert_eq!(kinds(&log), ["action"]);
        assert_eq!(
            engine.referee_state(new, PointerId(1)),
            Some(RefereeState::Succeeded)
        );

        let other = engine.insert(LongPress::new(LongPressConfig {
            slop: 1.0,
            ..LongPressConfig::default()
        }));
        assert!(!engine.reconcile(other, new), "configuration differs");
    }

    #[test]
    fn losing_one_finger_to_a_high_pan_withdraws_the_other() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let lp = engine.insert(
            LongPress::new(LongPressConfig {
                fingers: 2,
                ..LongPressConfig::default()
            })
            .with_callbacks(recording(&log)),
        );
        let pan = engine.insert(crate::recognizers::Pan::default());
        engine.set_priority(pan, crate::types::GesturePriority::High);

        engine.dispatch(&PointerEvent::down(1, 0.0, 0.0, ms(0)), &[lp]);
        engine.dispatch(&PointerEvent::down(2, 50.0, 0.0, ms(10)), &[lp, pan]);
        assert_eq!(engine.detect_state(lp), Some(DetectState::Detecting));

        // Within the long press slop, past the pan distance.
        engine.dispatch(&PointerEvent::moved(2, 55.0, 0.0, ms(50)), &[lp, pan]);
        assert_eq!(engine.referee_state(pan, PointerId(2)), Some(RefereeState::Succeeded));
        assert_eq!(engine.referee_state(lp, PointerId(2)), Some(RefereeState::Failed));
        assert_eq!(engine.referee_state(lp, PointerId(1)), Some(RefereeState::Failed));
        assert!(engine.referee().is_empty());
        assert_eq!(engine.detect_state(lp), Some(DetectState::Ready));

        engine.advance_time(ms(1000));
        assert!(log.borrow().is_empty());
    }
}

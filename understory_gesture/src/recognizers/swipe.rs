// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Swipe (fling) recognition.
//!
//! Every followed finger must first clear a distance along a permitted direction and then be
//! moving fast enough on average (distance over time since its DOWN). A finger that strays the
//! full distance off-axis before clearing it on-axis gives the swipe up. The check runs on MOVE
//! and once more on release.

use core::time::Duration;

use bitflags::bitflags;
use kurbo::Vec2;

use crate::callbacks::{GestureCallbacks, GestureEvent};
use crate::multi_finger::Finger;
use crate::recognizer::{Context, Recognizer};
use crate::types::{DetectState, MAX_FINGERS, PointerEvent, PointerId, PointerKind, SourceType};
use crate::velocity::VelocityTracker;

use super::{Cycle, snapshot};

/// Default minimum average speed, in pixels per second.
pub const DEFAULT_SWIPE_SPEED: f64 = 100.0;

/// Default distance, in pixels, each finger must cover along a permitted direction.
pub const DEFAULT_SWIPE_DISTANCE: f64 = 5.0;

bitflags! {
    /// Axes a swipe may travel along.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct SwipeDirection: u8 {
        /// Left or right.
        const HORIZONTAL = 1;
        /// Up or down.
        const VERTICAL = 1 << 1;
        /// Any direction.
        const ALL = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl Default for SwipeDirection {
    fn default() -> Self {
        Self::ALL
    }
}

/// Configuration for [`Swipe`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SwipeConfig {
    /// Fingers required. `0` is treated as `1`; above [`MAX_FINGERS`] disables the recognizer.
    pub fingers: usize,
    /// Permitted axes. An empty set never recognizes.
    pub direction: SwipeDirection,
    /// Minimum average speed of every finger.
    pub speed: f64,
    /// Distance every finger must cover along a permitted axis.
    pub distance: f64,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            fingers: 1,
            direction: SwipeDirection::ALL,
            speed: DEFAULT_SWIPE_SPEED,
            distance: DEFAULT_SWIPE_DISTANCE,
        }
    }
}

/// Per-finger standing against the configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Progress {
    /// Has not cleared the distance yet.
    Short,
    /// Cleared the distance but is too slow.
    Slow,
    /// Cleared the distance fast enough.
    Fast,
    /// Strayed off every permitted axis.
    Strayed,
}

fn average_speed(finger: &Finger) -> f64 {
    let elapsed = finger.last_time.saturating_sub(finger.down_time).as_secs_f64();
    if elapsed > 0.0 {
        (finger.last - finger.down).hypot() / elapsed
    } else {
        0.0
    }
}

fn progress(config: &SwipeConfig, finger: &Finger) -> Progress {
    let d = finger.last - finger.down;
    let (along, across) = match config.direction {
        SwipeDirection::ALL => (d.hypot(), 0.0),
        SwipeDirection::HORIZONTAL => (d.x.abs(), d.y.abs()),
        SwipeDirection::VERTICAL => (d.y.abs(), d.x.abs()),
        _ => return Progress::Strayed,
    };
    if along < config.distance {
        if across >= config.distance {
            Progress::Strayed
        } else {
            Progress::Short
        }
    } else if average_speed(finger) > config.speed {
        Progress::Fast
    } else {
        Progress::Slow
    }
}

#[derive(Clone, Debug, Default)]
struct Tracking {
    velocity: VelocityTracker,
    source: SourceType,
    last_time: Duration,
    speed: f64,
    angle: f64,
    started: bool,
    ended: bool,
}

/// Recognizes a quick flick of one or more fingers.
#[derive(Debug)]
pub struct Swipe {
    config: SwipeConfig,
    callbacks: GestureCallbacks,
    cycle: Cycle,
    tracking: Tracking,
}

impl Default for Swipe {
    fn default() -> Self {
        Self::new(SwipeConfig::default())
    }
}

impl Swipe {
    /// Create a swipe recognizer.
    pub fn new(mut config: SwipeConfig) -> Self {
        config.fingers = config.fingers.max(1);
        Self {
            config,
            callbacks: GestureCallbacks::default(),
            cycle: Cycle::default(),
            tracking: Tracking::default(),
        }
    }

    /// Attach callbacks: `start` on recognition, `update` per MOVE, `end` on release, `cancel`
    /// on CANCEL. Events carry `speed` (px/s) and `angle` (degrees).
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: GestureCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// The normalized configuration.
    pub fn config(&self) -> &SwipeConfig {
        &self.config
    }

    /// Refresh the reported speed and angle from the fingers in contact.
    fn measure(&mut self) {
        let count = self.cycle.fingers.finger_count();
        if count == 0 {
            return;
        }
        let (speed, travel) = self
            .cycle
            .fingers
            .fingers()
            .fold((0.0, Vec2::ZERO), |(speed, travel), (_, f)| {
                (speed + average_speed(f), travel + (f.last - f.down))
            });
        self.tracking.speed = speed / count as f64;
        self.tracking.angle = travel.y.atan2(travel.x).to_degrees();
    }

    fn payload(&self, time: Duration) -> GestureEvent {
        let mut payload = snapshot(time, self.tracking.source, &self.cycle.fingers);
        payload.speed = self.tracking.speed;
        payload.angle = self.tracking.angle;
        payload
    }

    /// Judge the fingers in contact. Returns false if the swipe was given up.
    fn evaluate(&mut self, cx: &mut Context<'_>) -> bool {
        let mut all_fast = self.cycle.fingers.finger_count() >= self.config.fingers;
        let mut strayed = false;
        for (_, finger) in self.cycle.fingers.fingers() {
            match progress(&self.config, finger) {
                Progress::Strayed => strayed = true,
                Progress::Fast => {}
                Progress::Short | Progress::Slow => all_fast = false,
            }
        }
        if strayed {
            log::debug!("swipe: finger strayed off the permitted axes");
            self.fail(cx);
            return false;
        }
        if all_fast {
            self.measure();
            self.cycle.claim(cx);
        }
        true
    }

    fn fail(&mut self, cx: &mut Context<'_>) {
        self.tracking = Tracking::default();
        self.cycle.fail(cx);
    }

    fn release(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        let cancel = event.kind == PointerKind::Cancel;
        if self.cycle.state == DetectState::Detecting {
            self.cycle.fingers.update(event);
            // The release is the last chance to qualify.
            if cancel || (self.evaluate(cx) && self.cycle.state == DetectState::Detecting) {
                self.fail(cx);
            }
            if self.cycle.state != DetectState::Detected {
                self.cycle.lift(event.pointer);
                return;
            }
        }
        if self.tracking.started && !self.tracking.ended {
            self.tracking.ended = true;
            let mut payload = self.payload(event.time);
            if cancel {
                self.callbacks.cancel(&payload);
            } else {
                payload.velocity = self.tracking.velocity.velocity();
                self.callbacks.end(&payload);
            }
        } else if cancel && !self.cycle.fingers.is_accepted() {
            self.fail(cx);
        }
        self.tracking.last_time = event.time;
        self.cycle.lift(event.pointer);
        if self.cycle.fingers.finger_count() == 0 && self.tracking.ended {
            self.cycle.finish();
            self.tracking = Tracking::default();
        }
    }
}

impl Recognizer for Swipe {
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if event.kind == PointerKind::Down {
            // Fingers beyond the configured count are not followed.
            if self.config.fingers > MAX_FINGERS
                || self.cycle.fingers.finger_count() >= self.config.fingers
                || self.cycle.state == DetectState::Detected
                || !self.cycle.begin(event, cx)
            {
                return;
            }
            if self.cycle.fingers.finger_count() == 1 {
                self.tracking.source = event.source;
            }
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
                self.tracking.last_time = event.time;
                if let Some(center) = self.cycle.fingers.centroid() {
                    self.tracking.velocity.add(event.time, center);
                }
                if self.tracking.ended {
                    return;
                }
                if self.cycle.state == DetectState::Detecting {
                    self.evaluate(cx);
                } else if self.tracking.started {
                    self.measure();
                    let payload = self.payload(event.time);
                    self.callbacks.update(&payload);
                }
            }
            PointerKind::Up | PointerKind::Cancel => self.release(event, cx),
            PointerKind::Down => {}
        }
    }

    fn on_accepted(&mut self, pointer: PointerId, _: &mut Context<'_>) {
        if !self.cycle.fingers.on_accepted(pointer) {
            return;
        }
        self.tracking.started = true;
        let payload = self.payload(self.tracking.last_time);
        self.callbacks.start(&payload);
        if self.cycle.fingers.finger_count() == 0 {
            // Recognized on the final release.
            self.tracking.ended = true;
            let mut payload = self.payload(self.tracking.last_time);
            payload.velocity = self.tracking.velocity.velocity();
            self.callbacks.end(&payload);
            self.cycle.finish();
            self.tracking = Tracking::default();
        }
    }

    fn on_rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) {
        if self.cycle.rejected(pointer, cx) {
            self.tracking = Tracking::default();
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
        "swipe"
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

    type Log = Rc<RefCell<Vec<(&'static str, GestureEvent)>>>;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn swipe(config: SwipeConfig, log: &Log) -> Swipe {
        let (s, u, e) = (log.clone(), log.clone(), log.clone());
        Swipe::new(config).with_callbacks(
            GestureCallbacks::default()
                .on_start(move |ev| s.borrow_mut().push(("start", ev.clone())))
                .on_update(move |ev| u.borrow_mut().push(("update", ev.clone())))
                .on_end(move |ev| e.borrow_mut().push(("end", ev.clone()))),
        )
    }

    fn kinds(log: &Log) -> Vec<&'static str> {
        log.borrow().iter().map(|(k, _)| *k).collect()
    }

    fn finger(dx: f64, dy: f64, millis: u64) -> Finger {
        Finger {
            down: Point::ZERO,
            last: Point::new(dx, dy),
            down_time: Duration::ZERO,
            last_time: ms(millis),
        }
    }

    #[test]
    fn progress_classifies_fingers() {
        let horizontal = SwipeConfig {
            direction: SwipeDirection::HORIZONTAL,
            ..SwipeConfig::default()
        };
        assert_eq!(progress(&horizontal, &finger(3.0, 0.0, 10)), Progress::Short);
        assert_eq!(progress(&horizontal, &finger(1.0, 6.0, 10)), Progress::Strayed);
        assert_eq!(progress(&horizontal, &finger(10.0, 6.0, 10)), Progress::Fast);
        assert_eq!(progress(&horizontal, &finger(10.0, 0.0, 1000)), Progress::Slow);
        let none = SwipeConfig {
            direction: SwipeDirection::empty(),
            ..SwipeConfig::default()
        };
        assert_eq!(progress(&none, &finger(10.0, 0.0, 10)), Progress::Strayed);
    }

    #[test]
    fn fast_flick_is_recognized_while_moving() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let s = engine.insert(swipe(SwipeConfig::default(), &log));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[s]);
        engine.dispatch(&PointerEvent::moved(0, 0.0, 20.0, ms(20)), &[s]);
        assert_eq!(engine.referee_state(s, PointerId(0)), Some(RefereeState::Succeeded));
        engine.dispatch(&PointerEvent::moved(0, 0.0, 40.0, ms(40)), &[s]);
        engine.dispatch(&PointerEvent::up(0, 0.0, 40.0, ms(50)), &[s]);

        assert_eq!(kinds(&log), ["start", "update", "end"]);
        let log = log.borrow();
        // 20 px in 20 ms.
        assert!((log[0].1.speed - 1000.0).abs() < 1e-6);
        assert!((log[0].1.angle - 90.0).abs() < 1e-9);
        assert_eq!(engine.detect_state(s), Some(DetectState::Ready));
    }

    #[test]
    fn slow_drag_fails_on_release() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let s = engine.insert(swipe(SwipeConfig::default(), &log));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[s]);
        engine.dispatch(&PointerEvent::moved(0, 10.0, 0.0, ms(500)), &[s]);
        assert_eq!(engine.detect_state(s), Some(DetectState::Detecting));
        engine.dispatch(&PointerEvent::up(0, 10.0, 0.0, ms(900)), &[s]);
        assert!(log.borrow().is_empty());
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn recognized_on_release() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let s = engine.insert(swipe(SwipeConfig::default(), &log));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[s]);
        engine.dispatch(&PointerEvent::up(0, 30.0, 0.0, ms(30)), &[s]);
        assert_eq!(kinds(&log), ["start", "end"]);
        assert!(log.borrow()[0].1.speed > DEFAULT_SWIPE_SPEED);
        assert_eq!(engine.detect_state(s), Some(DetectState::Ready));
        assert!(engine.referee().is_empty());
    }

    #[test]
    fn off_axis_finger_gives_up() {
        let log = Log::default();
        let mut engine = GestureEngine::new();
        let s = engine.insert(swipe(
            SwipeConfig {
                direction: SwipeDirection::VERTICAL,
                ..SwipeConfig::default()
            },
            &log,
        ));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[s]);
        engine.dispatch(&PointerEvent::moved(0, 30.0, 2.0, ms(10)), &[s]);
        assert_eq!(engine.referee_state(s, PointerId(0)), Some(RefereeState::Failed));
        assert!(log.borrow().is_empty());
    }
}

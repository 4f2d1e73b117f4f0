// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Two-finger rotation recognition.
//!
//! The angle is that of the line from the lower-id finger to the higher-id one. The reported
//! rotation is the change since both fingers landed, normalized to `[-180°, 180°]`.

use core::time::Duration;

use crate::callbacks::{GestureCallbacks, GestureEvent};
use crate::multi_finger::MultiFinger;
use crate::recognizer::{Context, Recognizer};
use crate::types::{DetectState, PointerEvent, PointerId, PointerKind, SourceType};

use super::{Cycle, snapshot};

/// Default rotation, in degrees, that recognizes the gesture.
pub const DEFAULT_ROTATION_ANGLE: f64 = 1.0;

/// Configuration for [`Rotation`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RotationConfig {
    /// Rotation in degrees needed for recognition. Non-positive values fall back to the default.
    pub angle: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            angle: DEFAULT_ROTATION_ANGLE,
        }
    }
}

fn line_angle(fingers: &MultiFinger) -> Option<f64> {
    let mut iter = fingers.fingers();
    let (_, a) = iter.next()?;
    let (_, b) = iter.next()?;
    let v = b.last - a.last;
    Some(v.y.atan2(v.x).to_degrees())
}

fn normalize(degrees: f64) -> f64 {
    let d = degrees % 360.0;
    if d > 180.0 {
        d - 360.0
    } else if d < -180.0 {
        d + 360.0
    } else {
        d
    }
}

#[derive(Clone, Debug, Default)]
struct Tracking {
    initial: f64,
    angle: f64,
    counting: bool,
    started: bool,
    ended: bool,
    source: SourceType,
    last_time: Duration,
}

/// Recognizes two fingers turning around each other.
#[derive(Debug)]
pub struct Rotation {
    config: RotationConfig,
    callbacks: GestureCallbacks,
    cycle: Cycle,
    tracking: Tracking,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::new(RotationConfig::default())
    }
}

impl Rotation {
    /// Create a rotation recognizer.
    pub fn new(mut config: RotationConfig) -> Self {
        if config.angle.is_nan() || config.angle <= 0.0 {
            log::warn!("rotation angle {} out of range, using default", config.angle);
            config.angle = DEFAULT_ROTATION_ANGLE;
        }
        Self {
            config,
            callbacks: GestureCallbacks::default(),
            cycle: Cycle::default(),
            tracking: Tracking::default(),
        }
    }

    /// Attach callbacks: `start` on recognition, `update` per MOVE, `end` on release, `cancel`
    /// on CANCEL.
    #[must_use]
    pub fn with_callbacks(mut self, callbacks: GestureCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// The normalized configuration.
    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    fn payload(&self, time: Duration) -> GestureEvent {
        let mut payload = snapshot(time, self.tracking.source, &self.cycle.fingers);
        payload.angle = self.tracking.angle;
        payload
    }

    fn fail(&mut self, cx: &mut Context<'_>) {
        self.tracking = Tracking::default();
        self.cycle.fail(cx);
    }

    fn down(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if self.cycle.state == DetectState::Detected || !self.cycle.begin(event, cx) {
            return;
        }
        match self.cycle.fingers.finger_count() {
            2 => {
                self.tracking.source = event.source;
                self.tracking.initial = line_angle(&self.cycle.fingers).unwrap_or_default();
                self.tracking.counting = true;
            }
            n if n > 2 => {
                log::debug!("rotation: {n} fingers down");
                self.fail(cx);
            }
            _ => {}
        }
    }
}

impl Recognizer for Rotation {
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
                if !self.tracking.counting || self.tracking.ended {
                    return;
                }
                let Some(current) = line_angle(&self.cycle.fingers) else {
                    return;
                };
                self.tracking.angle = normalize(current - self.tracking.initial);
                self.tracking.last_time = event.time;
                if self.tracking.started {
                    let payload = self.payload(event.time);
                    self.callbacks.update(&payload);
                } else if self.cycle.state == DetectState::Detecting
                    && self.tracking.angle.abs() >= self.config.angle
                {
                    self.cycle.claim(cx);
                }
            }
            PointerKind::Up | PointerKind::Cancel => {
                if !self.cycle.fingers.is_accepted() {
                    self.fail(cx);
                    self.cycle.lift(event.pointer);
                    return;
                }
                if !self.tracking.ended {
                    self.tracking.ended = true;
                    let payload = self.payload(event.time);
                    if event.kind == PointerKind::Cancel {
                        self.callbacks.cancel(&payload);
                    } else {
                        self.callbacks.end(&payload);
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

    fn on_accepted(&mut self, pointer: PointerId, _: &mut Context<'_>) {
        if self.cycle.fingers.on_accepted(pointer) {
            self.tracking.started = true;
            let payload = self.payload(self.tracking.last_time);
            self.callbacks.start(&payload);
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
        "rotation"
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

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn near(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn normalize_wraps_into_half_turns() {
        assert!(near(normalize(190.0), -170.0));
        assert!(near(normalize(-190.0), 170.0));
        assert!(near(normalize(540.0), 180.0));
        assert!(near(normalize(45.0), 45.0));
    }

    #[test]
    fn quarter_turn_in_two_steps() {
        let log: Rc<RefCell<Vec<(&'static str, f64)>>> = Rc::default();
        let (s, u) = (log.clone(), log.clone());
        let mut engine = GestureEngine::new();
        let r = engine.insert(
            Rotation::default().with_callbacks(
                GestureCallbacks::default()
                    .on_start(move |e| s.borrow_mut().push(("start", e.angle)))
                    .on_update(move |e| u.borrow_mut().push(("update", e.angle))),
            ),
        );

        engine.dispatch(&PointerEvent::down(0, 200.0, 400.0, ms(0)), &[r]);
        engine.dispatch(&PointerEvent::down(1, 400.0, 200.0, ms(5)), &[r]);
        engine.dispatch(&PointerEvent::moved(1, 400.0, 400.0, ms(10)), &[r]);
        engine.dispatch(&PointerEvent::moved(1, 400.0, 600.0, ms(20)), &[r]);

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "start");
        assert!(near(log[0].1, 45.0));
        assert!(near(log[1].1, 90.0));
    }

    #[test]
    fn third_finger_before_recognition_rejects() {
        let mut engine = GestureEngine::new();
        let r = engine.insert(Rotation::default());

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[r]);
        engine.dispatch(&PointerEvent::down(1, 10.0, 0.0, ms(5)), &[r]);
        engine.dispatch(&PointerEvent::down(2, 20.0, 0.0, ms(6)), &[r]);
        for p in [0, 1, 2] {
            assert_eq!(
                engine.referee_state(r, PointerId(p)),
                Some(RefereeState::Failed)
            );
        }
    }

    #[test]
    fn tiny_turn_keeps_detecting_and_bad_angle_falls_back() {
        let mut engine = GestureEngine::new();
        let r = engine.insert(Rotation::new(RotationConfig { angle: 30.0 }));

        engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &[r]);
        engine.dispatch(&PointerEvent::down(1, 100.0, 0.0, ms(5)), &[r]);
        engine.dispatch(&PointerEvent::moved(1, 100.0, 20.0, ms(10)), &[r]);
        assert_eq!(engine.detect_state(r), Some(DetectState::Detecting));

        let fallback = Rotation::new(RotationConfig { angle: -3.0 });
        assert!(near(fallback.config().angle, DEFAULT_ROTATION_ANGLE));
    }
}

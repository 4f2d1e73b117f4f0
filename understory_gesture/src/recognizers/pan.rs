// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pan (drag) recognition.
//!
//! The pan offset is the running average displacement of the fingers in contact: every MOVE
//! adds its delta divided by the number of fingers down. Counting starts once the configured
//! finger count is reached, so a two-finger pan ignores the first finger's motion until the
//! second one lands. Fingers beyond the configured count join the average.

use core::time::Duration;

use bitflags::bitflags;
use kurbo::Vec2;

use crate::callbacks::{GestureCallbacks, GestureEvent};
use crate::recognizer::{Context, Recognizer};
use crate::types::{
    DetectState, Disposal, MAX_FINGERS, PointerEvent, PointerId, PointerKind, SourceType,
};
use crate::velocity::VelocityTracker;

use super::{Cycle, snapshot};

/// Default distance, in pixels, a pan must travel before it is recognized.
pub const DEFAULT_PAN_DISTANCE: f64 = 3.0;

/// Pan distance for small, low-precision screens (watches and similar).
pub const CONSTRAINED_PAN_DISTANCE: f64 = 5.0;

bitflags! {
    /// Directions a pan may be recognized in.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct PanDirection: u8 {
        /// Toward negative x.
        const LEFT = 1;
        /// Toward positive x.
        const RIGHT = 1 << 1;
        /// Toward negative y.
        const UP = 1 << 2;
        /// Toward positive y.
        const DOWN = 1 << 3;
        /// Either horizontal direction.
        const HORIZONTAL = Self::LEFT.bits() | Self::RIGHT.bits();
        /// Either vertical direction.
        const VERTICAL = Self::UP.bits() | Self::DOWN.bits();
        /// Any direction.
        const ALL = Self::HORIZONTAL.bits() | Self::VERTICAL.bits();
    }
}

impl Default for PanDirection {
    fn default() -> Self {
        Self::ALL
    }
}

/// Configuration for [`Pan`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PanConfig {
    /// Fingers required. `0` is treated as `1`; above [`MAX_FINGERS`] disables the recognizer.
    pub fingers: usize,
    /// Permitted directions. An empty set never recognizes.
    pub direction: PanDirection,
    /// Distance the averaged offset must cover.
    pub distance: f64,
}

impl Default for PanConfig {
    fn default() -> Self {
        Self {
            fingers: 1,
            direction: PanDirection::ALL,
            distance: DEFAULT_PAN_DISTANCE,
        }
    }
}

impl PanConfig {
    /// Defaults tuned for small, low-precision screens.
    pub fn constrained() -> Self {
        Self {
            distance: CONSTRAINED_PAN_DISTANCE,
            ..Self::default()
        }
    }
}

/// What the offset says about the gesture so far.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Verdict {
    Wait,
    Accept,
    Reject,
}

fn judge(config: &PanConfig, offset: Vec2) -> Verdict {
    let direction = config.direction;
    if direction.is_empty() {
        return Verdict::Reject;
    }
    if direction == PanDirection::ALL {
        return if offset.hypot() >= config.distance {
            Verdict::Accept
        } else {
            Verdict::Wait
        };
    }
    let (magnitude, allowed, negative, positive) = if offset.x.abs() >= offset.y.abs() {
        (
            offset.x,
            PanDirection::HORIZONTAL,
            PanDirection::LEFT,
            PanDirection::RIGHT,
        )
    } else {
        (
            offset.y,
            PanDirection::VERTICAL,
            PanDirection::UP,
            PanDirection::DOWN,
        )
    };
    if !direction.intersects(allowed) || magnitude.abs() < config.distance {
        return Verdict::Wait;
    }
    let wanted = if magnitude < 0.0 { negative } else { positive };
    if direction.contains(wanted) {
        Verdict::Accept
    } else {
        Verdict::Reject
    }
}

#[derive(Clone, Debug, Default)]
struct Tracking {
    offset: Vec2,
    reported: Vec2,
    velocity: VelocityTracker,
    source: SourceType,
    last_time: Duration,
    started: bool,
    ended: bool,
}

/// Recognizes a drag of one or more fingers.
#[derive(Debug)]
pub struct Pan {
    config: PanConfig,
    callbacks: GestureCallbacks,
    cycle: Cycle,
    tracking: Tracking,
}

impl Default for Pan {
    fn default() -> Self {
        Self::new(PanConfig::default())
    }
}

impl Pan {
    /// Create a pan recognizer.
    pub fn new(mut config: PanConfig) -> Self {
        config.fingers = config.fingers.max(1);
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
    pub fn config(&self) -> &PanConfig {
        &self.config
    }

    /// Averaged offset accumulated this cycle.
    pub fn offset(&self) -> Vec2 {
        self.tracking.offset
    }

    fn payload(&mut self, time: Duration) -> GestureEvent {
        let mut payload = snapshot(time, self.tracking.source, &self.cycle.fingers);
        payload.offset = self.tracking.offset;
        payload.delta = self.tracking.offset - self.tracking.reported;
        self.tracking.reported = self.tracking.offset;
        payload
    }

    fn down(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if self.config.fingers > MAX_FINGERS || !self.cycle.begin(event, cx) {
            return;
        }
        if self.cycle.fingers.finger_count() == 1 {
            self.tracking.source = event.source;
        }
        if self.cycle.state == DetectState::Detected {
            // A finger joining a recognized pan is claimed right away.
            cx.resolve(event.pointer, Disposal::Accept);
        }
    }

    fn moved(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        let Some(delta) = self.cycle.fingers.update(event) else {
            return;
        };
        let count = self.cycle.fingers.finger_count();
        if count < self.config.fingers || self.tracking.ended {
            return;
        }
        self.tracking.offset += delta / count as f64;
        self.tracking.last_time = event.time;
        self.tracking
            .velocity
            .add(event.time, self.tracking.offset.to_point());

        if self.tracking.started {
            let payload = self.payload(event.time);
            self.callbacks.update(&payload);
            return;
        }
        if self.cycle.state != DetectState::Detecting {
            return;
        }
        match judge(&self.config, self.tracking.offset) {
            Verdict::Wait => {}
            Verdict::Accept => self.cycle.claim(cx),
            Verdict::Reject => {
                log::debug!(
                    "pan: offset {:?} outside the permitted directions",
                    self.tracking.offset
                );
                self.fail(cx);
            }
        }
    }

    fn release(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if !self.cycle.fingers.is_accepted() {
            self.fail(cx);
            self.cycle.lift(event.pointer);
            return;
        }
        let remaining = self.cycle.fingers.finger_count() - 1;
        let cancel = event.kind == PointerKind::Cancel;
        if !self.tracking.ended && (remaining < self.config.fingers || cancel) {
            self.tracking.ended = true;
            let mut payload = self.payload(event.time);
            if cancel {
                self.callbacks.cancel(&payload);
            } else {
                payload.velocity = self.tracking.velocity.velocity();
                self.callbacks.end(&payload);
            }
        }
        self.cycle.lift(event.pointer);
        if self.cycle.fingers.finger_count() == 0 {
            self.cycle.finish();
            self.tracking = Tracking::default();
        }
    }

    fn fail(&mut self, cx: &mut Context<'_>) {
        self.tracking = Tracking::default();
        self.cycle.fail(cx);
    }
}

impl Recognizer for Pan {
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
            PointerKind::Move => self.moved(event, cx),
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
        "pan"
    }
}

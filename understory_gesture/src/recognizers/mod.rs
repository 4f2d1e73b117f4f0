// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf recognizers.
//!
//! Each leaf follows the same cycle: the first DOWN moves it from `Ready` to `Detecting` and
//! registers the pointer; local detection either claims the gesture (`Detected`, ACCEPT on every
//! registered pointer) or gives up (REJECT on every undecided pointer). The cycle ends, back to
//! `Ready`, once the gesture has been released or lost and every finger has lifted.
//!
//! | Recognizer | Accepts when | Rejects when |
//! |---|---|---|
//! | [`Tap`] | the configured number of quick contacts completes | a finger drifts or a deadline passes |
//! | [`LongPress`] | fingers are held still past the duration | movement or release before the duration |
//! | [`Press`] | one finger is held still briefly | movement or release before the timeout |
//! | [`Pan`] | averaged displacement passes the distance on a permitted axis | movement goes the forbidden way |
//! | [`Pinch`] | finger spread changes by the distance | fingers lift before that |
//! | [`Rotation`] | the two-finger angle turns by the threshold | a third finger, or a lift, comes first |
//! | [`Swipe`] | every finger moved fast enough along a permitted direction | a finger moves the wrong way |
//!
//! [`TouchListener`] is not a gesture: it observes raw events in the filter pass and never enters
//! arbitration.

mod hold;
mod pan;
mod pinch;
mod rotation;
mod swipe;
mod tap;
mod touch;

pub use hold::{
    LONG_PRESS_DURATION, LONG_PRESS_REPEAT_INTERVAL, LONG_PRESS_SLOP, LongPress, LongPressConfig,
    PRESS_SLOP, PRESS_TIMEOUT, Press, PressConfig,
};
pub use pan::{CONSTRAINED_PAN_DISTANCE, DEFAULT_PAN_DISTANCE, Pan, PanConfig, PanDirection};
pub use pinch::{DEFAULT_PINCH_DISTANCE, MAX_PINCH_FINGERS, Pinch, PinchConfig};
pub use rotation::{DEFAULT_ROTATION_ANGLE, Rotation, RotationConfig};
pub use swipe::{DEFAULT_SWIPE_DISTANCE, DEFAULT_SWIPE_SPEED, Swipe, SwipeConfig, SwipeDirection};
pub use tap::{MULTI_FINGER_TIMEOUT, MULTI_TAP_TIMEOUT, TAP_SLOP, Tap, TapConfig};
pub use touch::{TouchCallback, TouchListener};

use core::time::Duration;

use crate::callbacks::{FingerInfo, GestureEvent};
use crate::multi_finger::{Finger, MultiFinger};
use crate::recognizer::Context;
use crate::types::{DetectState, MAX_FINGERS, PointerEvent, PointerId, SourceType};

/// Per-cycle bookkeeping shared by the leaves.
#[derive(Clone, Debug, Default)]
pub(crate) struct Cycle {
    pub(crate) fingers: MultiFinger,
    pub(crate) state: DetectState,
    /// Lost this cycle; events are ignored until every finger has lifted.
    pub(crate) failed: bool,
}

impl Cycle {
    /// Handle a DOWN: start a cycle if idle and follow the pointer.
    ///
    /// Returns false if the event is ignored (lost cycle, finger already down, or too many fingers).
    pub(crate) fn begin(&mut self, event: &PointerEvent, cx: &mut Context<'_>) -> bool {
        if self.failed || self.fingers.finger_count() >= MAX_FINGERS {
            return false;
        }
        if self.state == DetectState::Ready {
            self.fingers.end_cycle();
            self.state = DetectState::Detecting;
        }
        self.fingers.track(event, cx)
    }

    /// Local detection matched: ask to win every registered pointer.
    pub(crate) fn claim(&mut self, cx: &mut Context<'_>) {
        self.state = DetectState::Detected;
        self.fingers.claim(cx);
    }

    /// Local detection failed: withdraw from every undecided pointer.
    pub(crate) fn fail(&mut self, cx: &mut Context<'_>) {
        self.fingers.withdraw(cx);
        self.lose();
    }

    /// A pointer was rejected. Returns true if that ends an undecided gesture.
    pub(crate) fn rejected(&mut self, pointer: PointerId, cx: &mut Context<'_>) -> bool {
        if self.fingers.on_rejected(pointer, cx) {
            self.lose();
            return true;
        }
        false
    }

    fn lose(&mut self) {
        self.state = DetectState::Ready;
        self.failed = self.fingers.finger_count() > 0;
        if !self.failed {
            self.fingers.reset();
        }
    }

    /// A finger lifted; returns it if it was followed.
    pub(crate) fn lift(&mut self, pointer: PointerId) -> Option<Finger> {
        let finger = self.fingers.lift(pointer);
        if self.failed && self.fingers.finger_count() == 0 {
            self.failed = false;
            self.fingers.reset();
        }
        finger
    }

    /// The gesture was released normally.
    pub(crate) fn finish(&mut self) {
        self.state = DetectState::Ready;
        self.fingers.end_cycle();
    }

    /// Returns true if the cycle is live and `event` belongs to a followed finger.
    pub(crate) fn follows(&self, event: &PointerEvent) -> bool {
        !self.failed && self.state != DetectState::Ready && self.fingers.is_down(event.pointer)
    }
}

/// Base payload for a callback: timing, device, fingers in contact, and their centroid.
pub(crate) fn snapshot(time: Duration, source: SourceType, fingers: &MultiFinger) -> GestureEvent {
    GestureEvent {
        time,
        source,
        fingers: fingers
            .fingers()
            .map(|(pointer, f)| FingerInfo {
                pointer,
                position: f.last,
            })
            .collect(),
        position: fingers.centroid().unwrap_or_default(),
        ..GestureEvent::default()
    }
}

/// Clamp a configured finger count into `min..=max`, logging out-of-range values.
pub(crate) fn clamp_fingers(requested: usize, min: usize, max: usize, what: &str) -> usize {
    if (min..=max).contains(&requested) {
        requested
    } else {
        log::warn!("{what}: finger count {requested} outside {min}..={max}, using {min}");
        min
    }
}

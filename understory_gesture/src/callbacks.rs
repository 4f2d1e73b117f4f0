// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! User-visible gesture callbacks and the event they receive.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::time::Duration;

use kurbo::{Point, Vec2};

use crate::types::{PointerId, SourceType};

/// A finger participating in a gesture, as reported to callbacks.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FingerInfo {
    /// Pointer id of the finger.
    pub pointer: PointerId,
    /// Global position of the finger.
    pub position: Point,
}

/// Payload passed to every gesture callback.
///
/// Fields that do not apply to a recognizer keep their defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureEvent {
    /// Timestamp of the event that triggered the callback.
    pub time: Duration,
    /// Device of that event.
    pub source: SourceType,
    /// Fingers in contact (or, for a tap, the finger that completed it).
    pub fingers: Vec<FingerInfo>,
    /// Gesture location: tap point, press point, or finger centroid.
    pub position: Point,
    /// Pan: total averaged displacement since the gesture started counting.
    pub offset: Vec2,
    /// Pan: displacement since the previous callback.
    pub delta: Vec2,
    /// Pinch: current spread over initial spread.
    pub scale: f64,
    /// Rotation: degrees from the initial angle. Swipe: direction of travel in degrees.
    pub angle: f64,
    /// Swipe: speed in pixels per second.
    pub speed: f64,
    /// Pan and swipe: release velocity in pixels per second.
    pub velocity: Vec2,
    /// Long press: true for repeated actions while held.
    pub repeat: bool,
}

impl Default for GestureEvent {
    fn default() -> Self {
        Self {
            time: Duration::ZERO,
            source: SourceType::Unknown,
            fingers: Vec::new(),
            position: Point::ZERO,
            offset: Vec2::ZERO,
            delta: Vec2::ZERO,
            scale: 1.0,
            angle: 0.0,
            speed: 0.0,
            velocity: Vec2::ZERO,
            repeat: false,
        }
    }
}

/// A boxed gesture callback.
pub type Handler = Box<dyn FnMut(&GestureEvent)>;

/// The callback set a recognizer fires.
///
/// Discrete recognizers (tap, long press, press) fire `action`; continuous ones fire
/// `start`, `update`, `end`, and `cancel`. Long press fires `end`/`cancel` when released after
/// triggering.
#[derive(Default)]
pub struct GestureCallbacks {
    action: Option<Handler>,
    start: Option<Handler>,
    update: Option<Handler>,
    end: Option<Handler>,
    cancel: Option<Handler>,
}

impl core::fmt::Debug for GestureCallbacks {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GestureCallbacks")
            .field("action", &self.action.is_some())
            .field("start", &self.start.is_some())
            .field("update", &self.update.is_some())
            .field("end", &self.end.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

impl GestureCallbacks {
    /// Set the action callback.
    #[must_use]
    pub fn on_action(mut self, f: impl FnMut(&GestureEvent) + 'static) -> Self {
        self.action = Some(Box::new(f));
        self
    }

    /// Set the start callback.
    #[must_use]
    pub fn on_start(mut self, f: impl FnMut(&GestureEvent) + 'static) -> Self {
        self.start = Some(Box::new(f));
        self
    }

    /// Set the update callback.
    #[must_use]
    pub fn on_update(mut self, f: impl FnMut(&GestureEvent) + 'static) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    /// Set the end callback.
    #[must_use]
    pub fn on_end(mut self, f: impl FnMut(&GestureEvent) + 'static) -> Self {
        self.end = Some(Box::new(f));
        self
    }

    /// Set the cancel callback.
    #[must_use]
    pub fn on_cancel(mut self, f: impl FnMut(&GestureEvent) + 'static) -> Self {
        self.cancel = Some(Box::new(f));
        self
    }

    pub(crate) fn action(&mut self, event: &GestureEvent) {
        if let Some(f) = self.action.as_mut() {
            f(event);
        }
    }

    pub(crate) fn start(&mut self, event: &GestureEvent) {
        if let Some(f) = self.start.as_mut() {
            f(event);
        }
    }

    pub(crate) fn update(&mut self, event: &GestureEvent) {
        if let Some(f) = self.update.as_mut() {
            f(event);
        }
    }

    pub(crate) fn end(&mut self, event: &GestureEvent) {
        if let Some(f) = self.end.as_mut() {
            f(event);
        }
    }

    pub(crate) fn cancel(&mut self, event: &GestureEvent) {
        if let Some(f) = self.cancel.as_mut() {
            f(event);
        }
    }

    /// Take over `old`'s callbacks for every slot this set leaves empty.
    pub(crate) fn absorb(&mut self, old: &mut Self) {
        fn fill(slot: &mut Option<Handler>, old: &mut Option<Handler>) {
            if slot.is_none() {
                *slot = old.take();
            }
        }
        fill(&mut self.action, &mut old.action);
        fill(&mut self.start, &mut old.start);
        fill(&mut self.update, &mut old.update);
        fill(&mut self.end, &mut old.end);
        fill(&mut self.cancel, &mut old.cancel);
    }
}

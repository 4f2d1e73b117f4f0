// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pinch recognition.

use core::time::Duration;

use crate::callbacks::{GestureCallbacks, GestureEvent};
use crate::multi_finger::MultiFinger;
use crate::recognizer::{Context, Recognizer};
use crate::types::{DetectState, MAX_FINGERS, PointerEvent, PointerId, PointerKind, SourceType};

use super::{Cycle, clamp_fingers, snapshot};

/// Default change in finger spread, in pixels, that recognizes a pinch.
pub const DEFAULT_PINCH_DISTANCE: f64 = 3.0;

/// Most fingers a pinch can be configured with.
pub const MAX_PINCH_FINGERS: usize = 5;

/// Configuration for [`Pinch`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PinchConfig {
    /// Fingers required, `2..=5`. Other values up to [`MAX_FINGERS`] fall back to `2`; above
    /// [`MAX_FINGERS`] disables the recognizer.
    pub fingers: usize,
    /// Change in spread (average distance from the centroid) that recognizes the pinch.
    pub distance: f64,
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self {
            fingers: 2,
            distance: DEFAULT_PINCH_DISTANCE,
        }
    }
}

/// Average distance of the fingers from their centroid.
fn spread(fingers: &MultiFinger) -> f64 {
    let Some(center) = fingers.centroid() else {
        return 0.0;
    };
    let total: f64 = fingers.fingers().map(|(_, f)| (f.last - center).hypot()).sum();
    total / fingers.finger_count() as f64
}

#[derive(Clone, Debug, Default)]
struct Tracking {
    initial: f64,
    current: f64,
    counting: bool,
    started: bool,
    ended: bool,
    source: SourceType,
    last_time: Duration,
}

impl Tracking {
    fn scale(&self) -> f64 {
        if self.initial > 0.0 {
            self.current / self.initial
        } else {
            1.0
        }
    }
}

/// Recognizes fingers spreading apart or pinching together.
#[derive(Debug)]
pub struct Pinch {
    config: PinchConfig,
    callbacks: GestureCallbacks,
    cycle: Cycle,
    tracking: Tracking,
}

impl Default for Pinch {
    fn default() -> Self {
        Self::new(PinchConfig::default())
    }
}

impl Pinch {
    /// Create a pinch recognizer.
    pub fn new(mut config: PinchConfig) -> Self {
        if config.fingers <= MAX_FINGERS {
            config.fingers = clamp_fingers(config.fingers, 2, MAX_PINCH_FINGERS, "pinch");
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
    pub fn config(&self) -> &PinchConfig {
        &self.config
    }

    fn payload(&self, time: Duration) -> GestureEvent {
        let mut payload = snapshot(time, self.tracking.source, &self.cycle.fingers);
        payload.scale = self.tracking.scale();
        payload
    }

    fn fail(&mut self, cx: &mut Context<'_>) {
        self.tracking = Tracking::default();
        self.cycle.fail(cx);
    }
}

impl Recognizer for Pinch {
    fn handle_event(&mut self, event: &PointerEvent, cx: &mut Context<'_>) {
        if event.kind == PointerKind::Down {
            // Fingers beyond the configured count are not followed.
            if self.config.fingers > MAX_FINGERS
                || self.cycle.fingers.finger_count() >= self.config.fingers
                || !self.cycle.begin(event, cx)
            {
                return;
            }
            if self.cycle.fingers.finger_count() == self.config.fingers {
                self.tracking.source = event.source;
                self.tracking.initial = spread(&self.cycle.fingers);
                self.tracking.current = self.tracking.initial;
                self.tracking.counting = true;
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
                if !self.tracking.counting || self.tracking.ended {
                    return;
                }
                self.tracking.current = spread(&self.cycle.fingers);
                self.tracking.last_time = event.time;
                if self.tracking.started {
                    let payload = self.payload(event.time);
                    self.callbacks.update(&payload);
                } else if self.cycle.state == DetectState::Detecting
                    && (self.tracking.current - self.tracking.initial).abs()
                        >= self.config.distance
                {
                    self.cycle.claim(cx);
                }
            }
            PointerKind::Up | PointerKind::Cancel => {
                if !self.cycle.fingers.is_accepted() {
                    log::debug!("pinch: finger lifted before the spread changed enough");
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
        "pinch"
    }
}

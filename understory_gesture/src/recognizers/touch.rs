// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw touch listener.

use alloc::boxed::Box;

use crate::recognizer::{Context, Recognizer};
use crate::types::{DetectState, Outcome, PointerEvent, PointerId, PointerKind};

/// A boxed raw-event callback.
pub type TouchCallback = Box<dyn FnMut(&PointerEvent)>;

/// Observes raw pointer events during the filter pass.
///
/// A listener never registers with the referee and never wins or loses a pointer; it only sees
/// events. With `stop_propagation` set, it ends the filter pass so listeners behind it in the
/// dispatch list are skipped. Recognizers still handle the event.
#[derive(Default)]
pub struct TouchListener {
    stop_propagation: bool,
    on_down: Option<TouchCallback>,
    on_move: Option<TouchCallback>,
    on_up: Option<TouchCallback>,
    on_cancel: Option<TouchCallback>,
}

impl core::fmt::Debug for TouchListener {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TouchListener")
            .field("stop_propagation", &self.stop_propagation)
            .field("on_down", &self.on_down.is_some())
            .field("on_move", &self.on_move.is_some())
            .field("on_up", &self.on_up.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .finish()
    }
}

impl TouchListener {
    /// Create a listener that lets the filter pass continue.
    pub fn new() -> Self {
        Self::default()
    }

    /// End the filter pass after this listener.
    #[must_use]
    pub fn stop_propagation(mut self, stop: bool) -> Self {
        self.stop_propagation = stop;
        self
    }

    /// Observe DOWN events.
    #[must_use]
    pub fn on_down(mut self, f: impl FnMut(&PointerEvent) + 'static) -> Self {
        self.on_down = Some(Box::new(f));
        self
    }

    /// Observe MOVE events.
    #[must_use]
    pub fn on_move(mut self, f: impl FnMut(&PointerEvent) + 'static) -> Self {
        self.on_move = Some(Box::new(f));
        self
    }

    /// Observe UP events.
    #[must_use]
    pub fn on_up(mut self, f: impl FnMut(&PointerEvent) + 'static) -> Self {
        self.on_up = Some(Box::new(f));
        self
    }

    /// Observe CANCEL events.
    #[must_use]
    pub fn on_cancel(mut self, f: impl FnMut(&PointerEvent) + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }
}

impl Recognizer for TouchListener {
    fn filter(&mut self, event: &PointerEvent) -> Outcome {
        let callback = match event.kind {
            PointerKind::Down => self.on_down.as_mut(),
            PointerKind::Move => self.on_move.as_mut(),
            PointerKind::Up => self.on_up.as_mut(),
            PointerKind::Cancel => self.on_cancel.as_mut(),
        };
        if let Some(f) = callback {
            f(event);
        }
        if self.stop_propagation {
            Outcome::Stop
        } else {
            Outcome::Continue
        }
    }

    fn handle_event(&mut self, _: &PointerEvent, _: &mut Context<'_>) {}

    fn on_accepted(&mut self, _: PointerId, _: &mut Context<'_>) {}

    fn on_rejected(&mut self, _: PointerId, _: &mut Context<'_>) {}

    fn detect_state(&self) -> DetectState {
        DetectState::Ready
    }

    fn can_reconcile(&self, old: &dyn Recognizer) -> bool {
        old.downcast_ref::<Self>()
            .is_some_and(|old| old.stop_propagation == self.stop_propagation)
    }

    fn reconcile_from(&mut self, old: &mut dyn Recognizer) {
        let Some(old) = old.downcast_mut::<Self>() else {
            return;
        };
        for (slot, previous) in [
            (&mut self.on_down, &mut old.on_down),
            (&mut self.on_move, &mut old.on_move),
            (&mut self.on_up, &mut old.on_up),
            (&mut self.on_cancel, &mut old.on_cancel),
        ] {
            if slot.is_none() {
                *slot = previous.take();
            }
        }
    }

    fn name(&self) -> &'static str {
        "touch"
    }
}

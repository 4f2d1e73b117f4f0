// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for the gesture engine: pointer events, handles, and the state enums
//! shared by recognizers, scopes, and the referee.
//!
//! ## Overview
//!
//! These types describe the arbitration protocol and its inputs.
//! They are referenced by the [`referee`](crate::referee), the [`engine`](crate::engine),
//! and every recognizer in [`recognizers`](crate::recognizers) and [`groups`](crate::groups).

use core::time::Duration;

use kurbo::Point;

/// Identifier of one pointer (finger, mouse button, pen contact) for its whole
/// DOWN → UP/CANCEL lifecycle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PointerId(pub u32);

/// Kind of a pointer event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PointerKind {
    /// Contact begins.
    Down,
    /// Contact moves.
    Move,
    /// Contact ends normally.
    Up,
    /// Contact is aborted by the platform.
    Cancel,
}

impl PointerKind {
    /// Returns true for the kinds that end a pointer's lifecycle.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

/// Device that produced a pointer event.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SourceType {
    /// Unknown or unreported device.
    #[default]
    Unknown,
    /// Touch screen.
    Touch,
    /// Mouse.
    Mouse,
    /// Stylus or pen.
    Pen,
}

/// A single pointer event as delivered to recognizers.
///
/// Immutable per delivery; recognizers copy what they need to keep.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    /// Pointer this event belongs to.
    pub pointer: PointerId,
    /// Event kind.
    pub kind: PointerKind,
    /// Position in global (window) coordinates.
    pub position: Point,
    /// Timestamp relative to an arbitrary host epoch.
    pub time: Duration,
    /// Device tag.
    pub source: SourceType,
}

impl PointerEvent {
    /// Create an event from a touch device.
    pub const fn new(
        pointer: PointerId,
        kind: PointerKind,
        position: Point,
        time: Duration,
    ) -> Self {
        Self {
            pointer,
            kind,
            position,
            time,
            source: SourceType::Touch,
        }
    }

    /// Shorthand for a touch DOWN event.
    pub const fn down(pointer: u32, x: f64, y: f64, time: Duration) -> Self {
        Self::new(PointerId(pointer), PointerKind::Down, Point::new(x, y), time)
    }

    /// Shorthand for a touch MOVE event.
    pub const fn moved(pointer: u32, x: f64, y: f64, time: Duration) -> Self {
        Self::new(PointerId(pointer), PointerKind::Move, Point::new(x, y), time)
    }

    /// Shorthand for a touch UP event.
    pub const fn up(pointer: u32, x: f64, y: f64, time: Duration) -> Self {
        Self::new(PointerId(pointer), PointerKind::Up, Point::new(x, y), time)
    }

    /// Shorthand for a touch CANCEL event.
    pub const fn cancel(pointer: u32, x: f64, y: f64, time: Duration) -> Self {
        Self::new(PointerId(pointer), PointerKind::Cancel, Point::new(x, y), time)
    }

    /// Return a copy of this event tagged with a different source device.
    #[must_use]
    pub const fn with_source(mut self, source: SourceType) -> Self {
        self.source = source;
        self
    }
}

/// Identifier for a recognizer held by a [`GestureEngine`](crate::engine::GestureEngine).
///
/// A small, copyable handle made of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `RecognizerId` for that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct id.
///
/// Scopes, groups, and timers hold these ids instead of owning recognizers.
/// A stale id never aliases a different live recognizer because the generation must match,
/// so every consumer treats a stale id as "no longer interested".
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecognizerId(pub(crate) u32, pub(crate) u32);

impl RecognizerId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Identifier of a one-shot timer requested through a [`Scheduler`](crate::timer::Scheduler).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TimerId(pub u64);

/// A recognizer's request to the referee.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Disposal {
    /// "I recognized my gesture and want to win."
    Accept,
    /// "This stream is not my gesture."
    Reject,
    /// "I am ready to win, but wait in case a peer wins first."
    Pending,
}

/// Per-recognizer detection progress, owned by the recognizer itself.
///
/// `Ready → Detecting → Detected`, back to `Ready` when a cycle ends.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum DetectState {
    /// Idle, waiting for a first DOWN.
    #[default]
    Ready,
    /// Tracking pointers, gesture not matched yet.
    Detecting,
    /// Gesture matched locally; the referee decides whether it wins.
    Detected,
}

/// Arbitration progress of one recognizer, owned by the scope (or group) that holds it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum RefereeState {
    /// Registered and undecided.
    #[default]
    Detecting,
    /// Waiting to win; may still be pre-empted.
    Pending,
    /// Asked to win or wait while a peer is pending.
    Blocked,
    /// Won.
    Succeeded,
    /// Lost.
    Failed,
}

impl RefereeState {
    /// Returns true for the terminal states.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Verdict delivered back to a recognizer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Notice {
    /// The recognizer won for the pointer.
    Accepted,
    /// The recognizer lost for the pointer.
    Rejected,
    /// The recognizer is the pending candidate for the pointer.
    Pending,
}

/// Priority class of a recognizer inside a scope.
///
/// `High` pre-empts `Low`; `Parallel` members resolve independently of both.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum GesturePriority {
    /// Ordinary competing recognizer.
    #[default]
    Low,
    /// Wins over every `Low` member when it accepts.
    High,
    /// Never competes; accepted or rejected on its own.
    Parallel,
}

impl GesturePriority {
    /// Convert a raw binding value (`0` low, `1` high, `2` parallel).
    ///
    /// Out-of-range values fall back to [`GesturePriority::Low`].
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Low,
            1 => Self::High,
            2 => Self::Parallel,
            other => {
                log::warn!("gesture priority {other} out of range, using Low");
                Self::Low
            }
        }
    }
}

/// Controls how a recognizer treats more specific recognizers in the dispatch list.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum GestureMask {
    /// Internal (more specific) recognizers keep receiving events.
    #[default]
    Normal,
    /// Internal recognizers before this one in the dispatch list are skipped.
    IgnoreInternal,
}

impl GestureMask {
    /// Convert a raw binding value (`0` normal, `1` ignore-internal).
    ///
    /// Out-of-range values fall back to [`GestureMask::Normal`].
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::Normal,
            1 => Self::IgnoreInternal,
            other => {
                log::warn!("gesture mask {other} out of range, using Normal");
                Self::Normal
            }
        }
    }
}

/// Propagation outcome for the two-phase delivery in
/// [`GestureEngine::dispatch`](crate::engine::GestureEngine::dispatch).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Outcome {
    /// Continue with the next entry.
    #[default]
    Continue,
    /// Stop the current pass.
    Stop,
    /// Stop the current pass and mark the event consumed.
    StopAndConsume,
}

/// Hard upper bound on the finger count any recognizer accepts.
///
/// A recognizer configured above this never enters [`DetectState::Detecting`].
pub const MAX_FINGERS: usize = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_from_raw_falls_back_to_low() {
        assert_eq!(GesturePriority::from_raw(1), GesturePriority::High);
        assert_eq!(GesturePriority::from_raw(2), GesturePriority::Parallel);
        assert_eq!(GesturePriority::from_raw(-3), GesturePriority::Low);
        assert_eq!(GesturePriority::from_raw(42), GesturePriority::Low);
    }

    #[test]
    fn mask_from_raw_falls_back_to_normal() {
        assert_eq!(GestureMask::from_raw(1), GestureMask::IgnoreInternal);
        assert_eq!(GestureMask::from_raw(7), GestureMask::Normal);
    }

    #[test]
    fn terminal_kinds_and_states() {
        assert!(PointerKind::Up.is_terminal());
        assert!(PointerKind::Cancel.is_terminal());
        assert!(!PointerKind::Move.is_terminal());
        assert!(RefereeState::Failed.is_terminal());
        assert!(!RefereeState::Blocked.is_terminal());
    }

    #[test]
    fn event_shorthands_tag_touch() {
        let e = PointerEvent::down(3, 1.0, 2.0, Duration::from_millis(5));
        assert_eq!(e.pointer, PointerId(3));
        assert_eq!(e.kind, PointerKind::Down);
        assert_eq!(e.position, Point::new(1.0, 2.0));
        assert_eq!(e.source, SourceType::Touch);
        assert_eq!(e.with_source(SourceType::Mouse).source, SourceType::Mouse);
    }
}

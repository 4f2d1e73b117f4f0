// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_gesture --heading-base-level=0

//! Understory Gesture: deterministic multi-touch gesture arbitration.
//!
//! ## Overview
//!
//! Several gesture recognizers usually watch the same fingers: a tap and a long press on a
//! button, a pan on the list around it, a pinch on the page. This crate decides which of them
//! wins. Each recognizer turns raw pointer events into local detection progress and asks a
//! referee to win, wait, or give up; the referee settles the contest per pointer and tells every
//! participant the outcome.
//!
//! It does not perform hit testing. The host passes, with each event, the ordered list of
//! recognizers interested in it (most specific first), typically built from a
//! hit-test path.
//!
//! ## Pieces
//!
//! - [`GestureEngine`](crate::engine::GestureEngine) owns the recognizers and runs dispatch,
//!   timers, and reconciliation.
//! - [`GestureReferee`](crate::referee::GestureReferee) keeps one
//!   [`GestureScope`](crate::scope::GestureScope) per active pointer. Members are split into
//!   `High`, `Low`, and `Parallel` priority classes; a pending member blocks lower-priority
//!   accepts until it resolves.
//! - [`recognizers`] has the leaves: tap, long press, press, pan, pinch, rotation, swipe, and a
//!   raw touch listener.
//! - [`groups`] composes recognizers: exclusive, parallel, sequence, and timeout.
//! - [`callbacks`] carries the user-facing gesture events.
//!
//! ## Time
//!
//! The engine never reads a clock. Recognizers ask for one-shot timers through a
//! [`Scheduler`](crate::timer::Scheduler); the host fires them with
//! [`fire_timer`](crate::engine::GestureEngine::fire_timer). The default
//! [`ManualScheduler`](crate::timer::ManualScheduler) is a virtual clock advanced by
//! [`advance_time`](crate::engine::GestureEngine::advance_time), which makes every scenario
//! reproducible.
//!
//! ## Example
//!
//! ```rust
//! use core::cell::Cell;
//! use core::time::Duration;
//! use std::rc::Rc;
//!
//! use understory_gesture::callbacks::GestureCallbacks;
//! use understory_gesture::engine::GestureEngine;
//! use understory_gesture::recognizers::{Pan, Tap};
//! use understory_gesture::types::{PointerEvent, PointerId, RefereeState};
//!
//! let dragged = Rc::new(Cell::new(false));
//! let flag = dragged.clone();
//!
//! let mut engine = GestureEngine::new();
//! let tap = engine.insert(Tap::default());
//! let pan = engine.insert(
//!     Pan::default().with_callbacks(GestureCallbacks::default().on_start(move |_| flag.set(true))),
//! );
//! let targets = [tap, pan];
//! let ms = Duration::from_millis;
//!
//! engine.dispatch(&PointerEvent::down(0, 0.0, 0.0, ms(0)), &targets);
//! engine.dispatch(&PointerEvent::moved(0, 40.0, 0.0, ms(16)), &targets);
//! assert!(dragged.get());
//! assert_eq!(engine.referee_state(tap, PointerId(0)), Some(RefereeState::Failed));
//!
//! engine.dispatch(&PointerEvent::up(0, 40.0, 0.0, ms(32)), &targets);
//! assert!(engine.referee().is_empty());
//! ```
//!
//! This crate uses `std` for float math (through Kurbo) and `alloc` collections.

extern crate alloc;

mod arena;

pub mod callbacks;
pub mod engine;
pub mod groups;
pub mod multi_finger;
pub mod recognizer;
pub mod recognizers;
pub mod referee;
pub mod scope;
pub mod timer;
pub mod types;
pub mod velocity;

pub use engine::GestureEngine;
pub use recognizer::{Context, Recognizer};
pub use referee::GestureReferee;
pub use types::{
    DetectState, Disposal, GestureMask, GesturePriority, PointerEvent, PointerId, PointerKind,
    RecognizerId, RefereeState,
};

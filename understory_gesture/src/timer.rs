// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One-shot timer boundary.
//!
//! The engine never reads a clock. Recognizers that need a deadline ask the engine for a
//! [`TimerId`]; the engine forwards the request to a host-supplied [`Scheduler`] and the host
//! calls [`GestureEngine::fire_timer`](crate::engine::GestureEngine::fire_timer) when the
//! delay has elapsed. Canceling is always safe, and firing a canceled or unknown timer is a no-op.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::time::Duration;

use crate::types::TimerId;

/// Host capability to run a one-shot delayed callback.
pub trait Scheduler {
    /// Arrange for `timer` to fire once after `delay`.
    fn schedule(&mut self, timer: TimerId, delay: Duration);
    /// Drop `timer` if it has not fired yet.
    fn cancel(&mut self, timer: TimerId);
}

/// Virtual-clock scheduler for tests, demos, and hosts that drive time explicitly.
///
/// Time only moves through [`advance`](Self::advance) (or
/// [`GestureEngine::advance_time`](crate::engine::GestureEngine::advance_time), which also
/// fires the due timers).
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    due: BTreeMap<TimerId, Duration>,
}

impl ManualScheduler {
    /// Create a scheduler at time zero with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers waiting to fire.
    pub fn pending(&self) -> usize {
        self.due.len()
    }

    /// Due time of `timer`, if it is still scheduled.
    pub fn due_time(&self, timer: TimerId) -> Option<Duration> {
        self.due.get(&timer).copied()
    }

    /// Earliest due time among scheduled timers.
    pub fn next_due(&self) -> Option<Duration> {
        self.due.values().min().copied()
    }

    /// Remove and return the earliest timer due at or before `until`, moving the clock to
    /// its due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, until: Duration) -> Option<TimerId> {
        let (&timer, &at) = self
            .due
            .iter()
            .filter(|(_, at)| **at <= until)
            .min_by_key(|(timer, at)| (**at, **timer))?;
        self.due.remove(&timer);
        self.now = self.now.max(at);
        Some(timer)
    }

    /// Move the clock forward by `by` and return every timer that became due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        let until = self.now + by;
        let mut fired = Vec::new();
        while let Some(timer) = self.pop_due(until) {
            fired.push(timer);
        }
        self.now = until;
        fired
    }

    pub(crate) fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, timer: TimerId, delay: Duration) {
        self.due.insert(timer, self.now + delay);
    }

    fn cancel(&mut self, timer: TimerId) {
        self.due.remove(&timer);
    }
}

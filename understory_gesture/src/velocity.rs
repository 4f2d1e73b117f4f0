// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Release velocity estimation for pan and swipe.
//!
//! Impulse strategy: the velocity is derived from the kinetic energy the pointer imparted
//! over a short history window, which weights recent samples without a least-squares fit.

use core::time::Duration;

use kurbo::{Point, Vec2};

/// Ring buffer size for samples.
const HISTORY_SIZE: usize = 20;

/// Only samples within this window of the newest one are used.
const HORIZON: Duration = Duration::from_millis(100);

/// A gap this long between samples means the pointer had stopped.
pub const ASSUME_STOPPED: Duration = Duration::from_millis(40);

#[derive(Clone, Copy, Debug, Default)]
struct Sample {
    time: Duration,
    value: f64,
}

/// One-axis tracker over absolute positions.
#[derive(Clone, Debug)]
pub struct VelocityTracker1D {
    samples: [Option<Sample>; HISTORY_SIZE],
    index: usize,
}

impl Default for VelocityTracker1D {
    fn default() -> Self {
        Self::new()
    }
}

impl VelocityTracker1D {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            samples: [None; HISTORY_SIZE],
            index: 0,
        }
    }

    /// Add a position sample.
    pub fn add(&mut self, time: Duration, value: f64) {
        self.index = (self.index + 1) % HISTORY_SIZE;
        self.samples[self.index] = Some(Sample { time, value });
    }

    /// Velocity in units per second; zero without at least two recent samples.
    pub fn velocity(&self) -> f64 {
        let mut values = [0.0_f64; HISTORY_SIZE];
        let mut times = [0.0_f64; HISTORY_SIZE];
        let mut count = 0;

        let Some(newest) = self.samples[self.index] else {
            return 0.0;
        };
        let mut current = self.index;
        let mut previous = newest;
        while let Some(sample) = self.samples[current] {
            let age = newest.time.saturating_sub(sample.time);
            let gap = previous.time.abs_diff(sample.time);
            previous = sample;
            if age > HORIZON || gap > ASSUME_STOPPED {
                break;
            }
            values[count] = sample.value;
            times[count] = -(age.as_secs_f64() * 1000.0);
            current = if current == 0 {
                HISTORY_SIZE - 1
            } else {
                current - 1
            };
            count += 1;
            if count >= HISTORY_SIZE {
                break;
            }
        }
        if count < 2 {
            return 0.0;
        }
        impulse_velocity(&values[..count], &times[..count]) * 1000.0
    }

    /// Drop every sample.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Per-millisecond velocity from samples ordered newest first.
fn impulse_velocity(values: &[f64], times: &[f64]) -> f64 {
    let start = values.len() - 1;
    let mut work = 0.0_f64;
    let mut next_time = times[start];
    for i in (1..=start).rev() {
        let current_time = next_time;
        next_time = times[i - 1];
        if current_time == next_time {
            continue;
        }
        let v_curr = (values[i - 1] - values[i]) / (next_time - current_time);
        let v_prev = energy_to_velocity(work);
        work += (v_curr - v_prev) * v_curr.abs();
        if i == start {
            work *= 0.5;
        }
    }
    energy_to_velocity(work)
}

/// E = ½·m·v² with m = 1.
fn energy_to_velocity(energy: f64) -> f64 {
    energy.signum() * (2.0 * energy.abs()).sqrt()
}

/// Two-axis tracker over pointer positions.
#[derive(Clone, Debug, Default)]
pub struct VelocityTracker {
    x: VelocityTracker1D,
    y: VelocityTracker1D,
}

impl VelocityTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a position sample.
    pub fn add(&mut self, time: Duration, position: Point) {
        self.x.add(time, position.x);
        self.y.add(time, position.y);
    }

    /// Velocity in pixels per second.
    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.x.velocity(), self.y.velocity())
    }

    /// Drop every sample.
    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn empty_and_single_sample_are_zero() {
        let mut t = VelocityTracker1D::new();
        assert_eq!(t.velocity(), 0.0);
        t.add(ms(0), 100.0);
        assert_eq!(t.velocity(), 0.0);
    }

    #[test]
    fn constant_motion_is_measured() {
        let mut t = VelocityTracker1D::new();
        // 100 px per 10 ms is 10 000 px/s.
        for i in 0..4_u32 {
            t.add(ms(u64::from(i) * 10), f64::from(i) * 100.0);
        }
        let v = t.velocity();
        assert!((v - 10_000.0).abs() < 1_000.0, "got {v}");
    }

    #[test]
    fn backwards_motion_is_negative() {
        let mut t = VelocityTracker1D::new();
        t.add(ms(0), 300.0);
        t.add(ms(10), 200.0);
        t.add(ms(20), 100.0);
        assert!(t.velocity() < 0.0, "expected negative velocity");
    }

    #[test]
    fn pause_before_release_reads_as_stopped() {
        let mut t = VelocityTracker1D::new();
        t.add(ms(0), 0.0);
        t.add(ms(41), 100.0);
        assert_eq!(t.velocity(), 0.0);
    }

    #[test]
    fn two_axes_track_independently() {
        let mut t = VelocityTracker::new();
        for i in 0..4_u32 {
            t.add(ms(u64::from(i) * 10), Point::new(f64::from(i) * 10.0, 0.0));
        }
        let v = t.velocity();
        assert!(v.x > 500.0, "x velocity {}", v.x);
        assert_eq!(v.y, 0.0);
        t.reset();
        assert_eq!(t.velocity(), Vec2::ZERO);
    }
}

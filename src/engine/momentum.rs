//! Momentum detection - Wheel gesture heuristic.
//!
//! Tracks consecutive wheel deltas and flags momentum scrolling the first
//! time a delta's magnitude exceeds the gesture's initiating magnitude.
//! The tuning constants are empirically chosen; they are carried as
//! configuration rather than re-derived.

use std::time::{Duration, Instant};

use crate::types::ScrollDirection;

// =============================================================================
// Tuning
// =============================================================================

/// Momentum heuristic constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumTuning {
    /// Deltas at or below this magnitude reset the gesture outright.
    pub tiny_magnitude: f64,
    /// Magnitude treated as "low" once the gesture has run long.
    pub low_magnitude: f64,
    /// Gesture length after which a low-magnitude delta resets.
    pub low_event_limit: u32,
    /// Quiet window with no wheel input that ends the gesture.
    pub quiet: Duration,
}

impl Default for MomentumTuning {
    fn default() -> Self {
        Self {
            tiny_magnitude: 2.0,
            low_magnitude: 10.0,
            low_event_limit: 10,
            quiet: Duration::from_millis(80),
        }
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Per-engine wheel gesture state.
#[derive(Debug, Clone)]
pub struct MomentumTracker {
    tuning: MomentumTuning,
    step: u32,
    first_value: f64,
    is_momentum: bool,
    deadline: Option<Instant>,
}

impl MomentumTracker {
    pub fn new(tuning: MomentumTuning) -> Self {
        Self {
            tuning,
            step: 0,
            first_value: 0.0,
            is_momentum: false,
            deadline: None,
        }
    }

    /// Whether the current gesture has been flagged as momentum scrolling.
    pub fn is_momentum(&self) -> bool {
        self.is_momentum
    }

    /// Record one wheel delta.
    ///
    /// Returns the momentum direction exactly once per gesture, the first
    /// time a delta's magnitude exceeds the initiating delta's magnitude.
    pub fn record(&mut self, delta: f64, now: Instant) -> Option<ScrollDirection> {
        self.expire(now);
        self.step += 1;
        let magnitude = delta.abs();

        let fired = if (self.step > self.tuning.low_event_limit
            && magnitude <= self.tuning.low_magnitude)
            || magnitude <= self.tuning.tiny_magnitude
        {
            self.step = 0;
            self.first_value = delta;
            self.is_momentum = false;
            None
        } else if self.step == 1 {
            // Initiating delta of a fresh gesture
            self.first_value = delta;
            None
        } else if !self.is_momentum && magnitude > self.first_value.abs() {
            self.is_momentum = true;
            Some(if delta > 0.0 {
                ScrollDirection::Forward
            } else {
                ScrollDirection::Backward
            })
        } else {
            None
        };

        self.deadline = Some(now + self.tuning.quiet);
        fired
    }

    /// Reset the gesture if the quiet window has elapsed.
    /// Returns whether a reset happened.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.step = 0;
                self.is_momentum = false;
                true
            }
            _ => false,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! # One-Pole Parameter Smoother
//!
//! When a user moves a knob, the host hands us a new value that jumps
//! instantly. Fed straight into the DSP, that step is audible: gain
//! steps click, and delay-time steps make the read head leap across the
//! buffer and pop. The smoother turns each step into a continuous
//! exponential glide.
//!
//! ## The Equation
//!
//! ```text
//! y[n] = b * x[n] + a * y[n-1]        with  b = 1 - a
//! ```
//!
//! This is a one-pole lowpass filter applied to the *control* signal
//! instead of the audio.
//!
//! ## Computing the Coefficient from a Time
//!
//! We configure the smoother with a time in milliseconds:
//!
//! ```text
//! a = e^(-2π / (time_ms * 0.001 * sample_rate))
//! ```
//!
//! After `time_ms` worth of samples a step input has covered all but
//! `e^(-2π)` (about 0.2%) of the distance to its target. Longer times
//! give slower, gentler glides.

use std::f32::consts::TAU;

/// A one-pole lowpass smoother for a single control value.
///
/// Each smoothed parameter gets its own instance so their time constants
/// stay independent.
#[derive(Debug, Clone, Copy)]
pub struct OnePoleSmoother {
    /// Feedback coefficient, in `[0, 1)`.
    a: f32,

    /// Input coefficient, always `1 - a`.
    b: f32,

    /// The running output.
    y: f32,
}

impl Default for OnePoleSmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl OnePoleSmoother {
    /// Create a smoother that passes its input straight through until
    /// [`initialize`](Self::initialize) is called.
    pub const fn new() -> Self {
        Self {
            a: 0.0,
            b: 1.0,
            y: 0.0,
        }
    }

    /// Set the smoothing time for `sample_rate` and reset the output to 0.
    ///
    /// Both arguments must be positive.
    pub fn initialize(&mut self, time_ms: f32, sample_rate: f32) {
        debug_assert!(time_ms > 0.0 && sample_rate > 0.0);

        self.a = (-TAU / (time_ms * 0.001 * sample_rate)).exp();
        self.b = 1.0 - self.a;
        self.y = 0.0;
    }

    /// Advance one sample towards `target` and return the new output.
    #[inline]
    pub fn step(&mut self, target: f32) -> f32 {
        self.y = self.b * target + self.a * self.y;
        self.y
    }

    /// Jump the output to `value` without gliding.
    pub fn snap(&mut self, value: f32) {
        self.y = value;
    }

    /// The current output.
    pub fn value(&self) -> f32 {
        self.y
    }

    /// The feedback coefficient `a`.
    pub fn coefficient(&self) -> f32 {
        self.a
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

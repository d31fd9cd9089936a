//! # DSP (Digital Signal Processing) Primitives
//!
//! The building blocks the stereo delay engine is made of:
//!
//! - **`delay_line`**: A power-of-two ring buffer with integer and
//!   linearly interpolated fractional reads. One per channel.
//!
//! - **`smoother`**: A one-pole lowpass applied to control values so that
//!   knob movements glide instead of stepping.

pub mod delay_line;
pub mod smoother;

/// Flush values too small to matter to exactly zero.
///
/// A feedback loop that decays towards silence eventually produces
/// subnormal floats, which are very slow on most CPUs. Anything below
/// 1e-20 (about -400 dB) is replaced with 0.0 before it is written back
/// into a delay line.
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 {
        0.0
    } else {
        x
    }
}

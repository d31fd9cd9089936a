//! # Circular Delay Line
//!
//! A delay line stores audio samples and lets you read them back after a
//! specified time delay. Both channels of the stereo delay are built from
//! one of these.
//!
//! ## Power-of-Two Sizing
//!
//! The buffer length is always rounded up to a power of two, `N = 2^k`.
//! That lets us wrap an index with a bitmask instead of a modulo:
//!
//! ```text
//! index & (N - 1)    ==    index % N      (when N is a power of two)
//! ```
//!
//! The mask is more than a speedup. Reading `d` samples behind the write
//! head means computing `write_pos - 1 - d`, which goes "below zero" on
//! every lap of the ring. We do that subtraction with `usize` wrapping
//! arithmetic: the result wraps modulo `2^64`, and because `N` divides
//! `2^64`, masking the wrapped value with `N - 1` lands on exactly the
//! slot we want.
//!
//! ## Read-Before-Write
//!
//! The engine always reads its taps *before* writing the new sample. An
//! offset of 0 therefore means "the most recently written sample", and an
//! integer offset `d` returns the value written `d + 1` writes ago:
//!
//! ```text
//! writes:   x0   x1   x2   x3   (write_pos is now 4)
//! read(0) → x3
//! read(1) → x2
//! read(3) → x0
//! ```
//!
//! ## Linear Interpolation
//!
//! Fractional offsets blend the sample at `floor(d)` with the one
//! immediately older:
//!
//! ```text
//! result = sample_k * (1 - frac) + sample_k+1 * frac
//! ```

use std::ops::{Add, Mul, Sub};

use crate::error::DelayError;

/// A value that can be stored in a [`DelayLine`].
///
/// Implemented for `f32` (what the engine uses) and `f64`.
pub trait Sample:
    Copy + PartialOrd + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self>
{
    /// Silence.
    const ZERO: Self;
    /// Unity.
    const ONE: Self;

    /// Convert an interpolation fraction into this sample type.
    fn from_f32(value: f32) -> Self;
}

impl Sample for f32 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline]
    fn from_f32(value: f32) -> Self {
        value
    }
}

impl Sample for f64 {
    const ZERO: Self = 0.0;
    const ONE: Self = 1.0;

    #[inline]
    fn from_f32(value: f32) -> Self {
        f64::from(value)
    }
}

/// Linear interpolation between `y1` (at fraction 0) and `y2` (at 1).
///
/// Fractions of 1.0 or more return `y2` exactly.
#[inline]
pub fn lerp<T: Sample>(y1: T, y2: T, fraction: T) -> T {
    if fraction >= T::ONE {
        return y2;
    }

    fraction * y2 + (T::ONE - fraction) * y1
}

/// A fixed-capacity ring buffer used as an audio delay line.
///
/// Storage is allocated once, in [`DelayLine::new`], off the audio
/// thread. `write`, `read_int`, `read_frac` and `flush` never allocate.
#[derive(Debug, Clone)]
pub struct DelayLine<T: Sample = f32> {
    /// The ring. Its length is always a power of two.
    buffer: Vec<T>,

    /// Where the next sample will be stored. Always `< buffer.len()`.
    write_pos: usize,

    /// `buffer.len() - 1`, used to wrap indices.
    wrap_mask: usize,

    /// Blend adjacent samples on fractional reads. On by default.
    interpolate: bool,
}

impl<T: Sample> DelayLine<T> {
    /// Create a delay line that holds at least `capacity` samples.
    ///
    /// The length is rounded up to the next power of two (a capacity of
    /// 0 gives a one-sample line). Must not be called on the audio
    /// thread.
    pub fn new(capacity: usize) -> Result<Self, DelayError> {
        let len = capacity
            .max(1)
            .checked_next_power_of_two()
            .ok_or(DelayError::Allocation { samples: capacity })?;

        Self::with_power_of_two_len(len)
    }

    /// Create a delay line whose length is already a power of two.
    pub fn with_power_of_two_len(len: usize) -> Result<Self, DelayError> {
        if !len.is_power_of_two() {
            return Err(DelayError::Allocation { samples: len });
        }

        // `try_reserve_exact` turns an out-of-memory condition into an
        // error we can report to the host instead of an abort.
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| DelayError::Allocation { samples: len })?;
        buffer.resize(len, T::ZERO);

        Ok(Self {
            buffer,
            write_pos: 0,
            wrap_mask: len - 1,
            interpolate: true,
        })
    }

    /// Number of slots in the ring (a power of two).
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always `false`: a line holds at least one sample.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The raw ring contents, oldest slot first in memory order (not in
    /// time order).
    pub fn as_slice(&self) -> &[T] {
        &self.buffer
    }

    /// Enable or disable linear interpolation on fractional reads.
    pub fn set_interpolate(&mut self, interpolate: bool) {
        self.interpolate = interpolate;
    }

    /// Whether fractional reads interpolate.
    pub fn interpolates(&self) -> bool {
        self.interpolate
    }

    /// Store `sample` at the write head and advance it by one slot.
    #[inline]
    pub fn write(&mut self, sample: T) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) & self.wrap_mask;
    }

    /// Read the sample written `delay + 1` writes ago.
    ///
    /// Offsets of `len()` or more wrap around the ring; callers saturate
    /// their delay to `len() - 1` before reading.
    #[inline]
    pub fn read_int(&self, delay: usize) -> T {
        let index = self.write_pos.wrapping_sub(1).wrapping_sub(delay) & self.wrap_mask;
        self.buffer[index]
    }

    /// Read at a fractional offset, interpolating between the sample at
    /// `floor(delay)` and the next older one.
    ///
    /// Negative values and NaN read at offset 0.
    #[inline]
    pub fn read_frac(&self, delay: f32) -> T {
        // `max` maps NaN to 0.0 as well.
        let delay = delay.max(0.0);
        let delay_int = delay as usize;
        let y1 = self.read_int(delay_int);

        if !self.interpolate {
            return y1;
        }

        let fraction = delay - delay_int as f32;
        let y2 = self.read_int(delay_int.wrapping_add(1));

        lerp(y1, y2, T::from_f32(fraction))
    }

    /// Zero every slot. The write position and length are preserved.
    ///
    /// Audio-safe: this only writes zeros into existing storage.
    pub fn flush(&mut self) {
        self.buffer.fill(T::ZERO);
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

//! # Stereo Delay Engine
//!
//! Two delay lines, a feedback path, and a dry/wet mixer. The engine
//! knows nothing about the host: it takes an [`EngineParameters`]
//! snapshot, turns milliseconds into sample offsets and decibels into
//! linear gains, and processes one frame at a time.
//!
//! ## Per-Sample Signal Flow
//!
//! ```text
//!            ┌──────────────── × dry ────────────────────┐
//!  xL ───────┤                                           (+)──► yL
//!            └──►(+)──► [Left Line]──┬──── × wet ────────┘
//!                 ▲                  │ ynL
//!                 └──── × feedback ──┘
//! ```
//!
//! The right channel is the mirror image. In [`DelayAlgorithm::PingPong`]
//! the two feedback sums swap lines before they are written, so an echo
//! that comes out of the left line is written back into the right one and
//! the repeats bounce from side to side.

use nih_plug::prelude::*;
use nih_plug::util::db_to_gain;

use crate::dsp::delay_line::DelayLine;
use crate::dsp::flush_denormal;
use crate::error::DelayError;

/// Longest delay the buffers are sized for, in milliseconds.
pub const MAX_DELAY_MS: f32 = 2000.0;

/// How the two delay lines are fed.
#[derive(Enum, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DelayAlgorithm {
    /// Each channel feeds its own line.
    #[default]
    #[id = "normal"]
    Normal,

    /// Each channel feeds the *other* channel's line.
    #[id = "pingpong"]
    #[name = "Ping-Pong"]
    PingPong,
}

impl TryFrom<i32> for DelayAlgorithm {
    type Error = DelayError;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::Normal),
            1 => Ok(Self::PingPong),
            other => Err(DelayError::UnsupportedAlgorithm(other)),
        }
    }
}

/// How the two delay times are derived from the parameters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Left and right times are set independently.
    #[default]
    LeftAndRight,

    /// The right time is the left time scaled by `delay_ratio`.
    LeftPlusRatio,
}

/// A resolved snapshot of everything the engine needs for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParameters {
    pub algorithm: DelayAlgorithm,
    /// Output level of the unprocessed signal, in dB.
    pub dry_level_db: f32,
    /// Output level of the delayed signal, in dB.
    pub wet_level_db: f32,
    /// Portion of the delayed signal fed back into the lines. Not
    /// clamped: 1.0 or more never decays.
    pub feedback: f32,
    pub update_mode: UpdateMode,
    pub left_delay_ms: f32,
    /// Only used in [`UpdateMode::LeftAndRight`].
    pub right_delay_ms: f32,
    /// Right/left delay ratio as a fraction. Only used in
    /// [`UpdateMode::LeftPlusRatio`], where it is clamped to `[0, 1]`.
    pub delay_ratio: f32,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            algorithm: DelayAlgorithm::Normal,
            dry_level_db: -3.0,
            wet_level_db: -3.0,
            feedback: 0.0,
            update_mode: UpdateMode::LeftAndRight,
            left_delay_ms: 0.0,
            right_delay_ms: 0.0,
            delay_ratio: 1.0,
        }
    }
}

impl EngineParameters {
    /// The dry level as a linear gain.
    pub fn dry_gain(&self) -> f32 {
        db_to_gain(self.dry_level_db)
    }

    /// The wet level as a linear gain.
    pub fn wet_gain(&self) -> f32 {
        db_to_gain(self.wet_level_db)
    }
}

/// Whether the engine has buffers to process with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineStatus {
    Unprepared,
    Prepared {
        sample_rate: f32,
        left_len: usize,
        right_len: usize,
    },
}

/// The left and right lines, which only exist once prepared.
#[derive(Debug)]
struct DelayBuffers {
    left: DelayLine<f32>,
    right: DelayLine<f32>,
    /// `len - 1`: the longest offset a read may use.
    max_offset: f32,
}

/// A stereo delay with normal and ping-pong feedback routing.
#[derive(Debug)]
pub struct StereoDelayEngine {
    /// `None` until [`create_buffers`](Self::create_buffers) succeeds.
    buffers: Option<DelayBuffers>,

    sample_rate: f32,
    samples_per_ms: f32,

    /// Buffer size used by `create_buffers`, kept for rebuilds.
    max_delay_ms: f32,

    /// Current tap offsets in (fractional) samples.
    delay_left: f32,
    delay_right: f32,

    dry_gain: f32,
    wet_gain: f32,

    /// Carried over to new lines when the buffers are rebuilt.
    interpolate: bool,

    parameters: EngineParameters,
}

impl Default for StereoDelayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoDelayEngine {
    /// Create an unprepared engine with the default parameters applied.
    pub fn new() -> Self {
        let parameters = EngineParameters::default();

        Self {
            buffers: None,
            sample_rate: 0.0,
            samples_per_ms: 0.0,
            max_delay_ms: MAX_DELAY_MS,
            delay_left: 0.0,
            delay_right: 0.0,
            dry_gain: parameters.dry_gain(),
            wet_gain: parameters.wet_gain(),
            interpolate: true,
            parameters,
        }
    }

    /// Allocate both delay lines for `max_delay_ms` at `sample_rate`.
    ///
    /// Each line holds `ceil(max_delay_ms * samples_per_ms) + 1` samples,
    /// rounded up to a power of two. Allocates: never call this on the
    /// audio thread. On failure the engine keeps its previous buffers.
    pub fn create_buffers(&mut self, sample_rate: f32, max_delay_ms: f32) -> Result<(), DelayError> {
        let samples_per_ms = sample_rate / 1000.0;
        let capacity = (max_delay_ms * samples_per_ms).ceil() as usize + 1;

        let mut left = DelayLine::new(capacity).map_err(|err| {
            nih_error!("Could not allocate the left delay line: {err}");
            err
        })?;
        let mut right = DelayLine::new(capacity).map_err(|err| {
            nih_error!("Could not allocate the right delay line: {err}");
            err
        })?;
        left.set_interpolate(self.interpolate);
        right.set_interpolate(self.interpolate);

        nih_log!(
            "Delay lines sized for {max_delay_ms} ms at {sample_rate} Hz: {} samples each",
            left.len()
        );

        self.buffers = Some(DelayBuffers {
            max_offset: (left.len() - 1) as f32,
            left,
            right,
        });
        self.sample_rate = sample_rate;
        self.samples_per_ms = samples_per_ms;
        self.max_delay_ms = max_delay_ms;
        self.update_delay_offsets();

        Ok(())
    }

    /// Prepare for `sample_rate`.
    ///
    /// At the rate the engine already runs at this only flushes the lines
    /// (audio-safe). At any other rate, or when unprepared, the lines are
    /// rebuilt from the stored maximum delay time, which allocates.
    pub fn reset(&mut self, sample_rate: f32) -> Result<(), DelayError> {
        if let Some(buffers) = self.buffers.as_mut() {
            if self.sample_rate == sample_rate {
                buffers.left.flush();
                buffers.right.flush();
                return Ok(());
            }
        }

        self.create_buffers(sample_rate, self.max_delay_ms)
    }

    /// Zero both delay lines.
    pub fn flush(&mut self) {
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.left.flush();
            buffers.right.flush();
        }
    }

    /// Enable or disable linear interpolation on both lines.
    pub fn set_interpolate(&mut self, interpolate: bool) {
        self.interpolate = interpolate;
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.left.set_interpolate(interpolate);
            buffers.right.set_interpolate(interpolate);
        }
    }

    /// Apply a parameter snapshot: gains, routing and delay offsets.
    ///
    /// Gains are only recomputed when their dB value changed. Delay
    /// offsets are not clamped here; reads saturate at the buffer end.
    pub fn apply_parameters(&mut self, parameters: EngineParameters) {
        if parameters.dry_level_db != self.parameters.dry_level_db {
            self.dry_gain = parameters.dry_gain();
        }
        if parameters.wet_level_db != self.parameters.wet_level_db {
            self.wet_gain = parameters.wet_gain();
        }

        self.parameters = parameters;
        self.update_delay_offsets();
    }

    fn update_delay_offsets(&mut self) {
        let p = &self.parameters;
        match p.update_mode {
            UpdateMode::LeftAndRight => {
                self.delay_left = p.left_delay_ms * self.samples_per_ms;
                self.delay_right = p.right_delay_ms * self.samples_per_ms;
            }
            UpdateMode::LeftPlusRatio => {
                let ratio = p.delay_ratio.clamp(0.0, 1.0);
                self.delay_left = p.left_delay_ms * self.samples_per_ms;
                self.delay_right = self.delay_left * ratio;
            }
        }
    }

    /// Process one stereo sample.
    ///
    /// Must only be called once prepared; an unprepared engine trips a
    /// debug assertion and returns silence.
    #[inline]
    pub fn process_sample(&mut self, left: f32, right: f32) -> (f32, f32) {
        let Some(buffers) = self.buffers.as_mut() else {
            nih_debug_assert_failure!("process_sample() called before prepare");
            return (0.0, 0.0);
        };

        let delayed_left = buffers
            .left
            .read_frac(self.delay_left.clamp(0.0, buffers.max_offset));
        let delayed_right = buffers
            .right
            .read_frac(self.delay_right.clamp(0.0, buffers.max_offset));

        let feedback = self.parameters.feedback;
        let feed_left = flush_denormal(left + feedback * delayed_left);
        let feed_right = flush_denormal(right + feedback * delayed_right);

        match self.parameters.algorithm {
            DelayAlgorithm::Normal => {
                buffers.left.write(feed_left);
                buffers.right.write(feed_right);
            }
            DelayAlgorithm::PingPong => {
                buffers.left.write(feed_right);
                buffers.right.write(feed_left);
            }
        }

        (
            self.dry_gain * left + self.wet_gain * delayed_left,
            self.dry_gain * right + self.wet_gain * delayed_right,
        )
    }

    /// Process one mono sample through the left line only.
    #[inline]
    pub fn process_mono(&mut self, input: f32) -> f32 {
        let Some(buffers) = self.buffers.as_mut() else {
            nih_debug_assert_failure!("process_mono() called before prepare");
            return 0.0;
        };

        let delayed = buffers
            .left
            .read_frac(self.delay_left.clamp(0.0, buffers.max_offset));
        buffers
            .left
            .write(flush_denormal(input + self.parameters.feedback * delayed));

        self.dry_gain * input + self.wet_gain * delayed
    }

    /// Process one interleaved frame.
    ///
    /// One output channel runs the mono path on input channel 0. Two or
    /// more run the stereo path on the first two slots, duplicating the
    /// left input when there is only one input channel. On error nothing
    /// is written.
    pub fn process_frame(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        in_channels: usize,
        out_channels: usize,
    ) -> Result<(), DelayError> {
        check_channels(in_channels, out_channels)?;
        if self.buffers.is_none() {
            return Err(DelayError::NotPrepared);
        }
        check_len(input, in_channels)?;
        check_len(output, out_channels)?;

        self.run_frame(input, output, in_channels, out_channels);
        Ok(())
    }

    /// Process `frames` interleaved frames from `input` into `output`.
    ///
    /// Everything is validated before the first sample is touched, so an
    /// error leaves `output` exactly as it was.
    pub fn process_block(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        in_channels: usize,
        out_channels: usize,
        frames: usize,
    ) -> Result<(), DelayError> {
        check_channels(in_channels, out_channels)?;
        if self.buffers.is_none() {
            return Err(DelayError::NotPrepared);
        }
        check_len(input, frames * in_channels)?;
        check_len(output, frames * out_channels)?;

        for (in_frame, out_frame) in input
            .chunks_exact(in_channels)
            .zip(output.chunks_exact_mut(out_channels))
            .take(frames)
        {
            self.run_frame(in_frame, out_frame, in_channels, out_channels);
        }

        Ok(())
    }

    /// The frame body, after validation.
    #[inline]
    fn run_frame(&mut self, input: &[f32], output: &mut [f32], in_channels: usize, out_channels: usize) {
        if out_channels == 1 {
            output[0] = self.process_mono(input[0]);
            return;
        }

        let left = input[0];
        let right = if in_channels > 1 { input[1] } else { left };
        let (out_left, out_right) = self.process_sample(left, right);
        output[0] = out_left;
        output[1] = out_right;
    }

    /// How many samples the output keeps ringing after the input stops.
    ///
    /// This is the time for the feedback loop to decay by 60 dB, or one
    /// delay period without feedback. `None` means it never decays.
    pub fn tail_samples(&self) -> Option<u32> {
        let feedback = self.parameters.feedback.abs();
        let delay = self.delay_left.max(self.delay_right);

        if feedback >= 1.0 {
            return None;
        }

        if feedback > 0.001 {
            // feedback^N = 0.001  →  N = log10(0.001) / log10(feedback)
            let repeats = -3.0 / feedback.log10();
            Some((repeats * delay) as u32)
        } else {
            Some(delay as u32)
        }
    }

    /// The last applied parameter snapshot.
    pub fn parameters(&self) -> EngineParameters {
        self.parameters
    }

    /// Current `(left, right)` tap offsets in samples.
    pub fn delay_offsets(&self) -> (f32, f32) {
        (self.delay_left, self.delay_right)
    }

    /// Current `(dry, wet)` linear gains.
    pub fn gains(&self) -> (f32, f32) {
        (self.dry_gain, self.wet_gain)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn status(&self) -> EngineStatus {
        match &self.buffers {
            None => EngineStatus::Unprepared,
            Some(buffers) => EngineStatus::Prepared {
                sample_rate: self.sample_rate,
                left_len: buffers.left.len(),
                right_len: buffers.right.len(),
            },
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.buffers.is_some()
    }

    /// The left delay line, once prepared.
    pub fn left_line(&self) -> Option<&DelayLine<f32>> {
        self.buffers.as_ref().map(|b| &b.left)
    }

    /// The right delay line, once prepared.
    pub fn right_line(&self) -> Option<&DelayLine<f32>> {
        self.buffers.as_ref().map(|b| &b.right)
    }
}

fn check_channels(inputs: usize, outputs: usize) -> Result<(), DelayError> {
    if inputs == 0 || outputs == 0 {
        return Err(DelayError::InvalidChannelConfig { inputs, outputs });
    }
    Ok(())
}

fn check_len(buffer: &[f32], needed: usize) -> Result<(), DelayError> {
    if buffer.len() < needed {
        return Err(DelayError::BufferTooShort {
            needed,
            actual: buffer.len(),
        });
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

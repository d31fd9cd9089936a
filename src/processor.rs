//! # Delay Processor
//!
//! The engine and the parameter bridge, wired together behind the same
//! lifecycle a host drives: `prepare` before playback, `process` for
//! every block, `reset` when the transport stops, `release` when the
//! plugin is deactivated. The nih-plug wrapper in `lib.rs` is a thin
//! adapter over this type, which keeps the whole signal path testable
//! without a host.

use nih_plug::prelude::*;

use crate::bridge::{ParameterBridge, ParameterSource};
use crate::engine::{DelayAlgorithm, StereoDelayEngine, MAX_DELAY_MS};
use crate::error::DelayError;

/// A stereo delay driven by a parameter store.
#[derive(Debug, Default)]
pub struct DelayProcessor {
    engine: StereoDelayEngine,
    bridge: ParameterBridge,
    max_block_size: usize,
}

impl DelayProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the delay lines for `sample_rate`, configure the
    /// smoothers, and apply the store's current values once.
    ///
    /// Allocates: call from the host's setup thread, never from
    /// `process`.
    pub fn prepare<S: ParameterSource + ?Sized>(
        &mut self,
        sample_rate: f32,
        max_block_size: usize,
        source: &S,
    ) -> Result<(), DelayError> {
        ParameterBridge::validate(source)?;
        self.engine.create_buffers(sample_rate, MAX_DELAY_MS)?;
        self.bridge.prepare(sample_rate);
        self.max_block_size = max_block_size;

        nih_log!("Prepared at {sample_rate} Hz with blocks of up to {max_block_size} samples");

        self.bridge.update(source, &mut self.engine)
    }

    /// Silence the delay lines. The buffers are kept for the next
    /// `prepare`.
    pub fn release(&mut self) {
        self.engine.flush();
    }

    /// Clear the delay lines at `sample_rate`; see
    /// [`StereoDelayEngine::reset`]. A new rate also retunes the
    /// smoothers.
    pub fn reset(&mut self, sample_rate: f32) -> Result<(), DelayError> {
        if sample_rate != self.engine.sample_rate() {
            self.bridge.set_sample_rate(sample_rate);
        }
        self.engine.reset(sample_rate)
    }

    /// Update the parameters and process one interleaved frame.
    #[inline]
    pub fn process_frame<S: ParameterSource + ?Sized>(
        &mut self,
        source: &S,
        input: &[f32],
        output: &mut [f32],
        in_channels: usize,
        out_channels: usize,
    ) -> Result<(), DelayError> {
        self.bridge.update(source, &mut self.engine)?;
        self.engine
            .process_frame(input, output, in_channels, out_channels)
    }

    /// Process one frame with an algorithm read earlier in the block.
    #[inline]
    pub fn process_frame_with<S: ParameterSource + ?Sized>(
        &mut self,
        source: &S,
        algorithm: DelayAlgorithm,
        input: &[f32],
        output: &mut [f32],
        in_channels: usize,
        out_channels: usize,
    ) -> Result<(), DelayError> {
        self.bridge.update_with(source, &mut self.engine, algorithm);
        self.engine
            .process_frame(input, output, in_channels, out_channels)
    }

    /// Process `frames` interleaved frames, updating the parameters
    /// before each one.
    ///
    /// Channel counts, slice lengths, the prepared state and the delay
    /// type are all checked before anything is processed, so on error
    /// nothing is written. The delay type is read once per block; a
    /// change takes effect on the next call.
    pub fn process<S: ParameterSource + ?Sized>(
        &mut self,
        source: &S,
        input: &[f32],
        output: &mut [f32],
        in_channels: usize,
        out_channels: usize,
        frames: usize,
    ) -> Result<(), DelayError> {
        if in_channels == 0 || out_channels == 0 {
            return Err(DelayError::InvalidChannelConfig {
                inputs: in_channels,
                outputs: out_channels,
            });
        }
        if !self.engine.is_prepared() {
            return Err(DelayError::NotPrepared);
        }
        for (len, needed) in [
            (input.len(), frames * in_channels),
            (output.len(), frames * out_channels),
        ] {
            if len < needed {
                return Err(DelayError::BufferTooShort { needed, actual: len });
            }
        }
        let algorithm = ParameterBridge::algorithm(source)?;
        nih_debug_assert!(frames <= self.max_block_size);

        for (in_frame, out_frame) in input
            .chunks_exact(in_channels)
            .zip(output.chunks_exact_mut(out_channels))
            .take(frames)
        {
            self.process_frame_with(
                source,
                algorithm,
                in_frame,
                out_frame,
                in_channels,
                out_channels,
            )?;
        }

        Ok(())
    }

    pub fn engine(&self) -> &StereoDelayEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut StereoDelayEngine {
        &mut self.engine
    }

    pub fn bridge_mut(&mut self) -> &mut ParameterBridge {
        &mut self.bridge
    }
}

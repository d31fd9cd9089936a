//! # Errors
//!
//! Everything that can go wrong in the delay core is a [`DelayError`].
//!
//! Errors on the audio thread are returned as `Err(...)` from the block
//! and frame entry points and never raised as panics: a plugin must keep
//! running even when the host hands it something unexpected. Errors on
//! the control thread (allocation, missing parameters) come out of
//! `prepare()`, before the host is allowed to start processing.

use thiserror::Error;

/// Errors produced by the delay engine, the parameter bridge, and the
/// processor that ties them together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelayError {
    /// The host asked us to process with zero input or output channels.
    #[error("invalid channel configuration: {inputs} input(s), {outputs} output(s)")]
    InvalidChannelConfig {
        /// Number of interleaved input channels.
        inputs: usize,
        /// Number of interleaved output channels.
        outputs: usize,
    },

    /// The raw `DELAYTYPE` value is not one of the known algorithms.
    #[error("unsupported delay algorithm index {0}")]
    UnsupportedAlgorithm(i32),

    /// An interleaved slice is shorter than `frames * channels`.
    #[error("buffer too short: needed {needed} samples, got {actual}")]
    BufferTooShort {
        /// Samples required by the frame and channel counts.
        needed: usize,
        /// Samples actually present in the slice.
        actual: usize,
    },

    /// A process call arrived before the delay buffers were created.
    #[error("delay engine used before prepare")]
    NotPrepared,

    /// Delay-line storage could not be allocated.
    #[error("failed to allocate a delay line of {samples} samples")]
    Allocation {
        /// Requested length in samples.
        samples: usize,
    },

    /// The parameter store does not expose a parameter the bridge needs.
    #[error("parameter store is missing '{0}'")]
    MissingParameter(&'static str),
}

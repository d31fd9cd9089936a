//! # Loveless Delay v2: A Stereo / Ping-Pong Delay Plugin
//!
//! A stereo delay effect built with [nih-plug](https://github.com/robbert-vdh/nih-plug),
//! exported as Audio Unit (AUv2), VST3 and CLAP from one codebase. One
//! delay time drives the left channel; the right channel runs at a
//! percentage of it, and the feedback can either stay on its own side or
//! cross over for ping-pong echoes.
//!
//! ## Signal Flow
//!
//! ```text
//!                 ┌──────────────────────────────────── × dry ──┐
//!  Left in  ──────┤                                             (+)──► Left out
//!                 └─►(+)─► [Left Line ] ──┬───────────── × wet ──┘
//!                     ▲                   │
//!                     │      × feedback ◄─┘
//!                     │          │
//!                     │ normal ──┘        ping-pong: the feedback sums
//!                     │                   swap lines before writing
//!  Right in ──────────┴─ ... mirror image through [Right Line] ...
//! ```
//!
//! ## Layout
//!
//! - [`dsp`]: the delay line and the one-pole smoother.
//! - [`engine`]: two delay lines, feedback routing and the dry/wet mix.
//! - [`bridge`]: reads the parameter store, smooths, converts units.
//! - [`processor`]: engine plus bridge behind the host lifecycle.
//! - [`params`]: the nih-plug parameter definitions.

pub mod bridge;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod params;
pub mod processor;

use std::num::NonZeroU32;
use std::sync::Arc;

use nih_plug::prelude::*;

pub use bridge::{ParameterBridge, ParameterSource};
pub use engine::{DelayAlgorithm, EngineParameters, EngineStatus, StereoDelayEngine, UpdateMode};
pub use error::DelayError;
pub use params::{DelayParams, ParamId};
pub use processor::DelayProcessor;

/// The plugin: the parameter store shared with the host, and the
/// processor that owns all audio-thread state.
///
/// Parameters are behind an `Arc` because the host, the editor and the
/// audio thread all read them. The processor is only ever touched from
/// `initialize()`, `reset()` and `process()`.
struct LovelessDelay {
    params: Arc<DelayParams>,

    processor: DelayProcessor,

    /// Set during `initialize()`.
    sample_rate: f32,

    /// Channel counts of the active layout, set during `initialize()`.
    in_channels: usize,
    out_channels: usize,
}

impl Default for LovelessDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(DelayParams::default()),
            processor: DelayProcessor::new(),
            // Placeholders until the host tells us the real configuration.
            sample_rate: 44100.0,
            in_channels: 2,
            out_channels: 2,
        }
    }
}

impl Plugin for LovelessDelay {
    const NAME: &'static str = "Loveless Stereo Delay";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The host picks the first layout that matches the track. Stereo
    // first; a mono input on a stereo track feeds both delay lines.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // The bridge updates the engine every sample, so automation should
    // land on the exact sample it was written for.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocate the delay lines and configure the smoothers.
    ///
    /// Returning `false` tells the host we can't run with this
    /// configuration, so `process()` is never reached without buffers.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;
        self.in_channels = audio_io_layout
            .main_input_channels
            .map(|c| c.get() as usize)
            .unwrap_or(2);
        self.out_channels = audio_io_layout
            .main_output_channels
            .map(|c| c.get() as usize)
            .unwrap_or(2);

        match self.processor.prepare(
            self.sample_rate,
            buffer_config.max_buffer_size as usize,
            self.params.as_ref(),
        ) {
            Ok(()) => true,
            Err(err) => {
                nih_error!("Failed to prepare the delay: {err}");
                false
            }
        }
    }

    /// Called when playback stops. Clears the delay lines so old echoes
    /// don't play on the next start.
    fn reset(&mut self) {
        // Same rate as `initialize()`, so this only flushes.
        if let Err(err) = self.processor.reset(self.sample_rate) {
            nih_debug_assert_failure!("Delay reset failed: {err}");
        }
    }

    fn deactivate(&mut self) {
        self.processor.release();
    }

    /// Per sample: gather the frame from the (non-interleaved) host
    /// buffer, let the processor update the parameters and run the
    /// engine, then write the frame back in place.
    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let in_channels = self.in_channels.min(2);
        let out_channels = self.out_channels.min(2);

        // Read once so the whole buffer runs with one routing.
        let algorithm = match ParameterBridge::algorithm(self.params.as_ref()) {
            Ok(algorithm) => algorithm,
            Err(err) => {
                nih_debug_assert_failure!("Delay processing failed: {err}");
                return ProcessStatus::Normal;
            }
        };

        for mut channel_samples in buffer.iter_samples() {
            let mut input = [0.0_f32; 2];
            for (slot, sample) in input.iter_mut().zip(channel_samples.iter_mut()) {
                *slot = *sample;
            }

            let mut output = [0.0_f32; 2];
            if let Err(err) = self.processor.process_frame_with(
                self.params.as_ref(),
                algorithm,
                &input[..in_channels],
                &mut output[..out_channels],
                in_channels,
                out_channels,
            ) {
                // Leave the rest of the buffer untouched.
                nih_debug_assert_failure!("Delay processing failed: {err}");
                break;
            }

            for (sample, value) in channel_samples.iter_mut().zip(&output[..out_channels]) {
                *sample = *value;
            }
        }

        // Keep the host calling us while the echoes ring out after the
        // input goes silent.
        match self.processor.engine().tail_samples() {
            Some(samples) => ProcessStatus::Tail(samples),
            None => ProcessStatus::KeepAlive,
        }
    }
}

impl ClapPlugin for LovelessDelay {
    const CLAP_ID: &'static str = "com.loveless-audio.loveless-delay-v2";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A stereo delay with normal and ping-pong feedback routing");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for LovelessDelay {
    // 16 ASCII bytes; must never change once released.
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssDelay__v002";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] = &[
        Vst3SubCategory::Fx,
        Vst3SubCategory::Delay,
        Vst3SubCategory::Stereo,
    ];
}

nih_export_clap!(LovelessDelay);
nih_export_vst3!(LovelessDelay);

// AUv2 entry point for Logic Pro, generated from the CLAP export.
clap_wrapper::export_auv2!();

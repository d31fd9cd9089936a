//! # Plugin Parameters
//!
//! Parameters are the knobs and selectors the user sees in the DAW. Each
//! one has:
//!
//! - A **unique string ID** (`#[id = "..."]`) that the host uses to
//!   save and recall presets. Once published, never change these IDs
//!   or existing presets will break.
//! - A **human-readable name** shown in the DAW's UI.
//! - A **range** and a **default value**.
//!
//! ## No Host-Side Smoothing
//!
//! Unlike most nih-plug plugins, none of these parameters carry a
//! smoother. The [`ParameterBridge`](crate::bridge::ParameterBridge)
//! reads the plain value of every parameter once per sample and runs
//! its own one-pole smoothers, with much longer times than a linear
//! ramp would use (1.5 s on the delay time).

use nih_plug::prelude::*;

use crate::bridge::ParameterSource;
use crate::engine::DelayAlgorithm;

/// The six parameters the delay core reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    DryLevel,
    WetLevel,
    DelayTime,
    Feedback,
    Ratio,
    DelayType,
}

impl ParamId {
    pub const ALL: [ParamId; 6] = [
        ParamId::DryLevel,
        ParamId::WetLevel,
        ParamId::DelayTime,
        ParamId::Feedback,
        ParamId::Ratio,
        ParamId::DelayType,
    ];

    /// The parameter's ID in the host's parameter store.
    pub const fn id(self) -> &'static str {
        match self {
            ParamId::DryLevel => "DRYLEVEL",
            ParamId::WetLevel => "WETLEVEL",
            ParamId::DelayTime => "DELAYTIME",
            ParamId::Feedback => "FEEDBACK",
            ParamId::Ratio => "RATIO",
            ParamId::DelayType => "DELAYTYPE",
        }
    }

    /// Default value in user-facing units (dB, ms, %, or enum index).
    pub const fn default_value(self) -> f32 {
        match self {
            ParamId::DryLevel | ParamId::WetLevel => -3.0,
            ParamId::DelayTime => 250.0,
            ParamId::Feedback | ParamId::Ratio => 50.0,
            ParamId::DelayType => 0.0,
        }
    }

    /// Smoothing time in milliseconds, or `None` for unsmoothed values.
    pub const fn smoothing_ms(self) -> Option<f32> {
        match self {
            ParamId::DryLevel | ParamId::WetLevel => Some(5.0),
            ParamId::DelayTime => Some(1500.0),
            ParamId::Ratio => Some(200.0),
            ParamId::Feedback | ParamId::DelayType => None,
        }
    }
}

/// All user-facing parameters of the stereo delay.
///
/// The `#[derive(Params)]` macro registers these with the host, handles
/// preset serialization, and makes every value readable from the audio
/// thread without locks.
#[derive(Params)]
pub struct DelayParams {
    /// **Dry Level**: loudness of the unprocessed signal.
    ///
    /// Range: -60 dB to +12 dB. Default: -3 dB.
    #[id = "DRYLEVEL"]
    pub dry_level: FloatParam,

    /// **Wet Level**: loudness of the echoes.
    ///
    /// Range: -60 dB to +12 dB. Default: -3 dB.
    #[id = "WETLEVEL"]
    pub wet_level: FloatParam,

    /// **Delay Time**: time between the input and the first echo on the
    /// left channel.
    ///
    /// Range: 0 ms to 2000 ms. Default: 250 ms.
    #[id = "DELAYTIME"]
    pub delay_time: FloatParam,

    /// **Feedback**: how much of each echo is fed back for the next one.
    ///
    /// 0% gives a single echo, 100% repeats forever at the same level.
    #[id = "FEEDBACK"]
    pub feedback: FloatParam,

    /// **Ratio**: right delay time as a percentage of the left one.
    ///
    /// At 50% the right channel echoes twice as fast as the left.
    #[id = "RATIO"]
    pub ratio: FloatParam,

    /// **Delay Type**: normal stereo or ping-pong routing.
    #[id = "DELAYTYPE"]
    pub delay_type: EnumParam<DelayAlgorithm>,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            dry_level: level_param("Dry Level", ParamId::DryLevel),
            wet_level: level_param("Wet Level", ParamId::WetLevel),

            delay_time: FloatParam::new(
                "Delay Time",
                ParamId::DelayTime.default_value(),
                FloatRange::Linear {
                    min: 0.0,
                    max: crate::engine::MAX_DELAY_MS,
                },
            )
            .with_unit(" ms")
            .with_step_size(0.01)
            .with_value_to_string(formatters::v2s_f32_rounded(1)),

            feedback: percent_param("Feedback", ParamId::Feedback),
            ratio: percent_param("Ratio", ParamId::Ratio),

            delay_type: EnumParam::new("Delay Type", DelayAlgorithm::Normal),
        }
    }
}

/// A -60..+12 dB level control.
fn level_param(name: &'static str, id: ParamId) -> FloatParam {
    FloatParam::new(
        name,
        id.default_value(),
        FloatRange::Linear {
            min: -60.0,
            max: 12.0,
        },
    )
    .with_unit(" dB")
    .with_step_size(0.01)
    .with_value_to_string(formatters::v2s_f32_rounded(2))
}

/// A 0..100 percent control.
fn percent_param(name: &'static str, id: ParamId) -> FloatParam {
    FloatParam::new(
        name,
        id.default_value(),
        FloatRange::Linear {
            min: 0.0,
            max: 100.0,
        },
    )
    .with_unit("%")
    .with_step_size(0.01)
    .with_value_to_string(formatters::v2s_f32_rounded(1))
}

impl ParameterSource for DelayParams {
    fn raw_value(&self, id: ParamId) -> Option<f32> {
        let value = match id {
            ParamId::DryLevel => self.dry_level.value(),
            ParamId::WetLevel => self.wet_level.value(),
            ParamId::DelayTime => self.delay_time.value(),
            ParamId::Feedback => self.feedback.value(),
            ParamId::Ratio => self.ratio.value(),
            ParamId::DelayType => self.delay_type.value().to_index() as f32,
        };

        Some(value)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// The host sees exactly the six parameter IDs the bridge asks for.
    #[test]
    fn test_param_ids_match() {
        let params = DelayParams::default();
        let mut ids: Vec<String> = params.param_map().into_iter().map(|(id, _, _)| id).collect();
        ids.sort();

        let mut expected: Vec<String> = ParamId::ALL.iter().map(|p| p.id().to_string()).collect();
        expected.sort();

        assert_eq!(ids, expected);
    }

    /// Fresh parameters report the documented defaults.
    #[test]
    fn test_defaults() {
        let params = DelayParams::default();

        for id in ParamId::ALL {
            let value = params.raw_value(id).unwrap();
            assert!(
                (value - id.default_value()).abs() < 1e-6,
                "{} defaulted to {value}",
                id.id()
            );
        }
        assert_eq!(params.delay_type.value(), DelayAlgorithm::Normal);
    }

    /// Only the enum and feedback go unsmoothed.
    #[test]
    fn test_smoothing_times() {
        assert_eq!(ParamId::DelayTime.smoothing_ms(), Some(1500.0));
        assert_eq!(ParamId::Ratio.smoothing_ms(), Some(200.0));
        assert_eq!(ParamId::DryLevel.smoothing_ms(), Some(5.0));
        assert_eq!(ParamId::WetLevel.smoothing_ms(), Some(5.0));
        assert_eq!(ParamId::Feedback.smoothing_ms(), None);
        assert_eq!(ParamId::DelayType.smoothing_ms(), None);
    }
}

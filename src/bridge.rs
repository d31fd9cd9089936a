//! # Parameter Bridge
//!
//! The bridge sits between the host's parameter store and the engine.
//! Once per sample it:
//!
//! 1. reads the raw value of each parameter,
//! 2. runs dry, wet, delay time and ratio through their own smoothers,
//! 3. converts percentages to fractions,
//! 4. and hands the engine a complete [`EngineParameters`] snapshot.
//!
//! The store can be written by the editor or by automation at any
//! moment, so a read may see a value that changed in the middle of a
//! block. The smoothers are what keep those steps inaudible.

use nih_plug::prelude::*;

use crate::engine::{DelayAlgorithm, EngineParameters, StereoDelayEngine, UpdateMode};
use crate::error::DelayError;
use crate::dsp::smoother::OnePoleSmoother;
use crate::params::ParamId;

/// Read-only access to raw parameter values in user-facing units.
///
/// Implementations must be lock-free: this is called on the audio
/// thread. `None` means the store has no such parameter.
pub trait ParameterSource {
    fn raw_value(&self, id: ParamId) -> Option<f32>;
}

/// Smooths and converts raw parameter values for the engine.
#[derive(Debug, Clone, Default)]
pub struct ParameterBridge {
    dry_level: OnePoleSmoother,
    wet_level: OnePoleSmoother,
    delay_time: OnePoleSmoother,
    ratio: OnePoleSmoother,
}

impl ParameterBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure every smoother for `sample_rate`. Their outputs restart
    /// from zero.
    pub fn prepare(&mut self, sample_rate: f32) {
        for (smoother, id) in self.smoothers_mut() {
            if let Some(time_ms) = id.smoothing_ms() {
                smoother.initialize(time_ms, sample_rate);
            }
        }
    }

    /// Move the smoothers to a new sample rate, keeping their current
    /// outputs so a rate change does not restart the glides.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        for (smoother, id) in self.smoothers_mut() {
            if let Some(time_ms) = id.smoothing_ms() {
                let value = smoother.value();
                smoother.initialize(time_ms, sample_rate);
                smoother.snap(value);
            }
        }
    }

    /// Jump every smoother to the store's current value, so the next
    /// updates start where the controls already are instead of gliding
    /// up from zero.
    pub fn prime<S: ParameterSource + ?Sized>(&mut self, source: &S) {
        for (smoother, id) in self.smoothers_mut() {
            smoother.snap(read(source, id));
        }
    }

    /// Check that the store has every parameter the bridge reads.
    ///
    /// Call on the control thread before processing starts.
    pub fn validate<S: ParameterSource + ?Sized>(source: &S) -> Result<(), DelayError> {
        for id in ParamId::ALL {
            if source.raw_value(id).is_none() {
                nih_error!("Parameter store has no '{}' parameter", id.id());
                return Err(DelayError::MissingParameter(id.id()));
            }
        }
        Ok(())
    }

    /// The store's delay type as an algorithm.
    pub fn algorithm<S: ParameterSource + ?Sized>(source: &S) -> Result<DelayAlgorithm, DelayError> {
        DelayAlgorithm::try_from(read(source, ParamId::DelayType) as i32)
    }

    /// Advance the smoothers by one sample and build a snapshot on top
    /// of `base`. Fields the bridge does not drive (`right_delay_ms`)
    /// keep their values from `base`.
    ///
    /// An unsupported delay type is rejected before any smoother moves.
    pub fn resolve<S: ParameterSource + ?Sized>(
        &mut self,
        source: &S,
        base: EngineParameters,
    ) -> Result<EngineParameters, DelayError> {
        let algorithm = Self::algorithm(source)?;
        Ok(self.resolve_with(source, base, algorithm))
    }

    /// Like [`resolve`](Self::resolve), with the algorithm already read
    /// for the block.
    pub fn resolve_with<S: ParameterSource + ?Sized>(
        &mut self,
        source: &S,
        base: EngineParameters,
        algorithm: DelayAlgorithm,
    ) -> EngineParameters {
        let dry_level_db = self.dry_level.step(read(source, ParamId::DryLevel));
        let wet_level_db = self.wet_level.step(read(source, ParamId::WetLevel));
        let left_delay_ms = self.delay_time.step(read(source, ParamId::DelayTime));
        let ratio_pct = self.ratio.step(read(source, ParamId::Ratio));
        let feedback_pct = read(source, ParamId::Feedback);

        EngineParameters {
            algorithm,
            dry_level_db,
            wet_level_db,
            feedback: feedback_pct / 100.0,
            // The integrated plugin exposes one delay time plus a ratio.
            update_mode: UpdateMode::LeftPlusRatio,
            left_delay_ms,
            right_delay_ms: base.right_delay_ms,
            // Clamped by the engine in LeftPlusRatio mode.
            delay_ratio: ratio_pct / 100.0,
        }
    }

    /// Resolve a snapshot from `source` and apply it to `engine`.
    ///
    /// On error the engine keeps its previous parameters.
    #[inline]
    pub fn update<S: ParameterSource + ?Sized>(
        &mut self,
        source: &S,
        engine: &mut StereoDelayEngine,
    ) -> Result<(), DelayError> {
        let parameters = self.resolve(source, engine.parameters())?;
        engine.apply_parameters(parameters);
        Ok(())
    }

    /// Like [`update`](Self::update), with the algorithm already read
    /// for the block.
    #[inline]
    pub fn update_with<S: ParameterSource + ?Sized>(
        &mut self,
        source: &S,
        engine: &mut StereoDelayEngine,
        algorithm: DelayAlgorithm,
    ) {
        let parameters = self.resolve_with(source, engine.parameters(), algorithm);
        engine.apply_parameters(parameters);
    }

    fn smoothers_mut(&mut self) -> [(&mut OnePoleSmoother, ParamId); 4] {
        [
            (&mut self.dry_level, ParamId::DryLevel),
            (&mut self.wet_level, ParamId::WetLevel),
            (&mut self.delay_time, ParamId::DelayTime),
            (&mut self.ratio, ParamId::Ratio),
        ]
    }
}

/// A parameter's raw value, falling back to its default if the store
/// lost it after validation.
#[inline]
fn read<S: ParameterSource + ?Sized>(source: &S, id: ParamId) -> f32 {
    source.raw_value(id).unwrap_or(id.default_value())
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A parameter store made of plain fields.
    struct Store {
        dry_level: f32,
        wet_level: f32,
        delay_time: f32,
        feedback: f32,
        ratio: f32,
        delay_type: f32,
        missing: Option<ParamId>,
    }

    impl Default for Store {
        fn default() -> Self {
            Self {
                dry_level: -3.0,
                wet_level: -3.0,
                delay_time: 250.0,
                feedback: 50.0,
                ratio: 50.0,
                delay_type: 0.0,
                missing: None,
            }
        }
    }

    impl ParameterSource for Store {
        fn raw_value(&self, id: ParamId) -> Option<f32> {
            if self.missing == Some(id) {
                return None;
            }
            Some(match id {
                ParamId::DryLevel => self.dry_level,
                ParamId::WetLevel => self.wet_level,
                ParamId::DelayTime => self.delay_time,
                ParamId::Feedback => self.feedback,
                ParamId::Ratio => self.ratio,
                ParamId::DelayType => self.delay_type,
            })
        }
    }

    /// Percentages become fractions and the mode is fixed to
    /// LeftPlusRatio.
    #[test]
    fn test_resolve_converts_units() {
        let mut bridge = ParameterBridge::new();
        bridge.prepare(48000.0);
        let store = Store::default();
        bridge.prime(&store);

        let base = EngineParameters {
            right_delay_ms: 123.0,
            ..EngineParameters::default()
        };
        let p = bridge.resolve(&store, base).unwrap();

        assert_eq!(p.update_mode, UpdateMode::LeftPlusRatio);
        assert_eq!(p.algorithm, DelayAlgorithm::Normal);
        assert!((p.feedback - 0.5).abs() < 1e-6);
        assert!((p.delay_ratio - 0.5).abs() < 1e-4);
        assert!((p.left_delay_ms - 250.0).abs() < 1e-3);
        assert!((p.dry_level_db + 3.0).abs() < 1e-4);
        assert!((p.wet_level_db + 3.0).abs() < 1e-4);
        assert_eq!(p.right_delay_ms, 123.0);
    }

    /// Without priming, smoothed values glide up from zero while
    /// feedback follows its control immediately.
    #[test]
    fn test_smoothers_start_from_zero() {
        let mut bridge = ParameterBridge::new();
        bridge.prepare(48000.0);
        let store = Store::default();

        let p = bridge.resolve(&store, EngineParameters::default()).unwrap();
        assert!(p.left_delay_ms > 0.0 && p.left_delay_ms < 1.0);
        assert!(p.dry_level_db < 0.0 && p.dry_level_db > -3.0);
        assert!((p.feedback - 0.5).abs() < 1e-6);

        // 5 ms at 48 kHz: after 240 samples the level is within 0.2%.
        let mut last = p;
        for _ in 1..240 {
            last = bridge.resolve(&store, EngineParameters::default()).unwrap();
        }
        assert!((last.dry_level_db + 3.0).abs() < 0.01);
    }

    /// Feedback is passed through unclamped.
    #[test]
    fn test_feedback_unclamped() {
        let mut bridge = ParameterBridge::new();
        bridge.prepare(48000.0);
        let store = Store {
            feedback: 150.0,
            ..Store::default()
        };

        let p = bridge.resolve(&store, EngineParameters::default()).unwrap();
        assert!((p.feedback - 1.5).abs() < 1e-6);
    }

    /// Ping-pong is index 1; unknown indices are an error and leave the
    /// engine untouched.
    #[test]
    fn test_delay_type() {
        let mut bridge = ParameterBridge::new();
        bridge.prepare(48000.0);
        let mut engine = StereoDelayEngine::new();

        let store = Store {
            delay_type: 1.0,
            ..Store::default()
        };
        bridge.update(&store, &mut engine).unwrap();
        assert_eq!(engine.parameters().algorithm, DelayAlgorithm::PingPong);

        let before = engine.parameters();
        let store = Store {
            delay_type: 5.0,
            ..Store::default()
        };
        assert_eq!(
            bridge.update(&store, &mut engine),
            Err(DelayError::UnsupportedAlgorithm(5))
        );
        assert_eq!(engine.parameters(), before);
    }

    /// A rejected delay type leaves the smoothers where they were.
    #[test]
    fn test_unsupported_type_does_not_step_smoothers() {
        let mut bridge = ParameterBridge::new();
        bridge.prepare(48000.0);
        let store = Store {
            delay_type: 3.0,
            ..Store::default()
        };

        assert!(bridge.resolve(&store, EngineParameters::default()).is_err());
        assert_eq!(bridge.delay_time.value(), 0.0);
        assert_eq!(bridge.dry_level.value(), 0.0);
    }

    /// A new rate recomputes the coefficients and keeps the outputs.
    #[test]
    fn test_set_sample_rate_keeps_values() {
        let mut bridge = ParameterBridge::new();
        bridge.prepare(44100.0);
        let store = Store::default();
        bridge.prime(&store);

        bridge.set_sample_rate(96000.0);

        let mut reference = OnePoleSmoother::new();
        reference.initialize(1500.0, 96000.0);
        assert_eq!(bridge.delay_time.coefficient(), reference.coefficient());
        assert_eq!(bridge.delay_time.value(), 250.0);
        assert_eq!(bridge.ratio.value(), 50.0);
        assert_eq!(bridge.dry_level.value(), -3.0);
    }

    /// A store without one of the six parameters fails validation.
    #[test]
    fn test_validate() {
        assert!(ParameterBridge::validate(&Store::default()).is_ok());

        let store = Store {
            missing: Some(ParamId::Ratio),
            ..Store::default()
        };
        assert_eq!(
            ParameterBridge::validate(&store),
            Err(DelayError::MissingParameter("RATIO"))
        );
    }

    /// The bridge pushes LeftPlusRatio offsets into the engine.
    #[test]
    fn test_update_sets_engine_offsets() {
        let mut bridge = ParameterBridge::new();
        bridge.prepare(48000.0);
        let mut engine = StereoDelayEngine::new();
        engine.create_buffers(48000.0, 2000.0).unwrap();

        let store = Store {
            delay_time: 100.0,
            ratio: 25.0,
            ..Store::default()
        };
        bridge.prime(&store);
        bridge.update(&store, &mut engine).unwrap();

        let (l, r) = engine.delay_offsets();
        assert!((l - 4800.0).abs() < 0.1, "got {l}");
        assert!((r - 1200.0).abs() < 0.1, "got {r}");
    }
}

//! Fade curve implementations for the resume volume ramp
//!
//! When playback resumes after a question the engine restarts the surface at
//! zero volume and steps it back up to the listener's volume. The shape of
//! that ramp is a [`FadeCurve`]; the default is linear.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

/// Shape of the resume ramp
///
/// All curves run from 0.0 at the start of the ramp to 1.0 at its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// g(t) = t
    #[default]
    Linear,

    /// g(t) = t², quiet for most of the ramp
    Exponential,

    /// g(t) = √t, loud early
    Logarithmic,

    /// g(t) = ½(1 − cos πt)
    SCurve,

    /// g(t) = sin(t·π/2)
    EqualPower,
}

impl FadeCurve {
    /// Every curve, in config-name order
    pub const ALL: [FadeCurve; 5] = [
        FadeCurve::Linear,
        FadeCurve::Exponential,
        FadeCurve::Logarithmic,
        FadeCurve::SCurve,
        FadeCurve::EqualPower,
    ];

    /// Gain at `position` through the ramp (clamped to `[0, 1]`)
    pub fn gain(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Volume for step `step` of a `steps`-step ramp ending at `target`
    ///
    /// Step 0 is silence, step `steps` is exactly `target`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ivq_common::FadeCurve;
    ///
    /// assert_eq!(FadeCurve::Linear.ramp_level(0, 30, 0.8), 0.0);
    /// assert_eq!(FadeCurve::Linear.ramp_level(15, 30, 0.8), 0.4);
    /// assert_eq!(FadeCurve::Linear.ramp_level(30, 30, 0.8), 0.8);
    /// ```
    pub fn ramp_level(&self, step: u32, steps: u32, target: f32) -> f32 {
        if steps == 0 || step >= steps {
            return target;
        }
        target * self.gain(step as f32 / steps as f32)
    }

    /// Name used in configuration files
    pub fn config_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// Look up a curve by config name
    ///
    /// Case-insensitive; `-` and `_` are interchangeable and may be left
    /// out, and `cosine` names the S-curve.
    pub fn from_name(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();
        if folded == "cosine" {
            return Some(FadeCurve::SCurve);
        }
        Self::ALL
            .into_iter()
            .find(|curve| curve.config_name().replace('_', "") == folded)
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.config_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_curve_spans_silence_to_full() {
        for curve in FadeCurve::ALL {
            assert!(curve.gain(0.0).abs() < 1e-6, "{} starts at {}", curve, curve.gain(0.0));
            assert!((curve.gain(1.0) - 1.0).abs() < 1e-6, "{} ends at {}", curve, curve.gain(1.0));
        }
    }

    #[test]
    fn test_linear_ramp_is_evenly_spaced() {
        let levels: Vec<f32> = (0..=30)
            .map(|step| FadeCurve::Linear.ramp_level(step, 30, 1.0))
            .collect();

        for pair in levels.windows(2) {
            assert!(((pair[1] - pair[0]) - 1.0 / 30.0).abs() < 1e-5);
        }
        assert_eq!(levels[30], 1.0);
    }

    #[test]
    fn test_ramp_rises_without_overshoot() {
        for curve in FadeCurve::ALL {
            let levels: Vec<f32> = (0..=30).map(|step| curve.ramp_level(step, 30, 0.6)).collect();
            assert!(levels.windows(2).all(|w| w[0] <= w[1]), "{} ramp dips", curve);
            assert!(levels.iter().all(|l| *l <= 0.6 + 1e-6), "{} ramp overshoots", curve);
        }
    }

    #[test]
    fn test_zero_step_ramp_jumps_to_target() {
        assert_eq!(FadeCurve::Linear.ramp_level(0, 0, 0.7), 0.7);
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(FadeCurve::from_name("cosine"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::from_name("S-Curve"), Some(FadeCurve::SCurve));
        assert_eq!(FadeCurve::from_name("EqualPower"), Some(FadeCurve::EqualPower));
        assert_eq!(FadeCurve::from_name("LINEAR"), Some(FadeCurve::Linear));
        assert_eq!(FadeCurve::from_name("wobble"), None);
        for curve in FadeCurve::ALL {
            assert_eq!(FadeCurve::from_name(&curve.to_string()), Some(curve));
        }
    }
}

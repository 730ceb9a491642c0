use serde::Serialize;

use crate::error::ScoreError;

/// Calibration temperature fixed when the scoring head was trained.
///
/// A model artifact may carry its own value; it is read once at load time and
/// never changed afterwards.
pub const DEFAULT_TEMPERATURE: f64 = 1.5;

/// Unbounded network output before calibration.
pub type RawScore = f64;

/// Calibrated aesthetic score, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct AestheticScore(f64);

impl AestheticScore {
    pub fn value(self) -> f64 {
        self.0
    }
}

/// Temperature scaling: `score = sigmoid(raw / T)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibrator {
    temperature: f64,
}

impl Calibrator {
    pub fn new(temperature: f64) -> Result<Calibrator, ScoreError> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(ScoreError::ModelLoad(format!(
                "calibration temperature must be a positive finite number, got {}",
                temperature
            )));
        }
        Ok(Calibrator { temperature })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Maps a raw score into `[0, 1]`.  Monotonic non-decreasing in `raw`.
    /// Infinities saturate; NaN maps to 0.
    pub fn calibrate(&self, raw: RawScore) -> AestheticScore {
        if raw.is_nan() {
            return AestheticScore(0.0);
        }
        AestheticScore(stable_sigmoid(raw / self.temperature).clamp(0.0, 1.0))
    }
}

impl Default for Calibrator {
    fn default() -> Self {
        Calibrator { temperature: DEFAULT_TEMPERATURE }
    }
}

// exp() only ever sees a non-positive argument, so it cannot overflow.
fn stable_sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_maps_to_one_half() {
        assert_eq!(Calibrator::default().calibrate(0.0).value(), 0.5);
    }

    #[test]
    fn temperature_softens_scores() {
        let sharp = Calibrator::new(0.5).unwrap().calibrate(1.0).value();
        let soft = Calibrator::new(4.0).unwrap().calibrate(1.0).value();
        assert!(sharp > soft);
        assert!(soft > 0.5);
        let expected = 1.0 / (1.0 + (-1.0f64 / 1.5).exp());
        assert!((Calibrator::default().calibrate(1.0).value() - expected).abs() < 1e-12);
    }

    #[test]
    fn output_stays_in_unit_interval_for_extreme_inputs() {
        let cal = Calibrator::default();
        for raw in [-1e308, -750.0, -1.0, 0.0, 1.0, 750.0, 1e308, f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            let s = cal.calibrate(raw).value();
            assert!((0.0..=1.0).contains(&s), "raw {} -> {}", raw, s);
        }
        assert_eq!(cal.calibrate(f64::INFINITY).value(), 1.0);
        assert_eq!(cal.calibrate(f64::NEG_INFINITY).value(), 0.0);
    }

    #[test]
    fn calibration_is_monotonic() {
        let cal = Calibrator::default();
        let raws: Vec<f64> = (-400..=400).map(|i| i as f64 * 0.125).collect();
        for pair in raws.windows(2) {
            assert!(cal.calibrate(pair[0]) <= cal.calibrate(pair[1]), "{:?}", pair);
        }
    }

    #[test]
    fn rejects_non_positive_temperature() {
        assert!(Calibrator::new(0.0).is_err());
        assert!(Calibrator::new(-1.0).is_err());
        assert!(Calibrator::new(f64::NAN).is_err());
    }
}

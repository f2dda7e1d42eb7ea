//! Baseline calibration
//!
//! Two calibration variants are supported and selected by configuration:
//!
//! - [`CalibrationMode::RawVertical`]: the baseline is the raw accelerometer
//!   reading and the delta is the signed difference on the vertical (Z) axis.
//! - [`CalibrationMode::GravityCompensated`]: readings have the latest
//!   gravity-sensor vector subtracted first, and the delta is the 3-axis
//!   Euclidean distance from the baseline. The delta is never negative in
//!   this mode, so it cannot report accelerating.

use sensor_source::SensorSample;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Baseline capture and delta variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMode {
    #[default]
    RawVertical,
    GravityCompensated,
}

/// Reference reading captured at calibration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Baseline {
    pub x0: f64,
    pub y0: f64,
    pub z0: f64,
}

impl Baseline {
    fn as_sample(&self) -> SensorSample {
        SensorSample::new(0, self.x0, self.y0, self.z0)
    }
}

/// Holds the session baseline and turns samples into deltas against it
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    mode: CalibrationMode,
    baseline: Option<Baseline>,
    /// Capture the next sample as the new baseline
    pending: bool,
    /// Latest gravity-sensor reading
    gravity: Option<SensorSample>,
}

impl BaselineCalibrator {
    pub fn new(mode: CalibrationMode) -> Self {
        Self {
            mode,
            baseline: None,
            pending: true,
            gravity: None,
        }
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    /// Capture `sample` as the new baseline
    pub fn calibrate(&mut self, sample: &SensorSample) -> Baseline {
        let reference = self.compensate(sample);
        let baseline = Baseline {
            x0: reference.x,
            y0: reference.y,
            z0: reference.z,
        };
        debug!(
            "Baseline captured ({:?}): [{:.3}, {:.3}, {:.3}]",
            self.mode, baseline.x0, baseline.y0, baseline.z0
        );
        self.baseline = Some(baseline);
        self.pending = false;
        baseline
    }

    /// Capture the next sample seen as the new baseline
    pub fn request_calibration(&mut self) {
        self.pending = true;
    }

    /// Whether the next sample will be captured as the baseline
    pub fn awaiting_capture(&self) -> bool {
        self.pending || self.baseline.is_none()
    }

    /// Record the latest gravity-sensor reading
    pub fn update_gravity(&mut self, sample: &SensorSample) {
        self.gravity = Some(*sample);
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.baseline
    }

    /// Delta of `sample` against the baseline; `None` before calibration
    pub fn delta(&self, sample: &SensorSample) -> Option<f64> {
        let baseline = self.baseline?;
        let delta = match self.mode {
            CalibrationMode::RawVertical => sample.z - baseline.z0,
            CalibrationMode::GravityCompensated => self
                .compensate(sample)
                .minus(&baseline.as_sample())
                .magnitude(),
        };
        Some(delta)
    }

    fn compensate(&self, sample: &SensorSample) -> SensorSample {
        match (self.mode, self.gravity.as_ref()) {
            (CalibrationMode::GravityCompensated, Some(gravity)) => sample.minus(gravity),
            _ => *sample,
        }
    }
}

impl Default for BaselineCalibrator {
    fn default() -> Self {
        Self::new(CalibrationMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uncalibrated_has_no_delta() {
        let calibrator = BaselineCalibrator::default();
        assert!(calibrator.awaiting_capture());
        assert_eq!(calibrator.delta(&SensorSample::new(0, 1.0, 2.0, 3.0)), None);
    }

    #[test]
    fn test_raw_vertical_delta_is_signed_z() {
        let mut calibrator = BaselineCalibrator::new(CalibrationMode::RawVertical);
        calibrator.calibrate(&SensorSample::new(0, 0.3, 0.1, 9.8));
        assert!(!calibrator.awaiting_capture());

        let up = calibrator.delta(&SensorSample::new(1, 5.0, 5.0, 11.0)).unwrap();
        let down = calibrator.delta(&SensorSample::new(2, 0.0, 0.0, 8.0)).unwrap();
        assert!((up - 1.2).abs() < 1e-9);
        assert!((down + 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_gravity_compensated_delta_is_euclidean() {
        let mut calibrator = BaselineCalibrator::new(CalibrationMode::GravityCompensated);
        calibrator.update_gravity(&SensorSample::new(0, 0.0, 0.0, 9.8));
        let baseline = calibrator.calibrate(&SensorSample::new(0, 0.0, 0.0, 9.8));
        assert_eq!(baseline, Baseline::default());

        let delta = calibrator
            .delta(&SensorSample::new(1, 3.0, 4.0, 9.8))
            .unwrap();
        assert!((delta - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_gravity_compensated_without_gravity_uses_raw() {
        let mut calibrator = BaselineCalibrator::new(CalibrationMode::GravityCompensated);
        let baseline = calibrator.calibrate(&SensorSample::new(0, 1.0, 2.0, 3.0));
        assert_eq!(baseline, Baseline { x0: 1.0, y0: 2.0, z0: 3.0 });
    }

    #[test]
    fn test_recalibration_request_arms_capture() {
        let mut calibrator = BaselineCalibrator::default();
        calibrator.calibrate(&SensorSample::zero(0));
        calibrator.request_calibration();
        assert!(calibrator.awaiting_capture());
        // Old baseline stays until the next capture
        assert_eq!(calibrator.baseline(), Some(Baseline::default()));
    }
}

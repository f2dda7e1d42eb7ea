//! Braking / accelerating classification

use sensor_source::SensorSample;
use tracing::debug;

use crate::config::check_threshold;
use crate::{Baseline, BaselineCalibrator, EventError, LongitudinalConfig, LongitudinalState};

/// Map a calibrated delta to a longitudinal state.
///
/// Strict comparisons: a delta exactly at the threshold is stable.
pub fn classify_delta(delta: f64, threshold: f64) -> LongitudinalState {
    if delta > threshold {
        LongitudinalState::Braking
    } else if delta < -threshold {
        LongitudinalState::Accelerating
    } else {
        LongitudinalState::Stable
    }
}

/// Longitudinal classifier.
///
/// Owns the session baseline. Each sample is classified afresh; nothing but
/// the baseline carries over between samples.
pub struct LongitudinalClassifier {
    threshold: f64,
    calibrator: BaselineCalibrator,
    state: LongitudinalState,
    last_confirmed_ms: Option<u64>,
}

impl LongitudinalClassifier {
    pub fn new(config: &LongitudinalConfig) -> Result<Self, EventError> {
        check_threshold("longitudinal.threshold", config.threshold)?;
        Ok(Self {
            threshold: config.threshold,
            calibrator: BaselineCalibrator::new(config.calibration),
            state: LongitudinalState::Stable,
            last_confirmed_ms: None,
        })
    }

    /// Classify an accelerometer sample.
    ///
    /// While a baseline capture is pending the sample becomes the baseline
    /// and the state is `Stable`.
    pub fn on_sample(&mut self, sample: &SensorSample) -> LongitudinalState {
        if self.calibrator.awaiting_capture() {
            self.calibrate(sample);
            return self.state;
        }

        let next = match self.calibrator.delta(sample) {
            Some(delta) => classify_delta(delta, self.threshold),
            None => LongitudinalState::Stable,
        };
        if next != self.state {
            debug!(
                "Longitudinal state {} -> {} at {}ms",
                self.state, next, sample.timestamp_ms
            );
        }
        self.state = next;
        self.last_confirmed_ms = Some(sample.timestamp_ms);
        self.state
    }

    /// Feed a gravity-sensor reading (used in gravity-compensated mode)
    pub fn on_gravity(&mut self, sample: &SensorSample) {
        self.calibrator.update_gravity(sample);
    }

    /// Capture `sample` as the baseline and reset to `Stable`
    pub fn calibrate(&mut self, sample: &SensorSample) -> Baseline {
        let baseline = self.calibrator.calibrate(sample);
        self.state = LongitudinalState::Stable;
        self.last_confirmed_ms = Some(sample.timestamp_ms);
        baseline
    }

    /// Recapture the baseline from the next sample; resets to `Stable`
    pub fn request_calibration(&mut self) {
        self.calibrator.request_calibration();
        self.state = LongitudinalState::Stable;
    }

    pub fn state(&self) -> LongitudinalState {
        self.state
    }

    pub fn baseline(&self) -> Option<Baseline> {
        self.calibrator.baseline()
    }

    pub fn last_confirmed_ms(&self) -> Option<u64> {
        self.last_confirmed_ms
    }
}

//! Lane drift classification
//!
//! Stateless per sample and reported immediately, with no hold time.

use sensor_source::{Axis, SensorSample};
use tracing::debug;

use crate::config::check_threshold;
use crate::{EventError, LateralConfig, LateralState};

/// Map a lateral acceleration to a drift state (strict comparison)
pub fn classify_lateral(value: f64, threshold: f64) -> LateralState {
    if value.abs() > threshold {
        LateralState::Drift
    } else {
        LateralState::Stable
    }
}

/// Lateral classifier
pub struct LateralClassifier {
    threshold: f64,
    axis: Axis,
    state: LateralState,
    last_confirmed_ms: Option<u64>,
}

impl LateralClassifier {
    pub fn new(config: &LateralConfig) -> Result<Self, EventError> {
        check_threshold("lateral.threshold", config.threshold)?;
        Ok(Self {
            threshold: config.threshold,
            axis: config.axis,
            state: LateralState::Stable,
            last_confirmed_ms: None,
        })
    }

    /// Classify an accelerometer sample on the configured axis
    pub fn on_sample(&mut self, sample: &SensorSample) -> LateralState {
        let next = classify_lateral(sample.axis(self.axis), self.threshold);
        if next != self.state {
            debug!(
                "Lateral state {} -> {} at {}ms",
                self.state, next, sample.timestamp_ms
            );
        }
        self.state = next;
        self.last_confirmed_ms = Some(sample.timestamp_ms);
        next
    }

    pub fn state(&self) -> LateralState {
        self.state
    }

    pub fn last_confirmed_ms(&self) -> Option<u64> {
        self.last_confirmed_ms
    }

    pub fn reset(&mut self) {
        self.state = LateralState::Stable;
        self.last_confirmed_ms = None;
    }
}

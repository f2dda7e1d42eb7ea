//! Classifier configuration

use sensor_source::Axis;
use serde::{Deserialize, Serialize};

use crate::{CalibrationMode, EventError};

/// Longest accepted sharp-turn hold (one day)
pub const MAX_HOLD_MS: u64 = 24 * 60 * 60 * 1000;

/// Braking / accelerating detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LongitudinalConfig {
    /// Delta magnitude beyond which braking or accelerating is reported
    pub threshold: f64,

    /// How the baseline is captured and the delta computed
    pub calibration: CalibrationMode,
}

impl Default for LongitudinalConfig {
    fn default() -> Self {
        Self {
            threshold: 1.5,
            calibration: CalibrationMode::RawVertical,
        }
    }
}

/// Sharp-turn detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AngularConfig {
    /// Rotation rate threshold (rad/s)
    pub threshold_rad_s: f64,

    /// Time a sharp turn stays reported after the last trigger (milliseconds)
    pub hold_ms: u64,

    /// Rotation axis treated as vertical
    pub axis: Axis,
}

impl Default for AngularConfig {
    fn default() -> Self {
        Self {
            threshold_rad_s: 1.5,
            hold_ms: 3000,
            axis: Axis::Z,
        }
    }
}

/// Lane drift detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LateralConfig {
    /// Lateral acceleration threshold (m/s²)
    pub threshold: f64,

    /// Axis treated as lateral
    pub axis: Axis,
}

impl Default for LateralConfig {
    fn default() -> Self {
        Self {
            threshold: 2.5,
            axis: Axis::X,
        }
    }
}

/// Configuration for all classifiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub longitudinal: LongitudinalConfig,
    pub angular: AngularConfig,
    pub lateral: LateralConfig,
}

impl EventsConfig {
    /// Create strict config (lower thresholds, longer hold)
    pub fn strict() -> Self {
        Self {
            longitudinal: LongitudinalConfig {
                threshold: 1.0,
                ..Default::default()
            },
            angular: AngularConfig {
                threshold_rad_s: 1.0,
                hold_ms: 5000,
                ..Default::default()
            },
            lateral: LateralConfig {
                threshold: 2.0,
                ..Default::default()
            },
        }
    }

    /// Create lenient config (higher thresholds, shorter hold)
    pub fn lenient() -> Self {
        Self {
            longitudinal: LongitudinalConfig {
                threshold: 2.5,
                ..Default::default()
            },
            angular: AngularConfig {
                threshold_rad_s: 2.0,
                hold_ms: 2000,
                ..Default::default()
            },
            lateral: LateralConfig {
                threshold: 3.5,
                ..Default::default()
            },
        }
    }

    /// Check every threshold is finite and non-negative and the hold is
    /// within `1..=MAX_HOLD_MS`
    pub fn validate(&self) -> Result<(), EventError> {
        check_threshold("longitudinal.threshold", self.longitudinal.threshold)?;
        check_threshold("angular.threshold_rad_s", self.angular.threshold_rad_s)?;
        check_threshold("lateral.threshold", self.lateral.threshold)?;
        check_hold(self.angular.hold_ms)
    }
}

pub(crate) fn check_threshold(field: &'static str, value: f64) -> Result<(), EventError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EventError::InvalidThreshold { field, value })
    }
}

pub(crate) fn check_hold(hold_ms: u64) -> Result<(), EventError> {
    match hold_ms {
        0 => Err(EventError::ZeroHold),
        ms if ms > MAX_HOLD_MS => Err(EventError::HoldTooLong {
            hold_ms: ms,
            max_ms: MAX_HOLD_MS,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_thresholds() {
        let config = EventsConfig::default();
        assert_eq!(config.longitudinal.threshold, 1.5);
        assert_eq!(config.angular.threshold_rad_s, 1.5);
        assert_eq!(config.angular.hold_ms, 3000);
        assert_eq!(config.angular.axis, Axis::Z);
        assert_eq!(config.lateral.threshold, 2.5);
        assert_eq!(config.lateral.axis, Axis::X);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(EventsConfig::strict().validate().is_ok());
        assert!(EventsConfig::lenient().validate().is_ok());
        assert!(EventsConfig::strict().lateral.threshold < EventsConfig::lenient().lateral.threshold);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = EventsConfig::default();
        config.lateral.threshold = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(EventError::InvalidThreshold { field: "lateral.threshold", .. })
        ));

        let mut config = EventsConfig::default();
        config.angular.hold_ms = 0;
        assert_eq!(config.validate(), Err(EventError::ZeroHold));
    }

    #[test]
    fn test_hold_upper_bound() {
        let mut config = EventsConfig::default();
        config.angular.hold_ms = MAX_HOLD_MS;
        assert!(config.validate().is_ok());

        config.angular.hold_ms = u64::MAX;
        assert_eq!(
            config.validate(),
            Err(EventError::HoldTooLong {
                hold_ms: u64::MAX,
                max_ms: MAX_HOLD_MS
            })
        );
    }
}

//! Driving Event Classification
//!
//! Per-axis signal processors turning inertial samples into driving events:
//! - Baseline calibration (raw vertical or gravity-compensated)
//! - Longitudinal events (braking / accelerating)
//! - Angular events (sharp turns, held for a fixed time after the last trigger)
//! - Lateral events (lane drift, reported immediately)

pub mod angular;
pub mod calibrator;
pub mod category;
pub mod config;
pub mod lateral;
pub mod longitudinal;
pub mod state;
pub mod timer;

pub use angular::{AngularClassifier, AngularPhase};
pub use calibrator::{Baseline, BaselineCalibrator, CalibrationMode};
pub use category::BehaviorCategory;
pub use config::{AngularConfig, EventsConfig, LateralConfig, LongitudinalConfig, MAX_HOLD_MS};
pub use lateral::LateralClassifier;
pub use longitudinal::LongitudinalClassifier;
pub use state::{AngularState, LateralState, LongitudinalState};
pub use timer::HoldTimer;

use thiserror::Error;

/// Classifier error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EventError {
    #[error("Invalid threshold for {field}: {value}")]
    InvalidThreshold { field: &'static str, value: f64 },

    #[error("Hold duration must be positive")]
    ZeroHold,

    #[error("Hold duration {hold_ms}ms exceeds the {max_ms}ms limit")]
    HoldTooLong { hold_ms: u64, max_ms: u64 },
}

//! Engine output types

use context_adapter::ContextReport;
use driving_events::{AngularState, Baseline, BehaviorCategory, LateralState, LongitudinalState};
use serde::{Deserialize, Serialize};
use speed_estimator::SpeedSample;

/// Event emitted on the engine's output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrivingEvent {
    /// Braking / accelerating state changed
    Longitudinal {
        timestamp_ms: u64,
        state: LongitudinalState,
    },

    /// Sharp-turn state changed
    Angular {
        timestamp_ms: u64,
        state: AngularState,
    },

    /// Lane drift state changed
    Lateral {
        timestamp_ms: u64,
        state: LateralState,
    },

    /// Speed recomputed from a new fix
    Speed {
        timestamp_ms: u64,
        speed: SpeedSample,
        positioning_available: bool,
    },

    /// Context descriptions for the latest fix
    Context(ContextReport),
}

impl DrivingEvent {
    /// Behavior category the event belongs to
    pub fn category(&self) -> BehaviorCategory {
        match self {
            DrivingEvent::Longitudinal { .. } => BehaviorCategory::AccelerationAndBraking,
            DrivingEvent::Angular { .. } => BehaviorCategory::Cornering,
            DrivingEvent::Lateral { .. } => BehaviorCategory::LaneChanges,
            DrivingEvent::Speed { .. } => BehaviorCategory::SpeedConsistency,
            DrivingEvent::Context(_) => BehaviorCategory::Environment,
        }
    }
}

/// Latest value of every output
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EngineSnapshot {
    pub longitudinal: LongitudinalState,
    pub angular: AngularState,
    pub lateral: LateralState,
    pub speed: SpeedSample,
    pub baseline: Option<Baseline>,
}

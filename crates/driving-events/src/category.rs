//! Monitored behavior categories
//!
//! Static table for navigation layers listing what the monitor covers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorCategory {
    AccelerationAndBraking,
    SpeedConsistency,
    Cornering,
    LaneChanges,
    Environment,
}

impl BehaviorCategory {
    /// All categories in display order
    pub const ALL: [BehaviorCategory; 5] = [
        BehaviorCategory::AccelerationAndBraking,
        BehaviorCategory::SpeedConsistency,
        BehaviorCategory::Cornering,
        BehaviorCategory::LaneChanges,
        BehaviorCategory::Environment,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            BehaviorCategory::AccelerationAndBraking => "Acceleration and Braking Patterns",
            BehaviorCategory::SpeedConsistency => "Speed Consistency",
            BehaviorCategory::Cornering => "Cornering Behavior",
            BehaviorCategory::LaneChanges => "Lane Changes and Drifts",
            BehaviorCategory::Environment => "Environmental & Contextual Metrics",
        }
    }
}

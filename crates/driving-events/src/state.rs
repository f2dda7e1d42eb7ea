//! Event states reported by each classifier

use serde::{Deserialize, Serialize};
use std::fmt;

/// Longitudinal (braking / accelerating) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LongitudinalState {
    #[default]
    Stable,
    Braking,
    Accelerating,
}

/// Angular (cornering) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AngularState {
    #[default]
    #[serde(rename = "NoSharpTurn")]
    Stable,
    SharpTurn,
}

impl AngularState {
    /// Label published on the event stream
    pub fn label(&self) -> &'static str {
        match self {
            AngularState::Stable => "NoSharpTurn",
            AngularState::SharpTurn => "SharpTurn",
        }
    }
}

/// Lateral (lane drift) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LateralState {
    #[default]
    Stable,
    Drift,
}

impl fmt::Display for LongitudinalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LongitudinalState::Stable => "Stable",
            LongitudinalState::Braking => "Braking",
            LongitudinalState::Accelerating => "Accelerating",
        };
        f.write_str(name)
    }
}

impl fmt::Display for AngularState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for LateralState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LateralState::Stable => "Stable",
            LateralState::Drift => "Drift",
        };
        f.write_str(name)
    }
}

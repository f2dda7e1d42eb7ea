//! Sample and fix types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Accelerometer (m/s²)
    LinearAcceleration,
    /// Gyroscope (rad/s)
    AngularVelocity,
    /// Gravity sensor (m/s²), used for gravity compensation
    Gravity,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::LinearAcceleration => "linear_acceleration",
            Channel::AngularVelocity => "angular_velocity",
            Channel::Gravity => "gravity",
        };
        f.write_str(name)
    }
}

/// Device axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

/// Timestamped three-axis sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSample {
    /// Timestamp (milliseconds)
    pub timestamp_ms: u64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SensorSample {
    pub fn new(timestamp_ms: u64, x: f64, y: f64, z: f64) -> Self {
        Self { timestamp_ms, x, y, z }
    }

    /// All-zero reading, standing in for an unavailable sensor
    pub fn zero(timestamp_ms: u64) -> Self {
        Self::new(timestamp_ms, 0.0, 0.0, 0.0)
    }

    /// Value on one axis
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Component-wise difference, keeping this sample's timestamp
    pub fn minus(&self, other: &SensorSample) -> SensorSample {
        SensorSample::new(
            self.timestamp_ms,
            self.x - other.x,
            self.y - other.y,
            self.z - other.z,
        )
    }

    /// Euclidean norm of the vector
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Single positioning reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Timestamp (milliseconds)
    pub timestamp_ms: u64,
    /// Latitude (degrees)
    pub latitude: f64,
    /// Longitude (degrees)
    pub longitude: f64,
    /// Horizontal accuracy (meters)
    pub accuracy_m: f64,
}

impl PositionFix {
    pub fn new(timestamp_ms: u64, latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            timestamp_ms,
            latitude,
            longitude,
            accuracy_m,
        }
    }
}

/// Positioning preconditions, both external to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionAvailability {
    pub provider_enabled: bool,
    pub permission_granted: bool,
}

impl PositionAvailability {
    /// Provider on and permission granted
    pub const AVAILABLE: Self = Self {
        provider_enabled: true,
        permission_granted: true,
    };

    pub fn is_available(&self) -> bool {
        self.provider_enabled && self.permission_granted
    }
}

//! Newline-delimited JSON replay records

use std::sync::Arc;

use behavior_engine::EngineHandle;
use sensor_source::{Channel, ChannelPositionSource, ChannelSampleSource, PositionFix, SensorSample};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One line of a recorded session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayRecord {
    Accel(SensorSample),
    Gyro(SensorSample),
    Gravity(SensorSample),
    Fix(PositionFix),
    /// Driver asked for a new baseline
    Recalibrate { timestamp_ms: u64 },
}

impl ReplayRecord {
    /// Parse one input line; blank lines and `#` comments yield `None`
    pub fn parse_line(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(line).map(Some)
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            ReplayRecord::Accel(s) | ReplayRecord::Gyro(s) | ReplayRecord::Gravity(s) => {
                s.timestamp_ms
            }
            ReplayRecord::Fix(fix) => fix.timestamp_ms,
            ReplayRecord::Recalibrate { timestamp_ms } => *timestamp_ms,
        }
    }
}

/// In-process sources the replay publishes into
pub struct ReplaySources {
    pub samples: Arc<ChannelSampleSource>,
    pub positions: Arc<ChannelPositionSource>,
}

impl ReplaySources {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(ChannelSampleSource::new(capacity)),
            positions: Arc::new(ChannelPositionSource::new(capacity)),
        }
    }

    /// Deliver a record to the engine
    pub fn publish(&self, record: ReplayRecord, handle: &EngineHandle) {
        let delivered = match record {
            ReplayRecord::Accel(sample) => {
                self.samples.publish(Channel::LinearAcceleration, sample)
            }
            ReplayRecord::Gyro(sample) => self.samples.publish(Channel::AngularVelocity, sample),
            ReplayRecord::Gravity(sample) => self.samples.publish(Channel::Gravity, sample),
            ReplayRecord::Fix(fix) => self.positions.publish(fix),
            ReplayRecord::Recalibrate { .. } => {
                handle.recalibrate();
                return;
            }
        };
        if delivered == 0 {
            debug!("No listener for record at {}ms", record.timestamp_ms());
        }
    }
}

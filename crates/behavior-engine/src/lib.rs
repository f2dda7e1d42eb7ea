//! Driving Behavior Engine
//!
//! Wires sensor and position sources to the classifiers:
//! - One task per classifier, each the only owner of its state
//! - Sharp-turn hold timers delivered through the classifier's own queue
//! - Speed from position fixes, gated on provider and permission
//! - Optional context lookups on separate tasks
//!
//! Emits a single stream of [`DrivingEvent`]s.

mod engine;
mod event;
mod worker;

pub use engine::{BehaviorEngine, EngineHandle};
pub use event::{DrivingEvent, EngineSnapshot};

use driving_events::{EventError, EventsConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid classifier configuration: {0}")]
    InvalidConfig(#[from] EventError),

    #[error("Event buffer must hold at least one event")]
    ZeroBuffer,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Classifier thresholds and calibration mode
    pub events: EventsConfig,

    /// Capacity of the outgoing event channel
    pub event_buffer: usize,

    /// Minimum spacing between context lookups (milliseconds of fix time)
    pub context_refresh_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            events: EventsConfig::default(),
            event_buffer: 256,
            context_refresh_ms: 60_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.events.validate()?;
        if self.event_buffer == 0 {
            return Err(EngineError::ZeroBuffer);
        }
        Ok(())
    }
}

//! Sharp-turn classification with hold-time hysteresis
//!
//! A rotation rate above the threshold on the vertical axis starts (or
//! refreshes) a sharp turn. The turn stays reported until `hold_ms` has
//! passed since the last triggering sample. The timeout is driven from
//! outside through [`AngularClassifier::expire`], keyed by the trigger
//! timestamp so a stale timer cannot end a refreshed turn.

use sensor_source::{Axis, SensorSample};
use tracing::debug;

use crate::config::{check_hold, check_threshold};
use crate::{AngularConfig, AngularState, EventError};

/// Internal phase of the sharp-turn state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngularPhase {
    #[default]
    Quiet,
    SharpTurnActive {
        /// Timestamp of the most recent qualifying sample
        last_trigger_ms: u64,
    },
}

/// Angular classifier
pub struct AngularClassifier {
    threshold: f64,
    hold_ms: u64,
    axis: Axis,
    phase: AngularPhase,
    last_confirmed_ms: Option<u64>,
}

impl AngularClassifier {
    pub fn new(config: &AngularConfig) -> Result<Self, EventError> {
        check_threshold("angular.threshold_rad_s", config.threshold_rad_s)?;
        check_hold(config.hold_ms)?;
        Ok(Self {
            threshold: config.threshold_rad_s,
            hold_ms: config.hold_ms,
            axis: config.axis,
            phase: AngularPhase::Quiet,
            last_confirmed_ms: None,
        })
    }

    /// Process a gyroscope sample
    pub fn on_sample(&mut self, sample: &SensorSample) -> AngularState {
        let ts = sample.timestamp_ms;

        if sample.axis(self.axis).abs() > self.threshold {
            let last_trigger_ms = match self.phase {
                AngularPhase::SharpTurnActive { last_trigger_ms } => last_trigger_ms.max(ts),
                AngularPhase::Quiet => {
                    debug!("Sharp turn started at {}ms", ts);
                    ts
                }
            };
            self.phase = AngularPhase::SharpTurnActive { last_trigger_ms };
            self.last_confirmed_ms = Some(ts);
        } else if let AngularPhase::SharpTurnActive { last_trigger_ms } = self.phase {
            // A quiet sample past the deadline ends the turn even if the
            // timer has not been delivered yet
            if ts >= self.deadline_for(last_trigger_ms) {
                self.end_turn(ts);
            }
        }

        self.state()
    }

    /// Timer callback: end the turn if `trigger_ms` is still the last trigger.
    ///
    /// Returns whether the state changed.
    pub fn expire(&mut self, trigger_ms: u64) -> bool {
        match self.phase {
            AngularPhase::SharpTurnActive { last_trigger_ms } if last_trigger_ms == trigger_ms => {
                self.end_turn(self.deadline_for(trigger_ms));
                true
            }
            _ => false,
        }
    }

    /// End the turn if its deadline has passed by `now_ms`.
    ///
    /// Lets a caller driving time from sample timestamps close out a turn
    /// whose timer never got the chance to fire. Returns whether the state
    /// changed.
    pub fn settle(&mut self, now_ms: u64) -> bool {
        match self.phase {
            AngularPhase::SharpTurnActive { last_trigger_ms }
                if now_ms >= self.deadline_for(last_trigger_ms) =>
            {
                self.expire(last_trigger_ms)
            }
            _ => false,
        }
    }

    /// When the current turn ends absent further triggers
    pub fn deadline_ms(&self) -> Option<u64> {
        match self.phase {
            AngularPhase::SharpTurnActive { last_trigger_ms } => {
                Some(self.deadline_for(last_trigger_ms))
            }
            AngularPhase::Quiet => None,
        }
    }

    /// State as seen at `now_ms`, without mutating the classifier
    pub fn state_at(&self, now_ms: u64) -> AngularState {
        match self.deadline_ms() {
            Some(deadline) if now_ms < deadline => AngularState::SharpTurn,
            _ => AngularState::Stable,
        }
    }

    /// Current state
    pub fn state(&self) -> AngularState {
        match self.phase {
            AngularPhase::Quiet => AngularState::Stable,
            AngularPhase::SharpTurnActive { .. } => AngularState::SharpTurn,
        }
    }

    pub fn phase(&self) -> AngularPhase {
        self.phase
    }

    pub fn hold_ms(&self) -> u64 {
        self.hold_ms
    }

    pub fn last_confirmed_ms(&self) -> Option<u64> {
        self.last_confirmed_ms
    }

    /// Drop any active turn (calibration, teardown)
    pub fn reset(&mut self) {
        self.phase = AngularPhase::Quiet;
        self.last_confirmed_ms = None;
    }

    fn deadline_for(&self, trigger_ms: u64) -> u64 {
        trigger_ms.saturating_add(self.hold_ms)
    }

    fn end_turn(&mut self, at_ms: u64) {
        debug!("Sharp turn ended at {}ms", at_ms);
        self.phase = AngularPhase::Quiet;
        self.last_confirmed_ms = Some(at_ms);
    }
}

//! Fix-to-fix speed estimator

use sensor_source::{PositionAvailability, PositionFix};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::haversine_distance;

const MPS_TO_KMH: f64 = 3.6;
const MPS_TO_MPH: f64 = 2.23694;

/// Instantaneous speed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedSample {
    pub meters_per_second: f64,
}

impl SpeedSample {
    /// "No information" speed
    pub const ZERO: SpeedSample = SpeedSample {
        meters_per_second: 0.0,
    };

    pub fn km_per_hour(&self) -> f64 {
        self.meters_per_second * MPS_TO_KMH
    }

    pub fn miles_per_hour(&self) -> f64 {
        self.meters_per_second * MPS_TO_MPH
    }
}

/// Speed estimator.
///
/// Retains only the most recent fix; no smoothing or outlier rejection.
/// While positioning is unavailable the output is pinned at zero and the
/// retained fix is discarded, so the first fix after recovery reads zero
/// instead of diffing against a stale position.
#[derive(Debug, Default)]
pub struct SpeedEstimator {
    last_fix: Option<PositionFix>,
    current: SpeedSample,
    fixes_seen: u64,
}

impl SpeedEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a new fix under the given availability
    pub fn on_fix(&mut self, fix: PositionFix, availability: PositionAvailability) -> SpeedSample {
        if !availability.is_available() {
            if self.last_fix.take().is_some() {
                debug!("Positioning unavailable, discarding retained fix");
            }
            self.current = SpeedSample::ZERO;
            return self.current;
        }

        self.fixes_seen += 1;
        self.current = match self.last_fix {
            Some(previous) => speed_between(&previous, &fix),
            None => SpeedSample::ZERO,
        };
        self.last_fix = Some(fix);
        self.current
    }

    /// Latest speed under the given availability
    pub fn speed(&self, availability: PositionAvailability) -> SpeedSample {
        if availability.is_available() {
            self.current
        } else {
            SpeedSample::ZERO
        }
    }

    /// Number of fixes accepted this session
    pub fn fixes_seen(&self) -> u64 {
        self.fixes_seen
    }

    /// Forget the retained fix and speed
    pub fn reset(&mut self) {
        self.last_fix = None;
        self.current = SpeedSample::ZERO;
        self.fixes_seen = 0;
    }
}

fn speed_between(previous: &PositionFix, current: &PositionFix) -> SpeedSample {
    let elapsed_s = (current.timestamp_ms as f64 - previous.timestamp_ms as f64) / 1000.0;
    if elapsed_s <= 0.0 {
        debug!("Non-positive interval between fixes ({}s), speed 0", elapsed_s);
        return SpeedSample::ZERO;
    }

    let distance_m = haversine_distance(
        previous.latitude,
        previous.longitude,
        current.latitude,
        current.longitude,
    );
    let meters_per_second = distance_m / elapsed_s;
    if !meters_per_second.is_finite() || meters_per_second < 0.0 {
        return SpeedSample::ZERO;
    }

    SpeedSample { meters_per_second }
}

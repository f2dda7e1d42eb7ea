//! Speed Estimation
//!
//! Derives instantaneous speed as great-circle distance over elapsed time
//! between the two most recent position fixes.

pub mod estimator;
pub mod geo;

pub use estimator::{SpeedEstimator, SpeedSample};
pub use geo::{haversine_distance, EARTH_RADIUS_M};

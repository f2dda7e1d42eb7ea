//! Sensor and Position Sources
//!
//! Subscription-style access to the inputs of the driving event engine:
//! - Inertial samples per channel (linear acceleration, angular velocity, gravity)
//! - Position fixes with provider/permission availability
//! - Clocks used to timestamp samples and schedule hold timers

pub mod channel;
pub mod clock;
pub mod sample;
pub mod subscription;

pub use channel::{ChannelPositionSource, ChannelSampleSource};
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use sample::{Axis, Channel, PositionAvailability, PositionFix, SensorSample};
pub use subscription::Subscription;

use thiserror::Error;

/// Source error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Sensor channel unavailable: {0}")]
    ChannelUnavailable(Channel),

    #[error("Positioning provider disabled")]
    ProviderDisabled,

    #[error("Location permission not granted")]
    PermissionDenied,

    #[error("Source closed")]
    Closed,
}

/// Provider of timestamped inertial samples.
///
/// Each call to [`SampleSource::subscribe`] registers a new listener; the
/// registration is released when the returned [`Subscription`] is
/// unsubscribed or dropped.
pub trait SampleSource: Send + Sync {
    /// Subscribe to one sensor channel
    fn subscribe(&self, channel: Channel) -> Result<Subscription<SensorSample>, SourceError>;
}

/// Provider of position fixes
pub trait PositionSource: Send + Sync {
    /// Subscribe to position fixes
    fn subscribe(&self) -> Result<Subscription<PositionFix>, SourceError>;

    /// Whether the underlying positioning provider is switched on
    fn provider_enabled(&self) -> bool;

    /// Whether the location permission has been granted
    fn permission_granted(&self) -> bool;

    /// Current availability snapshot
    fn availability(&self) -> PositionAvailability {
        PositionAvailability {
            provider_enabled: self.provider_enabled(),
            permission_granted: self.permission_granted(),
        }
    }
}

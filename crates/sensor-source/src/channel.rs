//! In-process sources backed by broadcast channels
//!
//! Platform adapters and the replay tool push readings in through
//! `publish`; the engine consumes them through the source traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    Channel, PositionFix, PositionSource, SampleSource, SensorSample, SourceError, Subscription,
};

/// Default per-channel buffer (samples)
pub const DEFAULT_CAPACITY: usize = 256;

struct Feed<T> {
    sender: broadcast::Sender<T>,
    listeners: Arc<AtomicUsize>,
}

impl<T: Clone> Feed<T> {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            listeners: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn subscribe(&self, label: String) -> Subscription<T> {
        Subscription::new(self.sender.subscribe(), self.listeners.clone(), label)
    }

    fn publish(&self, item: T) -> usize {
        self.sender.send(item).unwrap_or(0)
    }

    fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }
}

/// Inertial sample source fed in-process
pub struct ChannelSampleSource {
    feeds: HashMap<Channel, Feed<SensorSample>>,
}

impl ChannelSampleSource {
    /// Create a source offering all three channels
    pub fn new(capacity: usize) -> Self {
        Self::with_channels(
            &[
                Channel::LinearAcceleration,
                Channel::AngularVelocity,
                Channel::Gravity,
            ],
            capacity,
        )
    }

    /// Create a source offering only the given channels; the rest report
    /// [`SourceError::ChannelUnavailable`] on subscribe.
    pub fn with_channels(channels: &[Channel], capacity: usize) -> Self {
        let feeds = channels
            .iter()
            .map(|&channel| (channel, Feed::new(capacity)))
            .collect::<HashMap<_, _>>();
        info!("Sample source created with {} channels", feeds.len());
        Self { feeds }
    }

    /// Publish a sample; returns the number of listeners it reached
    pub fn publish(&self, channel: Channel, sample: SensorSample) -> usize {
        match self.feeds.get(&channel) {
            Some(feed) => {
                let delivered = feed.publish(sample);
                if delivered == 0 {
                    debug!("No listeners on {}, sample dropped", channel);
                }
                delivered
            }
            None => {
                warn!("Publish on unavailable channel {}", channel);
                0
            }
        }
    }

    /// Number of live subscriptions on a channel
    pub fn listener_count(&self, channel: Channel) -> usize {
        self.feeds
            .get(&channel)
            .map(|feed| feed.listener_count())
            .unwrap_or(0)
    }
}

impl Default for ChannelSampleSource {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl SampleSource for ChannelSampleSource {
    fn subscribe(&self, channel: Channel) -> Result<Subscription<SensorSample>, SourceError> {
        self.feeds
            .get(&channel)
            .map(|feed| feed.subscribe(channel.to_string()))
            .ok_or(SourceError::ChannelUnavailable(channel))
    }
}

/// Position source fed in-process, with switchable availability
pub struct ChannelPositionSource {
    feed: Feed<PositionFix>,
    provider_enabled: AtomicBool,
    permission_granted: AtomicBool,
}

impl ChannelPositionSource {
    pub fn new(capacity: usize) -> Self {
        Self {
            feed: Feed::new(capacity),
            provider_enabled: AtomicBool::new(true),
            permission_granted: AtomicBool::new(true),
        }
    }

    /// Publish a fix; returns the number of listeners it reached
    pub fn publish(&self, fix: PositionFix) -> usize {
        self.feed.publish(fix)
    }

    pub fn set_provider_enabled(&self, enabled: bool) {
        info!("Positioning provider enabled: {}", enabled);
        self.provider_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn set_permission_granted(&self, granted: bool) {
        info!("Location permission granted: {}", granted);
        self.permission_granted.store(granted, Ordering::SeqCst);
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.feed.listener_count()
    }
}

impl Default for ChannelPositionSource {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl PositionSource for ChannelPositionSource {
    fn subscribe(&self) -> Result<Subscription<PositionFix>, SourceError> {
        Ok(self.feed.subscribe("position".to_string()))
    }

    fn provider_enabled(&self) -> bool {
        self.provider_enabled.load(Ordering::SeqCst)
    }

    fn permission_granted(&self) -> bool {
        self.permission_granted.load(Ordering::SeqCst)
    }
}

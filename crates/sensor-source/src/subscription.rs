//! Scoped listener registration

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Registration held by a live subscription; released on drop
struct Registration {
    listeners: Arc<AtomicUsize>,
    label: String,
}

impl Registration {
    fn new(listeners: Arc<AtomicUsize>, label: String) -> Self {
        let count = listeners.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Listener registered on {} (active: {})", label, count);
        Self { listeners, label }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let count = self.listeners.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!("Listener unregistered from {} (active: {})", self.label, count);
    }
}

/// Live stream of items from a source.
///
/// Dropping the subscription unregisters it. [`Subscription::unsubscribe`]
/// does the same eagerly and may be called any number of times.
pub struct Subscription<T> {
    receiver: Option<broadcast::Receiver<T>>,
    registration: Option<Registration>,
}

impl<T: Clone> Subscription<T> {
    pub(crate) fn new(
        receiver: broadcast::Receiver<T>,
        listeners: Arc<AtomicUsize>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            receiver: Some(receiver),
            registration: Some(Registration::new(listeners, label.into())),
        }
    }

    /// Receive the next item, or `None` once unsubscribed or the source closes.
    ///
    /// Items the consumer was too slow to read are skipped, so a lagging
    /// consumer sees the most recent readings rather than a backlog.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(item) => return Some(item),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagging, skipped {} items", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.unsubscribe();
                    return None;
                }
            }
        }
    }
}

impl<T> Subscription<T> {
    /// Release the registration
    pub fn unsubscribe(&mut self) {
        self.receiver = None;
        self.registration = None;
    }

    /// Whether the subscription is still registered
    pub fn is_active(&self) -> bool {
        self.registration.is_some()
    }
}

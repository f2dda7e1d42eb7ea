//! Cancellable one-shot timer delivering a message to a worker queue

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// One-shot timer; re-arming cancels the previous schedule.
///
/// The timer is cancelled when dropped, so a torn-down worker never
/// receives a late expiry.
#[derive(Debug, Default)]
pub struct HoldTimer {
    handle: Option<JoinHandle<()>>,
}

impl HoldTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `message` on `tx` after `delay`, replacing any pending schedule.
    ///
    /// A delay too large to represent as an instant leaves the timer unarmed.
    pub fn arm<M>(&mut self, delay: Duration, tx: mpsc::Sender<M>, message: M)
    where
        M: Send + 'static,
    {
        self.cancel();
        // Deadline is fixed now, not when the task first runs
        let Some(deadline) = tokio::time::Instant::now().checked_add(delay) else {
            warn!("Timer delay {:?} out of range, not armed", delay);
            return;
        };
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(message).await;
        }));
    }

    /// Cancel the pending schedule, if any
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Whether a schedule is pending
    pub fn is_armed(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cooperative cancellation for the strategy loop.
///
/// Clones share the same flag. Stopping is observed at the top of the next
/// iteration or while the loop sleeps, never in the middle of a broker call.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    should_stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.should_stop.load(Ordering::SeqCst)
    }

    /// Resolves once [`StopHandle::stop`] has been called.
    pub async fn stopped(&self) {
        loop {
            // Register before checking the flag so a concurrent stop is not missed
            let notified = self.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn clones_share_the_flag() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stopped());

        clone.stop();
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn stopped_resolves_immediately_when_already_stopped() {
        let handle = StopHandle::new();
        handle.stop();
        handle.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_wakes_waiter() {
        let handle = StopHandle::new();
        let stopper = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            stopper.stop();
        });

        tokio::time::timeout(Duration::from_secs(10), handle.stopped())
            .await
            .unwrap();
    }
}

//! Shutdown coordination.

use tokio::sync::watch;

/// One-shot shutdown latch shared by the transport and its background tasks.
///
/// Unlike a broadcast, a task that subscribes after the trigger still sees it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Trigger the shutdown signal. Returns `true` only for the first call.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|triggered| !std::mem::replace(triggered, true))
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal has been triggered.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot fail.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_is_at_most_once() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        assert!(shutdown.trigger());
        assert!(!shutdown.trigger());
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn late_waiter_observes_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait())
            .await
            .expect("wait should resolve after trigger");
    }
}

//! Cooperative cancellation
//!
//! A [`CancellationToken`] fans out to any number of receivers over a
//! watch channel. Long-running operations race their work against
//! [`CancellationReceiver::cancelled`] and return
//! [`crate::error::TransportError::Cancelled`] at the next suspension
//! point after the token trips.

use std::sync::Arc;

use tokio::sync::watch;

/// The sending half; clone freely and trip once.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancellationToken {
    /// Creates an untripped token.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Trips the token. Idempotent; all receivers wake.
    pub fn cancel(&self) {
        // Receivers may all be gone already; that is fine.
        let _ = self.sender.send(true);
    }

    /// Returns true once tripped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Creates a receiver observing this token.
    #[must_use]
    pub fn subscribe(&self) -> CancellationReceiver {
        CancellationReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// The receiving half, held by workers.
#[derive(Debug, Clone)]
pub struct CancellationReceiver {
    receiver: watch::Receiver<bool>,
}

impl CancellationReceiver {
    /// Resolves once the token trips. If every token handle is dropped
    /// without cancelling, this pends forever, which is exactly what a
    /// `select!` against real work wants.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.receiver.borrow() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Returns true once tripped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancel_wakes_receiver() {
        let token = CancellationToken::new();
        let mut receiver = token.subscribe();
        assert!(!receiver.is_cancelled());

        token.cancel();
        // Must resolve promptly.
        tokio::time::timeout(Duration::from_secs(1), receiver.cancelled())
            .await
            .expect("receiver wakes");
        assert!(receiver.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_uncancelled_receiver_pends() {
        let token = CancellationToken::new();
        let mut receiver = token.subscribe();

        let raced = tokio::select! {
            () = receiver.cancelled() => "cancelled",
            () = tokio::time::sleep(Duration::from_millis(20)) => "work",
        };
        assert_eq!(raced, "work");
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let mut receiver = token.subscribe();
        receiver.cancelled().await;
    }
}

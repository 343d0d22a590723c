//! # Worker slots.
//!
//! A [`Worker`] is one concurrency slot of a service. Its id is assigned at
//! service construction (1-based) and never changes. The slot carries a
//! one-shot stop signal; task invocations observe it through [`Notify`].
//!
//! The signal is sticky: once fired it stays fired, so a re-queued worker's
//! [`Notify`] can be handed to any number of invocations, and an invocation
//! that starts waiting after the stop was sent still sees it.

use tokio_util::sync::CancellationToken;

/// Receive-only side of a worker's stop signal, handed to each task invocation.
#[derive(Clone, Debug)]
pub struct Notify {
    id: usize,
    token: CancellationToken,
}

impl Notify {
    /// Id of the worker slot running this invocation (>= 1).
    pub fn id(&self) -> usize {
        self.id
    }

    /// Resolves with the worker id once the service asked this slot to stop.
    pub async fn notified(&self) -> usize {
        self.token.cancelled().await;
        self.id
    }

    /// True once stop was signalled.
    pub fn is_notified(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug)]
pub(crate) struct Worker {
    id: usize,
    token: CancellationToken,
}

impl Worker {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn handle(&self) -> Notify {
        Notify {
            id: self.id,
            token: self.token.clone(),
        }
    }

    /// Fires the stop signal. Idempotent.
    pub(crate) fn notify(&self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn notify_is_sticky_and_carries_id() {
        let w = Worker::new(3);
        let n = w.handle();
        assert_eq!(n.id(), 3);
        assert!(!n.is_notified());

        w.notify();
        w.notify();

        // A handle taken after the signal still observes it.
        let late = w.handle();
        assert!(late.is_notified());
        let id = tokio::time::timeout(Duration::from_secs(1), late.notified())
            .await
            .unwrap();
        assert_eq!(id, 3);
        assert_eq!(n.notified().await, 3);
    }
}

//! # Token pool: bounded FIFO of idle workers.
//!
//! The pool is the only resource shared between a service's dispatch loop and
//! its in-flight invocations. A worker taken out of the pool is a permit to
//! run one invocation, so the number of tokens outside the pool equals the
//! number of invocations in flight and never exceeds the capacity.
//!
//! ```text
//!            give_back(w)                       take()
//! invocation ───────────► [ w1 w2 .. wN ] ───────────► dispatch loop
//!                               ▲
//!                        close() │ closing wins every race; queued tokens are dropped
//! ```
//!
//! The pool is split in two halves: [`TokenPool`] (shared, returns tokens,
//! closes) and [`TokenQueue`] (owned by the dispatch loop, takes tokens).

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::worker::Worker;

/// Shared half: returns tokens, closes, reports idle capacity.
pub(crate) struct TokenPool {
    tx: mpsc::Sender<Arc<Worker>>,
    closing: CancellationToken,
}

/// Dispatch-loop half: takes tokens.
pub(crate) struct TokenQueue {
    rx: mpsc::Receiver<Arc<Worker>>,
    closing: CancellationToken,
}

impl TokenPool {
    /// Builds a pool pre-filled with `workers`. `workers` must not be empty.
    pub(crate) fn new(workers: &[Arc<Worker>]) -> (Self, TokenQueue) {
        let (tx, rx) = mpsc::channel(workers.len().max(1));
        for w in workers {
            // Cannot fail: the channel was sized for exactly these tokens.
            let _ = tx.try_send(Arc::clone(w));
        }
        let closing = CancellationToken::new();
        let queue = TokenQueue {
            rx,
            closing: closing.clone(),
        };
        (Self { tx, closing }, queue)
    }

    /// Returns a token to the pool. The token is discarded once the pool is closed.
    ///
    /// Returns `true` if the token was re-queued.
    pub(crate) fn give_back(&self, worker: Arc<Worker>) -> bool {
        if self.closing.is_cancelled() {
            return false;
        }
        self.tx.try_send(worker).is_ok()
    }

    /// Stops all further dispatch. Idempotent.
    pub(crate) fn close(&self) {
        self.closing.cancel();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closing.is_cancelled()
    }

    /// Tokens currently idle in the pool.
    pub(crate) fn available(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

impl TokenQueue {
    /// Waits for the next idle token; `None` once the pool is closed.
    pub(crate) async fn take(&mut self) -> Option<Arc<Worker>> {
        let worker = tokio::select! {
            biased;
            _ = self.closing.cancelled() => None,
            w = self.rx.recv() => w,
        };
        // Closing may have raced with a successful recv.
        worker.filter(|_| !self.closing.is_cancelled())
    }

    /// Closes the channel and drops every token still queued.
    pub(crate) fn drain(mut self) -> usize {
        self.rx.close();
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn workers(n: usize) -> Vec<Arc<Worker>> {
        (1..=n).map(|id| Arc::new(Worker::new(id))).collect()
    }

    #[tokio::test]
    async fn take_is_fifo_and_bounded() {
        let (pool, mut queue) = TokenPool::new(&workers(2));
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.available(), 2);

        let a = queue.take().await.unwrap();
        let b = queue.take().await.unwrap();
        assert_eq!((a.id(), b.id()), (1, 2));
        assert_eq!(pool.available(), 0);

        // Empty pool blocks the taker.
        let blocked = tokio::time::timeout(Duration::from_millis(50), queue.take()).await;
        assert!(blocked.is_err());

        assert!(pool.give_back(a));
        assert_eq!(pool.available(), 1);
        assert_eq!(queue.take().await.unwrap().id(), 1);
    }

    #[tokio::test]
    async fn close_wakes_taker_and_discards_returns() {
        let ws = workers(1);
        let (pool, mut queue) = TokenPool::new(&ws);
        let held = queue.take().await.unwrap();

        let pool = Arc::new(pool);
        let closer = Arc::clone(&pool);
        let waiter = tokio::spawn(async move { queue.take().await.is_none() });
        tokio::time::sleep(Duration::from_millis(10)).await;
        closer.close();
        assert!(waiter.await.unwrap());

        assert!(pool.is_closed());
        assert!(!pool.give_back(held));
    }

    #[tokio::test]
    async fn closed_pool_never_hands_out_queued_tokens() {
        let (pool, mut queue) = TokenPool::new(&workers(3));
        pool.close();
        assert!(queue.take().await.is_none());
        assert_eq!(queue.drain(), 3);
    }
}

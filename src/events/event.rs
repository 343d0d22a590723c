//! # Runtime events emitted by the registry and its services.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Service lifecycle**: started, stopping, drained
//! - **Worker activity**: dispatched, returned, failed, panicked
//! - **Registry / process**: shutdown requested, all drained, PID file bookkeeping
//! - **Subscriber health**: overflow, panic
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! service name, worker id and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use servicevisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerPanicked)
//!     .with_service("ingest")
//!     .with_worker(2)
//!     .with_reason("index out of bounds");
//!
//! assert_eq!(ev.kind, EventKind::WorkerPanicked);
//! assert_eq!(ev.service.as_deref(), Some("ingest"));
//! assert_eq!(ev.worker, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Service lifecycle ===
    /// Service dispatch loop launched.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `reason`: `capacity=<n>`
    ServiceStarted,

    /// Service stop began: pool closed, workers being notified.
    ///
    /// Sets:
    /// - `service`: service name
    ServiceStopping,

    /// Every in-flight invocation of the service returned.
    ///
    /// Sets:
    /// - `service`: service name
    ServiceDrained,

    // === Worker activity ===
    /// A worker token was taken and a task invocation launched.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `worker`: worker id
    WorkerDispatched,

    /// A task invocation returned `Ok(())` or `Err(Canceled)`.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `worker`: worker id
    WorkerReturned,

    /// A task invocation returned an error (logged, otherwise a normal return).
    ///
    /// Sets:
    /// - `service`: service name
    /// - `worker`: worker id
    /// - `reason`: error message
    WorkerFailed,

    /// A task invocation panicked; the panic was contained.
    ///
    /// Sets:
    /// - `service`: service name
    /// - `worker`: worker id
    /// - `reason`: panic payload
    WorkerPanicked,

    // === Registry / process ===
    /// OS termination signal (or custom trigger) observed.
    ///
    /// Sets:
    /// - `reason`: signal name (`SIGINT`, `SIGTERM`, ...), absent for a custom trigger
    ShutdownRequested,

    /// OS signal handlers could not be installed; only explicit `stop` works.
    ///
    /// Sets:
    /// - `reason`: error message
    SignalUnavailable,

    /// All services drained; the registry completion signal is about to fire.
    AllDrained,

    /// PID file written.
    ///
    /// Sets:
    /// - `reason`: path
    PidFileWritten,

    /// PID file removed.
    ///
    /// Sets:
    /// - `reason`: path
    PidFileRemoved,

    /// PID file could not be written or removed (non-fatal).
    ///
    /// Sets:
    /// - `reason`: error message
    PidFileFailed,

    // === Subscriber health ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: `"full"` or `"closed"`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `service`: subscriber name
    /// - `reason`: panic payload
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the service (or subscriber), if applicable.
    pub service: Option<Arc<str>>,
    /// Worker id, if applicable.
    pub worker: Option<usize>,
    /// Human-readable reason (errors, panic payloads, paths).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            worker: None,
            reason: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a worker id.
    #[inline]
    pub fn with_worker(mut self, id: usize) -> Self {
        self.worker = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }

    /// True for events describing a misbehaving subscriber.
    #[inline]
    pub fn is_subscriber_health(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ServiceStarted);
        let b = Event::new(EventKind::ServiceStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn subscriber_helpers_set_fields() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_health());
        assert_eq!(ev.service.as_deref(), Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("full"));

        let ev = Event::new(EventKind::WorkerDispatched).with_worker(3);
        assert!(!ev.is_subscriber_health());
        assert_eq!(ev.worker, Some(3));
    }
}

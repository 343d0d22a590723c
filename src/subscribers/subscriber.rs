//! # Event sinks.
//!
//! A [`Subscribe`] implementation receives the registry's lifecycle events:
//! services starting and draining, workers being dispatched, returning,
//! failing or panicking, PID-file bookkeeping, shutdown requests.
//!
//! Every sink sits behind its own bounded queue inside the
//! [`SubscriberSet`](crate::SubscriberSet):
//!
//! ```text
//! Bus ──► SubscriberSet::emit ──► accepts()? ──► [queue] ──► on_event()
//!                                   │ no                      │ panic
//!                                   └─► skipped               └─► SubscriberPanicked
//! ```
//!
//! A sink that falls behind loses events (reported as `SubscriberOverflow`)
//! without slowing workers or the other sinks.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! use async_trait::async_trait;
//! use servicevisor::{Event, EventKind, Subscribe};
//!
//! /// Counts worker faults per process lifetime.
//! #[derive(Default)]
//! struct FaultCounter {
//!     faults: AtomicU64,
//! }
//!
//! #[async_trait]
//! impl Subscribe for FaultCounter {
//!     async fn on_event(&self, _ev: &Event) {
//!         self.faults.fetch_add(1, Ordering::Relaxed);
//!     }
//!
//!     fn accepts(&self, ev: &Event) -> bool {
//!         matches!(ev.kind, EventKind::WorkerFailed | EventKind::WorkerPanicked)
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "fault-counter"
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Sink for registry and service events.
///
/// `on_event` runs on the sink's own task, one event at a time, in publish
/// order. It should not block the executor.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Filter applied before queueing. Rejected events never take a queue slot.
    fn accepts(&self, _event: &Event) -> bool {
        true
    }

    /// Name used in `SubscriberOverflow` / `SubscriberPanicked` events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length for this sink (at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}

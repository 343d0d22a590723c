//! # Events rendered through `tracing`
//!
//! Installed by default by [`RegistryBuilder`](crate::RegistryBuilder). Any
//! `tracing` subscriber the host sets up decides where the lines go.
//!
//! | Level   | Events                                                        |
//! |---------|---------------------------------------------------------------|
//! | `debug` | `WorkerDispatched`, `WorkerReturned`                          |
//! | `info`  | service start/stop/drain, shutdown, PID file written/removed  |
//! | `warn`  | `PidFileFailed`, `SignalUnavailable`, subscriber overflow/panic |
//! | `error` | `WorkerFailed`, `WorkerPanicked`                              |

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");
        match e.kind {
            EventKind::ServiceStarted => info!(service, reason, "service started"),
            EventKind::ServiceStopping => info!(service, "service stopping"),
            EventKind::ServiceDrained => info!(service, "service drained"),
            EventKind::WorkerDispatched => debug!(service, worker = e.worker, "worker dispatched"),
            EventKind::WorkerReturned => debug!(service, worker = e.worker, "worker returned"),
            EventKind::WorkerFailed => {
                error!(service, worker = e.worker, err = reason, "task invocation failed")
            }
            EventKind::WorkerPanicked => {
                error!(service, worker = e.worker, panic = reason, "task invocation panicked")
            }
            EventKind::ShutdownRequested => info!(signal = reason, "shutdown requested"),
            EventKind::SignalUnavailable => warn!(err = reason, "signal handlers unavailable"),
            EventKind::AllDrained => info!("all services drained"),
            EventKind::PidFileWritten => info!(path = reason, "pid file written"),
            EventKind::PidFileRemoved => info!(path = reason, "pid file removed"),
            EventKind::PidFileFailed => warn!(err = reason, "pid file"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = service, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = service, panic = reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

//! # Task abstraction.
//!
//! A [`Task`] is invoked once per free worker slot of its service. Each
//! invocation receives the slot's [`Notify`] and is expected to loop until
//! that notification fires, then return.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::Notify;
use crate::error::TaskError;

/// Shared handle to a task.
pub type TaskRef = Arc<dyn Task>;

/// # Long-running, cooperatively stopped unit of work.
///
/// The runner never cancels an invocation forcibly. An implementation that
/// ignores its [`Notify`] blocks `Service::stop` and `Registry::wait` forever.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use servicevisor::{Notify, Task, TaskError};
///
/// struct Poller;
///
/// #[async_trait]
/// impl Task for Poller {
///     fn name(&self) -> &str { "poller" }
///
///     async fn run(&self, notify: Notify) -> Result<(), TaskError> {
///         loop {
///             tokio::select! {
///                 _ = notify.notified() => return Ok(()),
///                 _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => {
///                     // poll something...
///                 }
///             }
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Returns a stable, human-readable name (used as the service name).
    fn name(&self) -> &str;

    /// Runs one invocation on the worker slot identified by `notify.id()`.
    async fn run(&self, notify: Notify) -> Result<(), TaskError>;
}

//! # Service: one task function run on a fixed pool of worker slots.
//!
//! ```text
//! start() ──► dispatch loop (tracked)
//!               loop {
//!                 ├─► take token from pool     (blocks while all slots busy)
//!                 ├─► pool closed? drop token, exit  (checked under the gate)
//!                 └─► publish WorkerDispatched, spawn invocation (tracked)
//!                        ├─► task.run(notify)  inside a panic boundary
//!                        ├─► publish WorkerReturned / WorkerFailed / WorkerPanicked
//!                        └─► give token back   (discarded once stopping)
//!               }
//!
//! stop()  ──► state = Stopping
//!         ──► close pool under the gate         (loop exits, queued tokens dropped)
//!         ──► notify every worker               (not only the busy ones)
//!         ──► spawned drain: wait for loop + all invocations (TaskTracker)
//!                            state = Stopped, drained signal fires once
//!         ──► caller awaits the drained signal  (dropping it does not cancel the drain)
//! ```
//!
//! ## Rules
//! - At most `max_thread()` invocations are in flight at any time.
//! - Nothing is dispatched after the pool is closed: every `WorkerDispatched`
//!   precedes the service's `ServiceStopping`.
//! - A panicking invocation is contained; its token is recycled like any other.
//! - A stopped service cannot be started again.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::panic_message;
use super::pool::{TokenPool, TokenQueue};
use super::worker::Worker;
use crate::error::TaskError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskRef;

/// Lifecycle of a [`Service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceState {
    /// Registered, not started.
    Idle = 0,
    /// Dispatching invocations.
    Running = 1,
    /// Stop began; waiting for in-flight invocations.
    Stopping = 2,
    /// Fully drained. Terminal.
    Stopped = 3,
}

impl ServiceState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ServiceState::Idle,
            1 => ServiceState::Running,
            2 => ServiceState::Stopping,
            _ => ServiceState::Stopped,
        }
    }
}

/// Point-in-time view of a service, for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    /// Service (task) name.
    pub name: String,
    /// Lifecycle state.
    pub state: ServiceState,
    /// Declared capacity.
    pub max_thread: usize,
    /// Idle tokens in the pool.
    pub available_thread: usize,
    /// Invocations currently running.
    pub in_flight: usize,
}

/// A registered task function and its bounded pool of worker slots.
///
/// Created by [`Registry::add`](crate::Registry::add).
pub struct Service {
    name: Arc<str>,
    task: TaskRef,
    workers: Vec<Arc<Worker>>,
    pool: TokenPool,
    queue: Mutex<Option<TokenQueue>>,
    /// Serializes pool close against launching an invocation.
    gate: Mutex<()>,
    tracker: TaskTracker,
    state: AtomicU8,
    in_flight: AtomicUsize,
    drained: CancellationToken,
    bus: Bus,
}

impl Service {
    /// Capacity `0` is clamped to 1.
    pub(crate) fn new(task: TaskRef, capacity: usize, bus: Bus) -> Arc<Self> {
        let workers: Vec<Arc<Worker>> = (1..=capacity.max(1))
            .map(|id| Arc::new(Worker::new(id)))
            .collect();
        let (pool, queue) = TokenPool::new(&workers);

        Arc::new(Self {
            name: Arc::from(task.name()),
            task,
            workers,
            pool,
            queue: Mutex::new(Some(queue)),
            gate: Mutex::new(()),
            tracker: TaskTracker::new(),
            state: AtomicU8::new(ServiceState::Idle as u8),
            in_flight: AtomicUsize::new(0),
            drained: CancellationToken::new(),
            bus,
        })
    }

    /// Service name (the task's name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Idle worker tokens currently in the pool.
    pub fn available_thread(&self) -> usize {
        self.pool.available()
    }

    /// Declared capacity.
    pub fn max_thread(&self) -> usize {
        self.pool.capacity()
    }

    /// Invocations currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True between `start` and the beginning of `stop`.
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Snapshot for status reporting.
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            name: self.name.to_string(),
            state: self.state(),
            max_thread: self.max_thread(),
            available_thread: self.available_thread(),
            in_flight: self.in_flight(),
        }
    }

    /// Resolves once the service has fully drained.
    pub async fn drained(&self) {
        self.drained.cancelled().await;
    }

    /// Launches the dispatch loop and returns immediately. No-op unless idle.
    pub(crate) fn start(self: &Arc<Self>) {
        if self
            .state
            .compare_exchange(
                ServiceState::Idle as u8,
                ServiceState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }
        let Some(queue) = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        self.bus.publish(
            Event::new(EventKind::ServiceStarted)
                .with_service(Arc::clone(&self.name))
                .with_reason(format!("capacity={}", self.max_thread())),
        );
        self.tracker.spawn(Arc::clone(self).dispatch(queue));
    }

    /// Drains the service: no new dispatch, every worker notified, waits for
    /// all in-flight invocations.
    ///
    /// The drain runs on its own task, so dropping this future (a timeout, a
    /// second Ctrl-C in a `select!`) never leaves the service half-stopped.
    /// A second (or concurrent) call waits for the first drain to finish.
    /// Calling it on a service that was never started does nothing.
    pub async fn stop(self: &Arc<Self>) {
        match self.state.compare_exchange(
            ServiceState::Running as u8,
            ServiceState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                {
                    let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
                    self.pool.close();
                }
                self.bus.publish(
                    Event::new(EventKind::ServiceStopping).with_service(Arc::clone(&self.name)),
                );
                for w in &self.workers {
                    w.notify();
                }
                self.tracker.close();
                tokio::spawn(Arc::clone(self).finish_drain());
            }
            Err(s) if s == ServiceState::Idle as u8 => return,
            Err(_) => {}
        }
        self.drained.cancelled().await;
    }

    async fn finish_drain(self: Arc<Self>) {
        self.tracker.wait().await;

        self.state.store(ServiceState::Stopped as u8, Ordering::Release);
        self.bus.publish(
            Event::new(EventKind::ServiceDrained).with_service(Arc::clone(&self.name)),
        );
        self.drained.cancel();
    }

    async fn dispatch(self: Arc<Self>, mut queue: TokenQueue) {
        while let Some(worker) = queue.take().await {
            // Closing happens under the same gate: once `stop` released it,
            // no invocation can be launched.
            let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
            if self.pool.is_closed() {
                break;
            }
            self.in_flight.fetch_add(1, Ordering::AcqRel);
            self.bus.publish(
                Event::new(EventKind::WorkerDispatched)
                    .with_service(Arc::clone(&self.name))
                    .with_worker(worker.id()),
            );
            self.tracker.spawn(Arc::clone(&self).invoke(worker));
        }
        queue.drain();
    }

    async fn invoke(self: Arc<Self>, worker: Arc<Worker>) {
        let id = worker.id();
        let fut = self.task.run(worker.handle());
        let ev = match AssertUnwindSafe(fut).catch_unwind().await {
            Ok(Ok(())) | Ok(Err(TaskError::Canceled)) => Event::new(EventKind::WorkerReturned),
            Ok(Err(e)) => Event::new(EventKind::WorkerFailed).with_reason(e.to_string()),
            Err(payload) => {
                Event::new(EventKind::WorkerPanicked).with_reason(panic_message(payload.as_ref()))
            }
        };
        self.bus.publish(ev.with_service(Arc::clone(&self.name)).with_worker(id));

        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.pool.give_back(worker);
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("max_thread", &self.max_thread())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

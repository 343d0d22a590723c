//! # servicevisor
//!
//! **Servicevisor** is a process-embedded service runner for Rust.
//!
//! A host application registers long-running task functions, each bound to a
//! fixed pool of worker slots. Every free slot runs one invocation of the task;
//! all of them are brought down cleanly on an OS interrupt or an explicit stop.
//! A small [`process`] layer turns the same binary into a daemon (PID file,
//! detached re-exec, stop by signal).
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐
//!     │ Task "ingest"│   │ Task "sweep" │
//!     │  capacity 3  │   │  capacity 1  │
//!     └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Registry                                                 │
//! │  - start(): every Service, signal listener, PID file      │
//! │  - stop():  drain all Services concurrently               │
//! │  - wait():  park until everything drained                 │
//! └──────┬──────────────────┬─────────────────────────────┬───┘
//!        ▼                  ▼                             │
//! ┌──────────────┐   ┌──────────────┐                     │
//! │   Service    │   │   Service    │                     │
//! │ token pool   │   │ token pool   │                     │
//! │ [w1][w2][w3] │   │ [w1]         │                     │
//! └┬─────────────┘   └┬─────────────┘                     │
//!  │ one invocation   │                                   │
//!  │ per taken token  │                                   │
//!  ▼                  ▼                                   ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Bus (broadcast) ──► SubscriberSet ──► LogWriter, custom   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! ```text
//! Registry:  Idle ──start──► Running ──stop/signal──► Draining ──► Stopped
//! Service:   Idle ──start──► Running ──stop──► Stopping ──► Stopped
//!
//! dispatch loop {
//!   ├─► take worker token          (blocks while every slot is busy)
//!   └─► spawn task.run(notify)     (panic boundary; token returned afterwards)
//! }
//! stop: close pool ─► notify every worker ─► wait in-flight ─► drained
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types                          |
//! |-------------------|----------------------------------------------------------|------------------------------------|
//! | **Lifecycle**     | Coordinated start / graceful stop / wait                 | [`Registry`], [`RegistryBuilder`]  |
//! | **Worker pools**  | Bounded concurrency per task, panic containment          | [`Service`], [`Notify`]            |
//! | **Tasks**         | Closures or trait objects                                | [`Task`], [`TaskFn`], [`TaskRef`]  |
//! | **Events**        | Lifecycle events and pluggable sinks                     | [`Event`], [`Subscribe`]           |
//! | **Daemon mode**   | PID file, detached re-exec, stop by signal               | [`process`]                        |
//! | **Arguments**     | `command`, `--flag=value`, positional accessors          | [`Args`]                           |
//! | **Errors**        | Typed errors                                             | [`RuntimeError`], [`TaskError`], [`PidError`] |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], installed by default, which
//!   renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::time::Duration;
//! use servicevisor::{Config, Notify, Registry, TaskError, TaskFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new(Config::default());
//!     let ticks = Arc::new(AtomicU64::new(0));
//!
//!     let counter = Arc::clone(&ticks);
//!     let ticker = TaskFn::arc("ticker", move |notify: Notify| {
//!         let counter = Arc::clone(&counter);
//!         async move {
//!             loop {
//!                 tokio::select! {
//!                     _ = notify.notified() => return Ok::<_, TaskError>(()),
//!                     _ = tokio::time::sleep(Duration::from_millis(5)) => {
//!                         counter.fetch_add(1, Ordering::Relaxed);
//!                     }
//!                 }
//!             }
//!         }
//!     });
//!     let service = registry.add(ticker, 2)?;
//!
//!     registry.start()?;
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     registry.stop().await;
//!     registry.wait().await;
//!
//!     assert_eq!(service.in_flight(), 0);
//!     assert!(ticks.load(Ordering::Relaxed) > 0);
//!     Ok(())
//! }
//! ```

mod args;
mod config;
mod core;
mod error;
mod events;
pub mod process;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use args::Args;
pub use config::Config;
pub use core::{
    Notify, Registry, RegistryBuilder, RegistryState, Service, ServiceState, ServiceStats,
};
pub use error::{PidError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{Task, TaskFn, TaskRef};

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

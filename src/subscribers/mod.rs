//! # Event subscribers.
//!
//! Subscribers are the logging/observability sinks of the runtime. Every
//! [`Event`](crate::Event) published on the bus is fanned out to each
//! [`Subscribe`] implementation through a [`SubscriberSet`].
//!
//! ```text
//! Service / Registry ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                  ├──► LogWriter
//!                                                                  └──► custom sinks
//! ```

mod set;
mod subscriber;

#[cfg(feature = "logging")]
mod log;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;

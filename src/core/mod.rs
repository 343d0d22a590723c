//! Runtime core: worker pools and their coordinated lifecycle.
//!
//! The public API from this module is [`Registry`] (with its builder),
//! [`Service`], and the [`Notify`] handle given to task invocations.
//!
//! Internal modules:
//! - [`worker`]: worker slots and their stop notification;
//! - [`pool`]: the token pool bounding in-flight invocations;
//! - [`service`]: dispatch loop, panic boundary, drain;
//! - [`registry`]: coordinated start/stop/wait over all services;
//! - [`builder`]: registry construction with subscribers;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod pool;
mod registry;
mod service;
mod shutdown;
mod worker;

pub use builder::RegistryBuilder;
pub use registry::{Registry, RegistryState};
pub use service::{Service, ServiceState, ServiceStats};
pub use worker::Notify;

/// Renders a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use super::registry::Registry;
use crate::config::Config;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Registry`] with its event sinks.
pub struct RegistryBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl RegistryBuilder {
    /// Creates a new builder with the given configuration.
    ///
    /// With the `logging` feature the built-in [`LogWriter`](crate::LogWriter)
    /// is installed until [`with_subscribers`](Self::with_subscribers) replaces it.
    pub fn new(cfg: Config) -> Self {
        #[cfg(feature = "logging")]
        let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(crate::subscribers::LogWriter)];
        #[cfg(not(feature = "logging"))]
        let subscribers: Vec<Arc<dyn Subscribe>> = Vec::new();

        Self { cfg, subscribers }
    }

    /// Replaces the event subscribers (the logging sinks).
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Adds one subscriber next to the current ones.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Builds the registry and spawns the bus → subscribers forwarder.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Registry> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        // Subscribe before spawning so no early event is missed.
        let listener = tokio::spawn(forward(bus.subscribe(), subs));
        Arc::new(Registry::new_internal(self.cfg, bus, listener))
    }
}

impl Registry {
    /// Shorthand for [`RegistryBuilder::new`].
    pub fn builder(cfg: Config) -> RegistryBuilder {
        RegistryBuilder::new(cfg)
    }

    /// Builds a registry with the default subscribers.
    pub fn new(cfg: Config) -> Arc<Registry> {
        RegistryBuilder::new(cfg).build()
    }
}

/// Forwards bus events to the subscribers until `AllDrained`, then flushes them.
async fn forward(mut rx: broadcast::Receiver<Event>, subs: SubscriberSet) {
    loop {
        match rx.recv().await {
            Ok(ev) => {
                subs.emit(&ev);
                if ev.kind == EventKind::AllDrained {
                    break;
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
    subs.shutdown().await;
}

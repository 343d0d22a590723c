//! # Registry: coordinated lifecycle of every service in the process.
//!
//! The registry is an explicit value owned by the host's entry point. Several
//! independent registries may coexist (tests rely on this).
//!
//! ## State machine
//! ```text
//! Idle ──start()──► Running ──stop() / signal──► Draining ──all drained──► Stopped
//!  │                   │                                                     │
//!  └─ add() allowed    └─ add()/start() rejected                 wait() returns
//! ```
//!
//! ## Shutdown path
//! ```text
//! trigger (SIGINT/SIGTERM/SIGQUIT or custom future)
//!     └─► publish ShutdownRequested
//!     └─► Registry::stop()
//!            ├─► Service::stop() on every service, concurrently
//!            ├─► remove PID file (only if this registry wrote it)
//!            ├─► publish AllDrained, flush subscribers
//!            └─► completion signal fires ──► wait() returns
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::service::{Service, ServiceStats};
use super::shutdown;
use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::process;
use crate::tasks::TaskRef;

/// Lifecycle of a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RegistryState {
    /// Accepting `add`.
    Idle = 0,
    /// Services dispatching.
    Running = 1,
    /// Stop in progress.
    Draining = 2,
    /// Every service drained. Terminal.
    Stopped = 3,
}

impl RegistryState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RegistryState::Idle,
            1 => RegistryState::Running,
            2 => RegistryState::Draining,
            _ => RegistryState::Stopped,
        }
    }
}

/// Process-level coordinator of all services' start/stop/wait lifecycle.
pub struct Registry {
    cfg: Config,
    bus: Bus,
    services: RwLock<Vec<Arc<Service>>>,
    state: AtomicU8,
    pid_written: AtomicBool,
    /// Cancels the stop-trigger listener once stop begins by any route.
    runtime_token: CancellationToken,
    /// Registry-level completion signal.
    done: CancellationToken,
    /// Bus → subscribers forwarder; joined at the end of `stop` to flush.
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    pub(crate) fn new_internal(cfg: Config, bus: Bus, listener: JoinHandle<()>) -> Self {
        Self {
            cfg,
            bus,
            services: RwLock::new(Vec::new()),
            state: AtomicU8::new(RegistryState::Idle as u8),
            pid_written: AtomicBool::new(false),
            runtime_token: CancellationToken::new(),
            done: CancellationToken::new(),
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Registers a task to run on `capacity` worker slots.
    ///
    /// Only valid before [`start`](Self::start).
    pub fn add(&self, task: TaskRef, capacity: usize) -> Result<Arc<Service>, RuntimeError> {
        let mut services = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if self.state() != RegistryState::Idle {
            return Err(RuntimeError::AlreadyStarted {
                service: task.name().to_string(),
            });
        }
        let service = Service::new(task, capacity, self.bus.clone());
        services.push(Arc::clone(&service));
        Ok(service)
    }

    /// Starts every service and installs the OS-signal stop trigger
    /// (when [`Config::handle_signals`] is set). Returns immediately.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        if !self.cfg.handle_signals {
            return self.launch(std::future::pending());
        }
        let bus = self.bus.clone();
        self.launch(async move {
            match shutdown::stop_signal().await {
                Ok(name) => Some(name.to_string()),
                Err(e) => {
                    bus.publish(
                        Event::new(EventKind::SignalUnavailable).with_reason(e.to_string()),
                    );
                    std::future::pending().await
                }
            }
        })
    }

    /// Like [`start`](Self::start), but `trigger` replaces the OS-signal
    /// listener: when it completes, the registry stops itself.
    pub fn start_with_trigger<F>(self: &Arc<Self>, trigger: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.launch(async move {
            trigger.await;
            None
        })
    }

    /// `trigger` resolves with the `ShutdownRequested` reason, if any.
    fn launch<F>(self: &Arc<Self>, trigger: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = Option<String>> + Send + 'static,
    {
        self.state
            .compare_exchange(
                RegistryState::Idle as u8,
                RegistryState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| RuntimeError::AlreadyRunning)?;

        for service in self.services() {
            service.start();
        }
        self.spawn_stop_listener(trigger);
        self.write_pid_file();
        Ok(())
    }

    /// Drains every service concurrently and fires the completion signal.
    ///
    /// The drain runs on its own task: dropping this future does not
    /// interrupt it, and `wait()` still returns once everything drained.
    /// Concurrent callers all return after the drain finished. No-op if the
    /// registry was never started.
    pub async fn stop(self: &Arc<Self>) {
        match self.state.compare_exchange(
            RegistryState::Running as u8,
            RegistryState::Draining as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                self.runtime_token.cancel();
                tokio::spawn(Arc::clone(self).drain());
            }
            Err(s) if s == RegistryState::Idle as u8 => return,
            Err(_) => {}
        }
        self.done.cancelled().await;
    }

    async fn drain(self: Arc<Self>) {
        let services = self.services();
        join_all(services.iter().map(|s| s.stop())).await;

        self.remove_pid_file();
        self.bus.publish(Event::new(EventKind::AllDrained));
        self.flush_subscribers().await;

        self.state.store(RegistryState::Stopped as u8, Ordering::Release);
        self.done.cancel();
    }

    /// Parks the caller until every service drained. Returns immediately if
    /// the registry was never started.
    pub async fn wait(&self) {
        if self.state() == RegistryState::Idle {
            return;
        }
        self.done.cancelled().await;
    }

    /// `start()` followed by `wait()`.
    pub async fn run(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.start()?;
        self.wait().await;
        Ok(())
    }

    /// Registered services in registration order.
    pub fn services(&self) -> Vec<Arc<Service>> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stats of every service in registration order.
    pub fn snapshot(&self) -> Vec<ServiceStats> {
        self.services().iter().map(|s| s.stats()).collect()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RegistryState {
        RegistryState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Runtime configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Event bus shared with every service; subscribe for raw events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    fn spawn_stop_listener<F>(self: &Arc<Self>, trigger: F)
    where
        F: Future<Output = Option<String>> + Send + 'static,
    {
        let me = Arc::downgrade(self);
        let token = self.runtime_token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                reason = trigger => {
                    if let Some(me) = me.upgrade() {
                        let mut ev = Event::new(EventKind::ShutdownRequested);
                        if let Some(reason) = reason {
                            ev = ev.with_reason(reason);
                        }
                        me.bus.publish(ev);
                        me.stop().await;
                    }
                }
            }
        });
    }

    fn write_pid_file(&self) {
        let Some(path) = &self.cfg.pid_file else {
            return;
        };
        match process::write_pid(path) {
            Ok(()) => {
                self.pid_written.store(true, Ordering::Release);
                self.bus.publish(
                    Event::new(EventKind::PidFileWritten).with_reason(path.display().to_string()),
                );
            }
            Err(e) => self
                .bus
                .publish(Event::new(EventKind::PidFileFailed).with_reason(e.to_string())),
        }
    }

    fn remove_pid_file(&self) {
        let Some(path) = &self.cfg.pid_file else {
            return;
        };
        // Never delete a file that belongs to another instance.
        if !self.pid_written.swap(false, Ordering::AcqRel) {
            return;
        }
        match process::remove_pid(path) {
            Ok(()) => self.bus.publish(
                Event::new(EventKind::PidFileRemoved).with_reason(path.display().to_string()),
            ),
            Err(e) => self
                .bus
                .publish(Event::new(EventKind::PidFileFailed).with_reason(e.to_string())),
        }
    }

    /// Waits until the forwarder delivered `AllDrained` and the subscribers
    /// processed their queues.
    async fn flush_subscribers(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.runtime_token.cancel();
        if let Some(handle) = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use crate::core::Notify;
    use crate::error::TaskError;
    use crate::tasks::TaskFn;
    use std::sync::atomic::{AtomicU64, AtomicUsize};
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    fn quiet() -> Config {
        Config {
            handle_signals: false,
            ..Config::default()
        }
    }

    fn parked(name: &'static str) -> TaskRef {
        TaskFn::arc(name, |notify: Notify| async move {
            notify.notified().await;
            Ok::<_, TaskError>(())
        })
    }

    #[tokio::test]
    async fn add_after_start_is_rejected() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        reg.add(parked("a"), 1).unwrap();
        reg.start().unwrap();

        let Err(err) = reg.add(parked("late"), 1) else {
            panic!("add after start must be rejected");
        };
        assert_eq!(
            err,
            RuntimeError::AlreadyStarted {
                service: "late".into()
            }
        );
        assert_eq!(reg.services().len(), 1);
        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();
    }

    #[tokio::test]
    async fn start_twice_and_restart_are_rejected() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        reg.start().unwrap();
        assert_eq!(reg.start(), Err(RuntimeError::AlreadyRunning));

        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();
        assert_eq!(reg.state(), RegistryState::Stopped);
        assert_eq!(reg.start(), Err(RuntimeError::AlreadyRunning));
    }

    #[tokio::test]
    async fn wait_without_start_returns_immediately() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        reg.add(parked("a"), 2).unwrap();
        timeout(Duration::from_millis(100), reg.wait()).await.unwrap();
        reg.stop().await;
        assert_eq!(reg.state(), RegistryState::Idle);
    }

    #[tokio::test]
    async fn trigger_stops_the_registry() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        let svc = reg.add(parked("a"), 2).unwrap();
        let mut rx = reg.bus().subscribe();

        let (tx, trigger) = oneshot::channel::<()>();
        reg.start_with_trigger(async move {
            let _ = trigger.await;
        })
        .unwrap();
        tx.send(()).unwrap();

        timeout(Duration::from_secs(2), reg.wait()).await.unwrap();
        assert_eq!(reg.state(), RegistryState::Stopped);
        assert_eq!(svc.in_flight(), 0);

        let mut saw_request = false;
        while let Ok(ev) = rx.try_recv() {
            saw_request |= ev.kind == EventKind::ShutdownRequested;
        }
        assert!(saw_request);
    }

    #[tokio::test]
    async fn pid_file_lifecycle_follows_start_and_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        let reg = Registry::builder(quiet().with_pid_file(&path))
            .with_subscribers(vec![])
            .build();
        reg.add(parked("a"), 1).unwrap();

        reg.start().unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, std::process::id().to_string());

        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn pid_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("svc.pid");
        let reg = Registry::builder(quiet().with_pid_file(&path))
            .with_subscribers(vec![])
            .build();
        let svc = reg.add(parked("a"), 1).unwrap();
        let mut rx = reg.bus().subscribe();

        assert!(reg.start().is_ok());
        assert!(svc.is_running());
        let ev = timeout(Duration::from_secs(1), async {
            loop {
                let ev = rx.recv().await.unwrap();
                if ev.kind == EventKind::PidFileFailed {
                    return ev;
                }
            }
        })
        .await
        .unwrap();
        assert!(ev.reason.unwrap().contains("write"));

        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();
    }

    /// Records every event kind it sees.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl crate::subscribers::Subscribe for Recorder {
        async fn on_event(&self, e: &Event) {
            self.0.lock().unwrap().push(e.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn bounded_concurrency_and_quiet_after_stop() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        let counter = Arc::new(AtomicU64::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (c, a, p) = (Arc::clone(&counter), Arc::clone(&active), Arc::clone(&peak));
        let task = TaskFn::arc("counter", move |notify: Notify| {
            let (c, a, p) = (Arc::clone(&c), Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                loop {
                    tokio::select! {
                        _ = notify.notified() => break,
                        _ = tokio::time::sleep(Duration::from_millis(2)) => {
                            c.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
                a.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            }
        });
        let svc = reg.add(task, 2).unwrap();

        reg.start().unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();
        timeout(Duration::from_secs(1), reg.wait()).await.unwrap();

        assert!(counter.load(Ordering::SeqCst) > 0);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(svc.in_flight(), 0);

        let after = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn immediate_stop_drains_every_service() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        let a = reg.add(parked("a"), 1).unwrap();
        let b = reg.add(parked("b"), 3).unwrap();

        reg.start().unwrap();
        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();

        for svc in [&a, &b] {
            assert_eq!(svc.in_flight(), 0);
            assert_eq!(svc.state(), crate::core::ServiceState::Stopped);
        }
        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].name, "a");
        assert_eq!(snap[1].max_thread, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panicking_invocation_recycles_its_worker() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        let mut rx = reg.bus().subscribe();
        let calls = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&calls);
        let task = TaskFn::arc("fragile", move |notify: Notify| {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    panic!("first call explodes");
                }
                notify.notified().await;
                Ok::<_, TaskError>(())
            }
        });
        let svc = reg.add(task, 1).unwrap();
        reg.start().unwrap();

        let (panicked, redispatched) = timeout(Duration::from_secs(2), async {
            let mut panicked = None;
            loop {
                let ev = rx.recv().await.unwrap();
                match ev.kind {
                    EventKind::WorkerPanicked => panicked = Some(ev),
                    EventKind::WorkerDispatched if panicked.is_some() => {
                        return (panicked.unwrap(), ev);
                    }
                    _ => {}
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(panicked.reason.as_deref(), Some("first call explodes"));
        assert_eq!(panicked.worker, Some(1));
        assert_eq!(redispatched.worker, Some(1));
        assert!(svc.is_running());

        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();
        assert!(calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(svc.in_flight(), 0);
    }

    #[tokio::test]
    async fn empty_registry_starts_and_stops() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        reg.start().unwrap();
        assert_eq!(reg.state(), RegistryState::Running);

        timeout(Duration::from_secs(1), reg.stop()).await.unwrap();
        timeout(Duration::from_secs(1), reg.wait()).await.unwrap();
        assert_eq!(reg.state(), RegistryState::Stopped);
    }

    #[tokio::test]
    async fn subscribers_are_flushed_before_wait_returns() {
        let rec = Arc::new(Recorder::default());
        let sub: Arc<dyn crate::subscribers::Subscribe> = rec.clone();
        let reg = Registry::builder(quiet()).with_subscribers(vec![sub]).build();
        reg.add(parked("a"), 1).unwrap();

        reg.start().unwrap();
        timeout(Duration::from_secs(2), reg.stop()).await.unwrap();
        reg.wait().await;

        let seen = rec.0.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&EventKind::ServiceStarted));
        assert_eq!(seen.last(), Some(&EventKind::AllDrained));
        assert!(seen.contains(&EventKind::ServiceDrained));
    }

    #[tokio::test]
    async fn dropped_stop_future_does_not_wedge_shutdown() {
        let reg = Registry::builder(quiet()).with_subscribers(vec![]).build();
        let svc = reg
            .add(
                TaskFn::arc("slow-exit", |notify: Notify| async move {
                    notify.notified().await;
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok::<_, TaskError>(())
                }),
                2,
            )
            .unwrap();
        reg.start().unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(timeout(Duration::from_millis(10), reg.stop()).await.is_err());

        timeout(Duration::from_secs(2), reg.wait()).await.unwrap();
        assert_eq!(reg.state(), RegistryState::Stopped);
        assert_eq!(svc.state(), crate::core::ServiceState::Stopped);
        assert_eq!(svc.in_flight(), 0);
        timeout(Duration::from_millis(100), reg.stop()).await.unwrap();
    }
}

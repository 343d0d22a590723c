//! # Process supervisor: PID file and daemon-mode process control.
//!
//! Small synchronous OS-facing helpers the [`Registry`](crate::Registry)
//! (PID file on start/stop) and daemon front-ends (start/stop/status
//! commands) build on.
//!
//! ## File format
//! The PID file holds the decimal process id as text, nothing else.
//!
//! ## Daemon flow
//! ```text
//! svc start ──► verify_process(pid) ── Ok ──► "already running"
//!                     └─ Err ──► spawn_child(["run", ..]) ──► child: Registry::run()
//!                                                               ├─ start(): write_pid
//!                                                               └─ stop():  remove_pid
//! svc stop  ──► signal_stop(pid file) ──► SIGINT ──► child drains, exits
//! ```

mod control;
mod pidfile;

pub use control::{
    executable_name, is_process_running, process_name, signal_stop, spawn_child, verify_process,
};
pub use pidfile::{read_pid, remove_pid, write_pid};

/// Spawns `sleep 5` and waits until the child has exec'd, so its process
/// name is `sleep` rather than the forking test thread's.
#[cfg(all(test, unix))]
pub(crate) fn spawn_sleeper() -> std::process::Child {
    use std::time::{Duration, Instant};

    let child = std::process::Command::new("sleep")
        .arg("5")
        .spawn()
        .unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while process_name(child.id()).as_deref() != Some("sleep") {
        assert!(Instant::now() < deadline, "child never exec'd `sleep`");
        std::thread::sleep(Duration::from_millis(5));
    }
    child
}

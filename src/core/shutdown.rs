//! # OS stop trigger for a [`Registry`](crate::Registry).
//!
//! [`stop_signal`] resolves with the name of the first termination signal the
//! process receives; the registry puts that name into the `reason` of its
//! `ShutdownRequested` event and then drains every service.
//!
//! | Platform | Signals                                                        |
//! |----------|----------------------------------------------------------------|
//! | Unix     | `SIGINT` (terminal Ctrl-C, `process::signal_stop`), `SIGTERM`, `SIGQUIT` |
//! | other    | Ctrl-C                                                         |
//!
//! Registration errors surface as `Err`; the registry reports them as
//! `SignalUnavailable` and keeps running, so only an explicit `stop()` ends it.

use std::io;

/// Waits for SIGINT, SIGTERM or SIGQUIT and returns its name.
#[cfg(unix)]
pub(crate) async fn stop_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = int.recv() => "SIGINT",
        _ = term.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
pub(crate) async fn stop_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

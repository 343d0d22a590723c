//! # Runtime configuration.
//!
//! Provides [`Config`], the settings shared by a [`Registry`](crate::Registry)
//! and its services.
//!
//! ## Sentinel values
//! - `pid_file = None` → no PID file is written or removed
//! - `bus_capacity = 0` → clamped to 1

use std::path::{Path, PathBuf};

use crate::args::Args;

/// Global configuration for a registry.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `pid_file`: where `start` writes the PID and `stop` removes it
/// - `handle_signals`: stop on SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere)
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events skip older items.
    pub bus_capacity: usize,

    /// PID file written on `start` (best effort) and removed after the drain.
    pub pid_file: Option<PathBuf>,

    /// Install the OS-signal stop trigger on `start`.
    pub handle_signals: bool,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns a config that writes its PID to `path`.
    pub fn with_pid_file(mut self, path: impl AsRef<Path>) -> Self {
        self.pid_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Defaults overridden by `--pid-file=<path>` and `--bus-capacity=<n>`.
    ///
    /// An unparsable `--bus-capacity` keeps the default.
    pub fn from_args(args: &Args) -> Self {
        let mut cfg = Self::default();
        if let Some(path) = args.get("pid-file").filter(|p| !p.is_empty()) {
            cfg.pid_file = Some(PathBuf::from(path));
        }
        if let Some(n) = args.get_int("bus-capacity").and_then(|n| usize::try_from(n).ok()) {
            cfg.bus_capacity = n;
        }
        cfg
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `pid_file = None`
    /// - `handle_signals = true`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            pid_file: None,
            handle_signals: true,
        }
    }
}

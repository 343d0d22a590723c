//! Error types used by the servicevisor runtime, tasks and the PID-file helpers.
//!
//! This module defines three enums:
//!
//! - [`RuntimeError`]: misuse of the registry lifecycle (start twice, add after start).
//! - [`TaskError`]: errors returned by individual task invocations.
//! - [`PidError`]: environment failures from the [`process`](crate::process) helpers.
//!
//! All of them provide `as_label` for logs/metrics.

use std::path::PathBuf;

use thiserror::Error;

/// # Errors produced by the registry lifecycle.
///
/// These are programming-usage errors. They are reported synchronously and
/// never affect services that are already running.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// `start` was called on a registry that is running or has already been stopped.
    #[error("services already running")]
    AlreadyRunning,

    /// `add` was called after `start`; services can only be registered up front.
    #[error("cannot add service {service:?}: registry already started")]
    AlreadyStarted {
        /// Name of the task that was rejected.
        service: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::AlreadyRunning.as_label(), "runtime_already_running");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::AlreadyStarted { .. } => "runtime_already_started",
        }
    }
}

/// # Errors returned by a task invocation.
///
/// The runner never retries: an invocation that returns an error is logged and
/// treated exactly like one that returned `Ok(())`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Invocation failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Invocation observed its stop notification and bailed out early.
    #[error("stop notified")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }
}

/// # Errors from PID-file and process-control helpers.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PidError {
    /// A live process already owns the PID file.
    #[error("service already running (pid {pid})")]
    AlreadyRunning {
        /// Pid read from the file.
        pid: u32,
    },

    /// The PID file does not exist.
    #[error("pid file not found: {}", path.display())]
    NotFound {
        /// Path that was read.
        path: PathBuf,
    },

    /// The PID file exists but does not hold a decimal process id.
    #[error("invalid pid file {}: {content:?}", path.display())]
    Invalid {
        /// Path that was read.
        path: PathBuf,
        /// Raw (trimmed) file content.
        content: String,
    },

    /// No live process has the recorded pid.
    #[error("process {pid} is not running")]
    NotRunning {
        /// Pid read from the file.
        pid: u32,
    },

    /// The recorded process is alive but runs another executable.
    #[error("pid {pid} does not match: expected {expected:?}, found {found:?}")]
    Mismatch {
        /// Pid read from the file.
        pid: u32,
        /// Executable name of the current binary.
        expected: String,
        /// Executable name of the recorded process.
        found: String,
    },

    /// The operation has no implementation on this platform.
    #[error("operation not supported on this platform")]
    Unsupported,

    /// Filesystem or process-spawn failure.
    #[error("{action} {}: {source}", path.display())]
    Io {
        /// What was being attempted ("read", "write", "remove", "spawn").
        action: &'static str,
        /// Path involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Delivering a signal failed.
    #[cfg(unix)]
    #[error("signal pid {pid}: {source}")]
    Signal {
        /// Target pid.
        pid: u32,
        /// Underlying errno.
        #[source]
        source: nix::Error,
    },
}

impl PidError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PidError::AlreadyRunning { .. } => "pid_already_running",
            PidError::NotFound { .. } => "pid_not_found",
            PidError::Invalid { .. } => "pid_invalid",
            PidError::NotRunning { .. } => "pid_not_running",
            PidError::Mismatch { .. } => "pid_mismatch",
            PidError::Unsupported => "pid_unsupported",
            PidError::Io { .. } => "pid_io",
            #[cfg(unix)]
            PidError::Signal { .. } => "pid_signal",
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PidError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_labels_are_stable() {
        assert_eq!(RuntimeError::AlreadyRunning.as_label(), "runtime_already_running");
        let err = RuntimeError::AlreadyStarted {
            service: "ticker".into(),
        };
        assert_eq!(err.as_label(), "runtime_already_started");
        assert!(err.to_string().contains("ticker"));
    }

    #[test]
    fn pid_error_messages_carry_context() {
        let err = PidError::Mismatch {
            pid: 42,
            expected: "svc".into(),
            found: "bash".into(),
        };
        assert_eq!(err.as_label(), "pid_mismatch");
        let msg = err.to_string();
        assert!(msg.contains("42") && msg.contains("svc") && msg.contains("bash"));

        let err = PidError::io(
            "write",
            "/tmp/x.pid",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(err.as_label(), "pid_io");
        assert!(err.to_string().starts_with("write /tmp/x.pid"));
    }
}

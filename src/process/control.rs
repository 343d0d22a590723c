//! Platform-specific process detection and control.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::pidfile::read_pid;
use crate::error::PidError;

/// Linux truncates `/proc/<pid>/comm` to 15 bytes.
#[cfg(target_os = "linux")]
const COMM_LEN: usize = 15;

/// File name of the current binary.
pub fn executable_name() -> Option<String> {
    let exe = std::env::current_exe()
        .ok()
        .or_else(|| std::env::args_os().next().map(PathBuf::from))?;
    exe.file_name()
        .and_then(OsStr::to_str)
        .map(str::to_string)
}

/// Check if a process with the given PID exists.
///
/// Signal 0 probes without delivering anything; `EPERM` still means the process exists.
#[cfg(unix)]
pub fn is_process_running(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    if raw <= 0 {
        return false;
    }
    matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
}

/// Check if a process with the given PID exists.
#[cfg(not(unix))]
pub fn is_process_running(pid: u32) -> bool {
    process_name(pid).is_some()
}

/// Executable name of process `pid`, if it is alive and inspectable.
pub fn process_name(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(comm) = std::fs::read_to_string(format!("/proc/{pid}/comm")) {
            let comm = comm.trim();
            return (!comm.is_empty()).then(|| comm.to_string());
        }
        None
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    {
        let output = Command::new("ps")
            .args(["-p", &pid.to_string(), "-o", "comm="])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let comm = String::from_utf8_lossy(&output.stdout).trim().to_string();
        // BSD/macOS `ps` reports the full path.
        let name = Path::new(&comm).file_name()?.to_str()?.to_string();
        (!name.is_empty()).then_some(name)
    }

    #[cfg(windows)]
    {
        let output = Command::new("tasklist")
            .args(["/FI", &format!("PID eq {pid}"), "/FO", "CSV", "/NH"])
            .output()
            .ok()?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        // "name.exe","1234",...
        let first = stdout.lines().next()?;
        let name = first.split(',').next()?.trim_matches('"');
        if name.is_empty() || name.starts_with("INFO:") {
            return None;
        }
        Some(name.to_string())
    }

    #[cfg(not(any(unix, windows)))]
    {
        None
    }
}

fn names_match(expected: &str, found: &str) -> bool {
    if expected == found {
        return true;
    }
    #[cfg(target_os = "linux")]
    if found.len() == COMM_LEN && expected.starts_with(found) {
        return true;
    }
    false
}

/// Checks that the PID file names a live process running the current binary.
///
/// Returns the pid on success.
pub fn verify_process(path: impl AsRef<Path>) -> Result<u32, PidError> {
    let pid = read_pid(path)?;
    if !is_process_running(pid) {
        return Err(PidError::NotRunning { pid });
    }
    let found = process_name(pid).ok_or(PidError::NotRunning { pid })?;
    let expected = executable_name().unwrap_or_default();
    if !names_match(&expected, &found) {
        return Err(PidError::Mismatch {
            pid,
            expected,
            found,
        });
    }
    Ok(pid)
}

/// Sends an interrupt (SIGINT) to the process recorded in the PID file.
///
/// Returns the signalled pid.
#[cfg(unix)]
pub fn signal_stop(path: impl AsRef<Path>) -> Result<u32, PidError> {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = read_pid(path)?;
    let raw = i32::try_from(pid).map_err(|_| PidError::NotRunning { pid })?;
    match kill(Pid::from_raw(raw), Signal::SIGINT) {
        Ok(()) => Ok(pid),
        Err(Errno::ESRCH) => Err(PidError::NotRunning { pid }),
        Err(source) => Err(PidError::Signal { pid, source }),
    }
}

/// Sends an interrupt to the process recorded in the PID file.
#[cfg(not(unix))]
pub fn signal_stop(path: impl AsRef<Path>) -> Result<u32, PidError> {
    let _ = read_pid(path)?;
    Err(PidError::Unsupported)
}

/// Re-executes the current binary with `args` as a detached child.
///
/// The child gets null stdio and (on Unix) its own process group, so a
/// Ctrl-C aimed at the parent's terminal does not reach it. Returns the child's pid.
pub fn spawn_child<I, S>(args: I) -> Result<u32, PidError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let exe = std::env::current_exe().map_err(|e| PidError::io("spawn", "<current exe>", e))?;

    let mut cmd = Command::new(&exe);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let child = cmd.spawn().map_err(|e| PidError::io("spawn", &exe, e))?;
    Ok(child.id())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn current_process_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        fs::write(&path, std::process::id().to_string()).unwrap();

        assert!(is_process_running(std::process::id()));
        assert_eq!(verify_process(&path).unwrap(), std::process::id());
    }

    #[test]
    fn foreign_process_is_a_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        let mut child = crate::process::spawn_sleeper();
        fs::write(&path, child.id().to_string()).unwrap();

        let res = verify_process(&path);
        child.kill().unwrap();
        child.wait().unwrap();

        match res {
            Err(PidError::Mismatch { pid, found, .. }) => {
                assert_eq!(pid, child.id());
                assert_eq!(found, "sleep");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(verify_process(&path), Err(PidError::NotRunning { .. })));
    }

    #[test]
    fn signal_stop_interrupts_the_recorded_process() {
        use std::os::unix::process::ExitStatusExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        let mut child = crate::process::spawn_sleeper();
        fs::write(&path, child.id().to_string()).unwrap();

        assert_eq!(signal_stop(&path).unwrap(), child.id());
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(nix::sys::signal::Signal::SIGINT as i32));

        assert!(matches!(signal_stop(&path), Err(PidError::NotRunning { .. })));
    }

    #[test]
    fn missing_pid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pid");
        assert!(matches!(verify_process(&path), Err(PidError::NotFound { .. })));
        assert!(matches!(signal_stop(&path), Err(PidError::NotFound { .. })));
    }

    #[test]
    fn zero_pid_is_never_running() {
        assert!(!is_process_running(0));
        assert!(process_name(0).is_none());
    }
}

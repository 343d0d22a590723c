use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use super::control::is_process_running;
use crate::error::PidError;

/// Reads the pid recorded in `path`.
pub fn read_pid(path: impl AsRef<Path>) -> Result<u32, PidError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => PidError::NotFound {
            path: path.to_path_buf(),
        },
        _ => PidError::io("read", path, e),
    })?;

    let content = data.trim();
    match content.parse::<u32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(PidError::Invalid {
            path: path.to_path_buf(),
            content: content.to_string(),
        }),
    }
}

/// Records the current process id in `path`.
///
/// An existing file naming another live process is left untouched and
/// reported as [`PidError::AlreadyRunning`]. A stale or garbled file is
/// replaced. A file naming this very process is rewritten.
pub fn write_pid(path: impl AsRef<Path>) -> Result<(), PidError> {
    let path = path.as_ref();
    let me = std::process::id();

    match read_pid(path) {
        Ok(pid) if pid == me => {}
        Ok(pid) if is_process_running(pid) => return Err(PidError::AlreadyRunning { pid }),
        Ok(_) | Err(PidError::Invalid { .. }) => remove_pid(path)?,
        Err(PidError::NotFound { .. }) => {}
        Err(e) => return Err(e),
    }

    fs::write(path, me.to_string()).map_err(|e| PidError::io("write", path, e))
}

/// Deletes the PID file. A missing file is not an error.
pub fn remove_pid(path: impl AsRef<Path>) -> Result<(), PidError> {
    let path = path.as_ref();
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PidError::io("remove", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");

        write_pid(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), std::process::id().to_string());
        assert_eq!(read_pid(&path).unwrap(), std::process::id());

        // Same process writing again is fine.
        write_pid(&path).unwrap();

        remove_pid(&path).unwrap();
        assert!(!path.exists());
        remove_pid(&path).unwrap();
    }

    #[test]
    fn read_reports_missing_and_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        assert!(matches!(read_pid(&path), Err(PidError::NotFound { .. })));

        fs::write(&path, "not-a-pid\n").unwrap();
        match read_pid(&path) {
            Err(PidError::Invalid { content, .. }) => assert_eq!(content, "not-a-pid"),
            other => panic!("unexpected: {other:?}"),
        }

        fs::write(&path, "0").unwrap();
        assert!(matches!(read_pid(&path), Err(PidError::Invalid { .. })));

        fs::write(&path, " 1234\n").unwrap();
        assert_eq!(read_pid(&path).unwrap(), 1234);
    }

    #[test]
    fn garbage_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");
        fs::write(&path, "garbage").unwrap();

        write_pid(&path).unwrap();
        assert_eq!(read_pid(&path).unwrap(), std::process::id());
    }

    #[cfg(unix)]
    #[test]
    fn live_owner_is_respected_and_stale_owner_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.pid");

        let mut child = crate::process::spawn_sleeper();
        fs::write(&path, child.id().to_string()).unwrap();
        match write_pid(&path) {
            Err(PidError::AlreadyRunning { pid }) => assert_eq!(pid, child.id()),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(read_pid(&path).unwrap(), child.id());

        child.kill().unwrap();
        child.wait().unwrap();

        write_pid(&path).unwrap();
        assert_eq!(read_pid(&path).unwrap(), std::process::id());
    }
}

//! Daemon-style front end over a [`Registry`].
//!
//! ```text
//! cargo run --example daemon -- run                 # foreground, Ctrl-C to stop
//! cargo run --example daemon -- start --threads=4   # detached child + PID file
//! cargo run --example daemon -- status
//! cargo run --example daemon -- stop
//! ```
//!
//! Flags: `--pid-file=<path>` (default: `<tmp>/<program>.pid`),
//! `--threads=<n>` worker slots for the `ingest` service.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, bail};
use tracing_subscriber::EnvFilter;

use servicevisor::{Args, Config, Notify, PidError, Registry, TaskError, TaskFn, TaskRef, process};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::from_env();
    let pid_file = pid_file(&args);

    match args.command() {
        Some("run") => run(&args, pid_file).await,
        Some("start") => start(&args, &pid_file),
        Some("stop") => {
            let pid = process::signal_stop(&pid_file)
                .with_context(|| format!("stop via {}", pid_file.display()))?;
            println!("sent interrupt to {pid}");
            Ok(())
        }
        Some("status") => {
            match process::verify_process(&pid_file) {
                Ok(pid) => println!("running (pid {pid})"),
                Err(e) => println!("not running: {e}"),
            }
            Ok(())
        }
        Some(other) => bail!("unknown command {other:?} (expected run|start|stop|status)"),
        None => bail!("usage: daemon <run|start|stop|status> [--pid-file=<path>] [--threads=<n>]"),
    }
}

fn pid_file(args: &Args) -> PathBuf {
    if let Some(path) = args.get("pid-file").filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    let name = args.program_name().unwrap_or("daemon");
    std::env::temp_dir().join(format!("{name}.pid"))
}

fn start(args: &Args, pid_file: &Path) -> anyhow::Result<()> {
    if let Ok(pid) = process::verify_process(pid_file) {
        return Err(PidError::AlreadyRunning { pid }.into());
    }

    let mut child_args = vec![
        "run".to_string(),
        format!("--pid-file={}", pid_file.display()),
    ];
    if let Some(n) = args.get_int("threads") {
        child_args.push(format!("--threads={n}"));
    }
    let pid = process::spawn_child(&child_args).context("spawn detached child")?;
    println!("started (pid {pid}), pid file {}", pid_file.display());
    Ok(())
}

async fn run(args: &Args, pid_file: PathBuf) -> anyhow::Result<()> {
    let threads = args
        .get_int("threads")
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(2);
    let cfg = Config::from_args(args).with_pid_file(pid_file);
    let registry = Registry::new(cfg);

    let processed = Arc::new(AtomicU64::new(0));
    registry.add(ingest(Arc::clone(&processed)), threads)?;
    registry.add(sweeper(), 1)?;

    registry.run().await?;
    println!("processed {} batches", processed.load(Ordering::Relaxed));
    Ok(())
}

/// Pulls a "batch" every 200ms until told to stop.
fn ingest(processed: Arc<AtomicU64>) -> TaskRef {
    TaskFn::arc("ingest", move |notify: Notify| {
        let processed = Arc::clone(&processed);
        async move {
            loop {
                tokio::select! {
                    _ = notify.notified() => return Ok::<_, TaskError>(()),
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {
                        processed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    })
}

/// Short-lived invocation: does one pass and returns, so the worker is
/// dispatched again. Every fifth pass fails.
fn sweeper() -> TaskRef {
    let passes = Arc::new(AtomicU64::new(0));
    TaskFn::arc("sweeper", move |notify: Notify| {
        let n = passes.fetch_add(1, Ordering::Relaxed) + 1;
        async move {
            tokio::select! {
                _ = notify.notified() => return Err(TaskError::Canceled),
                _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            }
            if n % 5 == 0 {
                return Err(TaskError::fail(format!("sweep #{n} found a stale lock")));
            }
            Ok(())
        }
    })
}

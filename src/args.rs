//! # Argument accessors.
//!
//! Read-only views over a process argument vector shaped like
//! `program <command> [positional..] [--flag=value..]`:
//!
//! ```text
//! svc start worker-a 8 --pid-file=/run/svc.pid --threads=4
//!     │     │        │  └─ get("pid-file"), get_int("threads")
//!     │     └────────┴─ positional(): ["worker-a", "8"], arg(0), arg_int(1)
//!     └─ command()
//! ```
//!
//! Missing or unparsable values are `None`.

use std::path::Path;

/// Parsed view of an argument vector. Index 0 is the program path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    raw: Vec<String>,
    positional: Vec<String>,
}

impl Args {
    /// Builds accessors over an explicit argument vector.
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = args.into_iter().map(Into::into).collect();
        let positional = raw
            .iter()
            .skip(2)
            .filter(|a| !a.starts_with("--"))
            .cloned()
            .collect();
        Self { raw, positional }
    }

    /// Accessors over `std::env::args()`.
    pub fn from_env() -> Self {
        Self::new(std::env::args())
    }

    /// File name of the program path (argv\[0\]).
    pub fn program_name(&self) -> Option<&str> {
        let program = self.raw.first()?;
        Path::new(program).file_name()?.to_str()
    }

    /// First argument after the program, trimmed.
    pub fn command(&self) -> Option<&str> {
        self.raw.get(1).map(|c| c.trim()).filter(|c| !c.is_empty())
    }

    /// [`command`](Self::command) parsed as an integer.
    pub fn command_int(&self) -> Option<i64> {
        self.command()?.parse().ok()
    }

    /// Value of the first `--key=value` argument.
    ///
    /// ```
    /// use servicevisor::Args;
    ///
    /// let args = Args::new(["svc", "run", "--config=path.cfg"]);
    /// assert_eq!(args.get("config"), Some("path.cfg"));
    /// assert_eq!(args.get("conf"), None);
    /// ```
    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.iter().find_map(|arg| {
            arg.strip_prefix("--")?
                .strip_prefix(key)?
                .strip_prefix('=')
        })
    }

    /// [`get`](Self::get) parsed as an integer.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.trim().parse().ok()
    }

    /// Arguments after the command that are not `--` flags.
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Positional argument `idx`, trimmed.
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.positional.get(idx).map(|a| a.trim())
    }

    /// Positional argument `idx` parsed as an integer.
    pub fn arg_int(&self, idx: usize) -> Option<i64> {
        self.arg(idx)?.parse().ok()
    }

    /// True if positional argument `idx` exists.
    pub fn has_arg(&self, idx: usize) -> bool {
        idx < self.positional.len()
    }

    /// The full argument vector, program included.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }
}

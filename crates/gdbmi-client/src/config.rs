//! Configuration for spawning a debugger process.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::defaults::{default_args, default_command, default_exit_grace_period_ms};

/// How to launch the debugger.
///
/// Deserialisable so embedding applications can load it from their own
/// configuration layer; missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GdbConfig {
    /// The executable path or command name.
    #[serde(default = "default_command")]
    pub command: PathBuf,
    /// Arguments passed before any `--tty` option.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Working directory for the spawned process.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Terminal the debugged program should use for its own I/O.
    #[serde(default)]
    pub tty: Option<PathBuf>,
    /// How long to wait for the debugger to exit after the exit handshake
    /// before killing it.
    #[serde(default = "default_exit_grace_period_ms")]
    pub exit_grace_period_ms: u64,
}

impl Default for GdbConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            working_dir: None,
            tty: None,
            exit_grace_period_ms: default_exit_grace_period_ms(),
        }
    }
}

impl GdbConfig {
    /// Configuration running `command` with no arguments.
    #[must_use]
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            ..Self::default()
        }
    }

    /// Replaces the argument list.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets a custom working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Routes the debugged program's I/O to the given terminal.
    #[must_use]
    pub fn with_tty(mut self, tty: impl Into<PathBuf>) -> Self {
        self.tty = Some(tty.into());
        self
    }

    /// Sets the exit grace period.
    #[must_use]
    pub fn with_exit_grace_period(mut self, grace: Duration) -> Self {
        self.exit_grace_period_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The exit grace period as a [`Duration`].
    #[must_use]
    pub const fn exit_grace_period(&self) -> Duration {
        Duration::from_millis(self.exit_grace_period_ms)
    }

    /// Full argument vector, including `--tty` when a terminal is set.
    #[must_use]
    pub fn command_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(tty) = &self.tty {
            args.push(String::from("--tty"));
            args.push(tty.display().to_string());
        }
        args
    }
}

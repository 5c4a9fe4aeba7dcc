//! Spawning and reaping the debugger process.

use std::io;
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::GdbConfig;
use crate::error::ClientError;

/// Log target for process management.
pub(crate) const PROCESS_TARGET: &str = "gdbmi_client::process";

/// How often an exiting debugger is checked during the grace period.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A freshly started debugger with its pipes detached.
pub(crate) struct SpawnedDebugger {
    pub(crate) child: Child,
    pub(crate) stdin: ChildStdin,
    pub(crate) stdout: ChildStdout,
}

/// Starts the configured debugger with piped stdin and stdout and stderr
/// discarded.
pub(crate) fn spawn_debugger(config: &GdbConfig) -> Result<SpawnedDebugger, ClientError> {
    let args = config.command_args();
    debug!(
        target: PROCESS_TARGET,
        command = %config.command.display(),
        args = ?args,
        "spawning debugger process"
    );

    let mut command = Command::new(&config.command);
    command
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    if let Some(dir) = &config.working_dir {
        command.current_dir(dir);
    }

    let spawn_error = |source: io::Error| ClientError::Spawn {
        command: config.command.display().to_string(),
        source: Arc::new(source),
    };

    let mut child = command.spawn().map_err(spawn_error)?;
    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        reap(&mut child);
        return Err(spawn_error(io::Error::other("debugger pipes were not captured")));
    };

    debug!(
        target: PROCESS_TARGET,
        pid = child.id(),
        "debugger process spawned"
    );
    Ok(SpawnedDebugger {
        child,
        stdin,
        stdout,
    })
}

/// Waits up to `grace` for the child to exit, then kills it.
///
/// Returns the exit status when the child exited on its own.
pub(crate) fn terminate_child(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    match child.try_wait() {
        Ok(Some(status)) => {
            debug!(target: PROCESS_TARGET, ?status, "debugger exited");
            return Some(status);
        }
        Ok(None) => {
            debug!(
                target: PROCESS_TARGET,
                grace_ms = grace.as_millis(),
                "debugger still running, waiting before killing"
            );
        }
        Err(error) => {
            warn!(
                target: PROCESS_TARGET,
                error = %error,
                "failed to check debugger status, waiting before killing"
            );
        }
    }

    if let Some(status) = poll_exit(child, grace) {
        debug!(
            target: PROCESS_TARGET,
            ?status,
            "debugger exited during grace period"
        );
        return Some(status);
    }

    warn!(
        target: PROCESS_TARGET,
        pid = child.id(),
        "debugger did not exit gracefully, killing"
    );
    reap(child);
    None
}

/// Checks the child every [`EXIT_POLL_INTERVAL`] until it exits or `grace`
/// runs out.
fn poll_exit(child: &mut Child, grace: Duration) -> Option<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        let remaining = grace.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return None;
        }
        thread::sleep(remaining.min(EXIT_POLL_INTERVAL));
    }
}

/// Kills the child and collects it so no zombie is left behind.
pub(crate) fn reap(child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(target: PROCESS_TARGET, error = %error, "kill failed");
    }
    if let Err(error) = child.wait() {
        debug!(target: PROCESS_TARGET, error = %error, "wait failed");
    }
}

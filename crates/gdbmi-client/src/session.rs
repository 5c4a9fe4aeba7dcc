//! The debugger session: startup, command round trips and shutdown.

use std::io::{Read, Write};
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use gdbmi_syntax::Record;
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::config::GdbConfig;
use crate::correlation::Correlator;
use crate::defaults::{EXIT_OPERATION, default_exit_grace_period};
use crate::error::ClientError;
use crate::process::{SpawnedDebugger, reap, spawn_debugger, terminate_child};
use crate::reader::{NotificationCallback, ReaderHandle, spawn_reader};

/// Log target for session lifecycle events.
pub(crate) const SESSION_TARGET: &str = "gdbmi_client::session";

/// A running debugger session.
///
/// Commands may be sent from any number of threads at once; each call
/// blocks only its own thread until the reply tagged with its sequence
/// number arrives. Records that are not replies are handed to the
/// notification callback given at construction.
///
/// Dropping a session without calling [`GdbSession::exit`] kills the
/// debugger process.
pub struct GdbSession {
    correlator: Arc<Correlator>,
    reader: Mutex<Option<ReaderHandle>>,
    child: Mutex<Option<Child>>,
    exit_grace: Duration,
}

impl GdbSession {
    /// Spawns the debugger described by `config` and starts reading its
    /// output.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Spawn`] when the process cannot be started and
    /// [`ClientError::Transport`] when the reader thread cannot be created.
    pub fn spawn(
        config: &GdbConfig,
        callback: Option<NotificationCallback>,
    ) -> Result<Self, ClientError> {
        let SpawnedDebugger {
            mut child,
            stdin,
            stdout,
        } = spawn_debugger(config)?;

        let correlator = Arc::new(Correlator::new(Box::new(stdin)));
        let reader = match spawn_reader(stdout, Arc::clone(&correlator), callback) {
            Ok(reader) => reader,
            Err(error) => {
                reap(&mut child);
                return Err(error);
            }
        };

        info!(
            target: SESSION_TARGET,
            pid = child.id(),
            command = %config.command.display(),
            "debugger session started"
        );
        Ok(Self {
            correlator,
            reader: Mutex::new(Some(reader)),
            child: Mutex::new(Some(child)),
            exit_grace: config.exit_grace_period(),
        })
    }

    /// Builds a session over an existing byte stream pair with no child
    /// process behind it. `output` carries the debugger's output and `input`
    /// receives the commands.
    ///
    /// [`GdbSession::interrupt`] is unavailable on such a session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the reader thread cannot be
    /// created.
    pub fn from_transport<R, W>(
        output: R,
        input: W,
        callback: Option<NotificationCallback>,
    ) -> Result<Self, ClientError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let correlator = Arc::new(Correlator::new(Box::new(input)));
        let reader = spawn_reader(output, Arc::clone(&correlator), callback)?;
        debug!(target: SESSION_TARGET, "debugger session attached to transport");
        Ok(Self {
            correlator,
            reader: Mutex::new(Some(reader)),
            child: Mutex::new(None),
            exit_grace: default_exit_grace_period(),
        })
    }

    /// Sends a command and blocks until its reply arrives.
    ///
    /// The returned record is the reply with its sequence tag removed. An
    /// `error` reply is returned as a record; use
    /// [`GdbSession::checked_send`] to turn it into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidOperation`] for an unwritable operation
    /// name, [`ClientError::Transport`] when the write fails,
    /// [`ClientError::Parse`] when the reply is malformed and
    /// [`ClientError::SessionClosed`] when the debugger's output ends first.
    pub fn send(&self, operation: &str, arguments: &[&str]) -> Result<Record, ClientError> {
        let ticket = self.correlator.dispatch(operation, arguments)?;
        let sequence = ticket.sequence().to_owned();
        let record = ticket.wait()?;
        debug!(
            target: SESSION_TARGET,
            sequence = %sequence,
            operation,
            class = record.class().unwrap_or_default(),
            "reply received"
        );
        Ok(record)
    }

    /// Like [`GdbSession::send`], but an `error` reply becomes
    /// [`ClientError::Command`] carrying the debugger's message.
    ///
    /// # Errors
    ///
    /// Everything [`GdbSession::send`] returns, plus
    /// [`ClientError::Command`].
    pub fn checked_send(&self, operation: &str, arguments: &[&str]) -> Result<Record, ClientError> {
        match self.send(operation, arguments)? {
            Record::Result(result) if result.is_error() => Err(ClientError::command(result)),
            record => Ok(record),
        }
    }

    /// Like [`GdbSession::send`], but gives up after `timeout`.
    ///
    /// On expiry the pending slot is removed, so a reply arriving later is
    /// logged as unmatched and dropped.
    ///
    /// # Errors
    ///
    /// Everything [`GdbSession::send`] returns, plus
    /// [`ClientError::Timeout`].
    pub fn send_timeout(
        &self,
        operation: &str,
        arguments: &[&str],
        timeout: Duration,
    ) -> Result<Record, ClientError> {
        let ticket = self.correlator.dispatch(operation, arguments)?;
        ticket.wait_timeout(&self.correlator, timeout)
    }

    /// Sends SIGINT to the debugger so it stops the running target and
    /// resumes processing commands.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoProcess`] when the session has no child
    /// process and [`ClientError::Signal`] when delivery fails.
    pub fn interrupt(&self) -> Result<(), ClientError> {
        let pid = self.pid().ok_or(ClientError::NoProcess)?;
        let raw = i32::try_from(pid).map_err(|_| ClientError::Signal {
            pid,
            source: Errno::EINVAL,
        })?;
        signal::kill(Pid::from_raw(raw), Signal::SIGINT)
            .map_err(|source| ClientError::Signal { pid, source })?;
        debug!(target: SESSION_TARGET, pid, "interrupt delivered");
        Ok(())
    }

    /// Ends the session.
    ///
    /// Sends the exit command, waits for the reader to observe the end of
    /// the debugger's output and only then waits for the process. A
    /// debugger that does not exit within the configured grace period is
    /// killed. Returns the exit status when the process exited on its own.
    ///
    /// Calling `exit` again, or after the debugger already went away, is
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the exit command cannot be
    /// written and [`ClientError::ReaderPanicked`] when the reader thread
    /// panicked; the process is still waited for in that case.
    pub fn exit(&self) -> Result<Option<ExitStatus>, ClientError> {
        match self.send(EXIT_OPERATION, &[]) {
            Ok(record) => debug!(
                target: SESSION_TARGET,
                class = record.class().unwrap_or_default(),
                "exit acknowledged"
            ),
            Err(ClientError::SessionClosed { reason }) => debug!(
                target: SESSION_TARGET,
                reason = %reason,
                "session already closed before exit"
            ),
            Err(error) => return Err(error),
        }

        let reader_handle = lock(&self.reader).take();
        let joined = reader_handle.map(ReaderHandle::join).transpose();
        if let Ok(Some(reason)) = &joined {
            debug!(target: SESSION_TARGET, reason = %reason, "reader finished");
        }

        let owned_child = lock(&self.child).take();
        let status = owned_child.and_then(|mut child| terminate_child(&mut child, self.exit_grace));
        info!(
            target: SESSION_TARGET,
            status = ?status,
            "debugger session ended"
        );
        joined.map(|_| status)
    }

    /// Process id of the debugger, if the session owns one that has not
    /// been reaped.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        lock(&self.child).as_ref().map(Child::id)
    }

    /// Whether the debugger's output has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.correlator.is_closed()
    }

    /// Number of commands still waiting for a reply.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.correlator.pending()
    }
}

impl Drop for GdbSession {
    fn drop(&mut self) {
        let owned_child = self
            .child
            .get_mut()
            .unwrap_or_else(|poison| poison.into_inner())
            .take();
        if let Some(mut child) = owned_child {
            warn!(
                target: SESSION_TARGET,
                pid = child.id(),
                "session dropped without exit, killing debugger"
            );
            reap(&mut child);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

//! Error types for debugger sessions.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use gdbmi_syntax::{ParseError, ResultRecord};
use nix::errno::Errno;
use thiserror::Error;

/// Errors raised while driving a debugger session.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The debugger process could not be started.
    #[error("failed to start debugger '{command}': {source}")]
    Spawn {
        /// The executable that was launched.
        command: String,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// Reading from or writing to the debugger failed.
    #[error("transport {action} failed: {source}")]
    Transport {
        /// What the session was doing when the pipe failed.
        action: &'static str,
        /// The underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// The reply to a command could not be reduced by the grammar.
    #[error("malformed reply '{line}': {source}")]
    Parse {
        /// The raw line as received.
        line: String,
        /// Why the grammar rejected it.
        #[source]
        source: ParseError,
    },

    /// The debugger answered a checked command with an `error` record.
    #[error("debugger error: {message}")]
    Command {
        /// Message extracted from the reply.
        message: String,
        /// The full reply.
        record: Box<ResultRecord>,
    },

    /// The reply stream ended before the command was answered, or the
    /// session had already ended when the command was issued.
    #[error("debugger session closed: {reason}")]
    SessionClosed {
        /// Why the session ended.
        reason: String,
    },

    /// No reply arrived before the caller's deadline.
    #[error("no reply to '{operation}' (sequence {sequence}) within {timeout:?}")]
    Timeout {
        /// Operation that was sent.
        operation: String,
        /// Sequence tag the command was sent with.
        sequence: String,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// The operation name cannot be written on the wire.
    #[error("invalid operation name '{operation}'")]
    InvalidOperation {
        /// The rejected name.
        operation: String,
    },

    /// The session is not backed by a child process.
    #[error("session has no debugger process")]
    NoProcess,

    /// Delivering a signal to the debugger failed.
    #[error("failed to signal debugger process {pid}: {source}")]
    Signal {
        /// Process the signal was aimed at.
        pid: u32,
        /// The OS error.
        #[source]
        source: Errno,
    },

    /// The record reader thread panicked.
    #[error("record reader thread panicked")]
    ReaderPanicked,
}

impl ClientError {
    pub(crate) fn transport(action: &'static str, source: io::Error) -> Self {
        Self::Transport {
            action,
            source: Arc::new(source),
        }
    }

    pub(crate) fn closed(reason: impl Into<String>) -> Self {
        Self::SessionClosed {
            reason: reason.into(),
        }
    }

    pub(crate) fn command(record: ResultRecord) -> Self {
        Self::Command {
            message: record.error_message(),
            record: Box::new(record),
        }
    }

    /// Message of a [`ClientError::Command`] reply.
    #[must_use]
    pub fn command_message(&self) -> Option<&str> {
        match self {
            Self::Command { message, .. } => Some(message),
            _ => None,
        }
    }
}

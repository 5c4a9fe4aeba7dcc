//! The background record reader.
//!
//! One thread per session reads the debugger's output line by line, parses
//! each line and routes the record: tagged results go to the caller waiting
//! on that sequence, everything else goes to the notification callback in
//! read order. When the stream ends, or the thread unwinds out of a
//! notification callback, the reader closes the correlator so no caller
//! stays blocked.

use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use gdbmi_syntax::{
    ParseError, Record, ResultRecord, is_terminator, leading_sequence, parse_record,
};
use tracing::{debug, trace, warn};

use crate::correlation::Correlator;
use crate::error::ClientError;

/// Log target for the reader thread.
pub(crate) const READER_TARGET: &str = "gdbmi_client::reader";

/// Name given to the reader thread.
pub(crate) const READER_THREAD_NAME: &str = "gdbmi-reader";

/// Close reason recorded when the reader thread unwinds.
pub(crate) const READER_PANICKED_REASON: &str = "record reader panicked";

/// Receives every record that is not a reply to a command.
///
/// The callback runs on the reader thread. While it runs no reply can be
/// delivered, so slow work belongs on another thread; it must never wait on
/// a reply from the same session.
pub type NotificationCallback = Box<dyn FnMut(Record) + Send>;

/// A callback that forwards notifications into a channel.
///
/// Useful when the consumer prefers pulling records over being called.
#[must_use]
pub fn notification_channel() -> (NotificationCallback, Receiver<Record>) {
    let (sender, receiver) = mpsc::channel();
    let callback: NotificationCallback = Box::new(move |record| {
        if sender.send(record).is_err() {
            trace!(target: READER_TARGET, "notification receiver dropped");
        }
    });
    (callback, receiver)
}

/// Why the reader stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderExit {
    /// The debugger closed its output.
    EndOfStream,
    /// Reading failed with the given message.
    ReadFailed(String),
}

impl fmt::Display for ReaderExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => f.write_str("debugger output ended"),
            Self::ReadFailed(message) => write!(f, "reading debugger output failed: {message}"),
        }
    }
}

/// Join handle for a running reader.
pub(crate) struct ReaderHandle {
    thread: JoinHandle<ReaderExit>,
}

impl ReaderHandle {
    /// Waits for the reader to observe the end of the stream.
    pub(crate) fn join(self) -> Result<ReaderExit, ClientError> {
        self.thread.join().map_err(|_| ClientError::ReaderPanicked)
    }
}

/// Starts the reader thread over `source`.
pub(crate) fn spawn_reader<R>(
    source: R,
    correlator: Arc<Correlator>,
    callback: Option<NotificationCallback>,
) -> Result<ReaderHandle, ClientError>
where
    R: Read + Send + 'static,
{
    let thread = thread::Builder::new()
        .name(READER_THREAD_NAME.to_owned())
        .spawn(move || {
            let _release = ReleaseOnUnwind(Arc::clone(&correlator));
            let mut reader = RecordReader {
                correlator,
                callback,
            };
            reader.run(BufReader::new(source))
        })
        .map_err(|error| ClientError::transport("start reader", error))?;
    Ok(ReaderHandle { thread })
}

/// Closes the correlator if the reader thread unwinds, typically out of a
/// panicking notification callback.
struct ReleaseOnUnwind(Arc<Correlator>);

impl Drop for ReleaseOnUnwind {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let released = self.0.close(READER_PANICKED_REASON);
        warn!(
            target: READER_TARGET,
            released,
            "record reader panicked; session closed"
        );
    }
}

struct RecordReader {
    correlator: Arc<Correlator>,
    callback: Option<NotificationCallback>,
}

impl RecordReader {
    fn run(&mut self, mut source: impl BufRead) -> ReaderExit {
        let mut buffer = Vec::new();
        let exit = loop {
            buffer.clear();
            match source.read_until(b'\n', &mut buffer) {
                Ok(0) => break ReaderExit::EndOfStream,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer);
                    self.handle_line(line.trim_end_matches(['\n', '\r']));
                }
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => break ReaderExit::ReadFailed(error.to_string()),
            }
        };

        let released = self.correlator.close(&exit.to_string());
        debug!(
            target: READER_TARGET,
            reason = %exit,
            released,
            "record reader stopped"
        );
        exit
    }

    fn handle_line(&mut self, line: &str) {
        if line.trim().is_empty() || is_terminator(line) {
            return;
        }
        trace!(target: READER_TARGET, line, "line received");

        match parse_record(line) {
            Ok(Record::Result(result)) => self.route_result(result),
            Ok(record) => self.notify(record),
            Err(error) => self.reject(line, error),
        }
    }

    fn route_result(&mut self, mut result: ResultRecord) {
        let Some(sequence) = result.take_sequence() else {
            // Untagged results are not replies to anything this session sent.
            self.notify(Record::Result(result));
            return;
        };
        self.deliver(&sequence, Record::Result(result));
    }

    fn deliver(&self, sequence: &str, record: Record) {
        if let Err(record) = self.correlator.complete(sequence, record) {
            warn!(
                target: READER_TARGET,
                sequence,
                class = record.class().unwrap_or_default(),
                "reply matches no pending command"
            );
        }
    }

    fn notify(&mut self, record: Record) {
        let Some(callback) = self.callback.as_mut() else {
            trace!(
                target: READER_TARGET,
                kind = %record.kind(),
                "no notification callback registered; record dropped"
            );
            return;
        };
        callback(record);
    }

    fn reject(&self, line: &str, error: ParseError) {
        warn!(
            target: READER_TARGET,
            line,
            error = %error,
            "line rejected by the grammar"
        );
        if let Some(sequence) = leading_sequence(line) {
            let failure = ClientError::Parse {
                line: line.to_owned(),
                source: error,
            };
            if !self.correlator.fail(sequence, failure) {
                warn!(
                    target: READER_TARGET,
                    sequence,
                    "malformed reply matches no pending command"
                );
            }
        }
    }
}

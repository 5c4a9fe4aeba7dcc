//! Sequence allocation and reply routing.
//!
//! The [`Correlator`] owns every piece of shared mutable state in a session:
//! the next sequence number and the table of callers waiting for a reply sit
//! behind one mutex, the write half of the transport behind a second.
//!
//! The writer lock is only taken while the table lock is held, and the table
//! lock is released before the bytes go out. Commands therefore reach the
//! debugger in sequence order without interleaving, and a write stuck on a
//! full pipe never keeps the reader from delivering replies.

use std::collections::HashMap;
use std::io::Write;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use gdbmi_syntax::Record;
use tracing::{debug, trace};

use crate::command::format_command;
use crate::error::ClientError;

/// Log target for correlation.
pub(crate) const CORRELATION_TARGET: &str = "gdbmi_client::correlation";

/// What a waiting caller eventually receives.
pub(crate) type Delivery = Result<Record, ClientError>;

struct Table {
    next_sequence: u64,
    pending: HashMap<String, SyncSender<Delivery>>,
    closed: Option<String>,
}

/// Matches replies to the callers that issued the commands.
pub(crate) struct Correlator {
    table: Mutex<Table>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Correlator {
    pub(crate) fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            table: Mutex::new(Table {
                next_sequence: 1,
                pending: HashMap::new(),
                closed: None,
            }),
            writer: Mutex::new(writer),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table> {
        recover(&self.table)
    }

    /// Registers a slot for the next sequence and writes the command.
    ///
    /// On a write failure the slot is removed again before returning, so a
    /// failed dispatch never leaves an orphaned entry behind.
    pub(crate) fn dispatch(
        &self,
        operation: &str,
        arguments: &[&str],
    ) -> Result<Ticket, ClientError> {
        let mut table = self.lock();
        if let Some(reason) = &table.closed {
            return Err(ClientError::closed(reason.clone()));
        }

        let sequence = table.next_sequence.to_string();
        let line = format_command(&sequence, operation, arguments)?;
        table.next_sequence += 1;

        let (sender, receiver) = mpsc::sync_channel(1);
        table.pending.insert(sequence.clone(), sender);
        let pending = table.pending.len();

        let mut writer = recover(&self.writer);
        drop(table);
        let written = writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush());
        drop(writer);
        if let Err(error) = written {
            self.abandon(&sequence);
            return Err(ClientError::transport("write", error));
        }

        debug!(
            target: CORRELATION_TARGET,
            sequence = %sequence,
            operation,
            pending,
            "command dispatched"
        );

        Ok(Ticket {
            sequence,
            operation: operation.to_owned(),
            receiver,
        })
    }

    /// Hands a reply to the caller waiting on `sequence`.
    ///
    /// Returns the record back when nobody is waiting for it.
    pub(crate) fn complete(&self, sequence: &str, record: Record) -> Result<(), Record> {
        let Some(sender) = self.lock().pending.remove(sequence) else {
            return Err(record);
        };
        if sender.send(Ok(record)).is_err() {
            trace!(
                target: CORRELATION_TARGET,
                sequence,
                "caller stopped waiting before the reply arrived"
            );
        }
        Ok(())
    }

    /// Fails the caller waiting on `sequence`. Returns whether one existed.
    pub(crate) fn fail(&self, sequence: &str, error: ClientError) -> bool {
        let Some(sender) = self.lock().pending.remove(sequence) else {
            return false;
        };
        // The receiver may already be gone after a timeout.
        drop(sender.send(Err(error)));
        true
    }

    /// Removes a slot whose caller gave up.
    pub(crate) fn abandon(&self, sequence: &str) {
        self.lock().pending.remove(sequence);
    }

    /// Marks the session closed and releases every waiting caller.
    ///
    /// Returns how many callers were released.
    pub(crate) fn close(&self, reason: &str) -> usize {
        let drained: Vec<_> = {
            let mut table = self.lock();
            table.closed.get_or_insert_with(|| reason.to_owned());
            table.pending.drain().collect()
        };
        let released = drained.len();
        for (sequence, sender) in drained {
            trace!(
                target: CORRELATION_TARGET,
                sequence = %sequence,
                "releasing pending caller"
            );
            drop(sender.send(Err(ClientError::closed(reason))));
        }
        released
    }

    /// Whether [`Correlator::close`] has run.
    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }

    /// Number of callers currently waiting.
    pub(crate) fn pending(&self) -> usize {
        self.lock().pending.len()
    }
}

fn recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking sender must not wedge every other caller.
    mutex.lock().unwrap_or_else(|poison| poison.into_inner())
}

/// A dispatched command whose reply has not been collected yet.
pub(crate) struct Ticket {
    sequence: String,
    operation: String,
    receiver: Receiver<Delivery>,
}

impl Ticket {
    /// Blocks until the reply or a session-closed error arrives.
    pub(crate) fn wait(self) -> Delivery {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(ClientError::closed("reply slot dropped")))
    }

    /// Blocks for at most `timeout`, abandoning the slot when it elapses.
    pub(crate) fn wait_timeout(self, correlator: &Correlator, timeout: Duration) -> Delivery {
        match self.receiver.recv_timeout(timeout) {
            Ok(delivery) => delivery,
            Err(RecvTimeoutError::Disconnected) => {
                Err(ClientError::closed("reply slot dropped"))
            }
            Err(RecvTimeoutError::Timeout) => {
                correlator.abandon(&self.sequence);
                // The reply may have raced the deadline.
                self.receiver.try_recv().unwrap_or_else(|_| {
                    Err(ClientError::Timeout {
                        operation: self.operation,
                        sequence: self.sequence,
                        timeout,
                    })
                })
            }
        }
    }

    /// Sequence tag the command was written with.
    pub(crate) fn sequence(&self) -> &str {
        &self.sequence
    }
}

//! A scripted stand-in for the debugger, wired to a session through pipes.

use std::io::{self, BufRead, BufReader, PipeReader, PipeWriter, Write};

use crate::{GdbSession, NotificationCallback};

/// The debugger side of a pair of pipes.
///
/// Reads the commands a session writes and writes whatever output the test
/// scripts. Dropping it, or calling [`FakeDebugger::hang_up`], ends the
/// session's output stream.
pub struct FakeDebugger {
    commands: BufReader<PipeReader>,
    output: Option<PipeWriter>,
}

/// A command as it arrived on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireCommand {
    pub sequence: String,
    pub operation: String,
    pub line: String,
}

impl FakeDebugger {
    /// Blocks until the next command line arrives.
    pub fn read_command(&mut self) -> WireCommand {
        let mut raw = String::new();
        let read = self.commands.read_line(&mut raw).expect("read command");
        assert!(read > 0, "session closed its command stream");
        let line = raw.trim_end_matches('\n');
        let (sequence, rest) = line.split_once('-').expect("tagged command");
        let operation = rest.split(' ').next().unwrap_or_default();
        WireCommand {
            sequence: sequence.to_owned(),
            operation: operation.to_owned(),
            line: line.to_owned(),
        }
    }

    /// Writes one line of debugger output.
    pub fn emit(&mut self, line: &str) {
        let output = self.output.as_mut().expect("debugger already hung up");
        writeln!(output, "{line}").expect("write output");
        output.flush().expect("flush output");
    }

    /// Answers `command` with `reply`, prefixed by the command's sequence.
    pub fn answer(&mut self, command: &WireCommand, reply: &str) {
        self.emit(&format!("{}{reply}", command.sequence));
    }

    /// Closes the output stream, as a debugger that exits does.
    pub fn hang_up(&mut self) {
        self.output = None;
    }
}

/// Builds a session over pipes to a fresh [`FakeDebugger`].
pub fn connect(callback: Option<NotificationCallback>) -> (GdbSession, FakeDebugger) {
    let (command_reader, command_writer) = io::pipe().expect("command pipe");
    let (output_reader, output_writer) = io::pipe().expect("output pipe");
    let session =
        GdbSession::from_transport(output_reader, command_writer, callback).expect("session");
    let fake = FakeDebugger {
        commands: BufReader::new(command_reader),
        output: Some(output_writer),
    };
    (session, fake)
}

//! Client for debuggers speaking the GDB/MI line protocol.
//!
//! A [`GdbSession`] owns one debugger process. Commands are written with a
//! numeric sequence tag; a background reader thread parses every output line
//! with [`gdbmi_syntax`] and hands tagged replies back to the thread that
//! sent the command. Everything else (exec, status and notify records,
//! console/target/log streams and untagged results) goes to an optional
//! [`NotificationCallback`] in the order it was read.
//!
//! ```no_run
//! use gdbmi_client::{GdbConfig, GdbSession, notification_channel};
//!
//! let (callback, notifications) = notification_channel();
//! let session = GdbSession::spawn(&GdbConfig::default(), Some(callback))?;
//! session.checked_send("file-exec-and-symbols", &["./a.out"])?;
//! session.checked_send("exec-run", &[])?;
//! for record in notifications.iter() {
//!     if record.class() == Some("stopped") {
//!         break;
//!     }
//! }
//! session.exit()?;
//! # Ok::<(), gdbmi_client::ClientError>(())
//! ```

mod command;
mod config;
mod correlation;
pub mod defaults;
mod error;
mod process;
mod reader;
mod session;
pub mod telemetry;

pub use command::{format_command, quote_argument};
pub use config::GdbConfig;
pub use error::ClientError;
pub use gdbmi_syntax::{Record, RecordKind, ResultRecord, Tuple, Value};
pub use reader::{NotificationCallback, ReaderExit, notification_channel};
pub use session::GdbSession;
pub use telemetry::{
    LogFormat, LogFormatParseError, TelemetryConfig, TelemetryError, TelemetryHandle,
};

#[cfg(test)]
mod tests;

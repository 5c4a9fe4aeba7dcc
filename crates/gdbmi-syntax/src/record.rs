//! Classified protocol records.

use serde::{Serialize, Serializer};
use strum::{Display, EnumString};

use crate::value::Tuple;

/// Class carried by a failed command's result record.
pub const ERROR_CLASS: &str = "error";

/// Discriminant shared by every record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// `^` reply to a command.
    Result,
    /// `*` change in the target's execution state.
    Exec,
    /// `+` progress of a slow operation.
    Status,
    /// `=` supplementary information.
    Notify,
    /// `~` console output.
    Console,
    /// `@` output of the target program.
    Target,
    /// `&` debugger log output.
    Log,
}

/// One parsed protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A reply, possibly tagged with the sequence of the command it answers.
    Result(ResultRecord),
    /// An out-of-band exec, status or notify record.
    Async(AsyncRecord),
    /// Console, target or log text.
    Stream(StreamRecord),
}

impl Record {
    /// The record's discriminant.
    #[must_use]
    pub const fn kind(&self) -> RecordKind {
        match self {
            Self::Result(_) => RecordKind::Result,
            Self::Async(record) => record.kind.record_kind(),
            Self::Stream(record) => record.kind.record_kind(),
        }
    }

    /// Class of a result or async record.
    #[must_use]
    pub fn class(&self) -> Option<&str> {
        match self {
            Self::Result(record) => Some(&record.class),
            Self::Async(record) => Some(&record.class),
            Self::Stream(_) => None,
        }
    }

    /// Tuple payload of a result or async record.
    #[must_use]
    pub const fn payload(&self) -> Option<&Tuple> {
        match self {
            Self::Result(record) => record.payload.as_ref(),
            Self::Async(record) => record.payload.as_ref(),
            Self::Stream(_) => None,
        }
    }

    /// Text of a stream record.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Stream(record) => Some(&record.text),
            Self::Result(_) | Self::Async(_) => None,
        }
    }

    /// Sequence tag of a result record that has not yet been correlated.
    #[must_use]
    pub fn sequence(&self) -> Option<&str> {
        match self {
            Self::Result(record) => record.sequence.as_deref(),
            Self::Async(_) | Self::Stream(_) => None,
        }
    }

    /// Borrows the inner result record.
    #[must_use]
    pub const fn as_result(&self) -> Option<&ResultRecord> {
        match self {
            Self::Result(record) => Some(record),
            Self::Async(_) | Self::Stream(_) => None,
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = match self {
            Self::Stream(record) => Some(PayloadView::Text(&record.text)),
            Self::Result(_) | Self::Async(_) => self.payload().map(PayloadView::Tuple),
        };
        RecordView {
            kind: self.kind(),
            class: self.class(),
            payload,
        }
        .serialize(serializer)
    }
}

#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(rename = "type")]
    kind: RecordKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    class: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<PayloadView<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum PayloadView<'a> {
    Tuple(&'a Tuple),
    Text(&'a str),
}

/// A `^class[,fields]` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRecord {
    /// Decimal sequence tag copied from the command this answers. Present
    /// only until the record is correlated.
    pub sequence: Option<String>,
    /// Result class, e.g. `done`, `running`, `error`.
    pub class: String,
    /// Optional fields following the class.
    pub payload: Option<Tuple>,
}

impl ResultRecord {
    /// Builds an untagged result record.
    #[must_use]
    pub fn new(class: impl Into<String>, payload: Option<Tuple>) -> Self {
        Self {
            sequence: None,
            class: class.into(),
            payload,
        }
    }

    /// Attaches a sequence tag.
    #[must_use]
    pub fn with_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.sequence = Some(sequence.into());
        self
    }

    /// Removes and returns the sequence tag.
    pub fn take_sequence(&mut self) -> Option<String> {
        self.sequence.take()
    }

    /// Whether the class is `error`.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.class == ERROR_CLASS
    }

    /// Human-readable message for an error reply.
    ///
    /// Uses the `msg` field when it is a string and otherwise renders the
    /// whole payload.
    #[must_use]
    pub fn error_message(&self) -> String {
        if let Some(message) = self.payload.as_ref().and_then(|payload| payload.get_str("msg")) {
            return message.to_owned();
        }
        self.payload.as_ref().map_or_else(
            || String::from("unknown debugger error"),
            |payload| format!("unknown debugger error: {payload}"),
        )
    }
}

/// Flavour of an async record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncKind {
    /// `*`
    Exec,
    /// `+`
    Status,
    /// `=`
    Notify,
}

impl AsyncKind {
    const fn record_kind(self) -> RecordKind {
        match self {
            Self::Exec => RecordKind::Exec,
            Self::Status => RecordKind::Status,
            Self::Notify => RecordKind::Notify,
        }
    }
}

/// An out-of-band `*`, `+` or `=` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncRecord {
    /// Which async channel the record arrived on.
    pub kind: AsyncKind,
    /// Record class, e.g. `stopped`, `thread-group-added`.
    pub class: String,
    /// Optional fields following the class.
    pub payload: Option<Tuple>,
}

/// Flavour of a stream record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    /// `~`
    Console,
    /// `@`
    Target,
    /// `&`
    Log,
}

impl StreamKind {
    const fn record_kind(self) -> RecordKind {
        match self {
            Self::Console => RecordKind::Console,
            Self::Target => RecordKind::Target,
            Self::Log => RecordKind::Log,
        }
    }
}

/// A `~`, `@` or `&` text record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// Which stream the text belongs to.
    pub kind: StreamKind,
    /// Escape-decoded text.
    pub text: String,
}

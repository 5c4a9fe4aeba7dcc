//! Grammar for the GDB/MI line protocol.
//!
//! This crate turns a single line of debugger output into a [`Record`]:
//!
//! - the lexer ([`tokenize`]) splits a line into bare text, quoted text and
//!   structural punctuation and never fails;
//! - the parser ([`parse_record`]) reduces the tokens to a result, async or
//!   stream record whose payload is a generic [`Value`] tree.
//!
//! It knows nothing about processes, threads or command correlation; those
//! live in `gdbmi-client`.
//!
//! # Example
//!
//! ```
//! use gdbmi_syntax::{RecordKind, parse_record};
//!
//! let record = parse_record(r#"1^done,value="5""#)?;
//! assert_eq!(record.kind(), RecordKind::Result);
//! assert_eq!(record.sequence(), Some("1"));
//! assert_eq!(record.payload().and_then(|p| p.get_str("value")), Some("5"));
//! # Ok::<(), gdbmi_syntax::ParseError>(())
//! ```

mod error;
mod lexer;
mod parser;
mod record;
mod value;

pub use error::ParseError;
pub use lexer::{Punct, Token, tokenize};
pub use parser::{TERMINATOR, is_terminator, leading_sequence, parse_record};
pub use record::{
    AsyncKind, AsyncRecord, ERROR_CLASS, Record, RecordKind, ResultRecord, StreamKind,
    StreamRecord,
};
pub use value::{Tuple, Value};

#[cfg(test)]
mod tests;

//! Formatting of outgoing command lines.
//!
//! A command is written as `SEQ-OPERATION[ ARG]*\n`. Arguments are quoted
//! only when they must be: the debugger reads `5` and `"5"`, or `--thread`
//! and `"--thread"`, differently, so plain numbers and flags stay bare.

use crate::error::ClientError;

/// Builds the wire form of a command, including the trailing newline.
///
/// # Errors
///
/// Returns [`ClientError::InvalidOperation`] when the operation name is empty
/// or contains whitespace or control characters.
pub fn format_command(
    sequence: &str,
    operation: &str,
    arguments: &[&str],
) -> Result<String, ClientError> {
    if operation.is_empty()
        || operation
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '"')
    {
        return Err(ClientError::InvalidOperation {
            operation: operation.to_owned(),
        });
    }

    let mut line = format!("{sequence}-{operation}");
    for argument in arguments {
        line.push(' ');
        line.push_str(&quote_argument(argument));
    }
    line.push('\n');
    Ok(line)
}

/// Quotes an argument if it contains anything the debugger would split on
/// or misread; otherwise returns it unchanged.
#[must_use]
pub fn quote_argument(argument: &str) -> String {
    if !needs_quoting(argument) {
        return argument.to_owned();
    }

    let mut quoted = String::with_capacity(argument.len() + 2);
    quoted.push('"');
    for c in argument.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\u{07}' => quoted.push_str("\\a"),
            '\u{08}' => quoted.push_str("\\b"),
            '\u{0c}' => quoted.push_str("\\f"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\u{0b}' => quoted.push_str("\\v"),
            c if c.is_ascii_control() => quoted.push_str(&format!("\\{:03o}", u32::from(c))),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn needs_quoting(argument: &str) -> bool {
    argument.is_empty()
        || argument
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '\\'))
}

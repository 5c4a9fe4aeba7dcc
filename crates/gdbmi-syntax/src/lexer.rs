//! Tokeniser for a single protocol line.
//!
//! The lexer is a three-state machine (`Normal`, `InQuotation`, `InEscape`)
//! that never fails: any input yields some token stream, and it is up to the
//! grammar to decide whether that stream forms a record.

use std::fmt;

/// Structural punctuation recognised outside quoted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    /// `^` result record marker.
    Caret,
    /// `*` exec async marker.
    Star,
    /// `+` status async marker.
    Plus,
    /// `=` notify marker, also the field separator.
    Equals,
    /// `~` console stream marker.
    Tilde,
    /// `@` target stream marker.
    At,
    /// `&` log stream marker.
    Ampersand,
    /// `,` separator.
    Comma,
    /// `{` tuple opener.
    OpenBrace,
    /// `}` tuple closer.
    CloseBrace,
    /// `[` list opener.
    OpenBracket,
    /// `]` list closer.
    CloseBracket,
}

impl Punct {
    /// Maps a character to its structural token, if it is one.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        let punct = match c {
            '^' => Self::Caret,
            '*' => Self::Star,
            '+' => Self::Plus,
            '=' => Self::Equals,
            '~' => Self::Tilde,
            '@' => Self::At,
            '&' => Self::Ampersand,
            ',' => Self::Comma,
            '{' => Self::OpenBrace,
            '}' => Self::CloseBrace,
            '[' => Self::OpenBracket,
            ']' => Self::CloseBracket,
            _ => return None,
        };
        Some(punct)
    }

    /// The character this token was lexed from.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Caret => '^',
            Self::Star => '*',
            Self::Plus => '+',
            Self::Equals => '=',
            Self::Tilde => '~',
            Self::At => '@',
            Self::Ampersand => '&',
            Self::Comma => ',',
            Self::OpenBrace => '{',
            Self::CloseBrace => '}',
            Self::OpenBracket => '[',
            Self::CloseBracket => ']',
        }
    }
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Unquoted text between structural characters.
    Bare(String),
    /// The decoded contents of a `"..."` string.
    Quoted(String),
    /// A structural character.
    Punct(Punct),
}

impl Token {
    /// Text carried by a bare or quoted token.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Bare(text) | Self::Quoted(text) => Some(text),
            Self::Punct(_) => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(text) => write!(formatter, "'{text}'"),
            Self::Quoted(text) => write!(formatter, "{text:?}"),
            Self::Punct(punct) => write!(formatter, "'{}'", punct.as_char()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InQuotation,
    InEscape,
}

/// Splits one protocol line into tokens.
///
/// Structural characters end any pending bare text, a `"` opens a quoted
/// string whose escapes are decoded in place, and the end of input flushes
/// whatever bare text remains. An unterminated quotation is flushed as a
/// quoted token so the grammar still sees the text.
#[must_use]
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut buffer = String::new();
    let mut state = State::Normal;

    for c in line.chars() {
        match state {
            State::Normal => {
                if let Some(punct) = Punct::from_char(c) {
                    flush_bare(&mut buffer, &mut tokens);
                    tokens.push(Token::Punct(punct));
                } else if c == '"' {
                    flush_bare(&mut buffer, &mut tokens);
                    state = State::InQuotation;
                } else {
                    buffer.push(c);
                }
            }
            State::InQuotation => match c {
                '"' => {
                    tokens.push(Token::Quoted(std::mem::take(&mut buffer)));
                    state = State::Normal;
                }
                '\\' => state = State::InEscape,
                other => buffer.push(other),
            },
            State::InEscape => {
                buffer.push(unescape(c));
                state = State::InQuotation;
            }
        }
    }

    match state {
        State::Normal => flush_bare(&mut buffer, &mut tokens),
        State::InQuotation | State::InEscape => tokens.push(Token::Quoted(buffer)),
    }
    tokens
}

fn flush_bare(buffer: &mut String, tokens: &mut Vec<Token>) {
    if !buffer.is_empty() {
        tokens.push(Token::Bare(std::mem::take(buffer)));
    }
}

/// Maps the character following a backslash to the character it denotes.
///
/// Unknown escapes pass through unchanged.
const fn unescape(c: char) -> char {
    match c {
        'a' => '\u{07}',
        'b' => '\u{08}',
        'f' => '\u{0c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\u{0b}',
        other => other,
    }
}

//! Recursive-descent grammar over the lexer's token stream.
//!
//! ```text
//! record   := [digits] '^' body
//!           | [digits] ('*' | '+' | '=') body
//!           | ('~' | '@' | '&') quoted
//! body     := class [',' fields]
//! fields   := field (',' field)*
//! field    := text '=' value
//! value    := text | '{' '}' | '{' fields '}'
//!           | '[' ']' | '[' fields ']' | '[' value (',' value)* ']'
//! ```
//!
//! A leading digit sequence is kept only on result records, where it is
//! the sequence tag used for correlation.

use std::collections::VecDeque;

use crate::error::ParseError;
use crate::lexer::{Punct, Token, tokenize};
use crate::record::{AsyncKind, AsyncRecord, Record, ResultRecord, StreamKind, StreamRecord};
use crate::value::{Tuple, Value};

/// The prompt line the debugger prints when it is ready for a command.
pub const TERMINATOR: &str = "(gdb) ";

/// Whether a line is the ready prompt rather than a record.
///
/// The trailing space is optional so that lines trimmed by a transport still
/// match.
#[must_use]
pub fn is_terminator(line: &str) -> bool {
    line.trim_end() == TERMINATOR.trim_end()
}

/// Extracts the sequence tag of a result line without parsing the rest of it.
///
/// Used to route a grammar failure to the caller that is waiting for the
/// line.
#[must_use]
pub fn leading_sequence(line: &str) -> Option<&str> {
    let end = line.find(|c: char| !c.is_ascii_digit())?;
    let digits = line.get(..end)?;
    let rest = line.get(end..)?;
    (!digits.is_empty() && rest.starts_with('^')).then_some(digits)
}

/// Parses one protocol line into a record.
///
/// # Errors
///
/// Returns a [`ParseError`] when the line is empty or its tokens cannot be
/// reduced by the grammar.
pub fn parse_record(line: &str) -> Result<Record, ParseError> {
    let mut parser = Parser::new(tokenize(line));
    let record = parser.record()?;
    parser.finish()?;
    Ok(record)
}

struct Parser {
    tokens: VecDeque<Token>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    fn record(&mut self) -> Result<Record, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        let sequence = if matches!(self.tokens.front(), Some(Token::Bare(_))) {
            Some(self.sequence()?)
        } else {
            None
        };

        match self.punct("record marker")? {
            Punct::Caret => {
                let (class, payload) = self.body()?;
                Ok(Record::Result(ResultRecord {
                    sequence,
                    class,
                    payload,
                }))
            }
            Punct::Star => self.async_record(AsyncKind::Exec),
            Punct::Plus => self.async_record(AsyncKind::Status),
            Punct::Equals => self.async_record(AsyncKind::Notify),
            Punct::Tilde if sequence.is_none() => self.stream_record(StreamKind::Console),
            Punct::At if sequence.is_none() => self.stream_record(StreamKind::Target),
            Punct::Ampersand if sequence.is_none() => self.stream_record(StreamKind::Log),
            other => Err(ParseError::unexpected(
                "record marker",
                Token::Punct(other).to_string(),
            )),
        }
    }

    fn sequence(&mut self) -> Result<String, ParseError> {
        let digits = self.text("sequence tag")?;
        if digits.chars().all(|c| c.is_ascii_digit()) {
            Ok(digits)
        } else {
            Err(ParseError::InvalidSequence { token: digits })
        }
    }

    fn async_record(&mut self, kind: AsyncKind) -> Result<Record, ParseError> {
        let (class, payload) = self.body()?;
        Ok(Record::Async(AsyncRecord {
            kind,
            class,
            payload,
        }))
    }

    fn stream_record(&mut self, kind: StreamKind) -> Result<Record, ParseError> {
        match self.tokens.pop_front() {
            Some(Token::Quoted(text)) => Ok(Record::Stream(StreamRecord { kind, text })),
            Some(other) => Err(ParseError::unexpected("quoted string", other.to_string())),
            None => Err(ParseError::end("quoted string")),
        }
    }

    fn body(&mut self) -> Result<(String, Option<Tuple>), ParseError> {
        let class = self.text("record class")?;
        if self.eat(Punct::Comma) {
            Ok((class, Some(self.fields()?)))
        } else {
            Ok((class, None))
        }
    }

    fn fields(&mut self) -> Result<Tuple, ParseError> {
        let mut tuple = Tuple::new();
        loop {
            let (name, value) = self.field()?;
            tuple.insert(name, value);
            if !self.eat(Punct::Comma) {
                return Ok(tuple);
            }
        }
    }

    fn field(&mut self) -> Result<(String, Value), ParseError> {
        let name = self.text("field name")?;
        self.expect(Punct::Equals, "'='")?;
        let value = self.value()?;
        Ok((name, value))
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.tokens.pop_front() {
            Some(Token::Bare(text) | Token::Quoted(text)) => Ok(Value::String(text)),
            Some(Token::Punct(Punct::OpenBrace)) => self.tuple().map(Value::Tuple),
            Some(Token::Punct(Punct::OpenBracket)) => self.list().map(Value::List),
            Some(other) => Err(ParseError::unexpected("value", other.to_string())),
            None => Err(ParseError::end("value")),
        }
    }

    fn tuple(&mut self) -> Result<Tuple, ParseError> {
        if self.eat(Punct::CloseBrace) {
            return Ok(Tuple::new());
        }
        let tuple = self.fields()?;
        self.expect(Punct::CloseBrace, "'}'")?;
        Ok(tuple)
    }

    fn list(&mut self) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        if self.eat(Punct::CloseBracket) {
            return Ok(items);
        }
        let of_results = self.at_field();
        loop {
            let item = if of_results {
                let (name, value) = self.field()?;
                let mut single = Tuple::new();
                single.insert(name, value);
                Value::Tuple(single)
            } else {
                self.value()?
            };
            items.push(item);
            if !self.eat(Punct::Comma) {
                break;
            }
        }
        self.expect(Punct::CloseBracket, "']'")?;
        Ok(items)
    }

    /// Whether the next two tokens open a `name=value` field.
    fn at_field(&self) -> bool {
        matches!(
            (self.tokens.front(), self.tokens.get(1)),
            (
                Some(Token::Bare(_) | Token::Quoted(_)),
                Some(Token::Punct(Punct::Equals))
            )
        )
    }

    fn text(&mut self, expected: &'static str) -> Result<String, ParseError> {
        match self.tokens.pop_front() {
            Some(Token::Bare(text) | Token::Quoted(text)) => Ok(text),
            Some(other) => Err(ParseError::unexpected(expected, other.to_string())),
            None => Err(ParseError::end(expected)),
        }
    }

    fn punct(&mut self, expected: &'static str) -> Result<Punct, ParseError> {
        match self.tokens.pop_front() {
            Some(Token::Punct(punct)) => Ok(punct),
            Some(other) => Err(ParseError::unexpected(expected, other.to_string())),
            None => Err(ParseError::end(expected)),
        }
    }

    fn expect(&mut self, punct: Punct, expected: &'static str) -> Result<(), ParseError> {
        match self.punct(expected)? {
            found if found == punct => Ok(()),
            found => Err(ParseError::unexpected(
                expected,
                Token::Punct(found).to_string(),
            )),
        }
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.tokens.front() == Some(&Token::Punct(punct)) {
            self.tokens.pop_front();
            true
        } else {
            false
        }
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        self.tokens.pop_front().map_or(Ok(()), |extra| {
            Err(ParseError::unexpected("end of line", extra.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::record::RecordKind;

    fn payload(record: &Record) -> &Tuple {
        record.payload().expect("payload present")
    }

    #[rstest]
    fn parses_tagged_result() {
        let record = parse_record(r#"1^done,value="5""#).expect("parse");

        assert_eq!(record.kind(), RecordKind::Result);
        assert_eq!(record.sequence(), Some("1"));
        assert_eq!(record.class(), Some("done"));
        assert_eq!(payload(&record).get_str("value"), Some("5"));
    }

    #[rstest]
    fn parses_untagged_result_without_payload() {
        let record = parse_record("^running").expect("parse");

        assert_eq!(record.kind(), RecordKind::Result);
        assert_eq!(record.sequence(), None);
        assert_eq!(record.class(), Some("running"));
        assert!(record.payload().is_none());
    }

    #[rstest]
    #[case("*stopped,reason=\"breakpoint-hit\"", RecordKind::Exec, "stopped")]
    #[case("+download,section=\".text\"", RecordKind::Status, "download")]
    #[case("=thread-group-added,id=\"i1\"", RecordKind::Notify, "thread-group-added")]
    #[case("12*running,thread-id=\"all\"", RecordKind::Exec, "running")]
    fn parses_async_records(#[case] line: &str, #[case] kind: RecordKind, #[case] class: &str) {
        let record = parse_record(line).expect("parse");

        assert_eq!(record.kind(), kind);
        assert_eq!(record.class(), Some(class));
        assert_eq!(record.sequence(), None);
    }

    #[rstest]
    #[case(r#"~"Hello\n""#, RecordKind::Console, "Hello\n")]
    #[case(r#"@"target out""#, RecordKind::Target, "target out")]
    #[case(r#"&"warning: \"x\"\n""#, RecordKind::Log, "warning: \"x\"\n")]
    fn parses_stream_records(#[case] line: &str, #[case] kind: RecordKind, #[case] text: &str) {
        let record = parse_record(line).expect("parse");

        assert_eq!(record.kind(), kind);
        assert_eq!(record.text(), Some(text));
    }

    #[rstest]
    fn parses_nested_tuples_and_lists() {
        let line = concat!(
            r#"3^done,bkpt={number="1",type="breakpoint",thread-groups=["i1"],"#,
            r#"locations=[]},frames=[frame={level="0"},frame={level="1"}],empty={}"#,
        );
        let record = parse_record(line).expect("parse");
        let fields = payload(&record);

        let bkpt = fields.get("bkpt").and_then(Value::as_tuple).expect("bkpt");
        assert_eq!(bkpt.get_str("number"), Some("1"));
        assert_eq!(
            bkpt.get("thread-groups").and_then(Value::as_list),
            Some(&[Value::from("i1")][..])
        );
        assert_eq!(
            bkpt.get("locations").and_then(Value::as_list).map(<[Value]>::len),
            Some(0)
        );

        let frames = fields.get("frames").and_then(Value::as_list).expect("frames");
        assert_eq!(frames.len(), 2);
        let levels: Vec<_> = frames
            .iter()
            .filter_map(|frame| frame.get("frame"))
            .filter_map(|frame| frame.get("level"))
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(levels, ["0", "1"]);

        assert_eq!(fields.get("empty").and_then(Value::as_tuple), Some(&Tuple::new()));
    }

    #[rstest]
    fn parses_list_of_bare_values() {
        let record = parse_record(r#"^done,ids=["1","2","3"]"#).expect("parse");
        let ids = payload(&record)
            .get("ids")
            .and_then(Value::as_list)
            .expect("ids");

        assert_eq!(ids.len(), 3);
    }

    #[rstest]
    #[case("", ParseError::Empty)]
    #[case("1^", ParseError::end("record class"))]
    #[case("^done,", ParseError::end("field name"))]
    #[case("^done,a", ParseError::end("'='"))]
    #[case("x1^done", ParseError::InvalidSequence { token: String::from("x1") })]
    fn reports_grammar_violations(#[case] line: &str, #[case] expected: ParseError) {
        assert_eq!(parse_record(line), Err(expected));
    }

    #[rstest]
    #[case("^done,a={b=\"c\"")]
    #[case("^done,a=[\"b\"")]
    #[case("~\"text\" trailing")]
    #[case("~unquoted")]
    #[case("5~\"tagged stream\"")]
    #[case("(gdb) ")]
    #[case("^done,a=\"1\"}")]
    fn rejects_malformed_lines(#[case] line: &str) {
        assert!(parse_record(line).is_err(), "{line} should not parse");
    }

    #[rstest]
    #[case("(gdb) ", true)]
    #[case("(gdb)", true)]
    #[case("^done", false)]
    fn recognises_terminator(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_terminator(line), expected);
    }

    #[rstest]
    #[case("42^error,msg=\"x\"", Some("42"))]
    #[case("42^{{broken", Some("42"))]
    #[case("^done", None)]
    #[case("42*stopped", None)]
    #[case("42", None)]
    fn extracts_leading_sequence(#[case] line: &str, #[case] expected: Option<&str>) {
        assert_eq!(leading_sequence(line), expected);
    }
}

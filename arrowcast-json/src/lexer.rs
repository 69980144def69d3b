//! Streaming JSON pull lexer.
//!
//! Produces one event per structural token or scalar, validating the JSON
//! grammar as it goes. Number literals are handed out as their raw bytes
//! so the column builder can make its own int-vs-float decision; strings
//! and keys are handed out decoded (escapes resolved, surrogate pairs
//! combined). The first syntax error carries the byte offset where it was
//! detected.

use std::io::{self, BufRead};

#[derive(Debug, PartialEq)]
pub enum JsonEvent<'a> {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    Key(&'a str),
    String(&'a str),
    Number(&'a str),
    Bool(bool),
    Null,
}

#[derive(Debug)]
pub enum LexError {
    Io(io::Error),
    Syntax { pos: u64, message: &'static str },
}

impl From<io::Error> for LexError {
    fn from(err: io::Error) -> Self {
        LexError::Io(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    /// Directly after `[`: a value or an immediate `]`.
    ValueOrEnd,
    /// Directly after `{`: a key or an immediate `}`.
    KeyOrEnd,
    /// After a comma inside an object.
    Key,
    Colon,
    CommaOrEnd,
    /// The root value is complete; only whitespace may follow.
    Eof,
}

pub struct JsonLexer<R> {
    input: R,
    peeked: Option<u8>,
    /// Bytes consumed so far; doubles as the 0-based offset of the next
    /// unread byte.
    pos: u64,
    scratch: Vec<u8>,
    stack: Vec<Container>,
    expect: Expect,
}

impl<R: BufRead> JsonLexer<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            peeked: None,
            pos: 0,
            scratch: Vec::new(),
            stack: Vec::new(),
            expect: Expect::Value,
        }
    }

    /// Pull the next event; `Ok(None)` is a clean end of document.
    pub fn next_event(&mut self) -> Result<Option<JsonEvent<'_>>, LexError> {
        loop {
            self.skip_whitespace()?;
            let Some(c) = self.peek()? else {
                return if self.expect == Expect::Eof {
                    Ok(None)
                } else {
                    Err(self.err("unexpected end of input"))
                };
            };

            match self.expect {
                Expect::Eof => {
                    return Err(self.err("unexpected data after end of document"));
                }
                Expect::Colon => {
                    if c == b':' {
                        self.bump()?;
                        self.expect = Expect::Value;
                        continue;
                    }
                    return Err(self.err("expected ':' after object key"));
                }
                Expect::CommaOrEnd => match (self.stack.last().copied(), c) {
                    (Some(Container::Array), b',') => {
                        self.bump()?;
                        self.expect = Expect::Value;
                        continue;
                    }
                    (Some(Container::Array), b']') => {
                        self.bump()?;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some(JsonEvent::EndArray));
                    }
                    (Some(Container::Object), b',') => {
                        self.bump()?;
                        self.expect = Expect::Key;
                        continue;
                    }
                    (Some(Container::Object), b'}') => {
                        self.bump()?;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some(JsonEvent::EndObject));
                    }
                    (Some(Container::Array), _) => {
                        return Err(self.err("expected ',' or ']'"));
                    }
                    (Some(Container::Object), _) | (None, _) => {
                        return Err(self.err("expected ',' or '}'"));
                    }
                },
                Expect::Key | Expect::KeyOrEnd => {
                    if c == b'}' && self.expect == Expect::KeyOrEnd {
                        self.bump()?;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some(JsonEvent::EndObject));
                    }
                    if c == b'"' {
                        self.bump()?;
                        self.parse_string()?;
                        self.expect = Expect::Colon;
                        return Ok(Some(JsonEvent::Key(self.scratch_str()?)));
                    }
                    return Err(self.err("expected an object key"));
                }
                Expect::Value | Expect::ValueOrEnd => {
                    if c == b']' && self.expect == Expect::ValueOrEnd {
                        self.bump()?;
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some(JsonEvent::EndArray));
                    }
                    return self.parse_value(c).map(Some);
                }
            }
        }
    }

    fn parse_value(&mut self, c: u8) -> Result<JsonEvent<'_>, LexError> {
        match c {
            b'{' => {
                self.bump()?;
                self.stack.push(Container::Object);
                self.expect = Expect::KeyOrEnd;
                Ok(JsonEvent::StartObject)
            }
            b'[' => {
                self.bump()?;
                self.stack.push(Container::Array);
                self.expect = Expect::ValueOrEnd;
                Ok(JsonEvent::StartArray)
            }
            b'"' => {
                self.bump()?;
                self.parse_string()?;
                self.after_value();
                Ok(JsonEvent::String(self.scratch_str()?))
            }
            b't' => {
                self.expect_literal(b"true")?;
                self.after_value();
                Ok(JsonEvent::Bool(true))
            }
            b'f' => {
                self.expect_literal(b"false")?;
                self.after_value();
                Ok(JsonEvent::Bool(false))
            }
            b'n' => {
                self.expect_literal(b"null")?;
                self.after_value();
                Ok(JsonEvent::Null)
            }
            b'-' | b'0'..=b'9' => {
                self.parse_number()?;
                self.after_value();
                Ok(JsonEvent::Number(self.scratch_str()?))
            }
            _ => Err(self.err("expected a value")),
        }
    }

    fn after_value(&mut self) {
        self.expect = if self.stack.is_empty() {
            Expect::Eof
        } else {
            Expect::CommaOrEnd
        };
    }

    /// Decode a string body (opening quote already consumed) into scratch.
    fn parse_string(&mut self) -> Result<(), LexError> {
        self.scratch.clear();
        loop {
            let Some(c) = self.bump()? else {
                return Err(self.err("unexpected end of input in string"));
            };
            match c {
                b'"' => return Ok(()),
                b'\\' => {
                    let Some(e) = self.bump()? else {
                        return Err(self.err("unexpected end of input in string"));
                    };
                    match e {
                        b'"' => self.scratch.push(b'"'),
                        b'\\' => self.scratch.push(b'\\'),
                        b'/' => self.scratch.push(b'/'),
                        b'b' => self.scratch.push(0x08),
                        b'f' => self.scratch.push(0x0c),
                        b'n' => self.scratch.push(b'\n'),
                        b'r' => self.scratch.push(b'\r'),
                        b't' => self.scratch.push(b'\t'),
                        b'u' => self.parse_unicode_escape()?,
                        _ => return Err(self.err("invalid escape in string")),
                    }
                }
                c if c < 0x20 => return Err(self.err("control character in string")),
                c => self.scratch.push(c),
            }
        }
    }

    /// `\uXXXX`, possibly the first half of a UTF-16 surrogate pair.
    fn parse_unicode_escape(&mut self) -> Result<(), LexError> {
        let unit = self.parse_hex4()?;
        let code_point = if (0xd800..0xdc00).contains(&unit) {
            if self.bump()? != Some(b'\\') || self.bump()? != Some(b'u') {
                return Err(self.err("unpaired surrogate in string"));
            }
            let low = self.parse_hex4()?;
            if !(0xdc00..0xe000).contains(&low) {
                return Err(self.err("invalid surrogate pair in string"));
            }
            0x10000 + ((unit - 0xd800) << 10) + (low - 0xdc00)
        } else if (0xdc00..0xe000).contains(&unit) {
            return Err(self.err("unpaired surrogate in string"));
        } else {
            unit
        };

        match char::from_u32(code_point) {
            Some(ch) => {
                let mut utf8 = [0u8; 4];
                self.scratch
                    .extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                Ok(())
            }
            None => Err(self.err("invalid unicode escape in string")),
        }
    }

    fn parse_hex4(&mut self) -> Result<u32, LexError> {
        let mut value = 0u32;
        for _ in 0..4 {
            let Some(c) = self.bump()? else {
                return Err(self.err("unexpected end of input in string"));
            };
            let digit = match c {
                b'0'..=b'9' => u32::from(c - b'0'),
                b'a'..=b'f' => u32::from(c - b'a') + 10,
                b'A'..=b'F' => u32::from(c - b'A') + 10,
                _ => return Err(self.err("invalid unicode escape in string")),
            };
            value = value * 16 + digit;
        }
        Ok(value)
    }

    /// Collect a number literal into scratch, validating the JSON grammar
    /// (no leading zeros, digits required after `.` and exponents).
    fn parse_number(&mut self) -> Result<(), LexError> {
        self.scratch.clear();

        if self.peek()? == Some(b'-') {
            self.push_bump()?;
        }
        match self.peek()? {
            Some(b'0') => {
                self.push_bump()?;
                if matches!(self.peek()?, Some(b'0'..=b'9')) {
                    return Err(self.err("invalid number"));
                }
            }
            Some(b'1'..=b'9') => {
                while matches!(self.peek()?, Some(b'0'..=b'9')) {
                    self.push_bump()?;
                }
            }
            _ => return Err(self.err("invalid number")),
        }

        if self.peek()? == Some(b'.') {
            self.push_bump()?;
            if !matches!(self.peek()?, Some(b'0'..=b'9')) {
                return Err(self.err("invalid number"));
            }
            while matches!(self.peek()?, Some(b'0'..=b'9')) {
                self.push_bump()?;
            }
        }

        if matches!(self.peek()?, Some(b'e' | b'E')) {
            self.push_bump()?;
            if matches!(self.peek()?, Some(b'+' | b'-')) {
                self.push_bump()?;
            }
            if !matches!(self.peek()?, Some(b'0'..=b'9')) {
                return Err(self.err("invalid number"));
            }
            while matches!(self.peek()?, Some(b'0'..=b'9')) {
                self.push_bump()?;
            }
        }

        Ok(())
    }

    fn expect_literal(&mut self, literal: &'static [u8]) -> Result<(), LexError> {
        for &expected in literal {
            if self.bump()? != Some(expected) {
                return Err(self.err("expected a value"));
            }
        }
        Ok(())
    }

    fn scratch_str(&self) -> Result<&str, LexError> {
        std::str::from_utf8(&self.scratch).map_err(|_| LexError::Syntax {
            pos: self.pos,
            message: "invalid UTF-8 in string",
        })
    }

    fn skip_whitespace(&mut self) -> Result<(), LexError> {
        while matches!(self.peek()?, Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.bump()?;
        }
        Ok(())
    }

    fn peek(&mut self) -> Result<Option<u8>, LexError> {
        if self.peeked.is_none() {
            let buf = self.input.fill_buf()?;
            if let Some(&c) = buf.first() {
                self.input.consume(1);
                self.peeked = Some(c);
            }
        }
        Ok(self.peeked)
    }

    fn bump(&mut self) -> Result<Option<u8>, LexError> {
        let c = self.peek()?;
        if c.is_some() {
            self.peeked = None;
            self.pos += 1;
        }
        Ok(c)
    }

    fn push_bump(&mut self) -> Result<(), LexError> {
        if let Some(c) = self.bump()? {
            self.scratch.push(c);
        }
        Ok(())
    }

    fn err(&self, message: &'static str) -> LexError {
        LexError::Syntax {
            pos: self.pos,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(data: &str) -> Result<Vec<String>, (u64, String)> {
        let mut lexer = JsonLexer::new(data.as_bytes());
        let mut out = Vec::new();
        loop {
            match lexer.next_event() {
                Ok(None) => return Ok(out),
                Ok(Some(ev)) => out.push(format!("{ev:?}")),
                Err(LexError::Syntax { pos, message }) => return Err((pos, message.to_string())),
                Err(LexError::Io(err)) => panic!("io error: {err}"),
            }
        }
    }

    #[test]
    fn lexes_a_record_array() {
        let got = events(r#"[{"x": 1, "y": "a"}]"#).expect("valid");
        assert_eq!(
            got,
            vec![
                "StartArray",
                "StartObject",
                "Key(\"x\")",
                "Number(\"1\")",
                "Key(\"y\")",
                "String(\"a\")",
                "EndObject",
                "EndArray",
            ]
        );
    }

    #[test]
    fn numbers_keep_their_literal_bytes() {
        let got = events("[1, -2.50, 3e10, 0.0]").expect("valid");
        assert_eq!(
            got,
            vec![
                "StartArray",
                "Number(\"1\")",
                "Number(\"-2.50\")",
                "Number(\"3e10\")",
                "Number(\"0.0\")",
                "EndArray",
            ]
        );
    }

    #[test]
    fn decodes_escapes_and_surrogate_pairs() {
        let got = events(r#"["a\nb", "é", "🎉"]"#).expect("valid");
        assert_eq!(
            got,
            vec![
                "StartArray",
                "String(\"a\\nb\")",
                "String(\"é\")",
                "String(\"🎉\")",
                "EndArray",
            ]
        );
    }

    #[test]
    fn empty_containers() {
        assert_eq!(events("[]").expect("valid"), vec!["StartArray", "EndArray"]);
        assert_eq!(
            events("{}").expect("valid"),
            vec!["StartObject", "EndObject"]
        );
    }

    #[test]
    fn reports_offset_of_first_error() {
        let (pos, _) = events(r#"[{"x": }]"#).expect_err("invalid");
        assert_eq!(pos, 7);
    }

    #[test]
    fn rejects_trailing_content() {
        assert!(events("[] []").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        let (_, message) = events(r#"["abc"#).expect_err("invalid");
        assert!(message.contains("end of input"));
    }

    #[test]
    fn rejects_leading_zeros_and_bare_fractions() {
        assert!(events("[01]").is_err());
        assert!(events("[1.]").is_err());
        assert!(events("[.5]").is_err());
        assert!(events("[1e]").is_err());
    }

    #[test]
    fn rejects_unpaired_surrogates() {
        assert!(events(r#"["\ud800"]"#).is_err());
        assert!(events(r#"["\udc00x"]"#).is_err());
    }

    #[test]
    fn rejects_control_characters_in_strings() {
        assert!(events("[\"a\u{1}b\"]").is_err());
    }
}

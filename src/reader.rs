//! Pull tokenizer: byte stream in, token events out.
//!
//! The reader keeps at most one token of lookahead in the [`Peeked`] cache.
//! `peek` computes and caches; the `next_*` and `skip_*` calls consume.
//! Consumption updates the top of the scope stack and, inside arrays,
//! bumps the element index, so [`JsonReader::path`] is always current.
//!
//! Strict mode is RFC 7159. The lenient flag additionally accepts a
//! leading BOM, `//` and `/* */` and `#` comments, single quotes, unquoted
//! names and values, non-finite numbers, semicolons for commas, trailing
//! separators as scope closers, and multiple top-level values.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::audit::JsonAudit;
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::io::{Buffer, ByteSource};
use crate::lookahead::{StartState, ValueSource};
use crate::scope::{Scope, ScopeStack};
use crate::value::{JsonValue, Number};
use crate::writer;

/// A structure, name, or value event on the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// `{`
    BeginObject,
    /// `}`
    EndObject,
    /// A property name
    Name,
    /// A string value
    String,
    /// A number value
    Number,
    /// `true` or `false`
    Boolean,
    /// `null`
    Null,
    /// The end of the stream
    EndDocument,
}

impl Token {
    /// The spelling used in error messages.
    pub const fn describe(&self) -> &'static str {
        match self {
            Token::BeginArray => "BEGIN_ARRAY",
            Token::EndArray => "END_ARRAY",
            Token::BeginObject => "BEGIN_OBJECT",
            Token::EndObject => "END_OBJECT",
            Token::Name => "NAME",
            Token::String => "STRING",
            Token::Number => "NUMBER",
            Token::Boolean => "BOOLEAN",
            Token::Null => "NULL",
            Token::EndDocument => "END_DOCUMENT",
        }
    }
}

/// One token of buffered lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Peeked {
    None,
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    True,
    False,
    Null,
    /// A `'`-quoted value whose opening quote has been consumed
    SingleQuoted,
    /// A `"`-quoted value whose opening quote has been consumed
    DoubleQuoted,
    /// An unquoted value, not yet consumed
    Unquoted,
    /// A value string already decoded into `peeked_string`
    Buffered,
    SingleQuotedName,
    DoubleQuotedName,
    UnquotedName,
    /// A name already decoded into `peeked_string`
    BufferedName,
    /// An integer already parsed into `peeked_long`, bytes consumed
    Long,
    /// A number of `peeked_number_length` bytes, not yet consumed
    Number,
    Eof,
}

/// A prepared set of name/string options for [`JsonReader::select_name`]
/// and [`JsonReader::select_string`].
///
/// Each option is pre-encoded as its escaped UTF-8 bytes followed by a
/// closing double quote, so that matching is a single byte comparison
/// against the source. The trailing quote acts as a sentinel: no option
/// can falsely match a strict prefix of a longer name in the document.
#[derive(Debug, Clone)]
pub struct Options {
    strings: Vec<String>,
    encoded: Vec<Box<[u8]>>,
}

impl Options {
    /// Prepare an option set.
    pub fn of(strings: &[&str]) -> Options {
        let mut owned = Vec::with_capacity(strings.len());
        let mut encoded = Vec::with_capacity(strings.len());
        for s in strings {
            owned.push((*s).to_owned());
            // Full quoted form minus the opening quote.
            let quoted = writer::quoted_utf8(s);
            encoded.push(quoted[1..].to_vec().into_boxed_slice());
        }
        Options {
            strings: owned,
            encoded,
        }
    }

    /// The option strings, in preparation order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.strings.iter().position(|s| s == name)
    }
}

const MIN_INCOMPLETE_INTEGER: i64 = i64::MIN / 10;

/// Terminators of an unquoted value or name.
fn is_literal(b: u8) -> bool {
    !matches!(
        b,
        b'/' | b'\\'
            | b';'
            | b'#'
            | b'='
            | b'{'
            | b'}'
            | b'['
            | b']'
            | b':'
            | b','
            | b' '
            | b'\t'
            | b'\x0c'
            | b'\r'
            | b'\n'
    )
}

/// Pull parser over a buffered byte source.
pub struct JsonReader {
    source: Box<dyn ByteSource>,
    lenient: bool,
    fail_on_unknown: bool,
    stack: ScopeStack,
    peeked: Peeked,
    peeked_long: i64,
    peeked_number_length: usize,
    peeked_string: Option<String>,
    /// A name was promoted to a value; the next consumed scalar is
    /// recorded as the frame's path name.
    promoted: bool,
    audit: Option<Arc<dyn JsonAudit>>,
}

impl JsonReader {
    /// Create a reader over an in-memory buffer.
    pub fn new(buffer: Buffer) -> Self {
        JsonReader::from_source(Box::new(buffer))
    }

    /// Create a reader over any byte source.
    pub fn from_source(source: Box<dyn ByteSource>) -> Self {
        JsonReader {
            source,
            lenient: false,
            fail_on_unknown: false,
            stack: ScopeStack::with_root(Scope::EmptyDocument),
            peeked: Peeked::None,
            peeked_long: 0,
            peeked_number_length: 0,
            peeked_string: None,
            promoted: false,
            audit: None,
        }
    }

    /// Install an audit hook; see [`JsonAudit`].
    pub fn with_audit(mut self, audit: Arc<dyn JsonAudit>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// The installed audit hook, if any.
    pub fn audit(&self) -> Option<&Arc<dyn JsonAudit>> {
        self.audit.as_ref()
    }

    /// Whether the documented syntax extensions are accepted.
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// Accept or reject the documented syntax extensions.
    pub fn set_lenient(&mut self, lenient: bool) {
        self.lenient = lenient;
    }

    /// Whether unknown names and values fail instead of being skipped.
    pub fn fails_on_unknown(&self) -> bool {
        self.fail_on_unknown
    }

    /// Fail on unknown names and values instead of skipping them.
    pub fn set_fail_on_unknown(&mut self, fail_on_unknown: bool) {
        self.fail_on_unknown = fail_on_unknown;
    }

    /// JsonPath to the current position.
    pub fn path(&self) -> String {
        self.stack.path()
    }

    fn syntax(&self, kind: JsonErrorKind) -> JsonError {
        JsonError::new(kind)
            .with_path(self.path())
            .at(self.source.position())
    }

    fn unexpected(&mut self, expected: &'static str) -> JsonError {
        let got = match self.peek() {
            Ok(token) => token.describe(),
            Err(e) => return e,
        };
        JsonError::new(JsonErrorKind::UnexpectedToken { expected, got }).with_path(self.path())
    }

    fn check_lenient(&self, what: &'static str) -> Result<()> {
        if self.lenient {
            Ok(())
        } else {
            Err(self.syntax(JsonErrorKind::StrictModeViolation { what }))
        }
    }

    /// Returns the type of the next token without consuming it.
    pub fn peek(&mut self) -> Result<Token> {
        let p = self.peeked_or_compute()?;
        Ok(match p {
            Peeked::BeginObject => Token::BeginObject,
            Peeked::EndObject => Token::EndObject,
            Peeked::BeginArray => Token::BeginArray,
            Peeked::EndArray => Token::EndArray,
            Peeked::True | Peeked::False => Token::Boolean,
            Peeked::Null => Token::Null,
            Peeked::SingleQuoted | Peeked::DoubleQuoted | Peeked::Unquoted | Peeked::Buffered => {
                Token::String
            }
            Peeked::SingleQuotedName
            | Peeked::DoubleQuotedName
            | Peeked::UnquotedName
            | Peeked::BufferedName => Token::Name,
            Peeked::Long | Peeked::Number => Token::Number,
            Peeked::Eof => Token::EndDocument,
            Peeked::None => unreachable!("peeked_or_compute never leaves None"),
        })
    }

    fn peeked_or_compute(&mut self) -> Result<Peeked> {
        if self.peeked == Peeked::None {
            self.do_peek()?;
        }
        Ok(self.peeked)
    }

    /// Skip interstitial whitespace and (lenient) comments, leaving the
    /// next significant byte unconsumed at offset zero. Returns `None` at
    /// end of input when `throw_on_eof` is false.
    fn next_non_whitespace(&mut self, throw_on_eof: bool) -> Result<Option<u8>> {
        let mut p = 0;
        loop {
            if !self.source.request(p + 1)? {
                // Consume trailing whitespace so position reporting is exact.
                self.source.skip(p)?;
                return if throw_on_eof {
                    Err(self.syntax(JsonErrorKind::UnexpectedEof {
                        expected: "a JSON token",
                    }))
                } else {
                    Ok(None)
                };
            }
            let c = self.source.get_byte(p);
            p += 1;
            if matches!(c, b'\n' | b' ' | b'\r' | b'\t') {
                continue;
            }
            self.source.skip(p - 1)?;
            match c {
                b'/' => {
                    if !self.source.request(2)? {
                        return Ok(Some(c));
                    }
                    self.check_lenient("comments")?;
                    match self.source.get_byte(1) {
                        b'*' => {
                            self.source.skip(2)?;
                            self.skip_to_block_comment_end()?;
                        }
                        b'/' => {
                            self.source.skip(2)?;
                            self.skip_to_end_of_line()?;
                        }
                        _ => return Ok(Some(c)),
                    }
                    p = 0;
                }
                b'#' => {
                    self.check_lenient("comments")?;
                    self.skip_to_end_of_line()?;
                    p = 0;
                }
                _ => return Ok(Some(c)),
            }
        }
    }

    fn skip_to_end_of_line(&mut self) -> Result<()> {
        match self.source.index_of_element(b"\r\n", 0)? {
            Some(i) => self.source.skip(i + 1),
            None => {
                // Comment runs to end of input.
                while self.source.request(1)? {
                    self.source.skip(1)?;
                }
                Ok(())
            }
        }
    }

    fn skip_to_block_comment_end(&mut self) -> Result<()> {
        loop {
            match self.source.index_of_element(b"*", 0)? {
                Some(i) => {
                    if self.source.request(i + 2)? && self.source.get_byte(i + 1) == b'/' {
                        self.source.skip(i + 2)?;
                        return Ok(());
                    }
                    self.source.skip(i + 1)?;
                }
                None => {
                    return Err(self.syntax(JsonErrorKind::UnexpectedEof {
                        expected: "*/ to close the comment",
                    }));
                }
            }
        }
    }

    fn do_peek(&mut self) -> Result<Peeked> {
        let peek_stack = self.stack.peek()?;
        match peek_stack {
            Scope::EmptyArray => {
                self.stack.replace_top(Scope::NonemptyArray);
            }
            Scope::NonemptyArray => {
                // Look for a comma before the next element.
                let c = self.next_non_whitespace(true)?.unwrap_or(0);
                self.source.skip(1)?; // consume ']' or ','
                match c {
                    b']' => {
                        self.peeked = Peeked::EndArray;
                        return Ok(self.peeked);
                    }
                    b';' => self.check_lenient("semicolon separators")?,
                    b',' => {}
                    _ => {
                        return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                            ch: c as char,
                            expected: "',' or ']'",
                        }));
                    }
                }
            }
            Scope::EmptyObject | Scope::NonemptyObject => {
                self.stack.replace_top(Scope::DanglingName);
                if peek_stack == Scope::NonemptyObject {
                    // Look for a comma before the next member.
                    let c = self.next_non_whitespace(true)?.unwrap_or(0);
                    self.source.skip(1)?; // consume '}' or ','
                    match c {
                        b'}' => {
                            self.peeked = Peeked::EndObject;
                            return Ok(self.peeked);
                        }
                        b';' => self.check_lenient("semicolon separators")?,
                        b',' => {}
                        _ => {
                            return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                                ch: c as char,
                                expected: "',' or '}'",
                            }));
                        }
                    }
                }
                let c = self.next_non_whitespace(true)?.unwrap_or(0);
                match c {
                    b'"' => {
                        self.source.skip(1)?;
                        self.peeked = Peeked::DoubleQuotedName;
                        return Ok(self.peeked);
                    }
                    b'\'' => {
                        self.check_lenient("single-quoted names")?;
                        self.source.skip(1)?;
                        self.peeked = Peeked::SingleQuotedName;
                        return Ok(self.peeked);
                    }
                    b'}' => {
                        // A name position: `}` closes an empty object, or,
                        // leniently, an object with a trailing separator.
                        if peek_stack == Scope::NonemptyObject {
                            self.check_lenient("trailing separators")?;
                        }
                        self.source.skip(1)?;
                        self.peeked = Peeked::EndObject;
                        return Ok(self.peeked);
                    }
                    _ => {
                        self.check_lenient("unquoted names")?;
                        if is_literal(c) {
                            self.peeked = Peeked::UnquotedName;
                            return Ok(self.peeked);
                        }
                        return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                            ch: c as char,
                            expected: "a name",
                        }));
                    }
                }
            }
            Scope::DanglingName => {
                self.stack.replace_top(Scope::NonemptyObject);
                // Look for the colon before the value.
                let c = self.next_non_whitespace(true)?.unwrap_or(0);
                self.source.skip(1)?; // consume ':' or '='
                match c {
                    b':' => {}
                    b'=' => {
                        self.check_lenient("'=' separators")?;
                        if self.source.request(1)? && self.source.get_byte(0) == b'>' {
                            self.source.skip(1)?;
                        }
                    }
                    _ => {
                        return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                            ch: c as char,
                            expected: "':'",
                        }));
                    }
                }
            }
            Scope::EmptyDocument => {
                if self.source.request(3)?
                    && self.source.get_byte(0) == 0xef
                    && self.source.get_byte(1) == 0xbb
                    && self.source.get_byte(2) == 0xbf
                {
                    self.check_lenient("byte order mark")?;
                    self.source.skip(3)?;
                }
                self.stack.replace_top(Scope::NonemptyDocument);
            }
            Scope::NonemptyDocument => {
                match self.next_non_whitespace(false)? {
                    None => {
                        self.peeked = Peeked::Eof;
                        return Ok(self.peeked);
                    }
                    Some(_) => {
                        self.check_lenient("multiple top-level values")?;
                    }
                }
            }
            Scope::StreamingValue | Scope::Closed => {
                return Err(JsonError::invalid_state("reader is closed"));
            }
        }

        let c = self.next_non_whitespace(true)?.unwrap_or(0);
        match c {
            b']' => {
                // A trailing separator before `]` leniently closes the
                // array instead of implying another element.
                if peek_stack == Scope::NonemptyArray {
                    self.check_lenient("trailing separators")?;
                }
                if peek_stack == Scope::EmptyArray || peek_stack == Scope::NonemptyArray {
                    self.source.skip(1)?;
                    self.peeked = Peeked::EndArray;
                    return Ok(self.peeked);
                }
                return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                    ch: ']',
                    expected: "a value",
                }));
            }
            b';' | b',' => {
                // An empty slot between separators reads as null.
                if peek_stack == Scope::EmptyArray || peek_stack == Scope::NonemptyArray {
                    self.check_lenient("trailing separators")?;
                    self.peeked = Peeked::Null;
                    return Ok(self.peeked);
                }
                return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                    ch: c as char,
                    expected: "a value",
                }));
            }
            b'\'' => {
                self.check_lenient("single-quoted strings")?;
                self.source.skip(1)?;
                self.peeked = Peeked::SingleQuoted;
                return Ok(self.peeked);
            }
            b'"' => {
                self.source.skip(1)?;
                self.peeked = Peeked::DoubleQuoted;
                return Ok(self.peeked);
            }
            b'[' => {
                self.source.skip(1)?;
                self.peeked = Peeked::BeginArray;
                return Ok(self.peeked);
            }
            b'{' => {
                self.source.skip(1)?;
                self.peeked = Peeked::BeginObject;
                return Ok(self.peeked);
            }
            _ => {}
        }

        if let Some(p) = self.peek_keyword()? {
            self.peeked = p;
            return Ok(p);
        }
        if let Some(p) = self.peek_number()? {
            self.peeked = p;
            return Ok(p);
        }
        if !is_literal(self.source.get_byte(0)) {
            return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                ch: self.source.get_byte(0) as char,
                expected: "a value",
            }));
        }
        self.check_lenient("unquoted values")?;
        self.peeked = Peeked::Unquoted;
        Ok(self.peeked)
    }

    fn peek_keyword(&mut self) -> Result<Option<Peeked>> {
        let c = self.source.get_byte(0);
        let (keyword, upper, peeking): (&[u8], &[u8], Peeked) = match c {
            b't' | b'T' => (b"true", b"TRUE", Peeked::True),
            b'f' | b'F' => (b"false", b"FALSE", Peeked::False),
            b'n' | b'N' => (b"null", b"NULL", Peeked::Null),
            _ => return Ok(None),
        };
        let mut mixed_case = c == upper[0];
        for i in 1..keyword.len() {
            if !self.source.request(i + 1)? {
                return Ok(None);
            }
            let b = self.source.get_byte(i);
            if b == upper[i] && b != keyword[i] {
                mixed_case = true;
            } else if b != keyword[i] {
                return Ok(None);
            }
        }
        if self.source.request(keyword.len() + 1)? && is_literal(self.source.get_byte(keyword.len()))
        {
            // Something like "nullx": not a keyword.
            return Ok(None);
        }
        if mixed_case {
            self.check_lenient("upper-case keywords")?;
        }
        self.source.skip(keyword.len())?;
        Ok(Some(peeking))
    }

    fn peek_number(&mut self) -> Result<Option<Peeked>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Last {
            None,
            Sign,
            Digit,
            Decimal,
            FractionDigit,
            ExpE,
            ExpSign,
            ExpDigit,
        }

        let mut value: i64 = 0;
        let mut negative = false;
        let mut fits_in_long = true;
        let mut last = Last::None;
        let mut i = 0;

        'characters: loop {
            if !self.source.request(i + 1)? {
                break;
            }
            let c = self.source.get_byte(i);
            match c {
                b'-' => match last {
                    Last::None => {
                        negative = true;
                        last = Last::Sign;
                    }
                    Last::ExpE => last = Last::ExpSign,
                    _ => return Ok(None),
                },
                b'+' => match last {
                    Last::ExpE => last = Last::ExpSign,
                    _ => return Ok(None),
                },
                b'e' | b'E' => match last {
                    Last::Digit | Last::FractionDigit => last = Last::ExpE,
                    _ => return Ok(None),
                },
                b'.' => match last {
                    Last::Digit => last = Last::Decimal,
                    _ => return Ok(None),
                },
                b'0'..=b'9' => {
                    let digit = (c - b'0') as i64;
                    match last {
                        Last::Sign | Last::None => {
                            value = -digit;
                            last = Last::Digit;
                        }
                        Last::Digit => {
                            if value == 0 {
                                return Ok(None); // leading zeros are not numbers
                            }
                            let new_value = value.wrapping_mul(10).wrapping_sub(digit);
                            fits_in_long &= value > MIN_INCOMPLETE_INTEGER
                                || (value == MIN_INCOMPLETE_INTEGER && new_value < value);
                            value = new_value;
                        }
                        Last::Decimal => last = Last::FractionDigit,
                        Last::ExpE | Last::ExpSign => last = Last::ExpDigit,
                        Last::FractionDigit | Last::ExpDigit => {}
                    }
                }
                _ => {
                    if !is_literal(c) {
                        break 'characters;
                    }
                    return Ok(None);
                }
            }
            i += 1;
        }

        if last == Last::Digit
            && fits_in_long
            && (value != i64::MIN || negative)
            && (value != 0 || !negative)
        {
            self.peeked_long = if negative { value } else { -value };
            self.source.skip(i)?;
            Ok(Some(Peeked::Long))
        } else if matches!(last, Last::Digit | Last::FractionDigit | Last::ExpDigit) {
            self.peeked_number_length = i;
            Ok(Some(Peeked::Number))
        } else {
            Ok(None)
        }
    }

    /// Consume the next token and assert that it opens an array.
    pub fn begin_array(&mut self) -> Result<()> {
        if self.peeked_or_compute()? == Peeked::BeginArray {
            self.stack.push(Scope::EmptyArray)?;
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.unexpected("BEGIN_ARRAY"))
        }
    }

    /// Consume the next token and assert that it closes an array.
    pub fn end_array(&mut self) -> Result<()> {
        if self.peeked_or_compute()? == Peeked::EndArray {
            self.stack.pop();
            self.stack.bump_top_index();
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.unexpected("END_ARRAY"))
        }
    }

    /// Consume the next token and assert that it opens an object.
    pub fn begin_object(&mut self) -> Result<()> {
        if self.peeked_or_compute()? == Peeked::BeginObject {
            self.stack.push(Scope::EmptyObject)?;
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.unexpected("BEGIN_OBJECT"))
        }
    }

    /// Consume the next token and assert that it closes an object.
    pub fn end_object(&mut self) -> Result<()> {
        if self.peeked_or_compute()? == Peeked::EndObject {
            self.stack.pop();
            self.stack.bump_top_index();
            self.peeked = Peeked::None;
            Ok(())
        } else {
            Err(self.unexpected("END_OBJECT"))
        }
    }

    /// True until the next token closes the current scope or ends the
    /// document.
    pub fn has_next(&mut self) -> Result<bool> {
        let p = self.peeked_or_compute()?;
        Ok(!matches!(p, Peeked::EndArray | Peeked::EndObject | Peeked::Eof))
    }

    /// Consume the next name and record it in the path.
    pub fn next_name(&mut self) -> Result<String> {
        let name = match self.peeked_or_compute()? {
            Peeked::UnquotedName => self.next_unquoted_value()?,
            Peeked::SingleQuotedName => self.next_quoted_value(b'\'')?,
            Peeked::DoubleQuotedName => self.next_quoted_value(b'"')?,
            Peeked::BufferedName => self
                .peeked_string
                .take()
                .unwrap_or_default(),
            _ => return Err(self.unexpected("NAME")),
        };
        self.peeked = Peeked::None;
        self.stack.set_top_name(Some(name.clone()));
        Ok(name)
    }

    /// If the next token is a name matching one of `options`, consume it
    /// and return its index. Otherwise return `None` with no state change.
    pub fn select_name(&mut self, options: &Options) -> Result<Option<usize>> {
        let p = self.peeked_or_compute()?;
        match p {
            Peeked::DoubleQuotedName => {
                // Fast path: the encoded options include the closing quote,
                // so a byte-level hit is an exact name match.
                if let Some(index) = self.source.select(&options.encoded)? {
                    self.peeked = Peeked::None;
                    self.stack.set_top_name(Some(options.strings[index].clone()));
                    return Ok(Some(index));
                }
                self.select_name_slow(options, b'"')
            }
            Peeked::SingleQuotedName => self.select_name_slow(options, b'\''),
            Peeked::UnquotedName => {
                let name = self.next_unquoted_value()?;
                self.finish_select_name(options, name)
            }
            Peeked::BufferedName => {
                let name = self.peeked_string.take().unwrap_or_default();
                self.peeked = Peeked::None;
                self.finish_select_name(options, name)
            }
            _ => Ok(None),
        }
    }

    fn select_name_slow(&mut self, options: &Options, quote: u8) -> Result<Option<usize>> {
        let name = self.next_quoted_value(quote)?;
        self.finish_select_name(options, name)
    }

    fn finish_select_name(&mut self, options: &Options, name: String) -> Result<Option<usize>> {
        match options.find(&name) {
            Some(index) => {
                self.peeked = Peeked::None;
                self.stack.set_top_name(Some(name));
                Ok(Some(index))
            }
            None => {
                // Stash the decoded name: observably, nothing was consumed.
                self.peeked = Peeked::BufferedName;
                self.peeked_string = Some(name);
                Ok(None)
            }
        }
    }

    /// If the next token is a string matching one of `options`, consume it
    /// and return its index. Otherwise return `None` with no state change.
    pub fn select_string(&mut self, options: &Options) -> Result<Option<usize>> {
        let p = self.peeked_or_compute()?;
        match p {
            Peeked::DoubleQuoted => {
                if let Some(index) = self.source.select(&options.encoded)? {
                    self.peeked = Peeked::None;
                    self.stack.bump_top_index();
                    let matched = options.strings[index].clone();
                    self.finish_promoted(Some(&matched));
                    return Ok(Some(index));
                }
                let s = self.next_quoted_value(b'"')?;
                self.finish_select_string(options, s)
            }
            Peeked::SingleQuoted => {
                let s = self.next_quoted_value(b'\'')?;
                self.finish_select_string(options, s)
            }
            Peeked::Unquoted => {
                let s = self.next_unquoted_value()?;
                self.finish_select_string(options, s)
            }
            Peeked::Buffered => {
                let s = self.peeked_string.take().unwrap_or_default();
                self.peeked = Peeked::None;
                self.finish_select_string(options, s)
            }
            _ => Ok(None),
        }
    }

    fn finish_select_string(&mut self, options: &Options, s: String) -> Result<Option<usize>> {
        match options.find(&s) {
            Some(index) => {
                self.peeked = Peeked::None;
                self.stack.bump_top_index();
                self.finish_promoted(Some(&s));
                Ok(Some(index))
            }
            None => {
                self.peeked = Peeked::Buffered;
                self.peeked_string = Some(s);
                Ok(None)
            }
        }
    }

    /// Skip the next name. Fails when fail-on-unknown is set.
    pub fn skip_name(&mut self) -> Result<()> {
        if self.fail_on_unknown {
            let name = self.next_name()?;
            return Err(JsonError::new(JsonErrorKind::UnknownName {
                name,
                expected: Vec::new(),
                suggestion: None,
            })
            .with_path(self.path()));
        }
        match self.peeked_or_compute()? {
            Peeked::UnquotedName => self.skip_unquoted_value()?,
            Peeked::SingleQuotedName => self.skip_quoted_value(b'\'')?,
            Peeked::DoubleQuotedName => self.skip_quoted_value(b'"')?,
            Peeked::BufferedName => {
                self.peeked_string = None;
            }
            _ => return Err(self.unexpected("NAME")),
        }
        self.peeked = Peeked::None;
        self.stack.set_top_name(Some("null".to_owned()));
        Ok(())
    }

    /// Skip a complete value, however deeply nested. Fails when
    /// fail-on-unknown is set.
    pub fn skip_value(&mut self) -> Result<()> {
        if self.fail_on_unknown {
            let got = self.peek()?.describe();
            return Err(JsonError::new(JsonErrorKind::UnexpectedToken {
                expected: "a known value",
                got,
            })
            .with_path(self.path()));
        }
        let mut count = 0usize;
        loop {
            match self.peeked_or_compute()? {
                Peeked::BeginArray => {
                    self.stack.push(Scope::EmptyArray)?;
                    count += 1;
                }
                Peeked::BeginObject => {
                    self.stack.push(Scope::EmptyObject)?;
                    count += 1;
                }
                Peeked::EndArray | Peeked::EndObject => {
                    if count == 0 {
                        return Err(self.unexpected("a value"));
                    }
                    self.stack.pop();
                    count -= 1;
                }
                Peeked::UnquotedName | Peeked::Unquoted => self.skip_unquoted_value()?,
                Peeked::SingleQuoted | Peeked::SingleQuotedName => self.skip_quoted_value(b'\'')?,
                Peeked::DoubleQuoted | Peeked::DoubleQuotedName => self.skip_quoted_value(b'"')?,
                Peeked::Number => {
                    let n = self.peeked_number_length;
                    self.source.skip(n)?;
                }
                Peeked::Buffered | Peeked::BufferedName => {
                    self.peeked_string = None;
                }
                Peeked::Eof => {
                    return Err(self.unexpected("a value"));
                }
                Peeked::True | Peeked::False | Peeked::Null | Peeked::Long => {}
                Peeked::None => unreachable!(),
            }
            self.peeked = Peeked::None;
            if count == 0 {
                break;
            }
        }
        self.stack.bump_top_index();
        self.stack.set_top_name(Some("null".to_owned()));
        Ok(())
    }

    /// Consume the next string value, coercing numbers to their text.
    pub fn next_string(&mut self) -> Result<String> {
        let result = match self.peeked_or_compute()? {
            Peeked::SingleQuoted => self.next_quoted_value(b'\'')?,
            Peeked::DoubleQuoted => self.next_quoted_value(b'"')?,
            Peeked::Unquoted => self.next_unquoted_value()?,
            Peeked::Buffered => self.peeked_string.take().unwrap_or_default(),
            Peeked::Long => itoa::Buffer::new().format(self.peeked_long).to_owned(),
            Peeked::Number => {
                let n = self.peeked_number_length;
                self.source.read_utf8(n)?
            }
            _ => return Err(self.unexpected("STRING")),
        };
        self.peeked = Peeked::None;
        self.stack.bump_top_index();
        self.finish_promoted(Some(&result));
        Ok(result)
    }

    /// Consume the next boolean.
    pub fn next_bool(&mut self) -> Result<bool> {
        let result = match self.peeked_or_compute()? {
            Peeked::True => true,
            Peeked::False => false,
            _ => return Err(self.unexpected("BOOLEAN")),
        };
        self.peeked = Peeked::None;
        self.stack.bump_top_index();
        self.finish_promoted(Some(if result { "true" } else { "false" }));
        Ok(result)
    }

    /// Consume the next `null`.
    pub fn next_null(&mut self) -> Result<()> {
        if self.peeked_or_compute()? == Peeked::Null {
            self.peeked = Peeked::None;
            self.stack.bump_top_index();
            self.finish_promoted(None);
            Ok(())
        } else {
            Err(self.unexpected("NULL"))
        }
    }

    /// Consume the next number as `f64`, parsing strings when necessary.
    /// Non-finite results fail unless the reader is lenient.
    pub fn next_f64(&mut self) -> Result<f64> {
        let text = match self.peeked_or_compute()? {
            Peeked::Long => {
                self.peeked = Peeked::None;
                self.stack.bump_top_index();
                let text = itoa::Buffer::new().format(self.peeked_long).to_owned();
                self.finish_promoted(Some(&text));
                return Ok(self.peeked_long as f64);
            }
            Peeked::Number => {
                let n = self.peeked_number_length;
                self.source.read_utf8(n)?
            }
            Peeked::SingleQuoted => self.next_quoted_value(b'\'')?,
            Peeked::DoubleQuoted => self.next_quoted_value(b'"')?,
            Peeked::Unquoted => self.next_unquoted_value()?,
            Peeked::Buffered => self.peeked_string.take().unwrap_or_default(),
            _ => return Err(self.unexpected("NUMBER")),
        };

        let result = parse_f64(&text).ok_or_else(|| {
            JsonError::new(JsonErrorKind::UnexpectedToken {
                expected: "NUMBER",
                got: "STRING",
            })
            .with_path(self.path())
        })?;
        if !self.lenient && !result.is_finite() {
            return Err(self.syntax(JsonErrorKind::NonFiniteNumber {
                value: result.to_string(),
            }));
        }
        self.peeked = Peeked::None;
        self.stack.bump_top_index();
        self.finish_promoted(Some(&text));
        Ok(result)
    }

    /// Consume the next number as `i64`. Fails unless the value is exactly
    /// representable.
    pub fn next_i64(&mut self) -> Result<i64> {
        match self.peeked_or_compute()? {
            Peeked::Long => {
                self.peeked = Peeked::None;
                self.stack.bump_top_index();
                let text = itoa::Buffer::new().format(self.peeked_long).to_owned();
                self.finish_promoted(Some(&text));
                return Ok(self.peeked_long);
            }
            Peeked::Number => {
                let n = self.peeked_number_length;
                self.peeked_string = Some(self.source.read_utf8(n)?);
                self.peeked = Peeked::Buffered;
            }
            Peeked::SingleQuoted => {
                let s = self.next_quoted_value(b'\'')?;
                self.peeked_string = Some(s);
                self.peeked = Peeked::Buffered;
            }
            Peeked::DoubleQuoted => {
                let s = self.next_quoted_value(b'"')?;
                self.peeked_string = Some(s);
                self.peeked = Peeked::Buffered;
            }
            Peeked::Unquoted => {
                let s = self.next_unquoted_value()?;
                self.peeked_string = Some(s);
                self.peeked = Peeked::Buffered;
            }
            Peeked::Buffered => {}
            _ => return Err(self.unexpected("NUMBER")),
        }

        // Buffered text: integer parse first, exact double fallback second.
        let text = self.peeked_string.clone().unwrap_or_default();
        if let Ok(parsed) = parse_i64(&text) {
            self.peeked = Peeked::None;
            self.peeked_string = None;
            self.stack.bump_top_index();
            self.finish_promoted(Some(&text));
            return Ok(parsed);
        }
        let as_double = parse_f64(&text).ok_or_else(|| {
            JsonError::new(JsonErrorKind::UnexpectedToken {
                expected: "NUMBER",
                got: "STRING",
            })
            .with_path(self.path())
        })?;
        let result = as_double as i64;
        if result as f64 != as_double {
            return Err(JsonError::new(JsonErrorKind::NumberOutOfRange {
                value: text,
                target: "i64",
            })
            .with_path(self.path()));
        }
        self.peeked = Peeked::None;
        self.peeked_string = None;
        self.stack.bump_top_index();
        self.finish_promoted(Some(&text));
        Ok(result)
    }

    /// Consume the next number as `i32`. Fails unless the value is exactly
    /// representable.
    pub fn next_i32(&mut self) -> Result<i32> {
        let path = self.path();
        let value = self.next_i64()?;
        i32::try_from(value).map_err(|_| {
            JsonError::new(JsonErrorKind::NumberOutOfRange {
                value: value.to_string(),
                target: "i32",
            })
            .with_path(path)
        })
    }

    /// Serve the next name as if it were a string value. Used by map
    /// adapters whose keys are not plain strings.
    pub fn promote_name_to_value(&mut self) -> Result<()> {
        match self.peeked_or_compute()? {
            Peeked::DoubleQuotedName => self.peeked = Peeked::DoubleQuoted,
            Peeked::SingleQuotedName => self.peeked = Peeked::SingleQuoted,
            Peeked::UnquotedName => self.peeked = Peeked::Unquoted,
            Peeked::BufferedName => self.peeked = Peeked::Buffered,
            _ => return Err(self.unexpected("NAME")),
        }
        self.promoted = true;
        Ok(())
    }

    /// Record a consumed promoted-name value in the path, so that errors
    /// after a map key still point at `$.key`.
    fn finish_promoted(&mut self, text: Option<&str>) {
        if self.promoted {
            if let Some(text) = text {
                self.stack.set_top_name(Some(text.to_owned()));
            }
            self.promoted = false;
        }
    }

    /// Read a complete value into a [`JsonValue`] tree. Object members are
    /// insertion-ordered; duplicate keys fail with a data error naming both
    /// values.
    pub fn read_json_value(&mut self) -> Result<JsonValue> {
        match self.peek()? {
            Token::BeginArray => {
                self.begin_array()?;
                let mut items = Vec::new();
                while self.has_next()? {
                    items.push(self.read_json_value()?);
                }
                self.end_array()?;
                Ok(JsonValue::Array(items))
            }
            Token::BeginObject => {
                self.begin_object()?;
                let mut members: IndexMap<String, JsonValue> = IndexMap::new();
                while self.has_next()? {
                    let name = self.next_name()?;
                    let value = self.read_json_value()?;
                    if let Some(first) = members.get(&name) {
                        return Err(JsonError::new(JsonErrorKind::DuplicateKey {
                            key: name.clone(),
                            first: first.describe(),
                            second: value.describe(),
                        })
                        .with_path(self.path()));
                    }
                    members.insert(name, value);
                }
                self.end_object()?;
                Ok(JsonValue::Object(members))
            }
            Token::String => Ok(JsonValue::String(self.next_string()?)),
            Token::Number => {
                if self.peeked == Peeked::Long {
                    Ok(JsonValue::Number(Number::Int(self.next_i64()?)))
                } else {
                    Ok(JsonValue::Number(Number::Float(self.next_f64()?)))
                }
            }
            Token::Boolean => Ok(JsonValue::Bool(self.next_bool()?)),
            Token::Null => {
                self.next_null()?;
                Ok(JsonValue::Null)
            }
            Token::Name | Token::EndArray | Token::EndObject | Token::EndDocument => {
                Err(self.unexpected("a value"))
            }
        }
    }

    /// Fork an independent reader over the bytes of the value (or open
    /// container) currently being read. The parent is unchanged; the fork
    /// sees end-of-document where the value ends.
    pub fn peek_json(&mut self) -> Result<JsonReader> {
        // Each open array/object frame (a dangling name replaces its
        // object scope) consumed a `[` or `{` whose closer the lookahead
        // scanner must still account for.
        let mut open_frames = self.stack.open_containers();

        let start = match self.peeked {
            Peeked::BeginArray | Peeked::BeginObject => {
                open_frames += 1;
                StartState::Json
            }
            Peeked::EndArray | Peeked::EndObject => {
                open_frames = open_frames.saturating_sub(1);
                StartState::Json
            }
            Peeked::DoubleQuoted | Peeked::DoubleQuotedName => StartState::DoubleQuoted,
            Peeked::SingleQuoted | Peeked::SingleQuotedName => StartState::SingleQuoted,
            Peeked::Unquoted | Peeked::UnquotedName if open_frames == 0 => StartState::Scalar,
            _ => StartState::Json,
        };

        let fork_source = ValueSource::with_state(self.source.peek_source(), open_frames, start);
        Ok(JsonReader {
            source: Box::new(fork_source),
            lenient: self.lenient,
            fail_on_unknown: self.fail_on_unknown,
            stack: self.stack.clone(),
            peeked: self.peeked,
            peeked_long: self.peeked_long,
            peeked_number_length: self.peeked_number_length,
            peeked_string: self.peeked_string.clone(),
            promoted: self.promoted,
            audit: self.audit.clone(),
        })
    }

    /// Close the reader. Closing mid-document is always allowed.
    pub fn close(&mut self) {
        self.peeked = Peeked::None;
        self.stack = ScopeStack::with_root(Scope::Closed);
    }

    fn next_quoted_value(&mut self, quote: u8) -> Result<String> {
        let terminators = [quote, b'\\'];
        let mut builder: Option<String> = None;
        loop {
            let index = self
                .source
                .index_of_element(&terminators, 0)?
                .ok_or_else(|| {
                    self.syntax(JsonErrorKind::UnexpectedEof {
                        expected: "a closing quote",
                    })
                })?;
            if self.source.get_byte(index) == b'\\' {
                let builder = builder.get_or_insert_with(String::new);
                builder.push_str(&self.source.read_utf8(index)?);
                self.source.skip(1)?; // the backslash
                let escaped = self.read_escape_character()?;
                builder.push(escaped);
                continue;
            }
            let run = self.source.read_utf8(index)?;
            self.source.skip(1)?; // the closing quote
            return Ok(match builder {
                Some(mut b) => {
                    b.push_str(&run);
                    b
                }
                None => run,
            });
        }
    }

    fn next_unquoted_value(&mut self) -> Result<String> {
        const TERMINATORS: &[u8] = b"/\\;#={}[]:, \t\x0c\r\n";
        let n = match self.source.index_of_element(TERMINATORS, 0)? {
            Some(i) => i,
            None => {
                // Value runs to end of input.
                let mut i = 0;
                while self.source.request(i + 1)? {
                    i += 1;
                }
                i
            }
        };
        self.source.read_utf8(n)
    }

    fn skip_quoted_value(&mut self, quote: u8) -> Result<()> {
        let terminators = [quote, b'\\'];
        loop {
            let index = self
                .source
                .index_of_element(&terminators, 0)?
                .ok_or_else(|| {
                    self.syntax(JsonErrorKind::UnexpectedEof {
                        expected: "a closing quote",
                    })
                })?;
            if self.source.get_byte(index) == b'\\' {
                self.source.skip(index + 1)?;
                self.read_escape_character()?;
            } else {
                self.source.skip(index + 1)?;
                return Ok(());
            }
        }
    }

    fn skip_unquoted_value(&mut self) -> Result<()> {
        const TERMINATORS: &[u8] = b"/\\;#={}[]:, \t\x0c\r\n";
        let n = match self.source.index_of_element(TERMINATORS, 0)? {
            Some(i) => i,
            None => {
                let mut i = 0;
                while self.source.request(i + 1)? {
                    i += 1;
                }
                i
            }
        };
        self.source.skip(n)
    }

    fn read_escape_character(&mut self) -> Result<char> {
        let escaped = self.source.read_byte().map_err(|_| {
            self.syntax(JsonErrorKind::UnexpectedEof {
                expected: "an escape sequence",
            })
        })?;
        match escaped {
            b'u' => self.read_unicode_escape(),
            b't' => Ok('\t'),
            b'b' => Ok('\u{8}'),
            b'n' => Ok('\n'),
            b'r' => Ok('\r'),
            b'f' => Ok('\u{c}'),
            b'\n' => {
                self.check_lenient("escaped newlines")?;
                Ok('\n')
            }
            b'\'' | b'"' | b'\\' | b'/' => Ok(escaped as char),
            other => Err(self.syntax(JsonErrorKind::UnexpectedChar {
                ch: other as char,
                expected: "a valid escape sequence",
            })),
        }
    }

    fn read_unicode_escape(&mut self) -> Result<char> {
        let unit = self.read_hex4()?;
        // Surrogate pairs arrive as two consecutive \u escapes.
        if (0xd800..0xdc00).contains(&unit) {
            if self.source.request(2)?
                && self.source.get_byte(0) == b'\\'
                && self.source.get_byte(1) == b'u'
            {
                self.source.skip(2)?;
                let low = self.read_hex4()?;
                if (0xdc00..0xe000).contains(&low) {
                    let combined =
                        0x10000 + ((unit - 0xd800) << 10) + (low - 0xdc00);
                    if let Some(c) = char::from_u32(combined) {
                        return Ok(c);
                    }
                }
            }
            return Err(self.syntax(JsonErrorKind::MalformedUtf8));
        }
        if (0xdc00..0xe000).contains(&unit) {
            return Err(self.syntax(JsonErrorKind::MalformedUtf8));
        }
        char::from_u32(unit).ok_or_else(|| self.syntax(JsonErrorKind::MalformedUtf8))
    }

    fn read_hex4(&mut self) -> Result<u32> {
        self.source.require(4).map_err(|_| {
            self.syntax(JsonErrorKind::UnexpectedEof {
                expected: "four hex digits",
            })
        })?;
        let mut result: u32 = 0;
        for _ in 0..4 {
            let c = self.source.read_byte()?;
            let digit = match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                b'A'..=b'F' => c - b'A' + 10,
                _ => {
                    return Err(self.syntax(JsonErrorKind::UnexpectedChar {
                        ch: c as char,
                        expected: "a hex digit",
                    }));
                }
            };
            result = (result << 4) | digit as u32;
        }
        Ok(result)
    }
}

/// Parse a JSON number, accepting the lenient non-finite spellings.
fn parse_f64(text: &str) -> Option<f64> {
    use lexical_parse_float::FromLexical;
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => f64::from_lexical(text.as_bytes()).ok(),
    }
}

fn parse_i64(text: &str) -> core::result::Result<i64, ()> {
    use lexical_parse_integer::FromLexical;
    i64::from_lexical(text.as_bytes()).map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(s: &str) -> JsonReader {
        JsonReader::new(Buffer::from(s))
    }

    #[test]
    fn peek_does_not_consume() {
        let mut r = reader("[true]");
        assert_eq!(r.peek().unwrap(), Token::BeginArray);
        assert_eq!(r.peek().unwrap(), Token::BeginArray);
        r.begin_array().unwrap();
        assert_eq!(r.peek().unwrap(), Token::Boolean);
        assert!(r.next_bool().unwrap());
        r.end_array().unwrap();
        assert_eq!(r.peek().unwrap(), Token::EndDocument);
    }

    #[test]
    fn paths_track_consumption() {
        let mut r = reader(r#"{"a":[1,2]}"#);
        r.begin_object().unwrap();
        assert_eq!(r.next_name().unwrap(), "a");
        assert_eq!(r.path(), "$.a");
        r.begin_array().unwrap();
        assert_eq!(r.path(), "$.a[0]");
        assert_eq!(r.next_i32().unwrap(), 1);
        assert_eq!(r.path(), "$.a[1]");
        assert_eq!(r.next_i32().unwrap(), 2);
        r.end_array().unwrap();
        r.end_object().unwrap();
    }

    #[test]
    fn strict_rejects_comments() {
        let mut r = reader("[1] // done");
        r.begin_array().unwrap();
        r.next_i32().unwrap();
        r.end_array().unwrap();
        let err = r.peek().unwrap_err();
        assert!(matches!(err.kind, JsonErrorKind::StrictModeViolation { .. }));
    }

    #[test]
    fn lenient_accepts_the_extensions() {
        let mut r = reader("/* hi */ {a: 'b', \"c\": NaN,} # done");
        r.set_lenient(true);
        r.begin_object().unwrap();
        assert_eq!(r.next_name().unwrap(), "a");
        assert_eq!(r.next_string().unwrap(), "b");
        assert_eq!(r.next_name().unwrap(), "c");
        assert!(r.next_f64().unwrap().is_nan());
        r.end_object().unwrap();
    }

    #[test]
    fn numbers_parse_exactly() {
        let mut r = reader("[912345678901, 1.5, \"17\"]");
        r.begin_array().unwrap();
        assert_eq!(r.next_i64().unwrap(), 912345678901);
        let err = r.next_i64().unwrap_err();
        assert!(matches!(err.kind, JsonErrorKind::NumberOutOfRange { .. }));
    }

    #[test]
    fn string_coercion_for_numbers() {
        let mut r = reader("[\"17\", \"1.25\"]");
        r.begin_array().unwrap();
        assert_eq!(r.next_i64().unwrap(), 17);
        assert_eq!(r.next_f64().unwrap(), 1.25);
        r.end_array().unwrap();
    }

    #[test]
    fn select_name_hits_and_misses() {
        let options = Options::of(&["id", "name"]);
        let mut r = reader(r#"{"name":"x","age":3}"#);
        r.begin_object().unwrap();
        assert_eq!(r.select_name(&options).unwrap(), Some(1));
        assert_eq!(r.next_string().unwrap(), "x");
        assert_eq!(r.select_name(&options).unwrap(), None);
        assert_eq!(r.next_name().unwrap(), "age");
        assert_eq!(r.next_i32().unwrap(), 3);
        r.end_object().unwrap();
    }

    #[test]
    fn escapes_decode() {
        let mut r = reader(r#""a\nbA😀""#);
        assert_eq!(r.next_string().unwrap(), "a\nbA😀");
    }

    #[test]
    fn duplicate_keys_fail_in_tree_reads() {
        let mut r = reader(r#"{"a":1,"a":2}"#);
        let err = r.read_json_value().unwrap_err();
        match err.kind {
            JsonErrorKind::DuplicateKey { key, first, second } => {
                assert_eq!(key, "a");
                assert_eq!(first, "1");
                assert_eq!(second, "2");
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(err.path.as_deref(), Some("$.a"));
    }

    #[test]
    fn skip_value_spans_nesting() {
        let mut r = reader(r#"{"a":{"b":[1,2,{"c":3}]},"d":4}"#);
        r.begin_object().unwrap();
        r.next_name().unwrap();
        r.skip_value().unwrap();
        assert_eq!(r.next_name().unwrap(), "d");
        assert_eq!(r.next_i32().unwrap(), 4);
        r.end_object().unwrap();
    }

    #[test]
    fn peek_json_forks_without_consuming() {
        let mut r = reader("[123,456,789]");
        r.begin_array().unwrap();
        assert_eq!(r.next_i32().unwrap(), 123);

        let mut fork = r.peek_json().unwrap();
        assert_eq!(fork.next_i32().unwrap(), 456);
        assert_eq!(fork.next_i32().unwrap(), 789);
        fork.end_array().unwrap();
        assert_eq!(fork.peek().unwrap(), Token::EndDocument);

        assert_eq!(r.next_i32().unwrap(), 456);
        assert_eq!(r.next_i32().unwrap(), 789);
        r.end_array().unwrap();
    }

    #[test]
    fn promote_name_to_value_serves_name_as_string() {
        let mut r = reader(r#"{"12":true}"#);
        r.begin_object().unwrap();
        r.promote_name_to_value().unwrap();
        assert_eq!(r.next_i32().unwrap(), 12);
        assert!(r.next_bool().unwrap());
        r.end_object().unwrap();
    }
}

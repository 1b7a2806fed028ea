//! Lookahead source: bounds a byte stream to exactly one JSON value.
//!
//! Used by `JsonReader::peek_json` to hand a forked reader a view of the
//! bytes comprising the value (or open container) currently being read,
//! without consuming anything from the parent. The scanner tracks just
//! enough lexical state to know where the value ends: string quoting,
//! comment forms, and a structural nesting counter. Comment bytes advance
//! the scanner but are passed through verbatim; the reader layered on top
//! accepts or rejects them per its own lenient flag.

use crate::error::Result;
use crate::io::ByteSource;

/// Lexical state of the lookahead scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between tokens or inside structural/numeric text
    Json,
    /// Inside a `'`-quoted string
    SingleQuoted,
    /// Inside a `"`-quoted string
    DoubleQuoted,
    /// Inside `//` or `#` until end of line
    EndOfLineComment,
    /// Inside `/* ... */`
    CStyleComment,
    /// Inside an unquoted scalar at nesting depth zero
    Scalar,
    /// The value is complete
    EndOfJson,
}

/// Lexical state to resume from when the creating reader has already
/// consumed the opening bytes of the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartState {
    /// Between tokens
    #[default]
    Json,
    /// An opening `"` has been consumed
    DoubleQuoted,
    /// An opening `'` has been consumed
    SingleQuoted,
    /// Inside an unquoted scalar at depth zero
    Scalar,
}

/// A [`ByteSource`] decorator that yields the bytes of exactly one
/// top-level JSON value and then reports exhaustion, leaving any following
/// bytes untouched in the upstream cursor.
pub struct ValueSource {
    upstream: Box<dyn ByteSource>,
    /// Bytes confirmed to belong to the value, not yet consumed downstream
    window: Vec<u8>,
    /// Read position within `window`
    head: usize,
    state: State,
    /// Open arrays/objects; the value ends when this returns to zero
    depth: usize,
    /// Escape pending inside a quoted string
    escaped: bool,
    /// Bytes consumed by the downstream reader
    consumed: usize,
}

impl ValueSource {
    /// Wrap `upstream` so that reads stop at the end of the current value.
    /// `open_frames` is the number of arrays/objects already entered by the
    /// parent reader; the scan ends when nesting returns to zero.
    pub fn new(upstream: Box<dyn ByteSource>, open_frames: usize) -> Self {
        ValueSource::with_state(upstream, open_frames, StartState::Json)
    }

    /// Like [`new`](Self::new), but resuming mid-token: `start` names the
    /// lexical state the creating reader left the byte stream in.
    pub fn with_state(upstream: Box<dyn ByteSource>, open_frames: usize, start: StartState) -> Self {
        ValueSource {
            upstream,
            window: Vec::new(),
            head: 0,
            state: match start {
                StartState::Json => State::Json,
                StartState::DoubleQuoted => State::DoubleQuoted,
                StartState::SingleQuoted => State::SingleQuoted,
                StartState::Scalar => State::Scalar,
            },
            depth: open_frames,
            escaped: false,
            consumed: 0,
        }
    }

    fn available(&self) -> usize {
        self.window.len() - self.head
    }

    /// Pull one byte from upstream into the window, advancing the scan.
    /// Returns false once the value (or the upstream) is complete.
    fn advance(&mut self) -> Result<bool> {
        if self.state == State::EndOfJson {
            return Ok(false);
        }
        if !self.upstream.request(1)? {
            self.state = State::EndOfJson;
            return Ok(false);
        }
        let b = self.upstream.read_byte()?;

        match self.state {
            State::Json => match b {
                b'[' | b'{' => self.depth += 1,
                b']' | b'}' => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        self.window.push(b);
                        self.state = State::EndOfJson;
                        return Ok(true);
                    }
                }
                b'"' => self.state = State::DoubleQuoted,
                b'\'' => self.state = State::SingleQuoted,
                b'/' => {
                    if self.upstream.request(1)? {
                        match self.upstream.get_byte(0) {
                            b'/' => {
                                self.window.push(b);
                                self.upstream.skip(1)?;
                                self.window.push(b'/');
                                self.state = State::EndOfLineComment;
                                return Ok(true);
                            }
                            b'*' => {
                                self.window.push(b);
                                self.upstream.skip(1)?;
                                self.window.push(b'*');
                                self.state = State::CStyleComment;
                                return Ok(true);
                            }
                            _ => {}
                        }
                    }
                }
                b'#' => self.state = State::EndOfLineComment,
                b' ' | b'\t' | b'\r' | b'\n' | b':' | b',' | b';' => {}
                _ if self.depth == 0 => self.state = State::Scalar,
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted => {
                let terminator = if self.state == State::SingleQuoted {
                    b'\''
                } else {
                    b'"'
                };
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == terminator {
                    if self.depth == 0 {
                        self.window.push(b);
                        self.state = State::EndOfJson;
                        return Ok(true);
                    }
                    self.state = State::Json;
                }
            }
            State::EndOfLineComment => {
                if b == b'\n' || b == b'\r' {
                    self.state = State::Json;
                }
            }
            State::CStyleComment => {
                if b == b'/' && self.window.last() == Some(&b'*') {
                    self.state = State::Json;
                }
            }
            State::Scalar => {
                match b {
                    b' ' | b'\t' | b'\r' | b'\n' | b',' | b';' | b']' | b'}' | b'/' | b'#' => {
                        // Delimiter: the scalar ended one byte ago. The
                        // delimiter is not part of the value and stays
                        // unconsumed as far as downstream is concerned.
                        self.state = State::EndOfJson;
                        return Ok(false);
                    }
                    _ => {}
                }
            }
            State::EndOfJson => return Ok(false),
        }

        self.window.push(b);
        Ok(true)
    }

    fn fill(&mut self, n: usize) -> Result<bool> {
        while self.available() < n {
            if !self.advance()? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl ByteSource for ValueSource {
    fn request(&mut self, n: usize) -> Result<bool> {
        self.fill(n)
    }

    fn get_byte(&self, i: usize) -> u8 {
        self.window[self.head + i]
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.require(1)?;
        let b = self.window[self.head];
        self.head += 1;
        self.consumed += 1;
        Ok(b)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.head += n;
        self.consumed += n;
        Ok(())
    }

    fn index_of_element(&mut self, targets: &[u8], from: usize) -> Result<Option<usize>> {
        let mut i = from;
        loop {
            if self.available() <= i && !self.fill(i + 1)? {
                return Ok(None);
            }
            if targets.contains(&self.get_byte(i)) {
                return Ok(Some(i));
            }
            i += 1;
        }
    }

    fn read_utf8(&mut self, n: usize) -> Result<String> {
        self.require(n)?;
        let bytes = &self.window[self.head..self.head + n];
        let s = core::str::from_utf8(bytes)
            .map_err(|_| {
                crate::error::JsonError::new(crate::error::JsonErrorKind::MalformedUtf8)
                    .at(self.consumed)
            })?
            .to_owned();
        self.head += n;
        self.consumed += n;
        Ok(s)
    }

    fn position(&self) -> usize {
        self.consumed
    }

    fn peek_source(&self) -> Box<dyn ByteSource> {
        Box::new(ValueSource {
            upstream: self.upstream.peek_source(),
            window: self.window[self.head..].to_vec(),
            head: 0,
            state: self.state,
            depth: self.depth,
            escaped: self.escaped,
            consumed: self.consumed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Buffer;

    fn drain(mut source: ValueSource) -> Vec<u8> {
        let mut out = Vec::new();
        while source.request(1).unwrap() {
            out.push(source.read_byte().unwrap());
        }
        out
    }

    #[test]
    fn bounds_one_object() {
        let buf = Buffer::from(r#"{"a":[1,2]} trailing"#);
        let source = ValueSource::new(buf.peek_source(), 0);
        assert_eq!(drain(source), br#"{"a":[1,2]}"#.to_vec());
    }

    #[test]
    fn bounds_one_string_with_escapes() {
        let buf = Buffer::from(r#""a\"]b" , 9"#);
        let source = ValueSource::new(buf.peek_source(), 0);
        assert_eq!(drain(source), br#""a\"]b""#.to_vec());
    }

    #[test]
    fn bounds_scalar_at_root() {
        let buf = Buffer::from("456,789]");
        let source = ValueSource::new(buf.peek_source(), 0);
        assert_eq!(drain(source), b"456".to_vec());
    }

    #[test]
    fn open_frames_extend_to_container_end() {
        let buf = Buffer::from("456,789],true");
        let source = ValueSource::new(buf.peek_source(), 1);
        assert_eq!(drain(source), b"456,789]".to_vec());
    }

    #[test]
    fn comments_pass_through() {
        let buf = Buffer::from("[1, /* two */ 2] rest");
        let source = ValueSource::new(buf.peek_source(), 0);
        assert_eq!(drain(source), b"[1, /* two */ 2]".to_vec());
    }
}

//! Byte stream abstraction the tokenizers run on.
//!
//! The reader and writer never touch `std::io` directly; they speak to a
//! buffered [`ByteSource`] / [`ByteSink`] pair. The contract is small and
//! deliberately byte-oriented: the reader peeks into a required window with
//! [`ByteSource::get_byte`], scans for terminators with
//! [`ByteSource::index_of_element`], and matches prepared name sets with
//! [`ByteSource::select`]. [`Buffer`] is the in-memory implementation and
//! doubles as source and sink.

use std::sync::Arc;

use crate::error::{JsonError, JsonErrorKind, Result};

/// A buffered source of UTF-8 bytes.
///
/// Positions passed to [`get_byte`](Self::get_byte) are relative to the
/// current read position and must have been made available by a prior
/// successful [`request`](Self::request).
pub trait ByteSource {
    /// Try to make `n` bytes available without consuming them. Returns
    /// false when the stream ends before `n` bytes.
    fn request(&mut self, n: usize) -> Result<bool>;

    /// Make `n` bytes available or fail with an EOF syntax error.
    fn require(&mut self, n: usize) -> Result<()> {
        if self.request(n)? {
            Ok(())
        } else {
            Err(JsonError::new(JsonErrorKind::UnexpectedEof {
                expected: "more input",
            })
            .at(self.position()))
        }
    }

    /// Peek the byte at offset `i` from the current position. The byte must
    /// be inside a previously requested window.
    fn get_byte(&self, i: usize) -> u8;

    /// Consume and return one byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Consume `n` bytes.
    fn skip(&mut self, n: usize) -> Result<()>;

    /// Find the offset (relative to the current position) of the first byte
    /// that is a member of `targets`, starting the search at offset `from`.
    /// Returns `None` when the stream ends first.
    fn index_of_element(&mut self, targets: &[u8], from: usize) -> Result<Option<usize>>;

    /// Consume `n` bytes and decode them as UTF-8.
    fn read_utf8(&mut self, n: usize) -> Result<String>;

    /// Absolute offset of the current position from the start of the stream.
    fn position(&self) -> usize;

    /// True when no bytes remain.
    fn exhausted(&mut self) -> Result<bool> {
        Ok(!self.request(1)?)
    }

    /// If the upcoming bytes exactly equal one of the prepared options,
    /// consume them and return the option's index. No state changes on a
    /// miss.
    fn select(&mut self, options: &[Box<[u8]>]) -> Result<Option<usize>> {
        'options: for (index, option) in options.iter().enumerate() {
            if !self.request(option.len())? {
                continue;
            }
            for (i, &expected) in option.iter().enumerate() {
                if self.get_byte(i) != expected {
                    continue 'options;
                }
            }
            self.skip(option.len())?;
            return Ok(Some(index));
        }
        Ok(None)
    }

    /// An independent cursor over the remaining bytes. Reading from the
    /// returned source does not consume from `self`.
    fn peek_source(&self) -> Box<dyn ByteSource>;
}

/// A sink for UTF-8 bytes.
pub trait ByteSink {
    /// Append a string's UTF-8 bytes.
    fn write_utf8(&mut self, s: &str) -> Result<()>;

    /// Append one byte.
    fn write_byte(&mut self, b: u8) -> Result<()>;

    /// Append a byte slice.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered bytes to the underlying medium.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// In-memory byte buffer implementing both [`ByteSource`] and [`ByteSink`].
///
/// The backing storage is shared, so [`ByteSource::peek_source`] is a cheap
/// clone of the cursor. Writing after a peek copies on write.
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    data: Arc<Vec<u8>>,
    pos: usize,
}

impl Buffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Buffer::default()
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when no unread bytes remain.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// The unread bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    /// Consume the buffer, returning the unread bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        if self.pos == 0 {
            Arc::try_unwrap(self.data).unwrap_or_else(|arc| (*arc).clone())
        } else {
            self.data[self.pos..].to_vec()
        }
    }

    /// Consume the buffer, decoding the unread bytes as UTF-8.
    pub fn into_string(self) -> Result<String> {
        String::from_utf8(self.into_bytes())
            .map_err(|_| JsonError::new(JsonErrorKind::MalformedUtf8))
    }
}

impl From<&str> for Buffer {
    fn from(s: &str) -> Self {
        Buffer {
            data: Arc::new(s.as_bytes().to_vec()),
            pos: 0,
        }
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Buffer {
            data: Arc::new(bytes.to_vec()),
            pos: 0,
        }
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Buffer {
            data: Arc::new(bytes),
            pos: 0,
        }
    }
}

impl ByteSource for Buffer {
    fn request(&mut self, n: usize) -> Result<bool> {
        Ok(self.pos + n <= self.data.len())
    }

    fn get_byte(&self, i: usize) -> u8 {
        self.data[self.pos + i]
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.require(1)?;
        let b = self.data[self.pos];
        self.pos += 1;
        Ok(b)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }

    fn index_of_element(&mut self, targets: &[u8], from: usize) -> Result<Option<usize>> {
        let haystack = &self.data[(self.pos + from).min(self.data.len())..];
        let found = match *targets {
            [a] => memchr::memchr(a, haystack),
            [a, b] => memchr::memchr2(a, b, haystack),
            [a, b, c] => memchr::memchr3(a, b, c, haystack),
            _ => haystack.iter().position(|b| targets.contains(b)),
        };
        Ok(found.map(|i| from + i))
    }

    fn read_utf8(&mut self, n: usize) -> Result<String> {
        self.require(n)?;
        let bytes = &self.data[self.pos..self.pos + n];
        let s = core::str::from_utf8(bytes)
            .map_err(|_| JsonError::new(JsonErrorKind::MalformedUtf8).at(self.pos))?
            .to_owned();
        self.pos += n;
        Ok(s)
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn peek_source(&self) -> Box<dyn ByteSource> {
        Box::new(self.clone())
    }
}

impl ByteSink for Buffer {
    fn write_utf8(&mut self, s: &str) -> Result<()> {
        Arc::make_mut(&mut self.data).extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn write_byte(&mut self, b: u8) -> Result<()> {
        Arc::make_mut(&mut self.data).push(b);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Arc::make_mut(&mut self.data).extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_get() {
        let mut buf = Buffer::from("abc");
        assert!(buf.request(3).unwrap());
        assert!(!buf.request(4).unwrap());
        assert_eq!(buf.get_byte(1), b'b');
        assert_eq!(buf.read_byte().unwrap(), b'a');
        assert_eq!(buf.position(), 1);
    }

    #[test]
    fn index_of_element_scans_from_offset() {
        let mut buf = Buffer::from(r#"name": 1"#);
        assert_eq!(
            buf.index_of_element(b"\"\\", 0).unwrap(),
            Some(4)
        );
        assert_eq!(buf.index_of_element(b"x", 0).unwrap(), None);
    }

    #[test]
    fn select_consumes_only_on_match() {
        let options: Vec<Box<[u8]>> = vec![
            b"alpha\"".to_vec().into_boxed_slice(),
            b"beta\"".to_vec().into_boxed_slice(),
        ];
        let mut buf = Buffer::from("beta\": 1");
        assert_eq!(buf.select(&options).unwrap(), Some(1));
        assert_eq!(buf.position(), 5);

        let mut miss = Buffer::from("gamma\": 1");
        assert_eq!(miss.select(&options).unwrap(), None);
        assert_eq!(miss.position(), 0);
    }

    #[test]
    fn peek_source_is_independent() {
        let mut buf = Buffer::from("xyz");
        buf.read_byte().unwrap();
        let mut peek = buf.peek_source();
        assert_eq!(peek.read_byte().unwrap(), b'y');
        assert_eq!(peek.read_byte().unwrap(), b'z');
        assert_eq!(buf.read_byte().unwrap(), b'y');
    }
}

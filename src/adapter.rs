//! The adapter contract and its compositional wrappers.
//!
//! An adapter converts between JSON tokens and one value shape, in both
//! directions. Adapters own no state beyond their sub-adapters, so a
//! built [`Adapter`] handle is a cheap clone and safe to reuse across
//! documents.

use std::sync::Arc;

use crate::any::{AnyValue, FromAny, IntoAny};
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::io::Buffer;
use crate::reader::{JsonReader, Token};
use crate::writer::JsonWriter;

/// Erased bidirectional converter.
pub trait AnyAdapter: Send + Sync {
    /// Read one value from the reader.
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue>;

    /// Write one value to the writer.
    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()>;

    /// Which wrapper this adapter is, if it is one. Used to keep
    /// conflicting wrappers from stacking.
    fn wrapper_kind(&self) -> Option<WrapperKind> {
        None
    }
}

/// The compositional wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperKind {
    /// Serves nulls without consulting the inner adapter
    NullSafe,
    /// Refuses nulls on either side
    NonNull,
    /// Reads and writes with the lenient flag set
    Lenient,
    /// Reads with the fail-on-unknown flag set
    FailOnUnknown,
    /// Writes with an overridden indent
    Indent,
}

/// A built adapter: public handle over an erased implementation.
#[derive(Clone)]
pub struct Adapter {
    inner: Arc<dyn AnyAdapter>,
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter").finish_non_exhaustive()
    }
}

impl Adapter {
    /// Wrap an erased adapter in a handle.
    pub fn new(inner: Arc<dyn AnyAdapter>) -> Adapter {
        Adapter { inner }
    }

    /// The erased adapter behind this handle.
    pub fn erased(&self) -> &Arc<dyn AnyAdapter> {
        &self.inner
    }

    /// Read one value from `reader`.
    pub fn from_json(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        self.inner.read(reader)
    }

    /// Read one value from a JSON string. Unless this adapter is lenient,
    /// the document must contain nothing after the value.
    pub fn from_json_str(&self, json: &str) -> Result<AnyValue> {
        let mut reader = JsonReader::new(Buffer::from(json));
        let value = self.inner.read(&mut reader)?;
        if self.inner.wrapper_kind() != Some(WrapperKind::Lenient)
            && reader.peek()? != Token::EndDocument
        {
            return Err(JsonError::new(JsonErrorKind::UnexpectedToken {
                expected: "END_DOCUMENT",
                got: "more input",
            })
            .with_path(reader.path()));
        }
        Ok(value)
    }

    /// Write `value` to `writer`.
    pub fn to_json(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        self.inner.write(writer, value)
    }

    /// Write `value` to a compact JSON string.
    pub fn to_json_string(&self, value: &AnyValue) -> Result<String> {
        self.to_json_string_with_indent(value, "")
    }

    /// Write `value` to a JSON string with the given indent.
    pub fn to_json_string_with_indent(&self, value: &AnyValue, indent: &str) -> Result<String> {
        let mut buffer = Buffer::new();
        {
            let mut writer = JsonWriter::new(&mut buffer);
            writer.set_indent(indent);
            self.inner.write(&mut writer, value)?;
            writer.close()?;
        }
        buffer.into_string()
    }

    /// Read a typed value from a JSON string.
    pub fn read<T: FromAny>(&self, json: &str) -> Result<T> {
        T::from_any(self.from_json_str(json)?)
    }

    /// Write a typed value to a compact JSON string.
    pub fn write_value<T: IntoAny>(&self, value: T) -> Result<String> {
        self.to_json_string(&value.into_any())
    }

    /// An adapter that serves JSON nulls as null values without consulting
    /// this one. Already-null-safe adapters are returned unchanged.
    pub fn null_safe(&self) -> Adapter {
        match self.inner.wrapper_kind() {
            Some(WrapperKind::NullSafe) => self.clone(),
            _ => Adapter::new(Arc::new(NullSafeAdapter {
                delegate: self.inner.clone(),
            })),
        }
    }

    /// An adapter that refuses null on either side with a data error.
    /// Already-non-null adapters are returned unchanged.
    pub fn non_null(&self) -> Adapter {
        match self.inner.wrapper_kind() {
            Some(WrapperKind::NonNull) => self.clone(),
            _ => Adapter::new(Arc::new(NonNullAdapter {
                delegate: self.inner.clone(),
            })),
        }
    }

    /// An adapter that sets the lenient flag for the duration of each
    /// call, restoring it on every exit path.
    pub fn lenient(&self) -> Adapter {
        Adapter::new(Arc::new(LenientAdapter {
            delegate: self.inner.clone(),
        }))
    }

    /// An adapter that sets the reader's fail-on-unknown flag for the
    /// duration of each read.
    pub fn fail_on_unknown(&self) -> Adapter {
        Adapter::new(Arc::new(FailOnUnknownAdapter {
            delegate: self.inner.clone(),
        }))
    }

    /// An adapter that overrides the writer's indent for the duration of
    /// each write.
    pub fn indent(&self, indent: &str) -> Adapter {
        Adapter::new(Arc::new(IndentAdapter {
            delegate: self.inner.clone(),
            indent: indent.to_owned(),
        }))
    }
}

struct NullSafeAdapter {
    delegate: Arc<dyn AnyAdapter>,
}

impl AnyAdapter for NullSafeAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        if reader.peek()? == Token::Null {
            reader.next_null()?;
            Ok(AnyValue::null())
        } else {
            self.delegate.read(reader)
        }
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        if value.is_null() {
            writer.null_value()
        } else {
            self.delegate.write(writer, value)
        }
    }

    fn wrapper_kind(&self) -> Option<WrapperKind> {
        Some(WrapperKind::NullSafe)
    }
}

struct NonNullAdapter {
    delegate: Arc<dyn AnyAdapter>,
}

impl AnyAdapter for NonNullAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        if reader.peek()? == Token::Null {
            return Err(JsonError::new(JsonErrorKind::UnexpectedNull {
                target: "a non-null value".to_owned(),
            })
            .with_path(reader.path()));
        }
        self.delegate.read(reader)
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        if value.is_null() {
            return Err(JsonError::new(JsonErrorKind::UnexpectedNull {
                target: "a non-null value".to_owned(),
            })
            .with_path(writer.path()));
        }
        self.delegate.write(writer, value)
    }

    fn wrapper_kind(&self) -> Option<WrapperKind> {
        Some(WrapperKind::NonNull)
    }
}

struct LenientAdapter {
    delegate: Arc<dyn AnyAdapter>,
}

impl AnyAdapter for LenientAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        let was = reader.is_lenient();
        reader.set_lenient(true);
        let result = self.delegate.read(reader);
        reader.set_lenient(was);
        result
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let was = writer.is_lenient();
        writer.set_lenient(true);
        let result = self.delegate.write(writer, value);
        writer.set_lenient(was);
        result
    }

    fn wrapper_kind(&self) -> Option<WrapperKind> {
        Some(WrapperKind::Lenient)
    }
}

struct FailOnUnknownAdapter {
    delegate: Arc<dyn AnyAdapter>,
}

impl AnyAdapter for FailOnUnknownAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        let was = reader.fails_on_unknown();
        reader.set_fail_on_unknown(true);
        let result = self.delegate.read(reader);
        reader.set_fail_on_unknown(was);
        result
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        self.delegate.write(writer, value)
    }

    fn wrapper_kind(&self) -> Option<WrapperKind> {
        Some(WrapperKind::FailOnUnknown)
    }
}

struct IndentAdapter {
    delegate: Arc<dyn AnyAdapter>,
    indent: String,
}

impl AnyAdapter for IndentAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        self.delegate.read(reader)
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let was = writer.indent().to_owned();
        writer.set_indent(&self.indent);
        let result = self.delegate.write(writer, value);
        writer.set_indent(&was);
        result
    }

    fn wrapper_kind(&self) -> Option<WrapperKind> {
        Some(WrapperKind::Indent)
    }
}

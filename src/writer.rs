//! Push emitter: calls in, bytes out.
//!
//! Names are deferred: `name` records the property name and the following
//! value call emits both, so that a skipped null (when `serialize_nulls`
//! is off) drops the pair atomically. The writer validates every call
//! against the scope stack and renders the same JsonPath as the reader.

use crate::error::{JsonError, JsonErrorKind, Result};
use crate::io::ByteSink;
use crate::scope::{Scope, ScopeStack};
use crate::value::{JsonValue, Number};

/// Opaque token returned by [`JsonWriter::begin_flatten`], restoring the
/// previous flattening state when handed back to
/// [`JsonWriter::end_flatten`].
#[derive(Debug, Clone, Copy)]
pub struct FlattenToken(i32);

/// Push emitter over a byte sink.
pub struct JsonWriter<'a> {
    sink: &'a mut dyn ByteSink,
    stack: ScopeStack,
    /// Indent per nesting level; empty means compact output
    indent: String,
    lenient: bool,
    serialize_nulls: bool,
    deferred_name: Option<String>,
    promote_value_to_name: bool,
    /// Stack size eligible for flattening, or the bitwise complement of
    /// the depth currently being flattened. Zero when inactive.
    flatten_stack_size: i32,
}

impl<'a> JsonWriter<'a> {
    /// Create a writer over a byte sink.
    pub fn new(sink: &'a mut dyn ByteSink) -> Self {
        JsonWriter {
            sink,
            stack: ScopeStack::with_root(Scope::EmptyDocument),
            indent: String::new(),
            lenient: false,
            serialize_nulls: true,
            deferred_name: None,
            promote_value_to_name: false,
            flatten_stack_size: 0,
        }
    }

    /// Whether non-finite numbers and multiple top-level values are
    /// accepted.
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// Accept non-finite numbers and multiple top-level values.
    pub fn set_lenient(&mut self, lenient: bool) {
        self.lenient = lenient;
    }

    /// Whether nulls are written for a deferred name.
    pub fn serializes_nulls(&self) -> bool {
        self.serialize_nulls
    }

    /// Write or drop name/null pairs.
    pub fn set_serialize_nulls(&mut self, serialize_nulls: bool) {
        self.serialize_nulls = serialize_nulls;
    }

    /// The current indent string; empty means compact.
    pub fn indent(&self) -> &str {
        &self.indent
    }

    /// Set the indent string. Non-empty turns on pretty output: a `": "`
    /// separator after names and a newline plus indent-per-level around
    /// scopes.
    pub fn set_indent(&mut self, indent: &str) {
        self.indent = indent.to_owned();
    }

    /// JsonPath to the current position.
    pub fn path(&self) -> String {
        self.stack.path()
    }

    fn nesting_problem(&self, message: &str) -> JsonError {
        JsonError::invalid_state(format!("{message} (nesting problem)")).with_path(self.path())
    }

    /// Open an array.
    pub fn begin_array(&mut self) -> Result<()> {
        self.open(Scope::EmptyArray, Scope::NonemptyArray, b'[')
    }

    /// Close the current array.
    pub fn end_array(&mut self) -> Result<()> {
        self.close_scope(Scope::EmptyArray, Scope::NonemptyArray, b']')
    }

    /// Open an object.
    pub fn begin_object(&mut self) -> Result<()> {
        self.open(Scope::EmptyObject, Scope::NonemptyObject, b'{')
    }

    /// Close the current object.
    pub fn end_object(&mut self) -> Result<()> {
        self.close_scope(Scope::EmptyObject, Scope::NonemptyObject, b'}')
    }

    fn open(&mut self, empty: Scope, nonempty: Scope, bracket: u8) -> Result<()> {
        if self.flatten_stack_size > 0
            && self.flatten_stack_size as usize == self.stack.len()
            && matches!(self.stack.peek()?, s if s == empty || s == nonempty)
        {
            // Cancel this open: the inner container is spliced into its
            // enclosing scope of the same kind until the matching close.
            self.flatten_stack_size = !self.flatten_stack_size;
            return Ok(());
        }
        self.write_deferred_name()?;
        self.before_value()?;
        self.stack.push(empty)?;
        self.sink.write_byte(bracket)?;
        Ok(())
    }

    fn close_scope(&mut self, empty: Scope, nonempty: Scope, bracket: u8) -> Result<()> {
        let context = self.stack.peek()?;
        if context != empty && context != nonempty {
            return Err(self.nesting_problem("close does not match the open scope"));
        }
        if let Some(name) = &self.deferred_name {
            return Err(JsonError::invalid_state(format!("dangling name: {name}"))
                .with_path(self.path()));
        }
        if self.flatten_stack_size < 0 && (!self.flatten_stack_size) as usize == self.stack.len() {
            // Cancel this close and become eligible to flatten again.
            self.flatten_stack_size = !self.flatten_stack_size;
            return Ok(());
        }
        self.promote_value_to_name = false;
        self.stack.pop();
        self.stack.bump_top_index();
        if context == nonempty {
            self.newline()?;
        }
        self.sink.write_byte(bracket)?;
        Ok(())
    }

    /// Record the property name for the next value.
    pub fn name(&mut self, name: &str) -> Result<()> {
        let context = self.stack.peek()?;
        if (context != Scope::EmptyObject && context != Scope::NonemptyObject)
            || self.deferred_name.is_some()
            || self.promote_value_to_name
        {
            return Err(self.nesting_problem("name is only allowed inside an object"));
        }
        self.deferred_name = Some(name.to_owned());
        self.stack.set_top_name(Some(name.to_owned()));
        Ok(())
    }

    fn write_deferred_name(&mut self) -> Result<()> {
        if let Some(name) = self.deferred_name.take() {
            self.before_name()?;
            write_escaped(self.sink, &name)?;
        }
        Ok(())
    }

    fn before_name(&mut self) -> Result<()> {
        match self.stack.peek()? {
            Scope::NonemptyObject => {
                self.sink.write_byte(b',')?;
            }
            Scope::EmptyObject => {}
            _ => return Err(self.nesting_problem("name is only allowed inside an object")),
        }
        self.newline()?;
        self.stack.replace_top(Scope::DanglingName);
        Ok(())
    }

    fn before_value(&mut self) -> Result<()> {
        match self.stack.peek()? {
            Scope::NonemptyDocument => {
                if !self.lenient {
                    return Err(JsonError::invalid_state(
                        "JSON must have only one top-level value",
                    ));
                }
                // stays NonemptyDocument
            }
            Scope::EmptyDocument => {
                self.stack.replace_top(Scope::NonemptyDocument);
            }
            Scope::EmptyArray => {
                self.stack.replace_top(Scope::NonemptyArray);
                self.newline()?;
            }
            Scope::NonemptyArray => {
                self.sink.write_byte(b',')?;
                self.newline()?;
            }
            Scope::DanglingName => {
                if self.indent.is_empty() {
                    self.sink.write_byte(b':')?;
                } else {
                    self.sink.write_utf8(": ")?;
                }
                self.stack.replace_top(Scope::NonemptyObject);
            }
            Scope::StreamingValue => {
                return Err(JsonError::invalid_state(
                    "the value sink must be closed before writer calls",
                ));
            }
            _ => return Err(self.nesting_problem("value is not allowed here")),
        }
        Ok(())
    }

    fn newline(&mut self) -> Result<()> {
        if self.indent.is_empty() {
            return Ok(());
        }
        self.sink.write_byte(b'\n')?;
        for _ in 1..self.stack.len() {
            self.sink.write_utf8(&self.indent)?;
        }
        Ok(())
    }

    /// Write a string value, or a name when a value-to-name promotion is
    /// pending.
    pub fn value_str(&mut self, value: &str) -> Result<()> {
        if self.promote_value_to_name {
            self.promote_value_to_name = false;
            return self.name(value);
        }
        self.write_deferred_name()?;
        self.before_value()?;
        write_escaped(self.sink, value)?;
        self.stack.bump_top_index();
        Ok(())
    }

    /// Write a boolean value.
    pub fn value_bool(&mut self, value: bool) -> Result<()> {
        if self.promote_value_to_name {
            self.promote_value_to_name = false;
            return self.name(if value { "true" } else { "false" });
        }
        self.write_deferred_name()?;
        self.before_value()?;
        self.sink.write_utf8(if value { "true" } else { "false" })?;
        self.stack.bump_top_index();
        Ok(())
    }

    /// Write an integer value.
    pub fn value_i64(&mut self, value: i64) -> Result<()> {
        let mut formatted = itoa::Buffer::new();
        let text = formatted.format(value);
        if self.promote_value_to_name {
            self.promote_value_to_name = false;
            return self.name(text);
        }
        self.write_deferred_name()?;
        self.before_value()?;
        self.sink.write_utf8(text)?;
        self.stack.bump_top_index();
        Ok(())
    }

    /// Write a floating-point value. Fails on non-finite values unless the
    /// writer is lenient.
    pub fn value_f64(&mut self, value: f64) -> Result<()> {
        if !self.lenient && !value.is_finite() {
            return Err(JsonError::new(JsonErrorKind::NonFiniteNumber {
                value: render_f64(value),
            })
            .with_path(self.path()));
        }
        let text = render_f64(value);
        if self.promote_value_to_name {
            self.promote_value_to_name = false;
            return self.name(&text);
        }
        self.write_deferred_name()?;
        self.before_value()?;
        self.sink.write_utf8(&text)?;
        self.stack.bump_top_index();
        Ok(())
    }

    /// Write a null, or drop the deferred name when `serialize_nulls` is
    /// off.
    pub fn null_value(&mut self) -> Result<()> {
        if self.promote_value_to_name {
            return Err(
                JsonError::invalid_state("null cannot be used as a map key").with_path(self.path())
            );
        }
        if self.deferred_name.is_some() {
            if self.serialize_nulls {
                self.write_deferred_name()?;
            } else {
                self.deferred_name = None;
                return Ok(()); // skip the name and the null
            }
        }
        self.before_value()?;
        self.sink.write_utf8("null")?;
        self.stack.bump_top_index();
        Ok(())
    }

    /// Emit the next scalar value as a property name instead. Used by map
    /// adapters whose keys are not plain strings.
    pub fn promote_value_to_name(&mut self) -> Result<()> {
        let context = self.stack.peek()?;
        if context != Scope::EmptyObject && context != Scope::NonemptyObject {
            return Err(self.nesting_problem("promotion is only allowed inside an object"));
        }
        self.promote_value_to_name = true;
        Ok(())
    }

    /// Make the enclosing array or object eligible for flattening: a
    /// subsequent begin of the same kind at this depth is spliced into it
    /// instead of nested. Returns a token to hand back to
    /// [`end_flatten`](Self::end_flatten); pairs nest.
    pub fn begin_flatten(&mut self) -> Result<FlattenToken> {
        let context = self.stack.peek()?;
        if !matches!(
            context,
            Scope::EmptyArray | Scope::NonemptyArray | Scope::EmptyObject | Scope::NonemptyObject
        ) {
            return Err(self.nesting_problem("flattening requires an open array or object"));
        }
        let token = FlattenToken(self.flatten_stack_size);
        self.flatten_stack_size = self.stack.len() as i32;
        Ok(token)
    }

    /// End a flattening region begun with [`begin_flatten`](Self::begin_flatten).
    pub fn end_flatten(&mut self, token: FlattenToken) {
        self.flatten_stack_size = token.0;
    }

    /// A raw sink for pre-encoded JSON, spliced in as the next value. The
    /// writer refuses further calls until the sink is closed.
    pub fn value_sink(&mut self) -> Result<ValueSink<'_, 'a>> {
        if self.promote_value_to_name {
            return Err(JsonError::invalid_state(
                "raw values cannot be used as map keys",
            ));
        }
        self.write_deferred_name()?;
        self.before_value()?;
        self.stack.push(Scope::StreamingValue)?;
        Ok(ValueSink { writer: self })
    }

    /// Recursively emit a [`JsonValue`] tree.
    pub fn json_value(&mut self, value: &JsonValue) -> Result<()> {
        match value {
            JsonValue::Null => self.null_value(),
            JsonValue::Bool(b) => self.value_bool(*b),
            JsonValue::Number(Number::Int(n)) => self.value_i64(*n),
            JsonValue::Number(Number::Float(n)) => self.value_f64(*n),
            JsonValue::String(s) => self.value_str(s),
            JsonValue::Array(items) => {
                self.begin_array()?;
                for item in items {
                    self.json_value(item)?;
                }
                self.end_array()
            }
            JsonValue::Object(members) => {
                self.begin_object()?;
                for (name, member) in members {
                    self.name(name)?;
                    self.json_value(member)?;
                }
                self.end_object()
            }
        }
    }

    /// Flush and close the writer. Fails when the document is incomplete.
    pub fn close(&mut self) -> Result<()> {
        self.sink.flush()?;
        let complete = self.stack.len() == 1 && self.stack.peek()? == Scope::NonemptyDocument;
        self.stack = ScopeStack::with_root(Scope::Closed);
        if complete {
            Ok(())
        } else {
            Err(JsonError::invalid_state("incomplete document"))
        }
    }
}

/// Raw byte sink returned by [`JsonWriter::value_sink`]. The caller must
/// write exactly one well-formed JSON value and then call
/// [`close`](ValueSink::close); until then every other writer call fails.
pub struct ValueSink<'w, 'a> {
    writer: &'w mut JsonWriter<'a>,
}

impl ValueSink<'_, '_> {
    /// Append pre-encoded JSON text.
    pub fn write_utf8(&mut self, s: &str) -> Result<()> {
        self.writer.sink.write_utf8(s)
    }

    /// Append pre-encoded JSON bytes.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.sink.write_all(bytes)
    }

    /// Close the sink, returning control to the writer.
    pub fn close(self) -> Result<()> {
        if self.writer.stack.peek()? != Scope::StreamingValue {
            return Err(self.writer.nesting_problem("value sink already closed"));
        }
        self.writer.stack.pop();
        self.writer.stack.bump_top_index();
        Ok(())
    }
}

/// Render an `f64` the way the writer does.
fn render_f64(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "Infinity".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        ryu::Buffer::new().format(value).to_owned()
    }
}

/// Characters below 0x20 plus `"` and `\` are escaped; `\u{2028}` and
/// `\u{2029}` are always escaped because they are line terminators in
/// JavaScript source.
fn escape_for(c: char) -> Option<&'static str> {
    Some(match c {
        '"' => "\\\"",
        '\\' => "\\\\",
        '\t' => "\\t",
        '\u{8}' => "\\b",
        '\n' => "\\n",
        '\r' => "\\r",
        '\u{c}' => "\\f",
        '\u{2028}' => "\\u2028",
        '\u{2029}' => "\\u2029",
        _ => return None,
    })
}

fn write_escaped(sink: &mut dyn ByteSink, value: &str) -> Result<()> {
    sink.write_byte(b'"')?;
    let mut last = 0;
    for (i, c) in value.char_indices() {
        let replacement: Option<String> = match escape_for(c) {
            Some(fixed) => Some(fixed.to_owned()),
            None if (c as u32) < 0x20 => Some(format!("\\u{:04x}", c as u32)),
            None => None,
        };
        if let Some(replacement) = replacement {
            if last < i {
                sink.write_utf8(&value[last..i])?;
            }
            sink.write_utf8(&replacement)?;
            last = i + c.len_utf8();
        }
    }
    if last < value.len() {
        sink.write_utf8(&value[last..])?;
    }
    sink.write_byte(b'"')?;
    Ok(())
}

/// The escaped, quoted UTF-8 encoding of `s`, used to prepare
/// [`Options`](crate::reader::Options) byte sets.
pub(crate) fn quoted_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 2);
    out.push(b'"');
    for c in s.chars() {
        if let Some(fixed) = escape_for(c) {
            out.extend_from_slice(fixed.as_bytes());
        } else if (c as u32) < 0x20 {
            out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    out.push(b'"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::Buffer;

    fn write_with(f: impl FnOnce(&mut JsonWriter<'_>)) -> String {
        let mut buf = Buffer::new();
        let mut writer = JsonWriter::new(&mut buf);
        f(&mut writer);
        writer.close().unwrap();
        buf.into_string().unwrap()
    }

    #[test]
    fn compact_object() {
        let out = write_with(|w| {
            w.begin_object().unwrap();
            w.name("a").unwrap();
            w.value_i64(1).unwrap();
            w.name("b").unwrap();
            w.value_str("x").unwrap();
            w.end_object().unwrap();
        });
        assert_eq!(out, r#"{"a":1,"b":"x"}"#);
    }

    #[test]
    fn indented_object() {
        let out = write_with(|w| {
            w.set_indent("  ");
            w.begin_object().unwrap();
            w.name("a").unwrap();
            w.value_i64(1).unwrap();
            w.end_object().unwrap();
        });
        assert_eq!(out, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn null_skipping_drops_name_and_value() {
        let out = write_with(|w| {
            w.set_serialize_nulls(false);
            w.begin_object().unwrap();
            w.name("a").unwrap();
            w.null_value().unwrap();
            w.name("b").unwrap();
            w.value_i64(2).unwrap();
            w.end_object().unwrap();
        });
        assert_eq!(out, r#"{"b":2}"#);
    }

    #[test]
    fn strict_writer_rejects_nan() {
        let mut buf = Buffer::new();
        let mut writer = JsonWriter::new(&mut buf);
        let err = writer.value_f64(f64::NAN).unwrap_err();
        assert!(matches!(err.kind, JsonErrorKind::NonFiniteNumber { .. }));
    }

    #[test]
    fn lenient_writer_emits_nan() {
        let mut buf = Buffer::new();
        let mut writer = JsonWriter::new(&mut buf);
        writer.set_lenient(true);
        writer.value_f64(f64::NAN).unwrap();
        writer.close().unwrap();
        assert_eq!(buf.into_string().unwrap(), "NaN");
    }

    #[test]
    fn flatten_splices_inner_array() {
        let out = write_with(|w| {
            w.begin_array().unwrap();
            w.value_i64(1).unwrap();
            let token = w.begin_flatten().unwrap();
            w.begin_array().unwrap();
            w.value_i64(2).unwrap();
            w.value_i64(3).unwrap();
            w.end_array().unwrap();
            w.end_flatten(token);
            w.value_i64(4).unwrap();
            w.end_array().unwrap();
        });
        assert_eq!(out, "[1,2,3,4]");
    }

    #[test]
    fn flatten_without_inner_begin_is_a_no_op() {
        let out = write_with(|w| {
            w.begin_array().unwrap();
            let token = w.begin_flatten().unwrap();
            w.value_i64(1).unwrap();
            w.end_flatten(token);
            w.end_array().unwrap();
        });
        assert_eq!(out, "[1]");
    }

    #[test]
    fn value_sink_splices_raw_json() {
        let out = write_with(|w| {
            w.begin_array().unwrap();
            w.value_i64(1).unwrap();
            let mut sink = w.value_sink().unwrap();
            sink.write_utf8("{\"raw\":true}").unwrap();
            sink.close().unwrap();
            w.value_i64(2).unwrap();
            w.end_array().unwrap();
        });
        assert_eq!(out, "[1,{\"raw\":true},2]");
    }

    #[test]
    fn unbalanced_close_fails() {
        let mut buf = Buffer::new();
        let mut writer = JsonWriter::new(&mut buf);
        writer.begin_array().unwrap();
        let err = writer.close().unwrap_err();
        assert!(matches!(err.kind, JsonErrorKind::InvalidState { .. }));
    }

    #[test]
    fn promoted_value_becomes_name() {
        let out = write_with(|w| {
            w.begin_object().unwrap();
            w.promote_value_to_name().unwrap();
            w.value_i64(5).unwrap();
            w.value_str("v").unwrap();
            w.end_object().unwrap();
        });
        assert_eq!(out, r#"{"5":"v"}"#);
    }

    #[test]
    fn line_separators_are_escaped() {
        let out = write_with(|w| {
            w.value_str("a\u{2028}b").unwrap();
        });
        assert_eq!(out, "\"a\\u2028b\"");
    }
}

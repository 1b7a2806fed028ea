//! Error types shared by the reader, writer, and adapter registry.
//!
//! Every error is tagged with the JsonPath at which it occurred (when one
//! is known) and sorts into one of the categories in [`ErrorCategory`]:
//! syntax errors from the tokenizer, data errors from well-formed JSON that
//! cannot be bound, registration errors from the adapter registry, usage
//! errors from illegal call sequences, and I/O errors passed through from
//! the byte stream unchanged.

use core::fmt::{self, Display};
use std::io;

/// Error type for all tatami operations.
#[derive(Debug)]
pub struct JsonError {
    /// The specific kind of error
    pub kind: JsonErrorKind,
    /// JsonPath at which the error occurred, when known (e.g. `$.users[3].id`)
    pub path: Option<String>,
    /// Byte offset into the document, for syntax errors
    pub position: Option<usize>,
}

/// Coarse classification used by callers that only care about what went
/// wrong, not the precise kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed bytes or an unexpected token under the current scope
    Syntax,
    /// Well-formed JSON that cannot be bound to the requested shape
    Data,
    /// No adapter, conflicting registrations, invalid qualifiers
    Registration,
    /// Misuse of a reader or writer (unbalanced scopes, unclosed sink)
    Usage,
    /// Underlying byte stream failure
    Io,
}

/// Specific error kinds.
#[derive(Debug)]
pub enum JsonErrorKind {
    /// Unexpected character in the byte stream
    UnexpectedChar {
        /// The offending character
        ch: char,
        /// What was expected instead
        expected: &'static str,
    },
    /// Premature end of input
    UnexpectedEof {
        /// What was expected before EOF
        expected: &'static str,
    },
    /// Input is not valid UTF-8
    MalformedUtf8,
    /// Strict-mode violation (comments, unquoted names, multiple top-level
    /// values and friends require the lenient flag)
    StrictModeViolation {
        /// Which lenient extension was encountered
        what: &'static str,
    },
    /// Token available but of the wrong kind
    UnexpectedToken {
        /// What the caller asked for
        expected: &'static str,
        /// The token that was found
        got: &'static str,
    },
    /// Number cannot be represented exactly in the requested type
    NumberOutOfRange {
        /// The raw numeric text
        value: String,
        /// The target type that could not hold it
        target: &'static str,
    },
    /// Non-finite number in strict mode
    NonFiniteNumber {
        /// Rendered value (`NaN`, `inf`, `-inf`)
        value: String,
    },
    /// Unknown object name under fail-on-unknown
    UnknownName {
        /// The unknown name
        name: String,
        /// Known names, in declaration order
        expected: Vec<String>,
        /// Closest known name, if any is plausibly intended
        suggestion: Option<String>,
    },
    /// Unknown enum constant without an audit hook installed
    UnknownEnum {
        /// The unrecognized constant
        value: String,
        /// The declared constant names
        constants: Vec<String>,
    },
    /// Duplicate key in an object
    DuplicateKey {
        /// The key that appeared more than once
        key: String,
        /// The first value bound to it
        first: String,
        /// The second value bound to it
        second: String,
    },
    /// Null where a non-null value is required
    UnexpectedNull {
        /// The target description
        target: String,
    },
    /// Document nesting exceeded the frame cap
    TooDeeplyNested,
    /// No factory in the chain produced an adapter
    NoAdapter {
        /// Rendered type descriptor
        ty: String,
        /// Rendered qualifier set
        qualifiers: String,
    },
    /// Two converter methods registered for the same direction and key
    ConflictingConverters {
        /// The contested direction (`to JSON` / `from JSON`)
        direction: &'static str,
        /// Rendered type descriptor
        ty: String,
    },
    /// A deferred adapter was invoked before its key finished resolving
    AdapterNotReady,
    /// Two fields of one class map to the same JSON name
    DuplicateJsonName {
        /// The contested wire name
        name: String,
        /// The class declaring both fields
        class: String,
    },
    /// Structural reflection refused for a platform class
    PlatformClass {
        /// The refused class name
        ty: String,
    },
    /// A class with no registered or synthesizable constructor
    NoConstructor {
        /// The class name
        ty: String,
    },
    /// Illegal reader/writer call sequence
    InvalidState {
        /// What went wrong
        message: String,
    },
    /// Invalid value handed to the writer or a conversion
    InvalidValue {
        /// Description of why the value is invalid
        message: String,
    },
    /// I/O error from the byte stream, passed through unchanged
    Io(io::Error),
}

impl JsonError {
    /// Create an error with no path context yet.
    pub const fn new(kind: JsonErrorKind) -> Self {
        JsonError {
            kind,
            path: None,
            position: None,
        }
    }

    /// Attach the JsonPath at which this error occurred.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach the byte offset at which this error occurred.
    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Which of the categories this error belongs to.
    pub const fn category(&self) -> ErrorCategory {
        match self.kind {
            JsonErrorKind::UnexpectedChar { .. }
            | JsonErrorKind::UnexpectedEof { .. }
            | JsonErrorKind::MalformedUtf8
            | JsonErrorKind::StrictModeViolation { .. } => ErrorCategory::Syntax,
            JsonErrorKind::UnexpectedToken { .. }
            | JsonErrorKind::NumberOutOfRange { .. }
            | JsonErrorKind::NonFiniteNumber { .. }
            | JsonErrorKind::UnknownName { .. }
            | JsonErrorKind::UnknownEnum { .. }
            | JsonErrorKind::DuplicateKey { .. }
            | JsonErrorKind::UnexpectedNull { .. }
            | JsonErrorKind::TooDeeplyNested
            | JsonErrorKind::InvalidValue { .. } => ErrorCategory::Data,
            JsonErrorKind::NoAdapter { .. }
            | JsonErrorKind::ConflictingConverters { .. }
            | JsonErrorKind::AdapterNotReady
            | JsonErrorKind::DuplicateJsonName { .. }
            | JsonErrorKind::PlatformClass { .. }
            | JsonErrorKind::NoConstructor { .. } => ErrorCategory::Registration,
            JsonErrorKind::InvalidState { .. } => ErrorCategory::Usage,
            JsonErrorKind::Io(_) => ErrorCategory::Io,
        }
    }

    /// Shorthand for an [`JsonErrorKind::InvalidState`] error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        JsonError::new(JsonErrorKind::InvalidState {
            message: message.into(),
        })
    }

    /// Shorthand for an [`JsonErrorKind::InvalidValue`] error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        JsonError::new(JsonErrorKind::InvalidValue {
            message: message.into(),
        })
    }
}

impl Display for JsonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " at path {path}")?;
        }
        if let Some(position) = self.position {
            write!(f, " (byte {position})")?;
        }
        Ok(())
    }
}

impl std::error::Error for JsonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            JsonErrorKind::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for JsonError {
    fn from(e: io::Error) -> Self {
        JsonError::new(JsonErrorKind::Io(e))
    }
}

impl Display for JsonErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonErrorKind::UnexpectedChar { ch, expected } => {
                write!(f, "unexpected character `{ch}`, expected {expected}")
            }
            JsonErrorKind::UnexpectedEof { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            JsonErrorKind::MalformedUtf8 => write!(f, "malformed UTF-8 sequence"),
            JsonErrorKind::StrictModeViolation { what } => {
                write!(f, "{what} requires lenient mode")
            }
            JsonErrorKind::UnexpectedToken { expected, got } => {
                write!(f, "expected {expected} but was {got}")
            }
            JsonErrorKind::NumberOutOfRange { value, target } => {
                write!(f, "number `{value}` is not exactly representable as {target}")
            }
            JsonErrorKind::NonFiniteNumber { value } => {
                write!(f, "numeric value `{value}` is not finite")
            }
            JsonErrorKind::UnknownName {
                name, suggestion, ..
            } => {
                write!(f, "unknown name `{name}`")?;
                if let Some(suggested) = suggestion {
                    write!(f, " (did you mean `{suggested}`?)")?;
                }
                Ok(())
            }
            JsonErrorKind::UnknownEnum { value, constants } => {
                write!(
                    f,
                    "unknown enum constant `{value}`, expected one of {constants:?}"
                )
            }
            JsonErrorKind::DuplicateKey { key, first, second } => {
                write!(f, "duplicate key `{key}`: first {first}, then {second}")
            }
            JsonErrorKind::UnexpectedNull { target } => {
                write!(f, "unexpected null for {target}")
            }
            JsonErrorKind::TooDeeplyNested => write!(f, "nesting too deep"),
            JsonErrorKind::NoAdapter { ty, qualifiers } => {
                write!(f, "no adapter for {ty} with qualifiers {qualifiers}")
            }
            JsonErrorKind::ConflictingConverters { direction, ty } => {
                write!(f, "conflicting {direction} converters for {ty}")
            }
            JsonErrorKind::AdapterNotReady => {
                write!(f, "adapter is not ready (type resolution is still in progress)")
            }
            JsonErrorKind::DuplicateJsonName { name, class } => {
                write!(f, "conflicting fields map to JSON name `{name}` in {class}")
            }
            JsonErrorKind::PlatformClass { ty } => {
                write!(
                    f,
                    "platform class {ty} requires an explicitly registered adapter"
                )
            }
            JsonErrorKind::NoConstructor { ty } => {
                write!(f, "no way to construct {ty}; register a constructor")
            }
            JsonErrorKind::InvalidState { message } => write!(f, "{message}"),
            JsonErrorKind::InvalidValue { message } => write!(f, "invalid value: {message}"),
            JsonErrorKind::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl JsonErrorKind {
    /// Get an error code for this kind of error.
    pub const fn code(&self) -> &'static str {
        match self {
            JsonErrorKind::UnexpectedChar { .. } => "json::unexpected_char",
            JsonErrorKind::UnexpectedEof { .. } => "json::unexpected_eof",
            JsonErrorKind::MalformedUtf8 => "json::malformed_utf8",
            JsonErrorKind::StrictModeViolation { .. } => "json::strict_mode",
            JsonErrorKind::UnexpectedToken { .. } => "json::unexpected_token",
            JsonErrorKind::NumberOutOfRange { .. } => "json::number_out_of_range",
            JsonErrorKind::NonFiniteNumber { .. } => "json::non_finite",
            JsonErrorKind::UnknownName { .. } => "json::unknown_name",
            JsonErrorKind::UnknownEnum { .. } => "json::unknown_enum",
            JsonErrorKind::DuplicateKey { .. } => "json::duplicate_key",
            JsonErrorKind::UnexpectedNull { .. } => "json::unexpected_null",
            JsonErrorKind::TooDeeplyNested => "json::nesting",
            JsonErrorKind::NoAdapter { .. } => "registry::no_adapter",
            JsonErrorKind::ConflictingConverters { .. } => "registry::conflict",
            JsonErrorKind::AdapterNotReady => "registry::not_ready",
            JsonErrorKind::DuplicateJsonName { .. } => "registry::duplicate_json_name",
            JsonErrorKind::PlatformClass { .. } => "registry::platform_class",
            JsonErrorKind::NoConstructor { .. } => "registry::no_constructor",
            JsonErrorKind::InvalidState { .. } => "json::invalid_state",
            JsonErrorKind::InvalidValue { .. } => "json::invalid_value",
            JsonErrorKind::Io(_) => "json::io",
        }
    }

    /// Get a short label describing what the error points to.
    pub fn label(&self) -> String {
        match self {
            JsonErrorKind::UnexpectedChar { ch, expected } => {
                format!("unexpected `{ch}`, expected {expected}")
            }
            JsonErrorKind::UnexpectedEof { expected } => format!("expected {expected}"),
            JsonErrorKind::MalformedUtf8 => "invalid UTF-8 here".into(),
            JsonErrorKind::StrictModeViolation { what } => format!("{what} found here"),
            JsonErrorKind::UnexpectedToken { expected, got } => {
                format!("expected {expected}, got {got}")
            }
            JsonErrorKind::NumberOutOfRange { target, .. } => {
                format!("out of range for {target}")
            }
            JsonErrorKind::NonFiniteNumber { .. } => "not finite".into(),
            JsonErrorKind::UnknownName {
                name, suggestion, ..
            } => match suggestion {
                Some(suggested) => format!("unknown name `{name}` - did you mean `{suggested}`?"),
                None => format!("unknown name `{name}`"),
            },
            JsonErrorKind::UnknownEnum { value, .. } => format!("unknown constant `{value}`"),
            JsonErrorKind::DuplicateKey { key, .. } => format!("duplicate key `{key}`"),
            JsonErrorKind::UnexpectedNull { .. } => "null here".into(),
            JsonErrorKind::TooDeeplyNested => "nesting too deep".into(),
            JsonErrorKind::NoAdapter { ty, .. } => format!("no adapter for {ty}"),
            JsonErrorKind::ConflictingConverters { ty, .. } => format!("conflict on {ty}"),
            JsonErrorKind::AdapterNotReady => "not ready".into(),
            JsonErrorKind::DuplicateJsonName { name, .. } => {
                format!("duplicate JSON name `{name}`")
            }
            JsonErrorKind::PlatformClass { ty } => format!("platform class {ty}"),
            JsonErrorKind::NoConstructor { ty } => format!("cannot construct {ty}"),
            JsonErrorKind::InvalidState { .. } => "illegal call here".into(),
            JsonErrorKind::InvalidValue { .. } => "invalid value".into(),
            JsonErrorKind::Io(_) => "I/O error".into(),
        }
    }
}

impl miette::Diagnostic for JsonError {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        self.path
            .as_ref()
            .map(|p| Box::new(format!("at path {p}")) as Box<dyn Display>)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, JsonError>;

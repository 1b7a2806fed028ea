#![forbid(unsafe_code)]

//! Streaming JSON with a composable adapter registry.
//!
//! The crate has two floors. The ground floor is a pair of tokenizers:
//! [`JsonReader`], a pull parser producing token events with scope
//! validation and JsonPath tracking, and [`JsonWriter`], a push emitter
//! with deferred names, indent control, and value flattening. The floor
//! above is the [`Registry`]: an ordered chain of [`AdapterFactory`]s
//! producing bidirectional [`Adapter`]s for (type descriptor, qualifier
//! set) keys, with built-in support for scalars, strings, enums,
//! collections, maps, arrays, arbitrary values, and registered class
//! shapes, plus user converter methods.
//!
//! # Reading and writing tokens
//!
//! ```
//! use tatami::{Buffer, JsonReader};
//!
//! let mut reader = JsonReader::new(Buffer::from(r#"{"id":7,"name":"ada"}"#));
//! reader.begin_object()?;
//! assert_eq!(reader.next_name()?, "id");
//! assert_eq!(reader.next_i64()?, 7);
//! assert_eq!(reader.next_name()?, "name");
//! assert_eq!(reader.next_string()?, "ada");
//! reader.end_object()?;
//! # Ok::<(), tatami::JsonError>(())
//! ```
//!
//! # Adapters
//!
//! ```
//! use tatami::Registry;
//!
//! let registry = Registry::builder().build();
//! let adapter = registry.adapter_of::<Vec<i64>>()?;
//! let numbers: Vec<i64> = adapter.read("[1,2,3]")?;
//! assert_eq!(numbers, vec![1, 2, 3]);
//! assert_eq!(adapter.write_value(numbers)?, "[1,2,3]");
//! # Ok::<(), tatami::JsonError>(())
//! ```

mod adapter;
mod adapters;
mod any;
mod audit;
mod convert;
mod error;
mod io;
mod lookahead;
mod qualifier;
mod reader;
mod registry;
mod scope;
mod types;
mod value;
mod writer;

pub use adapter::{Adapter, AnyAdapter, WrapperKind};
pub use adapters::class::{Binding, ClassFactory, DeclaredFields, FieldBindings};
pub use any::{AnyValue, FromAny, IntoAny, JsonMap, JsonSet, Payload, Record};
pub use audit::JsonAudit;
pub use convert::{ConvertError, ConvertResult, Converters, MethodSig};
pub use error::{ErrorCategory, JsonError, JsonErrorKind, Result};
pub use io::{Buffer, ByteSink, ByteSource};
pub use lookahead::{StartState, ValueSource};
pub use qualifier::{Qualifier, QualifierSet};
pub use reader::{JsonReader, Options, Token};
pub use registry::{AdapterFactory, Registry, RegistryBuilder};
pub use scope::{MAX_DEPTH, Scope};
pub use types::{
    ClassDef, ClassKind, ClassLinks, ClassRef, Constructor, EnumConstant, EnumDef, EnumShape,
    FieldDef,
    GeneratedAdapterFn, ScalarKind, StructShape, Type, TypeOf, array_component_type, canonicalize,
    classes, collection_element_type, generic_supertype, map_key_value_types, raw_type, resolve,
};
pub use value::{JsonValue, Number};
pub use writer::{FlattenToken, JsonWriter, ValueSink};

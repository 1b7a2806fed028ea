//! Enum adapters: constants encoded as strings, with per-constant wire
//! names and a prepared option set for byte-level matching.

use std::sync::Arc;

use crate::adapter::{Adapter, AnyAdapter};
use crate::any::AnyValue;
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::qualifier::QualifierSet;
use crate::reader::{JsonReader, Options, Token};
use crate::registry::{AdapterFactory, Registry};
use crate::types::{ClassKind, ClassRef, Type};
use crate::writer::JsonWriter;

/// Factory for enum adapters.
pub struct EnumFactory;

impl AdapterFactory for EnumFactory {
    fn create(
        &self,
        ty: &Type,
        qualifiers: &QualifierSet,
        _registry: &Registry,
    ) -> Result<Option<Arc<dyn AnyAdapter>>> {
        if !qualifiers.is_empty() {
            return Ok(None);
        }
        let Type::Class(class) = ty else {
            return Ok(None);
        };
        let ClassKind::Enum(shape) = class.kind() else {
            return Ok(None);
        };
        let wire_names: Vec<String> = shape
            .constants
            .iter()
            .map(|c| c.wire_name().to_owned())
            .collect();
        let options = Options::of(&wire_names.iter().map(String::as_str).collect::<Vec<_>>());
        let adapter = Adapter::new(Arc::new(EnumAdapter {
            class: class.clone(),
            wire_names,
            options,
        }));
        Ok(Some(adapter.null_safe().erased().clone()))
    }
}

struct EnumAdapter {
    class: ClassRef,
    wire_names: Vec<String>,
    options: Options,
}

impl EnumAdapter {
    fn shape(&self) -> &crate::types::EnumShape {
        match self.class.kind() {
            ClassKind::Enum(shape) => shape,
            _ => unreachable!("enum adapter built for a non-enum class"),
        }
    }
}

impl AnyAdapter for EnumAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        if let Some(index) = reader.select_string(&self.options)? {
            return Ok((self.shape().construct)(index));
        }
        if reader.peek()? != Token::String {
            let got = reader.peek()?.describe();
            return Err(JsonError::new(JsonErrorKind::UnexpectedToken {
                expected: "STRING",
                got,
            })
            .with_path(reader.path()));
        }
        let path = reader.path();
        let name = reader.next_string()?;
        // An installed audit hook turns an unknown constant into a reported
        // event and a null result instead of a failure.
        if let Some(audit) = reader.audit() {
            audit.unknown_enum(&path, &name);
            return Ok(AnyValue::null());
        }
        Err(JsonError::new(JsonErrorKind::UnknownEnum {
            value: name,
            constants: self.wire_names.clone(),
        })
        .with_path(path))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let index = (self.shape().index_of)(value).ok_or_else(|| {
            JsonError::invalid_value(format!("value is not a {} constant", self.class.name()))
                .with_path(writer.path())
        })?;
        writer.value_str(&self.wire_names[index])
    }
}

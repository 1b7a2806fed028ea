//! Scalar, string, and arbitrary-object adapters, plus the
//! generated-adapter lookup factory.

use std::sync::Arc;

use crate::adapter::{Adapter, AnyAdapter};
use crate::any::{AnyValue, JsonMap, JsonSet};
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::qualifier::QualifierSet;
use crate::reader::JsonReader;
use crate::registry::{AdapterFactory, Registry};
use crate::types::{ClassKind, ScalarKind, Type, classes, raw_type};
use crate::value::JsonValue;
use crate::writer::JsonWriter;

/// Factory for scalar and string adapters.
pub struct StandardFactory;

impl AdapterFactory for StandardFactory {
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
        Ok(match class.kind() {
            ClassKind::Scalar(kind) => Some(scalar_adapter(*kind)),
            ClassKind::Str => Some(Arc::new(StringAdapter)),
            _ => None,
        })
    }
}

fn scalar_adapter(kind: ScalarKind) -> Arc<dyn AnyAdapter> {
    match kind {
        ScalarKind::Bool => Arc::new(BoolAdapter),
        ScalarKind::I8 => Arc::new(RangedIntAdapter::<i8>::new("i8")),
        ScalarKind::I16 => Arc::new(RangedIntAdapter::<i16>::new("i16")),
        ScalarKind::I32 => Arc::new(I32Adapter),
        ScalarKind::I64 => Arc::new(I64Adapter),
        ScalarKind::U8 => Arc::new(RangedIntAdapter::<u8>::new("u8")),
        ScalarKind::U16 => Arc::new(RangedIntAdapter::<u16>::new("u16")),
        ScalarKind::U32 => Arc::new(RangedIntAdapter::<u32>::new("u32")),
        ScalarKind::F32 => Arc::new(F32Adapter),
        ScalarKind::F64 => Arc::new(F64Adapter),
        ScalarKind::Char => Arc::new(CharAdapter),
    }
}

fn wrong_payload(expected: &'static str, writer: &JsonWriter<'_>) -> JsonError {
    JsonError::invalid_value(format!("value is not {expected}")).with_path(writer.path())
}

struct BoolAdapter;

impl AnyAdapter for BoolAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        Ok(AnyValue::new(reader.next_bool()?))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let b = *value.get::<bool>().ok_or_else(|| wrong_payload("a bool", writer))?;
        writer.value_bool(b)
    }
}

struct I32Adapter;

impl AnyAdapter for I32Adapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        Ok(AnyValue::new(reader.next_i32()?))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let n = *value.get::<i32>().ok_or_else(|| wrong_payload("an i32", writer))?;
        writer.value_i64(n as i64)
    }
}

struct I64Adapter;

impl AnyAdapter for I64Adapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        Ok(AnyValue::new(reader.next_i64()?))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let n = *value.get::<i64>().ok_or_else(|| wrong_payload("an i64", writer))?;
        writer.value_i64(n)
    }
}

/// Small integer types funnel through the wider reads and range-check the
/// result.
struct RangedIntAdapter<T> {
    target: &'static str,
    _marker: core::marker::PhantomData<fn() -> T>,
}

impl<T> RangedIntAdapter<T> {
    fn new(target: &'static str) -> Self {
        RangedIntAdapter {
            target,
            _marker: core::marker::PhantomData,
        }
    }
}

impl<T> AnyAdapter for RangedIntAdapter<T>
where
    T: TryFrom<i64> + Into<i64> + Copy + PartialEq + core::fmt::Debug + Send + Sync + 'static,
{
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        let path = reader.path();
        let wide = reader.next_i64()?;
        let narrow = T::try_from(wide).map_err(|_| {
            JsonError::new(JsonErrorKind::NumberOutOfRange {
                value: wide.to_string(),
                target: self.target,
            })
            .with_path(path)
        })?;
        Ok(AnyValue::new(narrow))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let n = *value
            .get::<T>()
            .ok_or_else(|| wrong_payload("an integer", writer))?;
        writer.value_i64(n.into())
    }
}

struct F64Adapter;

impl AnyAdapter for F64Adapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        Ok(AnyValue::new(reader.next_f64()?))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let n = *value.get::<f64>().ok_or_else(|| wrong_payload("an f64", writer))?;
        writer.value_f64(n)
    }
}

struct F32Adapter;

impl AnyAdapter for F32Adapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        let path = reader.path();
        let wide = reader.next_f64()?;
        let narrow = wide as f32;
        // A finite double can overflow to infinity on narrowing; that is a
        // range error in strict mode.
        if !reader.is_lenient() && narrow.is_infinite() && wide.is_finite() {
            return Err(JsonError::new(JsonErrorKind::NumberOutOfRange {
                value: wide.to_string(),
                target: "f32",
            })
            .with_path(path));
        }
        Ok(AnyValue::new(narrow))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let n = *value.get::<f32>().ok_or_else(|| wrong_payload("an f32", writer))?;
        writer.value_f64(n as f64)
    }
}

struct CharAdapter;

impl AnyAdapter for CharAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        let path = reader.path();
        let s = reader.next_string()?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(AnyValue::new(c)),
            _ => Err(JsonError::new(JsonErrorKind::UnexpectedToken {
                expected: "a single-character string",
                got: "STRING",
            })
            .with_path(path)),
        }
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let c = *value.get::<char>().ok_or_else(|| wrong_payload("a char", writer))?;
        let mut buf = [0u8; 4];
        writer.value_str(c.encode_utf8(&mut buf))
    }
}

struct StringAdapter;

impl AnyAdapter for StringAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        Ok(AnyValue::new(reader.next_string()?))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let s = value
            .get::<String>()
            .ok_or_else(|| wrong_payload("a string", writer))?;
        writer.value_str(s)
    }
}

/// Consults a class's registered generated-adapter hook: the analog of
/// locating a generated `…JsonAdapter` class by naming convention.
pub struct GeneratedFactory;

impl AdapterFactory for GeneratedFactory {
    fn create(
        &self,
        ty: &Type,
        qualifiers: &QualifierSet,
        registry: &Registry,
    ) -> Result<Option<Arc<dyn AnyAdapter>>> {
        if !qualifiers.is_empty() {
            return Ok(None);
        }
        if !matches!(ty, Type::Class(_) | Type::Parameterized { .. }) {
            return Ok(None);
        }
        let raw = raw_type(ty);
        let ClassKind::Struct(shape) = raw.kind() else {
            return Ok(None);
        };
        match &shape.generated_adapter {
            Some(hook) => hook(registry, ty, qualifiers),
            None => Ok(None),
        }
    }
}

/// Factory for the arbitrary-`Object` adapter.
pub struct ObjectFactory;

impl AdapterFactory for ObjectFactory {
    fn create(
        &self,
        ty: &Type,
        qualifiers: &QualifierSet,
        registry: &Registry,
    ) -> Result<Option<Arc<dyn AnyAdapter>>> {
        if !qualifiers.is_empty() {
            return Ok(None);
        }
        let Type::Class(class) = ty else {
            return Ok(None);
        };
        if !matches!(class.kind(), ClassKind::Object) {
            return Ok(None);
        }
        let adapter = Adapter::new(Arc::new(ObjectAdapter {
            registry: registry.clone(),
        }));
        Ok(Some(adapter.null_safe().erased().clone()))
    }
}

/// Reads any value into a [`JsonValue`] tree; writes by resolving the
/// payload's runtime class, normalizing sequence payloads to
/// `List<Object>` and map payloads to `Map<Object, Object>`.
struct ObjectAdapter {
    registry: Registry,
}

impl AnyAdapter for ObjectAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        Ok(AnyValue::new(reader.read_json_value()?))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        if value.is_null() {
            return writer.null_value();
        }
        if let Some(tree) = value.get::<JsonValue>() {
            return writer.json_value(tree);
        }

        let object = classes::object().ty();
        let runtime = if value.get::<Vec<AnyValue>>().is_some() {
            classes::list().of(vec![object])
        } else if value.get::<JsonSet>().is_some() {
            classes::set().of(vec![object])
        } else if value.get::<JsonMap>().is_some() {
            classes::map().of(vec![object.clone(), object])
        } else {
            let type_id = value
                .payload_type_id()
                .expect("non-null value has a payload");
            match classes::by_rust_type(type_id) {
                Some(class) => class.ty(),
                None => {
                    return Err(JsonError::new(JsonErrorKind::NoAdapter {
                        ty: "an unregistered runtime type".to_owned(),
                        qualifiers: QualifierSet::empty().to_string(),
                    })
                    .with_path(writer.path()));
                }
            }
        };
        self.registry
            .adapter(&runtime, &QualifierSet::empty())?
            .to_json(writer, value)
    }
}

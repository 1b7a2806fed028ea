//! Map adapters: JSON objects with delegated key and value shapes.
//!
//! Keys ride the name channel: reading promotes each name to a value so
//! the key adapter can consume it, and writing promotes each key value to
//! a name. Duplicate keys are a data error naming both values.

use std::sync::Arc;

use crate::adapter::{Adapter, AnyAdapter};
use crate::any::{AnyValue, JsonMap};
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::qualifier::QualifierSet;
use crate::reader::JsonReader;
use crate::registry::{AdapterFactory, Registry};
use crate::types::{ClassKind, Type, map_key_value_types, raw_type};
use crate::writer::JsonWriter;

/// Factory for map adapters.
pub struct MapFactory;

impl AdapterFactory for MapFactory {
    fn create(
        &self,
        ty: &Type,
        qualifiers: &QualifierSet,
        registry: &Registry,
    ) -> Result<Option<Arc<dyn AnyAdapter>>> {
        if !qualifiers.is_empty() {
            return Ok(None);
        }
        let raw = raw_type(ty);
        if !matches!(raw.kind(), ClassKind::Map) {
            return Ok(None);
        }
        let (key_type, value_type) = map_key_value_types(ty);
        let key = registry.adapter(&key_type, &QualifierSet::empty())?;
        let value = registry.adapter(&value_type, &QualifierSet::empty())?;
        let adapter = Adapter::new(Arc::new(MapAdapter { key, value }));
        Ok(Some(adapter.null_safe().erased().clone()))
    }
}

struct MapAdapter {
    key: Adapter,
    value: Adapter,
}

impl AnyAdapter for MapAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        reader.begin_object()?;
        let mut map = JsonMap::new();
        while reader.has_next()? {
            reader.promote_name_to_value()?;
            let key = self.key.from_json(reader)?;
            let value = self.value.from_json(reader)?;
            if let Some(first) = map.get(&key) {
                return Err(JsonError::new(JsonErrorKind::DuplicateKey {
                    key: format!("{key:?}"),
                    first: format!("{first:?}"),
                    second: format!("{value:?}"),
                })
                .with_path(reader.path()));
            }
            map.insert(key, value);
        }
        reader.end_object()?;
        Ok(AnyValue::new(map))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let map = value.get::<JsonMap>().ok_or_else(|| {
            JsonError::invalid_value("value is not a map").with_path(writer.path())
        })?;
        writer.begin_object()?;
        for (k, v) in map.iter() {
            writer.promote_value_to_name()?;
            self.key.to_json(writer, k)?;
            self.value.to_json(writer, v)?;
        }
        writer.end_object()
    }
}

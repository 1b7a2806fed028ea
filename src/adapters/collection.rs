//! Collection adapters: lists and sets of a delegated element shape.

use std::sync::Arc;

use crate::adapter::{Adapter, AnyAdapter};
use crate::any::{AnyValue, JsonSet};
use crate::error::{JsonError, Result};
use crate::qualifier::QualifierSet;
use crate::reader::JsonReader;
use crate::registry::{AdapterFactory, Registry};
use crate::types::{ClassKind, Type, collection_element_type, raw_type};
use crate::writer::JsonWriter;

/// Factory for list and set adapters.
pub struct CollectionFactory;

impl AdapterFactory for CollectionFactory {
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
        let as_set = match raw.kind() {
            ClassKind::List | ClassKind::Collection => false,
            ClassKind::Set => true,
            _ => return Ok(None),
        };
        let element_type = collection_element_type(ty);
        let element = registry.adapter(&element_type, &QualifierSet::empty())?;
        let adapter = Adapter::new(Arc::new(SequenceAdapter { element, as_set }));
        Ok(Some(adapter.null_safe().erased().clone()))
    }
}

struct SequenceAdapter {
    element: Adapter,
    as_set: bool,
}

impl AnyAdapter for SequenceAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        reader.begin_array()?;
        let mut items = Vec::new();
        while reader.has_next()? {
            items.push(self.element.from_json(reader)?);
        }
        reader.end_array()?;
        Ok(if self.as_set {
            AnyValue::new(JsonSet(items))
        } else {
            AnyValue::new(items)
        })
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let items: &[AnyValue] = if self.as_set {
            value
                .get::<JsonSet>()
                .map(|set| set.0.as_slice())
                .ok_or_else(|| {
                    JsonError::invalid_value("value is not a set").with_path(writer.path())
                })?
        } else {
            value
                .get::<Vec<AnyValue>>()
                .map(Vec::as_slice)
                .ok_or_else(|| {
                    JsonError::invalid_value("value is not a sequence").with_path(writer.path())
                })?
        };
        writer.begin_array()?;
        for item in items {
            self.element.to_json(writer, item)?;
        }
        writer.end_array()
    }
}

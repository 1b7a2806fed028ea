//! Array adapters: typed arrays of a delegated component shape.

use std::sync::Arc;

use crate::adapter::{Adapter, AnyAdapter};
use crate::any::AnyValue;
use crate::error::{JsonError, Result};
use crate::qualifier::QualifierSet;
use crate::reader::JsonReader;
use crate::registry::{AdapterFactory, Registry};
use crate::types::{Type, array_component_type};
use crate::writer::JsonWriter;

/// Factory for array adapters.
pub struct ArrayFactory;

impl AdapterFactory for ArrayFactory {
    fn create(
        &self,
        ty: &Type,
        qualifiers: &QualifierSet,
        registry: &Registry,
    ) -> Result<Option<Arc<dyn AnyAdapter>>> {
        if !qualifiers.is_empty() {
            return Ok(None);
        }
        let Some(component_type) = array_component_type(ty) else {
            return Ok(None);
        };
        let component = registry.adapter(&component_type, &QualifierSet::empty())?;
        let adapter = Adapter::new(Arc::new(ArrayAdapter { component }));
        Ok(Some(adapter.null_safe().erased().clone()))
    }
}

struct ArrayAdapter {
    component: Adapter,
}

impl AnyAdapter for ArrayAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        reader.begin_array()?;
        let mut items = Vec::new();
        while reader.has_next()? {
            items.push(self.component.from_json(reader)?);
        }
        reader.end_array()?;
        Ok(AnyValue::new(items))
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let items = value.get::<Vec<AnyValue>>().ok_or_else(|| {
            JsonError::invalid_value("value is not an array").with_path(writer.path())
        })?;
        writer.begin_array()?;
        for item in items {
            self.component.to_json(writer, item)?;
        }
        writer.end_array()
    }
}

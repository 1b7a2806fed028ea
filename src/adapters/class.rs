//! Structural class adapters.
//!
//! The factory turns a registered class shape into an adapter: field
//! bindings come from a pluggable strategy (by default the declared-field
//! metadata in the class registry, walked up the generic supertype chain
//! with type-variable resolution), reading dispatches a prepared name set,
//! and construction prefers a registered constructor with a
//! synthesized-defaults fallback for dynamic shapes.

use std::collections::HashSet;
use std::sync::Arc;

use crate::adapter::{Adapter, AnyAdapter};
use crate::any::{AnyValue, JsonMap, JsonSet, Record};
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::qualifier::QualifierSet;
use crate::reader::{JsonReader, Options};
use crate::registry::{AdapterFactory, Registry};
use crate::types::{
    ClassKind, ClassRef, Constructor, FieldDef, StructShape, Type, classes, raw_type, resolve,
};
use crate::value::JsonValue;
use crate::writer::JsonWriter;

/// A field ready for streaming: wire name, declared field, and the
/// delegate adapter resolved under the lookup context.
pub struct Binding {
    /// The name used on the wire
    pub json_name: String,
    /// The declared field
    pub field: FieldDef,
    /// Delegate adapter for the field's resolved type and qualifiers
    pub adapter: Adapter,
}

/// Strategy producing field bindings for a type, or declining.
///
/// The default implementation reads declared-field metadata from the class
/// registry; a code generator could provide the same bindings without any
/// registry metadata and be indistinguishable here.
pub trait FieldBindings: Send + Sync {
    /// Produce bindings for `ty`, or `None` when the strategy does not
    /// apply to it.
    fn bindings(&self, ty: &Type, registry: &Registry) -> Result<Option<Vec<Binding>>>;
}

/// The default strategy: declared fields from the class registry, walked
/// up the generic supertype chain.
pub struct DeclaredFields;

impl FieldBindings for DeclaredFields {
    fn bindings(&self, ty: &Type, registry: &Registry) -> Result<Option<Vec<Binding>>> {
        let raw = raw_type(ty);
        if !matches!(raw.kind(), ClassKind::Struct(_)) {
            return Ok(None);
        }

        let mut bindings = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some((ty.clone(), raw.clone()));
        while let Some((context, context_raw)) = current {
            let ClassKind::Struct(shape) = context_raw.kind() else {
                break;
            };
            for field in shape.fields() {
                if field.ignored {
                    continue;
                }
                let resolved = resolve(&context, &context_raw, &field.ty);
                let json_name = field
                    .json_name
                    .clone()
                    .unwrap_or_else(|| field.name.clone());
                if !seen.insert(json_name.clone()) {
                    return Err(JsonError::new(JsonErrorKind::DuplicateJsonName {
                        name: json_name,
                        class: raw.name().to_owned(),
                    }));
                }
                let adapter = registry.adapter(&resolved, &field.qualifiers)?;
                bindings.push(Binding {
                    json_name,
                    field: field.clone(),
                    adapter,
                });
            }
            current = context_raw.supertypes().first().map(|declared| {
                let instantiated = resolve(&context, &context_raw, declared);
                (instantiated, raw_type(declared))
            });
        }
        Ok(Some(bindings))
    }
}

/// Factory for structural class adapters.
pub struct ClassFactory {
    strategy: Arc<dyn FieldBindings>,
}

impl ClassFactory {
    /// A factory using the given binding strategy.
    pub fn new(strategy: Arc<dyn FieldBindings>) -> Self {
        ClassFactory { strategy }
    }
}

impl AdapterFactory for ClassFactory {
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
        if raw.is_platform() {
            return Err(JsonError::new(JsonErrorKind::PlatformClass {
                ty: raw.name().to_owned(),
            }));
        }
        let Some(bindings) = self.strategy.bindings(ty, registry)? else {
            return Ok(None);
        };
        let names: Vec<&str> = bindings.iter().map(|b| b.json_name.as_str()).collect();
        let options = Options::of(&names);
        let construct = construction_strategy(&raw, shape)?;
        let adapter = Adapter::new(Arc::new(ClassAdapter {
            construct,
            bindings,
            options,
        }));
        Ok(Some(adapter.null_safe().erased().clone()))
    }
}

/// Pick how instances are made: a registered constructor first, then the
/// synthesized-defaults path, then a bare dynamic record.
fn construction_strategy(raw: &ClassRef, shape: &StructShape) -> Result<Constructor> {
    if let Some(construct) = &shape.construct {
        return Ok(construct.clone());
    }
    if shape.synthesize_defaults {
        let template = default_record(raw, 0)?;
        return Ok(Arc::new(move || AnyValue::new(template.clone())));
    }
    if raw.rust_type().is_none() {
        let class = raw.clone();
        return Ok(Arc::new(move || AnyValue::new(Record::new(class.clone()))));
    }
    Err(JsonError::new(JsonErrorKind::NoConstructor {
        ty: raw.name().to_owned(),
    }))
}

fn default_record(class: &ClassRef, depth: usize) -> Result<Record> {
    let ClassKind::Struct(shape) = class.kind() else {
        return Err(JsonError::invalid_value(format!(
            "{} is not a struct class",
            class.name()
        )));
    };
    let mut record = Record::new(class.clone());
    for field in shape.fields() {
        if field.ignored {
            continue;
        }
        record.set(&field.name, default_for_type(&field.ty, depth + 1)?);
    }
    Ok(record)
}

/// Type-based default values for synthesized construction: zero for
/// numbers, empty for strings and containers, the first constant for
/// enums, and recursive construction for other classes.
fn default_for_type(ty: &Type, depth: usize) -> Result<AnyValue> {
    if depth > 32 {
        return Err(JsonError::invalid_value(
            "default construction recursed too deeply",
        ));
    }
    if let Type::Array(_) = ty {
        return Ok(AnyValue::new(Vec::<AnyValue>::new()));
    }
    let raw = raw_type(ty);
    Ok(match raw.kind() {
        ClassKind::Scalar(kind) => {
            use crate::types::ScalarKind::*;
            match kind {
                Bool => AnyValue::new(false),
                I8 => AnyValue::new(0i8),
                I16 => AnyValue::new(0i16),
                I32 => AnyValue::new(0i32),
                I64 => AnyValue::new(0i64),
                U8 => AnyValue::new(0u8),
                U16 => AnyValue::new(0u16),
                U32 => AnyValue::new(0u32),
                F32 => AnyValue::new(0f32),
                F64 => AnyValue::new(0f64),
                Char => AnyValue::new('\0'),
            }
        }
        ClassKind::Str => AnyValue::new(String::new()),
        ClassKind::Object => AnyValue::new(JsonValue::Null),
        ClassKind::List | ClassKind::Collection => AnyValue::new(Vec::<AnyValue>::new()),
        ClassKind::Set => AnyValue::new(JsonSet::default()),
        ClassKind::Map => AnyValue::new(JsonMap::new()),
        ClassKind::Array => AnyValue::new(Vec::<AnyValue>::new()),
        ClassKind::Enum(shape) => {
            if shape.constants.is_empty() {
                return Err(JsonError::invalid_value(format!(
                    "enum {} has no constants to default to",
                    raw.name()
                )));
            }
            (shape.construct)(0)
        }
        ClassKind::Struct(shape) => match &shape.construct {
            Some(construct) => construct(),
            None => AnyValue::new(default_record(&raw, depth)?),
        },
    })
}

struct ClassAdapter {
    construct: Constructor,
    bindings: Vec<Binding>,
    options: Options,
}

impl AnyAdapter for ClassAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        reader.begin_object()?;
        let mut instance = (self.construct)();
        while reader.has_next()? {
            match reader.select_name(&self.options)? {
                Some(index) => {
                    let binding = &self.bindings[index];
                    let value = binding.adapter.from_json(reader)?;
                    let path = reader.path();
                    binding.field.set_value(&mut instance, value).map_err(
                        |e| {
                            if e.path.is_none() {
                                e.with_path(path.clone())
                            } else {
                                e
                            }
                        },
                    )?;
                }
                None if reader.fails_on_unknown() => {
                    let name = reader.next_name()?;
                    let expected: Vec<String> =
                        self.bindings.iter().map(|b| b.json_name.clone()).collect();
                    let suggestion = closest_name(&name, &expected);
                    return Err(JsonError::new(JsonErrorKind::UnknownName {
                        name,
                        expected,
                        suggestion,
                    })
                    .with_path(reader.path()));
                }
                None => {
                    reader.skip_name()?;
                    reader.skip_value()?;
                }
            }
        }
        reader.end_object()?;
        Ok(instance)
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        writer.begin_object()?;
        for binding in &self.bindings {
            writer.name(&binding.json_name)?;
            let field_value = binding.field.get_value(value)?;
            binding.adapter.to_json(writer, &field_value)?;
        }
        writer.end_object()
    }
}

/// The most similar known name, when it is close enough to be a plausible
/// typo.
fn closest_name(unknown: &str, known: &[String]) -> Option<String> {
    known
        .iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(unknown, candidate)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(candidate, _)| candidate.clone())
}

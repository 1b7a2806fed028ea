//! User-defined converter methods.
//!
//! The original system scans an object for declaratively marked to-JSON
//! and from-JSON methods and reflects their signatures. Here the
//! signature arrives as data: each registration declares its (type,
//! qualifier set) key, its style (transform marshals through an
//! intermediate shape the registry handles; streaming drives the reader
//! or writer directly with declared delegate adapters), and whether it
//! handles null itself.
//!
//! Delegates are bound when the adapter is created, before it is
//! published: a delegate signature equal to the method's own key resolves
//! through `next_adapter` (skipping this factory) to avoid recursion;
//! anything else goes through the normal registry lookup. When only one
//! direction is registered, the other delegates to the rest of the chain,
//! failing on first use if nothing further accepts the key.

use std::io;
use std::sync::Arc;

use crate::adapter::{Adapter, AnyAdapter};
use crate::any::{AnyValue, FromAny, IntoAny, Payload};
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::qualifier::QualifierSet;
use crate::reader::JsonReader;
use crate::registry::{AdapterFactory, Registry};
use crate::types::{Type, TypeOf, canonicalize};
use crate::writer::JsonWriter;

/// Error type user converter closures may fail with.
pub type ConvertError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for user converter closures.
pub type ConvertResult<T> = core::result::Result<T, ConvertError>;

/// The key and null-handling of one converter method.
#[derive(Clone)]
pub struct MethodSig {
    ty: Type,
    qualifiers: QualifierSet,
    nullable: bool,
}

impl MethodSig {
    /// A signature for `ty` with no qualifiers, not null-handling.
    pub fn of(ty: Type) -> MethodSig {
        MethodSig {
            ty: canonicalize(&ty),
            qualifiers: QualifierSet::empty(),
            nullable: false,
        }
    }

    /// Attach qualifiers to the key.
    pub fn qualified(mut self, qualifiers: QualifierSet) -> MethodSig {
        self.qualifiers = qualifiers;
        self
    }

    /// Opt into handling null inside the converter. Without this, the
    /// framework short-circuits null on both read and write.
    pub fn nullable(mut self) -> MethodSig {
        self.nullable = true;
        self
    }
}

type ToStreamFn = Arc<dyn Fn(&mut JsonWriter<'_>, &AnyValue, &[Adapter]) -> ConvertResult<()> + Send + Sync>;
type ToTransformFn = Arc<dyn Fn(&AnyValue) -> ConvertResult<AnyValue> + Send + Sync>;
type FromStreamFn = Arc<dyn Fn(&mut JsonReader, &[Adapter]) -> ConvertResult<AnyValue> + Send + Sync>;
type FromTransformFn = Arc<dyn Fn(AnyValue) -> ConvertResult<AnyValue> + Send + Sync>;

enum ToKind {
    Transform {
        target: Type,
        target_qualifiers: QualifierSet,
        f: ToTransformFn,
    },
    Streaming {
        delegates: Vec<(Type, QualifierSet)>,
        f: ToStreamFn,
    },
}

enum FromKind {
    Transform {
        source: Type,
        source_qualifiers: QualifierSet,
        f: FromTransformFn,
    },
    Streaming {
        delegates: Vec<(Type, QualifierSet)>,
        f: FromStreamFn,
    },
}

struct ToMethod {
    sig: MethodSig,
    kind: ToKind,
}

struct FromMethod {
    sig: MethodSig,
    kind: FromKind,
}

/// A set of user converter methods, registered on the builder with
/// [`RegistryBuilder::add_converters`](crate::registry::RegistryBuilder::add_converters).
#[derive(Default)]
pub struct Converters {
    to: Vec<ToMethod>,
    from: Vec<FromMethod>,
}

impl Converters {
    /// An empty set.
    pub fn new() -> Converters {
        Converters::default()
    }

    /// A transform-style to-JSON method: marshal the value to `R` and let
    /// the registry serialize `R`.
    pub fn map_to_json<T, R>(
        mut self,
        sig: MethodSig,
        f: impl Fn(&T) -> ConvertResult<R> + Send + Sync + 'static,
    ) -> Converters
    where
        T: Payload,
        R: IntoAny + TypeOf,
    {
        let kind = ToKind::Transform {
            target: R::type_of(),
            target_qualifiers: QualifierSet::empty(),
            f: Arc::new(move |value| {
                let concrete = value
                    .get::<T>()
                    .ok_or_else(|| ConvertError::from("converter received a foreign value"))?;
                Ok(f(concrete)?.into_any())
            }),
        };
        self.to.push(ToMethod { sig, kind });
        self
    }

    /// A transform-style from-JSON method: let the registry read `S`, then
    /// unmarshal it into the value.
    pub fn map_from_json<T, S>(
        mut self,
        sig: MethodSig,
        f: impl Fn(S) -> ConvertResult<T> + Send + Sync + 'static,
    ) -> Converters
    where
        T: Payload + Clone + PartialEq + core::fmt::Debug,
        S: FromAny + TypeOf,
    {
        let kind = FromKind::Transform {
            source: S::type_of(),
            source_qualifiers: QualifierSet::empty(),
            f: Arc::new(move |value| {
                let source = S::from_any(value).map_err(|e| ConvertError::from(e.to_string()))?;
                Ok(AnyValue::new(f(source)?))
            }),
        };
        self.from.push(FromMethod { sig, kind });
        self
    }

    /// A streaming-style to-JSON method. `delegates` declares the
    /// signatures of the adapter arguments handed to the closure, resolved
    /// at bind time.
    pub fn write_with(
        mut self,
        sig: MethodSig,
        delegates: Vec<(Type, QualifierSet)>,
        f: impl Fn(&mut JsonWriter<'_>, &AnyValue, &[Adapter]) -> ConvertResult<()>
        + Send
        + Sync
        + 'static,
    ) -> Converters {
        self.to.push(ToMethod {
            sig,
            kind: ToKind::Streaming {
                delegates,
                f: Arc::new(f),
            },
        });
        self
    }

    /// A streaming-style from-JSON method. `delegates` declares the
    /// signatures of the adapter arguments handed to the closure, resolved
    /// at bind time.
    pub fn read_with(
        mut self,
        sig: MethodSig,
        delegates: Vec<(Type, QualifierSet)>,
        f: impl Fn(&mut JsonReader, &[Adapter]) -> ConvertResult<AnyValue> + Send + Sync + 'static,
    ) -> Converters {
        self.from.push(FromMethod {
            sig,
            kind: FromKind::Streaming {
                delegates,
                f: Arc::new(f),
            },
        });
        self
    }
}

/// Factory dispatching registered converter methods.
pub struct ConverterFactory {
    to: Vec<ToMethod>,
    from: Vec<FromMethod>,
}

impl ConverterFactory {
    /// Validate the set and build the factory. Two methods with the same
    /// direction, type, and qualifiers conflict.
    pub(crate) fn from(converters: Converters) -> Result<ConverterFactory> {
        for (i, a) in converters.to.iter().enumerate() {
            for b in &converters.to[i + 1..] {
                if a.sig.ty == b.sig.ty && a.sig.qualifiers == b.sig.qualifiers {
                    return Err(JsonError::new(JsonErrorKind::ConflictingConverters {
                        direction: "to JSON",
                        ty: a.sig.ty.to_string(),
                    }));
                }
            }
        }
        for (i, a) in converters.from.iter().enumerate() {
            for b in &converters.from[i + 1..] {
                if a.sig.ty == b.sig.ty && a.sig.qualifiers == b.sig.qualifiers {
                    return Err(JsonError::new(JsonErrorKind::ConflictingConverters {
                        direction: "from JSON",
                        ty: a.sig.ty.to_string(),
                    }));
                }
            }
        }
        Ok(ConverterFactory {
            to: converters.to,
            from: converters.from,
        })
    }

    fn bind_delegate(
        &self,
        registry: &Registry,
        key_ty: &Type,
        key_qualifiers: &QualifierSet,
        delegate_ty: &Type,
        delegate_qualifiers: &QualifierSet,
    ) -> Result<Adapter> {
        let delegate_ty = canonicalize(delegate_ty);
        if &delegate_ty == key_ty && delegate_qualifiers == key_qualifiers {
            // The method wants an adapter for its own key; skipping this
            // factory avoids infinite recursion.
            registry.next_adapter(self, &delegate_ty, delegate_qualifiers)
        } else {
            registry.adapter(&delegate_ty, delegate_qualifiers)
        }
    }
}

impl AdapterFactory for ConverterFactory {
    fn create(
        &self,
        ty: &Type,
        qualifiers: &QualifierSet,
        registry: &Registry,
    ) -> Result<Option<Arc<dyn AnyAdapter>>> {
        let to = self
            .to
            .iter()
            .find(|m| m.sig.ty == *ty && m.sig.qualifiers == *qualifiers);
        let from = self
            .from
            .iter()
            .find(|m| m.sig.ty == *ty && m.sig.qualifiers == *qualifiers);
        if to.is_none() && from.is_none() {
            return Ok(None);
        }

        let bound_to = match to {
            Some(method) => Some(match &method.kind {
                ToKind::Transform {
                    target,
                    target_qualifiers,
                    f,
                } => BoundTo::Transform {
                    delegate: self.bind_delegate(registry, ty, qualifiers, target, target_qualifiers)?,
                    f: f.clone(),
                    nullable: method.sig.nullable,
                },
                ToKind::Streaming { delegates, f } => BoundTo::Streaming {
                    delegates: delegates
                        .iter()
                        .map(|(dty, dq)| self.bind_delegate(registry, ty, qualifiers, dty, dq))
                        .collect::<Result<Vec<_>>>()?,
                    f: f.clone(),
                    nullable: method.sig.nullable,
                },
            }),
            None => None,
        };
        let bound_from = match from {
            Some(method) => Some(match &method.kind {
                FromKind::Transform {
                    source,
                    source_qualifiers,
                    f,
                } => BoundFrom::Transform {
                    delegate: self.bind_delegate(registry, ty, qualifiers, source, source_qualifiers)?,
                    f: f.clone(),
                    nullable: method.sig.nullable,
                },
                FromKind::Streaming { delegates, f } => BoundFrom::Streaming {
                    delegates: delegates
                        .iter()
                        .map(|(dty, dq)| self.bind_delegate(registry, ty, qualifiers, dty, dq))
                        .collect::<Result<Vec<_>>>()?,
                    f: f.clone(),
                    nullable: method.sig.nullable,
                },
            }),
            None => None,
        };

        // A one-directional registration falls back to the rest of the
        // chain for the missing direction. When nothing further accepts
        // the key, the failure surfaces on first use.
        let fallback = if bound_to.is_none() || bound_from.is_none() {
            registry.next_adapter(self, ty, qualifiers).ok()
        } else {
            None
        };

        Ok(Some(Arc::new(ConverterAdapter {
            ty: ty.to_string(),
            to: bound_to,
            from: bound_from,
            fallback,
        })))
    }
}

enum BoundTo {
    Transform {
        delegate: Adapter,
        f: ToTransformFn,
        nullable: bool,
    },
    Streaming {
        delegates: Vec<Adapter>,
        f: ToStreamFn,
        nullable: bool,
    },
}

enum BoundFrom {
    Transform {
        delegate: Adapter,
        f: FromTransformFn,
        nullable: bool,
    },
    Streaming {
        delegates: Vec<Adapter>,
        f: FromStreamFn,
        nullable: bool,
    },
}

struct ConverterAdapter {
    ty: String,
    to: Option<BoundTo>,
    from: Option<BoundFrom>,
    fallback: Option<Adapter>,
}

/// Unwrap a user-closure failure: an I/O cause propagates as I/O, a crate
/// error passes through, anything else becomes a data error at `path`.
fn unwrap_user_error(e: ConvertError, path: String) -> JsonError {
    let e = match e.downcast::<JsonError>() {
        Ok(json) => return *json,
        Err(e) => e,
    };
    match e.downcast::<io::Error>() {
        Ok(io_error) => JsonError::new(JsonErrorKind::Io(*io_error)),
        Err(other) => JsonError::invalid_value(other.to_string()).with_path(path),
    }
}

impl AnyAdapter for ConverterAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        let Some(from) = &self.from else {
            return match &self.fallback {
                Some(fallback) => fallback.from_json(reader),
                None => Err(JsonError::new(JsonErrorKind::NoAdapter {
                    ty: self.ty.clone(),
                    qualifiers: "a from-JSON converter".to_owned(),
                })),
            };
        };

        let nullable = match from {
            BoundFrom::Transform { nullable, .. } | BoundFrom::Streaming { nullable, .. } => {
                *nullable
            }
        };
        if !nullable && reader.peek()? == crate::reader::Token::Null {
            reader.next_null()?;
            return Ok(AnyValue::null());
        }

        match from {
            BoundFrom::Transform { delegate, f, .. } => {
                let intermediate = delegate.from_json(reader)?;
                f(intermediate).map_err(|e| unwrap_user_error(e, reader.path()))
            }
            BoundFrom::Streaming { delegates, f, .. } => {
                f(reader, delegates).map_err(|e| unwrap_user_error(e, reader.path()))
            }
        }
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        let Some(to) = &self.to else {
            return match &self.fallback {
                Some(fallback) => fallback.to_json(writer, value),
                None => Err(JsonError::new(JsonErrorKind::NoAdapter {
                    ty: self.ty.clone(),
                    qualifiers: "a to-JSON converter".to_owned(),
                })),
            };
        };

        let nullable = match to {
            BoundTo::Transform { nullable, .. } | BoundTo::Streaming { nullable, .. } => *nullable,
        };
        if !nullable && value.is_null() {
            return writer.null_value();
        }

        match to {
            BoundTo::Transform { delegate, f, .. } => {
                let intermediate = f(value).map_err(|e| unwrap_user_error(e, writer.path()))?;
                delegate.to_json(writer, &intermediate)
            }
            BoundTo::Streaming { delegates, f, .. } => {
                f(writer, value, delegates).map_err(|e| unwrap_user_error(e, writer.path()))
            }
        }
    }
}

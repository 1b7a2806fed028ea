//! The adapter registry: an ordered factory chain with re-entrant lookup.
//!
//! Factories are fixed at build time: user factories first, in insertion
//! order, then the built-in chain. Lookup walks the chain until a factory
//! produces an adapter; results are cached per (canonical type, qualifier
//! set).
//!
//! Self-referential types resolve through a per-thread trail of pending
//! lookups. A lookup that re-enters with a key already on the trail gets
//! that entry's deferred adapter instead of recursing forever; the
//! deferred adapter binds to the real one when the outer lookup finishes.
//! Cache commits happen only when the outermost lookup succeeds, so a
//! failed parent lookup never publishes adapters holding unbound stubs.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::adapter::{Adapter, AnyAdapter};
use crate::adapters;
use crate::any::AnyValue;
use crate::convert::{ConverterFactory, Converters};
use crate::error::{JsonError, JsonErrorKind, Result};
use crate::qualifier::QualifierSet;
use crate::reader::JsonReader;
use crate::types::{Type, TypeOf, canonicalize};
use crate::writer::JsonWriter;

/// A rule producing adapters for some family of (type, qualifier) keys.
pub trait AdapterFactory: Send + Sync {
    /// Produce an adapter for the key, or decline with `Ok(None)`.
    fn create(
        &self,
        ty: &Type,
        qualifiers: &QualifierSet,
        registry: &Registry,
    ) -> Result<Option<Arc<dyn AnyAdapter>>>;
}

type CacheKey = (Type, QualifierSet);

struct RegistryInner {
    factories: Vec<Arc<dyn AdapterFactory>>,
    cache: Mutex<HashMap<CacheKey, Arc<dyn AnyAdapter>>>,
}

/// Immutable registry of adapter factories. Cheap to clone and safe to
/// share across threads.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

/// Builder for [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    factories: Vec<Arc<dyn AdapterFactory>>,
    field_bindings: Option<Arc<dyn adapters::class::FieldBindings>>,
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("factories", &self.factories.len())
            .field("field_bindings", &self.field_bindings.is_some())
            .finish()
    }
}

impl RegistryBuilder {
    /// Append a user factory. User factories run before every built-in
    /// factory, in insertion order.
    pub fn add(mut self, factory: Arc<dyn AdapterFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Register a fixed adapter for one (type, qualifier set) key.
    pub fn add_adapter(
        self,
        ty: Type,
        qualifiers: QualifierSet,
        adapter: Arc<dyn AnyAdapter>,
    ) -> Self {
        struct Fixed {
            ty: Type,
            qualifiers: QualifierSet,
            adapter: Arc<dyn AnyAdapter>,
        }
        impl AdapterFactory for Fixed {
            fn create(
                &self,
                ty: &Type,
                qualifiers: &QualifierSet,
                _registry: &Registry,
            ) -> Result<Option<Arc<dyn AnyAdapter>>> {
                if *ty == self.ty && *qualifiers == self.qualifiers {
                    Ok(Some(self.adapter.clone()))
                } else {
                    Ok(None)
                }
            }
        }
        let ty = canonicalize(&ty);
        self.add(Arc::new(Fixed {
            ty,
            qualifiers,
            adapter,
        }))
    }

    /// Register a set of user converter methods. Fails on conflicting
    /// registrations (same direction, type, and qualifiers).
    pub fn add_converters(self, converters: Converters) -> Result<Self> {
        let factory = ConverterFactory::from(converters)?;
        Ok(self.add(Arc::new(factory)))
    }

    /// Replace the structural factory's field-binding strategy.
    pub fn field_bindings(mut self, strategy: Arc<dyn adapters::class::FieldBindings>) -> Self {
        self.field_bindings = Some(strategy);
        self
    }

    /// Build the registry, appending the built-in factory chain.
    pub fn build(mut self) -> Registry {
        self.factories.push(Arc::new(adapters::standard::StandardFactory));
        self.factories.push(Arc::new(adapters::standard::GeneratedFactory));
        self.factories.push(Arc::new(adapters::collection::CollectionFactory));
        self.factories.push(Arc::new(adapters::map::MapFactory));
        self.factories.push(Arc::new(adapters::array::ArrayFactory));
        self.factories.push(Arc::new(adapters::enums::EnumFactory));
        self.factories.push(Arc::new(adapters::standard::ObjectFactory));
        self.factories.push(Arc::new(adapters::class::ClassFactory::new(
            self.field_bindings
                .unwrap_or_else(|| Arc::new(adapters::class::DeclaredFields)),
        )));
        Registry {
            inner: Arc::new(RegistryInner {
                factories: self.factories,
                cache: Mutex::new(HashMap::new()),
            }),
        }
    }
}

/// Placeholder inserted into the lookup trail; binds to the real adapter
/// once its key finishes resolving and delegates forever after.
struct DeferredAdapter {
    slot: OnceLock<Arc<dyn AnyAdapter>>,
}

impl DeferredAdapter {
    fn ready(&self) -> Result<&Arc<dyn AnyAdapter>> {
        self.slot
            .get()
            .ok_or_else(|| JsonError::new(JsonErrorKind::AdapterNotReady))
    }
}

impl AnyAdapter for DeferredAdapter {
    fn read(&self, reader: &mut JsonReader) -> Result<AnyValue> {
        self.ready()?.read(reader)
    }

    fn write(&self, writer: &mut JsonWriter<'_>, value: &AnyValue) -> Result<()> {
        self.ready()?.write(writer, value)
    }
}

struct LookupEntry {
    key: CacheKey,
    deferred: Arc<DeferredAdapter>,
}

#[derive(Default)]
struct LookupTrail {
    entries: Vec<LookupEntry>,
    /// Adapters resolved under the current outermost lookup, committed to
    /// the cache only if it succeeds.
    pending_commit: Vec<(CacheKey, Arc<dyn AnyAdapter>)>,
}

thread_local! {
    static TRAIL: RefCell<LookupTrail> = RefCell::new(LookupTrail::default());
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The adapter for a (type, qualifier set) key. Fails with a
    /// registration error when no factory accepts the key.
    pub fn adapter(&self, ty: &Type, qualifiers: &QualifierSet) -> Result<Adapter> {
        let key = (canonicalize(ty), qualifiers.clone());

        if let Some(hit) = self
            .inner
            .cache
            .lock()
            .expect("adapter cache poisoned")
            .get(&key)
        {
            return Ok(Adapter::new(hit.clone()));
        }

        // Cycle check: a pending lookup with this key resolves to its
        // deferred stub instead of recursing.
        let pending = TRAIL.with(|trail| {
            let trail = trail.borrow();
            trail
                .entries
                .iter()
                .find(|entry| entry.key == key)
                .map(|entry| entry.deferred.clone())
        });
        if let Some(deferred) = pending {
            log::trace!("re-entrant lookup for {}, serving deferred stub", key.0);
            return Ok(Adapter::new(deferred));
        }

        let deferred = Arc::new(DeferredAdapter {
            slot: OnceLock::new(),
        });
        TRAIL.with(|trail| {
            trail.borrow_mut().entries.push(LookupEntry {
                key: key.clone(),
                deferred: deferred.clone(),
            });
        });

        let outcome = self.create_from(0, &key.0, &key.1);

        match outcome {
            Ok(Some(adapter)) => {
                let _ = deferred.slot.set(adapter.clone());
                self.pop_trail(true, Some((key, adapter.clone())));
                Ok(Adapter::new(adapter))
            }
            Ok(None) => {
                self.pop_trail(false, None);
                Err(JsonError::new(JsonErrorKind::NoAdapter {
                    ty: key.0.to_string(),
                    qualifiers: key.1.to_string(),
                }))
            }
            Err(e) => {
                self.pop_trail(false, None);
                Err(e)
            }
        }
    }

    /// The adapter for a Rust type with a descriptor mapping, with no
    /// qualifiers.
    pub fn adapter_of<T: TypeOf>(&self) -> Result<Adapter> {
        self.adapter(&T::type_of(), &QualifierSet::empty())
    }

    /// Walk the factory chain starting after `skip_past`. Used by
    /// factories that delegate the same key onward. Consults neither the
    /// cache nor the re-entrancy trail.
    pub fn next_adapter(
        &self,
        skip_past: &dyn AdapterFactory,
        ty: &Type,
        qualifiers: &QualifierSet,
    ) -> Result<Adapter> {
        let ty = canonicalize(ty);
        let skip_ptr = skip_past as *const dyn AdapterFactory as *const ();
        let index = self
            .inner
            .factories
            .iter()
            .position(|f| Arc::as_ptr(f) as *const () == skip_ptr)
            .ok_or_else(|| {
                JsonError::invalid_value("next_adapter called with an unregistered factory")
            })?;
        match self.create_from(index + 1, &ty, qualifiers)? {
            Some(adapter) => Ok(Adapter::new(adapter)),
            None => Err(JsonError::new(JsonErrorKind::NoAdapter {
                ty: ty.to_string(),
                qualifiers: qualifiers.to_string(),
            })),
        }
    }

    fn create_from(
        &self,
        first_index: usize,
        ty: &Type,
        qualifiers: &QualifierSet,
    ) -> Result<Option<Arc<dyn AnyAdapter>>> {
        for (i, factory) in self.inner.factories.iter().enumerate().skip(first_index) {
            if let Some(adapter) = factory.create(ty, qualifiers, self)? {
                log::trace!("factory #{i} produced an adapter for {ty}");
                return Ok(Some(adapter));
            }
        }
        Ok(None)
    }

    fn pop_trail(&self, success: bool, resolved: Option<(CacheKey, Arc<dyn AnyAdapter>)>) {
        TRAIL.with(|trail| {
            let mut trail = trail.borrow_mut();
            trail.entries.pop();
            if let Some(entry) = resolved {
                trail.pending_commit.push(entry);
            }
            if trail.entries.is_empty() {
                let pending = core::mem::take(&mut trail.pending_commit);
                if success {
                    let mut cache = self.inner.cache.lock().expect("adapter cache poisoned");
                    for (key, adapter) in pending {
                        cache.entry(key).or_insert(adapter);
                    }
                }
            }
        });
    }
}

//! Runtime type descriptors and the class registry.
//!
//! The adapter registry is keyed by *descriptors*, not by static Rust
//! types: a [`Type`] is a comparable, hashable tree of concrete classes,
//! parameterized applications, arrays, wildcards, and type variables.
//! Classes themselves are interned records in a process-wide table, the
//! crate's stand-in for runtime reflection, populated by registration the
//! way generated code would populate it. A [`ClassRef`] carries the
//! class's declared type parameters, its generic supertypes (which is what
//! makes [`resolve`] able to substitute variables by walking the chain),
//! and, for struct and enum shapes, the dynamic vtable used by the
//! structural adapters.

use core::any::TypeId;
use core::fmt::{self, Display};
use core::hash::{Hash, Hasher};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::any::{AnyValue, FromAny, IntoAny, JsonMap, JsonSet, Payload};
use crate::error::{JsonError, Result};
use crate::qualifier::QualifierSet;
use crate::value::JsonValue;

// ---------------------------------------------------------------------------
// Class records

/// Built-in scalar classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `i8`, range-checked through the i32 read
    I8,
    /// `i16`, range-checked through the i32 read
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `char`, encoded as a length-1 string
    Char,
}

/// What a registered class is.
pub enum ClassKind {
    /// A built-in scalar
    Scalar(ScalarKind),
    /// The string class
    Str,
    /// The root "any value" class
    Object,
    /// The list raw class (`Vec`-shaped)
    List,
    /// The set raw class
    Set,
    /// The collection raw class, generic supertype of list and set
    Collection,
    /// The map raw class
    Map,
    /// The array pseudo-class backing [`Type::Array`]
    Array,
    /// A user struct shape
    Struct(StructShape),
    /// A user enum shape
    Enum(EnumShape),
}

impl fmt::Debug for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKind::Scalar(kind) => write!(f, "Scalar({kind:?})"),
            ClassKind::Str => write!(f, "Str"),
            ClassKind::Object => write!(f, "Object"),
            ClassKind::List => write!(f, "List"),
            ClassKind::Set => write!(f, "Set"),
            ClassKind::Collection => write!(f, "Collection"),
            ClassKind::Map => write!(f, "Map"),
            ClassKind::Array => write!(f, "Array"),
            ClassKind::Struct(_) => write!(f, "Struct"),
            ClassKind::Enum(_) => write!(f, "Enum"),
        }
    }
}

/// Constructor used by structural adapters.
pub type Constructor = Arc<dyn Fn() -> AnyValue + Send + Sync>;

/// Hook consulted by the generated-adapter factory: the Rust analog of
/// resolving a generated `…JsonAdapter` class by naming convention.
pub type GeneratedAdapterFn = Arc<
    dyn Fn(
            &crate::registry::Registry,
            &Type,
            &QualifierSet,
        ) -> Result<Option<Arc<dyn crate::adapter::AnyAdapter>>>
        + Send
        + Sync,
>;

/// The declared fields and construction strategy of a struct class.
///
/// Fields sit behind a `OnceLock` for the same reason supertypes do: a
/// self-referential class (`Employee` with `reports: List<Employee>`)
/// declares fields that mention its own handle, so they are wired up
/// right after interning.
pub struct StructShape {
    fields: OnceLock<Vec<FieldDef>>,
    /// Registered constructor, when the class has a Rust representation
    pub construct: Option<Constructor>,
    /// Synthesize a dynamic instance with type-based default field values
    pub synthesize_defaults: bool,
    /// Generated-adapter hook
    pub generated_adapter: Option<GeneratedAdapterFn>,
}

impl StructShape {
    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        self.fields.get().map_or(&[], Vec::as_slice)
    }
}

/// One enum constant: declared name plus optional JSON-name override.
#[derive(Debug, Clone)]
pub struct EnumConstant {
    /// The declared constant name
    pub name: String,
    /// The name used on the wire, when overridden
    pub json_name: Option<String>,
}

impl EnumConstant {
    /// The name used on the wire.
    pub fn wire_name(&self) -> &str {
        self.json_name.as_deref().unwrap_or(&self.name)
    }
}

/// The constants and instance bridge of an enum class.
pub struct EnumShape {
    /// Declared constants, in declaration order
    pub constants: Vec<EnumConstant>,
    /// Build the constant at an index
    pub construct: Arc<dyn Fn(usize) -> AnyValue + Send + Sync>,
    /// The index of an instance's constant
    pub index_of: Arc<dyn Fn(&AnyValue) -> Option<usize> + Send + Sync>,
}

/// A declared field: name, generic type, qualifiers, and erased accessors.
#[derive(Clone)]
pub struct FieldDef {
    /// Declared field name
    pub name: String,
    /// JSON name override
    pub json_name: Option<String>,
    /// Declared type, possibly containing type variables
    pub ty: Type,
    /// Qualifier annotations on the field
    pub qualifiers: QualifierSet,
    /// Excluded from serialization entirely
    pub ignored: bool,
    get: Arc<dyn Fn(&AnyValue) -> Result<AnyValue> + Send + Sync>,
    set: Arc<dyn Fn(&mut AnyValue, AnyValue) -> Result<()> + Send + Sync>,
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

impl FieldDef {
    /// A field of a Rust-backed class, with typed accessors.
    pub fn new<C, F>(
        name: &str,
        ty: Type,
        get: impl Fn(&C) -> F + Send + Sync + 'static,
        set: impl Fn(&mut C, F) + Send + Sync + 'static,
    ) -> FieldDef
    where
        C: Payload,
        F: IntoAny + FromAny,
    {
        let field = name.to_owned();
        let field2 = name.to_owned();
        FieldDef {
            name: name.to_owned(),
            json_name: None,
            ty,
            qualifiers: QualifierSet::empty(),
            ignored: false,
            get: Arc::new(move |instance| {
                let concrete = instance.get::<C>().ok_or_else(|| {
                    JsonError::invalid_value(format!("wrong instance type reading field {field}"))
                })?;
                Ok(get(concrete).into_any())
            }),
            set: Arc::new(move |instance, value| {
                let concrete = instance.get_mut::<C>().ok_or_else(|| {
                    JsonError::invalid_value(format!("wrong instance type writing field {field2}"))
                })?;
                set(concrete, F::from_any(value)?);
                Ok(())
            }),
        }
    }

    /// A field of a dynamic [`Record`](crate::any::Record) class.
    pub fn dynamic(name: &str, ty: Type) -> FieldDef {
        let field = name.to_owned();
        let field2 = name.to_owned();
        FieldDef {
            name: name.to_owned(),
            json_name: None,
            ty,
            qualifiers: QualifierSet::empty(),
            ignored: false,
            get: Arc::new(move |instance| {
                let record = instance.get::<crate::any::Record>().ok_or_else(|| {
                    JsonError::invalid_value(format!("wrong instance type reading field {field}"))
                })?;
                Ok(record.get(&field))
            }),
            set: Arc::new(move |instance, value| {
                let record = instance.get_mut::<crate::any::Record>().ok_or_else(|| {
                    JsonError::invalid_value(format!("wrong instance type writing field {field2}"))
                })?;
                record.set(&field2, value);
                Ok(())
            }),
        }
    }

    /// Override the name used on the wire.
    pub fn json_name(mut self, name: &str) -> Self {
        self.json_name = Some(name.to_owned());
        self
    }

    /// Attach qualifier annotations.
    pub fn qualified(mut self, qualifiers: QualifierSet) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// Exclude this field from serialization.
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Read this field from an instance.
    pub fn get_value(&self, instance: &AnyValue) -> Result<AnyValue> {
        (self.get)(instance)
    }

    /// Write this field into an instance.
    pub fn set_value(&self, instance: &mut AnyValue, value: AnyValue) -> Result<()> {
        (self.set)(instance, value)
    }
}

/// An interned class record.
///
/// Supertypes are set through a `OnceLock` so that a class whose generic
/// supertype mentions its own type variables (`List<E>` extending
/// `Collection<E>`) can be wired up after its handle exists.
pub struct ClassInfo {
    name: String,
    kind: ClassKind,
    type_params: Vec<&'static str>,
    supertypes: OnceLock<Vec<Type>>,
    rust_type: Option<TypeId>,
}

/// Cheap handle to an interned class.
#[derive(Clone)]
pub struct ClassRef(Arc<ClassInfo>);

impl ClassRef {
    /// The class name.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// What the class is.
    pub fn kind(&self) -> &ClassKind {
        &self.0.kind
    }

    /// Declared type parameter names, in order.
    pub fn type_params(&self) -> &[&'static str] {
        &self.0.type_params
    }

    /// Declared generic supertypes.
    pub fn supertypes(&self) -> &[Type] {
        self.0.supertypes.get().map_or(&[], Vec::as_slice)
    }

    /// The Rust type backing this class, if any.
    pub fn rust_type(&self) -> Option<TypeId> {
        self.0.rust_type
    }

    /// This class as a type.
    pub fn ty(&self) -> Type {
        Type::Class(self.clone())
    }

    /// A parameterized application of this class.
    pub fn of(&self, args: Vec<Type>) -> Type {
        Type::Parameterized {
            owner: None,
            raw: self.clone(),
            args,
        }
    }

    /// True for classes in the reserved platform namespaces, which the
    /// structural factory refuses to reflect over.
    pub fn is_platform(&self) -> bool {
        self.0.name.starts_with("std::")
            || self.0.name.starts_with("core::")
            || self.0.name.starts_with("alloc::")
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.0.name)
    }
}

// ---------------------------------------------------------------------------
// The type algebra

/// A runtime type descriptor.
#[derive(Clone)]
pub enum Type {
    /// A concrete class
    Class(ClassRef),
    /// A generic application, e.g. `List<String>`
    Parameterized {
        /// Enclosing type for nested classes, if any
        owner: Option<Box<Type>>,
        /// The raw (erased) class
        raw: ClassRef,
        /// Type arguments, one per declared parameter
        args: Vec<Type>,
    },
    /// An array of a component type
    Array(Box<Type>),
    /// A bounded unknown, e.g. `? extends Number`
    Wildcard {
        /// Upper bounds (`extends`)
        upper: Vec<Type>,
        /// Lower bounds (`super`)
        lower: Vec<Type>,
    },
    /// A declared type variable
    Variable {
        /// The variable's name, e.g. `T`
        name: String,
        /// The class that declared it; identity participates in equality
        declared_by: ClassRef,
    },
}

impl Type {
    /// The type for a Rust type with a known descriptor mapping.
    pub fn of<T: TypeOf>() -> Type {
        T::type_of()
    }

    /// Construct a parameterized type.
    pub fn parameterized(raw: ClassRef, args: Vec<Type>) -> Type {
        Type::Parameterized {
            owner: None,
            raw,
            args,
        }
    }

    /// Construct a parameterized type with an owner.
    pub fn parameterized_with_owner(owner: Type, raw: ClassRef, args: Vec<Type>) -> Type {
        Type::Parameterized {
            owner: Some(Box::new(owner)),
            raw,
            args,
        }
    }

    /// Construct an array type.
    pub fn array_of(component: Type) -> Type {
        Type::Array(Box::new(component))
    }

    /// A wildcard with an upper bound: `? extends bound`.
    pub fn subtype_of(bound: Type) -> Type {
        Type::Wildcard {
            upper: vec![bound],
            lower: Vec::new(),
        }
    }

    /// A wildcard with a lower bound: `? super bound`.
    pub fn supertype_of(bound: Type) -> Type {
        Type::Wildcard {
            upper: vec![classes::object().ty()],
            lower: vec![bound],
        }
    }

    /// A type variable declared by `declared_by`.
    pub fn variable(name: &str, declared_by: ClassRef) -> Type {
        Type::Variable {
            name: name.to_owned(),
            declared_by,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Class(a), Type::Class(b)) => a == b,
            (
                Type::Parameterized {
                    owner: ao,
                    raw: ar,
                    args: aa,
                },
                Type::Parameterized {
                    owner: bo,
                    raw: br,
                    args: ba,
                },
            ) => ao == bo && ar == br && aa == ba,
            (Type::Array(a), Type::Array(b)) => a == b,
            (
                Type::Wildcard {
                    upper: au,
                    lower: al,
                },
                Type::Wildcard {
                    upper: bu,
                    lower: bl,
                },
            ) => au == bu && al == bl,
            (
                Type::Variable {
                    name: an,
                    declared_by: ad,
                },
                Type::Variable {
                    name: bn,
                    declared_by: bd,
                },
            ) => an == bn && ad == bd,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Type::Class(c) => c.hash(state),
            Type::Parameterized { owner, raw, args } => {
                owner.hash(state);
                raw.hash(state);
                args.hash(state);
            }
            Type::Array(component) => component.hash(state),
            Type::Wildcard { upper, lower } => {
                upper.hash(state);
                lower.hash(state);
            }
            Type::Variable { name, declared_by } => {
                name.hash(state);
                declared_by.hash(state);
            }
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Class(c) => f.write_str(c.name()),
            Type::Parameterized { raw, args, .. } => {
                f.write_str(raw.name())?;
                f.write_str("<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            Type::Array(component) => write!(f, "{component}[]"),
            Type::Wildcard { upper, lower } => {
                if let Some(bound) = lower.first() {
                    return write!(f, "? super {bound}");
                }
                match upper.first() {
                    Some(bound) if *bound != classes::object().ty() => {
                        write!(f, "? extends {bound}")
                    }
                    _ => f.write_str("?"),
                }
            }
            Type::Variable { name, .. } => f.write_str(name),
        }
    }
}

/// The erased class of any descriptor.
pub fn raw_type(ty: &Type) -> ClassRef {
    match ty {
        Type::Class(c) => c.clone(),
        Type::Parameterized { raw, .. } => raw.clone(),
        Type::Array(_) => classes::array(),
        Type::Wildcard { upper, .. } => match upper.first() {
            Some(bound) => raw_type(bound),
            None => classes::object(),
        },
        Type::Variable { .. } => classes::object(),
    }
}

/// Rewrite wildcards into their bounds and normalize recursively. The
/// original's primitive boxing has no analog here: scalars are already
/// first-class classes.
pub fn canonicalize(ty: &Type) -> Type {
    match ty {
        Type::Class(c) => Type::Class(c.clone()),
        Type::Parameterized { owner, raw, args } => Type::Parameterized {
            owner: owner.as_deref().map(|o| Box::new(canonicalize(o))),
            raw: raw.clone(),
            args: args.iter().map(canonicalize).collect(),
        },
        Type::Array(component) => Type::array_of(canonicalize(component)),
        Type::Wildcard { upper, lower } => {
            if let Some(bound) = lower.first() {
                return Type::supertype_of(canonicalize(bound));
            }
            match upper.first() {
                // `? extends X` with a concrete bound collapses to `X`.
                Some(bound @ (Type::Class(_) | Type::Parameterized { .. } | Type::Array(_))) => {
                    canonicalize(bound)
                }
                Some(other) => Type::subtype_of(canonicalize(other)),
                None => Type::subtype_of(classes::object().ty()),
            }
        }
        Type::Variable { .. } => ty.clone(),
    }
}

/// Substitute type-variable occurrences in `to_resolve` with the bindings
/// derived from `context` (an instantiation of `context_raw`), walking the
/// generic supertype chain. This is what lets `List<T>` inside a generic
/// class resolve `T` to the concrete argument.
pub fn resolve(context: &Type, context_raw: &ClassRef, to_resolve: &Type) -> Type {
    match to_resolve {
        Type::Variable { name, declared_by } => {
            match resolve_type_variable(context, context_raw, name, declared_by) {
                Some(resolved) if &resolved != to_resolve => {
                    resolve(context, context_raw, &resolved)
                }
                _ => to_resolve.clone(),
            }
        }
        Type::Array(component) => {
            let resolved = resolve(context, context_raw, component);
            if &resolved == component.as_ref() {
                to_resolve.clone()
            } else {
                Type::array_of(resolved)
            }
        }
        Type::Parameterized { owner, raw, args } => Type::Parameterized {
            owner: owner
                .as_deref()
                .map(|o| Box::new(resolve(context, context_raw, o))),
            raw: raw.clone(),
            args: args
                .iter()
                .map(|arg| resolve(context, context_raw, arg))
                .collect(),
        },
        Type::Wildcard { upper, lower } => Type::Wildcard {
            upper: upper
                .iter()
                .map(|b| resolve(context, context_raw, b))
                .collect(),
            lower: lower
                .iter()
                .map(|b| resolve(context, context_raw, b))
                .collect(),
        },
        Type::Class(_) => to_resolve.clone(),
    }
}

fn resolve_type_variable(
    context: &Type,
    context_raw: &ClassRef,
    name: &str,
    declared_by: &ClassRef,
) -> Option<Type> {
    let declared_as = generic_supertype(context, context_raw, declared_by)?;
    if let Type::Parameterized { args, .. } = declared_as {
        let index = declared_by.type_params().iter().position(|p| *p == name)?;
        return args.get(index).cloned();
    }
    None
}

/// The generic form of `target` as instantiated by `context` (an
/// instantiation of `raw`), found by walking declared supertypes.
pub fn generic_supertype(context: &Type, raw: &ClassRef, target: &ClassRef) -> Option<Type> {
    if raw == target {
        return Some(context.clone());
    }
    for declared in raw.supertypes() {
        let declared_raw = raw_type(declared);
        let instantiated = resolve(context, raw, declared);
        if &declared_raw == target {
            return Some(instantiated);
        }
        if let Some(found) = generic_supertype(&instantiated, &declared_raw, target) {
            return Some(found);
        }
    }
    None
}

/// An argument that stayed a variable is an erased use; treat it as the
/// object class.
fn concrete_or_object(ty: Type) -> Type {
    match ty {
        Type::Variable { .. } => classes::object().ty(),
        other => other,
    }
}

/// The element type of a collection-shaped type, defaulting to the object
/// class for erased uses.
pub fn collection_element_type(ty: &Type) -> Type {
    let raw = raw_type(ty);
    match generic_supertype(ty, &raw, &classes::collection()) {
        Some(Type::Parameterized { args, .. }) => concrete_or_object(
            args.first().cloned().unwrap_or_else(|| classes::object().ty()),
        ),
        _ => classes::object().ty(),
    }
}

/// The key and value types of a map-shaped type, defaulting to the object
/// class for erased uses.
pub fn map_key_value_types(ty: &Type) -> (Type, Type) {
    let raw = raw_type(ty);
    match generic_supertype(ty, &raw, &classes::map()) {
        Some(Type::Parameterized { args, .. }) if args.len() == 2 => (
            concrete_or_object(args[0].clone()),
            concrete_or_object(args[1].clone()),
        ),
        _ => (classes::object().ty(), classes::object().ty()),
    }
}

/// The component type of an array type.
pub fn array_component_type(ty: &Type) -> Option<Type> {
    match ty {
        Type::Array(component) => Some((**component).clone()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Class registration

/// Builder for registering a class.
pub struct ClassDef {
    name: String,
    rust_type: Option<TypeId>,
    type_params: Vec<&'static str>,
    supertypes: Vec<Type>,
    fields: Vec<FieldDef>,
    construct: Option<Constructor>,
    synthesize_defaults: bool,
    generated_adapter: Option<GeneratedAdapterFn>,
}

impl ClassDef {
    /// A struct class backed by Rust type `T`.
    pub fn new<T: 'static>(name: &str) -> ClassDef {
        ClassDef {
            name: name.to_owned(),
            rust_type: Some(TypeId::of::<T>()),
            type_params: Vec::new(),
            supertypes: Vec::new(),
            fields: Vec::new(),
            construct: None,
            synthesize_defaults: false,
            generated_adapter: None,
        }
    }

    /// A dynamic record class with no Rust representation.
    pub fn record(name: &str) -> ClassDef {
        ClassDef {
            name: name.to_owned(),
            rust_type: None,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            fields: Vec::new(),
            construct: None,
            synthesize_defaults: false,
            generated_adapter: None,
        }
    }

    /// Declare type parameters.
    pub fn type_params(mut self, params: &[&'static str]) -> Self {
        self.type_params = params.to_vec();
        self
    }

    /// Declare a generic supertype.
    pub fn supertype(mut self, ty: Type) -> Self {
        self.supertypes.push(ty);
        self
    }

    /// Declare a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Register a constructor.
    pub fn construct_with(
        mut self,
        construct: impl Fn() -> AnyValue + Send + Sync + 'static,
    ) -> Self {
        self.construct = Some(Arc::new(construct));
        self
    }

    /// Mark the class for synthesized-defaults construction: a dynamic
    /// instance whose fields start at type-based defaults.
    pub fn construct_with_defaults(mut self) -> Self {
        self.synthesize_defaults = true;
        self
    }

    /// Register a generated-adapter hook for this class.
    pub fn generated_adapter(mut self, f: GeneratedAdapterFn) -> Self {
        self.generated_adapter = Some(f);
        self
    }

    /// Intern the class. Re-registering a name returns the existing
    /// record.
    pub fn register(self) -> ClassRef {
        self.register_linked(|_| ClassLinks::default())
    }

    /// Intern the class with declarations that mention the class's own
    /// handle (self-referential fields, recursive generic supertypes): the
    /// closure receives the not-yet-published handle and its output is
    /// appended to the builder's declarations. The class becomes visible
    /// to lookups only once fully wired.
    pub fn register_linked(self, links: impl FnOnce(&ClassRef) -> ClassLinks) -> ClassRef {
        let mut fields = self.fields;
        let mut supertypes = self.supertypes;
        let class = ClassRef(Arc::new(ClassInfo {
            name: self.name,
            kind: ClassKind::Struct(StructShape {
                fields: OnceLock::new(),
                construct: self.construct,
                synthesize_defaults: self.synthesize_defaults,
                generated_adapter: self.generated_adapter,
            }),
            type_params: self.type_params,
            supertypes: OnceLock::new(),
            rust_type: self.rust_type,
        }));
        let linked = links(&class);
        fields.extend(linked.fields);
        supertypes.extend(linked.supertypes);
        let _ = class.0.supertypes.set(supertypes);
        if let ClassKind::Struct(shape) = &class.0.kind {
            let _ = shape.fields.set(fields);
        }
        classes::publish(class)
    }
}

/// Late-bound declarations for [`ClassDef::register_linked`].
#[derive(Default)]
pub struct ClassLinks {
    /// Additional generic supertypes
    pub supertypes: Vec<Type>,
    /// Additional fields
    pub fields: Vec<FieldDef>,
}

/// Builder for registering an enum class backed by Rust type `T`.
pub struct EnumDef<T> {
    name: String,
    constants: Vec<(EnumConstant, T)>,
}

impl<T> EnumDef<T>
where
    T: Payload + Clone + PartialEq + fmt::Debug,
{
    /// Start an enum class registration.
    pub fn new(name: &str) -> EnumDef<T> {
        EnumDef {
            name: name.to_owned(),
            constants: Vec::new(),
        }
    }

    /// Declare a constant.
    pub fn constant(mut self, name: &str, value: T) -> Self {
        self.constants.push((
            EnumConstant {
                name: name.to_owned(),
                json_name: None,
            },
            value,
        ));
        self
    }

    /// Declare a constant with a JSON-name override.
    pub fn constant_named(mut self, name: &str, json_name: &str, value: T) -> Self {
        self.constants.push((
            EnumConstant {
                name: name.to_owned(),
                json_name: Some(json_name.to_owned()),
            },
            value,
        ));
        self
    }

    /// Intern the enum class.
    pub fn register(self) -> ClassRef {
        let (constants, values): (Vec<EnumConstant>, Vec<T>) = self.constants.into_iter().unzip();
        let construct_values = values.clone();
        let shape = EnumShape {
            constants,
            construct: Arc::new(move |index| AnyValue::new(construct_values[index].clone())),
            index_of: Arc::new(move |value| {
                let instance = value.get::<T>()?;
                values.iter().position(|candidate| candidate == instance)
            }),
        };
        classes::publish(ClassRef(Arc::new(ClassInfo {
            name: self.name,
            kind: ClassKind::Enum(shape),
            type_params: Vec::new(),
            supertypes: OnceLock::new(),
            rust_type: Some(TypeId::of::<T>()),
        })))
    }
}

/// The interned class table.
pub mod classes {
    use super::*;

    struct ClassTable {
        by_name: HashMap<String, ClassRef>,
        by_rust_type: HashMap<TypeId, ClassRef>,
    }

    fn table() -> &'static RwLock<ClassTable> {
        static TABLE: OnceLock<RwLock<ClassTable>> = OnceLock::new();
        TABLE.get_or_init(|| {
            RwLock::new(ClassTable {
                by_name: HashMap::new(),
                by_rust_type: HashMap::new(),
            })
        })
    }

    /// Insert a fully wired class, or return the one already registered
    /// under its name. Classes are never visible half-initialized.
    pub(super) fn publish(class: ClassRef) -> ClassRef {
        let mut table = table().write().expect("class table poisoned");
        if let Some(existing) = table.by_name.get(class.name()) {
            return existing.clone();
        }
        table.by_name.insert(class.name().to_owned(), class.clone());
        if let Some(type_id) = class.rust_type() {
            table.by_rust_type.entry(type_id).or_insert_with(|| class.clone());
        }
        class
    }

    /// Look up a class by name.
    pub fn by_name(name: &str) -> Option<ClassRef> {
        ensure_builtins();
        table().read().expect("class table poisoned").by_name.get(name).cloned()
    }

    /// Look up the class registered for a Rust type.
    pub fn by_rust_type(type_id: TypeId) -> Option<ClassRef> {
        ensure_builtins();
        table()
            .read()
            .expect("class table poisoned")
            .by_rust_type
            .get(&type_id)
            .cloned()
    }

    fn builtin(name: &'static str, kind: ClassKind, rust_type: Option<TypeId>) -> ClassInfo {
        ClassInfo {
            name: name.to_owned(),
            kind,
            type_params: Vec::new(),
            supertypes: OnceLock::new(),
            rust_type,
        }
    }

    fn generic_builtin(
        name: &'static str,
        kind: ClassKind,
        type_params: Vec<&'static str>,
        rust_type: Option<TypeId>,
    ) -> ClassInfo {
        ClassInfo {
            name: name.to_owned(),
            kind,
            type_params,
            supertypes: OnceLock::new(),
            rust_type,
        }
    }

    macro_rules! builtin_accessor {
        ($fn_name:ident, $name:literal) => {
            #[doc = concat!("The built-in `", $name, "` class.")]
            pub fn $fn_name() -> ClassRef {
                ensure_builtins();
                table()
                    .read()
                    .expect("class table poisoned")
                    .by_name
                    .get($name)
                    .cloned()
                    .expect("builtins registered")
            }
        };
    }

    builtin_accessor!(object, "Object");
    builtin_accessor!(string, "String");
    builtin_accessor!(list, "List");
    builtin_accessor!(set, "Set");
    builtin_accessor!(collection, "Collection");
    builtin_accessor!(map, "Map");
    builtin_accessor!(array, "Array");

    fn ensure_builtins() {
        static ONCE: OnceLock<()> = OnceLock::new();
        ONCE.get_or_init(|| {
            use ScalarKind::*;
            let scalars: &[(&'static str, ScalarKind, TypeId)] = &[
                ("bool", Bool, TypeId::of::<bool>()),
                ("i8", I8, TypeId::of::<i8>()),
                ("i16", I16, TypeId::of::<i16>()),
                ("i32", I32, TypeId::of::<i32>()),
                ("i64", I64, TypeId::of::<i64>()),
                ("u8", U8, TypeId::of::<u8>()),
                ("u16", U16, TypeId::of::<u16>()),
                ("u32", U32, TypeId::of::<u32>()),
                ("f32", F32, TypeId::of::<f32>()),
                ("f64", F64, TypeId::of::<f64>()),
                ("char", Char, TypeId::of::<char>()),
            ];
            for (name, kind, type_id) in scalars {
                publish(ClassRef(Arc::new(builtin(
                    name,
                    ClassKind::Scalar(*kind),
                    Some(*type_id),
                ))));
            }
            publish(ClassRef(Arc::new(builtin(
                "String",
                ClassKind::Str,
                Some(TypeId::of::<String>()),
            ))));
            publish(ClassRef(Arc::new(builtin(
                "Object",
                ClassKind::Object,
                Some(TypeId::of::<JsonValue>()),
            ))));
            publish(ClassRef(Arc::new(builtin("Array", ClassKind::Array, None))));

            // Generic container classes: List<E> and Set<E> extend
            // Collection<E>; Map<K, V> stands alone.
            let collection = publish(ClassRef(Arc::new(generic_builtin(
                "Collection",
                ClassKind::Collection,
                vec!["E"],
                None,
            ))));
            let list = ClassRef(Arc::new(generic_builtin(
                "List",
                ClassKind::List,
                vec!["E"],
                Some(TypeId::of::<Vec<AnyValue>>()),
            )));
            let element = Type::variable("E", list.clone());
            let _ = list.0.supertypes.set(vec![collection.of(vec![element])]);
            publish(list);

            let set = ClassRef(Arc::new(generic_builtin(
                "Set",
                ClassKind::Set,
                vec!["E"],
                Some(TypeId::of::<JsonSet>()),
            )));
            let element = Type::variable("E", set.clone());
            let _ = set.0.supertypes.set(vec![collection.of(vec![element])]);
            publish(set);

            publish(ClassRef(Arc::new(generic_builtin(
                "Map",
                ClassKind::Map,
                vec!["K", "V"],
                Some(TypeId::of::<JsonMap>()),
            ))));
        });
    }
}

/// Mapping from Rust types to descriptors.
pub trait TypeOf: 'static {
    /// The descriptor for this Rust type.
    fn type_of() -> Type;
}

macro_rules! scalar_type_of {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl TypeOf for $ty {
                fn type_of() -> Type {
                    classes::by_name($name).expect("builtin class").ty()
                }
            }
        )*
    };
}

scalar_type_of!(
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    f32 => "f32",
    f64 => "f64",
    char => "char",
    String => "String",
);

impl TypeOf for JsonValue {
    fn type_of() -> Type {
        classes::object().ty()
    }
}

impl<T: TypeOf> TypeOf for Vec<T> {
    fn type_of() -> Type {
        classes::list().of(vec![T::type_of()])
    }
}

impl<T: TypeOf> TypeOf for Box<[T]> {
    fn type_of() -> Type {
        Type::array_of(T::type_of())
    }
}

impl<T: TypeOf> TypeOf for std::collections::HashSet<T> {
    fn type_of() -> Type {
        classes::set().of(vec![T::type_of()])
    }
}

impl<T: TypeOf> TypeOf for std::collections::BTreeSet<T> {
    fn type_of() -> Type {
        classes::set().of(vec![T::type_of()])
    }
}

impl<T: TypeOf> TypeOf for indexmap::IndexMap<String, T> {
    fn type_of() -> Type {
        classes::map().of(vec![classes::string().ty(), T::type_of()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        let a = classes::list().of(vec![Type::of::<String>()]);
        let b = Type::of::<Vec<String>>();
        assert_eq!(a, b);
        assert_ne!(a, Type::of::<Vec<i64>>());
    }

    #[test]
    fn canonicalize_collapses_concrete_wildcards() {
        let wild = Type::subtype_of(Type::of::<String>());
        assert_eq!(canonicalize(&wild), Type::of::<String>());

        let unbounded = Type::Wildcard {
            upper: Vec::new(),
            lower: Vec::new(),
        };
        assert!(matches!(canonicalize(&unbounded), Type::Wildcard { .. }));
    }

    #[test]
    fn collection_element_resolves_through_supertype() {
        let ty = Type::of::<Vec<String>>();
        assert_eq!(collection_element_type(&ty), Type::of::<String>());
    }

    #[test]
    fn map_types_resolve() {
        let ty = Type::of::<indexmap::IndexMap<String, i64>>();
        let (k, v) = map_key_value_types(&ty);
        assert_eq!(k, Type::of::<String>());
        assert_eq!(v, Type::of::<i64>());
    }

    #[test]
    fn variables_compare_by_declaration() {
        let list = classes::list();
        let collection = classes::collection();
        let a = Type::variable("E", list.clone());
        let b = Type::variable("E", list);
        let c = Type::variable("E", collection);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn resolve_substitutes_through_chain() {
        // Holder<T> with a field of type List<T>, instantiated at i64.
        let holder = ClassDef::record("test::Holder")
            .type_params(&["T"])
            .register();
        let variable = Type::variable("T", holder.clone());
        let field_ty = classes::list().of(vec![variable]);
        let context = holder.of(vec![Type::of::<i64>()]);
        let resolved = resolve(&context, &holder, &field_ty);
        assert_eq!(resolved, Type::of::<Vec<i64>>());
    }
}

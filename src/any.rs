//! The erased value plane adapters exchange.
//!
//! Adapters are stored and dispatched by type *descriptor*, not by static
//! type, so the values flowing through them are erased: an [`AnyValue`] is
//! a nullable box of any payload that can be cloned, compared, and
//! printed. [`FromAny`] and [`IntoAny`] bridge the plane back to concrete
//! Rust types at the edges (field accessors, typed reads).

use core::any::{Any, TypeId};
use core::fmt;

use indexmap::IndexMap;

use crate::error::{JsonError, JsonErrorKind, Result};
use crate::types::ClassRef;
use crate::value::JsonValue;

/// Object-safe bundle of the capabilities every payload must have.
pub trait Payload: Any + Send + Sync {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Boxed upcast, for by-value downcasting.
    fn into_boxed_any(self: Box<Self>) -> Box<dyn Any>;
    /// Clone behind the trait object.
    fn clone_payload(&self) -> Box<dyn Payload>;
    /// Compare behind the trait object; false across differing types.
    fn eq_payload(&self, other: &dyn Payload) -> bool;
    /// Debug-format behind the trait object.
    fn fmt_payload(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> Payload for T
where
    T: Any + Clone + PartialEq + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_boxed_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_payload(&self) -> Box<dyn Payload> {
        Box::new(self.clone())
    }

    fn eq_payload(&self, other: &dyn Payload) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn fmt_payload(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A nullable erased value.
pub struct AnyValue(Option<Box<dyn Payload>>);

impl AnyValue {
    /// The null value.
    pub const fn null() -> Self {
        AnyValue(None)
    }

    /// Box a payload.
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Clone + PartialEq + fmt::Debug + Send + Sync,
    {
        AnyValue(Some(Box::new(value)))
    }

    /// True for the null value.
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The payload's runtime type, when non-null.
    pub fn payload_type_id(&self) -> Option<TypeId> {
        self.0.as_deref().map(|p| p.as_any().type_id())
    }

    /// Borrow the payload as `T`.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|p| p.as_any().downcast_ref())
    }

    /// Mutably borrow the payload as `T`.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut().and_then(|p| p.as_any_mut().downcast_mut())
    }

    /// Take the payload as `T`, or hand the value back unchanged.
    pub fn take<T: 'static>(self) -> core::result::Result<T, AnyValue> {
        match self.0 {
            Some(payload) if payload.as_any().type_id() == TypeId::of::<T>() => {
                match payload.into_boxed_any().downcast::<T>() {
                    Ok(value) => Ok(*value),
                    Err(_) => Err(AnyValue(None)),
                }
            }
            other => Err(AnyValue(other)),
        }
    }
}

impl Clone for AnyValue {
    fn clone(&self) -> Self {
        AnyValue(self.0.as_deref().map(Payload::clone_payload))
    }
}

impl PartialEq for AnyValue {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_payload(b.as_ref()),
            _ => false,
        }
    }
}

impl fmt::Debug for AnyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("null"),
            Some(payload) => payload.fmt_payload(f),
        }
    }
}

/// Sequence payload with order-insensitive equality, produced by set
/// adapters.
#[derive(Debug, Clone, Default)]
pub struct JsonSet(pub Vec<AnyValue>);

impl PartialEq for JsonSet {
    fn eq(&self, other: &Self) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }
        // Bag equality; payloads are not hashable, so this is quadratic.
        let mut unmatched: Vec<&AnyValue> = other.0.iter().collect();
        for item in &self.0 {
            match unmatched.iter().position(|candidate| *candidate == item) {
                Some(i) => {
                    unmatched.swap_remove(i);
                }
                None => return false,
            }
        }
        true
    }
}

/// Insertion-ordered map payload with arbitrary keys, produced by map
/// adapters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonMap {
    entries: Vec<(AnyValue, AnyValue)>,
}

impl JsonMap {
    /// An empty map.
    pub fn new() -> Self {
        JsonMap::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value stored under `key`, if any.
    pub fn get(&self, key: &AnyValue) -> Option<&AnyValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Append an entry. The caller is responsible for duplicate detection
    /// (via [`get`](Self::get)) beforehand.
    pub fn insert(&mut self, key: AnyValue, value: AnyValue) {
        self.entries.push((key, value));
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(AnyValue, AnyValue)> {
        self.entries.iter()
    }
}

/// A dynamic instance of a registered class: field values keyed by
/// declared name. Used by classes without a Rust constructor (generic
/// shapes, synthesized-defaults construction).
#[derive(Debug, Clone)]
pub struct Record {
    class: ClassRef,
    values: IndexMap<String, AnyValue>,
}

impl Record {
    /// An empty instance of `class`.
    pub fn new(class: ClassRef) -> Self {
        Record {
            class,
            values: IndexMap::new(),
        }
    }

    /// The class this record instantiates.
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// The field value, null when unset.
    pub fn get(&self, field: &str) -> AnyValue {
        self.values.get(field).cloned().unwrap_or(AnyValue::null())
    }

    /// Set a field value.
    pub fn set(&mut self, field: &str, value: AnyValue) {
        self.values.insert(field.to_owned(), value);
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.values == other.values
    }
}

/// Convert a concrete Rust value into the erased plane.
pub trait IntoAny {
    /// Perform the conversion.
    fn into_any(self) -> AnyValue;
}

/// Convert an erased value back into a concrete Rust type.
pub trait FromAny: Sized {
    /// Perform the conversion, failing with a data error on a null or
    /// foreign payload.
    fn from_any(value: AnyValue) -> Result<Self>;
}

fn unexpected_payload(target: &'static str) -> JsonError {
    JsonError::invalid_value(format!("payload cannot be converted to {target}"))
}

fn null_payload(target: &'static str) -> JsonError {
    JsonError::new(JsonErrorKind::UnexpectedNull {
        target: target.to_owned(),
    })
}

macro_rules! direct_any {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoAny for $ty {
                fn into_any(self) -> AnyValue {
                    AnyValue::new(self)
                }
            }

            impl FromAny for $ty {
                fn from_any(value: AnyValue) -> Result<Self> {
                    if value.is_null() {
                        return Err(null_payload(stringify!($ty)));
                    }
                    value
                        .take::<$ty>()
                        .map_err(|_| unexpected_payload(stringify!($ty)))
                }
            }
        )*
    };
}

direct_any!(
    bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, char, String, JsonValue, JsonSet, JsonMap,
    Record
);

impl IntoAny for &str {
    fn into_any(self) -> AnyValue {
        AnyValue::new(self.to_owned())
    }
}

impl<T: IntoAny> IntoAny for Option<T> {
    fn into_any(self) -> AnyValue {
        match self {
            Some(value) => value.into_any(),
            None => AnyValue::null(),
        }
    }
}

impl<T: FromAny> FromAny for Option<T> {
    fn from_any(value: AnyValue) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_any(value).map(Some)
        }
    }
}

impl<T: IntoAny> IntoAny for Vec<T> {
    fn into_any(self) -> AnyValue {
        AnyValue::new(
            self.into_iter()
                .map(IntoAny::into_any)
                .collect::<Vec<AnyValue>>(),
        )
    }
}

impl<T: FromAny> FromAny for Vec<T> {
    fn from_any(value: AnyValue) -> Result<Self> {
        if value.is_null() {
            return Err(null_payload("a sequence"));
        }
        let items = value
            .take::<Vec<AnyValue>>()
            .map_err(|_| unexpected_payload("a sequence"))?;
        items.into_iter().map(T::from_any).collect()
    }
}

impl<T: IntoAny> IntoAny for Box<[T]> {
    fn into_any(self) -> AnyValue {
        self.into_vec().into_any()
    }
}

impl<T: FromAny> FromAny for Box<[T]> {
    fn from_any(value: AnyValue) -> Result<Self> {
        Vec::<T>::from_any(value).map(Vec::into_boxed_slice)
    }
}

impl<T: IntoAny> IntoAny for std::collections::HashSet<T> {
    fn into_any(self) -> AnyValue {
        AnyValue::new(JsonSet(self.into_iter().map(IntoAny::into_any).collect()))
    }
}

impl<T: FromAny + Eq + std::hash::Hash> FromAny for std::collections::HashSet<T> {
    fn from_any(value: AnyValue) -> Result<Self> {
        if value.is_null() {
            return Err(null_payload("a set"));
        }
        let set = value
            .take::<JsonSet>()
            .map_err(|_| unexpected_payload("a set"))?;
        set.0.into_iter().map(T::from_any).collect()
    }
}

impl<T: IntoAny> IntoAny for std::collections::BTreeSet<T> {
    fn into_any(self) -> AnyValue {
        AnyValue::new(JsonSet(self.into_iter().map(IntoAny::into_any).collect()))
    }
}

impl<T: FromAny + Ord> FromAny for std::collections::BTreeSet<T> {
    fn from_any(value: AnyValue) -> Result<Self> {
        if value.is_null() {
            return Err(null_payload("a set"));
        }
        let set = value
            .take::<JsonSet>()
            .map_err(|_| unexpected_payload("a set"))?;
        set.0.into_iter().map(T::from_any).collect()
    }
}

impl<T: IntoAny> IntoAny for IndexMap<String, T> {
    fn into_any(self) -> AnyValue {
        let mut map = JsonMap::new();
        for (key, value) in self {
            map.insert(AnyValue::new(key), value.into_any());
        }
        AnyValue::new(map)
    }
}

impl<T: FromAny> FromAny for IndexMap<String, T> {
    fn from_any(value: AnyValue) -> Result<Self> {
        if value.is_null() {
            return Err(null_payload("a map"));
        }
        let map = value
            .take::<JsonMap>()
            .map_err(|_| unexpected_payload("a map"))?;
        let mut out = IndexMap::new();
        for (key, entry) in map.entries {
            let key = String::from_any(key)?;
            out.insert(key, T::from_any(entry)?);
        }
        Ok(out)
    }
}

/// Implement [`IntoAny`] and [`FromAny`] for user types by direct boxing,
/// the way a derive would.
#[macro_export]
macro_rules! any_bridge {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::IntoAny for $ty {
                fn into_any(self) -> $crate::AnyValue {
                    $crate::AnyValue::new(self)
                }
            }

            impl $crate::FromAny for $ty {
                fn from_any(value: $crate::AnyValue) -> $crate::Result<Self> {
                    value.take::<$ty>().map_err(|value| {
                        $crate::JsonError::invalid_value(format!(
                            "{value:?} cannot be converted to {}",
                            stringify!($ty),
                        ))
                    })
                }
            }
        )*
    };
}

impl IntoAny for AnyValue {
    fn into_any(self) -> AnyValue {
        self
    }
}

impl FromAny for AnyValue {
    fn from_any(value: AnyValue) -> Result<Self> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_typed() {
        assert_eq!(AnyValue::new(3i64), AnyValue::new(3i64));
        assert_ne!(AnyValue::new(3i64), AnyValue::new(3i32));
        assert_ne!(AnyValue::new(3i64), AnyValue::null());
        assert_eq!(AnyValue::null(), AnyValue::null());
    }

    #[test]
    fn sequences_round_trip() {
        let v = vec![1i64, 2, 3];
        let erased = v.clone().into_any();
        assert_eq!(Vec::<i64>::from_any(erased).unwrap(), v);
    }

    #[test]
    fn sets_compare_unordered() {
        let a = JsonSet(vec![AnyValue::new(1i64), AnyValue::new(2i64)]);
        let b = JsonSet(vec![AnyValue::new(2i64), AnyValue::new(1i64)]);
        assert_eq!(a, b);
    }

    #[test]
    fn options_map_null() {
        assert!(Option::<i64>::from_any(AnyValue::null()).unwrap().is_none());
        assert_eq!(None::<i64>.into_any(), AnyValue::null());
    }
}

//! The variant value.
//!
//! A [`Value`] is a handle over a reference-counted cell. Cloning a `Value`
//! bumps the count. Arrays and strings are detached on the first write
//! after a clone (`Rc::make_mut`), so a copy can never observe mutation made
//! through another handle. Objects, resources and callables have handle
//! semantics: clones point at the same instance.
//!
//! The one deliberate alias is a reference cell, created with
//! [`Value::reference`]. Every handle to a reference reads and writes the same
//! slot; this is how by-reference arguments reach native code.
//!
//! ```
//! use phpbridge_core::Value;
//!
//! let mut a = Value::array();
//! a.set(0, "val0").unwrap();
//! let mut b = a.clone();
//! b.set(1, "val1").unwrap();
//! assert_eq!(a.size(), 1);
//! assert_eq!(b.size(), 2);
//! ```

mod arith;
mod compare;
mod convert;

pub use convert::FromValue;
pub(crate) use convert::PrecisionScope;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::array::{ArrayKey, HashTable};
use crate::callable::Callable;
use crate::cursor::ValueIterator;
use crate::engine::std_class;
use crate::entries::ClassEntry;
use crate::error::ValueError;
use crate::object::{Object, Resource};
use crate::types::Type;

/// Storage of a [`Value`].
#[derive(Clone, Default)]
pub(crate) enum Zval {
    #[default]
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(Rc<[u8]>),
    Array(Rc<HashTable>),
    Object(Rc<Object>),
    Resource(Rc<Resource>),
    Callable(Rc<Callable>),
    Reference(Rc<RefCell<Value>>),
}

/// A scripting-language value.
#[derive(Clone, Default)]
pub struct Value {
    pub(crate) zval: Zval,
}

/// A value seen through an optional reference cell.
pub(crate) enum Resolved<'a> {
    Plain(&'a Value),
    Alias(Ref<'a, Value>),
}

impl std::ops::Deref for Resolved<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            Resolved::Plain(value) => value,
            Resolved::Alias(value) => value,
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Value {
    pub fn null() -> Self {
        Self::default()
    }

    /// An empty array.
    pub fn array() -> Self {
        Self::from_table(HashTable::new())
    }

    pub fn from_table(table: HashTable) -> Self {
        Self {
            zval: Zval::Array(Rc::new(table)),
        }
    }

    /// A binary string.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self {
            zval: Zval::String(Rc::from(bytes.as_ref())),
        }
    }

    /// A new `stdClass` instance.
    pub fn object() -> Self {
        Self::from_object(Object::new(std_class(), None))
    }

    pub fn from_object(object: Rc<Object>) -> Self {
        Self {
            zval: Zval::Object(object),
        }
    }

    pub fn callable(callable: Callable) -> Self {
        Self {
            zval: Zval::Callable(Rc::new(callable)),
        }
    }

    pub fn resource(resource: Resource) -> Self {
        Self {
            zval: Zval::Resource(Rc::new(resource)),
        }
    }

    /// Default value of a type: `0`, `0.0`, `false`, `""`, an empty array or
    /// a `stdClass` object. Resources and callables have no default.
    pub fn with_type(ty: Type) -> Result<Self, ValueError> {
        Ok(match ty {
            Type::Null => Value::null(),
            Type::Numeric => Value::from(0),
            Type::Float => Value::from(0.0),
            Type::Bool => Value::from(false),
            Type::String => Value::from(""),
            Type::Array => Value::array(),
            Type::Object => Value::object(),
            Type::Resource | Type::Callable => {
                return Err(ValueError::Conversion {
                    from: Type::Null,
                    to: ty,
                });
            }
        })
    }

    pub(crate) fn resolve(&self) -> Resolved<'_> {
        match &self.zval {
            Zval::Reference(cell) => Resolved::Alias(cell.borrow()),
            _ => Resolved::Plain(self),
        }
    }
}

// ============================================================================
// Type inspection
// ============================================================================

impl Value {
    /// The discriminant. References report the type of the aliased value.
    pub fn value_type(&self) -> Type {
        match &self.resolve().zval {
            Zval::Null => Type::Null,
            Zval::Bool(_) => Type::Bool,
            Zval::Long(_) => Type::Numeric,
            Zval::Double(_) => Type::Float,
            Zval::String(_) => Type::String,
            Zval::Array(_) => Type::Array,
            Zval::Object(_) => Type::Object,
            Zval::Resource(_) => Type::Resource,
            Zval::Callable(_) => Type::Callable,
            Zval::Reference(_) => Type::Null,
        }
    }

    /// Host-facing type name used in error messages (`int`, `string`, or
    /// the class name for objects).
    pub fn type_name(&self) -> String {
        match &self.resolve().zval {
            Zval::Object(object) => object.class_name().to_string(),
            _ => self.value_type().name().to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value_type() == Type::Null
    }

    pub fn is_bool(&self) -> bool {
        self.value_type() == Type::Bool
    }

    /// Integer type. See [`is_numeric_like`](Self::is_numeric_like) for the
    /// host's "numeric string" test.
    pub fn is_numeric(&self) -> bool {
        self.value_type() == Type::Numeric
    }

    pub fn is_float(&self) -> bool {
        self.value_type() == Type::Float
    }

    pub fn is_string(&self) -> bool {
        self.value_type() == Type::String
    }

    pub fn is_array(&self) -> bool {
        self.value_type() == Type::Array
    }

    pub fn is_object(&self) -> bool {
        self.value_type() == Type::Object
    }

    pub fn is_resource(&self) -> bool {
        self.value_type() == Type::Resource
    }

    pub fn is_scalar(&self) -> bool {
        self.value_type().is_scalar()
    }

    pub fn is_true(&self) -> bool {
        matches!(self.resolve().zval, Zval::Bool(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self.resolve().zval, Zval::Bool(false))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.zval, Zval::Reference(_))
    }

    /// Integers, floats and numeric strings.
    pub fn is_numeric_like(&self) -> bool {
        match &self.resolve().zval {
            Zval::Long(_) | Zval::Double(_) => true,
            Zval::String(bytes) => crate::numeric::is_numeric(bytes),
            _ => false,
        }
    }

    /// Structural callable test that needs no engine lookup: closures,
    /// `[object, "method"]` pairs naming an existing method, and invokable
    /// objects. Function names and static-method strings need
    /// [`Request::is_callable`](crate::Request::is_callable).
    pub fn is_callable(&self) -> bool {
        match &self.resolve().zval {
            Zval::Callable(_) => true,
            Zval::Object(object) => object.class().find_method("__invoke").is_some(),
            Zval::Array(table) => {
                if table.len() != 2 {
                    return false;
                }
                let (Some(target), Some(method)) =
                    (table.get(&ArrayKey::Int(0)), table.get(&ArrayKey::Int(1)))
                else {
                    return false;
                };
                match (target.object_ref(), method.is_string()) {
                    (Some(object), true) => object
                        .class()
                        .find_method(&method.string_value())
                        .is_some(),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

impl Value {
    /// Number of elements: array count, string byte length, object
    /// `Countable` result or visible property count. Other types report 0.
    pub fn size(&self) -> usize {
        match &self.resolve().zval {
            Zval::Array(table) => table.len(),
            Zval::String(bytes) => bytes.len(),
            Zval::Object(object) => object.count(),
            _ => 0,
        }
    }

    /// Alias of [`size`](Self::size).
    pub fn count(&self) -> usize {
        self.size()
    }

    /// Snapshot of the array table (shared, not copied).
    pub fn table(&self) -> Option<Rc<HashTable>> {
        match &self.resolve().zval {
            Zval::Array(table) => Some(Rc::clone(table)),
            _ => None,
        }
    }

    /// The object handle, if this is an object.
    pub fn object_ref(&self) -> Option<Rc<Object>> {
        match &self.resolve().zval {
            Zval::Object(object) => Some(Rc::clone(object)),
            _ => None,
        }
    }

    pub fn callable_ref(&self) -> Option<Rc<Callable>> {
        match &self.resolve().zval {
            Zval::Callable(callable) => Some(Rc::clone(callable)),
            _ => None,
        }
    }

    pub fn resource_ref(&self) -> Option<Rc<Resource>> {
        match &self.resolve().zval {
            Zval::Resource(resource) => Some(Rc::clone(resource)),
            _ => None,
        }
    }

    /// Whether the key exists. Objects check public properties or their
    /// `ArrayAccess` capability.
    pub fn contains(&self, key: impl Into<ArrayKey>) -> bool {
        let key = key.into();
        match &self.resolve().zval {
            Zval::Array(table) => table.contains_key(&key),
            Zval::Object(object) => object.has_dimension(&key),
            _ => false,
        }
    }

    /// Element or property at `key`; null when missing.
    pub fn get(&self, key: impl Into<ArrayKey>) -> Value {
        let key = key.into();
        match &self.resolve().zval {
            Zval::Array(table) => table.get(&key).cloned().unwrap_or_default(),
            Zval::Object(object) => object.read_dimension(&key),
            _ => Value::null(),
        }
    }

    /// Store `value` at `key`. A null value becomes an array first.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn set(
        &mut self,
        key: impl Into<ArrayKey>,
        value: impl Into<Value>,
    ) -> Result<(), ValueError> {
        let key = key.into();
        let value = value.into().dereferenced();
        self.modify(|target| target.write_dimension(Some(key), value))
    }

    /// Append with the next free integer key (`$a[] = $value`).
    pub fn push(&mut self, value: impl Into<Value>) -> Result<(), ValueError> {
        let value = value.into().dereferenced();
        self.modify(|target| target.write_dimension(None, value))
    }

    /// Remove `key`. Missing keys and non-containers are ignored.
    pub fn unset(&mut self, key: impl Into<ArrayKey>) {
        let key = key.into();
        self.modify(|target| match &mut target.zval {
            Zval::Array(table) => {
                if table.contains_key(&key) {
                    Rc::make_mut(table).remove(&key);
                }
            }
            Zval::Object(object) => object.unset_dimension(&key),
            _ => {}
        });
    }

    /// Mutable slot at `key`, inserting null when missing. A null value is
    /// turned into an empty array first, so chained calls build nested
    /// arrays the way `$a["x"]["y"] = 1` does on an unset variable.
    ///
    /// Reference cells cannot hand out a plain `&mut`; use
    /// [`modify`](Self::modify) to reach through them.
    pub fn entry(&mut self, key: impl Into<ArrayKey>) -> Result<&mut Value, ValueError> {
        if matches!(self.zval, Zval::Null) {
            self.zval = Zval::Array(Rc::default());
        }
        match &mut self.zval {
            Zval::Array(table) => Ok(Rc::make_mut(table).entry_or_null(key.into())),
            other => Err(ValueError::ScalarAsArray(zval_type(other))),
        }
    }

    /// Run `f` on the value this handle designates: the aliased slot for a
    /// reference, the value itself otherwise.
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut Value) -> R) -> R {
        if let Zval::Reference(cell) = &self.zval {
            let cell = Rc::clone(cell);
            let mut slot = cell.borrow_mut();
            return f(&mut slot);
        }
        f(self)
    }

    fn write_dimension(&mut self, key: Option<ArrayKey>, value: Value) -> Result<(), ValueError> {
        if matches!(self.zval, Zval::Null) {
            self.zval = Zval::Array(Rc::default());
        }
        match &mut self.zval {
            Zval::Array(table) => {
                let table = Rc::make_mut(table);
                match key {
                    Some(key) => {
                        table.insert(key, value);
                    }
                    None => {
                        table.push(value)?;
                    }
                }
                Ok(())
            }
            Zval::Object(object) => object.write_dimension(key, value),
            other => Err(ValueError::ScalarAsArray(zval_type(other))),
        }
    }

    /// Keys in iteration order.
    pub fn keys(&self) -> Vec<Value> {
        self.entries()
            .into_iter()
            .map(|(key, _)| key.to_value())
            .collect()
    }

    /// Values in iteration order.
    pub fn values(&self) -> Vec<Value> {
        self.entries().into_iter().map(|(_, value)| value).collect()
    }

    /// Key/value pairs of an array or of an object's public properties.
    pub fn entries(&self) -> Vec<(ArrayKey, Value)> {
        self.iter()
            .filter_map(|(key, value)| key.to_array_key().ok().map(|key| (key, value)))
            .collect()
    }

    /// Snapshot of the entries keyed by their string form.
    pub fn map_value(&self) -> BTreeMap<String, Value> {
        self.entries()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    /// Cursor over an array, or over an object's properties as seen from
    /// global scope. Scope-aware and iterator-protocol traversal go through
    /// [`Request::iterate`](crate::Request::iterate).
    pub fn iter(&self) -> ValueIterator {
        match &self.resolve().zval {
            Zval::Array(table) => ValueIterator::hash(Rc::clone(table)),
            Zval::Object(object) => ValueIterator::visible(object, None),
            _ => ValueIterator::empty(),
        }
    }
}

// ============================================================================
// Objects
// ============================================================================

impl Value {
    /// Class name of an object.
    pub fn class_name(&self) -> Option<String> {
        self.object_ref()
            .map(|object| object.class_name().to_string())
    }

    /// The object's class entry.
    pub fn class_entry(&self) -> Option<Rc<ClassEntry>> {
        self.object_ref().map(|object| Rc::clone(object.class()))
    }

    /// Whether this object is an instance of `class` (the class itself, a
    /// parent, or an implemented interface).
    pub fn instance_of(&self, class: &str) -> bool {
        self.object_ref()
            .is_some_and(|object| object.class().is_subclass_of(class))
    }

    /// Like [`instance_of`](Self::instance_of) but excluding the class itself.
    pub fn derived_from(&self, class: &str) -> bool {
        self.object_ref().is_some_and(|object| {
            !object.class().name_is(class) && object.class().is_subclass_of(class)
        })
    }

    /// Borrow the native backing of an object.
    ///
    /// Reference cells cannot lend out their contents; dereference first or
    /// use [`with_native`](Self::with_native).
    pub fn implementation<T: 'static>(&self) -> Result<Ref<'_, T>, ValueError> {
        match &self.zval {
            Zval::Object(object) => object.native::<T>(),
            _ => Err(ValueError::NotAnObject(self.value_type())),
        }
    }

    /// Mutably borrow the native backing. A second mutable borrow while the
    /// first is alive fails with [`ValueError::Busy`].
    pub fn implementation_mut<T: 'static>(&self) -> Result<RefMut<'_, T>, ValueError> {
        match &self.zval {
            Zval::Object(object) => object.native_mut::<T>(),
            _ => Err(ValueError::NotAnObject(self.value_type())),
        }
    }

    /// Run `f` on the native backing object.
    pub fn with_native<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ValueError> {
        let object = self
            .object_ref()
            .ok_or_else(|| ValueError::NotAnObject(self.value_type()))?;
        let native = object.native::<T>()?;
        Ok(f(&native))
    }

    /// Run `f` on the mutably borrowed native backing object.
    pub fn with_native_mut<T: 'static, R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, ValueError> {
        let object = self
            .object_ref()
            .ok_or_else(|| ValueError::NotAnObject(self.value_type()))?;
        let mut native = object.native_mut::<T>()?;
        Ok(f(&mut native))
    }

    /// Property of an object as its own class sees it; null when missing.
    pub fn property(&self, name: &str) -> Value {
        self.object_ref()
            .and_then(|object| object.read_own_property(name))
            .unwrap_or_default()
    }

    /// Set a property of an object from inside its own class, so declared
    /// protected and private slots are updated rather than shadowed.
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> Result<(), ValueError> {
        let object = self
            .object_ref()
            .ok_or_else(|| ValueError::NotAnObject(self.value_type()))?;
        object.write_own_property(name, value.into().dereferenced())
    }
}

// ============================================================================
// References
// ============================================================================

impl Value {
    /// Turn this value into a reference cell (if it is not one already) and
    /// return another handle to the same cell.
    ///
    /// ```
    /// use phpbridge_core::Value;
    ///
    /// let mut counter = Value::from(1);
    /// let mut alias = counter.reference();
    /// alias.assign(2);
    /// assert_eq!(counter, 2);
    /// ```
    pub fn reference(&mut self) -> Value {
        if !self.is_reference() {
            let current = std::mem::take(self);
            self.zval = Zval::Reference(Rc::new(RefCell::new(current)));
        }
        self.clone()
    }

    /// Copy of the designated value, detached from any reference cell.
    pub fn dereferenced(&self) -> Value {
        match &self.zval {
            Zval::Reference(cell) => cell.borrow().clone(),
            _ => self.clone(),
        }
    }

    /// Replace the designated value, writing through a reference cell.
    pub fn assign(&mut self, value: impl Into<Value>) {
        let value = value.into().dereferenced();
        self.modify(|slot| *slot = value);
    }

    /// Whether two handles share the same reference cell or object.
    pub fn same_cell(&self, other: &Value) -> bool {
        match (&self.zval, &other.zval) {
            (Zval::Reference(a), Zval::Reference(b)) => Rc::ptr_eq(a, b),
            (Zval::Object(a), Zval::Object(b)) => Rc::ptr_eq(a, b),
            (Zval::Array(a), Zval::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

pub(crate) fn zval_type(zval: &Zval) -> Type {
    match zval {
        Zval::Null | Zval::Reference(_) => Type::Null,
        Zval::Bool(_) => Type::Bool,
        Zval::Long(_) => Type::Numeric,
        Zval::Double(_) => Type::Float,
        Zval::String(_) => Type::String,
        Zval::Array(_) => Type::Array,
        Zval::Object(_) => Type::Object,
        Zval::Resource(_) => Type::Resource,
        Zval::Callable(_) => Type::Callable,
    }
}

// ============================================================================
// From implementations
// ============================================================================

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::null()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self {
            zval: Zval::Bool(value),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self { zval: Zval::Long(value as i64) }
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, isize);

// Values above i64::MAX do not fit the integer type and become floats.
macro_rules! impl_from_wide_uint {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    match i64::try_from(value) {
                        Ok(v) => Self { zval: Zval::Long(v) },
                        Err(_) => Self { zval: Zval::Double(value as f64) },
                    }
                }
            }
        )*
    };
}

impl_from_wide_uint!(u64, usize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self {
            zval: Zval::Double(value),
        }
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self {
            zval: Zval::Double(value as f64),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self {
            zval: Zval::String(Rc::from(value.as_bytes())),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self {
            zval: Zval::String(Rc::from(value.into_bytes())),
        }
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::from(value.as_str())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self {
            zval: Zval::String(Rc::from(value)),
        }
    }
}

impl From<HashTable> for Value {
    fn from(table: HashTable) -> Self {
        Value::from_table(table)
    }
}

impl From<Callable> for Value {
    fn from(callable: Callable) -> Self {
        Value::callable(callable)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        let mut table = HashTable::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            table.insert(ArrayKey::from(index), item.into());
        }
        Value::from_table(table)
    }
}

impl<K: Into<ArrayKey>, V: Into<Value>, S> From<HashMap<K, V, S>> for Value {
    fn from(map: HashMap<K, V, S>) -> Self {
        Value::from_table(map.into_iter().collect())
    }
}

impl<K: Into<ArrayKey>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(map: BTreeMap<K, V>) -> Self {
        Value::from_table(map.into_iter().collect())
    }
}

impl<K: Into<ArrayKey>, V: Into<Value>, S> From<IndexMap<K, V, S>> for Value {
    fn from(map: IndexMap<K, V, S>) -> Self {
        map.into_iter().collect()
    }
}

impl<K: Into<ArrayKey>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::from_table(iter.into_iter().collect())
    }
}

// ============================================================================
// Formatting
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_value())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.zval {
            Zval::Null => write!(f, "NULL"),
            Zval::Bool(v) => write!(f, "bool({v})"),
            Zval::Long(v) => write!(f, "int({v})"),
            Zval::Double(v) => write!(f, "float({})", crate::numeric::format_double(*v, 17)),
            Zval::String(bytes) => write!(f, "string({:?})", String::from_utf8_lossy(bytes)),
            Zval::Array(table) => write!(f, "array{table:?}"),
            Zval::Object(object) => {
                write!(f, "object({})#{}", object.class_name(), object.handle())?;
                write!(f, "{:?}", object.properties())
            }
            Zval::Resource(resource) => {
                let (id, kind) = (resource.id(), resource.kind());
                write!(f, "resource({id}) of type ({kind})")
            }
            Zval::Callable(callable) => write!(f, "callable({callable:?})"),
            Zval::Reference(cell) => write!(f, "&{:?}", cell.borrow()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Copy-on-write
    // ========================================================================

    #[test]
    fn copy_then_mutate_leaves_original() {
        let mut original = Value::array();
        original.set("a", 1).unwrap();
        let mut copy = original.clone();
        copy.set("a", 2).unwrap();
        copy.set("b", 3).unwrap();
        assert_eq!(original.get("a"), 1);
        assert!(!original.contains("b"));
        assert_eq!(copy.get("a"), 2);
    }

    #[test]
    fn nested_arrays_detach_independently() {
        let mut outer = Value::array();
        outer.entry("inner").unwrap().set(0, "x").unwrap();
        let snapshot = outer.clone();
        outer.entry("inner").unwrap().set(0, "y").unwrap();
        assert_eq!(snapshot.get("inner").get(0), "x");
        assert_eq!(outer.get("inner").get(0), "y");
    }

    #[test]
    fn clone_shares_until_write() {
        let mut a = Value::array();
        a.push(1).unwrap();
        let b = a.clone();
        assert!(a.same_cell(&b));
        a.push(2).unwrap();
        assert!(!a.same_cell(&b));
    }

    // ========================================================================
    // Auto-vivification
    // ========================================================================

    #[test]
    fn indexing_null_creates_array() {
        let mut value = Value::null();
        *value.entry("x").unwrap() = Value::from(1);
        assert!(value.is_array());
        assert_eq!(value.size(), 1);

        let mut nested = Value::null();
        nested.entry("a").unwrap().entry("b").unwrap().assign(5);
        assert_eq!(nested.get("a").get("b"), 5);
    }

    #[test]
    fn set_on_null_creates_array() {
        let mut value = Value::null();
        value.set(3, "x").unwrap();
        assert!(value.is_array());
        value.push("y").unwrap();
        assert_eq!(value.keys(), vec![Value::from(3), Value::from(4)]);
    }

    #[test]
    fn scalars_cannot_be_indexed() {
        let mut value = Value::from(5);
        assert_eq!(
            value.entry(0).err(),
            Some(ValueError::ScalarAsArray(Type::Numeric))
        );
        assert!(value.set(0, 1).is_err());
    }

    // ========================================================================
    // Insertion order
    // ========================================================================

    #[test]
    fn mixed_keys_keep_insertion_order() {
        let mut value = Value::array();
        value.set(0, "val0").unwrap();
        value.set(1, "val1").unwrap();
        value.set("third", "val3").unwrap();
        assert_eq!(
            value.keys(),
            vec![Value::from(0), Value::from(1), Value::from("third")]
        );
        assert_eq!(
            value.values(),
            vec![
                Value::from("val0"),
                Value::from("val1"),
                Value::from("val3"),
            ]
        );
    }

    #[test]
    fn sequential_appends_on_mixed_keys() {
        let mut value = Value::array();
        for i in 0..50 {
            value.push(i).unwrap();
            value.set(format!("k{i}"), i).unwrap();
        }
        assert_eq!(value.size(), 100);
        assert_eq!(value.get(49), 49);
        assert_eq!(value.get("k49"), 49);
    }

    #[test]
    fn unset_removes_and_keeps_order() {
        let mut value: Value = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        value.unset("b");
        assert_eq!(value.keys(), vec![Value::from("a"), Value::from("c")]);
        value.unset("missing");
        assert_eq!(value.size(), 2);
    }

    // ========================================================================
    // Size
    // ========================================================================

    #[test]
    fn size_of_each_type() {
        assert_eq!(Value::from("hello").size(), 5);
        assert_eq!(Value::from(vec![1, 2, 3]).size(), 3);
        assert_eq!(Value::from(42).size(), 0);
        assert_eq!(Value::null().size(), 0);
        assert_eq!(Value::from(true).count(), 0);
    }

    // ========================================================================
    // References
    // ========================================================================

    #[test]
    fn reference_aliases_the_slot() {
        let mut original = Value::from(1);
        let mut alias = original.reference();
        alias.assign("changed");
        assert_eq!(original, "changed");
        assert!(original.is_reference());
        assert_eq!(original.value_type(), Type::String);
    }

    #[test]
    fn reference_to_array_writes_through() {
        let mut list = Value::array();
        let mut alias = list.reference();
        alias.push(1).unwrap();
        alias.set("k", "v").unwrap();
        assert_eq!(list.size(), 2);
        assert_eq!(list.get("k"), "v");
    }

    #[test]
    fn dereferenced_copy_is_independent() {
        let mut original = Value::from(vec![1]);
        let alias = original.reference();
        let mut copy = alias.dereferenced();
        copy.push(2).unwrap();
        assert_eq!(original.size(), 1);
    }

    #[test]
    fn storing_a_reference_stores_its_value() {
        let mut source = Value::from(1);
        let alias = source.reference();
        let mut list = Value::array();
        list.set(0, alias).unwrap();
        source.assign(2);
        assert_eq!(list.get(0), 1);
    }

    // ========================================================================
    // Construction
    // ========================================================================

    #[test]
    fn with_type_defaults() {
        assert_eq!(Value::with_type(Type::Numeric).unwrap(), 0);
        assert!(Value::with_type(Type::Array).unwrap().is_array());
        assert_eq!(
            Value::with_type(Type::Object)
                .unwrap()
                .class_name()
                .as_deref(),
            Some("stdClass")
        );
        assert!(Value::with_type(Type::Resource).is_err());
    }

    #[test]
    fn from_option_and_large_unsigned() {
        assert!(Value::from(None::<i32>).is_null());
        assert_eq!(Value::from(Some(3)), 3);
        assert!(Value::from(u64::MAX).is_float());
    }

    #[test]
    fn stdclass_properties() {
        let object = Value::object();
        object.set_property("name", "x").unwrap();
        assert_eq!(object.property("name"), "x");
        assert_eq!(object.size(), 1);
        let alias = object.clone();
        alias.set_property("name", "y").unwrap();
        assert_eq!(object.property("name"), "y");
    }
}

//! Object instances and resources.
//!
//! An [`Object`] is shared by handle: every [`Value`] holding it points at
//! the same instance. Its property table uses the host's mangled keys:
//!
//! | Visibility | Storage key |
//! |------------|-------------|
//! | public     | `name` |
//! | protected  | `"\0*\0name"` |
//! | private    | `"\0Class\0name"` |
//!
//! A native backing (any `'static` Rust value) can be attached at creation;
//! methods registered through the adapter borrow it for the duration of the
//! call.

use std::any::{Any, type_name};
use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

use crate::array::{ArrayKey, HashTable};
use crate::entries::ClassEntry;
use crate::error::{CallError, ValueError};
use crate::modifiers::Visibility;
use crate::value::Value;

static NEXT_HANDLE: AtomicU32 = AtomicU32::new(1);

// ============================================================================
// Key mangling
// ============================================================================

/// Storage key of a property declared with `visibility` in `class`.
pub fn mangle(name: &str, visibility: Visibility, class: &str) -> String {
    match visibility {
        Visibility::Public => name.to_string(),
        Visibility::Protected => format!("\0*\0{name}"),
        Visibility::Private => format!("\0{class}\0{name}"),
    }
}

/// Split a storage key into its owner marker and plain name.
///
/// Returns `(None, name)` for public keys, `(Some("*"), name)` for
/// protected ones and `(Some(class), name)` for private ones.
pub fn unmangle(key: &str) -> (Option<&str>, &str) {
    let Some(rest) = key.strip_prefix('\0') else {
        return (None, key);
    };
    match rest.split_once('\0') {
        Some((owner, name)) => (Some(owner), name),
        None => (None, key),
    }
}

/// Whether the property stored under `key` on an instance of `class` can be
/// seen from `scope` (`None` is global scope).
pub fn is_key_visible(class: &ClassEntry, key: &str, scope: Option<&ClassEntry>) -> bool {
    match unmangle(key) {
        (None, _) => true,
        (Some("*"), _) => scope.is_some_and(|scope| related(class, scope)),
        (Some(owner), _) => scope.is_some_and(|scope| scope.name_is(owner)),
    }
}

fn related(class: &ClassEntry, scope: &ClassEntry) -> bool {
    class.is_subclass_of(&scope.name) || scope.is_subclass_of(&class.name)
}

// ============================================================================
// Object
// ============================================================================

/// An instance of a registered class.
pub struct Object {
    handle: u32,
    class: Rc<ClassEntry>,
    properties: RefCell<Rc<HashTable>>,
    native: RefCell<Option<Box<dyn Any>>>,
}

impl Object {
    /// Create an instance with the class's default property values.
    pub fn new(class: Rc<ClassEntry>, native: Option<Box<dyn Any>>) -> Rc<Object> {
        let mut properties = HashTable::new();
        class.default_properties(&mut properties);
        Rc::new(Object {
            handle: NEXT_HANDLE.fetch_add(1, AtomicOrdering::Relaxed),
            class,
            properties: RefCell::new(Rc::new(properties)),
            native: RefCell::new(native),
        })
    }

    /// Process-unique handle, as printed by `var_dump`.
    pub fn handle(&self) -> u32 {
        self.handle
    }

    pub fn class(&self) -> &Rc<ClassEntry> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Snapshot of the raw (mangled) property table.
    pub fn properties(&self) -> Rc<HashTable> {
        Rc::clone(&self.properties.borrow())
    }

    pub fn has_native(&self) -> bool {
        self.native.borrow().is_some()
    }

    /// Borrow the native backing as `T`.
    pub fn native<T: 'static>(&self) -> Result<Ref<'_, T>, ValueError> {
        let guard = self.native.try_borrow().map_err(|_| self.busy())?;
        Ref::filter_map(guard, |native| native.as_ref()?.downcast_ref::<T>())
            .map_err(|_| self.no_backing::<T>())
    }

    /// Mutably borrow the native backing as `T`. Fails with
    /// [`ValueError::Busy`] while another call holds it.
    pub fn native_mut<T: 'static>(&self) -> Result<RefMut<'_, T>, ValueError> {
        let guard = self.native.try_borrow_mut().map_err(|_| self.busy())?;
        RefMut::filter_map(guard, |native| native.as_mut()?.downcast_mut::<T>())
            .map_err(|_| self.no_backing::<T>())
    }

    /// Run `f` on the type-erased backing. `None` when there is no backing
    /// or it is mutably borrowed.
    pub(crate) fn with_native_any<R>(&self, f: impl FnOnce(&dyn Any) -> R) -> Option<R> {
        let guard = self.native.try_borrow().ok()?;
        guard.as_deref().map(f)
    }

    pub(crate) fn with_native_any_mut<R>(&self, f: impl FnOnce(&mut dyn Any) -> R) -> Option<R> {
        let mut guard = self.native.try_borrow_mut().ok()?;
        guard.as_deref_mut().map(f)
    }

    fn busy(&self) -> ValueError {
        ValueError::Busy {
            class: self.class.name.clone(),
        }
    }

    fn no_backing<T: ?Sized>(&self) -> ValueError {
        ValueError::NoBacking {
            class: self.class.name.clone(),
            expected: type_name::<T>(),
        }
    }

    // ========================================================================
    // Raw property storage
    // ========================================================================

    /// Read a property by its storage key, bypassing visibility.
    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.properties
            .borrow()
            .get(&ArrayKey::Str(Rc::from(key)))
            .cloned()
    }

    /// Write a property by its storage key, bypassing visibility.
    pub fn set_raw(&self, key: &str, value: Value) {
        let mut table = self.properties.borrow_mut();
        Rc::make_mut(&mut table).insert(ArrayKey::Str(Rc::from(key)), value);
    }

    // ========================================================================
    // Scoped property access
    // ========================================================================

    /// Read property `name` as seen from `scope`.
    ///
    /// `Ok(None)` means the property does not exist; an existing property
    /// that `scope` may not see is a [`CallError::InaccessibleProperty`].
    pub fn read_property(
        &self,
        name: &str,
        scope: Option<&ClassEntry>,
    ) -> Result<Option<Value>, CallError> {
        match self.locate(name, scope) {
            Ok(Some(key)) => Ok(self.get_raw(&key)),
            Ok(None) => Ok(None),
            Err(visibility) => Err(self.inaccessible(name, visibility)),
        }
    }

    /// Write property `name` from `scope`. Undeclared names create a public
    /// property, the way dynamic properties do.
    pub fn write_property(
        &self,
        name: &str,
        value: Value,
        scope: Option<&ClassEntry>,
    ) -> Result<(), CallError> {
        let key = self
            .locate(name, scope)
            .map_err(|visibility| self.inaccessible(name, visibility))?
            .unwrap_or_else(|| name.to_string());
        self.set_raw(&key, value);
        Ok(())
    }

    /// Read property `name` from inside the object's own class, the way
    /// native code sees its own object.
    pub fn read_own_property(&self, name: &str) -> Option<Value> {
        let key = self.locate(name, Some(self.class.as_ref())).ok()??;
        self.get_raw(&key)
    }

    /// Write property `name` from inside the object's own class. Declared
    /// protected and private slots are updated in place; a private
    /// property of an ancestor is inaccessible.
    pub fn write_own_property(&self, name: &str, value: Value) -> Result<(), ValueError> {
        let key = self
            .locate(name, Some(self.class.as_ref()))
            .map_err(|visibility| ValueError::InaccessibleProperty {
                class: self.class.name.clone(),
                property: name.to_string(),
                visibility,
            })?
            .unwrap_or_else(|| name.to_string());
        self.set_raw(&key, value);
        Ok(())
    }

    /// Remove property `name` if `scope` may see it.
    pub fn unset_property(&self, name: &str, scope: Option<&ClassEntry>) -> Result<(), CallError> {
        let located = self
            .locate(name, scope)
            .map_err(|visibility| self.inaccessible(name, visibility))?;
        if let Some(key) = located {
            let mut table = self.properties.borrow_mut();
            Rc::make_mut(&mut table).remove(&ArrayKey::Str(Rc::from(key.as_str())));
        }
        Ok(())
    }

    /// Storage key for `name` from `scope`. The error is the visibility
    /// that hides an existing property.
    fn locate(&self, name: &str, scope: Option<&ClassEntry>) -> Result<Option<String>, Visibility> {
        let table = self.properties.borrow();
        let exists = |key: &str| table.contains_key(&ArrayKey::Str(Rc::from(key)));

        if let Some(scope) = scope {
            let private = mangle(name, Visibility::Private, &scope.name);
            if exists(&private) {
                return Ok(Some(private));
            }
        }

        let protected = mangle(name, Visibility::Protected, "");
        if exists(&protected) {
            return if scope.is_some_and(|scope| related(&self.class, scope)) {
                Ok(Some(protected))
            } else {
                Err(Visibility::Protected)
            };
        }

        if exists(name) {
            return Ok(Some(name.to_string()));
        }

        let hidden = table.keys().any(|key| {
            let ArrayKey::Str(key) = key else {
                return false;
            };
            matches!(unmangle(key), (Some(owner), plain) if owner != "*" && plain == name)
        });
        if hidden {
            return Err(Visibility::Private);
        }
        Ok(None)
    }

    fn inaccessible(&self, name: &str, visibility: Visibility) -> CallError {
        CallError::InaccessibleProperty {
            class: self.class.name.clone(),
            property: name.to_string(),
            visibility,
        }
    }

    // ========================================================================
    // Array syntax
    // ========================================================================

    pub fn has_dimension(&self, key: &ArrayKey) -> bool {
        if let Some(hooks) = &self.class.capabilities.array_access {
            let offset = key.to_value();
            return self
                .with_native_any(|native| (hooks.exists)(native, &offset))
                .flatten()
                .unwrap_or(false);
        }
        self.read_own_property(&key.to_string()).is_some()
    }

    pub fn read_dimension(&self, key: &ArrayKey) -> Value {
        if let Some(hooks) = &self.class.capabilities.array_access {
            let offset = key.to_value();
            return self
                .with_native_any(|native| (hooks.get)(native, &offset))
                .flatten()
                .unwrap_or_default();
        }
        self.read_own_property(&key.to_string()).unwrap_or_default()
    }

    /// `$object[$key] = $value`. Objects without an `ArrayAccess`
    /// capability store properties; appends need the capability.
    pub fn write_dimension(&self, key: Option<ArrayKey>, value: Value) -> Result<(), ValueError> {
        if let Some(hooks) = &self.class.capabilities.array_access {
            let offset = key.map(|key| key.to_value());
            let set = &hooks.set;
            let stored = self.with_native_any_mut(|native| set(native, offset.as_ref(), value));
            return match stored {
                Some(true) => Ok(()),
                Some(false) => Err(self.no_backing::<dyn Any>()),
                None => Err(self.busy()),
            };
        }
        match key {
            Some(key) => self.write_own_property(&key.to_string(), value),
            None => Err(ValueError::ScalarAsArray(crate::types::Type::Object)),
        }
    }

    pub fn unset_dimension(&self, key: &ArrayKey) {
        if let Some(hooks) = &self.class.capabilities.array_access {
            let offset = key.to_value();
            self.with_native_any_mut(|native| (hooks.unset)(native, &offset));
            return;
        }
        if let Err(err) = self.unset_property(&key.to_string(), Some(self.class.as_ref())) {
            tracing::debug!("unset on {} ignored: {err}", self.class.name);
        }
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    /// `count($object)`: the `Countable` capability, else the number of
    /// properties visible from global scope.
    pub fn count(&self) -> usize {
        if let Some(count) = &self.class.capabilities.count {
            if let Some(Some(n)) = self.with_native_any(|native| count(native)) {
                return usize::try_from(n).unwrap_or(0);
            }
        }
        self.properties
            .borrow()
            .keys()
            .filter(|key| match key {
                ArrayKey::Str(key) => unmangle(key).0.is_none(),
                ArrayKey::Int(_) => true,
            })
            .count()
    }

    /// String conversion through the `Stringable` capability.
    pub fn to_string_value(&self) -> Result<String, ValueError> {
        self.class
            .capabilities
            .to_string
            .as_ref()
            .and_then(|to_string| self.with_native_any(|native| to_string(native)).flatten())
            .ok_or_else(|| ValueError::NotStringable {
                class: self.class.name.clone(),
            })
    }

    /// Ordering through the `Comparable` capability, for two instances of
    /// the same class.
    pub fn compare_native(&self, other: &Object) -> Option<Ordering> {
        let compare = self.class.capabilities.compare.as_ref()?;
        if std::ptr::eq(self, other) {
            return Some(Ordering::Equal);
        }
        let mine = self.native.try_borrow().ok()?;
        let theirs = other.native.try_borrow().ok()?;
        compare(mine.as_deref()?, theirs.as_deref()?)
    }

    /// Shallow copy for `clone $object`: properties are copied on write and
    /// the native backing goes through the clone capability.
    pub fn duplicate(&self) -> Result<Rc<Object>, CallError> {
        let native = if self.has_native() {
            let cloner = self
                .class
                .capabilities
                .clone
                .as_ref()
                .ok_or_else(|| CallError::NotClonable(self.class.name.clone()))?;
            let copy = self.with_native_any(|native| cloner(native)).flatten();
            Some(copy.ok_or_else(|| CallError::NotClonable(self.class.name.clone()))?)
        } else {
            None
        };
        Ok(Rc::new(Object {
            handle: NEXT_HANDLE.fetch_add(1, AtomicOrdering::Relaxed),
            class: Rc::clone(&self.class),
            properties: RefCell::new(self.properties()),
            native: RefCell::new(native),
        }))
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        if let Some(destruct) = &self.class.capabilities.destruct {
            if let Some(native) = self.native.get_mut().as_deref_mut() {
                destruct(native);
            }
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("handle", &self.handle)
            .field("class", &self.class.name)
            .field("native", &self.has_native())
            .finish()
    }
}

// ============================================================================
// Resource
// ============================================================================

static NEXT_RESOURCE: AtomicU32 = AtomicU32::new(1);

/// Opaque native payload with a numeric id and a kind name.
pub struct Resource {
    id: i64,
    kind: String,
    data: RefCell<Box<dyn Any>>,
}

impl Resource {
    pub fn new<T: 'static>(kind: impl Into<String>, data: T) -> Self {
        Self {
            id: NEXT_RESOURCE.fetch_add(1, AtomicOrdering::Relaxed) as i64,
            kind: kind.into(),
            data: RefCell::new(Box::new(data)),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Borrow the payload as `T`.
    pub fn data<T: 'static>(&self) -> Option<Ref<'_, T>> {
        let guard = self.data.try_borrow().ok()?;
        Ref::filter_map(guard, |data| data.downcast_ref::<T>()).ok()
    }

    pub fn data_mut<T: 'static>(&self) -> Option<RefMut<'_, T>> {
        let guard = self.data.try_borrow_mut().ok()?;
        RefMut::filter_map(guard, |data| data.downcast_mut::<T>()).ok()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource(#{} {})", self.id, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ClassCapabilities;
    use crate::entries::{ClassDefinition, PropertyEntry};
    use crate::modifiers::MemberFlags;

    fn class(definition: ClassDefinition) -> Rc<ClassEntry> {
        Rc::new(ClassEntry::resolve(definition, None, Vec::new()).unwrap())
    }

    fn account() -> Rc<ClassEntry> {
        class(
            ClassDefinition::new("Account")
                .with_property(PropertyEntry::new("owner", "nobody", MemberFlags::PUBLIC))
                .with_property(PropertyEntry::new("balance", 0, MemberFlags::PROTECTED))
                .with_property(PropertyEntry::new("pin", 1234, MemberFlags::PRIVATE)),
        )
    }

    // ========================================================================
    // Mangling
    // ========================================================================

    #[test]
    fn mangle_and_unmangle() {
        assert_eq!(mangle("x", Visibility::Public, "A"), "x");
        assert_eq!(mangle("x", Visibility::Protected, "A"), "\0*\0x");
        assert_eq!(mangle("x", Visibility::Private, "A"), "\0A\0x");
        assert_eq!(unmangle("\0A\0x"), (Some("A"), "x"));
        assert_eq!(unmangle("\0*\0x"), (Some("*"), "x"));
        assert_eq!(unmangle("x"), (None, "x"));
    }

    #[test]
    fn defaults_use_mangled_keys() {
        let object = Object::new(account(), None);
        let table = object.properties();
        let keys: Vec<String> = table.keys().map(|key| key.to_string()).collect();
        assert_eq!(keys, vec!["owner", "\0*\0balance", "\0Account\0pin"]);
    }

    // ========================================================================
    // Visibility
    // ========================================================================

    #[test]
    fn global_scope_sees_only_public() {
        let class = account();
        let object = Object::new(Rc::clone(&class), None);
        assert_eq!(
            object.read_property("owner", None).unwrap(),
            Some(Value::from("nobody"))
        );
        assert!(matches!(
            object.read_property("balance", None),
            Err(CallError::InaccessibleProperty {
                visibility: Visibility::Protected,
                ..
            })
        ));
        assert!(matches!(
            object.read_property("pin", None),
            Err(CallError::InaccessibleProperty {
                visibility: Visibility::Private,
                ..
            })
        ));
        assert_eq!(object.read_property("missing", None).unwrap(), None);
        assert_eq!(object.count(), 1);
    }

    #[test]
    fn class_scope_sees_everything() {
        let class = account();
        let object = Object::new(Rc::clone(&class), None);
        assert_eq!(
            object.read_property("pin", Some(&class)).unwrap(),
            Some(Value::from(1234))
        );
        object
            .write_property("balance", Value::from(50), Some(&class))
            .unwrap();
        assert_eq!(object.get_raw("\0*\0balance"), Some(Value::from(50)));
    }

    #[test]
    fn dynamic_properties_are_public() {
        let object = Object::new(account(), None);
        object
            .write_property("note", Value::from("hi"), None)
            .unwrap();
        assert!(is_key_visible(object.class(), "note", None));
        assert_eq!(object.count(), 2);
    }

    #[test]
    fn own_scope_writes_update_declared_slots() {
        let object = Object::new(account(), None);
        object
            .write_own_property("balance", Value::from(99))
            .unwrap();
        object
            .write_dimension(Some(ArrayKey::from("balance")), Value::from(7))
            .unwrap();
        object.write_own_property("pin", Value::from(1)).unwrap();

        let keys: Vec<String> = object
            .properties()
            .keys()
            .map(|key| key.to_string())
            .collect();
        assert_eq!(keys, vec!["owner", "\0*\0balance", "\0Account\0pin"]);
        assert_eq!(object.get_raw("\0*\0balance"), Some(Value::from(7)));
        assert_eq!(object.read_own_property("pin"), Some(Value::from(1)));
        assert_eq!(object.read_dimension(&ArrayKey::from("balance")), 7);
        assert_eq!(object.count(), 1);
    }

    #[test]
    fn ancestor_privates_are_inaccessible_to_own_scope() {
        let definition = ClassDefinition::new("Savings").extends("Account");
        let parent = Some(account());
        let child = Rc::new(ClassEntry::resolve(definition, parent, Vec::new()).unwrap());
        let object = Object::new(child, None);
        assert!(matches!(
            object.write_own_property("pin", Value::from(0)),
            Err(ValueError::InaccessibleProperty {
                visibility: Visibility::Private,
                ..
            })
        ));
        object
            .write_own_property("balance", Value::from(5))
            .unwrap();
        assert_eq!(object.properties().len(), 3);
    }

    // ========================================================================
    // Native backing
    // ========================================================================

    #[test]
    fn native_borrow_rules() {
        let object = Object::new(account(), Some(Box::new(5_i64)));
        assert_eq!(*object.native::<i64>().unwrap(), 5);
        assert!(matches!(object.native::<String>(), Err(ValueError::NoBacking { .. })));

        let guard = object.native_mut::<i64>().unwrap();
        assert!(matches!(object.native_mut::<i64>(), Err(ValueError::Busy { .. })));
        drop(guard);
        *object.native_mut::<i64>().unwrap() += 1;
        assert_eq!(*object.native::<i64>().unwrap(), 6);
    }

    #[test]
    fn duplicate_requires_clone_capability_for_native() {
        let plain = Object::new(account(), Some(Box::new(1_u8)));
        assert!(matches!(plain.duplicate(), Err(CallError::NotClonable(_))));

        let clonable = class(ClassDefinition::new("Box").with_capabilities(ClassCapabilities {
            clone: Some(ClassCapabilities::cloner::<u8>()),
            ..Default::default()
        }));
        let original = Object::new(clonable, Some(Box::new(7_u8)));
        let copy = original.duplicate().unwrap();
        *copy.native_mut::<u8>().unwrap() = 9;
        assert_eq!(*original.native::<u8>().unwrap(), 7);
        assert_ne!(original.handle(), copy.handle());
    }

    #[test]
    fn resources_downcast() {
        let resource = Resource::new("stream", String::from("data"));
        assert_eq!(resource.kind(), "stream");
        let data = resource.data::<String>();
        assert_eq!(data.as_deref().map(String::as_str), Some("data"));
        assert!(resource.data::<i32>().is_none());
    }
}

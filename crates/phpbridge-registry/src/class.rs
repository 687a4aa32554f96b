//! Class descriptors.
//!
//! [`Class<T>`] collects the members of a class backed by the native type
//! `T` and opts into capabilities. It builds a [`ClassDefinition`]; the
//! members are checked when the class is added to a namespace or extension
//! and again against the parent when the extension is materialized.
//!
//! # Example
//!
//! ```
//! use phpbridge_core::{Argument, MemberFlags, Parameters, Type, ValueError};
//! use phpbridge_registry::Class;
//!
//! #[derive(Default, Clone)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! let class = Class::<Counter>::new("Counter")
//!     .clonable()
//!     .method("increment", |counter: &mut Counter| counter.count += 1, [])
//!     .method(
//!         "add",
//!         |counter: &mut Counter, params: &mut Parameters| -> Result<i64, ValueError> {
//!             counter.count += params.get::<i64>(0)?;
//!             Ok(counter.count)
//!         },
//!         [Argument::by_val("amount").of_type(Type::Numeric)],
//!     )
//!     .method("value", |counter: &Counter| counter.count, [])
//!     .constant("START", 0)
//!     .property("label", "counter", MemberFlags::PUBLIC);
//!
//! assert!(class.validate().is_ok());
//! ```

use std::fmt;
use std::marker::PhantomData;

use phpbridge_core::{
    Argument, ArrayAccess, ClassCapabilities, ClassDefinition, ClassFlags, Comparable,
    ConstantEntry, Countable, FunctionEntry, IntoFunction, IntoMethod, MemberFlags, Parameters,
    PropertyEntry, RegistrationError, Traversable, TypeHash, Value,
};

/// Descriptor of a class whose objects carry a native `T`.
pub struct Class<T: 'static> {
    definition: ClassDefinition,
    bridges: Vec<FunctionEntry>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Default + 'static> Class<T> {
    /// A class whose objects start with `T::default()`.
    pub fn new(name: impl Into<String>) -> Self {
        let mut class = Self::empty(name.into());
        class.definition.capabilities.construct = Some(ClassCapabilities::default_factory::<T>());
        class
    }
}

impl<T: 'static> Class<T> {
    /// A class whose objects start with `make()`.
    pub fn with_factory(name: impl Into<String>, make: fn() -> T) -> Self {
        let mut class = Self::empty(name.into());
        class.definition.capabilities.construct = Some(ClassCapabilities::factory(make));
        class
    }

    fn empty(name: String) -> Self {
        Self {
            definition: ClassDefinition::new(name),
            bridges: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    // ========================================================================
    // Capabilities
    // ========================================================================

    /// Allow `clone`; the native backing is copied with `T::clone`.
    pub fn clonable(mut self) -> Self
    where
        T: Clone,
    {
        self.definition.capabilities.clone = Some(ClassCapabilities::cloner::<T>());
        self
    }

    /// Iterate objects with a native iterator.
    pub fn traversable(mut self) -> Self
    where
        T: Traversable,
    {
        self.definition.capabilities.traverse = Some(ClassCapabilities::traverser::<T>());
        self.add_interface("Traversable");
        self
    }

    /// Implement `Countable` with [`Countable::count`].
    pub fn countable(mut self) -> Self
    where
        T: Countable,
    {
        self.definition.capabilities.count = Some(ClassCapabilities::counter::<T>());
        self.add_interface("Countable");
        self.add_bridge("count", |native: &T| native.count(), []);
        self
    }

    /// Implement `ArrayAccess` with the trait of the same name.
    pub fn array_access(mut self) -> Self
    where
        T: ArrayAccess,
    {
        self.definition.capabilities.array_access = Some(ClassCapabilities::array_access::<T>());
        self.add_interface("ArrayAccess");
        let offset = || Argument::by_val("offset");
        self.add_bridge(
            "offsetExists",
            |native: &T, params: &mut Parameters| native.offset_exists(&params.arg(0)),
            [offset()],
        );
        self.add_bridge(
            "offsetGet",
            |native: &T, params: &mut Parameters| native.offset_get(&params.arg(0)),
            [offset()],
        );
        self.add_bridge(
            "offsetSet",
            |native: &mut T, params: &mut Parameters| {
                let offset = params.arg(0);
                let offset = (!offset.is_null()).then_some(offset);
                native.offset_set(offset.as_ref(), params.arg(1));
            },
            [offset(), Argument::by_val("value")],
        );
        self.add_bridge(
            "offsetUnset",
            |native: &mut T, params: &mut Parameters| native.offset_unset(&params.arg(0)),
            [offset()],
        );
        self
    }

    /// Order objects of this class with [`Comparable::compare`].
    pub fn comparable(mut self) -> Self
    where
        T: Comparable,
    {
        self.definition.capabilities.compare = Some(ClassCapabilities::comparator::<T>());
        self
    }

    /// Convert objects to strings with `Display`; adds `__toString`.
    pub fn stringable(mut self) -> Self
    where
        T: fmt::Display,
    {
        self.definition.capabilities.to_string = Some(ClassCapabilities::stringifier::<T>());
        self.add_interface("Stringable");
        self.add_bridge("__toString", |native: &T| native.to_string(), []);
        self
    }

    /// Run `hook` on the native backing before the object is released.
    pub fn on_destruct(mut self, hook: fn(&mut T)) -> Self {
        self.definition.capabilities.destruct = Some(ClassCapabilities::teardown(hook));
        self
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// A public instance method.
    pub fn method<M>(
        self,
        name: impl Into<String>,
        handler: impl IntoMethod<T, M>,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Self {
        self.method_with(name, handler, MemberFlags::PUBLIC, arguments)
    }

    /// An instance method with explicit modifiers.
    pub fn method_with<M>(
        mut self,
        name: impl Into<String>,
        handler: impl IntoMethod<T, M>,
        flags: MemberFlags,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Self {
        self.definition.methods.push(
            FunctionEntry::new(name, handler.into_native())
                .with_flags(flags)
                .with_arguments(arguments),
        );
        self
    }

    /// A public static method. It receives no `$this`.
    pub fn static_method<M>(
        mut self,
        name: impl Into<String>,
        handler: impl IntoFunction<M>,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Self {
        self.definition.methods.push(
            FunctionEntry::new(name, handler.into_native())
                .with_flags(MemberFlags::PUBLIC | MemberFlags::STATIC)
                .with_arguments(arguments),
        );
        self
    }

    /// A public abstract method. Only abstract classes may declare one.
    pub fn abstract_method(
        mut self,
        name: impl Into<String>,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Self {
        self.definition
            .methods
            .push(FunctionEntry::abstract_method(name).with_arguments(arguments));
        self
    }

    pub fn property(
        mut self,
        name: impl Into<String>,
        default: impl Into<Value>,
        flags: MemberFlags,
    ) -> Self {
        self.definition
            .properties
            .push(PropertyEntry::new(name, default, flags));
        self
    }

    pub fn static_property(
        mut self,
        name: impl Into<String>,
        default: impl Into<Value>,
        flags: MemberFlags,
    ) -> Self {
        self.definition
            .properties
            .push(PropertyEntry::new(name, default, flags | MemberFlags::STATIC));
        self
    }

    /// A class constant. The value must be scalar or null.
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.definition
            .constants
            .push(ConstantEntry::new(name, value));
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.definition.parent = Some(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.add_interface(&interface.into());
        self
    }

    pub fn abstract_class(mut self) -> Self {
        self.definition.flags |= ClassFlags::ABSTRACT;
        self
    }

    pub fn final_class(mut self) -> Self {
        self.definition.flags |= ClassFlags::FINAL;
        self
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Checks that need no other class.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        self.definition.validate()
    }

    /// The definition, with capability methods the class did not declare
    /// itself.
    pub fn into_definition(self) -> ClassDefinition {
        let mut definition = self.definition;
        for bridge in self.bridges {
            let hash = bridge.method_hash();
            if !definition
                .methods
                .iter()
                .any(|method| method.method_hash() == hash)
            {
                definition.methods.push(bridge);
            }
        }
        definition
    }

    fn add_interface(&mut self, interface: &str) {
        let hash = TypeHash::from_class(interface);
        if !self
            .definition
            .interfaces
            .iter()
            .any(|existing| TypeHash::from_class(existing) == hash)
        {
            self.definition.interfaces.push(interface.to_string());
        }
    }

    fn add_bridge<M>(
        &mut self,
        name: &str,
        handler: impl IntoMethod<T, M>,
        arguments: impl IntoIterator<Item = Argument>,
    ) {
        let hash = TypeHash::from_method(name);
        self.bridges.retain(|method| method.method_hash() != hash);
        self.bridges
            .push(FunctionEntry::new(name, handler.into_native()).with_arguments(arguments));
    }
}

impl<T: 'static> fmt::Debug for Class<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.definition.name)
            .field("native", &std::any::type_name::<T>())
            .field("methods", &self.definition.methods.len())
            .field("properties", &self.definition.properties.len())
            .finish()
    }
}

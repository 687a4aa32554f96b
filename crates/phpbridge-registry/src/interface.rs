//! Interface descriptors.

use phpbridge_core::{
    Argument, ClassDefinition, ConstantEntry, FunctionEntry, RegistrationError, Value,
};

/// An interface: abstract public methods, constants and parent interfaces.
///
/// ```
/// use phpbridge_core::Argument;
/// use phpbridge_registry::Interface;
///
/// let shape = Interface::new("Shape")
///     .extends("Countable")
///     .method("area", [])
///     .method("scale", [Argument::by_val("factor")]);
/// assert_eq!(shape.name(), "Shape");
/// ```
#[derive(Debug, Clone)]
pub struct Interface {
    definition: ClassDefinition,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            definition: ClassDefinition::interface(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Declare a method implementing classes must provide.
    pub fn method(
        mut self,
        name: impl Into<String>,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Self {
        self.definition
            .methods
            .push(FunctionEntry::abstract_method(name).with_arguments(arguments));
        self
    }

    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.definition
            .constants
            .push(ConstantEntry::new(name, value));
        self
    }

    /// Inherit the methods of another interface.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.definition.interfaces.push(parent.into());
        self
    }

    pub fn validate(&self) -> Result<(), RegistrationError> {
        self.definition.validate()
    }

    pub fn into_definition(self) -> ClassDefinition {
        self.definition
    }
}

//! Free function descriptors.

use phpbridge_core::{Argument, FunctionEntry, IntoFunction};

/// A native function exposed to the host.
///
/// ```
/// use phpbridge_core::{Argument, Parameters, Type};
/// use phpbridge_registry::Function;
///
/// let strlen = Function::new("my_strlen", |params: &mut Parameters| params.arg(0).size() as i64)
///     .arguments([Argument::by_val("text").of_type(Type::String)]);
/// assert_eq!(strlen.name(), "my_strlen");
/// ```
#[derive(Debug, Clone)]
pub struct Function {
    entry: FunctionEntry,
}

impl Function {
    pub fn new<M>(name: impl Into<String>, handler: impl IntoFunction<M>) -> Self {
        Self {
            entry: FunctionEntry::new(name, handler.into_native()),
        }
    }

    pub fn arguments(mut self, arguments: impl IntoIterator<Item = Argument>) -> Self {
        self.entry.arguments = arguments.into_iter().collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// The entry under `namespace`, or unqualified for the global one.
    pub(crate) fn into_entry(mut self, namespace: &str) -> FunctionEntry {
        self.entry.name = crate::qualify(namespace, &self.entry.name);
        self.entry
    }
}

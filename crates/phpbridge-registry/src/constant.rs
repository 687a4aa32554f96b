//! Global constant descriptors.

use phpbridge_core::{ConstantEntry, RegistrationError, Value};

/// A global constant, the equivalent of `define()` at load time.
///
/// Only scalars and null are allowed; anything else is rejected when the
/// constant is added.
#[derive(Debug, Clone)]
pub struct Constant {
    entry: ConstantEntry,
}

impl Constant {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            entry: ConstantEntry::new(name, value),
        }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn value(&self) -> &Value {
        &self.entry.value
    }

    pub fn validate(&self) -> Result<(), RegistrationError> {
        if self.entry.is_valid() {
            Ok(())
        } else {
            Err(RegistrationError::InvalidConstant {
                name: self.entry.name.clone(),
                ty: self.entry.value.value_type(),
            })
        }
    }

    pub(crate) fn into_entry(mut self, namespace: &str) -> ConstantEntry {
        self.entry.name = crate::qualify(namespace, &self.entry.name);
        self.entry
    }
}

//! Function and method entries.

use std::fmt;

use crate::argument::Argument;
use crate::modifiers::{MemberFlags, Visibility};
use crate::native_fn::NativeFn;
use crate::type_hash::TypeHash;

/// A free function or a method.
///
/// A method without a handler is abstract. The adapter only ever produces
/// entries with a handler; abstract entries come from interfaces and
/// `abstract_method` declarations.
#[derive(Clone)]
pub struct FunctionEntry {
    pub name: String,
    /// Declaring class for methods.
    pub scope: Option<String>,
    pub flags: MemberFlags,
    pub arguments: Vec<Argument>,
    pub handler: Option<NativeFn>,
}

impl FunctionEntry {
    /// A public function or method backed by `handler`.
    pub fn new(name: impl Into<String>, handler: NativeFn) -> Self {
        Self {
            name: name.into(),
            scope: None,
            flags: MemberFlags::PUBLIC,
            arguments: Vec::new(),
            handler: Some(handler),
        }
    }

    /// A public abstract method.
    pub fn abstract_method(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: None,
            flags: MemberFlags::PUBLIC | MemberFlags::ABSTRACT,
            arguments: Vec::new(),
            handler: None,
        }
    }

    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = Argument>) -> Self {
        self.arguments = arguments.into_iter().collect();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Hash used as the method-table key.
    pub fn method_hash(&self) -> TypeHash {
        TypeHash::from_method(&self.name)
    }

    pub fn is_abstract(&self) -> bool {
        self.handler.is_none() || self.flags.is_abstract()
    }

    pub fn is_static(&self) -> bool {
        self.flags.is_static()
    }

    pub fn is_final(&self) -> bool {
        self.flags.is_final()
    }

    pub fn visibility(&self) -> Visibility {
        self.flags.visibility()
    }

    /// Number of leading arguments that must be passed.
    pub fn required_arguments(&self) -> usize {
        self.arguments
            .iter()
            .take_while(|argument| argument.is_required())
            .count()
    }

    /// `Class::method` for methods, the plain name for functions.
    pub fn qualified_name(&self) -> String {
        match &self.scope {
            Some(class) => format!("{class}::{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("name", &self.qualified_name())
            .field("flags", &self.flags)
            .field("arguments", &self.arguments)
            .field("abstract", &self.is_abstract())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;
    use crate::value::Value;

    #[test]
    fn required_arguments_stop_at_first_optional() {
        let handler = NativeFn::new(|_: &mut crate::Parameters| Ok(Value::null()));
        let arguments = [
            Argument::by_val("a").of_type(Type::Numeric),
            Argument::by_val("b").optional(),
            Argument::by_val("c"),
        ];
        let entry = FunctionEntry::new("f", handler).with_arguments(arguments);
        assert_eq!(entry.required_arguments(), 1);
        assert!(!entry.is_abstract());
    }

    #[test]
    fn qualified_names() {
        let method = FunctionEntry::abstract_method("run").with_scope("Task");
        assert_eq!(method.qualified_name(), "Task::run");
        assert!(method.is_abstract());
        assert_eq!(method.visibility(), Visibility::Public);
    }
}

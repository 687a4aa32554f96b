//! Namespaces.
//!
//! A [`Namespace`] groups functions, classes, interfaces, constants and
//! nested namespaces. Names are qualified with `\` when the extension is
//! materialized. Inside a namespace, an unqualified parent or interface
//! name that matches a sibling class refers to that sibling; every other
//! name is taken as fully qualified, and a leading `\` is dropped.

use phpbridge_core::entries::is_valid_name;
use phpbridge_core::{
    Argument, ClassDefinition, ConstantEntry, FunctionEntry, IntoFunction, RegistrationError,
    TypeHash, Value,
};
use rustc_hash::FxHashSet;

use crate::class::Class;
use crate::constant::Constant;
use crate::function::Function;
use crate::interface::Interface;
use crate::qualify;

/// A namespace and everything declared in it.
///
/// ```
/// use phpbridge_registry::{Class, Namespace};
///
/// # fn main() -> Result<(), phpbridge_core::RegistrationError> {
/// let mut geometry = Namespace::new("Geometry")?;
/// geometry
///     .function("pi", || std::f64::consts::PI, [])?
///     .constant("ORIGIN", 0)?
///     .add_class(Class::<()>::new("Point"))?;
/// assert_eq!(geometry.name(), "Geometry");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Namespace {
    name: String,
    functions: Vec<Function>,
    classes: Vec<ClassDefinition>,
    constants: Vec<Constant>,
    namespaces: Vec<Namespace>,
}

impl Namespace {
    /// A namespace called `name`. `name` may itself contain `\`.
    pub fn new(name: impl Into<String>) -> Result<Self, RegistrationError> {
        let name = name.into();
        let name = name.trim_start_matches('\\').to_string();
        if !is_valid_name(&name) {
            return Err(RegistrationError::InvalidName(name));
        }
        Ok(Self {
            name,
            ..Default::default()
        })
    }

    /// The global namespace.
    pub(crate) fn global() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.constants.is_empty()
            && self.namespaces.iter().all(Namespace::is_empty)
    }

    // ========================================================================
    // Functions
    // ========================================================================

    pub fn add_function(&mut self, function: Function) -> Result<&mut Self, RegistrationError> {
        if !is_valid_name(function.name()) || function.name().contains('\\') {
            return Err(RegistrationError::InvalidName(function.name().to_string()));
        }
        let hash = TypeHash::from_function(function.name());
        if self
            .functions
            .iter()
            .any(|existing| TypeHash::from_function(existing.name()) == hash)
        {
            return Err(RegistrationError::DuplicateFunction(qualify(&self.name, function.name())));
        }
        tracing::trace!(namespace = %self.name, function = %function.name(), "added function");
        self.functions.push(function);
        Ok(self)
    }

    /// Shorthand for [`add_function`](Self::add_function).
    pub fn function<M>(
        &mut self,
        name: impl Into<String>,
        handler: impl IntoFunction<M>,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Result<&mut Self, RegistrationError> {
        self.add_function(Function::new(name, handler).arguments(arguments))
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Add a class. Its members are validated now; the parent and
    /// interfaces are resolved when the extension is initialized.
    pub fn add_class<T: 'static>(
        &mut self,
        class: Class<T>,
    ) -> Result<&mut Self, RegistrationError> {
        class.validate()?;
        self.push_class(class.into_definition())
    }

    pub fn add_interface(&mut self, interface: Interface) -> Result<&mut Self, RegistrationError> {
        interface.validate()?;
        self.push_class(interface.into_definition())
    }

    fn push_class(&mut self, definition: ClassDefinition) -> Result<&mut Self, RegistrationError> {
        if definition.name.contains('\\') {
            return Err(RegistrationError::InvalidName(definition.name));
        }
        let hash = TypeHash::from_class(&definition.name);
        if self
            .classes
            .iter()
            .any(|existing| TypeHash::from_class(&existing.name) == hash)
        {
            return Err(RegistrationError::DuplicateClass(qualify(&self.name, &definition.name)));
        }
        tracing::trace!(namespace = %self.name, class = %definition.name, "added class");
        self.classes.push(definition);
        Ok(self)
    }

    // ========================================================================
    // Constants
    // ========================================================================

    pub fn add_constant(&mut self, constant: Constant) -> Result<&mut Self, RegistrationError> {
        constant.validate()?;
        if !is_valid_name(constant.name()) || constant.name().contains('\\') {
            return Err(RegistrationError::InvalidName(constant.name().to_string()));
        }
        if self
            .constants
            .iter()
            .any(|existing| existing.name() == constant.name())
        {
            return Err(RegistrationError::DuplicateConstant(qualify(&self.name, constant.name())));
        }
        self.constants.push(constant);
        Ok(self)
    }

    pub fn constant(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, RegistrationError> {
        self.add_constant(Constant::new(name, value))
    }

    // ========================================================================
    // Nesting
    // ========================================================================

    /// Add a nested namespace. Content of a namespace with the same name
    /// is merged.
    pub fn add_namespace(&mut self, namespace: Namespace) -> Result<&mut Self, RegistrationError> {
        let Some(index) = self.position(&namespace.name) else {
            self.namespaces.push(namespace);
            return Ok(self);
        };
        let Namespace {
            functions,
            classes,
            constants,
            namespaces,
            ..
        } = namespace;
        let target = &mut self.namespaces[index];
        for function in functions {
            target.add_function(function)?;
        }
        for class in classes {
            target.push_class(class)?;
        }
        for constant in constants {
            target.add_constant(constant)?;
        }
        for nested in namespaces {
            target.add_namespace(nested)?;
        }
        Ok(self)
    }

    /// The nested namespace called `name`, created if missing.
    pub fn namespace(&mut self, name: &str) -> Result<&mut Namespace, RegistrationError> {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.namespaces.push(Namespace::new(name)?);
                self.namespaces.len() - 1
            }
        };
        Ok(&mut self.namespaces[index])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.namespaces
            .iter()
            .position(|namespace| namespace.name.eq_ignore_ascii_case(name))
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// Move everything into `out` with fully qualified names.
    pub(crate) fn flatten(self, parent: &str, out: &mut Flattened) {
        let path = qualify(parent, &self.name);
        let siblings: FxHashSet<TypeHash> = self
            .classes
            .iter()
            .map(|class| TypeHash::from_class(&class.name))
            .collect();
        let resolve = |name: &str| -> String {
            if let Some(absolute) = name.strip_prefix('\\') {
                absolute.to_string()
            } else if !name.contains('\\') && siblings.contains(&TypeHash::from_class(name)) {
                qualify(&path, name)
            } else {
                name.to_string()
            }
        };

        for mut class in self.classes {
            class.name = qualify(&path, &class.name);
            class.parent = class.parent.as_deref().map(resolve);
            class.interfaces = class.interfaces.iter().map(|name| resolve(name)).collect();
            out.classes.push(class);
        }
        out.functions.extend(
            self.functions
                .into_iter()
                .map(|function| function.into_entry(&path)),
        );
        out.constants.extend(
            self.constants
                .into_iter()
                .map(|constant| constant.into_entry(&path)),
        );
        for namespace in self.namespaces {
            namespace.flatten(&path, out);
        }
    }
}

/// Everything in a namespace tree, fully qualified.
#[derive(Debug, Default)]
pub(crate) struct Flattened {
    pub(crate) classes: Vec<ClassDefinition>,
    pub(crate) functions: Vec<FunctionEntry>,
    pub(crate) constants: Vec<ConstantEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(namespace: Namespace) -> Flattened {
        let mut out = Flattened::default();
        namespace.flatten("", &mut out);
        out
    }

    // ========================================================================
    // Validation
    // ========================================================================

    #[test]
    fn rejects_invalid_names() {
        assert!(Namespace::new("").is_err());
        assert!(Namespace::new("9lives").is_err());
        assert!(Namespace::new("App\\Models").is_ok());
        let mut namespace = Namespace::new("App").unwrap();
        assert!(namespace.function("bad name", || 1, []).is_err());
    }

    #[test]
    fn duplicates_are_case_insensitive_for_functions_and_classes() {
        let mut namespace = Namespace::new("App").unwrap();
        namespace.function("run", || 1, []).unwrap();
        let err = namespace.function("RUN", || 2, []).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateFunction("App\\RUN".into()));

        namespace.add_class(Class::<()>::new("User")).unwrap();
        assert!(matches!(
            namespace.add_interface(Interface::new("user")),
            Err(RegistrationError::DuplicateClass(_))
        ));

        namespace.constant("LIMIT", 1).unwrap();
        assert!(namespace.constant("limit", 2).is_ok());
        assert!(namespace.constant("LIMIT", 3).is_err());
    }

    #[test]
    fn class_members_are_validated_on_add() {
        let mut namespace = Namespace::new("App").unwrap();
        let class = Class::<()>::new("Shape").abstract_method("area", []);
        assert!(matches!(
            namespace.add_class(class),
            Err(RegistrationError::AbstractMethodInConcreteClass { .. })
        ));
        assert!(matches!(
            namespace.constant("LIST", Value::array()),
            Err(RegistrationError::InvalidConstant { .. })
        ));
    }

    // ========================================================================
    // Qualification
    // ========================================================================

    #[test]
    fn names_are_qualified() {
        let mut app = Namespace::new("App").unwrap();
        app.function("boot", || (), []).unwrap();
        app.constant("VERSION", "1.0").unwrap();
        app.namespace("Models")
            .unwrap()
            .add_class(Class::<()>::new("User"))
            .unwrap();

        let out = flatten(app);
        assert_eq!(out.functions[0].name, "App\\boot");
        assert_eq!(out.constants[0].name, "App\\VERSION");
        assert_eq!(out.classes[0].name, "App\\Models\\User");
    }

    #[test]
    fn sibling_references_are_qualified() {
        let mut app = Namespace::new("App").unwrap();
        app.add_interface(Interface::new("Named"))
            .unwrap()
            .add_class(Class::<()>::new("Base"))
            .unwrap()
            .add_class(
                Class::<()>::new("User")
                    .extends("Base")
                    .implements("Named")
                    .implements("Countable")
                    .implements("\\Stringable"),
            )
            .unwrap();

        let out = flatten(app);
        let user = out
            .classes
            .iter()
            .find(|class| class.name == "App\\User")
            .unwrap();
        assert_eq!(user.parent.as_deref(), Some("App\\Base"));
        assert_eq!(user.interfaces, ["App\\Named", "Countable", "Stringable"]);
    }

    #[test]
    fn namespaces_with_the_same_name_merge() {
        let mut root = Namespace::global();
        let mut first = Namespace::new("Util").unwrap();
        first.function("a", || 1, []).unwrap();
        let mut second = Namespace::new("util").unwrap();
        second.function("b", || 2, []).unwrap();
        root.add_namespace(first)
            .unwrap()
            .add_namespace(second)
            .unwrap();

        let out = flatten(root);
        let names: Vec<_> = out
            .functions
            .iter()
            .map(|function| function.name.as_str())
            .collect();
        assert_eq!(names, ["Util\\a", "Util\\b"]);
        assert!(Namespace::global().is_empty());
    }
}

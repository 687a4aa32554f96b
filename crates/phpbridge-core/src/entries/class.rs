//! Class entries.
//!
//! A [`ClassDefinition`] is what an extension builds: members plus the
//! parent and interfaces by name. [`ClassEntry::resolve`] validates it
//! against the already-materialized parent and interfaces and produces the
//! entry the engine stores: one flattened method table (inherited methods,
//! interface requirements, then own overrides) and inherited capabilities.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::array::HashTable;
use crate::capabilities::ClassCapabilities;
use crate::error::RegistrationError;
use crate::modifiers::{ClassFlags, MemberFlags};
use crate::type_hash::TypeHash;
use crate::value::Value;

use super::{ConstantEntry, FunctionEntry, PropertyEntry};

// ============================================================================
// Definition
// ============================================================================

/// An unresolved class or interface.
#[derive(Debug, Clone, Default)]
pub struct ClassDefinition {
    pub name: String,
    pub flags: ClassFlags,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<FunctionEntry>,
    pub properties: Vec<PropertyEntry>,
    pub constants: Vec<ConstantEntry>,
    pub capabilities: ClassCapabilities,
}

impl ClassDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// An interface definition.
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: ClassFlags::INTERFACE,
            ..Default::default()
        }
    }

    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_method(mut self, method: FunctionEntry) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertyEntry) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_constant(mut self, constant: ConstantEntry) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_capabilities(mut self, capabilities: ClassCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    /// Checks that need no other class: names, duplicates, modifier
    /// combinations and constant values.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        if !is_valid_name(&self.name) {
            return Err(RegistrationError::InvalidName(self.name.clone()));
        }
        if self.flags.contains(ClassFlags::ABSTRACT) && self.flags.contains(ClassFlags::FINAL) {
            return Err(self.invalid("", "class cannot be both abstract and final"));
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for method in &self.methods {
            if !seen.insert(method.method_hash()) {
                return Err(self.duplicate(&method.name, "method"));
            }
            self.validate_method(method)?;
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for property in &self.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(self.duplicate(&property.name, "property"));
            }
            if self.is_interface() {
                return Err(self.invalid(&property.name, "interfaces cannot declare properties"));
            }
            if property.flags.has_conflicting_visibility() {
                return Err(self.invalid(&property.name, "multiple visibility modifiers"));
            }
            let forbidden = MemberFlags::ABSTRACT | MemberFlags::FINAL;
            if property.flags.intersects(forbidden) {
                return Err(self.invalid(&property.name, "properties cannot be abstract or final"));
            }
        }

        let mut seen = rustc_hash::FxHashSet::default();
        for constant in &self.constants {
            if !seen.insert(constant.name.as_str()) {
                return Err(self.duplicate(&constant.name, "constant"));
            }
            if !constant.is_valid() {
                return Err(RegistrationError::InvalidConstant {
                    name: format!("{}::{}", self.name, constant.name),
                    ty: constant.value.value_type(),
                });
            }
        }
        Ok(())
    }

    fn validate_method(&self, method: &FunctionEntry) -> Result<(), RegistrationError> {
        let flags = method.flags;
        if flags.has_conflicting_visibility() {
            return Err(self.invalid(&method.name, "multiple visibility modifiers"));
        }
        if self.is_interface() {
            if method.visibility() != crate::modifiers::Visibility::Public {
                return Err(self.invalid(&method.name, "interface methods must be public"));
            }
            return Ok(());
        }
        if method.is_abstract() {
            if flags.is_final() {
                return Err(self.invalid(&method.name, "abstract method cannot be final"));
            }
            if flags.contains(MemberFlags::PRIVATE) {
                return Err(self.invalid(&method.name, "abstract method cannot be private"));
            }
            if !self.flags.allows_abstract_methods() {
                return Err(RegistrationError::AbstractMethodInConcreteClass {
                    class: self.name.clone(),
                    method: method.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn duplicate(&self, member: &str, kind: &'static str) -> RegistrationError {
        RegistrationError::DuplicateMember {
            class: self.name.clone(),
            member: member.to_string(),
            kind,
        }
    }

    fn invalid(&self, member: &str, reason: &'static str) -> RegistrationError {
        RegistrationError::InvalidModifiers {
            class: self.name.clone(),
            member: member.to_string(),
            reason,
        }
    }
}

/// Identifier segments separated by `\`; no segment starts with a digit.
pub fn is_valid_name(name: &str) -> bool {
    let name = name.strip_prefix('\\').unwrap_or(name);
    !name.is_empty()
        && name.split('\\').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic() || !c.is_ascii())
                && chars.all(|c| c == '_' || c.is_alphanumeric() || !c.is_ascii())
        })
}

// ============================================================================
// Entry
// ============================================================================

type MethodTable = IndexMap<TypeHash, Rc<FunctionEntry>, FxBuildHasher>;

/// A materialized class or interface.
pub struct ClassEntry {
    pub name: String,
    pub hash: TypeHash,
    pub flags: ClassFlags,
    pub parent: Option<Rc<ClassEntry>>,
    pub interfaces: Vec<Rc<ClassEntry>>,
    pub capabilities: ClassCapabilities,
    methods: MethodTable,
    properties: Vec<PropertyEntry>,
    constants: IndexMap<String, Value, FxBuildHasher>,
    statics: RefCell<IndexMap<String, (MemberFlags, Value), FxBuildHasher>>,
}

impl ClassEntry {
    /// Validate `definition` and link it to its resolved parent and
    /// interfaces.
    pub fn resolve(
        definition: ClassDefinition,
        parent: Option<Rc<ClassEntry>>,
        interfaces: Vec<Rc<ClassEntry>>,
    ) -> Result<ClassEntry, RegistrationError> {
        definition.validate()?;
        let class = definition.name.clone();

        if let Some(parent) = &parent {
            if parent.is_interface() {
                return Err(RegistrationError::ExtendsInterface {
                    class,
                    parent: parent.name.clone(),
                });
            }
            if parent.is_final() {
                return Err(RegistrationError::ExtendsFinal {
                    class,
                    parent: parent.name.clone(),
                });
            }
        }
        if let Some(bad) = interfaces.iter().find(|entry| !entry.is_interface()) {
            return Err(RegistrationError::NotAnInterface {
                class,
                name: bad.name.clone(),
            });
        }

        let mut methods = parent
            .as_ref()
            .map(|parent| parent.methods.clone())
            .unwrap_or_default();
        for interface in &interfaces {
            for (hash, method) in &interface.methods {
                methods.entry(*hash).or_insert_with(|| Rc::clone(method));
            }
        }
        let is_interface = definition.is_interface();
        for mut method in definition.methods {
            method.scope = Some(class.clone());
            if is_interface {
                method.handler = None;
            }
            if method.handler.is_none() {
                method.flags |= MemberFlags::ABSTRACT;
            }
            let hash = method.method_hash();
            if let Some(inherited) = methods.get(&hash) {
                if inherited.is_final() && !inherited.is_abstract() {
                    return Err(RegistrationError::InvalidModifiers {
                        class,
                        member: method.name,
                        reason: "cannot override final method",
                    });
                }
            }
            methods.insert(hash, Rc::new(method));
        }

        if definition.flags.is_instantiable() {
            if let Some(missing) = methods.values().find(|method| method.is_abstract()) {
                return Err(RegistrationError::UnimplementedAbstract {
                    class,
                    method: missing.name.clone(),
                    declared_in: missing.scope.clone().unwrap_or_default(),
                });
            }
        }

        let mut capabilities = definition.capabilities;
        if let Some(parent) = &parent {
            capabilities.inherit(&parent.capabilities);
        }

        let mut properties = definition.properties;
        let mut statics = IndexMap::default();
        for property in &mut properties {
            property.declaring_class = class.clone();
            if property.is_static() {
                let slot = (property.flags, property.default.clone());
                statics.insert(property.name.clone(), slot);
            }
        }
        let constants = definition
            .constants
            .into_iter()
            .map(|constant| (constant.name, constant.value))
            .collect();

        tracing::trace!(class = %class, methods = methods.len(), "resolved class");
        Ok(ClassEntry {
            hash: TypeHash::from_class(&class),
            name: class,
            flags: definition.flags,
            parent,
            interfaces,
            capabilities,
            methods,
            properties,
            constants,
            statics: RefCell::new(statics),
        })
    }

    /// A class with no members, parent or interfaces.
    pub(crate) fn bare(name: &str) -> ClassEntry {
        ClassEntry {
            name: name.to_string(),
            hash: TypeHash::from_class(name),
            flags: ClassFlags::empty(),
            parent: None,
            interfaces: Vec::new(),
            capabilities: ClassCapabilities::default(),
            methods: MethodTable::default(),
            properties: Vec::new(),
            constants: IndexMap::default(),
            statics: RefCell::default(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.flags.contains(ClassFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ClassFlags::ABSTRACT)
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(ClassFlags::FINAL)
    }

    /// Word used in "Cannot instantiate ..." messages.
    pub fn kind_name(&self) -> &'static str {
        if self.is_interface() {
            "interface"
        } else if self.is_abstract() {
            "abstract class"
        } else {
            "class"
        }
    }

    /// Case-insensitive name comparison.
    pub fn name_is(&self, name: &str) -> bool {
        self.hash == TypeHash::from_class(name)
    }

    /// Whether this class is `name`, extends it or implements it.
    pub fn is_subclass_of(&self, name: &str) -> bool {
        self.is_subclass_of_hash(TypeHash::from_class(name))
    }

    fn is_subclass_of_hash(&self, hash: TypeHash) -> bool {
        self.hash == hash
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.is_subclass_of_hash(hash))
            || self
                .interfaces
                .iter()
                .any(|interface| interface.is_subclass_of_hash(hash))
    }

    pub fn find_method(&self, name: &str) -> Option<&Rc<FunctionEntry>> {
        self.methods.get(&TypeHash::from_method(name))
    }

    /// Own, inherited and interface methods.
    pub fn methods(&self) -> impl Iterator<Item = &Rc<FunctionEntry>> {
        self.methods.values()
    }

    /// Properties declared on this class (not inherited ones).
    pub fn declared_properties(&self) -> &[PropertyEntry] {
        &self.properties
    }

    /// Declared property, searching parents.
    pub fn find_property(&self, name: &str) -> Option<&PropertyEntry> {
        self.properties
            .iter()
            .find(|property| property.name == name)
            .or_else(|| self.parent.as_ref()?.find_property(name))
    }

    /// Write instance property defaults, parents first.
    pub(crate) fn default_properties(&self, table: &mut HashTable) {
        if let Some(parent) = &self.parent {
            parent.default_properties(table);
        }
        for property in self.properties.iter().filter(|p| !p.is_static()) {
            table.insert(property.storage_key(), property.default.clone());
        }
    }

    /// Class constant, searching parents and interfaces.
    pub fn constant(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.constants.get(name) {
            return Some(value.clone());
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.constant(name))
            .or_else(|| self.interfaces.iter().find_map(|i| i.constant(name)))
    }

    /// Static property with its flags and the class that declares it.
    pub fn static_property(&self, name: &str) -> Option<(MemberFlags, Value, String)> {
        if let Some((flags, value)) = self.statics.borrow().get(name) {
            return Some((*flags, value.clone(), self.name.clone()));
        }
        self.parent.as_ref()?.static_property(name)
    }

    /// Overwrite a static property on the declaring class. Returns `false`
    /// if no class in the chain declares it.
    pub fn set_static_property(&self, name: &str, value: Value) -> bool {
        if let Some((_, slot)) = self.statics.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        self.parent
            .as_ref()
            .is_some_and(|parent| parent.set_static_property(name, value))
    }
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("parent", &self.parent.as_ref().map(|p| &p.name))
            .field(
                "interfaces",
                &self.interfaces.iter().map(|i| &i.name).collect::<Vec<_>>(),
            )
            .field("methods", &self.methods.len())
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native_fn::{NativeFn, Parameters};

    fn handler() -> NativeFn {
        NativeFn::new(|_: &mut Parameters| Ok(Value::null()))
    }

    fn resolve(definition: ClassDefinition) -> Result<ClassEntry, RegistrationError> {
        ClassEntry::resolve(definition, None, Vec::new())
    }

    // ========================================================================
    // Definition validation
    // ========================================================================

    #[test]
    fn duplicate_members_are_rejected() {
        let definition = ClassDefinition::new("Counter")
            .with_method(FunctionEntry::new("increment", handler()))
            .with_method(FunctionEntry::new("INCREMENT", handler()));
        assert!(matches!(
            definition.validate(),
            Err(RegistrationError::DuplicateMember { kind: "method", .. })
        ));
    }

    #[test]
    fn abstract_method_requires_abstract_class() {
        let concrete =
            ClassDefinition::new("Shape").with_method(FunctionEntry::abstract_method("area"));
        assert!(matches!(
            concrete.validate(),
            Err(RegistrationError::AbstractMethodInConcreteClass { .. })
        ));

        let declared = ClassDefinition::new("Shape")
            .with_flags(ClassFlags::ABSTRACT)
            .with_method(FunctionEntry::abstract_method("area"));
        assert!(declared.validate().is_ok());
    }

    #[test]
    fn modifier_conflicts() {
        let flags = MemberFlags::PUBLIC | MemberFlags::ABSTRACT | MemberFlags::FINAL;
        let final_abstract = ClassDefinition::new("A")
            .with_flags(ClassFlags::ABSTRACT)
            .with_method(FunctionEntry::abstract_method("f").with_flags(flags));
        assert!(matches!(
            final_abstract.validate(),
            Err(RegistrationError::InvalidModifiers {
                reason: "abstract method cannot be final",
                ..
            })
        ));

        let flags = MemberFlags::PRIVATE | MemberFlags::ABSTRACT;
        let private_abstract = ClassDefinition::new("A")
            .with_flags(ClassFlags::ABSTRACT)
            .with_method(FunctionEntry::abstract_method("f").with_flags(flags));
        assert!(private_abstract.validate().is_err());

        let flags = MemberFlags::PUBLIC | MemberFlags::FINAL;
        let property = ClassDefinition::new("A").with_property(PropertyEntry::new("x", 1, flags));
        assert!(property.validate().is_err());
    }

    #[test]
    fn constants_must_be_scalar() {
        let list = ConstantEntry::new("LIST", Value::array());
        let definition = ClassDefinition::new("A").with_constant(list);
        assert!(matches!(
            definition.validate(),
            Err(RegistrationError::InvalidConstant { .. })
        ));
    }

    #[test]
    fn names() {
        assert!(is_valid_name("Foo"));
        assert!(is_valid_name("\\App\\Foo_2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("2Foo"));
        assert!(!is_valid_name("Foo\\"));
        assert!(!is_valid_name("Foo Bar"));
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    #[test]
    fn concrete_child_must_implement_inherited_abstracts() {
        let shape = Rc::new(
            resolve(
                ClassDefinition::new("Shape")
                    .with_flags(ClassFlags::ABSTRACT)
                    .with_method(FunctionEntry::abstract_method("area")),
            )
            .unwrap(),
        );
        let definition = ClassDefinition::new("Square").extends("Shape");
        let square = ClassEntry::resolve(definition, Some(Rc::clone(&shape)), Vec::new());
        assert_eq!(
            square.err(),
            Some(RegistrationError::UnimplementedAbstract {
                class: "Square".into(),
                method: "area".into(),
                declared_in: "Shape".into(),
            })
        );

        let square = ClassEntry::resolve(
            ClassDefinition::new("Square").with_method(FunctionEntry::new("area", handler())),
            Some(shape),
            Vec::new(),
        )
        .unwrap();
        let area = square.find_method("AREA").unwrap();
        assert_eq!(area.scope.as_deref(), Some("Square"));
        assert!(square.is_subclass_of("shape"));
    }

    #[test]
    fn interface_methods_must_be_implemented() {
        let size = FunctionEntry::abstract_method("size");
        let sized = ClassDefinition::interface("Sized").with_method(size);
        let sized = Rc::new(resolve(sized).unwrap());
        let definition = ClassDefinition::new("Bag");
        let missing = ClassEntry::resolve(definition, None, vec![Rc::clone(&sized)]);
        assert!(matches!(
            missing,
            Err(RegistrationError::UnimplementedAbstract { .. })
        ));

        let bag = ClassEntry::resolve(
            ClassDefinition::new("Bag").with_method(FunctionEntry::new("size", handler())),
            None,
            vec![sized],
        )
        .unwrap();
        assert!(bag.is_subclass_of("Sized"));
        assert!(!bag.is_subclass_of("Other"));
    }

    #[test]
    fn final_parents_and_methods() {
        let sealed = ClassDefinition::new("Sealed").with_flags(ClassFlags::FINAL);
        let sealed = Rc::new(resolve(sealed).unwrap());
        assert!(matches!(
            ClassEntry::resolve(ClassDefinition::new("Child"), Some(sealed), Vec::new()),
            Err(RegistrationError::ExtendsFinal { .. })
        ));

        let flags = MemberFlags::PUBLIC | MemberFlags::FINAL;
        let base = ClassDefinition::new("Base")
            .with_method(FunctionEntry::new("id", handler()).with_flags(flags));
        let base = Rc::new(resolve(base).unwrap());
        assert!(matches!(
            ClassEntry::resolve(
                ClassDefinition::new("Child").with_method(FunctionEntry::new("id", handler())),
                Some(base),
                Vec::new()
            ),
            Err(RegistrationError::InvalidModifiers {
                reason: "cannot override final method",
                ..
            })
        ));
    }

    #[test]
    fn constants_and_statics_are_inherited() {
        let flags = MemberFlags::PUBLIC | MemberFlags::STATIC;
        let base = ClassDefinition::new("Base")
            .with_constant(ConstantEntry::new("VERSION", "1.0"))
            .with_property(PropertyEntry::new("instances", 0, flags));
        let base = Rc::new(resolve(base).unwrap());
        let parent = Some(Rc::clone(&base));
        let child = ClassDefinition::new("Child");
        let child = ClassEntry::resolve(child, parent, Vec::new()).unwrap();
        assert_eq!(child.constant("VERSION"), Some(Value::from("1.0")));
        assert!(child.set_static_property("instances", Value::from(3)));
        let instances = base.static_property("instances").map(|(_, v, _)| v);
        assert_eq!(instances, Some(Value::from(3)));
        assert!(!child.set_static_property("missing", Value::null()));
    }

    #[test]
    fn default_properties_include_parent_privates() {
        let base = ClassDefinition::new("Base")
            .with_property(PropertyEntry::new("id", 1, MemberFlags::PRIVATE));
        let base = Rc::new(resolve(base).unwrap());
        let child = ClassDefinition::new("Child")
            .with_property(PropertyEntry::new("id", 2, MemberFlags::PRIVATE));
        let child = ClassEntry::resolve(child, Some(base), Vec::new()).unwrap();
        let mut table = HashTable::new();
        child.default_properties(&mut table);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&"\0Base\0id".into()), Some(&Value::from(1)));
        assert_eq!(table.get(&"\0Child\0id".into()), Some(&Value::from(2)));
    }
}

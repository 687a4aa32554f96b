//! The host engine model.
//!
//! An [`Engine`] owns everything an extension materializes: classes,
//! functions, global constants, ini directives, engine properties and the
//! lifecycle callbacks. It is single-threaded and shared through `Rc`; each
//! [`Request`] created from it holds a handle.
//!
//! Registration and execution are separate phases. Extensions declare
//! their descriptors once (usually through `phpbridge-registry`), then
//! requests run against the populated tables.

mod builtins;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::entries::{ClassDefinition, ClassEntry, ConstantEntry, FunctionEntry};
use crate::error::RegistrationError;
use crate::request::Request;
use crate::type_hash::TypeHash;
use crate::value::Value;

pub(crate) use builtins::{exception_class_for, exception_object, std_class};

/// Tunable engine behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineProperty {
    /// Significant digits when converting floats to strings.
    Precision,
    /// Nesting limit for native dispatch. Exceeding it is fatal.
    MaxCallDepth,
    /// Non-zero disables weak-mode scalar coercion of arguments.
    StrictTypes,
    /// Non-zero logs notices and warnings as they are raised.
    DisplayNotices,
}

impl EngineProperty {
    pub fn default_value(&self) -> usize {
        match self {
            EngineProperty::Precision => 14,
            EngineProperty::MaxCallDepth => 256,
            EngineProperty::StrictTypes => 0,
            EngineProperty::DisplayNotices => 1,
        }
    }
}

/// Lifecycle callback.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Lifecycle {
    startup: Vec<Callback>,
    request: Vec<Callback>,
    idle: Vec<Callback>,
    shutdown: Vec<Callback>,
}

/// Ini directive: default value plus the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniEntry {
    pub name: String,
    pub default: String,
    pub value: String,
    /// Whether a request may override it with `ini_set`.
    pub user_modifiable: bool,
}

impl IniEntry {
    pub fn new(name: impl Into<String>, default: impl Into<String>) -> Self {
        let default = default.into();
        Self {
            name: name.into(),
            value: default.clone(),
            default,
            user_modifiable: true,
        }
    }
}

/// Materialized classes, functions and constants.
pub struct Engine {
    classes: RefCell<FxHashMap<TypeHash, Rc<ClassEntry>>>,
    functions: RefCell<FxHashMap<TypeHash, Rc<FunctionEntry>>>,
    constants: RefCell<FxHashMap<TypeHash, ConstantEntry>>,
    ini: RefCell<FxHashMap<String, IniEntry>>,
    properties: RefCell<FxHashMap<EngineProperty, usize>>,
    lifecycle: RefCell<Lifecycle>,
    started: Cell<bool>,
}

impl Engine {
    /// An engine with the built-in classes and interfaces declared.
    pub fn new() -> Self {
        let engine = Self {
            classes: RefCell::default(),
            functions: RefCell::default(),
            constants: RefCell::default(),
            ini: RefCell::default(),
            properties: RefCell::default(),
            lifecycle: RefCell::default(),
            started: Cell::new(false),
        };
        builtins::declare(&engine);
        engine
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Resolve `definition` against the declared classes and add it.
    ///
    /// The parent and interfaces must already be declared.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn declare_class(
        &self,
        definition: ClassDefinition,
    ) -> Result<Rc<ClassEntry>, RegistrationError> {
        let hash = TypeHash::from_class(&definition.name);
        if self.classes.borrow().contains_key(&hash) {
            return Err(RegistrationError::DuplicateClass(definition.name));
        }

        let parent = match &definition.parent {
            Some(parent) => Some(self.find_class(parent).ok_or_else(|| {
                RegistrationError::ParentNotFound {
                    class: definition.name.clone(),
                    parent: parent.clone(),
                }
            })?),
            None => None,
        };
        let interfaces = definition
            .interfaces
            .iter()
            .map(|interface| {
                self.find_class(interface)
                    .ok_or_else(|| RegistrationError::InterfaceNotFound {
                        class: definition.name.clone(),
                        interface: interface.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let entry = Rc::new(ClassEntry::resolve(definition, parent, interfaces)?);
        tracing::debug!(class = %entry.name, kind = entry.kind_name(), "declared class");
        self.classes.borrow_mut().insert(hash, Rc::clone(&entry));
        Ok(entry)
    }

    /// Add an already resolved class entry.
    pub(crate) fn insert_class(&self, entry: Rc<ClassEntry>) {
        self.classes.borrow_mut().insert(entry.hash, entry);
    }

    pub fn declare_function(&self, function: FunctionEntry) -> Result<(), RegistrationError> {
        if !crate::entries::is_valid_name(&function.name) {
            return Err(RegistrationError::InvalidName(function.name));
        }
        let hash = TypeHash::from_function(&function.name);
        let mut functions = self.functions.borrow_mut();
        if functions.contains_key(&hash) {
            return Err(RegistrationError::DuplicateFunction(function.name));
        }
        tracing::debug!(function = %function.name, "declared function");
        functions.insert(hash, Rc::new(function));
        Ok(())
    }

    pub fn declare_constant(&self, constant: ConstantEntry) -> Result<(), RegistrationError> {
        if !constant.is_valid() {
            return Err(RegistrationError::InvalidConstant {
                ty: constant.value.value_type(),
                name: constant.name,
            });
        }
        let hash = TypeHash::from_constant(&constant.name);
        let mut constants = self.constants.borrow_mut();
        if constants.contains_key(&hash) {
            return Err(RegistrationError::DuplicateConstant(constant.name));
        }
        tracing::debug!(constant = %constant.name, "declared constant");
        constants.insert(hash, constant);
        Ok(())
    }

    /// Register an ini directive with its default value.
    pub fn declare_ini(
        &self,
        name: impl Into<String>,
        default: impl Into<String>,
    ) -> Result<(), RegistrationError> {
        self.declare_ini_entry(IniEntry::new(name, default))
    }

    pub fn declare_ini_entry(&self, entry: IniEntry) -> Result<(), RegistrationError> {
        let mut ini = self.ini.borrow_mut();
        if ini.contains_key(&entry.name) {
            return Err(RegistrationError::DuplicateMember {
                class: "ini".to_string(),
                member: entry.name,
                kind: "directive",
            });
        }
        tracing::debug!(
            directive = %entry.name,
            default = %entry.default,
            "declared ini directive"
        );
        ini.insert(entry.name.clone(), entry);
        Ok(())
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Case-insensitive class lookup; a leading `\` is ignored.
    pub fn find_class(&self, name: &str) -> Option<Rc<ClassEntry>> {
        self.classes
            .borrow()
            .get(&TypeHash::from_class(name))
            .cloned()
    }

    pub fn find_function(&self, name: &str) -> Option<Rc<FunctionEntry>> {
        self.functions
            .borrow()
            .get(&TypeHash::from_function(name))
            .cloned()
    }

    /// Case-sensitive global constant lookup.
    pub fn find_constant(&self, name: &str) -> Option<Value> {
        self.constants
            .borrow()
            .get(&TypeHash::from_constant(name))
            .map(|constant| constant.value.clone())
    }

    pub fn ini(&self, name: &str) -> Option<IniEntry> {
        self.ini.borrow().get(name).cloned()
    }

    /// Change the engine-wide value of an ini directive.
    pub fn set_ini(&self, name: &str, value: impl Into<String>) -> bool {
        match self.ini.borrow_mut().get_mut(name) {
            Some(entry) => {
                entry.value = value.into();
                true
            }
            None => false,
        }
    }

    pub fn class_count(&self) -> usize {
        self.classes.borrow().len()
    }

    pub fn function_count(&self) -> usize {
        self.functions.borrow().len()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn set_property(&self, property: EngineProperty, value: usize) {
        self.properties.borrow_mut().insert(property, value);
    }

    pub fn property(&self, property: EngineProperty) -> usize {
        self.properties
            .borrow()
            .get(&property)
            .copied()
            .unwrap_or_else(|| property.default_value())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn on_startup(&self, callback: Callback) {
        self.lifecycle.borrow_mut().startup.push(callback);
    }

    pub fn on_request(&self, callback: Callback) {
        self.lifecycle.borrow_mut().request.push(callback);
    }

    pub fn on_idle(&self, callback: Callback) {
        self.lifecycle.borrow_mut().idle.push(callback);
    }

    pub fn on_shutdown(&self, callback: Callback) {
        self.lifecycle.borrow_mut().shutdown.push(callback);
    }

    /// Run the startup callbacks. Only the first call has an effect.
    pub fn startup(&self) {
        if self.started.replace(true) {
            return;
        }
        tracing::debug!("engine startup");
        self.run(|lifecycle| &lifecycle.startup);
    }

    /// Run the shutdown callbacks once, if the engine was started.
    pub fn shutdown(&self) {
        if !self.started.replace(false) {
            return;
        }
        tracing::debug!("engine shutdown");
        self.run(|lifecycle| &lifecycle.shutdown);
    }

    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    pub(crate) fn request_started(&self) {
        self.run(|lifecycle| &lifecycle.request);
    }

    pub(crate) fn request_finished(&self) {
        self.run(|lifecycle| &lifecycle.idle);
    }

    /// Callbacks are cloned out first so they may register more.
    fn run(&self, select: impl Fn(&Lifecycle) -> &Vec<Callback>) {
        let callbacks = select(&self.lifecycle.borrow()).clone();
        for callback in callbacks {
            callback();
        }
    }

    /// Start a request against this engine.
    pub fn request(self: &Rc<Self>) -> Request {
        Request::new(Rc::clone(self))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("classes", &self.class_count())
            .field("functions", &self.function_count())
            .field("constants", &self.constants.borrow().len())
            .field("started", &self.started.get())
            .finish()
    }
}

//! Extensions.
//!
//! An [`Extension`] is the unit an engine loads: a global namespace of
//! functions, classes and constants, ini directives, engine properties and
//! lifecycle callbacks. [`Extension::initialize`] materializes it into an
//! [`Engine`] exactly once; afterwards the extension is locked.

use std::rc::Rc;
use std::sync::Arc;

use phpbridge_core::{
    Argument, Callback, ClassDefinition, Engine, EngineProperty, IntoFunction, RegistrationError,
    Value,
};

use crate::class::Class;
use crate::constant::Constant;
use crate::function::Function;
use crate::ini::Ini;
use crate::interface::Interface;
use crate::namespace::{Flattened, Namespace};

#[derive(Default)]
struct Callbacks {
    startup: Vec<Callback>,
    request: Vec<Callback>,
    idle: Vec<Callback>,
    shutdown: Vec<Callback>,
}

/// A native extension.
///
/// ```
/// use std::rc::Rc;
///
/// use phpbridge_core::Engine;
/// use phpbridge_registry::{Extension, Ini};
///
/// # fn main() -> Result<(), phpbridge_core::RegistrationError> {
/// let mut extension = Extension::new("demo", "1.0");
/// extension
///     .function("demo_answer", || 42, [])?
///     .constant("DEMO_VERSION", "1.0")?
///     .add_ini(Ini::new("demo.enabled", true))?;
///
/// let engine = Rc::new(Engine::new());
/// extension.initialize(&engine)?;
/// assert!(engine.find_function("demo_answer").is_some());
/// assert!(extension.function("late", || 0, []).is_err());
/// # Ok(())
/// # }
/// ```
pub struct Extension {
    name: String,
    version: String,
    root: Namespace,
    ini: Vec<Ini>,
    properties: Vec<(EngineProperty, usize)>,
    callbacks: Callbacks,
    locked: bool,
}

impl Extension {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            root: Namespace::global(),
            ini: Vec::new(),
            properties: Vec::new(),
            callbacks: Callbacks::default(),
            locked: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether [`initialize`](Self::initialize) has run.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn unlocked(&mut self) -> Result<&mut Self, RegistrationError> {
        if self.locked {
            return Err(RegistrationError::Locked(self.name.clone()));
        }
        Ok(self)
    }

    // ========================================================================
    // Content
    // ========================================================================

    pub fn add_function(&mut self, function: Function) -> Result<&mut Self, RegistrationError> {
        self.unlocked()?.root.add_function(function)?;
        Ok(self)
    }

    pub fn function<M>(
        &mut self,
        name: impl Into<String>,
        handler: impl IntoFunction<M>,
        arguments: impl IntoIterator<Item = Argument>,
    ) -> Result<&mut Self, RegistrationError> {
        self.add_function(Function::new(name, handler).arguments(arguments))
    }

    pub fn add_class<T: 'static>(
        &mut self,
        class: Class<T>,
    ) -> Result<&mut Self, RegistrationError> {
        self.unlocked()?.root.add_class(class)?;
        Ok(self)
    }

    pub fn add_interface(&mut self, interface: Interface) -> Result<&mut Self, RegistrationError> {
        self.unlocked()?.root.add_interface(interface)?;
        Ok(self)
    }

    pub fn add_constant(&mut self, constant: Constant) -> Result<&mut Self, RegistrationError> {
        self.unlocked()?.root.add_constant(constant)?;
        Ok(self)
    }

    pub fn constant(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<&mut Self, RegistrationError> {
        self.add_constant(Constant::new(name, value))
    }

    pub fn add_namespace(&mut self, namespace: Namespace) -> Result<&mut Self, RegistrationError> {
        self.unlocked()?.root.add_namespace(namespace)?;
        Ok(self)
    }

    pub fn add_ini(&mut self, ini: Ini) -> Result<&mut Self, RegistrationError> {
        let this = self.unlocked()?;
        if this.ini.iter().any(|known| known.name() == ini.name()) {
            return Err(RegistrationError::DuplicateMember {
                class: this.name.clone(),
                member: ini.name().to_string(),
                kind: "directive",
            });
        }
        this.ini.push(ini);
        Ok(this)
    }

    /// Engine property applied on initialization.
    pub fn set_property(
        &mut self,
        property: EngineProperty,
        value: usize,
    ) -> Result<&mut Self, RegistrationError> {
        let this = self.unlocked()?;
        this.properties.retain(|(known, _)| *known != property);
        this.properties.push((property, value));
        Ok(this)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Run when the engine starts, or on initialization if it already has.
    pub fn on_startup(
        &mut self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        let this = self.unlocked()?;
        this.callbacks.startup.push(Arc::new(callback));
        Ok(this)
    }

    /// Run at the start of every request.
    pub fn on_request(
        &mut self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        let this = self.unlocked()?;
        this.callbacks.request.push(Arc::new(callback));
        Ok(this)
    }

    /// Run after every request.
    pub fn on_idle(
        &mut self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        let this = self.unlocked()?;
        this.callbacks.idle.push(Arc::new(callback));
        Ok(this)
    }

    pub fn on_shutdown(
        &mut self,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<&mut Self, RegistrationError> {
        let this = self.unlocked()?;
        this.callbacks.shutdown.push(Arc::new(callback));
        Ok(this)
    }

    // ========================================================================
    // Materialization
    // ========================================================================

    /// Materialize the extension into `engine`.
    ///
    /// Classes are declared parents first, regardless of the order they
    /// were added in. The extension is locked even if materialization
    /// fails part way.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn initialize(&mut self, engine: &Rc<Engine>) -> Result<(), RegistrationError> {
        if self.locked {
            return Err(RegistrationError::AlreadyInitialized(self.name.clone()));
        }
        self.locked = true;

        for (property, value) in self.properties.drain(..) {
            engine.set_property(property, value);
        }
        for ini in self.ini.drain(..) {
            engine.declare_ini_entry(ini.into_entry())?;
        }

        let mut flattened = Flattened::default();
        std::mem::take(&mut self.root).flatten("", &mut flattened);
        let Flattened {
            classes,
            functions,
            constants,
        } = flattened;
        let (class_count, function_count) = (classes.len(), functions.len());

        for constant in constants {
            engine.declare_constant(constant)?;
        }
        for function in functions {
            engine.declare_function(function)?;
        }
        declare_classes(engine, classes)?;

        let callbacks = std::mem::take(&mut self.callbacks);
        let started = engine.is_started();
        for callback in callbacks.startup {
            if started {
                callback();
            } else {
                engine.on_startup(callback);
            }
        }
        for callback in callbacks.request {
            engine.on_request(callback);
        }
        for callback in callbacks.idle {
            engine.on_idle(callback);
        }
        for callback in callbacks.shutdown {
            engine.on_shutdown(callback);
        }

        tracing::info!(
            extension = %self.name,
            version = %self.version,
            classes = class_count,
            functions = function_count,
            "initialized extension"
        );
        Ok(())
    }
}

/// Declare `pending` so that each class comes after its parent and
/// interfaces. A class whose dependencies never appear is declared anyway
/// to surface the lookup error.
fn declare_classes(
    engine: &Engine,
    mut pending: Vec<ClassDefinition>,
) -> Result<(), RegistrationError> {
    while !pending.is_empty() {
        let ready = pending.iter().position(|class| {
            class
                .parent
                .iter()
                .chain(&class.interfaces)
                .all(|dependency| engine.find_class(dependency).is_some())
        });
        let class = pending.remove(ready.unwrap_or(0));
        engine.declare_class(class)?;
    }
    Ok(())
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("ini", &self.ini)
            .field("locked", &self.locked)
            .finish()
    }
}

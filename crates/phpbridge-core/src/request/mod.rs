//! Request context and calls into user space.
//!
//! A [`Request`] is the per-request half of the host model: superglobals,
//! the calling-scope stack, the pending-exception slot, the fatal-error
//! slot and the diagnostics raised so far. It is a cheap handle; clones
//! share the same state and the idle callbacks run when the last one is
//! dropped.
//!
//! # Boundary
//!
//! Every `call*` method is a boundary crossing. Errors returned by the
//! native handler are converted into what the host understands:
//!
//! | Handler error | Host effect |
//! |---------------|-------------|
//! | `ValueError`, `CallError`, `RegistrationError` | pending `TypeError`/`Error`/... object |
//! | `Exception` | pending object of its class |
//! | `HostException` | stays pending (rethrown) |
//! | `FatalError` | recorded; the request is aborted |
//!
//! After the call, the pending-exception slot is compared with its state
//! before the call. A new exception is handed back to the caller as
//! [`BridgeError::Host`], which handles it when dropped.

mod superglobals;

pub use superglobals::Superglobal;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::argument;
use crate::callable::Callable;
use crate::cursor::{TraverseCursor, ValueIterator};
use crate::engine::{Engine, EngineProperty, exception_class_for, exception_object};
use crate::entries::{ClassEntry, FunctionEntry};
use crate::error::{BridgeError, CallError, ValueError};
use crate::exception::{Exception, ExceptionSlot, FatalError, HostException};
use crate::modifiers::Visibility;
use crate::native_fn::Parameters;
use crate::object::Object;
use crate::type_hash::TypeHash;
use crate::value::{PrecisionScope, Value};

use superglobals::Superglobals;

/// Severity of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Notice,
    Warning,
    Deprecated,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Notice => "Notice",
            Level::Warning => "Warning",
            Level::Deprecated => "Deprecated",
        })
    }
}

/// A notice, warning or deprecation raised during the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

struct RequestState {
    engine: Rc<Engine>,
    superglobals: Superglobals,
    scopes: RefCell<Vec<Option<Rc<ClassEntry>>>>,
    exception: ExceptionSlot,
    fatal: RefCell<Option<FatalError>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    depth: Cell<usize>,
    constants: RefCell<FxHashMap<TypeHash, Value>>,
    ini: RefCell<FxHashMap<String, String>>,
}

impl Drop for RequestState {
    fn drop(&mut self) {
        if let Some(exception) = self.exception.take() {
            tracing::warn!(
                class = %exception.class_name().unwrap_or_default(),
                "request finished with an uncaught exception"
            );
        }
        self.engine.request_finished();
    }
}

/// Handle to the state of one request.
#[derive(Clone)]
pub struct Request {
    inner: Rc<RequestState>,
}

/// Scope, depth and precision bookkeeping for one native frame.
struct Frame<'a> {
    request: &'a Request,
    _precision: PrecisionScope,
}

impl<'a> Frame<'a> {
    fn enter(request: &'a Request, scope: Option<Rc<ClassEntry>>) -> Self {
        request.inner.scopes.borrow_mut().push(scope);
        request.inner.depth.set(request.inner.depth.get() + 1);
        Frame {
            request,
            _precision: request.precision_scope(),
        }
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.request.inner.scopes.borrow_mut().pop();
        let depth = &self.request.inner.depth;
        depth.set(depth.get().saturating_sub(1));
    }
}

impl Request {
    pub(crate) fn new(engine: Rc<Engine>) -> Self {
        engine.request_started();
        Self {
            inner: Rc::new(RequestState {
                engine,
                superglobals: Superglobals::default(),
                scopes: RefCell::default(),
                exception: ExceptionSlot::default(),
                fatal: RefCell::default(),
                diagnostics: RefCell::default(),
                depth: Cell::new(0),
                constants: RefCell::default(),
                ini: RefCell::default(),
            }),
        }
    }

    pub fn engine(&self) -> &Rc<Engine> {
        &self.inner.engine
    }

    /// Class of the innermost native frame; `None` in global scope.
    pub fn scope(&self) -> Option<Rc<ClassEntry>> {
        self.inner.scopes.borrow().last().cloned().flatten()
    }

    /// Current native nesting depth.
    pub fn depth(&self) -> usize {
        self.inner.depth.get()
    }

    /// Install this engine's float precision until the guard drops.
    fn precision_scope(&self) -> PrecisionScope {
        PrecisionScope::enter(self.engine().property(EngineProperty::Precision))
    }

    /// String conversion under this engine's float precision.
    pub fn string_value(&self, value: &Value) -> String {
        let _precision = self.precision_scope();
        value.string_value()
    }

    // ========================================================================
    // Superglobals
    // ========================================================================

    /// Copy of one of the request arrays.
    pub fn superglobal(&self, which: Superglobal) -> Value {
        self.inner.superglobals.get(which)
    }

    pub fn set_superglobal(&self, which: Superglobal, value: impl Into<Value>) {
        self.inner.superglobals.set(which, value.into());
    }

    pub fn get(&self) -> Value {
        self.superglobal(Superglobal::Get)
    }

    pub fn post(&self) -> Value {
        self.superglobal(Superglobal::Post)
    }

    pub fn cookie(&self) -> Value {
        self.superglobal(Superglobal::Cookie)
    }

    pub fn server(&self) -> Value {
        self.superglobal(Superglobal::Server)
    }

    pub fn env(&self) -> Value {
        self.superglobal(Superglobal::Env)
    }

    pub fn files(&self) -> Value {
        self.superglobal(Superglobal::Files)
    }

    /// `$_REQUEST`.
    pub fn request_vars(&self) -> Value {
        self.superglobal(Superglobal::Request)
    }

    /// `$GLOBALS`.
    pub fn globals(&self) -> Value {
        self.inner.superglobals.globals()
    }

    pub fn global(&self, name: &str) -> Value {
        self.inner.superglobals.global(name)
    }

    pub fn set_global(&self, name: &str, value: impl Into<Value>) {
        self.inner.superglobals.set_global(name, value.into());
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub fn notice(&self, message: impl Into<String>) {
        self.raise(Level::Notice, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.raise(Level::Warning, message.into());
    }

    pub fn deprecated(&self, message: impl Into<String>) {
        self.raise(Level::Deprecated, message.into());
    }

    fn raise(&self, level: Level, message: String) {
        if self.engine().property(EngineProperty::DisplayNotices) != 0 {
            tracing::warn!(%level, "{message}");
        }
        self.inner
            .diagnostics
            .borrow_mut()
            .push(Diagnostic { level, message });
    }

    /// Diagnostics raised so far, oldest first.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.diagnostics.borrow().clone()
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// Make `exception` the pending host exception.
    pub fn throw(&self, exception: Exception) {
        let Some(class) = exception_class_for(self.engine(), exception.class()) else {
            tracing::error!("no throwable class available for {}", exception.class());
            return;
        };
        tracing::debug!(class = %class.name, message = exception.message(), "throw");
        self.inner
            .exception
            .set(exception_object(class, exception.message(), exception.code()));
    }

    /// The pending exception object, if any.
    pub fn pending_exception(&self) -> Option<Value> {
        self.inner.exception.get()
    }

    /// Take the pending exception, leaving none.
    pub fn clear_exception(&self) -> Option<Value> {
        self.inner.exception.take()
    }

    /// The fatal error that aborted this request.
    pub fn fatal(&self) -> Option<FatalError> {
        self.inner.fatal.borrow().clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.fatal.borrow().is_some()
    }

    fn record_fatal(&self, fatal: &FatalError) {
        let mut slot = self.inner.fatal.borrow_mut();
        if slot.is_none() {
            tracing::error!("fatal error: {fatal}");
            *slot = Some(fatal.clone());
        }
    }

    fn check_fatal(&self) -> Result<(), FatalError> {
        match self.fatal() {
            Some(fatal) => Err(fatal),
            None => Ok(()),
        }
    }

    /// Convert a handler error into host state. Only fatal errors keep
    /// propagating as errors.
    fn boundary(&self, err: BridgeError) -> Result<(), BridgeError> {
        tracing::trace!("boundary conversion: {err}");
        match err {
            BridgeError::Value(err) => {
                self.throw(Exception::new(err.to_string()).with_class(err.host_class()));
            }
            BridgeError::Call(err) => {
                self.throw(Exception::new(err.to_string()).with_class(err.host_class()));
            }
            BridgeError::Registration(err) => {
                self.throw(Exception::new(err.to_string()).with_class("Error"));
            }
            BridgeError::Exception(exception) => self.throw(exception),
            BridgeError::Host(host) => drop(host.rethrow()),
            BridgeError::Fatal(fatal) => {
                self.record_fatal(&fatal);
                return Err(fatal.into());
            }
        }
        Ok(())
    }

    /// Run `call` as a user-space call: convert its errors at the boundary,
    /// then report an exception that became pending during the call.
    fn user_call(
        &self,
        call: impl FnOnce() -> Result<Value, BridgeError>,
    ) -> Result<Value, BridgeError> {
        self.check_fatal()?;
        let before = self.inner.exception.get();
        let value = match call() {
            Ok(value) => value,
            Err(err) => {
                self.boundary(err)?;
                Value::null()
            }
        };
        if let Some(after) = self.inner.exception.get() {
            let is_new = before.as_ref().is_none_or(|seen| !seen.identical(&after));
            if is_new {
                return Err(HostException::new(after, self.inner.exception.clone()).into());
            }
        }
        Ok(value)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Validate arguments and run a native handler in its own frame.
    #[cfg_attr(feature = "profiling", profiling::function)]
    fn dispatch(
        &self,
        function: &FunctionEntry,
        this: Option<Value>,
        scope: Option<Rc<ClassEntry>>,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        let limit = self.engine().property(EngineProperty::MaxCallDepth);
        if self.depth() >= limit {
            let fatal = FatalError::new(format!(
                "Maximum function nesting level of '{limit}' reached, aborting!"
            ));
            self.record_fatal(&fatal);
            return Err(fatal.into());
        }
        let Some(handler) = function.handler.clone() else {
            return Err(CallError::NotCallable(format!(
                "Cannot call abstract method {}()",
                function.qualified_name()
            ))
            .into());
        };
        let args = argument::validate(self, function, args)?;

        let _frame = Frame::enter(self, scope);
        tracing::trace!(function = %function.qualified_name(), depth = self.depth(), "dispatch");
        let mut params = Parameters::new(self.clone(), function.qualified_name(), this, args);
        handler.call(&mut params)
    }

    fn method_scope(
        &self,
        class: &Rc<ClassEntry>,
        method: &FunctionEntry,
    ) -> Option<Rc<ClassEntry>> {
        match method.scope.as_deref() {
            Some(declaring) if !class.name_is(declaring) => self.engine().find_class(declaring),
            _ => Some(Rc::clone(class)),
        }
    }

    fn check_visibility(
        &self,
        class: &ClassEntry,
        method: &FunctionEntry,
    ) -> Result<(), CallError> {
        let scope = self.scope();
        let declaring = method.scope.as_deref().unwrap_or(class.name.as_str());
        let allowed = match method.visibility() {
            Visibility::Public => true,
            Visibility::Protected => scope.as_ref().is_some_and(|scope| {
                scope.is_subclass_of(declaring) || class.is_subclass_of(&scope.name)
            }),
            Visibility::Private => scope.as_ref().is_some_and(|scope| scope.name_is(declaring)),
        };
        if allowed {
            return Ok(());
        }
        Err(CallError::InaccessibleMethod {
            class: class.name.clone(),
            method: method.name.clone(),
            visibility: method.visibility(),
            scope: scope.map(|scope| scope.name.clone()),
        })
    }

    // ========================================================================
    // Calls into user space
    // ========================================================================

    /// Call anything callable: a [`Callable`], a function name, a
    /// `"Class::method"` string, an `[object or class, method]` pair or an
    /// invokable object.
    pub fn call(&self, callable: &Value, args: Vec<Value>) -> Result<Value, BridgeError> {
        let callable = callable.dereferenced();
        if let Some(explicit) = callable.callable_ref() {
            return match &*explicit {
                Callable::Function(name) => self.call_function(name, args),
                Callable::Method { object, method } => self.call_method(object, method, args),
                Callable::StaticMethod { class, method } => self.call_static(class, method, args),
                Callable::Native(handler) => {
                    let closure = FunctionEntry::new("{closure}", handler.clone());
                    let scope = self.scope();
                    self.user_call(|| self.dispatch(&closure, None, scope, args))
                }
            };
        }
        if callable.is_string() {
            let name = callable.string_value();
            return match name.split_once("::") {
                Some((class, method)) => self.call_static(class, method, args),
                None => self.call_function(&name, args),
            };
        }
        if callable.is_array() && callable.size() == 2 {
            let (target, method) = (callable.get(0), callable.get(1).string_value());
            return if target.is_object() {
                self.call_method(&target, &method, args)
            } else {
                self.call_static(&target.string_value(), &method, args)
            };
        }
        if callable.is_object() {
            return self.call_method(&callable, "__invoke", args);
        }
        self.user_call(|| {
            let message = format!("Value of type {} is not callable", callable.type_name());
            Err(CallError::NotCallable(message).into())
        })
    }

    /// Call a global function by name.
    pub fn call_function(&self, name: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.user_call(|| {
            let function = self
                .engine()
                .find_function(name)
                .ok_or_else(|| CallError::UndefinedFunction(name.to_string()))?;
            self.dispatch(&function, None, None, args)
        })
    }

    /// Call a method on an object, honouring visibility from the current
    /// scope and falling back to `__call`.
    pub fn call_method(
        &self,
        object: &Value,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        self.user_call(|| {
            let target = object.dereferenced();
            let instance = target
                .object_ref()
                .ok_or_else(|| ValueError::NotAnObject(target.value_type()))?;
            let class = Rc::clone(instance.class());

            let Some(method) = class.find_method(name).cloned() else {
                return match class.find_method("__call").cloned() {
                    Some(magic) => {
                        let scope = self.method_scope(&class, &magic);
                        let args = vec![Value::from(name), Value::from(args)];
                        self.dispatch(&magic, Some(target.clone()), scope, args)
                    }
                    None => Err(CallError::UndefinedMethod {
                        class: class.name.clone(),
                        method: name.to_string(),
                    }
                    .into()),
                };
            };
            self.check_visibility(&class, &method)?;
            let scope = self.method_scope(&class, &method);
            let this = (!method.is_static()).then(|| target.clone());
            self.dispatch(&method, this, scope, args)
        })
    }

    /// Call a static method, falling back to `__callStatic`. `self` and
    /// `parent` resolve against the current scope.
    pub fn call_static(
        &self,
        class: &str,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, BridgeError> {
        self.user_call(|| {
            let class = self.resolve_class(class)?;
            let Some(method) = class.find_method(name).cloned() else {
                return match class.find_method("__callStatic").cloned() {
                    Some(magic) => {
                        let scope = self.method_scope(&class, &magic);
                        let args = vec![Value::from(name), Value::from(args)];
                        self.dispatch(&magic, None, scope, args)
                    }
                    None => Err(CallError::UndefinedMethod {
                        class: class.name.clone(),
                        method: name.to_string(),
                    }
                    .into()),
                };
            };
            if !method.is_static() {
                return Err(CallError::NonStaticCall {
                    class: class.name.clone(),
                    method: method.name.clone(),
                }
                .into());
            }
            self.check_visibility(&class, &method)?;
            let scope = self.method_scope(&class, &method);
            self.dispatch(&method, None, scope, args)
        })
    }

    fn resolve_class(&self, name: &str) -> Result<Rc<ClassEntry>, CallError> {
        let relative = match name.to_ascii_lowercase().as_str() {
            "self" | "static" => self.scope(),
            "parent" => self.scope().and_then(|scope| scope.parent.clone()),
            _ => self.engine().find_class(name),
        };
        relative.ok_or_else(|| CallError::ClassNotFound(name.to_string()))
    }

    /// `new $class(...$args)`: build the native backing through the
    /// construct capability, then run `__construct`.
    pub fn create_object(&self, class: &str, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.user_call(|| {
            let class = self.resolve_class(class)?;
            if !class.flags.is_instantiable() {
                return Err(CallError::CannotInstantiate {
                    class: class.name.clone(),
                    kind: class.kind_name(),
                }
                .into());
            }
            let native = class.capabilities.construct.as_ref().map(|make| make());
            let object = Value::from_object(Object::new(Rc::clone(&class), native));
            if let Some(constructor) = class.find_method("__construct").cloned() {
                self.check_visibility(&class, &constructor)?;
                let scope = self.method_scope(&class, &constructor);
                self.dispatch(&constructor, Some(object.clone()), scope, args)?;
            }
            tracing::trace!(class = %class.name, "created object");
            Ok(object)
        })
    }

    /// `clone $object`, running `__clone` on the copy.
    pub fn clone_object(&self, object: &Value) -> Result<Value, BridgeError> {
        self.user_call(|| {
            let source = object.dereferenced();
            let instance = source
                .object_ref()
                .ok_or_else(|| ValueError::NotAnObject(source.value_type()))?;
            let copy = Value::from_object(instance.duplicate()?);
            let class = Rc::clone(instance.class());
            if let Some(hook) = class.find_method("__clone").cloned() {
                let scope = self.method_scope(&class, &hook);
                self.dispatch(&hook, Some(copy.clone()), scope, Vec::new())?;
            }
            Ok(copy)
        })
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn class_exists(&self, name: &str) -> bool {
        self.engine()
            .find_class(name)
            .is_some_and(|class| !class.is_interface())
    }

    pub fn function_exists(&self, name: &str) -> bool {
        self.engine().find_function(name).is_some()
    }

    /// Whether `value` could be passed to [`call`](Self::call) from the
    /// current scope.
    pub fn is_callable(&self, value: &Value) -> bool {
        let value = value.dereferenced();
        if let Some(callable) = value.callable_ref() {
            return match &*callable {
                Callable::Function(name) => self.function_exists(name),
                Callable::Method { object, method } => self.is_callable_method(object, method),
                Callable::StaticMethod { class, method } => self.is_callable_static(class, method),
                Callable::Native(_) => true,
            };
        }
        if value.is_string() {
            let name = value.string_value();
            return match name.split_once("::") {
                Some((class, method)) => self.is_callable_static(class, method),
                None => self.function_exists(&name),
            };
        }
        if value.is_array() && value.size() == 2 {
            let (target, method) = (value.get(0), value.get(1));
            if !method.is_string() {
                return false;
            }
            return if target.is_object() {
                self.is_callable_method(&target, &method.string_value())
            } else {
                target.is_string()
                    && self.is_callable_static(&target.string_value(), &method.string_value())
            };
        }
        value.is_callable()
    }

    fn is_callable_method(&self, object: &Value, name: &str) -> bool {
        let Some(class) = object.class_entry() else {
            return false;
        };
        match class.find_method(name) {
            Some(method) => !method.is_abstract() && self.check_visibility(&class, method).is_ok(),
            None => class.find_method("__call").is_some(),
        }
    }

    fn is_callable_static(&self, class: &str, name: &str) -> bool {
        let Ok(class) = self.resolve_class(class) else {
            return false;
        };
        match class.find_method(name) {
            Some(method) => {
                method.is_static()
                    && !method.is_abstract()
                    && self.check_visibility(&class, method).is_ok()
            }
            None => class.find_method("__callStatic").is_some(),
        }
    }

    /// Cursor for `foreach ($value as $key => $item)`: the iterator
    /// protocol for traversable objects, visible properties (from the
    /// current scope) for other objects, entries for arrays.
    pub fn iterate(&self, value: &Value) -> ValueIterator {
        let value = value.dereferenced();
        match value.object_ref() {
            Some(object) if object.class().is_subclass_of("Traversable") => {
                ValueIterator::traverse(TraverseCursor::new(self.clone(), object))
            }
            Some(object) => ValueIterator::visible(&object, self.scope()),
            None => value.iter(),
        }
    }

    /// String conversion of an object: the `Stringable` capability, then a
    /// `__toString` method.
    pub fn object_to_string(&self, value: &Value) -> Result<String, BridgeError> {
        let value = value.dereferenced();
        let Some(object) = value.object_ref() else {
            let _precision = self.precision_scope();
            return Ok(value.try_string()?);
        };
        if object.class().capabilities.to_string.is_some() {
            return Ok(object.to_string_value()?);
        }
        if object.class().find_method("__toString").is_some() {
            let result = self.call_method(&value, "__toString", Vec::new())?;
            if !result.is_string() {
                return Err(Exception::new(format!(
                    "{}::__toString(): Return value must be of type string, {} returned",
                    object.class_name(),
                    result.type_name()
                ))
                .with_class("Error")
                .into());
            }
            return Ok(result.string_value());
        }
        Err(ValueError::NotStringable {
            class: object.class_name().to_string(),
        }
        .into())
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Read a property from the current scope. Missing properties read as
    /// null with a warning.
    pub fn property(&self, object: &Value, name: &str) -> Result<Value, BridgeError> {
        let target = object.dereferenced();
        let instance = target
            .object_ref()
            .ok_or_else(|| ValueError::NotAnObject(target.value_type()))?;
        let scope = self.scope();
        match instance.read_property(name, scope.as_deref())? {
            Some(value) => Ok(value),
            None => {
                self.warning(format!("Undefined property: {}::${name}", instance.class_name()));
                Ok(Value::null())
            }
        }
    }

    /// Write a property from the current scope.
    pub fn set_property(
        &self,
        object: &Value,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), BridgeError> {
        let target = object.dereferenced();
        let instance = target
            .object_ref()
            .ok_or_else(|| ValueError::NotAnObject(target.value_type()))?;
        let scope = self.scope();
        instance.write_property(name, value.into().dereferenced(), scope.as_deref())?;
        Ok(())
    }

    /// Static property of `class`, checking visibility from the current
    /// scope.
    pub fn static_property(&self, class: &str, name: &str) -> Result<Value, CallError> {
        let class = self.resolve_class(class)?;
        let (flags, value, declaring) = class
            .static_property(name)
            .ok_or_else(|| CallError::UndefinedConstant(format!("{}::${name}", class.name)))?;
        self.check_static_visibility(&class, name, flags.visibility(), &declaring)?;
        Ok(value)
    }

    pub fn set_static_property(
        &self,
        class: &str,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), CallError> {
        let class = self.resolve_class(class)?;
        let (flags, _, declaring) = class
            .static_property(name)
            .ok_or_else(|| CallError::UndefinedConstant(format!("{}::${name}", class.name)))?;
        self.check_static_visibility(&class, name, flags.visibility(), &declaring)?;
        class.set_static_property(name, value.into().dereferenced());
        Ok(())
    }

    fn check_static_visibility(
        &self,
        class: &ClassEntry,
        name: &str,
        visibility: Visibility,
        declaring: &str,
    ) -> Result<(), CallError> {
        let scope = self.scope();
        let allowed = match visibility {
            Visibility::Public => true,
            Visibility::Protected => scope.as_ref().is_some_and(|scope| {
                scope.is_subclass_of(declaring) || class.is_subclass_of(&scope.name)
            }),
            Visibility::Private => scope.as_ref().is_some_and(|scope| scope.name_is(declaring)),
        };
        if allowed {
            Ok(())
        } else {
            Err(CallError::InaccessibleProperty {
                class: class.name.clone(),
                property: name.to_string(),
                visibility,
            })
        }
    }

    // ========================================================================
    // Constants and ini
    // ========================================================================

    /// A global constant or a `Class::NAME` class constant.
    pub fn constant(&self, name: &str) -> Result<Value, CallError> {
        if let Some((class, constant)) = name.split_once("::") {
            let entry = self.resolve_class(class)?;
            return entry
                .constant(constant)
                .ok_or_else(|| CallError::UndefinedConstant(format!("{}::{constant}", entry.name)));
        }
        let hash = TypeHash::from_constant(name);
        if let Some(value) = self.inner.constants.borrow().get(&hash) {
            return Ok(value.clone());
        }
        self.engine()
            .find_constant(name)
            .ok_or_else(|| CallError::UndefinedConstant(name.to_string()))
    }

    pub fn defined(&self, name: &str) -> bool {
        self.constant(name).is_ok()
    }

    /// `define()`: a request-scoped global constant.
    pub fn define(&self, name: &str, value: impl Into<Value>) -> Result<(), BridgeError> {
        let value = value.into().dereferenced();
        if !(value.is_null() || value.is_scalar()) {
            return Err(ValueError::Conversion {
                from: value.value_type(),
                to: crate::types::Type::String,
            }
            .into());
        }
        if name.contains("::") || self.defined(name) {
            return Err(CallError::ConstantRedefined(name.to_string()).into());
        }
        self.inner
            .constants
            .borrow_mut()
            .insert(TypeHash::from_constant(name), value);
        Ok(())
    }

    /// Current value of an ini directive: the request override, else the
    /// engine value.
    pub fn ini_get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.inner.ini.borrow().get(name) {
            return Some(value.clone());
        }
        self.engine().ini(name).map(|entry| entry.value)
    }

    /// Override a directive for this request. Returns the old value, or
    /// `None` if the directive does not exist or is not user-modifiable.
    pub fn ini_set(&self, name: &str, value: impl Into<String>) -> Option<String> {
        if !self.engine().ini(name)?.user_modifiable {
            self.warning(format!("ini_set(): {name} cannot be changed at runtime"));
            return None;
        }
        let old = self.ini_get(name)?;
        self.inner
            .ini
            .borrow_mut()
            .insert(name.to_string(), value.into());
        Some(old)
    }

    /// Drop the request override of a directive.
    pub fn ini_restore(&self, name: &str) {
        self.inner.ini.borrow_mut().remove(name);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("depth", &self.depth())
            .field("scope", &self.scope().map(|scope| scope.name.clone()))
            .field("pending_exception", &self.pending_exception().is_some())
            .field("fatal", &self.fatal())
            .finish()
    }
}

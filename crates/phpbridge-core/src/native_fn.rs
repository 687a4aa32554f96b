//! Native handler storage and the call context handed to handlers.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::sync::Arc;

use crate::entries::ClassEntry;
use crate::error::{BridgeError, ValueError};
use crate::object::Object;
use crate::request::Request;
use crate::value::{FromValue, Value};

/// Type-erased native handler.
///
/// Every registered function and method is stored as a `NativeFn`
/// regardless of the Rust signature it was registered with; the
/// [`adapter`](crate::adapter) produces one from each supported shape.
/// The callable is shared through an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    pub fn new<F>(f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Run the handler.
    pub fn call(&self, params: &mut Parameters) -> Result<Value, BridgeError> {
        self.inner.call(params)
    }

    /// Whether two handles share the same callable.
    pub fn ptr_eq(&self, other: &NativeFn) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// Trait for callable native handlers.
pub trait NativeCallable {
    fn call(&self, params: &mut Parameters) -> Result<Value, BridgeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut Parameters) -> Result<Value, BridgeError>,
{
    fn call(&self, params: &mut Parameters) -> Result<Value, BridgeError> {
        (self)(params)
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// Arguments of one native call.
///
/// Dereferences to the positional argument slice. By-reference arguments
/// arrive as reference cells, so `params[i].assign(..)` writes back to the
/// caller's variable.
pub struct Parameters {
    args: Vec<Value>,
    this: Option<Value>,
    request: Request,
    function: String,
}

impl Parameters {
    pub fn new(
        request: Request,
        function: impl Into<String>,
        this: Option<Value>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            args,
            this,
            request,
            function: function.into(),
        }
    }

    /// The object a method was called on.
    pub fn this(&self) -> Option<&Value> {
        self.this.as_ref()
    }

    /// The object a method was called on, as an object handle.
    pub fn this_object(&self) -> Result<Rc<Object>, ValueError> {
        self.this
            .as_ref()
            .and_then(Value::object_ref)
            .ok_or(ValueError::NotAnObject(crate::types::Type::Null))
    }

    /// Class of `this`, if any.
    pub fn this_class(&self) -> Option<Rc<ClassEntry>> {
        self.this.as_ref().and_then(Value::class_entry)
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// `Class::method` or the function name.
    pub fn function_name(&self) -> &str {
        &self.function
    }

    /// Argument `index`, null when it was not passed.
    pub fn arg(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Argument `index` converted with [`FromValue`]. Missing arguments
    /// convert from null.
    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, ValueError> {
        match self.args.get(index) {
            Some(value) => T::from_value(value),
            None => T::from_value(&Value::null()),
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.args
    }
}

impl Deref for Parameters {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.args
    }
}

impl DerefMut for Parameters {
    fn deref_mut(&mut self) -> &mut [Value] {
        &mut self.args
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters")
            .field("function", &self.function)
            .field("args", &self.args)
            .field("this", &self.this.as_ref().and_then(Value::class_name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    fn params(args: Vec<Value>) -> Parameters {
        let engine = Rc::new(Engine::new());
        Parameters::new(engine.request(), "test", None, args)
    }

    #[test]
    fn closures_are_native_callables() {
        let handler = NativeFn::new(|params: &mut Parameters| Ok(Value::from(params.len())));
        let mut params = params(vec![Value::from(1), Value::from(2)]);
        assert_eq!(handler.call(&mut params).unwrap(), 2);
        assert!(handler.ptr_eq(&handler.clone()));
    }

    #[test]
    fn typed_access() {
        let params = params(vec![Value::from("42"), Value::from(true)]);
        assert_eq!(params.get::<i64>(0).unwrap(), 42);
        assert!(params.get::<bool>(1).unwrap());
        assert_eq!(params.get::<Option<i64>>(5).unwrap(), None);
        assert!(params.arg(9).is_null());
        assert!(params.this().is_none());
        assert!(params.this_object().is_err());
    }

    #[test]
    fn by_reference_slots_write_through() {
        let mut variable = Value::from(1);
        let mut params = params(vec![variable.reference()]);
        params[0].assign(10);
        assert_eq!(variable, 10);
    }
}

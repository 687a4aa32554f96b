//! Calling-convention adapter.
//!
//! Native code is registered with an ordinary Rust closure or function;
//! the adapter turns each supported shape into a [`NativeFn`]. The set of
//! shapes is closed and selected at compile time through a marker type
//! parameter, so an unsupported signature is a type error rather than a
//! runtime surprise:
//!
//! | Shape | Marker |
//! |-------|--------|
//! | `Fn() -> R` | `fn() -> R` |
//! | `Fn(&mut Parameters) -> R` | `fn(&mut Parameters) -> R` |
//! | `Fn(&T) -> R` | `fn(&T) -> R` |
//! | `Fn(&mut T) -> R` | `fn(&mut T) -> R` |
//! | `Fn(&T, &mut Parameters) -> R` | `fn(&T, &mut Parameters) -> R` |
//! | `Fn(&mut T, &mut Parameters) -> R` | `fn(&mut T, &mut Parameters) -> R` |
//!
//! `R` is anything implementing [`IntoReturn`]: `()`, [`Value`], the common
//! primitives, `Option` of those, or `Result<R, E>` with `E:
//! Into<BridgeError>`.
//!
//! Closures taking [`Parameters`] need the argument type written out
//! (`|params: &mut Parameters| ...`) so the shape can be picked.

use std::marker::PhantomData;

use crate::error::BridgeError;
use crate::native_fn::{NativeFn, Parameters};
use crate::value::Value;

// ============================================================================
// Return values
// ============================================================================

/// Conversion of a handler's return value.
pub trait IntoReturn {
    fn into_return(self) -> Result<Value, BridgeError>;
}

impl IntoReturn for () {
    fn into_return(self) -> Result<Value, BridgeError> {
        Ok(Value::null())
    }
}

macro_rules! impl_into_return {
    ($($ty:ty),*) => {
        $(
            impl IntoReturn for $ty {
                fn into_return(self) -> Result<Value, BridgeError> {
                    Ok(Value::from(self))
                }
            }

            impl IntoReturn for Option<$ty> {
                fn into_return(self) -> Result<Value, BridgeError> {
                    Ok(Value::from(self))
                }
            }
        )*
    };
}

impl_into_return!(
    Value, bool, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize, f32, f64, String, &'static str
);

impl<T: Into<Value>> IntoReturn for Vec<T> {
    fn into_return(self) -> Result<Value, BridgeError> {
        Ok(Value::from(self))
    }
}

impl<R, E> IntoReturn for Result<R, E>
where
    R: IntoReturn,
    E: Into<BridgeError>,
{
    fn into_return(self) -> Result<Value, BridgeError> {
        self.map_err(Into::into)?.into_return()
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// A Rust callable usable as a free function or static method.
pub trait IntoFunction<Marker> {
    fn into_native(self) -> NativeFn;
}

impl<F, R> IntoFunction<fn() -> R> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoReturn,
{
    fn into_native(self) -> NativeFn {
        NativeFn::new(move |_: &mut Parameters| self().into_return())
    }
}

impl<F, R> IntoFunction<fn(&mut Parameters) -> R> for F
where
    F: Fn(&mut Parameters) -> R + Send + Sync + 'static,
    R: IntoReturn,
{
    fn into_native(self) -> NativeFn {
        NativeFn::new(move |params: &mut Parameters| self(params).into_return())
    }
}

/// Pass-through for handlers that are already type-erased.
impl IntoFunction<NativeFn> for NativeFn {
    fn into_native(self) -> NativeFn {
        self
    }
}

// ============================================================================
// Methods
// ============================================================================

/// A Rust callable usable as an instance method of a class backed by `T`.
///
/// The handler borrows the native backing of `$this` for the duration of
/// the call. A re-entrant call that needs a conflicting borrow fails with
/// [`ValueError::Busy`](crate::ValueError::Busy).
pub trait IntoMethod<T, Marker> {
    fn into_native(self) -> NativeFn;
}

/// Marker carrying the backing type for method shapes.
pub struct MethodMarker<T, F>(PhantomData<fn(T) -> F>);

impl<T, F, R> IntoMethod<T, MethodMarker<T, fn(&T) -> R>> for F
where
    T: 'static,
    F: Fn(&T) -> R + Send + Sync + 'static,
    R: IntoReturn,
{
    fn into_native(self) -> NativeFn {
        NativeFn::new(move |params: &mut Parameters| {
            let this = params.this_object()?;
            let result = {
                let native = this.native::<T>()?;
                self(&*native)
            };
            result.into_return()
        })
    }
}

impl<T, F, R> IntoMethod<T, MethodMarker<T, fn(&mut T) -> R>> for F
where
    T: 'static,
    F: Fn(&mut T) -> R + Send + Sync + 'static,
    R: IntoReturn,
{
    fn into_native(self) -> NativeFn {
        NativeFn::new(move |params: &mut Parameters| {
            let this = params.this_object()?;
            let result = {
                let mut native = this.native_mut::<T>()?;
                self(&mut *native)
            };
            result.into_return()
        })
    }
}

impl<T, F, R> IntoMethod<T, MethodMarker<T, fn(&T, &mut Parameters) -> R>> for F
where
    T: 'static,
    F: Fn(&T, &mut Parameters) -> R + Send + Sync + 'static,
    R: IntoReturn,
{
    fn into_native(self) -> NativeFn {
        NativeFn::new(move |params: &mut Parameters| {
            let this = params.this_object()?;
            let result = {
                let native = this.native::<T>()?;
                self(&*native, params)
            };
            result.into_return()
        })
    }
}

impl<T, F, R> IntoMethod<T, MethodMarker<T, fn(&mut T, &mut Parameters) -> R>> for F
where
    T: 'static,
    F: Fn(&mut T, &mut Parameters) -> R + Send + Sync + 'static,
    R: IntoReturn,
{
    fn into_native(self) -> NativeFn {
        NativeFn::new(move |params: &mut Parameters| {
            let this = params.this_object()?;
            let result = {
                let mut native = this.native_mut::<T>()?;
                self(&mut *native, params)
            };
            result.into_return()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::engine::Engine;
    use crate::entries::{ClassDefinition, ClassEntry};
    use crate::error::ValueError;
    use crate::object::Object;

    #[derive(Default)]
    struct Counter {
        count: i64,
    }

    impl Counter {
        fn value(&self) -> i64 {
            self.count
        }

        fn increment(&mut self) {
            self.count += 1;
        }
    }

    fn call_function<M>(f: impl IntoFunction<M>, args: Vec<Value>) -> Result<Value, BridgeError> {
        let engine = Rc::new(Engine::new());
        let mut params = Parameters::new(engine.request(), "f", None, args);
        f.into_native().call(&mut params)
    }

    fn call_method<M>(f: impl IntoMethod<Counter, M>, this: &Value) -> Result<Value, BridgeError> {
        let engine = Rc::new(Engine::new());
        let mut params = Parameters::new(
            engine.request(),
            "Counter::m",
            Some(this.clone()),
            Vec::new(),
        );
        f.into_native().call(&mut params)
    }

    fn counter() -> Value {
        let definition = ClassDefinition::new("Counter");
        let class = Rc::new(ClassEntry::resolve(definition, None, Vec::new()).unwrap());
        Value::from_object(Object::new(class, Some(Box::new(Counter::default()))))
    }

    // ========================================================================
    // Function shapes
    // ========================================================================

    #[test]
    fn no_argument_shape() {
        assert_eq!(call_function(|| 42, vec![]).unwrap(), 42);
        assert!(call_function(|| (), vec![]).unwrap().is_null());
        assert_eq!(call_function(|| "text", vec![]).unwrap(), "text");
    }

    #[test]
    fn parameters_shape() {
        let sum = |params: &mut Parameters| -> Result<i64, ValueError> {
            Ok(params.get::<i64>(0)? + params.get::<i64>(1)?)
        };
        assert_eq!(
            call_function(sum, vec![Value::from(2), Value::from("3")]).unwrap(),
            5
        );
        let err = call_function(sum, vec![Value::array(), Value::from(1)]).unwrap_err();
        assert!(err.is_value());
    }

    #[test]
    fn option_returns_null() {
        assert!(call_function(|| None::<i64>, vec![]).unwrap().is_null());
    }

    // ========================================================================
    // Method shapes
    // ========================================================================

    #[test]
    fn shared_and_exclusive_method_shapes() {
        let this = counter();
        call_method(Counter::increment, &this).unwrap();
        call_method(Counter::increment, &this).unwrap();
        assert_eq!(call_method(Counter::value, &this).unwrap(), 2);
    }

    #[test]
    fn method_shapes_with_parameters() {
        let this = counter();
        let add = |counter: &mut Counter, params: &mut Parameters| {
            counter.count += params.len() as i64;
        };
        let engine = Rc::new(Engine::new());
        let mut params = Parameters::new(
            engine.request(),
            "Counter::add",
            Some(this.clone()),
            vec![Value::null(), Value::null()],
        );
        IntoMethod::<Counter, _>::into_native(add)
            .call(&mut params)
            .unwrap();
        assert_eq!(call_method(Counter::value, &this).unwrap(), 2);
    }

    #[test]
    fn method_without_backing_is_an_error() {
        let err = call_method(Counter::value, &Value::object()).unwrap_err();
        assert!(matches!(err, BridgeError::Value(ValueError::NoBacking { .. })));
    }
}

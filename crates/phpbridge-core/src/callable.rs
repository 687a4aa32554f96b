//! Callable values.

use std::fmt;

use crate::adapter::IntoFunction;
use crate::native_fn::NativeFn;
use crate::value::Value;

/// Something the host can call.
///
/// Strings (`"strlen"`, `"Class::method"`) and `[object, "method"]` arrays
/// are callable too; [`Request::call`](crate::Request::call) accepts all
/// of them. This type is the explicit form.
#[derive(Clone)]
pub enum Callable {
    Function(String),
    Method { object: Value, method: String },
    StaticMethod { class: String, method: String },
    Native(NativeFn),
}

impl Callable {
    pub fn function(name: impl Into<String>) -> Self {
        Callable::Function(name.into())
    }

    pub fn method(object: Value, method: impl Into<String>) -> Self {
        Callable::Method {
            object,
            method: method.into(),
        }
    }

    pub fn static_method(class: impl Into<String>, method: impl Into<String>) -> Self {
        Callable::StaticMethod {
            class: class.into(),
            method: method.into(),
        }
    }

    /// A closure in any of the free-function shapes.
    pub fn native<M>(f: impl IntoFunction<M>) -> Self {
        Callable::Native(f.into_native())
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(name) => f.write_str(name),
            Callable::Method { object, method } => write!(
                f,
                "{}::{method}",
                object.class_name().unwrap_or_else(|| object.type_name())
            ),
            Callable::StaticMethod { class, method } => write!(f, "{class}::{method}"),
            Callable::Native(_) => f.write_str("Closure"),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Native(_) => f.write_str("Closure"),
            other => write!(f, "{other}"),
        }
    }
}

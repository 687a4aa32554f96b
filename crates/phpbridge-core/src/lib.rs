//! Core types for phpbridge.
//!
//! This crate holds everything the extension-facing registry builds on:
//!
//! - [`Value`] - The variant value with copy-on-write arrays, handle-shared
//!   objects and explicit reference cells
//! - [`HashTable`] and the [`cursor`] module - Ordered arrays and the cursors
//!   that walk arrays and objects
//! - [`entries`] - Class, function, property and constant descriptors
//! - [`Engine`] and [`Request`] - The host model: materialized tables,
//!   request state, dispatch and the exception boundary
//! - [`adapter`] - The closed set of Rust signatures a native handler may
//!   have, turned into [`NativeFn`]
//! - [`error`] - The error hierarchy
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use phpbridge_core::{
//!     Argument, Engine, FunctionEntry, IntoFunction, Parameters, Type, ValueError,
//! };
//!
//! let double = |params: &mut Parameters| -> Result<i64, ValueError> {
//!     Ok(params.get::<i64>(0)? * 2)
//! };
//! let engine = Rc::new(Engine::new());
//! engine
//!     .declare_function(
//!         FunctionEntry::new("double", double.into_native())
//!             .with_arguments([Argument::by_val("x").of_type(Type::Numeric)]),
//!     )
//!     .unwrap();
//!
//! let request = engine.request();
//! let result = request.call_function("double", vec!["21".into()]).unwrap();
//! assert_eq!(result, 42);
//! ```

pub mod adapter;
pub mod argument;
pub mod array;
pub mod callable;
pub mod capabilities;
pub mod cursor;
pub mod engine;
pub mod entries;
pub mod error;
pub mod exception;
pub mod modifiers;
pub mod native_fn;
pub mod numeric;
pub mod object;
pub mod request;
pub mod type_hash;
pub mod types;
pub mod value;

pub use adapter::{IntoFunction, IntoMethod, IntoReturn};
pub use argument::Argument;
pub use array::{ArrayKey, HashTable};
pub use callable::Callable;
pub use capabilities::{
    ArrayAccess, ClassCapabilities, Comparable, Countable, ObjectIterator, Traversable,
};
pub use cursor::{Cursor, CursorKind, CursorState, ValueIterator};
pub use engine::{Callback, Engine, EngineProperty, IniEntry};
pub use entries::{ClassDefinition, ClassEntry, ConstantEntry, FunctionEntry, PropertyEntry};
pub use error::{BridgeError, CallError, RegistrationError, ValueError};
pub use exception::{Exception, FatalError, HostException};
pub use modifiers::{ClassFlags, MemberFlags, Visibility};
pub use native_fn::{NativeCallable, NativeFn, Parameters};
pub use object::{Object, Resource};
pub use request::{Diagnostic, Level, Request, Superglobal};
pub use type_hash::TypeHash;
pub use types::Type;
pub use value::{FromValue, Value};

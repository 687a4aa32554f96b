//! phpbridge: expose native Rust functions and classes to a PHP-style engine.
//!
//! The workspace is split in two:
//!
//! - [`core`] (`phpbridge-core`) - Values, arrays, objects, cursors, the
//!   engine model, requests and the calling-convention adapter
//! - [`registry`] (`phpbridge-registry`) - The descriptors an extension
//!   author writes: classes, interfaces, namespaces, functions, constants,
//!   ini directives and the extension itself
//!
//! Most code only needs the [`prelude`].
//!
//! ```
//! use std::rc::Rc;
//!
//! use phpbridge::prelude::*;
//!
//! #[derive(Default)]
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! # fn main() -> Result<(), BridgeError> {
//! let mut extension = Extension::new("greeter", "1.0");
//! extension.add_class(
//!     Class::<Greeter>::new("Greeter")
//!         .method(
//!             "__construct",
//!             |greeter: &mut Greeter, params: &mut Parameters| {
//!                 greeter.greeting = params.arg(0).string_value();
//!             },
//!             [Argument::by_val("greeting").of_type(Type::String)],
//!         )
//!         .method(
//!             "greet",
//!             |greeter: &Greeter, params: &mut Parameters| {
//!                 format!("{}, {}!", greeter.greeting, params.arg(0).string_value())
//!             },
//!             [Argument::by_val("name").of_type(Type::String)],
//!         ),
//! )?;
//!
//! let engine = Rc::new(Engine::new());
//! extension.initialize(&engine)?;
//!
//! let request = engine.request();
//! let greeter = request.create_object("Greeter", vec!["Hello".into()])?;
//! let greeting = request.call_method(&greeter, "greet", vec!["world".into()])?;
//! assert_eq!(greeting, "Hello, world!");
//! # Ok(())
//! # }
//! ```

pub use phpbridge_core as core;
pub use phpbridge_registry as registry;

pub mod prelude {
    pub use phpbridge_core::{
        Argument, ArrayAccess, ArrayKey, BridgeError, CallError, Callable, Comparable, Countable,
        Cursor, CursorKind, CursorState, Diagnostic, Engine, EngineProperty, Exception,
        FatalError, FromValue, HashTable, HostException, IntoFunction, IntoMethod, Level,
        MemberFlags, ObjectIterator, Parameters, RegistrationError, Request, Superglobal,
        Traversable, Type, Value, ValueError, ValueIterator, Visibility,
    };
    pub use phpbridge_registry::{Class, Constant, Extension, Function, Ini, Interface, Namespace};
}

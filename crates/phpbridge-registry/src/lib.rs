//! Extension descriptors for phpbridge.
//!
//! Extension authors describe what they expose, then materialize it into
//! an [`Engine`](phpbridge_core::Engine):
//!
//! ```text
//! Class / Interface / Function / Constant / Ini
//!     -> Namespace -> Extension::initialize() -> Engine
//! ```
//!
//! Member-level checks run as descriptors are added; checks that need the
//! whole class hierarchy run during [`Extension::initialize`].

mod class;
mod constant;
mod extension;
mod function;
mod ini;
mod interface;
mod namespace;

pub use class::Class;
pub use constant::Constant;
pub use extension::Extension;
pub use function::Function;
pub use ini::{Ini, IniValue};
pub use interface::Interface;
pub use namespace::Namespace;

/// `name` inside `namespace`; the global namespace is empty.
pub(crate) fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}\\{name}")
    }
}

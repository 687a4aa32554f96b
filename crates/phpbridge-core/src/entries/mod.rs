//! Engine table entries.
//!
//! - [`ClassDefinition`] - Unresolved class or interface, as built by an
//!   extension (parent and interfaces by name)
//! - [`ClassEntry`] - Materialized class with resolved parent, flattened
//!   method table and capabilities
//! - [`FunctionEntry`] - Function or method with its argument descriptors
//!   and native handler
//! - [`PropertyEntry`], [`ConstantEntry`] - Member types

mod class;
mod common;
mod function;

pub use class::{ClassDefinition, ClassEntry, is_valid_name};
pub use common::{ConstantEntry, PropertyEntry};
pub use function::FunctionEntry;

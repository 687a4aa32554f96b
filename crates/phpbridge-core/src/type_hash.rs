//! Deterministic, case-insensitive identity for classes, functions and methods.
//!
//! The host language treats class, function and method names case-insensitively
//! and ignores a leading namespace separator, so `\Foo\Bar`, `foo\bar` and
//! `FOO\BAR` must all resolve to the same entry. [`TypeHash`] folds the name
//! once and hashes it with XXHash64, which gives the engine tables a single
//! `u64` key instead of a lower-cased `String` per lookup.
//!
//! # Examples
//!
//! ```
//! use phpbridge_core::TypeHash;
//!
//! assert_eq!(TypeHash::from_class("\\App\\Counter"), TypeHash::from_class("app\\counter"));
//! assert_ne!(TypeHash::from_class("strlen"), TypeHash::from_function("strlen"));
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain markers so a class and a function with the same name never collide.
pub mod hash_constants {
    /// Domain marker for class, interface and trait names.
    pub const CLASS: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for free functions.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for methods (combined with the owning class).
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for global constants. Constants are case-sensitive.
    pub const CONSTANT: u64 = 0x1a095090689d4647;
}

/// A 64-bit hash identifying a class, function, method or constant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash a class (or interface) name.
    pub fn from_class(name: &str) -> Self {
        Self(xxh64(fold(name).as_bytes(), hash_constants::CLASS))
    }

    /// Hash a free function name.
    pub fn from_function(name: &str) -> Self {
        Self(xxh64(fold(name).as_bytes(), hash_constants::FUNCTION))
    }

    /// Hash a method name. Methods are keyed per class, so the class hash is
    /// not mixed in here; the per-class table already scopes it.
    pub fn from_method(name: &str) -> Self {
        Self(xxh64(fold(name).as_bytes(), hash_constants::METHOD))
    }

    /// Hash a global constant name (case-sensitive, leading `\` ignored).
    pub fn from_constant(name: &str) -> Self {
        let trimmed = name.strip_prefix('\\').unwrap_or(name);
        Self(xxh64(trimmed.as_bytes(), hash_constants::CONSTANT))
    }

    /// Check if this is the empty hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

fn fold(name: &str) -> String {
    name.strip_prefix('\\').unwrap_or(name).to_ascii_lowercase()
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_hash_ignores_case_and_leading_separator() {
        let a = TypeHash::from_class("\\App\\Counter");
        let b = TypeHash::from_class("APP\\counter");
        assert_eq!(a, b);
    }

    #[test]
    fn domains_do_not_collide() {
        assert_ne!(
            TypeHash::from_class("count"),
            TypeHash::from_function("count")
        );
        assert_ne!(
            TypeHash::from_function("count"),
            TypeHash::from_method("count")
        );
    }

    #[test]
    fn constants_are_case_sensitive() {
        assert_ne!(
            TypeHash::from_constant("FOO"),
            TypeHash::from_constant("foo")
        );
        assert_eq!(
            TypeHash::from_constant("\\FOO"),
            TypeHash::from_constant("FOO")
        );
    }

    #[test]
    fn empty_hash() {
        assert!(TypeHash::EMPTY.is_empty());
        assert!(!TypeHash::from_class("stdClass").is_empty());
    }
}

//! Value type discriminant.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The discriminant of a [`Value`](crate::Value).
///
/// Numbering follows the host's public type constants. `Numeric` is the
/// integer type. In an [`Argument`](crate::Argument) descriptor `Null` means
/// "any type is accepted".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Type {
    #[default]
    Null = 0,
    Numeric = 1,
    Float = 2,
    Bool = 3,
    Array = 4,
    Object = 5,
    String = 6,
    Resource = 7,
    Callable = 10,
}

impl Type {
    /// Name as the host prints it in type errors.
    pub fn name(self) -> &'static str {
        match self {
            Type::Null => "null",
            Type::Numeric => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::Array => "array",
            Type::Object => "object",
            Type::String => "string",
            Type::Resource => "resource",
            Type::Callable => "callable",
        }
    }

    /// Whether this is one of the scalar types.
    pub fn is_scalar(self) -> bool {
        matches!(
            self,
            Type::Numeric | Type::Float | Type::Bool | Type::String
        )
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_round_trip_through_u8() {
        assert_eq!(u8::from(Type::Callable), 10);
        assert_eq!(Type::try_from(6u8), Ok(Type::String));
        assert!(Type::try_from(8u8).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(Type::Numeric.to_string(), "int");
        assert!(Type::String.is_scalar());
        assert!(!Type::Array.is_scalar());
    }
}

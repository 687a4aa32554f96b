//! Argument descriptors and call-time validation.
//!
//! Each function or method carries a list of [`Argument`]s. Before a native
//! handler runs, [`validate`] checks the argument count, applies the host's
//! weak-mode scalar juggling (unless the `StrictTypes` engine property is
//! set) and enforces class, nullability and by-reference constraints.

use std::fmt;

use crate::engine::EngineProperty;
use crate::entries::FunctionEntry;
use crate::error::CallError;
use crate::numeric::{self, Numericity};
use crate::request::Request;
use crate::types::Type;
use crate::value::Value;

/// Descriptor of one parameter.
///
/// ```
/// use phpbridge_core::{Argument, Type};
///
/// let name = Argument::by_val("name").of_type(Type::String);
/// let out = Argument::by_ref("result").optional();
/// assert!(name.is_required());
/// assert!(out.is_by_ref());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Argument {
    name: String,
    ty: Type,
    class: Option<String>,
    nullable: bool,
    required: bool,
    by_ref: bool,
}

impl Argument {
    /// A by-value parameter accepting any type.
    pub fn by_val(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Type::Null,
            class: None,
            nullable: false,
            required: true,
            by_ref: false,
        }
    }

    /// A by-reference parameter. Callers must pass a reference cell.
    pub fn by_ref(name: impl Into<String>) -> Self {
        Self {
            by_ref: true,
            ..Self::by_val(name)
        }
    }

    pub fn of_type(mut self, ty: Type) -> Self {
        self.ty = ty;
        self
    }

    /// Require an instance of `class` (implies [`Type::Object`]).
    pub fn of_class(mut self, class: impl Into<String>) -> Self {
        self.ty = Type::Object;
        self.class = Some(class.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_by_ref(&self) -> bool {
        self.by_ref
    }

    /// Declared type as the host prints it (`?int`, `Countable`, `mixed`).
    pub fn type_label(&self) -> String {
        let base = match &self.class {
            Some(class) => class.clone(),
            None if self.ty == Type::Null => return "mixed".to_string(),
            None => self.ty.name().to_string(),
        };
        if self.nullable {
            format!("?{base}")
        } else {
            base
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} ${}{}",
            self.type_label(),
            if self.by_ref { " &" } else { "" },
            self.name,
            if self.required { "" } else { " = ?" }
        )
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validate and coerce `args` for a call to `function`.
///
/// Extra arguments beyond the descriptors pass through untouched.
#[cfg_attr(feature = "profiling", profiling::function)]
pub(crate) fn validate(
    request: &Request,
    function: &FunctionEntry,
    args: Vec<Value>,
) -> Result<Vec<Value>, CallError> {
    let required = function.required_arguments();
    if args.len() < required {
        return Err(CallError::ArgumentCount {
            function: function.qualified_name(),
            required,
            given: args.len(),
        });
    }

    let strict = request.engine().property(EngineProperty::StrictTypes) != 0;
    args.into_iter()
        .enumerate()
        .map(|(index, value)| match function.arguments.get(index) {
            Some(argument) => accept(request, function, argument, index + 1, value, strict),
            None => Ok(value),
        })
        .collect()
}

fn accept(
    request: &Request,
    function: &FunctionEntry,
    argument: &Argument,
    position: usize,
    value: Value,
    strict: bool,
) -> Result<Value, CallError> {
    if argument.by_ref {
        if !value.is_reference() {
            return Err(CallError::NotAReference {
                function: function.qualified_name(),
                position,
                name: argument.name.clone(),
            });
        }
        check_type(request, argument, &value.dereferenced(), false)
            .map_err(|given| mismatch(function, argument, position, given))?;
        return Ok(value);
    }

    let value = value.dereferenced();
    check_type(request, argument, &value, strict)
        .map_err(|given| mismatch(function, argument, position, given))
}

fn mismatch(
    function: &FunctionEntry,
    argument: &Argument,
    position: usize,
    given: String,
) -> CallError {
    CallError::ArgumentType {
        function: function.qualified_name(),
        position,
        name: argument.name.clone(),
        expected: argument.type_label(),
        given,
    }
}

/// Coerced value, or the type name that was rejected.
fn check_type(
    request: &Request,
    argument: &Argument,
    value: &Value,
    strict: bool,
) -> Result<Value, String> {
    let given = || value.type_name();
    if argument.ty == Type::Null && argument.class.is_none() {
        return Ok(value.clone());
    }
    if value.is_null() {
        return if argument.nullable {
            Ok(Value::null())
        } else {
            Err(given())
        };
    }
    if let Some(class) = &argument.class {
        return if value.instance_of(class) {
            Ok(value.clone())
        } else {
            Err(given())
        };
    }

    let weak = !strict;
    match argument.ty {
        Type::Numeric => match value.value_type() {
            Type::Numeric => Ok(value.clone()),
            Type::Float if weak => float_to_int(request, value.float_value()).ok_or_else(given),
            Type::Bool if weak => Ok(Value::from(value.numeric_value())),
            Type::String if weak => match numeric::classify(&value.byte_value()) {
                Numericity::Numeric(number) => match number {
                    numeric::Number::Long(v) => Ok(Value::from(v)),
                    numeric::Number::Double(v) => float_to_int(request, v).ok_or_else(given),
                },
                Numericity::Leading(number) => {
                    request.warning("A non-numeric value encountered");
                    match number {
                        numeric::Number::Long(v) => Ok(Value::from(v)),
                        numeric::Number::Double(v) => float_to_int(request, v).ok_or_else(given),
                    }
                }
                Numericity::NonNumeric => Err(given()),
            },
            _ => Err(given()),
        },
        Type::Float => match value.value_type() {
            Type::Float => Ok(value.clone()),
            Type::Numeric => Ok(Value::from(value.float_value())),
            Type::Bool if weak => Ok(Value::from(value.float_value())),
            Type::String if weak => match numeric::classify(&value.byte_value()) {
                Numericity::Numeric(number) => Ok(Value::from(number.as_f64())),
                Numericity::Leading(number) => {
                    request.warning("A non-numeric value encountered");
                    Ok(Value::from(number.as_f64()))
                }
                Numericity::NonNumeric => Err(given()),
            },
            _ => Err(given()),
        },
        Type::Bool => match value.value_type() {
            Type::Bool => Ok(value.clone()),
            Type::Numeric | Type::Float | Type::String if weak => {
                Ok(Value::from(value.bool_value()))
            }
            _ => Err(given()),
        },
        Type::String => match value.value_type() {
            Type::String => Ok(value.clone()),
            Type::Numeric | Type::Float | Type::Bool if weak => {
                Ok(Value::from(value.string_value()))
            }
            Type::Object if weak => request
                .object_to_string(value)
                .map(Value::from)
                .map_err(|_| given()),
            _ => Err(given()),
        },
        Type::Callable => {
            if request.is_callable(value) {
                Ok(value.clone())
            } else {
                Err(given())
            }
        }
        expected => {
            if value.value_type() == expected {
                Ok(value.clone())
            } else {
                Err(given())
            }
        }
    }
}

/// Weak-mode float to int: integral values convert silently, fractional
/// ones with a deprecation, non-finite or out-of-range ones are rejected.
fn float_to_int(request: &Request, value: f64) -> Option<Value> {
    if !value.is_finite() || value < i64::MIN as f64 || value >= i64::MAX as f64 {
        return None;
    }
    if value.fract() != 0.0 {
        request.deprecated(&format!(
            "Implicit conversion from float {} to int loses precision",
            numeric::format_double(value, 17)
        ));
    }
    Some(Value::from(value as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_flags() {
        let argument = Argument::by_ref("out")
            .of_class("Countable")
            .nullable()
            .optional();
        assert!(argument.is_by_ref());
        assert!(!argument.is_required());
        assert_eq!(argument.ty(), Type::Object);
        assert_eq!(argument.class_name(), Some("Countable"));
        assert_eq!(argument.type_label(), "?Countable");
    }

    #[test]
    fn type_labels() {
        assert_eq!(Argument::by_val("x").type_label(), "mixed");
        assert_eq!(
            Argument::by_val("x").of_type(Type::Numeric).type_label(),
            "int"
        );
        assert_eq!(
            Argument::by_val("x")
                .of_type(Type::String)
                .nullable()
                .type_label(),
            "?string"
        );
    }

    #[test]
    fn debug_shows_signature() {
        let argument = Argument::by_val("count").of_type(Type::Numeric).optional();
        assert_eq!(format!("{argument:?}"), "int $count = ?");
    }
}

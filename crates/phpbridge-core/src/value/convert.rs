//! Type juggling.
//!
//! The silent conversions (`bool_value`, `numeric_value`, `float_value`,
//! `string_value`) follow the host's loose rules and never fail. The
//! [`FromValue`] conversions are the explicit casts: they accept exactly the
//! coercions the host performs without complaint (numeric strings to
//! numbers, integral floats to integers, scalars to strings) and report
//! everything else as a [`ValueError`].
//!
//! | from \ to      | bool | int | float | string |
//! |----------------|------|-----|-------|--------|
//! | numeric string | ok   | ok  | ok    | ok     |
//! | other string   | ok   | err | err   | ok     |
//! | array          | ok   | err | err   | err    |
//! | object         | ok   | err | err   | only with a string capability |

use std::cell::Cell;
use std::rc::Rc;

use crate::array::ArrayKey;
use crate::error::ValueError;
use crate::numeric::{self, Number};
use crate::types::Type;

use super::{Value, Zval};

thread_local! {
    static PRECISION: Cell<usize> = const { Cell::new(14) };
}

/// Float-to-string precision of the innermost native frame.
///
/// Installed on entry to a frame and restored when the guard drops, so
/// nested calls into another engine see that engine's setting and values
/// converted outside any frame use the default of 14 digits.
pub(crate) struct PrecisionScope {
    previous: usize,
}

impl PrecisionScope {
    pub(crate) fn enter(precision: usize) -> Self {
        Self {
            previous: PRECISION.with(|p| p.replace(precision)),
        }
    }
}

impl Drop for PrecisionScope {
    fn drop(&mut self) {
        PRECISION.with(|p| p.set(self.previous));
    }
}

fn precision() -> usize {
    PRECISION.with(Cell::get)
}

// ============================================================================
// Silent conversions
// ============================================================================

impl Value {
    /// Truthiness: `""`, `"0"`, `0`, `0.0`, null, `false` and the empty
    /// array are false.
    pub fn bool_value(&self) -> bool {
        match &self.resolve().zval {
            Zval::Null => false,
            Zval::Bool(v) => *v,
            Zval::Long(v) => *v != 0,
            Zval::Double(v) => *v != 0.0,
            Zval::String(bytes) => !(bytes.is_empty() || &**bytes == b"0"),
            Zval::Array(table) => !table.is_empty(),
            Zval::Object(_) | Zval::Resource(_) | Zval::Callable(_) => true,
            Zval::Reference(_) => false,
        }
    }

    /// Integer value. Strings use their leading numeric prefix, floats are
    /// truncated, arrays are 0 or 1, resources yield their id.
    pub fn numeric_value(&self) -> i64 {
        match &self.resolve().zval {
            Zval::Null | Zval::Reference(_) => 0,
            Zval::Bool(v) => *v as i64,
            Zval::Long(v) => *v,
            Zval::Double(v) => numeric::double_to_long(*v),
            Zval::String(bytes) => match numeric::leading_number(bytes) {
                Number::Long(v) => v,
                Number::Double(v) => numeric::double_to_long(v),
            },
            Zval::Array(table) => !table.is_empty() as i64,
            Zval::Object(_) | Zval::Callable(_) => 1,
            Zval::Resource(resource) => resource.id(),
        }
    }

    pub fn float_value(&self) -> f64 {
        match &self.resolve().zval {
            Zval::Double(v) => *v,
            Zval::String(bytes) => numeric::leading_number(bytes).as_f64(),
            _ => self.numeric_value() as f64,
        }
    }

    /// Number for arithmetic: integers stay integers, strings use their
    /// leading numeric prefix.
    pub fn number_value(&self) -> Number {
        match &self.resolve().zval {
            Zval::Double(v) => Number::Double(*v),
            Zval::String(bytes) => numeric::leading_number(bytes),
            _ => Number::Long(self.numeric_value()),
        }
    }

    /// String value, lossily decoded as UTF-8. Arrays become `"Array"`;
    /// objects without a string capability become an empty string with a
    /// warning. Use [`try_string`](Self::try_string) to get those reported.
    pub fn string_value(&self) -> String {
        match self.try_string() {
            Ok(s) => s,
            Err(ValueError::Conversion { from: Type::Array, .. }) => {
                tracing::warn!("Array to string conversion");
                "Array".to_string()
            }
            Err(err) => {
                tracing::warn!("{err}");
                String::new()
            }
        }
    }

    /// Raw bytes of the string conversion.
    pub fn byte_value(&self) -> Vec<u8> {
        match &self.resolve().zval {
            Zval::String(bytes) => bytes.to_vec(),
            _ => self.string_value().into_bytes(),
        }
    }

    /// String conversion that reports arrays and non-stringable objects.
    pub fn try_string(&self) -> Result<String, ValueError> {
        match &self.resolve().zval {
            Zval::Null | Zval::Reference(_) => Ok(String::new()),
            Zval::Bool(v) => Ok(if *v { "1" } else { "" }.to_string()),
            Zval::Long(v) => Ok(v.to_string()),
            Zval::Double(v) => Ok(numeric::format_double(*v, precision())),
            Zval::String(bytes) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Zval::Array(_) => Err(ValueError::Conversion {
                from: Type::Array,
                to: Type::String,
            }),
            Zval::Object(object) => object.to_string_value(),
            Zval::Resource(resource) => Ok(format!("Resource id #{}", resource.id())),
            Zval::Callable(callable) => Ok(callable.to_string()),
        }
    }

    /// Convert in place to another type.
    pub fn set_type(&mut self, ty: Type) -> Result<(), ValueError> {
        self.modify(|slot| {
            let converted = slot.converted(ty)?;
            *slot = converted;
            Ok(())
        })
    }

    fn converted(&self, ty: Type) -> Result<Value, ValueError> {
        if self.value_type() == ty {
            return Ok(self.clone());
        }
        Ok(match ty {
            Type::Null => Value::null(),
            Type::Bool => Value::from(self.bool_value()),
            Type::Numeric => Value::from(self.numeric_value()),
            Type::Float => Value::from(self.float_value()),
            Type::String => Value::from(self.try_string()?),
            Type::Array => match &self.resolve().zval {
                Zval::Null => Value::array(),
                Zval::Object(object) => Value::from_table((*object.properties()).clone()),
                _ => {
                    let mut array = Value::array();
                    array.push(self.clone())?;
                    array
                }
            },
            Type::Object => {
                let object = Value::object();
                match &self.resolve().zval {
                    Zval::Null => {}
                    Zval::Array(table) => {
                        for (key, value) in table.iter() {
                            object.set_property(&key.to_string(), value.clone())?;
                        }
                    }
                    _ => object.set_property("scalar", self.clone())?,
                }
                object
            }
            Type::Resource | Type::Callable => {
                return Err(ValueError::Conversion {
                    from: self.value_type(),
                    to: ty,
                });
            }
        })
    }

    /// Normalize this value into an array key.
    pub fn to_array_key(&self) -> Result<ArrayKey, ValueError> {
        match &self.resolve().zval {
            Zval::Null | Zval::Reference(_) => Ok(ArrayKey::Str(Rc::from(""))),
            Zval::Bool(v) => Ok(ArrayKey::Int(*v as i64)),
            Zval::Long(v) => Ok(ArrayKey::Int(*v)),
            Zval::Double(v) => Ok(ArrayKey::Int(numeric::double_to_long(*v))),
            Zval::String(bytes) => Ok(ArrayKey::from_str_key(&String::from_utf8_lossy(bytes))),
            Zval::Resource(resource) => Ok(ArrayKey::Int(resource.id())),
            other => Err(ValueError::IllegalOffset(super::zval_type(other))),
        }
    }
}

impl From<&Value> for ArrayKey {
    /// Lossy key conversion; illegal offsets become the empty string key.
    fn from(value: &Value) -> Self {
        value
            .to_array_key()
            .unwrap_or_else(|_| ArrayKey::Str(Rc::from("")))
    }
}

// ============================================================================
// Explicit conversions
// ============================================================================

/// Extract a native value from a [`Value`].
///
/// This is the explicit cast: it fails with a [`ValueError`] where the
/// host would not coerce silently.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, ValueError>;
}

fn strict_long(value: &Value) -> Result<i64, ValueError> {
    let mismatch = || ValueError::Conversion {
        from: value.value_type(),
        to: Type::Numeric,
    };
    match &value.resolve().zval {
        Zval::Null => Ok(0),
        Zval::Bool(v) => Ok(*v as i64),
        Zval::Long(v) => Ok(*v),
        Zval::Double(v) if v.is_finite() && v.fract() == 0.0 => Ok(numeric::double_to_long(*v)),
        Zval::String(bytes) => match numeric::parse_numeric(bytes) {
            Some(Number::Long(v)) => Ok(v),
            Some(Number::Double(v)) if v.fract() == 0.0 => Ok(numeric::double_to_long(v)),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn strict_double(value: &Value) -> Result<f64, ValueError> {
    match &value.resolve().zval {
        Zval::Null => Ok(0.0),
        Zval::Bool(v) => Ok(*v as i64 as f64),
        Zval::Long(v) => Ok(*v as f64),
        Zval::Double(v) => Ok(*v),
        Zval::String(bytes) => numeric::parse_numeric(bytes)
            .map(Number::as_f64)
            .ok_or(ValueError::Conversion {
                from: Type::String,
                to: Type::Float,
            }),
        other => Err(ValueError::Conversion {
            from: super::zval_type(other),
            to: Type::Float,
        }),
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ValueError> {
                    let v = strict_long(value)?;
                    <$ty>::try_from(v).map_err(|_| ValueError::IntegerOverflow {
                        value: v,
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        strict_double(value)
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        strict_double(value).map(|v| v as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.bool_value())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        value.try_string()
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        Ok(value.dereferenced())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, ValueError> {
        let table = value.table().ok_or(ValueError::Conversion {
            from: value.value_type(),
            to: Type::Array,
        })?;
        table.values().map(T::from_value).collect()
    }
}

macro_rules! impl_try_from_value {
    ($($ty:ty),*) => {
        $(
            impl TryFrom<&Value> for $ty {
                type Error = ValueError;

                fn try_from(value: &Value) -> Result<Self, ValueError> {
                    <$ty as FromValue>::from_value(value)
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = ValueError;

                fn try_from(value: Value) -> Result<Self, ValueError> {
                    <$ty as FromValue>::from_value(&value)
                }
            }
        )*
    };
}

impl_try_from_value!(i32, i64, u32, u64, usize, f64, bool, String);

impl Value {
    /// Explicit cast through [`FromValue`].
    pub fn extract<T: FromValue>(&self) -> Result<T, ValueError> {
        T::from_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Silent conversions
    // ========================================================================

    #[test]
    fn truthiness() {
        assert!(!Value::from("").bool_value());
        assert!(!Value::from("0").bool_value());
        assert!(Value::from("0.0").bool_value());
        assert!(Value::from(" ").bool_value());
        assert!(!Value::array().bool_value());
        assert!(Value::from(vec![0]).bool_value());
        assert!(!Value::from(0.0).bool_value());
        assert!(Value::object().bool_value());
    }

    #[test]
    fn numeric_values() {
        assert_eq!(Value::from("42").numeric_value(), 42);
        assert_eq!(Value::from("12 apples").numeric_value(), 12);
        assert_eq!(Value::from("apples").numeric_value(), 0);
        assert_eq!(Value::from("1e3").numeric_value(), 1000);
        assert_eq!(Value::from(3.9).numeric_value(), 3);
        assert_eq!(Value::from(true).numeric_value(), 1);
        assert_eq!(Value::from(vec![1, 2]).numeric_value(), 1);
        assert_eq!(Value::from(" 2.5").float_value(), 2.5);
    }

    #[test]
    fn string_values() {
        assert_eq!(Value::from(true).string_value(), "1");
        assert_eq!(Value::from(false).string_value(), "");
        assert_eq!(Value::null().string_value(), "");
        assert_eq!(Value::from(1.0).string_value(), "1");
        assert_eq!(Value::from(0.1).string_value(), "0.1");
        assert_eq!(Value::from(-17).string_value(), "-17");
        assert_eq!(Value::array().string_value(), "Array");
    }

    #[test]
    fn reported_string_conversions() {
        assert_eq!(
            Value::array().try_string(),
            Err(ValueError::Conversion {
                from: Type::Array,
                to: Type::String
            })
        );
        assert_eq!(
            Value::object().try_string(),
            Err(ValueError::NotStringable {
                class: "stdClass".into()
            })
        );
    }

    // ========================================================================
    // set_type
    // ========================================================================

    #[test]
    fn set_type_in_place() {
        let mut value = Value::from("15 items");
        value.set_type(Type::Numeric).unwrap();
        assert_eq!(value.value_type(), Type::Numeric);
        assert_eq!(value.numeric_value(), 15);

        let mut scalar = Value::from(5);
        scalar.set_type(Type::Array).unwrap();
        assert_eq!(scalar.get(0), 5);

        let mut null = Value::null();
        null.set_type(Type::Array).unwrap();
        assert_eq!(null.size(), 0);
    }

    #[test]
    fn set_type_array_to_object() {
        let mut value: Value = [("a", 1)].into_iter().collect();
        value.set_type(Type::Object).unwrap();
        assert_eq!(value.property("a"), 1);
    }

    #[test]
    fn set_type_through_reference() {
        let mut original = Value::from(7);
        let mut alias = original.reference();
        alias.set_type(Type::String).unwrap();
        assert_eq!(original.value_type(), Type::String);
    }

    // ========================================================================
    // Explicit conversions
    // ========================================================================

    #[test]
    fn explicit_integer_casts() {
        assert_eq!(i64::try_from(&Value::from("5")), Ok(5));
        assert_eq!(i64::try_from(&Value::from("5.0")), Ok(5));
        assert_eq!(i64::try_from(&Value::from(5.0)), Ok(5));
        assert!(i64::try_from(&Value::from("abc")).is_err());
        assert!(i64::try_from(&Value::from("5 apples")).is_err());
        assert!(i64::try_from(&Value::from(5.5)).is_err());
        assert!(i64::try_from(&Value::array()).is_err());
        assert_eq!(
            u8::from_value(&Value::from(300)),
            Err(ValueError::IntegerOverflow {
                value: 300,
                target: "u8"
            })
        );
    }

    #[test]
    fn explicit_float_and_string_casts() {
        assert_eq!(f64::try_from(&Value::from("2.5")), Ok(2.5));
        assert!(f64::try_from(&Value::from("x")).is_err());
        assert_eq!(String::try_from(&Value::from(12)), Ok("12".to_string()));
        assert!(String::try_from(&Value::array()).is_err());
    }

    #[test]
    fn explicit_container_casts() {
        let list = Value::from(vec![1, 2, 3]);
        assert_eq!(list.extract::<Vec<i64>>(), Ok(vec![1, 2, 3]));
        assert_eq!(Value::null().extract::<Option<i64>>(), Ok(None));
        assert!(Value::from(1).extract::<Vec<i64>>().is_err());
    }

    #[test]
    fn array_keys_from_values() {
        assert_eq!(Value::from("7").to_array_key(), Ok(ArrayKey::Int(7)));
        assert_eq!(Value::from(7.9).to_array_key(), Ok(ArrayKey::Int(7)));
        assert_eq!(Value::from(true).to_array_key(), Ok(ArrayKey::Int(1)));
        assert_eq!(Value::null().to_array_key(), Ok(ArrayKey::from("")));
        assert_eq!(
            Value::array().to_array_key(),
            Err(ValueError::IllegalOffset(Type::Array))
        );
    }
}

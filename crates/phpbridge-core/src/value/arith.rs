//! Arithmetic operators.
//!
//! Operands are promoted the way the host promotes them: null and booleans
//! count as integers, numeric strings as their number, leading-numeric
//! strings as their prefix (with a warning). Integer overflow promotes to
//! float. Non-numeric strings, objects and arrays (except `array + array`,
//! which is a key union) are rejected with
//! [`ValueError::UnsupportedOperands`].

use std::ops::{Add, Div, Mul, Neg, Rem, Sub};
use std::rc::Rc;

use crate::error::ValueError;
use crate::numeric::{self, Number, Numericity};
use crate::types::Type;

use super::{Value, Zval};

fn operand(value: &Value, op: &'static str, other: &Value) -> Result<Number, ValueError> {
    let unsupported = || {
        let (left, right) = (value.value_type(), other.value_type());
        ValueError::UnsupportedOperands { op, left, right }
    };
    match &value.resolve().zval {
        Zval::Null => Ok(Number::Long(0)),
        Zval::Bool(v) => Ok(Number::Long(*v as i64)),
        Zval::Long(v) => Ok(Number::Long(*v)),
        Zval::Double(v) => Ok(Number::Double(*v)),
        Zval::String(bytes) => match numeric::classify(bytes) {
            Numericity::Numeric(number) => Ok(number),
            Numericity::Leading(number) => {
                tracing::warn!("A non-numeric value encountered");
                Ok(number)
            }
            Numericity::NonNumeric => Err(unsupported()),
        },
        Zval::Resource(resource) => Ok(Number::Long(resource.id())),
        _ => Err(unsupported()),
    }
}

fn binary(
    left: &Value,
    right: &Value,
    op: &'static str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, ValueError> {
    let a = operand(left, op, right)?;
    let b = operand(right, op, left).map_err(|_| ValueError::UnsupportedOperands {
        op,
        left: left.value_type(),
        right: right.value_type(),
    })?;
    Ok(match (a, b) {
        (Number::Long(x), Number::Long(y)) => match int_op(x, y) {
            Some(v) => Value::from(v),
            None => Value::from(float_op(x as f64, y as f64)),
        },
        (x, y) => Value::from(float_op(x.as_f64(), y.as_f64())),
    })
}

impl Value {
    /// `$a + $b`. Two arrays produce their key union; the left side wins.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn checked_add(&self, other: &Value) -> Result<Value, ValueError> {
        if let (Some(left), Some(right)) = (self.table(), other.table()) {
            let mut union = left;
            for (key, value) in right.iter() {
                if !union.contains_key(key) {
                    Rc::make_mut(&mut union).insert(key.clone(), value.clone());
                }
            }
            return Ok(Value {
                zval: Zval::Array(union),
            });
        }
        binary(self, other, "+", i64::checked_add, |a, b| a + b)
    }

    pub fn checked_sub(&self, other: &Value) -> Result<Value, ValueError> {
        binary(self, other, "-", i64::checked_sub, |a, b| a - b)
    }

    pub fn checked_mul(&self, other: &Value) -> Result<Value, ValueError> {
        binary(self, other, "*", i64::checked_mul, |a, b| a * b)
    }

    /// `$a / $b`. Integer division yields an integer only when exact.
    pub fn checked_div(&self, other: &Value) -> Result<Value, ValueError> {
        let divisor = operand(other, "/", self)?;
        if divisor.as_f64() == 0.0 {
            return Err(ValueError::DivisionByZero("Division"));
        }
        binary(
            self,
            other,
            "/",
            |a, b| {
                if a.checked_rem(b) == Some(0) {
                    a.checked_div(b)
                } else {
                    None
                }
            },
            |a, b| a / b,
        )
    }

    /// `$a % $b`: both operands are converted to integers first.
    pub fn checked_rem(&self, other: &Value) -> Result<Value, ValueError> {
        let a = operand(self, "%", other)?;
        let b = operand(other, "%", self)?;
        let to_long = |n: Number| match n {
            Number::Long(v) => v,
            Number::Double(v) => numeric::double_to_long(v),
        };
        let (a, b) = (to_long(a), to_long(b));
        if b == 0 {
            return Err(ValueError::DivisionByZero("Modulo"));
        }
        // i64::MIN % -1 overflows; the host defines it as 0.
        Ok(Value::from(a.checked_rem(b).unwrap_or(0)))
    }

    /// `$a ** $b`.
    pub fn checked_pow(&self, other: &Value) -> Result<Value, ValueError> {
        binary(
            self,
            other,
            "**",
            |a, b| u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
            f64::powf,
        )
    }

    pub fn checked_neg(&self) -> Result<Value, ValueError> {
        Value::from(0).checked_sub(self).map_err(|_| ValueError::UnsupportedOperands {
            op: "*",
            left: self.value_type(),
            right: Type::Numeric,
        })
    }

    /// `++$a`. Null becomes 1; non-numeric strings are left unchanged.
    pub fn increment(&mut self) -> Result<(), ValueError> {
        self.modify(|slot| {
            let next = match &slot.zval {
                Zval::Null => Value::from(1),
                Zval::String(bytes) if !numeric::is_numeric(bytes) => return Ok(()),
                _ => slot.checked_add(&Value::from(1))?,
            };
            *slot = next;
            Ok(())
        })
    }

    /// `--$a`. Null stays null.
    pub fn decrement(&mut self) -> Result<(), ValueError> {
        self.modify(|slot| {
            let next = match &slot.zval {
                Zval::Null => return Ok(()),
                Zval::String(bytes) if !numeric::is_numeric(bytes) => return Ok(()),
                _ => slot.checked_sub(&Value::from(1))?,
            };
            *slot = next;
            Ok(())
        })
    }
}

macro_rules! impl_operator {
    ($trait:ident, $method:ident, $inherent:ident) => {
        impl $trait<&Value> for &Value {
            type Output = Result<Value, ValueError>;

            fn $method(self, rhs: &Value) -> Self::Output {
                Value::$inherent(self, rhs)
            }
        }

        impl $trait<Value> for Value {
            type Output = Result<Value, ValueError>;

            fn $method(self, rhs: Value) -> Self::Output {
                Value::$inherent(&self, &rhs)
            }
        }

        impl $trait<&Value> for Value {
            type Output = Result<Value, ValueError>;

            fn $method(self, rhs: &Value) -> Self::Output {
                Value::$inherent(&self, rhs)
            }
        }

        impl_operator!(@primitive $trait, $method, $inherent, i32, i64, f64, &str);
    };
    (@primitive $trait:ident, $method:ident, $inherent:ident, $($ty:ty),*) => {
        $(
            impl $trait<$ty> for &Value {
                type Output = Result<Value, ValueError>;

                fn $method(self, rhs: $ty) -> Self::Output {
                    Value::$inherent(self, &Value::from(rhs))
                }
            }

            impl $trait<$ty> for Value {
                type Output = Result<Value, ValueError>;

                fn $method(self, rhs: $ty) -> Self::Output {
                    Value::$inherent(&self, &Value::from(rhs))
                }
            }
        )*
    };
}

impl_operator!(Add, add, checked_add);
impl_operator!(Sub, sub, checked_sub);
impl_operator!(Mul, mul, checked_mul);
impl_operator!(Div, div, checked_div);
impl_operator!(Rem, rem, checked_rem);

impl Neg for &Value {
    type Output = Result<Value, ValueError>;

    fn neg(self) -> Self::Output {
        self.checked_neg()
    }
}

impl Neg for Value {
    type Output = Result<Value, ValueError>;

    fn neg(self) -> Self::Output {
        self.checked_neg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Promotion
    // ========================================================================

    #[test]
    fn integer_arithmetic() {
        assert!((Value::from(2) + 3_i64).unwrap().identical(&Value::from(5)));
        assert!((Value::from(7) - 10_i64).unwrap().identical(&Value::from(-3)));
        assert!((Value::from(6) * 7_i64).unwrap().identical(&Value::from(42)));
    }

    #[test]
    fn mixed_operands_promote() {
        assert!((Value::from(1) + 0.5).unwrap().identical(&Value::from(1.5)));
        assert!((Value::from("5") + 5_i64).unwrap().identical(&Value::from(10)));
        assert!((Value::from("1.5") + 1_i64).unwrap().identical(&Value::from(2.5)));
        assert!((Value::from(true) + Value::null()).unwrap().identical(&Value::from(1)));
    }

    #[test]
    fn leading_numeric_strings_use_prefix() {
        assert!((Value::from("5 apples") + 1_i64).unwrap().identical(&Value::from(6)));
    }

    #[test]
    fn overflow_promotes_to_float() {
        let result = (Value::from(i64::MAX) + 1_i64).unwrap();
        assert!(result.is_float());
        assert_eq!(result.float_value(), i64::MAX as f64 + 1.0);
    }

    #[test]
    fn division() {
        assert!((Value::from(10) / 2_i64).unwrap().identical(&Value::from(5)));
        assert!((Value::from(7) / 2_i64).unwrap().identical(&Value::from(3.5)));
        assert!((Value::from(i64::MIN) / -1_i64).unwrap().is_float());
        assert_eq!(
            (Value::from(1) / 0_i64).err(),
            Some(ValueError::DivisionByZero("Division"))
        );
        assert_eq!(
            (Value::from(1) / "0.0").err(),
            Some(ValueError::DivisionByZero("Division"))
        );
    }

    #[test]
    fn modulo() {
        assert_eq!((Value::from(7) % 3_i64).unwrap(), 1);
        assert_eq!((Value::from(-7) % 3_i64).unwrap(), -1);
        assert_eq!((Value::from(7.9) % 3_i64).unwrap(), 1);
        assert_eq!((Value::from(i64::MIN) % -1_i64).unwrap(), 0);
        assert_eq!(
            (Value::from(1) % 0_i64).err(),
            Some(ValueError::DivisionByZero("Modulo"))
        );
    }

    #[test]
    fn power() {
        let two = Value::from(2);
        let exact = two.checked_pow(&Value::from(10)).unwrap();
        assert!(exact.identical(&Value::from(1024)));
        let inverse = two.checked_pow(&Value::from(-1)).unwrap();
        assert!(inverse.identical(&Value::from(0.5)));
    }

    // ========================================================================
    // Rejections
    // ========================================================================

    #[test]
    fn non_numeric_strings_are_rejected() {
        assert_eq!(
            (Value::from("abc") + 1_i64).err(),
            Some(ValueError::UnsupportedOperands {
                op: "+",
                left: Type::String,
                right: Type::Numeric
            })
        );
    }

    #[test]
    fn arrays_only_add_to_arrays() {
        assert!((Value::from(vec![1]) + 1_i64).is_err());
        assert!((Value::from(vec![1]) * Value::from(vec![2])).is_err());
    }

    #[test]
    fn array_union_keeps_left_values() {
        let left: Value = [("a", 1), ("b", 2)].into_iter().collect();
        let right: Value = [("b", 20), ("c", 30)].into_iter().collect();
        let union = (&left + &right).unwrap();
        assert_eq!(union.size(), 3);
        assert_eq!(union.get("b"), 2);
        assert_eq!(union.get("c"), 30);
        assert_eq!(left.size(), 2);
    }

    // ========================================================================
    // Increment / negation
    // ========================================================================

    #[test]
    fn increment_and_decrement() {
        let mut value = Value::null();
        value.increment().unwrap();
        assert!(value.identical(&Value::from(1)));
        value.decrement().unwrap();
        value.decrement().unwrap();
        assert!(value.identical(&Value::from(-1)));

        let mut text = Value::from("abc");
        text.increment().unwrap();
        assert_eq!(text, "abc");
    }

    #[test]
    fn negation() {
        assert!((-Value::from(5)).unwrap().identical(&Value::from(-5)));
        assert!((-Value::from("2.5")).unwrap().identical(&Value::from(-2.5)));
        assert!((-Value::array()).is_err());
    }
}

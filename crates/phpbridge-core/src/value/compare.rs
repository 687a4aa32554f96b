//! Loose (`==`, `<=>`) and strict (`===`) comparison.
//!
//! Loose comparison follows the host's PHP 8 rules:
//! - a numeric string compared with a number compares numerically;
//! - a non-numeric string compared with a number compares the number's
//!   string form with the string;
//! - two numeric strings compare numerically (`"5" == "5.0"`);
//! - booleans and null compare by truthiness (null against a string
//!   compares `""` with the string);
//! - arrays are only comparable with arrays (and null, by emptiness); they
//!   never equal a scalar, booleans included, and sort after one.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::numeric::{self, Number};

use super::{Value, Zval};

fn compare_numbers(a: Number, b: Number) -> Option<Ordering> {
    match (a, b) {
        (Number::Long(a), Number::Long(b)) => Some(a.cmp(&b)),
        (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

fn number_string(number: Number) -> String {
    match number {
        Number::Long(v) => v.to_string(),
        Number::Double(v) => numeric::format_double(v, 14),
    }
}

fn as_number(zval: &Zval) -> Option<Number> {
    match zval {
        Zval::Long(v) => Some(Number::Long(*v)),
        Zval::Double(v) => Some(Number::Double(*v)),
        _ => None,
    }
}

impl Value {
    /// The host's `<=>`. `None` means the operands are uncomparable (for
    /// example arrays with different keys, or NaN), which is never equal.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        let left = self.resolve();
        let right = other.resolve();
        match (&left.zval, &right.zval) {
            (Zval::Null, Zval::Null) => Some(Ordering::Equal),
            (Zval::Array(a), Zval::Array(b)) => {
                if a.len() != b.len() {
                    return Some(a.len().cmp(&b.len()));
                }
                for (key, value) in a.iter() {
                    let other = b.get(key)?;
                    match value.compare(other)? {
                        Ordering::Equal => continue,
                        unequal => return Some(unequal),
                    }
                }
                Some(Ordering::Equal)
            }
            (Zval::Array(a), Zval::Null) => Some((!a.is_empty()).cmp(&false)),
            (Zval::Null, Zval::Array(b)) => Some(false.cmp(&!b.is_empty())),
            (Zval::Array(_), _) => Some(Ordering::Greater),
            (_, Zval::Array(_)) => Some(Ordering::Less),

            (Zval::Bool(a), _) => Some(a.cmp(&right.bool_value())),
            (_, Zval::Bool(b)) => Some(left.bool_value().cmp(b)),
            (Zval::Null, Zval::String(b)) => Some(compare_bytes(b"", b)),
            (Zval::String(a), Zval::Null) => Some(compare_bytes(a, b"")),
            (Zval::Null, _) => Some(false.cmp(&right.bool_value())),
            (_, Zval::Null) => Some(left.bool_value().cmp(&false)),

            (Zval::String(a), Zval::String(b)) => {
                match (numeric::parse_numeric(a), numeric::parse_numeric(b)) {
                    (Some(x), Some(y)) => compare_numbers(x, y),
                    _ => Some(compare_bytes(a, b)),
                }
            }
            (Zval::String(s), other) if as_number(other).is_some() => {
                let n = as_number(other)?;
                match numeric::parse_numeric(s) {
                    Some(x) => compare_numbers(x, n),
                    None => Some(compare_bytes(s, number_string(n).as_bytes())),
                }
            }
            (other, Zval::String(s)) if as_number(other).is_some() => {
                let n = as_number(other)?;
                match numeric::parse_numeric(s) {
                    Some(y) => compare_numbers(n, y),
                    None => Some(compare_bytes(number_string(n).as_bytes(), s)),
                }
            }
            (a, b) if as_number(a).is_some() && as_number(b).is_some() => {
                compare_numbers(as_number(a)?, as_number(b)?)
            }

            (Zval::Object(a), Zval::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Some(Ordering::Equal);
                }
                if !Rc::ptr_eq(a.class(), b.class()) {
                    return None;
                }
                if let Some(ordering) = a.compare_native(b) {
                    return Some(ordering);
                }
                Value::from_table((*a.properties()).clone())
                    .compare(&Value::from_table((*b.properties()).clone()))
            }
            (Zval::Object(a), Zval::String(s)) => {
                let text = a.to_string_value().ok()?;
                Some(compare_bytes(text.as_bytes(), s))
            }
            (Zval::String(s), Zval::Object(b)) => {
                let text = b.to_string_value().ok()?;
                Some(compare_bytes(s, text.as_bytes()))
            }
            (Zval::Object(_), _) => Some(Ordering::Greater),
            (_, Zval::Object(_)) => Some(Ordering::Less),

            (Zval::Resource(a), Zval::Resource(b)) => Some(a.id().cmp(&b.id())),
            (Zval::Callable(a), Zval::Callable(b)) if Rc::ptr_eq(a, b) => Some(Ordering::Equal),
            (Zval::Resource(_), _) | (_, Zval::Resource(_)) => {
                compare_numbers(left.number_value(), right.number_value())
            }
            _ => None,
        }
    }

    /// The host's `==`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// The host's `===`: same type and same value; arrays must hold the
    /// same pairs in the same order; objects must be the same instance.
    pub fn identical(&self, other: &Value) -> bool {
        let left = self.resolve();
        let right = other.resolve();
        match (&left.zval, &right.zval) {
            (Zval::Null, Zval::Null) => true,
            (Zval::Bool(a), Zval::Bool(b)) => a == b,
            (Zval::Long(a), Zval::Long(b)) => a == b,
            (Zval::Double(a), Zval::Double(b)) => a == b,
            (Zval::String(a), Zval::String(b)) => a == b,
            (Zval::Array(a), Zval::Array(b)) => {
                Rc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter()
                            .zip(b.iter())
                            .all(|((ka, va), (kb, vb))| ka == kb && va.identical(vb)))
            }
            (Zval::Object(a), Zval::Object(b)) => Rc::ptr_eq(a, b),
            (Zval::Resource(a), Zval::Resource(b)) => Rc::ptr_eq(a, b),
            (Zval::Callable(a), Zval::Callable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.loose_eq(other)
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        self.compare(other)
    }
}

macro_rules! impl_eq_primitive {
    ($($ty:ty),*) => {
        $(
            impl PartialEq<$ty> for Value {
                fn eq(&self, other: &$ty) -> bool {
                    self.loose_eq(&Value::from(*other))
                }
            }

            impl PartialEq<Value> for $ty {
                fn eq(&self, other: &Value) -> bool {
                    other.loose_eq(&Value::from(*self))
                }
            }
        )*
    };
}

impl_eq_primitive!(bool, i32, i64, u32, usize, f64, &str);

impl PartialEq<String> for Value {
    fn eq(&self, other: &String) -> bool {
        self.loose_eq(&Value::from(other.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v<T: Into<Value>>(value: T) -> Value {
        value.into()
    }

    // ========================================================================
    // Loose equality
    // ========================================================================

    #[test]
    fn numeric_representations_are_pairwise_equal() {
        let forms = [v(5), v(5.0), v("5"), v("5.0")];
        for a in &forms {
            for b in &forms {
                assert!(a.loose_eq(b), "{a:?} == {b:?}");
            }
        }
    }

    #[test]
    fn mismatched_numbers_are_not_equal() {
        assert!(!v(5).loose_eq(&v("6")));
        assert!(!v("5").loose_eq(&v(6.0)));
    }

    #[test]
    fn arrays_never_equal_scalars() {
        let array = Value::from(vec![5]);
        for scalar in [v(5), v("5"), v(true), v(1.0), v("Array")] {
            assert!(!array.loose_eq(&scalar));
            assert!(!scalar.loose_eq(&array));
        }
        assert!(Value::array().loose_eq(&Value::null()));
    }

    #[test]
    fn php8_string_number_rules() {
        assert!(!v("abc").loose_eq(&v(0)));
        assert!(v("1e3").loose_eq(&v(1000)));
        assert!(v(" 5").loose_eq(&v(5)));
        assert!(!v("5 apples").loose_eq(&v(5)));
        assert!(v("abc").loose_eq(&v("abc")));
        assert!(!v("abc").loose_eq(&v("ABC")));
    }

    #[test]
    fn null_and_bool_rules() {
        assert!(Value::null().loose_eq(&v(false)));
        assert!(Value::null().loose_eq(&v(0)));
        assert!(Value::null().loose_eq(&v("")));
        assert!(!Value::null().loose_eq(&v("0")));
        assert!(v("0").loose_eq(&v(false)));
        assert!(v("a").loose_eq(&v(true)));
        assert!(!Value::array().loose_eq(&v(false)));
    }

    #[test]
    fn arrays_compare_by_pairs() {
        let a: Value = [("x", 1), ("y", 2)].into_iter().collect();
        let b: Value = [("y", "2"), ("x", "1")].into_iter().collect();
        assert!(a.loose_eq(&b));
        assert!(!a.identical(&b));

        let c: Value = [("x", 1), ("z", 2)].into_iter().collect();
        assert_eq!(a.compare(&c), None);
        assert!(!a.loose_eq(&c));
    }

    #[test]
    fn nan_is_never_equal() {
        let nan = v(f64::NAN);
        assert!(!nan.loose_eq(&nan));
        assert!(!nan.identical(&nan));
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    #[test]
    fn spaceship() {
        assert_eq!(v(1).compare(&v(2)), Some(Ordering::Less));
        assert_eq!(v("10").compare(&v("9")), Some(Ordering::Greater));
        assert_eq!(v("10").compare(&v("9a")), Some(Ordering::Less));
        assert_eq!(v(2.5).compare(&v(2)), Some(Ordering::Greater));
        assert!(Value::from(vec![1]) > v(100));
    }

    // ========================================================================
    // Identity
    // ========================================================================

    #[test]
    fn identity_requires_same_type() {
        assert!(v(5).identical(&v(5)));
        assert!(!v(5).identical(&v(5.0)));
        assert!(!v(5).identical(&v("5")));
        assert!(v("5").identical(&v("5")));
    }

    #[test]
    fn objects_are_identical_only_to_themselves() {
        let a = Value::object();
        let b = Value::object();
        assert!(a.identical(&a.clone()));
        assert!(!a.identical(&b));
        assert!(a.loose_eq(&b));
    }

    #[test]
    fn primitive_equality() {
        assert_eq!(v("5"), 5);
        assert_eq!(5, v(5.0));
        assert_eq!(v(1), true);
        assert_ne!(v("abc"), 0);
        assert_eq!(v("x"), "x".to_string());
    }
}

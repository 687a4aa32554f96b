//! Numeric strings and number formatting.
//!
//! The host accepts optional surrounding whitespace around a numeric string
//! (`" 12 "`, `"1e3\n"`), treats a string whose *prefix* is numeric
//! (`"12 apples"`) as leading-numeric, and never interprets hex or octal
//! notation. Integer strings that overflow `i64` become floats.

/// A parsed number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Long(i64),
    Double(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Long(v) => v as f64,
            Number::Double(v) => v,
        }
    }
}

/// How much of a string was numeric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numericity {
    /// The whole string (modulo whitespace) is numeric.
    Numeric(Number),
    /// Only a prefix is numeric.
    Leading(Number),
    /// Not numeric at all.
    NonNumeric,
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Classify a byte string.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn classify(bytes: &[u8]) -> Numericity {
    let mut start = 0;
    while start < bytes.len() && is_ws(bytes[start]) {
        start += 1;
    }
    let Some((number, consumed)) = scan(&bytes[start..]) else {
        return Numericity::NonNumeric;
    };
    let rest = &bytes[start + consumed..];
    if rest.iter().all(|&b| is_ws(b)) {
        Numericity::Numeric(number)
    } else {
        Numericity::Leading(number)
    }
}

/// Parse a fully numeric string.
pub fn parse_numeric(bytes: &[u8]) -> Option<Number> {
    match classify(bytes) {
        Numericity::Numeric(number) => Some(number),
        _ => None,
    }
}

/// Whether the whole string is numeric.
pub fn is_numeric(bytes: &[u8]) -> bool {
    matches!(classify(bytes), Numericity::Numeric(_))
}

/// Number taken from the leading numeric prefix, 0 when there is none.
pub fn leading_number(bytes: &[u8]) -> Number {
    match classify(bytes) {
        Numericity::Numeric(number) | Numericity::Leading(number) => number,
        Numericity::NonNumeric => Number::Long(0),
    }
}

/// Scan `[+-]digits[.digits][e[+-]digits]` and return the number and the
/// byte count consumed.
fn scan(bytes: &[u8]) -> Option<(Number, usize)> {
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    let mut is_float = false;
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        frac_digits = j - i - 1;
        if int_digits > 0 || frac_digits > 0 {
            is_float = true;
            i = j;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            is_float = true;
            i = j;
        }
    }
    // The scanned range is ASCII by construction.
    let text = std::str::from_utf8(&bytes[..i]).ok()?;
    if !is_float {
        if let Ok(v) = text.parse::<i64>() {
            return Some((Number::Long(v), i));
        }
    }
    text.parse::<f64>().ok().map(|v| (Number::Double(v), i))
}

/// Convert a float to an integer the way the host does: truncate toward
/// zero, and map non-finite or out-of-range values to 0.
pub fn double_to_long(value: f64) -> i64 {
    if !value.is_finite()
        || value >= 9.223_372_036_854_775_808e18
        || value < -9.223_372_036_854_775_808e18
    {
        return 0;
    }
    value.trunc() as i64
}

/// Format a float with `precision` significant digits using the host's
/// `%.*G` conventions (`1.0E+25`, `-0`, `INF`, `NAN`).
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn format_double(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.clamp(1, 40);
    let sci = format!("{:.*e}", precision - 1, value.abs());
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }

    if exponent < -4 || exponent >= precision as i32 {
        out.push_str(&digits[..1]);
        out.push('.');
        if digits.len() > 1 {
            out.push_str(&digits[1..]);
        } else {
            out.push('0');
        }
        out.push('E');
        out.push(if exponent < 0 { '-' } else { '+' });
        out.push_str(&exponent.abs().to_string());
    } else if exponent >= 0 {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            out.push_str(digits);
            out.extend(std::iter::repeat_n('0', int_len - digits.len()));
        } else {
            out.push_str(&digits[..int_len]);
            out.push('.');
            out.push_str(&digits[int_len..]);
        }
    } else {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-exponent - 1) as usize));
        out.push_str(digits);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Classification
    // ========================================================================

    #[test]
    fn integers_and_floats() {
        assert_eq!(parse_numeric(b"42"), Some(Number::Long(42)));
        assert_eq!(parse_numeric(b"-7"), Some(Number::Long(-7)));
        assert_eq!(parse_numeric(b"5.0"), Some(Number::Double(5.0)));
        assert_eq!(parse_numeric(b".5"), Some(Number::Double(0.5)));
        assert_eq!(parse_numeric(b"1e3"), Some(Number::Double(1000.0)));
    }

    #[test]
    fn whitespace_is_allowed_around_numbers() {
        assert_eq!(parse_numeric(b"  12"), Some(Number::Long(12)));
        assert_eq!(parse_numeric(b"12 \n"), Some(Number::Long(12)));
    }

    #[test]
    fn leading_numeric_strings() {
        assert_eq!(
            classify(b"12 apples"),
            Numericity::Leading(Number::Long(12))
        );
        assert_eq!(classify(b"1.5kg"), Numericity::Leading(Number::Double(1.5)));
        assert_eq!(leading_number(b"abc"), Number::Long(0));
    }

    #[test]
    fn not_numeric() {
        assert!(!is_numeric(b""));
        assert!(!is_numeric(b"."));
        assert!(!is_numeric(b"0x1A"));
        assert!(!is_numeric(b"abc"));
        assert!(!is_numeric(b"-"));
    }

    #[test]
    fn dangling_exponent_is_a_prefix() {
        assert_eq!(classify(b"1e"), Numericity::Leading(Number::Long(1)));
    }

    #[test]
    fn integer_overflow_becomes_float() {
        assert_eq!(
            parse_numeric(b"9223372036854775808"),
            Some(Number::Double(9223372036854775808.0))
        );
    }

    // ========================================================================
    // Formatting
    // ========================================================================

    #[test]
    fn format_plain() {
        assert_eq!(format_double(1.5, 14), "1.5");
        assert_eq!(format_double(100.0, 14), "100");
        assert_eq!(format_double(-2.25, 14), "-2.25");
        assert_eq!(format_double(0.1 + 0.2, 14), "0.3");
        assert_eq!(format_double(0.0001, 14), "0.0001");
    }

    #[test]
    fn format_scientific() {
        assert_eq!(format_double(1e25, 14), "1.0E+25");
        assert_eq!(format_double(1.5e100, 14), "1.5E+100");
        assert_eq!(format_double(0.00001, 14), "1.0E-5");
    }

    #[test]
    fn format_special() {
        assert_eq!(format_double(-0.0, 14), "-0");
        assert_eq!(format_double(f64::INFINITY, 14), "INF");
        assert_eq!(format_double(f64::NAN, 14), "NAN");
    }

    #[test]
    fn float_to_int() {
        assert_eq!(double_to_long(3.99), 3);
        assert_eq!(double_to_long(-3.99), -3);
        assert_eq!(double_to_long(f64::NAN), 0);
        assert_eq!(double_to_long(1e300), 0);
    }
}

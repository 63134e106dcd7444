//! Conversions applied in lax mode, and to numeric map keys carried as
//! strings.

use crate::wire::Scalar;
use keel_schema::{number::parse_float, BigInt};

pub(crate) fn str_to_null(text: &str) -> bool {
    text == "null"
}

pub(crate) fn str_to_bool(text: &str) -> Option<bool> {
    match text {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub(crate) fn int_to_bool(value: i64) -> Option<bool> {
    match value {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

/// Integral floats only, within `i64` range.
pub(crate) fn float_to_int(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64).then_some(value as i64)
}

pub(crate) fn str_to_int(text: &str) -> Option<Scalar<'static>> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(Scalar::Int(value));
    }
    if let Ok(value) = text.parse::<u64>() {
        return Some(Scalar::UInt(value));
    }
    if let Some(value) = BigInt::parse(text) {
        return Some(Scalar::Big(value));
    }
    str_to_float(text).and_then(float_to_int).map(Scalar::Int)
}

pub(crate) fn str_to_float(text: &str) -> Option<f64> {
    match text {
        "nan" | "NaN" => Some(f64::NAN),
        "inf" | "infinity" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => parse_float(text.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_from_text() {
        assert_eq!(str_to_int("-12"), Some(Scalar::Int(-12)));
        assert_eq!(str_to_int("18446744073709551615"), Some(Scalar::UInt(u64::MAX)));
        assert!(matches!(str_to_int("99999999999999999999999"), Some(Scalar::Big(_))));
        assert_eq!(str_to_int("3.0"), Some(Scalar::Int(3)));
        assert_eq!(str_to_int("3.5"), None);
        assert_eq!(str_to_int("x"), None);
    }

    #[test]
    fn floats_and_bools() {
        assert_eq!(str_to_float("1e3"), Some(1000.0));
        assert!(str_to_float("nan").unwrap().is_nan());
        assert_eq!(float_to_int(2.0), Some(2));
        assert_eq!(float_to_int(2.5), None);
        assert_eq!(float_to_int(1e19), None);
        assert_eq!(int_to_bool(1), Some(true));
        assert_eq!(int_to_bool(2), None);
        assert_eq!(str_to_bool("false"), Some(false));
        assert!(str_to_null("null"));
    }
}

//! Decimal text to `f64` conversion.
//!
//! [`parse_float`] tries an exact small-number path, then Eisel-Lemire, and
//! only falls back to the [`Decimal`] shift algorithm when the fast paths
//! cannot decide the rounding. Every path returns the correctly rounded
//! result.

mod decimal;
mod lemire;
mod table;

pub use decimal::{Decimal, MAX_DIGITS};
pub use lemire::eisel_lemire;

/// Powers of ten that are exact in an `f64`.
const EXACT_POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

/// Significant digits that always fit in a `u64`.
const MAX_MANTISSA_DIGITS: usize = 19;

/// The leading digits of a decimal number, split for the fast paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parts {
    pub negative: bool,
    /// Up to 19 leading significant digits.
    pub mantissa: u64,
    /// Power of ten applied to `mantissa`.
    pub exponent: i64,
    /// Nonzero digits were dropped from `mantissa`.
    pub many_digits: bool,
}

impl Parts {
    /// Splits `[+-]digits[.digits][(e|E)[+-]digits]`. Returns `None` for
    /// anything else, including trailing bytes.
    pub fn scan(text: &[u8]) -> Option<Parts> {
        let mut parts = Parts {
            negative: false,
            mantissa: 0,
            exponent: 0,
            many_digits: false,
        };
        let mut i = 0;
        match text.first() {
            Some(b'-') => {
                parts.negative = true;
                i += 1;
            }
            Some(b'+') => i += 1,
            _ => {}
        }

        let mut significant = 0usize;
        let mut any_digit = false;
        let mut fraction = false;
        while let Some(&c) = text.get(i) {
            match c {
                b'.' if !fraction => fraction = true,
                b'0'..=b'9' => {
                    any_digit = true;
                    let digit = (c - b'0') as u64;
                    if significant == 0 && digit == 0 {
                        if fraction {
                            parts.exponent -= 1;
                        }
                    } else if significant < MAX_MANTISSA_DIGITS {
                        parts.mantissa = parts.mantissa * 10 + digit;
                        significant += 1;
                        if fraction {
                            parts.exponent -= 1;
                        }
                    } else {
                        parts.many_digits |= digit != 0;
                        if !fraction {
                            parts.exponent += 1;
                        }
                    }
                }
                _ => break,
            }
            i += 1;
        }
        if !any_digit {
            return None;
        }

        if let Some(b'e' | b'E') = text.get(i) {
            i += 1;
            let negative = match text.get(i) {
                Some(b'-') => {
                    i += 1;
                    true
                }
                Some(b'+') => {
                    i += 1;
                    false
                }
                _ => false,
            };
            let start = i;
            let mut exp: i64 = 0;
            while let Some(&c @ b'0'..=b'9') = text.get(i) {
                if exp < 1 << 20 {
                    exp = exp * 10 + (c - b'0') as i64;
                }
                i += 1;
            }
            if i == start {
                return None;
            }
            parts.exponent += if negative { -exp } else { exp };
        }

        if i != text.len() {
            return None;
        }
        Some(parts)
    }

    /// The fast paths. `None` means the slow path must decide.
    fn fast(&self) -> Option<f64> {
        if self.mantissa == 0 {
            return Some(0.0);
        }
        if !self.many_digits && self.mantissa <= 1 << 53 && (-22..=22).contains(&self.exponent) {
            let value = self.mantissa as f64;
            let pow = EXACT_POW10[self.exponent.unsigned_abs() as usize];
            return Some(if self.exponent < 0 { value / pow } else { value * pow });
        }
        let exponent = i32::try_from(self.exponent).ok()?;
        let value = eisel_lemire(self.mantissa, exponent)?;
        if self.many_digits {
            // The dropped digits lie between mantissa and mantissa + 1.
            let upper = eisel_lemire(self.mantissa + 1, exponent)?;
            if upper != value {
                return None;
            }
        }
        Some(value)
    }
}

/// Parses decimal text into the nearest `f64`.
///
/// Accepts an optional sign, digits with an optional fraction, and an optional
/// exponent. Returns `None` if the text is not a number.
///
/// ```
/// use keel_schema::number::parse_float;
///
/// assert_eq!(parse_float(b"0.1"), Some(0.1));
/// assert_eq!(parse_float(b"-2.5e-3"), Some(-0.0025));
/// assert_eq!(parse_float(b"1e400"), Some(f64::INFINITY));
/// assert_eq!(parse_float(b"1.5x"), None);
/// ```
pub fn parse_float(text: &[u8]) -> Option<f64> {
    let parts = Parts::scan(text)?;
    match parts.fast() {
        Some(value) if parts.negative => Some(-value),
        Some(value) => Some(value),
        None => Decimal::parse(text).map(Decimal::to_f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(text: &str) -> f64 {
        parse_float(text.as_bytes()).unwrap()
    }

    fn same(text: &str) {
        let expected: f64 = text.parse().unwrap();
        assert_eq!(parse(text).to_bits(), expected.to_bits(), "{}", text);
    }

    #[test]
    fn scan_parts() {
        assert_eq!(
            Parts::scan(b"-0.0125e2"),
            Some(Parts { negative: true, mantissa: 125, exponent: -2, many_digits: false })
        );
        let long = Parts::scan(b"12345678901234567890123").unwrap();
        assert_eq!(long.mantissa, 1234567890123456789);
        assert_eq!(long.exponent, 4);
        assert!(long.many_digits);
        assert!(!Parts::scan(b"12345678901234567890000").unwrap().many_digits);
        assert_eq!(Parts::scan(b"."), None);
        assert_eq!(Parts::scan(b"1e+"), None);
        assert_eq!(Parts::scan(b"1 "), None);
    }

    #[test]
    fn signed_zero() {
        assert_eq!(parse("0").to_bits(), 0f64.to_bits());
        assert_eq!(parse("-0.0").to_bits(), (-0f64).to_bits());
        assert_eq!(parse("0e999999999").to_bits(), 0f64.to_bits());
    }

    #[test]
    fn ambiguous_inputs() {
        for text in [
            "9007199254740993",
            "9007199254740993.0",
            "9007199254740992.9999999999999999999",
            "9007199254740993.0000000000000000001",
            "2.2250738585072011e-308",
            "2.2250738585072012e-308",
            "4.9406564584124654e-324",
            "2.4703282292062327e-324",
            "2.4703282292062328e-324",
            "1.7976931348623157e308",
            "1.7976931348623158e308",
            "1.7976931348623159e308",
            "0.1",
            "1e23",
            "8.988465674311579e307",
            "123456789012345678901234567890e-10",
            "7.3177701707893310e+15",
            "1448997445238699",
            "0.500000000000000166533453693773481063544750213623046875",
            "3.518437208883201171875e13",
            "62.5364939768271845828",
            "8.10109172351e-10",
            "1.00000005960464477550",
            "2.47032822920623272088284396434110686182529901307162382212792841250337753635104375932649918180817996189898282347722858865463328355177969898199387398005390939063150356595155702263922908583924491051844359318028499365361525003193704576782492193656236698636584807570015857692699037063119282795585513329278343384093519780155312465972635795746227664652728272200563740064854999770965994704540208281662262378573934507363390079677619305775067401763246736009689513405355374585166611342237666786041621596804619144672918403005300575308490487653917113865916462395249126236538818796362393732804238910186723484976682350898633885879256283027559956575244555072551893136908362547791869486679949683240497058210285131854513962138377228261454376934125320985913276672363281255",
        ] {
            same(text);
        }
    }

    #[test]
    fn slow_path_agrees_with_fast_path() {
        for text in ["0.3", "1.7e-300", "6.02214076e23", "-42.125"] {
            let slow = Decimal::parse(text.as_bytes()).unwrap().to_f64();
            assert_eq!(slow, parse(text));
        }
    }

    proptest! {
        #[test]
        fn shortest_repr_round_trips(bits in any::<u64>()) {
            let value = f64::from_bits(bits);
            prop_assume!(value.is_finite());
            let text = format!("{:?}", value);
            prop_assert_eq!(parse(&text).to_bits(), value.to_bits());
        }

        #[test]
        fn matches_std_on_random_digits(
            negative in any::<bool>(),
            digits in "[1-9][0-9]{0,40}",
            exponent in -350i32..330,
        ) {
            let text = format!("{}{}e{}", if negative { "-" } else { "" }, digits, exponent);
            let expected: f64 = text.parse().unwrap();
            prop_assert_eq!(parse(&text).to_bits(), expected.to_bits());
        }

        #[test]
        fn matches_std_on_long_integer_parts(
            lead in 1u8..10,
            digits in proptest::collection::vec(0u8..10, MAX_DIGITS..MAX_DIGITS + 200),
            fraction in "[0-9]{0,3}",
            magnitude in -320i64..300,
        ) {
            let mut text: String = std::iter::once(lead).chain(digits).map(|d| char::from(b'0' + d)).collect();
            let exponent = magnitude - text.len() as i64;
            if !fraction.is_empty() {
                text.push('.');
                text.push_str(&fraction);
            }
            let text = format!("{}e{}", text, exponent);
            let expected: f64 = text.parse().unwrap();
            prop_assert_eq!(parse(&text).to_bits(), expected.to_bits());
            prop_assert_eq!(Decimal::parse(text.as_bytes()).unwrap().to_f64().to_bits(), expected.to_bits());
        }

        #[test]
        fn matches_std_with_fractions(
            int in "[0-9]{1,25}",
            frac in "[0-9]{1,25}",
            exponent in -30i32..30,
        ) {
            let text = format!("{}.{}e{}", int, frac, exponent);
            let expected: f64 = text.parse().unwrap();
            prop_assert_eq!(parse(&text).to_bits(), expected.to_bits());
        }
    }
}

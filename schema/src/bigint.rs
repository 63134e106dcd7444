use std::cmp::Ordering;
use std::fmt;

const BASE: u64 = 1_000_000_000;
const BASE_DIGITS: usize = 9;

/// An arbitrary-precision integer, used for integers that overflow 64 bits.
///
/// Stored as a sign and base-10^9 limbs (least significant first) since the
/// only arithmetic needed is decimal parsing, printing and comparison.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BigInt {
    negative: bool,
    limbs: Vec<u32>,
}

impl BigInt {
    /// Parses an optionally signed run of ASCII digits.
    pub fn parse(text: &str) -> Option<BigInt> {
        let (negative, digits) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let digits = digits.trim_start_matches('0').as_bytes();
        let mut limbs = Vec::with_capacity(digits.len() / BASE_DIGITS + 1);
        let mut end = digits.len();
        while end > 0 {
            let start = end.saturating_sub(BASE_DIGITS);
            let limb = digits[start..end]
                .iter()
                .fold(0u32, |acc, b| acc * 10 + (b - b'0') as u32);
            limbs.push(limb);
            end = start;
        }
        Some(BigInt::from_parts(negative, limbs))
    }

    fn from_parts(negative: bool, mut limbs: Vec<u32>) -> BigInt {
        while limbs.last() == Some(&0) {
            limbs.pop();
        }
        BigInt { negative: negative && !limbs.is_empty(), limbs }
    }

    pub fn from_i128(value: i128) -> BigInt {
        let mut magnitude = value.unsigned_abs();
        let mut limbs = Vec::new();
        while magnitude > 0 {
            limbs.push((magnitude % BASE as u128) as u32);
            magnitude /= BASE as u128;
        }
        BigInt::from_parts(value < 0, limbs)
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.is_empty()
    }

    /// The magnitude, if it fits in 128 bits.
    fn magnitude_u128(&self) -> Option<u128> {
        self.limbs.iter().rev().try_fold(0u128, |acc, &limb| {
            acc.checked_mul(BASE as u128)?.checked_add(limb as u128)
        })
    }

    pub fn to_i128(&self) -> Option<i128> {
        let magnitude = self.magnitude_u128()?;
        if self.negative {
            0i128.checked_sub_unsigned(magnitude)
        } else {
            i128::try_from(magnitude).ok()
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.to_i128().and_then(|v| i64::try_from(v).ok())
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.to_i128().and_then(|v| u64::try_from(v).ok())
    }

    /// `|self| mod m`. `m` must be nonzero.
    pub fn rem_u64(&self, m: u64) -> u64 {
        let m = m as u128;
        self.limbs
            .iter()
            .rev()
            .fold(0u128, |acc, &limb| (acc * BASE as u128 + limb as u128) % m) as u64
    }

    /// Nearest `f64`, rounded correctly.
    pub fn to_f64(&self) -> f64 {
        crate::number::parse_float(self.to_string().as_bytes()).unwrap_or(f64::NAN)
    }

    fn cmp_magnitude(&self, other: &BigInt) -> Ordering {
        self.limbs
            .len()
            .cmp(&other.limbs.len())
            .then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &BigInt) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => self.cmp_magnitude(other),
            (true, true) => other.cmp_magnitude(self),
        }
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &BigInt) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((top, rest)) = self.limbs.split_last() else {
            return f.write_str("0");
        };
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}", top)?;
        for limb in rest.iter().rev() {
            write!(f, "{:09}", limb)?;
        }
        Ok(())
    }
}

impl fmt::Debug for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let text = "-123456789012345678901234567890";
        assert_eq!(BigInt::parse(text).unwrap().to_string(), text);
        assert_eq!(BigInt::parse("000").unwrap().to_string(), "0");
        assert_eq!(BigInt::parse("-0").unwrap().to_string(), "0");
        assert_eq!(BigInt::parse("1000000000").unwrap().to_string(), "1000000000");
        assert_eq!(BigInt::parse("+5").unwrap().to_string(), "5");
        assert!(BigInt::parse("").is_none());
        assert!(BigInt::parse("-").is_none());
        assert!(BigInt::parse("12a").is_none());
    }

    #[test]
    fn narrowing() {
        let max = BigInt::parse("18446744073709551615").unwrap();
        assert_eq!(max.to_u64(), Some(u64::MAX));
        assert_eq!(max.to_i64(), None);
        let over = BigInt::parse("18446744073709551616").unwrap();
        assert_eq!(over.to_u64(), None);
        let min = BigInt::from_i128(i64::MIN as i128);
        assert_eq!(min.to_i64(), Some(i64::MIN));
        assert_eq!(BigInt::from_i128(i128::MIN).to_i128(), Some(i128::MIN));
        assert_eq!(BigInt::parse("1".repeat(50).as_str()).unwrap().to_i128(), None);
    }

    #[test]
    fn ordering() {
        let values: Vec<BigInt> = ["-100000000000000000000", "-5", "0", "7", "100000000000000000000"]
            .iter()
            .map(|s| BigInt::parse(s).unwrap())
            .collect();
        for pair in values.windows(2) {
            assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn remainder() {
        let big = BigInt::parse("100000000000000000000").unwrap();
        assert_eq!(big.rem_u64(7), (10u128.pow(20) % 7) as u64);
        assert_eq!(big.rem_u64(10), 0);
        assert_eq!(BigInt::parse("-100000000000000000003").unwrap().rem_u64(10), 3);
    }

    #[test]
    fn to_f64_rounds() {
        assert_eq!(BigInt::parse("18446744073709551617").unwrap().to_f64(), 18446744073709551616.0);
        assert_eq!(BigInt::parse("-1").unwrap().to_f64(), -1.0);
    }
}

use super::table::LEFT_SHIFT_DIGITS;

/// Digits kept before the decimal is marked as truncated.
pub const MAX_DIGITS: usize = 800;

const MAX_SHIFT: usize = 60;

/// Shift that keeps `decimal_point` moving toward zero for a given distance.
const POWERS: [usize; 19] = [
    0, 3, 6, 9, 13, 16, 19, 23, 26, 29, 33, 36, 39, 43, 46, 49, 53, 56, 59,
];

fn shift_for(n: usize) -> usize {
    POWERS.get(n).copied().unwrap_or(MAX_SHIFT)
}

/// A high precision decimal: the digits `0.d0 d1 d2 ... * 10^decimal_point`.
///
/// Used when the fast path cannot decide the rounding. Shifting by powers of
/// two lines the value up with a 53-bit mantissa window, which is then
/// rounded half-to-even.
#[derive(Clone)]
pub struct Decimal {
    num_digits: usize,
    decimal_point: i32,
    negative: bool,
    truncated: bool,
    digits: [u8; MAX_DIGITS],
}

impl Decimal {
    /// Parses `[+-]digits[.digits][(e|E)[+-]digits]`. Digits past
    /// [`MAX_DIGITS`] only set the truncation flag.
    pub fn parse(text: &[u8]) -> Option<Decimal> {
        let mut d = Decimal {
            num_digits: 0,
            decimal_point: 0,
            negative: false,
            truncated: false,
            digits: [0; MAX_DIGITS],
        };

        let mut i = 0;
        match text.first() {
            Some(b'-') => {
                d.negative = true;
                i += 1;
            }
            Some(b'+') => i += 1,
            _ => {}
        }

        let mut saw_dot = false;
        let mut saw_digit = false;
        // Significant digits seen, including those past MAX_DIGITS.
        let mut seen: i32 = 0;
        while let Some(&c) = text.get(i) {
            match c {
                b'.' if !saw_dot => {
                    saw_dot = true;
                    d.decimal_point = seen;
                }
                b'0'..=b'9' => {
                    saw_digit = true;
                    if c == b'0' && seen == 0 {
                        // leading zero
                        d.decimal_point -= 1;
                        i += 1;
                        continue;
                    }
                    if d.num_digits < MAX_DIGITS {
                        d.digits[d.num_digits] = c - b'0';
                        d.num_digits += 1;
                    } else if c != b'0' {
                        d.truncated = true;
                    }
                    seen = seen.saturating_add(1);
                }
                _ => break,
            }
            i += 1;
        }
        if !saw_digit {
            return None;
        }
        if !saw_dot {
            d.decimal_point = seen;
        }

        if let Some(b'e' | b'E') = text.get(i) {
            i += 1;
            let mut sign = 1;
            match text.get(i) {
                Some(b'-') => {
                    sign = -1;
                    i += 1;
                }
                Some(b'+') => i += 1,
                _ => {}
            }
            let start = i;
            let mut exp: i32 = 0;
            while let Some(&c @ b'0'..=b'9') = text.get(i) {
                if exp < 10_000 {
                    exp = exp * 10 + (c - b'0') as i32;
                }
                i += 1;
            }
            if i == start {
                return None;
            }
            d.decimal_point = d.decimal_point.saturating_add(sign * exp);
        }

        if i != text.len() {
            return None;
        }
        d.trim();
        Some(d)
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Converts to the nearest `f64`, rounding half-to-even.
    pub fn to_f64(mut self) -> f64 {
        const MIN_EXP: i32 = -1022;
        const EXP_MASK: i32 = 0x7FF;

        let sign = if self.negative { 1u64 << 63 } else { 0 };
        let make = |mantissa: u64, biased_exp: u64| f64::from_bits(sign | biased_exp << 52 | mantissa);
        let infinity = make(0, EXP_MASK as u64);

        if self.num_digits == 0 || self.decimal_point < -326 {
            return make(0, 0);
        }
        if self.decimal_point > 310 {
            return infinity;
        }

        // Scale into [0.5, 1).
        let mut exp2: i32 = 0;
        while self.decimal_point > 0 {
            let shift = shift_for(self.decimal_point as usize);
            self.right_shift(shift);
            exp2 += shift as i32;
        }
        while self.decimal_point <= 0 {
            let shift = if self.decimal_point == 0 {
                match self.digits[0] {
                    d if d >= 5 => break,
                    0 | 1 => 2,
                    _ => 1,
                }
            } else {
                shift_for(-self.decimal_point as usize)
            };
            self.left_shift(shift);
            exp2 -= shift as i32;
        }

        // [0.5, 1) to [1, 2).
        exp2 -= 1;
        while exp2 < MIN_EXP {
            let n = ((MIN_EXP - exp2) as usize).min(MAX_SHIFT);
            self.right_shift(n);
            exp2 += n as i32;
        }
        if exp2 - MIN_EXP >= EXP_MASK - 1 {
            return infinity;
        }

        self.shift(53);
        let mut mantissa = self.rounded_integer();
        if mantissa >= 1 << 53 {
            // Rounding overflowed into the next binade.
            self.right_shift(1);
            exp2 += 1;
            mantissa = self.rounded_integer();
            if exp2 - MIN_EXP >= EXP_MASK - 1 {
                return infinity;
            }
        }

        let mut biased = (exp2 - MIN_EXP + 1) as u64;
        if mantissa < 1 << 52 {
            biased = 0;
        }
        make(mantissa & ((1 << 52) - 1), biased)
    }

    fn trim(&mut self) {
        while self.num_digits > 0 && self.digits[self.num_digits - 1] == 0 {
            self.num_digits -= 1;
        }
    }

    fn shift(&mut self, mut shift: i32) {
        if self.num_digits == 0 {
            return;
        }
        while shift > MAX_SHIFT as i32 {
            self.left_shift(MAX_SHIFT);
            shift -= MAX_SHIFT as i32;
        }
        while shift < -(MAX_SHIFT as i32) {
            self.right_shift(MAX_SHIFT);
            shift += MAX_SHIFT as i32;
        }
        if shift > 0 {
            self.left_shift(shift as usize);
        } else if shift < 0 {
            self.right_shift(-shift as usize);
        }
    }

    /// Digits gained by multiplying by `2^shift`.
    fn left_shift_digits(&self, shift: usize) -> usize {
        let (delta, cutoff) = LEFT_SHIFT_DIGITS[shift];
        let delta = delta as usize;
        for (i, &c) in cutoff.as_bytes().iter().enumerate() {
            if i >= self.num_digits {
                return delta - 1;
            }
            let (digit, cut) = (self.digits[i], c - b'0');
            if digit != cut {
                return if digit < cut { delta - 1 } else { delta };
            }
        }
        delta
    }

    fn left_shift(&mut self, shift: usize) {
        if self.num_digits == 0 {
            return;
        }
        let new_digits = self.left_shift_digits(shift);
        let mut read = self.num_digits;
        let mut write = self.num_digits + new_digits;
        let mut n = 0u64;
        while read > 0 {
            read -= 1;
            write -= 1;
            n += (self.digits[read] as u64) << shift;
            let quotient = n / 10;
            let remainder = n - 10 * quotient;
            if write < MAX_DIGITS {
                self.digits[write] = remainder as u8;
            } else if remainder > 0 {
                self.truncated = true;
            }
            n = quotient;
        }
        while n > 0 {
            write -= 1;
            let quotient = n / 10;
            let remainder = n - 10 * quotient;
            if write < MAX_DIGITS {
                self.digits[write] = remainder as u8;
            } else if remainder > 0 {
                self.truncated = true;
            }
            n = quotient;
        }
        self.num_digits = (self.num_digits + new_digits).min(MAX_DIGITS);
        self.decimal_point += new_digits as i32;
        self.trim();
    }

    fn right_shift(&mut self, shift: usize) {
        let mut read = 0;
        let mut write = 0;
        let mut n = 0u64;

        // Pull in digits until the value is at least 2^shift.
        while (n >> shift) == 0 {
            if read < self.num_digits {
                n = 10 * n + self.digits[read] as u64;
                read += 1;
            } else if n == 0 {
                self.num_digits = 0;
                return;
            } else {
                while (n >> shift) == 0 {
                    n *= 10;
                    read += 1;
                }
                break;
            }
        }

        self.decimal_point -= read as i32 - 1;
        let mask = (1u64 << shift) - 1;
        while read < self.num_digits {
            let digit = (n >> shift) as u8;
            n = 10 * (n & mask) + self.digits[read] as u64;
            read += 1;
            self.digits[write] = digit;
            write += 1;
        }
        while n > 0 {
            let digit = (n >> shift) as u8;
            n = 10 * (n & mask);
            if write < MAX_DIGITS {
                self.digits[write] = digit;
                write += 1;
            } else if digit > 0 {
                self.truncated = true;
            }
        }
        self.num_digits = write;
        self.trim();
    }

    fn should_round_up(&self, at: usize) -> bool {
        if at >= self.num_digits {
            return false;
        }
        if self.digits[at] == 5 && at + 1 == self.num_digits {
            // Exactly half: a truncated tail means we are above half.
            if self.truncated {
                return true;
            }
            return at > 0 && self.digits[at - 1] % 2 == 1;
        }
        self.digits[at] >= 5
    }

    fn rounded_integer(&self) -> u64 {
        if self.decimal_point > 20 {
            return u64::MAX;
        }
        if self.decimal_point < 0 {
            return 0;
        }
        let point = self.decimal_point as usize;
        let mut n = 0u64;
        let mut i = 0;
        while i < point && i < self.num_digits {
            n = n * 10 + self.digits[i] as u64;
            i += 1;
        }
        while i < point {
            n *= 10;
            i += 1;
        }
        if self.should_round_up(point) {
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slow(text: &str) -> f64 {
        Decimal::parse(text.as_bytes()).map(Decimal::to_f64).unwrap()
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Decimal::parse(b"").is_none());
        assert!(Decimal::parse(b"-").is_none());
        assert!(Decimal::parse(b"1e").is_none());
        assert!(Decimal::parse(b"1x").is_none());
        assert!(Decimal::parse(b"1.2.3").is_none());
    }

    #[test]
    fn leading_and_trailing_zeros() {
        let d = Decimal::parse(b"000.0500").unwrap();
        assert_eq!(d.num_digits, 1);
        assert_eq!(d.decimal_point, -1);
        assert_eq!(slow("000.0500"), 0.05);
        assert_eq!(slow("100"), 100.0);
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(slow("9007199254740993"), 9007199254740992.0);
        assert_eq!(slow("9007199254740995"), 9007199254740996.0);
        // A nonzero digit past the halfway point must round up.
        assert_eq!(slow("9007199254740993.0000000000000000001"), 9007199254740994.0);
    }

    #[test]
    fn clamps_extreme_exponents() {
        assert_eq!(slow("1e-400"), 0.0);
        assert_eq!(slow("-1e-400").to_bits(), (-0.0f64).to_bits());
        assert_eq!(slow("1e400"), f64::INFINITY);
        assert_eq!(slow("-1e400"), f64::NEG_INFINITY);
    }

    #[test]
    fn subnormals() {
        assert_eq!(slow("4.9406564584124654e-324"), 5e-324);
        assert_eq!(slow("2.4703282292062327e-324"), 0.0);
        assert_eq!(slow("2.4703282292062328e-324"), 5e-324);
        assert_eq!(slow("2.2250738585072011e-308"), 2.225073858507201e-308);
    }

    #[test]
    fn max_boundary() {
        assert_eq!(slow("1.7976931348623157e308"), f64::MAX);
        assert_eq!(slow("1.7976931348623158e308"), f64::MAX);
        assert_eq!(slow("1.7976931348623159e308"), f64::INFINITY);
    }

    #[test]
    fn long_inputs_set_truncation() {
        let mut text = String::from("0.");
        text.push_str(&"1".repeat(900));
        let d = Decimal::parse(text.as_bytes()).unwrap();
        assert!(d.truncated);
        assert_eq!(d.to_f64(), 0.1111111111111111);
    }

    #[test]
    fn long_integer_parts_keep_their_magnitude() {
        let ones = format!("{}e-890", "1".repeat(900));
        let d = Decimal::parse(ones.as_bytes()).unwrap();
        assert!(d.truncated);
        assert_eq!(d.decimal_point, 10);
        assert_eq!(d.to_f64(), ones.parse::<f64>().unwrap());

        let padded = format!("9007199254740993{}e-900", "0".repeat(900));
        assert_eq!(slow(&padded), 9007199254740992.0);

        let with_fraction = format!("{}.5e-899", "2".repeat(900));
        assert_eq!(slow(&with_fraction), with_fraction.parse::<f64>().unwrap());
        assert_eq!(slow(&"7".repeat(1000)), "7".repeat(1000).parse::<f64>().unwrap());
    }
}

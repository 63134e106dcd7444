use super::table::{POW10_128, POW10_MAX, POW10_MIN};

/// Eisel-Lemire conversion of `mantissa * 10^exp10` to the nearest `f64`.
///
/// Returns `None` when the 128-bit product lands too close to a rounding
/// boundary to decide, or when the result would be subnormal or overflow.
/// Callers fall back to [`Decimal`](super::Decimal) in that case.
pub fn eisel_lemire(mantissa: u64, exp10: i32) -> Option<f64> {
    if mantissa == 0 {
        return Some(0.0);
    }
    if !(POW10_MIN..=POW10_MAX).contains(&exp10) {
        return None;
    }

    // Normalize so the top bit is set.
    let clz = mantissa.leading_zeros();
    let man = mantissa << clz;
    let mut ret_exp2 = ((217706 * exp10 as i64) >> 16) + 64 + 1023 - clz as i64;

    let (lo, hi) = POW10_128[(exp10 - POW10_MIN) as usize];
    let wide = man as u128 * hi as u128;
    let mut x_hi = (wide >> 64) as u64;
    let mut x_lo = wide as u64;

    // The low 9 bits are all ones and the truncated table entry could carry
    // into them: widen with the low half of the power.
    if x_hi & 0x1FF == 0x1FF && x_lo.wrapping_add(man) < man {
        let wide = man as u128 * lo as u128;
        let y_hi = (wide >> 64) as u64;
        let y_lo = wide as u64;
        let merged_lo = x_lo.wrapping_add(y_hi);
        let mut merged_hi = x_hi;
        if merged_lo < x_lo {
            merged_hi = merged_hi.wrapping_add(1);
        }
        if merged_hi & 0x1FF == 0x1FF
            && merged_lo.wrapping_add(1) == 0
            && y_lo.wrapping_add(man) < man
        {
            return None;
        }
        x_hi = merged_hi;
        x_lo = merged_lo;
    }

    let msb = x_hi >> 63;
    let mut ret_mantissa = x_hi >> (msb + 9);
    ret_exp2 -= (1 ^ msb) as i64;

    // Exactly halfway between two floats: round-half-even needs the full value.
    if x_lo == 0 && x_hi & 0x1FF == 0 && ret_mantissa & 3 == 1 {
        return None;
    }

    ret_mantissa += ret_mantissa & 1;
    ret_mantissa >>= 1;
    if ret_mantissa >> 53 > 0 {
        ret_mantissa >>= 1;
        ret_exp2 += 1;
    }

    // Biased exponent must land in 1..=0x7FE; anything else (including a
    // negative exponent, which wraps) is handled by the slow path.
    if (ret_exp2 - 1) as u64 >= 0x7FF - 1 {
        return None;
    }

    let bits = (ret_exp2 as u64) << 52 | (ret_mantissa & ((1 << 52) - 1));
    Some(f64::from_bits(bits))
}

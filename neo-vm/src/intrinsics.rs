//! Numeric helpers the dispatch loop calls into: checked and wrapping
//! 64-bit integer exponentiation, plus the floating-point routines
//! `neo_vm.c`'s `vmop_ceil`/`vmop_floor`/`vmop_mod` wrap libm for.

/// `x ^ k`, checked for overflow at every intermediate multiply, mirroring
/// `vmop_ipow64`'s exponentiation-by-squaring. `None` means a multiply
/// would have overflowed `i64`.
///
/// Negative exponents don't compute a fraction (there is no rational
/// result type here) — they fall back to the original's placeholder
/// values: `0^k = i64::MAX`, `1^k = 1`, `(-1)^k = -1` if `k` is odd else
/// `1`, anything else `0`.
pub fn ipow64_checked(x: i64, k: i64) -> Option<i64> {
    if k == 0 {
        return Some(1);
    }
    if k < 0 {
        return Some(negative_exponent_placeholder(x, k));
    }
    let mut x = x;
    let mut k = k as u64;
    while k & 1 == 0 {
        x = x.checked_mul(x)?;
        k >>= 1;
    }
    let mut y = x;
    k >>= 1;
    if k != 0 {
        loop {
            x = x.checked_mul(x)?;
            if k == 1 {
                break;
            }
            if k & 1 != 0 {
                y = y.checked_mul(x)?;
            }
            k >>= 1;
        }
        y = y.checked_mul(x)?;
    }
    Some(y)
}

/// `x ^ k`, with wrapping multiplies instead of overflow checks, mirroring
/// `vmop_ipow64_no_ov`.
pub fn ipow64_wrapping(x: i64, k: i64) -> i64 {
    if k == 0 {
        return 1;
    }
    if k < 0 {
        return negative_exponent_placeholder(x, k);
    }
    let mut x = x as u64;
    let mut k = k as u64;
    while k & 1 == 0 {
        x = x.wrapping_mul(x);
        k >>= 1;
    }
    let mut y = x;
    k >>= 1;
    if k != 0 {
        loop {
            x = x.wrapping_mul(x);
            if k == 1 {
                break;
            }
            if k & 1 != 0 {
                y = y.wrapping_mul(x);
            }
            k >>= 1;
        }
        y = y.wrapping_mul(x);
    }
    y as i64
}

fn negative_exponent_placeholder(x: i64, k: i64) -> i64 {
    match x {
        0 => i64::MAX,
        1 => 1,
        -1 => {
            if k & 1 != 0 {
                -1
            } else {
                1
            }
        }
        _ => 0,
    }
}

/// `ceil(x)`.
pub fn ceil(x: f64) -> f64 {
    x.ceil()
}

/// `floor(x)`.
pub fn floor(x: f64) -> f64 {
    x.floor()
}

/// `fmod(x, y)`, matching C's `fmod` (result takes the sign of `x`), the
/// semantics `vmop_mod` relies on.
pub fn fmod(x: f64, y: f64) -> f64 {
    x - y * (x / y).trunc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn checked_pow_matches_small_cases() {
        assert_eq!(ipow64_checked(2, 10), Some(1024));
        assert_eq!(ipow64_checked(3, 0), Some(1));
        assert_eq!(ipow64_checked(5, 1), Some(5));
    }

    #[test]
    fn checked_pow_reports_overflow() {
        assert_eq!(ipow64_checked(2, 63), None);
    }

    #[test]
    fn negative_exponent_placeholders() {
        assert_eq!(ipow64_checked(0, -1), Some(i64::MAX));
        assert_eq!(ipow64_checked(1, -5), Some(1));
        assert_eq!(ipow64_checked(-1, -1), Some(-1));
        assert_eq!(ipow64_checked(-1, -2), Some(1));
        assert_eq!(ipow64_checked(7, -3), Some(0));
    }

    #[test]
    fn wrapping_pow_never_panics_on_overflow() {
        assert_eq!(ipow64_wrapping(2, 64), 0);
    }

    #[test]
    fn fmod_matches_c_semantics() {
        assert_eq!(fmod(5.0, 3.0), 2.0);
        assert_eq!(fmod(-5.0, 3.0), -2.0);
    }

    #[quickcheck]
    fn checked_and_wrapping_pow_agree_when_no_overflow(x: i8, k: u8) -> bool {
        let x = x as i64;
        let k = (k % 8) as i64;
        match ipow64_checked(x, k) {
            Some(checked) => checked == ipow64_wrapping(x, k),
            None => true,
        }
    }
}

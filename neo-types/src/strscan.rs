//! Radix-aware numeric string scanning.
//!
//! Grounded on `neo_strscan_scan` and the `radix_t` / scan-result enums in
//! the original's `neo_core.h`: given a source slice, decide whether it
//! scans as an integer or a float, in which radix, and report overflow or
//! junk-trailing-input as distinct outcomes rather than folding them into a
//! single parse error. [`neo_parser`](https://docs.rs/neo-parser)'s numeric
//! literal lexing is the only consumer.

use crate::{Float, Int};

/// Numeric base a literal was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radix {
    /// Base 2, `0b`/`0B` prefixed.
    Binary,
    /// Base 8, `0o`/`0O` prefixed.
    Octal,
    /// Base 10, no prefix.
    Decimal,
    /// Base 16, `0x`/`0X` prefixed.
    Hex,
}

impl Radix {
    fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hex => 16,
        }
    }

    fn prefix_len(self) -> usize {
        match self {
            Radix::Decimal => 0,
            _ => 2,
        }
    }
}

/// Outcome of scanning a numeric literal's text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scanned {
    /// Scanned cleanly as an integer.
    Int(Int),
    /// Scanned cleanly as a float.
    Float(Float),
    /// The digits scanned but the magnitude doesn't fit in the target type.
    Overflow,
    /// The text isn't a well-formed number in any supported radix.
    Malformed,
}

/// Scans `text` as a Neo numeric literal.
///
/// `text` must already be isolated to just the literal (no surrounding
/// whitespace or trailing punctuation); the lexer is responsible for that
/// boundary. Underscores are accepted anywhere between digits as visual
/// separators and stripped before scanning, matching the original's
/// digit-separator handling.
pub fn scan_numeric(text: &str) -> Scanned {
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();
    if cleaned.is_empty() {
        return Scanned::Malformed;
    }

    let radix = detect_radix(&cleaned);
    if radix != Radix::Decimal {
        let digits = &cleaned[radix.prefix_len()..];
        if digits.is_empty() {
            return Scanned::Malformed;
        }
        return match Int::from_str_radix(digits, radix.base()) {
            Ok(value) => Scanned::Int(value),
            Err(_) => {
                if digits.chars().all(|c| c.is_digit(radix.base())) {
                    Scanned::Overflow
                } else {
                    Scanned::Malformed
                }
            }
        };
    }

    if cleaned.contains(['.', 'e', 'E']) {
        return match cleaned.parse::<Float>() {
            Ok(value) => Scanned::Float(value),
            Err(_) => Scanned::Malformed,
        };
    }

    match cleaned.parse::<Int>() {
        Ok(value) => Scanned::Int(value),
        Err(_) => {
            if cleaned
                .strip_prefix('-')
                .unwrap_or(&cleaned)
                .chars()
                .all(|c| c.is_ascii_digit())
            {
                Scanned::Overflow
            } else {
                Scanned::Malformed
            }
        }
    }
}

fn detect_radix(text: &str) -> Radix {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'b' | b'B' => return Radix::Binary,
            b'o' | b'O' | b'c' | b'C' => return Radix::Octal,
            b'x' | b'X' => return Radix::Hex,
            _ => {}
        }
    }
    Radix::Decimal
}

#[cfg(test)]
mod radix_alias_tests {
    use super::*;

    #[test]
    fn octal_c_alias_matches_o_prefix() {
        assert_eq!(scan_numeric("0c52"), scan_numeric("0o52"));
        assert_eq!(scan_numeric("0C52"), scan_numeric("0o52"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", Scanned::Int(42))]
    #[case("-42", Scanned::Int(-42))]
    #[case("0x2a", Scanned::Int(42))]
    #[case("0b101010", Scanned::Int(42))]
    #[case("0o52", Scanned::Int(42))]
    #[case("1_000_000", Scanned::Int(1_000_000))]
    #[case("3.14", Scanned::Float(3.14))]
    #[case("1e10", Scanned::Float(1e10))]
    fn scans_expected(#[case] input: &str, #[case] expected: Scanned) {
        assert_eq!(scan_numeric(input), expected);
    }

    #[test]
    fn empty_is_malformed() {
        assert_eq!(scan_numeric(""), Scanned::Malformed);
    }

    #[test]
    fn overflowing_decimal_is_overflow() {
        assert_eq!(scan_numeric("999999999999999999999999999"), Scanned::Overflow);
    }

    #[test]
    fn overflowing_hex_is_overflow() {
        assert_eq!(
            scan_numeric("0xffffffffffffffffffffffff"),
            Scanned::Overflow
        );
    }

    #[test]
    fn junk_is_malformed() {
        assert_eq!(scan_numeric("12ab"), Scanned::Malformed);
        assert_eq!(scan_numeric("0xzz"), Scanned::Malformed);
    }
}

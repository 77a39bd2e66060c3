//! Arbitrary-precision decimal numbers.
//!
//! Stored normalized (sign, significant digits, base-10 exponent) so equality
//! is numeric equality. Conversions to `i64`/`f64` only succeed when exact.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// `digits × 10^exponent`, negated when `negative`.
///
/// `digits` has no leading or trailing zeros; zero is the empty digit string
/// with exponent 0 and a positive sign.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Number {
    negative: bool,
    digits: String,
    exponent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid number literal {0:?}")]
pub struct ParseNumberError(pub String);

// above this many padding zeros Display switches to scientific form
const PLAIN_ZEROS_MAX: i64 = 32;

impl Number {
    pub fn zero() -> Self { Self { negative: false, digits: String::new(), exponent: 0 } }

    /// `None` when folding trailing zeros into the exponent overflows it.
    fn from_parts(negative: bool, raw_digits: &str, exponent: i64) -> Option<Self> {
        let trimmed = raw_digits.trim_start_matches('0');
        if trimmed.is_empty() {
            return Some(Self::zero());
        }
        let significant = trimmed.trim_end_matches('0');
        let dropped = (trimmed.len() - significant.len()) as i64;
        let exponent = exponent.checked_add(dropped)?;
        Some(Self { negative, digits: significant.to_owned(), exponent })
    }

    fn from_magnitude(negative: bool, magnitude: u64) -> Self {
        let text = magnitude.to_string();
        let significant = text.trim_end_matches('0');
        if significant.is_empty() {
            return Self::zero();
        }
        let exponent = (text.len() - significant.len()) as i64;
        Self { negative, digits: significant.to_owned(), exponent }
    }

    /// Position of the decimal point counted from the left of `digits`.
    fn point(&self) -> i128 { self.digits.len() as i128 + i128::from(self.exponent) }

    pub fn is_zero(&self) -> bool { self.digits.is_empty() }

    pub fn is_negative(&self) -> bool { self.negative }

    pub fn is_integer(&self) -> bool { self.exponent >= 0 }

    /// Exact decimal denotation of a finite `f64`: the full integer expansion
    /// for integral values, the shortest round-trip text otherwise.
    pub fn from_f64(f: f64) -> Option<Self> {
        if !f.is_finite() {
            return None;
        }
        let text = if f == f.trunc() { format!("{f:.0}") } else { format!("{f}") };
        text.parse().ok()
    }

    /// Lossless view of a generic JSON number.
    pub fn from_json(n: &serde_json::Number) -> Option<Self> {
        if let Some(i) = n.as_i64() {
            Some(i.into())
        } else if let Some(u) = n.as_u64() {
            Some(u.into())
        } else {
            n.as_f64().and_then(Self::from_f64)
        }
    }

    pub fn to_i64_exact(&self) -> Option<i64> {
        if self.is_zero() {
            return Some(0);
        }
        if !self.is_integer() || self.point() > 19 {
            return None;
        }
        let mut text = self.digits.clone();
        text.extend(std::iter::repeat_n('0', self.exponent as usize));
        let magnitude: i128 = text.parse().ok()?;
        i64::try_from(if self.negative { -magnitude } else { magnitude }).ok()
    }

    /// The `f64` this number denotes, if it denotes one exactly.
    pub fn to_f64_exact(&self) -> Option<f64> {
        let f: f64 = self.to_string().parse().ok()?;
        match Self::from_f64(f) {
            Some(back) if back == *self => Some(f),
            _ => None,
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Self::from_magnitude(i < 0, i.unsigned_abs())
    }
}

impl From<u64> for Number {
    fn from(u: u64) -> Self { Self::from_magnitude(false, u) }
}

impl FromStr for Number {
    type Err = ParseNumberError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseNumberError(src.to_owned());

        let (negative, rest) = match src.as_bytes().first() {
            Some(b'-') => (true, &src[1..]),
            Some(b'+') => (false, &src[1..]),
            _ => (false, src),
        };
        let (mantissa, exp) = match rest.find(['e', 'E']) {
            Some(at) => (&rest[..at], Some(&rest[at + 1..])),
            None => (rest, None),
        };
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }
        let exponent: i64 = match exp {
            Some(e) => {
                let body = e.strip_prefix(['+', '-']).unwrap_or(e);
                if body.is_empty() || !all_digits(body) {
                    return Err(invalid());
                }
                e.parse().map_err(|_| invalid())?
            }
            None => 0,
        };
        let exponent = exponent
            .checked_sub(frac_part.len() as i64)
            .ok_or_else(invalid)?;

        let mut raw = String::with_capacity(int_part.len() + frac_part.len());
        raw.push_str(int_part);
        raw.push_str(frac_part);
        Self::from_parts(negative, &raw, exponent).ok_or_else(invalid)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        if self.negative {
            f.write_str("-")?;
        }
        let point = self.point();
        let plain_max = i128::from(PLAIN_ZEROS_MAX);
        if self.exponent >= 0 && self.exponent <= PLAIN_ZEROS_MAX {
            f.write_str(&self.digits)?;
            (0..self.exponent).try_for_each(|_| f.write_str("0"))
        } else if self.exponent < 0 && point > 0 {
            let (head, tail) = self.digits.split_at(point as usize);
            write!(f, "{head}.{tail}")
        } else if self.exponent < 0 && -point <= plain_max {
            f.write_str("0.")?;
            (0..-point).try_for_each(|_| f.write_str("0"))?;
            f.write_str(&self.digits)
        } else {
            let (lead, rest) = self.digits.split_at(1);
            if rest.is_empty() {
                write!(f, "{lead}e{}", point - 1)
            } else {
                write!(f, "{lead}.{rest}e{}", point - 1)
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

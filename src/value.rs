//! Conversions between stored text and the typed values callers read and write.
//!
//! Every value is kept as text. Integers are written in decimal and read back in decimal or,
//! when the text carries a `0x`/`0X` prefix, hexadecimal. Reads are lenient the way `atoi` and
//! `atof` are: the longest numeric prefix is used and text without one reads as zero.

use crate::section::trim;

/// A type that can be stored in an [`IniFile`](crate::IniFile) entry.
pub trait IniValue: Sized {
    fn to_ini_string(&self) -> String;

    fn from_ini_str(text: &str) -> Self;
}

impl IniValue for String {
    fn to_ini_string(&self) -> String {
        self.clone()
    }

    fn from_ini_str(text: &str) -> Self {
        text.to_owned()
    }
}

impl IniValue for i64 {
    fn to_ini_string(&self) -> String {
        self.to_string()
    }

    fn from_ini_str(text: &str) -> Self {
        parse_integer(text)
    }
}

// Narrower integers are read through `i64` and truncated, so `-1` reads as `u32::MAX` and
// `0x1FF` as `0xFF` for a `u8`.
macro_rules! impl_narrow_integer {
    ($($ty:ty),*) => {
        $(
            impl IniValue for $ty {
                fn to_ini_string(&self) -> String {
                    self.to_string()
                }

                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_possible_wrap
                )]
                fn from_ini_str(text: &str) -> Self {
                    parse_integer(text) as $ty
                }
            }
        )*
    };
}

impl_narrow_integer!(u64, i32, u32, i16, u16, u8);

impl IniValue for f64 {
    fn to_ini_string(&self) -> String {
        format!("{self:.6}")
    }

    fn from_ini_str(text: &str) -> Self {
        parse_float(text)
    }
}

impl IniValue for f32 {
    fn to_ini_string(&self) -> String {
        f64::from(*self).to_ini_string()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_ini_str(text: &str) -> Self {
        parse_float(text) as f32
    }
}

/// Whether `text` is written as a hexadecimal number, i.e. starts with `0x` or `0X` after
/// surrounding whitespace and an optional sign.
#[must_use]
pub fn is_hex(text: &str) -> bool {
    strip_hex_prefix(strip_sign(trim(text)).1).is_some()
}

fn strip_sign(text: &str) -> (bool, &str) {
    match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    }
}

fn strip_hex_prefix(text: &str) -> Option<&str> {
    text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
}

#[allow(clippy::cast_possible_wrap)]
fn parse_integer(text: &str) -> i64 {
    let (negative, digits) = strip_sign(trim(text));

    let magnitude = match strip_hex_prefix(digits) {
        Some(hex) => fold_digits(hex, 16),
        None => fold_digits(digits, 10),
    } as i64;

    if negative {
        magnitude.wrapping_neg()
    } else {
        magnitude
    }
}

fn fold_digits(text: &str, radix: u32) -> u64 {
    text.chars()
        .map_while(|c| c.to_digit(radix))
        .fold(0, |acc, digit| {
            acc.wrapping_mul(u64::from(radix))
                .wrapping_add(u64::from(digit))
        })
}

fn parse_float(text: &str) -> f64 {
    float_prefix(trim(text)).parse().unwrap_or(0.0)
}

/// The longest prefix of `text` that reads as a decimal floating point number.
fn float_prefix(text: &str) -> &str {
    let bytes = text.as_bytes();
    let skip_digits = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer_start = end;
    end = skip_digits(end);
    let mut has_digits = end > integer_start;

    if bytes.get(end) == Some(&b'.') {
        let fraction_start = end + 1;
        let fraction_end = skip_digits(fraction_start);
        has_digits |= fraction_end > fraction_start;
        end = fraction_end;
    }

    if !has_digits {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_end = skip_digits(exponent);
        if exponent_end > exponent {
            end = exponent_end;
        }
    }

    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_requires_prefix() {
        assert!(is_hex("0x1A"));
        assert!(is_hex(" 0XfF \r\n"));
        assert!(is_hex("-0x10"));
        assert!(!is_hex("1A"));
        assert!(!is_hex("26"));
        assert!(!is_hex("x10"));
    }

    #[test]
    fn integers() {
        assert_eq!(u16::from_ini_str("0x1A"), 26);
        assert_eq!(u16::from_ini_str("0X1a"), 26);
        assert_eq!(i32::from_ini_str(" -42 "), -42);
        assert_eq!(i32::from_ini_str("+7"), 7);
        assert_eq!(i64::from_ini_str("-0x10"), -16);
        assert_eq!(u32::from_ini_str("12abc"), 12);
        assert_eq!(u32::from_ini_str("abc"), 0);
        assert_eq!(u8::from_ini_str(""), 0);
    }

    #[test]
    fn narrow_integers_truncate() {
        assert_eq!(u32::from_ini_str("-1"), u32::MAX);
        assert_eq!(u8::from_ini_str("0x1FF"), 0xFF);
        assert_eq!(i16::from_ini_str("65535"), -1);
    }

    #[test]
    fn wide_integers_round_trip() {
        for value in [0, 1, u64::MAX, u64::MAX / 3] {
            assert_eq!(u64::from_ini_str(&value.to_ini_string()), value);
        }
        for value in [i64::MIN, -1, 0, i64::MAX] {
            assert_eq!(i64::from_ini_str(&value.to_ini_string()), value);
        }
    }

    #[test]
    fn floats_use_fixed_notation() {
        assert_eq!(1.25f64.to_ini_string(), "1.250000");
        assert_eq!(0.987f32.to_ini_string(), "0.987000");
        assert_eq!(1e7f64.to_ini_string(), "10000000.000000");
        assert_eq!(f32::from_ini_str(&0.987f32.to_ini_string()), 0.987);
    }

    #[test]
    fn floats_parse_like_atof() {
        assert_eq!(f64::from_ini_str("1.250000"), 1.25);
        assert_eq!(f64::from_ini_str(" -.5 "), -0.5);
        assert_eq!(f64::from_ini_str("2.5e2xyz"), 250.0);
        assert_eq!(f64::from_ini_str("3e"), 3.0);
        assert_eq!(f64::from_ini_str("7."), 7.0);
        assert_eq!(f64::from_ini_str("."), 0.0);
        assert_eq!(f64::from_ini_str("0x10"), 0.0);
        assert_eq!(f64::from_ini_str("n/a"), 0.0);
    }
}

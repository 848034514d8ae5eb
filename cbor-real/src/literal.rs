//! Parsing and formatting of decimal number literals, shared by the
//! extended-number facades.

use alloc::string::{
    String,
    ToString,
};
use cbor_bigint::BigInt;
use core::fmt::Write;

/// Error parsing an extended-number literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ParseNumberError {
    /// The input was empty, or a bare sign.
    #[display(fmt = "no digits in input")]
    Empty,
    /// The input did not match
    /// `-? digit+ ('.' digit+)? ([eE] [-+]? digit+)?` or a special-value
    /// literal.
    #[display(fmt = "malformed number literal")]
    Invalid,
}

#[cfg(feature = "std")]
impl std::error::Error for ParseNumberError {}

/// A parsed literal, radix-independent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Literal {
    Finite {
        negative: bool,
        mantissa: BigInt,
        exponent: BigInt,
    },
    Infinity {
        negative: bool,
    },
    NaN {
        negative: bool,
        signaling: bool,
        payload: BigInt,
    },
}

fn parse_digits(s: &str) -> Result<BigInt, ParseNumberError> {
    if s.is_empty() {
        return Err(ParseNumberError::Empty);
    }
    s.parse().map_err(|_| ParseNumberError::Invalid)
}

/// Parse `-? digit+ ('.' digit+)? ([eE] [-+]? digit+)?`, plus the special
/// literals `Infinity`, `NaN` and `sNaN` with an optional payload.
pub(crate) fn parse(input: &str) -> Result<Literal, ParseNumberError> {
    let (negative, rest) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => match input.strip_prefix('+') {
            Some(rest) => (false, rest),
            None => (false, input),
        },
    };
    if rest.is_empty() {
        return Err(ParseNumberError::Empty);
    }
    if rest.eq_ignore_ascii_case("infinity") || rest.eq_ignore_ascii_case("inf") {
        return Ok(Literal::Infinity { negative });
    }
    for (prefix, signaling) in [("snan", true), ("nan", false)] {
        if rest.len() >= prefix.len()
            && rest[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            let payload_digits = &rest[prefix.len()..];
            let payload = if payload_digits.is_empty() {
                BigInt::zero()
            } else {
                parse_digits(payload_digits)?
            };
            if payload.is_negative() {
                return Err(ParseNumberError::Invalid);
            }
            return Ok(Literal::NaN {
                negative,
                signaling,
                payload,
            });
        }
    }

    let (number, exp_part) = match rest.find(['e', 'E']) {
        Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
        None => (rest, None),
    };
    let (int_part, frac_part) = match number.find('.') {
        Some(pos) => (&number[..pos], Some(&number[pos + 1..])),
        None => (number, None),
    };
    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseNumberError::Invalid);
    }
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseNumberError::Invalid);
        }
    }
    let mut digits = String::with_capacity(number.len());
    digits.push_str(int_part);
    let frac_len = match frac_part {
        Some(frac) => {
            digits.push_str(frac);
            frac.len() as i64
        }
        None => 0,
    };
    let mantissa = parse_digits(&digits)?;
    let mut exponent = BigInt::from(-frac_len);
    if let Some(exp) = exp_part {
        let exp = exp.strip_prefix('+').unwrap_or(exp);
        if exp.is_empty() {
            return Err(ParseNumberError::Invalid);
        }
        let has_sign = exp.starts_with('-');
        let body = if has_sign { &exp[1..] } else { exp };
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseNumberError::Invalid);
        }
        let e: BigInt = exp.parse().map_err(|_| ParseNumberError::Invalid)?;
        exponent = &exponent + &e;
    }
    Ok(Literal::Finite {
        negative,
        mantissa,
        exponent,
    })
}

/// Format per the to-scientific-string rules: plain notation when
/// `exponent <= 0` and the adjusted exponent is at least −6, scientific
/// otherwise. With `engineering`, the displayed exponent is a multiple of
/// three.
pub(crate) fn format_finite(
    negative: bool,
    mantissa: &BigInt,
    exponent: &BigInt,
    engineering: bool,
) -> String {
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let coeff = mantissa.to_string();
    let digits = coeff.len() as i64;
    let small_exp = i64::try_from(exponent).ok();

    if let Some(e) = small_exp {
        let adjusted = e + digits - 1;
        if e <= 0 && adjusted >= -6 {
            // Plain notation.
            if e == 0 {
                out.push_str(&coeff);
            } else {
                let point = digits + e;
                if point > 0 {
                    out.push_str(&coeff[..point as usize]);
                    out.push('.');
                    out.push_str(&coeff[point as usize..]);
                } else {
                    out.push_str("0.");
                    for _ in 0..-point {
                        out.push('0');
                    }
                    out.push_str(&coeff);
                }
            }
            return out;
        }
    }

    // Scientific notation over an arbitrary-precision adjusted exponent.
    let adjusted = exponent + BigInt::from(digits) - BigInt::one();
    if engineering {
        if mantissa.is_zero() {
            let rem = rem_floor_3(exponent);
            let zeros = (3 - rem) % 3;
            out.push('0');
            if zeros > 0 {
                out.push('.');
                for _ in 0..zeros {
                    out.push('0');
                }
            }
            let shown = exponent + BigInt::from(zeros);
            push_exponent(&mut out, &shown);
            return out;
        }
        let rem = rem_floor_3(&adjusted);
        let int_digits = (rem + 1) as usize;
        let shown = &adjusted - &BigInt::from(rem);
        if coeff.len() <= int_digits {
            out.push_str(&coeff);
            for _ in 0..int_digits - coeff.len() {
                out.push('0');
            }
        } else {
            out.push_str(&coeff[..int_digits]);
            out.push('.');
            out.push_str(&coeff[int_digits..]);
        }
        push_exponent(&mut out, &shown);
        return out;
    }
    out.push_str(&coeff[..1]);
    if coeff.len() > 1 {
        out.push('.');
        out.push_str(&coeff[1..]);
    }
    push_exponent(&mut out, &adjusted);
    out
}

/// Format without exponential notation, padding zeros as needed. Falls
/// back to scientific notation when the exponent does not fit a machine
/// word (the padding would be astronomical).
pub(crate) fn format_plain(
    negative: bool,
    mantissa: &BigInt,
    exponent: &BigInt,
) -> String {
    let Ok(e) = i64::try_from(exponent) else {
        return format_finite(negative, mantissa, exponent, false);
    };
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let coeff = mantissa.to_string();
    if e >= 0 {
        out.push_str(&coeff);
        if !mantissa.is_zero() {
            for _ in 0..e {
                out.push('0');
            }
        }
        return out;
    }
    let point = coeff.len() as i64 + e;
    if point > 0 {
        out.push_str(&coeff[..point as usize]);
        out.push('.');
        out.push_str(&coeff[point as usize..]);
    } else {
        out.push_str("0.");
        for _ in 0..-point {
            out.push('0');
        }
        out.push_str(&coeff);
    }
    out
}

/// `v mod 3` with a non-negative result.
fn rem_floor_3(v: &BigInt) -> i64 {
    let three = BigInt::from(3u32);
    let r = v % &three;
    let r = i64::try_from(&r).unwrap_or(0);
    if r < 0 {
        r + 3
    } else {
        r
    }
}

fn push_exponent(out: &mut String, e: &BigInt) {
    out.push('E');
    if !e.is_negative() {
        out.push('+');
    }
    let _ = write!(out, "{e}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finite(s: &str) -> (bool, BigInt, BigInt) {
        match parse(s).unwrap() {
            Literal::Finite {
                negative,
                mantissa,
                exponent,
            } => (negative, mantissa, exponent),
            other => panic!("expected finite literal, got {other:?}"),
        }
    }

    #[test]
    fn parses_the_full_grammar() {
        assert_eq!(
            finite("123"),
            (false, BigInt::from(123u32), BigInt::zero())
        );
        assert_eq!(
            finite("-12.34"),
            (true, BigInt::from(1234u32), BigInt::from(-2i32))
        );
        assert_eq!(
            finite("1.23E+5"),
            (false, BigInt::from(123u32), BigInt::from(3u32))
        );
        assert_eq!(
            finite("0.001e-2"),
            (false, BigInt::from(1u32), BigInt::from(-5i32))
        );
    }

    #[test]
    fn parses_specials() {
        assert_eq!(parse("Infinity").unwrap(), Literal::Infinity { negative: false });
        assert_eq!(parse("-infinity").unwrap(), Literal::Infinity { negative: true });
        assert_eq!(
            parse("NaN").unwrap(),
            Literal::NaN {
                negative: false,
                signaling: false,
                payload: BigInt::zero()
            }
        );
        assert_eq!(
            parse("sNaN42").unwrap(),
            Literal::NaN {
                negative: false,
                signaling: true,
                payload: BigInt::from(42u32)
            }
        );
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "-", ".", "1.", ".5", "1e", "1e+", "1.2.3", "12a", "e5"] {
            assert!(parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn formats_plain_and_scientific() {
        let fmt = |m: i64, e: i64| {
            format_finite(
                m < 0,
                &BigInt::from(m.unsigned_abs()),
                &BigInt::from(e),
                false,
            )
        };
        assert_eq!(fmt(123, 0), "123");
        assert_eq!(fmt(1234, -2), "12.34");
        assert_eq!(fmt(5, -7), "5E-7");
        assert_eq!(fmt(5, -6), "0.000005");
        assert_eq!(fmt(123, 1), "1.23E+3");
        assert_eq!(fmt(-123, -2), "-1.23");
        assert_eq!(fmt(0, 0), "0");
        assert_eq!(fmt(0, -2), "0.00");
    }

    #[test]
    fn engineering_exponent_is_a_multiple_of_three() {
        let fmt = |m: u64, e: i64| {
            format_finite(false, &BigInt::from(m), &BigInt::from(e), true)
        };
        assert_eq!(fmt(123, 1), "1.23E+3");
        assert_eq!(fmt(123, 2), "12.3E+3");
        assert_eq!(fmt(123, 3), "123E+3");
        assert_eq!(fmt(1, -7), "100E-9");
    }
}

//! Exact rational numbers over [`BigInt`] pairs.

use cbor_bigint::BigInt;
use core::{
    cmp::Ordering,
    fmt,
    str::FromStr,
};

use crate::{
    context::{
        ArithmeticError,
        PrecisionContext,
    },
    decimal::ExtendedDecimal,
    float::ExtendedFloat,
    literal::ParseNumberError,
    number::{
        NumberFlags,
        RadixNumber,
    },
};

/// An exact rational `(-1)^sign * numerator / denominator`, plus the
/// infinities and NaNs.
///
/// Finite values are kept in lowest terms with a positive denominator, so
/// structural equality is value equality for finite rationals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedRational {
    numerator: BigInt,
    denominator: BigInt,
    flags: NumberFlags,
}

impl ExtendedRational {
    /// The value `0/1`.
    pub fn zero() -> Self {
        Self {
            numerator: BigInt::zero(),
            denominator: BigInt::one(),
            flags: NumberFlags::empty(),
        }
    }

    /// The value `1/1`.
    pub fn one() -> Self {
        Self {
            numerator: BigInt::one(),
            denominator: BigInt::one(),
            flags: NumberFlags::empty(),
        }
    }

    /// A quiet NaN.
    pub fn nan() -> Self {
        Self {
            numerator: BigInt::zero(),
            denominator: BigInt::one(),
            flags: NumberFlags::QUIET_NAN,
        }
    }

    /// Positive or negative infinity.
    pub fn infinity(negative: bool) -> Self {
        let mut flags = NumberFlags::INFINITY;
        if negative {
            flags |= NumberFlags::NEGATIVE;
        }
        Self {
            numerator: BigInt::zero(),
            denominator: BigInt::one(),
            flags,
        }
    }

    /// Build from signed numerator and denominator, reducing to lowest
    /// terms. A zero denominator is a [`cbor_bigint::Error::DivideByZero`].
    pub fn new(
        numerator: BigInt,
        denominator: BigInt,
    ) -> Result<Self, cbor_bigint::Error> {
        if denominator.is_zero() {
            return Err(cbor_bigint::Error::DivideByZero);
        }
        let negative = numerator.is_negative() != denominator.is_negative();
        let n = numerator.abs();
        let d = denominator.abs();
        // gcd(0, d) = d, so zero numerators normalise to 0/1.
        let g = n.gcd(&d);
        let n = n.div_rem(&g)?.0;
        let d = d.div_rem(&g)?.0;
        let flags = if negative {
            NumberFlags::NEGATIVE
        } else {
            NumberFlags::empty()
        };
        Ok(Self {
            numerator: n,
            denominator: d,
            flags,
        })
    }

    /// The unsigned numerator.
    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    /// The positive denominator.
    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    /// The numerator with the sign applied.
    pub fn signed_numerator(&self) -> BigInt {
        if self.is_negative() {
            -self.numerator.clone()
        } else {
            self.numerator.clone()
        }
    }

    /// Whether this value is negative.
    pub fn is_negative(&self) -> bool {
        self.flags.contains(NumberFlags::NEGATIVE)
    }

    /// Whether this value is a NaN.
    pub fn is_nan(&self) -> bool {
        self.flags
            .intersects(NumberFlags::QUIET_NAN | NumberFlags::SIGNALING_NAN)
    }

    /// Whether this value is an infinity.
    pub fn is_infinite(&self) -> bool {
        self.flags.contains(NumberFlags::INFINITY)
    }

    /// Whether this value is finite.
    pub fn is_finite(&self) -> bool {
        !self.flags.intersects(NumberFlags::SPECIAL)
    }

    /// Whether this value is a zero of either sign.
    pub fn is_zero_value(&self) -> bool {
        self.is_finite() && self.numerator.is_zero()
    }

    fn binary_special(&self, other: &Self, both_infinite_invalid: bool) -> Option<Self> {
        if self.is_nan() || other.is_nan() {
            return Some(Self::nan());
        }
        if self.is_infinite() && other.is_infinite() && both_infinite_invalid {
            return Some(Self::nan());
        }
        None
    }

    /// Exact sum.
    pub fn add(&self, other: &Self) -> Self {
        if let Some(s) = self.binary_special(other, false) {
            return s;
        }
        match (self.is_infinite(), other.is_infinite()) {
            (true, true) => {
                return if self.is_negative() == other.is_negative() {
                    self.clone()
                } else {
                    Self::nan()
                }
            }
            (true, false) => return self.clone(),
            (false, true) => return other.clone(),
            (false, false) => {}
        }
        let n = &self.signed_numerator() * &other.denominator
            + &other.signed_numerator() * &self.denominator;
        let d = &self.denominator * &other.denominator;
        Self::new(n, d).unwrap_or_else(|_| Self::nan())
    }

    /// Exact difference.
    pub fn subtract(&self, other: &Self) -> Self {
        self.add(&other.negate())
    }

    /// Exact product.
    pub fn multiply(&self, other: &Self) -> Self {
        if let Some(s) = self.binary_special(other, false) {
            return s;
        }
        let negative = self.is_negative() != other.is_negative();
        if self.is_infinite() || other.is_infinite() {
            if self.is_zero_value() || other.is_zero_value() {
                return Self::nan();
            }
            return Self::infinity(negative);
        }
        let n = &self.signed_numerator() * &other.signed_numerator();
        let d = &self.denominator * &other.denominator;
        Self::new(n, d).unwrap_or_else(|_| Self::nan())
    }

    /// Exact quotient; division by zero yields an infinity (NaN for 0/0).
    pub fn divide(&self, other: &Self) -> Self {
        if let Some(s) = self.binary_special(other, true) {
            return s;
        }
        let negative = self.is_negative() != other.is_negative();
        if self.is_infinite() {
            return Self::infinity(negative);
        }
        if other.is_infinite() {
            return Self::zero();
        }
        if other.numerator.is_zero() {
            if self.numerator.is_zero() {
                return Self::nan();
            }
            return Self::infinity(negative);
        }
        let n = &self.signed_numerator() * &other.denominator;
        let d = &self.denominator * &other.signed_numerator();
        Self::new(n, d).unwrap_or_else(|_| Self::nan())
    }

    /// The value with the sign flipped.
    pub fn negate(&self) -> Self {
        Self {
            numerator: self.numerator.clone(),
            denominator: self.denominator.clone(),
            flags: self.flags ^ NumberFlags::NEGATIVE,
        }
    }

    /// The absolute value.
    pub fn abs(&self) -> Self {
        Self {
            numerator: self.numerator.clone(),
            denominator: self.denominator.clone(),
            flags: self.flags - NumberFlags::NEGATIVE,
        }
    }

    /// Numeric comparison; `None` when either operand is a NaN.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        if self.is_nan() || other.is_nan() {
            return None;
        }
        match (self.is_infinite(), other.is_infinite()) {
            (true, true) => {
                return Some(match (self.is_negative(), other.is_negative()) {
                    (x, y) if x == y => Ordering::Equal,
                    (true, _) => Ordering::Less,
                    _ => Ordering::Greater,
                })
            }
            (true, false) => {
                return Some(if self.is_negative() {
                    Ordering::Less
                } else {
                    Ordering::Greater
                })
            }
            (false, true) => {
                return Some(if other.is_negative() {
                    Ordering::Greater
                } else {
                    Ordering::Less
                })
            }
            (false, false) => {}
        }
        let lhs = &self.signed_numerator() * &other.denominator;
        let rhs = &other.signed_numerator() * &self.denominator;
        Some(lhs.cmp(&rhs))
    }

    /// Exact conversion from a decimal representation.
    pub fn from_extended_decimal(value: &ExtendedDecimal) -> Self {
        Self::from_scaled(
            value.flags(),
            value.mantissa(),
            value.exponent(),
            10,
        )
    }

    /// Exact conversion from a binary representation.
    pub fn from_extended_float(value: &ExtendedFloat) -> Self {
        Self::from_scaled(value.flags(), value.mantissa(), value.exponent(), 2)
    }

    fn from_scaled(
        flags: NumberFlags,
        mantissa: &BigInt,
        exponent: &BigInt,
        radix: u32,
    ) -> Self {
        if flags.intersects(NumberFlags::SPECIAL) {
            return Self {
                numerator: mantissa.clone(),
                denominator: BigInt::one(),
                flags,
            };
        }
        let base = BigInt::from(radix);
        let (n, d) = if exponent.is_negative() {
            let k = u64::try_from(&-exponent).unwrap_or(u64::MAX);
            (mantissa.clone(), base.pow(k as u32))
        } else {
            let k = u64::try_from(exponent).unwrap_or(u64::MAX);
            (mantissa * &base.pow(k as u32), BigInt::one())
        };
        let mut out = Self::new(n, d).unwrap_or_else(|_| Self::nan());
        if flags.contains(NumberFlags::NEGATIVE) {
            out.flags |= NumberFlags::NEGATIVE;
        }
        out
    }

    /// Convert to decimal, dividing at the context's precision.
    pub fn to_extended_decimal(
        &self,
        ctx: &mut PrecisionContext,
    ) -> Result<ExtendedDecimal, ArithmeticError> {
        if self.is_nan() {
            return Ok(ExtendedDecimal::from_parts(
                self.numerator.clone(),
                BigInt::zero(),
                self.flags,
            ));
        }
        if self.is_infinite() {
            return Ok(ExtendedDecimal::infinity(self.is_negative()));
        }
        let num = ExtendedDecimal::new(self.signed_numerator(), BigInt::zero());
        let den = ExtendedDecimal::new(self.denominator.clone(), BigInt::zero());
        num.divide(&den, ctx)
    }

    /// Convert to binary floating point, dividing at the context's
    /// precision.
    pub fn to_extended_float(
        &self,
        ctx: &mut PrecisionContext,
    ) -> Result<ExtendedFloat, ArithmeticError> {
        if self.is_nan() {
            return Ok(ExtendedFloat::from_parts(
                self.numerator.clone(),
                BigInt::zero(),
                self.flags,
            ));
        }
        if self.is_infinite() {
            return Ok(ExtendedFloat::infinity(self.is_negative()));
        }
        let num = ExtendedFloat::new(self.signed_numerator(), BigInt::zero());
        let den = ExtendedFloat::new(self.denominator.clone(), BigInt::zero());
        num.divide(&den, ctx)
    }

    /// The nearest `f64`, half-even.
    pub fn to_f64(&self) -> f64 {
        let mut ctx = PrecisionContext::binary64();
        match self.to_extended_float(&mut ctx) {
            Ok(f) => f.to_f64(),
            Err(_) => f64::NAN,
        }
    }
}

impl FromStr for ExtendedRational {
    type Err = ParseNumberError;

    /// Parse the decimal literal grammar into an exact rational.
    fn from_str(s: &str) -> Result<Self, ParseNumberError> {
        let decimal: ExtendedDecimal = s.parse()?;
        Ok(Self::from_extended_decimal(&decimal))
    }
}

impl fmt::Display for ExtendedRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            return if self.is_negative() {
                f.write_str("-Infinity")
            } else {
                f.write_str("Infinity")
            };
        }
        if self.is_nan() {
            return f.write_str("NaN");
        }
        if self.is_negative() {
            write!(f, "-{}/{}", self.numerator, self.denominator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(n: i64, d: i64) -> ExtendedRational {
        ExtendedRational::new(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn construction_reduces_to_lowest_terms() {
        let r = rat(6, -8);
        assert!(r.is_negative());
        assert_eq!(*r.numerator(), BigInt::from(3u32));
        assert_eq!(*r.denominator(), BigInt::from(4u32));
        assert!(ExtendedRational::new(BigInt::one(), BigInt::zero()).is_err());
    }

    #[test]
    fn field_arithmetic_is_exact() {
        let third = rat(1, 3);
        let sixth = rat(1, 6);
        assert_eq!(third.add(&sixth), rat(1, 2));
        assert_eq!(third.subtract(&sixth), sixth);
        assert_eq!(third.multiply(&rat(3, 2)), rat(1, 2));
        assert_eq!(third.divide(&sixth), rat(2, 1));
    }

    #[test]
    fn compare_cross_multiplies() {
        assert_eq!(rat(2, 3).compare(&rat(3, 4)), Some(Ordering::Less));
        assert_eq!(rat(-2, 3).compare(&rat(1, 100)), Some(Ordering::Less));
        assert_eq!(rat(4, 6).compare(&rat(2, 3)), Some(Ordering::Equal));
        assert!(ExtendedRational::nan().compare(&rat(1, 1)).is_none());
    }

    #[test]
    fn division_by_zero_follows_ieee() {
        let r = rat(1, 2).divide(&ExtendedRational::zero());
        assert!(r.is_infinite());
        assert!(ExtendedRational::zero()
            .divide(&ExtendedRational::zero())
            .is_nan());
    }

    #[test]
    fn decimal_round_trip() {
        let r: ExtendedRational = "0.375".parse().unwrap();
        assert_eq!(r, rat(3, 8));
        let mut ctx = PrecisionContext::unlimited();
        let d = r.to_extended_decimal(&mut ctx).unwrap();
        assert_eq!(d.to_string(), "0.375");

        let third = rat(1, 3);
        let mut ctx = PrecisionContext::for_precision(5);
        let d = third.to_extended_decimal(&mut ctx).unwrap();
        assert_eq!(d.to_string(), "0.33333");
    }

    #[test]
    fn float_conversion_rounds() {
        let third = rat(1, 3);
        assert_eq!(third.to_f64(), 1.0f64 / 3.0);
        assert_eq!(rat(1, 4).to_f64(), 0.25);
    }
}

//! Arbitrary-precision binary floating point.

use cbor_bigint::BigInt;
use core::{
    cmp::Ordering,
    fmt,
    str::FromStr,
};

use crate::{
    accumulator::BitShiftAccumulator,
    context::{
        ArithmeticError,
        PrecisionContext,
    },
    decimal::ExtendedDecimal,
    literal::ParseNumberError,
    number::{
        NumberFlags,
        RadixNumber,
    },
    radix_math,
    simple,
};

/// An arbitrary-precision binary float: `(-1)^sign * mantissa * 2^exponent`,
/// plus the infinities and NaNs.
///
/// Like [`ExtendedDecimal`], values are representations: `==` is
/// structural, [`ExtendedFloat::compare`] is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedFloat {
    mantissa: BigInt,
    exponent: BigInt,
    flags: NumberFlags,
}

impl RadixNumber for ExtendedFloat {
    const RADIX: u32 = 2;

    type Accumulator = BitShiftAccumulator;

    fn from_parts(mantissa: BigInt, exponent: BigInt, flags: NumberFlags) -> Self {
        debug_assert!(!mantissa.is_negative());
        Self {
            mantissa,
            exponent,
            flags,
        }
    }

    fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    fn exponent(&self) -> &BigInt {
        &self.exponent
    }

    fn flags(&self) -> NumberFlags {
        self.flags
    }

    fn accumulator(mantissa: BigInt, last_discarded: u8, sticky: u8) -> Self::Accumulator {
        BitShiftAccumulator::new(mantissa, last_discarded, sticky)
    }

    fn digits(value: &BigInt) -> u64 {
        value.bit_length()
    }

    fn radix_power(power: u64) -> BigInt {
        BigInt::one() << power as u32
    }

    fn low_digit(value: &BigInt) -> u8 {
        u8::from(!value.is_even())
    }
}

macro_rules! dispatch_unary {
    ($(#[$doc:meta])* $name:ident, $kernel:path) => {
        $(#[$doc])*
        pub fn $name(
            &self,
            ctx: &mut PrecisionContext,
        ) -> Result<Self, ArithmeticError> {
            if ctx.is_simplified() {
                simple::unary(self, ctx, false, $kernel)
            } else {
                $kernel(self, ctx)
            }
        }
    };
}

macro_rules! dispatch_binary {
    ($(#[$doc:meta])* $name:ident, $kernel:path, $strip:expr) => {
        $(#[$doc])*
        pub fn $name(
            &self,
            other: &Self,
            ctx: &mut PrecisionContext,
        ) -> Result<Self, ArithmeticError> {
            if ctx.is_simplified() {
                simple::binary(self, other, ctx, $strip, $kernel)
            } else {
                $kernel(self, other, ctx)
            }
        }
    };
}

impl ExtendedFloat {
    /// The value `0`.
    pub fn zero() -> Self {
        Self::from_parts(BigInt::zero(), BigInt::zero(), NumberFlags::empty())
    }

    /// The value `-0`, distinct from `0`.
    pub fn negative_zero() -> Self {
        Self::from_parts(BigInt::zero(), BigInt::zero(), NumberFlags::NEGATIVE)
    }

    /// The value `1`.
    pub fn one() -> Self {
        Self::from_parts(BigInt::one(), BigInt::zero(), NumberFlags::empty())
    }

    /// A quiet NaN with an empty payload.
    pub fn nan() -> Self {
        Self::from_parts(BigInt::zero(), BigInt::zero(), NumberFlags::QUIET_NAN)
    }

    /// A signaling NaN with an empty payload.
    pub fn signaling_nan() -> Self {
        Self::from_parts(BigInt::zero(), BigInt::zero(), NumberFlags::SIGNALING_NAN)
    }

    /// Positive or negative infinity.
    pub fn infinity(negative: bool) -> Self {
        let mut flags = NumberFlags::INFINITY;
        if negative {
            flags |= NumberFlags::NEGATIVE;
        }
        Self::from_parts(BigInt::zero(), BigInt::zero(), flags)
    }

    /// Build a finite value from a signed mantissa and an exponent.
    pub fn new(mantissa: BigInt, exponent: BigInt) -> Self {
        let negative = mantissa.is_negative();
        Self::from_parts(
            mantissa.abs(),
            exponent,
            if negative {
                NumberFlags::NEGATIVE
            } else {
                NumberFlags::empty()
            },
        )
    }

    /// The mantissa with the sign applied; the payload for NaNs.
    pub fn signed_mantissa(&self) -> BigInt {
        if self.is_negative() {
            -self.mantissa.clone()
        } else {
            self.mantissa.clone()
        }
    }

    /// Parse a decimal literal and convert it into this binary form,
    /// rounding by the context where the value has no finite binary
    /// expansion.
    pub fn from_str_with(
        s: &str,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        let decimal: ExtendedDecimal = s
            .parse()
            .map_err(|_| ArithmeticError::Unsupported("malformed number literal"))?;
        decimal.to_extended_float(ctx)
    }

    dispatch_binary!(
        /// Add, rounding into the context.
        add,
        radix_math::add,
        false
    );
    dispatch_binary!(
        /// Subtract, rounding into the context.
        subtract,
        radix_math::subtract,
        false
    );
    dispatch_binary!(
        /// Multiply, rounding into the context.
        multiply,
        radix_math::multiply,
        false
    );
    dispatch_binary!(
        /// Divide, rounding to the context precision.
        divide,
        radix_math::divide,
        true
    );
    dispatch_binary!(
        /// Integer division with the natural result exponent.
        divide_to_integer_natural_scale,
        radix_math::divide_to_integer_natural_scale,
        true
    );
    dispatch_binary!(
        /// Integer division with the result exponent pinned to zero.
        divide_to_integer_zero_scale,
        radix_math::divide_to_integer_zero_scale,
        true
    );
    dispatch_binary!(
        /// Remainder of the truncating integer division.
        remainder,
        radix_math::remainder,
        false
    );
    dispatch_binary!(
        /// Remainder from the half-even integer quotient.
        remainder_near,
        radix_math::remainder_near,
        false
    );
    dispatch_binary!(
        /// Rescale to the exponent of `other`.
        quantize,
        radix_math::quantize,
        false
    );
    dispatch_binary!(
        /// The next representable value in the direction of `other`.
        next_toward,
        radix_math::next_toward,
        false
    );
    dispatch_binary!(
        /// `x^y`.
        power,
        radix_math::power,
        false
    );

    dispatch_unary!(
        /// Round to the context's precision and exponent range.
        round_to_precision,
        radix_math::round_to_precision
    );
    dispatch_unary!(
        /// For binary values this is [`Self::round_to_precision`].
        round_to_binary_precision,
        radix_math::round_to_binary_precision
    );
    dispatch_unary!(
        /// The value with trailing zero bits removed.
        reduce,
        radix_math::reduce
    );
    dispatch_unary!(
        /// The value unchanged, rounded into the context.
        plus,
        radix_math::plus
    );
    dispatch_unary!(
        /// The absolute value.
        abs,
        radix_math::abs
    );
    dispatch_unary!(
        /// The value with the sign flipped.
        negate,
        radix_math::negate
    );
    dispatch_unary!(
        /// The next representable value toward positive infinity.
        next_plus,
        radix_math::next_plus
    );
    dispatch_unary!(
        /// The next representable value toward negative infinity.
        next_minus,
        radix_math::next_minus
    );
    dispatch_unary!(
        /// The exponential function. Requires a finite precision.
        exp,
        radix_math::exp
    );
    dispatch_unary!(
        /// The natural logarithm. Requires a finite precision.
        ln,
        radix_math::ln
    );
    dispatch_unary!(
        /// The base-10 logarithm.
        log10,
        radix_math::log10
    );
    dispatch_unary!(
        /// The square root. Requires a finite precision.
        square_root,
        radix_math::square_root
    );

    /// Round to the given exponent, signalling `INEXACT` when non-zero
    /// bits are discarded.
    pub fn round_to_exponent_exact(
        &self,
        target: &BigInt,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::round_to_exponent_exact(self, target, ctx)
    }

    /// Round to the given exponent; values already at or above it pass
    /// through.
    pub fn round_to_exponent_simple(
        &self,
        target: &BigInt,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::round_to_exponent_simple(self, target, ctx)
    }

    /// Round to the given exponent without raising `ROUNDED`.
    pub fn round_to_exponent_no_rounded_flag(
        &self,
        target: &BigInt,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::round_to_exponent_no_rounded_flag(self, target, ctx)
    }

    /// Division rounded to a fixed target exponent.
    pub fn divide_to_exponent(
        &self,
        divisor: &Self,
        target: &BigInt,
        rounding: crate::RoundingMode,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::divide_to_exponent(self, divisor, target, rounding, ctx)
    }

    /// `self * multiplicand + addend` with the product computed exactly.
    pub fn multiply_and_add(
        &self,
        multiplicand: &Self,
        addend: &Self,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        if ctx.is_simplified() {
            simple::ternary(self, multiplicand, addend, ctx, radix_math::multiply_and_add)
        } else {
            radix_math::multiply_and_add(self, multiplicand, addend, ctx)
        }
    }

    /// The smaller operand, with IEEE NaN semantics.
    pub fn min(
        &self,
        other: &Self,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::min_max(self, other, radix_math::Extremum::Min, ctx)
    }

    /// The larger operand, with IEEE NaN semantics.
    pub fn max(
        &self,
        other: &Self,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::min_max(self, other, radix_math::Extremum::Max, ctx)
    }

    /// The operand with the smaller absolute value.
    pub fn min_magnitude(
        &self,
        other: &Self,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::min_max(self, other, radix_math::Extremum::MinMagnitude, ctx)
    }

    /// The operand with the larger absolute value.
    pub fn max_magnitude(
        &self,
        other: &Self,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::min_max(self, other, radix_math::Extremum::MaxMagnitude, ctx)
    }

    /// π rounded to the context precision.
    pub fn pi(ctx: &mut PrecisionContext) -> Result<Self, ArithmeticError> {
        if ctx.is_simplified() {
            simple::nullary(ctx, radix_math::pi)
        } else {
            radix_math::pi(ctx)
        }
    }

    /// Numeric comparison; `None` when either operand is a NaN.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        radix_math::compare_to(self, other)
    }

    /// Comparison as a number: −1, 0 or 1, or NaN when an operand is one.
    pub fn compare_with_context(
        &self,
        other: &Self,
        signaling: bool,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::compare_to_with_context(self, other, signaling, ctx)
    }

    /// Render without exponential notation, through the exact decimal
    /// expansion.
    pub fn to_plain_string(&self) -> alloc::string::String {
        self.to_extended_decimal().to_plain_string()
    }

    /// Exact conversion to decimal; `2^e` always has a finite decimal
    /// expansion.
    pub fn to_extended_decimal(&self) -> ExtendedDecimal {
        if !self.is_finite() {
            return ExtendedDecimal::from_parts(
                self.mantissa.clone(),
                BigInt::zero(),
                self.flags,
            );
        }
        if !self.exponent.is_negative() {
            let s = u64::try_from(&self.exponent).unwrap_or(u64::MAX);
            let m = &self.mantissa * &(BigInt::one() << s as u32);
            return ExtendedDecimal::from_parts(m, BigInt::zero(), self.flags);
        }
        // m / 2^k = m * 5^k / 10^k, exactly.
        let k = u64::try_from(&(-&self.exponent)).unwrap_or(u64::MAX);
        let m = &self.mantissa * &BigInt::from(5u32).pow(k as u32);
        ExtendedDecimal::from_parts(m, self.exponent.clone(), self.flags)
    }

    /// Exact ingestion of an `f64`, preserving `-0`, subnormals and NaN
    /// payloads.
    pub fn from_f64(value: f64) -> Self {
        let bits = value.to_bits();
        let negative = bits >> 63 == 1;
        let biased = ((bits >> 52) & 0x7FF) as i64;
        let frac = bits & ((1u64 << 52) - 1);
        let mut flags = if negative {
            NumberFlags::NEGATIVE
        } else {
            NumberFlags::empty()
        };
        if biased == 0x7FF {
            if frac == 0 {
                flags |= NumberFlags::INFINITY;
                return Self::from_parts(BigInt::zero(), BigInt::zero(), flags);
            }
            let quiet = frac >> 51 == 1;
            flags |= if quiet {
                NumberFlags::QUIET_NAN
            } else {
                NumberFlags::SIGNALING_NAN
            };
            let payload = frac & ((1u64 << 51) - 1);
            return Self::from_parts(BigInt::from(payload), BigInt::zero(), flags);
        }
        if biased == 0 {
            if frac == 0 {
                return Self::from_parts(BigInt::zero(), BigInt::zero(), flags);
            }
            return Self::from_parts(BigInt::from(frac), BigInt::from(-1074i64), flags);
        }
        let mantissa = frac | (1u64 << 52);
        Self::from_parts(BigInt::from(mantissa), BigInt::from(biased - 1075), flags)
    }

    /// Exact ingestion of an `f32`.
    pub fn from_f32(value: f32) -> Self {
        let bits = value.to_bits();
        let negative = bits >> 31 == 1;
        let biased = ((bits >> 23) & 0xFF) as i64;
        let frac = bits & ((1u32 << 23) - 1);
        let mut flags = if negative {
            NumberFlags::NEGATIVE
        } else {
            NumberFlags::empty()
        };
        if biased == 0xFF {
            if frac == 0 {
                flags |= NumberFlags::INFINITY;
                return Self::from_parts(BigInt::zero(), BigInt::zero(), flags);
            }
            let quiet = frac >> 22 == 1;
            flags |= if quiet {
                NumberFlags::QUIET_NAN
            } else {
                NumberFlags::SIGNALING_NAN
            };
            let payload = frac & ((1u32 << 22) - 1);
            return Self::from_parts(BigInt::from(payload), BigInt::zero(), flags);
        }
        if biased == 0 {
            if frac == 0 {
                return Self::from_parts(BigInt::zero(), BigInt::zero(), flags);
            }
            return Self::from_parts(BigInt::from(frac), BigInt::from(-149i64), flags);
        }
        let mantissa = frac | (1u32 << 23);
        Self::from_parts(BigInt::from(mantissa), BigInt::from(biased - 150), flags)
    }

    /// The nearest `f64`, half-even, preserving signed zeros and NaN
    /// payloads.
    pub fn to_f64(&self) -> f64 {
        let sign_bit = u64::from(self.is_negative()) << 63;
        if self.is_nan() {
            let payload =
                u64::try_from(self.mantissa()).unwrap_or(0) & ((1u64 << 51) - 1);
            let mut bits = sign_bit | (0x7FFu64 << 52) | payload;
            if self.is_signaling_nan() {
                if payload == 0 {
                    // A signaling NaN needs a non-zero significand.
                    bits |= 1;
                }
            } else {
                bits |= 1u64 << 51;
            }
            return f64::from_bits(bits);
        }
        if self.is_infinite() {
            return f64::from_bits(sign_bit | (0x7FFu64 << 52));
        }
        let mut ctx = PrecisionContext::binary64();
        let rounded = match radix_math::round_to_precision(self, &mut ctx) {
            Ok(v) => v,
            Err(_) => return f64::NAN,
        };
        if rounded.is_infinite() {
            return f64::from_bits(sign_bit | (0x7FFu64 << 52));
        }
        if rounded.mantissa.is_zero() {
            return f64::from_bits(sign_bit);
        }
        let mut m = u64::try_from(&rounded.mantissa).unwrap_or(0);
        let mut e = i64::try_from(&rounded.exponent).unwrap_or(0);
        // Normalise to a 53-bit significand, stopping at the subnormal
        // boundary.
        while m < 1u64 << 52 && e > -1074 {
            m <<= 1;
            e -= 1;
        }
        if m >= 1u64 << 52 {
            let biased = (e + 1075) as u64;
            f64::from_bits(sign_bit | (biased << 52) | (m & ((1u64 << 52) - 1)))
        } else {
            debug_assert_eq!(e, -1074);
            f64::from_bits(sign_bit | m)
        }
    }

    /// The nearest `f32`, half-even.
    pub fn to_f32(&self) -> f32 {
        let sign_bit = u32::from(self.is_negative()) << 31;
        if self.is_nan() {
            let payload =
                (u64::try_from(self.mantissa()).unwrap_or(0) as u32) & ((1u32 << 22) - 1);
            let mut bits = sign_bit | (0xFFu32 << 23) | payload;
            if self.is_signaling_nan() {
                if payload == 0 {
                    bits |= 1;
                }
            } else {
                bits |= 1u32 << 22;
            }
            return f32::from_bits(bits);
        }
        if self.is_infinite() {
            return f32::from_bits(sign_bit | (0xFFu32 << 23));
        }
        let mut ctx = PrecisionContext::binary32();
        let rounded = match radix_math::round_to_precision(self, &mut ctx) {
            Ok(v) => v,
            Err(_) => return f32::NAN,
        };
        if rounded.is_infinite() {
            return f32::from_bits(sign_bit | (0xFFu32 << 23));
        }
        if rounded.mantissa.is_zero() {
            return f32::from_bits(sign_bit);
        }
        let mut m = u64::try_from(&rounded.mantissa).unwrap_or(0) as u32;
        let mut e = i64::try_from(&rounded.exponent).unwrap_or(0);
        while m < 1u32 << 23 && e > -149 {
            m <<= 1;
            e -= 1;
        }
        if m >= 1u32 << 23 {
            let biased = (e + 150) as u32;
            f32::from_bits(sign_bit | (biased << 23) | (m & ((1u32 << 23) - 1)))
        } else {
            debug_assert_eq!(e, -149);
            f32::from_bits(sign_bit | m)
        }
    }
}

impl FromStr for ExtendedFloat {
    type Err = ParseNumberError;

    /// Parse a decimal literal that converts exactly; inexact values are
    /// rejected (use [`ExtendedFloat::from_str_with`] to round).
    fn from_str(s: &str) -> Result<Self, ParseNumberError> {
        let decimal: ExtendedDecimal = s.parse()?;
        let mut ctx = PrecisionContext::unlimited();
        decimal
            .to_extended_float(&mut ctx)
            .map_err(|_| ParseNumberError::Invalid)
    }
}

impl fmt::Display for ExtendedFloat {
    /// Renders through the exact decimal expansion.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_extended_decimal(), f)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for ExtendedFloat {
            fn from(v: $t) -> Self {
                Self::new(BigInt::from(v), BigInt::zero())
            }
        }
    )*};
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

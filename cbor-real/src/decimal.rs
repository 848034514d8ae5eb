//! Arbitrary-precision decimal floating point.

use alloc::string::{
    String,
    ToString,
};
use cbor_bigint::BigInt;
use core::{
    cmp::Ordering,
    fmt,
    str::FromStr,
};

use crate::{
    accumulator::DigitShiftAccumulator,
    context::{
        ArithmeticError,
        PrecisionContext,
    },
    float::ExtendedFloat,
    literal::{
        self,
        Literal,
        ParseNumberError,
    },
    number::{
        NumberFlags,
        RadixNumber,
    },
    radix_math,
    simple,
};

/// An arbitrary-precision decimal: `(-1)^sign * mantissa * 10^exponent`,
/// plus the infinities and NaNs.
///
/// Values are representations, not cohorts: `1.0` and `1.00` are distinct
/// (and compare unequal with `==`); use [`ExtendedDecimal::compare`] for
/// numeric comparison. `-0` is distinct from `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedDecimal {
    mantissa: BigInt,
    exponent: BigInt,
    flags: NumberFlags,
}

impl RadixNumber for ExtendedDecimal {
    const RADIX: u32 = 10;

    type Accumulator = DigitShiftAccumulator;

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
        DigitShiftAccumulator::new(mantissa, last_discarded, sticky)
    }

    fn digits(value: &BigInt) -> u64 {
        if value.is_zero() {
            0
        } else {
            value.digit_count()
        }
    }

    fn radix_power(power: u64) -> BigInt {
        BigInt::from(10u32).pow(power as u32)
    }

    fn low_digit(value: &BigInt) -> u8 {
        let (_, r) = value
            .div_rem(&BigInt::from(10u32))
            .unwrap_or((BigInt::zero(), BigInt::zero()));
        i64::try_from(&r).unwrap_or(0) as u8
    }
}

macro_rules! dispatch_unary {
    ($(#[$doc:meta])* $name:ident, $kernel:path, $strip:expr) => {
        $(#[$doc])*
        pub fn $name(
            &self,
            ctx: &mut PrecisionContext,
        ) -> Result<Self, ArithmeticError> {
            if ctx.is_simplified() {
                simple::unary(self, ctx, $strip, $kernel)
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

macro_rules! dispatch_to_exponent {
    ($(#[$doc:meta])* $name:ident, $kernel:path) => {
        $(#[$doc])*
        pub fn $name(
            &self,
            target: &BigInt,
            ctx: &mut PrecisionContext,
        ) -> Result<Self, ArithmeticError> {
            if ctx.is_simplified() {
                simple::unary(self, ctx, false, |a, ctx| $kernel(a, target, ctx))
            } else {
                $kernel(self, target, ctx)
            }
        }
    };
}

impl ExtendedDecimal {
    /// The value `0E0`.
    pub fn zero() -> Self {
        Self::from_parts(BigInt::zero(), BigInt::zero(), NumberFlags::empty())
    }

    /// The value `-0E0`, distinct from `0E0`.
    pub fn negative_zero() -> Self {
        Self::from_parts(BigInt::zero(), BigInt::zero(), NumberFlags::NEGATIVE)
    }

    /// The value `1`.
    pub fn one() -> Self {
        Self::from(1i32)
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

    /// Parse a literal and round it into the given context.
    pub fn from_str_with(
        s: &str,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        let exact: Self = s
            .parse()
            .map_err(|_| ArithmeticError::Unsupported("malformed number literal"))?;
        exact.round_to_precision(ctx)
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
        /// Divide, rounding to the context precision. With unlimited
        /// precision a non-terminating quotient is an error.
        divide,
        radix_math::divide,
        true
    );
    dispatch_binary!(
        /// Integer division; the result exponent is drawn toward
        /// `max(0, exp(self) - exp(divisor))`.
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
        /// Remainder of the truncating integer division; keeps this
        /// value's sign.
        remainder,
        radix_math::remainder,
        false
    );
    dispatch_binary!(
        /// Remainder from the half-even integer quotient, with magnitude
        /// at most half the divisor's.
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
        /// `x^y`, exact for small integer exponents when they fit the
        /// precision.
        power,
        radix_math::power,
        false
    );

    dispatch_unary!(
        /// Round to the context's precision and exponent range.
        round_to_precision,
        radix_math::round_to_precision,
        false
    );
    dispatch_unary!(
        /// Round so the mantissa fits the context precision counted in
        /// bits.
        round_to_binary_precision,
        radix_math::round_to_binary_precision,
        false
    );
    dispatch_unary!(
        /// The value with trailing zeros removed.
        reduce,
        radix_math::reduce,
        false
    );
    dispatch_unary!(
        /// The value unchanged, rounded into the context.
        plus,
        radix_math::plus,
        false
    );
    dispatch_unary!(
        /// The absolute value.
        abs,
        radix_math::abs,
        false
    );
    dispatch_unary!(
        /// The value with the sign flipped.
        negate,
        radix_math::negate,
        false
    );
    dispatch_unary!(
        /// The next representable value toward positive infinity.
        next_plus,
        radix_math::next_plus,
        false
    );
    dispatch_unary!(
        /// The next representable value toward negative infinity.
        next_minus,
        radix_math::next_minus,
        false
    );
    dispatch_unary!(
        /// The exponential function. Requires a finite precision.
        exp,
        radix_math::exp,
        false
    );
    dispatch_unary!(
        /// The natural logarithm. Requires a finite precision.
        ln,
        radix_math::ln,
        false
    );
    dispatch_unary!(
        /// The base-10 logarithm, exact for powers of ten.
        log10,
        radix_math::log10,
        false
    );
    dispatch_unary!(
        /// The square root. Requires a finite precision.
        square_root,
        radix_math::square_root,
        false
    );

    dispatch_to_exponent!(
        /// Round to the given exponent, signalling `INEXACT` when non-zero
        /// digits are discarded.
        round_to_exponent_exact,
        radix_math::round_to_exponent_exact
    );
    dispatch_to_exponent!(
        /// Round to the given exponent; values already at or above it pass
        /// through.
        round_to_exponent_simple,
        radix_math::round_to_exponent_simple
    );
    dispatch_to_exponent!(
        /// Round to the given exponent without raising `ROUNDED`.
        round_to_exponent_no_rounded_flag,
        radix_math::round_to_exponent_no_rounded_flag
    );

    /// Division rounded to a fixed target exponent with the given rounding
    /// mode.
    pub fn divide_to_exponent(
        &self,
        divisor: &Self,
        target: &BigInt,
        rounding: crate::RoundingMode,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        if ctx.is_simplified() {
            simple::binary(self, divisor, ctx, true, |a, b, ctx| {
                radix_math::divide_to_exponent(a, b, target, rounding, ctx)
            })
        } else {
            radix_math::divide_to_exponent(self, divisor, target, rounding, ctx)
        }
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

    /// Numeric comparison; `None` when either operand is a NaN. Numerically
    /// equal representations (`1.0` vs `1.00`, `0` vs `-0`) compare equal.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        radix_math::compare_to(self, other)
    }

    /// Comparison as a number: −1, 0 or 1, or NaN when an operand is one.
    /// With `signaling`, any NaN operand raises `INVALID`.
    pub fn compare_with_context(
        &self,
        other: &Self,
        signaling: bool,
        ctx: &mut PrecisionContext,
    ) -> Result<Self, ArithmeticError> {
        radix_math::compare_to_with_context(self, other, signaling, ctx)
    }

    /// Convert to binary floating point, rounding into the context when
    /// the value has no finite binary expansion.
    pub fn to_extended_float(
        &self,
        ctx: &mut PrecisionContext,
    ) -> Result<ExtendedFloat, ArithmeticError> {
        if !self.is_finite() {
            return Ok(ExtendedFloat::from_parts(
                self.mantissa.clone(),
                BigInt::zero(),
                self.flags,
            ));
        }
        let five = BigInt::from(5u32);
        if !self.exponent.is_negative() {
            // m * 10^e = (m * 5^e) * 2^e, exactly.
            let s = u64::try_from(&self.exponent).unwrap_or(u64::MAX);
            let m = &self.mantissa * &five.pow(s as u32);
            return Ok(ExtendedFloat::from_parts(
                m,
                self.exponent.clone(),
                self.flags,
            ));
        }
        // m / 10^k as a binary division, rounded by the context.
        let k = u64::try_from(&(-&self.exponent)).unwrap_or(u64::MAX);
        let num = ExtendedFloat::from_parts(
            self.mantissa.clone(),
            BigInt::zero(),
            self.flags & NumberFlags::NEGATIVE,
        );
        let den = ExtendedFloat::from_parts(
            five.pow(k as u32),
            BigInt::from(k),
            NumberFlags::empty(),
        );
        num.divide(&den, ctx)
    }

    /// Exact conversion from binary floating point; every finite binary
    /// value has a finite decimal expansion.
    pub fn from_extended_float(value: &ExtendedFloat) -> Self {
        value.to_extended_decimal()
    }

    /// Exact conversion from an `f64`.
    pub fn from_f64(value: f64) -> Self {
        ExtendedFloat::from_f64(value).to_extended_decimal()
    }

    /// Exact conversion from an `f32`.
    pub fn from_f32(value: f32) -> Self {
        ExtendedFloat::from_f32(value).to_extended_decimal()
    }

    /// The nearest `f64`, half-even.
    pub fn to_f64(&self) -> f64 {
        let mut ctx = PrecisionContext::binary64();
        match self.to_extended_float(&mut ctx) {
            Ok(f) => f.to_f64(),
            Err(_) => f64::NAN,
        }
    }

    /// The nearest `f32`, half-even.
    pub fn to_f32(&self) -> f32 {
        let mut ctx = PrecisionContext::binary32();
        match self.to_extended_float(&mut ctx) {
            Ok(f) => f.to_f32(),
            Err(_) => f32::NAN,
        }
    }

    /// Render with the exponent a multiple of three.
    pub fn to_engineering_string(&self) -> String {
        self.render(true)
    }

    /// Render without exponential notation, padding zeros as needed.
    pub fn to_plain_string(&self) -> String {
        if !self.is_finite() {
            return self.render(false);
        }
        literal::format_plain(self.is_negative(), &self.mantissa, &self.exponent)
    }

    fn render(&self, engineering: bool) -> String {
        if self.is_infinite() {
            return if self.is_negative() {
                String::from("-Infinity")
            } else {
                String::from("Infinity")
            };
        }
        if self.is_nan() {
            let mut out = String::new();
            if self.is_negative() {
                out.push('-');
            }
            out.push_str(if self.is_signaling_nan() { "sNaN" } else { "NaN" });
            if !self.mantissa.is_zero() {
                out.push_str(&self.mantissa.to_string());
            }
            return out;
        }
        literal::format_finite(
            self.is_negative(),
            &self.mantissa,
            &self.exponent,
            engineering,
        )
    }
}

impl FromStr for ExtendedDecimal {
    type Err = ParseNumberError;

    fn from_str(s: &str) -> Result<Self, ParseNumberError> {
        match literal::parse(s)? {
            Literal::Finite {
                negative,
                mantissa,
                exponent,
            } => Ok(Self::from_parts(
                mantissa,
                exponent,
                if negative {
                    NumberFlags::NEGATIVE
                } else {
                    NumberFlags::empty()
                },
            )),
            Literal::Infinity { negative } => Ok(Self::infinity(negative)),
            Literal::NaN {
                negative,
                signaling,
                payload,
            } => {
                let mut flags = if signaling {
                    NumberFlags::SIGNALING_NAN
                } else {
                    NumberFlags::QUIET_NAN
                };
                if negative {
                    flags |= NumberFlags::NEGATIVE;
                }
                Ok(Self::from_parts(payload, BigInt::zero(), flags))
            }
        }
    }
}

impl fmt::Display for ExtendedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for ExtendedDecimal {
            fn from(v: $t) -> Self {
                Self::new(BigInt::from(v), BigInt::zero())
            }
        }
    )*};
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{
        RoundingMode,
        Signals,
    };
    use alloc::string::ToString;

    fn dec(s: &str) -> ExtendedDecimal {
        s.parse().unwrap()
    }

    fn ctx() -> PrecisionContext {
        PrecisionContext::unlimited().with_blank_flags()
    }

    #[test]
    fn string_round_trips() {
        for s in [
            "0",
            "-0",
            "123",
            "12.34",
            "-0.001",
            "1.23E+10",
            "5E-7",
            "Infinity",
            "-Infinity",
            "NaN",
            "sNaN42",
        ] {
            assert_eq!(dec(s).to_string(), s, "{s}");
        }
    }

    #[test]
    fn negative_zero_renders_with_sign() {
        assert_eq!(ExtendedDecimal::negative_zero().to_string(), "-0");
    }

    #[test]
    fn plain_string_never_uses_exponents() {
        assert_eq!(dec("1.23E+5").to_plain_string(), "123000");
        assert_eq!(dec("5E-7").to_plain_string(), "0.0000005");
        assert_eq!(dec("-12.34").to_plain_string(), "-12.34");
        assert_eq!(dec("0E+3").to_plain_string(), "0");
        assert_eq!(dec("1.23E+3").to_engineering_string(), "1.23E+3");
        assert_eq!(dec("1.23E+4").to_engineering_string(), "12.3E+3");
    }

    #[test]
    fn exact_addition() {
        let mut c = ctx();
        let sum = dec("1.5").add(&dec("2.25"), &mut c).unwrap();
        assert_eq!(sum, dec("3.75"));
        assert!(c.flags().is_empty());
    }

    #[test]
    fn addition_rounds_to_precision() {
        let mut c = PrecisionContext::for_precision(3).with_blank_flags();
        let sum = dec("999").add(&dec("1.5"), &mut c).unwrap();
        // 1000.5 -> 4 digits -> 1.00E+3
        assert_eq!(sum, ExtendedDecimal::new(BigInt::from(100u32), BigInt::one()));
        assert!(c.flags().contains(Signals::INEXACT | Signals::ROUNDED));
    }

    #[test]
    fn far_apart_addend_collapses_to_sticky() {
        let mut c = PrecisionContext::for_precision(5).with_blank_flags();
        let sum = dec("1E+20").add(&dec("1"), &mut c).unwrap();
        assert_eq!(
            sum,
            ExtendedDecimal::new(BigInt::from(10000u32), BigInt::from(16u32))
        );
        assert!(c.flags().contains(Signals::INEXACT));

        let mut c = PrecisionContext::for_precision_and_rounding(5, RoundingMode::Down)
            .with_blank_flags();
        let diff = dec("1E+20").subtract(&dec("1"), &mut c).unwrap();
        assert_eq!(
            diff,
            ExtendedDecimal::new(BigInt::from(99999u32), BigInt::from(15u32))
        );
    }

    #[test]
    fn division_terminates_or_errors_without_precision() {
        let mut c = ctx();
        let q = dec("1").divide(&dec("8"), &mut c).unwrap();
        assert_eq!(q, dec("0.125"));
        assert!(matches!(
            dec("1").divide(&dec("3"), &mut c),
            Err(ArithmeticError::PrecisionRequired(_))
        ));
    }

    #[test]
    fn division_rounds_with_sticky() {
        let mut c = PrecisionContext::for_precision(5).with_blank_flags();
        let q = dec("2").divide(&dec("3"), &mut c).unwrap();
        assert_eq!(
            q,
            ExtendedDecimal::new(BigInt::from(66667u32), BigInt::from(-5i32))
        );
        assert!(c.flags().contains(Signals::INEXACT | Signals::ROUNDED));
    }

    #[test]
    fn quantize_rescales_exactly() {
        let mut c = ctx();
        let q = dec("1.23E+5")
            .quantize(&dec("1"), &mut c)
            .unwrap();
        assert_eq!(q, ExtendedDecimal::new(BigInt::from(123_000u32), BigInt::zero()));
        assert!(c.flags().is_empty());
    }

    #[test]
    fn quantize_preserves_target_exponent_for_zero() {
        let mut c = ctx();
        let q = dec("0").quantize(&dec("1E-3"), &mut c).unwrap();
        assert_eq!(*q.exponent(), BigInt::from(-3i32));
        assert!(q.is_zero_value());
    }

    #[test]
    fn quantize_signals_inexact_when_digits_drop() {
        let mut c = ctx();
        let q = dec("2.17").quantize(&dec("0.1"), &mut c).unwrap();
        assert_eq!(q, dec("2.2"));
        assert!(c.flags().contains(Signals::INEXACT | Signals::ROUNDED));
    }

    #[test]
    fn reduce_strips_trailing_zeros() {
        let mut c = ctx();
        let r = dec("12300E-2").reduce(&mut c).unwrap();
        assert_eq!(r, ExtendedDecimal::new(BigInt::from(123u32), BigInt::zero()));
        let z = dec("0E-5").reduce(&mut c).unwrap();
        assert_eq!(*z.exponent(), BigInt::zero());
    }

    #[test]
    fn round_to_precision_is_idempotent() {
        let mut c = PrecisionContext::for_precision(4).with_blank_flags();
        let once = dec("123456789").round_to_precision(&mut c).unwrap();
        let twice = once.round_to_precision(&mut c).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn signaling_nan_quiets_and_raises_invalid() {
        let mut c = ctx();
        let r = dec("sNaN7").add(&dec("1"), &mut c).unwrap();
        assert!(r.is_nan());
        assert!(!r.is_signaling_nan());
        assert_eq!(*r.mantissa(), BigInt::from(7u32));
        assert!(c.flags().contains(Signals::INVALID));
    }

    #[test]
    fn rounding_mode_matrix() {
        // 2.5 and -2.5 quantized to integers under every mode.
        let cases = [
            (RoundingMode::HalfEven, "2.5", "2"),
            (RoundingMode::HalfEven, "3.5", "4"),
            (RoundingMode::HalfUp, "2.5", "3"),
            (RoundingMode::HalfDown, "2.5", "2"),
            (RoundingMode::Ceiling, "2.1", "3"),
            (RoundingMode::Floor, "2.9", "2"),
            (RoundingMode::Ceiling, "-2.1", "-2"),
            (RoundingMode::Floor, "-2.1", "-3"),
            (RoundingMode::Up, "2.1", "3"),
            (RoundingMode::Down, "2.9", "2"),
            (RoundingMode::Up, "-2.1", "-3"),
            (RoundingMode::Down, "-2.9", "-2"),
        ];
        for (mode, input, expected) in cases {
            let mut c = PrecisionContext::unlimited()
                .with_rounding(mode)
                .with_blank_flags();
            let r = dec(input).quantize(&dec("1"), &mut c).unwrap();
            assert_eq!(r, dec(expected), "{mode:?} {input}");
        }
    }

    #[test]
    fn zero_five_up_rounds_only_on_zero_or_five() {
        let mut c = PrecisionContext::for_precision_and_rounding(2, RoundingMode::ZeroFiveUp)
            .with_blank_flags();
        // 10|1 -> retained last digit 0 -> round up
        assert_eq!(
            dec("101").round_to_precision(&mut c).unwrap(),
            ExtendedDecimal::new(BigInt::from(11u32), BigInt::one())
        );
        // 12|1 -> retained last digit 2 -> truncate
        assert_eq!(
            dec("121").round_to_precision(&mut c).unwrap(),
            ExtendedDecimal::new(BigInt::from(12u32), BigInt::one())
        );
        // 15|1 -> retained last digit 5 -> round up
        assert_eq!(
            dec("151").round_to_precision(&mut c).unwrap(),
            ExtendedDecimal::new(BigInt::from(16u32), BigInt::one())
        );
    }

    #[test]
    fn overflow_obeys_the_rounding_mode() {
        for (mode, infinite) in [
            (RoundingMode::HalfEven, true),
            (RoundingMode::Up, true),
            (RoundingMode::Down, false),
            (RoundingMode::ZeroFiveUp, false),
        ] {
            let mut c = PrecisionContext::for_precision_and_rounding(3, mode)
                .with_exponent_range(-50, 50)
                .with_blank_flags();
            let r = dec("9.99E+50").multiply(&dec("10"), &mut c).unwrap();
            assert_eq!(r.is_infinite(), infinite, "{mode:?}");
            assert!(c.flags().contains(Signals::OVERFLOW));
            if !infinite {
                assert_eq!(r, ExtendedDecimal::new(BigInt::from(999u32), BigInt::from(48u32)));
            }
        }
    }

    #[test]
    fn subnormal_and_underflow_signals() {
        // decimal32-like: precision 7, e_min -95 -> e_tiny -101.
        let mut c = PrecisionContext::decimal32().with_blank_flags();
        let r = dec("1E-99").plus(&mut c).unwrap();
        assert_eq!(r, dec("1E-99"));
        assert!(c.flags().contains(Signals::SUBNORMAL));
        assert!(!c.flags().contains(Signals::UNDERFLOW));

        c.clear_flags();
        let r = dec("1.23E-101").plus(&mut c).unwrap();
        assert!(c.flags().contains(Signals::SUBNORMAL | Signals::UNDERFLOW));
        assert!(c.flags().contains(Signals::INEXACT | Signals::ROUNDED));
        assert_eq!(r, dec("1E-101"));

        c.clear_flags();
        let r = dec("1E-102").plus(&mut c).unwrap();
        assert!(r.is_zero_value());
        assert!(c.flags().contains(Signals::UNDERFLOW));
    }

    #[test]
    fn clamp_pads_high_exponents() {
        let mut c = PrecisionContext::for_precision(5)
            .with_exponent_range(-10, 10)
            .with_exponent_clamp(true)
            .with_blank_flags();
        let r = dec("1E+9").plus(&mut c).unwrap();
        // limit = 10 + 1 - 5 = 6; 1E+9 = 1000E+6.
        assert_eq!(r, ExtendedDecimal::new(BigInt::from(1000u32), BigInt::from(6u32)));
        assert!(c.flags().contains(Signals::CLAMPED));
    }

    #[test]
    fn remainder_identities() {
        let mut c = ctx();
        let r = dec("10").remainder(&dec("3"), &mut c).unwrap();
        assert_eq!(r, dec("1"));
        let r = dec("-10").remainder(&dec("3"), &mut c).unwrap();
        assert_eq!(r, dec("-1"));
        let r = dec("10").remainder_near(&dec("3"), &mut c).unwrap();
        assert_eq!(r, dec("1"));
        let r = dec("11").remainder_near(&dec("3"), &mut c).unwrap();
        assert_eq!(r, dec("-1"));
    }

    #[test]
    fn integer_division_scales() {
        let mut c = ctx();
        let q = dec("123.45")
            .divide_to_integer_zero_scale(&dec("1"), &mut c)
            .unwrap();
        assert_eq!(q, dec("123"));
        assert_eq!(*q.exponent(), BigInt::zero());
        let q = dec("600")
            .divide_to_integer_natural_scale(&dec("2"), &mut c)
            .unwrap();
        // 300 with preferred exponent max(0, 0 - 0) = 0, zeros kept.
        assert_eq!(q, dec("300"));
    }

    #[test]
    fn compare_is_numeric() {
        assert_eq!(dec("1.0").compare(&dec("1.00")), Some(Ordering::Equal));
        assert_eq!(dec("-0").compare(&dec("0")), Some(Ordering::Equal));
        assert_eq!(dec("1E+3").compare(&dec("999")), Some(Ordering::Greater));
        assert_eq!(dec("-1E+3").compare(&dec("999")), Some(Ordering::Less));
        assert_eq!(dec("NaN").compare(&dec("1")), None);
    }

    #[test]
    fn min_max_prefer_numbers_over_quiet_nans() {
        let mut c = ctx();
        let m = dec("NaN").max(&dec("2"), &mut c).unwrap();
        assert_eq!(m, dec("2"));
        let m = dec("-3").min(&dec("NaN"), &mut c).unwrap();
        assert_eq!(m, dec("-3"));
        let m = dec("-5").max_magnitude(&dec("3"), &mut c).unwrap();
        assert_eq!(m, dec("-5"));
    }

    #[test]
    fn power_with_integer_exponent_is_exact() {
        let mut c = PrecisionContext::for_precision(9).with_blank_flags();
        let r = dec("2").power(&dec("10"), &mut c).unwrap();
        assert_eq!(r, dec("1024"));
        assert!(!c.flags().contains(Signals::INEXACT));
    }

    #[test]
    fn square_root_rounds_correctly() {
        let mut c = PrecisionContext::for_precision(6).with_blank_flags();
        let r = dec("2").square_root(&mut c).unwrap();
        assert_eq!(r, dec("1.41421"));
        assert!(c.flags().contains(Signals::INEXACT));

        c.clear_flags();
        let r = dec("4").square_root(&mut c).unwrap();
        assert_eq!(r, dec("2"));
        assert!(!c.flags().contains(Signals::INEXACT));

        let r = dec("0.04").square_root(&mut c).unwrap();
        assert_eq!(r, dec("0.2"));
    }

    #[test]
    fn exp_and_ln_hit_known_digits() {
        let mut c = PrecisionContext::for_precision(10).with_blank_flags();
        let e = dec("1").exp(&mut c).unwrap();
        assert_eq!(e, dec("2.718281828"));
        let l = dec("2.718281828459045235").ln(&mut c).unwrap();
        assert_eq!(l, dec("1.000000000"));
        let lt = dec("10").ln(&mut c).unwrap();
        assert_eq!(lt, dec("2.302585093"));
    }

    #[test]
    fn log10_is_exact_for_powers_of_ten() {
        let mut c = PrecisionContext::for_precision(10).with_blank_flags();
        let r = dec("1E+5").log10(&mut c).unwrap();
        assert_eq!(r, dec("5"));
        assert!(!c.flags().contains(Signals::INEXACT));
        c.clear_flags();
        let r = dec("2").log10(&mut c).unwrap();
        assert_eq!(r, dec("0.3010299957"));
    }

    #[test]
    fn pi_matches_reference_digits() {
        let mut c = PrecisionContext::for_precision(20).with_blank_flags();
        let p = ExtendedDecimal::pi(&mut c).unwrap();
        assert_eq!(p, dec("3.1415926535897932385"));
    }

    #[test]
    fn next_plus_and_minus_step_one_ulp() {
        let mut c = PrecisionContext::for_precision(3)
            .with_exponent_range(-10, 10)
            .with_blank_flags();
        let up = dec("1.00").next_plus(&mut c).unwrap();
        assert_eq!(up, dec("1.01"));
        let down = dec("1.00").next_minus(&mut c).unwrap();
        assert_eq!(down, dec("0.999"));
        let toward = dec("1.00").next_toward(&dec("-5"), &mut c).unwrap();
        assert_eq!(toward, dec("0.999"));
    }

    #[test]
    fn simplified_arithmetic_loses_digits_loudly() {
        let mut c = PrecisionContext::for_precision(3)
            .with_simplified(true)
            .with_blank_flags();
        let sum = dec("12345").add(&dec("0"), &mut c).unwrap();
        assert_eq!(sum, ExtendedDecimal::new(BigInt::from(123u32), BigInt::from(2u32)));
        assert!(c.flags().contains(Signals::LOST_DIGITS));
    }

    #[test]
    fn multiply_and_add_keeps_the_product_exact() {
        let mut c = PrecisionContext::for_precision(5).with_blank_flags();
        let r = dec("1.3")
            .multiply_and_add(&dec("2.1"), &dec("0.07"), &mut c)
            .unwrap();
        assert_eq!(r, dec("2.80"));
    }

    #[test]
    fn to_f64_round_trips_through_decimal() {
        for v in [0.0f64, -0.0, 1.5, -2.25, 1e300, 5e-324, f64::INFINITY] {
            let d = ExtendedDecimal::from_f64(v);
            let back = d.to_f64();
            assert_eq!(back.to_bits(), v.to_bits(), "{v}");
        }
        assert!(ExtendedDecimal::from_f64(f64::NAN).is_nan());
    }
}

//! Precision contexts: precision, exponent range, rounding, signals, traps.

use cbor_bigint::BigInt;

bitflags::bitflags! {
    /// Arithmetic condition signals.
    ///
    /// The numeric encoding is fixed for external compatibility and must
    /// not be rearranged.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Signals: u16 {
        /// Non-zero digits were discarded by rounding.
        const INEXACT = 1;
        /// Digits were discarded, possibly all zero.
        const ROUNDED = 2;
        /// The result's adjusted exponent fell below `e_min`.
        const SUBNORMAL = 4;
        /// A subnormal result also lost digits.
        const UNDERFLOW = 8;
        /// The result's adjusted exponent exceeded `e_max`.
        const OVERFLOW = 16;
        /// The exponent was clamped into the representable range.
        const CLAMPED = 32;
        /// The operation had no usefully definable result.
        const INVALID = 64;
        /// A finite operand was divided by zero.
        const DIVIDE_BY_ZERO = 128;
        /// Simplified arithmetic discarded operand digits before the
        /// operation.
        const LOST_DIGITS = 256;
    }
}

/// Rounding mode applied when a result does not fit the precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::FromRepr)]
#[repr(u8)]
pub enum RoundingMode {
    /// Round ties to the nearest even last digit.
    #[default]
    HalfEven = 0,
    /// Round ties away from zero.
    HalfUp = 1,
    /// Round ties toward zero.
    HalfDown = 2,
    /// Round toward positive infinity.
    Ceiling = 3,
    /// Round toward negative infinity.
    Floor = 4,
    /// Round away from zero whenever digits are discarded.
    Up = 5,
    /// Truncate.
    Down = 6,
    /// Round up only when the retained last digit is 0 or half the radix.
    ZeroFiveUp = 7,
}

/// Failure of a context-carrying arithmetic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ArithmeticError {
    /// A newly raised signal intersected the context's trap mask.
    #[display(fmt = "arithmetic trap: {_0:?}")]
    Trap(Signals),
    /// The operation needs a finite precision to terminate.
    #[display(fmt = "{_0} requires a context with a finite precision")]
    PrecisionRequired(&'static str),
    /// The operation is not defined for the given operands.
    #[display(fmt = "unsupported operation: {_0}")]
    Unsupported(&'static str),
}

#[cfg(feature = "std")]
impl std::error::Error for ArithmeticError {}

/// Immutable arithmetic settings plus a mutable signal accumulator.
///
/// A context is a value: builders return modified copies. Only the signal
/// accumulator mutates, and only on copies created by
/// [`PrecisionContext::with_blank_flags`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecisionContext {
    precision: BigInt,
    rounding: RoundingMode,
    has_exponent_range: bool,
    e_min: BigInt,
    e_max: BigInt,
    clamp_normal_exponents: bool,
    simplified: bool,
    traps: Signals,
    has_flags: bool,
    flags: Signals,
}

impl PrecisionContext {
    /// Unlimited precision and exponent range; nothing is ever rounded.
    pub fn unlimited() -> Self {
        Self {
            precision: BigInt::zero(),
            rounding: RoundingMode::HalfEven,
            has_exponent_range: false,
            e_min: BigInt::zero(),
            e_max: BigInt::zero(),
            clamp_normal_exponents: false,
            simplified: false,
            traps: Signals::empty(),
            has_flags: false,
            flags: Signals::empty(),
        }
    }

    /// A context with the given precision, rounding half to even.
    pub fn for_precision(precision: u64) -> Self {
        Self::unlimited().with_precision(precision)
    }

    /// A context with the given precision and rounding mode.
    pub fn for_precision_and_rounding(precision: u64, rounding: RoundingMode) -> Self {
        Self::for_precision(precision).with_rounding(rounding)
    }

    /// General-purpose 9-digit context with a wide exponent range.
    pub fn basic() -> Self {
        Self::for_precision_and_rounding(9, RoundingMode::HalfUp)
            .with_exponent_range(-999_999_999, 999_999_999)
    }

    fn ieee(precision: u64, e_min: i64, e_max: i64) -> Self {
        Self::for_precision(precision)
            .with_exponent_range(e_min, e_max)
            .with_exponent_clamp(true)
    }

    /// IEEE 754 binary16 arithmetic.
    pub fn binary16() -> Self {
        Self::ieee(11, -14, 15)
    }

    /// IEEE 754 binary32 arithmetic.
    pub fn binary32() -> Self {
        Self::ieee(24, -126, 127)
    }

    /// IEEE 754 binary64 arithmetic.
    pub fn binary64() -> Self {
        Self::ieee(53, -1022, 1023)
    }

    /// IEEE 754 binary128 arithmetic.
    pub fn binary128() -> Self {
        Self::ieee(113, -16382, 16383)
    }

    /// IEEE 754 decimal32 arithmetic.
    pub fn decimal32() -> Self {
        Self::ieee(7, -95, 96)
    }

    /// IEEE 754 decimal64 arithmetic.
    pub fn decimal64() -> Self {
        Self::ieee(16, -383, 384)
    }

    /// IEEE 754 decimal128 arithmetic.
    pub fn decimal128() -> Self {
        Self::ieee(34, -6143, 6144)
    }

    /// The observable behavior of the CLI `decimal` type: 28 significant
    /// digits, exponents in −28…0.
    pub fn cli_decimal() -> Self {
        Self::ieee(28, -28, 0)
    }

    /// Copy with a different rounding mode.
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    /// Copy with a different precision; `0` means unlimited.
    pub fn with_precision(mut self, precision: u64) -> Self {
        self.precision = BigInt::from(precision);
        self
    }

    /// Copy with an arbitrary-precision digit count; negative values are
    /// treated as unlimited.
    pub fn with_big_precision(mut self, precision: BigInt) -> Self {
        self.precision = if precision.is_negative() {
            BigInt::zero()
        } else {
            precision
        };
        self
    }

    /// Copy constrained to the adjusted exponent range `e_min..=e_max`.
    pub fn with_exponent_range(self, e_min: i64, e_max: i64) -> Self {
        self.with_big_exponent_range(BigInt::from(e_min), BigInt::from(e_max))
    }

    /// Copy constrained to an arbitrary-precision exponent range.
    pub fn with_big_exponent_range(mut self, e_min: BigInt, e_max: BigInt) -> Self {
        debug_assert!(e_min <= e_max);
        self.has_exponent_range = true;
        self.e_min = e_min;
        self.e_max = e_max;
        self
    }

    /// Copy with no exponent range.
    pub fn with_unlimited_exponents(mut self) -> Self {
        self.has_exponent_range = false;
        self.e_min = BigInt::zero();
        self.e_max = BigInt::zero();
        self
    }

    /// Copy with normal-exponent clamping switched on or off.
    pub fn with_exponent_clamp(mut self, clamp: bool) -> Self {
        self.clamp_normal_exponents = clamp;
        self
    }

    /// Copy selecting simplified (Appendix A) arithmetic.
    pub fn with_simplified(mut self, simplified: bool) -> Self {
        self.simplified = simplified;
        self
    }

    /// Copy that raises [`ArithmeticError::Trap`] for the given signals.
    pub fn with_traps(mut self, traps: Signals) -> Self {
        self.traps = traps;
        self
    }

    /// Copy with a fresh, writable signal accumulator.
    pub fn with_blank_flags(mut self) -> Self {
        self.has_flags = true;
        self.flags = Signals::empty();
        self
    }

    /// Copy that ignores signals entirely.
    pub fn without_flags(mut self) -> Self {
        self.has_flags = false;
        self.flags = Signals::empty();
        self
    }

    /// Maximum mantissa digit count; `0` means unlimited.
    pub fn precision(&self) -> &BigInt {
        &self.precision
    }

    pub(crate) fn precision_u64(&self) -> u64 {
        u64::try_from(&self.precision).unwrap_or(u64::MAX)
    }

    /// The rounding mode.
    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Whether an exponent range is enforced.
    pub fn has_exponent_range(&self) -> bool {
        self.has_exponent_range
    }

    /// Smallest adjusted exponent of a normal result. Valid only when an
    /// exponent range is set.
    pub fn e_min(&self) -> &BigInt {
        &self.e_min
    }

    /// Largest adjusted exponent of any finite result. Valid only when an
    /// exponent range is set.
    pub fn e_max(&self) -> &BigInt {
        &self.e_max
    }

    /// Whether exponents of normal results are clamped to
    /// `e_max + 1 - precision`.
    pub fn clamp_normal_exponents(&self) -> bool {
        self.clamp_normal_exponents
    }

    /// Whether simplified (Appendix A) semantics are selected.
    pub fn is_simplified(&self) -> bool {
        self.simplified
    }

    /// The trap mask.
    pub fn traps(&self) -> Signals {
        self.traps
    }

    /// Whether this context accumulates signals.
    pub fn has_flags(&self) -> bool {
        self.has_flags
    }

    /// The accumulated signals. Empty when the context does not accumulate.
    pub fn flags(&self) -> Signals {
        self.flags
    }

    /// Clear the accumulated signals.
    pub fn clear_flags(&mut self) {
        self.flags = Signals::empty();
    }

    /// Smallest exponent a mantissa digit may occupy: `e_min` lowered by
    /// the precision's sub-digit positions.
    pub(crate) fn e_tiny(&self) -> BigInt {
        let p = self.precision_u64();
        if p > 1 {
            &self.e_min - &BigInt::from(p - 1)
        } else {
            self.e_min.clone()
        }
    }

    /// Record newly raised signals, trapping when they intersect the mask.
    ///
    /// The accumulator only materialises when the context carries flags;
    /// traps fire regardless.
    pub(crate) fn report(&mut self, signals: Signals) -> Result<(), ArithmeticError> {
        if self.has_flags {
            self.flags |= signals;
        }
        let trapped = self.traps & signals;
        if !trapped.is_empty() {
            return Err(ArithmeticError::Trap(trapped));
        }
        Ok(())
    }
}

impl Default for PrecisionContext {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_encoding_is_stable() {
        assert_eq!(Signals::INEXACT.bits(), 1);
        assert_eq!(Signals::ROUNDED.bits(), 2);
        assert_eq!(Signals::SUBNORMAL.bits(), 4);
        assert_eq!(Signals::UNDERFLOW.bits(), 8);
        assert_eq!(Signals::OVERFLOW.bits(), 16);
        assert_eq!(Signals::CLAMPED.bits(), 32);
        assert_eq!(Signals::INVALID.bits(), 64);
        assert_eq!(Signals::DIVIDE_BY_ZERO.bits(), 128);
        assert_eq!(Signals::LOST_DIGITS.bits(), 256);
    }

    #[test]
    fn report_accumulates_only_with_flags() {
        let mut quiet = PrecisionContext::unlimited();
        quiet.report(Signals::INEXACT).unwrap();
        assert!(quiet.flags().is_empty());

        let mut loud = PrecisionContext::unlimited().with_blank_flags();
        loud.report(Signals::INEXACT | Signals::ROUNDED).unwrap();
        assert_eq!(loud.flags(), Signals::INEXACT | Signals::ROUNDED);
    }

    #[test]
    fn traps_fire_on_new_signals() {
        let mut ctx = PrecisionContext::for_precision(5)
            .with_blank_flags()
            .with_traps(Signals::OVERFLOW);
        assert!(ctx.report(Signals::INEXACT).is_ok());
        assert_eq!(
            ctx.report(Signals::OVERFLOW | Signals::INEXACT),
            Err(ArithmeticError::Trap(Signals::OVERFLOW))
        );
        // The flags were still materialised before the trap unwound.
        assert!(ctx.flags().contains(Signals::OVERFLOW));
    }

    #[test]
    fn e_tiny_reaches_below_e_min() {
        let ctx = PrecisionContext::binary64();
        assert_eq!(ctx.e_tiny(), BigInt::from(-1074i64));
        assert_eq!(*ctx.e_min(), BigInt::from(-1022i64));
    }
}

//! The radix-generic number shape the arithmetic kernel operates on.

use cbor_bigint::BigInt;

use crate::accumulator::ShiftAccumulator;

bitflags::bitflags! {
    /// Sign and special-value markers of an extended number.
    ///
    /// The three special markers are mutually exclusive with each other and
    /// with a finite value.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct NumberFlags: u8 {
        /// The sign bit; set for negative values including `-0`.
        const NEGATIVE = 1;
        /// Positive or negative infinity.
        const INFINITY = 2;
        /// A quiet NaN; the mantissa carries the diagnostic payload.
        const QUIET_NAN = 4;
        /// A signaling NaN; raises `INVALID` when used.
        const SIGNALING_NAN = 8;
    }
}

impl NumberFlags {
    /// Any of the special-value markers.
    pub const SPECIAL: NumberFlags = NumberFlags::INFINITY
        .union(NumberFlags::QUIET_NAN)
        .union(NumberFlags::SIGNALING_NAN);
}

/// Number type the [`crate::radix_math`] kernel is generic over.
///
/// The kernel is monomorphised per radix; there is no dynamic dispatch in
/// the rounding loops.
pub trait RadixNumber: Clone {
    /// The radix digits are counted in: 2 or 10.
    const RADIX: u32;

    /// Accumulator matching the radix.
    type Accumulator: ShiftAccumulator;

    /// Assemble a value from an unsigned mantissa, an exponent and flags.
    fn from_parts(mantissa: BigInt, exponent: BigInt, flags: NumberFlags) -> Self;

    /// The unsigned mantissa (the NaN diagnostic payload for NaNs).
    fn mantissa(&self) -> &BigInt;

    /// The exponent; `0` for NaNs.
    fn exponent(&self) -> &BigInt;

    /// Sign and special-value flags.
    fn flags(&self) -> NumberFlags;

    /// New accumulator over a non-negative mantissa with seeded
    /// discarded-digit state.
    fn accumulator(mantissa: BigInt, last_discarded: u8, sticky: u8) -> Self::Accumulator;

    /// Digit count of a non-negative integer in this radix; `0` for zero.
    fn digits(value: &BigInt) -> u64;

    /// `RADIX^power` for a non-negative power.
    fn radix_power(power: u64) -> BigInt;

    /// The least significant digit of a non-negative integer.
    fn low_digit(value: &BigInt) -> u8;

    /// Whether this value is negative (including `-0` and `-Infinity`).
    fn is_negative(&self) -> bool {
        self.flags().contains(NumberFlags::NEGATIVE)
    }

    /// Whether this value is a quiet or signaling NaN.
    fn is_nan(&self) -> bool {
        self.flags()
            .intersects(NumberFlags::QUIET_NAN | NumberFlags::SIGNALING_NAN)
    }

    /// Whether this value is a signaling NaN.
    fn is_signaling_nan(&self) -> bool {
        self.flags().contains(NumberFlags::SIGNALING_NAN)
    }

    /// Whether this value is an infinity of either sign.
    fn is_infinite(&self) -> bool {
        self.flags().contains(NumberFlags::INFINITY)
    }

    /// Whether this value is finite (neither infinite nor NaN).
    fn is_finite(&self) -> bool {
        !self.flags().intersects(NumberFlags::SPECIAL)
    }

    /// Whether this value is a finite zero of either sign.
    fn is_zero_value(&self) -> bool {
        self.is_finite() && self.mantissa().is_zero()
    }
}

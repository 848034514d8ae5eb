//! Shift accumulators: shift a mantissa right while preserving the
//! information rounding needs.
//!
//! Shifting discards digits. The accumulator keeps the most significant
//! discarded digit and a sticky OR of everything below it, so any rounding
//! mode can be applied afterwards without re-dividing.

use cbor_bigint::{
    BigInt,
    FastInt,
};

/// Mantissa shifter for one radix.
pub trait ShiftAccumulator {
    /// The mantissa that remains after the shifts so far.
    fn shifted(&self) -> &BigInt;

    /// Consume the accumulator, yielding the remaining mantissa.
    fn into_shifted(self) -> BigInt;

    /// Digit count of the remaining mantissa; `0` when it is zero.
    fn digit_length(&mut self) -> u64;

    /// The most significant digit discarded so far.
    fn last_discarded(&self) -> u8;

    /// `1` when any digit below the last discarded one was non-zero.
    fn sticky(&self) -> u8;

    /// Total number of digits shifted off.
    fn discarded_count(&self) -> &FastInt;

    /// Shift right by `count` digits.
    fn shift_right(&mut self, count: u64);

    /// Shift right until at most `digits` digits remain.
    fn shift_to_digits(&mut self, digits: u64);
}

/// Decimal-digit accumulator backing radix-10 rounding.
#[derive(Debug, Clone)]
pub struct DigitShiftAccumulator {
    shifted: BigInt,
    known_digits: Option<u64>,
    last_discarded: u8,
    sticky: u8,
    discarded: FastInt,
}

impl DigitShiftAccumulator {
    /// Wrap a non-negative mantissa, seeding the discarded-digit state
    /// (used when the caller already truncated the value).
    pub fn new(mantissa: BigInt, last_discarded: u8, sticky: u8) -> Self {
        debug_assert!(!mantissa.is_negative());
        Self {
            shifted: mantissa,
            known_digits: None,
            last_discarded,
            sticky,
            discarded: FastInt::zero(),
        }
    }

    fn digits(&mut self) -> u64 {
        match self.known_digits {
            Some(d) => d,
            None => {
                let d = if self.shifted.is_zero() {
                    0
                } else {
                    self.shifted.digit_count()
                };
                self.known_digits = Some(d);
                d
            }
        }
    }
}

impl ShiftAccumulator for DigitShiftAccumulator {
    fn shifted(&self) -> &BigInt {
        &self.shifted
    }

    fn into_shifted(self) -> BigInt {
        self.shifted
    }

    fn digit_length(&mut self) -> u64 {
        self.digits()
    }

    fn last_discarded(&self) -> u8 {
        self.last_discarded
    }

    fn sticky(&self) -> u8 {
        self.sticky
    }

    fn discarded_count(&self) -> &FastInt {
        &self.discarded
    }

    fn shift_right(&mut self, count: u64) {
        if count == 0 {
            return;
        }
        let digits = self.digits();
        if count > digits {
            // Everything goes, including the previous last digit.
            if !self.shifted.is_zero() || self.last_discarded != 0 {
                self.sticky = 1;
            }
            self.last_discarded = 0;
            self.shifted = BigInt::zero();
            self.known_digits = Some(0);
            self.discarded.add_big(&BigInt::from(count));
            return;
        }
        // Split off the low `count` digits; the top one of those becomes
        // the new last-discarded digit, the rest fold into sticky.
        let ten = BigInt::from(10u32);
        let below = if count > 1 {
            ten.pow((count - 1) as u32)
        } else {
            BigInt::one()
        };
        let (high, low) = self
            .shifted
            .div_rem(&below)
            .unwrap_or_else(|_| (BigInt::zero(), BigInt::zero()));
        let (quotient, last) = high
            .div_rem(&ten)
            .unwrap_or_else(|_| (BigInt::zero(), BigInt::zero()));
        if self.last_discarded != 0 || !low.is_zero() {
            self.sticky = 1;
        }
        self.last_discarded = i64::try_from(&last).unwrap_or(0) as u8;
        self.shifted = quotient;
        self.known_digits = Some(if count == digits { 0 } else { digits - count });
        self.discarded.add_big(&BigInt::from(count));
    }

    fn shift_to_digits(&mut self, digits: u64) {
        let current = self.digits();
        if current > digits {
            self.shift_right(current - digits);
        }
    }
}

/// Bit accumulator backing radix-2 rounding.
#[derive(Debug, Clone)]
pub struct BitShiftAccumulator {
    shifted: BigInt,
    last_discarded: u8,
    sticky: u8,
    discarded: FastInt,
}

impl BitShiftAccumulator {
    /// Wrap a non-negative mantissa with seeded discarded-bit state.
    pub fn new(mantissa: BigInt, last_discarded: u8, sticky: u8) -> Self {
        debug_assert!(!mantissa.is_negative());
        Self {
            shifted: mantissa,
            last_discarded,
            sticky,
            discarded: FastInt::zero(),
        }
    }
}

impl ShiftAccumulator for BitShiftAccumulator {
    fn shifted(&self) -> &BigInt {
        &self.shifted
    }

    fn into_shifted(self) -> BigInt {
        self.shifted
    }

    fn digit_length(&mut self) -> u64 {
        self.shifted.bit_length()
    }

    fn last_discarded(&self) -> u8 {
        self.last_discarded
    }

    fn sticky(&self) -> u8 {
        self.sticky
    }

    fn discarded_count(&self) -> &FastInt {
        &self.discarded
    }

    fn shift_right(&mut self, count: u64) {
        if count == 0 {
            return;
        }
        let bits = self.shifted.bit_length();
        if count > bits {
            if !self.shifted.is_zero() || self.last_discarded != 0 {
                self.sticky = 1;
            }
            self.last_discarded = 0;
            self.shifted = BigInt::zero();
            self.discarded.add_big(&BigInt::from(count));
            return;
        }
        let mut low_nonzero = self.last_discarded != 0;
        for i in 0..count.saturating_sub(1) {
            if self.shifted.test_bit(i) {
                low_nonzero = true;
                break;
            }
        }
        if low_nonzero {
            self.sticky = 1;
        }
        self.last_discarded = u8::from(self.shifted.test_bit(count - 1));
        self.shifted = &self.shifted >> count as u32;
        self.discarded.add_big(&BigInt::from(count));
    }

    fn shift_to_digits(&mut self, digits: u64) {
        let bits = self.shifted.bit_length();
        if bits > digits {
            self.shift_right(bits - digits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: u64) -> DigitShiftAccumulator {
        DigitShiftAccumulator::new(BigInt::from(v), 0, 0)
    }

    #[test]
    fn decimal_shift_tracks_round_and_sticky() {
        let mut acc = dec(123_456);
        acc.shift_right(2);
        assert_eq!(*acc.shifted(), BigInt::from(1234u32));
        assert_eq!(acc.last_discarded(), 5);
        assert_eq!(acc.sticky(), 1);
        assert_eq!(acc.digit_length(), 4);

        let mut acc = dec(123_400);
        acc.shift_right(2);
        assert_eq!(acc.last_discarded(), 0);
        assert_eq!(acc.sticky(), 0);

        let mut acc = dec(123_450);
        acc.shift_right(2);
        assert_eq!(acc.last_discarded(), 5);
        assert_eq!(acc.sticky(), 0);
    }

    #[test]
    fn earlier_digits_fold_into_sticky() {
        let mut acc = dec(10_001);
        acc.shift_right(1);
        assert_eq!(acc.last_discarded(), 1);
        assert_eq!(acc.sticky(), 0);
        acc.shift_right(1);
        // The previously discarded 1 is now below the cut.
        assert_eq!(acc.last_discarded(), 0);
        assert_eq!(acc.sticky(), 1);
    }

    #[test]
    fn overshooting_discards_everything() {
        let mut acc = dec(999);
        acc.shift_right(10);
        assert!(acc.shifted().is_zero());
        assert_eq!(acc.last_discarded(), 0);
        assert_eq!(acc.sticky(), 1);
        assert_eq!(acc.digit_length(), 0);
    }

    #[test]
    fn shift_to_digits_is_a_relative_shift() {
        let mut acc = dec(987_654_321);
        acc.shift_to_digits(3);
        assert_eq!(*acc.shifted(), BigInt::from(987u32));
        assert_eq!(acc.last_discarded(), 6);
        assert_eq!(acc.sticky(), 1);
    }

    #[test]
    fn bit_accumulator_mirrors_decimal_behavior() {
        let mut acc = BitShiftAccumulator::new(BigInt::from(0b1011_0100u32), 0, 0);
        acc.shift_right(3);
        assert_eq!(*acc.shifted(), BigInt::from(0b10110u32));
        assert_eq!(acc.last_discarded(), 1);
        assert_eq!(acc.sticky(), 0);
        acc.shift_right(1);
        assert_eq!(acc.last_discarded(), 0);
        assert_eq!(acc.sticky(), 1);
    }
}

//! Arbitrary-precision decimal and binary floating point under a
//! programmable precision context.
//!
//! The arithmetic kernel is generic over the radix and monomorphised for
//! the two public number types: [`ExtendedDecimal`] (radix 10) and
//! [`ExtendedFloat`] (radix 2). [`ExtendedRational`] completes the set with
//! exact fractions. A [`PrecisionContext`] carries precision, exponent
//! range, rounding mode and the signal/trap machinery; operations
//! accumulate [`Signals`] on it and trap when asked to.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod accumulator;
mod context;
mod decimal;
mod float;
mod literal;
mod number;
pub(crate) mod radix_math;
mod rational;
mod simple;

pub use accumulator::{
    BitShiftAccumulator,
    DigitShiftAccumulator,
    ShiftAccumulator,
};
pub use context::{
    ArithmeticError,
    PrecisionContext,
    RoundingMode,
    Signals,
};
pub use decimal::ExtendedDecimal;
pub use float::ExtendedFloat;
pub use literal::ParseNumberError;
pub use number::{
    NumberFlags,
    RadixNumber,
};
pub use rational::ExtendedRational;

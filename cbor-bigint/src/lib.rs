//! Signed arbitrary-precision integers over 16-bit limbs.
//!
//! The limb width is a deliberate portability decision: every partial
//! product of two limbs fits 32-bit arithmetic, so the inner loops need no
//! double-word carry handling on any target.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod bigint;
mod error;
mod fastint;
pub(crate) mod limbs;

pub use bigint::{
    BigInt,
    Sign,
};
pub use error::{
    Error,
    ParseBigIntError,
};
pub use fastint::FastInt;

//! Domain failures of the integer layer.

/// Errors raised by integer operations that cannot be expressed in the
/// result value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum Error {
    /// Division or remainder with a zero divisor.
    #[display(fmt = "division by zero")]
    DivideByZero,
    /// A narrowing conversion did not fit the target type.
    #[display(fmt = "value out of range for conversion to {_0}")]
    Overflow(&'static str),
    /// Integer conversion of a non-numeric value.
    #[display(fmt = "not a number")]
    NotANumber,
    /// The operation is not defined for the given operands.
    #[display(fmt = "unsupported operation: {_0}")]
    Unsupported(&'static str),
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Error parsing a decimal string into a [`crate::BigInt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ParseBigIntError {
    /// The input was empty, or a bare sign with no digits.
    #[display(fmt = "no digits in input")]
    Empty,
    /// A character outside `0-9` (after the optional leading sign).
    #[display(fmt = "invalid digit in input")]
    InvalidDigit,
}

#[cfg(feature = "std")]
impl std::error::Error for ParseBigIntError {}

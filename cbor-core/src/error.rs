//! Codec error types.

/// Failure while decoding a CBOR item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DecodeError {
    /// The source ended inside an item.
    #[display(fmt = "unexpected end of input")]
    UnexpectedEof,
    /// An initial byte used one of the reserved argument values 28–30.
    #[display(fmt = "reserved additional-information value {_0}")]
    ReservedArgument(u8),
    /// A two-byte simple value below 32; never well-formed.
    #[display(fmt = "invalid two-byte simple value {_0}")]
    InvalidSimpleValue(u8),
    /// An argument was not encoded in its shortest form (canonical mode).
    #[display(fmt = "argument not minimally encoded")]
    NonMinimalArgument,
    /// A float was wider than its value requires (canonical mode).
    #[display(fmt = "float not minimally encoded")]
    NonMinimalFloat,
    /// An indefinite-length item in canonical mode.
    #[display(fmt = "indefinite-length item in canonical mode")]
    IndefiniteLength,
    /// A text string was not well-formed UTF-8.
    #[display(fmt = "text string is not valid UTF-8")]
    InvalidUtf8,
    /// A map key appeared twice (canonical mode).
    #[display(fmt = "duplicate map key")]
    DuplicateMapKey,
    /// Map keys were not in canonical order (canonical mode).
    #[display(fmt = "map keys out of canonical order")]
    NonCanonicalKeyOrder,
    /// An indefinite-length string held a chunk of another major type, or
    /// a nested indefinite chunk.
    #[display(fmt = "malformed indefinite-length item")]
    MalformedIndefinite,
    /// A break byte outside an indefinite-length item.
    #[display(fmt = "unexpected break")]
    UnexpectedBreak,
    /// A registered tag's payload failed validation (canonical mode).
    #[display(fmt = "validation failed for tag {_0}")]
    TagValidationFailed(u64),
    /// Nesting exceeded the configured depth limit.
    #[display(fmt = "nesting depth limit exceeded")]
    DepthExceeded,
    /// A declared length does not fit the platform's address space.
    #[display(fmt = "declared length exceeds the address space")]
    LengthOverflow,
    /// Input remained after the top-level item.
    #[display(fmt = "trailing data after the top-level item")]
    TrailingData,
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Failure while encoding a CBOR item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum EncodeError {
    /// The sink ran out of space.
    #[display(fmt = "output buffer too small")]
    BufferTooSmall,
    /// A simple value in the reserved range 24–31.
    #[display(fmt = "simple value {_0} is not encodable")]
    InvalidSimpleValue(u8),
    /// The same key appears twice in a map.
    #[display(fmt = "duplicate map key")]
    DuplicateMapKey,
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

//! Wire-level constants of the CBOR initial byte.

/// The major type, the top three bits of an initial byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::FromRepr)]
#[repr(u8)]
pub enum MajorType {
    /// Unsigned integer.
    Unsigned = 0,
    /// Negative integer, encoding `-1 - argument`.
    Negative = 1,
    /// Byte string.
    Bytes = 2,
    /// Text string.
    Text = 3,
    /// Array.
    Array = 4,
    /// Map.
    Map = 5,
    /// Tag prefix.
    Tag = 6,
    /// Simple values, floats and the break byte.
    Simple = 7,
}

impl MajorType {
    /// Extract the major type from an initial byte.
    pub fn from_initial(initial: u8) -> Self {
        // The three top bits cover exactly the eight variants.
        Self::from_repr(initial >> 5).unwrap_or(MajorType::Simple)
    }

    /// The initial byte with argument bits zero.
    pub fn initial(self) -> u8 {
        (self as u8) << 5
    }
}

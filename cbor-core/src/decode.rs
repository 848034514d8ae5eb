//! Streaming CBOR decoder.
//!
//! A pull-based state machine over a [`Source`]: read a header, read the
//! payload, recurse for containers, attach tag semantics on the way out.
//! Strict canonical mode additionally rejects indefinite lengths,
//! non-minimal arguments, unsorted or duplicate map keys, and upgrades tag
//! validation failures to errors.

use alloc::{
    string::String,
    vec,
    vec::Vec,
};
use core::cmp::Ordering;

use crate::{
    error::DecodeError,
    half,
    io::Source,
    tags::TagRegistry,
    value::{
        CborFloat,
        CborMap,
        CborValue,
    },
    wire::MajorType,
};

const BREAK: u8 = 0xFF;

/// Decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Reject anything outside the canonical encoding.
    pub canonical: bool,
    /// Maximum container nesting depth.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            canonical: false,
            max_depth: 512,
        }
    }
}

/// The argument carried by an initial byte.
enum Argument {
    Value(u64),
    Indefinite,
}

/// Streaming decoder over a byte source.
pub struct Decoder<'r, S> {
    source: S,
    registry: &'r TagRegistry,
    options: DecodeOptions,
}

impl<'r, S: Source> Decoder<'r, S> {
    /// Wrap a source with default options.
    pub fn new(source: S, registry: &'r TagRegistry) -> Self {
        Self::with_options(source, registry, DecodeOptions::default())
    }

    /// Wrap a source with explicit options.
    pub fn with_options(
        source: S,
        registry: &'r TagRegistry,
        options: DecodeOptions,
    ) -> Self {
        Self {
            source,
            registry,
            options,
        }
    }

    /// Decode one data item.
    pub fn decode(&mut self) -> Result<CborValue, DecodeError> {
        let initial = self.source.read_byte()?;
        self.decode_item(initial, 0)
    }

    fn decode_item(&mut self, initial: u8, depth: usize) -> Result<CborValue, DecodeError> {
        if depth >= self.options.max_depth {
            return Err(DecodeError::DepthExceeded);
        }
        let major = MajorType::from_initial(initial);
        let info = initial & 0x1F;
        tracing::trace!(?major, info, depth, "item header");
        match major {
            MajorType::Unsigned => match self.read_argument(info)? {
                Argument::Value(v) => Ok(CborValue::UInt(v)),
                Argument::Indefinite => Err(DecodeError::ReservedArgument(info)),
            },
            MajorType::Negative => match self.read_argument(info)? {
                Argument::Value(v) => Ok(CborValue::NInt(v)),
                Argument::Indefinite => Err(DecodeError::ReservedArgument(info)),
            },
            MajorType::Bytes => {
                let bytes = self.read_string(MajorType::Bytes, info)?;
                Ok(CborValue::Bytes(bytes))
            }
            MajorType::Text => {
                let bytes = self.read_string(MajorType::Text, info)?;
                String::from_utf8(bytes)
                    .map(CborValue::Text)
                    .map_err(|_| DecodeError::InvalidUtf8)
            }
            MajorType::Array => self.read_array(info, depth),
            MajorType::Map => self.read_map(info, depth),
            MajorType::Tag => {
                let tag = match self.read_argument(info)? {
                    Argument::Value(v) => v,
                    Argument::Indefinite => {
                        return Err(DecodeError::ReservedArgument(info))
                    }
                };
                let inner_initial = self.source.read_byte()?;
                if inner_initial == BREAK {
                    return Err(DecodeError::UnexpectedBreak);
                }
                let inner = self.decode_item(inner_initial, depth + 1)?;
                match self.registry.validate(tag, inner) {
                    Ok(value) => Ok(value),
                    Err((_, raw)) if !self.options.canonical => {
                        Ok(CborValue::tagged(tag, raw))
                    }
                    Err(_) => Err(DecodeError::TagValidationFailed(tag)),
                }
            }
            MajorType::Simple => self.read_simple(info),
        }
    }

    /// Read the argument following an initial byte, enforcing minimal
    /// encoding in canonical mode.
    fn read_argument(&mut self, info: u8) -> Result<Argument, DecodeError> {
        let value = match info {
            0..=23 => return Ok(Argument::Value(u64::from(info))),
            24 => {
                let v = u64::from(self.source.read_byte()?);
                if self.options.canonical && v < 24 {
                    return Err(DecodeError::NonMinimalArgument);
                }
                v
            }
            25 => {
                let mut buf = [0u8; 2];
                self.source.read(&mut buf)?;
                let v = u64::from(u16::from_be_bytes(buf));
                if self.options.canonical && v <= u64::from(u8::MAX) {
                    return Err(DecodeError::NonMinimalArgument);
                }
                v
            }
            26 => {
                let mut buf = [0u8; 4];
                self.source.read(&mut buf)?;
                let v = u64::from(u32::from_be_bytes(buf));
                if self.options.canonical && v <= u64::from(u16::MAX) {
                    return Err(DecodeError::NonMinimalArgument);
                }
                v
            }
            27 => {
                let mut buf = [0u8; 8];
                self.source.read(&mut buf)?;
                let v = u64::from_be_bytes(buf);
                if self.options.canonical && v <= u64::from(u32::MAX) {
                    return Err(DecodeError::NonMinimalArgument);
                }
                v
            }
            28..=30 => return Err(DecodeError::ReservedArgument(info)),
            _ => {
                if self.options.canonical {
                    return Err(DecodeError::IndefiniteLength);
                }
                return Ok(Argument::Indefinite);
            }
        };
        Ok(Argument::Value(value))
    }

    fn checked_len(value: u64) -> Result<usize, DecodeError> {
        usize::try_from(value).map_err(|_| DecodeError::LengthOverflow)
    }

    /// Definite strings read in one go; indefinite strings reassemble
    /// definite-length chunks of the same major type.
    fn read_string(
        &mut self,
        major: MajorType,
        info: u8,
    ) -> Result<Vec<u8>, DecodeError> {
        match self.read_argument(info)? {
            Argument::Value(len) => {
                let len = Self::checked_len(len)?;
                let mut buf = vec![0u8; len];
                self.source.read(&mut buf)?;
                Ok(buf)
            }
            Argument::Indefinite => {
                let mut out = Vec::new();
                loop {
                    let initial = self.source.read_byte()?;
                    if initial == BREAK {
                        return Ok(out);
                    }
                    if MajorType::from_initial(initial) != major {
                        return Err(DecodeError::MalformedIndefinite);
                    }
                    let chunk_len = match self.read_argument(initial & 0x1F)? {
                        Argument::Value(len) => Self::checked_len(len)?,
                        Argument::Indefinite => {
                            return Err(DecodeError::MalformedIndefinite)
                        }
                    };
                    let start = out.len();
                    out.resize(start + chunk_len, 0);
                    self.source.read(&mut out[start..])?;
                }
            }
        }
    }

    fn read_array(&mut self, info: u8, depth: usize) -> Result<CborValue, DecodeError> {
        match self.read_argument(info)? {
            Argument::Value(len) => {
                let len = Self::checked_len(len)?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    let initial = self.source.read_byte()?;
                    if initial == BREAK {
                        return Err(DecodeError::UnexpectedBreak);
                    }
                    items.push(self.decode_item(initial, depth + 1)?);
                }
                Ok(CborValue::Array(items))
            }
            Argument::Indefinite => {
                let mut items = Vec::new();
                loop {
                    let initial = self.source.read_byte()?;
                    if initial == BREAK {
                        return Ok(CborValue::Array(items));
                    }
                    items.push(self.decode_item(initial, depth + 1)?);
                }
            }
        }
    }

    fn read_map(&mut self, info: u8, depth: usize) -> Result<CborValue, DecodeError> {
        let mut map = CborMap::new();
        let mut previous_key: Option<CborValue> = None;
        let mut read_pair =
            |this: &mut Self, key_initial: u8| -> Result<(), DecodeError> {
                let key = this.decode_item(key_initial, depth + 1)?;
                if this.options.canonical {
                    if let Some(prev) = &previous_key {
                        match prev.canonical_cmp(&key) {
                            Ordering::Less => {}
                            Ordering::Equal => {
                                return Err(DecodeError::DuplicateMapKey)
                            }
                            Ordering::Greater => {
                                return Err(DecodeError::NonCanonicalKeyOrder)
                            }
                        }
                    }
                }
                let value_initial = this.source.read_byte()?;
                if value_initial == BREAK {
                    return Err(DecodeError::UnexpectedBreak);
                }
                let value = this.decode_item(value_initial, depth + 1)?;
                previous_key = Some(key.clone());
                map.push_unchecked(key, value);
                Ok(())
            };
        match self.read_argument(info)? {
            Argument::Value(len) => {
                let len = Self::checked_len(len)?;
                for _ in 0..len {
                    let initial = self.source.read_byte()?;
                    if initial == BREAK {
                        return Err(DecodeError::UnexpectedBreak);
                    }
                    read_pair(self, initial)?;
                }
            }
            Argument::Indefinite => loop {
                let initial = self.source.read_byte()?;
                if initial == BREAK {
                    break;
                }
                read_pair(self, initial)?;
            },
        }
        Ok(CborValue::Map(map))
    }

    fn read_simple(&mut self, info: u8) -> Result<CborValue, DecodeError> {
        match info {
            0..=19 => Ok(CborValue::Simple(info)),
            20 => Ok(CborValue::Bool(false)),
            21 => Ok(CborValue::Bool(true)),
            22 => Ok(CborValue::Null),
            23 => Ok(CborValue::Undefined),
            24 => {
                let v = self.source.read_byte()?;
                if v < 32 {
                    return Err(DecodeError::InvalidSimpleValue(v));
                }
                Ok(CborValue::Simple(v))
            }
            25 => {
                let mut buf = [0u8; 2];
                self.source.read(&mut buf)?;
                let bits = u16::from_be_bytes(buf);
                Ok(CborValue::Float(CborFloat::Single(half::half_to_single(
                    bits,
                ))))
            }
            26 => {
                let mut buf = [0u8; 4];
                self.source.read(&mut buf)?;
                let v = f32::from_bits(u32::from_be_bytes(buf));
                if self.options.canonical && half::single_to_half(v).is_some() {
                    return Err(DecodeError::NonMinimalFloat);
                }
                Ok(CborValue::Float(CborFloat::Single(v)))
            }
            27 => {
                let mut buf = [0u8; 8];
                self.source.read(&mut buf)?;
                let v = f64::from_bits(u64::from_be_bytes(buf));
                if self.options.canonical && half::double_to_single(v).is_some() {
                    return Err(DecodeError::NonMinimalFloat);
                }
                Ok(CborValue::Float(CborFloat::Double(v)))
            }
            28..=30 => Err(DecodeError::ReservedArgument(info)),
            _ => Err(DecodeError::UnexpectedBreak),
        }
    }
}

/// Decode exactly one item from a slice with the default registry and
/// options; trailing bytes are an error.
pub fn from_slice(bytes: &[u8], registry: &TagRegistry) -> Result<CborValue, DecodeError> {
    decode_slice(bytes, registry, DecodeOptions::default())
}

/// Decode exactly one item in strict canonical mode.
pub fn from_slice_canonical(
    bytes: &[u8],
    registry: &TagRegistry,
) -> Result<CborValue, DecodeError> {
    decode_slice(
        bytes,
        registry,
        DecodeOptions {
            canonical: true,
            ..DecodeOptions::default()
        },
    )
}

fn decode_slice(
    mut bytes: &[u8],
    registry: &TagRegistry,
    options: DecodeOptions,
) -> Result<CborValue, DecodeError> {
    let mut decoder = Decoder::with_options(&mut bytes, registry, options);
    let value = decoder.decode()?;
    if !bytes.is_empty() {
        return Err(DecodeError::TrailingData);
    }
    Ok(value)
}

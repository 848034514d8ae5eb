//! Tag handlers: per-tag validation and normalisation of decoded items.
//!
//! The registry is a value handed to the decoder, not process-global
//! state; tests install their own.

use alloc::{
    boxed::Box,
    collections::BTreeMap,
};
use cbor_bigint::BigInt;
use cbor_real::{
    ExtendedDecimal,
    ExtendedFloat,
    ExtendedRational,
};

use crate::{
    encode::tag,
    value::CborValue,
};

bitflags::bitflags! {
    /// Predicate over the variant of a tag's inner value.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CborTypeFilter: u16 {
        /// Major type 0.
        const UNSIGNED = 1;
        /// Major type 1.
        const NEGATIVE = 2;
        /// A byte string.
        const BYTES = 4;
        /// A text string.
        const TEXT = 8;
        /// An array.
        const ARRAY = 16;
        /// A map.
        const MAP = 32;
        /// A nested tagged value.
        const TAGGED = 64;
        /// Booleans, null, undefined and other simple values.
        const SIMPLE = 128;
        /// A float of any width.
        const FLOAT = 256;
    }
}

impl CborTypeFilter {
    /// Whether `value`'s variant passes this filter.
    pub fn matches(&self, value: &CborValue) -> bool {
        let kind = match value {
            CborValue::UInt(_) => CborTypeFilter::UNSIGNED,
            CborValue::NInt(_) => CborTypeFilter::NEGATIVE,
            CborValue::BigInt(v) => {
                if v.is_negative() {
                    CborTypeFilter::NEGATIVE
                } else {
                    CborTypeFilter::UNSIGNED
                }
            }
            CborValue::Bytes(_) => CborTypeFilter::BYTES,
            CborValue::Text(_) => CborTypeFilter::TEXT,
            CborValue::Array(_) => CborTypeFilter::ARRAY,
            CborValue::Map(_) => CborTypeFilter::MAP,
            CborValue::Tagged(..) => CborTypeFilter::TAGGED,
            CborValue::Simple(_)
            | CborValue::Bool(_)
            | CborValue::Null
            | CborValue::Undefined => CborTypeFilter::SIMPLE,
            CborValue::Float(_) => CborTypeFilter::FLOAT,
            // Already-normalised numbers only appear inside tags when an
            // application re-wraps them.
            CborValue::Decimal(_)
            | CborValue::BigFloat(_)
            | CborValue::Rational(_) => CborTypeFilter::ARRAY,
        };
        self.intersects(kind)
    }
}

/// Why a tag payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum TagError {
    /// The inner value's variant is outside the handler's filter.
    #[display(fmt = "inner value has the wrong type for the tag")]
    WrongType,
    /// The inner value has the right shape but invalid content.
    #[display(fmt = "malformed tag payload: {_0}")]
    Malformed(&'static str),
}

#[cfg(feature = "std")]
impl std::error::Error for TagError {}

/// Validation and normalisation for one tag number.
pub trait TagHandler {
    /// Variants the inner value may take; checked before
    /// [`TagHandler::validate`].
    fn filter(&self) -> CborTypeFilter;

    /// Validate the inner value and produce the normalised item (which may
    /// be a different variant, as with bignums).
    fn validate(&self, value: &CborValue) -> Result<CborValue, TagError>;
}

/// Mapping from tag numbers to handlers.
pub struct TagRegistry {
    handlers: BTreeMap<u64, Box<dyn TagHandler>>,
}

impl TagRegistry {
    /// A registry with no handlers; every tag decodes to
    /// [`CborValue::Tagged`].
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// A registry with the numeric handlers for tags 2, 3, 4, 5 and 30.
    pub fn with_default_handlers() -> Self {
        let mut registry = Self::empty();
        registry.register(tag::POSITIVE_BIGNUM, Box::new(BignumTag { negative: false }));
        registry.register(tag::NEGATIVE_BIGNUM, Box::new(BignumTag { negative: true }));
        registry.register(
            tag::DECIMAL_FRACTION,
            Box::new(ScaledNumberTag {
                kind: ScaledKind::Decimal,
            }),
        );
        registry.register(
            tag::BIGFLOAT,
            Box::new(ScaledNumberTag {
                kind: ScaledKind::BigFloat,
            }),
        );
        registry.register(tag::RATIONAL, Box::new(RationalTag));
        registry
    }

    /// Install a handler, replacing any previous one for the tag.
    pub fn register(&mut self, tag: u64, handler: Box<dyn TagHandler>) {
        self.handlers.insert(tag, handler);
    }

    /// The handler for a tag, if any.
    pub fn get(&self, tag: u64) -> Option<&dyn TagHandler> {
        self.handlers.get(&tag).map(|h| h.as_ref())
    }

    /// Run a decoded tag through its handler. Unhandled tags wrap; failed
    /// validation hands the raw payload back to the caller.
    pub fn validate(
        &self,
        tag: u64,
        value: CborValue,
    ) -> Result<CborValue, (TagError, CborValue)> {
        let handler = match self.get(tag) {
            None => return Ok(CborValue::tagged(tag, value)),
            Some(h) => h,
        };
        if !handler.filter().matches(&value) {
            return Err((TagError::WrongType, value));
        }
        match handler.validate(&value) {
            Ok(normalised) => Ok(normalised),
            Err(e) => Err((e, value)),
        }
    }
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::with_default_handlers()
    }
}

/// Tags 2 and 3: a byte-string magnitude becomes an integer.
struct BignumTag {
    negative: bool,
}

impl TagHandler for BignumTag {
    fn filter(&self) -> CborTypeFilter {
        CborTypeFilter::BYTES
    }

    fn validate(&self, value: &CborValue) -> Result<CborValue, TagError> {
        let bytes = value.as_bytes().ok_or(TagError::WrongType)?;
        let magnitude = BigInt::from_unsigned_bytes_be(bytes);
        let integer = if self.negative {
            -(&magnitude + &BigInt::one())
        } else {
            magnitude
        };
        Ok(CborValue::integer(integer))
    }
}

enum ScaledKind {
    Decimal,
    BigFloat,
}

/// Tags 4 and 5: `[exponent, mantissa]` becomes an extended number.
struct ScaledNumberTag {
    kind: ScaledKind,
}

/// The exponent slot accepts the integer majors but not a bignum.
fn plain_integer(value: &CborValue) -> Result<BigInt, TagError> {
    match value {
        CborValue::UInt(_) | CborValue::NInt(_) => value
            .to_bigint()
            .ok_or(TagError::Malformed("exponent out of range")),
        _ => Err(TagError::Malformed("exponent must be a plain integer")),
    }
}

fn any_integer(value: &CborValue) -> Result<BigInt, TagError> {
    value
        .to_bigint()
        .ok_or(TagError::Malformed("expected an integer"))
}

impl TagHandler for ScaledNumberTag {
    fn filter(&self) -> CborTypeFilter {
        CborTypeFilter::ARRAY
    }

    fn validate(&self, value: &CborValue) -> Result<CborValue, TagError> {
        let items = value.as_array().ok_or(TagError::WrongType)?;
        let [exponent, mantissa] = items else {
            return Err(TagError::Malformed("expected a two-element array"));
        };
        let exponent = plain_integer(exponent)?;
        let mantissa = any_integer(mantissa)?;
        Ok(match self.kind {
            ScaledKind::Decimal => {
                CborValue::Decimal(ExtendedDecimal::new(mantissa, exponent))
            }
            ScaledKind::BigFloat => {
                CborValue::BigFloat(ExtendedFloat::new(mantissa, exponent))
            }
        })
    }
}

/// Tag 30: `[numerator, denominator]` becomes a rational.
struct RationalTag;

impl TagHandler for RationalTag {
    fn filter(&self) -> CborTypeFilter {
        CborTypeFilter::ARRAY
    }

    fn validate(&self, value: &CborValue) -> Result<CborValue, TagError> {
        let items = value.as_array().ok_or(TagError::WrongType)?;
        let [numerator, denominator] = items else {
            return Err(TagError::Malformed("expected a two-element array"));
        };
        let numerator = any_integer(numerator)?;
        let denominator = any_integer(denominator)?;
        if denominator.is_negative() || denominator.is_zero() {
            return Err(TagError::Malformed("denominator must be positive"));
        }
        let rational = ExtendedRational::new(numerator, denominator)
            .map_err(|_| TagError::Malformed("denominator must be positive"))?;
        Ok(CborValue::Rational(rational))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn bignum_normalises_into_integer_variants() {
        let registry = TagRegistry::default();
        let v = registry
            .validate(2, CborValue::Bytes(vec![0x01, 0x00]))
            .unwrap();
        assert_eq!(v, CborValue::UInt(256));
        let v = registry
            .validate(3, CborValue::Bytes(vec![0x01, 0x00]))
            .unwrap();
        assert_eq!(v, CborValue::from(-257i64));
        // 2^64 keeps the wide representation.
        let v = registry
            .validate(2, CborValue::Bytes(vec![1, 0, 0, 0, 0, 0, 0, 0, 0]))
            .unwrap();
        assert_eq!(v, CborValue::BigInt("18446744073709551616".parse().unwrap()));
    }

    #[test]
    fn wrong_type_hands_the_payload_back() {
        let registry = TagRegistry::default();
        let (err, raw) = registry
            .validate(2, CborValue::from("not bytes"))
            .unwrap_err();
        assert_eq!(err, TagError::WrongType);
        assert_eq!(raw, CborValue::from("not bytes"));
    }

    #[test]
    fn decimal_fraction_requires_a_pair() {
        let registry = TagRegistry::default();
        let ok = registry
            .validate(
                4,
                CborValue::Array(vec![CborValue::from(-2i64), CborValue::UInt(27315)]),
            )
            .unwrap();
        match ok {
            CborValue::Decimal(d) => assert_eq!(d.to_string(), "273.15"),
            other => panic!("expected a decimal, got {other:?}"),
        }
        assert!(registry
            .validate(4, CborValue::Array(vec![CborValue::UInt(1)]))
            .is_err());
        // A bignum exponent is not allowed.
        let bad = CborValue::Array(vec![
            CborValue::BigInt("18446744073709551616".parse().unwrap()),
            CborValue::UInt(1),
        ]);
        assert!(registry.validate(4, bad).is_err());
    }

    #[test]
    fn unknown_tags_stay_wrapped() {
        let registry = TagRegistry::default();
        let v = registry.validate(1234, CborValue::UInt(1)).unwrap();
        assert_eq!(v, CborValue::tagged(1234, CborValue::UInt(1)));
    }

    #[test]
    fn rational_rejects_zero_denominators() {
        let registry = TagRegistry::default();
        let bad = CborValue::Array(vec![CborValue::UInt(1), CborValue::UInt(0)]);
        assert!(registry.validate(30, bad).is_err());
        let ok = registry
            .validate(
                30,
                CborValue::Array(vec![CborValue::from(-2i64), CborValue::UInt(4)]),
            )
            .unwrap();
        match ok {
            CborValue::Rational(r) => assert_eq!(r.to_string(), "-1/2"),
            other => panic!("expected a rational, got {other:?}"),
        }
    }
}

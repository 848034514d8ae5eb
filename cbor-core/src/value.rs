//! The tagged CBOR value model.

use alloc::{
    boxed::Box,
    string::String,
    vec::Vec,
};
use cbor_bigint::BigInt;
use cbor_real::{
    ExtendedDecimal,
    ExtendedFloat,
    ExtendedRational,
};
use core::cmp::Ordering;

use crate::encode;

/// A floating-point CBOR item. Half-precision items decode losslessly into
/// the single variant; the encoder re-narrows on the way out.
#[derive(Debug, Clone, Copy)]
pub enum CborFloat {
    /// Binary32, also covering every decoded binary16.
    Single(f32),
    /// Binary64.
    Double(f64),
}

impl CborFloat {
    /// The value widened to `f64`.
    pub fn to_f64(self) -> f64 {
        match self {
            CborFloat::Single(v) => f64::from(v),
            CborFloat::Double(v) => v,
        }
    }
}

impl PartialEq for CborFloat {
    /// Bit-pattern equality: NaN payloads distinguish, `-0 != 0`. Mixed
    /// widths are equal when the double narrows losslessly to the single.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CborFloat::Single(a), CborFloat::Single(b)) => a.to_bits() == b.to_bits(),
            (CborFloat::Double(a), CborFloat::Double(b)) => a.to_bits() == b.to_bits(),
            (CborFloat::Single(s), CborFloat::Double(d))
            | (CborFloat::Double(d), CborFloat::Single(s)) => {
                crate::half::double_to_single(*d).map(f32::to_bits) == Some(s.to_bits())
            }
        }
    }
}

impl Eq for CborFloat {}

/// A decoded CBOR data item.
#[derive(Debug, Clone)]
pub enum CborValue {
    /// Major type 0.
    UInt(u64),
    /// Major type 1; the value is `-1 - n`.
    NInt(u64),
    /// An integer outside the 64-bit majors, carried by tag 2 or 3.
    BigInt(BigInt),
    /// Major type 2.
    Bytes(Vec<u8>),
    /// Major type 3; always well-formed UTF-8.
    Text(String),
    /// Major type 4.
    Array(Vec<CborValue>),
    /// Major type 5, iterated in insertion order and encoded in canonical
    /// order.
    Map(CborMap),
    /// Major type 6 with no registered handler, or one whose validation
    /// failed in lenient mode.
    Tagged(u64, Box<CborValue>),
    /// Major type 7 simple values other than the dedicated ones. Valid
    /// values are 0–19 and 32–255.
    Simple(u8),
    /// Simple values 20 and 21.
    Bool(bool),
    /// Simple value 22.
    Null,
    /// Simple value 23.
    Undefined,
    /// Major type 7 floats.
    Float(CborFloat),
    /// A decimal fraction (tag 4).
    Decimal(ExtendedDecimal),
    /// A bigfloat (tag 5).
    BigFloat(ExtendedFloat),
    /// A rational number (tag 30).
    Rational(ExtendedRational),
}

impl CborValue {
    /// Wrap an integer, choosing the narrowest variant.
    pub fn integer(value: BigInt) -> Self {
        if let Ok(v) = u64::try_from(&value) {
            return CborValue::UInt(v);
        }
        if value.is_negative() {
            let n = -(&value + &BigInt::one());
            if let Ok(n) = u64::try_from(&n) {
                return CborValue::NInt(n);
            }
        }
        CborValue::BigInt(value)
    }

    /// A simple value; `None` for the reserved range 24–31 and the
    /// dedicated values 20–23.
    pub fn simple(value: u8) -> Option<Self> {
        match value {
            20 => Some(CborValue::Bool(false)),
            21 => Some(CborValue::Bool(true)),
            22 => Some(CborValue::Null),
            23 => Some(CborValue::Undefined),
            24..=31 => None,
            v => Some(CborValue::Simple(v)),
        }
    }

    /// Wrap a value in a tag.
    pub fn tagged(tag: u64, inner: CborValue) -> Self {
        CborValue::Tagged(tag, Box::new(inner))
    }

    /// The numeric value of either integer major, when it fits `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CborValue::UInt(v) => i64::try_from(*v).ok(),
            CborValue::NInt(n) => {
                let n = i64::try_from(*n).ok()?;
                n.checked_neg()?.checked_sub(1)
            }
            _ => None,
        }
    }

    /// The unsigned value, for major type 0 items.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CborValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer variant as a [`BigInt`].
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            CborValue::UInt(v) => Some(BigInt::from(*v)),
            CborValue::NInt(n) => Some(-(&BigInt::from(*n) + &BigInt::one())),
            CborValue::BigInt(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// The byte-string payload.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::Text(t) => Some(t),
            _ => None,
        }
    }

    /// The array elements.
    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            CborValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The map.
    pub fn as_map(&self) -> Option<&CborMap> {
        match self {
            CborValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// The boolean payload.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CborValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The float payload widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CborValue::Float(f) => Some(f.to_f64()),
            _ => None,
        }
    }

    /// Whether this is the null item.
    pub fn is_null(&self) -> bool {
        matches!(self, CborValue::Null)
    }

    /// The outermost tag number, if any.
    pub fn tag(&self) -> Option<u64> {
        match self {
            CborValue::Tagged(tag, _) => Some(*tag),
            _ => None,
        }
    }

    /// The canonical encoding of this value. Values that cannot be encoded
    /// (reserved simple values, duplicate map keys) yield `None`.
    pub fn canonical_bytes(&self) -> Option<Vec<u8>> {
        encode::to_vec(self).ok()
    }

    /// Canonical-CBOR ordering: shorter encoding first, then lexicographic.
    /// This is the map key order of the deterministic encoding.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self.canonical_bytes(), other.canonical_bytes()) {
            (Some(a), Some(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(&b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialEq for CborValue {
    /// Two values are equal when their canonical encodings are equal.
    /// Same-variant scalars shortcut the encoder.
    fn eq(&self, other: &Self) -> bool {
        use CborValue::*;
        match (self, other) {
            (UInt(a), UInt(b)) => a == b,
            (NInt(a), NInt(b)) => a == b,
            (BigInt(a), BigInt(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Tagged(ta, ia), Tagged(tb, ib)) => ta == tb && ia == ib,
            (Simple(a), Simple(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Null, Null) | (Undefined, Undefined) => true,
            (Float(a), Float(b)) => a == b,
            (Decimal(a), Decimal(b)) => a == b,
            (BigFloat(a), BigFloat(b)) => a == b,
            (Rational(a), Rational(b)) => a == b,
            (a, b) => match (a.canonical_bytes(), b.canonical_bytes()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl Eq for CborValue {}

/// An ordered map of CBOR values.
///
/// Entries keep their insertion order for iteration; the encoder sorts
/// them into canonical key order on the way out.
#[derive(Debug, Clone, Default)]
pub struct CborMap {
    entries: Vec<(CborValue, CborValue)>,
}

impl CborMap {
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an entry, replacing the value of an equal existing key.
    pub fn insert(&mut self, key: CborValue, value: CborValue) {
        for (k, v) in &mut self.entries {
            if *k == key {
                *v = value;
                return;
            }
        }
        self.entries.push((key, value));
    }

    /// Append an entry without looking for an existing key. The decoder
    /// uses this to preserve duplicate keys in lenient mode.
    pub(crate) fn push_unchecked(&mut self, key: CborValue, value: CborValue) {
        self.entries.push((key, value));
    }

    /// The value for an equal key.
    pub fn get(&self, key: &CborValue) -> Option<&CborValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether an equal key exists.
    pub fn contains_key(&self, key: &CborValue) -> bool {
        self.get(key).is_some()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&CborValue, &CborValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Entries sorted into canonical key order.
    pub(crate) fn canonical_entries(&self) -> Vec<(&CborValue, &CborValue)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (k, v)).collect();
        entries.sort_by(|(a, _), (b, _)| a.canonical_cmp(b));
        entries
    }
}

impl PartialEq for CborMap {
    /// Order-insensitive equality over canonical key order.
    fn eq(&self, other: &Self) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        let a = self.canonical_entries();
        let b = other.canonical_entries();
        a.iter()
            .zip(b.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
    }
}

impl Eq for CborMap {}

impl FromIterator<(CborValue, CborValue)> for CborMap {
    fn from_iter<I: IntoIterator<Item = (CborValue, CborValue)>>(iter: I) -> Self {
        let mut map = CborMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl From<u64> for CborValue {
    fn from(v: u64) -> Self {
        CborValue::UInt(v)
    }
}

impl From<i64> for CborValue {
    fn from(v: i64) -> Self {
        if v >= 0 {
            CborValue::UInt(v as u64)
        } else {
            CborValue::NInt(!(v as u64))
        }
    }
}

impl From<BigInt> for CborValue {
    fn from(v: BigInt) -> Self {
        CborValue::integer(v)
    }
}

impl From<&str> for CborValue {
    fn from(v: &str) -> Self {
        CborValue::Text(String::from(v))
    }
}

impl From<String> for CborValue {
    fn from(v: String) -> Self {
        CborValue::Text(v)
    }
}

impl From<Vec<u8>> for CborValue {
    fn from(v: Vec<u8>) -> Self {
        CborValue::Bytes(v)
    }
}

impl From<bool> for CborValue {
    fn from(v: bool) -> Self {
        CborValue::Bool(v)
    }
}

impl From<f32> for CborValue {
    fn from(v: f32) -> Self {
        CborValue::Float(CborFloat::Single(v))
    }
}

impl From<f64> for CborValue {
    fn from(v: f64) -> Self {
        CborValue::Float(CborFloat::Double(v))
    }
}

impl From<ExtendedDecimal> for CborValue {
    fn from(v: ExtendedDecimal) -> Self {
        CborValue::Decimal(v)
    }
}

impl From<ExtendedFloat> for CborValue {
    fn from(v: ExtendedFloat) -> Self {
        CborValue::BigFloat(v)
    }
}

impl From<ExtendedRational> for CborValue {
    fn from(v: ExtendedRational) -> Self {
        CborValue::Rational(v)
    }
}

impl From<Vec<CborValue>> for CborValue {
    fn from(v: Vec<CborValue>) -> Self {
        CborValue::Array(v)
    }
}

impl From<CborMap> for CborValue {
    fn from(v: CborMap) -> Self {
        CborValue::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_choose_the_narrowest_variant() {
        assert_eq!(CborValue::from(5i64), CborValue::UInt(5));
        assert_eq!(CborValue::from(-1i64), CborValue::NInt(0));
        assert_eq!(CborValue::from(-500i64), CborValue::NInt(499));
        let v = CborValue::integer("18446744073709551615".parse().unwrap());
        assert_eq!(v, CborValue::UInt(u64::MAX));
        let v = CborValue::integer("18446744073709551616".parse().unwrap());
        assert!(matches!(v, CborValue::BigInt(_)));
        let v = CborValue::integer("-18446744073709551616".parse().unwrap());
        assert_eq!(v, CborValue::NInt(u64::MAX));
        let v = CborValue::integer("-18446744073709551617".parse().unwrap());
        assert!(matches!(v, CborValue::BigInt(_)));
    }

    #[test]
    fn as_i64_covers_both_majors() {
        assert_eq!(CborValue::UInt(7).as_i64(), Some(7));
        assert_eq!(CborValue::NInt(0).as_i64(), Some(-1));
        assert_eq!(CborValue::NInt(u64::MAX).as_i64(), None);
        assert_eq!(
            CborValue::NInt((i64::MAX as u64).wrapping_add(0)).as_i64(),
            Some(i64::MIN)
        );
    }

    #[test]
    fn float_equality_is_bitwise() {
        let nan1 = CborValue::from(f64::NAN);
        let nan2 = CborValue::from(f64::NAN);
        assert_eq!(nan1, nan2);
        assert_ne!(CborValue::from(0.0f64), CborValue::from(-0.0f64));
        assert_eq!(CborValue::from(1.5f64), CborValue::from(1.5f64));
    }

    #[test]
    fn cross_width_floats_compare_by_encoding() {
        // 1.5 shrinks to the same half-precision item from either width.
        assert_eq!(CborValue::from(1.5f32), CborValue::from(1.5f64));
        // 0.1f64 does not shrink; 0.1f32 is a different value entirely.
        assert_ne!(CborValue::from(0.1f32), CborValue::from(0.1f64));
    }

    #[test]
    fn map_equality_ignores_insertion_order() {
        let mut a = CborMap::new();
        a.insert(CborValue::from("x"), CborValue::from(1u64));
        a.insert(CborValue::from("y"), CborValue::from(2u64));
        let mut b = CborMap::new();
        b.insert(CborValue::from("y"), CborValue::from(2u64));
        b.insert(CborValue::from("x"), CborValue::from(1u64));
        assert_eq!(CborValue::Map(a), CborValue::Map(b));
    }

    #[test]
    fn map_insert_replaces_equal_keys() {
        let mut m = CborMap::new();
        m.insert(CborValue::from(1u64), CborValue::from("a"));
        m.insert(CborValue::from(1u64), CborValue::from("b"));
        assert_eq!(m.len(), 1);
        assert_eq!(
            m.get(&CborValue::from(1u64)),
            Some(&CborValue::from("b"))
        );
    }

    #[test]
    fn simple_constructor_normalises() {
        assert_eq!(CborValue::simple(20), Some(CborValue::Bool(false)));
        assert_eq!(CborValue::simple(22), Some(CborValue::Null));
        assert_eq!(CborValue::simple(25), None);
        assert_eq!(CborValue::simple(32), Some(CborValue::Simple(32)));
        assert_eq!(CborValue::simple(16), Some(CborValue::Simple(16)));
    }
}

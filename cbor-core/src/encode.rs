//! Canonical CBOR encoder.
//!
//! Always emits the deterministic encoding: shortest argument widths,
//! shortest float widths, map keys sorted length-first then
//! lexicographically.

use alloc::vec::Vec;
use cbor_bigint::BigInt;
use cbor_real::{
    ExtendedDecimal,
    ExtendedFloat,
    ExtendedRational,
    RadixNumber,
};

use crate::{
    error::EncodeError,
    half,
    io::Sink,
    value::{
        CborFloat,
        CborValue,
    },
    wire::MajorType,
};

/// Tag numbers with built-in numeric meaning.
pub mod tag {
    /// Unsigned bignum.
    pub const POSITIVE_BIGNUM: u64 = 2;
    /// Negative bignum, encoding `-1 - n`.
    pub const NEGATIVE_BIGNUM: u64 = 3;
    /// Decimal fraction `[exponent, mantissa]`.
    pub const DECIMAL_FRACTION: u64 = 4;
    /// Bigfloat `[exponent, mantissa]`.
    pub const BIGFLOAT: u64 = 5;
    /// Rational number `[numerator, denominator]`.
    pub const RATIONAL: u64 = 30;
}

/// Streaming encoder over a byte sink.
pub struct Encoder<W> {
    sink: W,
}

impl<W: Sink> Encoder<W> {
    /// Wrap a sink.
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Write one data item in canonical form.
    pub fn encode(&mut self, value: &CborValue) -> Result<(), EncodeError> {
        match value {
            CborValue::UInt(v) => self.write_header(MajorType::Unsigned, *v),
            CborValue::NInt(n) => self.write_header(MajorType::Negative, *n),
            CborValue::BigInt(v) => self.write_integer(v),
            CborValue::Bytes(b) => {
                self.write_header(MajorType::Bytes, b.len() as u64)?;
                self.sink.write(b)
            }
            CborValue::Text(t) => {
                self.write_header(MajorType::Text, t.len() as u64)?;
                self.sink.write(t.as_bytes())
            }
            CborValue::Array(items) => {
                self.write_header(MajorType::Array, items.len() as u64)?;
                for item in items {
                    self.encode(item)?;
                }
                Ok(())
            }
            CborValue::Map(map) => {
                self.write_header(MajorType::Map, map.len() as u64)?;
                let entries = map.canonical_entries();
                for pair in entries.windows(2) {
                    if pair[0].0 == pair[1].0 {
                        return Err(EncodeError::DuplicateMapKey);
                    }
                }
                for (key, value) in entries {
                    self.encode(key)?;
                    self.encode(value)?;
                }
                Ok(())
            }
            CborValue::Tagged(tag, inner) => {
                self.write_header(MajorType::Tag, *tag)?;
                self.encode(inner)
            }
            CborValue::Simple(v) => self.write_simple(*v),
            CborValue::Bool(false) => self.sink.push_byte(0xF4),
            CborValue::Bool(true) => self.sink.push_byte(0xF5),
            CborValue::Null => self.sink.push_byte(0xF6),
            CborValue::Undefined => self.sink.push_byte(0xF7),
            CborValue::Float(f) => self.write_float(*f),
            CborValue::Decimal(d) => self.write_decimal(d),
            CborValue::BigFloat(f) => self.write_bigfloat(f),
            CborValue::Rational(r) => self.write_rational(r),
        }
    }

    /// Initial byte plus the shortest argument encoding.
    fn write_header(&mut self, major: MajorType, value: u64) -> Result<(), EncodeError> {
        let m = major.initial();
        if value < 24 {
            self.sink.push_byte(m | value as u8)
        } else if value <= u64::from(u8::MAX) {
            self.sink.write(&[m | 24, value as u8])
        } else if value <= u64::from(u16::MAX) {
            let b = (value as u16).to_be_bytes();
            self.sink.write(&[m | 25, b[0], b[1]])
        } else if value <= u64::from(u32::MAX) {
            let b = (value as u32).to_be_bytes();
            self.sink.write(&[m | 26, b[0], b[1], b[2], b[3]])
        } else {
            let b = value.to_be_bytes();
            self.sink.push_byte(m | 27)?;
            self.sink.write(&b)
        }
    }

    /// Any integer: the 64-bit majors when the value fits, tag 2/3
    /// bignums beyond.
    fn write_integer(&mut self, value: &BigInt) -> Result<(), EncodeError> {
        if let Ok(v) = u64::try_from(value) {
            return self.write_header(MajorType::Unsigned, v);
        }
        if value.is_negative() {
            let n = -(value + &BigInt::one());
            if let Ok(n) = u64::try_from(&n) {
                return self.write_header(MajorType::Negative, n);
            }
            self.write_header(MajorType::Tag, tag::NEGATIVE_BIGNUM)?;
            let bytes = n.to_unsigned_bytes_be();
            self.write_header(MajorType::Bytes, bytes.len() as u64)?;
            return self.sink.write(&bytes);
        }
        self.write_header(MajorType::Tag, tag::POSITIVE_BIGNUM)?;
        let bytes = value.to_unsigned_bytes_be();
        self.write_header(MajorType::Bytes, bytes.len() as u64)?;
        self.sink.write(&bytes)
    }

    fn write_simple(&mut self, value: u8) -> Result<(), EncodeError> {
        match value {
            0..=19 => self.sink.push_byte(0xE0 | value),
            20..=31 => Err(EncodeError::InvalidSimpleValue(value)),
            _ => self.sink.write(&[0xF8, value]),
        }
    }

    /// The narrowest width that preserves the value bit for bit.
    fn write_float(&mut self, value: CborFloat) -> Result<(), EncodeError> {
        let single = match value {
            CborFloat::Single(s) => s,
            CborFloat::Double(d) => match half::double_to_single(d) {
                Some(s) => s,
                None => {
                    self.sink.push_byte(0xFB)?;
                    return self.sink.write(&d.to_bits().to_be_bytes());
                }
            },
        };
        if let Some(h) = half::single_to_half(single) {
            let b = h.to_be_bytes();
            return self.sink.write(&[0xF9, b[0], b[1]]);
        }
        let b = single.to_bits().to_be_bytes();
        self.sink.write(&[0xFA, b[0], b[1], b[2], b[3]])
    }

    /// A non-finite extended number has no tag 4/5/30 form; it falls back
    /// to the equivalent float item.
    fn write_nonfinite(
        &mut self,
        negative: bool,
        nan: bool,
    ) -> Result<(), EncodeError> {
        let v = if nan {
            f64::NAN
        } else if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        self.write_float(CborFloat::Double(v))
    }

    fn write_decimal(&mut self, value: &ExtendedDecimal) -> Result<(), EncodeError> {
        if !value.is_finite() {
            return self.write_nonfinite(value.is_negative(), value.is_nan());
        }
        self.write_header(MajorType::Tag, tag::DECIMAL_FRACTION)?;
        self.write_header(MajorType::Array, 2)?;
        self.write_integer(value.exponent())?;
        self.write_integer(&value.signed_mantissa())
    }

    fn write_bigfloat(&mut self, value: &ExtendedFloat) -> Result<(), EncodeError> {
        if !value.is_finite() {
            return self.write_nonfinite(value.is_negative(), value.is_nan());
        }
        self.write_header(MajorType::Tag, tag::BIGFLOAT)?;
        self.write_header(MajorType::Array, 2)?;
        self.write_integer(value.exponent())?;
        self.write_integer(&value.signed_mantissa())
    }

    fn write_rational(&mut self, value: &ExtendedRational) -> Result<(), EncodeError> {
        if !value.is_finite() {
            return self.write_nonfinite(value.is_negative(), value.is_nan());
        }
        self.write_header(MajorType::Tag, tag::RATIONAL)?;
        self.write_header(MajorType::Array, 2)?;
        self.write_integer(&value.signed_numerator())?;
        self.write_integer(value.denominator())
    }
}

/// Encode one value into a fresh buffer.
pub fn to_vec(value: &CborValue) -> Result<Vec<u8>, EncodeError> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CborMap;
    use alloc::vec;

    fn enc(v: &CborValue) -> Vec<u8> {
        to_vec(v).unwrap()
    }

    #[test]
    fn integer_headers_use_minimal_widths() {
        assert_eq!(enc(&CborValue::UInt(0)), vec![0x00]);
        assert_eq!(enc(&CborValue::UInt(23)), vec![0x17]);
        assert_eq!(enc(&CborValue::UInt(24)), vec![0x18, 0x18]);
        assert_eq!(enc(&CborValue::UInt(255)), vec![0x18, 0xFF]);
        assert_eq!(enc(&CborValue::UInt(256)), vec![0x19, 0x01, 0x00]);
        assert_eq!(enc(&CborValue::UInt(65536)), vec![0x1A, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(
            enc(&CborValue::UInt(u64::MAX)),
            vec![0x1B, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(enc(&CborValue::from(-1i64)), vec![0x20]);
        assert_eq!(enc(&CborValue::from(-1000i64)), vec![0x39, 0x03, 0xE7]);
    }

    #[test]
    fn bignums_take_tag_2_and_3() {
        let v = CborValue::BigInt("18446744073709551616".parse().unwrap());
        let mut expected = vec![0xC2, 0x49, 0x01];
        expected.extend([0u8; 8]);
        assert_eq!(enc(&v), expected);

        let v = CborValue::BigInt("-18446744073709551617".parse().unwrap());
        let mut expected = vec![0xC3, 0x49, 0x01];
        expected.extend([0u8; 8]);
        assert_eq!(enc(&v), expected);
    }

    #[test]
    fn small_bigints_fall_back_to_integer_majors() {
        let v = CborValue::BigInt("23".parse().unwrap());
        assert_eq!(enc(&v), vec![0x17]);
        let v = CborValue::BigInt("-1".parse().unwrap());
        assert_eq!(enc(&v), vec![0x20]);
    }

    #[test]
    fn strings_and_arrays() {
        assert_eq!(enc(&CborValue::from("a")), vec![0x61, 0x61]);
        assert_eq!(enc(&CborValue::from("IETF")), vec![0x64, 0x49, 0x45, 0x54, 0x46]);
        assert_eq!(
            enc(&CborValue::Bytes(vec![0x01, 0x02, 0x03, 0x04])),
            vec![0x44, 0x01, 0x02, 0x03, 0x04]
        );
        let arr = CborValue::Array(vec![
            CborValue::UInt(1),
            CborValue::UInt(2),
            CborValue::UInt(3),
        ]);
        assert_eq!(enc(&arr), vec![0x83, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn map_keys_sort_canonically() {
        // Length-first order: 10 (1 byte) before "z" (2 bytes) before
        // "aa" (3 bytes), insertion order notwithstanding.
        let mut map = CborMap::new();
        map.insert(CborValue::from("aa"), CborValue::UInt(2));
        map.insert(CborValue::from("z"), CborValue::UInt(1));
        map.insert(CborValue::UInt(10), CborValue::UInt(0));
        assert_eq!(
            enc(&CborValue::Map(map)),
            vec![0xA3, 0x0A, 0x00, 0x61, 0x7A, 0x01, 0x62, 0x61, 0x61, 0x02]
        );
    }

    #[test]
    fn floats_shrink_to_the_narrowest_width() {
        assert_eq!(enc(&CborValue::from(0.0f64)), vec![0xF9, 0x00, 0x00]);
        assert_eq!(enc(&CborValue::from(-0.0f64)), vec![0xF9, 0x80, 0x00]);
        assert_eq!(enc(&CborValue::from(1.0f64)), vec![0xF9, 0x3C, 0x00]);
        assert_eq!(enc(&CborValue::from(65504.0f64)), vec![0xF9, 0x7B, 0xFF]);
        assert_eq!(
            enc(&CborValue::from(100000.0f64)),
            vec![0xFA, 0x47, 0xC3, 0x50, 0x00]
        );
        assert_eq!(
            enc(&CborValue::from(1.1f64)),
            vec![0xFB, 0x3F, 0xF1, 0x99, 0x99, 0x99, 0x99, 0x99, 0x9A]
        );
        assert_eq!(enc(&CborValue::from(f64::INFINITY)), vec![0xF9, 0x7C, 0x00]);
        assert_eq!(enc(&CborValue::from(f64::NAN)), vec![0xF9, 0x7E, 0x00]);
        assert_eq!(
            enc(&CborValue::from(1.0e300f64)),
            vec![0xFB, 0x7E, 0x37, 0xE4, 0x3C, 0x88, 0x00, 0x75, 0x9C]
        );
    }

    #[test]
    fn simple_values_and_constants() {
        assert_eq!(enc(&CborValue::Bool(false)), vec![0xF4]);
        assert_eq!(enc(&CborValue::Bool(true)), vec![0xF5]);
        assert_eq!(enc(&CborValue::Null), vec![0xF6]);
        assert_eq!(enc(&CborValue::Undefined), vec![0xF7]);
        assert_eq!(enc(&CborValue::Simple(16)), vec![0xF0]);
        assert_eq!(enc(&CborValue::Simple(255)), vec![0xF8, 0xFF]);
        assert_eq!(
            to_vec(&CborValue::Simple(24)),
            Err(EncodeError::InvalidSimpleValue(24))
        );
    }

    #[test]
    fn tagged_values_nest() {
        let v = CborValue::tagged(1, CborValue::UInt(1363896240));
        assert_eq!(enc(&v), vec![0xC1, 0x1A, 0x51, 0x4B, 0x67, 0xB0]);
    }

    #[test]
    fn decimal_fraction_encodes_as_tag_4() {
        // 273.15 = 27315 * 10^-2, the RFC 8949 example.
        let d: ExtendedDecimal = "273.15".parse().unwrap();
        assert_eq!(
            enc(&CborValue::Decimal(d)),
            vec![0xC4, 0x82, 0x21, 0x19, 0x6A, 0xB3]
        );
    }

    #[test]
    fn bigfloat_encodes_as_tag_5() {
        // 1.5 = 3 * 2^-1, the RFC 8949 example.
        let f = ExtendedFloat::new(BigInt::from(3u32), BigInt::from(-1i32));
        assert_eq!(enc(&CborValue::BigFloat(f)), vec![0xC5, 0x82, 0x20, 0x03]);
    }

    #[test]
    fn rational_encodes_as_tag_30() {
        let r = ExtendedRational::new(BigInt::from(1u32), BigInt::from(3u32)).unwrap();
        assert_eq!(enc(&CborValue::Rational(r)), vec![0xD8, 0x1E, 0x82, 0x01, 0x03]);
    }
}

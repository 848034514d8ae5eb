use cbor_bigint::BigInt;
use cbor_core::{
    from_slice,
    from_slice_canonical,
    to_vec,
    CborMap,
    CborValue,
    DecodeError,
    TagRegistry,
};
use cbor_real::{
    ExtendedDecimal,
    RadixNumber,
};

use proptest::prelude::*;

fn registry() -> TagRegistry {
    TagRegistry::default()
}

fn decode(bytes: &[u8]) -> CborValue {
    from_slice(bytes, &registry()).unwrap()
}

fn decode_hex(s: &str) -> CborValue {
    decode(&hex::decode(s).unwrap())
}

#[rstest::rstest]
#[case("00", CborValue::UInt(0))]
#[case("01", CborValue::UInt(1))]
#[case("0a", CborValue::UInt(10))]
#[case("17", CborValue::UInt(23))]
#[case("1818", CborValue::UInt(24))]
#[case("18ff", CborValue::UInt(255))]
#[case("190100", CborValue::UInt(256))]
#[case("1a000f4240", CborValue::UInt(1_000_000))]
#[case("1b000000e8d4a51000", CborValue::UInt(1_000_000_000_000))]
#[case("20", CborValue::from(-1i64))]
#[case("29", CborValue::from(-10i64))]
#[case("3863", CborValue::from(-100i64))]
#[case("3903e7", CborValue::from(-1000i64))]
#[case("f4", CborValue::Bool(false))]
#[case("f5", CborValue::Bool(true))]
#[case("f6", CborValue::Null)]
#[case("f7", CborValue::Undefined)]
#[case("f0", CborValue::Simple(16))]
#[case("f8ff", CborValue::Simple(255))]
#[case("60", CborValue::from(""))]
#[case("6161", CborValue::from("a"))]
#[case("6449455446", CborValue::from("IETF"))]
#[case("62c3bc", CborValue::from("\u{00fc}"))]
#[case("40", CborValue::Bytes(vec![]))]
#[case("4401020304", CborValue::Bytes(vec![1, 2, 3, 4]))]
#[case("80", CborValue::Array(vec![]))]
#[case("83010203", CborValue::Array(vec![
    CborValue::UInt(1),
    CborValue::UInt(2),
    CborValue::UInt(3),
]))]
fn rfc8949_vectors_round_trip(#[case] hex_bytes: &str, #[case] expected: CborValue) {
    let bytes = hex::decode(hex_bytes).unwrap();
    let decoded = from_slice(&bytes, &registry()).unwrap();
    assert_eq!(decoded, expected);
    assert_eq!(to_vec(&decoded).unwrap(), bytes, "canonical re-encode");
    // Canonical input stays acceptable in strict mode.
    assert_eq!(from_slice_canonical(&bytes, &registry()).unwrap(), expected);
}

#[rstest::rstest]
#[case("f90000", 0.0f64)]
#[case("f98000", -0.0f64)]
#[case("f93c00", 1.0)]
#[case("f93e00", 1.5)]
#[case("f97bff", 65504.0)]
#[case("fa47c35000", 100000.0)]
#[case("f90001", 5.960464477539063e-8)]
#[case("f90400", 6.103515625e-5)]
#[case("f9c400", -4.0)]
#[case("fb3ff199999999999a", 1.1)]
#[case("fb7e37e43c8800759c", 1.0e300)]
#[case("f97c00", f64::INFINITY)]
#[case("f9fc00", f64::NEG_INFINITY)]
fn rfc8949_float_vectors(#[case] hex_bytes: &str, #[case] expected: f64) {
    let bytes = hex::decode(hex_bytes).unwrap();
    let decoded = from_slice(&bytes, &registry()).unwrap();
    match &decoded {
        CborValue::Float(f) => assert_eq!(f.to_f64().to_bits(), expected.to_bits()),
        other => panic!("expected a float, got {other:?}"),
    }
    assert_eq!(to_vec(&decoded).unwrap(), bytes);
}

#[test]
fn integer_boundary_vectors() {
    // 2^64 - 1 is the last plain unsigned; 2^64 needs tag 2.
    assert_eq!(
        decode_hex("1bffffffffffffffff"),
        CborValue::UInt(u64::MAX)
    );
    let v = decode_hex("c249010000000000000000");
    assert_eq!(v, CborValue::BigInt("18446744073709551616".parse().unwrap()));
    assert_eq!(
        hex::encode(to_vec(&v).unwrap()),
        "c249010000000000000000"
    );
    // -2^64 is the last plain negative; -2^64 - 1 needs tag 3.
    assert_eq!(
        decode_hex("3bffffffffffffffff"),
        CborValue::NInt(u64::MAX)
    );
    let v = decode_hex("c349010000000000000000");
    assert_eq!(
        v,
        CborValue::BigInt("-18446744073709551617".parse().unwrap())
    );
}

#[test]
fn bignum_tags_normalise_small_payloads() {
    // Tag 2 over one byte is value 5: normalises to the plain integer.
    assert_eq!(decode_hex("c24105"), CborValue::UInt(5));
    assert_eq!(to_vec(&decode_hex("c24105")).unwrap(), vec![0x05]);
    // Empty payload is zero.
    assert_eq!(decode_hex("c240"), CborValue::UInt(0));
    assert_eq!(decode_hex("c340"), CborValue::from(-1i64));
}

#[test]
fn decimal_fraction_and_bigfloat_tags() {
    let v = decode_hex("c48221196ab3");
    match &v {
        CborValue::Decimal(d) => assert_eq!(d.to_string(), "273.15"),
        other => panic!("expected a decimal, got {other:?}"),
    }
    assert_eq!(hex::encode(to_vec(&v).unwrap()), "c48221196ab3");

    let v = decode_hex("c5822003");
    match &v {
        CborValue::BigFloat(f) => {
            assert_eq!(*f.mantissa(), BigInt::from(3u32));
            assert_eq!(*f.exponent(), BigInt::from(-1i32));
        }
        other => panic!("expected a bigfloat, got {other:?}"),
    }
    assert_eq!(hex::encode(to_vec(&v).unwrap()), "c5822003");
}

#[test]
fn rational_tag_30() {
    let v = decode_hex("d81e820103");
    match &v {
        CborValue::Rational(r) => assert_eq!(r.to_string(), "1/3"),
        other => panic!("expected a rational, got {other:?}"),
    }
    assert_eq!(hex::encode(to_vec(&v).unwrap()), "d81e820103");
}

#[test]
fn maps_round_trip_in_canonical_order() {
    let v = decode_hex("a26161016162820203");
    let mut expected = CborMap::new();
    expected.insert(CborValue::from("a"), CborValue::UInt(1));
    expected.insert(
        CborValue::from("b"),
        CborValue::Array(vec![CborValue::UInt(2), CborValue::UInt(3)]),
    );
    assert_eq!(v, CborValue::Map(expected));
    assert_eq!(hex::encode(to_vec(&v).unwrap()), "a26161016162820203");
}

#[test]
fn indefinite_items_reassemble() {
    // (_ h'0102', h'030405') from RFC 8949.
    assert_eq!(
        decode_hex("5f42010243030405ff"),
        CborValue::Bytes(vec![1, 2, 3, 4, 5])
    );
    // (_ "strea", "ming")
    assert_eq!(decode_hex("7f657374726561646d696e67ff"), CborValue::from("streaming"));
    // [_ 1, [2, 3], [_ 4, 5]]
    let v = decode_hex("9f018202039f0405ffff");
    assert_eq!(
        v,
        CborValue::Array(vec![
            CborValue::UInt(1),
            CborValue::Array(vec![CborValue::UInt(2), CborValue::UInt(3)]),
            CborValue::Array(vec![CborValue::UInt(4), CborValue::UInt(5)]),
        ])
    );
    // {_ "a": 1, "b": [_ 2, 3]}
    let v = decode_hex("bf61610161629f0203ffff");
    let mut expected = CborMap::new();
    expected.insert(CborValue::from("a"), CborValue::UInt(1));
    expected.insert(
        CborValue::from("b"),
        CborValue::Array(vec![CborValue::UInt(2), CborValue::UInt(3)]),
    );
    assert_eq!(v, CborValue::Map(expected));
}

#[rstest::rstest]
#[case("5f42010243030405ff", DecodeError::IndefiniteLength)]
#[case("1800", DecodeError::NonMinimalArgument)]
#[case("1817", DecodeError::NonMinimalArgument)]
#[case("190011", DecodeError::NonMinimalArgument)]
#[case("1a00000011", DecodeError::NonMinimalArgument)]
#[case("1b0000000000000011", DecodeError::NonMinimalArgument)]
#[case("fa3fc00000", DecodeError::NonMinimalFloat)]
#[case("fb3ff8000000000000", DecodeError::NonMinimalFloat)]
#[case("a2616201616102", DecodeError::NonCanonicalKeyOrder)]
#[case("a2616101616102", DecodeError::DuplicateMapKey)]
fn canonical_mode_rejections(#[case] hex_bytes: &str, #[case] expected: DecodeError) {
    let bytes = hex::decode(hex_bytes).unwrap();
    // Lenient mode accepts all of these.
    assert!(from_slice(&bytes, &registry()).is_ok(), "lenient decode");
    assert_eq!(
        from_slice_canonical(&bytes, &registry()).unwrap_err(),
        expected
    );
}

#[rstest::rstest]
#[case("", DecodeError::UnexpectedEof)]
#[case("18", DecodeError::UnexpectedEof)]
#[case("1a0000", DecodeError::UnexpectedEof)]
#[case("43ff", DecodeError::UnexpectedEof)]
#[case("8201", DecodeError::UnexpectedEof)]
#[case("1c", DecodeError::ReservedArgument(28))]
#[case("1d", DecodeError::ReservedArgument(29))]
#[case("1e", DecodeError::ReservedArgument(30))]
#[case("3f", DecodeError::ReservedArgument(31))]
#[case("f800", DecodeError::InvalidSimpleValue(0))]
#[case("f817", DecodeError::InvalidSimpleValue(23))]
#[case("ff", DecodeError::UnexpectedBreak)]
#[case("81ff", DecodeError::UnexpectedBreak)]
#[case("5f6161ff", DecodeError::MalformedIndefinite)]
#[case("5f00ff", DecodeError::MalformedIndefinite)]
#[case("5f5fffff", DecodeError::MalformedIndefinite)]
#[case("62c328", DecodeError::InvalidUtf8)]
#[case("0001", DecodeError::TrailingData)]
fn malformed_inputs_fail_in_any_mode(
    #[case] hex_bytes: &str,
    #[case] expected: DecodeError,
) {
    let bytes = hex::decode(hex_bytes).unwrap();
    assert_eq!(from_slice(&bytes, &registry()).unwrap_err(), expected);
}

#[test]
fn depth_limit_holds() {
    // 600 nested single-element arrays.
    let mut bytes = vec![0x81u8; 600];
    bytes.push(0x00);
    assert_eq!(
        from_slice(&bytes, &registry()).unwrap_err(),
        DecodeError::DepthExceeded
    );
}

#[test]
fn unknown_tags_round_trip_wrapped() {
    let v = decode_hex("c11a514b67b0");
    assert_eq!(v, CborValue::tagged(1, CborValue::UInt(1363896240)));
    assert_eq!(hex::encode(to_vec(&v).unwrap()), "c11a514b67b0");
}

#[test]
fn failed_tag_validation_is_lenient_by_default_and_strict_in_canonical() {
    // Tag 2 over a text string: wrong type.
    let bytes = hex::decode("c26161").unwrap();
    let v = from_slice(&bytes, &registry()).unwrap();
    assert_eq!(v, CborValue::tagged(2, CborValue::from("a")));
    assert_eq!(
        from_slice_canonical(&bytes, &registry()).unwrap_err(),
        DecodeError::TagValidationFailed(2)
    );
    // Tag 30 with a zero denominator: malformed payload.
    let bytes = hex::decode("d81e820100").unwrap();
    let v = from_slice(&bytes, &registry()).unwrap();
    assert!(matches!(v, CborValue::Tagged(30, _)));
    assert_eq!(
        from_slice_canonical(&bytes, &registry()).unwrap_err(),
        DecodeError::TagValidationFailed(30)
    );
}

#[test]
fn empty_registry_leaves_numeric_tags_alone() {
    let empty = TagRegistry::empty();
    let bytes = hex::decode("c24105").unwrap();
    let v = from_slice(&bytes, &empty).unwrap();
    assert_eq!(v, CborValue::tagged(2, CborValue::Bytes(vec![5])));
}

#[test]
fn decimal_encode_matches_quantize_example() {
    let mut ctx = cbor_real::PrecisionContext::unlimited();
    let d: ExtendedDecimal = "1.23E+5".parse().unwrap();
    let q = d.quantize(&"1".parse().unwrap(), &mut ctx).unwrap();
    let bytes = to_vec(&CborValue::Decimal(q)).unwrap();
    // [0, 123000]
    assert_eq!(hex::encode(bytes), "c482001a0001e078");
}

fn leaf_value() -> impl Strategy<Value = CborValue> {
    prop_oneof![
        any::<u64>().prop_map(CborValue::UInt),
        any::<u64>().prop_map(CborValue::NInt),
        proptest::collection::vec(any::<u8>(), 0..24).prop_map(CborValue::Bytes),
        "[a-z0-9]{0,16}".prop_map(CborValue::from),
        any::<bool>().prop_map(CborValue::Bool),
        Just(CborValue::Null),
        Just(CborValue::Undefined),
        any::<f64>().prop_map(CborValue::from),
        any::<f32>().prop_map(CborValue::from),
        proptest::collection::vec(any::<u8>(), 9..24).prop_map(|bytes| {
            CborValue::integer(BigInt::from_unsigned_bytes_be(&bytes))
        }),
        proptest::collection::vec(any::<u8>(), 9..24).prop_map(|bytes| {
            let m = BigInt::from_unsigned_bytes_be(&bytes);
            CborValue::integer(-(&m + &BigInt::one()))
        }),
    ]
}

fn value_strategy() -> impl Strategy<Value = CborValue> {
    leaf_value().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..6).prop_map(CborValue::Array),
            proptest::collection::vec((inner.clone(), inner.clone()), 0..6).prop_map(
                |pairs| {
                    let mut map = CborMap::new();
                    for (k, v) in pairs {
                        map.insert(k, v);
                    }
                    CborValue::Map(map)
                }
            ),
            (0u64..1000, inner).prop_map(|(t, v)| {
                // Stay clear of the numeric tags the registry rewrites.
                let t = if matches!(t, 2..=5 | 30) { t + 100 } else { t };
                CborValue::tagged(t, v)
            }),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn encode_decode_round_trips(v in value_strategy()) {
        let reg = registry();
        let bytes = to_vec(&v).unwrap();
        let decoded = from_slice_canonical(&bytes, &reg).unwrap();
        prop_assert_eq!(&decoded, &v);
        // Canonical encoding is idempotent.
        prop_assert_eq!(to_vec(&decoded).unwrap(), bytes);
    }

    #[test]
    fn canonical_bytes_agree_with_equality(
        a in value_strategy(),
        b in value_strategy(),
    ) {
        let ea = to_vec(&a).unwrap();
        let eb = to_vec(&b).unwrap();
        prop_assert_eq!(a == b, ea == eb);
    }
}

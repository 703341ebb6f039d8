mod common;

use common::SAMPLE_BLOCK;
use plc_rust::plc_common_rs::register::core::bit_utils::{encode_bit, test_bit};
use plc_rust::plc_common_rs::register::core::codec::{decode_all, encode_scalar};
use plc_rust::plc_common_rs::register::core::exceptions::{DecodeError, RegisterError, SchemaError};
use plc_rust::plc_common_rs::register::core::field_schema::{db7_schema, names, JsonFieldSpecLoader};
use plc_rust::plc_common_rs::register::types::WriteValue;

#[test]
fn test_decoded_snapshot_serializes_flat() {
    let values = decode_all(db7_schema(), &SAMPLE_BLOCK).unwrap();
    let json = serde_json::to_value(&values).unwrap();
    assert_eq!(json["setpoint"], 100);
    assert_eq!(json["temperatura"], 50.0);
    assert_eq!(json["b_paroE"], true);
    assert_eq!(json["estado_variador"], false);
}

#[test]
fn test_short_snapshot_never_yields_partial_values() {
    for len in 0..8 {
        let err = decode_all(db7_schema(), &SAMPLE_BLOCK[..len]).unwrap_err();
        assert_eq!(err, DecodeError::InsufficientData { required: 8, actual: len });
    }
    // 余分なバイトは無視する
    let mut longer = SAMPLE_BLOCK.to_vec();
    longer.extend_from_slice(&[0xAA, 0xBB]);
    assert!(decode_all(db7_schema(), &longer).is_ok());
}

#[test]
fn test_uint16_round_trip_full_range() {
    let schema = db7_schema();
    let field = schema.schema(names::SETPOINT).unwrap();
    let mut block = SAMPLE_BLOCK;
    for v in 0..=u16::MAX {
        let bytes = encode_scalar(field, WriteValue::from(v)).unwrap();
        block[0..2].copy_from_slice(&bytes);
        assert_eq!(decode_all(schema, &block).unwrap().get_u16(names::SETPOINT), Some(v));
    }
}

#[test]
fn test_uint16_out_of_range_is_rejected() {
    let field = db7_schema().schema(names::SETPOINT).unwrap();
    for v in [-1i64, 65_536, i64::MIN, i64::MAX] {
        assert!(matches!(
            encode_scalar(field, WriteValue::Integer(v)),
            Err(RegisterError::Range(_))
        ));
    }
}

#[test]
fn test_float32_round_trip_bit_exact() {
    let schema = db7_schema();
    let field = schema.schema(names::TEMPERATURE).unwrap();
    let samples = [0.0f32, -0.0, 1.5, -273.15, 50.0, f32::MIN_POSITIVE, f32::MAX, f32::MIN, 1.0e-42];
    let mut block = SAMPLE_BLOCK;
    for v in samples {
        let bytes = encode_scalar(field, WriteValue::from(v)).unwrap();
        assert_eq!(bytes, v.to_be_bytes().to_vec());
        block[2..6].copy_from_slice(&bytes);
        let decoded = decode_all(schema, &block).unwrap().get_f32(names::TEMPERATURE).unwrap();
        assert_eq!(decoded.to_bits(), v.to_bits());
    }
    assert!(encode_scalar(field, WriteValue::Float(f64::NAN)).is_err());
    assert!(encode_scalar(field, WriteValue::Float(f64::INFINITY)).is_err());
    assert!(encode_scalar(field, WriteValue::Float(1.0e39)).is_err());
}

#[test]
fn test_float32_sweep_over_bit_patterns() {
    let schema = db7_schema();
    let field = schema.schema(names::TEMPERATURE).unwrap();
    let mut block = SAMPLE_BLOCK;
    let mut checked = 0usize;
    // 素数刻みで符号・指数・仮数の全域をなめる
    for bits in (0..=u32::MAX).step_by(65_521).chain([0x0000_0001, 0x7F7F_FFFF, 0x8000_0000]) {
        let v = f32::from_bits(bits);
        if !v.is_finite() {
            assert!(encode_scalar(field, WriteValue::from(v)).is_err());
            continue;
        }
        let bytes = encode_scalar(field, WriteValue::from(v)).unwrap();
        assert_eq!(bytes, bits.to_be_bytes().to_vec(), "{:#010x}", bits);
        block[2..6].copy_from_slice(&bytes);
        let decoded = decode_all(schema, &block).unwrap().get_f32(names::TEMPERATURE).unwrap();
        assert_eq!(decoded.to_bits(), bits, "{:#010x}", bits);
        checked += 1;
    }
    assert!(checked > 60_000);
}

#[test]
fn test_bit_isolation_for_every_byte() {
    for byte in 0..=u8::MAX {
        for bit in 0..8u8 {
            let set = encode_bit(byte, bit, true);
            let cleared = encode_bit(set, bit, false);
            assert!(test_bit(set, bit));
            assert!(!test_bit(cleared, bit));
            assert_eq!(set & !(1 << bit), byte & !(1 << bit));
            assert_eq!(encode_bit(cleared, bit, test_bit(byte, bit)), byte);
        }
    }
}

fn load(fields: &str) -> Result<(), SchemaError> {
    JsonFieldSpecLoader::load_from_json(&format!(r#"{{"block_id": 7, "fields": [{}]}}"#, fields)).map(|_| ())
}

#[test]
fn test_schema_loader_rejects_invalid_layouts() {
    assert_eq!(
        load(r#"{"name": "a", "type": "bit", "offset": 6, "bit": 0}, {"name": "a", "type": "bit", "offset": 6, "bit": 1}"#),
        Err(SchemaError::DuplicateName("a".into()))
    );
    assert!(matches!(
        load(r#"{"name": "a", "type": "bit", "offset": 6, "bit": 2}, {"name": "b", "type": "bit", "offset": 6, "bit": 2}"#),
        Err(SchemaError::DuplicateBit { byte_offset: 6, bit_index: 2, .. })
    ));
    assert!(matches!(
        load(r#"{"name": "sp", "type": "uint16_be", "offset": 0}, {"name": "t", "type": "float32_be", "offset": 1}"#),
        Err(SchemaError::Overlap { .. })
    ));
    assert!(matches!(
        load(r#"{"name": "sp", "type": "uint16_be", "offset": 5}, {"name": "b", "type": "bit", "offset": 6, "bit": 0}"#),
        Err(SchemaError::Overlap { .. })
    ));
    assert!(matches!(
        load(r#"{"name": "b", "type": "bit", "offset": 6, "bit": 8}"#),
        Err(SchemaError::InvalidBitIndex { bit_index: Some(8), .. })
    ));
    assert!(matches!(
        load(r#"{"name": "b", "type": "bit", "offset": 6}"#),
        Err(SchemaError::InvalidBitIndex { bit_index: None, .. })
    ));
    assert_eq!(load(""), Err(SchemaError::Empty));
    assert!(matches!(
        JsonFieldSpecLoader::load_from_json("{not json"),
        Err(SchemaError::Parse(_))
    ));
}

#[test]
fn test_schema_loader_accepts_custom_block() {
    let schema = JsonFieldSpecLoader::load_from_json(
        r#"{"block_id": 12, "fields": [
            {"name": "level", "type": "uint16_be", "offset": 0},
            {"name": "pump", "type": "bit", "offset": 2, "bit": 5}
        ]}"#,
    )
    .unwrap();
    assert_eq!(schema.block_id(), 12);
    assert_eq!(schema.required_len(), 3);
    let values = decode_all(&schema, &[0x01, 0x02, 0b0010_0000]).unwrap();
    assert_eq!(values.get_u16("level"), Some(0x0102));
    assert_eq!(values.get_bool("pump"), Some(true));
}

//! ブロックコーデック
//!
//! 生のバイト列とフィールド値の相互変換を行う純粋関数群。
//! - `UInt16BE` は2バイト、ビッグエンディアン
//! - `Float32BE` は4バイトの IEEE-754 binary32、ビッグエンディアン
//! - `Bit` はバイト内の1ビット (bit 0 = LSB)

use bitvec::prelude::*;

use crate::plc_common_rs::register::core::exceptions::{DecodeError, IntentError, RangeError, RegisterResult};
use crate::plc_common_rs::register::core::field_schema::{FieldDescriptor, FieldKind, FieldSchema};
use crate::plc_common_rs::register::types::field_value::{FieldValue, FieldValueSet};
use crate::plc_common_rs::register::types::write_intent::WriteValue;

/// スナップショット全体をデコードする
///
/// バッファがスキーマの必要長より短ければ `DecodeError`。
/// 部分的な結果は返さない。
pub fn decode_all(schema: &FieldSchema, buffer: &[u8]) -> Result<FieldValueSet, DecodeError> {
    let required = schema.required_len();
    if buffer.len() < required {
        return Err(DecodeError::InsufficientData {
            required,
            actual: buffer.len(),
        });
    }

    let mut values = FieldValueSet::with_capacity(schema.fields().len());
    for field in schema.fields() {
        values.push(&field.name, decode_field(field, buffer)?);
    }
    Ok(values)
}

/// 1フィールドをデコードする
pub fn decode_field(field: &FieldDescriptor, buffer: &[u8]) -> Result<FieldValue, DecodeError> {
    let end = field.end();
    if buffer.len() < end {
        return Err(DecodeError::InsufficientData {
            required: end,
            actual: buffer.len(),
        });
    }

    let offset = field.byte_offset;
    let value = match field.kind {
        FieldKind::UInt16BE => FieldValue::UInt(u16::from_be_bytes([buffer[offset], buffer[offset + 1]])),
        FieldKind::Float32BE => FieldValue::Float(f32::from_be_bytes([
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ])),
        FieldKind::Bit => {
            let bit = field.bit_index.unwrap_or(0) as usize;
            let bits = BitSlice::<u8, Lsb0>::from_slice(&buffer[offset..end]);
            FieldValue::Bool(bits[bit])
        }
    };
    Ok(value)
}

/// スカラー値をワイヤ形式にエンコードする
///
/// `UInt16BE` は 0-65535 の範囲外なら `RangeError`（切り詰めはしない）。
/// `Float32BE` は非有限値、または binary32 の範囲を超える値で `RangeError`。
pub fn encode_scalar(field: &FieldDescriptor, value: WriteValue) -> RegisterResult<Vec<u8>> {
    match (field.kind, value) {
        (FieldKind::UInt16BE, WriteValue::Integer(v)) => {
            let v = u16::try_from(v).map_err(|_| RangeError::UInt16OutOfRange {
                field: field.name.clone(),
                value: v,
            })?;
            Ok(v.to_be_bytes().to_vec())
        }
        (FieldKind::Float32BE, WriteValue::Float(v)) => Ok(encode_f32(field, v)?.to_be_bytes().to_vec()),
        (FieldKind::Float32BE, WriteValue::Integer(v)) => Ok(encode_f32(field, v as f64)?.to_be_bytes().to_vec()),
        (kind, other) => Err(IntentError::KindMismatch {
            field: field.name.clone(),
            expected: kind,
            actual: other.type_name(),
        }
        .into()),
    }
}

fn encode_f32(field: &FieldDescriptor, value: f64) -> Result<f32, RangeError> {
    if !value.is_finite() || value.abs() > f32::MAX as f64 {
        return Err(RangeError::Float32OutOfRange {
            field: field.name.clone(),
            value,
        });
    }
    Ok(value as f32)
}

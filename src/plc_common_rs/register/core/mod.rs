//! レジスタコア機能
//! ビット操作、フィールドスキーマ、コーデック、エラー処理等のコア機能

pub mod bit_utils;
pub mod codec;
pub mod exceptions;
pub mod field_schema;

// 便利な再エクスポート
pub use bit_utils::{bit_mask, encode_bit, format_byte, masked_eq, test_bit};
pub use codec::{decode_all, decode_field, encode_scalar};
pub use exceptions::{
    ByteRegion, ConnectionError, DecodeError, IntentError, RangeError, RegisterError, RegisterResult,
    SchemaError, TransportError, TransportFailure, TransportStage,
};
pub use field_schema::{db7_schema, names, FieldDescriptor, FieldKind, FieldSchema, JsonFieldSpecLoader, DB7_SCHEMA};

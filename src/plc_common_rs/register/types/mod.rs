//! レジスタ値の型定義

pub mod field_value;
pub mod verification;
pub mod write_intent;

pub use field_value::{FieldValue, FieldValueSet};
pub use verification::{RegionMismatch, VerificationResult};
pub use write_intent::{BitGroup, BitWrite, PidMode, ResolvedIntent, ScalarWrite, WriteIntent, WriteValue};

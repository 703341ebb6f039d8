use crate::plc_common_rs::register::core::bit_utils::{encode_bit, mask_of};
use crate::plc_common_rs::register::core::codec::encode_scalar;
use crate::plc_common_rs::register::core::exceptions::{ByteRegion, IntentError, RegisterResult};
use crate::plc_common_rs::register::core::field_schema::{names, FieldKind, FieldSchema};
use std::collections::BTreeMap;
use std::fmt;

/// 書き込み要求の値（型付き、範囲検証前）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl WriteValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            WriteValue::Integer(_) => "integer",
            WriteValue::Float(_) => "float",
            WriteValue::Bool(_) => "bool",
        }
    }
}

impl From<bool> for WriteValue {
    fn from(v: bool) -> Self {
        WriteValue::Bool(v)
    }
}

impl From<u16> for WriteValue {
    fn from(v: u16) -> Self {
        WriteValue::Integer(v as i64)
    }
}

impl From<i64> for WriteValue {
    fn from(v: i64) -> Self {
        WriteValue::Integer(v)
    }
}

impl From<f32> for WriteValue {
    fn from(v: f32) -> Self {
        WriteValue::Float(v as f64)
    }
}

impl From<f64> for WriteValue {
    fn from(v: f64) -> Self {
        WriteValue::Float(v)
    }
}

/// 1回の呼び出しで書き込むフィールドと目標値
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteIntent {
    entries: Vec<(String, WriteValue)>,
}

impl WriteIntent {
    pub fn new() -> Self {
        Self::default()
    }

    /// ビルダー形式でフィールドを追加
    pub fn with<V: Into<WriteValue>>(mut self, name: &str, value: V) -> Self {
        self.set(name, value);
        self
    }

    /// フィールドを設定（同名があれば置き換え）
    pub fn set<V: Into<WriteValue>>(&mut self, name: &str, value: V) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<WriteValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, WriteValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn field_names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 全フィールドが許可リストに含まれることを確認
    pub fn ensure_within(&self, allowed: &[&str], operation: &'static str) -> Result<(), IntentError> {
        match self.entries.iter().find(|(n, _)| !allowed.contains(&n.as_str())) {
            Some((name, _)) => Err(IntentError::OutsideGroup {
                field: name.clone(),
                operation,
            }),
            None => Ok(()),
        }
    }
}

/// PID 制御モード（排他的に1つだけ有効）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidMode {
    Auto,
    Classic,
    Servo,
}

impl PidMode {
    /// 3つのフラグからモードを決定する
    ///
    /// 有効なフラグがちょうど1つでなければエラー。
    pub fn from_flags(pid_auto: bool, pid_clasico: bool, pid_servosis: bool) -> Result<Self, IntentError> {
        match (pid_auto, pid_clasico, pid_servosis) {
            (true, false, false) => Ok(PidMode::Auto),
            (false, true, false) => Ok(PidMode::Classic),
            (false, false, true) => Ok(PidMode::Servo),
            flags => {
                let active = names::PID_MODE_FIELDS
                    .iter()
                    .zip([flags.0, flags.1, flags.2])
                    .filter(|(_, on)| *on)
                    .map(|(name, _)| name.to_string())
                    .collect();
                Err(IntentError::PidModeNotExclusive { active })
            }
        }
    }

    /// (pid_auto, pid_clasico, pid_servosis)
    pub fn flags(&self) -> (bool, bool, bool) {
        match self {
            PidMode::Auto => (true, false, false),
            PidMode::Classic => (false, true, false),
            PidMode::Servo => (false, false, true),
        }
    }

    /// 3フラグすべてを明示的に設定する書き込み意図
    pub fn to_intent(&self) -> WriteIntent {
        let (auto, classic, servo) = self.flags();
        WriteIntent::new()
            .with(names::PID_AUTO, auto)
            .with(names::PID_CLASSIC, classic)
            .with(names::PID_SERVO, servo)
    }
}

impl fmt::Display for PidMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (auto, classic, servo) = self.flags();
        write!(
            f,
            "PID_auto={}, PID_clasico={}, PID_servosis={}",
            auto, classic, servo
        )
    }
}

/// エンコード済みのスカラー書き込み
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarWrite {
    pub field: String,
    pub region: ByteRegion,
    pub bytes: Vec<u8>,
}

/// 1ビットの書き込み
#[derive(Debug, Clone, PartialEq)]
pub struct BitWrite {
    pub field: String,
    pub bit_index: u8,
    pub value: bool,
}

/// 同じバイトに属するビット書き込みのグループ
#[derive(Debug, Clone, PartialEq)]
pub struct BitGroup {
    pub region: ByteRegion,
    pub bits: Vec<BitWrite>,
}

impl BitGroup {
    /// このグループが書き換えるビットのマスク
    pub fn mask(&self) -> u8 {
        mask_of(self.bits.iter().map(|b| b.bit_index))
    }

    /// 現在値に各ビットを1つずつ畳み込む
    pub fn apply(&self, current: u8) -> u8 {
        self.bits
            .iter()
            .fold(current, |byte, bit| encode_bit(byte, bit.bit_index, bit.value))
    }

    pub fn fields(&self) -> Vec<String> {
        self.bits.iter().map(|b| b.field.clone()).collect()
    }
}

/// バイト領域単位に解決済みの書き込み意図
///
/// 解決はすべてのフィールドについて転送前に完了する。
/// 1つでも失敗すれば何も書き込まない。
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIntent {
    pub scalars: Vec<ScalarWrite>,
    pub bit_groups: Vec<BitGroup>,
}

impl ResolvedIntent {
    pub fn resolve(schema: &FieldSchema, intent: &WriteIntent) -> RegisterResult<Self> {
        if intent.is_empty() {
            return Err(IntentError::EmptyIntent.into());
        }

        let block_id = schema.block_id();
        let mut scalars = Vec::new();
        let mut groups: BTreeMap<usize, Vec<BitWrite>> = BTreeMap::new();

        for (name, value) in intent.iter() {
            let field = schema.schema(name)?;
            match (field.kind, value) {
                (FieldKind::Bit, WriteValue::Bool(v)) => {
                    let bit_index = field.bit_index.ok_or_else(|| IntentError::KindMismatch {
                        field: name.to_string(),
                        expected: FieldKind::Bit,
                        actual: value.type_name(),
                    })?;
                    groups.entry(field.byte_offset).or_default().push(BitWrite {
                        field: name.to_string(),
                        bit_index,
                        value: v,
                    });
                }
                (FieldKind::Bit, other) => {
                    return Err(IntentError::KindMismatch {
                        field: name.to_string(),
                        expected: FieldKind::Bit,
                        actual: other.type_name(),
                    }
                    .into());
                }
                (_, value) => {
                    let bytes = encode_scalar(field, value)?;
                    scalars.push(ScalarWrite {
                        field: name.to_string(),
                        region: field.region(block_id),
                        bytes,
                    });
                }
            }
        }

        let bit_groups = groups
            .into_iter()
            .map(|(offset, bits)| BitGroup {
                region: ByteRegion::new(block_id, offset, 1),
                bits,
            })
            .collect();

        Ok(Self { scalars, bit_groups })
    }
}

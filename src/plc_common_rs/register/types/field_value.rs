use crate::plc_common_rs::register::core::field_schema::FieldKind;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// デコード済みのフィールド値
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    UInt(u16),
    Float(f32),
    Bool(bool),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::UInt(_) => FieldKind::UInt16BE,
            FieldValue::Float(_) => FieldKind::Float32BE,
            FieldValue::Bool(_) => FieldKind::Bit,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            FieldValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::UInt(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// フィールド名 → 値 の対応（スキーマ定義順）
///
/// 1回の読み出しから生成され、呼び出し元に渡されるだけで保持はしない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValueSet {
    entries: Vec<(String, FieldValue)>,
}

impl FieldValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: &str, value: FieldValue) {
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    pub fn get_u16(&self, name: &str) -> Option<u16> {
        self.get(name).and_then(|v| v.as_u16())
    }

    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(|v| v.as_f32())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// フラットな JSON オブジェクトに変換
    ///
    /// 浮動小数点は `Serialize` と同じ f32 の最短表現で出力する。
    pub fn to_json_map(&self) -> serde_json::Map<String, serde_json::Value> {
        self.entries
            .iter()
            .map(|(name, value)| {
                let json = match value {
                    FieldValue::UInt(v) => serde_json::Value::from(*v),
                    FieldValue::Float(v) => float_to_json(*v),
                    FieldValue::Bool(v) => serde_json::Value::from(*v),
                };
                (name.clone(), json)
            })
            .collect()
    }
}

/// f32 を最短の10進表現を保ったまま JSON 数値にする（非有限値は null）
fn float_to_json(value: f32) -> serde_json::Value {
    value
        .to_string()
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl Serialize for FieldValueSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

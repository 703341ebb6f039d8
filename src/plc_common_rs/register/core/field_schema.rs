use crate::plc_common_rs::register::core::exceptions::{ByteRegion, IntentError, SchemaError};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// JSON仕様からフィールド定義を構築（コンパイル時埋め込み）
pub static DB7_SCHEMA: Lazy<FieldSchema> = Lazy::new(|| {
    let json = include_str!("../format_spec/db7_fields.json");
    JsonFieldSpecLoader::load_from_json(json).expect("db7_fields.json parse")
});

/// DB7 のフィールドスキーマを取得
pub fn db7_schema() -> &'static FieldSchema {
    &DB7_SCHEMA
}

/// DB7 のフィールド名
pub mod names {
    pub const SETPOINT: &str = "setpoint";
    pub const TEMPERATURE: &str = "temperatura";
    pub const START: &str = "b_start";
    pub const STOP: &str = "b_stop";
    pub const EMERGENCY_STOP: &str = "b_paroE";
    pub const CONFIRM: &str = "b_confirma";
    pub const HIGH_TEMP_ALARM: &str = "alarma_teh";
    pub const LOW_TEMP_ALARM: &str = "alarma_tel";
    pub const SENSOR_ALARM: &str = "alarma_sensor";
    pub const ACTUATOR_ALARM: &str = "alarma_actuador";
    pub const PID_AUTO: &str = "pid_auto";
    pub const PID_CLASSIC: &str = "pid_clasico";
    pub const PID_SERVO: &str = "pid_servosis";
    pub const SERVO_STATUS: &str = "estado_servo";
    pub const DRIVE_STATUS: &str = "estado_variador";

    /// 制御ボタン (バイト6 bit0-2)
    pub const BUTTON_FIELDS: [&str; 3] = [START, STOP, EMERGENCY_STOP];
    /// PID モード (バイト7 bit0-2)
    pub const PID_MODE_FIELDS: [&str; 3] = [PID_AUTO, PID_CLASSIC, PID_SERVO];
}

/// フィールドのワイヤ型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    /// 符号なし16ビット整数（ビッグエンディアン）
    #[serde(rename = "uint16_be")]
    UInt16BE,
    /// IEEE-754 binary32（ビッグエンディアン）
    #[serde(rename = "float32_be")]
    Float32BE,
    /// バイト内の1ビット
    #[serde(rename = "bit")]
    Bit,
}

impl FieldKind {
    /// 占有バイト数
    pub fn width(&self) -> usize {
        match self {
            FieldKind::UInt16BE => 2,
            FieldKind::Float32BE => 4,
            FieldKind::Bit => 1,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldKind::Bit)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::UInt16BE => write!(f, "UInt16BE"),
            FieldKind::Float32BE => write!(f, "Float32BE"),
            FieldKind::Bit => write!(f, "Bit"),
        }
    }
}

/// 名前付きフィールドの位置と型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub byte_offset: usize,
    pub bit_index: Option<u8>,
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn scalar(name: &str, kind: FieldKind, byte_offset: usize) -> Self {
        Self {
            name: name.to_string(),
            kind,
            byte_offset,
            bit_index: None,
            description: None,
        }
    }

    pub fn bit(name: &str, byte_offset: usize, bit_index: u8) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldKind::Bit,
            byte_offset,
            bit_index: Some(bit_index),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// このフィールドの終了位置を計算（排他的）
    pub fn end(&self) -> usize {
        self.byte_offset + self.kind.width()
    }

    /// このフィールドが占有するバイト領域
    pub fn region(&self, block_id: u16) -> ByteRegion {
        ByteRegion::new(block_id, self.byte_offset, self.kind.width())
    }

    fn overlaps(&self, other: &FieldDescriptor) -> bool {
        self.byte_offset < other.end() && other.byte_offset < self.end()
    }
}

/// データブロックのフィールドスキーマ
///
/// 生成時に以下を検証する:
/// - フィールド名は一意
/// - ビットフィールドの (byte_offset, bit_index) は一意
/// - スカラー領域同士、およびスカラー領域とビットを含むバイトは重ならない
#[derive(Debug, Clone)]
pub struct FieldSchema {
    block_id: u16,
    fields: Vec<FieldDescriptor>,
    index: HashMap<String, usize>,
    extent: usize,
}

impl FieldSchema {
    pub fn new(block_id: u16, fields: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut index = HashMap::new();
        let mut bit_positions: HashMap<(usize, u8), &str> = HashMap::new();

        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateName(field.name.clone()));
            }

            match (field.kind, field.bit_index) {
                (FieldKind::Bit, Some(bit)) if bit < 8 => {
                    if let Some(first) = bit_positions.insert((field.byte_offset, bit), &field.name) {
                        return Err(SchemaError::DuplicateBit {
                            first: first.to_string(),
                            second: field.name.clone(),
                            byte_offset: field.byte_offset,
                            bit_index: bit,
                        });
                    }
                }
                (FieldKind::Bit, bit_index) | (_, bit_index @ Some(_)) => {
                    return Err(SchemaError::InvalidBitIndex {
                        field: field.name.clone(),
                        bit_index,
                    });
                }
                _ => {}
            }
        }

        // スカラー領域は他のどのフィールドとも重ならない
        for (i, a) in fields.iter().enumerate() {
            if !a.kind.is_scalar() {
                continue;
            }
            for (j, b) in fields.iter().enumerate() {
                if i != j && a.overlaps(b) && (j > i || !b.kind.is_scalar()) {
                    return Err(SchemaError::Overlap {
                        first: a.name.clone(),
                        second: b.name.clone(),
                    });
                }
            }
        }

        let extent = fields.iter().map(FieldDescriptor::end).max().unwrap_or(0);

        Ok(Self {
            block_id,
            fields,
            index,
            extent,
        })
    }

    /// 名前からフィールドを検索
    pub fn schema(&self, name: &str) -> Result<&FieldDescriptor, IntentError> {
        self.lookup(name)
            .ok_or_else(|| IntentError::UnknownField(name.to_string()))
    }

    pub fn lookup(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    pub fn block_id(&self) -> u16 {
        self.block_id
    }

    /// 全フィールド（定義順）
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// デコードに必要な最小バイト数
    pub fn required_len(&self) -> usize {
        self.extent
    }

    /// 指定バイトに同居するビットフィールド
    pub fn bits_in_byte(&self, byte_offset: usize) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(move |f| f.kind == FieldKind::Bit && f.byte_offset == byte_offset)
    }
}

#[derive(Debug, Deserialize)]
struct BlockSpec {
    block_id: u16,
    fields: Vec<FieldSpecEntry>,
}

#[derive(Debug, Deserialize)]
struct FieldSpecEntry {
    name: String,
    #[serde(rename = "type")]
    kind: FieldKind,
    offset: usize,
    #[serde(default)]
    bit: Option<u8>,
    #[serde(default)]
    description: Option<String>,
}

/// JSON 形式のフィールド仕様ローダー
pub struct JsonFieldSpecLoader;

impl JsonFieldSpecLoader {
    /// JSON文字列からスキーマを読み込み、不変条件を検証する
    pub fn load_from_json(json_str: &str) -> Result<FieldSchema, SchemaError> {
        let spec: BlockSpec = serde_json::from_str(json_str)
            .map_err(|e| SchemaError::Parse(format!("JSON解析エラー: {}", e)))?;

        let fields = spec
            .fields
            .into_iter()
            .map(|entry| FieldDescriptor {
                name: entry.name,
                kind: entry.kind,
                byte_offset: entry.offset,
                bit_index: entry.bit,
                description: entry.description,
            })
            .collect();

        FieldSchema::new(spec.block_id, fields)
    }
}

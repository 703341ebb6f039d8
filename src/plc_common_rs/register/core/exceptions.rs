/// PLC レジスタ処理用エラー型定義
/// 各エラーは影響を受けたフィールド名またはバイト領域を保持する

use std::error::Error;
use std::fmt;

use crate::plc_common_rs::register::core::field_schema::FieldKind;
use crate::plc_common_rs::register::types::verification::RegionMismatch;

/// データブロック内のバイト領域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteRegion {
    pub block_id: u16,
    pub offset: usize,
    pub length: usize,
}

impl ByteRegion {
    pub fn new(block_id: u16, offset: usize, length: usize) -> Self {
        Self { block_id, offset, length }
    }

    /// 終端オフセット（排他的）
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

impl fmt::Display for ByteRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length == 1 {
            write!(f, "DB{}.DBB{}", self.block_id, self.offset)
        } else {
            write!(f, "DB{}.DBB{}..{}", self.block_id, self.offset, self.end())
        }
    }
}

/// スナップショットのデコードエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// データが短すぎる
    InsufficientData { required: usize, actual: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InsufficientData { required, actual } => {
                write!(f, "データが不足しています: 必要 {}バイト, 実際 {}バイト", required, actual)
            }
        }
    }
}

impl Error for DecodeError {}

/// スカラー値が表現可能な範囲外
#[derive(Debug, Clone, PartialEq)]
pub enum RangeError {
    /// UInt16 の範囲 (0-65535) 外
    UInt16OutOfRange { field: String, value: i64 },
    /// Float32 で表現できない値 (非有限値・範囲外)
    Float32OutOfRange { field: String, value: f64 },
}

impl RangeError {
    pub fn field(&self) -> &str {
        match self {
            RangeError::UInt16OutOfRange { field, .. } | RangeError::Float32OutOfRange { field, .. } => field,
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::UInt16OutOfRange { field, value } => {
                write!(f, "フィールド '{}' の値が範囲外: {} (範囲: 0-65535)", field, value)
            }
            RangeError::Float32OutOfRange { field, value } => {
                write!(f, "フィールド '{}' の値は Float32 で表現できません: {}", field, value)
            }
        }
    }
}

impl Error for RangeError {}

/// 書き込み意図の不正
#[derive(Debug, Clone, PartialEq)]
pub enum IntentError {
    /// 書き込み対象が空
    EmptyIntent,
    /// 不明なフィールド
    UnknownField(String),
    /// フィールド型と値の型が一致しない
    KindMismatch { field: String, expected: FieldKind, actual: &'static str },
    /// 操作の対象グループ外のフィールド
    OutsideGroup { field: String, operation: &'static str },
    /// PID モードは常に1つだけ有効でなければならない
    PidModeNotExclusive { active: Vec<String> },
}

impl fmt::Display for IntentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentError::EmptyIntent => write!(f, "書き込み対象のフィールドがありません"),
            IntentError::UnknownField(field) => write!(f, "不明なフィールド: {}", field),
            IntentError::KindMismatch { field, expected, actual } => {
                write!(f, "フィールド '{}' の型不一致: 期待 {}, 実際 {}", field, expected, actual)
            }
            IntentError::OutsideGroup { field, operation } => {
                write!(f, "フィールド '{}' は操作 '{}' の対象外です", field, operation)
            }
            IntentError::PidModeNotExclusive { active } => {
                write!(f, "PID モードは1つだけ有効にできます (有効: [{}])", active.join(", "))
            }
        }
    }
}

impl Error for IntentError {}

/// フィールドスキーマ定義のエラー
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// JSON 仕様の解析失敗
    Parse(String),
    /// フィールド名の重複
    DuplicateName(String),
    /// 同じビット位置に複数のフィールド
    DuplicateBit { first: String, second: String, byte_offset: usize, bit_index: u8 },
    /// スカラー領域の重なり
    Overlap { first: String, second: String },
    /// ビット番号が 0-7 の範囲外、または指定の有無が型と矛盾
    InvalidBitIndex { field: String, bit_index: Option<u8> },
    /// フィールドが1つもない
    Empty,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Parse(msg) => write!(f, "フィールド仕様の解析エラー: {}", msg),
            SchemaError::DuplicateName(name) => write!(f, "フィールド名が重複しています: {}", name),
            SchemaError::DuplicateBit { first, second, byte_offset, bit_index } => write!(
                f,
                "ビット位置 {}.{} が '{}' と '{}' で重複しています",
                byte_offset, bit_index, first, second
            ),
            SchemaError::Overlap { first, second } => {
                write!(f, "フィールド '{}' と '{}' のバイト領域が重なっています", first, second)
            }
            SchemaError::InvalidBitIndex { field, bit_index } => {
                write!(f, "フィールド '{}' のビット指定が不正です: {:?}", field, bit_index)
            }
            SchemaError::Empty => write!(f, "フィールドが定義されていません"),
        }
    }
}

impl Error for SchemaError {}

/// PLC との接続確立失敗
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// 接続先に到達できない
    Unreachable { address: String, rack: u16, slot: u16, message: String },
    /// 接続処理は成功したがセッションが有効でない
    NotConnected { address: String },
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Unreachable { address, rack, slot, message } => write!(
                f,
                "PLC に接続できません ({} rack={} slot={}): {}",
                address, rack, slot, message
            ),
            ConnectionError::NotConnected { address } => {
                write!(f, "PLC との接続が確立されていません: {}", address)
            }
        }
    }
}

impl Error for ConnectionError {}

/// 転送層の1往復の失敗
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// タイムアウト
    Timeout,
    /// セッションが切断済み
    NotConnected,
    /// 存在しないデータブロック
    BlockNotFound(u16),
    /// ブロック範囲外へのアクセス
    OutOfBounds { block_id: u16, offset: usize, length: usize },
    /// 要求より短い応答
    ShortRead { requested: usize, received: usize },
    /// その他の通信エラー
    Comm { message: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "タイムアウト"),
            TransportError::NotConnected => write!(f, "接続されていません"),
            TransportError::BlockNotFound(block_id) => write!(f, "データブロック DB{} が存在しません", block_id),
            TransportError::OutOfBounds { block_id, offset, length } => write!(
                f,
                "DB{} の範囲外アクセス: offset={}, length={}",
                block_id, offset, length
            ),
            TransportError::ShortRead { requested, received } => {
                write!(f, "応答が短すぎます: 要求 {}バイト, 受信 {}バイト", requested, received)
            }
            TransportError::Comm { message } => write!(f, "通信エラー: {}", message),
        }
    }
}

impl Error for TransportError {}

/// 転送エラーが発生した処理段階
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStage {
    /// ブロック全体の読み出し
    BlockRead,
    /// 共有バイトの事前読み出し
    PreRead,
    /// 書き込み
    Write,
    /// 書き込み後の検証読み出し
    VerifyRead,
}

impl fmt::Display for TransportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportStage::BlockRead => "ブロック読み出し",
            TransportStage::PreRead => "事前読み出し",
            TransportStage::Write => "書き込み",
            TransportStage::VerifyRead => "検証読み出し",
        };
        f.write_str(s)
    }
}

/// 操作途中の転送失敗
///
/// `unverified` に含まれる領域は書き込み済みだが結果が不明な状態。
/// 成功として扱ってはならない。
#[derive(Debug, Clone, PartialEq)]
pub struct TransportFailure {
    pub stage: TransportStage,
    pub region: ByteRegion,
    pub fields: Vec<String>,
    pub source: TransportError,
    /// 書き込み・検証とも一致が確認できた領域
    pub confirmed: Vec<ByteRegion>,
    /// 書き込み後に不一致が観測された領域
    pub mismatches: Vec<RegionMismatch>,
    /// 書き込みを発行したが状態が確認できていない領域
    pub unverified: Vec<ByteRegion>,
}

impl TransportFailure {
    /// 書き込みを一切発行していない失敗
    pub fn before_write(stage: TransportStage, region: ByteRegion, fields: Vec<String>, source: TransportError) -> Self {
        Self {
            stage,
            region,
            fields,
            source,
            confirmed: Vec::new(),
            mismatches: Vec::new(),
            unverified: Vec::new(),
        }
    }

    /// 状態不明の書き込みが残っているか
    pub fn has_unknown_writes(&self) -> bool {
        !self.unverified.is_empty()
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}中の転送エラー ({}", self.stage, self.region)?;
        if !self.fields.is_empty() {
            write!(f, " [{}]", self.fields.join(", "))?;
        }
        write!(f, "): {}", self.source)?;
        if !self.unverified.is_empty() {
            let regions: Vec<String> = self.unverified.iter().map(|r| r.to_string()).collect();
            write!(f, "; 状態不明の書き込み: {}", regions.join(", "))?;
        }
        Ok(())
    }
}

impl Error for TransportFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// レジスタ操作の統合エラー型
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterError {
    /// 接続エラー（何も読み書きしていない）
    Connection(ConnectionError),
    /// 転送エラー
    Transport(TransportFailure),
    /// デコードエラー
    Decode(DecodeError),
    /// 範囲エラー（転送前に中止）
    Range(RangeError),
    /// 書き込み意図の不正（転送前に中止）
    Intent(IntentError),
    /// 検証不一致
    VerificationMismatch(Vec<RegionMismatch>),
    /// 非同期ディスパッチの失敗
    Dispatch(String),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterError::Connection(err) => write!(f, "接続エラー: {}", err),
            RegisterError::Transport(err) => write!(f, "転送エラー: {}", err),
            RegisterError::Decode(err) => write!(f, "デコードエラー: {}", err),
            RegisterError::Range(err) => write!(f, "範囲エラー: {}", err),
            RegisterError::Intent(err) => write!(f, "書き込み指定エラー: {}", err),
            RegisterError::VerificationMismatch(mismatches) => {
                let parts: Vec<String> = mismatches.iter().map(|m| m.to_string()).collect();
                write!(f, "検証エラー: {}", parts.join("; "))
            }
            RegisterError::Dispatch(msg) => write!(f, "ディスパッチエラー: {}", msg),
        }
    }
}

impl Error for RegisterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RegisterError::Connection(err) => Some(err),
            RegisterError::Transport(err) => Some(err),
            RegisterError::Decode(err) => Some(err),
            RegisterError::Range(err) => Some(err),
            RegisterError::Intent(err) => Some(err),
            _ => None,
        }
    }
}

// From実装で自動変換をサポート
impl From<ConnectionError> for RegisterError {
    fn from(err: ConnectionError) -> Self {
        RegisterError::Connection(err)
    }
}

impl From<TransportFailure> for RegisterError {
    fn from(err: TransportFailure) -> Self {
        RegisterError::Transport(err)
    }
}

impl From<DecodeError> for RegisterError {
    fn from(err: DecodeError) -> Self {
        RegisterError::Decode(err)
    }
}

impl From<RangeError> for RegisterError {
    fn from(err: RangeError) -> Self {
        RegisterError::Range(err)
    }
}

impl From<IntentError> for RegisterError {
    fn from(err: IntentError) -> Self {
        RegisterError::Intent(err)
    }
}

/// Result型のエイリアス
pub type RegisterResult<T> = Result<T, RegisterError>;

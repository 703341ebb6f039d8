use crate::plc_common_rs::clients::register_client::RegisterClientConfig;
use crate::plc_common_rs::clients::transport::ConnectionParams;
use crate::plc_common_rs::register::core::field_schema::db7_schema;
use crate::plc_common_rs::utils::log_config::LogLevel;
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// S7 のスロット番号の上限
const MAX_SLOT: u16 = 31;

/// 使用する転送の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// メモリ上の模擬 PLC
    Simulated,
    /// ファイルに保存したブロックイメージ
    ImageFile,
}

impl TransportKind {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "simulated" => Ok(TransportKind::Simulated),
            "image_file" => Ok(TransportKind::ImageFile),
            _ => Err(format!("Invalid transport: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub address: String,
    pub rack: u16,
    pub slot: u16,
    pub transport: TransportKind,
    pub image_path: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        let params = ConnectionParams::default();
        Self {
            address: params.address,
            rack: params.rack,
            slot: params.slot,
            transport: TransportKind::ImageFile,
            image_path: "plc_db7.bin".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    pub read_length: usize,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self { read_length: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteConfig {
    pub verify_scalar_writes: bool,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self { verify_scalar_writes: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".into(), file: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 初期ブロック内容（16進文字列）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlcConfig {
    pub connection: ConnectionConfig,
    pub block: BlockConfig,
    pub write: WriteConfig,
    pub logging: LogConfig,
    pub simulation: SimulationConfig,
}

impl PlcConfig {
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams::new(&self.connection.address, self.connection.rack, self.connection.slot)
    }

    pub fn to_client_config(&self) -> RegisterClientConfig {
        RegisterClientConfig {
            connection: self.connection_params(),
            read_length: self.block.read_length,
            verify_scalar_writes: self.write.verify_scalar_writes,
        }
    }

    /// 初期ブロック内容をバイト列に変換
    pub fn initial_image(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        match &self.simulation.initial_image {
            None => Ok(None),
            Some(text) => {
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                hex::decode(&compact)
                    .map(Some)
                    .map_err(|e| ConfigError::Validation(format!("Invalid initial image hex: {}", e)))
            }
        }
    }
}

/// 設定の読み込み・検証エラー
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// ファイルの読み書き失敗
    Io { path: PathBuf, message: String },
    /// JSON / TOML の解析失敗
    Parse { path: PathBuf, message: String },
    /// 未対応の拡張子
    UnsupportedFormat(PathBuf),
    /// 環境変数の値が不正
    Env { key: String, value: String },
    /// 値の検証失敗
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, message } => write!(f, "設定ファイル {:?} の入出力エラー: {}", path, message),
            ConfigError::Parse { path, message } => write!(f, "設定ファイル {:?} の解析エラー: {}", path, message),
            ConfigError::UnsupportedFormat(path) => write!(f, "未対応の設定ファイル形式: {:?}", path),
            ConfigError::Env { key, value } => write!(f, "環境変数 {} の値が不正です: {}", key, value),
            ConfigError::Validation(msg) => write!(f, "設定値エラー: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
    load_dotenv: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::with_paths(vec![
            PathBuf::from("plc.config.toml"),
            PathBuf::from("plc.config.json"),
            PathBuf::from("config.toml"),
            PathBuf::from("config.json"),
        ])
    }

    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: "PLC_".into(),
            load_dotenv: true,
        }
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// `.env` を読み込まない（テスト用）
    pub fn without_dotenv(mut self) -> Self {
        self.load_dotenv = false;
        self
    }

    /// 最初に見つかった設定ファイル → 環境変数 → 検証 の順で設定を構築
    pub fn load(&self) -> Result<PlcConfig, ConfigError> {
        let base = match self.config_paths.iter().find(|p| p.exists()) {
            Some(path) => {
                debug!("設定ファイルを読み込みます: {:?}", path);
                self.load_from_file(path)?
            }
            None => PlcConfig::default(),
        };
        self.finish(base)
    }

    /// 指定したファイルを必須として読み込む
    pub fn load_file(&self, path: &Path) -> Result<PlcConfig, ConfigError> {
        let base = self.load_from_file(path)?;
        self.finish(base)
    }

    fn finish(&self, config: PlcConfig) -> Result<PlcConfig, ConfigError> {
        if self.load_dotenv {
            if let Err(e) = dotenvy::dotenv() {
                if !e.not_found() {
                    return Err(ConfigError::Parse {
                        path: PathBuf::from(".env"),
                        message: e.to_string(),
                    });
                }
            }
        }
        let config = self.apply_env_overrides(config)?;
        self.validate_config(&config)?;
        Ok(config)
    }

    pub fn load_from_file(&self, path: &Path) -> Result<PlcConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let parse_err = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
            Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string())),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    fn env_var(&self, key: &str) -> Option<(String, String)> {
        let full = format!("{}{}", self.env_prefix, key);
        env::var(&full).ok().map(|v| (full, v))
    }

    fn parse_env<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.env_var(key) {
            None => Ok(None),
            Some((key, value)) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Env { key, value }),
        }
    }

    fn apply_env_overrides(&self, mut config: PlcConfig) -> Result<PlcConfig, ConfigError> {
        if let Some((_, address)) = self.env_var("ADDRESS") {
            config.connection.address = address;
        }
        if let Some(rack) = self.parse_env("RACK")? {
            config.connection.rack = rack;
        }
        if let Some(slot) = self.parse_env("SLOT")? {
            config.connection.slot = slot;
        }
        if let Some((key, value)) = self.env_var("TRANSPORT") {
            config.connection.transport =
                TransportKind::from_str(&value).map_err(|_| ConfigError::Env { key, value })?;
        }
        if let Some((_, path)) = self.env_var("IMAGE_PATH") {
            config.connection.image_path = path;
        }
        if let Some(read_length) = self.parse_env("READ_LENGTH")? {
            config.block.read_length = read_length;
        }
        if let Some(verify) = self.parse_env("VERIFY_SCALAR_WRITES")? {
            config.write.verify_scalar_writes = verify;
        }
        if let Some((_, level)) = self.env_var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some((_, file)) = self.env_var("LOG_FILE") {
            config.logging.file = Some(file);
        }
        if let Some((_, image)) = self.env_var("INITIAL_IMAGE") {
            config.simulation.initial_image = Some(image);
        }
        Ok(config)
    }

    fn validate_config(&self, config: &PlcConfig) -> Result<(), ConfigError> {
        if config.connection.address.trim().is_empty() {
            return Err(ConfigError::Validation("PLC address cannot be empty".into()));
        }
        if config.connection.slot > MAX_SLOT {
            return Err(ConfigError::Validation(format!(
                "Slot must be between 0 and {}",
                MAX_SLOT
            )));
        }
        let extent = db7_schema().required_len();
        if config.block.read_length < extent {
            return Err(ConfigError::Validation(format!(
                "Read length {} is shorter than the field layout ({} bytes)",
                config.block.read_length, extent
            )));
        }
        if config.connection.transport == TransportKind::ImageFile && config.connection.image_path.trim().is_empty() {
            return Err(ConfigError::Validation("Image path cannot be empty for image_file transport".into()));
        }
        LogLevel::from_str(&config.logging.level).map_err(ConfigError::Validation)?;
        config.initial_image()?;
        Ok(())
    }

    pub fn save_config(&self, config: &PlcConfig, path: &Path) -> Result<(), ConfigError> {
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(config).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            Some("toml") => toml::to_string_pretty(config).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let config = PlcConfig::default();
        assert_eq!(config.connection_params(), ConnectionParams::new("192.168.4.10", 0, 1));
        assert_eq!(config.block.read_length, 8);
        assert!(config.write.verify_scalar_writes);
        assert_eq!(config.initial_image().unwrap(), None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PlcConfig = toml::from_str("[connection]\nslot = 2\n").unwrap();
        assert_eq!(config.connection.slot, 2);
        assert_eq!(config.connection.address, "192.168.4.10");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_initial_image_hex() {
        let mut config = PlcConfig::default();
        config.simulation.initial_image = Some("0064 4248 0000 0503".into());
        assert_eq!(
            config.initial_image().unwrap(),
            Some(vec![0x00, 0x64, 0x42, 0x48, 0x00, 0x00, 0x05, 0x03])
        );
        config.simulation.initial_image = Some("zz".into());
        assert!(matches!(config.initial_image(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_transport_kind_from_str() {
        assert_eq!(TransportKind::from_str("Simulated").unwrap(), TransportKind::Simulated);
        assert_eq!(TransportKind::from_str("image_file").unwrap(), TransportKind::ImageFile);
        assert!(TransportKind::from_str("s7").is_err());
    }
}

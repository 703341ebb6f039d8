/// 共通ユーティリティ

pub mod cli;
pub mod config_loader;
pub mod log_config;
pub mod report;

// 便利な再エクスポート
pub use config_loader::{ConfigError, ConfigLoader, PlcConfig, TransportKind};
pub use log_config::{init_logging, LogLevel};
pub use report::{parse_flag, read_report, OperationReport, Outcome};

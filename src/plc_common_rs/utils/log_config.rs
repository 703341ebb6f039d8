//! ログ設定
//!
//! 標準出力は JSON 結果専用のため、ログは標準エラー（またはファイル）に出す。

use chrono::{DateTime, Local};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

/// 1行分のログを整形
///
/// 形式: `[2025-01-01 12:00:00.000] [INFO] [target] message`
pub fn format_line(timestamp: DateTime<Local>, level: log::Level, target: &str, message: &str) -> String {
    format!(
        "[{}] [{}] [{}] {}",
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        level,
        target,
        message
    )
}

/// ロガーを初期化する
///
/// Args:
///     level: 出力する最低レベル（`RUST_LOG` が設定されていればそちらを優先）
///     file: 出力先ファイル（`None` なら標準エラー）
///
/// Returns:
///     既に初期化済み、またはファイルが開けない場合はエラー
pub fn init_logging(level: LogLevel, file: Option<&Path>) -> Result<(), String> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level.to_level_filter());
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{}",
            format_line(Local::now(), record.level(), record.target(), &record.args().to_string())
        )
    });

    match file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| format!("Failed to create log directory: {}", e))?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file: {}", e))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None => {
            builder.target(env_logger::Target::Stderr);
        }
    }

    builder.try_init().map_err(|e| format!("Failed to initialize logger: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("warn").unwrap().as_str(), "WARN");
        assert!(LogLevel::from_str("verbose").is_err());
        assert!(LogLevel::Trace < LogLevel::Error);
        assert_eq!(LogLevel::Info.to_level_filter(), LevelFilter::Info);
    }

    #[test]
    fn test_format_line() {
        let ts = Local.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(
            format_line(ts, log::Level::Warn, "plc_rust::clients", "書き込み検証の不一致"),
            "[2025-03-01 08:30:00.000] [WARN] [plc_rust::clients] 書き込み検証の不一致"
        );
    }
}

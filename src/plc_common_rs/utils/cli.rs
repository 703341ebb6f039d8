//! CLI バイナリ共通処理
//!
//! 各バイナリは標準出力に JSON オブジェクトを1つだけ出力する。
//! 引数エラーの場合も JSON を出力し、終了コード 1 で終了する。

use crate::plc_common_rs::clients::register_client::RegisterClient;
use crate::plc_common_rs::clients::utils::configured::ConfiguredConnector;
use crate::plc_common_rs::register::core::field_schema::db7_schema;
use crate::plc_common_rs::utils::config_loader::{ConfigError, ConfigLoader, PlcConfig};
use crate::plc_common_rs::utils::log_config::{init_logging, LogLevel};
use crate::plc_common_rs::utils::report::OperationReport;
use clap::error::ErrorKind;
use clap::{Args, Parser};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;

/// 全バイナリ共通のオプション
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// 設定ファイル (TOML / JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// デバッグログを有効化
    #[arg(short, long)]
    pub debug: bool,
}

impl CommonArgs {
    /// 設定を読み込む（`--config` 指定時はそのファイルが必須）
    pub fn load_config(&self) -> Result<PlcConfig, ConfigError> {
        let loader = ConfigLoader::new();
        match &self.config {
            Some(path) => loader.load_file(path),
            None => loader.load(),
        }
    }
}

/// 引数を解析する。失敗時は JSON エラーを出力して終了コード 1 で終了
///
/// `--help` / `--version` は clap の通常の出力を使う。
pub fn parse_args_or_exit<T: Parser>() -> T {
    match T::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => exit_invalid_arguments(&e.to_string()),
        },
    }
}

pub fn exit_invalid_arguments(message: &str) -> ! {
    let first_line = message.lines().next().unwrap_or(message).trim();
    println!("{}", OperationReport::invalid_arguments(first_line).to_json());
    process::exit(1);
}

/// 設定に従ってロガーとクライアントを準備する
pub fn prepare(args: &CommonArgs) -> Result<(PlcConfig, RegisterClient<ConfiguredConnector>), ConfigError> {
    let config = args.load_config()?;
    let level = if args.debug {
        LogLevel::Debug
    } else {
        LogLevel::from_str(&config.logging.level).map_err(ConfigError::Validation)?
    };
    if let Err(e) = init_logging(level, config.logging.file.as_deref().map(Path::new)) {
        eprintln!("Warning: {}", e);
    }
    let connector = ConfiguredConnector::from_config(&config, db7_schema())?;
    let client = RegisterClient::new(connector, config.to_client_config());
    Ok((config, client))
}

pub fn emit_report(report: &OperationReport) {
    println!("{}", report.to_json());
}

pub fn emit_value(value: &Value) {
    println!("{}", value);
}

use chrono::Local;
use clap::Parser;
use plc_rust::plc_common_rs::utils::cli::{emit_value, parse_args_or_exit, prepare, CommonArgs};
use plc_rust::plc_common_rs::utils::report::read_report;
use serde_json::json;

#[derive(Parser)]
#[command(name = "plc-read")]
#[command(about = "DB7 のプロセス状態を読み出して JSON で出力")]
#[command(version = "0.1.0")]
struct Cli {
    /// 読み出し時刻 (hora) を付加する
    #[arg(long)]
    with_time: bool,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let cli: Cli = parse_args_or_exit();

    let (_, client) = match prepare(&cli.common) {
        Ok(prepared) => prepared,
        Err(e) => {
            emit_value(&json!({ "error": e.to_string() }));
            return;
        }
    };

    let result = client.read_process_state();
    if let Err(e) = &result {
        log::error!("DB7 の読み出しに失敗しました: {}", e);
    }
    let read_at = cli.with_time.then(Local::now);
    emit_value(&read_report(&result, read_at));
}

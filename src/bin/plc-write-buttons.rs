use clap::Parser;
use plc_rust::plc_common_rs::utils::cli::{emit_report, parse_args_or_exit, prepare, CommonArgs};
use plc_rust::plc_common_rs::utils::report::{parse_flag, OperationReport};

#[derive(Parser)]
#[command(name = "plc-write-buttons")]
#[command(about = "操作ボタン (start / stop / 非常停止) を DB7 に書き込む")]
#[command(version = "0.1.0")]
struct Cli {
    /// 起動ボタン
    start: String,

    /// 停止ボタン
    stop: String,

    /// 非常停止ボタン
    emergency_stop: String,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let cli: Cli = parse_args_or_exit();
    let start = parse_flag(&cli.start);
    let stop = parse_flag(&cli.stop);
    let emergency_stop = parse_flag(&cli.emergency_stop);

    let (_, client) = match prepare(&cli.common) {
        Ok(prepared) => prepared,
        Err(e) => {
            emit_report(&OperationReport::config_error(&e));
            return;
        }
    };

    let result = client.write_buttons(start, stop, emergency_stop);
    let message = format!(
        "ボタンを書き込みました: Start={}, Stop={}, Paro={}",
        start, stop, emergency_stop
    );
    emit_report(&OperationReport::from_write(&result, &message));
}

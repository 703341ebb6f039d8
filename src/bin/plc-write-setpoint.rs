use clap::Parser;
use plc_rust::plc_common_rs::utils::cli::{emit_report, exit_invalid_arguments, parse_args_or_exit, prepare, CommonArgs};
use plc_rust::plc_common_rs::utils::report::{parse_flag, OperationReport};

#[derive(Parser)]
#[command(name = "plc-write-setpoint")]
#[command(about = "設定値と確認フラグを DB7 に書き込む")]
#[command(version = "0.1.0")]
struct Cli {
    /// 設定値 (0-65535)
    #[arg(allow_hyphen_values = true)]
    setpoint: String,

    /// 確認フラグ (true/1/t/y/yes で有効)
    confirm: String,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let cli: Cli = parse_args_or_exit();

    let setpoint: i64 = match cli.setpoint.trim().parse() {
        Ok(value) => value,
        Err(e) => exit_invalid_arguments(&format!("設定値が整数ではありません '{}': {}", cli.setpoint, e)),
    };
    let confirm = parse_flag(&cli.confirm);

    let (_, client) = match prepare(&cli.common) {
        Ok(prepared) => prepared,
        Err(e) => {
            emit_report(&OperationReport::config_error(&e));
            return;
        }
    };

    let result = client.write_scalar_and_flag(setpoint, confirm);
    let message = format!("設定値を書き込みました: {}, 確認: {}", setpoint, confirm);
    emit_report(&OperationReport::from_write(&result, &message));
}

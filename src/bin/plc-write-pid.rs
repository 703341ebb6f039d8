use clap::Parser;
use plc_rust::plc_common_rs::register::types::PidMode;
use plc_rust::plc_common_rs::utils::cli::{emit_report, exit_invalid_arguments, parse_args_or_exit, prepare, CommonArgs};
use plc_rust::plc_common_rs::utils::report::{parse_flag, OperationReport};

#[derive(Parser)]
#[command(name = "plc-write-pid")]
#[command(about = "PID 制御モードを DB7 に書き込む（1つだけ有効）")]
#[command(version = "0.1.0")]
struct Cli {
    /// PID 自動
    pid_auto: String,

    /// PID クラシック
    pid_clasico: String,

    /// PID サーボシステム
    pid_servosis: String,

    #[command(flatten)]
    common: CommonArgs,
}

fn main() {
    let cli: Cli = parse_args_or_exit();
    let mode = match PidMode::from_flags(
        parse_flag(&cli.pid_auto),
        parse_flag(&cli.pid_clasico),
        parse_flag(&cli.pid_servosis),
    ) {
        Ok(mode) => mode,
        Err(e) => exit_invalid_arguments(&e.to_string()),
    };

    let (_, client) = match prepare(&cli.common) {
        Ok(prepared) => prepared,
        Err(e) => {
            emit_report(&OperationReport::config_error(&e));
            return;
        }
    };

    let result = client.write_pid_mode(mode);
    let message = format!("PID モードを書き込みました: {}", mode);
    emit_report(&OperationReport::from_write(&result, &message));
}

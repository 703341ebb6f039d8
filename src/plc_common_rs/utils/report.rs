//! 操作結果の JSON 表現（CLI の標準出力用）

use crate::plc_common_rs::register::core::exceptions::{RegisterError, RegisterResult};
use crate::plc_common_rs::register::types::field_value::FieldValueSet;
use crate::plc_common_rs::register::types::verification::VerificationResult;
use crate::plc_common_rs::utils::config_loader::ConfigError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 操作の結果区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Confirmed,
    /// 書き込みは成功したが一部を検証していない
    Unverified,
    Mismatch,
    ConnectionError,
    TransportError,
    DecodeError,
    RangeError,
    InvalidIntent,
    ConfigError,
}

impl Outcome {
    pub fn of_error(err: &RegisterError) -> Self {
        match err {
            RegisterError::Connection(_) => Outcome::ConnectionError,
            // ディスパッチ失敗時も書き込み状態は不明
            RegisterError::Transport(_) | RegisterError::Dispatch(_) => Outcome::TransportError,
            RegisterError::Decode(_) => Outcome::DecodeError,
            RegisterError::Range(_) => Outcome::RangeError,
            RegisterError::Intent(_) => Outcome::InvalidIntent,
            RegisterError::VerificationMismatch(_) => Outcome::Mismatch,
        }
    }
}

/// 書き込み操作の結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReport {
    pub success: bool,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationReport {
    pub fn success(message: String) -> Self {
        Self {
            success: true,
            outcome: Outcome::Confirmed,
            message: Some(message),
            error: None,
        }
    }

    pub fn failure(outcome: Outcome, error: String) -> Self {
        Self {
            success: false,
            outcome,
            message: None,
            error: Some(error),
        }
    }

    /// 引数の解析に失敗した場合
    pub fn invalid_arguments(error: &str) -> Self {
        Self::failure(Outcome::InvalidIntent, error.to_string())
    }

    /// 設定の読み込みに失敗した場合（PLC には接続していない）
    pub fn config_error(err: &ConfigError) -> Self {
        Self::failure(Outcome::ConfigError, err.to_string())
    }

    /// 書き込み結果から作成
    ///
    /// `message` は不一致がない場合にだけ使われる。未検証の領域があれば
    /// メッセージに付記する。
    pub fn from_write(result: &RegisterResult<VerificationResult>, message: &str) -> Self {
        match result {
            Ok(VerificationResult::Confirmed) => Self::success(message.to_string()),
            Ok(VerificationResult::Unverified(regions)) => {
                let regions: Vec<String> = regions.iter().map(|r| r.to_string()).collect();
                Self {
                    outcome: Outcome::Unverified,
                    ..Self::success(format!("{} (未検証: {})", message, regions.join(", ")))
                }
            }
            Ok(mismatch @ VerificationResult::Mismatch { .. }) => Self::failure(Outcome::Mismatch, mismatch.to_string()),
            Err(err) => Self::failure(Outcome::of_error(err), err.to_string()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| json!({ "success": false, "error": e.to_string() }).to_string())
    }
}

/// 読み出し結果の JSON
///
/// 成功時はフィールド名→値のフラットなマップ、失敗時は `{"error": ...}`。
/// `read_at` を指定すると読み出し時刻を `hora` として追加する。
pub fn read_report(result: &RegisterResult<FieldValueSet>, read_at: Option<DateTime<Local>>) -> Value {
    match result {
        Ok(values) => {
            let mut map = values.to_json_map();
            if let Some(ts) = read_at {
                map.insert("hora".into(), Value::String(ts.format("%H:%M:%S").to_string()));
            }
            Value::Object(map)
        }
        Err(err) => json!({ "error": err.to_string() }),
    }
}

/// CLI 引数の真偽値解釈（true / 1 / t / y / yes、大文字小文字は無視）
pub fn parse_flag(arg: &str) -> bool {
    matches!(arg.trim().to_lowercase().as_str(), "true" | "1" | "t" | "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plc_common_rs::register::core::exceptions::{ByteRegion, ConnectionError, RangeError};
    use crate::plc_common_rs::register::types::verification::RegionMismatch;

    #[test]
    fn test_parse_flag() {
        for arg in ["true", "TRUE", "1", "t", "Y", "yes"] {
            assert!(parse_flag(arg), "{}", arg);
        }
        for arg in ["false", "0", "no", "", "2", "on"] {
            assert!(!parse_flag(arg), "{}", arg);
        }
    }

    #[test]
    fn test_confirmed_report_json() {
        let report = OperationReport::from_write(&Ok(VerificationResult::Confirmed), "ok");
        let value: Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(value, json!({ "success": true, "outcome": "confirmed", "message": "ok" }));
    }

    #[test]
    fn test_error_outcomes() {
        let range: RegisterResult<VerificationResult> = Err(RangeError::UInt16OutOfRange {
            field: "setpoint".into(),
            value: -1,
        }
        .into());
        let report = OperationReport::from_write(&range, "unused");
        assert!(!report.success);
        assert_eq!(report.outcome, Outcome::RangeError);
        assert!(report.message.is_none());

        let conn: RegisterResult<VerificationResult> = Err(ConnectionError::NotConnected {
            address: "192.168.4.10".into(),
        }
        .into());
        assert_eq!(OperationReport::from_write(&conn, "").outcome, Outcome::ConnectionError);
    }

    #[test]
    fn test_mismatch_report_names_region() {
        let mismatch = VerificationResult::from_parts(
            vec![RegionMismatch {
                region: ByteRegion::new(7, 6, 1),
                fields: vec!["b_paroE".into()],
                expected: vec![0b101],
                observed: vec![0b001],
                mask: Some(0b111),
            }],
            Vec::new(),
        );
        let report = OperationReport::from_write(&Ok(mismatch), "unused");
        assert_eq!(report.outcome, Outcome::Mismatch);
        assert!(report.error.unwrap().contains("DB7.DBB6"));
    }

    #[test]
    fn test_unverified_report_is_success_with_note() {
        let result = Ok(VerificationResult::Unverified(vec![ByteRegion::new(7, 0, 2)]));
        let report = OperationReport::from_write(&result, "設定値を書き込みました");
        assert!(report.success);
        assert_eq!(report.outcome, Outcome::Unverified);
        assert_eq!(
            report.message.as_deref(),
            Some("設定値を書き込みました (未検証: DB7.DBB0..2)")
        );
        let value: Value = serde_json::from_str(&report.to_json()).unwrap();
        assert_eq!(value["outcome"], json!("unverified"));
    }

    #[test]
    fn test_read_report_error_shape() {
        let err: RegisterResult<FieldValueSet> = Err(ConnectionError::NotConnected {
            address: "192.168.4.10".into(),
        }
        .into());
        let value = read_report(&err, None);
        assert!(value.get("error").is_some());
        assert_eq!(value.as_object().unwrap().len(), 1);
    }
}

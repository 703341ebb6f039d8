use crate::plc_common_rs::clients::masked_writer::{plan_writes, write_unit, WriteUnit};
use crate::plc_common_rs::clients::transport::{BlockTransport, ConnectionParams, Connector};
use crate::plc_common_rs::clients::utils::session::PlcSession;
use crate::plc_common_rs::clients::write_verifier::verify_unit;
use crate::plc_common_rs::register::core::codec::decode_all;
use crate::plc_common_rs::register::core::exceptions::{
    ByteRegion, RegisterResult, TransportError, TransportFailure, TransportStage,
};
use crate::plc_common_rs::register::core::field_schema::{db7_schema, names, FieldSchema};
use crate::plc_common_rs::register::types::field_value::FieldValueSet;
use crate::plc_common_rs::register::types::verification::{RegionMismatch, VerificationResult};
use crate::plc_common_rs::register::types::write_intent::{PidMode, ResolvedIntent, WriteIntent};
use log::{debug, trace};

#[derive(Debug, Clone)]
pub struct RegisterClientConfig {
    pub connection: ConnectionParams,
    /// ブロック全体読み出しのバイト数
    pub read_length: usize,
    /// スカラー書き込みを再読み出しで検証するか
    pub verify_scalar_writes: bool,
}

impl Default for RegisterClientConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionParams::default(),
            read_length: 8,
            verify_scalar_writes: true,
        }
    }
}

/// 書き込み単位ごとの進捗
///
/// 転送エラーで中断したときに、どこまで確定しているかを報告するために使う。
#[derive(Debug, Default)]
struct WriteProgress {
    confirmed: Vec<ByteRegion>,
    mismatches: Vec<RegionMismatch>,
    unverified: Vec<ByteRegion>,
}

impl WriteProgress {
    fn abort(self, stage: TransportStage, unit: &WriteUnit, source: TransportError) -> TransportFailure {
        TransportFailure {
            stage,
            region: unit.region(),
            fields: unit.fields(),
            source,
            confirmed: self.confirmed,
            mismatches: self.mismatches,
            unverified: self.unverified,
        }
    }

    fn into_result(self) -> VerificationResult {
        VerificationResult::from_parts(self.mismatches, self.unverified)
    }
}

/// 確立済みセッション上のレジスタ操作
///
/// 内部状態を持たず、呼び出しごとに転送を行う。排他制御は呼び出し側の責務。
pub struct RegisterOperations<'a, T: BlockTransport + ?Sized> {
    transport: &'a mut T,
    schema: &'a FieldSchema,
    read_length: usize,
    verify_scalar_writes: bool,
}

impl<'a, T: BlockTransport + ?Sized> RegisterOperations<'a, T> {
    pub fn new(transport: &'a mut T, schema: &'a FieldSchema) -> Self {
        Self {
            transport,
            schema,
            read_length: schema.required_len(),
            verify_scalar_writes: true,
        }
    }

    pub fn with_read_length(mut self, read_length: usize) -> Self {
        self.read_length = read_length;
        self
    }

    pub fn with_scalar_verification(mut self, enabled: bool) -> Self {
        self.verify_scalar_writes = enabled;
        self
    }

    /// ブロック全体を1回で読み出してデコードする
    pub fn read_process_state(&mut self) -> RegisterResult<FieldValueSet> {
        let block_id = self.schema.block_id();
        let region = ByteRegion::new(block_id, 0, self.read_length);
        let data = self
            .transport
            .read_block(block_id, 0, self.read_length)
            .map_err(|e| TransportFailure::before_write(TransportStage::BlockRead, region, Vec::new(), e))?;
        trace!("{} スナップショット: {}", region, hex::encode(&data));
        Ok(decode_all(self.schema, &data)?)
    }

    /// 操作ボタン（byte 6 の start/stop/非常停止）を書き込む
    pub fn write_boolean_group(&mut self, intent: &WriteIntent) -> RegisterResult<VerificationResult> {
        intent.ensure_within(&names::BUTTON_FIELDS, "write_boolean_group")?;
        self.apply_intent(intent)
    }

    pub fn write_buttons(&mut self, start: bool, stop: bool, emergency_stop: bool) -> RegisterResult<VerificationResult> {
        let intent = WriteIntent::new()
            .with(names::START, start)
            .with(names::STOP, stop)
            .with(names::EMERGENCY_STOP, emergency_stop);
        self.write_boolean_group(&intent)
    }

    /// 設定値と確認フラグを書き込む
    ///
    /// 設定値は直接書き込み、確認フラグは byte 6 のマスク付き書き込み。
    /// 2回の書き込みと2回の検証の結果を合成して返す。スカラー検証が
    /// 無効な場合、設定値の領域は `Unverified` として返る。
    pub fn write_scalar_and_flag(&mut self, setpoint: i64, confirm: bool) -> RegisterResult<VerificationResult> {
        let intent = WriteIntent::new()
            .with(names::SETPOINT, setpoint)
            .with(names::CONFIRM, confirm);
        self.apply_intent(&intent)
    }

    /// PID モードフラグ（byte 7）を書き込む
    ///
    /// 対象フィールドの制限のみを行う。排他性を保証したい場合は
    /// [`write_pid_mode`](Self::write_pid_mode) を使う。
    pub fn write_pid_mode_group(&mut self, intent: &WriteIntent) -> RegisterResult<VerificationResult> {
        intent.ensure_within(&names::PID_MODE_FIELDS, "write_pid_mode_group")?;
        self.apply_intent(intent)
    }

    pub fn write_pid_mode(&mut self, mode: PidMode) -> RegisterResult<VerificationResult> {
        debug!("PID モード切り替え: {}", mode);
        self.write_pid_mode_group(&mode.to_intent())
    }

    /// 任意の書き込み意図を適用する
    ///
    /// 解決と事前読み出しがすべて成功してから書き込みを開始する。
    /// 書き込みごとに直後の再読み出しで検証し、不一致があっても残りの
    /// 単位は続けて書き込む。転送エラーが起きた時点で中断する。
    pub fn apply_intent(&mut self, intent: &WriteIntent) -> RegisterResult<VerificationResult> {
        let resolved = ResolvedIntent::resolve(self.schema, intent)?;
        let units = plan_writes(&mut *self.transport, &resolved)?;
        Ok(self.execute(&units)?)
    }

    fn execute(&mut self, units: &[WriteUnit]) -> Result<VerificationResult, TransportFailure> {
        let mut progress = WriteProgress::default();
        for unit in units {
            let region = unit.region();
            if let Err(e) = write_unit(&mut *self.transport, unit) {
                // 書き込み要求が届いたかどうかは分からない
                progress.unverified.push(region);
                return Err(progress.abort(TransportStage::Write, unit, e));
            }

            if unit.is_scalar() && !self.verify_scalar_writes {
                // 書き込み済みだが値は確認していない
                debug!("{} スカラー検証は無効", region);
                progress.unverified.push(region);
                continue;
            }

            match verify_unit(&mut *self.transport, unit) {
                Ok(None) => progress.confirmed.push(region),
                Ok(Some(mismatch)) => progress.mismatches.push(mismatch),
                Err(e) => {
                    progress.unverified.push(region);
                    return Err(progress.abort(TransportStage::VerifyRead, unit, e));
                }
            }
        }
        Ok(progress.into_result())
    }
}

/// 操作ごとにセッションを開閉するレジスタクライアント
pub struct RegisterClient<C: Connector> {
    connector: C,
    config: RegisterClientConfig,
    schema: &'static FieldSchema,
}

impl<C: Connector> RegisterClient<C> {
    pub fn new(connector: C, config: RegisterClientConfig) -> Self {
        Self::with_schema(connector, config, db7_schema())
    }

    pub fn with_schema(connector: C, config: RegisterClientConfig, schema: &'static FieldSchema) -> Self {
        Self {
            connector,
            config,
            schema,
        }
    }

    pub fn config(&self) -> &RegisterClientConfig {
        &self.config
    }

    pub fn schema(&self) -> &'static FieldSchema {
        self.schema
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn with_session<R>(
        &self,
        op: impl FnOnce(&mut RegisterOperations<'_, C::Transport>) -> RegisterResult<R>,
    ) -> RegisterResult<R> {
        let mut session = PlcSession::open(&self.connector, &self.config.connection)?;
        let mut ops = RegisterOperations::new(&mut *session, self.schema)
            .with_read_length(self.config.read_length)
            .with_scalar_verification(self.config.verify_scalar_writes);
        op(&mut ops)
    }

    pub fn read_process_state(&self) -> RegisterResult<FieldValueSet> {
        self.with_session(|ops| ops.read_process_state())
    }

    pub fn write_boolean_group(&self, intent: &WriteIntent) -> RegisterResult<VerificationResult> {
        // 接続前に対象外フィールドを弾く
        intent.ensure_within(&names::BUTTON_FIELDS, "write_boolean_group")?;
        self.with_session(|ops| ops.write_boolean_group(intent))
    }

    pub fn write_buttons(&self, start: bool, stop: bool, emergency_stop: bool) -> RegisterResult<VerificationResult> {
        self.with_session(|ops| ops.write_buttons(start, stop, emergency_stop))
    }

    pub fn write_scalar_and_flag(&self, setpoint: i64, confirm: bool) -> RegisterResult<VerificationResult> {
        // 範囲外の設定値は接続せずに拒否する
        let intent = WriteIntent::new()
            .with(names::SETPOINT, setpoint)
            .with(names::CONFIRM, confirm);
        ResolvedIntent::resolve(self.schema, &intent)?;
        self.with_session(|ops| ops.write_scalar_and_flag(setpoint, confirm))
    }

    pub fn write_pid_mode_group(&self, intent: &WriteIntent) -> RegisterResult<VerificationResult> {
        intent.ensure_within(&names::PID_MODE_FIELDS, "write_pid_mode_group")?;
        self.with_session(|ops| ops.write_pid_mode_group(intent))
    }

    pub fn write_pid_mode(&self, mode: PidMode) -> RegisterResult<VerificationResult> {
        self.with_session(|ops| ops.write_pid_mode(mode))
    }

    pub fn apply_intent(&self, intent: &WriteIntent) -> RegisterResult<VerificationResult> {
        ResolvedIntent::resolve(self.schema, intent)?;
        self.with_session(|ops| ops.apply_intent(intent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plc_common_rs::clients::utils::simulated_plc::SimulatedPlc;
    use crate::plc_common_rs::register::core::exceptions::{IntentError, RangeError, RegisterError};

    const SAMPLE: [u8; 8] = [0x00, 0x64, 0x42, 0x48, 0x00, 0x00, 0x05, 0x03];

    fn client(plc: &SimulatedPlc) -> RegisterClient<SimulatedPlc> {
        RegisterClient::new(plc.clone(), RegisterClientConfig::default())
    }

    #[test]
    fn test_read_process_state() {
        let plc = SimulatedPlc::with_block(7, SAMPLE.to_vec());
        let state = client(&plc).read_process_state().unwrap();
        assert_eq!(state.get_u16("setpoint"), Some(100));
        assert_eq!(state.get_f32("temperatura"), Some(50.0));
        assert_eq!(state.get_bool("b_paroE"), Some(true));
        assert_eq!(state.get_bool("pid_clasico"), Some(true));
        assert_eq!(plc.read_count(), 1);
        assert_eq!(plc.open_connections(), 0);
    }

    #[test]
    fn test_write_scalar_and_flag_two_writes_two_verifications() {
        let plc = SimulatedPlc::with_block(7, SAMPLE.to_vec());
        let result = client(&plc).write_scalar_and_flag(250, true).unwrap();
        assert!(result.is_confirmed());

        let image = plc.snapshot(7).unwrap();
        assert_eq!(&image[0..2], &[0x00, 0xFA]);
        assert_eq!(image[6], 0b0000_1101);
        assert_eq!(plc.write_count(), 2);
        // 事前読み出し1回 + 検証読み出し2回
        assert_eq!(plc.read_count(), 3);
    }

    #[test]
    fn test_scalar_verification_can_be_disabled() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let config = RegisterClientConfig {
            verify_scalar_writes: false,
            ..Default::default()
        };
        let result = RegisterClient::new(plc.clone(), config)
            .write_scalar_and_flag(10, false)
            .unwrap();
        assert_eq!(result, VerificationResult::Unverified(vec![ByteRegion::new(7, 0, 2)]));
        assert!(result.is_consistent());
        assert_eq!(plc.read_count(), 2);
    }

    #[test]
    fn test_unverified_scalar_is_reported_on_later_failure() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        plc.fail_write_at(1);
        let config = RegisterClientConfig {
            verify_scalar_writes: false,
            ..Default::default()
        };
        match RegisterClient::new(plc.clone(), config).write_scalar_and_flag(300, true) {
            Err(RegisterError::Transport(failure)) => {
                assert_eq!(failure.stage, TransportStage::Write);
                assert!(failure.confirmed.is_empty());
                assert_eq!(
                    failure.unverified,
                    vec![ByteRegion::new(7, 0, 2), ByteRegion::new(7, 6, 1)]
                );
                assert!(failure.has_unknown_writes());
            }
            other => panic!("unexpected: {:?}", other),
        }
        // 設定値は PLC に届いている
        assert_eq!(&plc.snapshot(7).unwrap()[0..2], &[0x01, 0x2C]);
    }

    #[test]
    fn test_out_of_range_setpoint_never_connects() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let err = client(&plc).write_scalar_and_flag(65_536, true).unwrap_err();
        assert!(matches!(err, RegisterError::Range(RangeError::UInt16OutOfRange { value: 65_536, .. })));
        assert!(plc.calls().is_empty());
    }

    #[test]
    fn test_group_scoping() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let intent = WriteIntent::new().with("b_start", true).with("pid_auto", true);
        let err = client(&plc).write_boolean_group(&intent).unwrap_err();
        assert_eq!(
            err,
            RegisterError::Intent(IntentError::OutsideGroup {
                field: "pid_auto".into(),
                operation: "write_boolean_group",
            })
        );
        assert!(plc.calls().is_empty());
    }

    #[test]
    fn test_pid_mode_preserves_status_bits() {
        // estado_servo と estado_variador は PLC 側の状態
        let plc = SimulatedPlc::with_block(7, vec![0, 0, 0, 0, 0, 0, 0, 0b0001_1001]);
        let result = client(&plc).write_pid_mode(PidMode::Servo).unwrap();
        assert!(result.is_confirmed());
        assert_eq!(plc.snapshot(7).unwrap()[7], 0b0001_1100);
    }

    #[test]
    fn test_mismatch_does_not_stop_remaining_writes() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        plc.stick_bits(7, 0, 0xFF, 0x00);
        let result = client(&plc).write_scalar_and_flag(300, true).unwrap();
        assert_eq!(result.mismatches().len(), 1);
        assert_eq!(result.mismatches()[0].fields, vec!["setpoint".to_string()]);
        // 確認フラグは書き込まれている
        assert_eq!(plc.snapshot(7).unwrap()[6], 0b0000_1000);
    }

    #[test]
    fn test_write_failure_reports_unknown_state() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        plc.fail_write_at(1);
        match client(&plc).write_scalar_and_flag(300, true) {
            Err(RegisterError::Transport(failure)) => {
                assert_eq!(failure.stage, TransportStage::Write);
                assert_eq!(failure.confirmed, vec![ByteRegion::new(7, 0, 2)]);
                assert_eq!(failure.unverified, vec![ByteRegion::new(7, 6, 1)]);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(plc.open_connections(), 0);
    }

    #[test]
    fn test_operations_on_borrowed_transport() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let mut conn = plc.open();
        let mut ops = RegisterOperations::new(&mut conn, db7_schema());
        assert!(ops.write_buttons(true, false, false).unwrap().is_confirmed());
        assert!(ops.read_process_state().unwrap().get_bool("b_start").unwrap());
    }
}

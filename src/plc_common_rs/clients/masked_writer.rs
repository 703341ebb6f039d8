//! マスク付き書き込み（共有バイトの読み出し→変更→書き込み）
//!
//! 1バイトに複数の独立したフラグが同居しているため、対象外のビットを
//! 壊さないよう必ず現在値を読んでから1ビットずつ畳み込み、グループごとに
//! 1回だけ書き込む。スカラーは自分のバイト範囲を占有するので読み出しは不要。

use crate::plc_common_rs::clients::transport::{read_exact, BlockTransport};
use crate::plc_common_rs::register::core::exceptions::{
    ByteRegion, RegisterResult, TransportError, TransportFailure, TransportStage,
};
use crate::plc_common_rs::register::types::write_intent::{BitGroup, ResolvedIntent, ScalarWrite};
use log::debug;

/// 事前読み出し済みの共有バイト
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedByte {
    pub group: BitGroup,
    /// PLC から読み出した現在値
    pub observed: u8,
    /// 書き込むバイト値
    pub target: u8,
}

impl PreparedByte {
    pub fn region(&self) -> ByteRegion {
        self.group.region
    }

    pub fn mask(&self) -> u8 {
        self.group.mask()
    }
}

/// 1回の書き込み単位
#[derive(Debug, Clone, PartialEq)]
pub enum WriteUnit {
    Scalar(ScalarWrite),
    Bits(PreparedByte),
}

impl WriteUnit {
    pub fn region(&self) -> ByteRegion {
        match self {
            WriteUnit::Scalar(s) => s.region,
            WriteUnit::Bits(b) => b.region(),
        }
    }

    pub fn fields(&self) -> Vec<String> {
        match self {
            WriteUnit::Scalar(s) => vec![s.field.clone()],
            WriteUnit::Bits(b) => b.group.fields(),
        }
    }

    pub fn payload(&self) -> Vec<u8> {
        match self {
            WriteUnit::Scalar(s) => s.bytes.clone(),
            WriteUnit::Bits(b) => vec![b.target],
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, WriteUnit::Scalar(_))
    }
}

/// 全ビットグループの現在値を読み出し、書き込み値を計算する
///
/// 1つでも読み出しに失敗した場合は書き込みを一切行わずに中止する。
/// 自分で観測していないバイトから書き込み値を作ることはない。
pub fn prepare_groups<T>(transport: &mut T, groups: &[BitGroup]) -> RegisterResult<Vec<PreparedByte>>
where
    T: BlockTransport + ?Sized,
{
    let mut prepared = Vec::with_capacity(groups.len());
    for group in groups {
        let region = group.region;
        let observed = read_exact(transport, region.block_id, region.offset, 1)
            .map_err(|e| TransportFailure::before_write(TransportStage::PreRead, region, group.fields(), e))?[0];
        let target = group.apply(observed);
        debug!(
            "{} 事前読み出し {:08b} -> 書き込み {:08b} (マスク {:08b})",
            region,
            observed,
            target,
            group.mask()
        );
        prepared.push(PreparedByte {
            group: group.clone(),
            observed,
            target,
        });
    }
    Ok(prepared)
}

/// 解決済みの意図から書き込み単位の列を作る
///
/// スカラーを先に、続いて共有バイトをオフセット順に並べる。
/// 事前読み出しはすべての書き込みより前に完了する。
pub fn plan_writes<T>(transport: &mut T, resolved: &ResolvedIntent) -> RegisterResult<Vec<WriteUnit>>
where
    T: BlockTransport + ?Sized,
{
    let prepared = prepare_groups(transport, &resolved.bit_groups)?;
    let mut units: Vec<WriteUnit> = resolved.scalars.iter().cloned().map(WriteUnit::Scalar).collect();
    units.extend(prepared.into_iter().map(WriteUnit::Bits));
    Ok(units)
}

/// 書き込み単位を1回の転送で書き込む
pub fn write_unit<T>(transport: &mut T, unit: &WriteUnit) -> Result<(), TransportError>
where
    T: BlockTransport + ?Sized,
{
    let region = unit.region();
    transport.write_block(region.block_id, region.offset, &unit.payload())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plc_common_rs::clients::utils::simulated_plc::{SimulatedPlc, TransportCall};
    use crate::plc_common_rs::register::core::exceptions::RegisterError;
    use crate::plc_common_rs::register::core::field_schema::db7_schema;
    use crate::plc_common_rs::register::types::write_intent::WriteIntent;

    fn resolve(intent: WriteIntent) -> ResolvedIntent {
        ResolvedIntent::resolve(db7_schema(), &intent).unwrap()
    }

    #[test]
    fn test_non_interference_with_foreign_bits() {
        // A=1, B=0, C=1, D=1 のうち B だけを立てる
        let plc = SimulatedPlc::with_block(7, vec![0, 0, 0, 0, 0, 0, 0b0000_1101, 0]);
        let mut conn = plc.open();
        let units = plan_writes(&mut conn, &resolve(WriteIntent::new().with("b_stop", true))).unwrap();
        assert_eq!(units.len(), 1);
        write_unit(&mut conn, &units[0]).unwrap();
        assert_eq!(plc.snapshot(7).unwrap()[6], 0b0000_1111);
    }

    #[test]
    fn test_one_read_and_one_write_per_group() {
        let plc = SimulatedPlc::with_block(7, vec![0, 0, 0, 0, 0, 0, 0b1111_0000, 0]);
        let mut conn = plc.open();
        let intent = WriteIntent::new()
            .with("b_start", true)
            .with("b_stop", false)
            .with("b_paroE", true);
        let units = plan_writes(&mut conn, &resolve(intent)).unwrap();
        for unit in &units {
            write_unit(&mut conn, unit).unwrap();
        }
        assert_eq!(
            plc.calls(),
            vec![
                TransportCall::Read { block_id: 7, offset: 6, length: 1 },
                TransportCall::Write { block_id: 7, offset: 6, data: vec![0b1111_0101] },
            ]
        );
    }

    #[test]
    fn test_scalars_skip_pre_read() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let mut conn = plc.open();
        let units = plan_writes(&mut conn, &resolve(WriteIntent::new().with("setpoint", 250u16))).unwrap();
        assert_eq!(plc.read_count(), 0);
        assert_eq!(units[0].payload(), vec![0x00, 0xFA]);
        assert!(units[0].is_scalar());
    }

    #[test]
    fn test_pre_read_failure_aborts_before_any_write() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        plc.fail_read_at(1);
        let mut conn = plc.open();
        let intent = WriteIntent::new().with("b_start", true).with("pid_auto", true);
        match plan_writes(&mut conn, &resolve(intent)) {
            Err(RegisterError::Transport(failure)) => {
                assert_eq!(failure.stage, TransportStage::PreRead);
                assert_eq!(failure.region, ByteRegion::new(7, 7, 1));
                assert_eq!(failure.fields, vec!["pid_auto".to_string()]);
                assert!(!failure.has_unknown_writes());
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(plc.write_count(), 0);
    }
}

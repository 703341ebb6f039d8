//! 書き込み後の再読み出しによる検証
//!
//! 書き込み応答が成功でも PLC 側のロジックが値を上書きすることがあるため、
//! 書き込んだ領域を読み直して意図した値が保存されたかを比較する。
//! 共有バイトは書き換えたビットだけを比較する。

use crate::plc_common_rs::clients::masked_writer::WriteUnit;
use crate::plc_common_rs::clients::transport::{read_exact, BlockTransport};
use crate::plc_common_rs::register::core::bit_utils::masked_eq;
use crate::plc_common_rs::register::core::exceptions::TransportError;
use crate::plc_common_rs::register::types::verification::RegionMismatch;
use log::debug;

/// スカラー領域をバイト単位で比較
pub fn compare_scalar(unit: &WriteUnit, observed: &[u8]) -> Option<RegionMismatch> {
    let expected = unit.payload();
    if expected.as_slice() == observed {
        return None;
    }
    Some(RegionMismatch {
        region: unit.region(),
        fields: unit.fields(),
        expected,
        observed: observed.to_vec(),
        mask: None,
    })
}

/// 共有バイトをマスク内のビットだけで比較
pub fn compare_bits(unit: &WriteUnit, observed: u8, mask: u8) -> Option<RegionMismatch> {
    let expected = unit.payload();
    if masked_eq(expected[0], observed, mask) {
        return None;
    }
    Some(RegionMismatch {
        region: unit.region(),
        fields: unit.fields(),
        expected,
        observed: vec![observed],
        mask: Some(mask),
    })
}

/// 書き込んだ領域を再読み出しして比較する
///
/// Returns:
///     一致すれば `Ok(None)`、不一致なら `Ok(Some(..))`。
///     再読み出し自体が失敗した場合は転送エラー（書き込み結果は不明）。
pub fn verify_unit<T>(transport: &mut T, unit: &WriteUnit) -> Result<Option<RegionMismatch>, TransportError>
where
    T: BlockTransport + ?Sized,
{
    let region = unit.region();
    let observed = read_exact(transport, region.block_id, region.offset, region.length)?;
    let mismatch = match unit {
        WriteUnit::Scalar(_) => compare_scalar(unit, &observed[..region.length]),
        WriteUnit::Bits(prepared) => compare_bits(unit, observed[0], prepared.mask()),
    };
    match &mismatch {
        Some(m) => debug!("書き込み検証の不一致: {}", m),
        None => debug!("{} 検証成功", region),
    }
    Ok(mismatch)
}

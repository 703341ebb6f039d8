use crate::plc_common_rs::register::core::bit_utils::format_byte;
use crate::plc_common_rs::register::core::exceptions::{ByteRegion, RegisterError, RegisterResult};
use std::fmt;

/// 1領域の検証不一致
///
/// `mask` が `Some` の場合はビット単位の比較で、マスク外のビットは比較対象外。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMismatch {
    pub region: ByteRegion,
    pub fields: Vec<String>,
    pub expected: Vec<u8>,
    pub observed: Vec<u8>,
    pub mask: Option<u8>,
}

impl fmt::Display for RegionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] 期待値 ", self.region, self.fields.join(", "))?;
        match (self.mask, self.expected.as_slice(), self.observed.as_slice()) {
            (Some(mask), [expected], [observed]) => write!(
                f,
                "{}, 実際 {} (比較マスク {})",
                format_byte(*expected),
                format_byte(*observed),
                format_byte(mask)
            ),
            _ => write!(f, "{:02X?}, 実際 {:02X?}", self.expected, self.observed),
        }
    }
}

/// 書き込み検証の結果
///
/// 検証を省略した書き込み（`verify_scalar_writes = false` のスカラー）は
/// `unverified` に列挙され、`Confirmed` には含まれない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// すべての書き込みを再読み出しで確認済み
    Confirmed,
    /// 不一致はないが、検証していない書き込みがある
    Unverified(Vec<ByteRegion>),
    /// 書き込み・再読み出しは成功したが値が一致しない
    Mismatch {
        mismatches: Vec<RegionMismatch>,
        unverified: Vec<ByteRegion>,
    },
}

impl VerificationResult {
    /// 不一致と未検証領域から結果を作る
    pub fn from_parts(mismatches: Vec<RegionMismatch>, unverified: Vec<ByteRegion>) -> Self {
        match (mismatches.is_empty(), unverified.is_empty()) {
            (true, true) => VerificationResult::Confirmed,
            (true, false) => VerificationResult::Unverified(unverified),
            (false, _) => VerificationResult::Mismatch { mismatches, unverified },
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, VerificationResult::Confirmed)
    }

    /// 不一致がないか（未検証の書き込みは許容）
    pub fn is_consistent(&self) -> bool {
        !matches!(self, VerificationResult::Mismatch { .. })
    }

    pub fn mismatches(&self) -> &[RegionMismatch] {
        match self {
            VerificationResult::Mismatch { mismatches, .. } => mismatches,
            _ => &[],
        }
    }

    /// 書き込んだが検証していない領域
    pub fn unverified(&self) -> &[ByteRegion] {
        match self {
            VerificationResult::Confirmed => &[],
            VerificationResult::Unverified(regions) => regions,
            VerificationResult::Mismatch { unverified, .. } => unverified,
        }
    }

    /// 2つの結果を合成（両方 Confirmed のときだけ Confirmed）
    pub fn combine(self, other: VerificationResult) -> VerificationResult {
        let mut mismatches = self.mismatches().to_vec();
        mismatches.extend_from_slice(other.mismatches());
        let mut unverified = self.unverified().to_vec();
        unverified.extend_from_slice(other.unverified());
        VerificationResult::from_parts(mismatches, unverified)
    }

    /// 不一致をエラーとして扱いたい呼び出し元向け
    pub fn ensure_confirmed(self) -> RegisterResult<()> {
        match self {
            VerificationResult::Mismatch { mismatches, .. } => Err(RegisterError::VerificationMismatch(mismatches)),
            _ => Ok(()),
        }
    }
}

fn join_regions(regions: &[ByteRegion]) -> String {
    regions.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Confirmed => write!(f, "検証成功"),
            VerificationResult::Unverified(regions) => {
                write!(f, "書き込み完了 (未検証: {})", join_regions(regions))
            }
            VerificationResult::Mismatch { mismatches, unverified } => {
                let parts: Vec<String> = mismatches.iter().map(|x| x.to_string()).collect();
                write!(f, "検証エラー: 書き込んだ値が一致しません: {}", parts.join("; "))?;
                if !unverified.is_empty() {
                    write!(f, " (未検証: {})", join_regions(unverified))?;
                }
                Ok(())
            }
        }
    }
}

/// ビット操作ユーティリティ
/// 複数のフラグが同居する共有バイトを1ビット単位で扱う関数群
///
/// ビット番号は LSB 基準 (bit 0 = 最下位ビット)。

/// 1バイトあたりのビット数
pub const BITS_PER_BYTE: u8 = 8;

/// 指定ビットだけが立ったマスクを返す
///
/// 範囲外 (8以上) のビット番号は 0 を返す。
pub fn bit_mask(bit_index: u8) -> u8 {
    1u8.checked_shl(bit_index as u32).unwrap_or(0)
}

/// 指定ビットの値を取得する
///
/// Args:
///     byte: 対象バイト
///     bit_index: ビット位置（LSB基準, 0-7）
///
/// Returns:
///     ビットが立っていれば true
pub fn test_bit(byte: u8, bit_index: u8) -> bool {
    byte & bit_mask(bit_index) != 0
}

/// 既存バイトの1ビットだけを書き換える
///
/// 他の7ビットは変更しない。必ず現在値を入力として受け取り、
/// ゼロから新しいバイトを合成することはない。
///
/// Args:
///     current_byte: 現在のバイト値（PLC から読み出した値）
///     bit_index: 書き換えるビット位置（LSB基準, 0-7）
///     value: 設定する値
///
/// Returns:
///     更新後のバイト値
pub fn encode_bit(current_byte: u8, bit_index: u8, value: bool) -> u8 {
    let mask = bit_mask(bit_index);
    if value {
        current_byte | mask
    } else {
        current_byte & !mask
    }
}

/// 複数ビット位置からマスクを構築
pub fn mask_of<I>(bit_indices: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    bit_indices.into_iter().fold(0u8, |mask, bit| mask | bit_mask(bit))
}

/// マスク対象のビットだけを比較する
pub fn masked_eq(expected: u8, observed: u8, mask: u8) -> bool {
    (expected ^ observed) & mask == 0
}

/// バイトを `0b00000101` 形式の文字列に整形
pub fn format_byte(byte: u8) -> String {
    format!("0b{:08b}", byte)
}

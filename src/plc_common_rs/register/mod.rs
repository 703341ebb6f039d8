//! データブロックのレジスタマップ処理
//! フィールド定義、コーデック、書き込み意図、検証結果

pub mod core;
pub mod types;

//! PLC 共通ライブラリ
//! レジスタマップ (register)、転送クライアント (clients)、周辺ユーティリティ (utils)

pub mod clients;
pub mod register;
pub mod utils;

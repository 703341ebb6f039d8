//! PLC 転送層の境界
//!
//! 通信プロトコル自体はこのクレートの範囲外。ここでは読み書きの
//! 契約だけを定義し、実装は `Connector` として外部から差し込む。

use crate::plc_common_rs::register::core::exceptions::{ConnectionError, TransportError};
use serde::{Deserialize, Serialize};

/// 接続先パラメータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub address: String,
    pub rack: u16,
    pub slot: u16,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            address: "192.168.4.10".into(),
            rack: 0,
            slot: 1,
        }
    }
}

impl ConnectionParams {
    pub fn new(address: &str, rack: u16, slot: u16) -> Self {
        Self {
            address: address.to_string(),
            rack,
            slot,
        }
    }
}

/// 確立済みセッション上のデータブロック読み書き
pub trait BlockTransport {
    fn is_connected(&self) -> bool;

    /// `block_id` の `offset` から `length` バイトを読み出す
    fn read_block(&mut self, block_id: u16, offset: usize, length: usize) -> Result<Vec<u8>, TransportError>;

    /// `block_id` の `offset` に `data` を書き込む
    fn write_block(&mut self, block_id: u16, offset: usize, data: &[u8]) -> Result<(), TransportError>;

    fn disconnect(&mut self);
}

impl<T: BlockTransport + ?Sized> BlockTransport for Box<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn read_block(&mut self, block_id: u16, offset: usize, length: usize) -> Result<Vec<u8>, TransportError> {
        (**self).read_block(block_id, offset, length)
    }

    fn write_block(&mut self, block_id: u16, offset: usize, data: &[u8]) -> Result<(), TransportError> {
        (**self).write_block(block_id, offset, data)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }
}

/// セッションを確立する
pub trait Connector {
    type Transport: BlockTransport;

    fn connect(&self, params: &ConnectionParams) -> Result<Self::Transport, ConnectionError>;
}

/// 読み出し長を検証して返す
pub(crate) fn read_exact<T: BlockTransport + ?Sized>(
    transport: &mut T,
    block_id: u16,
    offset: usize,
    length: usize,
) -> Result<Vec<u8>, TransportError> {
    let data = transport.read_block(block_id, offset, length)?;
    if data.len() < length {
        return Err(TransportError::ShortRead {
            requested: length,
            received: data.len(),
        });
    }
    Ok(data)
}

//! 統合テスト共通ヘルパー

#![allow(dead_code)]

use mockall::mock;
use plc_rust::plc_common_rs::clients::transport::{BlockTransport, ConnectionParams, Connector};
use plc_rust::plc_common_rs::register::core::exceptions::{ConnectionError, TransportError};
use std::sync::Mutex;

/// `[0x00,0x64,0x42,0x48,0x00,0x00,0x05,0x03]`:
/// setpoint=100, temperatura=50.0, byte6=0b101, byte7=0b011
pub const SAMPLE_BLOCK: [u8; 8] = [0x00, 0x64, 0x42, 0x48, 0x00, 0x00, 0x05, 0x03];

mock! {
    pub Transport {}

    impl BlockTransport for Transport {
        fn is_connected(&self) -> bool;
        fn read_block(&mut self, block_id: u16, offset: usize, length: usize) -> Result<Vec<u8>, TransportError>;
        fn write_block(&mut self, block_id: u16, offset: usize, data: &[u8]) -> Result<(), TransportError>;
        fn disconnect(&mut self);
    }
}

/// 用意したモック転送を1回だけ渡すコネクタ
pub struct OnceConnector {
    transport: Mutex<Option<MockTransport>>,
}

impl OnceConnector {
    pub fn new(transport: MockTransport) -> Self {
        Self {
            transport: Mutex::new(Some(transport)),
        }
    }
}

impl Connector for OnceConnector {
    type Transport = MockTransport;

    fn connect(&self, params: &ConnectionParams) -> Result<MockTransport, ConnectionError> {
        self.transport
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ConnectionError::Unreachable {
                address: params.address.clone(),
                rack: params.rack,
                slot: params.slot,
                message: "transport already used".into(),
            })
    }
}

/// 常に接続中を返すモック（読み書きの期待値は各テストで設定）
pub fn connected_mock() -> MockTransport {
    let mut transport = MockTransport::new();
    transport.expect_is_connected().return_const(true);
    transport
}

/// 指定バイトだけ値を持つ DB7 イメージ
pub fn block_with(byte6: u8, byte7: u8) -> Vec<u8> {
    let mut block = vec![0u8; 8];
    block[6] = byte6;
    block[7] = byte7;
    block
}

//! メモリ上の模擬 PLC（実機のない環境でのデモ/単体テスト用）
//!
//! 挙動の約束:
//! - クローンは同じメモリブロックを共有する
//! - `fail_read_at(n)` / `fail_write_at(n)` で n 回目（0始まり）の往復をタイムアウトにする
//! - `stick_bits` で指定したビットは書き込みを無視して固定値を保つ
//! - `refuse_connections(true)` で接続自体を拒否する

use crate::plc_common_rs::clients::transport::{BlockTransport, ConnectionParams, Connector};
use crate::plc_common_rs::register::core::exceptions::{ConnectionError, TransportError};
use log::trace;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// 記録された転送呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Read { block_id: u16, offset: usize, length: usize },
    Write { block_id: u16, offset: usize, data: Vec<u8> },
}

#[derive(Debug, Default)]
struct SimState {
    blocks: HashMap<u16, Vec<u8>>,
    // (block_id, offset) -> (mask, value)
    stuck: HashMap<(u16, usize), (u8, u8)>,
    fail_reads: HashSet<usize>,
    fail_writes: HashSet<usize>,
    read_count: usize,
    write_count: usize,
    refuse_connect: bool,
    connections: usize,
    calls: Vec<TransportCall>,
}

impl SimState {
    fn block_mut(&mut self, block_id: u16, offset: usize, length: usize) -> Result<&mut Vec<u8>, TransportError> {
        let block = self
            .blocks
            .get_mut(&block_id)
            .ok_or(TransportError::BlockNotFound(block_id))?;
        if offset + length > block.len() {
            return Err(TransportError::OutOfBounds { block_id, offset, length });
        }
        Ok(block)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedPlc {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPlc {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定内容のブロックを持つ模擬 PLC
    pub fn with_block(block_id: u16, bytes: Vec<u8>) -> Self {
        let plc = Self::new();
        plc.load_block(block_id, bytes);
        plc
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn load_block(&self, block_id: u16, bytes: Vec<u8>) {
        self.lock().blocks.insert(block_id, bytes);
    }

    /// ブロックの現在内容
    pub fn snapshot(&self, block_id: u16) -> Option<Vec<u8>> {
        self.lock().blocks.get(&block_id).cloned()
    }

    /// 転送を経由せずに1バイトを書き換える（PLC 側の処理を模擬）
    pub fn set_byte(&self, block_id: u16, offset: usize, value: u8) {
        if let Some(byte) = self.lock().blocks.get_mut(&block_id).and_then(|b| b.get_mut(offset)) {
            *byte = value;
        }
    }

    /// マスク内のビットを固定値にする（書き込みは反映されない）
    pub fn stick_bits(&self, block_id: u16, offset: usize, mask: u8, value: u8) {
        let mut state = self.lock();
        state.stuck.insert((block_id, offset), (mask, value & mask));
        if let Some(byte) = state.blocks.get_mut(&block_id).and_then(|b| b.get_mut(offset)) {
            *byte = (*byte & !mask) | (value & mask);
        }
    }

    pub fn fail_read_at(&self, n: usize) {
        self.lock().fail_reads.insert(n);
    }

    pub fn fail_write_at(&self, n: usize) {
        self.lock().fail_writes.insert(n);
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connect = refuse;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    pub fn read_count(&self) -> usize {
        self.lock().read_count
    }

    pub fn write_count(&self) -> usize {
        self.lock().write_count
    }

    /// 現在開いている接続数
    pub fn open_connections(&self) -> usize {
        self.lock().connections
    }

    /// 新しい接続を開く
    pub fn open(&self) -> SimulatedConnection {
        self.lock().connections += 1;
        SimulatedConnection {
            plc: self.clone(),
            connected: true,
        }
    }
}

impl Connector for SimulatedPlc {
    type Transport = SimulatedConnection;

    fn connect(&self, params: &ConnectionParams) -> Result<SimulatedConnection, ConnectionError> {
        if self.lock().refuse_connect {
            return Err(ConnectionError::Unreachable {
                address: params.address.clone(),
                rack: params.rack,
                slot: params.slot,
                message: "connection refused".into(),
            });
        }
        Ok(self.open())
    }
}

/// 模擬 PLC へのセッション
#[derive(Debug)]
pub struct SimulatedConnection {
    plc: SimulatedPlc,
    connected: bool,
}

impl BlockTransport for SimulatedConnection {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_block(&mut self, block_id: u16, offset: usize, length: usize) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let mut state = self.plc.lock();
        let n = state.read_count;
        state.read_count += 1;
        state.calls.push(TransportCall::Read { block_id, offset, length });
        if state.fail_reads.contains(&n) {
            return Err(TransportError::Timeout);
        }
        let block = state.block_mut(block_id, offset, length)?;
        let data = block[offset..offset + length].to_vec();
        trace!("SIM read DB{} {}+{}: {}", block_id, offset, length, hex::encode(&data));
        Ok(data)
    }

    fn write_block(&mut self, block_id: u16, offset: usize, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        let mut state = self.plc.lock();
        let n = state.write_count;
        state.write_count += 1;
        state.calls.push(TransportCall::Write {
            block_id,
            offset,
            data: data.to_vec(),
        });
        if state.fail_writes.contains(&n) {
            return Err(TransportError::Timeout);
        }

        let stuck: Vec<(usize, u8, u8)> = (0..data.len())
            .filter_map(|i| {
                state
                    .stuck
                    .get(&(block_id, offset + i))
                    .map(|&(mask, value)| (i, mask, value))
            })
            .collect();

        let block = state.block_mut(block_id, offset, data.len())?;
        block[offset..offset + data.len()].copy_from_slice(data);
        for (i, mask, value) in stuck {
            let byte = &mut block[offset + i];
            *byte = (*byte & !mask) | value;
        }
        trace!("SIM write DB{} {}: {}", block_id, offset, hex::encode(data));
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            let mut state = self.plc.lock();
            state.connections = state.connections.saturating_sub(1);
        }
    }
}

impl Drop for SimulatedConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_shared_between_clones() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let mut conn = plc.clone().open();
        conn.write_block(7, 6, &[0x05]).unwrap();
        assert_eq!(plc.snapshot(7).unwrap()[6], 0x05);
        assert_eq!(conn.read_block(7, 6, 1).unwrap(), vec![0x05]);
        assert_eq!(plc.read_count(), 1);
        assert_eq!(plc.write_count(), 1);
    }

    #[test]
    fn test_out_of_bounds_and_missing_block() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let mut conn = plc.open();
        assert_eq!(
            conn.read_block(7, 7, 2).unwrap_err(),
            TransportError::OutOfBounds { block_id: 7, offset: 7, length: 2 }
        );
        assert_eq!(conn.read_block(8, 0, 1).unwrap_err(), TransportError::BlockNotFound(8));
    }

    #[test]
    fn test_stuck_bits_ignore_writes() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        plc.stick_bits(7, 6, 0b0000_0100, 0);
        let mut conn = plc.open();
        conn.write_block(7, 6, &[0b0000_0101]).unwrap();
        assert_eq!(plc.snapshot(7).unwrap()[6], 0b0000_0001);
    }

    #[test]
    fn test_fault_injection() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        plc.fail_read_at(1);
        plc.fail_write_at(0);
        let mut conn = plc.open();
        assert!(conn.read_block(7, 0, 1).is_ok());
        assert_eq!(conn.read_block(7, 0, 1).unwrap_err(), TransportError::Timeout);
        assert_eq!(conn.write_block(7, 0, &[1]).unwrap_err(), TransportError::Timeout);
        assert_eq!(plc.snapshot(7).unwrap()[0], 0);
    }

    #[test]
    fn test_connection_tracking() {
        let plc = SimulatedPlc::with_block(7, vec![0; 8]);
        let params = ConnectionParams::default();
        {
            let _conn = plc.connect(&params).unwrap();
            assert_eq!(plc.open_connections(), 1);
        }
        assert_eq!(plc.open_connections(), 0);

        plc.refuse_connections(true);
        assert!(matches!(plc.connect(&params), Err(ConnectionError::Unreachable { .. })));
    }
}

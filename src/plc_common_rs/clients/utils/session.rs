use crate::plc_common_rs::clients::transport::{BlockTransport, ConnectionParams, Connector};
use crate::plc_common_rs::register::core::exceptions::ConnectionError;
use log::debug;
use std::ops::{Deref, DerefMut};

/// 1回の操作の間だけ有効な PLC セッション
///
/// ドロップ時に必ず切断する（エラー経路を含む）。
pub struct PlcSession<T: BlockTransport> {
    transport: T,
    params: ConnectionParams,
}

impl<T: BlockTransport> PlcSession<T> {
    pub fn open<C>(connector: &C, params: &ConnectionParams) -> Result<Self, ConnectionError>
    where
        C: Connector<Transport = T>,
    {
        debug!(
            "PLC に接続中: {} rack={} slot={}",
            params.address, params.rack, params.slot
        );
        let transport = connector.connect(params)?;
        let session = Self {
            transport,
            params: params.clone(),
        };
        if !session.transport.is_connected() {
            return Err(ConnectionError::NotConnected {
                address: params.address.clone(),
            });
        }
        debug!("PLC 接続成功: {}", params.address);
        Ok(session)
    }

    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }
}

impl<T: BlockTransport> Deref for PlcSession<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T: BlockTransport> DerefMut for PlcSession<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: BlockTransport> Drop for PlcSession<T> {
    fn drop(&mut self) {
        if self.transport.is_connected() {
            self.transport.disconnect();
            debug!("PLC から切断しました: {}", self.params.address);
        }
    }
}

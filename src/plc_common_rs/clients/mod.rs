/// PLC レジスタクライアント実装

pub mod async_register_client;
pub mod masked_writer;
pub mod register_client;
pub mod transport;
pub mod utils;
pub mod write_verifier;

// 便利な再エクスポート
pub use async_register_client::{AsyncRegisterOps, DispatchStats, SerializedRegisterClient};
pub use masked_writer::{plan_writes, prepare_groups, write_unit, PreparedByte, WriteUnit};
pub use register_client::{RegisterClient, RegisterClientConfig, RegisterOperations};
pub use transport::{BlockTransport, ConnectionParams, Connector};
pub use write_verifier::verify_unit;

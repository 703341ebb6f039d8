/// PLC Rust Implementation
/// データブロック7 (DB7) のレジスタマップ・コーデックと安全な部分書き込み

pub mod plc_common_rs;

// 便利な再エクスポート
pub mod prelude {
    pub use crate::plc_common_rs::clients::async_register_client::{AsyncRegisterOps, SerializedRegisterClient};
    pub use crate::plc_common_rs::clients::register_client::{RegisterClient, RegisterClientConfig, RegisterOperations};
    pub use crate::plc_common_rs::clients::transport::{BlockTransport, ConnectionParams, Connector};
    pub use crate::plc_common_rs::clients::utils::{ConfiguredConnector, ImageFileConnector, SimulatedPlc};
    pub use crate::plc_common_rs::register::core::{db7_schema, RegisterError, RegisterResult};
    pub use crate::plc_common_rs::register::types::{FieldValue, FieldValueSet, PidMode, VerificationResult, WriteIntent, WriteValue};
    pub use crate::plc_common_rs::utils::{ConfigLoader, OperationReport, PlcConfig};
}

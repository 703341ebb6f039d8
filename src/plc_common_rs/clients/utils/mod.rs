/// クライアント用ユーティリティ

pub mod configured;
pub mod image_file_transport;
pub mod session;
pub mod simulated_plc;

// 便利な再エクスポート
pub use configured::{ConfiguredConnector, ConfiguredTransport};
pub use image_file_transport::{ImageFileConnector, ImageFileTransport};
pub use session::PlcSession;
pub use simulated_plc::{SimulatedConnection, SimulatedPlc, TransportCall};

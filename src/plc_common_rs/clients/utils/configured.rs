//! 設定ファイルで選択する転送

use crate::plc_common_rs::clients::transport::{BlockTransport, ConnectionParams, Connector};
use crate::plc_common_rs::clients::utils::image_file_transport::{ImageFileConnector, ImageFileTransport};
use crate::plc_common_rs::clients::utils::simulated_plc::{SimulatedConnection, SimulatedPlc};
use crate::plc_common_rs::register::core::exceptions::{ConnectionError, TransportError};
use crate::plc_common_rs::register::core::field_schema::FieldSchema;
use crate::plc_common_rs::utils::config_loader::{ConfigError, PlcConfig, TransportKind};
use log::debug;

#[derive(Debug, Clone)]
pub enum ConfiguredConnector {
    Simulated(SimulatedPlc),
    ImageFile(ImageFileConnector),
}

impl ConfiguredConnector {
    pub fn from_config(config: &PlcConfig, schema: &FieldSchema) -> Result<Self, ConfigError> {
        let size = config.block.read_length;
        let initial = config.initial_image()?;
        let connector = match config.connection.transport {
            TransportKind::Simulated => {
                let mut image = initial.unwrap_or_default();
                image.resize(size.max(image.len()), 0);
                ConfiguredConnector::Simulated(SimulatedPlc::with_block(schema.block_id(), image))
            }
            TransportKind::ImageFile => {
                let connector = ImageFileConnector::new(&config.connection.image_path, schema.block_id(), size);
                ConfiguredConnector::ImageFile(match initial {
                    Some(image) => connector.with_initial_image(image),
                    None => connector,
                })
            }
        };
        debug!("転送を選択しました: {:?}", config.connection.transport);
        Ok(connector)
    }
}

impl Connector for ConfiguredConnector {
    type Transport = ConfiguredTransport;

    fn connect(&self, params: &ConnectionParams) -> Result<ConfiguredTransport, ConnectionError> {
        match self {
            ConfiguredConnector::Simulated(plc) => plc.connect(params).map(ConfiguredTransport::Simulated),
            ConfiguredConnector::ImageFile(file) => file.connect(params).map(ConfiguredTransport::ImageFile),
        }
    }
}

#[derive(Debug)]
pub enum ConfiguredTransport {
    Simulated(SimulatedConnection),
    ImageFile(ImageFileTransport),
}

impl BlockTransport for ConfiguredTransport {
    fn is_connected(&self) -> bool {
        match self {
            ConfiguredTransport::Simulated(t) => t.is_connected(),
            ConfiguredTransport::ImageFile(t) => t.is_connected(),
        }
    }

    fn read_block(&mut self, block_id: u16, offset: usize, length: usize) -> Result<Vec<u8>, TransportError> {
        match self {
            ConfiguredTransport::Simulated(t) => t.read_block(block_id, offset, length),
            ConfiguredTransport::ImageFile(t) => t.read_block(block_id, offset, length),
        }
    }

    fn write_block(&mut self, block_id: u16, offset: usize, data: &[u8]) -> Result<(), TransportError> {
        match self {
            ConfiguredTransport::Simulated(t) => t.write_block(block_id, offset, data),
            ConfiguredTransport::ImageFile(t) => t.write_block(block_id, offset, data),
        }
    }

    fn disconnect(&mut self) {
        match self {
            ConfiguredTransport::Simulated(t) => t.disconnect(),
            ConfiguredTransport::ImageFile(t) => t.disconnect(),
        }
    }
}

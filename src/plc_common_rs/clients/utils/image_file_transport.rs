//! ファイルに保存したブロックイメージを PLC の代わりに使う転送
//!
//! CLI を続けて実行しても前回の書き込みが見えるため、実機なしでの
//! 立ち上げ確認に使える。

use crate::plc_common_rs::clients::transport::{BlockTransport, ConnectionParams, Connector};
use crate::plc_common_rs::register::core::exceptions::{ConnectionError, TransportError};
use log::{debug, trace};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ImageFileConnector {
    path: PathBuf,
    block_id: u16,
    size: usize,
    initial_image: Option<Vec<u8>>,
}

impl ImageFileConnector {
    pub fn new<P: AsRef<Path>>(path: P, block_id: u16, size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            block_id,
            size,
            initial_image: None,
        }
    }

    /// ファイルがまだ無いときに書き込む初期内容
    pub fn with_initial_image(mut self, image: Vec<u8>) -> Self {
        self.initial_image = Some(image);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_image(&self) -> Result<(), String> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| format!("Failed to create image directory: {}", e))?;
            }
        }
        let mut image = self.initial_image.clone().unwrap_or_default();
        image.resize(self.size.max(image.len()), 0);
        fs::write(&self.path, &image).map_err(|e| format!("Failed to create block image: {}", e))?;
        debug!("ブロックイメージを作成しました: {:?} ({} bytes)", self.path, image.len());
        Ok(())
    }
}

impl Connector for ImageFileConnector {
    type Transport = ImageFileTransport;

    fn connect(&self, params: &ConnectionParams) -> Result<ImageFileTransport, ConnectionError> {
        self.ensure_image().map_err(|message| ConnectionError::Unreachable {
            address: params.address.clone(),
            rack: params.rack,
            slot: params.slot,
            message,
        })?;
        Ok(ImageFileTransport {
            path: self.path.clone(),
            block_id: self.block_id,
            connected: true,
        })
    }
}

#[derive(Debug)]
pub struct ImageFileTransport {
    path: PathBuf,
    block_id: u16,
    connected: bool,
}

impl ImageFileTransport {
    fn load(&self, block_id: u16, offset: usize, length: usize) -> Result<Vec<u8>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if block_id != self.block_id {
            return Err(TransportError::BlockNotFound(block_id));
        }
        let image = fs::read(&self.path).map_err(|e| TransportError::Comm {
            message: format!("Failed to read block image: {}", e),
        })?;
        if offset + length > image.len() {
            return Err(TransportError::OutOfBounds { block_id, offset, length });
        }
        Ok(image)
    }
}

impl BlockTransport for ImageFileTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read_block(&mut self, block_id: u16, offset: usize, length: usize) -> Result<Vec<u8>, TransportError> {
        let image = self.load(block_id, offset, length)?;
        let data = image[offset..offset + length].to_vec();
        trace!("IMAGE read DB{} {}+{}: {}", block_id, offset, length, hex::encode(&data));
        Ok(data)
    }

    fn write_block(&mut self, block_id: u16, offset: usize, data: &[u8]) -> Result<(), TransportError> {
        let mut image = self.load(block_id, offset, data.len())?;
        image[offset..offset + data.len()].copy_from_slice(data);
        fs::write(&self.path, &image).map_err(|e| TransportError::Comm {
            message: format!("Failed to write block image: {}", e),
        })?;
        trace!("IMAGE write DB{} {}: {}", block_id, offset, hex::encode(data));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}

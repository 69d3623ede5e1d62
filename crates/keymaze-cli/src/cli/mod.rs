pub mod commands;

use std::path::PathBuf;

use tracing::debug;

use crate::device::{ProtocolClient, SerialTransport};
use crate::error::{KeymazeError, Result};
use crate::models::{CatalogSummary, DeviceRecord};
use crate::storage::{open_store, KeymazeCache};

/// Output format for listing commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Cache backed by a watch on a serial port
pub type SerialCache = KeymazeCache<ProtocolClient<SerialTransport>>;

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub port: String,
    pub storage: PathBuf,
    pub offline: bool,
    pub format: OutputFormat,
}

impl Context {
    /// Open the store and, unless offline, the watch
    pub fn open_cache(&self) -> Result<SerialCache> {
        let db = open_store(&self.storage)?;
        debug!(storage = %self.storage.display(), "Store opened");

        let device = if self.offline {
            None
        } else {
            let transport = SerialTransport::open(&self.port).map_err(|e| match e {
                KeymazeError::Serial(err) => {
                    KeymazeError::config(format!("Cannot open {}: {}", self.port, err))
                }
                other => other,
            })?;
            Some(ProtocolClient::new(transport))
        };

        Ok(KeymazeCache::new(db, device))
    }

    /// Open the cache and resolve the tracked device and its catalog
    pub fn load_catalog(&self) -> Result<(SerialCache, DeviceRecord, Vec<CatalogSummary>)> {
        let mut cache = self.open_cache()?;
        let info = cache.get_information()?;
        let device = cache.get_device(&info.identity.serial_number)?;
        let catalog = cache.get_catalog(device)?;
        Ok((cache, info, catalog))
    }
}

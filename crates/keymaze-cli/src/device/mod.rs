//! Keymaze 500/700 device access
//!
//! - [`transport`]: byte channel to the watch (serial port)
//! - [`frame`]: request/response framing and checksums
//! - [`codec`]: fixed binary record layouts
//! - [`protocol`]: request/retry loop and the device operations

pub mod codec;
pub mod frame;
pub mod protocol;
pub mod transport;

pub use protocol::{ProtocolClient, Response};
pub use transport::{available_ports, PortInfo, SerialTransport, Transport};

use crate::error::Result;
use crate::models::{CatalogEntry, DeviceIdentity, TrackDownload};

/// Prefix byte and command codes of the serial protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSet {
    /// First byte of every request
    pub prefix: u8,
    /// List the activity catalog
    pub directory: u8,
    /// Start a point transfer (returns the track header)
    pub get_header: u8,
    /// Fetch the next batch of points
    pub get_next: u8,
    /// Read device and owner information
    pub get_info: u8,
    /// Response code ending a point transfer
    pub no_more_data: u8,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self {
            prefix: 0x02,
            directory: 0x78,
            get_header: 0x80,
            get_next: 0x81,
            get_info: 0x85,
            no_more_data: 0x8a,
        }
    }
}

/// Live source of device data, consulted by the cache to fill gaps
pub trait DeviceSource {
    fn get_information(&mut self) -> Result<DeviceIdentity>;

    fn get_catalog(&mut self) -> Result<Vec<CatalogEntry>>;

    fn get_track(&mut self, track: u16) -> Result<TrackDownload>;
}

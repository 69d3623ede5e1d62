//! Data models for Keymaze devices and activities

pub mod device;
pub mod track;

pub use device::{DeviceId, DeviceIdentity, DeviceRecord, Gender};
pub use track::{CatalogEntry, CatalogSummary, TrackDownload, TrackPoint, TrackTotals};

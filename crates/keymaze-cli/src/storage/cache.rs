//! Reconciliation between the watch and the local cache
//!
//! Every read is served from the cache. When a watch is attached it is only
//! consulted to fill gaps, and whatever it returns is remembered.

use std::collections::HashSet;

use tracing::{debug, info};

use super::cache_db::{CacheCounts, CacheDb};
use crate::device::DeviceSource;
use crate::error::{KeymazeError, Result};
use crate::models::{CatalogSummary, DeviceId, DeviceRecord, TrackPoint};

/// Cache of device data, optionally backed by a live watch
pub struct KeymazeCache<D> {
    db: CacheDb,
    device: Option<D>,
}

impl<D: DeviceSource> KeymazeCache<D> {
    /// Create a cache; pass `None` to work offline
    pub fn new(db: CacheDb, device: Option<D>) -> Self {
        Self { db, device }
    }

    /// Whether a live watch is attached
    pub fn is_online(&self) -> bool {
        self.device.is_some()
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn device_mut(&mut self) -> Option<&mut D> {
        self.device.as_mut()
    }

    fn require_device(&mut self) -> Result<&mut D> {
        self.device.as_mut().ok_or(KeymazeError::DeviceUnavailable)
    }

    /// Get the identity of the tracked device
    ///
    /// The attached watch is recorded the first time it is seen. Offline, the
    /// first recorded device is returned.
    pub fn get_information(&mut self) -> Result<DeviceRecord> {
        let serial = match self.device.as_mut() {
            Some(device) => {
                let identity = device.get_information()?;
                let serial = identity.serial_number.clone();
                if self.db.find_device(&serial)?.is_none() {
                    let id = self.db.insert_device(&identity)?;
                    info!(device = %id, serial = %serial, "New device recorded");
                }
                Some(serial)
            }
            None => None,
        };

        let record = match serial {
            Some(serial) => {
                let id = self.get_device(&serial)?;
                self.db.device(id)?
            }
            None => self.db.first_device()?,
        };
        record.ok_or(KeymazeError::NoDeviceDiscovered)
    }

    /// Get the cached id of a device by serial number
    pub fn get_device(&self, serial_number: &str) -> Result<DeviceId> {
        self.db
            .find_device(serial_number)?
            .ok_or_else(|| KeymazeError::NoSuchDevice(serial_number.to_string()))
    }

    /// Get the catalog of a device, merging in entries only the watch knows
    pub fn get_catalog(&mut self, device: DeviceId) -> Result<Vec<CatalogSummary>> {
        if let Some(source) = self.device.as_mut() {
            let known: HashSet<i64> = self.db.catalog_starts(device)?;
            let fresh: Vec<_> = source
                .get_catalog()?
                .into_iter()
                .filter(|entry| !known.contains(&entry.start))
                .collect();
            if !fresh.is_empty() {
                let inserted = self.db.insert_catalog_entries(device, &fresh)?;
                info!(device = %device, inserted, "Catalog entries cached");
            }
        }

        self.db.catalog(device)
    }

    /// Get the points of a track, downloading them if they are not cached
    pub fn get_trackpoints(&mut self, device: DeviceId, track: u16) -> Result<Vec<TrackPoint>> {
        if self.db.has_points(device, track)? {
            debug!(device = %device, track, "Track points served from cache");
            return self.db.points(device, track);
        }

        let download = self.require_device()?.get_track(track)?;
        let inserted = self.db.insert_points(device, track, &download.points)?;
        info!(device = %device, track, points = inserted, "Track points cached");
        Ok(download.points)
    }

    /// Download every track of `catalog` whose points are not cached yet
    ///
    /// `catalog` is a listing already obtained from [`Self::get_catalog`], so
    /// the watch is not asked for it again. Returns the refreshed catalog.
    pub fn sync_tracks(
        &mut self,
        device: DeviceId,
        catalog: &[CatalogSummary],
    ) -> Result<Vec<CatalogSummary>> {
        self.require_device()?;

        let missing: Vec<u16> = catalog
            .iter()
            .filter(|summary| !summary.is_cached())
            .map(|summary| summary.entry.track)
            .collect();

        info!(device = %device, tracks = missing.len(), "Syncing tracks");
        for track in missing {
            self.get_trackpoints(device, track)?;
        }

        self.db.catalog(device)
    }

    /// Row counts of the cache
    pub fn cache_status(&self) -> Result<CacheCounts> {
        self.db.counts()
    }
}

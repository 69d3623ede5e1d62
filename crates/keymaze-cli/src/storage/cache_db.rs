//! SQLite-backed, append-only cache of device data
//!
//! Three tables:
//! - dev_info: one row per watch, keyed by serial number
//! - tp_catalog: activity catalog entries, keyed by (device, start)
//! - tp_points: GPS samples, keyed by (device, track, point)
//!
//! Rows are only ever inserted. Batches are written in one transaction.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{KeymazeError, Result};
use crate::models::{
    CatalogEntry, CatalogSummary, DeviceId, DeviceIdentity, DeviceRecord, Gender, TrackPoint,
};

/// Row counts of the cache tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheCounts {
    pub devices: u32,
    pub catalog_entries: u32,
    pub points: u32,
}

/// SQLite database holding the cached device data
pub struct CacheDb {
    conn: Connection,
}

impl CacheDb {
    /// Open or create the cache database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| KeymazeError::Database(format!("Failed to open cache database: {}", e)))?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            KeymazeError::Database(format!("Failed to open in-memory database: {}", e))
        })?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Create the tables
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS dev_info (
                    device INTEGER PRIMARY KEY AUTOINCREMENT,
                    serialnumber TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    user TEXT NOT NULL,
                    gender TEXT NOT NULL,
                    age INTEGER NOT NULL,
                    weight INTEGER NOT NULL,
                    height INTEGER NOT NULL,
                    birthday TEXT
                );

                CREATE TABLE IF NOT EXISTS tp_catalog (
                    device INTEGER NOT NULL,
                    start INTEGER NOT NULL,
                    time INTEGER NOT NULL,
                    distance INTEGER NOT NULL,
                    kcal INTEGER NOT NULL,
                    maxspeed INTEGER NOT NULL,
                    maxheart INTEGER NOT NULL,
                    avgheart INTEGER NOT NULL,
                    cmlplus INTEGER NOT NULL,
                    cmlmin INTEGER NOT NULL,
                    track INTEGER NOT NULL,
                    id INTEGER NOT NULL,
                    UNIQUE (device, start)
                );

                CREATE TABLE IF NOT EXISTS tp_points (
                    device INTEGER NOT NULL,
                    track INTEGER NOT NULL,
                    point INTEGER NOT NULL,
                    lat INTEGER NOT NULL,
                    long INTEGER NOT NULL,
                    alt INTEGER NOT NULL,
                    speed INTEGER NOT NULL,
                    heart INTEGER NOT NULL,
                    delta INTEGER NOT NULL,
                    PRIMARY KEY (device, track, point)
                );
                "#,
            )
            .map_err(|e| KeymazeError::Database(format!("Failed to run migrations: {}", e)))?;

        Ok(())
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Get the device id recorded for a serial number
    pub fn find_device(&self, serial_number: &str) -> Result<Option<DeviceId>> {
        self.conn
            .query_row(
                "SELECT device FROM dev_info WHERE serialnumber = ?",
                params![serial_number],
                |row| row.get(0).map(DeviceId),
            )
            .optional()
            .map_err(|e| KeymazeError::Database(format!("Failed to get device: {}", e)))
    }

    /// Record a newly discovered device
    pub fn insert_device(&self, info: &DeviceIdentity) -> Result<DeviceId> {
        let birthday = info.birthday.map(|d| d.format("%Y-%m-%d").to_string());

        self.conn
            .execute(
                "INSERT INTO dev_info (serialnumber, name, user, gender, age, weight, height, birthday)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    info.serial_number,
                    info.name,
                    info.user,
                    info.gender.as_str(),
                    info.age,
                    info.weight,
                    info.height,
                    birthday,
                ],
            )
            .map_err(|e| KeymazeError::Database(format!("Failed to insert device: {}", e)))?;

        Ok(DeviceId(self.conn.last_insert_rowid()))
    }

    /// Get a device record by id
    pub fn device(&self, device: DeviceId) -> Result<Option<DeviceRecord>> {
        self.conn
            .query_row(
                "SELECT device, serialnumber, name, user, gender, age, weight, height, birthday
                 FROM dev_info WHERE device = ?",
                params![device.0],
                device_from_row,
            )
            .optional()
            .map_err(|e| KeymazeError::Database(format!("Failed to get device: {}", e)))
    }

    /// Get the first device ever recorded
    pub fn first_device(&self) -> Result<Option<DeviceRecord>> {
        self.conn
            .query_row(
                "SELECT device, serialnumber, name, user, gender, age, weight, height, birthday
                 FROM dev_info ORDER BY device ASC LIMIT 1",
                [],
                device_from_row,
            )
            .optional()
            .map_err(|e| KeymazeError::Database(format!("Failed to get device: {}", e)))
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Start times of every cached catalog entry of a device
    pub fn catalog_starts(&self, device: DeviceId) -> Result<HashSet<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT start FROM tp_catalog WHERE device = ?")
            .map_err(|e| KeymazeError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![device.0], |row| row.get::<_, i64>(0))
            .map_err(|e| KeymazeError::Database(format!("Failed to query catalog: {}", e)))?;

        rows.collect::<std::result::Result<HashSet<_>, _>>()
            .map_err(|e| KeymazeError::Database(e.to_string()))
    }

    /// Insert catalog entries in one transaction
    ///
    /// Entries whose start time is already cached for the device are left
    /// untouched. Returns the number of rows inserted.
    pub fn insert_catalog_entries(
        &mut self,
        device: DeviceId,
        entries: &[CatalogEntry],
    ) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| KeymazeError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO tp_catalog
                     (device, start, time, distance, kcal, maxspeed, maxheart, avgheart,
                      cmlplus, cmlmin, track, id)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(|e| KeymazeError::Database(format!("Failed to prepare insert: {}", e)))?;

            for e in entries {
                inserted += stmt
                    .execute(params![
                        device.0,
                        e.start,
                        e.time,
                        e.distance,
                        e.kcal,
                        e.max_speed,
                        e.max_heart,
                        e.avg_heart,
                        e.cumul_plus,
                        e.cumul_minus,
                        e.track,
                        e.index,
                    ])
                    .map_err(|err| {
                        KeymazeError::Database(format!("Failed to insert catalog entry: {}", err))
                    })?;
            }
        }

        tx.commit()
            .map_err(|e| KeymazeError::Database(format!("Failed to commit catalog: {}", e)))?;

        Ok(inserted)
    }

    /// Get all cached catalog entries of a device with their derived statistics
    pub fn catalog(&self, device: DeviceId) -> Result<Vec<CatalogSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT c.start, c.time, c.distance, c.kcal, c.maxspeed, c.maxheart, c.avgheart,
                        c.cmlplus, c.cmlmin, c.track, c.id,
                        p.alt_min, p.alt_max, p.delta_sum
                 FROM tp_catalog c
                 LEFT JOIN (
                     SELECT track, MIN(alt) AS alt_min, MAX(alt) AS alt_max, SUM(delta) AS delta_sum
                     FROM tp_points
                     WHERE device = ?1
                     GROUP BY track
                 ) p ON p.track = c.track
                 WHERE c.device = ?1
                 ORDER BY c.start ASC",
            )
            .map_err(|e| KeymazeError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![device.0], |row| {
                Ok(CatalogSummary {
                    device,
                    entry: CatalogEntry {
                        start: row.get(0)?,
                        time: row.get(1)?,
                        distance: row.get(2)?,
                        kcal: row.get(3)?,
                        max_speed: row.get(4)?,
                        max_heart: row.get(5)?,
                        avg_heart: row.get(6)?,
                        cumul_plus: row.get(7)?,
                        cumul_minus: row.get(8)?,
                        track: row.get(9)?,
                        index: row.get(10)?,
                    },
                    alt_min: row.get(11)?,
                    alt_max: row.get(12)?,
                    duration: row.get::<_, Option<i64>>(13)?.map(|tenths| tenths / 10),
                })
            })
            .map_err(|e| KeymazeError::Database(format!("Failed to query catalog: {}", e)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| KeymazeError::Database(e.to_string()))
    }

    // =========================================================================
    // Track points
    // =========================================================================

    /// Check whether any point is cached for a track
    pub fn has_points(&self, device: DeviceId, track: u16) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM tp_points WHERE device = ? AND track = ? LIMIT 1",
                params![device.0, track],
                |_| Ok(()),
            )
            .optional()
            .map(|row| row.is_some())
            .map_err(|e| KeymazeError::Database(format!("Failed to check points: {}", e)))
    }

    /// Insert the points of a track, numbered 1..=N in order, in one transaction
    pub fn insert_points(
        &mut self,
        device: DeviceId,
        track: u16,
        points: &[TrackPoint],
    ) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| KeymazeError::Database(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO tp_points
                     (device, track, point, lat, long, alt, speed, heart, delta)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(|e| KeymazeError::Database(format!("Failed to prepare insert: {}", e)))?;

            for (seq, p) in points.iter().enumerate() {
                stmt.execute(params![
                    device.0,
                    track,
                    seq as i64 + 1,
                    p.lat,
                    p.lon,
                    p.alt,
                    p.speed,
                    p.heart,
                    p.delta,
                ])
                .map_err(|e| KeymazeError::Database(format!("Failed to insert point: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| KeymazeError::Database(format!("Failed to commit points: {}", e)))?;

        Ok(points.len())
    }

    /// Get the cached points of a track, in sequence order
    pub fn points(&self, device: DeviceId, track: u16) -> Result<Vec<TrackPoint>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT lat, long, alt, speed, heart, delta FROM tp_points
                 WHERE device = ? AND track = ?
                 ORDER BY point ASC",
            )
            .map_err(|e| KeymazeError::Database(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![device.0, track], |row| {
                Ok(TrackPoint {
                    lat: row.get(0)?,
                    lon: row.get(1)?,
                    alt: row.get(2)?,
                    speed: row.get(3)?,
                    heart: row.get(4)?,
                    delta: row.get(5)?,
                })
            })
            .map_err(|e| KeymazeError::Database(format!("Failed to query points: {}", e)))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| KeymazeError::Database(e.to_string()))
    }

    // =========================================================================
    // Status
    // =========================================================================

    /// Count rows in every table
    pub fn counts(&self) -> Result<CacheCounts> {
        let count = |table: &str| -> Result<u32> {
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                    row.get(0)
                })
                .map_err(|e| KeymazeError::Database(format!("Failed to count {}: {}", table, e)))
        };

        Ok(CacheCounts {
            devices: count("dev_info")?,
            catalog_entries: count("tp_catalog")?,
            points: count("tp_points")?,
        })
    }
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<DeviceRecord> {
    Ok(DeviceRecord {
        device: DeviceId(row.get(0)?),
        identity: DeviceIdentity {
            serial_number: row.get(1)?,
            name: row.get(2)?,
            user: row.get(3)?,
            gender: Gender::parse(&row.get::<_, String>(4)?),
            age: row.get(5)?,
            weight: row.get(6)?,
            height: row.get(7)?,
            birthday: row
                .get::<_, Option<String>>(8)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        },
    })
}

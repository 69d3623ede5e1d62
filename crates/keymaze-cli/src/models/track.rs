//! Activity ("track") models
//!
//! These structures hold the activity data recovered from the watch: catalog
//! entries summarizing each activity, the totals header sent before a point
//! transfer, and the raw GPS samples themselves.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::device::DeviceId;

/// One recorded activity as listed in the watch catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Start time (epoch seconds), unique per device
    pub start: i64,

    /// Lap duration in seconds
    pub time: u32,

    /// Distance in meters
    pub distance: u32,

    /// Calories burned
    pub kcal: u16,

    pub max_speed: u16,

    pub max_heart: u8,

    pub avg_heart: u8,

    /// Cumulative time above the heart-rate zone
    pub cumul_plus: i16,

    /// Cumulative time below the heart-rate zone
    pub cumul_minus: i16,

    /// Device-assigned track id
    pub track: u16,

    /// Device-assigned display index (0-based)
    pub index: u16,
}

impl CatalogEntry {
    /// Track number as shown to the user (1-based)
    pub fn display_number(&self) -> u32 {
        u32::from(self.index) + 1
    }

    /// End time (epoch seconds)
    pub fn end(&self) -> i64 {
        self.start + i64::from(self.time)
    }

    /// Get distance in kilometers
    pub fn distance_km(&self) -> f64 {
        f64::from(self.distance) / 1000.0
    }

    /// Start time in the local timezone
    pub fn start_local(&self) -> Option<DateTime<Local>> {
        DateTime::from_timestamp(self.start, 0).map(|dt| dt.with_timezone(&Local))
    }
}

/// A catalog entry as cached, with statistics derived from its cached points
///
/// The derived fields are absent while the track points have not been
/// downloaded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub device: DeviceId,

    #[serde(flatten)]
    pub entry: CatalogEntry,

    /// Lowest altitude among cached points (meters)
    pub alt_min: Option<i32>,

    /// Highest altitude among cached points (meters)
    pub alt_max: Option<i32>,

    /// Sum of point deltas, in seconds
    pub duration: Option<i64>,
}

impl CatalogSummary {
    /// Whether the track points are present in the cache
    pub fn is_cached(&self) -> bool {
        self.alt_min.is_some() && self.alt_max.is_some()
    }

    /// Get duration formatted as HHhMMm
    pub fn duration_formatted(&self) -> String {
        match self.duration {
            Some(secs) => format!("{:02}h{:02}m", secs / 3600, (secs % 3600) / 60),
            None => "-".to_string(),
        }
    }
}

/// Totals announced by the watch before a point transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTotals {
    /// Stop time offset
    pub stop: u32,

    /// Total time in tenths of a second
    pub time: u32,

    /// Total distance in meters
    pub distance: u32,

    pub kcal: u16,

    pub max_speed: u16,

    pub max_heart: u8,

    pub avg_heart: u8,

    /// Number of points the watch is about to send
    pub point_count: u32,
}

/// One GPS sample as sent by the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Latitude, degrees x 1e6
    pub lat: i32,

    /// Longitude, degrees x 1e6
    pub lon: i32,

    /// Altitude in meters
    pub alt: i16,

    pub speed: u16,

    pub heart: u16,

    /// Time since the previous point, tenths of a second
    pub delta: u8,
}

/// Everything recovered by a full point transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDownload {
    pub entry: CatalogEntry,
    pub totals: TrackTotals,
    pub points: Vec<TrackPoint>,
}

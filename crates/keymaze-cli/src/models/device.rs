//! Device identity models
//!
//! A watch is identified by its serial number. The owner profile stored on
//! the watch is recorded once, the first time the device is seen.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row id of a device in the local cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub i64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owner gender as stored on the watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Decode the device flag byte (nonzero is female)
    pub fn from_flag(flag: u8) -> Self {
        if flag != 0 {
            Gender::Female
        } else {
            Gender::Male
        }
    }

    pub fn as_flag(self) -> u8 {
        match self {
            Gender::Male => 0,
            Gender::Female => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    /// Parse the stored text form, defaulting to male like the device flag does
    pub fn parse(s: &str) -> Self {
        match s {
            "female" => Gender::Female,
            _ => Gender::Male,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Device and owner information reported by the watch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Serial number (unique per watch)
    pub serial_number: String,

    /// Device display name
    pub name: String,

    /// Owner name
    pub user: String,

    pub gender: Gender,

    /// Age in years
    pub age: u8,

    /// Weight in kilograms
    pub weight: u8,

    /// Height in centimeters
    pub height: u8,

    /// Owner birth date, absent when the watch holds an impossible date
    pub birthday: Option<NaiveDate>,
}

/// A device identity as recorded in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device: DeviceId,
    #[serde(flatten)]
    pub identity: DeviceIdentity,
}

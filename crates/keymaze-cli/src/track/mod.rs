//! Post-processing of downloaded tracks
//!
//! Points are first trimmed to a time window, then reduced by dropping the
//! ones that do not change the heading noticeably.

mod reduce;
mod trim;

pub use reduce::{cartesian, reduce, turn_angle, GeoPoint, EARTH_RADIUS_M};
pub use trim::{parse_trims, trim, Anchor, TrimSpec};

//! Track export formats

pub mod gpx;

pub use self::gpx::{export_gpx, write_gpx};

pub mod catalog;
pub mod info;
pub mod ports;
pub mod sync;
pub mod track;

pub use catalog::show as show_catalog;
pub use info::show as show_info;
pub use ports::list as list_ports;
pub use sync::{run as sync_run, status as sync_status};
pub use track::{recover as recover_track, TrackOptions, TrackSelection};

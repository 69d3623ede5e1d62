pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod export;
pub mod models;
pub mod storage;
pub mod track;

pub use error::{KeymazeError, Result};

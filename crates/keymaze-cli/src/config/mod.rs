use crate::error::{KeymazeError, Result};
use std::path::{Path, PathBuf};

/// Default data directory name
const DATA_DIR_NAME: &str = "keymaze";

/// Cache database file name
const STORE_FILE_NAME: &str = "keymaze.sqlite";

/// Get the data directory path
/// Returns ~/.local/share/keymaze on Unix, ~/Library/Application Support/keymaze on macOS
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|p| p.join(DATA_DIR_NAME))
        .ok_or_else(|| KeymazeError::config("Could not determine data directory"))
}

/// Get the default cache database path
pub fn default_storage_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(STORE_FILE_NAME))
}

/// Serial port the PL-2303 cable usually shows up as
pub fn default_port() -> &'static str {
    if cfg!(windows) {
        "COM3"
    } else if cfg!(target_os = "macos") {
        "/dev/cu.usbserial"
    } else {
        "/dev/ttyUSB0"
    }
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

use thiserror::Error;

/// Faults raised while talking to the watch over the serial link
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No qualifying response header within the knock budget
    #[error("No answer from device")]
    NoAnswer,

    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Checksum error 0x{received:02x}/0x{computed:02x}")]
    Checksum { received: u8, computed: u8 },

    #[error("Missing data in response {expected} / {actual}")]
    MissingData { expected: usize, actual: usize },

    #[error("Unsupported record: {0}")]
    UnsupportedRecord(String),
}

/// Main error type for keymaze-cli
#[derive(Error, Debug)]
pub enum KeymazeError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("No device discovered yet. Connect the watch and run 'keymaze info' once.")]
    NoDeviceDiscovered,

    #[error("Device is not available")]
    DeviceUnavailable,

    #[error("No such device: {0}")]
    NoSuchDevice(String),

    #[error("Track {0} does not exist")]
    TrackNotFound(String),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Invalid trim format \"{0}\". Expected [+-][HH:][MM:]SS")]
    InvalidTrim(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, KeymazeError>;

impl KeymazeError {
    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid parameter error from a message
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Whether the user may simply retry the command (the watch did not answer,
    /// as opposed to answering with something structurally wrong)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::NoAnswer))
    }
}

/// Render an error for the terminal, with a hint when one helps
pub fn format_user_error(err: &KeymazeError) -> String {
    match err {
        KeymazeError::Protocol(ProtocolError::NoAnswer) => {
            format!("{}. Is the watch switched on and in PC mode?", err)
        }
        KeymazeError::DeviceUnavailable => {
            format!("{} (track is not cached, retry without --offline)", err)
        }
        _ => err.to_string(),
    }
}

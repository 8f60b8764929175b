/// Result alias that carries the custom [`BarTakeError`] type.
pub type Result<T> = std::result::Result<T, BarTakeError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BarTakeError {
    /// The uploaded bytes could not be decoded into a track.
    #[error("could not decode audio: {0}")]
    Decode(String),
    /// The host refused access to the capture device.
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),
    /// No capture device exists, or the host lacks the capability.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    /// A caller handed an argument outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Starting or finalising a recording failed.
    #[error("recording failed: {0}")]
    Recording(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl BarTakeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for BarTakeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BarTakeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<serde_json::Error> for BarTakeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Message(format!("invalid configuration: {value}"))
    }
}

impl From<symphonia::core::errors::Error> for BarTakeError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

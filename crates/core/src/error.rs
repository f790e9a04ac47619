/// Result alias that carries the custom [`TimelineError`] type.
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Common error type for the core crate.
///
/// The engine itself only ever reports [`TimelineError::LoadTimeout`]; the
/// remaining variants come from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// Assets did not report ready before the loading deadline elapsed.
    #[error("assets were not ready within {timeout_ms} ms")]
    LoadTimeout { timeout_ms: u64 },
    /// Invalid configuration value.
    #[error("{0}")]
    Config(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON configuration.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl TimelineError {
    /// Creates a configuration error that simply wraps the provided message.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }
}

impl From<&str> for TimelineError {
    fn from(value: &str) -> Self {
        Self::config(value)
    }
}

impl From<String> for TimelineError {
    fn from(value: String) -> Self {
        Self::Config(value)
    }
}

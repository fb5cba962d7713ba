//! Error types shared across handsense crates.

/// Top-level error type for handsense operations.
///
/// The interpretation pipeline itself degrades on malformed data instead of
/// erroring (see the crate docs of `handsense-interpret-core`); this type
/// covers the host-facing surfaces that can genuinely fail, such as loading
/// and saving tuning configuration.
#[derive(Debug, thiserror::Error)]
pub enum HandsenseError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Engine error: {message}")]
    Engine { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using HandsenseError.
pub type HandsenseResult<T> = Result<T, HandsenseError>;

impl HandsenseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine {
            message: msg.into(),
        }
    }
}

//! Logging configuration shared by handsense hosts.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How a host wants its tracing output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level filter directives, `RUST_LOG` syntax
    /// (for example `"info"` or `"handsense=debug,warn"`).
    pub level: String,

    /// Emit structured JSON lines instead of human-readable output.
    pub json: bool,

    /// Write to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Default configuration at a different level.
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_partial_deserialization() {
        let config: LoggingConfig = serde_json::from_str(r#"{"json":true}"#).unwrap();
        assert!(config.json);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_with_level() {
        let config = LoggingConfig::with_level("handsense=trace");
        assert_eq!(config.level, "handsense=trace");
        assert!(!config.json);
    }
}

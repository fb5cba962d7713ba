//! Tracing subscriber setup for handsense hosts.
//!
//! Libraries in this workspace only emit `tracing` events; installing a
//! subscriber is the host's job. `init_logging` wires the configured
//! level, format, and sink, with `RUST_LOG` taking precedence over the
//! configured level when set.

use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global tracing subscriber per the given configuration.
///
/// Safe to call more than once; later calls leave the first subscriber
/// in place.
pub fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_sink = config.file.as_ref().and_then(|path| match File::create(path) {
        Ok(file) => Some(Arc::new(file)),
        Err(error) => {
            eprintln!("cannot open log file {}: {error}", path.display());
            None
        }
    });

    if config.json {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .json();
        match file_sink {
            Some(sink) => {
                let subscriber = builder.with_writer(sink).finish();
                tracing::subscriber::set_global_default(subscriber).ok();
            }
            None => {
                tracing::subscriber::set_global_default(builder.finish()).ok();
            }
        }
    } else {
        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true);
        match file_sink {
            Some(sink) => {
                let subscriber = builder.with_ansi(false).with_writer(sink).finish();
                tracing::subscriber::set_global_default(subscriber).ok();
            }
            None => {
                tracing::subscriber::set_global_default(builder.finish()).ok();
            }
        }
    }
}

/// Install a plain, info-level subscriber.
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}

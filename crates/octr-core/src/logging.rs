//! Logging initialization

use crate::config::{DebugConfig, LogLevel};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

impl LogLevel {
    /// Default filter directive when `RUST_LOG` is not set
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Must only be
/// called once per process.
pub fn init(config: &DebugConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.directive()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.log_to_file {
        let file = std::fs::File::create(&config.log_path)?;
        builder.with_ansi(false).with_writer(Arc::new(file)).init();
    } else {
        builder.init();
    }

    tracing::info!("Logging initialized at {:?}", config.log_level);
    Ok(())
}

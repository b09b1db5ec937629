//! Logging setup
//!
//! The crate logs through the `log` facade. [`init_logging`] installs
//! `env_logger` with the configured level; `RUST_LOG` still wins when set.

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use log::LevelFilter;
use std::str::FromStr;

/// Install the global logger
///
/// Calling this again after a logger is installed does nothing.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    config.validate()?;
    let level = LevelFilter::from_str(&config.level)
        .map_err(|_| anyhow!("invalid log level: {}", config.level))?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_module_path(false);
    if config.timestamps {
        builder.format_timestamp_millis();
    } else {
        builder.format_timestamp(None);
    }
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    // Already initialized elsewhere (tests, embedding apps)
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_rejects_unknown_level() {
        let config = LoggingConfig { level: "chatty".to_string(), ..Default::default() };
        assert!(init_logging(&config).is_err());
    }
}

//! Monitoring module for the WPS engine.
//!
//! Only structured logging is provided: a `tracing` subscriber with an
//! environment filter and a pretty or JSON formatter.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

pub mod logging;

pub use logging::{init_logging, LogExt};

/// Configuration for initializing the monitoring system
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringConfig {
    /// Service name attached to the startup record
    pub service_name: String,
    /// Log level filter (e.g., "info,wps_core=debug"), overridden by `RUST_LOG`
    pub log_filter: String,
    /// Emit JSON records instead of pretty text
    pub enable_json_logging: bool,
    /// Also append JSON records to this file, rotated daily
    pub log_file: Option<PathBuf>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: "wps".to_string(),
            log_filter: "info".to_string(),
            enable_json_logging: false,
            log_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MonitoringConfig::default();
        assert_eq!(config.service_name, "wps");
        assert_eq!(config.log_filter, "info");
        assert!(!config.enable_json_logging);
        assert!(config.log_file.is_none());
    }
}

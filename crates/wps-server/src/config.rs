//! Configuration for the WPS server
//!
//! Values come from an optional YAML file named by `WPS_CONFIG_FILE`, then
//! from `WPS_*` environment variables, then from the defaults below.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use wps_core::{CoordinatorConfig, ProtocolVersion};
use wps_monitoring::MonitoringConfig;

use crate::error::{ServerError, ServerResult};

/// Environment variable naming the configuration file
pub const CONFIG_FILE_VAR: &str = "WPS_CONFIG_FILE";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Protocol versions process descriptions are checked against
    #[serde(default = "default_protocol_versions")]
    pub protocol_versions: Vec<String>,

    /// Identifiers of the processes to register, in order
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<String>,

    /// How long finished jobs stay queryable
    #[serde(default = "default_job_retention_seconds")]
    pub job_retention_seconds: u64,

    /// How often expired jobs are evicted
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Prefix of by-reference output locations
    #[serde(default = "default_reference_base_url")]
    pub reference_base_url: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log records
    #[serde(default)]
    pub json_logging: bool,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_protocol_versions() -> Vec<String> {
    ProtocolVersion::ALL
        .iter()
        .map(|v| v.as_str().to_string())
        .collect()
}

fn default_algorithms() -> Vec<String> {
    wps_stdlib::factory::STANDARD_PROCESSES
        .iter()
        .map(|id| id.to_string())
        .collect()
}

fn default_job_retention_seconds() -> u64 {
    3600 // 1 hour
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_reference_base_url() -> String {
    "http://localhost:8080/wps/jobs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

impl ServerConfig {
    /// Load configuration from the optional config file and environment variables.
    ///
    /// Logging is not set up yet at this point, so problems that do not stop
    /// the load are returned as warnings for the caller to log.
    pub fn load() -> ServerResult<(Self, Vec<String>)> {
        let mut config = match env::var(CONFIG_FILE_VAR) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        let mut warnings = config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;

        if config.algorithms.is_empty() {
            warnings.push("No algorithms configured - the registry will be empty!".to_string());
        }
        Ok((config, warnings))
    }

    /// Read a YAML configuration file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Override values from `WPS_*` variables resolved through `lookup`.
    ///
    /// Unparseable values are ignored and described in the returned warnings.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        if let Some(versions) = lookup("WPS_PROTOCOL_VERSIONS") {
            self.protocol_versions = split_list(&versions);
        }

        if let Some(algorithms) = lookup("WPS_ALGORITHMS") {
            self.algorithms = split_list(&algorithms);
        }

        if let Some(retention) = lookup("WPS_JOB_RETENTION_SECONDS") {
            if let Ok(seconds) = retention.parse::<u64>() {
                self.job_retention_seconds = seconds;
            } else {
                warnings.push(format!("Invalid WPS_JOB_RETENTION_SECONDS value: {}", retention));
            }
        }

        if let Some(interval) = lookup("WPS_SWEEP_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                self.sweep_interval_seconds = seconds;
            } else {
                warnings.push(format!("Invalid WPS_SWEEP_INTERVAL_SECONDS value: {}", interval));
            }
        }

        if let Some(base) = lookup("WPS_REFERENCE_BASE_URL") {
            self.reference_base_url = base;
        }

        if let Some(log_level) = lookup("WPS_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Some(json) = lookup("WPS_JSON_LOGGING") {
            self.json_logging = json.eq_ignore_ascii_case("true") || json == "1";
        }

        if let Some(log_file) = lookup("WPS_LOG_FILE") {
            self.log_file = (!log_file.is_empty()).then(|| PathBuf::from(log_file));
        }

        warnings
    }

    /// Check values that cannot be repaired with a default
    pub fn validate(&self) -> ServerResult<()> {
        if self.sweep_interval_seconds == 0 {
            return Err(ServerError::ConfigError(
                "Sweep interval must be at least one second".to_string(),
            ));
        }
        self.supported_versions()?;
        Ok(())
    }

    /// Parsed protocol versions
    pub fn supported_versions(&self) -> ServerResult<Vec<ProtocolVersion>> {
        if self.protocol_versions.is_empty() {
            return Err(ServerError::ConfigError(
                "At least one protocol version is required".to_string(),
            ));
        }
        self.protocol_versions
            .iter()
            .map(|v| {
                v.parse::<ProtocolVersion>()
                    .map_err(|e| ServerError::ConfigError(e.to_string()))
            })
            .collect()
    }

    /// Interval between retention sweeps
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Settings for the execution coordinator
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            retention: Duration::from_secs(self.job_retention_seconds),
            reference_base: self.reference_base_url.clone(),
        }
    }

    /// Settings for logging
    pub fn monitoring_config(&self) -> MonitoringConfig {
        MonitoringConfig {
            service_name: "wps-server".to_string(),
            log_filter: self.log_level.clone(),
            enable_json_logging: self.json_logging,
            log_file: self.log_file.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            protocol_versions: default_protocol_versions(),
            algorithms: default_algorithms(),
            job_retention_seconds: default_job_retention_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
            reference_base_url: default_reference_base_url(),
            log_level: default_log_level(),
            json_logging: false,
            log_file: None,
        }
    }
}

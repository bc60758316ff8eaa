// ============================================================================
// CONFIGURATION SYSTEM
// ============================================================================
// TOML file with `COLLATE_` environment overrides, validated after load.
// Nothing here changes extraction semantics; it only shapes how the CLI
// logs and writes reports.
// ============================================================================

use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ENV_PREFIX;

/// Accepted `logging.level` values
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Accepted `logging.format` values
pub const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

// ----------------------------------------------------------------------------
// 5.1 Root Configuration
// ----------------------------------------------------------------------------

/// Root configuration for the collate tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollateConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

impl CollateConfig {
    /// Load configuration from file with environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let config: Self = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from string (for testing)
    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::invalid_value(
                "logging.format",
                format!("expected one of {}", LOG_FORMATS.join(", ")),
            ));
        }

        Ok(())
    }

    pub fn generate_default_config() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

// ----------------------------------------------------------------------------
// 5.2 Report Configuration
// ----------------------------------------------------------------------------

/// How reports are assembled and written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Order samples by time before extraction
    #[serde(default = "default_true")]
    pub sort_by_time: bool,

    /// Pretty-print the JSON report
    #[serde(default)]
    pub pretty: bool,

    /// Include prefix groups for the series form
    #[serde(default = "default_true")]
    pub include_groups: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sort_by_time: true,
            pretty: false,
            include_groups: true,
        }
    }
}

// ----------------------------------------------------------------------------
// 5.3 Logging Configuration
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable ANSI colors
    #[serde(default = "default_true")]
    pub colors: bool,

    /// Include source location
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            colors: true,
            source_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "compact".into()
}

fn default_true() -> bool {
    true
}

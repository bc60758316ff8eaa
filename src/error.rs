// ============================================================================
// ERROR HANDLING FRAMEWORK
// ============================================================================
// Data-shape problems inside a sample never surface here: the extractor
// degrades them to "contributes nothing". These types cover the conditions
// a caller has to act on: bad preconditions, unreadable input, bad config.
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

// ----------------------------------------------------------------------------
// Root Error
// ----------------------------------------------------------------------------

/// The main error type for the collate engine.
/// All subsystem errors can be converted to this type.
#[derive(Error, Debug)]
pub enum CollateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CollateError {
    /// Check if retrying with different input could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            CollateError::Config(_) => false,
            CollateError::Input(e) => e.is_recoverable(),
            CollateError::Extract(_) => true,
            CollateError::Io(_) => true,
            CollateError::Json(_) => true,
            CollateError::Internal(_) => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            CollateError::Config(_) => "config",
            CollateError::Input(_) => "input",
            CollateError::Extract(_) => "extract",
            CollateError::Io(_) => "io",
            CollateError::Json(_) => "json",
            CollateError::Internal(_) => "internal",
        }
    }
}

/// Result alias used across the crate
pub type CollateResult<T> = Result<T, CollateError>;

// ----------------------------------------------------------------------------
// Extraction Errors
// ----------------------------------------------------------------------------

/// Precondition violations of `SeriesExtractor::extract`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Sample sequence is empty")]
    EmptyInput,

    #[error("Baseline sample carries no usable time")]
    BaselineWithoutTime,
}

// ----------------------------------------------------------------------------
// Input Errors
// ----------------------------------------------------------------------------

/// Errors reading a results stream
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Malformed result record at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("No record in the results carries deviceInfo")]
    MissingDeviceInfo,

    #[error("Results stream contains no records")]
    Empty,
}

impl InputError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        InputError::Malformed {
            line,
            message: message.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        !matches!(self, InputError::Empty)
    }
}

// ----------------------------------------------------------------------------
// Configuration Errors
// ----------------------------------------------------------------------------

/// Errors related to configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            message: message.into(),
        }
    }
}

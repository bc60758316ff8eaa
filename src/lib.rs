//! # Collate Engine - Memory Stress Test Charting Core
//!
//! Converts the telemetry stream recorded by a memory stress test into the
//! pieces a chart needs: discovered numeric series, a row table aligned to
//! those series, point annotations and highlighted time intervals.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                            COLLATE ENGINE                                    │
//! ├─────────────────────────────────────────────────────────────────────────────┤
//! │  RESULTS FILE → SAMPLES → SERIES EXTRACTOR (fold) → EXTRACTION → REPORT     │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The extractor is a pure, single-pass fold. Drawing, visibility toggles and
//! their persistence belong to the rendering layer that consumes the report.
//!
//! ## Example
//!
//! ```
//! use collate_engine::{Sample, SeriesExtractor};
//! use serde_json::json;
//!
//! let baseline = Sample::from(json!({"metrics": {"meta": {"time": 1000}}}));
//! let samples = vec![Sample::from(json!({
//!     "metrics": {"meta": {"time": 3000}, "summary": {"total-pss": 2097152}}
//! }))];
//!
//! let extraction = SeriesExtractor::default().extract(&samples, &baseline).unwrap();
//! assert_eq!(extraction.fields, vec!["Time", "summary/total-pss"]);
//! assert_eq!(extraction.rows, vec![vec![2.0, 2.0]]);
//! ```

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod annotation;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod interval;
pub mod logging;
pub mod report;
pub mod results;
pub mod sample;
pub mod series;

pub use annotation::{trim_level_name, Annotation};
pub use config::{CollateConfig, LoggingConfig, ReportConfig};
pub use error::{CollateError, CollateResult, ConfigError, ExtractError, InputError};
pub use extract::{ExtractState, Extraction, SeriesExtractor};
pub use interval::{Interval, IntervalCategory, IntervalTracker, IntervalTrackers};
pub use report::{ChartReport, SeriesGroup};
pub use results::{parse_results, ResultSet};
pub use sample::{Advice, DeviceInfo, MetricsPayload, Sample, SampleFlags, Timestamp, Warning};
pub use series::{Axis, Series, SeriesTable};

// ============================================================================
// CONSTANTS & VERSION INFORMATION
// ============================================================================

/// Engine version - follows semantic versioning
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const ENGINE_NAME: &str = "collate-engine";
pub const ENGINE_FULL_NAME: &str = "Collate Memory Report Engine";

// ----------------------------------------------------------------------------
// Series Naming
// ----------------------------------------------------------------------------

/// Label of column 0 in every row
pub const TIME_FIELD: &str = "Time";

/// Derived series holding the bytes the test itself allocated
pub const APPLICATION_ALLOCATED: &str = "applicationAllocated";

/// Series that map-tester annotations are pinned to
pub const NATIVE_ALLOCATED: &str = "nativeAllocated";

/// Prefix for series derived from advice predictions
pub const PREDICTION_PREFIX: &str = "prediction_";

/// The one field reported in its own units rather than bytes
pub const OOM_SCORE_FIELD: &str = "proc/oom_score";

// ----------------------------------------------------------------------------
// Units
// ----------------------------------------------------------------------------

/// Divisor applied to byte-valued fields when writing rows
pub const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Source timestamps are milliseconds; rows are in seconds
pub const MILLIS_PER_SECOND: f64 = 1000.0;

// ----------------------------------------------------------------------------
// Styling
// ----------------------------------------------------------------------------

/// Stroke width for fields named in the device heuristics
pub const HEURISTIC_STROKE_WIDTH: u32 = 3;

/// Stroke width for the application-allocated series
pub const PRIMARY_STROKE_WIDTH: u32 = 4;

/// Color for the application-allocated series
pub const PRIMARY_COLOR: &str = "black";

/// Default configuration file looked up by the CLI
pub const DEFAULT_CONFIG_PATH: &str = "collate.toml";

/// Prefix for environment overrides of configuration values
pub const ENV_PREFIX: &str = "COLLATE_";

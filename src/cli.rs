// ============================================================================
// CLI & COMMAND LINE INTERFACE
// ============================================================================

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::CollateConfig;
use crate::error::CollateResult;
use crate::extract::SeriesExtractor;
use crate::report::ChartReport;
use crate::results::ResultSet;
use crate::{DEFAULT_CONFIG_PATH, ENGINE_FULL_NAME, ENGINE_VERSION};

// ----------------------------------------------------------------------------
// 8.1 CLI Argument Parser
// ----------------------------------------------------------------------------

/// Collate CLI
#[derive(Parser, Debug)]
#[command(
    name = "collate",
    version,
    about = "Turn memory stress-test results into chart-ready reports",
    long_about = "Reads the records written by a memory stress test, discovers the \
                  numeric series they report and emits a JSON report of series, rows, \
                  annotations and highlighted intervals for a charting front end."
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "COLLATE_CONFIG")]
    pub config: PathBuf,

    /// Log level override
    #[arg(short, long, env = "COLLATE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a chart report from a results file
    Extract {
        /// Results file (JSON array or one JSON record per line)
        input: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,

        /// Keep records in file order
        #[arg(long)]
        no_sort: bool,
    },

    /// Validate configuration file
    Validate {
        /// Show full parsed configuration
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version and build info
    Version,
}

// ----------------------------------------------------------------------------
// 8.2 CLI Handler Functions
// ----------------------------------------------------------------------------

/// Handle the extract subcommand
pub fn handle_extract(
    config: &CollateConfig,
    input: &Path,
    output: Option<&Path>,
    pretty: bool,
    no_sort: bool,
) -> CollateResult<()> {
    let sort = config.report.sort_by_time && !no_sort;
    let results = ResultSet::load(input, sort)?;
    let device_info = results.require_device_info()?;

    let extraction =
        SeriesExtractor::for_device(device_info).extract(&results.samples, &device_info.baseline)?;

    info!(
        input = %input.display(),
        series = extraction.series.len(),
        rows = extraction.rows.len(),
        annotations = extraction.annotations.len(),
        intervals = extraction.intervals.len(),
        skipped = extraction.skipped_samples,
        "Extracted chart data"
    );

    let report = ChartReport::build(&results, extraction, config.report.include_groups);
    let json = report.to_json(pretty || config.report.pretty)?;

    match output {
        Some(path) => {
            fs::write(path, json)?;
            info!(output = %path.display(), "Report written");
        }
        None => println!("{}", json),
    }
    Ok(())
}

/// Handle the validate subcommand
pub fn handle_validate(config_path: &Path, verbose: bool) -> CollateResult<()> {
    println!("Validating configuration file: {}", config_path.display());

    let config = CollateConfig::load(config_path)?;
    println!("✅ Configuration is valid!");

    if verbose {
        println!("\n📋 Parsed configuration:");
        println!("{}", "=".repeat(60));
        match toml::to_string_pretty(&config) {
            Ok(s) => println!("{}", s),
            Err(e) => println!("Failed to serialize: {}", e),
        }
    }
    Ok(())
}

/// Handle the generate-config subcommand
pub fn handle_generate_config(output: Option<&Path>) -> CollateResult<()> {
    let config_str = CollateConfig::generate_default_config();

    match output {
        Some(path) => {
            fs::write(path, &config_str)?;
            println!("✅ Default configuration written to: {}", path.display());
        }
        None => println!("{}", config_str),
    }
    Ok(())
}

fn version_info() -> String {
    format!(
        "{} v{}\n\nBuild Information:\n  • Arch: {}\n  • OS: {}",
        ENGINE_FULL_NAME,
        ENGINE_VERSION,
        std::env::consts::ARCH,
        std::env::consts::OS
    )
}

/// Handle the version subcommand
pub fn handle_version() {
    println!("{}", version_info());
}

// ============================================================================
// LOGGING & TRACING INFRASTRUCTURE
// ============================================================================

use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{CollateError, CollateResult};

fn level_filter(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Initialize the global subscriber. `RUST_LOG` directives take precedence
/// over the configured level. Logs go to stderr so reports can be piped.
pub fn init_logging(config: &LoggingConfig) -> CollateResult<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter(&config.level).into())
        .from_env_lossy();

    let result = match config.format.as_str() {
        "json" => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location),
            ),
        ),
        "pretty" => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.colors)
                    .with_target(true)
                    .with_file(config.source_location)
                    .with_line_number(config.source_location),
            ),
        ),
        _ => tracing::subscriber::set_global_default(
            tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_ansi(config.colors)
                    .with_target(true),
            ),
        ),
    };
    result.map_err(|e| CollateError::Internal(format!("Failed to set logger: {}", e)))?;

    info!(
        target: "collate::init",
        level = %config.level,
        format = %config.format,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_parsing() {
        assert_eq!(level_filter("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(level_filter("warning"), LevelFilter::WARN);
        assert_eq!(level_filter("nonsense"), LevelFilter::INFO);
    }
}

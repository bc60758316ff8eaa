use anyhow::{Context, Result};
use clap::Parser;
use tracing::warn;

use collate_engine::cli::{
    handle_extract, handle_generate_config, handle_validate, handle_version, Cli, Commands,
};
use collate_engine::logging::init_logging;
use collate_engine::CollateConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle subcommands that don't need full initialization
    match &cli.command {
        Commands::Version => {
            handle_version();
            return Ok(());
        }
        Commands::GenerateConfig { output } => {
            handle_generate_config(output.as_deref())?;
            return Ok(());
        }
        Commands::Validate { verbose } => {
            handle_validate(&cli.config, *verbose)
                .with_context(|| format!("Invalid config at {}", cli.config.display()))?;
            return Ok(());
        }
        Commands::Extract { .. } => {}
    }

    let config_found = cli.config.exists();
    let mut config = if config_found {
        CollateConfig::load(&cli.config)
            .with_context(|| format!("Failed to load config from {}", cli.config.display()))?
    } else {
        CollateConfig::default()
    };

    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.debug {
        config.logging.level = "debug".into();
    }
    init_logging(&config.logging)?;

    if !config_found {
        warn!("Config file not found at {}, using defaults", cli.config.display());
    }

    if let Commands::Extract {
        input,
        output,
        pretty,
        no_sort,
    } = &cli.command
    {
        handle_extract(&config, input, output.as_deref(), *pretty, *no_sort)
            .with_context(|| format!("Failed to build report from {}", input.display()))?;
    }

    Ok(())
}

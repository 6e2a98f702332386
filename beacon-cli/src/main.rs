//! Beacon CLI

use anyhow::{bail, Context, Result};
use beacon_config::{load_config, load_default, Config, LogFormat};
use beacon_css::{minify_targets, Purger};
use beacon_runtime::{ServerBuilder, SignalHandler};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "Static site server with response compression", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the site (start the server)
    Serve {
        /// Path to configuration file; defaults apply when omitted
        #[arg(short, long, env = "BEACON_CONFIG")]
        config: Option<PathBuf>,

        /// Log level or filter directive, overrides the configuration
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "beacon.yaml")]
        config: PathBuf,
    },

    /// Minify the configured stylesheets
    MinifyCss {
        /// Path to configuration file; defaults apply when omitted
        #[arg(short, long, env = "BEACON_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Remove selectors the site's pages never use
    PurgeCss {
        /// Path to configuration file; defaults apply when omitted
        #[arg(short, long, env = "BEACON_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, log_level } => {
            let config = load(config.as_deref())?;
            let level = log_level.unwrap_or_else(|| config.logging.level.clone());
            init_tracing(&level, config.logging.format)?;

            tracing::info!(
                listen = %config.server.listen,
                site_root = %config.server.site_root.display(),
                "Configuration loaded"
            );

            let server = ServerBuilder::new().config(config).build()?;

            let shutdown_signal = server.shutdown_signal();
            tokio::spawn(async move {
                let handler = SignalHandler::new(shutdown_signal);
                handler.run().await;
            });

            server.run().await?;
            Ok(())
        }

        Commands::Validate { config: path } => {
            init_tracing("info", LogFormat::Text)?;

            tracing::info!(path = %path.display(), "Validating configuration");

            match load_config(&path) {
                Ok(cfg) => {
                    tracing::info!(
                        listen = %cfg.server.listen,
                        site_root = %cfg.server.site_root.display(),
                        compression = cfg.compression.enabled,
                        critical_resources = cfg.assets.critical_resources.len(),
                        minify_targets = cfg.css.minify.len(),
                        "Configuration is valid"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(error = %e, "Configuration validation failed");
                    std::process::exit(1);
                }
            }
        }

        Commands::MinifyCss { config } => {
            let config = load(config.as_deref())?;
            init_tracing(&config.logging.level, config.logging.format)?;

            let summary = minify_targets(&config.css.minify, &config.server.site_root);
            for report in &summary.reports {
                println!(
                    "{} -> {}: {} -> {} bytes ({:.2}% smaller)",
                    report.input.display(),
                    report.output.display(),
                    report.before_bytes,
                    report.after_bytes,
                    report.reduction_percent()
                );
            }
            println!(
                "Total: {} -> {} bytes ({:.2}% smaller)",
                summary.total_before(),
                summary.total_after(),
                summary.total_reduction_percent()
            );

            if !summary.failures.is_empty() {
                bail!("{} stylesheet(s) could not be minified", summary.failures.len());
            }
            Ok(())
        }

        Commands::PurgeCss { config } => {
            let config = load(config.as_deref())?;
            init_tracing(&config.logging.level, config.logging.format)?;

            let purge = &config.css.purge;
            let purger = Purger::from_config(purge, &config.server.site_root)?;
            let reports = purger
                .purge_to_dir(&purge.css, &purge.output)
                .context("CSS purge failed")?;

            for report in &reports {
                println!(
                    "{} -> {}: {} -> {} bytes ({:.2}% smaller)",
                    report.file.display(),
                    report.output.display(),
                    report.original_bytes,
                    report.purged_bytes,
                    report.reduction_percent()
                );
            }
            Ok(())
        }

        Commands::Version => {
            println!("Beacon static site server");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

/// Load the configuration file, or defaults with the port from `PORT`
fn load(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => load_default().context("Failed to build default configuration")?,
    };
    Ok(config)
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("Invalid log level '{level}'"))?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .try_init()?,
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true),
            )
            .try_init()?,
    }

    Ok(())
}

//! Lectern CLI
//!
//! Main entry point for the lectern command-line tool.
//! Provides commands for indexing the reference library, retrieval,
//! provider inspection, grounded day composition and usage reporting.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{ComposeCommand, CorpusCommand, ProvidersCommand, RetrieveCommand, UsageCommand};
use lectern_core::logging::{self, LogFormat};
use lectern_core::config::AppConfig;
use std::path::PathBuf;

/// Lectern - grounded devotional composition from a reference library
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(about = "Grounded composition from a local reference library", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LECTERN_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LECTERN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LECTERN_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reference library indexing and statistics
    Corpus(CorpusCommand),

    /// Rank reference chunks for a topic
    Retrieve(RetrieveCommand),

    /// Show which generation providers are usable
    Providers(ProvidersCommand),

    /// Compose one grounded day
    Compose(ComposeCommand),

    /// Inspect the usage ledger
    Usage(UsageCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Workspace and config path flags decide which config file is read
    let flag_paths = [
        ("LECTERN_WORKSPACE", cli.workspace.clone()),
        ("LECTERN_CONFIG", cli.config.clone()),
    ];
    let config = AppConfig::load_with(|name| {
        flag_paths
            .iter()
            .find(|(var, _)| *var == name)
            .and_then(|(_, path)| path.as_ref().map(|p| p.display().to_string()))
            .or_else(|| std::env::var(name).ok())
    })
    .context("Failed to load configuration")?
    .with_overrides(
        cli.workspace,
        cli.config,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    let format = if config.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging_with_format(config.log_level.as_deref(), config.no_color, format)
        .context("Failed to initialize logging")?;

    tracing::info!("Lectern CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Ledger backend: {:?}", config.ledger.backend);

    config
        .ensure_lectern_dir()
        .with_context(|| format!("Failed to prepare {:?}", config.lectern_dir()))?;

    let command_name = match &cli.command {
        Commands::Corpus(_) => "corpus",
        Commands::Retrieve(_) => "retrieve",
        Commands::Providers(_) => "providers",
        Commands::Compose(_) => "compose",
        Commands::Usage(_) => "usage",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Corpus(cmd) => cmd.execute(&config).await,
        Commands::Retrieve(cmd) => cmd.execute(&config).await,
        Commands::Providers(cmd) => cmd.execute(&config).await,
        Commands::Compose(cmd) => cmd.execute(&config).await,
        Commands::Usage(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}

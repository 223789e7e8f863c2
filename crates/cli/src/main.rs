//! Yatri CLI
//!
//! Command-line consumer of the Yatri travel RAG engine: ask one question,
//! chat line by line, or check backend health.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, HealthCommand};
use std::path::PathBuf;
use yatri_core::logging::{self, LogFormat};
use yatri_core::{AppConfig, AppResult};
use yatri_knowledge::RagEngine;

/// Yatri - grounded travel answers about Indian destinations
#[derive(Parser, Debug)]
#[command(name = "yatri")]
#[command(about = "Grounded travel answers about Indian destinations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "YATRI_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file (default: <workspace>/.yatri/config.yaml)
    #[arg(short, long, global = true, env = "YATRI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Generation model identifier
    #[arg(short, long, global = true, env = "YATRI_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a single travel question
    Ask(AskCommand),

    /// Interactive session; every line is an independent question
    Chat(ChatCommand),

    /// Check the embedding model, vector index and generation backend
    Health(HealthCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Generation model: {}", config.generation.model);
    tracing::debug!("Index: {:?} ({:?})", config.index_path(), config.index.backend);

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Health(_) => "health",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let engine = RagEngine::from_config(&config).await?;

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&engine).await,
        Commands::Chat(cmd) => cmd.execute(&engine).await,
        Commands::Health(cmd) => cmd.execute(&engine).await,
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

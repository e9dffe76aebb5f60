use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use razao_import::StatementImporter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use config::{Config, OutputFormat};

#[derive(Parser)]
#[command(name = "razao", version, about = "Import and summarise OFX bank statements.")]
struct Cli {
    /// Config file (default: the per-user config.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, deduplicate and summarise one or more statements.
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Overrides the configured output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Print the cleaned-up document the scanner would see.
    Sanitize { file: PathBuf },
    /// Print the category a description falls into.
    Categorize { description: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("razao: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("razao: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: Config) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Import { files, format } => {
            let importer = Arc::new(StatementImporter::new(config.categorizer()?));
            let format = format.unwrap_or(config.format);
            let total = files.len();

            let failures = commands::import(importer, files, format).await;
            if failures > 0 {
                tracing::warn!("{failures} of {total} file(s) failed to import");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sanitize { file } => {
            println!("{}", commands::sanitize(&file).await?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Categorize { description } => {
            println!("{}", config.categorizer()?.categorize(&description));
            Ok(ExitCode::SUCCESS)
        }
    }
}

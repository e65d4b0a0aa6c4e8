use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod config;

use crate::commands::CommandContext;
use crate::config::ModlintConfig;
use anyhow::Result;
use modlint_core::ReportFormat;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "modlint", version, about = "Dependency and validation analysis for game data documents")]
pub struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

/// Top-level commands for modlint
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a corpus and print the report
    Validate {
        /// Documents or directories of `.json` documents
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Report format (overrides the config file)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Worker threads
        #[arg(long)]
        threads: Option<usize>,

        /// Abandon documents not started within this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Write the report to a file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a single document without resolving cross-document references
    Check {
        path: PathBuf,

        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Print the load phases of a corpus
    Order {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Print the dependency cycles of a corpus
    Cycles {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration
    let config = ModlintConfig::resolve_config(cli.config)?;

    // Dispatch commands
    match cli.command {
        Commands::Validate { paths, format, threads, timeout_ms, output } => {
            let mut config = config;
            if let Some(threads) = threads {
                config.settings.max_validation_threads = threads;
            }
            if timeout_ms.is_some() {
                config.settings.timeout_ms = timeout_ms;
            }
            if let Some(format) = format {
                config.report.format = format.into();
            }
            if output.is_some() {
                config.report.output = output;
            }
            let ctx = CommandContext::new(config)?;
            commands::validate::validate_corpus(&ctx, &paths)
        }
        Commands::Check { path, format } => {
            let ctx = CommandContext::new(config)?;
            commands::validate::check_document(&ctx, &path, format.map(Into::into))
        }
        Commands::Order { paths, format } => {
            let ctx = CommandContext::new(config)?;
            commands::order::show_load_order(&ctx, &paths, format.map(Into::into))
        }
        Commands::Cycles { paths } => {
            let ctx = CommandContext::new(config)?;
            commands::order::show_cycles(&ctx, &paths)
        }
    }
}

//! # sprig-cli
//!
//! Command-line front end for the Sprig package fetcher.
//!
//! Parses arguments, sets up logging, loads layered settings and dispatches
//! to the command handlers. Errors are rendered with their suggestion and
//! cause chain, and turn into a non-zero exit code.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use sprig_config::CliOverrides;
use sprig_core::error::{SprigError, SprigResult};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Fetch, verify and cache packages from an npm-compatible registry
#[derive(Debug, Parser)]
#[command(name = "sprig", version, about = "Fetch and verify npm packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Registry URL to use instead of the configured one
    #[arg(long, global = true, value_name = "URL")]
    pub registry: Option<String>,

    /// Cache directory to use instead of ~/.sprig/cache
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download a package archive into the cache
    Download {
        /// Package to download, as `name` or `name@range`
        package: String,
        /// Also download the package's dependencies
        #[arg(long)]
        with_dependencies: bool,
        /// Ignore cached archives and always transfer
        #[arg(long)]
        no_cache: bool,
        /// Hide the transfer progress bar
        #[arg(long)]
        no_progress: bool,
        /// Maximum concurrent transfers
        #[arg(short = 'j', long, value_name = "N")]
        concurrency: Option<usize>,
    },
    /// Check a cached archive against the registry checksum
    Verify {
        /// Package to verify, as `name` or `name@range`
        package: String,
    },
    /// Show registry information about a package
    Info {
        /// Package name
        package: String,
    },
    /// Download every dependency listed in package.json
    Install {
        /// Skip devDependencies
        #[arg(long)]
        production: bool,
        /// Maximum concurrent transfers
        #[arg(short = 'j', long, value_name = "N")]
        concurrency: Option<usize>,
    },
    /// Create a package.json in the current directory
    Init {
        /// Overwrite an existing package.json
        #[arg(long)]
        force: bool,
    },
    /// Remove every cached archive
    Clean,
    /// Show version information
    Version,
}

impl Cli {
    /// Flags that override layered settings
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            registry: self.registry.clone(),
            cache_dir: self.cache_dir.clone(),
            ..CliOverrides::default()
        };

        match &self.command {
            Commands::Download {
                no_cache,
                no_progress,
                concurrency,
                ..
            } => {
                overrides.no_cache = *no_cache;
                overrides.no_progress = *no_progress;
                overrides.concurrency = *concurrency;
            },
            Commands::Install { concurrency, .. } => {
                overrides.concurrency = *concurrency;
            },
            _ => {},
        }

        overrides
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    debug!("Starting Sprig CLI v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", ErrorFormatter::new().format_error(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> SprigResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| SprigError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.overrides()).await?;
        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sprig={level},sprig_core={level},sprig_config={level},sprig_registry={level},sprig_cache={level},sprig_download={level}",
            level = level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("Sprig encountered an unexpected error: {}", panic_info);
        eprintln!("Sprig crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/sprig-pm/sprig/issues");
        eprintln!("Error: {}", panic_info);
    }));
}

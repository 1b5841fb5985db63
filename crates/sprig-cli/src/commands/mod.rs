//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking the shared [`CommandContext`],
//! which carries the layered settings and builds the registry client, cache
//! and download manager from them.

use std::time::Duration;

use camino::Utf8PathBuf;
use sprig_cache::ArchiveCache;
use sprig_config::{CliOverrides, ConfigLayering, ConfigLoader, Settings};
use sprig_core::error::{SprigError, SprigResult};
use sprig_download::{DownloadManager, DownloadOptions};
use sprig_registry::{RegistryClient, RegistryConfig, RetryConfig};
use tracing::{debug, info};

pub mod clean;
pub mod download;
pub mod info;
pub mod init;
pub mod install;
pub mod verify;

#[cfg(test)]
mod tests;

use crate::output::OutputHandler;
use crate::Commands;

/// Shared context for all commands
#[derive(Debug)]
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub settings: Settings,
    pub output: OutputHandler,
}

impl CommandContext {
    /// Load layered settings for the current directory
    pub async fn new(overrides: CliOverrides) -> SprigResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| SprigError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|p| SprigError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("Current directory is not valid UTF-8: {}", p.display()),
        })?;

        let layering = ConfigLayering::from_env(overrides);
        let (settings, sources) = ConfigLoader::new(cwd.clone()).load(&layering).await?;
        debug!(?sources, "Settings loaded");

        Ok(Self::with_settings(cwd, settings))
    }

    /// Context with already-resolved settings
    pub fn with_settings(cwd: Utf8PathBuf, settings: Settings) -> Self {
        Self {
            cwd,
            settings,
            output: OutputHandler::new(),
        }
    }

    pub fn registry(&self) -> SprigResult<RegistryClient> {
        RegistryClient::with_config(registry_config(&self.settings))
    }

    pub fn cache(&self) -> SprigResult<ArchiveCache> {
        Ok(ArchiveCache::new(self.settings.cache_dir()?))
    }

    pub fn download_manager(&self) -> SprigResult<DownloadManager> {
        Ok(DownloadManager::new(self.registry()?, self.cache()?))
    }

    pub fn download_options(&self) -> DownloadOptions {
        download_options(&self.settings)
    }
}

/// Immutable registry client configuration from settings
pub fn registry_config(settings: &Settings) -> RegistryConfig {
    let registry = &settings.registry;
    RegistryConfig {
        base_url: registry.url.clone(),
        timeout: Duration::from_secs(registry.timeout_secs),
        token: registry.token.clone(),
        retry: RetryConfig {
            max_retries: registry.retry.max_retries,
            retry_delay: Duration::from_millis(registry.retry.retry_delay_ms),
            max_wait: Duration::from_secs(registry.retry.max_wait_secs),
        },
        ..RegistryConfig::default()
    }
}

/// Per-call download options from settings
pub fn download_options(settings: &Settings) -> DownloadOptions {
    DownloadOptions {
        concurrency: settings.effective_concurrency(),
        use_cache: settings.download.use_cache,
        show_progress: settings.download.show_progress,
        timeout: settings.download.timeout_secs.map(Duration::from_secs),
    }
}

/// Split `name@range` into name and constraint; a bare name means `latest`
pub fn parse_package_spec(spec: &str) -> (String, String) {
    let spec = spec.trim();
    // A leading `@` belongs to the scope, not the separator
    match spec.rfind('@') {
        Some(at) if at > 0 => {
            let (name, constraint) = (&spec[..at], &spec[at + 1..]);
            let constraint = if constraint.is_empty() { "latest" } else { constraint };
            (name.to_string(), constraint.to_string())
        },
        _ => (spec.to_string(), "latest".to_string()),
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> SprigResult<()> {
    match command {
        Commands::Download {
            package,
            with_dependencies,
            ..
        } => {
            info!(package = %package, with_dependencies, "Running download");
            download::execute(&package, with_dependencies, ctx).await
        },
        Commands::Verify { package } => verify::execute(&package, ctx).await,
        Commands::Info { package } => info::execute(&package, ctx).await,
        Commands::Install { production, .. } => {
            info!(production, "Installing dependencies from package.json");
            install::execute(production, ctx).await
        },
        Commands::Init { force } => init::execute(force, ctx).await,
        Commands::Clean => clean::execute(ctx).await,
        Commands::Version => show_version(ctx).await,
    }
}

async fn show_version(ctx: &CommandContext) -> SprigResult<()> {
    ctx.output.info(&format!("sprig v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.detail(&format!("Built: {}", env!("BUILD_DATE")));
    ctx.output.detail(&format!("Target: {}", env!("SPRIG_TARGET")));
    ctx.output.detail(&format!("Rust: {}", env!("RUSTC_VERSION")));
    ctx.output.detail(&format!("Registry: {}", ctx.settings.registry.url));
    Ok(())
}

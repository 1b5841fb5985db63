//! Configuration parsing for Sprig
//!
//! This crate handles `config.toml` settings files and their layering with
//! environment variables and command-line flags, plus reading, writing and
//! validating `package.json` manifests.

pub mod json;
pub mod merge;
pub mod settings;

// Re-export main types
pub use json::{PackageJson, ValidationError};
pub use merge::{CliOverrides, ConfigLayering, ConfigLoader, ConfigSource};
pub use settings::{CacheSettings, DownloadSettings, RegistrySettings, RetrySettings, Settings};

use sprig_core::error::SprigError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SprigError>;

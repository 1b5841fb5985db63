//! npm-compatible registry client for Sprig
//!
//! This crate fetches package metadata over HTTP with linear-backoff retry
//! and resolves version constraints (ranges, exact versions, dist-tags)
//! against the versions a registry publishes.

pub mod api;
pub mod client;
pub mod resolve;

// Re-export main types
pub use api::{DistInfo, PackageMetadata, VersionInfo};
pub use client::{RegistryClient, RegistryConfig, RetryConfig};
pub use resolve::{is_exact_version, select_version, VersionSelector};

use sprig_core::error::SprigError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, SprigError>;

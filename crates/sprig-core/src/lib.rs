//! # sprig-core
//!
//! Core types and utilities shared across all Sprig crates.
//!
//! This crate provides:
//! - Version and VersionReq types implementing npm-style range semantics
//! - SprigError enum for unified, kind-tagged error handling
//! - Checksum and cache-path utilities
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `types`: Core data types (Version, VersionReq)
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{DependencyFailure, ResultExt, SprigError, SprigResult};
pub use types::{Version, VersionReq};

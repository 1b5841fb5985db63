//! Utility functions and helpers.
//!
//! Common functionality used across multiple Sprig crates.

pub mod hash;
pub mod path;

// Re-export commonly used utilities
pub use hash::{checksums_match, sha1_hex, sha1_hex_file, ChecksumHasher};
pub use path::{is_safe_path, safe_join, validate_package_name};

//! Core data types shared by the Sprig crates.
//!
//! This module provides semantic versions and the npm-style range
//! expressions used to pick a version out of registry metadata.

pub mod version;

pub use version::{Comparator, ComparatorSet, Op, Version, VersionError, VersionReq};

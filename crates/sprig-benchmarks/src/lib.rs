//! Sprig benchmarking suite
//!
//! Benchmarks for version resolution and archive checksumming, the two
//! CPU-bound steps on the download path.

pub mod common;

pub use common::*;

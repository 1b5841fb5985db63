//! Download manager for Sprig
//!
//! Produces verified local archives for package versions. Single downloads
//! consult the archive cache before touching the network; dependency sets fan
//! out over a bounded [`TaskPool`] and report every failure alongside the
//! successes instead of stopping at the first one.

pub mod manager;
pub mod options;
pub mod pool;
pub mod progress;

// Re-export main types
pub use manager::{DependencyDownloads, DownloadManager, DownloadResult};
pub use options::{DownloadOptions, DEFAULT_CONCURRENCY};
pub use pool::TaskPool;
pub use progress::{format_speed, ProgressDisplay, TransferProgress};

//! Per-call download options

use std::time::Duration;

/// Transfers in flight when no concurrency is configured
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Options for one download call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Maximum simultaneous transfers; 0 selects [`DEFAULT_CONCURRENCY`]
    pub concurrency: usize,
    /// Consult the archive cache before downloading
    pub use_cache: bool,
    /// Draw a progress bar on stderr during transfers
    pub show_progress: bool,
    /// Timeout for archive transfers; the registry client timeout applies when unset
    pub timeout: Option<Duration>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            use_cache: true,
            show_progress: true,
            timeout: None,
        }
    }
}

impl DownloadOptions {
    /// Options for non-interactive use: cache on, no progress output
    pub fn quiet() -> Self {
        Self {
            show_progress: false,
            ..Self::default()
        }
    }

    /// Concurrency actually used by the worker pool
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            self.concurrency
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_concurrency() {
        let mut options = DownloadOptions::default();
        assert_eq!(options.effective_concurrency(), 3);

        options.concurrency = 0;
        assert_eq!(options.effective_concurrency(), DEFAULT_CONCURRENCY);

        options.concurrency = 1;
        assert_eq!(options.effective_concurrency(), 1);

        options.concurrency = 16;
        assert_eq!(options.effective_concurrency(), 16);
    }

    #[test]
    fn test_quiet_options() {
        let options = DownloadOptions::quiet();
        assert!(options.use_cache);
        assert!(!options.show_progress);
    }
}

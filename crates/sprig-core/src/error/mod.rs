//! Error types and result aliases for Sprig operations.
//!
//! Provides a unified error type that covers all possible error conditions
//! across the Sprig crates. Every variant maps to a stable, machine-readable
//! kind string (see [`SprigError::kind`]) so callers can branch on the
//! failure class without parsing messages.

use std::fmt;
use thiserror::Error;

/// Boxed error used as a wrapped cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Unified error type for all Sprig operations
#[derive(Error, Debug)]
pub enum SprigError {
    // Config errors
    #[error("Failed to parse {file}: {message}")]
    TomlParse { file: String, message: String },

    #[error("Failed to parse package.json: {message}")]
    JsonParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("HTTP {status} from {url}: {body}")]
    Http { status: u16, url: String, body: String },

    #[error("Rate limited by registry: too many requests to {url}")]
    RateLimited { url: String },

    #[error("Failed to parse registry response from {url}: {message}")]
    Parse {
        url: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // Resolution errors
    #[error("Invalid version constraint '{constraint}': {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("No version of {package} matches constraint '{constraint}'")]
    NoMatchingVersion { package: String, constraint: String },

    #[error("Version {version} not found for package {package}")]
    VersionNotFound { package: String, version: String },

    #[error("Latest version not found for package {package}")]
    LatestNotFound { package: String },

    #[error("Invalid package name '{name}': {reason}")]
    InvalidPackageName { name: String, reason: String },

    // Integrity errors
    #[error("Checksum mismatch for {package}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("Cached archive for {package} is corrupted: expected {expected}, got {actual} (removed {path})")]
    CacheCorrupted {
        package: String,
        path: String,
        expected: String,
        actual: String,
    },

    // Batch errors
    #[error("{}", describe_partial(.package, .succeeded, .failures))]
    PartialDependencyFailure {
        package: String,
        succeeded: usize,
        failures: Vec<DependencyFailure>,
    },

    #[error("Download task failed: {message}")]
    TaskFailed { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {inner}")]
    Context {
        context: String,
        inner: Box<SprigError>,
    },
}

/// A single dependency that could not be downloaded as part of a set
#[derive(Debug)]
pub struct DependencyFailure {
    /// Dependency name
    pub name: String,
    /// Constraint the dependency was requested with
    pub constraint: String,
    /// Why it failed
    pub error: SprigError,
}

impl fmt::Display for DependencyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}: {}", self.name, self.constraint, self.error)
    }
}

fn describe_partial(package: &str, succeeded: &usize, failures: &[DependencyFailure]) -> String {
    let details = failures
        .iter()
        .map(|failure| failure.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    format!(
        "{} of {} dependencies of {} failed to download: {}",
        failures.len(),
        succeeded + failures.len(),
        package,
        details
    )
}

/// Result type alias for Sprig operations
pub type SprigResult<T> = Result<T, SprigError>;

impl SprigError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create a parse error for a registry response
    pub fn parse<E>(url: &str, message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Parse {
            url: url.to_string(),
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Wrap this error with additional context
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            inner: Box::new(self),
        }
    }

    /// The innermost error, skipping any context layers
    pub fn root(&self) -> &SprigError {
        match self {
            SprigError::Context { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Machine-readable kind of this error
    pub fn kind(&self) -> &'static str {
        match self.root() {
            SprigError::TomlParse { .. }
            | SprigError::JsonParse { .. }
            | SprigError::ConfigValidation { .. } => "config_error",
            SprigError::Network { .. } => "network_error",
            SprigError::Http { .. } => "http_error",
            SprigError::RateLimited { .. } => "rate_limited",
            SprigError::Parse { .. } => "parse_error",
            SprigError::InvalidConstraint { .. } => "invalid_constraint",
            SprigError::NoMatchingVersion { .. } => "no_matching_version",
            SprigError::VersionNotFound { .. } => "version_not_found",
            SprigError::LatestNotFound { .. } => "latest_not_found",
            SprigError::InvalidPackageName { .. } => "invalid_package_name",
            SprigError::ChecksumMismatch { .. } => "checksum_mismatch",
            SprigError::CacheCorrupted { .. } => "cache_corrupted",
            SprigError::PartialDependencyFailure { .. } => "partial_dependency_failure",
            SprigError::TaskFailed { .. } => "task_failed",
            SprigError::Io { .. } => "io_error",
            SprigError::Context { inner, .. } => inner.kind(),
        }
    }

    /// Check if this error is transient and worth retrying at the metadata layer
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            SprigError::Network { .. }
                | SprigError::Http { .. }
                | SprigError::RateLimited { .. }
                | SprigError::Parse { .. }
        )
    }

    /// Check if this error reports bytes that did not match their advertised checksum
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self.root(),
            SprigError::ChecksumMismatch { .. } | SprigError::CacheCorrupted { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self.root() {
            SprigError::Network { .. } => Some("Check your internet connection and try again"),
            SprigError::Http { status: 404, .. } => {
                Some("Check the package name spelling or the configured registry URL")
            },
            SprigError::Http { status: 401 | 403, .. } => {
                Some("Check the registry token (SPRIG_TOKEN or registry.token)")
            },
            SprigError::RateLimited { .. } => Some("Wait a moment before retrying"),
            SprigError::InvalidConstraint { .. } => {
                Some("Use a semver range such as ^1.2.0, ~1.2.0, >=1.0.0 <2.0.0 or a dist-tag")
            },
            SprigError::NoMatchingVersion { .. } => {
                Some("Run 'sprig info <package>' to list the published versions")
            },
            SprigError::CacheCorrupted { .. } => {
                Some("The corrupted entry was removed; run the command again to re-download it")
            },
            SprigError::ChecksumMismatch { .. } => {
                Some("The registry served bytes that do not match its checksum; try again later")
            },
            _ => None,
        }
    }
}

/// Context helpers for `SprigResult`
pub trait ResultExt<T> {
    /// Wrap the error, if any, with a context message
    fn context(self, context: impl Into<String>) -> SprigResult<T>;

    /// Wrap the error, if any, with a lazily built context message
    fn with_context<F, S>(self, f: F) -> SprigResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for SprigResult<T> {
    fn context(self, context: impl Into<String>) -> SprigResult<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> SprigResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        let err = SprigError::RateLimited {
            url: "https://registry.example/pkg".to_string(),
        };
        assert_eq!(err.kind(), "rate_limited");

        let err = SprigError::NoMatchingVersion {
            package: "express".to_string(),
            constraint: "^9.0.0".to_string(),
        };
        assert_eq!(err.kind(), "no_matching_version");
    }

    #[test]
    fn test_context_preserves_kind() {
        let err = SprigError::VersionNotFound {
            package: "express".to_string(),
            version: "4.17.3".to_string(),
        }
        .context("failed to get package metadata");

        assert_eq!(err.kind(), "version_not_found");
        assert!(matches!(err.root(), SprigError::VersionNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "failed to get package metadata: Version 4.17.3 not found for package express"
        );
    }

    #[test]
    fn test_retryable_classification() {
        let http = SprigError::Http {
            status: 503,
            url: "u".to_string(),
            body: String::new(),
        };
        assert!(http.is_retryable());
        assert!(!SprigError::LatestNotFound { package: "x".to_string() }.is_retryable());
        assert!(SprigError::CacheCorrupted {
            package: "x".to_string(),
            path: "p".to_string(),
            expected: "a".to_string(),
            actual: "b".to_string(),
        }
        .is_integrity_failure());
    }

    #[test]
    fn test_partial_failure_lists_every_failure() {
        let err = SprigError::PartialDependencyFailure {
            package: "express@4.17.1".to_string(),
            succeeded: 2,
            failures: vec![DependencyFailure {
                name: "cookie".to_string(),
                constraint: "0.4.0".to_string(),
                error: SprigError::Http {
                    status: 404,
                    url: "http://localhost/cookie".to_string(),
                    body: "not found".to_string(),
                },
            }],
        };

        let message = err.to_string();
        assert!(message.starts_with("1 of 3 dependencies of express@4.17.1 failed"));
        assert!(message.contains("cookie@0.4.0: HTTP 404"));
        assert_eq!(err.kind(), "partial_dependency_failure");
    }

    #[test]
    fn test_result_ext() {
        let result: SprigResult<()> = Err(SprigError::LatestNotFound {
            package: "left-pad".to_string(),
        });
        let err = result.with_context(|| "resolving left-pad").unwrap_err();
        assert_eq!(err.kind(), "latest_not_found");
        assert!(err.to_string().starts_with("resolving left-pad: "));
    }
}

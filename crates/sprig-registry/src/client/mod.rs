//! HTTP client implementation with connection pooling and retry logic

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, warn};

use sprig_core::error::SprigError;
use sprig_core::types::Version;
use sprig_core::utils::validate_package_name;

use crate::api::{PackageMetadata, VersionInfo};
use crate::resolve::{is_exact_version, select_version};
use crate::RegistryResult;

/// Default registry endpoint
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Metadata media type (the abbreviated install document)
const METADATA_ACCEPT: &str = "application/vnd.npm.install-v1+json";

/// Longest error body kept in an `Http` error
const MAX_ERROR_BODY: usize = 512;

/// Configuration for linear backoff retry logic
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay, multiplied by the attempt number
    pub retry_delay: Duration,
    /// Upper bound for any single delay
    pub max_wait: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_wait: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Delay after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt).min(self.max_wait)
    }

    /// Total attempts including the first
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Immutable registry client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Base registry URL, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Bearer token for authentication
    pub token: Option<String>,
    /// Value of the User-Agent header
    pub user_agent: String,
    /// Retry policy for metadata fetches
    pub retry: RetryConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REGISTRY_URL.to_string(),
            timeout: Duration::from_secs(30),
            token: None,
            user_agent: format!("sprig/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
        }
    }
}

/// Main HTTP client for registry operations
#[derive(Debug, Clone)]
pub struct RegistryClient {
    /// Underlying HTTP client with connection pooling
    client: Client,
    /// Configuration fixed at construction
    config: Arc<RegistryConfig>,
}

impl RegistryClient {
    /// Create a client for the public registry with default settings
    pub fn new() -> RegistryResult<Self> {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a client for an alternate endpoint
    pub fn with_base_url(base_url: impl Into<String>) -> RegistryResult<Self> {
        Self::with_config(RegistryConfig {
            base_url: base_url.into(),
            ..RegistryConfig::default()
        })
    }

    /// Create registry client with custom configuration
    pub fn with_config(mut config: RegistryConfig) -> RegistryResult<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                SprigError::ConfigValidation {
                    field: "registry.token".to_string(),
                    reason: format!("Invalid auth token: {}", e),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = ClientBuilder::new()
            // Connection pooling configuration
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout)
            .gzip(true)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| SprigError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    /// Configuration this client was built with
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Shared HTTP client, reused for archive transfers
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Fetch package metadata, retrying transient failures
    pub async fn fetch_metadata(&self, name: &str) -> RegistryResult<PackageMetadata> {
        validate_package_name(name)?;
        let url = format!("{}/{}", self.config.base_url, encode_package_name(name));
        let attempts = self.config.retry.attempts();
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.fetch_once(name, &url).await {
                Ok(metadata) => {
                    debug!(
                        package = name,
                        attempt,
                        versions = metadata.versions.len(),
                        "Fetched package metadata"
                    );
                    return Ok(metadata);
                },
                Err(error) => {
                    if attempt < attempts {
                        let delay = self.config.retry.delay_for(attempt);
                        warn!(
                            package = name,
                            attempt,
                            max_attempts = attempts,
                            delay_ms = delay.as_millis() as u64,
                            kind = error.kind(),
                            error = %error,
                            "Metadata fetch failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(error);
                },
            }
        }

        Err(last_error.unwrap_or_else(|| SprigError::Network {
            message: format!("No attempt was made to fetch {}", url),
            source: None,
        }))
    }

    async fn fetch_once(&self, name: &str, url: &str) -> RegistryResult<PackageMetadata> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, METADATA_ACCEPT)
            .send()
            .await
            .map_err(|e| SprigError::network(format!("Failed to fetch metadata for {}", name), e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SprigError::RateLimited {
                url: url.to_string(),
            });
        }
        if status.as_u16() >= 400 {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(SprigError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SprigError::network(format!("Failed to read metadata for {}", name), e))?;

        serde_json::from_slice::<PackageMetadata>(&bytes)
            .map_err(|e| SprigError::parse(url, format!("Invalid metadata document: {}", e), e))
    }

    /// Resolve a constraint to one published version string.
    ///
    /// Exact versions are returned unchanged without contacting the registry.
    pub async fn resolve_version(&self, name: &str, constraint: &str) -> RegistryResult<String> {
        let constraint = constraint.trim();
        if is_exact_version(constraint) {
            debug!(package = name, version = constraint, "Exact version, skipping metadata fetch");
            return Ok(constraint.to_string());
        }

        let metadata = self.fetch_metadata(name).await?;
        let version = select_version(&metadata, constraint)?;
        debug!(package = name, constraint, version = %version, "Resolved version");
        Ok(version)
    }

    /// Metadata of the version a constraint resolves to
    pub async fn get_version_info(&self, name: &str, constraint: &str) -> RegistryResult<VersionInfo> {
        let version = self.resolve_version(name, constraint).await?;

        // Metadata is fetched again; the registry may have changed in between
        let mut metadata = self.fetch_metadata(name).await?;
        published_key(&metadata, &version)
            .and_then(|key| metadata.versions.remove(&key))
            .ok_or_else(|| SprigError::VersionNotFound {
                package: name.to_string(),
                version,
            })
    }

    /// Metadata of the version tagged `latest`
    pub async fn get_latest_version(&self, name: &str) -> RegistryResult<VersionInfo> {
        let metadata = self.fetch_metadata(name).await?;
        let latest = metadata
            .tag("latest")
            .ok_or_else(|| SprigError::LatestNotFound {
                package: name.to_string(),
            })?
            .to_string();

        self.get_version_info(name, &latest).await
    }
}

/// Metadata key for `version`, matching `v1.2.3` to a key published as `1.2.3`
fn published_key(metadata: &PackageMetadata, version: &str) -> Option<String> {
    if metadata.versions.contains_key(version) {
        return Some(version.to_string());
    }
    let wanted = version.parse::<Version>().ok()?;
    metadata
        .versions
        .keys()
        .find(|key| key.parse::<Version>().map_or(false, |v| v == wanted))
        .cloned()
}

/// Encode package name for URL (handle scoped packages)
pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        // Scoped package: @org/pkg -> @org%2fpkg
        name.replace('/', "%2f")
    } else {
        name.to_string()
    }
}

//! `config.toml` settings parsing and serialization

use crate::ConfigResult;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use sprig_core::error::SprigError;

/// Default npm-compatible registry
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Default number of concurrent archive transfers
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Complete settings file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Registry endpoint and retry policy
    pub registry: RegistrySettings,

    /// Download manager behaviour
    pub download: DownloadSettings,

    /// Archive cache location
    pub cache: CacheSettings,
}

/// `[registry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RegistrySettings {
    /// Registry base URL
    pub url: String,

    /// Per-request timeout for metadata fetches
    pub timeout_secs: u64,

    /// Bearer token sent with every request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Retry policy for metadata fetches
    pub retry: RetrySettings,
}

/// `[registry.retry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_wait_secs: u64,
}

/// `[download]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DownloadSettings {
    /// Concurrent transfers; 0 selects the default
    pub concurrency: usize,

    /// Reuse verified archives from the cache
    pub use_cache: bool,

    /// Draw progress bars for transfers
    pub show_progress: bool,

    /// Timeout for a single archive transfer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// `[cache]` section
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CacheSettings {
    /// Cache root; defaults to `~/.sprig/cache`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
            timeout_secs: 30,
            token: None,
            retry: RetrySettings::default(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            max_wait_secs: 60,
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            use_cache: true,
            show_progress: true,
            timeout_secs: None,
        }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text
    pub fn from_toml_str(content: &str, file: &str) -> ConfigResult<Self> {
        let value: toml::Value = parse_toml_value(content, file)?;
        Self::from_value(value, file)
    }

    /// Build settings from an already merged TOML value
    pub fn from_value(value: toml::Value, file: &str) -> ConfigResult<Self> {
        let settings = value
            .try_into::<Settings>()
            .map_err(|e| SprigError::TomlParse {
                file: file.to_string(),
                message: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings back to TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| SprigError::TomlParse {
            file: "config.toml".to_string(),
            message: format!("TOML serialization error: {}", e),
        })
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        let url = self.registry.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SprigError::ConfigValidation {
                field: "registry.url".to_string(),
                reason: format!("'{}' is not an http(s) URL", self.registry.url),
            });
        }

        if self.registry.timeout_secs == 0 {
            return Err(SprigError::ConfigValidation {
                field: "registry.timeout-secs".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        if self.download.timeout_secs == Some(0) {
            return Err(SprigError::ConfigValidation {
                field: "download.timeout-secs".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        if let Some(dir) = &self.cache.dir {
            if dir.trim().is_empty() {
                return Err(SprigError::ConfigValidation {
                    field: "cache.dir".to_string(),
                    reason: "cache directory cannot be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Effective concurrency, mapping 0 to the default
    pub fn effective_concurrency(&self) -> usize {
        match self.download.concurrency {
            0 => DEFAULT_CONCURRENCY,
            n => n,
        }
    }

    /// Cache root, falling back to `~/.sprig/cache`
    pub fn cache_dir(&self) -> ConfigResult<Utf8PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(Utf8PathBuf::from(dir)),
            None => Ok(sprig_home()?.join("cache")),
        }
    }
}

/// Parse TOML text into an untyped value for layering
pub fn parse_toml_value(content: &str, file: &str) -> ConfigResult<toml::Value> {
    let table = content
        .parse::<toml::Table>()
        .map_err(|e| SprigError::TomlParse {
            file: file.to_string(),
            message: e.message().to_string(),
        })?;
    Ok(toml::Value::Table(table))
}

/// Recursively overlay `overlay` onto `base`; tables merge, everything else replaces
pub fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}

/// `~/.sprig`, the home of global settings and the default cache
pub fn sprig_home() -> ConfigResult<Utf8PathBuf> {
    let home_dir = dirs::home_dir().ok_or_else(|| SprigError::ConfigValidation {
        field: "home_dir".to_string(),
        reason: "Could not determine home directory".to_string(),
    })?;

    let home = Utf8PathBuf::try_from(home_dir).map_err(|e| SprigError::ConfigValidation {
        field: "home_dir".to_string(),
        reason: format!("Invalid home directory path: {}", e),
    })?;

    Ok(home.join(".sprig"))
}

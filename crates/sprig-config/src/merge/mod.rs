//! Settings layering, fallback logic, and environment overrides
//!
//! Precedence, lowest first: built-in defaults, `~/.sprig/config.toml`, the
//! nearest `.sprig.toml` at or above the working directory, `SPRIG_*`
//! environment variables, then command-line flags.

use crate::settings::{merge_values, parse_toml_value, sprig_home, Settings};
use crate::ConfigResult;
use camino::{Utf8Path, Utf8PathBuf};
use sprig_core::error::SprigError;
use std::collections::HashMap;
use tracing::debug;

/// Project-level settings file name
pub const PROJECT_CONFIG_FILE: &str = ".sprig.toml";

/// Global settings file name inside `~/.sprig`
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

const ENV_PREFIX: &str = "SPRIG_";

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Directory holding the global config file
    home: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
#[derive(Debug, Default)]
pub struct ConfigLayering {
    /// Environment overrides
    env_overrides: HashMap<String, String>,
    /// CLI flag overrides
    cli_overrides: CliOverrides,
}

/// Settings that can be forced from the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub registry: Option<String>,
    pub cache_dir: Option<Utf8PathBuf>,
    pub concurrency: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub no_cache: bool,
    pub no_progress: bool,
}

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Built-in defaults
    Defaults,
    /// Global config file
    Global(Utf8PathBuf),
    /// Project `.sprig.toml` file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

impl ConfigLoader {
    /// Create a new configuration loader rooted at `cwd`
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self {
            cwd,
            home: sprig_home().ok(),
        }
    }

    /// Use `home` instead of `~/.sprig` for the global config file
    pub fn with_home(mut self, home: Option<Utf8PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Find a file at or above the working directory
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current: Option<&Utf8Path> = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let candidate = dir.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
            current = dir.parent();
        }

        None
    }

    /// Path of the global config file, whether or not it exists
    pub fn global_config_path(&self) -> Option<Utf8PathBuf> {
        self.home.as_ref().map(|home| home.join(GLOBAL_CONFIG_FILE))
    }

    /// Load every layer and return the merged settings plus where they came from
    pub async fn load(&self, layering: &ConfigLayering) -> ConfigResult<(Settings, Vec<ConfigSource>)> {
        let mut sources = vec![ConfigSource::Defaults];
        let mut merged = toml::Value::Table(toml::Table::new());

        if let Some(path) = self.global_config_path().filter(|p| p.is_file()) {
            merge_values(&mut merged, read_toml(&path).await?);
            sources.push(ConfigSource::Global(path));
        }

        if let Some(path) = self.resolve_config_path(PROJECT_CONFIG_FILE) {
            merge_values(&mut merged, read_toml(&path).await?);
            sources.push(ConfigSource::Project(path));
        }

        let mut settings = Settings::from_value(merged, "merged settings")?;
        sources.extend(layering.apply(&mut settings)?);
        settings.validate()?;

        debug!(sources = ?sources, registry = %settings.registry.url, "Loaded settings");
        Ok((settings, sources))
    }
}

async fn read_toml(path: &Utf8Path) -> ConfigResult<toml::Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SprigError::io(format!("Failed to read {}", path), e))?;
    parse_toml_value(&content, path.as_str())
}

impl ConfigLayering {
    /// Create a new configuration layering system
    pub fn new(env_overrides: HashMap<String, String>, cli_overrides: CliOverrides) -> Self {
        Self {
            env_overrides,
            cli_overrides,
        }
    }

    /// Layering fed from the process environment
    pub fn from_env(cli_overrides: CliOverrides) -> Self {
        Self::new(Self::collect_env_overrides(), cli_overrides)
    }

    /// Apply environment then CLI overrides, reporting which ones took effect
    pub fn apply(&self, settings: &mut Settings) -> ConfigResult<Vec<ConfigSource>> {
        let mut sources = Self::apply_env_overrides(settings, &self.env_overrides)?;
        if Self::apply_cli_overrides(settings, &self.cli_overrides) {
            sources.push(ConfigSource::CommandLine);
        }
        Ok(sources)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(
        settings: &mut Settings,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<Vec<ConfigSource>> {
        let mut applied = Vec::new();

        // Sorted so errors and source lists are deterministic
        let mut keys: Vec<&String> = overrides.keys().collect();
        keys.sort();

        for key in keys {
            let value = overrides[key].trim();
            let known = match key.as_str() {
                "SPRIG_REGISTRY" => {
                    settings.registry.url = value.to_string();
                    true
                },
                "SPRIG_TOKEN" => {
                    settings.registry.token = Some(value.to_string()).filter(|t| !t.is_empty());
                    true
                },
                "SPRIG_CACHE_DIR" => {
                    settings.cache.dir = Some(value.to_string());
                    true
                },
                "SPRIG_CONCURRENCY" => {
                    settings.download.concurrency = parse_number(key, value)?;
                    true
                },
                "SPRIG_TIMEOUT_SECS" => {
                    settings.registry.timeout_secs = parse_number(key, value)?;
                    true
                },
                "SPRIG_MAX_RETRIES" => {
                    settings.registry.retry.max_retries = parse_number(key, value)?;
                    true
                },
                "SPRIG_NO_PROGRESS" => {
                    settings.download.show_progress = !is_truthy(value);
                    true
                },
                // Unknown environment variable, ignore
                _ => false,
            };

            if known {
                applied.push(ConfigSource::Environment(key.clone()));
            }
        }

        Ok(applied)
    }

    /// Apply CLI flag overrides; returns whether any flag was set
    fn apply_cli_overrides(settings: &mut Settings, overrides: &CliOverrides) -> bool {
        let mut changed = false;

        if let Some(registry) = &overrides.registry {
            settings.registry.url = registry.clone();
            changed = true;
        }
        if let Some(dir) = &overrides.cache_dir {
            settings.cache.dir = Some(dir.to_string());
            changed = true;
        }
        if let Some(concurrency) = overrides.concurrency {
            settings.download.concurrency = concurrency;
            changed = true;
        }
        if let Some(timeout) = overrides.timeout_secs {
            settings.download.timeout_secs = Some(timeout);
            changed = true;
        }
        if overrides.no_cache {
            settings.download.use_cache = false;
            changed = true;
        }
        if overrides.no_progress {
            settings.download.show_progress = false;
            changed = true;
        }

        changed
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.parse().map_err(|_| SprigError::ConfigValidation {
        field: key.to_string(),
        reason: format!("'{}' is not a valid number", value),
    })
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.to_ascii_lowercase().as_str(), "" | "0" | "false" | "no")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_temp_dir() -> (TempDir, Utf8PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_resolve_config_path_walks_upward() {
        let (_guard, root) = utf8_temp_dir();
        std::fs::write(root.join(PROJECT_CONFIG_FILE), "").unwrap();
        let nested = root.join("packages").join("web");
        std::fs::create_dir_all(&nested).unwrap();

        let loader = ConfigLoader::new(nested).with_home(None);
        assert_eq!(
            loader.resolve_config_path(PROJECT_CONFIG_FILE),
            Some(root.join(PROJECT_CONFIG_FILE))
        );
        assert_eq!(loader.resolve_config_path("does-not-exist.toml"), None);
    }

    #[tokio::test]
    async fn test_load_defaults_without_files() {
        let (_guard, root) = utf8_temp_dir();
        let loader = ConfigLoader::new(root).with_home(None);

        let (settings, sources) = loader.load(&ConfigLayering::default()).await.unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(sources, vec![ConfigSource::Defaults]);
    }

    #[tokio::test]
    async fn test_project_overrides_global() {
        let (_home_guard, home) = utf8_temp_dir();
        let (_project_guard, project) = utf8_temp_dir();

        tokio::fs::write(
            home.join(GLOBAL_CONFIG_FILE),
            "[registry]\nurl = \"https://global.example\"\ntimeout-secs = 10\n",
        )
        .await
        .unwrap();
        tokio::fs::write(
            project.join(PROJECT_CONFIG_FILE),
            "[registry]\nurl = \"https://project.example\"\n",
        )
        .await
        .unwrap();

        let loader = ConfigLoader::new(project.clone()).with_home(Some(home.clone()));
        let (settings, sources) = loader.load(&ConfigLayering::default()).await.unwrap();

        assert_eq!(settings.registry.url, "https://project.example");
        assert_eq!(settings.registry.timeout_secs, 10);
        assert_eq!(
            sources,
            vec![
                ConfigSource::Defaults,
                ConfigSource::Global(home.join(GLOBAL_CONFIG_FILE)),
                ConfigSource::Project(project.join(PROJECT_CONFIG_FILE)),
            ]
        );
    }

    #[tokio::test]
    async fn test_env_then_cli_precedence() {
        let (_guard, root) = utf8_temp_dir();
        let loader = ConfigLoader::new(root).with_home(None);

        let env = HashMap::from([
            ("SPRIG_REGISTRY".to_string(), "https://env.example".to_string()),
            ("SPRIG_CONCURRENCY".to_string(), "6".to_string()),
            ("SPRIG_NO_PROGRESS".to_string(), "1".to_string()),
            ("SPRIG_UNRELATED".to_string(), "x".to_string()),
        ]);
        let cli = CliOverrides {
            concurrency: Some(2),
            ..Default::default()
        };

        let (settings, sources) = loader.load(&ConfigLayering::new(env, cli)).await.unwrap();
        assert_eq!(settings.registry.url, "https://env.example");
        assert_eq!(settings.download.concurrency, 2);
        assert!(!settings.download.show_progress);
        assert!(sources.contains(&ConfigSource::Environment("SPRIG_CONCURRENCY".to_string())));
        assert!(!sources.contains(&ConfigSource::Environment("SPRIG_UNRELATED".to_string())));
        assert_eq!(sources.last(), Some(&ConfigSource::CommandLine));
    }

    #[tokio::test]
    async fn test_invalid_env_value() {
        let (_guard, root) = utf8_temp_dir();
        let loader = ConfigLoader::new(root).with_home(None);
        let env = HashMap::from([("SPRIG_MAX_RETRIES".to_string(), "many".to_string())]);

        let err = loader
            .load(&ConfigLayering::new(env, CliOverrides::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, SprigError::ConfigValidation { ref field, .. } if field == "SPRIG_MAX_RETRIES"));
    }

    #[tokio::test]
    async fn test_malformed_project_file() {
        let (_guard, root) = utf8_temp_dir();
        tokio::fs::write(root.join(PROJECT_CONFIG_FILE), "[registry\nurl = 1")
            .await
            .unwrap();

        let loader = ConfigLoader::new(root).with_home(None);
        let err = loader.load(&ConfigLayering::default()).await.unwrap_err();
        assert!(matches!(err, SprigError::TomlParse { .. }));
    }
}

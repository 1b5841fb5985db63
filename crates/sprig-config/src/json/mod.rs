//! package.json manifest parsing, serialization and validation

use crate::ConfigResult;
use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sprig_core::error::SprigError;
use std::collections::BTreeMap;
use std::fmt;

const MAX_NAME_LENGTH: usize = 214;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:@[a-z0-9*~-][a-z0-9*._~-]*/)?[a-z0-9~-][a-z0-9._~-]*$")
        .expect("package name pattern is valid")
});

static SEMVER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .expect("semver pattern is valid")
});

static DEPENDENCY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\^~]?[0-9]+\.[0-9]+\.[0-9]+|latest|\*|>=[0-9]+\.[0-9]+\.[0-9]+|file:.*|git\+https://.*)$")
        .expect("dependency pattern is valid")
});

/// The subset of package.json Sprig reads and writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageJson {
    /// Package name
    #[serde(default)]
    pub name: String,

    /// Package version
    #[serde(default)]
    pub version: String,

    /// Package description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Main entry point
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub main: String,

    /// npm scripts
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,

    /// Runtime dependencies
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies
    #[serde(
        default,
        rename = "devDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Every other field, preserved across load and save
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// One problem found by [`PackageJson::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (`name`, `dependencies.express`)
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl PackageJson {
    /// Default manifest for a project living in `dir`
    pub fn new_for_dir(dir: &Utf8Path) -> Self {
        let name = dir
            .file_name()
            .map(|n| n.to_lowercase())
            .unwrap_or_else(|| "my-project".to_string());

        Self {
            name,
            version: "1.0.0".to_string(),
            description: String::new(),
            main: "index.js".to_string(),
            scripts: BTreeMap::new(),
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
            other: serde_json::Map::new(),
        }
    }

    /// Collect every validation problem instead of stopping at the first
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(message) = check_name(&self.name) {
            errors.push(ValidationError {
                field: "name".to_string(),
                message,
            });
        }

        if let Some(message) = check_version(&self.version) {
            errors.push(ValidationError {
                field: "version".to_string(),
                message,
            });
        }

        let sections = [
            ("dependencies", &self.dependencies),
            ("devDependencies", &self.dev_dependencies),
        ];
        for (section, deps) in sections {
            for (dep, constraint) in deps {
                if let Some(message) = check_dependency(dep, constraint) {
                    errors.push(ValidationError {
                        field: format!("{}.{}", section, dep),
                        message,
                    });
                }
            }
        }

        errors
    }

    /// Dependencies to install as `(name, constraint)` pairs
    pub fn install_set(&self, include_dev: bool) -> BTreeMap<String, String> {
        let mut deps = self.dependencies.clone();
        if include_dev {
            for (name, constraint) in &self.dev_dependencies {
                deps.entry(name.clone()).or_insert_with(|| constraint.clone());
            }
        }
        deps
    }
}

fn check_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Some(format!("name too long (max {} chars)", MAX_NAME_LENGTH));
    }
    if !NAME_PATTERN.is_match(name) {
        return Some("invalid package name format".to_string());
    }
    None
}

fn check_version(version: &str) -> Option<String> {
    if version.is_empty() {
        return Some("version cannot be empty".to_string());
    }
    if !SEMVER_PATTERN.is_match(version) {
        return Some("invalid version format (must be semver)".to_string());
    }
    None
}

fn check_dependency(name: &str, constraint: &str) -> Option<String> {
    if constraint.trim().is_empty() {
        return Some(format!("version for dependency '{}' cannot be empty", name));
    }
    if !DEPENDENCY_PATTERN.is_match(constraint) {
        return Some(format!("invalid version format for dependency '{}'", name));
    }
    None
}

/// Parse JSON string to PackageJson
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    serde_json::from_str(content).map_err(|e| SprigError::JsonParse {
        message: format!("JSON parsing error: {}", e),
    })
}

/// Serialize PackageJson to pretty JSON with a trailing newline
pub fn serialize_package_json(config: &PackageJson) -> ConfigResult<String> {
    let mut text = serde_json::to_string_pretty(config).map_err(|e| SprigError::JsonParse {
        message: format!("JSON serialization error: {}", e),
    })?;
    text.push('\n');
    Ok(text)
}

/// Load and parse package.json from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<PackageJson> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SprigError::io(format!("Failed to read {}", path), e))?;

    parse_package_json(&content).map_err(|e| match e {
        SprigError::JsonParse { message } => SprigError::JsonParse {
            message: format!("In file {}: {}", path, message),
        },
        other => other,
    })
}

/// Write package.json to file path
pub async fn save_to_file(path: &Utf8Path, config: &PackageJson) -> ConfigResult<()> {
    let text = serialize_package_json(config)?;
    tokio::fs::write(path, text)
        .await
        .map_err(|e| SprigError::io(format!("Failed to write {}", path), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn test_parse_minimal_package_json() {
        let json = r#"
{
  "name": "test-package",
  "version": "1.0.0"
}
"#;
        let config = parse_package_json(json).unwrap();
        assert_eq!(config.name, "test-package");
        assert_eq!(config.version, "1.0.0");
        assert!(config.dependencies.is_empty());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_parse_with_dependencies() {
        let json = r#"
{
  "name": "web-app",
  "version": "0.3.0",
  "dependencies": { "express": "^4.17.1", "lodash": "latest" },
  "devDependencies": { "jest": "~29.0.0" }
}
"#;
        let config = parse_package_json(json).unwrap();
        assert_eq!(config.dependencies.get("express").unwrap(), "^4.17.1");
        assert_eq!(config.dev_dependencies.len(), 1);

        assert_eq!(config.install_set(false).len(), 2);
        assert_eq!(config.install_set(true).len(), 3);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{"name":"a","version":"1.0.0","license":"MIT","private":true}"#;
        let config = parse_package_json(json).unwrap();
        let text = serialize_package_json(&config).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(reparsed["license"], "MIT");
        assert_eq!(reparsed["private"], true);
        assert!(reparsed.get("scripts").is_none());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut config = PackageJson::new_for_dir(Utf8Path::new("/work/My App"));
        config.version = "1.0".to_string();
        config
            .dependencies
            .insert("express".to_string(), "4.x".to_string());
        config
            .dependencies
            .insert("local".to_string(), "file:../local".to_string());
        config
            .dev_dependencies
            .insert("jest".to_string(), " ".to_string());

        let errors = config.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["name", "version", "dependencies.express", "devDependencies.jest"]
        );
        assert!(errors[3].message.contains("cannot be empty"));
    }

    #[test]
    fn test_name_rules() {
        assert!(check_name("@babel/core").is_none());
        assert!(check_name("lodash.merge").is_none());
        assert!(check_name("Uppercase").is_some());
        assert!(check_name(".hidden").is_some());
        assert!(check_name(&"a".repeat(215)).is_some());
    }

    #[test]
    fn test_new_for_dir_defaults() {
        let config = PackageJson::new_for_dir(Utf8Path::new("/home/dev/widgets"));
        assert_eq!(config.name, "widgets");
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.main, "index.js");
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp_dir.path().to_path_buf()).unwrap();
        let path = dir.join("package.json");

        let config = PackageJson::new_for_dir(&dir);
        save_to_file(&path, &config).await.unwrap();
        let loaded = load_from_file(&path).await.unwrap();
        assert_eq!(loaded, config);

        tokio::fs::write(&path, "{ not json").await.unwrap();
        let err = load_from_file(&path).await.unwrap_err();
        assert_eq!(err.kind(), "config_error");
        assert!(err.to_string().contains("package.json"));
    }
}

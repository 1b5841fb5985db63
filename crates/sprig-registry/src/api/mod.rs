//! Registry metadata document types

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Package document returned by `GET <registry>/<name>`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageMetadata {
    /// Package name
    pub name: String,
    /// Package description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tag name to version, e.g. `latest`
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: HashMap<String, String>,
    /// Every published version keyed by its version string.
    /// Keys are not guaranteed to be valid semver.
    #[serde(default)]
    pub versions: HashMap<String, VersionInfo>,
}

/// Metadata for a specific published version
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct VersionInfo {
    /// Version string
    pub version: String,
    /// Dependency name to constraint
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Distribution information
    pub dist: DistInfo,
}

/// Distribution information for the package archive
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DistInfo {
    /// Archive download URL
    pub tarball: String,
    /// Hex SHA-1 of the archive bytes
    pub shasum: String,
    /// Subresource integrity string, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

impl PackageMetadata {
    /// Version a dist-tag points at
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.dist_tags.get(tag).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_abbreviated_document() {
        let doc = serde_json::json!({
            "name": "express",
            "dist-tags": { "latest": "4.17.2" },
            "versions": {
                "4.17.2": {
                    "name": "express",
                    "version": "4.17.2",
                    "dependencies": { "accepts": "~1.3.7" },
                    "dist": {
                        "tarball": "https://registry.example/express/-/express-4.17.2.tgz",
                        "shasum": "c18369f7..."
                    }
                },
                "not-semver": {
                    "version": "not-semver",
                    "dist": { "tarball": "t", "shasum": "s" }
                }
            }
        });

        let metadata: PackageMetadata = serde_json::from_value(doc).unwrap();
        assert_eq!(metadata.tag("latest"), Some("4.17.2"));
        assert_eq!(metadata.versions.len(), 2);

        let info = &metadata.versions["4.17.2"];
        assert_eq!(info.dependencies["accepts"], "~1.3.7");
        assert!(info.dist.integrity.is_none());
        assert!(metadata.versions["not-semver"].dependencies.is_empty());
    }

    #[test]
    fn test_missing_maps_default_to_empty() {
        let metadata: PackageMetadata = serde_json::from_str(r#"{"name":"bare"}"#).unwrap();
        assert!(metadata.versions.is_empty());
        assert!(metadata.tag("latest").is_none());
    }
}

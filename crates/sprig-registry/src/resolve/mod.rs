//! Version constraint resolution against published metadata
//!
//! Turns a human-written constraint (`^4.17.0`, `4.17.1`, `latest`, `next`,
//! `>=1 <2 || 3.x`) into one concrete published version key.

use std::collections::BTreeMap;

use sprig_core::error::SprigError;
use sprig_core::types::{Version, VersionReq};
use tracing::debug;

use crate::api::PackageMetadata;
use crate::RegistryResult;

/// Check whether a constraint names one concrete version.
///
/// Exact versions carry no range operator, are not `latest` or `*`, and
/// parse as a full `major.minor.patch` version. A leading `v` is part of the
/// version, not an operator.
pub fn is_exact_version(constraint: &str) -> bool {
    let constraint = constraint.trim();
    if constraint.is_empty() || constraint == "latest" || constraint == "*" {
        return false;
    }
    if constraint.starts_with(['^', '~', '>', '<', '=']) {
        return false;
    }
    constraint.parse::<Version>().is_ok()
}

/// Published versions, parsed and ordered
#[derive(Debug, Clone)]
pub struct VersionSelector {
    /// Parsed version to the key it was published under
    available_versions: BTreeMap<Version, String>,
}

impl VersionSelector {
    /// Build from metadata keys, skipping any that are not valid versions
    pub fn from_keys<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut available_versions = BTreeMap::new();
        for key in keys {
            match key.parse::<Version>() {
                Ok(version) => {
                    available_versions.entry(version).or_insert_with(|| key.to_string());
                },
                Err(e) => debug!(key, error = %e, "Skipping unparsable version key"),
            }
        }
        Self { available_versions }
    }

    /// Highest published version satisfying `req`, as its original key
    pub fn select_best(&self, req: &VersionReq) -> Option<&str> {
        self.available_versions
            .iter()
            .rev() // Start with highest versions
            .find(|(version, _)| req.matches(version))
            .map(|(_, key)| key.as_str())
    }

    /// Get the highest available version
    pub fn highest_version(&self) -> Option<&Version> {
        self.available_versions.keys().next_back()
    }

    /// Number of parsable versions
    pub fn len(&self) -> usize {
        self.available_versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.available_versions.is_empty()
    }
}

/// Resolve `constraint` against already fetched metadata
pub fn select_version(metadata: &PackageMetadata, constraint: &str) -> RegistryResult<String> {
    let constraint = constraint.trim();

    if let Some(tagged) = metadata.tag(constraint) {
        debug!(package = %metadata.name, tag = constraint, version = tagged, "Resolved dist-tag");
        return Ok(tagged.to_string());
    }
    if constraint == "latest" {
        return Err(SprigError::LatestNotFound {
            package: metadata.name.clone(),
        });
    }

    let req = VersionReq::parse(constraint).map_err(|e| SprigError::InvalidConstraint {
        constraint: constraint.to_string(),
        reason: e.to_string(),
    })?;

    let selector = VersionSelector::from_keys(metadata.versions.keys().map(String::as_str));
    selector
        .select_best(&req)
        .map(str::to_string)
        .ok_or_else(|| SprigError::NoMatchingVersion {
            package: metadata.name.clone(),
            constraint: constraint.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DistInfo, VersionInfo};
    use std::collections::HashMap;

    fn metadata(name: &str, keys: &[&str], tags: &[(&str, &str)]) -> PackageMetadata {
        let versions = keys
            .iter()
            .map(|key| {
                let info = VersionInfo {
                    version: key.to_string(),
                    dependencies: Default::default(),
                    dist: DistInfo {
                        tarball: format!("https://registry.example/{}/-/{}-{}.tgz", name, name, key),
                        shasum: String::new(),
                        integrity: None,
                    },
                };
                (key.to_string(), info)
            })
            .collect();
        PackageMetadata {
            name: name.to_string(),
            description: None,
            dist_tags: tags
                .iter()
                .map(|(t, v)| (t.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            versions,
        }
    }

    #[test]
    fn test_is_exact_version() {
        assert!(is_exact_version("4.17.1"));
        assert!(is_exact_version("1.0.0-beta.2"));
        assert!(is_exact_version("v1.2.3"));
        assert!(!is_exact_version("v1.2"));
        assert!(!is_exact_version("^4.17.1"));
        assert!(!is_exact_version("=4.17.1"));
        assert!(!is_exact_version("~1.2.3"));
        assert!(!is_exact_version("latest"));
        assert!(!is_exact_version("*"));
        assert!(!is_exact_version("1.2"));
        assert!(!is_exact_version("1.x"));
        assert!(!is_exact_version(""));
    }

    #[test]
    fn test_selects_highest_match_and_skips_garbage() {
        let m = metadata(
            "express",
            &["4.17.1", "4.17.2", "4.16.0", "5.0.0-beta.1", "garbage", "4.x"],
            &[("latest", "4.17.2")],
        );

        assert_eq!(select_version(&m, "^4.17.0").unwrap(), "4.17.2");
        assert_eq!(select_version(&m, "~4.16").unwrap(), "4.16.0");
        assert_eq!(select_version(&m, "*").unwrap(), "4.17.2");
        assert_eq!(select_version(&m, "").unwrap(), "4.17.2");
        assert_eq!(select_version(&m, ">=5.0.0-beta.0").unwrap(), "5.0.0-beta.1");
    }

    #[test]
    fn test_dist_tags() {
        let m = metadata("next-app", &["1.0.0", "2.0.0-rc.1"], &[("next", "2.0.0-rc.1")]);
        assert_eq!(select_version(&m, "next").unwrap(), "2.0.0-rc.1");

        let err = select_version(&m, "latest").unwrap_err();
        assert_eq!(err.kind(), "latest_not_found");
    }

    #[test]
    fn test_resolution_errors() {
        let m = metadata("express", &["4.17.1"], &[]);

        let err = select_version(&m, "^5.0.0").unwrap_err();
        assert!(matches!(err, SprigError::NoMatchingVersion { ref constraint, .. } if constraint == "^5.0.0"));

        let err = select_version(&m, "not a range!").unwrap_err();
        assert_eq!(err.kind(), "invalid_constraint");
    }

    #[test]
    fn test_selector_keeps_original_key() {
        let selector = VersionSelector::from_keys(["v1.2.3", "1.0.0"]);
        assert_eq!(selector.len(), 2);
        assert_eq!(selector.select_best(&VersionReq::any()), Some("v1.2.3"));
        assert_eq!(selector.highest_version(), Some(&Version::new(1, 2, 3)));
    }
}

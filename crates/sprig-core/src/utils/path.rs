//! Path utilities for safe file system operations.
//!
//! Package names and versions become directory names under the cache root,
//! so they are checked here before any filesystem access.

use crate::error::{SprigError, SprigResult};
use std::path::{Component, Path, PathBuf};

const MAX_NAME_LENGTH: usize = 214;

/// Check if a relative path stays inside its base directory
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => {
                depth += 1;
            },
            // Prefix or RootDir inside a relative path
            _ => return false,
        }
    }

    true
}

/// Join `path` onto `base`, refusing anything that could escape it
pub fn safe_join(base: &Path, path: &Path) -> SprigResult<PathBuf> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes || !is_safe_path(path) {
        return Err(SprigError::InvalidPackageName {
            name: path.display().to_string(),
            reason: "path would escape the cache root".to_string(),
        });
    }

    Ok(base.join(path))
}

fn invalid(name: &str, reason: &str) -> SprigError {
    SprigError::InvalidPackageName {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

fn check_segment(name: &str, segment: &str) -> SprigResult<()> {
    if segment.is_empty() {
        return Err(invalid(name, "empty name segment"));
    }
    if segment == "." || segment == ".." {
        return Err(invalid(name, "relative path segment"));
    }
    if segment.starts_with('.') || segment.starts_with('_') {
        return Err(invalid(name, "name cannot start with '.' or '_'"));
    }
    if segment
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '\\' | ':' | '/'))
    {
        return Err(invalid(name, "name contains characters not allowed in paths"));
    }
    Ok(())
}

/// Validate a package name (`pkg` or `@scope/pkg`) for use as a cache path
pub fn validate_package_name(name: &str) -> SprigResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "name is empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(invalid(name, "name is longer than 214 characters"));
    }

    match name.strip_prefix('@') {
        Some(scoped) => {
            let (scope, package) = scoped
                .split_once('/')
                .ok_or_else(|| invalid(name, "scoped name must look like @scope/name"))?;
            check_segment(name, scope)?;
            check_segment(name, package)
        },
        None => check_segment(name, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_safe_path() {
        assert!(is_safe_path(Path::new("express/4.17.1")));
        assert!(is_safe_path(Path::new("./express")));
        assert!(!is_safe_path(Path::new("../../../etc/passwd")));
        assert!(!is_safe_path(Path::new("/absolute/path")));
    }

    #[test]
    fn test_safe_join() {
        let base = Path::new("/home/user/.sprig/cache");

        let result = safe_join(base, Path::new("@types/node/20.1.0")).unwrap();
        assert_eq!(result, Path::new("/home/user/.sprig/cache/@types/node/20.1.0"));

        assert!(safe_join(base, Path::new("../escape")).is_err());
        assert!(safe_join(base, Path::new("./express")).is_err());
        assert!(safe_join(base, Path::new("/etc")).is_err());
    }

    #[test]
    fn test_validate_package_name() {
        assert!(validate_package_name("express").is_ok());
        assert!(validate_package_name("@babel/core").is_ok());
        assert!(validate_package_name("lodash.merge").is_ok());

        for bad in ["", "..", "../x", "@scope", "@/pkg", "@scope/", "a/b", ".hidden", "has space"] {
            let err = validate_package_name(bad).unwrap_err();
            assert_eq!(err.kind(), "invalid_package_name", "{:?}", bad);
        }
        assert!(validate_package_name(&"a".repeat(215)).is_err());
    }
}

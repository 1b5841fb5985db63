//! Semantic versions and npm-style version ranges.
//!
//! `Version` follows semver precedence. `VersionReq` understands the range
//! syntax found in package manifests (`^1.2.0`, `~1.2`, `1.x`, `>=1 <2`,
//! `1.0.0 - 2.0.0`, `a || b`) and desugars it into plain comparators at
//! parse time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version requirement: one or more `||` alternatives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    pub alternatives: Vec<ComparatorSet>,
}

/// Conjunction of comparators; an empty set matches any release
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComparatorSet {
    pub comparators: Vec<Comparator>,
}

/// Primitive comparator produced by desugaring a range token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

/// Comparison operator for desugared comparators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
}

/// Range operators as written, before desugaring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Tilde,
    Caret,
}

/// Partial version as written in a range (may have missing components)
#[derive(Debug, Clone, PartialEq, Eq)]
struct PartialVersion {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    prerelease: Option<String>,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number in version: {component}")]
    InvalidNumber { component: String },

    #[error("Invalid prerelease identifier: {prerelease}")]
    InvalidPrerelease { prerelease: String },

    #[error("Invalid build metadata: {build}")]
    InvalidBuild { build: String },

    #[error("Invalid range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Compare by semver precedence, ignoring build metadata
    pub fn cmp_precedence(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }

    fn same_release(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor && self.patch == other.patch
    }
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            },
        }
    }
}

fn valid_identifiers(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|id| {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

fn parse_number(component: &str) -> Result<u64, VersionError> {
    if component.is_empty() || !component.chars().all(|c| c.is_ascii_digit()) {
        return Err(VersionError::InvalidNumber {
            component: component.to_string(),
        });
    }
    component.parse().map_err(|_| VersionError::InvalidNumber {
        component: component.to_string(),
    })
}

/// Split `core-prerelease+build`, validating both tails
fn split_tail(input: &str) -> Result<(&str, Option<String>, Option<String>), VersionError> {
    let (version_part, build) = match input.split_once('+') {
        Some((v, b)) => {
            if !valid_identifiers(b) {
                return Err(VersionError::InvalidBuild {
                    build: b.to_string(),
                });
            }
            (v, Some(b.to_string()))
        },
        None => (input, None),
    };

    let (core_part, prerelease) = match version_part.split_once('-') {
        Some((c, p)) => {
            if !valid_identifiers(p) {
                return Err(VersionError::InvalidPrerelease {
                    prerelease: p.to_string(),
                });
            }
            (c, Some(p.to_string()))
        },
        None => (version_part, None),
    };

    Ok((core_part, prerelease, build))
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let stripped = input.strip_prefix('v').unwrap_or(input);

        let (core_part, prerelease, build) = split_tail(stripped)?;

        let parts: Vec<&str> = core_part.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        Ok(Version {
            major: parse_number(parts[0])?,
            minor: parse_number(parts[1])?,
            patch: parse_number(parts[2])?,
            prerelease,
            build,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Raw strings break ties between identifiers like "01" and "1",
        // then build metadata, so Ord agrees with Eq.
        self.cmp_precedence(other)
            .then_with(|| self.prerelease.cmp(&other.prerelease))
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl VersionReq {
    /// Requirement matching every release
    pub fn any() -> Self {
        Self {
            alternatives: vec![ComparatorSet::default()],
        }
    }

    /// Parse a version requirement string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let input = input.trim();

        let alternatives = input
            .split("||")
            .map(|alternative| parse_alternative(alternative.trim(), input))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VersionReq { alternatives })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|set| set.matches(version))
    }

    /// True when this requirement accepts every release
    pub fn is_any(&self) -> bool {
        self.alternatives.iter().any(|set| set.comparators.is_empty())
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionReq::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, set) in self.alternatives.iter().enumerate() {
            if i > 0 {
                write!(f, " || ")?;
            }
            write!(f, "{}", set)?;
        }
        Ok(())
    }
}

impl ComparatorSet {
    /// Check if a version satisfies every comparator in the set.
    ///
    /// A prerelease only matches when some comparator names a prerelease
    /// of the same `major.minor.patch`.
    pub fn matches(&self, version: &Version) -> bool {
        if !self.comparators.iter().all(|comp| comp.matches(version)) {
            return false;
        }

        if version.is_prerelease() {
            return self
                .comparators
                .iter()
                .any(|comp| comp.version.is_prerelease() && comp.version.same_release(version));
        }

        true
    }
}

impl fmt::Display for ComparatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparators.is_empty() {
            return write!(f, "*");
        }
        for (i, comp) in self.comparators.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", comp)?;
        }
        Ok(())
    }
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        let ordering = version.cmp_precedence(&self.version);
        match self.op {
            Op::Exact => ordering == Ordering::Equal,
            Op::Greater => ordering == Ordering::Greater,
            Op::GreaterEq => ordering != Ordering::Less,
            Op::Less => ordering == Ordering::Less,
            Op::LessEq => ordering != Ordering::Greater,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
        };
        write!(f, "{}{}", op, self.version)
    }
}

fn invalid_range(input: &str, reason: impl Into<String>) -> VersionError {
    VersionError::InvalidRange {
        input: input.to_string(),
        reason: reason.into(),
    }
}

fn parse_alternative(alternative: &str, input: &str) -> Result<ComparatorSet, VersionError> {
    if alternative.is_empty() {
        return Ok(ComparatorSet::default());
    }

    // Hyphen ranges need whitespace around the dash to stay distinct from prereleases
    if let Some((low, high)) = alternative.split_once(" - ") {
        let low = parse_partial(low.trim(), input)?;
        let high = parse_partial(high.trim(), input)?;
        let mut comparators = Vec::new();
        if low.major.is_some() {
            comparators.push(Comparator::new(Op::GreaterEq, low.floor()));
        }
        comparators.extend(desugar(RangeOp::LessEq, &high));
        return Ok(ComparatorSet { comparators });
    }

    let mut comparators = Vec::new();
    let mut tokens = alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());

    while let Some(token) = tokens.next() {
        let (op, rest) = split_operator(token);
        let version_text = if rest.is_empty() {
            // Operator written apart from its version: ">= 1.2.3"
            tokens
                .next()
                .ok_or_else(|| invalid_range(input, format!("operator '{}' has no version", token)))?
        } else {
            rest
        };
        let partial = parse_partial(version_text, input)?;
        comparators.extend(desugar(op, &partial));
    }

    Ok(ComparatorSet { comparators })
}

fn split_operator(token: &str) -> (RangeOp, &str) {
    const OPERATORS: [(&str, RangeOp); 8] = [
        (">=", RangeOp::GreaterEq),
        ("<=", RangeOp::LessEq),
        ("~>", RangeOp::Tilde),
        (">", RangeOp::Greater),
        ("<", RangeOp::Less),
        ("=", RangeOp::Exact),
        ("~", RangeOp::Tilde),
        ("^", RangeOp::Caret),
    ];

    for (prefix, op) in OPERATORS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest.trim_start_matches('='));
        }
    }
    (RangeOp::Exact, token)
}

fn parse_partial(text: &str, input: &str) -> Result<PartialVersion, VersionError> {
    let text = text.strip_prefix('v').unwrap_or(text);
    if text.is_empty() {
        return Err(invalid_range(input, "empty version"));
    }

    let (core_part, prerelease, _build) = split_tail(text)?;
    let parts: Vec<&str> = core_part.split('.').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(invalid_range(input, format!("malformed version '{}'", text)));
    }

    let mut numbers = [None; 3];
    let mut wildcard_seen = false;
    for (slot, part) in numbers.iter_mut().zip(parts.iter()) {
        if matches!(*part, "x" | "X" | "*") {
            wildcard_seen = true;
        } else if wildcard_seen {
            return Err(invalid_range(
                input,
                format!("number after wildcard in '{}'", text),
            ));
        } else {
            *slot = Some(parse_number(part)?);
        }
    }

    let partial = PartialVersion {
        major: numbers[0],
        minor: numbers[1],
        patch: numbers[2],
        prerelease,
    };

    if partial.prerelease.is_some() && partial.patch.is_none() {
        return Err(invalid_range(
            input,
            format!("prerelease on partial version '{}'", text),
        ));
    }

    Ok(partial)
}

impl PartialVersion {
    /// Fill missing components with zero
    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            prerelease: self.prerelease.clone(),
            build: None,
        }
    }
}

/// Expand one range token into primitive comparators
fn desugar(op: RangeOp, partial: &PartialVersion) -> Vec<Comparator> {
    let floor = partial.floor();

    let Some(major) = partial.major else {
        return match op {
            // Nothing is below or above every version
            RangeOp::Greater | RangeOp::Less => {
                vec![Comparator::new(Op::Less, Version::new(0, 0, 0))]
            },
            _ => Vec::new(),
        };
    };

    let next_major = Version::new(major.saturating_add(1), 0, 0);
    let next_minor = |minor: u64| Version::new(major, minor.saturating_add(1), 0);

    match op {
        RangeOp::Exact => match (partial.minor, partial.patch) {
            (Some(_), Some(_)) => vec![Comparator::new(Op::Exact, floor)],
            (Some(minor), None) => vec![
                Comparator::new(Op::GreaterEq, floor),
                Comparator::new(Op::Less, next_minor(minor)),
            ],
            _ => vec![
                Comparator::new(Op::GreaterEq, floor),
                Comparator::new(Op::Less, next_major),
            ],
        },
        RangeOp::Greater => match (partial.minor, partial.patch) {
            (Some(_), Some(_)) => vec![Comparator::new(Op::Greater, floor)],
            (Some(minor), None) => vec![Comparator::new(Op::GreaterEq, next_minor(minor))],
            _ => vec![Comparator::new(Op::GreaterEq, next_major)],
        },
        RangeOp::GreaterEq => vec![Comparator::new(Op::GreaterEq, floor)],
        RangeOp::Less => vec![Comparator::new(Op::Less, floor)],
        RangeOp::LessEq => match (partial.minor, partial.patch) {
            (Some(_), Some(_)) => vec![Comparator::new(Op::LessEq, floor)],
            (Some(minor), None) => vec![Comparator::new(Op::Less, next_minor(minor))],
            _ => vec![Comparator::new(Op::Less, next_major)],
        },
        RangeOp::Tilde => {
            let upper = match partial.minor {
                Some(minor) => next_minor(minor),
                None => next_major,
            };
            vec![
                Comparator::new(Op::GreaterEq, floor),
                Comparator::new(Op::Less, upper),
            ]
        },
        RangeOp::Caret => {
            let upper = match (major, partial.minor, partial.patch) {
                (0, Some(0), Some(patch)) => Version::new(0, 0, patch.saturating_add(1)),
                (0, Some(minor), _) => next_minor(minor),
                _ => next_major,
            };
            vec![
                Comparator::new(Op::GreaterEq, floor),
                Comparator::new(Op::Less, upper),
            ]
        },
    }
}

//! Semantic version parsing and normalization.
//!
//! Versions have two to four numeric components, an optional dot-separated
//! list of release labels after `-` and optional build metadata after `+`:
//! - `1.0` is normalized to `1.0.0`
//! - `1.0.0.0` drops the zero revision when normalized
//! - `1.0.0-beta.1+sha.5114f85` keeps its labels; metadata is informational
//!
//! Ordering, equality and hashing follow [`VersionComparison::Default`], so
//! build metadata never takes part in them.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use nugraph_util::errors::NuGraphError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::comparer::{VersionComparer, VersionComparison};

/// Largest value accepted for a numeric component.
pub const MAX_COMPONENT: u32 = i32::MAX as u32;

#[derive(Debug, Clone)]
pub struct SemanticVersion {
    major: u32,
    minor: u32,
    patch: u32,
    revision: u32,
    release_labels: Vec<String>,
    metadata: Option<String>,
}

impl SemanticVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            release_labels: Vec::new(),
            metadata: None,
        }
    }

    pub fn with_revision(mut self, revision: u32) -> Self {
        self.revision = revision;
        self
    }

    pub fn with_release_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.release_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// Parse a version string such as `1.2.3-beta.1+build.7`.
    pub fn parse(value: &str) -> Result<Self, NuGraphError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(invalid(value, "empty version string"));
        }

        let (rest, metadata) = match trimmed.split_once('+') {
            Some((rest, meta)) => (rest, Some(meta)),
            None => (trimmed, None),
        };
        let (numbers, release) = match rest.split_once('-') {
            Some((numbers, release)) => (numbers, Some(release)),
            None => (rest, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(invalid(value, "expected 2 to 4 numeric components"));
        }
        let mut components = [0u32; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = parse_component(value, part)?;
        }

        let mut release_labels = Vec::new();
        if let Some(release) = release {
            for label in release.split('.') {
                if !is_valid_identifier(label) {
                    return Err(invalid(value, "invalid release label"));
                }
                if label.len() > 1 && label.starts_with('0') && is_numeric(label) {
                    return Err(invalid(value, "numeric release label has a leading zero"));
                }
                release_labels.push(label.to_string());
            }
        }

        if let Some(meta) = metadata {
            if !meta.split('.').all(is_valid_identifier) {
                return Err(invalid(value, "invalid build metadata"));
            }
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            revision: components[3],
            release_labels,
            metadata: metadata.map(str::to_string),
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn release_labels(&self) -> &[String] {
        &self.release_labels
    }

    /// Release labels joined with `.`, empty for stable versions.
    pub fn release(&self) -> String {
        self.release_labels.join(".")
    }

    pub fn is_prerelease(&self) -> bool {
        !self.release_labels.is_empty()
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.as_deref().is_some_and(|m| !m.is_empty())
    }

    /// `major.minor.patch[.revision]` without labels or metadata.
    pub fn numeric_string(&self) -> String {
        if self.revision > 0 {
            format!(
                "{}.{}.{}.{}",
                self.major, self.minor, self.patch, self.revision
            )
        } else {
            format!("{}.{}.{}", self.major, self.minor, self.patch)
        }
    }

    /// Normalized form without build metadata.
    pub fn to_normalized_string(&self) -> String {
        if self.is_prerelease() {
            format!("{}-{}", self.numeric_string(), self.release())
        } else {
            self.numeric_string()
        }
    }

    /// Drop the release labels and metadata.
    pub fn stable(&self) -> Self {
        Self::new(self.major, self.minor, self.patch).with_revision(self.revision)
    }
}

fn invalid(value: &str, reason: &str) -> NuGraphError {
    NuGraphError::parse(format!("'{value}' is not a valid version string: {reason}"))
}

fn parse_component(value: &str, part: &str) -> Result<u32, NuGraphError> {
    if part.is_empty() || !is_numeric(part) {
        return Err(invalid(value, "version components must be numeric"));
    }
    match part.parse::<u32>() {
        Ok(n) if n <= MAX_COMPONENT => Ok(n),
        _ => Err(invalid(value, "version component is out of range")),
    }
}

fn is_numeric(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

impl FromStr for SemanticVersion {
    type Err = NuGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_normalized_string())?;
        if let Some(meta) = self.metadata.as_deref().filter(|m| !m.is_empty()) {
            write!(f, "+{meta}")?;
        }
        Ok(())
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        VersionComparer::new(VersionComparison::Default).compare(self, other)
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for SemanticVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        VersionComparer::new(VersionComparison::Default)
            .hash(self)
            .hash(state);
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

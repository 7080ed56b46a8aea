use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use nugraph_util::casing::{cmp_ignore_case, eq_ignore_case};
use nugraph_util::hash::HashCodeCombiner;
use nugraph_versioning::{SemanticVersion, VersionComparer, VersionComparison};
use serde::{Deserialize, Serialize};

/// A package id and version: the unit of resolution.
///
/// Ids compare case-insensitively; versions ignore build metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageIdentity {
    id: String,
    version: SemanticVersion,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: SemanticVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &SemanticVersion {
        &self.version
    }

    /// Same id regardless of version.
    pub fn has_id(&self, id: &str) -> bool {
        eq_ignore_case(&self.id, id)
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.version.to_normalized_string())
    }
}

impl PartialEq for PackageIdentity {
    fn eq(&self, other: &Self) -> bool {
        PackageIdentityComparer::default().equals(self, other)
    }
}

impl Eq for PackageIdentity {}

impl Hash for PackageIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        PackageIdentityComparer::default().hash(self).hash(state);
    }
}

impl Ord for PackageIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        PackageIdentityComparer::default().compare(self, other)
    }
}

impl PartialOrd for PackageIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Identity comparison under a configurable version strictness.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageIdentityComparer {
    versions: VersionComparer,
}

impl PackageIdentityComparer {
    pub const fn new(mode: VersionComparison) -> Self {
        Self {
            versions: VersionComparer::new(mode),
        }
    }

    pub fn equals(&self, a: &PackageIdentity, b: &PackageIdentity) -> bool {
        eq_ignore_case(&a.id, &b.id) && self.versions.equals(&a.version, &b.version)
    }

    pub fn hash(&self, identity: &PackageIdentity) -> u64 {
        let mut combiner = HashCodeCombiner::new();
        combiner
            .add_str_ignore_case(&identity.id)
            .add_hash(self.versions.hash(&identity.version));
        combiner.finish()
    }

    /// Orders by id, then version.
    pub fn compare(&self, a: &PackageIdentity, b: &PackageIdentity) -> Ordering {
        cmp_ignore_case(&a.id, &b.id).then_with(|| self.versions.compare(&a.version, &b.version))
    }
}

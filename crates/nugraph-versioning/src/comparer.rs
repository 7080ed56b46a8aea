//! Configurable version comparison.
//!
//! Release labels use semver precedence:
//! - labels are compared component-wise
//! - numeric labels compare numerically and sort before alphanumeric ones
//! - alphanumeric labels compare ordinally, ignoring case
//! - a version without labels sorts after any prerelease of the same numbers

use std::cmp::Ordering;

use nugraph_util::casing::cmp_ignore_case;
use nugraph_util::hash::{hash_ignore_case, HashCodeCombiner};

use crate::version::SemanticVersion;

/// How strictly two versions are compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VersionComparison {
    /// Numbers and release labels, metadata ignored.
    #[default]
    Default,
    /// `major.minor.patch.revision` only.
    Version,
    /// Numbers and release labels.
    VersionRelease,
    /// Numbers, release labels and build metadata.
    VersionReleaseMetadata,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VersionComparer {
    mode: VersionComparison,
}

impl VersionComparer {
    pub const fn new(mode: VersionComparison) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> VersionComparison {
        self.mode
    }

    pub fn compare(&self, a: &SemanticVersion, b: &SemanticVersion) -> Ordering {
        let ord = (a.major(), a.minor(), a.patch(), a.revision()).cmp(&(
            b.major(),
            b.minor(),
            b.patch(),
            b.revision(),
        ));
        if ord != Ordering::Equal || self.mode == VersionComparison::Version {
            return ord;
        }

        let ord = compare_release_labels(a.release_labels(), b.release_labels());
        if ord != Ordering::Equal {
            return ord;
        }

        if self.mode == VersionComparison::VersionReleaseMetadata {
            return cmp_ignore_case(a.metadata().unwrap_or(""), b.metadata().unwrap_or(""));
        }
        Ordering::Equal
    }

    pub fn equals(&self, a: &SemanticVersion, b: &SemanticVersion) -> bool {
        self.compare(a, b) == Ordering::Equal
    }

    /// Hash consistent with [`Self::equals`] for this mode.
    pub fn hash(&self, version: &SemanticVersion) -> u64 {
        let mut combiner = HashCodeCombiner::new();
        combiner
            .add(&version.major())
            .add(&version.minor())
            .add(&version.patch())
            .add(&version.revision());

        if self.mode != VersionComparison::Version {
            combiner.add(&version.release_labels().len());
            for label in version.release_labels() {
                match numeric_label(label) {
                    Some(n) => combiner.add(&n),
                    None => combiner.add_hash(hash_ignore_case(label)),
                };
            }
        }

        if self.mode == VersionComparison::VersionReleaseMetadata {
            combiner.add_str_ignore_case(version.metadata().unwrap_or(""));
        }
        combiner.finish()
    }
}

/// Compare two release label lists by semver precedence.
pub fn compare_release_labels(a: &[String], b: &[String]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    for (x, y) in a.iter().zip(b) {
        let ord = compare_label(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

fn compare_label(x: &str, y: &str) -> Ordering {
    match (numeric_label(x), numeric_label(y)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => cmp_ignore_case(x, y),
    }
}

fn numeric_label(label: &str) -> Option<u64> {
    if label.is_empty() || !label.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    label.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> SemanticVersion {
        SemanticVersion::parse(s).unwrap()
    }

    #[test]
    fn semver_precedence_chain() {
        let chain = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in chain.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn version_mode_ignores_labels() {
        let cmp = VersionComparer::new(VersionComparison::Version);
        assert!(cmp.equals(&v("1.0.0-beta"), &v("1.0.0")));
        assert_eq!(cmp.hash(&v("1.0.0-beta")), cmp.hash(&v("1.0.0")));
    }

    #[test]
    fn metadata_mode_compares_metadata() {
        let strict = VersionComparer::new(VersionComparison::VersionReleaseMetadata);
        assert!(!strict.equals(&v("1.0.0+a"), &v("1.0.0+b")));
        assert!(strict.equals(&v("1.0.0+ABC"), &v("1.0.0+abc")));

        let default = VersionComparer::default();
        assert!(default.equals(&v("1.0.0+a"), &v("1.0.0+b")));
        assert_eq!(default.hash(&v("1.0.0+a")), default.hash(&v("1.0.0+b")));
    }

    #[test]
    fn case_insensitive_labels_hash_alike() {
        let cmp = VersionComparer::new(VersionComparison::VersionRelease);
        assert!(cmp.equals(&v("2.0.0-RC.1"), &v("2.0.0-rc.1")));
        assert_eq!(cmp.hash(&v("2.0.0-RC.1")), cmp.hash(&v("2.0.0-rc.1")));
    }
}

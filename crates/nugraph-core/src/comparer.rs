//! Equality and hashing for dependency values.
//!
//! Ids and asset names compare case-insensitively, a missing version range is
//! the same as the unbounded range, and collections compare as sets so the
//! hash of a value never depends on declaration order.

use nugraph_util::casing::{cmp_ignore_case, eq_ignore_case};
use nugraph_util::hash::{hash_ignore_case, HashCodeCombiner};
use nugraph_versioning::{VersionComparison, VersionRangeComparer};

use crate::dependency::{LibraryDependency, LibraryRange, PackageDependency, PackageDependencyInfo};
use crate::identity::PackageIdentityComparer;

fn sorted_ignore_case(values: &[String]) -> Vec<&str> {
    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
    sorted.sort_by(|a, b| cmp_ignore_case(a, b));
    sorted
}

fn lists_equal_ignore_case(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && sorted_ignore_case(a)
            .iter()
            .zip(sorted_ignore_case(b))
            .all(|(x, y)| eq_ignore_case(x, y))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PackageDependencyComparer {
    ranges: VersionRangeComparer,
}

impl PackageDependencyComparer {
    pub const fn new(mode: VersionComparison) -> Self {
        Self {
            ranges: VersionRangeComparer::new(mode),
        }
    }

    pub fn equals(&self, a: &PackageDependency, b: &PackageDependency) -> bool {
        eq_ignore_case(&a.id, &b.id)
            && self
                .ranges
                .equals(a.version_range.as_ref(), b.version_range.as_ref())
            && lists_equal_ignore_case(&a.include, &b.include)
            && lists_equal_ignore_case(&a.exclude, &b.exclude)
    }

    pub fn hash(&self, dependency: &PackageDependency) -> u64 {
        let mut combiner = HashCodeCombiner::new();
        combiner
            .add_str_ignore_case(&dependency.id)
            .add_hash(self.ranges.hash(dependency.version_range.as_ref()));
        for name in sorted_ignore_case(&dependency.include) {
            combiner.add_str_ignore_case(name);
        }
        combiner.add(&'|');
        for name in sorted_ignore_case(&dependency.exclude) {
            combiner.add_str_ignore_case(name);
        }
        combiner.finish()
    }
}

/// Identity plus dependency set equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageDependencyInfoComparer {
    identities: PackageIdentityComparer,
    dependencies: PackageDependencyComparer,
}

impl PackageDependencyInfoComparer {
    pub const fn new(mode: VersionComparison) -> Self {
        Self {
            identities: PackageIdentityComparer::new(mode),
            dependencies: PackageDependencyComparer::new(mode),
        }
    }

    /// Dependencies compare as sets: same distinct count and every member of
    /// one is found in the other.
    pub fn equals(&self, a: &PackageDependencyInfo, b: &PackageDependencyInfo) -> bool {
        if !self.identities.equals(&a.identity, &b.identity) {
            return false;
        }
        let left = self.distinct(&a.dependencies);
        let right = self.distinct(&b.dependencies);
        left.len() == right.len()
            && left
                .iter()
                .all(|x| right.iter().any(|y| self.dependencies.equals(x, y)))
    }

    pub fn hash(&self, info: &PackageDependencyInfo) -> u64 {
        let distinct = self.distinct(&info.dependencies);
        let mut combiner = HashCodeCombiner::new();
        combiner
            .add_hash(self.identities.hash(&info.identity))
            .add_unordered(distinct.iter().map(|d| self.dependencies.hash(d)));
        combiner.finish()
    }

    fn distinct<'a>(&self, dependencies: &'a [PackageDependency]) -> Vec<&'a PackageDependency> {
        let mut distinct: Vec<&PackageDependency> = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            if !distinct.iter().any(|d| self.dependencies.equals(d, dependency)) {
                distinct.push(dependency);
            }
        }
        distinct
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryRangeComparer {
    ranges: VersionRangeComparer,
}

impl LibraryRangeComparer {
    pub const fn new(mode: VersionComparison) -> Self {
        Self {
            ranges: VersionRangeComparer::new(mode),
        }
    }

    pub fn equals(&self, a: &LibraryRange, b: &LibraryRange) -> bool {
        eq_ignore_case(&a.name, &b.name)
            && a.type_constraint == b.type_constraint
            && self
                .ranges
                .equals(a.version_range.as_ref(), b.version_range.as_ref())
    }

    pub fn hash(&self, range: &LibraryRange) -> u64 {
        let mut combiner = HashCodeCombiner::new();
        combiner
            .add_hash(hash_ignore_case(&range.name))
            .add(&range.type_constraint.bits())
            .add_hash(self.ranges.hash(range.version_range.as_ref()));
        combiner.finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryDependencyComparer {
    ranges: LibraryRangeComparer,
}

impl LibraryDependencyComparer {
    pub const fn new(mode: VersionComparison) -> Self {
        Self {
            ranges: LibraryRangeComparer::new(mode),
        }
    }

    pub fn equals(&self, a: &LibraryDependency, b: &LibraryDependency) -> bool {
        self.ranges.equals(&a.library_range, &b.library_range)
            && a.include_type == b.include_type
            && a.suppress_parent == b.suppress_parent
            && a.reference_type == b.reference_type
            && a.version_centrally_managed == b.version_centrally_managed
            && a.auto_referenced == b.auto_referenced
    }

    pub fn hash(&self, dependency: &LibraryDependency) -> u64 {
        let mut combiner = HashCodeCombiner::new();
        combiner
            .add_hash(self.ranges.hash(&dependency.library_range))
            .add(&dependency.include_type.bits())
            .add(&dependency.suppress_parent.bits())
            .add(&dependency.reference_type)
            .add(&dependency.version_centrally_managed)
            .add(&dependency.auto_referenced);
        combiner.finish()
    }
}

use std::collections::BTreeMap;

use nugraph_versioning::VersionRange;

use crate::dependency::LibraryDependency;

/// Centrally declared package versions, keyed by id without regard to case.
#[derive(Debug, Clone, Default)]
pub struct CentralPackageVersions {
    // lowercased id -> (declared id, range)
    versions: BTreeMap<String, (String, VersionRange)>,
}

impl CentralPackageVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `id`, replacing any earlier declaration of the same id.
    pub fn insert(&mut self, id: impl Into<String>, range: VersionRange) {
        let id = id.into();
        self.versions.insert(id.to_lowercase(), (id, range));
    }

    pub fn get(&self, id: &str) -> Option<&VersionRange> {
        self.versions.get(&id.to_lowercase()).map(|(_, range)| range)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.versions.contains_key(&id.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VersionRange)> {
        self.versions
            .values()
            .map(|(id, range)| (id.as_str(), range))
    }

    /// The edge with its central version applied.
    ///
    /// Only a package-capable dependency without its own range is rewritten;
    /// everything else comes back unchanged.
    pub fn apply(&self, dependency: &LibraryDependency) -> LibraryDependency {
        if dependency.library_range.version_range.is_some()
            || !dependency.library_range.type_constraint_allows_packages()
        {
            return dependency.clone();
        }
        match self.get(dependency.name()) {
            Some(range) => {
                let mut managed = dependency.clone();
                managed.library_range.version_range = Some(range.clone());
                managed.version_centrally_managed = true;
                managed
            }
            None => dependency.clone(),
        }
    }
}

impl FromIterator<(String, VersionRange)> for CentralPackageVersions {
    fn from_iter<T: IntoIterator<Item = (String, VersionRange)>>(iter: T) -> Self {
        let mut versions = Self::new();
        for (id, range) in iter {
            versions.insert(id, range);
        }
        versions
    }
}

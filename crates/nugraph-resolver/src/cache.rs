//! Per-resolution memo of provider lookups.
//!
//! Every distinct (library range, framework) pair is looked up once per
//! `resolve` call, so a package reached through several paths in a diamond
//! costs a single provider round trip.

use std::collections::HashMap;
use std::sync::Arc;

use nugraph_core::dependency::{LibraryDependency, LibraryRange};
use nugraph_core::framework::TargetFramework;
use nugraph_core::identity::PackageIdentity;

/// Cache key: a library range under one target framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryRangeCacheKey {
    pub range: LibraryRange,
    pub framework: TargetFramework,
}

impl LibraryRangeCacheKey {
    pub fn new(range: LibraryRange, framework: TargetFramework) -> Self {
        Self { range, framework }
    }
}

/// A resolved library: the chosen identity, the source that supplied it and
/// the dependencies it declares for the framework.
#[derive(Debug, Clone)]
pub struct GraphItem {
    pub identity: PackageIdentity,
    pub provider: String,
    pub dependencies: Vec<LibraryDependency>,
}

/// Lookup results keyed by [`LibraryRangeCacheKey`]. `None` entries record
/// ranges no source could satisfy.
#[derive(Debug, Default)]
pub struct WalkCache {
    entries: HashMap<LibraryRangeCacheKey, Option<Arc<GraphItem>>>,
    hits: usize,
    misses: usize,
}

impl WalkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `key`, counting the hit or miss.
    pub fn get(&mut self, key: &LibraryRangeCacheKey) -> Option<Option<Arc<GraphItem>>> {
        match self.entries.get(key) {
            Some(item) => {
                self.hits += 1;
                tracing::trace!("Lookup cache hit: {}", key.range);
                Some(item.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn contains(&self, key: &LibraryRangeCacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(
        &mut self,
        key: LibraryRangeCacheKey,
        item: Option<GraphItem>,
    ) -> Option<Arc<GraphItem>> {
        let item = item.map(Arc::new);
        self.entries.insert(key, item.clone());
        item
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use nugraph_util::casing::{cmp_ignore_case, eq_ignore_case};
use nugraph_util::hash::hash_ignore_case;
use serde::{Deserialize, Serialize};

/// A target framework moniker such as `net8.0` or `netstandard2.0`.
///
/// The resolver treats frameworks as opaque keys: one graph is built per
/// framework and provider lookups are cached per framework. Monikers compare
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetFramework(String);

impl TargetFramework {
    pub fn new(moniker: impl Into<String>) -> Self {
        Self(moniker.into().trim().to_string())
    }

    /// The framework-agnostic moniker used when no framework applies.
    pub fn any() -> Self {
        Self::new("any")
    }

    pub fn is_any(&self) -> bool {
        eq_ignore_case(&self.0, "any")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TargetFramework {
    fn default() -> Self {
        Self::any()
    }
}

impl From<&str> for TargetFramework {
    fn from(moniker: &str) -> Self {
        Self::new(moniker)
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq for TargetFramework {
    fn eq(&self, other: &Self) -> bool {
        eq_ignore_case(&self.0, &other.0)
    }
}

impl Eq for TargetFramework {}

impl Hash for TargetFramework {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_ignore_case(&self.0).hash(state);
    }
}

impl Ord for TargetFramework {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ignore_case(&self.0, &other.0)
    }
}

impl PartialOrd for TargetFramework {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

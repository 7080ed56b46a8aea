//! Version conflict and downgrade reporting.

use std::fmt;

use nugraph_versioning::SemanticVersion;

/// A report of all version conflicts encountered during resolution.
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// A package reached at a version other than the one selected.
#[derive(Debug, Clone)]
pub struct VersionConflict {
    pub id: String,
    /// Range requested by the rejected node, pretty printed.
    pub requested: String,
    pub rejected: SemanticVersion,
    pub resolved: SemanticVersion,
    /// Path from the root to the rejected node.
    pub path: String,
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionConflict> {
        self.conflicts.iter()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} ({})",
            self.id,
            self.rejected.to_normalized_string(),
            self.resolved.to_normalized_string(),
            self.reason
        )
    }
}

/// A nearer request selected a lower version than a farther one asked for.
#[derive(Debug, Clone)]
pub struct Downgrade {
    pub id: String,
    /// Lower bound the farther node requested.
    pub from: SemanticVersion,
    /// Version selected through the nearer node.
    pub to: SemanticVersion,
    /// Path to the rejected request, ending in its range.
    pub from_path: String,
    /// Path to the node that won.
    pub to_path: String,
}

impl fmt::Display for Downgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Detected package downgrade: {} from {} to {}\n    {}\n    {}",
            self.id,
            self.from.to_normalized_string(),
            self.to.to_normalized_string(),
            self.from_path,
            self.to_path
        )
    }
}

use std::collections::BTreeMap;
use std::path::Path;

use nugraph_util::errors::NuGraphError;
use nugraph_versioning::VersionRange;
use serde::{Deserialize, Serialize};

use crate::central::CentralPackageVersions;

/// How the winner is chosen when one id is reached at several versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// The node closest to the root wins; ties go to the highest version.
    #[default]
    NearestWins,
    /// The highest version wins; ties go to the node closest to the root.
    HighestWins,
}

/// Resolver settings, usually read from a `nugraph.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default, rename = "conflict-policy")]
    pub conflict_policy: ConflictPolicy,

    #[serde(
        default = "default_max_concurrent_lookups",
        rename = "max-concurrent-lookups"
    )]
    pub max_concurrent_lookups: usize,

    #[serde(default, rename = "ignore-failed-sources")]
    pub ignore_failed_sources: bool,

    #[serde(default = "default_recursive")]
    pub recursive: bool,

    #[serde(default, rename = "central-packages")]
    pub central_packages: CentralPackagesConfig,
}

/// Central package management from `[central-packages]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CentralPackagesConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub versions: BTreeMap<String, String>,
}

fn default_max_concurrent_lookups() -> usize {
    8
}

fn default_recursive() -> bool {
    true
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::default(),
            max_concurrent_lookups: default_max_concurrent_lookups(),
            ignore_failed_sources: false,
            recursive: default_recursive(),
            central_packages: CentralPackagesConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Load and validate a configuration file.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| NuGraphError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let config = Self::parse_toml(&content)?;
        tracing::debug!("Loaded resolver config from {}", path.display());
        Ok(config)
    }

    pub fn parse_toml(content: &str) -> Result<Self, NuGraphError> {
        let config: Self = toml::from_str(content).map_err(|e| NuGraphError::Config {
            message: format!("Failed to parse resolver config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NuGraphError> {
        if self.max_concurrent_lookups == 0 {
            return Err(NuGraphError::Config {
                message: "max-concurrent-lookups must be at least 1".to_string(),
            });
        }
        self.central_versions().map(|_| ())
    }

    /// The central version table, or `None` when central management is off.
    pub fn central_versions(&self) -> Result<Option<CentralPackageVersions>, NuGraphError> {
        if !self.central_packages.enabled {
            return Ok(None);
        }
        let mut versions = CentralPackageVersions::new();
        for (id, range) in &self.central_packages.versions {
            let parsed = VersionRange::parse(range).map_err(|e| NuGraphError::Config {
                message: format!("Invalid central version for '{id}': {e}"),
            })?;
            versions.insert(id.clone(), parsed);
        }
        Ok(Some(versions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResolverConfig::parse_toml("").unwrap();
        assert_eq!(config.conflict_policy, ConflictPolicy::NearestWins);
        assert_eq!(config.max_concurrent_lookups, 8);
        assert!(config.recursive);
        assert!(!config.ignore_failed_sources);
        assert!(config.central_versions().unwrap().is_none());
    }

    #[test]
    fn full_config() {
        let toml = r#"
conflict-policy = "highest-wins"
max-concurrent-lookups = 2
ignore-failed-sources = true
recursive = false

[central-packages]
enabled = true

[central-packages.versions]
"Newtonsoft.Json" = "13.0.1"
Serilog = "[2.0, 3.0)"
"#;
        let config = ResolverConfig::parse_toml(toml).unwrap();
        assert_eq!(config.conflict_policy, ConflictPolicy::HighestWins);
        assert_eq!(config.max_concurrent_lookups, 2);
        assert!(config.ignore_failed_sources);
        assert!(!config.recursive);
        let central = config.central_versions().unwrap().unwrap();
        assert_eq!(central.len(), 2);
        assert!(central.get("serilog").is_some());
    }

    #[test]
    fn invalid_central_range() {
        let toml = r#"
[central-packages]
enabled = true
versions = { Bad = "[1.0" }
"#;
        let err = ResolverConfig::parse_toml(toml).unwrap_err();
        assert!(matches!(err, NuGraphError::Config { .. }));
    }

    #[test]
    fn zero_lookups_rejected() {
        assert!(ResolverConfig::parse_toml("max-concurrent-lookups = 0").is_err());
    }
}

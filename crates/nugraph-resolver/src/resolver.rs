//! Resolution entry point: one walked and analyzed graph per framework.

use std::fmt;
use std::sync::Arc;

use nugraph_core::config::ResolverConfig;
use nugraph_core::dependency::{LibraryDependency, LibraryRange};
use nugraph_core::framework::TargetFramework;
use nugraph_core::identity::PackageIdentity;
use nugraph_util::errors::NuGraphResult;
use nugraph_util::hash::sha256_lines;
use petgraph::graph::NodeIndex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analyze::{analyze, CycleReport, GraphAnalysis};
use crate::cache::WalkCache;
use crate::conflict::{ConflictReport, Downgrade};
use crate::graph::{DependencyGraph, Disposition};
use crate::provider::{DependencyProvider, ProviderSet};
use crate::walker::{DependencyWalker, WalkOptions};

/// The resolved graph for one target framework.
#[derive(Debug)]
pub struct RestoreTargetGraph {
    pub framework: TargetFramework,
    pub graph: DependencyGraph,
    pub analysis: GraphAnalysis,
}

impl RestoreTargetGraph {
    pub fn roots(&self) -> &[NodeIndex] {
        self.graph.roots()
    }

    /// Accepted identities, sorted by id then version, without duplicates.
    pub fn resolved_identities(&self) -> Vec<PackageIdentity> {
        let mut identities: Vec<PackageIdentity> = self
            .graph
            .nodes_bfs()
            .into_iter()
            .map(|idx| self.graph.node(idx))
            .filter(|node| node.disposition == Disposition::Accepted)
            .filter_map(|node| node.item.clone())
            .collect();
        identities.sort();
        identities.dedup();
        identities
    }

    pub fn conflicts(&self) -> &ConflictReport {
        &self.analysis.conflicts
    }

    /// Requested ranges no source could satisfy.
    pub fn unresolved(&self) -> Vec<&LibraryRange> {
        self.analysis
            .unresolved
            .iter()
            .map(|&idx| &self.graph.node(idx).key)
            .collect()
    }

    pub fn cycles(&self) -> &[CycleReport] {
        &self.analysis.cycles
    }

    pub fn downgrades(&self) -> &[Downgrade] {
        &self.analysis.downgrades
    }

    pub fn is_success(&self) -> bool {
        self.analysis.unresolved.is_empty() && self.analysis.cycles.is_empty()
    }

    /// SHA-256 over the sorted accepted identities.
    pub fn fingerprint(&self) -> String {
        let lines = self.fingerprint_lines();
        sha256_lines(lines.iter().map(String::as_str))
    }

    fn fingerprint_lines(&self) -> Vec<String> {
        self.resolved_identities()
            .iter()
            .map(|identity| {
                format!(
                    "{}/{}",
                    identity.id().to_lowercase(),
                    identity.version().to_normalized_string()
                )
            })
            .collect()
    }
}

/// Graphs for every requested framework.
#[derive(Debug)]
pub struct ResolutionResult {
    pub graphs: Vec<RestoreTargetGraph>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl ResolutionResult {
    pub fn graph(&self, framework: &TargetFramework) -> Option<&RestoreTargetGraph> {
        self.graphs.iter().find(|g| g.framework == *framework)
    }

    pub fn is_success(&self) -> bool {
        self.graphs.iter().all(RestoreTargetGraph::is_success)
    }

    /// SHA-256 over every framework's accepted identities.
    pub fn fingerprint(&self) -> String {
        let mut lines = Vec::new();
        for graph in &self.graphs {
            let framework = graph.framework.as_str().to_lowercase();
            lines.extend(
                graph
                    .fingerprint_lines()
                    .into_iter()
                    .map(|line| format!("{framework}|{line}")),
            );
        }
        sha256_lines(lines.iter().map(String::as_str))
    }

    pub fn report(&self) -> ResolutionReport {
        ResolutionReport {
            sections: self.graphs.iter().map(ReportSection::from_graph).collect(),
        }
    }
}

/// Human readable summary of a resolution.
#[derive(Debug, Clone)]
pub struct ResolutionReport {
    pub sections: Vec<ReportSection>,
}

/// Report lines for one framework.
#[derive(Debug, Clone)]
pub struct ReportSection {
    pub framework: TargetFramework,
    pub resolved: usize,
    pub unresolved: Vec<String>,
    pub cycles: Vec<String>,
    pub downgrades: Vec<String>,
    pub conflicts: ConflictReport,
}

impl ReportSection {
    fn from_graph(graph: &RestoreTargetGraph) -> Self {
        Self {
            framework: graph.framework.clone(),
            resolved: graph.resolved_identities().len(),
            unresolved: graph
                .analysis
                .unresolved
                .iter()
                .map(|&idx| graph.graph.node(idx).id_and_range())
                .collect(),
            cycles: graph.cycles().iter().map(|c| c.path.clone()).collect(),
            downgrades: graph.downgrades().iter().map(ToString::to_string).collect(),
            conflicts: graph.conflicts().clone(),
        }
    }
}

impl ResolutionReport {
    pub fn has_errors(&self) -> bool {
        self.sections
            .iter()
            .any(|s| !s.unresolved.is_empty() || !s.cycles.is_empty())
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(
                f,
                "{}: {} package(s) resolved",
                section.framework, section.resolved
            )?;
            for range in &section.unresolved {
                writeln!(f, "  Unable to resolve '{range}'")?;
            }
            for path in &section.cycles {
                writeln!(f, "  Cycle detected: {path}")?;
            }
            for downgrade in &section.downgrades {
                writeln!(f, "  {downgrade}")?;
            }
            if !section.conflicts.is_empty() {
                for line in section.conflicts.to_string().lines() {
                    writeln!(f, "  {line}")?;
                }
            }
        }
        Ok(())
    }
}

/// Resolve `roots` against `providers` for each framework.
///
/// An empty framework list resolves for [`TargetFramework::any`]. Provider
/// lookups are shared across frameworks through one cache. Unresolved
/// ranges and cycles are reported on the result; provider failures (unless
/// `ignore-failed-sources` is set) and cancellation return an error.
pub async fn resolve(
    roots: &[LibraryDependency],
    frameworks: &[TargetFramework],
    providers: &[Arc<dyn DependencyProvider>],
    config: &ResolverConfig,
    cancel: &CancellationToken,
) -> NuGraphResult<ResolutionResult> {
    config.validate()?;
    let options = WalkOptions {
        recursive: config.recursive,
        max_concurrent_lookups: config.max_concurrent_lookups,
        central: config.central_versions()?,
        conflict_policy: config.conflict_policy,
    };
    let providers = ProviderSet::new(providers.to_vec(), config.ignore_failed_sources);
    if providers.is_empty() {
        warn!("No package sources configured; every range will be unresolved");
    }

    let mut targets: Vec<TargetFramework> = Vec::new();
    for framework in frameworks {
        if !targets.contains(framework) {
            targets.push(framework.clone());
        }
    }
    if targets.is_empty() {
        targets.push(TargetFramework::any());
    }

    let mut cache = WalkCache::new();
    let mut graphs = Vec::with_capacity(targets.len());
    for framework in targets {
        info!("Resolving {} root(s) for {}", roots.len(), framework);
        let mut graph = DependencyWalker::new(&providers, &mut cache, &options, cancel)
            .walk(roots, &framework)
            .await?;
        let analysis = analyze(&mut graph, config.conflict_policy);
        if !analysis.conflicts.is_empty() {
            info!(
                "{} version conflict(s) resolved for {}",
                analysis.conflicts.len(),
                framework
            );
        }
        graphs.push(RestoreTargetGraph {
            framework,
            graph,
            analysis,
        });
    }

    Ok(ResolutionResult {
        graphs,
        cache_hits: cache.hits(),
        cache_misses: cache.misses(),
    })
}

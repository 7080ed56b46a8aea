//! Depth-first graph construction for one target framework.

use std::collections::HashMap;
use std::sync::Arc;

use nugraph_core::central::CentralPackageVersions;
use nugraph_core::config::ConflictPolicy;
use nugraph_core::dependency::LibraryDependency;
use nugraph_core::framework::TargetFramework;
use nugraph_util::casing::eq_ignore_case;
use nugraph_util::errors::NuGraphError;
use nugraph_versioning::VersionRange;
use petgraph::graph::NodeIndex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::{GraphItem, LibraryRangeCacheKey, WalkCache};
use crate::graph::{DependencyGraph, GraphNode};
use crate::provider::ProviderSet;

/// Settings shared by every walk of one resolution.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub recursive: bool,
    pub max_concurrent_lookups: usize,
    pub central: Option<CentralPackageVersions>,
    /// Under nearest-wins, requests eclipsed by a nearer declaration of the
    /// same id are not looked up.
    pub conflict_policy: ConflictPolicy,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_concurrent_lookups: 8,
            central: None,
            conflict_policy: ConflictPolicy::NearestWins,
        }
    }
}

/// Builds a [`DependencyGraph`] by asking providers for each range.
///
/// Provider lookups for a node's dependencies are started together before
/// the walk descends into them; graph construction itself is sequential.
pub struct DependencyWalker<'a> {
    providers: &'a ProviderSet,
    cache: &'a mut WalkCache,
    options: &'a WalkOptions,
    cancel: &'a CancellationToken,
    semaphore: Arc<Semaphore>,
}

impl<'a> DependencyWalker<'a> {
    pub fn new(
        providers: &'a ProviderSet,
        cache: &'a mut WalkCache,
        options: &'a WalkOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            providers,
            cache,
            options,
            cancel,
            semaphore: Arc::new(Semaphore::new(options.max_concurrent_lookups.max(1))),
        }
    }

    /// Walk `roots` for `framework`.
    ///
    /// Unresolved ranges and cycles become leaf nodes. Provider failures and
    /// cancellation abort the walk and no graph is returned.
    ///
    /// Under nearest-wins a request is not looked up when an ancestor (or
    /// the root list) declares the same id, since the nearer declaration
    /// wins. If the nearer range has a lower minimum the request is kept as
    /// a potentially downgraded leaf.
    pub async fn walk(
        &mut self,
        roots: &[LibraryDependency],
        framework: &TargetFramework,
    ) -> Result<DependencyGraph, NuGraphError> {
        debug!("Walking {} root(s) for {}", roots.len(), framework);
        let mut graph = DependencyGraph::new();

        let roots: Vec<LibraryDependency> = roots.iter().map(|d| self.apply_central(d)).collect();
        self.prefetch(&roots, framework).await?;

        let policy = self.options.conflict_policy;
        let mut declared: HashMap<NodeIndex, Vec<LibraryDependency>> = HashMap::new();
        let mut stack: Vec<(Option<NodeIndex>, LibraryDependency)> =
            roots.iter().rev().map(|d| (None, d.clone())).collect();

        while let Some((outer, dependency)) = stack.pop() {
            if self.cancel.is_cancelled() {
                return Err(NuGraphError::Cancelled);
            }

            if let Some(outer) = outer {
                match classify(&graph, &declared, &roots, outer, &dependency, policy) {
                    Step::Walk => {}
                    Step::Cycle => {
                        debug!("Cycle detected: {} -> {}", graph.path(outer), dependency.name());
                        graph.add_inner(outer, GraphNode::cycle(dependency));
                        continue;
                    }
                    Step::Eclipsed => {
                        debug!("{} is eclipsed by a nearer request", dependency.library_range);
                        continue;
                    }
                    Step::PotentiallyDowngraded => {
                        debug!("{} may be downgraded by a nearer request", dependency.library_range);
                        graph.add_inner(outer, GraphNode::potentially_downgraded(dependency));
                        continue;
                    }
                }
            }

            let Some(item) = self.find(&dependency, framework).await? else {
                debug!("Unable to resolve {}", dependency.library_range);
                let node = GraphNode::unresolved(dependency);
                match outer {
                    Some(outer) => graph.add_inner(outer, node),
                    None => graph.add_root(node),
                };
                continue;
            };

            let node = GraphNode::resolved(dependency, item.identity.clone(), item.provider.clone());
            let idx = match outer {
                Some(outer) => graph.add_inner(outer, node),
                None => graph.add_root(node),
            };

            if !self.options.recursive {
                continue;
            }

            let children: Vec<LibraryDependency> = item
                .dependencies
                .iter()
                .filter(|d| !d.is_fully_suppressed())
                .map(|d| self.apply_central(d))
                .collect();
            let walked: Vec<LibraryDependency> = children
                .iter()
                .filter(|d| classify(&graph, &declared, &roots, idx, d, policy) == Step::Walk)
                .cloned()
                .collect();
            self.prefetch(&walked, framework).await?;
            stack.extend(children.iter().rev().map(|d| (Some(idx), d.clone())));
            declared.insert(idx, children);
        }

        debug!("Walk for {} produced {} node(s)", framework, graph.len());
        Ok(graph)
    }

    fn apply_central(&self, dependency: &LibraryDependency) -> LibraryDependency {
        match &self.options.central {
            Some(central) => central.apply(dependency),
            None => dependency.clone(),
        }
    }

    async fn find(
        &mut self,
        dependency: &LibraryDependency,
        framework: &TargetFramework,
    ) -> Result<Option<Arc<GraphItem>>, NuGraphError> {
        let key = LibraryRangeCacheKey::new(dependency.library_range.clone(), framework.clone());
        if let Some(item) = self.cache.get(&key) {
            return Ok(item);
        }
        let item = self
            .providers
            .lookup(&key.range, framework, self.cancel)
            .await?;
        Ok(self.cache.insert(key, item))
    }

    /// Look up every uncached range in `dependencies` concurrently.
    async fn prefetch(
        &mut self,
        dependencies: &[LibraryDependency],
        framework: &TargetFramework,
    ) -> Result<(), NuGraphError> {
        let mut pending: Vec<LibraryRangeCacheKey> = Vec::new();
        for dependency in dependencies {
            let key = LibraryRangeCacheKey::new(dependency.library_range.clone(), framework.clone());
            if !self.cache.contains(&key) && !pending.contains(&key) {
                pending.push(key);
            }
        }
        if pending.len() < 2 {
            return Ok(());
        }

        let mut join_set = JoinSet::new();
        for key in pending {
            let providers = self.providers.clone();
            let cancel = self.cancel.clone();
            let sem = self.semaphore.clone();
            join_set.spawn(async move {
                let _permit = sem.acquire_owned().await;
                let result = providers.lookup(&key.range, &key.framework, &cancel).await;
                (key, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            let (key, result) = joined.map_err(|e| NuGraphError::Resolution {
                message: format!("lookup task failed: {e}"),
            })?;
            self.cache.insert(key, result?);
        }
        Ok(())
    }
}

/// What the walk does with a dependency requested beneath `outer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Walk,
    Cycle,
    Eclipsed,
    PotentiallyDowngraded,
}

fn classify(
    graph: &DependencyGraph,
    declared: &HashMap<NodeIndex, Vec<LibraryDependency>>,
    roots: &[LibraryDependency],
    outer: NodeIndex,
    dependency: &LibraryDependency,
    policy: ConflictPolicy,
) -> Step {
    if closes_cycle(graph, outer, dependency.name()) {
        return Step::Cycle;
    }
    if policy != ConflictPolicy::NearestWins {
        return Step::Walk;
    }
    // Siblings of each ancestor on the path, nearest first, then the roots.
    let nearer = graph
        .ancestors(outer)
        .into_iter()
        .filter_map(|a| declared.get(&a).map(Vec::as_slice))
        .chain(std::iter::once(roots))
        .flat_map(|list| list.iter())
        .find(|d| d.library_range.has_name(dependency.name()));
    let Some(nearer) = nearer else {
        return Step::Walk;
    };
    match (nearer.version_range(), dependency.version_range()) {
        (Some(near), Some(far)) if !VersionRange::is_greater_than_or_equal_to(near, far) => {
            Step::PotentiallyDowngraded
        }
        _ => Step::Eclipsed,
    }
}

/// Whether `name` already appears on the path ending at `outer`.
fn closes_cycle(graph: &DependencyGraph, outer: NodeIndex, name: &str) -> bool {
    std::iter::once(outer)
        .chain(graph.ancestors(outer))
        .any(|idx| eq_ignore_case(graph.node(idx).id(), name))
}

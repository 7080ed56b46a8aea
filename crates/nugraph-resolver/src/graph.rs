//! Dependency graph construction and traversal.

use std::collections::VecDeque;
use std::fmt;

use nugraph_core::dependency::{LibraryDependency, LibraryRange};
use nugraph_core::identity::PackageIdentity;
use nugraph_versioning::SemanticVersion;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

const NODE_ARROW: &str = " -> ";

/// Outcome of the walk for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    Resolved,
    Unresolved,
    Cycle,
    /// Eclipsed by a nearer request with a lower minimum; kept without a
    /// lookup so analysis can report the downgrade.
    PotentiallyDowngraded,
}

/// Outcome of conflict analysis for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Resolved, not yet analyzed.
    Acceptable,
    Accepted,
    Rejected,
    Cycle,
    Unresolved,
    PotentiallyDowngraded,
}

/// A node in the dependency graph: the requested range and what it
/// resolved to.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub key: LibraryRange,
    pub item: Option<PackageIdentity>,
    pub state: NodeState,
    pub disposition: Disposition,
    pub depth: usize,
    /// Source that supplied the identity.
    pub provider: Option<String>,
    /// The edge that produced this node.
    pub dependency: Option<LibraryDependency>,
}

impl GraphNode {
    pub fn resolved(
        dependency: LibraryDependency,
        identity: PackageIdentity,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            key: dependency.library_range.clone(),
            item: Some(identity),
            state: NodeState::Resolved,
            disposition: Disposition::Acceptable,
            depth: 0,
            provider: Some(provider.into()),
            dependency: Some(dependency),
        }
    }

    pub fn unresolved(dependency: LibraryDependency) -> Self {
        Self {
            key: dependency.library_range.clone(),
            item: None,
            state: NodeState::Unresolved,
            disposition: Disposition::Unresolved,
            depth: 0,
            provider: None,
            dependency: Some(dependency),
        }
    }

    pub fn cycle(dependency: LibraryDependency) -> Self {
        Self {
            key: dependency.library_range.clone(),
            item: None,
            state: NodeState::Cycle,
            disposition: Disposition::Cycle,
            depth: 0,
            provider: None,
            dependency: Some(dependency),
        }
    }

    pub fn potentially_downgraded(dependency: LibraryDependency) -> Self {
        Self {
            key: dependency.library_range.clone(),
            item: None,
            state: NodeState::PotentiallyDowngraded,
            disposition: Disposition::PotentiallyDowngraded,
            depth: 0,
            provider: None,
            dependency: Some(dependency),
        }
    }

    /// Resolved id, or the requested name when unresolved.
    pub fn id(&self) -> &str {
        self.item
            .as_ref()
            .map_or(self.key.name.as_str(), PackageIdentity::id)
    }

    pub fn version(&self) -> Option<&SemanticVersion> {
        self.item.as_ref().map(PackageIdentity::version)
    }

    pub fn is_resolved(&self) -> bool {
        self.state == NodeState::Resolved
    }

    /// `Id (>= 1.0.0)`, or just the id for an unbounded range.
    pub fn id_and_range(&self) -> String {
        let range = self
            .key
            .version_range
            .as_ref()
            .map(|r| r.pretty_print())
            .unwrap_or_default();
        if range.is_empty() {
            self.id().to_string()
        } else {
            format!("{} {range}", self.id())
        }
    }

    /// `Id 1.0.0` when resolved, otherwise [`Self::id_and_range`].
    pub fn id_and_version_or_range(&self) -> String {
        match &self.item {
            Some(identity) => identity.to_string(),
            None => self.id_and_range(),
        }
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id_and_version_or_range())
    }
}

/// A resolved dependency graph backed by petgraph.
///
/// Edges point from a node to the nodes its dependencies produced. Every
/// non-root node has exactly one outer (parent) node, so the graph is a
/// forest even when the same package appears on several paths.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<GraphNode, ()>,
    roots: Vec<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node at depth 0.
    pub fn add_root(&mut self, mut node: GraphNode) -> NodeIndex {
        node.depth = 0;
        let idx = self.graph.add_node(node);
        self.roots.push(idx);
        idx
    }

    /// Add `node` beneath `outer`, one level deeper.
    pub fn add_inner(&mut self, outer: NodeIndex, mut node: GraphNode) -> NodeIndex {
        node.depth = self.graph[outer].depth + 1;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(outer, idx, ());
        idx
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut GraphNode {
        &mut self.graph[idx]
    }

    pub fn outer_node(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .next()
            .map(|e| e.source())
    }

    /// Children in the order they were added.
    pub fn inner_nodes(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut inner: Vec<NodeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.target())
            .collect();
        inner.sort();
        inner
    }

    /// Outer nodes from the parent up to the root.
    pub fn ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut ancestors = Vec::new();
        let mut current = self.outer_node(idx);
        while let Some(outer) = current {
            ancestors.push(outer);
            current = self.outer_node(outer);
        }
        ancestors
    }

    /// `A 1.0.0 -> B 2.0.0 -> C (>= 1.0.0)` from the root down to `idx`.
    pub fn path(&self, idx: NodeIndex) -> String {
        let mut parts: Vec<String> = self
            .ancestors(idx)
            .into_iter()
            .rev()
            .map(|a| self.graph[a].id_and_version_or_range())
            .collect();
        parts.push(self.graph[idx].id_and_version_or_range());
        parts.join(NODE_ARROW)
    }

    /// Like [`Self::path`] but showing the requested range of the last node.
    pub fn path_with_last_range(&self, idx: NodeIndex) -> String {
        let mut parts: Vec<String> = self
            .ancestors(idx)
            .into_iter()
            .rev()
            .map(|a| self.graph[a].id_and_version_or_range())
            .collect();
        parts.push(self.graph[idx].id_and_range());
        parts.join(NODE_ARROW)
    }

    /// Follow requested names from the roots down, ignoring case:
    /// `find_path(&["B", "C"])` is the `C` beneath root `B`.
    pub fn find_path(&self, names: &[&str]) -> Option<NodeIndex> {
        let (first, rest) = names.split_first()?;
        let mut current = self
            .roots
            .iter()
            .copied()
            .find(|&r| self.graph[r].key.has_name(first))?;
        for name in rest {
            current = self
                .inner_nodes(current)
                .into_iter()
                .find(|&c| self.graph[c].key.has_name(name))?;
        }
        Some(current)
    }

    /// All nodes, breadth first from the roots.
    pub fn nodes_bfs(&self) -> Vec<NodeIndex> {
        let mut order = Vec::with_capacity(self.graph.node_count());
        let mut queue: VecDeque<NodeIndex> = self.roots.iter().copied().collect();
        while let Some(idx) = queue.pop_front() {
            order.push(idx);
            queue.extend(self.inner_nodes(idx));
        }
        order
    }

    /// Print the dependency tree to a string.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        for &root in &self.roots {
            output.push_str(&format!("{}\n", self.label(root)));
            let inner = self.inner_nodes(root);
            let count = inner.len();
            for (i, child) in inner.into_iter().enumerate() {
                self.print_subtree(&mut output, child, "", i == count - 1, 1, max_depth);
            }
        }
        output
    }

    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.label(idx)));

        if let Some(max) = max_depth {
            if depth >= max {
                return;
            }
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let inner = self.inner_nodes(idx);
        let count = inner.len();
        for (i, child) in inner.into_iter().enumerate() {
            self.print_subtree(output, child, &child_prefix, i == count - 1, depth + 1, max_depth);
        }
    }

    fn label(&self, idx: NodeIndex) -> String {
        let node = &self.graph[idx];
        match node.disposition {
            Disposition::Rejected => format!("{node} (rejected)"),
            Disposition::Cycle => format!("{} (cycle)", node.id_and_range()),
            Disposition::Unresolved => format!("{} (unresolved)", node.id_and_range()),
            Disposition::PotentiallyDowngraded => format!("{} (downgraded)", node.id_and_range()),
            Disposition::Acceptable | Disposition::Accepted => node.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(name: &str, version: &str) -> GraphNode {
        let dependency = LibraryDependency::package(name, Some(version)).unwrap();
        let identity = PackageIdentity::new(name, SemanticVersion::parse(version).unwrap());
        GraphNode::resolved(dependency, identity, "local")
    }

    fn sample() -> (DependencyGraph, NodeIndex, NodeIndex, NodeIndex) {
        let mut g = DependencyGraph::new();
        let a = g.add_root(resolved("A", "1.0.0"));
        let b = g.add_inner(a, resolved("B", "2.0.0"));
        let c = g.add_inner(b, GraphNode::unresolved(
            LibraryDependency::package("C", Some("1.0.0")).unwrap(),
        ));
        (g, a, b, c)
    }

    #[test]
    fn depth_and_outer_node() {
        let (g, a, b, c) = sample();
        assert_eq!(g.node(c).depth, 2);
        assert_eq!(g.outer_node(c), Some(b));
        assert_eq!(g.outer_node(a), None);
        assert_eq!(g.ancestors(c), vec![b, a]);
    }

    #[test]
    fn path_rendering() {
        let (g, _, _, c) = sample();
        assert_eq!(g.path(c), "A 1.0.0 -> B 2.0.0 -> C (>= 1.0.0)");
        assert_eq!(g.path_with_last_range(c), "A 1.0.0 -> B 2.0.0 -> C (>= 1.0.0)");
    }

    #[test]
    fn find_path_ignores_case() {
        let (g, _, b, c) = sample();
        assert_eq!(g.find_path(&["a", "b"]), Some(b));
        assert_eq!(g.find_path(&["A", "B", "c"]), Some(c));
        assert_eq!(g.find_path(&["B"]), None);
        assert_eq!(g.find_path(&[]), None);
    }

    #[test]
    fn inner_nodes_keep_insertion_order() {
        let mut g = DependencyGraph::new();
        let root = g.add_root(resolved("Root", "1.0.0"));
        let x = g.add_inner(root, resolved("X", "1.0.0"));
        let y = g.add_inner(root, resolved("Y", "1.0.0"));
        let z = g.add_inner(root, resolved("Z", "1.0.0"));
        assert_eq!(g.inner_nodes(root), vec![x, y, z]);
        assert_eq!(g.nodes_bfs(), vec![root, x, y, z]);
    }

    #[test]
    fn tree_printing() {
        let (g, ..) = sample();
        let tree = g.print_tree(None);
        assert_eq!(
            tree,
            "A 1.0.0\n└── B 2.0.0\n    └── C (>= 1.0.0) (unresolved)\n"
        );
        let shallow = g.print_tree(Some(1));
        assert!(!shallow.contains("C (>= 1.0.0)"));
    }
}

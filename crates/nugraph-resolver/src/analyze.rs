//! Post-walk analysis: one version per package id, cycles and downgrades.
//!
//! Winners are chosen among "live" nodes, those whose every ancestor was
//! accepted. Rejecting a node removes its subtree from the competition, which
//! can change the winner of another id, so passes repeat until the live set
//! stops changing.

use std::collections::HashMap;

use nugraph_core::config::ConflictPolicy;
use nugraph_versioning::{SemanticVersion, VersionRange};
use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::conflict::{ConflictReport, Downgrade, VersionConflict};
use crate::graph::{DependencyGraph, Disposition, NodeState};

/// A cycle node and the path that reached it.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub node: NodeIndex,
    pub path: String,
}

/// Everything analysis found in one graph.
#[derive(Debug, Clone, Default)]
pub struct GraphAnalysis {
    pub conflicts: ConflictReport,
    pub downgrades: Vec<Downgrade>,
    pub cycles: Vec<CycleReport>,
    /// Unresolved nodes that are part of the final graph.
    pub unresolved: Vec<NodeIndex>,
    /// Marking passes run before the live set stopped changing.
    pub passes: usize,
}

#[derive(Debug, Clone, Copy)]
struct Winner<'a> {
    node: NodeIndex,
    depth: usize,
    version: &'a SemanticVersion,
}

/// Assign dispositions on `graph` and collect the findings.
pub fn analyze(graph: &mut DependencyGraph, policy: ConflictPolicy) -> GraphAnalysis {
    let order = graph.nodes_bfs();
    let mut live: Vec<NodeIndex> = order
        .iter()
        .copied()
        .filter(|&idx| graph.node(idx).is_resolved())
        .collect();

    // Every pass either stabilizes or removes at least one subtree.
    let mut passes = 0;
    for pass in 1..=order.len().max(1) {
        passes = pass;
        let mut winners = winner_versions(graph, &live, policy);
        mark(graph, &order, &mut winners, policy);
        let next = live_nodes(graph, &order);
        debug!("Analysis pass {pass}: {} live nodes", next.len());
        if next == live {
            break;
        }
        live = next;
    }

    let mut analysis = GraphAnalysis {
        passes,
        ..GraphAnalysis::default()
    };
    let winners = choose_winners(graph, &live, policy);

    for &idx in &live {
        let node = graph.node(idx);
        if node.disposition != Disposition::Rejected {
            continue;
        }
        let (Some(version), Some(winner)) = (node.version(), winners.get(&group_key(node.id())))
        else {
            continue;
        };

        let reason = match policy {
            ConflictPolicy::NearestWins if winner.depth < node.depth => {
                format!("nearest wins (depth {} vs {})", winner.depth, node.depth)
            }
            _ => "highest version wins".to_string(),
        };
        analysis.conflicts.add(VersionConflict {
            id: node.id().to_string(),
            requested: node
                .key
                .version_range
                .as_ref()
                .map(VersionRange::pretty_print)
                .unwrap_or_default(),
            rejected: version.clone(),
            resolved: winner.version.clone(),
            path: graph.path(idx),
            reason,
        });

        if policy == ConflictPolicy::NearestWins {
            if let Some(downgrade) = downgrade(graph, idx, winner) {
                analysis.downgrades.push(downgrade);
            }
        }
    }

    for &idx in &order {
        let node = graph.node(idx);
        match node.state {
            NodeState::Cycle => analysis.cycles.push(CycleReport {
                node: idx,
                path: graph.path(idx),
            }),
            NodeState::Unresolved if ancestors_accepted(graph, idx) => {
                let nearer = winners
                    .get(&group_key(node.id()))
                    .filter(|w| policy == ConflictPolicy::NearestWins && w.depth < node.depth);
                match nearer {
                    Some(winner) => debug!(
                        "Ignoring unresolved {}: {} is nearer",
                        graph.path(idx),
                        winner.version
                    ),
                    None => analysis.unresolved.push(idx),
                }
            }
            NodeState::PotentiallyDowngraded if ancestors_accepted(graph, idx) => {
                let found = winners
                    .get(&group_key(node.id()))
                    .and_then(|winner| downgrade(graph, idx, winner));
                if let Some(downgrade) = found {
                    analysis.downgrades.push(downgrade);
                }
            }
            _ => {}
        }
    }

    analysis
}

fn group_key(id: &str) -> String {
    id.to_lowercase()
}

/// The winning node per lowercased id among `live`.
fn choose_winners<'g>(
    graph: &'g DependencyGraph,
    live: &[NodeIndex],
    policy: ConflictPolicy,
) -> HashMap<String, Winner<'g>> {
    let mut winners: HashMap<String, Winner<'g>> = HashMap::new();
    for &idx in live {
        let node = graph.node(idx);
        let Some(version) = node.version() else {
            continue;
        };
        let candidate = Winner {
            node: idx,
            depth: node.depth,
            version,
        };
        winners
            .entry(group_key(node.id()))
            .and_modify(|best| {
                if beats(&candidate, best, policy) {
                    *best = candidate;
                }
            })
            .or_insert(candidate);
    }
    winners
}

fn winner_versions(
    graph: &DependencyGraph,
    live: &[NodeIndex],
    policy: ConflictPolicy,
) -> HashMap<String, SemanticVersion> {
    choose_winners(graph, live, policy)
        .into_iter()
        .map(|(id, winner)| (id, winner.version.clone()))
        .collect()
}

fn beats(candidate: &Winner<'_>, best: &Winner<'_>, policy: ConflictPolicy) -> bool {
    match policy {
        ConflictPolicy::NearestWins => {
            candidate.depth < best.depth
                || (candidate.depth == best.depth && candidate.version > best.version)
        }
        ConflictPolicy::HighestWins => {
            candidate.version > best.version
                || (candidate.version == best.version && candidate.depth < best.depth)
        }
    }
}

/// Accept nodes carrying their id's winning version; reject the rest and
/// everything beneath a rejected node.
///
/// `order` is breadth first, so outer nodes are marked before their inner
/// nodes. A node whose id has no entry in `winners` only became live in
/// this pass; its winner is picked among the live nodes of the id at the
/// same depth.
fn mark(
    graph: &mut DependencyGraph,
    order: &[NodeIndex],
    winners: &mut HashMap<String, SemanticVersion>,
    policy: ConflictPolicy,
) {
    for &idx in order {
        if !graph.node(idx).is_resolved() {
            continue;
        }
        let outer_rejected = graph
            .outer_node(idx)
            .is_some_and(|outer| graph.node(outer).disposition != Disposition::Accepted);
        let key = group_key(graph.node(idx).id());
        if !outer_rejected && !winners.contains_key(&key) {
            let depth = graph.node(idx).depth;
            let peers: Vec<NodeIndex> = order
                .iter()
                .copied()
                .filter(|&p| {
                    let peer = graph.node(p);
                    peer.is_resolved()
                        && peer.depth == depth
                        && group_key(peer.id()) == key
                        && ancestors_accepted(graph, p)
                })
                .collect();
            if let Some(winner) = choose_winners(graph, &peers, policy).remove(&key) {
                winners.insert(key.clone(), winner.version.clone());
            }
        }
        let wins = graph
            .node(idx)
            .version()
            .zip(winners.get(&key))
            .is_some_and(|(version, winner)| version == winner);
        graph.node_mut(idx).disposition = if !outer_rejected && wins {
            Disposition::Accepted
        } else {
            Disposition::Rejected
        };
    }
}

/// Resolved nodes whose outer node was accepted.
fn live_nodes(graph: &DependencyGraph, order: &[NodeIndex]) -> Vec<NodeIndex> {
    order
        .iter()
        .copied()
        .filter(|&idx| graph.node(idx).is_resolved() && ancestors_accepted(graph, idx))
        .collect()
}

fn ancestors_accepted(graph: &DependencyGraph, idx: NodeIndex) -> bool {
    graph
        .ancestors(idx)
        .into_iter()
        .all(|a| graph.node(a).disposition == Disposition::Accepted)
}

/// A downgrade: the nearer winner sits below the rejected node's lower bound.
fn downgrade(graph: &DependencyGraph, rejected: NodeIndex, winner: &Winner<'_>) -> Option<Downgrade> {
    let far = graph.node(rejected);
    let near = graph.node(winner.node);
    if near.depth >= far.depth {
        return None;
    }
    let far_range = far.key.version_range.as_ref()?;
    let all = VersionRange::all();
    let near_range = near.key.version_range.as_ref().unwrap_or(&all);
    if VersionRange::is_greater_than_or_equal_to(near_range, far_range)
        || far_range.satisfies(winner.version)
    {
        return None;
    }
    Some(Downgrade {
        id: far.id().to_string(),
        from: far_range.min_version()?.clone(),
        to: winner.version.clone(),
        from_path: graph.path_with_last_range(rejected),
        to_path: graph.path(winner.node),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;
    use nugraph_core::dependency::LibraryDependency;
    use nugraph_core::identity::PackageIdentity;

    fn resolved(name: &str, range: &str, version: &str) -> GraphNode {
        GraphNode::resolved(
            LibraryDependency::package(name, Some(range)).unwrap(),
            PackageIdentity::new(name, SemanticVersion::parse(version).unwrap()),
            "local",
        )
    }

    /// B 1.0 -> A 1.0 and C 1.0 -> D 1.0 -> A 2.0
    fn diamond() -> (DependencyGraph, NodeIndex, NodeIndex) {
        let mut g = DependencyGraph::new();
        let b = g.add_root(resolved("B", "1.0.0", "1.0.0"));
        let a1 = g.add_inner(b, resolved("A", "1.0.0", "1.0.0"));
        let c = g.add_root(resolved("C", "1.0.0", "1.0.0"));
        let d = g.add_inner(c, resolved("D", "1.0.0", "1.0.0"));
        let a2 = g.add_inner(d, resolved("A", "2.0.0", "2.0.0"));
        (g, a1, a2)
    }

    #[test]
    fn nearest_wins() {
        let (mut g, a1, a2) = diamond();
        let analysis = analyze(&mut g, ConflictPolicy::NearestWins);
        assert_eq!(g.node(a1).disposition, Disposition::Accepted);
        assert_eq!(g.node(a2).disposition, Disposition::Rejected);
        assert_eq!(analysis.conflicts.len(), 1);
        assert_eq!(analysis.downgrades.len(), 1);
        assert_eq!(analysis.downgrades[0].from_path, "C 1.0.0 -> D 1.0.0 -> A (>= 2.0.0)");
        assert_eq!(analysis.downgrades[0].to_path, "B 1.0.0 -> A 1.0.0");
    }

    #[test]
    fn highest_wins() {
        let (mut g, a1, a2) = diamond();
        let analysis = analyze(&mut g, ConflictPolicy::HighestWins);
        assert_eq!(g.node(a1).disposition, Disposition::Rejected);
        assert_eq!(g.node(a2).disposition, Disposition::Accepted);
        assert_eq!(analysis.conflicts.len(), 1);
        assert!(analysis.downgrades.is_empty());
    }

    #[test]
    fn rejected_subtree_leaves_competition() {
        // X 1.0 -> Y 1.0 -> Z 2.0 ; Y 2.0 (root) ; Z 1.0 deeper under W
        let mut g = DependencyGraph::new();
        let x = g.add_root(resolved("X", "1.0.0", "1.0.0"));
        let y1 = g.add_inner(x, resolved("Y", "1.0.0", "1.0.0"));
        let z2 = g.add_inner(y1, resolved("Z", "2.0.0", "2.0.0"));
        g.add_root(resolved("Y", "2.0.0", "2.0.0"));
        let w = g.add_root(resolved("W", "1.0.0", "1.0.0"));
        let w1 = g.add_inner(w, resolved("V", "1.0.0", "1.0.0"));
        let v1 = g.add_inner(w1, resolved("U", "1.0.0", "1.0.0"));
        let z1 = g.add_inner(v1, resolved("Z", "1.0.0", "1.0.0"));
        let t = g.add_inner(z1, resolved("T", "1.0.0", "1.0.0"));
        let s = g.add_inner(t, resolved("S", "1.0.0", "1.0.0"));

        let analysis = analyze(&mut g, ConflictPolicy::NearestWins);
        // Y 2.0 at the root beats Y 1.0, which drops Z 2.0 out of contention
        assert_eq!(g.node(y1).disposition, Disposition::Rejected);
        assert_eq!(g.node(z2).disposition, Disposition::Rejected);
        assert_eq!(g.node(z1).disposition, Disposition::Accepted);
        assert_eq!(analysis.conflicts.len(), 1);
        assert_eq!(analysis.conflicts.conflicts[0].id, "Y");

        // Z 1.0's subtree is accepted in the pass that accepts Z 1.0
        assert_eq!(g.node(t).disposition, Disposition::Accepted);
        assert_eq!(g.node(s).disposition, Disposition::Accepted);
        assert_eq!(analysis.passes, 3);
    }

    /// R1 -> A 1.0 and R2 -> D 1.0 -> A [9.0] (unresolved)
    fn unresolved_behind_nearer() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        let r1 = g.add_root(resolved("R1", "1.0.0", "1.0.0"));
        g.add_inner(r1, resolved("A", "1.0.0", "1.0.0"));
        let r2 = g.add_root(resolved("R2", "1.0.0", "1.0.0"));
        let d = g.add_inner(r2, resolved("D", "1.0.0", "1.0.0"));
        g.add_inner(
            d,
            GraphNode::unresolved(LibraryDependency::package("A", Some("[9.0.0]")).unwrap()),
        );
        g
    }

    #[test]
    fn unresolved_loses_to_nearer_winner() {
        let mut g = unresolved_behind_nearer();
        assert!(analyze(&mut g, ConflictPolicy::NearestWins).unresolved.is_empty());

        let mut g = unresolved_behind_nearer();
        assert_eq!(analyze(&mut g, ConflictPolicy::HighestWins).unresolved.len(), 1);
    }

    #[test]
    fn downgraded_leaf_is_reported() {
        let mut g = DependencyGraph::new();
        g.add_root(resolved("A", "[1.0.0]", "1.0.0"));
        let lib = g.add_root(resolved("Lib", "1.0.0", "1.0.0"));
        g.add_inner(
            lib,
            GraphNode::potentially_downgraded(LibraryDependency::package("A", Some("2.0.0")).unwrap()),
        );
        let analysis = analyze(&mut g, ConflictPolicy::NearestWins);
        assert!(analysis.conflicts.is_empty());
        assert_eq!(analysis.downgrades.len(), 1);
        assert_eq!(analysis.downgrades[0].from_path, "Lib 1.0.0 -> A (>= 2.0.0)");
        assert_eq!(analysis.downgrades[0].to.to_string(), "1.0.0");
    }

    #[test]
    fn winner_does_not_depend_on_order() {
        let mut g = DependencyGraph::new();
        let p = g.add_root(resolved("P", "1.0.0", "1.0.0"));
        let high = g.add_inner(p, resolved("A", "2.0.0", "2.0.0"));
        let q = g.add_root(resolved("Q", "1.0.0", "1.0.0"));
        let low = g.add_inner(q, resolved("A", "1.0.0", "1.0.0"));
        analyze(&mut g, ConflictPolicy::NearestWins);
        assert_eq!(g.node(high).disposition, Disposition::Accepted);
        assert_eq!(g.node(low).disposition, Disposition::Rejected);
    }
}

use std::sync::Arc;
use std::time::Duration;

use nugraph_core::config::{ConflictPolicy, ResolverConfig};
use async_trait::async_trait;
use nugraph_core::dependency::{LibraryDependency, LibraryIncludeFlags, LibraryRange};
use nugraph_core::framework::TargetFramework;
use nugraph_core::identity::PackageIdentity;
use nugraph_resolver::graph::{Disposition, NodeState};
use nugraph_resolver::provider::{DependencyProvider, MemoryProvider};
use nugraph_resolver::resolve;
use nugraph_util::errors::NuGraphError;
use nugraph_versioning::SemanticVersion;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn root(id: &str, range: &str) -> LibraryDependency {
    LibraryDependency::package(id, Some(range)).unwrap()
}

fn sources(provider: MemoryProvider) -> Vec<Arc<dyn DependencyProvider>> {
    vec![Arc::new(provider)]
}

fn any() -> Vec<TargetFramework> {
    vec![TargetFramework::any()]
}

/// Root -> B 1.0 -> A [1.0] and Root -> C 1.0 -> A [2.0]
fn diamond_feed() -> MemoryProvider {
    MemoryProvider::builder("feed")
        .package("Root", "1.0.0")
        .depends_on("B", "1.0.0")
        .depends_on("C", "1.0.0")
        .package("B", "1.0.0")
        .depends_on("A", "[1.0.0]")
        .package("C", "1.0.0")
        .depends_on("A", "[2.0.0]")
        .package("A", "1.0.0")
        .package("A", "2.0.0")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_diamond_keeps_one_version() {
    init_tracing();
    let result = resolve(
        &[root("Root", "1.0.0")],
        &any(),
        &sources(diamond_feed()),
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    let accepted_a: Vec<_> = target
        .graph
        .nodes_bfs()
        .into_iter()
        .map(|idx| target.graph.node(idx))
        .filter(|n| n.id() == "A" && n.disposition == Disposition::Accepted)
        .collect();
    assert_eq!(accepted_a.len(), 1);
    assert_eq!(accepted_a[0].version().unwrap().to_string(), "2.0.0");
    assert_eq!(target.conflicts().len(), 1);
    assert!(target.is_success());

    let resolved: Vec<String> = target
        .resolved_identities()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(resolved, ["A 2.0.0", "B 1.0.0", "C 1.0.0", "Root 1.0.0"]);
}

#[tokio::test]
async fn test_diamond_lookups_are_cached() {
    let feed = Arc::new(
        MemoryProvider::builder("feed")
            .package("Root", "1.0.0")
            .depends_on("B", "1.0.0")
            .depends_on("C", "1.0.0")
            .package("B", "1.0.0")
            .depends_on("A", "1.0.0")
            .package("C", "1.0.0")
            .depends_on("A", "1.0.0")
            .package("A", "1.0.0")
            .build()
            .unwrap(),
    );
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![feed.clone()];
    let result = resolve(
        &[root("Root", "1.0.0")],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    // Root, B, C, A: one lookup each even though A is reached twice
    assert_eq!(feed.lookups(), 4);
    assert!(result.cache_hits >= 1);
    assert!(result.graphs[0].conflicts().is_empty());
}

#[tokio::test]
async fn test_cycle_terminates() {
    let feed = MemoryProvider::builder("feed")
        .package("A", "1.0.0")
        .depends_on("B", "1.0.0")
        .package("B", "1.0.0")
        .depends_on("a", "1.0.0")
        .build()
        .unwrap();
    let result = resolve(
        &[root("A", "1.0.0")],
        &any(),
        &sources(feed),
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    let cycle = target.graph.find_path(&["A", "B", "A"]).unwrap();
    assert_eq!(target.graph.node(cycle).state, NodeState::Cycle);
    assert_eq!(target.cycles().len(), 1);
    assert_eq!(target.cycles()[0].path, "A 1.0.0 -> B 1.0.0 -> a (>= 1.0.0)");
    assert!(!target.is_success());
}

#[tokio::test]
async fn test_unresolved_does_not_stop_siblings() {
    let feed = MemoryProvider::builder("feed")
        .package("App", "1.0.0")
        .depends_on("Missing", "[3.0.0, )")
        .depends_on("Present", "1.0.0")
        .package("Present", "1.0.0")
        .build()
        .unwrap();
    let result = resolve(
        &[root("App", "1.0.0")],
        &any(),
        &sources(feed),
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    let unresolved = target.unresolved();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].name, "Missing");
    assert!(target.graph.find_path(&["App", "Present"]).is_some());
    assert!(!result.is_success());
    let report = result.report().to_string();
    assert!(report.contains("Unable to resolve 'Missing (>= 3.0.0)'"));
}

#[tokio::test]
async fn test_central_versions_fill_missing_ranges() {
    let feed = MemoryProvider::builder("feed")
        .package("Serilog", "2.0.0")
        .package("Serilog", "2.10.0")
        .package("Serilog", "3.0.0")
        .build()
        .unwrap();
    let config = ResolverConfig::parse_toml(
        r#"
[central-packages]
enabled = true
versions = { serilog = "[2.10.0]" }
"#,
    )
    .unwrap();
    let unversioned = LibraryDependency::package("Serilog", None).unwrap();
    let result = resolve(
        &[unversioned],
        &any(),
        &sources(feed),
        &config,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    let node = target.graph.node(target.roots()[0]);
    assert_eq!(node.version().unwrap().to_string(), "2.10.0");
    assert!(node.dependency.as_ref().unwrap().version_centrally_managed);
}

#[tokio::test]
async fn test_provider_failure_is_fatal() {
    let feed = MemoryProvider::builder("broken")
        .package("A", "1.0.0")
        .depends_on("B", "1.0.0")
        .fail_on("B", "connection reset")
        .build()
        .unwrap();
    let err = resolve(
        &[root("A", "1.0.0")],
        &any(),
        &sources(feed),
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Package source 'broken' failed"));
}

#[tokio::test]
async fn test_provider_failure_ignored() {
    let feed = MemoryProvider::builder("broken")
        .package("A", "1.0.0")
        .depends_on("B", "1.0.0")
        .fail_on("B", "connection reset")
        .build()
        .unwrap();
    let config = ResolverConfig {
        ignore_failed_sources: true,
        ..ResolverConfig::default()
    };
    let result = resolve(
        &[root("A", "1.0.0")],
        &any(),
        &sources(feed),
        &config,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(result.graphs[0].unresolved()[0].name, "B");
}

#[tokio::test]
async fn test_cancellation_aborts_walk() {
    let feed = MemoryProvider::builder("slow")
        .package("A", "1.0.0")
        .with_delay(Duration::from_secs(30))
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = resolve(
        &[root("A", "1.0.0")],
        &any(),
        &sources(feed),
        &ResolverConfig::default(),
        &cancel,
    )
    .await
    .unwrap_err();
    let err = err.downcast::<NuGraphError>().unwrap();
    assert!(matches!(err, NuGraphError::Cancelled));
}

#[tokio::test]
async fn test_highest_wins_policy() {
    let config = ResolverConfig {
        conflict_policy: ConflictPolicy::HighestWins,
        ..ResolverConfig::default()
    };
    let feed = MemoryProvider::builder("feed")
        .package("A", "1.0.0")
        .package("A", "2.0.0")
        .package("Lib", "1.0.0")
        .depends_on("A", "2.0.0")
        .build()
        .unwrap();
    let result = resolve(
        &[root("A", "[1.0.0]"), root("Lib", "1.0.0")],
        &any(),
        &sources(feed),
        &config,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    let target = &result.graphs[0];
    let resolved: Vec<String> = target
        .resolved_identities()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(resolved, ["A 2.0.0", "Lib 1.0.0"]);
    assert!(target.downgrades().is_empty());
}

#[tokio::test]
async fn test_nearest_wins_reports_downgrade() {
    let feed = MemoryProvider::builder("feed")
        .package("A", "1.0.0")
        .package("A", "2.0.0")
        .package("Lib", "1.0.0")
        .depends_on("A", "2.0.0")
        .build()
        .unwrap();
    let result = resolve(
        &[root("A", "[1.0.0]"), root("Lib", "1.0.0")],
        &any(),
        &sources(feed),
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    let target = &result.graphs[0];
    assert_eq!(target.downgrades().len(), 1);
    let downgrade = &target.downgrades()[0];
    assert_eq!(downgrade.from.to_string(), "2.0.0");
    assert_eq!(downgrade.to.to_string(), "1.0.0");
    assert_eq!(downgrade.from_path, "Lib 1.0.0 -> A (>= 2.0.0)");
}

/// Every package exists at 1.0.0; `A` depends on `Common` and on a
/// fully private `Analyzer`.
struct PrivateAssetsProvider;

#[async_trait]
impl DependencyProvider for PrivateAssetsProvider {
    fn name(&self) -> &str {
        "private"
    }

    async fn find_library(
        &self,
        range: &LibraryRange,
        _framework: &TargetFramework,
        _cancel: &CancellationToken,
    ) -> Result<Option<PackageIdentity>, NuGraphError> {
        Ok(Some(PackageIdentity::new(
            range.name.clone(),
            SemanticVersion::parse("1.0.0").unwrap(),
        )))
    }

    async fn get_dependencies(
        &self,
        identity: &PackageIdentity,
        _framework: &TargetFramework,
        _cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, NuGraphError> {
        if identity.id() != "A" {
            return Ok(Vec::new());
        }
        Ok(vec![
            root("Common", "1.0.0"),
            root("Analyzer", "1.0.0").with_suppress_parent(LibraryIncludeFlags::ALL),
        ])
    }
}

#[tokio::test]
async fn test_private_assets_are_not_walked() {
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![Arc::new(PrivateAssetsProvider)];
    // a root edge is walked even when its assets are private
    let tool = root("Tool", "1.0.0").with_suppress_parent(LibraryIncludeFlags::ALL);
    let result = resolve(
        &[root("A", "1.0.0"), tool],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let graph = &result.graphs[0].graph;
    assert!(graph.find_path(&["A", "Common"]).is_some());
    assert!(graph.find_path(&["A", "Analyzer"]).is_none());
    assert!(graph.find_path(&["Tool"]).is_some());
}

#[tokio::test]
async fn test_non_recursive_walk() {
    let config = ResolverConfig {
        recursive: false,
        ..ResolverConfig::default()
    };
    let result = resolve(
        &[root("Root", "1.0.0")],
        &any(),
        &sources(diamond_feed()),
        &config,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(result.graphs[0].graph.len(), 1);
}

#[tokio::test]
async fn test_per_framework_graphs() {
    let feed = MemoryProvider::builder("feed")
        .package("A", "1.0.0")
        .depends_on("Common", "1.0.0")
        .for_framework("net472")
        .depends_on("Legacy", "1.0.0")
        .package("Common", "1.0.0")
        .package("Legacy", "1.0.0")
        .build()
        .unwrap();
    let frameworks = vec![TargetFramework::new("net8.0"), TargetFramework::new("net472")];
    let result = resolve(
        &[root("A", "1.0.0")],
        &frameworks,
        &sources(feed),
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let modern = result.graph(&TargetFramework::new("NET8.0")).unwrap();
    let legacy = result.graph(&TargetFramework::new("net472")).unwrap();
    assert!(modern.graph.find_path(&["A", "Common"]).is_some());
    assert!(legacy.graph.find_path(&["A", "Legacy"]).is_some());
    assert!(legacy.graph.find_path(&["A", "Common"]).is_none());
}

#[tokio::test]
async fn test_multiple_sources_merge() {
    let old = MemoryProvider::builder("old")
        .package("A", "1.0.0")
        .build()
        .unwrap();
    let new = MemoryProvider::builder("new")
        .package("A", "1.5.0")
        .build()
        .unwrap();
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![Arc::new(old), Arc::new(new)];
    let result = resolve(
        &[root("A", "[1.0.0, 2.0.0)")],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    let target = &result.graphs[0];
    let node = target.graph.node(target.roots()[0]);
    assert_eq!(node.version().unwrap().to_string(), "1.5.0");
    assert_eq!(node.provider.as_deref(), Some("new"));
}

#[tokio::test]
async fn test_exact_match_skips_remaining_sources() {
    let first = Arc::new(MemoryProvider::builder("first").package("A", "1.0.0").build().unwrap());
    let second = Arc::new(MemoryProvider::builder("second").package("A", "1.0.0").build().unwrap());
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![first.clone(), second.clone()];
    resolve(
        &[root("A", "[1.0.0]")],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(first.lookups(), 1);
    assert_eq!(second.lookups(), 0);
}

#[tokio::test]
async fn test_fingerprint_is_stable() {
    let run = || async {
        resolve(
            &[root("Root", "1.0.0")],
            &any(),
            &sources(diamond_feed()),
            &ResolverConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap()
    };
    let first = run().await;
    let second = run().await;
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(first.graphs[0].fingerprint(), second.graphs[0].fingerprint());
    assert_eq!(first.fingerprint().len(), 64);
}

#[tokio::test]
async fn test_print_tree_marks_rejected() {
    let result = resolve(
        &[root("Root", "1.0.0")],
        &any(),
        &sources(diamond_feed()),
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    let tree = result.graphs[0].graph.print_tree(None);
    assert_eq!(
        tree,
        "Root 1.0.0\n├── B 1.0.0\n│   └── A 1.0.0 (rejected)\n└── C 1.0.0\n    └── A 2.0.0\n"
    );
}

#[tokio::test]
async fn test_eclipsed_request_is_not_looked_up() {
    init_tracing();
    // A 9.0.0 does not exist, but the root request for A is nearer
    let feed = Arc::new(
        MemoryProvider::builder("feed")
            .package("A", "1.0.0")
            .package("B", "1.0.0")
            .depends_on("A", "[9.0.0]")
            .build()
            .unwrap(),
    );
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![feed.clone()];
    let result = resolve(
        &[root("A", "[1.0.0]"), root("B", "1.0.0")],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    let resolved: Vec<String> = target
        .resolved_identities()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(resolved, ["A 1.0.0", "B 1.0.0"]);
    assert!(target.unresolved().is_empty());
    assert!(result.is_success());
    assert_eq!(target.downgrades().len(), 1);
    assert_eq!(target.downgrades()[0].from_path, "B 1.0.0 -> A (= 9.0.0)");
    assert_eq!(feed.lookups(), 2);
}

#[tokio::test]
async fn test_highest_wins_looks_up_every_request() {
    let config = ResolverConfig {
        conflict_policy: ConflictPolicy::HighestWins,
        ..ResolverConfig::default()
    };
    let feed = MemoryProvider::builder("feed")
        .package("A", "1.0.0")
        .package("B", "1.0.0")
        .depends_on("A", "[9.0.0]")
        .build()
        .unwrap();
    let result = resolve(
        &[root("A", "[1.0.0]"), root("B", "1.0.0")],
        &any(),
        &sources(feed),
        &config,
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    let unresolved = result.graphs[0].unresolved();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].to_string(), "A [9.0.0]");
    assert!(!result.is_success());
}

#[tokio::test]
async fn test_downgraded_request_is_kept_as_leaf() {
    let feed = Arc::new(
        MemoryProvider::builder("feed")
            .package("A", "1.0.0")
            .package("A", "2.0.0")
            .package("Lib", "1.0.0")
            .depends_on("A", "2.0.0")
            .build()
            .unwrap(),
    );
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![feed.clone()];
    let result = resolve(
        &[root("A", "[1.0.0]"), root("Lib", "1.0.0")],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    let leaf = target.graph.find_path(&["Lib", "A"]).unwrap();
    assert_eq!(target.graph.node(leaf).state, NodeState::PotentiallyDowngraded);
    assert_eq!(target.downgrades()[0].to_path, "A 1.0.0");
    assert!(target.is_success());
    // only A and Lib are looked up
    assert_eq!(feed.lookups(), 2);
    assert_eq!(
        target.graph.print_tree(None),
        "A 1.0.0\nLib 1.0.0\n└── A (>= 2.0.0) (downgraded)\n"
    );
}

#[tokio::test]
async fn test_cycle_edge_is_not_prefetched() {
    let feed = Arc::new(
        MemoryProvider::builder("feed")
            .package("A", "1.0.0")
            .depends_on("B", "1.0.0")
            .depends_on("C", "1.0.0")
            .package("B", "1.0.0")
            .depends_on("A", "0.5.0")
            .depends_on("D", "1.0.0")
            .package("C", "1.0.0")
            .package("D", "1.0.0")
            .build()
            .unwrap(),
    );
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![feed.clone()];
    let result = resolve(
        &[root("A", "1.0.0")],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    let cycle = target.graph.find_path(&["A", "B", "A"]).unwrap();
    assert_eq!(target.graph.node(cycle).state, NodeState::Cycle);
    // A, B, C and D; the cycle edge A (>= 0.5.0) is never looked up
    assert_eq!(feed.lookups(), 4);
}

#[tokio::test]
async fn test_eclipsed_request_leaves_no_node() {
    let feed = Arc::new(
        MemoryProvider::builder("feed")
            .package("A", "1.0.0")
            .package("B", "1.0.0")
            .depends_on("A", "0.5.0")
            .build()
            .unwrap(),
    );
    let providers: Vec<Arc<dyn DependencyProvider>> = vec![feed.clone()];
    let result = resolve(
        &[root("A", "[1.0.0]"), root("B", "1.0.0")],
        &any(),
        &providers,
        &ResolverConfig::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let target = &result.graphs[0];
    assert!(target.graph.find_path(&["B", "A"]).is_none());
    assert!(target.downgrades().is_empty());
    assert!(target.conflicts().is_empty());
    assert_eq!(feed.lookups(), 2);
}

//! Package sources the walker resolves against.
//!
//! A [`DependencyProvider`] answers two questions for a target framework:
//! which identity best matches a library range, and what that identity
//! depends on. [`ProviderSet`] merges several providers into one lookup.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nugraph_core::dependency::{LibraryDependency, LibraryRange, PackageDependency};
use nugraph_core::framework::TargetFramework;
use nugraph_core::identity::PackageIdentity;
use nugraph_util::errors::NuGraphError;
use nugraph_versioning::{SemanticVersion, VersionRange};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::GraphItem;

/// A source of packages.
#[async_trait]
pub trait DependencyProvider: Send + Sync {
    /// Human readable source name, used in logs and on graph nodes.
    fn name(&self) -> &str;

    /// Whether lookups go over the network.
    fn is_http(&self) -> bool {
        false
    }

    /// The best identity this source has for `range`, or `None`.
    async fn find_library(
        &self,
        range: &LibraryRange,
        framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> Result<Option<PackageIdentity>, NuGraphError>;

    /// Dependencies `identity` declares for `framework`.
    async fn get_dependencies(
        &self,
        identity: &PackageIdentity,
        framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, NuGraphError>;
}

/// Await `future` unless `cancel` fires first.
pub async fn with_cancellation<T, F>(cancel: &CancellationToken, future: F) -> Result<T, NuGraphError>
where
    F: Future<Output = Result<T, NuGraphError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(NuGraphError::Cancelled),
        result = future => result,
    }
}

/// The providers of one resolution, queried together.
#[derive(Clone)]
pub struct ProviderSet {
    providers: Arc<[Arc<dyn DependencyProvider>]>,
    ignore_failed_sources: bool,
}

impl ProviderSet {
    pub fn new(providers: Vec<Arc<dyn DependencyProvider>>, ignore_failed_sources: bool) -> Self {
        Self {
            providers: providers.into(),
            ignore_failed_sources,
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Ask every provider for `range` and keep the best answer.
    ///
    /// Answers are merged with [`VersionRange::is_better`]. A hit on an exact
    /// `[x]` range at exactly `x` cannot be beaten, so the remaining providers
    /// are skipped.
    pub async fn find_library(
        &self,
        range: &LibraryRange,
        framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> Result<Option<(PackageIdentity, Arc<dyn DependencyProvider>)>, NuGraphError> {
        let all = VersionRange::all();
        let version_range = range.version_range.as_ref().unwrap_or(&all);
        let mut best: Option<(PackageIdentity, Arc<dyn DependencyProvider>)> = None;

        for provider in self.providers.iter() {
            let found = with_cancellation(cancel, provider.find_library(range, framework, cancel)).await;
            let identity = match found {
                Ok(Some(identity)) => identity,
                Ok(None) => continue,
                Err(e) => {
                    self.check_failure(provider.as_ref(), e)?;
                    continue;
                }
            };

            let current = best.as_ref().map(|(identity, _)| identity.version());
            if current.is_none() || version_range.is_better(current, identity.version()) {
                let exact_hit = version_range.is_exact()
                    && version_range.min_version() == Some(identity.version());
                best = Some((identity, provider.clone()));
                if exact_hit {
                    break;
                }
            }
        }

        Ok(best)
    }

    /// Resolve `range` to an identity plus its dependencies.
    pub async fn lookup(
        &self,
        range: &LibraryRange,
        framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> Result<Option<GraphItem>, NuGraphError> {
        let Some((identity, provider)) = self.find_library(range, framework, cancel).await? else {
            return Ok(None);
        };

        let dependencies = match with_cancellation(
            cancel,
            provider.get_dependencies(&identity, framework, cancel),
        )
        .await
        {
            Ok(dependencies) => dependencies,
            Err(e) => {
                self.check_failure(provider.as_ref(), e)?;
                return Ok(None);
            }
        };

        debug!("Resolved {} to {} from {}", range, identity, provider.name());
        Ok(Some(GraphItem {
            identity,
            provider: provider.name().to_string(),
            dependencies,
        }))
    }

    /// Propagate a provider failure, or log and swallow it when failed
    /// sources are ignored. Cancellation always propagates.
    fn check_failure(
        &self,
        provider: &dyn DependencyProvider,
        error: NuGraphError,
    ) -> Result<(), NuGraphError> {
        if matches!(error, NuGraphError::Cancelled) || !self.ignore_failed_sources {
            return Err(error);
        }
        warn!("Ignoring failed source '{}': {}", provider.name(), error);
        Ok(())
    }
}

/// One package version held by a [`MemoryProvider`].
#[derive(Debug, Clone)]
struct MemoryPackage {
    identity: PackageIdentity,
    // (framework, dependencies); `any` applies when no group matches
    groups: Vec<(TargetFramework, Vec<PackageDependency>)>,
}

impl MemoryPackage {
    fn group_mut(&mut self, framework: &TargetFramework) -> &mut Vec<PackageDependency> {
        let position = match self.groups.iter().position(|(f, _)| f == framework) {
            Some(position) => position,
            None => {
                self.groups.push((framework.clone(), Vec::new()));
                self.groups.len() - 1
            }
        };
        &mut self.groups[position].1
    }

    fn dependencies_for(&self, framework: &TargetFramework) -> &[PackageDependency] {
        self.groups
            .iter()
            .find(|(f, _)| f == framework)
            .or_else(|| self.groups.iter().find(|(f, _)| f.is_any()))
            .map(|(_, deps)| deps.as_slice())
            .unwrap_or(&[])
    }
}

/// An in-memory package feed.
#[derive(Debug)]
pub struct MemoryProvider {
    name: String,
    http: bool,
    // lowercased id -> versions
    packages: BTreeMap<String, Vec<MemoryPackage>>,
    // lowercased id -> failure message
    failures: BTreeMap<String, String>,
    delay: Option<Duration>,
    lookups: AtomicUsize,
}

impl MemoryProvider {
    pub fn builder(name: impl Into<String>) -> MemoryProviderBuilder {
        MemoryProviderBuilder {
            name: name.into(),
            http: false,
            packages: Vec::new(),
            failures: BTreeMap::new(),
            delay: None,
            current_framework: TargetFramework::any(),
            error: None,
        }
    }

    /// Number of `find_library` calls answered so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn versions(&self, id: &str) -> &[MemoryPackage] {
        self.packages
            .get(&id.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn fail_if_requested(&self, id: &str) -> Result<(), NuGraphError> {
        match self.failures.get(&id.to_lowercase()) {
            Some(message) => Err(NuGraphError::provider(&self.name, message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DependencyProvider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_http(&self) -> bool {
        self.http
    }

    async fn find_library(
        &self,
        range: &LibraryRange,
        _framework: &TargetFramework,
        cancel: &CancellationToken,
    ) -> Result<Option<PackageIdentity>, NuGraphError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            with_cancellation(cancel, async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }
        self.fail_if_requested(&range.name)?;

        if !range.type_constraint_allows_packages() {
            return Ok(None);
        }

        let all = VersionRange::all();
        let version_range = range.version_range.as_ref().unwrap_or(&all);
        let packages = self.versions(&range.name);
        let best = version_range.find_best_match(packages.iter().map(|p| p.identity.version()));

        Ok(best.and_then(|version| {
            packages
                .iter()
                .find(|p| p.identity.version() == version)
                .map(|p| p.identity.clone())
        }))
    }

    async fn get_dependencies(
        &self,
        identity: &PackageIdentity,
        framework: &TargetFramework,
        _cancel: &CancellationToken,
    ) -> Result<Vec<LibraryDependency>, NuGraphError> {
        let Some(package) = self
            .versions(identity.id())
            .iter()
            .find(|p| p.identity == *identity)
        else {
            return Err(NuGraphError::provider(
                &self.name,
                format!("package {identity} is not in this source"),
            ));
        };

        package
            .dependencies_for(framework)
            .iter()
            .map(PackageDependency::to_library_dependency)
            .collect()
    }
}

/// Builder for [`MemoryProvider`].
///
/// `package` starts a new package version; `depends_on` and `for_framework`
/// apply to the most recent one. Malformed versions or ranges are reported by
/// [`MemoryProviderBuilder::build`].
#[derive(Debug)]
pub struct MemoryProviderBuilder {
    name: String,
    http: bool,
    packages: Vec<MemoryPackage>,
    failures: BTreeMap<String, String>,
    delay: Option<Duration>,
    current_framework: TargetFramework,
    error: Option<NuGraphError>,
}

impl MemoryProviderBuilder {
    pub fn package(mut self, id: &str, version: &str) -> Self {
        match SemanticVersion::parse(version) {
            Ok(version) => {
                self.packages.push(MemoryPackage {
                    identity: PackageIdentity::new(id, version),
                    groups: Vec::new(),
                });
                self.current_framework = TargetFramework::any();
            }
            Err(e) => self.record(e),
        }
        self
    }

    /// Subsequent `depends_on` calls target `framework`'s dependency group.
    pub fn for_framework(mut self, framework: &str) -> Self {
        self.current_framework = TargetFramework::new(framework);
        if let Some(package) = self.packages.last_mut() {
            package.group_mut(&self.current_framework);
        }
        self
    }

    pub fn depends_on(mut self, id: &str, range: &str) -> Self {
        match VersionRange::parse(range) {
            Ok(range) => self.dependency(PackageDependency::new(id, Some(range))),
            Err(e) => {
                self.record(e);
                self
            }
        }
    }

    /// Add a fully specified dependency to the current package.
    pub fn dependency(mut self, dependency: PackageDependency) -> Self {
        let framework = self.current_framework.clone();
        match self.packages.last_mut() {
            Some(package) => package.group_mut(&framework).push(dependency),
            None => self.record(NuGraphError::provider(
                &self.name,
                format!("dependency '{}' declared before any package", dependency.id),
            )),
        }
        self
    }

    /// Make every lookup of `id` fail with `message`.
    pub fn fail_on(mut self, id: &str, message: &str) -> Self {
        self.failures.insert(id.to_lowercase(), message.to_string());
        self
    }

    /// Delay each `find_library` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn http(mut self, http: bool) -> Self {
        self.http = http;
        self
    }

    pub fn build(self) -> Result<MemoryProvider, NuGraphError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let mut packages: BTreeMap<String, Vec<MemoryPackage>> = BTreeMap::new();
        for package in self.packages {
            packages
                .entry(package.identity.id().to_lowercase())
                .or_default()
                .push(package);
        }
        Ok(MemoryProvider {
            name: self.name,
            http: self.http,
            packages,
            failures: self.failures,
            delay: self.delay,
            lookups: AtomicUsize::new(0),
        })
    }

    fn record(&mut self, error: NuGraphError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitOr, Sub};

use nugraph_util::casing::eq_ignore_case;
use nugraph_util::errors::NuGraphError;
use nugraph_versioning::VersionRange;
use serde::{Deserialize, Serialize};

use crate::comparer::{LibraryDependencyComparer, LibraryRangeComparer, PackageDependencyComparer};
use crate::identity::PackageIdentity;

/// Generates a small named bit set with `;`-separated parse and display.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident { $($flag:ident = $bit:expr, $text:literal;)* }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u16);

        impl $name {
            pub const NONE: Self = Self(0);
            $(pub const $flag: Self = Self($bit);)*
            pub const ALL: Self = Self(0 $(| $bit)*);

            const NAMES: &'static [(&'static str, Self)] = &[$(($text, Self::$flag)),*];

            pub const fn bits(self) -> u16 {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            /// Parse `;`- or `,`-separated flag names, ignoring case.
            /// `all` and `none` are accepted as names.
            pub fn parse(value: &str) -> Result<Self, NuGraphError> {
                let mut flags = Self::NONE;
                for name in value.split([';', ',']).map(str::trim).filter(|n| !n.is_empty()) {
                    if eq_ignore_case(name, "all") {
                        flags = flags | Self::ALL;
                    } else if eq_ignore_case(name, "none") {
                        continue;
                    } else {
                        let flag = Self::NAMES
                            .iter()
                            .find(|(text, _)| eq_ignore_case(text, name))
                            .map(|(_, flag)| *flag)
                            .ok_or_else(|| {
                                NuGraphError::parse(format!(
                                    "unknown {} flag '{name}'",
                                    stringify!($name)
                                ))
                            })?;
                        flags = flags | flag;
                    }
                }
                Ok(flags)
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 & !rhs.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if *self == Self::ALL {
                    return f.write_str("all");
                }
                if self.is_empty() {
                    return f.write_str("none");
                }
                let names: Vec<&str> = Self::NAMES
                    .iter()
                    .filter(|(_, flag)| self.contains(*flag))
                    .map(|(text, _)| *text)
                    .collect();
                f.write_str(&names.join(";"))
            }
        }
    };
}

flag_set! {
    /// Asset types a dependency contributes to its consumer.
    LibraryIncludeFlags {
        RUNTIME = 1 << 0, "runtime";
        COMPILE = 1 << 1, "compile";
        BUILD = 1 << 2, "build";
        NATIVE = 1 << 3, "native";
        CONTENT_FILES = 1 << 4, "contentfiles";
        ANALYZERS = 1 << 5, "analyzers";
        BUILD_TRANSITIVE = 1 << 6, "buildtransitive";
    }
}

impl LibraryIncludeFlags {
    /// Assets kept private to the declaring project unless stated otherwise.
    pub const DEFAULT_SUPPRESS_PARENT: Self =
        Self(Self::CONTENT_FILES.0 | Self::BUILD.0 | Self::ANALYZERS.0);
}

flag_set! {
    /// Kinds of library a range may resolve to.
    LibraryDependencyTarget {
        PACKAGE = 1 << 0, "package";
        PROJECT = 1 << 1, "project";
        EXTERNAL_PROJECT = 1 << 2, "externalproject";
        ASSEMBLY = 1 << 3, "assembly";
        REFERENCE = 1 << 4, "reference";
        WIN_MD = 1 << 5, "winmd";
    }
}

impl LibraryDependencyTarget {
    pub const PACKAGE_PROJECT_EXTERNAL: Self =
        Self(Self::PACKAGE.0 | Self::PROJECT.0 | Self::EXTERNAL_PROJECT.0);
}

/// How a dependency entered the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    None,
    #[default]
    Direct,
    Transitive,
}

/// A resolution query: a library name, the acceptable versions and the
/// kinds of library that may satisfy it.
#[derive(Debug, Clone)]
pub struct LibraryRange {
    pub name: String,
    pub version_range: Option<VersionRange>,
    pub type_constraint: LibraryDependencyTarget,
}

impl LibraryRange {
    pub fn new(
        name: impl Into<String>,
        version_range: Option<VersionRange>,
        type_constraint: LibraryDependencyTarget,
    ) -> Self {
        Self {
            name: name.into(),
            version_range,
            type_constraint,
        }
    }

    /// A range that may resolve to a package, project or external project.
    pub fn package(name: impl Into<String>, version_range: Option<VersionRange>) -> Self {
        Self::new(
            name,
            version_range,
            LibraryDependencyTarget::PACKAGE_PROJECT_EXTERNAL,
        )
    }

    pub fn type_constraint_allows(&self, target: LibraryDependencyTarget) -> bool {
        self.type_constraint.intersects(target)
    }

    pub fn type_constraint_allows_packages(&self) -> bool {
        self.type_constraint_allows(LibraryDependencyTarget::PACKAGE)
    }

    pub fn has_name(&self, name: &str) -> bool {
        eq_ignore_case(&self.name, name)
    }
}

impl fmt::Display for LibraryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_range {
            None => f.write_str(&self.name),
            Some(range) if range.is_floating() => match range.float() {
                Some(float) => write!(f, "{} {float}", self.name),
                None => write!(f, "{} {range}", self.name),
            },
            Some(range) if range.is_min_inclusive() && !range.has_upper_bound() => {
                match range.min_version() {
                    Some(min) => write!(f, "{} >= {}", self.name, min.to_normalized_string()),
                    None => f.write_str(&self.name),
                }
            }
            Some(range) => write!(f, "{} {range}", self.name),
        }
    }
}

impl PartialEq for LibraryRange {
    fn eq(&self, other: &Self) -> bool {
        LibraryRangeComparer::default().equals(self, other)
    }
}

impl Eq for LibraryRange {}

impl Hash for LibraryRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        LibraryRangeComparer::default().hash(self).hash(state);
    }
}

/// An edge in the dependency graph: a library range plus the asset flags
/// and bookkeeping that travel with it.
#[derive(Debug, Clone)]
pub struct LibraryDependency {
    pub library_range: LibraryRange,
    pub include_type: LibraryIncludeFlags,
    pub suppress_parent: LibraryIncludeFlags,
    pub reference_type: ReferenceType,
    pub version_centrally_managed: bool,
    pub auto_referenced: bool,
}

impl LibraryDependency {
    pub fn new(library_range: LibraryRange) -> Self {
        Self {
            library_range,
            include_type: LibraryIncludeFlags::ALL,
            suppress_parent: LibraryIncludeFlags::DEFAULT_SUPPRESS_PARENT,
            reference_type: ReferenceType::Direct,
            version_centrally_managed: false,
            auto_referenced: false,
        }
    }

    /// A package dependency, parsing `range` when given.
    pub fn package(name: impl Into<String>, range: Option<&str>) -> Result<Self, NuGraphError> {
        let version_range = range.map(VersionRange::parse).transpose()?;
        Ok(Self::new(LibraryRange::package(name, version_range)))
    }

    pub fn name(&self) -> &str {
        &self.library_range.name
    }

    pub fn version_range(&self) -> Option<&VersionRange> {
        self.library_range.version_range.as_ref()
    }

    pub fn with_include_type(mut self, flags: LibraryIncludeFlags) -> Self {
        self.include_type = flags;
        self
    }

    pub fn with_suppress_parent(mut self, flags: LibraryIncludeFlags) -> Self {
        self.suppress_parent = flags;
        self
    }

    pub fn with_reference_type(mut self, reference_type: ReferenceType) -> Self {
        self.reference_type = reference_type;
        self
    }

    pub fn with_auto_referenced(mut self, auto_referenced: bool) -> Self {
        self.auto_referenced = auto_referenced;
        self
    }

    /// Every asset is private: the dependency does not flow to consumers.
    pub fn is_fully_suppressed(&self) -> bool {
        self.suppress_parent == LibraryIncludeFlags::ALL
    }
}

impl fmt::Display for LibraryDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.library_range.fmt(f)
    }
}

impl PartialEq for LibraryDependency {
    fn eq(&self, other: &Self) -> bool {
        LibraryDependencyComparer::default().equals(self, other)
    }
}

impl Eq for LibraryDependency {}

impl Hash for LibraryDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        LibraryDependencyComparer::default().hash(self).hash(state);
    }
}

/// A dependency as a package declares it: an id, an optional range and
/// include/exclude asset lists.
#[derive(Debug, Clone, Default)]
pub struct PackageDependency {
    pub id: String,
    pub version_range: Option<VersionRange>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl PackageDependency {
    pub fn new(id: impl Into<String>, version_range: Option<VersionRange>) -> Self {
        Self {
            id: id.into(),
            version_range,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn with_include<I, S>(mut self, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = include.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_exclude<I, S>(mut self, exclude: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = exclude.into_iter().map(Into::into).collect();
        self
    }

    /// The transitive graph edge this declaration produces. An empty include
    /// list means every asset.
    pub fn to_library_dependency(&self) -> Result<LibraryDependency, NuGraphError> {
        let include = if self.include.is_empty() {
            LibraryIncludeFlags::ALL
        } else {
            LibraryIncludeFlags::parse(&self.include.join(";"))?
        };
        let exclude = LibraryIncludeFlags::parse(&self.exclude.join(";"))?;

        let mut dependency = LibraryDependency::new(LibraryRange::package(
            self.id.clone(),
            self.version_range.clone(),
        ));
        dependency.include_type = include - exclude;
        dependency.reference_type = ReferenceType::Transitive;
        Ok(dependency)
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version_range {
            Some(range) => write!(f, "{} {}", self.id, range.pretty_print()),
            None => f.write_str(&self.id),
        }
    }
}

impl PartialEq for PackageDependency {
    fn eq(&self, other: &Self) -> bool {
        PackageDependencyComparer::default().equals(self, other)
    }
}

impl Eq for PackageDependency {}

impl Hash for PackageDependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        PackageDependencyComparer::default().hash(self).hash(state);
    }
}

/// A package identity together with its declared dependencies.
#[derive(Debug, Clone)]
pub struct PackageDependencyInfo {
    pub identity: PackageIdentity,
    pub dependencies: Vec<PackageDependency>,
}

impl PackageDependencyInfo {
    pub fn new(identity: PackageIdentity, dependencies: Vec<PackageDependency>) -> Self {
        Self {
            identity,
            dependencies,
        }
    }
}

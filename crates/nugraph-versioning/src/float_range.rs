//! Floating versions: `*`, `1.*`, `1.0.0-beta*`, `1.*-*` and friends.
//!
//! A floating range names the component that is allowed to move. The
//! resolver picks the highest available version that agrees with it.

use std::fmt;
use std::hash::{Hash, Hasher};

use nugraph_util::casing::starts_with_ignore_case;
use nugraph_util::errors::NuGraphError;
use nugraph_util::hash::HashCodeCombiner;

use crate::comparer::{VersionComparer, VersionComparison};
use crate::version::SemanticVersion;

/// Which part of a version floats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FloatBehavior {
    #[default]
    None,
    /// `1.0.0-beta*`
    Prerelease,
    /// `1.0.0.*`
    Revision,
    /// `1.0.*`
    Patch,
    /// `1.*`
    Minor,
    /// `*`
    Major,
    /// `*-*`
    AbsoluteLatest,
    /// `1.0.0.*-beta*`
    PrereleaseRevision,
    /// `1.0.*-beta*`
    PrereleasePatch,
    /// `1.*-beta*`
    PrereleaseMinor,
    /// `*-beta*`
    PrereleaseMajor,
}

impl FloatBehavior {
    pub fn includes_prerelease(self) -> bool {
        matches!(
            self,
            FloatBehavior::Prerelease
                | FloatBehavior::AbsoluteLatest
                | FloatBehavior::PrereleaseRevision
                | FloatBehavior::PrereleasePatch
                | FloatBehavior::PrereleaseMinor
                | FloatBehavior::PrereleaseMajor
        )
    }
}

#[derive(Debug, Clone)]
pub struct FloatRange {
    behavior: FloatBehavior,
    min_version: Option<SemanticVersion>,
    release_prefix: Option<String>,
}

impl FloatRange {
    /// When no prefix is given and `min_version` is a prerelease, its release
    /// string becomes the prefix.
    pub fn new(
        behavior: FloatBehavior,
        min_version: Option<SemanticVersion>,
        release_prefix: Option<String>,
    ) -> Self {
        let release_prefix = release_prefix.or_else(|| {
            min_version
                .as_ref()
                .filter(|v| v.is_prerelease())
                .map(SemanticVersion::release)
        });
        Self {
            behavior,
            min_version,
            release_prefix,
        }
    }

    pub fn parse(value: &str) -> Result<Self, NuGraphError> {
        let s = value.trim();
        let fail = || NuGraphError::parse(format!("'{value}' is not a valid floating version"));

        if s.is_empty() {
            return Err(fail());
        }
        if s == "*" {
            return Ok(Self::new(
                FloatBehavior::Major,
                Some(SemanticVersion::new(0, 0, 0)),
                None,
            ));
        }
        if s == "*-*" {
            return Ok(Self::new(
                FloatBehavior::AbsoluteLatest,
                Some(SemanticVersion::new(0, 0, 0).with_release_labels(["0"])),
                Some(String::new()),
            ));
        }

        let has_metadata = s.contains('+');
        match (s.find('*'), s.rfind('*')) {
            (Some(first), Some(last)) if first != last && !has_metadata => {
                parse_prerelease_float(s).ok_or_else(fail)
            }
            (Some(_), Some(last)) if last == s.len() - 1 && !has_metadata => {
                parse_single_star(s).ok_or_else(fail)
            }
            (None, _) => SemanticVersion::parse(s)
                .map(|v| Self::new(FloatBehavior::None, Some(v), None))
                .map_err(|_| fail()),
            _ => Err(fail()),
        }
    }

    pub fn behavior(&self) -> FloatBehavior {
        self.behavior
    }

    pub fn min_version(&self) -> Option<&SemanticVersion> {
        self.min_version.as_ref()
    }

    pub fn has_min_version(&self) -> bool {
        self.min_version.is_some()
    }

    pub fn release_prefix(&self) -> Option<&str> {
        self.release_prefix.as_deref()
    }

    pub fn includes_prerelease(&self) -> bool {
        self.behavior.includes_prerelease()
    }

    /// Whether `version` agrees with the floating component.
    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        match self.behavior {
            FloatBehavior::AbsoluteLatest => return true,
            FloatBehavior::Major if !version.is_prerelease() => return true,
            _ => {}
        }
        let Some(min) = self.min_version.as_ref() else {
            return false;
        };

        let prefix = self.release_prefix.as_deref().unwrap_or("");
        let label_ok =
            !version.is_prerelease() || starts_with_ignore_case(&version.release(), prefix);
        let same_major = min.major() == version.major();
        let same_minor = same_major && min.minor() == version.minor();
        let same_patch = same_minor && min.patch() == version.patch();

        match self.behavior {
            FloatBehavior::PrereleaseRevision => same_patch && label_ok,
            FloatBehavior::PrereleasePatch => same_minor && label_ok,
            FloatBehavior::PrereleaseMinor => same_major && label_ok,
            FloatBehavior::PrereleaseMajor => label_ok,
            FloatBehavior::Prerelease => {
                VersionComparer::new(VersionComparison::Version).equals(min, version) && label_ok
            }
            FloatBehavior::Revision => same_patch && !version.is_prerelease(),
            FloatBehavior::Patch => same_minor && !version.is_prerelease(),
            FloatBehavior::Minor => same_major && !version.is_prerelease(),
            FloatBehavior::None | FloatBehavior::Major | FloatBehavior::AbsoluteLatest => false,
        }
    }
}

/// `1.*-beta*`, `*-rc.*`: a star right before the dash and one at the end.
fn parse_prerelease_float(s: &str) -> Option<FloatRange> {
    let dash = s.find('-')?;
    let first = s.find('*')?;
    if !s.ends_with('*') || first + 1 != dash {
        return None;
    }

    let stable = &s[..first];
    if !(stable.is_empty() || stable.ends_with('.')) {
        return None;
    }
    let numbers = format!("{stable}0");
    let behavior = match numbers.split('.').count() {
        1 => FloatBehavior::PrereleaseMajor,
        2 => FloatBehavior::PrereleaseMinor,
        3 => FloatBehavior::PrereleasePatch,
        4 => FloatBehavior::PrereleaseRevision,
        _ => return None,
    };
    let numbers = if stable.is_empty() {
        "0.0".to_string()
    } else {
        numbers
    };

    let prefix = &s[dash + 1..s.len() - 1];
    let label = if prefix.is_empty() || prefix.ends_with('.') {
        format!("{prefix}0")
    } else {
        prefix.to_string()
    };
    let min = SemanticVersion::parse(&format!("{numbers}-{label}")).ok()?;
    Some(FloatRange::new(behavior, Some(min), Some(prefix.to_string())))
}

/// `1.*`, `1.0.*`, `1.0.0.*`, `1.0.0-*`, `1.0.0-beta*`.
fn parse_single_star(s: &str) -> Option<FloatRange> {
    let actual = &s[..s.len() - 1];

    let Some(dash) = actual.find('-') else {
        if !actual.ends_with('.') {
            return None;
        }
        let numbers = format!("{actual}0");
        let behavior = match numbers.split('.').count() {
            2 => FloatBehavior::Minor,
            3 => FloatBehavior::Patch,
            4 => FloatBehavior::Revision,
            _ => return None,
        };
        let min = SemanticVersion::parse(&numbers).ok()?;
        return Some(FloatRange::new(behavior, Some(min), None));
    };

    let prefix = &actual[dash + 1..];
    let source = if prefix.is_empty() || prefix.ends_with('.') {
        format!("{actual}0")
    } else {
        actual.to_string()
    };
    let min = SemanticVersion::parse(&source).ok()?;
    Some(FloatRange::new(
        FloatBehavior::Prerelease,
        Some(min),
        Some(prefix.to_string()),
    ))
}

impl fmt::Display for FloatRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = self.release_prefix.as_deref().unwrap_or("");
        let zero = SemanticVersion::new(0, 0, 0);
        let min = self.min_version.as_ref().unwrap_or(&zero);
        match self.behavior {
            FloatBehavior::None => write!(f, "{}", min.to_normalized_string()),
            FloatBehavior::Prerelease => write!(f, "{}-{prefix}*", min.numeric_string()),
            FloatBehavior::Revision => {
                write!(f, "{}.{}.{}.*", min.major(), min.minor(), min.patch())
            }
            FloatBehavior::Patch => write!(f, "{}.{}.*", min.major(), min.minor()),
            FloatBehavior::Minor => write!(f, "{}.*", min.major()),
            FloatBehavior::Major => f.write_str("*"),
            FloatBehavior::PrereleaseRevision => write!(
                f,
                "{}.{}.{}.*-{prefix}*",
                min.major(),
                min.minor(),
                min.patch()
            ),
            FloatBehavior::PrereleasePatch => {
                write!(f, "{}.{}.*-{prefix}*", min.major(), min.minor())
            }
            FloatBehavior::PrereleaseMinor => write!(f, "{}.*-{prefix}*", min.major()),
            FloatBehavior::PrereleaseMajor => write!(f, "*-{prefix}*"),
            FloatBehavior::AbsoluteLatest => f.write_str("*-*"),
        }
    }
}

impl PartialEq for FloatRange {
    fn eq(&self, other: &Self) -> bool {
        self.behavior == other.behavior && self.min_version == other.min_version
    }
}

impl Eq for FloatRange {}

impl Hash for FloatRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut combiner = HashCodeCombiner::new();
        combiner.add(&self.behavior).add(&self.min_version);
        combiner.finish().hash(state);
    }
}

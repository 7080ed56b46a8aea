//! Version ranges and range matching.
//!
//! Supports: `1.0` (at least 1.0), `[1.0]` (exact), `[1.0,2.0)`, `(1.0,)`,
//! `(,2.0]`, floating lower bounds such as `1.*` or `[1.0.*, 2.0)`, and `*`.
//! The upper bound never floats.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use nugraph_util::casing::cmp_ignore_case;
use nugraph_util::errors::NuGraphError;
use nugraph_util::hash::HashCodeCombiner;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::comparer::{VersionComparer, VersionComparison};
use crate::float_range::{FloatBehavior, FloatRange};
use crate::version::{SemanticVersion, MAX_COMPONENT};

#[derive(Debug, Clone)]
pub struct VersionRange {
    min: Option<SemanticVersion>,
    include_min: bool,
    max: Option<SemanticVersion>,
    include_max: bool,
    float: Option<FloatRange>,
}

impl VersionRange {
    pub fn new(
        min: Option<SemanticVersion>,
        include_min: bool,
        max: Option<SemanticVersion>,
        include_max: bool,
    ) -> Self {
        Self {
            min,
            include_min,
            max,
            include_max,
            float: None,
        }
    }

    /// A floating range whose lower bound is the float's minimum version.
    pub fn floating(float: FloatRange) -> Self {
        Self {
            min: float.min_version().cloned(),
            include_min: true,
            max: None,
            include_max: false,
            float: Some(float),
        }
    }

    /// `[version, )`
    pub fn at_least(version: SemanticVersion) -> Self {
        Self::new(Some(version), true, None, false)
    }

    /// `[version]`
    pub fn exact(version: SemanticVersion) -> Self {
        Self::new(Some(version.clone()), true, Some(version), true)
    }

    /// Every version, no float.
    pub fn all() -> Self {
        Self::new(None, true, None, true)
    }

    /// A range that no version satisfies: `(0.0.0, 0.0.0)`.
    pub fn none() -> Self {
        Self::new(
            Some(SemanticVersion::new(0, 0, 0)),
            false,
            Some(SemanticVersion::new(0, 0, 0)),
            false,
        )
    }

    pub fn parse(value: &str) -> Result<Self, NuGraphError> {
        let trimmed = value.trim();
        let fail = |reason: &str| {
            NuGraphError::parse(format!("'{value}' is not a valid version range: {reason}"))
        };

        if trimmed.is_empty() {
            return Err(fail("empty range"));
        }
        if trimmed == "*" {
            return Ok(Self::floating(FloatRange::parse(trimmed)?));
        }

        let (include_min, include_max, min_text, max_text) =
            if trimmed.starts_with('[') || trimmed.starts_with('(') {
                let include_min = trimmed.starts_with('[');
                let include_max = if trimmed.len() < 2 {
                    return Err(fail("missing closing bracket"));
                } else if trimmed.ends_with(']') {
                    true
                } else if trimmed.ends_with(')') {
                    false
                } else {
                    return Err(fail("missing closing bracket"));
                };

                let inner = &trimmed[1..trimmed.len() - 1];
                let parts: Vec<&str> = inner.split(',').collect();
                if parts.len() > 2 {
                    return Err(fail("more than two bounds"));
                }
                if parts.iter().all(|p| p.is_empty()) {
                    return Err(fail("neither bound is specified"));
                }
                if parts.len() == 1 && !(include_min && include_max) {
                    return Err(fail("a single version must be written as [x]"));
                }
                let min_text = parts[0];
                let max_text = parts.get(1).copied().unwrap_or(parts[0]);
                (include_min, include_max, min_text, Some(max_text))
            } else {
                (true, false, trimmed, None)
            };

        let mut float = None;
        let mut min = None;
        let min_text = min_text.trim();
        if !min_text.is_empty() {
            if min_text.contains('*') {
                let parsed = FloatRange::parse(min_text).map_err(|_| fail("invalid floating version"))?;
                min = parsed.min_version().cloned();
                if min.is_none() {
                    return Err(fail("floating version has no minimum"));
                }
                float = Some(parsed);
            } else {
                min = Some(SemanticVersion::parse(min_text).map_err(|e| fail(&e.to_string()))?);
            }
        }

        let mut max = None;
        if let Some(max_text) = max_text.map(str::trim).filter(|t| !t.is_empty()) {
            if max_text.contains('*') {
                return Err(fail("the upper bound cannot float"));
            }
            max = Some(SemanticVersion::parse(max_text).map_err(|e| fail(&e.to_string()))?);
        }

        if let (Some(lo), Some(hi)) = (&min, &max) {
            match lo.cmp(hi) {
                Ordering::Greater => return Err(fail("the lower bound exceeds the upper bound")),
                Ordering::Equal if include_min != include_max => {
                    return Err(fail("equal bounds must both be inclusive or both exclusive"))
                }
                _ => {}
            }
        }

        Ok(Self {
            min,
            include_min,
            max,
            include_max,
            float,
        })
    }

    pub fn min_version(&self) -> Option<&SemanticVersion> {
        self.min.as_ref()
    }

    pub fn max_version(&self) -> Option<&SemanticVersion> {
        self.max.as_ref()
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_some()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_some()
    }

    pub fn is_min_inclusive(&self) -> bool {
        self.include_min
    }

    pub fn is_max_inclusive(&self) -> bool {
        self.include_max
    }

    pub fn float(&self) -> Option<&FloatRange> {
        self.float.as_ref()
    }

    pub fn is_floating(&self) -> bool {
        self.float
            .as_ref()
            .is_some_and(|f| f.behavior() != FloatBehavior::None)
    }

    /// Whether the range pins a single version: `[x]`.
    pub fn is_exact(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(lo), Some(hi)) => {
                self.include_min && self.include_max && !self.is_floating() && lo == hi
            }
            _ => false,
        }
    }

    /// Within the bounds and, when floating, agreeing with the float.
    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        self.satisfies_with(version, &VersionComparer::default())
    }

    pub fn satisfies_with(&self, version: &SemanticVersion, comparer: &VersionComparer) -> bool {
        self.satisfies_bounds_with(version, comparer)
            && self
                .float
                .as_ref()
                .map_or(true, |f| f.behavior() == FloatBehavior::None || f.satisfies(version))
    }

    /// Bounds check only, ignoring any float.
    pub fn satisfies_bounds(&self, version: &SemanticVersion) -> bool {
        self.satisfies_bounds_with(version, &VersionComparer::default())
    }

    fn satisfies_bounds_with(&self, version: &SemanticVersion, comparer: &VersionComparer) -> bool {
        if let Some(min) = &self.min {
            match comparer.compare(version, min) {
                Ordering::Less => return false,
                Ordering::Equal if !self.include_min => return false,
                _ => {}
            }
        }
        if let Some(max) = &self.max {
            match comparer.compare(version, max) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.include_max => return false,
                _ => {}
            }
        }
        true
    }

    /// Prerelease candidates are eligible only when the float targets
    /// prereleases or either bound is itself a prerelease.
    pub fn allows_prerelease(&self) -> bool {
        self.float.as_ref().is_some_and(FloatRange::includes_prerelease)
            || self.min.as_ref().is_some_and(SemanticVersion::is_prerelease)
            || self.max.as_ref().is_some_and(SemanticVersion::is_prerelease)
    }

    /// Whether `considering` is a better pick than `current`.
    ///
    /// Floating ranges prefer versions agreeing with the float (the highest
    /// of them), then the lowest version within the bounds. Other ranges
    /// prefer the highest satisfying version.
    pub fn is_better(&self, current: Option<&SemanticVersion>, considering: &SemanticVersion) -> bool {
        if !self.satisfies_bounds(considering)
            || (considering.is_prerelease() && !self.allows_prerelease())
        {
            return false;
        }
        let Some(current) = current else {
            return true;
        };

        match self.float.as_ref().filter(|_| self.is_floating()) {
            Some(float) => match (float.satisfies(current), float.satisfies(considering)) {
                (true, false) => false,
                (false, true) => true,
                (true, true) => current < considering,
                (false, false) => considering < current,
            },
            None => current < considering,
        }
    }

    /// The best candidate for this range, or `None` when nothing qualifies.
    pub fn find_best_match<'a, I>(&self, candidates: I) -> Option<&'a SemanticVersion>
    where
        I: IntoIterator<Item = &'a SemanticVersion>,
    {
        let mut best = None;
        for candidate in candidates {
            if self.is_better(best, candidate) {
                best = Some(candidate);
            }
        }
        best
    }

    /// The smallest range containing every given version.
    pub fn combine_versions<'a, I>(versions: I) -> Self
    where
        I: IntoIterator<Item = &'a SemanticVersion>,
    {
        let mut sorted: Vec<&SemanticVersion> = versions.into_iter().collect();
        sorted.sort();
        match (sorted.first(), sorted.last()) {
            (Some(lo), Some(hi)) => Self::new(Some((*lo).clone()), true, Some((*hi).clone()), true),
            _ => Self::none(),
        }
    }

    /// The smallest range containing every given range. Zero-width ranges
    /// are ignored; an empty input yields [`VersionRange::none`].
    pub fn combine(ranges: &[VersionRange]) -> Self {
        let mut valid = ranges.iter().filter(|r| r.has_valid_range());
        let Some(first) = valid.next() else {
            return Self::none();
        };

        let mut lowest = first.min.clone();
        let mut highest = first.max.clone();
        let mut include_lowest = first.include_min && first.has_lower_bound();
        let mut include_highest = first.include_max && first.has_upper_bound();

        for range in valid {
            if let Some(current) = &lowest {
                match &range.min {
                    Some(min) => match min.cmp(current) {
                        Ordering::Less => {
                            lowest = Some(min.clone());
                            include_lowest = range.include_min;
                        }
                        Ordering::Equal => include_lowest |= range.include_min,
                        Ordering::Greater => {}
                    },
                    None => {
                        lowest = None;
                        include_lowest = false;
                    }
                }
            }

            if let Some(current) = &highest {
                match &range.max {
                    Some(max) => match max.cmp(current) {
                        Ordering::Greater => {
                            highest = Some(max.clone());
                            include_highest = range.include_max;
                        }
                        Ordering::Equal => include_highest |= range.include_max,
                        Ordering::Less => {}
                    },
                    None => {
                        highest = None;
                        include_highest = false;
                    }
                }
            }
        }

        Self::new(lowest, include_lowest, highest, include_highest)
    }

    /// The intersection of every given range, or [`VersionRange::none`].
    pub fn common_subset(ranges: &[VersionRange]) -> Self {
        if ranges.is_empty() || ranges.iter().any(|r| !r.has_valid_range()) {
            return Self::none();
        }

        let lowest = ranges.iter().filter_map(|r| r.min.as_ref()).max().cloned();
        let highest = ranges.iter().filter_map(|r| r.max.as_ref()).min().cloned();

        let mut exclude_lowest = lowest.as_ref().is_some_and(|lo| {
            ranges
                .iter()
                .any(|r| r.min.as_ref() == Some(lo) && !r.include_min)
        });
        let mut exclude_highest = highest.as_ref().is_some_and(|hi| {
            ranges
                .iter()
                .any(|r| r.max.as_ref() == Some(hi) && !r.include_max)
        });

        if let (Some(lo), Some(hi)) = (&lowest, &highest) {
            match lo.cmp(hi) {
                Ordering::Greater => return Self::none(),
                Ordering::Equal => {
                    exclude_lowest |= exclude_highest;
                    exclude_highest = exclude_lowest;
                }
                Ordering::Less => {}
            }
        }

        let result = Self::new(lowest, !exclude_lowest, highest, !exclude_highest);
        if result.has_valid_range() {
            result
        } else {
            Self::none()
        }
    }

    /// False only for zero-width ranges such as `(1.0.0, 1.0.0)`.
    fn has_valid_range(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(lo), Some(hi)) => self.include_min || self.include_max || lo != hi,
            _ => true,
        }
    }

    /// Human readable form: `(>= 1.0.0 && < 2.0.0)`, empty for unbounded.
    pub fn pretty_print(&self) -> String {
        if self.is_exact() {
            if let Some(min) = &self.min {
                return format!("(= {})", min.to_normalized_string());
            }
        }

        let mut parts = Vec::new();
        if let Some(min) = &self.min {
            let op = if self.include_min { ">=" } else { ">" };
            parts.push(format!("{op} {}", min.to_normalized_string()));
        }
        if let Some(max) = &self.max {
            let op = if self.include_max { "<=" } else { "<" };
            parts.push(format!("{op} {}", max.to_normalized_string()));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("({})", parts.join(" && "))
        }
    }

    /// Whether the near range's lower bound is at least the far range's,
    /// comparing floating lower bounds by the highest version they can reach.
    pub fn is_greater_than_or_equal_to(near: &VersionRange, far: &VersionRange) -> bool {
        let (Some(near_min), Some(far_min)) = (&near.min, &far.min) else {
            return !near.has_lower_bound() || far.has_lower_bound();
        };

        if !near.is_floating() && !far.is_floating() {
            return near_min >= far_min;
        }

        let near_float = near.float.as_ref().filter(|_| near.is_floating());
        let far_float = far.float.as_ref().filter(|_| far.is_floating());
        if near_float.is_some_and(|f| f.behavior() == FloatBehavior::Major) {
            return true;
        }
        if far_float.is_some_and(|f| f.behavior() == FloatBehavior::Major) {
            return false;
        }

        let near_top = release_label_free_version(near_min, near_float);
        let far_top = release_label_free_version(far_min, far_float);
        let ord = VersionComparer::new(VersionComparison::Version).compare(&near_top, &far_top);
        if ord != Ordering::Equal {
            return ord == Ordering::Greater;
        }

        let near_release = float_release(near_min, near_float);
        let far_release = float_release(far_min, far_float);
        let near_release = near_release.trim_matches('-');
        let far_release = far_release.trim_matches('-');
        if near_release.is_empty() {
            return true;
        }
        if far_release.is_empty() {
            return false;
        }

        let len = near_release.chars().count().min(far_release.chars().count());
        let near_head: String = near_release.chars().take(len).collect();
        let far_head: String = far_release.chars().take(len).collect();
        cmp_ignore_case(&near_head, &far_head) != Ordering::Less
    }
}

fn release_label_free_version(min: &SemanticVersion, float: Option<&FloatRange>) -> SemanticVersion {
    let behavior = float.map_or(FloatBehavior::None, FloatRange::behavior);
    match behavior {
        FloatBehavior::Major => SemanticVersion::new(MAX_COMPONENT, MAX_COMPONENT, MAX_COMPONENT),
        FloatBehavior::Minor => SemanticVersion::new(min.major(), MAX_COMPONENT, MAX_COMPONENT)
            .with_revision(MAX_COMPONENT),
        FloatBehavior::Patch => SemanticVersion::new(min.major(), min.minor(), MAX_COMPONENT)
            .with_revision(MAX_COMPONENT),
        FloatBehavior::Revision => {
            SemanticVersion::new(min.major(), min.minor(), min.patch()).with_revision(MAX_COMPONENT)
        }
        _ => min.stable(),
    }
}

/// The release prefix a floating bound was written with (`""` for
/// `1.0.0-*`), or the release of a fixed bound.
fn float_release(min: &SemanticVersion, float: Option<&FloatRange>) -> String {
    match float.and_then(FloatRange::release_prefix) {
        Some(prefix) => prefix.to_string(),
        None => min.release(),
    }
}

impl FromStr for VersionRange {
    type Err = NuGraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalized bracket form: `[1.0.0, 2.0.0)`, `[1.*, )`, `[1.0.0]`, `(, )`.
impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exact() {
            if let Some(min) = &self.min {
                return write!(f, "[{}]", min.to_normalized_string());
            }
        }

        let open = if self.has_lower_bound() && self.include_min {
            '['
        } else {
            '('
        };
        let close = if self.has_upper_bound() && self.include_max {
            ']'
        } else {
            ')'
        };
        let lower = match (&self.float, &self.min) {
            (Some(float), _) if self.is_floating() => float.to_string(),
            (_, Some(min)) => min.to_normalized_string(),
            _ => String::new(),
        };
        let upper = self
            .max
            .as_ref()
            .map(SemanticVersion::to_normalized_string)
            .unwrap_or_default();
        write!(f, "{open}{lower}, {upper}{close}")
    }
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        VersionRangeComparer::default().equals(Some(self), Some(other))
    }
}

impl Eq for VersionRange {}

impl Hash for VersionRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        VersionRangeComparer::default().hash(Some(self)).hash(state);
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Range equality where a missing range means [`VersionRange::all`].
///
/// The inclusivity flag of a missing bound is irrelevant, so `(, )` and
/// `all()` compare equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionRangeComparer {
    versions: VersionComparer,
}

impl VersionRangeComparer {
    pub const fn new(mode: VersionComparison) -> Self {
        Self {
            versions: VersionComparer::new(mode),
        }
    }

    pub fn equals(&self, a: Option<&VersionRange>, b: Option<&VersionRange>) -> bool {
        let all = VersionRange::all();
        let a = a.unwrap_or(&all);
        let b = b.unwrap_or(&all);

        self.bound_equals(a.min.as_ref(), a.include_min, b.min.as_ref(), b.include_min)
            && self.bound_equals(a.max.as_ref(), a.include_max, b.max.as_ref(), b.include_max)
            && a.is_floating() == b.is_floating()
            && (!a.is_floating() || a.float == b.float)
    }

    fn bound_equals(
        &self,
        a: Option<&SemanticVersion>,
        a_inclusive: bool,
        b: Option<&SemanticVersion>,
        b_inclusive: bool,
    ) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a_inclusive == b_inclusive && self.versions.equals(a, b),
            _ => false,
        }
    }

    /// Hash consistent with [`Self::equals`], including the `None` ≡ all rule.
    pub fn hash(&self, range: Option<&VersionRange>) -> u64 {
        let all = VersionRange::all();
        let range = range.unwrap_or(&all);

        let mut combiner = HashCodeCombiner::new();
        match &range.min {
            Some(min) => combiner
                .add(&true)
                .add(&range.include_min)
                .add_hash(self.versions.hash(min)),
            None => combiner.add(&false),
        };
        match &range.max {
            Some(max) => combiner
                .add(&true)
                .add(&range.include_max)
                .add_hash(self.versions.hash(max)),
            None => combiner.add(&false),
        };
        match range.float.as_ref().filter(|_| range.is_floating()) {
            Some(float) => combiner.add(float),
            None => combiner.add(&FloatBehavior::None),
        };
        combiner.finish()
    }
}

//! Standard package layout conventions.
//!
//! Framework monikers are compared as opaque names: an asset folder fits a
//! framework when the monikers are equal, and `any` fits every framework at
//! lower priority.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use nugraph_core::framework::TargetFramework;
use nugraph_util::casing::eq_ignore_case;
use nugraph_util::errors::NuGraphError;

use crate::collection::{PatternSet, SelectionCriteria, SelectionCriteriaEntry};
use crate::pattern::PatternDefinition;
use crate::property::{ContentPropertyDefinition, PatternTable, PropertyParser, PropertyValue};

pub const TFM: &str = "tfm";
pub const RID: &str = "rid";
pub const ANY: &str = "any";
pub const ASSEMBLY: &str = "assembly";
pub const LOCALE: &str = "locale";
pub const MSBUILD: &str = "msbuild";
pub const SATELLITE_ASSEMBLY: &str = "satelliteAssembly";

/// Placeholder file marking an intentionally empty folder.
const EMPTY_FOLDER_FILE: &str = "_._";

/// Property definitions and pattern sets for the usual package layout.
#[derive(Debug, Clone)]
pub struct Conventions {
    properties: BTreeMap<String, ContentPropertyDefinition>,
}

impl Default for Conventions {
    fn default() -> Self {
        Self::new()
    }
}

impl Conventions {
    pub fn new() -> Self {
        let properties = [
            ContentPropertyDefinition::new(TFM)
                .with_parser(PropertyParser::Custom(parse_framework))
                .with_compatibility(framework_compatible)
                .with_compare(framework_nearer),
            ContentPropertyDefinition::new(RID).with_parser(PropertyParser::Any),
            ContentPropertyDefinition::new(ANY)
                .with_parser(PropertyParser::Any)
                .with_subfolders(true),
            ContentPropertyDefinition::new(ASSEMBLY)
                .with_parser(PropertyParser::Custom(parse_empty_folder))
                .with_file_extensions(&[".dll", ".winmd", ".exe"]),
            ContentPropertyDefinition::new(MSBUILD)
                .with_parser(PropertyParser::Custom(parse_empty_folder))
                .with_file_extensions(&[".targets", ".props"]),
            ContentPropertyDefinition::new(SATELLITE_ASSEMBLY)
                .with_parser(PropertyParser::Custom(parse_empty_folder))
                .with_file_extensions(&[".resources.dll"]),
            ContentPropertyDefinition::new(LOCALE).with_parser(PropertyParser::Custom(parse_locale)),
        ]
        .into_iter()
        .map(|p| (p.name.clone(), p))
        .collect();
        Self { properties }
    }

    pub fn properties(&self) -> &BTreeMap<String, ContentPropertyDefinition> {
        &self.properties
    }

    /// Assemblies loaded at run time: `lib/{tfm}/...`, RID-specific
    /// `runtimes/{rid}/lib/{tfm}/...`, and bare `lib/*.dll` as `net`.
    pub fn runtime_assemblies(&self) -> Result<PatternSet, NuGraphError> {
        PatternSet::new(
            self.properties.clone(),
            &[
                with_any_table(PatternDefinition::new("runtimes/{rid}/lib/{tfm}/{any?}")),
                with_any_table(PatternDefinition::new("lib/{tfm}/{any?}")),
                with_any_table(PatternDefinition::new("lib/{assembly?}")).with_default(TFM, "net"),
            ],
            &[
                with_any_table(PatternDefinition::new("runtimes/{rid}/lib/{tfm}/{assembly}")),
                with_any_table(PatternDefinition::new("lib/{tfm}/{assembly}")),
                with_any_table(PatternDefinition::new("lib/{assembly}")).with_default(TFM, "net"),
            ],
        )
    }

    /// Reference assemblies used at compile time.
    pub fn compile_ref_assemblies(&self) -> Result<PatternSet, NuGraphError> {
        PatternSet::new(
            self.properties.clone(),
            &[with_any_table(PatternDefinition::new("ref/{tfm}/{any?}"))],
            &[with_any_table(PatternDefinition::new("ref/{tfm}/{assembly}"))],
        )
    }

    /// Native libraries under `runtimes/{rid}/native/`.
    pub fn native_libraries(&self) -> Result<PatternSet, NuGraphError> {
        PatternSet::new(
            self.properties.clone(),
            &[PatternDefinition::new("runtimes/{rid}/native/{any?}")],
            &[PatternDefinition::new("runtimes/{rid}/native/{any}")],
        )
    }

    /// Satellite resource assemblies: `lib/{tfm}/{locale}/...`.
    pub fn resource_assemblies(&self) -> Result<PatternSet, NuGraphError> {
        PatternSet::new(
            self.properties.clone(),
            &[with_any_table(PatternDefinition::new("lib/{tfm}/{locale?}/{any?}"))],
            &[with_any_table(PatternDefinition::new(
                "lib/{tfm}/{locale}/{satelliteAssembly}",
            ))],
        )
    }

    /// MSBuild `.props` and `.targets` under `build/`.
    pub fn msbuild_files(&self) -> Result<PatternSet, NuGraphError> {
        PatternSet::new(
            self.properties.clone(),
            &[
                with_any_table(PatternDefinition::new("build/{tfm}/{msbuild?}")),
                with_any_table(PatternDefinition::new("build/{msbuild?}")).with_default(TFM, ANY),
            ],
            &[
                with_any_table(PatternDefinition::new("build/{tfm}/{msbuild}")),
                with_any_table(PatternDefinition::new("build/{msbuild}")).with_default(TFM, ANY),
            ],
        )
    }
}

/// Prefer RID-specific assets for `framework`, then RID-agnostic ones.
pub fn criteria_for(framework: &TargetFramework, runtime: Option<&str>) -> SelectionCriteria {
    let tfm = PropertyValue::new(framework.as_str().to_lowercase());
    let mut criteria = SelectionCriteria::new();
    if let Some(rid) = runtime.filter(|r| !r.is_empty()) {
        criteria = criteria.with_entry(
            SelectionCriteriaEntry::new()
                .with(TFM, tfm.clone())
                .with(RID, rid),
        );
    }
    criteria.with_entry(SelectionCriteriaEntry::new().with(TFM, tfm).without(RID))
}

fn with_any_table(definition: PatternDefinition) -> PatternDefinition {
    definition.with_table(PatternTable::new().with_entry(TFM, ANY, ANY))
}

/// Framework folder names: a letter followed by letters, digits, `.` or `-`.
fn parse_framework(fragment: &str, _table: Option<&PatternTable>, _match_only: bool) -> Option<PropertyValue> {
    let mut chars = fragment.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid.then(|| PropertyValue::new(fragment.to_lowercase()))
}

fn parse_empty_folder(fragment: &str, _table: Option<&PatternTable>, _match_only: bool) -> Option<PropertyValue> {
    (fragment == EMPTY_FOLDER_FILE).then(|| PropertyValue::new(fragment))
}

/// Culture names such as `de`, `zh-Hans` or `pt-BR`.
fn parse_locale(fragment: &str, _table: Option<&PatternTable>, _match_only: bool) -> Option<PropertyValue> {
    let mut parts = fragment.split('-');
    let language = parts.next()?;
    let valid = (2..=3).contains(&language.len())
        && language.chars().all(|c| c.is_ascii_alphabetic())
        && parts.all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()));
    valid.then(|| PropertyValue::new(fragment))
}

fn framework_compatible(criteria: &PropertyValue, available: &PropertyValue) -> bool {
    eq_ignore_case(available.as_str(), ANY) || eq_ignore_case(criteria.as_str(), available.as_str())
}

/// An exact framework folder beats `any`.
fn framework_nearer(criteria: &PropertyValue, current: &PropertyValue, candidate: &PropertyValue) -> Ordering {
    let exact = |v: &PropertyValue| eq_ignore_case(criteria.as_str(), v.as_str());
    exact(candidate).cmp(&exact(current))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_folder_names() {
        assert_eq!(parse_framework("NET45", None, false).unwrap().as_str(), "net45");
        assert!(parse_framework("netstandard2.0", None, false).is_some());
        assert!(parse_framework("4net", None, false).is_none());
        assert!(parse_framework("", None, false).is_none());
    }

    #[test]
    fn locale_names() {
        assert!(parse_locale("de", None, false).is_some());
        assert!(parse_locale("zh-Hans", None, false).is_some());
        assert!(parse_locale("german", None, false).is_none());
        assert!(parse_locale("de-", None, false).is_none());
    }

    #[test]
    fn exact_framework_is_nearer() {
        let wanted = PropertyValue::new("net8.0");
        assert_eq!(
            framework_nearer(&wanted, &PropertyValue::new("any"), &PropertyValue::new("net8.0")),
            Ordering::Greater
        );
        assert!(framework_compatible(&wanted, &PropertyValue::new("any")));
        assert!(!framework_compatible(&wanted, &PropertyValue::new("net45")));
    }

    #[test]
    fn criteria_entries() {
        let criteria = criteria_for(&TargetFramework::new("net8.0"), Some("win-x64"));
        assert_eq!(criteria.entries.len(), 2);
        assert_eq!(criteria_for(&TargetFramework::new("net8.0"), None).entries.len(), 1);
    }
}

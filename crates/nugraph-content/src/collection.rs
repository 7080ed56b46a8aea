//! Package asset collections: matching files into items and item groups, and
//! choosing the group that best fits some selection criteria.

use std::collections::BTreeMap;
use std::path::Path;

use nugraph_util::casing::eq_ignore_case;
use nugraph_util::errors::NuGraphError;
use tracing::debug;

use crate::pattern::{ContentItem, PatternDefinition, PatternExpression};
use crate::property::{ContentPropertyDefinition, PropertyValue};

const ASSEMBLY_PROPERTY: &str = "assembly";
const RELATED_PROPERTY: &str = "related";
const ASSEMBLY_EXTENSIONS: &[&str] = &[".dll", ".exe", ".winmd"];

/// Patterns for one kind of asset.
///
/// Group patterns decide which files belong together (for example all of
/// `lib/net45/`), path patterns classify each file of a group.
#[derive(Debug, Clone)]
pub struct PatternSet {
    pub group_patterns: Vec<PatternExpression>,
    pub path_patterns: Vec<PatternExpression>,
    pub properties: BTreeMap<String, ContentPropertyDefinition>,
}

impl PatternSet {
    /// Parse the pattern definitions; every token must name one of
    /// `properties`.
    pub fn new(
        properties: BTreeMap<String, ContentPropertyDefinition>,
        group_patterns: &[PatternDefinition],
        path_patterns: &[PatternDefinition],
    ) -> Result<Self, NuGraphError> {
        let parse = |definitions: &[PatternDefinition]| -> Result<Vec<PatternExpression>, NuGraphError> {
            definitions
                .iter()
                .map(|definition| {
                    let expression = PatternExpression::parse(definition)?;
                    if let Some(unknown) = expression
                        .token_names()
                        .find(|name| !properties.contains_key(*name))
                    {
                        return Err(NuGraphError::Pattern {
                            message: format!("unknown property '{unknown}' in '{expression}'"),
                        });
                    }
                    Ok(expression)
                })
                .collect()
        };

        Ok(Self {
            group_patterns: parse(group_patterns)?,
            path_patterns: parse(path_patterns)?,
            properties,
        })
    }
}

/// Files sharing the properties captured by a group pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItemGroup {
    pub properties: BTreeMap<String, PropertyValue>,
    pub items: Vec<ContentItem>,
}

/// Required properties for one selection attempt. `None` requires the
/// property to be absent.
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteriaEntry {
    pub properties: Vec<(String, Option<PropertyValue>)>,
}

impl SelectionCriteriaEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, property: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((property.to_string(), Some(value.into())));
        self
    }

    pub fn without(mut self, property: &str) -> Self {
        self.properties.push((property.to_string(), None));
        self
    }
}

/// Selection attempts in order of preference.
#[derive(Debug, Clone, Default)]
pub struct SelectionCriteria {
    pub entries: Vec<SelectionCriteriaEntry>,
}

impl SelectionCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: SelectionCriteriaEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

/// The files of one package, as `/`-separated relative paths.
#[derive(Debug, Clone, Default)]
pub struct ContentItemCollection {
    assets: Vec<String>,
    has_contract: bool,
}

impl ContentItemCollection {
    /// Collect asset paths. Files at the package root match no pattern and
    /// are skipped; `lib/contract/...` is also exposed as `ref/any/...`.
    pub fn load<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collection = Self::default();
        for path in paths {
            let path = path.as_ref().replace('\\', "/");
            if !is_valid_asset(&path) {
                continue;
            }
            if let Some(rest) = path.strip_prefix("lib/contract") {
                collection.has_contract = true;
                let reference = format!("ref/any{rest}");
                collection.assets.push(path);
                collection.assets.push(reference);
            } else {
                collection.assets.push(path);
            }
        }
        collection
    }

    /// Load every file below `root`, in sorted path order.
    pub fn load_dir(root: &Path) -> Result<Self, NuGraphError> {
        let mut paths = Vec::new();
        collect_files(root, root, &mut paths)?;
        paths.sort();
        debug!("Loaded {} file(s) from {}", paths.len(), root.display());
        Ok(Self::load(paths))
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Whether the package ships `lib/contract`.
    pub fn has_contract(&self) -> bool {
        self.has_contract
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Every asset matched by one of the set's path patterns; the first
    /// matching pattern wins.
    pub fn find_items(&self, set: &PatternSet) -> Vec<ContentItem> {
        let assets: Vec<&str> = self.assets.iter().map(String::as_str).collect();
        find_items_in(set, &assets)
    }

    /// Group assets by the properties their group pattern captured, in the
    /// order groups are first seen, and append them to `groups`.
    pub fn populate_item_groups(&self, set: &PatternSet, groups: &mut Vec<ContentItemGroup>) {
        let mut grouped: Vec<(BTreeMap<String, PropertyValue>, Vec<&str>)> = Vec::new();
        for asset in &self.assets {
            for pattern in &set.group_patterns {
                let Some(item) = pattern.match_path(asset, &set.properties) else {
                    continue;
                };
                match grouped.iter_mut().find(|(props, _)| *props == item.properties) {
                    Some((_, assets)) => assets.push(asset),
                    None => grouped.push((item.properties, vec![asset.as_str()])),
                }
            }
        }

        groups.extend(grouped.into_iter().map(|(properties, assets)| ContentItemGroup {
            properties,
            items: find_items_in(set, &assets),
        }));
    }

    pub fn find_item_groups(&self, set: &PatternSet) -> Vec<ContentItemGroup> {
        let mut groups = Vec::new();
        self.populate_item_groups(set, &mut groups);
        groups
    }

    /// The best group for `criteria`, trying each set and then each criteria
    /// entry in order; the first entry that any group satisfies decides.
    pub fn find_best_item_group(
        &self,
        criteria: &SelectionCriteria,
        sets: &[&PatternSet],
    ) -> Option<ContentItemGroup> {
        for set in sets {
            let groups = self.find_item_groups(set);
            for entry in &criteria.entries {
                let mut best: Option<&ContentItemGroup> = None;
                let mut ambiguous = false;

                for group in groups.iter().filter(|g| satisfies(set, entry, g)) {
                    let Some(current) = best else {
                        best = Some(group);
                        continue;
                    };
                    match compare_groups(set, entry, current, group) {
                        std::cmp::Ordering::Greater => {
                            best = Some(group);
                            ambiguous = false;
                        }
                        std::cmp::Ordering::Equal => ambiguous = true,
                        std::cmp::Ordering::Less => {}
                    }
                }

                if let Some(best) = best {
                    if ambiguous {
                        debug!("Several groups fit equally well; keeping {:?}", best.properties);
                    }
                    return Some(best.clone());
                }
            }
        }
        None
    }
}

fn satisfies(set: &PatternSet, entry: &SelectionCriteriaEntry, group: &ContentItemGroup) -> bool {
    entry.properties.iter().all(|(name, wanted)| {
        let available = group.properties.get(name);
        match (wanted, available) {
            (None, available) => available.is_none(),
            (Some(_), None) => false,
            (Some(wanted), Some(available)) => set
                .properties
                .get(name)
                .is_some_and(|definition| definition.is_criteria_satisfied(wanted, available)),
        }
    })
}

/// `Greater` when `candidate` is a nearer fit than `current`, deciding on
/// the first criteria property that tells them apart.
fn compare_groups(
    set: &PatternSet,
    entry: &SelectionCriteriaEntry,
    current: &ContentItemGroup,
    candidate: &ContentItemGroup,
) -> std::cmp::Ordering {
    for (name, wanted) in &entry.properties {
        let Some(wanted) = wanted else {
            continue;
        };
        let (Some(definition), Some(a), Some(b)) = (
            set.properties.get(name),
            current.properties.get(name),
            candidate.properties.get(name),
        ) else {
            continue;
        };
        let ordering = definition.compare(wanted, a, b);
        if ordering != std::cmp::Ordering::Equal {
            return ordering;
        }
    }
    std::cmp::Ordering::Equal
}

fn find_items_in(set: &PatternSet, assets: &[&str]) -> Vec<ContentItem> {
    let mut items = Vec::new();
    for asset in assets {
        let Some(mut item) = set
            .path_patterns
            .iter()
            .find_map(|pattern| pattern.match_path(asset, &set.properties))
        else {
            continue;
        };
        if item.properties.contains_key(ASSEMBLY_PROPERTY) {
            if let Some(related) = related_extensions(&item.path, assets) {
                item.properties.insert(RELATED_PROPERTY.to_string(), related);
            }
        }
        items.push(item);
    }
    items
}

/// Extensions of files next to an assembly sharing its name, such as `.xml`
/// and `.pdb` for `lib/net45/Foo.dll`, sorted and joined with `;`.
fn related_extensions(assembly: &str, assets: &[&str]) -> Option<PropertyValue> {
    let dot = assembly.rfind('.')?;
    let prefix = &assembly[..=dot];

    let mut related: Vec<&str> = assets
        .iter()
        .filter(|asset| !eq_ignore_case(asset, assembly))
        // file names are case sensitive on some platforms
        .filter(|asset| asset.starts_with(prefix))
        .filter(|asset| {
            let extension = asset.rfind('.').map_or("", |i| &asset[i..]);
            extension.len() > 1 && !ASSEMBLY_EXTENSIONS.iter().any(|e| eq_ignore_case(extension, e))
        })
        .map(|asset| &asset[dot..])
        .collect();
    if related.is_empty() {
        return None;
    }
    related.sort_unstable();
    Some(PropertyValue::new(related.join(";")))
}

/// Root files cannot match any pattern: every pattern starts with a folder.
fn is_valid_asset(path: &str) -> bool {
    path.char_indices().skip(1).any(|(_, c)| c == '/')
}

fn collect_files(root: &Path, dir: &Path, paths: &mut Vec<String>) -> Result<(), NuGraphError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, paths)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            paths.push(parts.join("/"));
        }
    }
    Ok(())
}

//! Property definitions and lookup tables for pattern tokens.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use nugraph_util::casing::eq_ignore_case;

/// A value captured by a pattern token, or supplied as a default.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyValue(String);

impl PropertyValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parses a path fragment into a value: `(fragment, table, match_only)`.
pub type ParseFn = fn(&str, Option<&PatternTable>, bool) -> Option<PropertyValue>;

/// Whether an available value satisfies a criteria value.
pub type CompatibilityFn = fn(&PropertyValue, &PropertyValue) -> bool;

/// Orders two compatible candidates against a criteria value:
/// `(criteria, current, candidate)`, `Greater` when the candidate is nearer.
pub type CompareFn = fn(&PropertyValue, &PropertyValue, &PropertyValue) -> Ordering;

/// How a property turns a path fragment into a value once the pattern table
/// and file extension rules have not matched.
#[derive(Clone, Copy)]
pub enum PropertyParser {
    /// Only values listed in the pattern table are accepted.
    TableOnly,
    /// Any non-empty fragment is accepted verbatim.
    Any,
    Custom(ParseFn),
}

impl fmt::Debug for PropertyParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableOnly => f.write_str("TableOnly"),
            Self::Any => f.write_str("Any"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A property a pattern token can capture.
#[derive(Debug, Clone)]
pub struct ContentPropertyDefinition {
    pub name: String,
    /// Fragments ending in one of these (case-insensitive) are accepted as-is.
    pub file_extensions: Vec<String>,
    /// Whether an extension match may span folders.
    pub allow_subfolders: bool,
    pub parser: PropertyParser,
    compatibility: Option<CompatibilityFn>,
    compare: Option<CompareFn>,
}

impl ContentPropertyDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_extensions: Vec::new(),
            allow_subfolders: false,
            parser: PropertyParser::TableOnly,
            compatibility: None,
            compare: None,
        }
    }

    pub fn with_parser(mut self, parser: PropertyParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_file_extensions(mut self, extensions: &[&str]) -> Self {
        self.file_extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_subfolders(mut self, allow: bool) -> Self {
        self.allow_subfolders = allow;
        self
    }

    pub fn with_compatibility(mut self, test: CompatibilityFn) -> Self {
        self.compatibility = Some(test);
        self
    }

    pub fn with_compare(mut self, compare: CompareFn) -> Self {
        self.compare = Some(compare);
        self
    }

    /// Resolve `fragment` to a value: the pattern table first, then the
    /// file extension rule, then the parser.
    pub fn try_lookup(
        &self,
        fragment: &str,
        table: Option<&PatternTable>,
        match_only: bool,
    ) -> Option<PropertyValue> {
        if let Some(value) = table.and_then(|t| t.lookup(&self.name, fragment)) {
            return Some(value.clone());
        }

        if self.matches_extension(fragment) {
            return Some(PropertyValue::new(fragment));
        }

        match self.parser {
            PropertyParser::TableOnly => None,
            PropertyParser::Any => (!fragment.is_empty()).then(|| PropertyValue::new(fragment)),
            PropertyParser::Custom(parse) => parse(fragment, table, match_only),
        }
    }

    fn matches_extension(&self, fragment: &str) -> bool {
        if !self.allow_subfolders && fragment.contains('/') {
            return false;
        }
        self.file_extensions.iter().any(|ext| {
            fragment.len() > ext.len()
                && fragment
                    .get(fragment.len() - ext.len()..)
                    .is_some_and(|tail| eq_ignore_case(tail, ext))
        })
    }

    /// Whether `available` is usable where `criteria` is asked for.
    pub fn is_criteria_satisfied(&self, criteria: &PropertyValue, available: &PropertyValue) -> bool {
        match self.compatibility {
            Some(test) => test(criteria, available),
            None => eq_ignore_case(criteria.as_str(), available.as_str()),
        }
    }

    /// `Greater` when `candidate` fits `criteria` better than `current`.
    pub fn compare(
        &self,
        criteria: &PropertyValue,
        current: &PropertyValue,
        candidate: &PropertyValue,
    ) -> Ordering {
        match self.compare {
            Some(compare) => compare(criteria, current, candidate),
            None => Ordering::Equal,
        }
    }
}

/// Fixed token values: `(property, fragment) -> value`, fragments compared
/// without case.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    entries: BTreeMap<(String, String), PropertyValue>,
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(
        mut self,
        property: &str,
        fragment: &str,
        value: impl Into<PropertyValue>,
    ) -> Self {
        self.insert(property, fragment, value);
        self
    }

    pub fn insert(&mut self, property: &str, fragment: &str, value: impl Into<PropertyValue>) {
        self.entries
            .insert((property.to_string(), fragment.to_lowercase()), value.into());
    }

    pub fn lookup(&self, property: &str, fragment: &str) -> Option<&PropertyValue> {
        self.entries
            .get(&(property.to_string(), fragment.to_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

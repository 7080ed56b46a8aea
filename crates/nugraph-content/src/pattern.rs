//! `{token}` path templates.
//!
//! A pattern such as `lib/{tfm}/{assembly}` is a sequence of literal and
//! token segments. `{name?}` marks a match-only token: the fragment must
//! resolve but is not captured. A token reads up to its delimiter, the
//! first character of the literal that follows it, or to the end of the
//! path when it is the last segment.

use std::collections::BTreeMap;
use std::fmt;

use nugraph_util::casing::eq_ignore_case;
use nugraph_util::errors::NuGraphError;
use tracing::debug;

use crate::property::{ContentPropertyDefinition, PatternTable, PropertyValue};

/// A pattern string with its lookup table and default properties.
#[derive(Debug, Clone)]
pub struct PatternDefinition {
    pub pattern: String,
    pub table: Option<PatternTable>,
    /// Applied to a match for properties its tokens did not capture.
    pub defaults: BTreeMap<String, PropertyValue>,
}

impl PatternDefinition {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            table: None,
            defaults: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, table: PatternTable) -> Self {
        self.table = Some(table);
        self
    }

    pub fn with_default(mut self, property: &str, value: impl Into<PropertyValue>) -> Self {
        self.defaults.insert(property.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Token {
        name: String,
        delimiter: Option<char>,
        match_only: bool,
    },
}

/// A file matched by a pattern, with the properties it captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub path: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ContentItem {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn get(&self, property: &str) -> Option<&PropertyValue> {
        self.properties.get(property)
    }
}

/// A parsed [`PatternDefinition`].
#[derive(Debug, Clone)]
pub struct PatternExpression {
    pattern: String,
    segments: Vec<Segment>,
    table: Option<PatternTable>,
    defaults: BTreeMap<String, PropertyValue>,
}

impl PatternExpression {
    pub fn parse(definition: &PatternDefinition) -> Result<Self, NuGraphError> {
        let pattern = definition.pattern.as_str();
        let mut segments = Vec::new();
        let mut rest = pattern;

        while !rest.is_empty() {
            let Some(open) = rest.find('{') else {
                segments.push(Segment::Literal(rest.to_string()));
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| pattern_error(pattern, "unterminated '{'"))?;
            let raw = &after[..close];
            let (name, match_only) = match raw.strip_suffix('?') {
                Some(name) => (name, true),
                None => (raw, false),
            };
            if name.is_empty() {
                return Err(pattern_error(pattern, "empty token name"));
            }
            if name.contains('{') {
                return Err(pattern_error(pattern, "unterminated '{'"));
            }
            if matches!(segments.last(), Some(Segment::Token { .. })) {
                return Err(pattern_error(pattern, "tokens must be separated by a literal"));
            }
            segments.push(Segment::Token {
                name: name.to_string(),
                delimiter: None,
                match_only,
            });
            rest = &after[close + 1..];
        }

        for i in 0..segments.len() {
            let next = match segments.get(i + 1) {
                Some(Segment::Literal(text)) => text.chars().next(),
                _ => None,
            };
            if let Segment::Token { delimiter, .. } = &mut segments[i] {
                *delimiter = next;
            }
        }

        Ok(Self {
            pattern: pattern.to_string(),
            segments,
            table: definition.table.clone(),
            defaults: definition.defaults.clone(),
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of every token in the pattern, captured or not.
    pub fn token_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Token { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match `path` against the pattern.
    ///
    /// Literals compare without case. A token whose fragment does not
    /// resolve through its property fails the whole match; no other split
    /// of the path is tried. The path must be consumed completely.
    pub fn match_path(
        &self,
        path: &str,
        properties: &BTreeMap<String, ContentPropertyDefinition>,
    ) -> Option<ContentItem> {
        let mut item = ContentItem::new(path);
        let mut index = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    let end = index + text.len();
                    if !path.get(index..end).is_some_and(|s| eq_ignore_case(s, text)) {
                        return None;
                    }
                    index = end;
                }
                Segment::Token {
                    name,
                    delimiter,
                    match_only,
                } => {
                    let Some(definition) = properties.get(name) else {
                        debug!("No property definition for {{{name}}} in '{}'", self.pattern);
                        return None;
                    };
                    let rest = &path[index..];
                    let len = match delimiter {
                        Some(d) => rest.find(*d)?,
                        None => rest.len(),
                    };
                    if len == 0 {
                        return None;
                    }
                    let value = definition.try_lookup(&rest[..len], self.table.as_ref(), *match_only)?;
                    if !match_only {
                        item.properties.insert(name.clone(), value);
                    }
                    index += len;
                }
            }
        }

        if index != path.len() {
            return None;
        }
        for (property, value) in &self.defaults {
            item.properties
                .entry(property.clone())
                .or_insert_with(|| value.clone());
        }
        Some(item)
    }
}

impl fmt::Display for PatternExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn pattern_error(pattern: &str, problem: &str) -> NuGraphError {
    NuGraphError::Pattern {
        message: format!("{problem} in '{pattern}'"),
    }
}

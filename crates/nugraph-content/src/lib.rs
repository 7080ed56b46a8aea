//! Content model for package assets.
//!
//! Package files are classified with path templates such as
//! `lib/{tfm}/{assembly}`. Each `{token}` names a property whose definition
//! decides which path fragments are acceptable values. Matched files are
//! grouped by their captured properties, and a [`SelectionCriteria`] picks
//! the group that best fits a target framework.

pub mod collection;
pub mod conventions;
pub mod pattern;
pub mod property;

pub use collection::{
    ContentItemCollection, ContentItemGroup, PatternSet, SelectionCriteria,
    SelectionCriteriaEntry,
};
pub use pattern::{ContentItem, PatternDefinition, PatternExpression, Segment};
pub use property::{ContentPropertyDefinition, PatternTable, PropertyParser, PropertyValue};

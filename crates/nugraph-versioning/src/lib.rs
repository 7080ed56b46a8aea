//! Version model for nugraph.
//!
//! Semantic versions with an optional fourth (revision) component, the
//! comparers that decide how strictly two versions are compared, floating
//! ranges such as `1.*` or `1.0.0-beta*`, and bracketed version ranges.

pub mod comparer;
pub mod float_range;
pub mod range;
pub mod version;

pub use comparer::{VersionComparer, VersionComparison};
pub use float_range::{FloatBehavior, FloatRange};
pub use range::{VersionRange, VersionRangeComparer};
pub use version::SemanticVersion;

//! Dependency resolution engine: provider lookups, depth-first graph walking
//! per target framework, cycle and unresolved tracking, nearest-wins conflict
//! resolution and downgrade detection.

pub mod analyze;
pub mod cache;
pub mod conflict;
pub mod graph;
pub mod provider;
pub mod resolver;
pub mod walker;

pub use resolver::{resolve, ResolutionResult, RestoreTargetGraph};

//! Shared utilities for nugraph.
//!
//! This crate provides the cross-cutting concerns used by the other nugraph
//! crates: the unified error type and the deterministic hashing helpers that
//! the comparers and graph fingerprints rely on.

pub mod casing;
pub mod errors;
pub mod hash;

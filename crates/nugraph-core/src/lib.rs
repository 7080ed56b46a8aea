//! Core data types for nugraph.
//!
//! This crate defines the values the resolver works with: package identities,
//! library ranges and dependencies with their asset flags, the comparers that
//! give them case-insensitive, order-independent equality, target framework
//! monikers, central package versions and the resolver configuration.
//!
//! This crate is intentionally free of async code and I/O beyond reading the
//! configuration file.

pub mod central;
pub mod comparer;
pub mod config;
pub mod dependency;
pub mod framework;
pub mod identity;

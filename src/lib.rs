//! Berth - A recipe-driven dependency configuration resolver for C and C++
//!
//! This crate provides the core library functionality for Berth: recipe
//! loading, option configuration, requirement resolution, and fetching
//! and installing vendored sources.

pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for Berth unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides recipe fixtures and mock implementations
/// of the fetch and install adapters.
#[cfg(test)]
pub mod test_support;

pub use core::{
    dependency::DependencyDecl, option::OptionSet, platform::PlatformContext, recipe::Recipe,
};

pub use resolver::{Resolution, ResolveError};
pub use util::context::GlobalContext;

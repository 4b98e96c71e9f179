//! Core data structures for Berth.
//!
//! This module contains the types a recipe is made of:
//! - Build options and their per-platform removal
//! - Platform contexts and the predicates evaluated against them
//! - Dependency declarations
//! - The recipe itself

pub mod dependency;
pub mod option;
pub mod platform;
pub mod predicate;
pub mod recipe;

pub use dependency::{DependencyDecl, RequirementSpec};
pub use option::{BuildOption, OptionKind, OptionSet, OptionValue, OptionValues};
pub use platform::PlatformContext;
pub use predicate::Predicate;
pub use recipe::{find_recipe, PackageFileRule, Recipe, RECIPE_FILE};

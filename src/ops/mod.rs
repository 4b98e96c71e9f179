//! High-level operations.
//!
//! This module contains the implementation of Berth commands.

pub mod explain;
pub mod report;
pub mod resolve;
pub mod vendor;

pub use explain::{explain, Explanation, Outcome, RuleTable, RuleTrace};
pub use report::{format_explanation, format_options, format_resolution, format_vendor, to_json};
pub use resolve::{
    effective_overrides, parse_override, parse_overrides, resolve_matrix, resolve_recipe,
    ResolveOptions,
};
pub use vendor::{vendor, VendorOptions, VendorResult};

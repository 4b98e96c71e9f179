//! Dependency set assembly.
//!
//! Merges an ordered list of declarations into one declaration per name:
//!
//! - a name seen for the first time is inserted;
//! - a later declaration with `force_override` replaces the existing one,
//!   which stays a direct requirement if it was one;
//! - a later declaration with the same constraint merges its exposure
//!   flags into the existing one;
//! - a later declaration with a different constraint is a conflict.
//!
//! Assembly works on a private accumulator and only returns it once every
//! declaration has been merged, so a failure never leaks a partial set.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::core::dependency::DependencyDecl;
use crate::resolver::errors::ResolveError;
use crate::resolver::version::{parse_version_lenient, VersionConstraint};

/// The final declarations of one resolution pass, one per name.
///
/// Entries keep the position at which their name first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDependencySet {
    entries: Vec<DependencyDecl>,
    index: HashMap<String, usize>,
}

impl ResolvedDependencySet {
    /// Look up the final declaration for a name.
    pub fn get(&self, name: &str) -> Option<&DependencyDecl> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Check if a dependency is present.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterate declarations in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = &DependencyDecl> {
        self.entries.iter()
    }

    /// Declarations that add a direct requirement.
    pub fn direct(&self) -> impl Iterator<Item = &DependencyDecl> {
        self.entries.iter().filter(|d| d.is_direct())
    }

    /// Declarations that only pin versions of transitive dependencies.
    pub fn pins(&self) -> impl Iterator<Item = &DependencyDecl> {
        self.entries.iter().filter(|d| !d.is_direct())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ResolvedDependencySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a ResolvedDependencySet {
    type Item = &'a DependencyDecl;
    type IntoIter = std::slice::Iter<'a, DependencyDecl>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Merge declarations into a resolved set.
pub fn assemble(
    declarations: impl IntoIterator<Item = DependencyDecl>,
) -> Result<ResolvedDependencySet, ResolveError> {
    let mut entries: Vec<DependencyDecl> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for incoming in declarations {
        let Some(&pos) = index.get(incoming.name()) else {
            index.insert(incoming.name().to_string(), entries.len());
            entries.push(incoming);
            continue;
        };

        let existing = &mut entries[pos];

        if incoming.force_override() {
            tracing::debug!("`{}` overrides `{}`", incoming, existing);
            if !admits(existing.version_constraint(), incoming.version_constraint()) {
                tracing::warn!(
                    "`{}` pins a version outside the earlier `{}`",
                    incoming,
                    existing
                );
            }
            let direct = existing.is_direct();
            *existing = incoming;
            existing.keep_direct(direct);
        } else if existing.version_constraint() == incoming.version_constraint() {
            existing.widen(&incoming);
        } else {
            return Err(ResolveError::ConflictingDependency {
                dependency: incoming.name().to_string(),
                existing: existing.version_constraint().to_string(),
                incoming: incoming.version_constraint().to_string(),
            });
        }
    }

    Ok(ResolvedDependencySet { entries, index })
}

/// Whether a pinned version still satisfies the constraint it replaces.
fn admits(replaced: &VersionConstraint, pin: &VersionConstraint) -> bool {
    match pin {
        VersionConstraint::Exact(version) => match parse_version_lenient(version) {
            Some(version) => replaced.matches(&version),
            None => true,
        },
        _ => true,
    }
}

//! Dependency declarations.
//!
//! A `DependencyDecl` is one requirement on an external package: its name,
//! a version constraint, and the flags that decide how it is exposed and
//! how it merges with other declarations of the same name.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::predicate::Predicate;
use crate::resolver::errors::ResolveError;
use crate::resolver::rules::RequirementRule;
use crate::resolver::version::VersionConstraint;

/// A requirement on an external package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDecl {
    /// Package name
    name: String,

    /// Version constraint
    #[serde(rename = "version")]
    version_constraint: VersionConstraint,

    /// Whether this dependency's headers are re-exposed to consumers of ours
    transitive_headers: bool,

    /// Whether this declaration replaces any earlier one of the same name
    force_override: bool,

    /// Whether this adds a direct requirement, or only pins a version
    /// that may be pulled in transitively
    direct: bool,
}

impl DependencyDecl {
    /// Create a new declaration with default exposure flags.
    pub fn new(name: impl Into<String>, version_constraint: VersionConstraint) -> Self {
        DependencyDecl {
            name: name.into(),
            version_constraint,
            transitive_headers: true,
            force_override: false,
            direct: true,
        }
    }

    /// Parse a `name/constraint` reference, e.g. `fmt/[>=11.0]`.
    pub fn parse(reference: &str) -> Result<Self, ResolveError> {
        let (name, version) = reference.split_once('/').ok_or_else(|| {
            ResolveError::InvalidConfiguration(format!(
                "`{}` is not a `name/version` reference",
                reference
            ))
        })?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ResolveError::InvalidConfiguration(format!(
                "`{}` has an empty package name",
                reference
            )));
        }

        let constraint = VersionConstraint::parse(version).map_err(|reason| {
            ResolveError::InvalidVersionConstraint {
                dependency: name.to_string(),
                constraint: version.to_string(),
                reason,
            }
        })?;

        Ok(DependencyDecl::new(name, constraint))
    }

    /// Set whether headers are re-exposed to consumers.
    pub fn with_transitive_headers(mut self, transitive: bool) -> Self {
        self.transitive_headers = transitive;
        self
    }

    /// Make this declaration win over earlier ones of the same name.
    pub fn forced(mut self) -> Self {
        self.force_override = true;
        self
    }

    /// Make this a version pin only: it wins over other declarations of the
    /// same name but does not add a direct requirement by itself.
    pub fn override_only(mut self) -> Self {
        self.force_override = true;
        self.direct = false;
        self
    }

    /// Get the package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the version constraint.
    pub fn version_constraint(&self) -> &VersionConstraint {
        &self.version_constraint
    }

    pub fn transitive_headers(&self) -> bool {
        self.transitive_headers
    }

    pub fn force_override(&self) -> bool {
        self.force_override
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// Combine the exposure flags of an identical declaration into this one.
    pub(crate) fn widen(&mut self, other: &DependencyDecl) {
        self.transitive_headers |= other.transitive_headers;
        self.direct |= other.direct;
    }

    /// Keep a direct requirement that a version pin has replaced.
    pub(crate) fn keep_direct(&mut self, direct: bool) {
        self.direct |= direct;
    }
}

impl fmt::Display for DependencyDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version_constraint)
    }
}

/// A requirement as written in a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequirementSpec {
    /// Reference string: `"fmt/[>=11.0]"`
    Simple(String),

    /// Detailed specification
    Detailed(DetailedRequirementSpec),
}

/// Detailed requirement specification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DetailedRequirementSpec {
    /// Package name
    pub name: String,

    /// Version constraint
    pub version: String,

    /// Re-expose headers to consumers (default true)
    #[serde(default)]
    pub transitive_headers: Option<bool>,

    /// Replace earlier declarations of the same name
    #[serde(default)]
    pub force: bool,

    /// Pin the version without adding a direct requirement
    #[serde(default, rename = "override")]
    pub override_only: bool,

    /// Condition under which the requirement applies
    #[serde(default)]
    pub when: Option<Predicate>,
}

impl RequirementSpec {
    /// Convert to a requirement rule.
    pub fn to_rule(&self) -> Result<RequirementRule, ResolveError> {
        match self {
            RequirementSpec::Simple(reference) => {
                Ok(RequirementRule::always(DependencyDecl::parse(reference)?))
            }
            RequirementSpec::Detailed(spec) => spec.to_rule(),
        }
    }
}

impl DetailedRequirementSpec {
    /// Convert to a requirement rule.
    pub fn to_rule(&self) -> Result<RequirementRule, ResolveError> {
        if self.name.trim().is_empty() {
            return Err(ResolveError::InvalidConfiguration(
                "requirement has an empty name".to_string(),
            ));
        }

        let constraint = VersionConstraint::parse(&self.version).map_err(|reason| {
            ResolveError::InvalidVersionConstraint {
                dependency: self.name.clone(),
                constraint: self.version.clone(),
                reason,
            }
        })?;

        let mut decl = DependencyDecl::new(self.name.trim(), constraint);

        if let Some(transitive) = self.transitive_headers {
            decl = decl.with_transitive_headers(transitive);
        }

        if self.override_only {
            decl = decl.override_only();
        } else if self.force {
            decl = decl.forced();
        }

        let rule = RequirementRule::always(decl);
        Ok(match self.when {
            Some(ref condition) => rule.when(condition.clone()),
            None => rule,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference() {
        let decl = DependencyDecl::parse("sdl/[>=2 <3]").unwrap();
        assert_eq!(decl.name(), "sdl");
        assert!(matches!(decl.version_constraint(), VersionConstraint::Range(_)));
        assert!(decl.transitive_headers());
        assert!(!decl.force_override());
        assert!(decl.is_direct());
        assert_eq!(decl.to_string(), "sdl/[>=2 <3]");
    }

    #[test]
    fn test_parse_reference_errors() {
        assert!(matches!(
            DependencyDecl::parse("fmt"),
            Err(ResolveError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            DependencyDecl::parse("fmt/[>=11"),
            Err(ResolveError::InvalidVersionConstraint { .. })
        ));
    }

    #[test]
    fn test_override_only_implies_force() {
        let decl = DependencyDecl::parse("flac/1.4.3").unwrap().override_only();
        assert!(decl.force_override());
        assert!(!decl.is_direct());
    }

    #[test]
    fn test_widen() {
        let mut hidden = DependencyDecl::parse("zlib/[>=1.2]")
            .unwrap()
            .with_transitive_headers(false);
        let exposed = DependencyDecl::parse("zlib/[>=1.2]").unwrap();

        hidden.widen(&exposed);
        assert!(hidden.transitive_headers());
    }

    #[test]
    fn test_detailed_spec_from_toml() {
        let spec: DetailedRequirementSpec = toml::from_str(
            r#"
name = "sdl"
version = "[>=2 <3]"
force = true
transitive-headers = false
when = { all = [{ not = { os = "Emscripten" } }, { option = "with_sdl" }] }
"#,
        )
        .unwrap();

        let rule = spec.to_rule().unwrap();
        let decl = rule.declaration();
        assert_eq!(decl.name(), "sdl");
        assert!(decl.force_override());
        assert!(!decl.transitive_headers());
        assert!(rule.condition().is_some());
    }

    #[test]
    fn test_detailed_spec_rejects_unknown_keys() {
        let result: Result<DetailedRequirementSpec, _> =
            toml::from_str("name = \"fmt\"\nversion = \"11.0\"\nforced = true\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_simple_spec_is_unconditional() {
        let spec = RequirementSpec::Simple("observable_unique_ptr/0.7.2".to_string());
        let rule = spec.to_rule().unwrap();
        assert!(rule.condition().is_none());
        assert_eq!(rule.declaration().name(), "observable_unique_ptr");
    }
}

//! Requirement resolution.
//!
//! A resolution pass takes a recipe, a platform and user option overrides,
//! and produces the final set of dependency declarations. It is pure and
//! deterministic: no I/O happens here, and the same inputs always yield
//! the same `Resolution` (and the same fingerprint).
//!
//! The pass runs in fixed stages:
//! 1. check the platform against the recipe (`min-cppstd`);
//! 2. remove options per their `remove-when` condition;
//! 3. resolve option values from overrides and defaults;
//! 4. evaluate requirement rules in order;
//! 5. assemble requirements and tool requirements into separate sets.

pub mod assemble;
pub mod errors;
pub mod rules;
pub mod version;

pub use assemble::{assemble, ResolvedDependencySet};
pub use errors::ResolveError;
pub use rules::{evaluate, evaluate_traced, MatchedRule, RequirementRule};
pub use version::VersionConstraint;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::option::{OptionValue, OptionValues};
use crate::core::platform::PlatformContext;
use crate::core::recipe::Recipe;
use crate::util::hash::Fingerprint;

/// The outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub platform: PlatformContext,
    pub options: OptionValues,
    pub requires: ResolvedDependencySet,
    pub tool_requires: ResolvedDependencySet,
    pub fingerprint: String,
}

/// Run a resolution pass.
pub fn resolve(
    recipe: &Recipe,
    platform: &PlatformContext,
    overrides: &BTreeMap<String, OptionValue>,
) -> Result<Resolution, ResolveError> {
    recipe.validate_platform(platform)?;

    let options = recipe.options().configure(platform)?.resolve(overrides)?;

    let requires = assemble(evaluate(recipe.requires(), &options, platform)?)?;
    let tool_requires = assemble(evaluate(recipe.tool_requires(), &options, platform)?)?;

    let mut resolution = Resolution {
        package: recipe.name().to_string(),
        version: recipe.effective_version(None).map(str::to_string),
        platform: platform.clone(),
        options,
        requires,
        tool_requires,
        fingerprint: String::new(),
    };
    resolution.fingerprint = resolution.compute_fingerprint();

    tracing::debug!(
        "resolved `{}` on {}: {} requirements, {} tool requirements",
        resolution.package,
        platform,
        resolution.requires.len(),
        resolution.tool_requires.len()
    );

    Ok(resolution)
}

impl Resolution {
    /// Hash the canonical content of this resolution.
    pub fn compute_fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();

        fp.update_str(&self.package);
        fp.update_opt(self.version.as_deref());

        let platform = &self.platform;
        fp.update_str(&platform.os);
        fp.update_str(&platform.compiler);
        fp.update_str(&platform.arch);
        fp.update_str(&platform.build_type);
        fp.update_opt(platform.cppstd.as_deref());

        for (name, value) in self.options.iter() {
            fp.update_str(name);
            fp.update_str(&value.to_string());
        }
        for name in self.options.removed() {
            fp.update_str("-");
            fp.update_str(name);
        }

        for set in [&self.requires, &self.tool_requires] {
            fp.update_str("[");
            for decl in set {
                fp.update_str(decl.name());
                fp.update_str(&decl.version_constraint().to_string());
                fp.update_bool(decl.transitive_headers());
                fp.update_bool(decl.force_override());
                fp.update_bool(decl.is_direct());
            }
        }

        fp.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dependency::DependencyDecl;
    use crate::core::option::BuildOption;
    use crate::core::predicate::Predicate;

    fn decl(reference: &str) -> DependencyDecl {
        DependencyDecl::parse(reference).unwrap()
    }

    fn gui_recipe() -> Recipe {
        Recipe::new("gui")
            .with_option(BuildOption::boolean("with_xml", true))
            .with_option(BuildOption::boolean("with_yaml", true))
            .with_option(
                BuildOption::boolean("with_sfml", true).remove_when(Predicate::os("Emscripten")),
            )
            .with_requirement(RequirementRule::always(decl("fmt/[>=11.0]")))
            .with_requirement(
                RequirementRule::always(decl("pugixml/[>=1.10]").with_transitive_headers(false))
                    .when(Predicate::option("with_xml")),
            )
            .with_requirement(
                RequirementRule::always(decl("rapidyaml/[~0.8]").with_transitive_headers(false))
                    .when(Predicate::option("with_yaml")),
            )
            .with_requirement(
                RequirementRule::always(decl("sfml/[>=2.5 <3]"))
                    .when(Predicate::os("Emscripten").not().and(Predicate::option("with_sfml"))),
            )
            .with_tool_requirement(RequirementRule::always(decl("cmake/[>=3.31]")))
    }

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, OptionValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OptionValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_options_select_requirements() {
        let recipe = gui_recipe();
        let linux = PlatformContext::new("Linux");

        let resolution = resolve(&recipe, &linux, &overrides(&[("with_yaml", "False")])).unwrap();

        assert!(resolution.requires.contains("pugixml"));
        assert!(!resolution.requires.contains("rapidyaml"));
        assert!(resolution.requires.contains("sfml"));
        assert!(resolution.tool_requires.contains("cmake"));
        assert!(!resolution.requires.contains("cmake"));
    }

    #[test]
    fn test_removed_option_on_emscripten() {
        let recipe = gui_recipe();
        let web = PlatformContext::new("Emscripten");

        let resolution = resolve(&recipe, &web, &BTreeMap::new()).unwrap();
        assert!(!resolution.requires.contains("sfml"));
        assert!(resolution.options.is_removed("with_sfml"));

        let err = resolve(&recipe, &web, &overrides(&[("with_sfml", "True")])).unwrap_err();
        assert_eq!(
            err,
            ResolveError::RemovedOptionReferenced {
                option: "with_sfml".to_string()
            }
        );
    }

    #[test]
    fn test_unguarded_read_of_removed_option() {
        let recipe = Recipe::new("gui")
            .with_option(
                BuildOption::boolean("with_sfml", true).remove_when(Predicate::os("Emscripten")),
            )
            .with_requirement(
                RequirementRule::always(decl("sfml/[>=2.5 <3]"))
                    .when(Predicate::option("with_sfml").and(Predicate::os("Emscripten").not())),
            );

        let err = resolve(&recipe, &PlatformContext::new("Emscripten"), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, ResolveError::RemovedOptionReferenced { .. }));
    }

    #[test]
    fn test_forced_sdl_wins() {
        let recipe = Recipe::new("gui")
            .with_requirement(RequirementRule::always(decl("sdl/[>=2 <3]")))
            .with_requirement(RequirementRule::always(
                decl("sdl/[>=2.26 <3]").forced().with_transitive_headers(false),
            ));

        let resolution = resolve(&recipe, &PlatformContext::new("Linux"), &BTreeMap::new()).unwrap();
        let sdl = resolution.requires.get("sdl").unwrap();
        assert_eq!(sdl.version_constraint().to_string(), "[>=2.26 <3]");
        assert!(!sdl.transitive_headers());
    }

    #[test]
    fn test_conflict_produces_no_resolution() {
        let recipe = Recipe::new("gui")
            .with_requirement(RequirementRule::always(decl("sdl/[>=2 <3]")))
            .with_requirement(RequirementRule::always(decl("sdl/[>=2.26 <3]")));

        let err = resolve(&recipe, &PlatformContext::new("Linux"), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ResolveError::ConflictingDependency { .. }));
    }

    #[test]
    fn test_min_cppstd_checked_first() {
        let recipe = gui_recipe().with_min_cppstd(17);
        let old = PlatformContext::new("Linux").with_cppstd("14");

        let err = resolve(&recipe, &old, &overrides(&[("nonexistent", "1")])).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let recipe = gui_recipe();
        let linux = PlatformContext::new("Linux");
        let opts = overrides(&[("with_xml", "false")]);

        let first = resolve(&recipe, &linux, &opts).unwrap();
        let second = resolve(&recipe, &linux, &opts).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.fingerprint.len(), 64);
    }

    #[test]
    fn test_fingerprint_tracks_inputs() {
        let recipe = gui_recipe();
        let linux = PlatformContext::new("Linux");

        let a = resolve(&recipe, &linux, &BTreeMap::new()).unwrap();
        let b = resolve(&recipe, &linux, &overrides(&[("with_xml", "false")])).unwrap();
        let c = resolve(&recipe, &linux.clone().with_build_type("Debug"), &BTreeMap::new()).unwrap();

        assert_ne!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
    }

    #[test]
    fn test_resolution_serializes() {
        let resolution =
            resolve(&gui_recipe(), &PlatformContext::new("Linux"), &BTreeMap::new()).unwrap();
        let json = serde_json::to_value(&resolution).unwrap();

        assert_eq!(json["package"], "gui");
        assert_eq!(json["platform"]["os"], "Linux");
        assert_eq!(json["options"]["values"]["with_xml"], true);
        assert_eq!(json["requires"][0]["name"], "fmt");
        assert_eq!(json["tool_requires"][0]["name"], "cmake");
        assert!(json.get("version").is_none());
    }
}

//! Explain why a dependency is (or is not) required.

use serde::Serialize;

use crate::core::dependency::DependencyDecl;
use crate::core::platform::PlatformContext;
use crate::core::recipe::Recipe;
use crate::ops::resolve::{effective_overrides, ResolveOptions};
use crate::resolver::{assemble, evaluate_traced, RequirementRule, ResolveError};

/// Which rule table a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleTable {
    Requires,
    ToolRequires,
}

/// A rule that names the dependency being explained.
#[derive(Debug, Clone, Serialize)]
pub struct RuleTrace {
    pub table: RuleTable,
    /// Position in its table, counting from 0
    pub index: usize,
    /// Rendered `when` condition, if any
    pub condition: Option<String>,
    pub declaration: DependencyDecl,
    /// Whether the condition held
    pub matched: bool,
}

/// What assembly made of the matching declarations.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// No rule applied.
    NotRequired,
    /// The final declaration.
    Resolved { declaration: DependencyDecl },
    /// The declarations could not be merged.
    Conflict { message: String },
}

/// Everything known about one dependency for one pass.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub dependency: String,
    pub platform: PlatformContext,
    pub rules: Vec<RuleTrace>,
    pub requires: Outcome,
    pub tool_requires: Outcome,
}

impl Explanation {
    /// Whether any rule in the recipe names the dependency at all.
    pub fn is_known(&self) -> bool {
        !self.rules.is_empty()
    }
}

/// Trace the rules naming `dependency` through one resolution pass.
///
/// Option handling is the same as for a full pass, so a pass that would
/// fail on option errors fails here too. A conflict on the dependency
/// itself is reported as an outcome rather than an error.
pub fn explain(
    recipe: &Recipe,
    opts: &ResolveOptions,
    dependency: &str,
) -> Result<Explanation, ResolveError> {
    let platform = &opts.platform;
    recipe.validate_platform(platform)?;

    let overrides = effective_overrides(recipe, opts)?;
    let options = recipe.options().configure(platform)?.resolve(&overrides)?;

    let mut rules = Vec::new();
    let mut outcomes = Vec::new();

    for (table, table_rules) in [
        (RuleTable::Requires, recipe.requires()),
        (RuleTable::ToolRequires, recipe.tool_requires()),
    ] {
        let matched: Vec<usize> = evaluate_traced(table_rules, &options, platform)?
            .iter()
            .map(|m| m.index)
            .collect();

        let mut winners = Vec::new();
        for (index, rule) in table_rules.iter().enumerate() {
            if rule.declaration().name() != dependency {
                continue;
            }
            let hit = matched.contains(&index);
            if hit {
                winners.push(rule.declaration().clone());
            }
            rules.push(trace(table, index, rule, hit));
        }

        outcomes.push(outcome(winners));
    }

    let tool_requires = outcomes.pop().unwrap_or(Outcome::NotRequired);
    let requires = outcomes.pop().unwrap_or(Outcome::NotRequired);

    Ok(Explanation {
        dependency: dependency.to_string(),
        platform: platform.clone(),
        rules,
        requires,
        tool_requires,
    })
}

fn trace(table: RuleTable, index: usize, rule: &RequirementRule, matched: bool) -> RuleTrace {
    RuleTrace {
        table,
        index,
        condition: rule.condition().map(ToString::to_string),
        declaration: rule.declaration().clone(),
        matched,
    }
}

fn outcome(declarations: Vec<DependencyDecl>) -> Outcome {
    if declarations.is_empty() {
        return Outcome::NotRequired;
    }

    match assemble(declarations) {
        Ok(set) => match set.iter().next() {
            Some(decl) => Outcome::Resolved {
                declaration: decl.clone(),
            },
            None => Outcome::NotRequired,
        },
        Err(e) => Outcome::Conflict {
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;

    fn linux() -> ResolveOptions {
        ResolveOptions::new(PlatformContext::new("Linux"))
    }

    #[test]
    fn test_explain_conditional_requirement() {
        let recipe = fixtures::lxgui();
        let explanation = explain(&recipe, &linux(), "pugixml").unwrap();

        assert_eq!(explanation.rules.len(), 1);
        let rule = &explanation.rules[0];
        assert!(rule.matched);
        assert_eq!(rule.condition.as_deref(), Some("options.with_xml"));
        assert!(matches!(explanation.requires, Outcome::Resolved { .. }));
        assert!(matches!(explanation.tool_requires, Outcome::NotRequired));
    }

    #[test]
    fn test_explain_unmatched_rule() {
        let recipe = fixtures::lxgui();
        let opts = linux().with_override("with_xml", "False");
        let explanation = explain(&recipe, &opts, "pugixml").unwrap();

        assert!(explanation.is_known());
        assert!(!explanation.rules[0].matched);
        assert!(matches!(explanation.requires, Outcome::NotRequired));
    }

    #[test]
    fn test_explain_tool_requirement() {
        let recipe = fixtures::lxgui();
        let explanation = explain(&recipe, &linux(), "cmake").unwrap();

        assert_eq!(explanation.rules[0].table, RuleTable::ToolRequires);
        assert!(matches!(explanation.tool_requires, Outcome::Resolved { .. }));
    }

    #[test]
    fn test_explain_forced_override() {
        let recipe = fixtures::sdl_override();
        let explanation = explain(&recipe, &linux(), "sdl").unwrap();

        assert_eq!(explanation.rules.len(), 2);
        match explanation.requires {
            Outcome::Resolved { declaration } => {
                assert!(declaration.force_override());
                assert_eq!(declaration.version_constraint().to_string(), "[>=2.26 <3]");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_explain_conflict() {
        let recipe = fixtures::sdl_conflict();
        let explanation = explain(&recipe, &linux(), "sdl").unwrap();
        assert!(matches!(explanation.requires, Outcome::Conflict { .. }));
    }

    #[test]
    fn test_explain_unknown_dependency() {
        let recipe = fixtures::lxgui();
        let explanation = explain(&recipe, &linux(), "boost").unwrap();
        assert!(!explanation.is_known());
    }
}

//! Requirement rules and their evaluation.

use crate::core::dependency::DependencyDecl;
use crate::core::option::OptionValues;
use crate::core::platform::PlatformContext;
use crate::core::predicate::Predicate;
use crate::resolver::errors::ResolveError;

/// A conditional dependency declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementRule {
    condition: Option<Predicate>,
    declaration: DependencyDecl,
}

impl RequirementRule {
    /// A rule that applies unconditionally.
    pub fn always(declaration: DependencyDecl) -> Self {
        RequirementRule {
            condition: None,
            declaration,
        }
    }

    /// Restrict the rule to when `condition` holds.
    pub fn when(mut self, condition: Predicate) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn condition(&self) -> Option<&Predicate> {
        self.condition.as_ref()
    }

    pub fn declaration(&self) -> &DependencyDecl {
        &self.declaration
    }

    /// Check whether the rule applies for the given inputs.
    pub fn applies(
        &self,
        options: &OptionValues,
        platform: &PlatformContext,
    ) -> Result<bool, ResolveError> {
        match self.condition {
            Some(ref condition) => condition.evaluate(options, platform),
            None => Ok(true),
        }
    }
}

/// A rule whose condition held, with its position in the rule table.
#[derive(Debug, Clone, Copy)]
pub struct MatchedRule<'a> {
    pub index: usize,
    pub rule: &'a RequirementRule,
}

/// Evaluate rules in order and return the declarations of those that apply.
pub fn evaluate(
    rules: &[RequirementRule],
    options: &OptionValues,
    platform: &PlatformContext,
) -> Result<Vec<DependencyDecl>, ResolveError> {
    Ok(evaluate_traced(rules, options, platform)?
        .into_iter()
        .map(|m| m.rule.declaration.clone())
        .collect())
}

/// Like [`evaluate`], but keeps track of which rule produced each declaration.
pub fn evaluate_traced<'a>(
    rules: &'a [RequirementRule],
    options: &OptionValues,
    platform: &PlatformContext,
) -> Result<Vec<MatchedRule<'a>>, ResolveError> {
    let mut matched = Vec::new();

    for (index, rule) in rules.iter().enumerate() {
        if rule.applies(options, platform)? {
            tracing::debug!("rule #{} matched: {}", index, rule.declaration);
            matched.push(MatchedRule { index, rule });
        }
    }

    Ok(matched)
}

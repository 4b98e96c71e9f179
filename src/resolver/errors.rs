//! Resolution error types and diagnostics.

use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error during a resolution pass.
///
/// Every variant is terminal for the pass that raised it: the resolver
/// never retries and never hands back a partially assembled set.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
pub enum ResolveError {
    #[error("unknown option `{option}`")]
    #[diagnostic(code(berth::options::unknown))]
    UnknownOption { option: String },

    #[error("invalid value `{value}` for option `{option}`")]
    #[diagnostic(code(berth::options::invalid_value))]
    InvalidOptionValue {
        option: String,
        value: String,
        allowed: Vec<String>,
    },

    #[error("option `{option}` is not available on this platform")]
    #[diagnostic(code(berth::options::removed))]
    RemovedOptionReferenced { option: String },

    #[error("conflicting requirements for `{dependency}`: `{existing}` and `{incoming}`")]
    #[diagnostic(
        code(berth::resolve::conflict),
        help("mark the declaration that must win with `force = true`")
    )]
    ConflictingDependency {
        dependency: String,
        existing: String,
        incoming: String,
    },

    #[error("invalid version constraint `{constraint}` for `{dependency}`: {reason}")]
    #[diagnostic(code(berth::recipe::version))]
    InvalidVersionConstraint {
        dependency: String,
        constraint: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(berth::recipe::invalid))]
    InvalidConfiguration(String),
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match self {
            ResolveError::UnknownOption { option } => {
                Diagnostic::error(format!("unknown option `{}`", option))
                    .with_suggestion("Run `berth options` to list the options this recipe declares")
            }

            ResolveError::InvalidOptionValue {
                option,
                value,
                allowed,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "invalid value `{}` for option `{}`",
                    value, option
                ));

                if !allowed.is_empty() {
                    diag = diag.with_context(format!("allowed values: {}", allowed.join(", ")));
                }

                diag.with_suggestion(format!("Pass one of the allowed values: `-o {}=<value>`", option))
            }

            ResolveError::RemovedOptionReferenced { option } => {
                Diagnostic::error(format!(
                    "option `{}` has been removed for this platform",
                    option
                ))
                .with_context("options removed by `remove-when` cannot be set or tested")
                .with_suggestion(format!("Drop `-o {}=...` for this platform", option))
                .with_suggestion(
                    "Guard rules that read the option with a platform check placed before it",
                )
            }

            ResolveError::ConflictingDependency {
                dependency,
                existing,
                incoming,
            } => Diagnostic::error(format!("version conflict for `{}`", dependency))
                .with_context(format!("first declared as {}/{}", dependency, existing))
                .with_context(format!("then declared as {}/{}", dependency, incoming))
                .with_suggestion(format!(
                    "Use the same constraint for `{}` in every rule",
                    dependency
                ))
                .with_suggestion("Mark the declaration that must win with `force = true`"),

            ResolveError::InvalidVersionConstraint {
                dependency,
                constraint,
                reason,
            } => Diagnostic::error(format!(
                "invalid version constraint `{}` for `{}`",
                constraint, dependency
            ))
            .with_context(reason.clone())
            .with_suggestion(
                "Use an exact version (`1.2.3`), a range (`[>=1.2 <2]`), or `system`",
            ),

            ResolveError::InvalidConfiguration(message) => {
                Diagnostic::error(format!("invalid configuration: {}", message))
            }
        };

        diag.with_code_of(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_diagnostic() {
        let err = ResolveError::ConflictingDependency {
            dependency: "sdl".to_string(),
            existing: "[>=2 <3]".to_string(),
            incoming: "[>=2.26 <3]".to_string(),
        };

        let output = err.to_diagnostic().format(false);

        assert!(output.starts_with("error[berth::resolve::conflict]: version conflict for `sdl`"));
        assert!(output.contains("sdl/[>=2 <3]"));
        assert!(output.contains("sdl/[>=2.26 <3]"));
        assert!(output.contains("force = true"));
    }

    #[test]
    fn test_invalid_value_lists_allowed() {
        let err = ResolveError::InvalidOptionValue {
            option: "backend".to_string(),
            value: "vulkan".to_string(),
            allowed: vec!["gl".to_string(), "sdl".to_string()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("allowed values: gl, sdl"));
    }

    #[test]
    fn test_diagnostic_codes() {
        use miette::Diagnostic as _;

        let err = ResolveError::RemovedOptionReferenced {
            option: "with_sfml".to_string(),
        };
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("berth::options::removed"));
    }
}

//! Conditions over platform settings and option values.
//!
//! A `Predicate` is the `when` clause of a requirement rule and the
//! `remove-when` clause of an option. In a recipe it is written as a TOML
//! inline table:
//!
//! ```toml
//! when = { option = "with_xml" }
//! when = { all = [{ not = { os = "Emscripten" } }, { option = "with_sfml" }] }
//! when = { option-is = { name = "backend", value = "gl" } }
//! ```
//!
//! Evaluation is pure and short-circuits left to right, so a platform check
//! placed before an option read protects the read on platforms where the
//! option has been removed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::option::{OptionValue, OptionValues};
use crate::core::platform::{PlatformContext, PlatformField};
use crate::resolver::errors::ResolveError;

/// A composable condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Predicate {
    /// Always true.
    Always,
    /// `platform.os == value`
    Os(String),
    /// `platform.compiler == value`
    Compiler(String),
    /// `platform.arch == value`
    Arch(String),
    /// `platform.build_type == value`
    BuildType(String),
    /// Truthiness of an option.
    #[serde(rename = "option")]
    Enabled(String),
    /// An option equals a literal value.
    OptionIs { name: String, value: OptionValue },
    /// Logical negation.
    Not(Box<Predicate>),
    /// Logical AND of all children; true when empty.
    All(Vec<Predicate>),
    /// Logical OR of all children; false when empty.
    Any(Vec<Predicate>),
}

impl Predicate {
    /// `platform.os == os`
    pub fn os(os: impl Into<String>) -> Self {
        Predicate::Os(os.into())
    }

    /// `platform.compiler == compiler`
    pub fn compiler(compiler: impl Into<String>) -> Self {
        Predicate::Compiler(compiler.into())
    }

    /// `platform.arch == arch`
    pub fn arch(arch: impl Into<String>) -> Self {
        Predicate::Arch(arch.into())
    }

    /// `platform.build_type == build_type`
    pub fn build_type(build_type: impl Into<String>) -> Self {
        Predicate::BuildType(build_type.into())
    }

    /// Truthiness of the named option.
    pub fn option(name: impl Into<String>) -> Self {
        Predicate::Enabled(name.into())
    }

    /// The named option equals `value`.
    pub fn option_is(name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Predicate::OptionIs {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Negate this predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// `self AND other`, flattening nested `All`s.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::All(mut children) => {
                children.push(other);
                Predicate::All(children)
            }
            first => Predicate::All(vec![first, other]),
        }
    }

    /// `self OR other`, flattening nested `Any`s.
    pub fn or(self, other: Predicate) -> Self {
        match self {
            Predicate::Any(mut children) => {
                children.push(other);
                Predicate::Any(children)
            }
            first => Predicate::Any(vec![first, other]),
        }
    }

    /// Evaluate against resolved option values and a platform.
    pub fn evaluate(
        &self,
        options: &OptionValues,
        platform: &PlatformContext,
    ) -> Result<bool, ResolveError> {
        self.eval(Some(options), platform)
    }

    /// Evaluate a condition that may only test platform fields.
    ///
    /// Used for `remove-when`, which runs before any option is resolved.
    pub fn evaluate_platform(&self, platform: &PlatformContext) -> Result<bool, ResolveError> {
        self.eval(None, platform)
    }

    fn eval(
        &self,
        options: Option<&OptionValues>,
        platform: &PlatformContext,
    ) -> Result<bool, ResolveError> {
        let result = match self {
            Predicate::Always => true,
            Predicate::Os(v) => platform.field(PlatformField::Os) == v,
            Predicate::Compiler(v) => platform.field(PlatformField::Compiler) == v,
            Predicate::Arch(v) => platform.field(PlatformField::Arch) == v,
            Predicate::BuildType(v) => platform.field(PlatformField::BuildType) == v,
            Predicate::Enabled(name) => require_options(options, name)?.get(name)?.is_truthy(),
            Predicate::OptionIs { name, value } => {
                require_options(options, name)?.get(name)?.loosely_equals(value)
            }
            Predicate::Not(inner) => !inner.eval(options, platform)?,
            Predicate::All(children) => {
                for child in children {
                    if !child.eval(options, platform)? {
                        return Ok(false);
                    }
                }
                true
            }
            Predicate::Any(children) => {
                for child in children {
                    if child.eval(options, platform)? {
                        return Ok(true);
                    }
                }
                false
            }
        };
        Ok(result)
    }

    /// Every option name this predicate can read, in first-seen order.
    pub fn referenced_options(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_options(&mut names);
        names
    }

    fn collect_options<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Predicate::Enabled(name) | Predicate::OptionIs { name, .. } => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Predicate::Not(inner) => inner.collect_options(names),
            Predicate::All(children) | Predicate::Any(children) => {
                for child in children {
                    child.collect_options(names);
                }
            }
            _ => {}
        }
    }

    fn needs_parens(&self) -> bool {
        matches!(self, Predicate::All(c) | Predicate::Any(c) if c.len() > 1)
    }
}

fn require_options<'a>(
    options: Option<&'a OptionValues>,
    name: &str,
) -> Result<&'a OptionValues, ResolveError> {
    options.ok_or_else(|| {
        ResolveError::InvalidConfiguration(format!(
            "platform condition cannot test option `{}`",
            name
        ))
    })
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Always => write!(f, "always"),
            Predicate::Os(v) => write!(f, "os == {:?}", v),
            Predicate::Compiler(v) => write!(f, "compiler == {:?}", v),
            Predicate::Arch(v) => write!(f, "arch == {:?}", v),
            Predicate::BuildType(v) => write!(f, "build_type == {:?}", v),
            Predicate::Enabled(name) => write!(f, "options.{}", name),
            Predicate::OptionIs { name, value } => write!(f, "options.{} == {:?}", name, value.to_string()),
            Predicate::Not(inner) => match inner.as_ref() {
                Predicate::Os(v) => write!(f, "os != {:?}", v),
                Predicate::Compiler(v) => write!(f, "compiler != {:?}", v),
                Predicate::Arch(v) => write!(f, "arch != {:?}", v),
                Predicate::BuildType(v) => write!(f, "build_type != {:?}", v),
                Predicate::Enabled(name) => write!(f, "!options.{}", name),
                other => write!(f, "!({})", other),
            },
            Predicate::All(children) | Predicate::Any(children) if children.is_empty() => {
                let empty = if matches!(self, Predicate::All(_)) { "always" } else { "never" };
                write!(f, "{}", empty)
            }
            Predicate::All(children) | Predicate::Any(children) => {
                let sep = if matches!(self, Predicate::All(_)) { " && " } else { " || " };
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    if child.needs_parens() {
                        write!(f, "({})", child)?;
                    } else {
                        write!(f, "{}", child)?;
                    }
                }
                Ok(())
            }
        }
    }
}

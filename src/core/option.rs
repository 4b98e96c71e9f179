//! Build options.
//!
//! An `OptionSet` holds the options a recipe declares together with the
//! set of options removed for the platform being resolved. Resolving it
//! against user overrides produces an immutable `OptionValues` snapshot
//! that requirement rules read from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::platform::PlatformContext;
use crate::core::predicate::Predicate;
use crate::resolver::errors::ResolveError;

/// The value of a build option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl OptionValue {
    /// Whether the value counts as "on".
    ///
    /// Strings are on unless they spell a false-like word
    /// (`false`, `none`, `0`, `off`) or are empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Str(s) => {
                !matches!(s.to_ascii_lowercase().as_str(), "" | "false" | "none" | "0" | "off")
            }
        }
    }

    /// Equality that lets `"True"` match `true`.
    pub fn loosely_equals(&self, other: &OptionValue) -> bool {
        match (self, other) {
            (OptionValue::Bool(a), OptionValue::Bool(b)) => a == b,
            (OptionValue::Str(a), OptionValue::Str(b)) => a == b,
            (OptionValue::Bool(b), OptionValue::Str(s))
            | (OptionValue::Str(s), OptionValue::Bool(b)) => parse_bool(s) == Some(*b),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(true) => write!(f, "True"),
            OptionValue::Bool(false) => write!(f, "False"),
            OptionValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(b: bool) -> Self {
        OptionValue::Bool(b)
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Str(s.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(s: String) -> Self {
        OptionValue::Str(s)
    }
}

/// Parse the spellings of a boolean accepted on the command line.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// What values an option accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum OptionKind {
    Bool,
    Enum(Vec<String>),
}

/// A declared build option.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOption {
    name: String,
    kind: OptionKind,
    default: OptionValue,
    remove_when: Option<Predicate>,
}

impl BuildOption {
    /// Declare a boolean option.
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        BuildOption {
            name: name.into(),
            kind: OptionKind::Bool,
            default: OptionValue::Bool(default),
            remove_when: None,
        }
    }

    /// Declare an enumerated option. Fails if `default` is not one of `values`.
    pub fn choice<I, S>(
        name: impl Into<String>,
        values: I,
        default: impl Into<String>,
    ) -> Result<Self, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let default = default.into();

        if !values.contains(&default) {
            return Err(ResolveError::InvalidOptionValue {
                option: name,
                value: default,
                allowed: values,
            });
        }

        Ok(BuildOption {
            name,
            kind: OptionKind::Enum(values),
            default: OptionValue::Str(default),
            remove_when: None,
        })
    }

    /// Remove this option on platforms matching `condition`.
    pub fn remove_when(mut self, condition: Predicate) -> Self {
        self.remove_when = Some(condition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn default_value(&self) -> &OptionValue {
        &self.default
    }

    /// The platform condition under which this option is removed.
    pub fn removal(&self) -> Option<&Predicate> {
        self.remove_when.as_ref()
    }

    /// The values this option accepts, as displayed to users.
    pub fn allowed_values(&self) -> Vec<String> {
        match &self.kind {
            OptionKind::Bool => vec!["True".to_string(), "False".to_string()],
            OptionKind::Enum(values) => values.clone(),
        }
    }

    /// Check a user-supplied value and normalize it to this option's kind.
    pub fn validate(&self, value: &OptionValue) -> Result<OptionValue, ResolveError> {
        let normalized = match (&self.kind, value) {
            (OptionKind::Bool, OptionValue::Bool(b)) => Some(OptionValue::Bool(*b)),
            (OptionKind::Bool, OptionValue::Str(s)) => parse_bool(s).map(OptionValue::Bool),
            (OptionKind::Enum(values), OptionValue::Str(s)) => {
                values.contains(s).then(|| OptionValue::Str(s.clone()))
            }
            (OptionKind::Enum(values), OptionValue::Bool(_)) => {
                let spelled = value.to_string();
                values.contains(&spelled).then_some(OptionValue::Str(spelled))
            }
        };

        normalized.ok_or_else(|| ResolveError::InvalidOptionValue {
            option: self.name.clone(),
            value: value.to_string(),
            allowed: self.allowed_values(),
        })
    }
}

/// The options declared by a recipe, plus those removed for a platform.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    options: Vec<BuildOption>,
    removed: BTreeSet<String>,
}

impl OptionSet {
    /// Create an empty option set.
    pub fn new() -> Self {
        OptionSet::default()
    }

    /// Declare an option, replacing any earlier declaration of the same name.
    pub fn declare(&mut self, option: BuildOption) {
        match self.options.iter_mut().find(|o| o.name == option.name) {
            Some(existing) => *existing = option,
            None => self.options.push(option),
        }
    }

    /// Look up a declared option.
    pub fn get(&self, name: &str) -> Option<&BuildOption> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Check if an option was declared.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate declared options in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &BuildOption> {
        self.options.iter()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Mark an option inapplicable for the current platform.
    pub fn remove(&mut self, name: &str) -> Result<(), ResolveError> {
        if !self.contains(name) {
            return Err(ResolveError::UnknownOption {
                option: name.to_string(),
            });
        }
        self.removed.insert(name.to_string());
        Ok(())
    }

    /// Check if an option has been removed.
    pub fn is_removed(&self, name: &str) -> bool {
        self.removed.contains(name)
    }

    /// Names of removed options, sorted.
    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().map(String::as_str)
    }

    /// Apply every option's `remove_when` condition for `platform`.
    ///
    /// Returns a new set; the receiver, usually owned by a shared recipe,
    /// is left untouched.
    pub fn configure(&self, platform: &PlatformContext) -> Result<OptionSet, ResolveError> {
        let mut configured = self.clone();

        for option in &self.options {
            if let Some(ref condition) = option.remove_when {
                if condition.evaluate_platform(platform)? {
                    tracing::debug!("removing option `{}` on {}", option.name, platform.os);
                    configured.remove(&option.name)?;
                }
            }
        }

        Ok(configured)
    }

    /// Resolve option values from user overrides and declared defaults.
    pub fn resolve(
        &self,
        overrides: &BTreeMap<String, OptionValue>,
    ) -> Result<OptionValues, ResolveError> {
        for name in overrides.keys() {
            if !self.contains(name) {
                return Err(ResolveError::UnknownOption {
                    option: name.clone(),
                });
            }
            if self.is_removed(name) {
                return Err(ResolveError::RemovedOptionReferenced {
                    option: name.clone(),
                });
            }
        }

        let mut values = BTreeMap::new();
        for option in self.options.iter().filter(|o| !self.is_removed(&o.name)) {
            let value = match overrides.get(&option.name) {
                Some(user) => option.validate(user)?,
                None => option.default.clone(),
            };
            values.insert(option.name.clone(), value);
        }

        Ok(OptionValues {
            values,
            removed: self.removed.clone(),
        })
    }
}

/// Resolved option values for one pass.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OptionValues {
    values: BTreeMap<String, OptionValue>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    removed: BTreeSet<String>,
}

impl OptionValues {
    /// Read an option's value.
    ///
    /// Reading a removed option is an error, as is reading one that was
    /// never declared.
    pub fn get(&self, name: &str) -> Result<&OptionValue, ResolveError> {
        if self.removed.contains(name) {
            return Err(ResolveError::RemovedOptionReferenced {
                option: name.to_string(),
            });
        }
        self.values
            .get(name)
            .ok_or_else(|| ResolveError::UnknownOption {
                option: name.to_string(),
            })
    }

    /// Iterate resolved values, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names of options removed in this pass.
    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.removed.iter().map(String::as_str)
    }

    pub fn is_removed(&self, name: &str) -> bool {
        self.removed.contains(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Recipe (Berth.toml) parsing and validation.
//!
//! A recipe is the static description of one package: its options, the
//! rules that map options and platform settings to requirements, and how
//! to fetch and package its sources when it is vendored.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::dependency::RequirementSpec;
use crate::core::option::{BuildOption, OptionSet, OptionValue};
use crate::core::platform::{cppstd_year, PlatformContext};
use crate::core::predicate::Predicate;
use crate::resolver::errors::ResolveError;
use crate::resolver::rules::RequirementRule;

/// Recipe file name.
pub const RECIPE_FILE: &str = "Berth.toml";

/// What kind of artifact a package produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageType {
    #[default]
    Library,
    HeaderLibrary,
    Application,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageType::Library => write!(f, "library"),
            PackageType::HeaderLibrary => write!(f, "header-library"),
            PackageType::Application => write!(f, "application"),
        }
    }
}

/// The `[package]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PackageMetadata {
    pub name: String,

    /// Fixed version
    #[serde(default)]
    pub version: Option<String>,

    /// Version used when none is fixed or supplied
    #[serde(default)]
    pub default_version: Option<String>,

    /// Lowest C++ standard the package builds with
    #[serde(default)]
    pub min_cppstd: Option<u32>,

    #[serde(default)]
    pub package_type: PackageType,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub homepage: Option<String>,
}

/// The `[source]` table of a vendored package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    /// Archive URL; may contain `{name}` and `{version}`
    pub url: String,
}

/// A `[[package-files]]` rule: copy files matching `pattern` from `src`
/// (relative to the staged archive root) into `dst`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageFileRule {
    pub pattern: String,

    #[serde(default = "current_dir")]
    pub src: String,

    #[serde(default = "current_dir")]
    pub dst: String,

    /// Fail the install if nothing matches
    #[serde(default)]
    pub required: bool,
}

fn current_dir() -> String {
    ".".to_string()
}

impl PackageFileRule {
    pub fn new(pattern: impl Into<String>, src: impl Into<String>, dst: impl Into<String>) -> Self {
        PackageFileRule {
            pattern: pattern.into(),
            src: src.into(),
            dst: dst.into(),
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl fmt::Display for PackageFileRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} -> {}", self.src, self.pattern, self.dst)
    }
}

/// An `[options.<name>]` entry as written.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawOption {
    default: OptionValue,

    #[serde(default)]
    values: Option<Vec<String>>,

    #[serde(default)]
    remove_when: Option<Predicate>,
}

/// Recipe as deserialized from TOML.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawRecipe {
    package: PackageMetadata,

    #[serde(default)]
    options: BTreeMap<String, RawOption>,

    #[serde(default)]
    requires: Vec<RequirementSpec>,

    #[serde(default)]
    tool_requires: Vec<RequirementSpec>,

    #[serde(default)]
    source: Option<SourceSpec>,

    #[serde(default)]
    package_files: Vec<PackageFileRule>,

    #[serde(default)]
    package_info: BTreeMap<String, String>,
}

/// A loaded and validated recipe.
///
/// Immutable once built; resolution passes only read from it, so one
/// recipe can be shared across threads.
#[derive(Debug, Clone)]
pub struct Recipe {
    package: PackageMetadata,
    options: OptionSet,
    requires: Vec<RequirementRule>,
    tool_requires: Vec<RequirementRule>,
    source: Option<SourceSpec>,
    package_files: Vec<PackageFileRule>,
    package_info: BTreeMap<String, String>,
    recipe_dir: PathBuf,
}

impl Recipe {
    /// Create an empty recipe for a package.
    pub fn new(name: impl Into<String>) -> Self {
        Recipe {
            package: PackageMetadata {
                name: name.into(),
                ..Default::default()
            },
            options: OptionSet::new(),
            requires: Vec::new(),
            tool_requires: Vec::new(),
            source: None,
            package_files: Vec::new(),
            package_info: BTreeMap::new(),
            recipe_dir: PathBuf::from("."),
        }
    }

    /// Load a recipe from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recipe: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse recipe content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawRecipe = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let mut recipe = Self::from_raw(raw)?;
        recipe.recipe_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        tracing::debug!(
            "loaded recipe `{}`: {} options, {} requirement rules",
            recipe.name(),
            recipe.options.len(),
            recipe.requires.len()
        );

        Ok(recipe)
    }

    fn from_raw(raw: RawRecipe) -> Result<Self, ResolveError> {
        let mut options = OptionSet::new();
        for (name, raw_option) in raw.options {
            options.declare(build_option(name, raw_option)?);
        }

        let requires = raw
            .requires
            .iter()
            .map(RequirementSpec::to_rule)
            .collect::<Result<Vec<_>, _>>()?;

        let tool_requires = raw
            .tool_requires
            .iter()
            .map(RequirementSpec::to_rule)
            .collect::<Result<Vec<_>, _>>()?;

        let recipe = Recipe {
            package: raw.package,
            options,
            requires,
            tool_requires,
            source: raw.source,
            package_files: raw.package_files,
            package_info: raw.package_info,
            recipe_dir: PathBuf::from("."),
        };

        recipe.check()?;
        Ok(recipe)
    }

    /// Check the recipe's internal consistency.
    pub fn check(&self) -> Result<(), ResolveError> {
        if !package_name_pattern().is_match(&self.package.name) {
            return Err(ResolveError::InvalidConfiguration(format!(
                "`{}` is not a valid package name",
                self.package.name
            )));
        }

        for option in self.options.iter() {
            if !option_name_pattern().is_match(option.name()) {
                return Err(ResolveError::InvalidConfiguration(format!(
                    "`{}` is not a valid option name",
                    option.name()
                )));
            }

            if let Some(condition) = option.removal() {
                if let Some(name) = condition.referenced_options().first() {
                    return Err(ResolveError::InvalidConfiguration(format!(
                        "`remove-when` of option `{}` tests option `{}`; \
                         only platform settings may be tested there",
                        option.name(),
                        name
                    )));
                }
            }
        }

        for rule in self.requires.iter().chain(&self.tool_requires) {
            if let Some(condition) = rule.condition() {
                for name in condition.referenced_options() {
                    if !self.options.contains(name) {
                        return Err(ResolveError::UnknownOption {
                            option: name.to_string(),
                        });
                    }
                }
            }
        }

        if let Some(min) = self.package.min_cppstd {
            if cppstd_year(&min.to_string()).is_none() {
                return Err(ResolveError::InvalidConfiguration(format!(
                    "`min-cppstd = {}` is not a C++ standard",
                    min
                )));
            }
        }

        if let Some(ref source) = self.source {
            check_placeholders(&source.url)?;
            if let Some(version) = self.default_version() {
                self.render_source_url(source, version)?;
            }
        }

        Ok(())
    }

    /// Check the recipe can be built for `platform`.
    pub fn validate_platform(&self, platform: &PlatformContext) -> Result<(), ResolveError> {
        let (Some(min), Some(cppstd)) = (self.package.min_cppstd, platform.cppstd.as_deref()) else {
            return Ok(());
        };

        let required = cppstd_year(&min.to_string());
        let actual = cppstd_year(cppstd).ok_or_else(|| {
            ResolveError::InvalidConfiguration(format!("unrecognised C++ standard `{}`", cppstd))
        })?;

        match required {
            Some(required) if actual < required => {
                Err(ResolveError::InvalidConfiguration(format!(
                    "`{}` requires C++{} but the platform is configured for C++{}",
                    self.package.name, min, cppstd
                )))
            }
            _ => Ok(()),
        }
    }

    /// The version to use: an explicit request, then the recipe's fixed
    /// version, then its default version.
    pub fn effective_version<'a>(&'a self, requested: Option<&'a str>) -> Option<&'a str> {
        requested
            .or(self.package.version.as_deref())
            .or(self.package.default_version.as_deref())
    }

    fn default_version(&self) -> Option<&str> {
        self.effective_version(None)
    }

    /// Resolve the `[source]` URL for a version.
    pub fn source_url(&self, version: &str) -> Result<Url, ResolveError> {
        let source = self.source.as_ref().ok_or_else(|| {
            ResolveError::InvalidConfiguration(format!(
                "recipe `{}` has no [source] section",
                self.package.name
            ))
        })?;

        self.render_source_url(source, version)
    }

    fn render_source_url(&self, source: &SourceSpec, version: &str) -> Result<Url, ResolveError> {
        check_placeholders(&source.url)?;
        let rendered = source
            .url
            .replace("{name}", &self.package.name)
            .replace("{version}", version);

        Url::parse(&rendered).map_err(|e| {
            ResolveError::InvalidConfiguration(format!("invalid source url `{}`: {}", rendered, e))
        })
    }

    /// Add an option.
    pub fn with_option(mut self, option: BuildOption) -> Self {
        self.options.declare(option);
        self
    }

    /// Add a requirement rule.
    pub fn with_requirement(mut self, rule: RequirementRule) -> Self {
        self.requires.push(rule);
        self
    }

    /// Add a tool requirement rule.
    pub fn with_tool_requirement(mut self, rule: RequirementRule) -> Self {
        self.tool_requires.push(rule);
        self
    }

    /// Fix the package version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.package.version = Some(version.into());
        self
    }

    /// Set the lowest supported C++ standard.
    pub fn with_min_cppstd(mut self, min: u32) -> Self {
        self.package.min_cppstd = Some(min);
        self
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn package(&self) -> &PackageMetadata {
        &self.package
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn requires(&self) -> &[RequirementRule] {
        &self.requires
    }

    pub fn tool_requires(&self) -> &[RequirementRule] {
        &self.tool_requires
    }

    pub fn source(&self) -> Option<&SourceSpec> {
        self.source.as_ref()
    }

    pub fn package_files(&self) -> &[PackageFileRule] {
        &self.package_files
    }

    pub fn package_info(&self) -> &BTreeMap<String, String> {
        &self.package_info
    }

    /// Directory containing the recipe file.
    pub fn recipe_dir(&self) -> &Path {
        &self.recipe_dir
    }
}

fn build_option(name: String, raw: RawOption) -> Result<BuildOption, ResolveError> {
    let option = match (raw.values, raw.default) {
        (None, OptionValue::Bool(default)) => BuildOption::boolean(name, default),
        (None, OptionValue::Str(default)) => {
            return Err(ResolveError::InvalidConfiguration(format!(
                "option `{}` has default `{}` but no `values`; \
                 boolean options need a boolean default",
                name, default
            )))
        }
        (Some(values), default) => BuildOption::choice(name, values, default.to_string())?,
    };

    Ok(match raw.remove_when {
        Some(condition) => option.remove_when(condition),
        None => option,
    })
}

/// Reject `{...}` placeholders other than `{name}` and `{version}`.
fn check_placeholders(template: &str) -> Result<(), ResolveError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\{[^{}]*\}?").expect("valid pattern"));

    match pattern
        .find_iter(template)
        .map(|m| m.as_str())
        .find(|p| !matches!(*p, "{name}" | "{version}"))
    {
        Some(placeholder) => Err(ResolveError::InvalidConfiguration(format!(
            "unknown placeholder `{}` in source url",
            placeholder
        ))),
        None => Ok(()),
    }
}

fn package_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.+-]*$").expect("valid pattern"))
}

fn option_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid pattern"))
}

/// Find the recipe file, starting from the given directory.
pub fn find_recipe(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let candidate = current.join(RECIPE_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

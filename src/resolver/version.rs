//! Version constraint parsing.
//!
//! Recipes spell constraints the way C/C++ package recipes usually do:
//!
//! - an exact version: `3.5.0`, `1.4.3`
//! - a bracketed range: `[>=2.5 <3]`, `[~0.8]`, `[>=1.0 <2 || >=3]`
//! - the literal `system`, for packages provided by the host
//!
//! Ranges are translated into `semver::VersionReq`s. Comparators separated
//! by spaces are intersected; sets separated by `||` are unioned.

use std::fmt;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// A parsed version constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionConstraint {
    /// A single pinned version.
    Exact(String),
    /// A version range.
    Range(VersionRange),
    /// Provided by the system, no version selection.
    System,
}

/// A bracketed version range.
///
/// Equality is by canonical text so that two spellings of the same range
/// that differ only in whitespace compare equal.
#[derive(Debug, Clone)]
pub struct VersionRange {
    canonical: String,
    alternatives: Vec<VersionReq>,
    include_prerelease: bool,
}

impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for VersionRange {}

impl VersionRange {
    /// Parse the inside of a `[...]` range.
    pub fn parse(body: &str) -> Result<Self, String> {
        let mut parts = body.split(',');
        let expr = parts.next().unwrap_or_default().trim();

        let mut include_prerelease = false;
        for flag in parts {
            match flag.trim() {
                "include_prerelease" => include_prerelease = true,
                "" => {}
                other => return Err(format!("unknown range option `{}`", other)),
            }
        }

        if expr.is_empty() {
            return Err("empty version range".to_string());
        }

        let mut alternatives = Vec::new();
        let mut canonical_sets = Vec::new();

        for set in expr.split("||") {
            let comparators: Vec<&str> = set.split_whitespace().collect();
            if comparators.is_empty() {
                return Err("empty alternative in version range".to_string());
            }

            let translated: Vec<String> = comparators.iter().map(|c| translate_comparator(c)).collect();
            let req = VersionReq::parse(&translated.join(", "))
                .map_err(|e| format!("`{}`: {}", set.trim(), e))?;

            alternatives.push(req);
            canonical_sets.push(comparators.join(" "));
        }

        let mut canonical = canonical_sets.join(" || ");
        if include_prerelease {
            canonical.push_str(", include_prerelease");
        }

        Ok(VersionRange {
            canonical,
            alternatives,
            include_prerelease,
        })
    }

    /// Check whether a version falls inside the range.
    pub fn matches(&self, version: &Version) -> bool {
        if !version.pre.is_empty() && self.include_prerelease {
            // semver only admits pre-releases on an exactly matching
            // major.minor.patch; compare the release part instead.
            let release = Version::new(version.major, version.minor, version.patch);
            return self.alternatives.iter().any(|req| req.matches(&release));
        }
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The canonical range text, without brackets.
    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

/// Bare versions inside a range pin the components they spell out; semver
/// would otherwise read them as caret requirements.
fn translate_comparator(comp: &str) -> String {
    if comp.starts_with(|c: char| c.is_ascii_digit()) {
        format!("={}", comp)
    } else {
        comp.to_string()
    }
}

impl VersionConstraint {
    /// Parse a constraint string.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() {
            return Err("empty version constraint".to_string());
        }

        if s == "system" {
            return Ok(VersionConstraint::System);
        }

        if let Some(body) = s.strip_prefix('[') {
            let body = body
                .strip_suffix(']')
                .ok_or_else(|| "unterminated version range".to_string())?;
            return VersionRange::parse(body).map(VersionConstraint::Range);
        }

        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'))
        {
            return Err(format!("`{}` is not a version", s));
        }

        Ok(VersionConstraint::Exact(s.to_string()))
    }

    /// Check whether a concrete version satisfies this constraint.
    ///
    /// `system` accepts anything; an exact constraint compares leniently so
    /// that `2.2` and `2.2.0` are the same version.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::System => true,
            VersionConstraint::Range(range) => range.matches(version),
            VersionConstraint::Exact(exact) => match parse_version_lenient(exact) {
                Some(v) => &v == version,
                None => false,
            },
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Exact(v) => write!(f, "{}", v),
            VersionConstraint::Range(r) => write!(f, "[{}]", r.as_str()),
            VersionConstraint::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for VersionConstraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionConstraint::parse(s)
    }
}

impl TryFrom<String> for VersionConstraint {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        VersionConstraint::parse(&s)
    }
}

impl From<VersionConstraint> for String {
    fn from(c: VersionConstraint) -> Self {
        c.to_string()
    }
}

/// Parse a version string, allowing for incomplete versions.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    if let Ok(v) = s.parse() {
        return Some(v);
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}

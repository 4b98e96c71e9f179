//! Text and JSON rendering of operation results.

use std::fmt::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::dependency::DependencyDecl;
use crate::core::option::{OptionKind, OptionSet};
use crate::core::platform::PlatformContext;
use crate::ops::explain::{Explanation, Outcome, RuleTable};
use crate::ops::vendor::VendorResult;
use crate::resolver::Resolution;

/// Render any result as pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("failed to serialize output")
}

/// Describe a declaration's flags, e.g. `(private, forced)`.
fn flags(decl: &DependencyDecl) -> String {
    let mut flags = Vec::new();
    if !decl.transitive_headers() {
        flags.push("private");
    }
    if !decl.is_direct() {
        flags.push("override");
    } else if decl.force_override() {
        flags.push("forced");
    }

    if flags.is_empty() {
        String::new()
    } else {
        format!(" ({})", flags.join(", "))
    }
}

fn write_list<'a>(
    out: &mut String,
    title: &str,
    decls: impl IntoIterator<Item = &'a DependencyDecl>,
) {
    let decls: Vec<&DependencyDecl> = decls.into_iter().collect();
    let _ = writeln!(out, "{}:", title);
    if decls.is_empty() {
        let _ = writeln!(out, "└── (none)");
        return;
    }

    let last = decls.len() - 1;
    for (i, decl) in decls.into_iter().enumerate() {
        let branch = if i == last { "└── " } else { "├── " };
        let _ = writeln!(out, "{}{}{}", branch, decl, flags(decl));
    }
}

/// Render a resolution as a text tree.
pub fn format_resolution(resolution: &Resolution) -> String {
    let mut out = String::new();

    let _ = match resolution.version {
        Some(ref version) => writeln!(
            out,
            "{} {} ({})",
            resolution.package, version, resolution.platform
        ),
        None => writeln!(out, "{} ({})", resolution.package, resolution.platform),
    };

    let _ = writeln!(out, "options:");
    for (name, value) in resolution.options.iter() {
        let _ = writeln!(out, "  {} = {}", name, value);
    }
    for name in resolution.options.removed() {
        let _ = writeln!(out, "  {} (removed)", name);
    }

    write_list(&mut out, "requires", resolution.requires.direct());
    if resolution.requires.pins().next().is_some() {
        write_list(&mut out, "overrides", resolution.requires.pins());
    }
    write_list(&mut out, "tool_requires", &resolution.tool_requires);

    let _ = writeln!(out, "fingerprint: {}", &resolution.fingerprint[..16.min(resolution.fingerprint.len())]);
    out
}

/// Option listing entry, as rendered to JSON.
#[derive(Debug, Serialize)]
pub struct OptionEntry<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub kind: &'a OptionKind,
    pub default: String,
    pub removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_when: Option<String>,
}

/// Summarize the options of a configured option set.
pub fn option_entries(options: &OptionSet) -> Vec<OptionEntry<'_>> {
    options
        .iter()
        .map(|option| OptionEntry {
            name: option.name(),
            kind: option.kind(),
            default: option.default_value().to_string(),
            removed: options.is_removed(option.name()),
            remove_when: option.removal().map(ToString::to_string),
        })
        .collect()
}

/// Render the option listing.
pub fn format_options(options: &OptionSet, platform: &PlatformContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "options for {}:", platform);

    if options.is_empty() {
        let _ = writeln!(out, "  (none)");
        return out;
    }

    let width = options.iter().map(|o| o.name().len()).max().unwrap_or(0);
    for entry in option_entries(options) {
        let values = match entry.kind {
            OptionKind::Bool => "True|False".to_string(),
            OptionKind::Enum(values) => values.join("|"),
        };
        let _ = write!(
            out,
            "  {:width$}  {:<16} default {}",
            entry.name,
            values,
            entry.default,
            width = width
        );
        if entry.removed {
            let _ = write!(out, "  [removed]");
        } else if let Some(ref condition) = entry.remove_when {
            let _ = write!(out, "  [removed when {}]", condition);
        }
        let _ = writeln!(out);
    }

    out
}

fn format_outcome(out: &mut String, label: &str, outcome: &Outcome) {
    match outcome {
        Outcome::NotRequired => {}
        Outcome::Resolved { declaration } => {
            let _ = writeln!(out, "{}: {}{}", label, declaration, flags(declaration));
        }
        Outcome::Conflict { message } => {
            let _ = writeln!(out, "{}: conflict: {}", label, message);
        }
    }
}

/// Render an explanation.
pub fn format_explanation(explanation: &Explanation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} on {}", explanation.dependency, explanation.platform);

    if !explanation.is_known() {
        let _ = writeln!(out, "  no rule in this recipe declares `{}`", explanation.dependency);
        return out;
    }

    for rule in &explanation.rules {
        let table = match rule.table {
            RuleTable::Requires => "requires",
            RuleTable::ToolRequires => "tool-requires",
        };
        let mark = if rule.matched { "+" } else { "-" };
        let condition = rule.condition.as_deref().unwrap_or("always");
        let _ = writeln!(
            out,
            "  {} {}[{}] {}{} when {}",
            mark,
            table,
            rule.index,
            rule.declaration,
            flags(&rule.declaration),
            condition
        );
    }

    let requires = &explanation.requires;
    let tool_requires = &explanation.tool_requires;
    if matches!(requires, Outcome::NotRequired) && matches!(tool_requires, Outcome::NotRequired) {
        let _ = writeln!(out, "not required on this platform");
    }
    format_outcome(&mut out, "requires", requires);
    format_outcome(&mut out, "tool_requires", tool_requires);

    out
}

/// Render a vendoring result.
pub fn format_vendor(result: &VendorResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", result.package, result.version);
    let _ = writeln!(out, "  source: {}", result.url);
    let _ = writeln!(out, "  sha256: {}", result.sha256);
    let _ = writeln!(
        out,
        "  installed {} files into {}",
        result.installed.len(),
        result.installed.destination.display()
    );
    for file in &result.installed.files {
        let _ = writeln!(out, "    {}", file.display());
    }
    for (key, value) in &result.package_info {
        let _ = writeln!(out, "  {} = {}", key, value);
    }
    out
}

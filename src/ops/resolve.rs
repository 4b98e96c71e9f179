//! Resolution operations.
//!
//! Glue between user input (CLI flags, config files) and the pure
//! resolver: option overrides arrive as raw `name=value` strings and are
//! layered over configured defaults before a pass runs.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use rayon::prelude::*;

use crate::core::option::OptionValue;
use crate::core::platform::PlatformContext;
use crate::core::recipe::Recipe;
use crate::resolver::{self, Resolution, ResolveError};

/// Inputs for one resolution pass.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Platform to resolve for
    pub platform: PlatformContext,

    /// Overrides given on the command line
    pub overrides: BTreeMap<String, OptionValue>,

    /// Defaults from configuration files
    pub defaults: BTreeMap<String, OptionValue>,
}

impl ResolveOptions {
    pub fn new(platform: PlatformContext) -> Self {
        ResolveOptions {
            platform,
            overrides: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }

    /// Add a command-line override.
    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Use configured option defaults.
    pub fn with_defaults(mut self, defaults: BTreeMap<String, OptionValue>) -> Self {
        self.defaults = defaults;
        self
    }

    /// The same request for another platform.
    pub fn for_platform(&self, platform: PlatformContext) -> Self {
        ResolveOptions {
            platform,
            ..self.clone()
        }
    }
}

/// Parse a `name=value` option override.
pub fn parse_override(raw: &str) -> Result<(String, OptionValue)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("invalid option override `{}`, expected `name=value`", raw);
    };

    let name = name.trim();
    if name.is_empty() {
        bail!("invalid option override `{}`: missing option name", raw);
    }

    Ok((name.to_string(), OptionValue::from(value.trim())))
}

/// Parse a list of `name=value` overrides. Later entries win.
pub fn parse_overrides(raw: &[String]) -> Result<BTreeMap<String, OptionValue>> {
    raw.iter().map(|s| parse_override(s)).collect()
}

/// Layer command-line overrides over configured defaults.
///
/// A configured default is only a preference: one that names an option
/// this recipe does not declare, or one removed on this platform, is
/// dropped with a warning. Command-line overrides are passed through as
/// given, so the resolver reports any problem with them.
pub fn effective_overrides(
    recipe: &Recipe,
    opts: &ResolveOptions,
) -> Result<BTreeMap<String, OptionValue>, ResolveError> {
    let configured = recipe.options().configure(&opts.platform)?;

    let mut merged = BTreeMap::new();
    for (name, value) in &opts.defaults {
        if !configured.contains(name) {
            tracing::warn!("ignoring configured default for unknown option `{}`", name);
        } else if configured.is_removed(name) {
            tracing::warn!(
                "ignoring configured default for `{}`: removed on {}",
                name,
                opts.platform.os
            );
        } else {
            merged.insert(name.clone(), value.clone());
        }
    }

    merged.extend(opts.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(merged)
}

/// Resolve a recipe for one platform.
pub fn resolve_recipe(recipe: &Recipe, opts: &ResolveOptions) -> Result<Resolution, ResolveError> {
    tracing::info!("Resolving {} for {}", recipe.name(), opts.platform);

    let overrides = effective_overrides(recipe, opts)?;
    let resolution = resolver::resolve(recipe, &opts.platform, &overrides)?;

    tracing::info!(
        "Resolved {} requirements, {} tool requirements",
        resolution.requires.len(),
        resolution.tool_requires.len()
    );

    Ok(resolution)
}

/// Resolve a recipe for several platforms in parallel.
///
/// Results come back in the order of `platforms`; each pass succeeds or
/// fails on its own.
pub fn resolve_matrix(
    recipe: &Recipe,
    opts: &ResolveOptions,
    platforms: &[PlatformContext],
) -> Vec<Result<Resolution, ResolveError>> {
    platforms
        .par_iter()
        .map(|platform| resolve_recipe(recipe, &opts.for_platform(platform.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures;

    #[test]
    fn test_parse_override() {
        let (name, value) = parse_override("with_xml=False").unwrap();
        assert_eq!(name, "with_xml");
        assert_eq!(value, OptionValue::from("False"));

        let (_, value) = parse_override("backend = sdl").unwrap();
        assert_eq!(value, OptionValue::from("sdl"));

        assert!(parse_override("with_xml").is_err());
        assert!(parse_override("=True").is_err());
    }

    #[test]
    fn test_parse_overrides_last_wins() {
        let raw = vec!["with_xml=True".to_string(), "with_xml=False".to_string()];
        let overrides = parse_overrides(&raw).unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["with_xml"], OptionValue::from("False"));
    }

    #[test]
    fn test_xml_without_yaml_on_linux() {
        let recipe = fixtures::lxgui();
        let opts = ResolveOptions::new(PlatformContext::new("Linux"))
            .with_override("with_xml", "True")
            .with_override("with_yaml", "False");

        let resolution = resolve_recipe(&recipe, &opts).unwrap();
        assert!(resolution.requires.contains("pugixml"));
        assert!(!resolution.requires.contains("rapidyaml"));
    }

    #[test]
    fn test_cli_override_beats_config_default() {
        let recipe = fixtures::lxgui();
        let mut defaults = BTreeMap::new();
        defaults.insert("with_yaml".to_string(), OptionValue::Bool(false));
        defaults.insert("with_xml".to_string(), OptionValue::Bool(false));

        let opts = ResolveOptions::new(PlatformContext::new("Linux"))
            .with_defaults(defaults)
            .with_override("with_xml", "True");

        let resolution = resolve_recipe(&recipe, &opts).unwrap();
        assert!(resolution.requires.contains("pugixml"));
        assert!(!resolution.requires.contains("rapidyaml"));
    }

    #[test]
    fn test_inapplicable_config_defaults_are_dropped() {
        let recipe = fixtures::lxgui();
        let mut defaults = BTreeMap::new();
        defaults.insert("with_sfml".to_string(), OptionValue::Bool(true));
        defaults.insert("use_vulkan".to_string(), OptionValue::Bool(true));

        let opts = ResolveOptions::new(PlatformContext::new("Emscripten")).with_defaults(defaults);

        let resolution = resolve_recipe(&recipe, &opts).unwrap();
        assert!(resolution.options.is_removed("with_sfml"));
    }

    #[test]
    fn test_cli_override_of_removed_option_fails() {
        let recipe = fixtures::lxgui();
        let opts = ResolveOptions::new(PlatformContext::new("Emscripten"))
            .with_override("with_sfml", "True");

        let err = resolve_recipe(&recipe, &opts).unwrap_err();
        assert!(matches!(err, ResolveError::RemovedOptionReferenced { .. }));
    }

    #[test]
    fn test_matrix_keeps_platform_order() {
        let recipe = fixtures::lxgui();
        let opts = ResolveOptions::new(PlatformContext::new("Linux"));
        let platforms = vec![
            PlatformContext::new("Linux"),
            PlatformContext::new("Emscripten"),
            PlatformContext::new("Windows"),
        ];

        let results = resolve_matrix(&recipe, &opts, &platforms);
        assert_eq!(results.len(), 3);

        let oses: Vec<String> = results
            .iter()
            .map(|r| r.as_ref().unwrap().platform.os.clone())
            .collect();
        assert_eq!(oses, vec!["Linux", "Emscripten", "Windows"]);

        let web = results[1].as_ref().unwrap();
        assert!(!web.requires.contains("sfml"));
        assert!(!web.requires.contains("glew"));
        assert!(results[0].as_ref().unwrap().requires.contains("glew"));
    }

    #[test]
    fn test_matrix_matches_sequential() {
        let recipe = fixtures::lxgui();
        let opts = ResolveOptions::new(PlatformContext::new("Linux"));
        let platforms = vec![PlatformContext::new("Linux"), PlatformContext::new("Macos")];

        let parallel = resolve_matrix(&recipe, &opts, &platforms);
        for (platform, result) in platforms.iter().zip(parallel) {
            let sequential = resolve_recipe(&recipe, &opts.for_platform(platform.clone())).unwrap();
            assert_eq!(result.unwrap().fingerprint, sequential.fingerprint);
        }
    }
}

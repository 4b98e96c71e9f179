//! Command implementations

pub mod completions;
pub mod explain;
pub mod options;
pub mod resolve;
pub mod vendor;

use anyhow::Result;

use crate::cli::PlatformArgs;
use berth::core::platform::PlatformContext;
use berth::core::Recipe;
use berth::ops::resolve::{parse_overrides, ResolveOptions};
use berth::util::{Config, GlobalContext};

/// Load the recipe selected by `--recipe` or found from the working directory.
pub fn load_recipe(ctx: &GlobalContext) -> Result<Recipe> {
    let path = ctx.find_recipe()?;
    tracing::debug!("Using recipe {}", path.display());
    Recipe::load(&path)
}

/// The platform named by the flags, over the configured default.
pub fn platform(args: &PlatformArgs, config: &Config) -> PlatformContext {
    let mut config = config.clone();
    let settings = &mut config.platform;

    if args.os.is_some() {
        settings.os = args.os.clone();
    }
    if args.compiler.is_some() {
        settings.compiler = args.compiler.clone();
    }
    if args.arch.is_some() {
        settings.arch = args.arch.clone();
    }
    if args.build_type.is_some() {
        settings.build_type = args.build_type.clone();
    }
    if args.cppstd.is_some() {
        settings.cppstd = args.cppstd.clone();
    }

    config.platform()
}

/// Build resolution inputs from the flags and configuration.
pub fn resolve_options(
    args: &PlatformArgs,
    overrides: &[String],
    config: &Config,
) -> Result<ResolveOptions> {
    let mut opts =
        ResolveOptions::new(platform(args, config)).with_defaults(config.options.clone());
    opts.overrides = parse_overrides(overrides)?;
    Ok(opts)
}

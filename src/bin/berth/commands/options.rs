//! `berth options` command

use anyhow::Result;

use crate::cli::{OptionsArgs, OutputFormat};
use crate::commands::{load_recipe, platform};
use berth::ops::report::{format_options, option_entries, to_json};
use berth::util::GlobalContext;

pub fn execute(args: OptionsArgs, ctx: &GlobalContext) -> Result<()> {
    let recipe = load_recipe(ctx)?;
    let config = ctx.load_config();
    let platform = platform(&args.platform, &config);

    let configured = recipe.options().configure(&platform)?;

    match args.format {
        OutputFormat::Text => print!("{}", format_options(&configured, &platform)),
        OutputFormat::Json => println!("{}", to_json(&option_entries(&configured))?),
    }

    Ok(())
}

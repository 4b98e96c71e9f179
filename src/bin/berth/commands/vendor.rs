//! `berth vendor` command

use anyhow::Result;

use crate::cli::{OutputFormat, VendorArgs};
use crate::commands::load_recipe;
use berth::ops::report::{format_vendor, to_json};
use berth::ops::vendor::{vendor, VendorOptions};
use berth::sources::{GlobInstaller, HttpArchiveFetcher};
use berth::util::GlobalContext;

pub fn execute(args: VendorArgs, ctx: &GlobalContext) -> Result<()> {
    let recipe = load_recipe(ctx)?;
    let config = ctx.load_config();

    let fetcher = HttpArchiveFetcher::new(config.timeout())?
        .with_retries(config.retries())
        .offline(args.offline || config.net.offline)
        .with_progress(args.format == OutputFormat::Text && !ctx.is_verbose());
    let installer = GlobInstaller::new();

    let opts = VendorOptions {
        version: args.version,
        dest: ctx.cwd().join(&args.dest),
    };

    let result = vendor(&recipe, &opts, &fetcher, &installer)?;

    match args.format {
        OutputFormat::Text => print!("{}", format_vendor(&result)),
        OutputFormat::Json => println!("{}", to_json(&result)?),
    }

    Ok(())
}

//! `berth resolve` command

use anyhow::{bail, Result};

use crate::cli::{OutputFormat, ResolveArgs};
use crate::commands::{load_recipe, platform, resolve_options};
use berth::ops::report::{format_resolution, to_json};
use berth::ops::resolve::{resolve_matrix, resolve_recipe};
use berth::util::GlobalContext;

pub fn execute(args: ResolveArgs, ctx: &GlobalContext) -> Result<()> {
    let recipe = load_recipe(ctx)?;
    let config = ctx.load_config();
    let opts = resolve_options(&args.platform, &args.options, &config)?;

    if args.platforms.is_empty() {
        let resolution = resolve_recipe(&recipe, &opts)?;
        match args.format {
            OutputFormat::Text => print!("{}", format_resolution(&resolution)),
            OutputFormat::Json => println!("{}", to_json(&resolution)?),
        }
        return Ok(());
    }

    let platforms: Vec<_> = args
        .platforms
        .iter()
        .map(|os| {
            let mut selected = args.platform.clone();
            selected.os = Some(os.clone());
            platform(&selected, &config)
        })
        .collect();

    let results = resolve_matrix(&recipe, &opts, &platforms);

    let mut resolutions = Vec::new();
    let mut failed = 0;
    for (platform, result) in platforms.iter().zip(results) {
        match result {
            Ok(resolution) => resolutions.push(resolution),
            Err(e) => {
                failed += 1;
                eprint!("{}: {}", platform.os, e.to_diagnostic().format(ctx.color()));
            }
        }
    }

    match args.format {
        OutputFormat::Text => {
            for (i, resolution) in resolutions.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print!("{}", format_resolution(resolution));
            }
        }
        OutputFormat::Json => println!("{}", to_json(&resolutions)?),
    }

    if failed > 0 {
        bail!("{} of {} platforms failed to resolve", failed, platforms.len());
    }

    Ok(())
}

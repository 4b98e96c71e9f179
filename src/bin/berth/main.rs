//! Berth CLI - A recipe-driven dependency configuration resolver for C and C++

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use berth::resolver::ResolveError;
use berth::sources::FetchError;
use berth::util::diagnostic::emit;
use berth::util::GlobalContext;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

/// Print an error, using the rich diagnostic when the error is a typed
/// library error with no added context.
fn report(err: &anyhow::Error, color: bool) {
    if let Some(e) = err.downcast_ref::<ResolveError>() {
        emit(&e.to_diagnostic(), color);
    } else if let Some(e) = err.downcast_ref::<FetchError>() {
        emit(&e.to_diagnostic(), color);
    } else {
        eprintln!("error: {:#}", err);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("berth=debug")
    } else {
        EnvFilter::new("berth=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!cli.no_color);
    if let Some(recipe) = cli.recipe {
        ctx.set_recipe_path(recipe);
    }

    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &ctx),
        Commands::Options(args) => commands::options::execute(args, &ctx),
        Commands::Explain(args) => commands::explain::execute(args, &ctx),
        Commands::Vendor(args) => commands::vendor::execute(args, &ctx),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

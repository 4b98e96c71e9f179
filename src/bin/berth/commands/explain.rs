//! `berth explain` command

use anyhow::Result;

use crate::cli::{ExplainArgs, OutputFormat};
use crate::commands::{load_recipe, resolve_options};
use berth::ops::explain::explain;
use berth::ops::report::{format_explanation, to_json};
use berth::util::diagnostic::{emit, suggestions, Diagnostic};
use berth::util::GlobalContext;

pub fn execute(args: ExplainArgs, ctx: &GlobalContext) -> Result<()> {
    let recipe = load_recipe(ctx)?;
    let config = ctx.load_config();
    let opts = resolve_options(&args.platform, &args.options, &config)?;

    let explanation = explain(&recipe, &opts, &args.dependency)?;

    if !explanation.is_known() {
        let warning = Diagnostic::warning(format!(
            "`{}` is not declared by any rule in `{}`",
            args.dependency,
            recipe.name()
        ))
        .with_suggestion(suggestions::DEPENDENCY_NOT_FOUND);
        emit(&warning, ctx.color());
    }

    match args.format {
        OutputFormat::Text => print!("{}", format_explanation(&explanation)),
        OutputFormat::Json => println!("{}", to_json(&explanation)?),
    }

    Ok(())
}

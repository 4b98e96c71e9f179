//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

/// Berth - A recipe-driven dependency configuration resolver for C and C++
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the recipe (defaults to the nearest Berth.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub recipe: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the recipe's requirements for a platform
    Resolve(ResolveArgs),

    /// List the recipe's options
    Options(OptionsArgs),

    /// Explain which rules declare a dependency
    Explain(ExplainArgs),

    /// Fetch the recipe's source and install its package files
    Vendor(VendorArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output format for commands that print results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Platform selection shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct PlatformArgs {
    /// Target operating system (e.g. Linux, Windows, Emscripten)
    #[arg(long)]
    pub os: Option<String>,

    /// Compiler name
    #[arg(long)]
    pub compiler: Option<String>,

    /// Target architecture
    #[arg(long)]
    pub arch: Option<String>,

    /// Build type (e.g. Release, Debug)
    #[arg(long)]
    pub build_type: Option<String>,

    /// C++ standard (e.g. 17, gnu20)
    #[arg(long)]
    pub cppstd: Option<String>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Set an option: `-o name=value`
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    pub options: Vec<String>,

    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Resolve for each of these operating systems in turn
    #[arg(long = "platform", value_name = "OS", conflicts_with = "os")]
    pub platforms: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct OptionsArgs {
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct ExplainArgs {
    /// Dependency name
    pub dependency: String,

    /// Set an option: `-o name=value`
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    pub options: Vec<String>,

    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct VendorArgs {
    /// Version to fetch (defaults to the recipe's version)
    #[arg(long)]
    pub version: Option<String>,

    /// Directory to install into
    #[arg(long, default_value = "vendor")]
    pub dest: PathBuf,

    /// Fail instead of downloading
    #[arg(long)]
    pub offline: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

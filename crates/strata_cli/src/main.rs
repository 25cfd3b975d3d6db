//! Strata CLI — the command-line interface for the Strata build
//! orchestrator.
//!
//! Provides `strata build` for incremental, dependency-ordered builds of a
//! project and everything it references, and `strata clean` for removing
//! their outputs.

#![warn(missing_docs)]

mod build;
mod clean;
mod pipeline;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Strata — an incremental multi-project build orchestrator.
#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Strata build orchestrator")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print status lines for up-to-date projects and per-project timings.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build projects and everything they reference, in dependency order.
    Build(BuildArgs),
    /// Remove the outputs of projects and everything they reference.
    Clean(CleanArgs),
}

/// Arguments for the `strata build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Project directories or configuration files. Defaults to the
    /// nearest project above the current directory.
    pub projects: Vec<String>,

    /// Rebuild every project regardless of up-to-date status.
    #[arg(short, long)]
    pub force: bool,

    /// Report what would be built without writing anything.
    #[arg(long)]
    pub dry: bool,

    /// Build on a single thread, in build order.
    #[arg(long)]
    pub single_threaded: bool,
}

/// Arguments for the `strata clean` subcommand.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Project directories or configuration files. Defaults to the
    /// nearest project above the current directory.
    pub projects: Vec<String>,

    /// Report what would be removed without deleting anything.
    #[arg(long)]
    pub dry: bool,

    /// Clean on a single thread, in build order.
    #[arg(long)]
    pub single_threaded: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var("TERM").is_ok(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

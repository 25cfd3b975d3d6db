//! `strata build` — incremental, dependency-ordered builds.

use strata_graph::{BuildOptions, Orchestrator};
use strata_host::FsHost;

use crate::pipeline::{print_summary, resolve_roots, stderr_writer};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `strata build` command.
///
/// Resolves the root projects, constructs the dependency graph, builds
/// whatever is out of date, and prints a closing summary. Returns the
/// aggregate exit code (0 on success).
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let roots = resolve_roots(&args.projects)?;
    let cwd = std::env::current_dir()?;

    let host = FsHost::new(cwd);
    let options = BuildOptions {
        force: args.force,
        dry: args.dry,
        single_threaded: args.single_threaded,
        verbose: global.verbose,
        color: global.color,
    };

    let writer = stderr_writer();
    let summary = Orchestrator::new(&host, options).build(&roots, &writer);

    print_summary(&summary, global);
    Ok(summary.status.code())
}

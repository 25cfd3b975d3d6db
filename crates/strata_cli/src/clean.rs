//! `strata clean` — removal of project outputs.

use strata_graph::{BuildOptions, Orchestrator};
use strata_host::FsHost;

use crate::pipeline::{print_summary, resolve_roots, stderr_writer};
use crate::{CleanArgs, GlobalArgs};

/// Runs the `strata clean` command.
///
/// Uses the same dependency graph as a build, so a cycle aborts the clean
/// pass the same way it aborts a build. Returns the aggregate exit code.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let roots = resolve_roots(&args.projects)?;
    let cwd = std::env::current_dir()?;

    let host = FsHost::new(cwd);
    let options = BuildOptions {
        dry: args.dry,
        single_threaded: args.single_threaded,
        verbose: global.verbose,
        color: global.color,
        ..BuildOptions::default()
    };

    let writer = stderr_writer();
    let summary = Orchestrator::new(&host, options).clean(&roots, &writer);

    print_summary(&summary, global);
    Ok(summary.status.code())
}

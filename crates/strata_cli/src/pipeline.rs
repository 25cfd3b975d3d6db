//! Shared helpers for CLI commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use strata_config::CONFIG_FILE_NAME;
use strata_graph::BuildSummary;

use crate::GlobalArgs;

/// Walks up from `start` looking for the nearest directory containing a
/// `strata.toml`.
///
/// Returns the directory containing the configuration, or an error if none
/// is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the root project list for a command: explicit arguments, or
/// the nearest project above the current directory.
pub fn resolve_roots(projects: &[String]) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if projects.is_empty() {
        let root = find_project_root(&std::env::current_dir()?)?;
        Ok(vec![root.to_string_lossy().into_owned()])
    } else {
        Ok(projects.to_vec())
    }
}

/// The shared writer all task output is flushed to, in build order.
pub fn stderr_writer() -> Mutex<Box<dyn Write + Send>> {
    Mutex::new(Box::new(std::io::stderr()))
}

/// Prints the run's closing summary line (and per-project timings when
/// verbose).
pub fn print_summary(summary: &BuildSummary, global: &GlobalArgs) {
    if global.quiet {
        return;
    }

    let stats = &summary.statistics;
    eprintln!(
        "   {} built, {} refreshed, {} up to date, {} cleaned ({} files)",
        stats.built, stats.pseudo_builds, stats.up_to_date, stats.cleaned, stats.files_built
    );

    if global.verbose {
        for (project, elapsed) in &stats.timings {
            eprintln!("   {:>8.1?}  {project}", elapsed);
        }
    }
}

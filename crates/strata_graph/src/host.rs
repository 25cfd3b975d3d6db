//! The external collaborator surface consumed by the scheduler.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use strata_common::CanonicalPath;
use strata_config::{ConfigError, ResolvedProject};
use strata_diagnostics::Diagnostic;
use strata_snapshot::{BuildInfo, Snapshot};

use crate::task::TaskStatus;

/// Result of one project compilation by the compiler collaborator.
///
/// The scheduler only inspects the status, the diagnostics, and whether a
/// snapshot was produced; it never looks inside the compilation itself.
#[derive(Debug)]
pub struct CompileOutcome {
    /// The task status the compilation ended in.
    pub status: TaskStatus,
    /// Diagnostics produced by the compilation.
    pub diagnostics: Vec<Diagnostic>,
    /// The new incremental snapshot, if one was produced.
    pub snapshot: Option<Snapshot>,
    /// Number of files compiled or emitted.
    pub files_built: usize,
}

/// Result of cleaning one project's outputs.
#[derive(Debug, Default)]
pub struct CleanOutcome {
    /// Output files deleted (or, on a dry run, that would be deleted).
    pub removed: Vec<PathBuf>,
    /// Diagnostics produced while cleaning.
    pub diagnostics: Vec<Diagnostic>,
}

/// The narrow interface through which the scheduler reaches its external
/// collaborators: configuration loading, path normalization, the compiler,
/// and persisted build info.
///
/// Implementations must be safe to call from concurrent build workers.
/// File I/O and compilation block inside the host and are opaque to the
/// scheduler.
pub trait BuildHost: Sync {
    /// Canonicalizes a user-supplied configuration name or path.
    fn canonical_path(&self, name: &str) -> CanonicalPath;

    /// Resolves the project configuration at `path`, including its
    /// reference list. Called through a single-flight cache, so a
    /// configuration is parsed at most once per run.
    fn resolve_project_config(&self, path: &CanonicalPath)
        -> Result<Arc<ResolvedProject>, ConfigError>;

    /// Canonical paths of the project's source files, for up-to-date
    /// timestamp checks.
    fn source_paths(&self, project: &ResolvedProject) -> Vec<CanonicalPath>;

    /// Modification time of `path`, or `None` if it cannot be determined.
    fn mtime(&self, path: &CanonicalPath) -> Option<SystemTime>;

    /// Reads the persisted build info of a project, if a compatible one
    /// exists.
    fn read_build_info(&self, project: &ResolvedProject) -> Option<BuildInfo>;

    /// Compiles a project against its previous snapshot, emitting whatever
    /// is owed and persisting new build info.
    fn compile(&self, project: &ResolvedProject, previous: Option<&Snapshot>) -> CompileOutcome;

    /// Performs a timestamp-only touch of the project's outputs (a pseudo
    /// build). Returns the number of files touched.
    fn touch_outputs(&self, project: &ResolvedProject) -> usize;

    /// Removes the project's outputs and build info. On a dry run the
    /// outcome lists what would be removed without touching disk.
    fn clean_outputs(&self, project: &ResolvedProject, dry_run: bool) -> CleanOutcome;
}

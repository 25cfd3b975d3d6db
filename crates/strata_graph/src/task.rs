//! Build tasks: the unit of scheduling.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use strata_common::{CanonicalPath, Latch};
use strata_config::ResolvedProject;
use strata_diagnostics::Diagnostic;

/// The state a task's build step ended in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// Prior outputs were still valid; nothing was done.
    UpToDate,
    /// A full build ran.
    Built,
    /// Only output timestamps were refreshed (a pseudo build).
    PseudoBuilt,
    /// The clean pass removed (or would remove) this project's outputs.
    Cleaned,
    /// The build ran and produced errors.
    CompileFailed,
    /// The project configuration could not be resolved.
    ConfigError,
}

/// The completed result of one task, merged into the run-wide summary at
/// report time.
#[derive(Clone, Debug)]
pub struct TaskReport {
    /// Canonical path of the project's configuration.
    pub project: CanonicalPath,
    /// The status the build step ended in.
    pub status: TaskStatus,
    /// Diagnostics accumulated by this task.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of files compiled or emitted.
    pub files_built: usize,
    /// Whether this task's build changed declaration outputs in a way
    /// downstream projects can observe. Conservatively `true` for any
    /// real build of a non-composite project.
    pub declarations_changed: bool,
    /// Wall-clock duration of the build step.
    pub elapsed: Duration,
    /// Pre-rendered status and diagnostic text, flushed to the shared
    /// writer in build order.
    pub output: String,
}

impl TaskReport {
    /// Whether this task actually did build work (full or pseudo).
    pub fn did_build(&self) -> bool {
        matches!(
            self.status,
            TaskStatus::Built | TaskStatus::PseudoBuilt | TaskStatus::CompileFailed
        )
    }
}

/// One node in the dependency graph.
///
/// Created exactly once per canonical configuration path during graph
/// construction. The `done` latch is closed exactly once, by the worker
/// owning the task, and only after every upstream task's latch has been
/// observed closed. The `reported` latch serializes output: a task flushes
/// its text only after the task at `prev_reporter` has flushed its own.
pub struct BuildTask {
    /// Canonical path of the project configuration.
    pub path: CanonicalPath,
    /// The resolved configuration, or `None` if resolution failed. A task
    /// without a configuration still participates in ordering and fails
    /// fast at build time.
    pub config: Option<Arc<ResolvedProject>>,
    /// Why configuration resolution failed, when it did.
    pub config_error: Option<String>,
    /// Upstream tasks this one waits on, in reference declaration order.
    pub upstream: Vec<Arc<BuildTask>>,
    /// This task's position in the build order.
    pub order_index: usize,
    /// Index of the task that must report immediately before this one;
    /// `None` only for the first task in the order.
    pub prev_reporter: Option<usize>,
    done: Latch,
    reported: Latch,
    report: OnceCell<TaskReport>,
}

impl BuildTask {
    /// Creates a linked task at the given position in the build order.
    pub fn new(
        path: CanonicalPath,
        config: Option<Arc<ResolvedProject>>,
        upstream: Vec<Arc<BuildTask>>,
        order_index: usize,
        prev_reporter: Option<usize>,
    ) -> Self {
        Self {
            path,
            config,
            config_error: None,
            upstream,
            order_index,
            prev_reporter,
            done: Latch::new(),
            reported: Latch::new(),
            report: OnceCell::new(),
        }
    }

    /// Blocks until every upstream task has completed, in upstream-list
    /// order.
    pub fn wait_for_upstream(&self) {
        for upstream in &self.upstream {
            upstream.done.wait();
        }
    }

    /// Records the completed report and closes the `done` latch,
    /// unblocking downstream tasks.
    ///
    /// Output has NOT been flushed yet at this point; downstream builds
    /// may start before this task's diagnostics are printed.
    pub fn record_and_unblock(&self, report: TaskReport) {
        self.report
            .set(report)
            .unwrap_or_else(|_| panic!("task report recorded twice"));
        self.done.close();
    }

    /// Blocks until this task's build step has completed.
    pub fn wait_done(&self) {
        self.done.wait();
    }

    /// The completed report, if the build step has finished.
    pub fn report(&self) -> Option<&TaskReport> {
        self.report.get()
    }

    /// Blocks until this task has flushed its output.
    pub fn wait_reported(&self) {
        self.reported.wait();
    }

    /// Marks this task's output as flushed, unblocking the next reporter.
    pub fn mark_reported(&self) {
        self.reported.close();
    }
}

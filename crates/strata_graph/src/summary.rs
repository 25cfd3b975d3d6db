//! Run-wide result aggregation.

use std::time::Duration;
use strata_common::CanonicalPath;
use strata_diagnostics::Diagnostic;

use crate::task::{TaskReport, TaskStatus};

/// The aggregate status of an orchestrator run, ordered from best to
/// worst. The run's status is the maximum over all task statuses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExitStatus {
    /// Every task succeeded.
    Success,
    /// At least one task produced error diagnostics.
    DiagnosticsPresent,
    /// At least one project configuration could not be resolved.
    InvalidProject,
    /// The reference graph contains a cycle; outputs were skipped.
    ReferenceCycle,
}

impl ExitStatus {
    /// The process exit code for this status.
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::DiagnosticsPresent => 1,
            ExitStatus::InvalidProject => 2,
            ExitStatus::ReferenceCycle => 3,
        }
    }
}

/// Aggregate statistics over one orchestrator run.
#[derive(Clone, Debug, Default)]
pub struct BuildStatistics {
    /// Total number of tasks in the build order.
    pub projects: usize,
    /// Projects that ran a full build.
    pub built: usize,
    /// Projects refreshed with a timestamp-only touch.
    pub pseudo_builds: usize,
    /// Projects skipped because their outputs were still valid.
    pub up_to_date: usize,
    /// Projects cleaned.
    pub cleaned: usize,
    /// Total files compiled or emitted.
    pub files_built: usize,
    /// Wall-clock build duration per project, in build order.
    pub timings: Vec<(CanonicalPath, Duration)>,
}

/// The merged result of an orchestrator run.
#[derive(Debug)]
pub struct BuildSummary {
    /// Aggregate status (maximum severity over all tasks).
    pub status: ExitStatus,
    /// Every diagnostic, in build order.
    pub diagnostics: Vec<Diagnostic>,
    /// Aggregate statistics.
    pub statistics: BuildStatistics,
}

impl BuildSummary {
    /// A summary for a run aborted by graph errors, before any task ran.
    pub fn cycle(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            status: ExitStatus::ReferenceCycle,
            diagnostics,
            statistics: BuildStatistics::default(),
        }
    }
}

fn task_exit_status(report: &TaskReport) -> ExitStatus {
    match report.status {
        TaskStatus::ConfigError => ExitStatus::InvalidProject,
        TaskStatus::CompileFailed => ExitStatus::DiagnosticsPresent,
        _ => ExitStatus::Success,
    }
}

/// Folds task reports (already in build order) into the run summary.
///
/// This is a pure reduction; it runs after every task has reported, so no
/// synchronization is involved.
pub fn reduce(reports: Vec<TaskReport>) -> BuildSummary {
    let mut status = ExitStatus::Success;
    let mut diagnostics = Vec::new();
    let mut statistics = BuildStatistics {
        projects: reports.len(),
        ..BuildStatistics::default()
    };

    for report in reports {
        status = status.max(task_exit_status(&report));
        match report.status {
            TaskStatus::Built | TaskStatus::CompileFailed => statistics.built += 1,
            TaskStatus::PseudoBuilt => statistics.pseudo_builds += 1,
            TaskStatus::UpToDate => statistics.up_to_date += 1,
            TaskStatus::Cleaned => statistics.cleaned += 1,
            TaskStatus::ConfigError => {}
        }
        statistics.files_built += report.files_built;
        statistics.timings.push((report.project, report.elapsed));
        diagnostics.extend(report.diagnostics);
    }

    BuildSummary {
        status,
        diagnostics,
        statistics,
    }
}

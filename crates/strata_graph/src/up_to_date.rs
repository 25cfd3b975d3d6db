//! Pre-build up-to-date checking.

use strata_config::ResolvedProject;

use crate::host::BuildHost;
use crate::task::{BuildTask, TaskStatus};

/// Outcome of checking a project's prior outputs before building.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpToDateStatus {
    /// Prior outputs are valid; the build step can be skipped entirely.
    UpToDate,
    /// Inputs are unchanged but an upstream project rebuilt without
    /// changing its declaration outputs; a timestamp-only touch of this
    /// project's outputs suffices (a pseudo build).
    UpstreamTouchOnly,
    /// A full build is required, with the first reason found.
    OutOfDate(String),
}

/// Decides whether `project` needs building, by consulting its persisted
/// build info, input timestamps, and the already-completed reports of its
/// upstream tasks.
///
/// Upstream reports are always available here: a task's build step only
/// starts after every upstream completion latch has closed.
pub fn check(host: &dyn BuildHost, project: &ResolvedProject, task: &BuildTask) -> UpToDateStatus {
    let Some(info) = host.read_build_info(project) else {
        return UpToDateStatus::OutOfDate("build info is missing".to_string());
    };

    if info.snapshot.options != project.options {
        return UpToDateStatus::OutOfDate("compiler options changed".to_string());
    }

    if !info.snapshot.pending_emit.is_empty() || info.snapshot.buildinfo_rewrite_pending {
        return UpToDateStatus::OutOfDate("emission pending from an earlier build".to_string());
    }

    let build_info_path =
        host.canonical_path(project.build_info_path().to_string_lossy().as_ref());
    let Some(build_time) = host.mtime(&build_info_path) else {
        return UpToDateStatus::OutOfDate("build info is unreadable".to_string());
    };

    for source in host.source_paths(project) {
        match host.mtime(&source) {
            None => {
                return UpToDateStatus::OutOfDate(format!("source {source} is unreadable"));
            }
            Some(changed) if changed > build_time => {
                return UpToDateStatus::OutOfDate(format!(
                    "source {source} is newer than the last build"
                ));
            }
            Some(_) => {}
        }
    }

    let mut upstream_touched = false;
    for upstream in &task.upstream {
        let Some(report) = upstream.report() else { continue };
        match report.status {
            TaskStatus::UpToDate | TaskStatus::Cleaned => {}
            TaskStatus::PseudoBuilt => upstream_touched = true,
            TaskStatus::Built => {
                if report.declarations_changed {
                    return UpToDateStatus::OutOfDate(format!(
                        "upstream project {} was rebuilt",
                        report.project
                    ));
                }
                upstream_touched = true;
            }
            TaskStatus::CompileFailed | TaskStatus::ConfigError => {
                return UpToDateStatus::OutOfDate(format!(
                    "upstream project {} has errors",
                    report.project
                ));
            }
        }
    }

    if upstream_touched {
        UpToDateStatus::UpstreamTouchOnly
    } else {
        UpToDateStatus::UpToDate
    }
}

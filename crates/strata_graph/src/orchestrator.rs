//! The orchestrator facade driving build and clean passes.

use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;
use strata_diagnostics::{codes, Diagnostic, TextRenderer};

use crate::builder::DependencyGraphBuilder;
use crate::host::BuildHost;
use crate::scheduler;
use crate::summary::{self, BuildSummary};
use crate::task::{BuildTask, TaskReport, TaskStatus};
use crate::up_to_date::{self, UpToDateStatus};

/// Global options for one orchestrator run.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    /// Rebuild every project regardless of up-to-date status.
    pub force: bool,
    /// Report what would be done without writing anything.
    pub dry: bool,
    /// Run everything on the calling thread, in build order.
    pub single_threaded: bool,
    /// Print status lines for skipped (up-to-date) projects too.
    pub verbose: bool,
    /// Use ANSI colors when rendering diagnostics.
    pub color: bool,
}

/// Owns the global build options and drives a build or clean pass over a
/// set of root configurations, aggregating per-task results into one
/// overall summary.
pub struct Orchestrator<'h> {
    host: &'h dyn BuildHost,
    options: BuildOptions,
}

impl<'h> Orchestrator<'h> {
    /// Creates an orchestrator over the given host.
    pub fn new(host: &'h dyn BuildHost, options: BuildOptions) -> Self {
        Self { host, options }
    }

    /// Builds every project reachable from `roots`, in dependency order.
    ///
    /// If the reference graph has a cycle, no project is built: all cycle
    /// diagnostics are reported and the run ends with
    /// [`ExitStatus::ReferenceCycle`](crate::ExitStatus::ReferenceCycle).
    pub fn build(
        &self,
        roots: &[String],
        writer: &Mutex<Box<dyn Write + Send>>,
    ) -> BuildSummary {
        self.run(roots, writer, &|task| self.build_task(task))
    }

    /// Removes the outputs of every project reachable from `roots`.
    ///
    /// Cycle handling matches [`build`](Self::build): nothing is cleaned
    /// when the graph is invalid.
    pub fn clean(
        &self,
        roots: &[String],
        writer: &Mutex<Box<dyn Write + Send>>,
    ) -> BuildSummary {
        self.run(roots, writer, &|task| self.clean_task(task))
    }

    fn run(
        &self,
        roots: &[String],
        writer: &Mutex<Box<dyn Write + Send>>,
        driver: &(dyn Fn(&BuildTask) -> TaskReport + Sync),
    ) -> BuildSummary {
        let graph = DependencyGraphBuilder::new(self.host, self.options.single_threaded)
            .build_graph(roots);

        if !graph.cycle_diagnostics.is_empty() {
            let renderer = TextRenderer::new(self.options.color);
            let mut sink = writer.lock().unwrap();
            for diagnostic in &graph.cycle_diagnostics {
                let _ = sink.write_all(renderer.render(diagnostic).as_bytes());
            }
            return BuildSummary::cycle(graph.cycle_diagnostics);
        }

        let reports = scheduler::execute(
            &graph.order,
            self.options.single_threaded,
            writer,
            driver,
        );
        summary::reduce(reports)
    }

    /// The build step for one task: up-to-date fast path, pseudo-build
    /// touch, or a compiler invocation.
    fn build_task(&self, task: &BuildTask) -> TaskReport {
        let start = Instant::now();
        let renderer = TextRenderer::new(self.options.color);

        let Some(project) = task.config.as_deref() else {
            return self.config_error_report(task, start);
        };

        let check = if self.options.force {
            UpToDateStatus::OutOfDate("rebuild was forced".to_string())
        } else {
            up_to_date::check(self.host, project, task)
        };

        let mut output = String::new();
        match check {
            UpToDateStatus::UpToDate => {
                if self.options.verbose {
                    output.push_str(&format!("  Up to date {}\n", project.name));
                }
                TaskReport {
                    project: task.path.clone(),
                    status: TaskStatus::UpToDate,
                    diagnostics: Vec::new(),
                    files_built: 0,
                    declarations_changed: false,
                    elapsed: start.elapsed(),
                    output,
                }
            }
            UpToDateStatus::UpstreamTouchOnly => {
                let touched = if self.options.dry {
                    0
                } else {
                    self.host.touch_outputs(project)
                };
                output.push_str(&format!(
                    "  Touching {} ({touched} outputs refreshed)\n",
                    project.name
                ));
                TaskReport {
                    project: task.path.clone(),
                    status: TaskStatus::PseudoBuilt,
                    diagnostics: Vec::new(),
                    files_built: 0,
                    declarations_changed: false,
                    elapsed: start.elapsed(),
                    output,
                }
            }
            UpToDateStatus::OutOfDate(reason) => {
                if self.options.dry {
                    output.push_str(&format!("  Would build {}: {reason}\n", project.name));
                    return TaskReport {
                        project: task.path.clone(),
                        status: TaskStatus::Built,
                        diagnostics: Vec::new(),
                        files_built: 0,
                        declarations_changed: false,
                        elapsed: start.elapsed(),
                        output,
                    };
                }

                output.push_str(&format!("  Building {}: {reason}\n", project.name));
                let previous = self
                    .host
                    .read_build_info(project)
                    .map(|info| info.snapshot);
                let outcome = self.host.compile(project, previous.as_ref());
                for diagnostic in &outcome.diagnostics {
                    output.push_str(&renderer.render(diagnostic));
                }

                let declarations_changed = match (&previous, &outcome.snapshot) {
                    (Some(prev), Some(next)) => {
                        !next.options.composite
                            || prev.latest_changed_declaration
                                != next.latest_changed_declaration
                    }
                    // No snapshot comparison possible: be conservative
                    _ => true,
                };

                TaskReport {
                    project: task.path.clone(),
                    status: outcome.status,
                    diagnostics: outcome.diagnostics,
                    files_built: outcome.files_built,
                    declarations_changed,
                    elapsed: start.elapsed(),
                    output,
                }
            }
        }
    }

    /// The clean step for one task.
    fn clean_task(&self, task: &BuildTask) -> TaskReport {
        let start = Instant::now();

        let Some(project) = task.config.as_deref() else {
            return self.config_error_report(task, start);
        };

        let outcome = self.host.clean_outputs(project, self.options.dry);
        let verb = if self.options.dry {
            "Would remove"
        } else {
            "Removed"
        };
        let mut output = String::new();
        for removed in &outcome.removed {
            output.push_str(&format!("  {verb} {}\n", removed.display()));
        }

        TaskReport {
            project: task.path.clone(),
            status: TaskStatus::Cleaned,
            diagnostics: outcome.diagnostics,
            files_built: 0,
            declarations_changed: false,
            elapsed: start.elapsed(),
            output,
        }
    }

    /// The fail-fast report for a task whose configuration never resolved.
    fn config_error_report(&self, task: &BuildTask, start: Instant) -> TaskReport {
        let renderer = TextRenderer::new(self.options.color);
        let mut diagnostic = Diagnostic::error(
            codes::CONFIG_NOT_FOUND,
            "project configuration could not be resolved",
        )
        .with_project(task.path.clone());
        if let Some(reason) = &task.config_error {
            diagnostic = diagnostic.with_note(reason.clone());
        }
        let output = renderer.render(&diagnostic);
        TaskReport {
            project: task.path.clone(),
            status: TaskStatus::ConfigError,
            diagnostics: vec![diagnostic],
            files_built: 0,
            declarations_changed: true,
            elapsed: start.elapsed(),
            output,
        }
    }
}

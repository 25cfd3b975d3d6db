//! Concurrent task execution with ordered reporting.

use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::task::{BuildTask, TaskReport};

/// Executes every task in `order`, honoring dependency edges, and flushes
/// each task's output in exactly build order.
///
/// In multi-threaded mode one worker runs per task; a worker blocks only
/// on its upstream tasks' completion latches and, later, on its
/// predecessor's report latch. Closing the completion latch happens before
/// output is flushed, so downstream builds start as soon as their inputs
/// are ready even while earlier output is still being printed. In
/// single-threaded mode the same steps run sequentially in build order and
/// every wait returns immediately; both modes produce identical output.
///
/// Returns the task reports in build order.
pub fn execute(
    order: &[Arc<BuildTask>],
    single_threaded: bool,
    writer: &Mutex<Box<dyn Write + Send>>,
    driver: &(dyn Fn(&BuildTask) -> TaskReport + Sync),
) -> Vec<TaskReport> {
    let collected: Mutex<Vec<TaskReport>> = Mutex::new(Vec::with_capacity(order.len()));

    if single_threaded {
        for index in 0..order.len() {
            run_one(order, index, writer, driver, &collected);
        }
    } else {
        std::thread::scope(|scope| {
            for index in 0..order.len() {
                let collected = &collected;
                scope.spawn(move || run_one(order, index, writer, driver, collected));
            }
        });
    }

    collected.into_inner().unwrap()
}

/// Runs a single task through its build and report phases.
fn run_one(
    order: &[Arc<BuildTask>],
    index: usize,
    writer: &Mutex<Box<dyn Write + Send>>,
    driver: &(dyn Fn(&BuildTask) -> TaskReport + Sync),
    collected: &Mutex<Vec<TaskReport>>,
) {
    let task = &order[index];

    task.wait_for_upstream();
    let report = driver(task);
    // Downstream tasks are unblocked now; this task's output is flushed
    // later, in order.
    task.record_and_unblock(report);

    if let Some(prev) = task.prev_reporter {
        order[prev].wait_reported();
    }

    let report = task.report().expect("completed task has a report");
    {
        let mut writer = writer.lock().unwrap();
        let _ = writer.write_all(report.output.as_bytes());
    }
    collected.lock().unwrap().push(report.clone());
    task.mark_reported();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use std::time::Duration;
    use strata_common::CanonicalPath;

    /// A writer whose contents can be inspected after the run.
    #[derive(Clone)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn independent_tasks(count: usize) -> Vec<Arc<BuildTask>> {
        (0..count)
            .map(|i| {
                Arc::new(BuildTask::new(
                    CanonicalPath::from_canonical(format!("/p/{i}/strata.toml")),
                    None,
                    Vec::new(),
                    i,
                    i.checked_sub(1),
                ))
            })
            .collect()
    }

    fn report_for(task: &BuildTask, output: String) -> TaskReport {
        TaskReport {
            project: task.path.clone(),
            status: TaskStatus::Built,
            diagnostics: Vec::new(),
            files_built: 1,
            declarations_changed: true,
            elapsed: Duration::ZERO,
            output,
        }
    }

    #[test]
    fn output_ordered_despite_randomized_latency() {
        let order = independent_tasks(8);
        let buffer = SharedBuffer::new();
        let writer: Mutex<Box<dyn Write + Send>> = Mutex::new(Box::new(buffer.clone()));

        // Scrambled latencies: later tasks tend to finish first
        let driver = |task: &BuildTask| {
            let jitter = (task.order_index * 13 + 7) % 5;
            std::thread::sleep(Duration::from_millis((4 - jitter as u64) * 12));
            report_for(task, format!("task {}\n", task.order_index))
        };

        let reports = execute(&order, false, &writer, &driver);

        let expected: String = (0..8).map(|i| format!("task {i}\n")).collect();
        assert_eq!(buffer.contents(), expected);
        let indices: Vec<usize> = reports
            .iter()
            .map(|r| {
                order
                    .iter()
                    .position(|t| t.path == r.project)
                    .unwrap()
            })
            .collect();
        assert_eq!(indices, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn single_threaded_produces_identical_output() {
        let driver = |task: &BuildTask| report_for(task, format!("task {}\n", task.order_index));

        let parallel_buffer = SharedBuffer::new();
        {
            let order = independent_tasks(5);
            let writer: Mutex<Box<dyn Write + Send>> =
                Mutex::new(Box::new(parallel_buffer.clone()));
            execute(&order, false, &writer, &driver);
        }

        let sequential_buffer = SharedBuffer::new();
        {
            let order = independent_tasks(5);
            let writer: Mutex<Box<dyn Write + Send>> =
                Mutex::new(Box::new(sequential_buffer.clone()));
            execute(&order, true, &writer, &driver);
        }

        assert_eq!(parallel_buffer.contents(), sequential_buffer.contents());
    }

    #[test]
    fn dependent_task_sees_upstream_report() {
        let up = Arc::new(BuildTask::new(
            CanonicalPath::from_canonical("/p/lib/strata.toml"),
            None,
            Vec::new(),
            0,
            None,
        ));
        let down = Arc::new(BuildTask::new(
            CanonicalPath::from_canonical("/p/app/strata.toml"),
            None,
            vec![Arc::clone(&up)],
            1,
            Some(0),
        ));
        let order = vec![up, down];

        let buffer = SharedBuffer::new();
        let writer: Mutex<Box<dyn Write + Send>> = Mutex::new(Box::new(buffer.clone()));
        let driver = |task: &BuildTask| {
            // By the time a task builds, its upstream reports must exist
            for upstream in &task.upstream {
                assert!(upstream.report().is_some());
            }
            report_for(task, format!("{}\n", task.path))
        };

        let reports = execute(&order, false, &writer, &driver);
        assert_eq!(reports.len(), 2);
        assert_eq!(
            buffer.contents(),
            "/p/lib/strata.toml\n/p/app/strata.toml\n"
        );
    }

    #[test]
    fn empty_order_is_a_noop() {
        let buffer = SharedBuffer::new();
        let writer: Mutex<Box<dyn Write + Send>> = Mutex::new(Box::new(buffer.clone()));
        let reports = execute(&[], false, &writer, &|_| unreachable!());
        assert!(reports.is_empty());
        assert!(buffer.contents().is_empty());
    }
}

//! Dependency graph construction: concurrent discovery, deterministic
//! ordering, and cycle detection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use strata_cache::KeyedOnceMap;
use strata_common::CanonicalPath;
use strata_config::ResolvedReference;
use strata_diagnostics::{codes, Diagnostic};

use crate::host::BuildHost;
use crate::task::BuildTask;

/// A project discovered during the concurrent resolution phase.
struct DiscoveredProject {
    config: Option<Arc<strata_config::ResolvedProject>>,
    references: Vec<ResolvedReference>,
    error: Option<String>,
}

/// The finished dependency graph: a build order plus any cycle
/// diagnostics found while computing it.
pub struct BuildGraph {
    /// Tasks in build order: every project appears after all of its
    /// non-circular upstream dependencies.
    pub order: Vec<Arc<BuildTask>>,
    /// One diagnostic per distinct reference cycle.
    pub cycle_diagnostics: Vec<Diagnostic>,
}

impl BuildGraph {
    /// Looks up the task for a canonical configuration path.
    pub fn task(&self, path: &CanonicalPath) -> Option<&Arc<BuildTask>> {
        self.order.iter().find(|t| &t.path == path)
    }
}

/// Builds the project dependency graph for a set of root configurations.
///
/// Construction happens in two phases. Discovery resolves every reachable
/// configuration concurrently, deduplicated through a single-flight store
/// keyed by canonical path, and finishes at a barrier join. Ordering is a
/// single-threaded depth-first walk over the discovery results that
/// produces the same build order for the same input graph regardless of
/// discovery interleaving: roots are visited in caller order, references
/// in declaration order.
pub struct DependencyGraphBuilder<'h> {
    host: &'h dyn BuildHost,
    single_threaded: bool,
}

/// Mutable state of the ordering walk.
struct OrderingState {
    completed: HashMap<CanonicalPath, Arc<BuildTask>>,
    analyzing: HashSet<CanonicalPath>,
    path_stack: Vec<CanonicalPath>,
    order: Vec<Arc<BuildTask>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'h> DependencyGraphBuilder<'h> {
    /// Creates a builder over the given host.
    pub fn new(host: &'h dyn BuildHost, single_threaded: bool) -> Self {
        Self {
            host,
            single_threaded,
        }
    }

    /// Resolves the full transitive reference graph for `roots` and
    /// returns the ordered task list with cycle diagnostics.
    pub fn build_graph(&self, roots: &[String]) -> BuildGraph {
        let root_paths: Vec<CanonicalPath> = roots
            .iter()
            .map(|name| self.host.canonical_path(name))
            .collect();

        let store = self.discover(&root_paths);
        self.order_tasks(&root_paths, &store)
    }

    /// Phase 1: concurrent discovery of every reachable configuration.
    fn discover(
        &self,
        roots: &[CanonicalPath],
    ) -> KeyedOnceMap<CanonicalPath, Arc<DiscoveredProject>> {
        let store = KeyedOnceMap::new();
        let host = self.host;

        if self.single_threaded {
            for root in roots {
                Self::discover_sequential(host, &store, root.clone());
            }
        } else {
            std::thread::scope(|scope| {
                for root in roots {
                    let store = &store;
                    let root = root.clone();
                    scope.spawn(move || Self::discover_parallel(scope, host, store, root));
                }
                // Scope exit is the barrier join for all spawned work.
            });
        }

        store
    }

    /// Resolves one configuration through the host.
    fn resolve(host: &dyn BuildHost, path: &CanonicalPath) -> DiscoveredProject {
        match host.resolve_project_config(path) {
            Ok(config) => DiscoveredProject {
                references: config.references.clone(),
                config: Some(config),
                error: None,
            },
            Err(e) => DiscoveredProject {
                config: None,
                references: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    fn discover_sequential(
        host: &dyn BuildHost,
        store: &KeyedOnceMap<CanonicalPath, Arc<DiscoveredProject>>,
        path: CanonicalPath,
    ) {
        let (project, was_cached) =
            store.get_or_compute(path.clone(), || Arc::new(Self::resolve(host, &path)));
        if was_cached {
            return;
        }
        for reference in &project.references {
            Self::discover_sequential(host, store, reference.config_path.clone());
        }
    }

    fn discover_parallel<'scope, 'env>(
        scope: &'scope std::thread::Scope<'scope, 'env>,
        host: &'env dyn BuildHost,
        store: &'env KeyedOnceMap<CanonicalPath, Arc<DiscoveredProject>>,
        path: CanonicalPath,
    ) {
        let (project, was_cached) =
            store.get_or_compute(path.clone(), || Arc::new(Self::resolve(host, &path)));
        if was_cached {
            // A second discoverer of the same path does not re-spawn.
            return;
        }
        for reference in &project.references {
            let target = reference.config_path.clone();
            scope.spawn(move || Self::discover_parallel(scope, host, store, target));
        }
    }

    /// Phase 2: single-threaded depth-first ordering over the discovery
    /// results.
    fn order_tasks(
        &self,
        roots: &[CanonicalPath],
        store: &KeyedOnceMap<CanonicalPath, Arc<DiscoveredProject>>,
    ) -> BuildGraph {
        let mut state = OrderingState {
            completed: HashMap::new(),
            analyzing: HashSet::new(),
            path_stack: Vec::new(),
            order: Vec::new(),
            diagnostics: Vec::new(),
        };

        for root in roots {
            Self::visit(root, false, &mut state, store);
        }

        BuildGraph {
            order: state.order,
            cycle_diagnostics: state.diagnostics,
        }
    }

    /// Visits one node of the walk.
    ///
    /// Returns the node's task, or `None` when the edge into it closed a
    /// cycle and must not be linked. `in_circular_context` is true once
    /// the walk has passed through a user-acknowledged circular reference;
    /// further cycles inside that region are not re-reported.
    fn visit(
        path: &CanonicalPath,
        in_circular_context: bool,
        state: &mut OrderingState,
        store: &KeyedOnceMap<CanonicalPath, Arc<DiscoveredProject>>,
    ) -> Option<Arc<BuildTask>> {
        if let Some(task) = state.completed.get(path) {
            // Diamond dependencies share one task.
            return Some(Arc::clone(task));
        }

        if state.analyzing.contains(path) {
            if !in_circular_context {
                let start = state
                    .path_stack
                    .iter()
                    .position(|p| p == path)
                    .unwrap_or(0);
                let mut cycle: Vec<String> = state.path_stack[start..]
                    .iter()
                    .map(|p| p.to_string())
                    .collect();
                cycle.push(path.to_string());
                state.diagnostics.push(Diagnostic::error(
                    codes::REFERENCE_CYCLE,
                    format!("project references form a cycle:\n{}", cycle.join("\n")),
                ));
            }
            return None;
        }

        state.analyzing.insert(path.clone());
        state.path_stack.push(path.clone());

        let discovered = store.get(path);
        let mut upstream = Vec::new();
        if let Some(project) = &discovered {
            for reference in &project.references {
                let child_context = in_circular_context || reference.circular;
                if let Some(task) =
                    Self::visit(&reference.config_path, child_context, state, store)
                {
                    upstream.push(task);
                }
            }
        }

        state.path_stack.pop();
        state.analyzing.remove(path);

        let order_index = state.order.len();
        let prev_reporter = order_index.checked_sub(1);
        let (config, error) = match discovered {
            Some(project) => (project.config.clone(), project.error.clone()),
            None => (None, None),
        };
        let mut task = BuildTask::new(path.clone(), config, upstream, order_index, prev_reporter);
        task.config_error = error;
        let task = Arc::new(task);

        state.completed.insert(path.clone(), Arc::clone(&task));
        state.order.push(Arc::clone(&task));
        Some(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::FakeHost;

    fn paths(graph: &BuildGraph) -> Vec<&str> {
        graph.order.iter().map(|t| t.path.as_str()).collect()
    }

    #[test]
    fn single_project_graph() {
        let mut host = FakeHost::new();
        host.add_project("/p/app", &[]);
        let graph = DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/app"]));

        assert_eq!(paths(&graph), vec!["/p/app/strata.toml"]);
        assert!(graph.cycle_diagnostics.is_empty());
        assert_eq!(graph.order[0].prev_reporter, None);
    }

    fn roots(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn upstream_ordered_before_downstream() {
        let mut host = FakeHost::new();
        host.add_project("/p/lib", &[]);
        host.add_project("/p/app", &[("/p/lib", false)]);
        let graph = DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/app"]));

        assert_eq!(
            paths(&graph),
            vec!["/p/lib/strata.toml", "/p/app/strata.toml"]
        );
        let app = graph.task(&host.canonical_path("/p/app")).unwrap();
        assert_eq!(app.upstream.len(), 1);
        assert_eq!(app.upstream[0].path.as_str(), "/p/lib/strata.toml");
        assert_eq!(app.prev_reporter, Some(0));
    }

    #[test]
    fn diamond_dependency_shares_one_task() {
        let mut host = FakeHost::new();
        host.add_project("/p/d", &[]);
        host.add_project("/p/b", &[("/p/d", false)]);
        host.add_project("/p/c", &[("/p/d", false)]);
        host.add_project("/p/a", &[("/p/b", false), ("/p/c", false)]);
        let graph = DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/a"]));

        assert_eq!(
            paths(&graph),
            vec![
                "/p/d/strata.toml",
                "/p/b/strata.toml",
                "/p/c/strata.toml",
                "/p/a/strata.toml"
            ]
        );
        let b = graph.task(&host.canonical_path("/p/b")).unwrap();
        let c = graph.task(&host.canonical_path("/p/c")).unwrap();
        assert!(Arc::ptr_eq(&b.upstream[0], &c.upstream[0]));
    }

    #[test]
    fn build_order_deterministic_across_modes_and_runs() {
        let mut host = FakeHost::new();
        host.add_project("/p/z", &[]);
        host.add_project("/p/m", &[("/p/z", false)]);
        host.add_project("/p/a", &[("/p/m", false), ("/p/z", false)]);
        host.add_project("/p/root", &[("/p/a", false), ("/p/m", false)]);

        let reference = DependencyGraphBuilder::new(&host, true).build_graph(&roots(&["/p/root"]));
        for _ in 0..4 {
            let parallel =
                DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/root"]));
            assert_eq!(paths(&parallel), paths(&reference));
            assert_eq!(
                parallel.cycle_diagnostics.len(),
                reference.cycle_diagnostics.len()
            );
        }
    }

    #[test]
    fn roots_visited_in_caller_order() {
        let mut host = FakeHost::new();
        host.add_project("/p/x", &[]);
        host.add_project("/p/y", &[]);

        let graph =
            DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/y", "/p/x"]));
        assert_eq!(
            paths(&graph),
            vec!["/p/y/strata.toml", "/p/x/strata.toml"]
        );
    }

    #[test]
    fn cycle_reported_once_with_full_path() {
        let mut host = FakeHost::new();
        host.add_project("/p/a", &[("/p/b", false)]);
        host.add_project("/p/b", &[("/p/c", false)]);
        host.add_project("/p/c", &[("/p/a", false)]);
        let graph = DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/a"]));

        assert_eq!(graph.cycle_diagnostics.len(), 1);
        let message = &graph.cycle_diagnostics[0].message;
        let expected = "/p/a/strata.toml\n/p/b/strata.toml\n/p/c/strata.toml\n/p/a/strata.toml";
        assert!(message.contains(expected), "unexpected message: {message}");
        // The cycle edge is not linked, so the order still completes
        assert_eq!(graph.order.len(), 3);
    }

    #[test]
    fn user_marked_circular_suppresses_diagnostic() {
        let mut host = FakeHost::new();
        host.add_project("/p/a", &[("/p/b", false)]);
        host.add_project("/p/b", &[("/p/a", true)]);
        let graph = DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/a"]));

        assert!(graph.cycle_diagnostics.is_empty());
        assert_eq!(graph.order.len(), 2);
        // The back edge is not linked either way
        let b = graph.task(&host.canonical_path("/p/b")).unwrap();
        assert!(b.upstream.is_empty());
    }

    #[test]
    fn nested_cycle_inside_circular_region_not_rereported() {
        let mut host = FakeHost::new();
        host.add_project("/p/a", &[("/p/b", true)]);
        host.add_project("/p/b", &[("/p/c", false)]);
        host.add_project("/p/c", &[("/p/b", false), ("/p/a", false)]);
        let graph = DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/a"]));

        // Both the c->b and c->a cycles sit inside the region entered via
        // the circular-marked a->b reference
        assert!(graph.cycle_diagnostics.is_empty());
        assert_eq!(graph.order.len(), 3);
    }

    #[test]
    fn unresolvable_reference_still_participates_in_order() {
        let mut host = FakeHost::new();
        host.add_project("/p/app", &[("/p/missing", false)]);
        let graph = DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/app"]));

        assert_eq!(
            paths(&graph),
            vec!["/p/missing/strata.toml", "/p/app/strata.toml"]
        );
        let missing = graph.task(&host.canonical_path("/p/missing")).unwrap();
        assert!(missing.config.is_none());
        assert!(missing.config_error.is_some());
    }

    #[test]
    fn each_config_resolved_once() {
        let mut host = FakeHost::new();
        host.add_project("/p/d", &[]);
        host.add_project("/p/b", &[("/p/d", false)]);
        host.add_project("/p/c", &[("/p/d", false)]);
        host.add_project("/p/a", &[("/p/b", false), ("/p/c", false)]);

        DependencyGraphBuilder::new(&host, false).build_graph(&roots(&["/p/a"]));
        assert_eq!(
            host.resolution_count(&host.canonical_path("/p/d")),
            1,
            "diamond base must be resolved exactly once"
        );
    }
}

//! In-memory build host for scheduler tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use strata_common::CanonicalPath;
use strata_config::{
    CompilerOptions, ConfigError, ResolvedProject, ResolvedReference, CONFIG_FILE_NAME,
};
use strata_diagnostics::{codes, Diagnostic};
use strata_snapshot::{BuildInfo, CompiledProgram, Snapshot, SnapshotEngine};

use crate::host::{BuildHost, CleanOutcome, CompileOutcome};
use crate::task::TaskStatus;

/// A scriptable in-memory host: projects are registered up front, compile
/// latency and failures can be injected, and every resolution/compile is
/// counted.
pub struct FakeHost {
    projects: HashMap<CanonicalPath, Arc<ResolvedProject>>,
    latencies: HashMap<CanonicalPath, Duration>,
    failing: HashSet<CanonicalPath>,
    build_infos: HashMap<CanonicalPath, BuildInfo>,
    mtimes: HashMap<CanonicalPath, SystemTime>,
    sources: HashMap<CanonicalPath, Vec<CanonicalPath>>,
    resolutions: Mutex<HashMap<CanonicalPath, usize>>,
    compiles: Mutex<Vec<CanonicalPath>>,
    touches: Mutex<Vec<CanonicalPath>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            projects: HashMap::new(),
            latencies: HashMap::new(),
            failing: HashSet::new(),
            build_infos: HashMap::new(),
            mtimes: HashMap::new(),
            sources: HashMap::new(),
            resolutions: Mutex::new(HashMap::new()),
            compiles: Mutex::new(Vec::new()),
            touches: Mutex::new(Vec::new()),
        }
    }

    /// Registers a project rooted at `dir` referencing the given project
    /// directories, each with its circular marker.
    pub fn add_project(&mut self, dir: &str, references: &[(&str, bool)]) {
        let config_path = self.canonical_path(dir);
        let references = references
            .iter()
            .map(|(path, circular)| ResolvedReference {
                config_path: self.canonical_path(path),
                circular: *circular,
            })
            .collect();
        let name = dir.rsplit('/').next().unwrap_or(dir).to_string();
        let project = ResolvedProject {
            root_dir: config_path.parent_dir(),
            config_path: config_path.clone(),
            name,
            files: Vec::new(),
            include: Vec::new(),
            options: CompilerOptions::default(),
            references,
        };
        self.projects.insert(config_path, Arc::new(project));
    }

    /// Injects an artificial compile latency for the project at `dir`.
    pub fn set_latency(&mut self, dir: &str, latency: Duration) {
        let path = self.canonical_path(dir);
        self.latencies.insert(path, latency);
    }

    /// Makes compilation of the project at `dir` fail with an error
    /// diagnostic.
    pub fn set_failing(&mut self, dir: &str) {
        let path = self.canonical_path(dir);
        self.failing.insert(path);
    }

    /// Replaces the compiler options of the project at `dir`.
    pub fn set_options(&mut self, dir: &str, options: CompilerOptions) {
        let path = self.canonical_path(dir);
        let existing = self.projects.get(&path).expect("project not registered");
        let updated = ResolvedProject {
            config_path: existing.config_path.clone(),
            root_dir: existing.root_dir.clone(),
            name: existing.name.clone(),
            files: existing.files.clone(),
            include: existing.include.clone(),
            options,
            references: existing.references.clone(),
        };
        self.projects.insert(path, Arc::new(updated));
    }

    /// Installs persisted build info for the project at `dir`.
    pub fn set_build_info(&mut self, dir: &str, info: BuildInfo) {
        let path = self.canonical_path(dir);
        self.build_infos.insert(path, info);
    }

    /// Sets the modification time reported for a path.
    pub fn set_mtime(&mut self, path: &str, mtime: SystemTime) {
        let canonical = CanonicalPath::resolve(path, Path::new("/"), true);
        self.mtimes.insert(canonical, mtime);
    }

    /// Registers a source file of the project at `dir` with its
    /// modification time.
    pub fn add_source(&mut self, dir: &str, file: &str, mtime: SystemTime) {
        let project = self.canonical_path(dir);
        let source = CanonicalPath::resolve(file, Path::new("/"), true);
        self.mtimes.insert(source.clone(), mtime);
        self.sources.entry(project).or_default().push(source);
    }

    /// Projects whose outputs were timestamp-touched, in completion order.
    pub fn touched(&self) -> Vec<CanonicalPath> {
        self.touches.lock().unwrap().clone()
    }

    /// How many times the configuration at `path` was resolved.
    pub fn resolution_count(&self, path: &CanonicalPath) -> usize {
        *self.resolutions.lock().unwrap().get(path).unwrap_or(&0)
    }

    /// Projects compiled so far, in completion order.
    pub fn compiled(&self) -> Vec<CanonicalPath> {
        self.compiles.lock().unwrap().clone()
    }
}

impl BuildHost for FakeHost {
    fn canonical_path(&self, name: &str) -> CanonicalPath {
        let file = if name.ends_with(".toml") || name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{}/{}", name.trim_end_matches('/'), CONFIG_FILE_NAME)
        };
        CanonicalPath::resolve(&file, Path::new("/"), true)
    }

    fn resolve_project_config(
        &self,
        path: &CanonicalPath,
    ) -> Result<Arc<ResolvedProject>, ConfigError> {
        *self
            .resolutions
            .lock()
            .unwrap()
            .entry(path.clone())
            .or_insert(0) += 1;
        self.projects.get(path).cloned().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no configuration at {path}"),
            ))
        })
    }

    fn source_paths(&self, project: &ResolvedProject) -> Vec<CanonicalPath> {
        self.sources
            .get(&project.config_path)
            .cloned()
            .unwrap_or_default()
    }

    fn mtime(&self, path: &CanonicalPath) -> Option<SystemTime> {
        self.mtimes.get(path).copied()
    }

    fn read_build_info(&self, project: &ResolvedProject) -> Option<BuildInfo> {
        self.build_infos.get(&project.config_path).cloned()
    }

    fn compile(&self, project: &ResolvedProject, previous: Option<&Snapshot>) -> CompileOutcome {
        if let Some(latency) = self.latencies.get(&project.config_path) {
            std::thread::sleep(*latency);
        }
        self.compiles
            .lock()
            .unwrap()
            .push(project.config_path.clone());

        if self.failing.contains(&project.config_path) {
            return CompileOutcome {
                status: TaskStatus::CompileFailed,
                diagnostics: vec![Diagnostic::error(codes::SOURCE_UNREADABLE, "injected failure")
                    .with_project(project.config_path.clone())],
                snapshot: None,
                files_built: 0,
            };
        }

        let program = CompiledProgram::new(project.options.clone(), Vec::new());
        CompileOutcome {
            status: TaskStatus::Built,
            diagnostics: Vec::new(),
            snapshot: Some(SnapshotEngine::build(&program, previous)),
            files_built: 1,
        }
    }

    fn touch_outputs(&self, project: &ResolvedProject) -> usize {
        self.touches
            .lock()
            .unwrap()
            .push(project.config_path.clone());
        1
    }

    fn clean_outputs(&self, project: &ResolvedProject, _dry_run: bool) -> CleanOutcome {
        CleanOutcome {
            removed: vec![project.root_dir.join("out")],
            diagnostics: Vec::new(),
        }
    }
}

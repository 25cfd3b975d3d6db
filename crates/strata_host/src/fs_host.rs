//! The filesystem implementation of the scheduler's host interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use strata_cache::{HostCaches, SharedDocument};
use strata_common::{CanonicalPath, ContentHash};
use strata_config::{
    load_config, resolve_project, ConfigError, ResolvedProject, CONFIG_FILE_NAME,
};
use strata_diagnostics::{codes, Diagnostic};
use strata_graph::{BuildHost, CleanOutcome, CompileOutcome, TaskStatus};
use strata_snapshot::{BuildInfo, CompiledProgram, EmitKind, ProgramFile, Snapshot, SnapshotEngine};

use crate::scan;

/// Extension appended to reference specifiers written without one.
const SOURCE_EXT: &str = "st";

/// A build host backed by the real filesystem.
///
/// Configuration files are parsed at most once per run through the config
/// cache; file timestamps are memoized and invalidated on writes made
/// through this host; declaration and JSON sources shared between projects
/// are read once per build cycle through the document cache.
pub struct FsHost {
    cwd: PathBuf,
    case_sensitive: bool,
    caches: HostCaches,
}

impl FsHost {
    /// Creates a host resolving relative paths against `cwd`.
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            case_sensitive: true,
            caches: HostCaches::new(),
        }
    }

    /// Selects case-insensitive path identity (for hosts on such
    /// filesystems).
    pub fn with_case_sensitivity(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Clears the caches scoped to one build cycle.
    ///
    /// Call between unrelated build invocations that share this host.
    pub fn clear_build_cycle_caches(&self) {
        self.caches.clear_documents();
    }

    fn canonical(&self, path: &Path) -> CanonicalPath {
        CanonicalPath::resolve(
            path.to_string_lossy().as_ref(),
            &self.cwd,
            self.case_sensitive,
        )
    }

    /// All source files of a project: the explicit `files` list plus every
    /// file under the `include` directories, absolute, sorted, deduped.
    fn gather_source_files(&self, project: &ResolvedProject) -> Vec<PathBuf> {
        let mut sources: Vec<PathBuf> = project
            .files
            .iter()
            .map(|f| project.root_dir.join(f))
            .collect();
        for dir in &project.include {
            collect_files(&project.root_dir.join(dir), &mut sources);
        }
        sources.sort();
        sources.dedup();
        sources
    }

    /// Reads one source file into the program model, or records a
    /// diagnostic and returns `None`.
    fn read_program_file(
        &self,
        project: &ResolvedProject,
        path: &Path,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ProgramFile> {
        let canonical = self.canonical(path);
        let is_json = path.extension().is_some_and(|e| e == "json");
        let is_declaration = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().ends_with(".d.st"));

        // Declaration and JSON files are commonly shared between projects;
        // read them once per build cycle.
        let text: Arc<str> = if is_json || is_declaration {
            let doc = self.caches.document(&canonical, || {
                let text = std::fs::read_to_string(path)?;
                Ok(Arc::new(SharedDocument::new(canonical.clone(), text)))
            });
            match doc {
                Ok(doc) => Arc::clone(&doc.text),
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error(codes::SOURCE_UNREADABLE, e.to_string())
                            .with_project(project.config_path.clone())
                            .with_file(canonical),
                    );
                    return None;
                }
            }
        } else {
            match std::fs::read_to_string(path) {
                Ok(text) => text.into(),
                Err(e) => {
                    diagnostics.push(
                        Diagnostic::error(codes::SOURCE_UNREADABLE, e.to_string())
                            .with_project(project.config_path.clone())
                            .with_file(canonical),
                    );
                    return None;
                }
            }
        };

        let facts = scan::scan(&text);
        let parent = canonical.parent_dir();
        let references = facts
            .references
            .iter()
            .map(|spec| {
                let spec = if Path::new(spec).extension().is_some() {
                    spec.clone()
                } else {
                    format!("{spec}.{SOURCE_EXT}")
                };
                CanonicalPath::resolve(&spec, &parent, self.case_sensitive)
            })
            .collect();

        let declaration_hash = project
            .options
            .declaration
            .then(|| ContentHash::from_text(&declaration_text(&text)));
        let semantic_diagnostics = if project.options.defer_type_checking {
            None
        } else {
            // Checking is the compiler's concern; the host models a clean
            // check so carried diagnostics have something to carry.
            Some(Vec::new())
        };

        Some(ProgramFile {
            path: canonical,
            is_module: facts.is_module,
            is_json,
            is_declaration,
            is_lib: false,
            implied_format: project.options.module,
            has_global_augmentation: facts.has_global_augmentation,
            has_non_ambient_statements: facts.has_non_ambient_statements,
            references,
            semantic_diagnostics,
            emit_diagnostics: None,
            declaration_hash,
            text,
        })
    }

    /// The output paths owed by a source file: executable and declaration
    /// artifacts.
    fn output_paths(&self, project: &ResolvedProject, source: &CanonicalPath) -> (PathBuf, PathBuf) {
        let relative = source
            .as_path()
            .strip_prefix(&project.root_dir)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| PathBuf::from(source.file_name()));
        let js = project.out_dir().join(relative.with_extension("out"));
        let declaration = project
            .declaration_dir()
            .join(relative.with_extension("d.out"));
        (js, declaration)
    }

    /// Writes the artifacts owed by one file.
    fn emit_file(
        &self,
        project: &ResolvedProject,
        file: &ProgramFile,
        kind: EmitKind,
    ) -> std::io::Result<()> {
        let (js, declaration) = self.output_paths(project, &file.path);

        if kind.includes_js() && project.options.emit_js {
            write_artifact(&js, file.text.as_bytes())?;
            self.caches.note_file_written(&self.canonical(&js));
        }
        if kind.includes_declarations() && project.options.declaration {
            write_artifact(&declaration, declaration_text(&file.text).as_bytes())?;
            self.caches.note_file_written(&self.canonical(&declaration));
        }
        Ok(())
    }

    /// Every output artifact the project may have on disk, existing or not.
    fn artifact_paths(&self, project: &ResolvedProject) -> Vec<PathBuf> {
        let mut artifacts = Vec::new();
        for source in self.gather_source_files(project) {
            let canonical = self.canonical(&source);
            let (js, declaration) = self.output_paths(project, &canonical);
            artifacts.push(js);
            if project.options.declaration {
                artifacts.push(declaration);
            }
        }
        artifacts.push(project.build_info_path());
        artifacts.sort();
        artifacts.dedup();
        artifacts
    }
}

impl BuildHost for FsHost {
    fn canonical_path(&self, name: &str) -> CanonicalPath {
        let file = if name.ends_with(".toml") || name.ends_with(".json") {
            name.to_string()
        } else {
            format!("{}/{}", name.trim_end_matches('/'), CONFIG_FILE_NAME)
        };
        CanonicalPath::resolve(&file, &self.cwd, self.case_sensitive)
    }

    fn resolve_project_config(
        &self,
        path: &CanonicalPath,
    ) -> Result<Arc<ResolvedProject>, ConfigError> {
        self.caches.config(path, || {
            let config = load_config(path.as_path())?;
            Ok(Arc::new(resolve_project(
                config,
                path.clone(),
                self.case_sensitive,
            )))
        })
    }

    fn source_paths(&self, project: &ResolvedProject) -> Vec<CanonicalPath> {
        self.gather_source_files(project)
            .iter()
            .map(|p| self.canonical(p))
            .collect()
    }

    fn mtime(&self, path: &CanonicalPath) -> Option<SystemTime> {
        self.caches
            .mtime(path, || {
                std::fs::metadata(path.as_path()).and_then(|m| m.modified())
            })
            .ok()
    }

    fn read_build_info(&self, project: &ResolvedProject) -> Option<BuildInfo> {
        BuildInfo::load(&project.build_info_path())
    }

    fn compile(&self, project: &ResolvedProject, previous: Option<&Snapshot>) -> CompileOutcome {
        let mut diagnostics = Vec::new();

        let sources = self.gather_source_files(project);
        let mut files = Vec::new();
        for source in &sources {
            if let Some(file) = self.read_program_file(project, source, &mut diagnostics) {
                files.push(file);
            }
        }

        let program = CompiledProgram::new(project.options.clone(), files);
        let snapshot = SnapshotEngine::build(&program, previous);

        let mut files_built = 0;
        for file in &program.files {
            // Declaration and JSON sources are inputs, not emit targets
            if file.is_declaration || file.is_json {
                continue;
            }
            let kind = if snapshot.changed_files.contains(&file.path) {
                Some(EmitKind::All)
            } else {
                snapshot.pending_emit.get(&file.path).copied()
            };
            let Some(kind) = kind else { continue };
            match self.emit_file(project, file, kind) {
                Ok(()) => files_built += 1,
                Err(e) => diagnostics.push(
                    Diagnostic::error(codes::EMIT_FAILED, e.to_string())
                        .with_project(project.config_path.clone())
                        .with_file(file.path.clone()),
                ),
            }
        }

        // What gets persisted has its debts paid: pending emission was
        // written above, so the stored snapshot owes nothing.
        let mut persisted = snapshot.clone();
        persisted.pending_emit.clear();
        persisted.buildinfo_rewrite_pending = false;
        let build_info_path = project.build_info_path();
        match BuildInfo::new(persisted).save(&build_info_path) {
            Ok(()) => self.caches.note_file_written(&self.canonical(&build_info_path)),
            Err(e) => diagnostics.push(
                Diagnostic::error(codes::EMIT_FAILED, e.to_string())
                    .with_project(project.config_path.clone()),
            ),
        }

        let status = if diagnostics.iter().any(|d| d.severity.is_error()) {
            TaskStatus::CompileFailed
        } else {
            TaskStatus::Built
        };
        CompileOutcome {
            status,
            diagnostics,
            snapshot: Some(snapshot),
            files_built,
        }
    }

    fn touch_outputs(&self, project: &ResolvedProject) -> usize {
        let now = SystemTime::now();
        let mut touched = 0;
        for artifact in self.artifact_paths(project) {
            let Ok(file) = std::fs::File::options().write(true).open(&artifact) else {
                continue;
            };
            if file.set_modified(now).is_ok() {
                self.caches.note_file_written(&self.canonical(&artifact));
                touched += 1;
            }
        }
        touched
    }

    fn clean_outputs(&self, project: &ResolvedProject, dry_run: bool) -> CleanOutcome {
        let mut outcome = CleanOutcome::default();
        for artifact in self.artifact_paths(project) {
            if !artifact.exists() {
                continue;
            }
            if dry_run {
                outcome.removed.push(artifact);
                continue;
            }
            match std::fs::remove_file(&artifact) {
                Ok(()) => {
                    self.caches.note_file_written(&self.canonical(&artifact));
                    outcome.removed.push(artifact);
                }
                Err(e) => outcome.diagnostics.push(
                    Diagnostic::warning(codes::EMIT_FAILED, e.to_string())
                        .with_project(project.config_path.clone()),
                ),
            }
        }
        outcome
    }
}

/// Recursively collects regular files under `dir`, skipping configuration
/// files.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files);
        } else if path.file_name().is_some_and(|n| n != CONFIG_FILE_NAME) {
            files.push(path);
        }
    }
}

/// The declaration surface of a source file: its `export` lines.
///
/// Body-only edits leave this (and therefore the file's emit signature)
/// unchanged, which is what keeps downstream projects from rebuilding.
fn declaration_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("export "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes one artifact, creating parent directories.
fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

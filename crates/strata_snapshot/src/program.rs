//! The compiled-program input model consumed by the snapshot engine.

use std::sync::Arc;
use strata_common::{CanonicalPath, ContentHash};
use strata_config::{CompilerOptions, ModuleFormat};
use strata_diagnostics::Diagnostic;

/// One source file of a freshly compiled program.
///
/// The compiler collaborator produces these; the engine only reads them.
/// All reference targets are already resolved to canonical paths, and the
/// syntactic facts the engine needs (module-ness, global augmentations,
/// ambient statements) are precomputed flags.
#[derive(Debug, Clone)]
pub struct ProgramFile {
    /// Canonical path of the file.
    pub path: CanonicalPath,
    /// The file text.
    pub text: Arc<str>,
    /// Whether the file is a module (has imports/exports of its own).
    pub is_module: bool,
    /// Whether the file is a JSON source.
    pub is_json: bool,
    /// Whether the file is a declaration file.
    pub is_declaration: bool,
    /// Whether the file is a default library file.
    pub is_lib: bool,
    /// The module format implied for this file.
    pub implied_format: ModuleFormat,
    /// Whether the file contains a module augmentation targeting the
    /// global scope.
    pub has_global_augmentation: bool,
    /// Whether the file contains at least one top-level statement that is
    /// not an ambient string-literal-named module declaration.
    pub has_non_ambient_statements: bool,
    /// Outgoing references: imports, referenced files, resolved type
    /// directives, augmentation targets, and visible ambient modules,
    /// each as a canonical path.
    pub references: Vec<CanonicalPath>,
    /// Semantic diagnostics produced for this file in this compilation,
    /// or `None` if the file was not checked.
    pub semantic_diagnostics: Option<Vec<Diagnostic>>,
    /// Emit diagnostics produced for this file in this compilation, or
    /// `None` if the file was not emitted.
    pub emit_diagnostics: Option<Vec<Diagnostic>>,
    /// Content hash of the declaration output produced for this file, if
    /// declaration emission ran.
    pub declaration_hash: Option<ContentHash>,
}

impl ProgramFile {
    /// Creates a file with the given path and text and neutral defaults:
    /// a checked module with no references and no diagnostics.
    pub fn new(path: CanonicalPath, text: impl Into<Arc<str>>) -> Self {
        Self {
            path,
            text: text.into(),
            is_module: true,
            is_json: false,
            is_declaration: false,
            is_lib: false,
            implied_format: ModuleFormat::default(),
            has_global_augmentation: false,
            has_non_ambient_statements: true,
            references: Vec::new(),
            semantic_diagnostics: Some(Vec::new()),
            emit_diagnostics: None,
            declaration_hash: None,
        }
    }

    /// Whether this file affects the global scope.
    ///
    /// True if it declares a global augmentation, or if it is a non-module,
    /// non-JSON script with at least one non-ambient top-level statement.
    pub fn affects_global_scope(&self) -> bool {
        self.has_global_augmentation
            || (!self.is_module && !self.is_json && self.has_non_ambient_statements)
    }
}

/// A freshly compiled program: the full file set of one project plus the
/// options it was compiled under.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    /// The compiler options used for this compilation.
    pub options: CompilerOptions,
    /// Every file in the program, in program order.
    pub files: Vec<ProgramFile>,
}

impl CompiledProgram {
    /// Creates a program from options and files.
    pub fn new(options: CompilerOptions, files: Vec<ProgramFile>) -> Self {
        Self { options, files }
    }

    /// Looks up a file by canonical path.
    pub fn file(&self, path: &CanonicalPath) -> Option<&ProgramFile> {
        self.files.iter().find(|f| &f.path == path)
    }
}

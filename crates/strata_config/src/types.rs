//! Configuration types deserialized from `strata.toml`.

use serde::{Deserialize, Serialize};

/// The top-level project configuration parsed from `strata.toml`.
///
/// Contains the project metadata, the source file set, compiler options,
/// and declared references to upstream projects.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, description).
    pub project: ProjectMeta,
    /// Source files, as paths relative to the configuration directory.
    #[serde(default)]
    pub files: Vec<String>,
    /// Directories (relative to the configuration directory) whose files
    /// are all included as sources, recursively.
    #[serde(default)]
    pub include: Vec<String>,
    /// Upstream project references.
    #[serde(default)]
    pub references: Vec<ReferenceSpec>,
    /// Compiler options applied to every file in this project.
    #[serde(default)]
    pub options: CompilerOptions,
}

/// Core project metadata required in every `strata.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// A declared reference to an upstream project.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceSpec {
    /// Path to the upstream project: either its directory (containing a
    /// `strata.toml`) or the configuration file itself.
    pub path: String,
    /// Marks a reference the user knows closes a cycle. Cycles entered
    /// through a circular-marked reference are not reported again.
    #[serde(default)]
    pub circular: bool,
}

/// Compiler options consumed by the incremental engine's diff rules.
///
/// Every comparison over these options is exact; there is no fuzzy
/// matching between "close enough" configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Whether this project participates in composite builds (tracks
    /// per-file emit signatures for downstream invalidation).
    #[serde(default)]
    pub composite: bool,
    /// Whether declaration output is produced.
    #[serde(default)]
    pub declaration: bool,
    /// Whether executable output is produced.
    #[serde(default = "default_true")]
    pub emit_js: bool,
    /// Output directory for emitted artifacts, relative to the project root.
    #[serde(default)]
    pub out_dir: Option<String>,
    /// Separate output directory for declaration artifacts.
    #[serde(default)]
    pub declaration_dir: Option<String>,
    /// Skip semantic checking of declaration files.
    #[serde(default)]
    pub skip_lib_check: bool,
    /// Skip semantic checking of default library files only.
    #[serde(default)]
    pub skip_default_lib_check: bool,
    /// Defer all type checking (emit without checking).
    #[serde(default)]
    pub defer_type_checking: bool,
    /// Enable strict semantic checks.
    #[serde(default)]
    pub strict: bool,
    /// Default module format for files that don't imply their own.
    #[serde(default)]
    pub module: ModuleFormat,
}

fn default_true() -> bool {
    true
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            composite: false,
            declaration: false,
            emit_js: true,
            out_dir: None,
            declaration_dir: None,
            skip_lib_check: false,
            skip_default_lib_check: false,
            defer_type_checking: false,
            strict: false,
            module: ModuleFormat::default(),
        }
    }
}

/// The module format implied for a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// ECMAScript-style modules (default).
    #[default]
    EsModule,
    /// CommonJS-style modules.
    CommonJs,
}

//! Per-project incremental snapshot state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strata_common::{CanonicalPath, ContentHash};
use strata_config::{CompilerOptions, ModuleFormat};
use strata_diagnostics::Diagnostic;

/// The kind of output a file still owes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmitKind {
    /// Executable output only.
    Js,
    /// Declaration output only.
    Declarations,
    /// Both executable and declaration output.
    All,
}

impl EmitKind {
    /// Combines two pending emit kinds into the kind covering both.
    pub fn union(self, other: EmitKind) -> EmitKind {
        if self == other {
            self
        } else {
            EmitKind::All
        }
    }

    /// Whether this kind includes executable output.
    pub fn includes_js(self) -> bool {
        matches!(self, EmitKind::Js | EmitKind::All)
    }

    /// Whether this kind includes declaration output.
    pub fn includes_declarations(self) -> bool {
        matches!(self, EmitKind::Declarations | EmitKind::All)
    }
}

/// Per-file record inside a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Content hash of the file text.
    pub version: ContentHash,
    /// Declaration-output signature. Lags behind `version`: it only
    /// changes when the file's emitted declaration output would change,
    /// and equals `version` only on a first build without declaration
    /// emission.
    pub signature: ContentHash,
    /// Whether the file affects the global scope.
    pub affects_global_scope: bool,
    /// The module format implied for the file.
    pub implied_format: ModuleFormat,
}

/// Per-project incremental state, one per (re-)compiled program.
///
/// Built fresh from a compiled program plus an optional previous snapshot;
/// immutable once built, becoming the "old" snapshot for the next build of
/// the same project. Persisted between runs inside
/// [`BuildInfo`](crate::BuildInfo).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    /// The compiler options used to produce this snapshot.
    pub options: CompilerOptions,
    /// Per-file state.
    pub file_infos: BTreeMap<CanonicalPath, FileInfo>,
    /// Files considered changed by this build.
    pub changed_files: BTreeSet<CanonicalPath>,
    /// Outgoing reference edges per file. Files with no references have no
    /// entry.
    pub referenced: BTreeMap<CanonicalPath, BTreeSet<CanonicalPath>>,
    /// Reusable semantic diagnostics keyed by file. An entry means the
    /// file was checked under these options; its absence means a future
    /// build must check it.
    pub semantic_diagnostics: BTreeMap<CanonicalPath, Vec<Diagnostic>>,
    /// Reusable emit diagnostics keyed by file.
    pub emit_diagnostics: BTreeMap<CanonicalPath, Vec<Diagnostic>>,
    /// Declaration-output content hashes keyed by file. Tracked only for
    /// composite projects.
    pub emit_signatures: BTreeMap<CanonicalPath, ContentHash>,
    /// Files still owing emission, with the kind of output owed. Changed
    /// files are not listed; they always get full emission through the
    /// normal path.
    pub pending_emit: BTreeMap<CanonicalPath, EmitKind>,
    /// Whether the persisted build info must be rewritten even if no file
    /// changed.
    pub buildinfo_rewrite_pending: bool,
    /// The most recently changed declaration-producing file, tracked for
    /// composite projects so downstream builds can cheapen their
    /// up-to-date checks.
    pub latest_changed_declaration: Option<CanonicalPath>,
}

impl Snapshot {
    /// Returns `true` if this build found no changed files and owes no
    /// emission.
    pub fn is_clean(&self) -> bool {
        self.changed_files.is_empty() && self.pending_emit.is_empty()
    }
}

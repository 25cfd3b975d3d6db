//! Construction of a new snapshot from a compiled program and its
//! predecessor.

use crate::options;
use crate::program::{CompiledProgram, ProgramFile};
use crate::snapshot::{EmitKind, FileInfo, Snapshot};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use strata_common::{CanonicalPath, ContentHash};
use strata_diagnostics::Diagnostic;

/// The incremental snapshot engine.
///
/// Decides, file by file, what changed since the previous build of a
/// project and what can be carried forward. The per-file step runs in
/// parallel across files; results are merged into the snapshot only after
/// all per-file work completes, so no two workers ever write the same key.
pub struct SnapshotEngine;

/// Result of examining one file against the previous snapshot.
struct FileOutcome {
    path: CanonicalPath,
    info: FileInfo,
    refs: BTreeSet<CanonicalPath>,
    changed: bool,
    semantic: Option<Vec<Diagnostic>>,
    emit: Option<Vec<Diagnostic>>,
    emit_signature: Option<ContentHash>,
}

impl SnapshotEngine {
    /// Builds the snapshot for `program`, reusing whatever `previous`
    /// still covers.
    ///
    /// `previous` is `None` on a first or non-incremental build, in which
    /// case every file is considered changed.
    pub fn build(program: &CompiledProgram, previous: Option<&Snapshot>) -> Snapshot {
        let new_paths: BTreeSet<CanonicalPath> =
            program.files.iter().map(|f| f.path.clone()).collect();

        let outcomes: Vec<FileOutcome> = program
            .files
            .par_iter()
            .map(|file| Self::examine_file(file, program, previous, &new_paths))
            .collect();

        let mut snapshot = Snapshot {
            options: program.options.clone(),
            file_infos: BTreeMap::new(),
            changed_files: BTreeSet::new(),
            referenced: BTreeMap::new(),
            semantic_diagnostics: BTreeMap::new(),
            emit_diagnostics: BTreeMap::new(),
            emit_signatures: BTreeMap::new(),
            pending_emit: BTreeMap::new(),
            buildinfo_rewrite_pending: false,
            latest_changed_declaration: None,
        };

        for outcome in outcomes {
            if outcome.changed {
                snapshot.changed_files.insert(outcome.path.clone());
            }
            if !outcome.refs.is_empty() {
                snapshot.referenced.insert(outcome.path.clone(), outcome.refs);
            }
            if let Some(diags) = outcome.semantic {
                snapshot
                    .semantic_diagnostics
                    .insert(outcome.path.clone(), diags);
            }
            if let Some(diags) = outcome.emit {
                snapshot.emit_diagnostics.insert(outcome.path.clone(), diags);
            }
            if let Some(sig) = outcome.emit_signature {
                snapshot.emit_signatures.insert(outcome.path.clone(), sig);
            }
            snapshot.file_infos.insert(outcome.path, outcome.info);
        }

        Self::apply_deletions(&mut snapshot, program, previous, &new_paths);
        Self::compute_pending_emit(&mut snapshot, program, previous, &new_paths);
        Self::compute_pending_check(&mut snapshot, program, previous);
        Self::track_latest_declaration(&mut snapshot, program, previous);

        snapshot
    }

    /// Examines one file: hashes it, gathers its reference set, and
    /// decides change status and carry-forward against `previous`.
    fn examine_file(
        file: &ProgramFile,
        program: &CompiledProgram,
        previous: Option<&Snapshot>,
        new_paths: &BTreeSet<CanonicalPath>,
    ) -> FileOutcome {
        let version = ContentHash::from_text(&file.text);
        let affects_global_scope = file.affects_global_scope();
        let refs: BTreeSet<CanonicalPath> = file.references.iter().cloned().collect();

        let old_info = previous.and_then(|prev| prev.file_infos.get(&file.path));

        let changed = match (previous, old_info) {
            (Some(prev), Some(old)) => {
                let old_refs = prev
                    .referenced
                    .get(&file.path)
                    .cloned()
                    .unwrap_or_default();
                old.version != version
                    || old.affects_global_scope != affects_global_scope
                    || old.implied_format != file.implied_format
                    || old_refs != refs
                    || refs
                        .iter()
                        .any(|r| prev.file_infos.contains_key(r) && !new_paths.contains(r))
            }
            // Unseen file, or no previous snapshot at all
            _ => true,
        };

        let (signature, semantic, emit, emit_signature) = if changed {
            let signature = file.declaration_hash.unwrap_or(version);
            let emit_signature = if program.options.composite {
                file.declaration_hash
            } else {
                None
            };
            (
                signature,
                file.semantic_diagnostics.clone(),
                file.emit_diagnostics.clone(),
                emit_signature,
            )
        } else {
            let prev = previous.expect("unchanged file implies a previous snapshot");
            let old = old_info.expect("unchanged file implies an old file info");

            let lib_compatible = !(file.is_declaration || file.is_lib)
                || !options::affects_lib_checking(&prev.options, &program.options);
            let diagnostics_reusable = lib_compatible
                && !options::affects_semantic_diagnostics(&prev.options, &program.options);

            let semantic = if diagnostics_reusable {
                prev.semantic_diagnostics.get(&file.path).cloned()
            } else {
                None
            }
            .or_else(|| file.semantic_diagnostics.clone());

            let emit = if diagnostics_reusable {
                prev.emit_diagnostics.get(&file.path).cloned()
            } else {
                None
            }
            .or_else(|| file.emit_diagnostics.clone());

            let emit_signature = if program.options.composite
                && !options::affects_declaration_path(&prev.options, &program.options)
            {
                prev.emit_signatures.get(&file.path).copied()
            } else {
                None
            };

            (old.signature, semantic, emit, emit_signature)
        };

        FileOutcome {
            path: file.path.clone(),
            info: FileInfo {
                version,
                signature,
                affects_global_scope,
                implied_format: file.implied_format,
            },
            refs,
            changed,
            semantic,
            emit,
            emit_signature,
        }
    }

    /// Handles files present in the previous snapshot but absent from the
    /// new program.
    ///
    /// Removing a file that affected the global scope can change meaning
    /// anywhere, so every file in the new program is marked changed. Any
    /// deletion at all requires the persisted build info to be rewritten.
    fn apply_deletions(
        snapshot: &mut Snapshot,
        _program: &CompiledProgram,
        previous: Option<&Snapshot>,
        new_paths: &BTreeSet<CanonicalPath>,
    ) {
        let Some(prev) = previous else { return };

        let mut any_deleted = false;
        let mut global_deleted = false;
        for (path, info) in &prev.file_infos {
            if !new_paths.contains(path) {
                any_deleted = true;
                if info.affects_global_scope {
                    global_deleted = true;
                }
            }
        }

        if global_deleted {
            snapshot.changed_files = new_paths.clone();
        }
        if any_deleted {
            snapshot.buildinfo_rewrite_pending = true;
        }
    }

    /// Schedules emission owed because of option changes, and carries
    /// forward emission still owed from an earlier build.
    fn compute_pending_emit(
        snapshot: &mut Snapshot,
        program: &CompiledProgram,
        previous: Option<&Snapshot>,
        new_paths: &BTreeSet<CanonicalPath>,
    ) {
        let Some(prev) = previous else { return };

        // Emission owed from an earlier build and still unpaid; changed
        // files get full emission through the normal path.
        for (path, kind) in &prev.pending_emit {
            if new_paths.contains(path) && !snapshot.changed_files.contains(path) {
                snapshot.pending_emit.insert(path.clone(), *kind);
            }
        }

        if options::affects_emit_globally(&prev.options, &program.options) {
            for path in new_paths {
                snapshot.pending_emit.insert(path.clone(), EmitKind::All);
            }
            snapshot.buildinfo_rewrite_pending = true;
        } else if let Some(kind) = options::emit_kind_delta(&prev.options, &program.options) {
            let mut scheduled = false;
            for path in new_paths {
                if snapshot.changed_files.contains(path) {
                    continue;
                }
                snapshot
                    .pending_emit
                    .entry(path.clone())
                    .and_modify(|existing| *existing = existing.union(kind))
                    .or_insert(kind);
                scheduled = true;
            }
            if scheduled {
                snapshot.buildinfo_rewrite_pending = true;
            }
        }
    }

    /// Flags a build-info rewrite when the deferred-checking flag flipped
    /// and reusable diagnostics don't cover the whole file set.
    fn compute_pending_check(
        snapshot: &mut Snapshot,
        program: &CompiledProgram,
        previous: Option<&Snapshot>,
    ) {
        let Some(prev) = previous else { return };

        if snapshot.semantic_diagnostics.len() < program.files.len()
            && prev.options.defer_type_checking != program.options.defer_type_checking
        {
            snapshot.buildinfo_rewrite_pending = true;
        }
    }

    /// Tracks the most recently changed declaration-producing file for
    /// composite projects.
    fn track_latest_declaration(
        snapshot: &mut Snapshot,
        program: &CompiledProgram,
        previous: Option<&Snapshot>,
    ) {
        if !program.options.composite {
            return;
        }

        let mut latest = previous.and_then(|prev| prev.latest_changed_declaration.clone());
        for path in &snapshot.changed_files {
            let Some(file) = program.file(path) else { continue };
            if file.is_declaration {
                continue;
            }
            let new_signature = snapshot
                .file_infos
                .get(path)
                .map(|info| info.signature);
            let old_signature = previous
                .and_then(|prev| prev.file_infos.get(path))
                .map(|info| info.signature);
            if new_signature != old_signature {
                latest = Some(path.clone());
            }
        }
        snapshot.latest_changed_declaration = latest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_config::CompilerOptions;
    use strata_diagnostics::{codes, Diagnostic};

    fn path(p: &str) -> CanonicalPath {
        CanonicalPath::from_canonical(p)
    }

    fn file(p: &str, text: &str) -> ProgramFile {
        ProgramFile::new(path(p), text.to_string())
    }

    fn program(files: Vec<ProgramFile>) -> CompiledProgram {
        CompiledProgram::new(CompilerOptions::default(), files)
    }

    #[test]
    fn first_build_marks_everything_changed() {
        let prog = program(vec![file("/p/a.st", "a"), file("/p/b.st", "b")]);
        let snapshot = SnapshotEngine::build(&prog, None);

        assert_eq!(snapshot.changed_files.len(), 2);
        assert_eq!(snapshot.file_infos.len(), 2);
        assert!(snapshot.pending_emit.is_empty());
        assert!(!snapshot.buildinfo_rewrite_pending);
    }

    #[test]
    fn first_build_signature_equals_version_without_declarations() {
        let prog = program(vec![file("/p/a.st", "a")]);
        let snapshot = SnapshotEngine::build(&prog, None);
        let info = &snapshot.file_infos[&path("/p/a.st")];
        assert_eq!(info.signature, info.version);
    }

    #[test]
    fn idempotent_rerun_is_clean() {
        let prog = program(vec![file("/p/a.st", "a"), file("/p/b.st", "b")]);
        let first = SnapshotEngine::build(&prog, None);
        let second = SnapshotEngine::build(&prog, Some(&first));

        assert!(second.changed_files.is_empty());
        assert!(second.pending_emit.is_empty());
        assert!(!second.buildinfo_rewrite_pending);
        assert_eq!(second.file_infos, first.file_infos);
    }

    #[test]
    fn content_change_detected() {
        let first = SnapshotEngine::build(&program(vec![file("/p/a.st", "v1")]), None);
        let second =
            SnapshotEngine::build(&program(vec![file("/p/a.st", "v2")]), Some(&first));

        assert!(second.changed_files.contains(&path("/p/a.st")));
    }

    #[test]
    fn new_file_detected() {
        let first = SnapshotEngine::build(&program(vec![file("/p/a.st", "a")]), None);
        let second = SnapshotEngine::build(
            &program(vec![file("/p/a.st", "a"), file("/p/b.st", "b")]),
            Some(&first),
        );

        assert_eq!(
            second.changed_files.iter().collect::<Vec<_>>(),
            vec![&path("/p/b.st")]
        );
    }

    #[test]
    fn reference_set_change_detected() {
        let mut a = file("/p/a.st", "import b");
        a.references = vec![path("/p/b.st")];
        let b = file("/p/b.st", "b");
        let first = SnapshotEngine::build(&program(vec![a, b.clone()]), None);

        // Same text, different reference set
        let a2 = file("/p/a.st", "import b");
        let second = SnapshotEngine::build(&program(vec![a2, b]), Some(&first));
        assert!(second.changed_files.contains(&path("/p/a.st")));
    }

    #[test]
    fn reference_to_deleted_file_marks_referencer_changed() {
        let mut a = file("/p/a.st", "import b");
        a.references = vec![path("/p/b.st")];
        let b = file("/p/b.st", "b");
        let first = SnapshotEngine::build(&program(vec![a.clone(), b]), None);

        // b.st is gone; a.st still references it (unresolved now)
        let second = SnapshotEngine::build(&program(vec![a]), Some(&first));
        assert!(second.changed_files.contains(&path("/p/a.st")));
        assert!(second.buildinfo_rewrite_pending);
    }

    #[test]
    fn global_scope_deletion_cascades_to_every_file() {
        let mut global = file("/p/globals.st", "var g = 1;");
        global.is_module = false;
        let x = file("/p/x.st", "x");
        let y = file("/p/y.st", "y");
        let first = SnapshotEngine::build(&program(vec![global, x.clone(), y.clone()]), None);

        let second = SnapshotEngine::build(&program(vec![x, y]), Some(&first));
        let all: BTreeSet<_> = [path("/p/x.st"), path("/p/y.st")].into_iter().collect();
        assert_eq!(second.changed_files, all);
        assert!(second.buildinfo_rewrite_pending);
    }

    #[test]
    fn non_global_deletion_only_flags_rewrite() {
        let a = file("/p/a.st", "a");
        let b = file("/p/b.st", "b");
        let first = SnapshotEngine::build(&program(vec![a.clone(), b]), None);

        let second = SnapshotEngine::build(&program(vec![a]), Some(&first));
        assert!(second.changed_files.is_empty());
        assert!(second.buildinfo_rewrite_pending);
    }

    #[test]
    fn semantic_diagnostics_carried_for_unchanged_files() {
        let mut a = file("/p/a.st", "a");
        a.semantic_diagnostics = Some(vec![Diagnostic::warning(
            codes::CONFIG_INVALID,
            "suspicious",
        )]);
        let first = SnapshotEngine::build(&program(vec![a]), None);

        // Second compilation did not re-check the file
        let mut a2 = file("/p/a.st", "a");
        a2.semantic_diagnostics = None;
        let second = SnapshotEngine::build(&program(vec![a2]), Some(&first));

        let carried = &second.semantic_diagnostics[&path("/p/a.st")];
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].message, "suspicious");
    }

    #[test]
    fn semantic_option_change_drops_carried_diagnostics() {
        let mut a = file("/p/a.st", "a");
        a.semantic_diagnostics = Some(vec![Diagnostic::warning(codes::CONFIG_INVALID, "old")]);
        let first = SnapshotEngine::build(&program(vec![a]), None);

        let mut a2 = file("/p/a.st", "a");
        a2.semantic_diagnostics = None;
        let mut prog = program(vec![a2]);
        prog.options.strict = true;
        let second = SnapshotEngine::build(&prog, Some(&first));

        assert!(!second.semantic_diagnostics.contains_key(&path("/p/a.st")));
        // The file itself is not marked changed by an option change
        assert!(second.changed_files.is_empty());
    }

    #[test]
    fn skip_lib_change_drops_declaration_file_diagnostics_only() {
        let mut decl = file("/p/lib.d.st", "declare const x;");
        decl.is_declaration = true;
        decl.semantic_diagnostics = Some(vec![]);
        let mut src = file("/p/a.st", "a");
        src.semantic_diagnostics = Some(vec![]);
        let first = SnapshotEngine::build(&program(vec![decl, src]), None);

        let mut decl2 = file("/p/lib.d.st", "declare const x;");
        decl2.is_declaration = true;
        decl2.semantic_diagnostics = None;
        let mut src2 = file("/p/a.st", "a");
        src2.semantic_diagnostics = None;
        let mut prog = program(vec![decl2, src2]);
        prog.options.skip_lib_check = true;
        let second = SnapshotEngine::build(&prog, Some(&first));

        assert!(!second.semantic_diagnostics.contains_key(&path("/p/lib.d.st")));
        assert!(second.semantic_diagnostics.contains_key(&path("/p/a.st")));
    }

    #[test]
    fn emit_signature_carried_byte_identical_for_composite() {
        let mut a = file("/p/a.st", "a");
        a.declaration_hash = Some(ContentHash::from_bytes(b"declaration of a"));
        let mut prog = program(vec![a]);
        prog.options.composite = true;
        prog.options.declaration = true;
        let first = SnapshotEngine::build(&prog, None);
        let original = first.emit_signatures[&path("/p/a.st")];

        // Unchanged file, unchanged declaration-path options: identity carry
        let mut a2 = file("/p/a.st", "a");
        a2.declaration_hash = None;
        let mut prog2 = program(vec![a2]);
        prog2.options.composite = true;
        prog2.options.declaration = true;
        let second = SnapshotEngine::build(&prog2, Some(&first));

        assert_eq!(second.emit_signatures[&path("/p/a.st")], original);
    }

    #[test]
    fn declaration_path_change_drops_emit_signatures() {
        let mut a = file("/p/a.st", "a");
        a.declaration_hash = Some(ContentHash::from_bytes(b"declaration of a"));
        let mut prog = program(vec![a]);
        prog.options.composite = true;
        prog.options.declaration = true;
        let first = SnapshotEngine::build(&prog, None);

        let mut a2 = file("/p/a.st", "a");
        a2.declaration_hash = None;
        let mut prog2 = prog.clone();
        prog2.files = vec![a2];
        prog2.options.out_dir = Some("dist".to_string());
        let second = SnapshotEngine::build(&prog2, Some(&first));

        // out_dir change is globally emit-affecting, so everything is
        // rescheduled and signatures are not carried
        assert!(!second.emit_signatures.contains_key(&path("/p/a.st")));
        assert_eq!(second.pending_emit[&path("/p/a.st")], EmitKind::All);
        assert!(second.buildinfo_rewrite_pending);
    }

    #[test]
    fn enabling_declaration_schedules_narrow_emit_for_unchanged_files() {
        let a = file("/p/a.st", "a");
        let b = file("/p/b.st", "changed later");
        let first = SnapshotEngine::build(&program(vec![a.clone(), b]), None);

        let b2 = file("/p/b.st", "changed now");
        let mut prog = program(vec![a, b2]);
        prog.options.declaration = true;
        let second = SnapshotEngine::build(&prog, Some(&first));

        // Unchanged a.st owes declarations; changed b.st goes through the
        // normal full-emission path and is not scheduled
        assert_eq!(
            second.pending_emit[&path("/p/a.st")],
            EmitKind::Declarations
        );
        assert!(!second.pending_emit.contains_key(&path("/p/b.st")));
        assert!(second.buildinfo_rewrite_pending);
    }

    #[test]
    fn carried_pending_emit_survives_until_paid() {
        let a = file("/p/a.st", "a");
        let first = SnapshotEngine::build(&program(vec![a.clone()]), None);

        let mut prog = program(vec![a.clone()]);
        prog.options.declaration = true;
        let second = SnapshotEngine::build(&prog, Some(&first));
        assert_eq!(
            second.pending_emit[&path("/p/a.st")],
            EmitKind::Declarations
        );

        // Next build with the same options: the debt is carried forward
        let mut prog3 = program(vec![a]);
        prog3.options.declaration = true;
        let third = SnapshotEngine::build(&prog3, Some(&second));
        assert_eq!(
            third.pending_emit[&path("/p/a.st")],
            EmitKind::Declarations
        );
    }

    #[test]
    fn defer_flip_flags_rewrite_when_coverage_incomplete() {
        let mut a = file("/p/a.st", "a");
        a.semantic_diagnostics = None; // never checked
        let mut prog = program(vec![a]);
        prog.options.defer_type_checking = true;
        let first = SnapshotEngine::build(&prog, None);
        assert!(!first.semantic_diagnostics.contains_key(&path("/p/a.st")));

        let mut a2 = file("/p/a.st", "a");
        a2.semantic_diagnostics = None;
        let prog2 = program(vec![a2]); // defer_type_checking back to false
        let second = SnapshotEngine::build(&prog2, Some(&first));
        assert!(second.buildinfo_rewrite_pending);
    }

    #[test]
    fn latest_changed_declaration_tracked_for_composite() {
        let a = file("/p/a.st", "a");
        let b = file("/p/b.st", "b");
        let mut prog = program(vec![a.clone(), b]);
        prog.options.composite = true;
        prog.options.declaration = true;
        let first = SnapshotEngine::build(&prog, None);
        // All files changed on first build; the last in sorted order wins
        assert_eq!(first.latest_changed_declaration, Some(path("/p/b.st")));

        // Only a.st changes next time
        let a2 = file("/p/a.st", "a changed");
        let b2 = file("/p/b.st", "b");
        let mut prog2 = program(vec![a2, b2]);
        prog2.options.composite = true;
        prog2.options.declaration = true;
        let second = SnapshotEngine::build(&prog2, Some(&first));
        assert_eq!(second.latest_changed_declaration, Some(path("/p/a.st")));
    }

    #[test]
    fn latest_changed_declaration_carried_when_nothing_changes() {
        let a = file("/p/a.st", "a");
        let mut prog = program(vec![a]);
        prog.options.composite = true;
        prog.options.declaration = true;
        let first = SnapshotEngine::build(&prog, None);
        let second = SnapshotEngine::build(&prog, Some(&first));
        assert_eq!(
            second.latest_changed_declaration,
            first.latest_changed_declaration
        );
    }

    #[test]
    fn unchanged_signature_for_changed_file_with_same_declaration_output() {
        // A body-only edit: version changes, declaration output does not
        let decl_hash = ContentHash::from_bytes(b"declaration of a");
        let mut a = file("/p/a.st", "v1");
        a.declaration_hash = Some(decl_hash);
        let mut prog = program(vec![a]);
        prog.options.composite = true;
        prog.options.declaration = true;
        let first = SnapshotEngine::build(&prog, None);

        let mut a2 = file("/p/a.st", "v2");
        a2.declaration_hash = Some(decl_hash);
        let mut prog2 = program(vec![a2]);
        prog2.options.composite = true;
        prog2.options.declaration = true;
        let second = SnapshotEngine::build(&prog2, Some(&first));

        let old = &first.file_infos[&path("/p/a.st")];
        let new = &second.file_infos[&path("/p/a.st")];
        assert_ne!(old.version, new.version);
        assert_eq!(old.signature, new.signature, "signature lags version");
        // No signature movement means the latest-changed tracker stays put
        assert_eq!(
            second.latest_changed_declaration,
            first.latest_changed_declaration
        );
    }
}

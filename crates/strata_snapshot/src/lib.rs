//! The incremental snapshot engine.
//!
//! Given the freshly compiled program for a project and (optionally) the
//! snapshot of its previous build, the engine computes the new
//! [`Snapshot`]: which files changed, which diagnostics and emit artifacts
//! can be carried forward unchanged, and which files still owe emission.
//! Any ambiguity in change detection resolves to "changed"; the engine
//! never fails a build.
//!
//! Snapshots are persisted between builds inside a [`BuildInfo`] manifest.

#![warn(missing_docs)]

pub mod build_info;
pub mod engine;
pub mod options;
pub mod program;
pub mod snapshot;

pub use build_info::{BuildInfo, BUILD_INFO_VERSION};
pub use engine::SnapshotEngine;
pub use program::{CompiledProgram, ProgramFile};
pub use snapshot::{EmitKind, FileInfo, Snapshot};

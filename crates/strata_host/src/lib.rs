//! The on-disk build host.
//!
//! [`FsHost`] implements the scheduler's host interface against the real
//! filesystem: TOML configuration loading through the run-persistent config
//! cache, memoized file timestamps, line-level reference scanning of source
//! files, stamp-style output emission, and build-info persistence. Syntax
//! trees and type checking live in the compiler proper; the conventions
//! here are deliberately shallow so the orchestrator can be driven end to
//! end.

#![warn(missing_docs)]

pub mod fs_host;
pub mod scan;

pub use fs_host::FsHost;
pub use scan::{scan, ScannedFacts};

//! Shared foundational types used across the Strata build orchestrator.
//!
//! This crate provides core types including content hashing, canonical
//! project paths, and the one-shot completion latch used by the scheduler.

#![warn(missing_docs)]

pub mod hash;
pub mod latch;
pub mod path;

pub use hash::ContentHash;
pub use latch::Latch;
pub use path::CanonicalPath;

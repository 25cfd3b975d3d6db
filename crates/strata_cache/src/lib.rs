//! Concurrency-safe keyed caches for the build host.
//!
//! The [`KeyedOnceMap`] is a generic single-flight memoizing store: at most
//! one computation runs per key across all concurrent callers, and failed
//! computations are forgotten so they can be retried. [`HostCaches`]
//! composes several instances with different lifetimes to back the build
//! host's config, document, and mtime lookups.

#![warn(missing_docs)]

pub mod flight;
pub mod host_caches;

pub use flight::KeyedOnceMap;
pub use host_caches::{HostCaches, SharedDocument};

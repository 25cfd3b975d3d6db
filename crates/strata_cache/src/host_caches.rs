//! Composed caches backing the build host, with distinct lifetimes.

use crate::flight::KeyedOnceMap;
use std::sync::Arc;
use std::time::SystemTime;
use strata_common::{CanonicalPath, ContentHash};
use strata_config::{ConfigError, ResolvedProject};

/// A source document shared between projects (a declaration or JSON file
/// referenced by more than one project), read and hashed once per build
/// cycle.
#[derive(Debug)]
pub struct SharedDocument {
    /// Canonical path of the document.
    pub path: CanonicalPath,
    /// The document text.
    pub text: Arc<str>,
    /// Content hash of the text.
    pub hash: ContentHash,
}

impl SharedDocument {
    /// Creates a document from its path and text, hashing the text.
    pub fn new(path: CanonicalPath, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let hash = ContentHash::from_text(&text);
        Self { path, text, hash }
    }
}

/// The host's cache layer: several keyed single-flight stores with
/// different intended lifetimes.
///
/// - The *document* cache lives for one build cycle and avoids re-reading
///   declaration/JSON files that multiple projects share; callers clear it
///   between unrelated build invocations.
/// - The *config* cache persists for an entire orchestrator run (graph
///   discovery plus build/clean execution) so a configuration is parsed at
///   most once regardless of how many dependents reference it. Parse
///   failures are never cached.
/// - The *mtime* cache persists for the run but is invalidated entry by
///   entry whenever the same host writes the file, so a just-written file's
///   timestamp is always re-queried.
///
/// Callers may never observe an entry staler than the most recent write
/// made through the same host instance.
pub struct HostCaches {
    documents: KeyedOnceMap<CanonicalPath, Arc<SharedDocument>>,
    configs: KeyedOnceMap<CanonicalPath, Arc<ResolvedProject>>,
    mtimes: KeyedOnceMap<CanonicalPath, SystemTime>,
}

impl HostCaches {
    /// Creates an empty cache layer.
    pub fn new() -> Self {
        Self {
            documents: KeyedOnceMap::new(),
            configs: KeyedOnceMap::new(),
            mtimes: KeyedOnceMap::new(),
        }
    }

    /// Returns the shared document at `path`, loading it through `read` at
    /// most once per build cycle. Read failures are not cached.
    pub fn document(
        &self,
        path: &CanonicalPath,
        read: impl FnOnce() -> std::io::Result<Arc<SharedDocument>>,
    ) -> std::io::Result<Arc<SharedDocument>> {
        self.documents
            .get_or_try_compute(path.clone(), read)
            .map(|(doc, _)| doc)
    }

    /// Clears the build-cycle document cache.
    ///
    /// Must be called between unrelated build invocations sharing one host.
    pub fn clear_documents(&self) {
        self.documents.clear();
    }

    /// Returns the resolved configuration at `path`, resolving it through
    /// `resolve` at most once per run. Resolution failures are not cached,
    /// so a later explicit load can retry.
    pub fn config(
        &self,
        path: &CanonicalPath,
        resolve: impl FnOnce() -> Result<Arc<ResolvedProject>, ConfigError>,
    ) -> Result<Arc<ResolvedProject>, ConfigError> {
        self.configs
            .get_or_try_compute(path.clone(), resolve)
            .map(|(config, _)| config)
    }

    /// Returns the modification time of `path`, querying through `stat` at
    /// most once since the last write to that path through this host.
    pub fn mtime(
        &self,
        path: &CanonicalPath,
        stat: impl FnOnce() -> std::io::Result<SystemTime>,
    ) -> std::io::Result<SystemTime> {
        self.mtimes
            .get_or_try_compute(path.clone(), stat)
            .map(|(mtime, _)| mtime)
    }

    /// Records that `path` was just written through this host, dropping any
    /// memoized modification time for it.
    pub fn note_file_written(&self, path: &CanonicalPath) {
        self.mtimes.remove(path);
    }
}

impl Default for HostCaches {
    fn default() -> Self {
        Self::new()
    }
}

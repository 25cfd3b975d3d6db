//! Persisted build-info manifests.
//!
//! A build-info file records the snapshot of a project's most recent build
//! as pretty-printed JSON next to the project's outputs. Loading is
//! fail-safe: a missing, corrupt, or version-incompatible file reads as
//! `None`, which simply triggers a full build.

use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format version of the persisted build info. Bump on breaking changes to
/// the snapshot layout; old files then read as incompatible.
pub const BUILD_INFO_VERSION: &str = "1";

/// The persisted record of a project's most recent build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    /// Build-info format version.
    pub version: String,
    /// The snapshot produced by the recorded build.
    pub snapshot: Snapshot,
}

impl BuildInfo {
    /// Wraps a snapshot in a build-info record at the current version.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            version: BUILD_INFO_VERSION.to_string(),
            snapshot,
        }
    }

    /// Loads build info from `path`, returning `None` if the file doesn't
    /// exist, can't be parsed, or was written by an incompatible version.
    pub fn load(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        let info: BuildInfo = serde_json::from_str(&content).ok()?;
        (info.version == BUILD_INFO_VERSION).then_some(info)
    }

    /// Saves this build info to `path`, creating parent directories as
    /// needed.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

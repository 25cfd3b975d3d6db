//! Resolution of a parsed configuration against its on-disk location.

use crate::types::{CompilerOptions, ProjectConfig};
use std::path::PathBuf;
use strata_common::CanonicalPath;

/// A fully resolved project configuration, identified by the canonical
/// path of its `strata.toml`.
///
/// Resolution makes every declared path absolute and canonical so the rest
/// of the orchestrator never touches relative paths. A resolved project is
/// immutable and shared read-only (`Arc`) by every build task that
/// references it.
#[derive(Debug)]
pub struct ResolvedProject {
    /// Canonical path of the configuration file itself.
    pub config_path: CanonicalPath,
    /// The directory containing the configuration file.
    pub root_dir: PathBuf,
    /// The project name.
    pub name: String,
    /// Explicitly listed source files (relative to `root_dir`).
    pub files: Vec<String>,
    /// Directories whose files are all sources (relative to `root_dir`).
    pub include: Vec<String>,
    /// Compiler options, with composite-implied defaults applied.
    pub options: CompilerOptions,
    /// Resolved upstream references, in declaration order.
    pub references: Vec<ResolvedReference>,
}

/// A resolved upstream project reference.
#[derive(Debug, Clone)]
pub struct ResolvedReference {
    /// Canonical path of the referenced project's configuration file.
    pub config_path: CanonicalPath,
    /// Whether the user marked this reference as knowingly circular.
    pub circular: bool,
}

impl ResolvedProject {
    /// The output directory for emitted artifacts (absolute).
    ///
    /// Defaults to `<root_dir>/out` when `options.out_dir` is unset.
    pub fn out_dir(&self) -> PathBuf {
        match &self.options.out_dir {
            Some(dir) => self.root_dir.join(dir),
            None => self.root_dir.join("out"),
        }
    }

    /// The output directory for declaration artifacts (absolute).
    ///
    /// Falls back to [`out_dir`](Self::out_dir) when no separate
    /// declaration directory is configured.
    pub fn declaration_dir(&self) -> PathBuf {
        match &self.options.declaration_dir {
            Some(dir) => self.root_dir.join(dir),
            None => self.out_dir(),
        }
    }

    /// Path of the persisted build-info file for this project.
    pub fn build_info_path(&self) -> PathBuf {
        self.out_dir().join(format!("{}.buildinfo.json", self.name))
    }
}

/// Resolves a parsed configuration against the canonical path it was
/// loaded from.
///
/// Reference paths ending in `.toml` are taken as configuration files;
/// anything else is treated as a project directory and `strata.toml` is
/// appended. `composite = true` implies `declaration = true`, applied here
/// so every consumer sees the effective option set.
pub fn resolve_project(
    config: ProjectConfig,
    config_path: CanonicalPath,
    case_sensitive: bool,
) -> ResolvedProject {
    let root_dir = config_path.parent_dir();

    let references = config
        .references
        .iter()
        .map(|r| {
            let file = if r.path.ends_with(".toml") {
                r.path.clone()
            } else {
                format!("{}/{}", r.path.trim_end_matches('/'), crate::CONFIG_FILE_NAME)
            };
            ResolvedReference {
                config_path: CanonicalPath::resolve(&file, &root_dir, case_sensitive),
                circular: r.circular,
            }
        })
        .collect();

    let mut options = config.options;
    if options.composite {
        options.declaration = true;
    }

    ResolvedProject {
        config_path,
        root_dir,
        name: config.project.name,
        files: config.files,
        include: config.include,
        options,
        references,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn resolve(toml: &str, at: &str) -> ResolvedProject {
        let config = load_config_from_str(toml).unwrap();
        resolve_project(config, CanonicalPath::from_canonical(at), true)
    }

    #[test]
    fn reference_directory_gets_config_appended() {
        let project = resolve(
            r#"
[project]
name = "app"

[[references]]
path = "../lib"
"#,
            "/proj/app/strata.toml",
        );
        assert_eq!(
            project.references[0].config_path.as_str(),
            "/proj/lib/strata.toml"
        );
    }

    #[test]
    fn reference_toml_path_used_directly() {
        let project = resolve(
            r#"
[project]
name = "app"

[[references]]
path = "../lib/custom.toml"
"#,
            "/proj/app/strata.toml",
        );
        assert_eq!(
            project.references[0].config_path.as_str(),
            "/proj/lib/custom.toml"
        );
    }

    #[test]
    fn reference_order_is_declaration_order() {
        let project = resolve(
            r#"
[project]
name = "app"

[[references]]
path = "../b"

[[references]]
path = "../a"
"#,
            "/proj/app/strata.toml",
        );
        assert_eq!(
            project.references[0].config_path.as_str(),
            "/proj/b/strata.toml"
        );
        assert_eq!(
            project.references[1].config_path.as_str(),
            "/proj/a/strata.toml"
        );
    }

    #[test]
    fn composite_implies_declaration() {
        let project = resolve(
            r#"
[project]
name = "lib"

[options]
composite = true
"#,
            "/proj/lib/strata.toml",
        );
        assert!(project.options.declaration);
    }

    #[test]
    fn out_dir_defaults() {
        let project = resolve(
            r#"
[project]
name = "app"
"#,
            "/proj/app/strata.toml",
        );
        assert_eq!(project.out_dir(), PathBuf::from("/proj/app/out"));
        assert_eq!(project.declaration_dir(), PathBuf::from("/proj/app/out"));
    }

    #[test]
    fn out_dir_and_declaration_dir_configured() {
        let project = resolve(
            r#"
[project]
name = "app"

[options]
declaration = true
out_dir = "dist"
declaration_dir = "types"
"#,
            "/proj/app/strata.toml",
        );
        assert_eq!(project.out_dir(), PathBuf::from("/proj/app/dist"));
        assert_eq!(project.declaration_dir(), PathBuf::from("/proj/app/types"));
    }

    #[test]
    fn build_info_path_under_out_dir() {
        let project = resolve(
            r#"
[project]
name = "app"
"#,
            "/proj/app/strata.toml",
        );
        assert_eq!(
            project.build_info_path(),
            PathBuf::from("/proj/app/out/app.buildinfo.json")
        );
    }
}

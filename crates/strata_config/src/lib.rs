//! Project configuration loading for Strata.
//!
//! Each project in a solution is described by a `strata.toml` file declaring
//! its name, source files, compiler options, and references to upstream
//! projects. This crate parses and validates those files and resolves them
//! against their on-disk location into shareable [`ResolvedProject`] values.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_project, ResolvedProject, ResolvedReference};
pub use types::{CompilerOptions, ModuleFormat, ProjectConfig, ProjectMeta, ReferenceSpec};

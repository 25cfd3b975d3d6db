//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the configuration file within a project directory.
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Loads and validates a `strata.toml` configuration from a path.
///
/// `path` may be the configuration file itself or a directory containing
/// one.
pub fn load_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = if path.is_dir() {
        path.join(CONFIG_FILE_NAME)
    } else {
        path.to_path_buf()
    };
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `strata.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and option combinations are
/// consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.options.declaration_dir.is_some() && !config.options.declaration {
        return Err(ConfigError::ValidationError(
            "options.declaration_dir requires options.declaration = true".to_string(),
        ));
    }
    for reference in &config.references {
        if reference.path.is_empty() {
            return Err(ConfigError::MissingField("references.path".to_string()));
        }
    }
    Ok(())
}

//! Global config file source: $XDG_CONFIG_HOME/rigging/config.toml, falling
//! back to ~/.config/rigging/config.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Path to global config file.
pub fn global_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rigging").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Add the global config file at `path` to the builder if it exists.
pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    path: Option<&Path>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if let Some(path) = path {
        if path.exists() {
            let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            builder = builder.add_source(File::from(canonical).required(false));
        } else {
            debug!(
                config_path = %path.display(),
                "Global configuration file not found, using defaults"
            );
        }
    }
    Ok(builder)
}

//! Configuration loading entry point.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::RiggingConfig;
use crate::error::KernelError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`RiggingConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace: defaults, global file, workspace
    /// file, then `RIGGING__*` environment overrides.
    pub fn load(workspace_root: &Path) -> Result<RiggingConfig, KernelError> {
        Self::load_from_sources(Self::xdg_config_path().as_deref(), Some(workspace_root))
    }

    /// Load with an explicit global file and optional workspace.
    pub fn load_from_sources(
        global_file: Option<&Path>,
        workspace_root: Option<&Path>,
    ) -> Result<RiggingConfig, KernelError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = global_file::add_to_builder(builder, global_file)?;
        if let Some(root) = workspace_root {
            builder = workspace_file::add_to_builder(builder, root)?;
        }
        builder = merge_policy::add_env_overrides(builder);

        let config: RiggingConfig = builder.build()?.try_deserialize()?;
        debug!(
            environments = config.environments.len(),
            modules = config.modules.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Load a single file on top of the defaults. The file must exist.
    pub fn load_from_file(path: &Path) -> Result<RiggingConfig, KernelError> {
        if !path.exists() {
            return Err(KernelError::ConfigError(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let config = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Path of the global configuration file, if a home directory is known.
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

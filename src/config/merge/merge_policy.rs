//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Prefix of environment variable overrides, e.g. `RIGGING__KERNEL__DEFAULT_OPERATION`.
pub const ENV_PREFIX: &str = "RIGGING";

/// Separator between nested keys in environment variable overrides.
pub const ENV_SEPARATOR: &str = "__";

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("kernel.default_operation", "deploy")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")
}

/// Add environment variable overrides, which win over every file source.
pub fn add_env_overrides(
    builder: ConfigBuilder<config::builder::DefaultState>,
) -> ConfigBuilder<config::builder::DefaultState> {
    builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR),
    )
}

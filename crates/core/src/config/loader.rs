use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Serialize;
use std::path::Path;

use super::{types::BatchConfig, ConfigError};

/// Prefix of environment variables that override configuration keys.
pub const ENV_PREFIX: &str = "RULEBATCH_";

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<BatchConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::from(Serialized::defaults(BatchConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from defaults, an optional file, the environment and
/// finally `overrides` (typically command line flags with unset values
/// skipped during serialization).
pub fn load_layered_config<T: Serialize>(
    path: Option<&Path>,
    overrides: &T,
) -> Result<BatchConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(BatchConfig::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(overrides))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<BatchConfig, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

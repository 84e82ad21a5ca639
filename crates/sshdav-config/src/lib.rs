mod defaults;
mod endpoint;
mod env;
pub mod types;
mod validation;

use std::path::Path;

pub use defaults::DEFAULT_SSH_PROGRAM;
pub use endpoint::{SshEndpoint, WebdavEndpoint};
pub use types::*;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Missing environment variables: {0:?}")]
    MissingEnvVars(Vec<String>),

    #[error("Invalid endpoint {0:?}: {1}")]
    InvalidEndpoint(String, String),

    #[error("Invalid ssh option {0:?}: expected KEY=VALUE")]
    InvalidSshOption(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeConfig {
    /// Parse a bridge configuration from a YAML string.
    /// `${VAR_NAME}` references are replaced with environment values first.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let interpolated = env::interpolate_env(yaml)?;
        if interpolated.trim().is_empty() {
            return Ok(BridgeConfig::default());
        }
        Ok(serde_yaml::from_str(&interpolated)?)
    }

    /// Load a bridge configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

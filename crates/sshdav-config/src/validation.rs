use crate::types::BridgeConfig;
use crate::ConfigError;

impl BridgeConfig {
    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.ssh.program.trim().is_empty() {
            errors.push(ConfigError::InvalidConfig(
                "ssh.program must not be empty".to_string(),
            ));
        }

        for option in &self.ssh.options {
            if !is_valid_ssh_option(option) {
                errors.push(ConfigError::InvalidSshOption(option.clone()));
            }
        }

        for (field, value) in [("ssh.config", &self.ssh.config), ("ssh.identity", &self.ssh.identity)] {
            if let Some(path) = value {
                if path.starts_with('-') {
                    errors.push(ConfigError::InvalidConfig(format!(
                        "{field} must be a file path, got {path:?}"
                    )));
                }
            }
        }

        errors
    }

    /// Validate and return the first error, if any.
    pub fn validate_or_err(&self) -> Result<(), ConfigError> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// `KEY=VALUE` with a non-empty key made of non-whitespace characters.
fn is_valid_ssh_option(option: &str) -> bool {
    match option.split_once('=') {
        Some((key, _)) => !key.is_empty() && !key.chars().any(char::is_whitespace),
        None => false,
    }
}

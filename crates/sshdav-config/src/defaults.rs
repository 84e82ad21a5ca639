use crate::types::BridgeConfig;

/// ssh binary used when neither the config file nor the CLI names one.
pub const DEFAULT_SSH_PROGRAM: &str = "ssh";

pub(crate) fn default_ssh_program() -> String {
    DEFAULT_SSH_PROGRAM.to_string()
}

impl BridgeConfig {
    /// Overlay command-line values on top of this configuration.
    ///
    /// Scalars given on the command line replace file values; options are
    /// appended after the file's options so the CLI gets the last word in ssh.
    pub fn merge_cli(
        &mut self,
        config: Option<String>,
        identity: Option<String>,
        program: Option<String>,
        options: Vec<String>,
    ) {
        if config.is_some() {
            self.ssh.config = config;
        }
        if identity.is_some() {
            self.ssh.identity = identity;
        }
        if let Some(program) = program {
            self.ssh.program = program;
        }
        self.ssh.options.extend(options);
    }

    /// Returns a copy with blank values replaced by defaults.
    pub fn effective(&self) -> BridgeConfig {
        let mut config = self.clone();
        if config.ssh.program.trim().is_empty() {
            config.ssh.program = default_ssh_program();
        }
        config
    }
}

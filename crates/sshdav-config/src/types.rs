use std::fmt;

use serde::{Deserialize, Serialize};

use crate::defaults::default_ssh_program;
use crate::endpoint::SshEndpoint;

/// Root of the optional YAML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// How the `ssh` subprocess is launched.
    pub ssh: SshSettings,
    /// How the WebDAV side is served.
    pub webdav: WebdavSettings,
}

/// Settings for the `ssh` subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SshSettings {
    /// ssh config file, passed as `-F`.
    pub config: Option<String>,
    /// Identity (private key) file, passed as `-i`.
    pub identity: Option<String>,
    /// ssh binary to execute.
    #[serde(default = "default_ssh_program")]
    pub program: String,
    /// Raw `KEY=VALUE` options, each passed as `-o`.
    pub options: Vec<String>,
}

impl Default for SshSettings {
    fn default() -> Self {
        SshSettings {
            config: None,
            identity: None,
            program: default_ssh_program(),
            options: Vec::new(),
        }
    }
}

/// Settings for the WebDAV listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebdavSettings {
    /// Render HTML listings for GET requests on collections.
    pub autoindex: bool,
}

/// A value that must never show up in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Access the underlying value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Everything needed to start the remote session. Built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub endpoint: SshEndpoint,
    pub config_file: Option<String>,
    pub identity_file: Option<String>,
    pub options: Vec<String>,
    pub program: String,
}

impl ConnectionDescriptor {
    /// Combine a parsed endpoint with ssh settings. Empty paths count as unset.
    pub fn new(endpoint: SshEndpoint, ssh: &SshSettings) -> Self {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.is_empty()).cloned();
        ConnectionDescriptor {
            endpoint,
            config_file: non_empty(&ssh.config),
            identity_file: non_empty(&ssh.identity),
            options: ssh.options.clone(),
            program: ssh.program.clone(),
        }
    }
}

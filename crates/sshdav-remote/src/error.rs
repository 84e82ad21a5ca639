/// Errors raised while starting the remote session. All of them are fatal.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LaunchError {
    /// The endpoint carried an inline password.
    #[error("plain-text SSH password is not supported, use public key authentication")]
    PlaintextPassword,

    /// The host would be parsed by ssh as an option.
    #[error("invalid SSH host {0:?}")]
    InvalidHost(String),

    /// The ssh program could not be started.
    #[error("failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// stdin or stdout of the child was not captured.
    #[error("the {0} pipe of the ssh subprocess is unavailable")]
    MissingPipe(&'static str),

    /// The SFTP version exchange did not complete.
    #[error("SFTP handshake failed: {0}")]
    Handshake(String),

    /// Waiting for the child at shutdown failed.
    #[error("failed to wait for the ssh subprocess: {0}")]
    Wait(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_message_mentions_public_key() {
        let msg = LaunchError::PlaintextPassword.to_string();
        assert!(msg.contains("password"));
        assert!(msg.contains("public key"));
    }

    #[test]
    fn test_spawn_message_names_program() {
        let err = LaunchError::Spawn {
            program: "/no/such/ssh".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/no/such/ssh"));
        assert!(msg.contains("not found"));
    }
}

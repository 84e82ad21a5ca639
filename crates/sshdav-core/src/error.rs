/// Errors returned by filesystem operations.
///
/// `Clone` so that an error-shaped handle can hand the same failure back
/// from every call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FsError {
    /// Path does not exist on the remote host.
    #[error("No such file: {0}")]
    NotFound(String),

    /// The remote host refused access.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Any other failure reported by the transfer session.
    #[error("Remote error: {0}")]
    Remote(String),

    /// The call or the file type is not supported by this filesystem.
    #[error("{0}")]
    Unsupported(String),

    /// A mutating operation was attempted.
    #[error("read-only file system")]
    ReadOnly,

    /// Local I/O failure (broken pipe to the subprocess, bad seek, ...).
    #[error("IO error: {0}")]
    Io(String),
}

impl FsError {
    /// True for the errors that a client should see as "does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

impl From<std::io::Error> for FsError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::PermissionDenied(e.to_string()),
            std::io::ErrorKind::Unsupported => FsError::Unsupported(e.to_string()),
            _ => FsError::Io(e.to_string()),
        }
    }
}

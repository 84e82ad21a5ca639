//! File handles handed out by [`RemoteFs::open_file`](crate::RemoteFs::open_file).

use std::fmt;
use std::io::SeekFrom;
use std::sync::Arc;

use tracing::debug;

use crate::error::FsError;
use crate::traits::{FileInfo, RemoteFile, TransferSession};

/// Deferred stat result carried by an [`ErrorFile`].
pub type StatFn = Box<dyn Fn() -> Result<FileInfo, FsError> + Send + Sync>;

/// A handle returned by the filesystem for every open request.
///
/// `Live` wraps an open remote file. `Error` stands in for a path that could
/// not be opened: every I/O method returns the captured failure, but `stat`
/// still reports whatever the filesystem learned about the path.
#[derive(Debug)]
pub enum VirtualFile {
    Live(LiveFile),
    Error(ErrorFile),
}

impl VirtualFile {
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        match self {
            VirtualFile::Live(f) => f.file.read(buf).await,
            VirtualFile::Error(f) => Err(f.err.clone()),
        }
    }

    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        match self {
            VirtualFile::Live(f) => f.file.seek(pos).await,
            VirtualFile::Error(f) => Err(f.err.clone()),
        }
    }

    /// Writes are never accepted.
    pub async fn write(&mut self, _buf: &[u8]) -> Result<usize, FsError> {
        match self {
            VirtualFile::Live(_) => Err(FsError::ReadOnly),
            VirtualFile::Error(f) => Err(f.err.clone()),
        }
    }

    /// List the directory this handle was opened on.
    ///
    /// Only `count <= 0` ("everything at once") is supported.
    pub async fn readdir(&mut self, count: i64) -> Result<Vec<FileInfo>, FsError> {
        match self {
            VirtualFile::Live(f) => f.readdir(count).await,
            VirtualFile::Error(f) => {
                debug!(count, error = %f.err, "readdir on error handle");
                Err(f.err.clone())
            }
        }
    }

    pub async fn stat(&mut self) -> Result<FileInfo, FsError> {
        match self {
            VirtualFile::Live(f) => f.file.stat().await,
            VirtualFile::Error(f) => (f.stat)(),
        }
    }

    /// Release the handle. A no-op for error handles.
    pub async fn close(self) -> Result<(), FsError> {
        match self {
            VirtualFile::Live(mut f) => f.file.close().await,
            VirtualFile::Error(_) => Ok(()),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, VirtualFile::Live(_))
    }

    /// The captured failure, for error handles.
    pub fn error(&self) -> Option<&FsError> {
        match self {
            VirtualFile::Live(_) => None,
            VirtualFile::Error(f) => Some(&f.err),
        }
    }
}

/// An open remote file plus what is needed to list it as a directory.
pub struct LiveFile {
    file: Box<dyn RemoteFile>,
    session: Arc<dyn TransferSession>,
    remote_path: String,
}

impl LiveFile {
    pub(crate) fn new(
        file: Box<dyn RemoteFile>,
        session: Arc<dyn TransferSession>,
        remote_path: String,
    ) -> Self {
        LiveFile {
            file,
            session,
            remote_path,
        }
    }

    async fn readdir(&self, count: i64) -> Result<Vec<FileInfo>, FsError> {
        if count > 0 {
            return Err(FsError::Unsupported(format!(
                "unsupported call: readdir({count})"
            )));
        }
        let entries = self.session.read_dir(&self.remote_path).await?;
        debug!(remote = %self.remote_path, entries = entries.len(), "readdir");
        Ok(entries)
    }
}

impl fmt::Debug for LiveFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveFile")
            .field("remote_path", &self.remote_path)
            .finish_non_exhaustive()
    }
}

/// Placeholder for a path that could not be opened. Holds no remote resource.
pub struct ErrorFile {
    err: FsError,
    stat: StatFn,
}

impl ErrorFile {
    /// An error handle whose `stat` calls `stat`.
    pub fn new(err: FsError, stat: StatFn) -> Self {
        ErrorFile { err, stat }
    }

    /// An error handle whose `stat` replays a fixed result.
    pub fn replaying(err: FsError, stat: Result<FileInfo, FsError>) -> Self {
        ErrorFile::new(err, Box::new(move || stat.clone()))
    }
}

impl fmt::Debug for ErrorFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorFile")
            .field("err", &self.err)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_handle(stat: Result<FileInfo, FsError>) -> VirtualFile {
        VirtualFile::Error(ErrorFile::replaying(
            FsError::Remote("boom".to_string()),
            stat,
        ))
    }

    #[tokio::test]
    async fn test_error_handle_io_returns_captured_error() {
        let mut file = error_handle(Ok(FileInfo::file("a", 1, None)));
        let mut buf = [0u8; 4];

        let expected = FsError::Remote("boom".to_string());
        assert_eq!(file.read(&mut buf).await, Err(expected.clone()));
        assert_eq!(file.seek(SeekFrom::Start(0)).await, Err(expected.clone()));
        assert_eq!(file.write(b"x").await, Err(expected.clone()));
        assert_eq!(file.readdir(0).await, Err(expected.clone()));
        assert_eq!(file.readdir(5).await, Err(expected));
    }

    #[tokio::test]
    async fn test_error_handle_stat_replays() {
        let info = FileInfo::file("a", 1, None);
        let mut ok = error_handle(Ok(info.clone()));
        assert_eq!(ok.stat().await, Ok(info));

        let missing = FsError::NotFound("/a".to_string());
        let mut failed = error_handle(Err(missing.clone()));
        assert_eq!(failed.stat().await, Err(missing.clone()));
        // Replays on every call.
        assert_eq!(failed.stat().await, Err(missing));
    }

    #[tokio::test]
    async fn test_error_handle_close_is_noop() {
        let file = error_handle(Err(FsError::ReadOnly));
        assert!(!file.is_live());
        assert_eq!(file.error(), Some(&FsError::Remote("boom".to_string())));
        assert!(file.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_error_handle_lazy_stat() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut file = VirtualFile::Error(ErrorFile::new(
            FsError::ReadOnly,
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(FileInfo::dir("d", None))
            }),
        ));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(file.stat().await.unwrap().is_dir());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

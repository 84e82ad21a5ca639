use std::io::SeekFrom;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FsError;

const S_IFMT: u32 = 0o170000;
const S_IFIFO: u32 = 0o010000;
const S_IFCHR: u32 = 0o020000;
const S_IFDIR: u32 = 0o040000;
const S_IFBLK: u32 = 0o060000;
const S_IFREG: u32 = 0o100000;
const S_IFLNK: u32 = 0o120000;

/// Metadata about a remote file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name of the entry.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// POSIX `st_mode`, file type bits included.
    pub mode: u32,
    /// Last modification time.
    pub modified: Option<DateTime<Utc>>,
}

impl FileInfo {
    /// Regular file with `0644` permissions.
    pub fn file(name: impl Into<String>, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        FileInfo {
            name: name.into(),
            size,
            mode: S_IFREG | 0o644,
            modified,
        }
    }

    /// Directory with `0755` permissions.
    pub fn dir(name: impl Into<String>, modified: Option<DateTime<Utc>>) -> Self {
        FileInfo {
            name: name.into(),
            size: 0,
            mode: S_IFDIR | 0o755,
            modified,
        }
    }

    /// Named pipe with `0644` permissions.
    pub fn fifo(name: impl Into<String>) -> Self {
        FileInfo {
            name: name.into(),
            size: 0,
            mode: S_IFIFO | 0o644,
            modified: None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    pub fn is_file(&self) -> bool {
        self.mode & S_IFMT == S_IFREG
    }

    pub fn is_symlink(&self) -> bool {
        self.mode & S_IFMT == S_IFLNK
    }

    /// Named pipes and block/character devices. Opening one can block forever.
    pub fn is_special(&self) -> bool {
        matches!(self.mode & S_IFMT, S_IFIFO | S_IFCHR | S_IFBLK)
    }

    /// Symbolic link as `lstat` reports it; `size` is the target path length.
    pub fn symlink(name: impl Into<String>, size: u64) -> Self {
        FileInfo {
            name: name.into(),
            size,
            mode: S_IFLNK | 0o777,
            modified: None,
        }
    }

    /// The same entry as an empty regular file, for a link whose target
    /// cannot be reached. Permission bits are kept.
    pub fn unresolved_link(&self) -> Self {
        FileInfo {
            name: self.name.clone(),
            size: 0,
            mode: (self.mode & !S_IFMT) | S_IFREG,
            modified: self.modified,
        }
    }
}

/// How a file is being opened. Anything beyond `read` is refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        OpenFlags {
            read: true,
            ..Default::default()
        }
    }

    /// True if the caller intends to modify the file.
    pub fn wants_write(&self) -> bool {
        self.write || self.append || self.truncate || self.create || self.create_new
    }
}

/// A live connection to the remote filesystem.
///
/// One session is shared by every request the server handles, so
/// implementations must tolerate concurrent calls without outside locking.
#[async_trait]
pub trait TransferSession: Send + Sync + 'static {
    /// Metadata for a path, following symlinks.
    async fn stat(&self, path: &str) -> Result<FileInfo, FsError>;

    /// Open a file for reading.
    async fn open(&self, path: &str) -> Result<Box<dyn RemoteFile>, FsError>;

    /// Every entry of a directory, excluding `.` and `..`.
    async fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>, FsError>;

    /// Terminate the session.
    async fn close(&self) -> Result<(), FsError>;
}

/// A file opened through a [`TransferSession`]. Each has its own cursor.
#[async_trait]
pub trait RemoteFile: Send + Sync {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError>;

    /// Metadata of the open file.
    async fn stat(&mut self) -> Result<FileInfo, FsError>;

    /// Release the remote handle.
    async fn close(&mut self) -> Result<(), FsError>;
}

use std::io::SeekFrom;

use async_trait::async_trait;
use chrono::DateTime;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::fs::{File, Metadata};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use sshdav_core::{path, FileInfo, FsError, RemoteFile, TransferSession};

use crate::error::LaunchError;

/// [`TransferSession`] backed by a `russh-sftp` client.
///
/// `SftpSession` tags every request with an id and routes replies back to
/// the caller, so one session serves concurrent requests through `&self`.
pub struct SftpTransfer {
    sftp: SftpSession,
}

impl SftpTransfer {
    /// Run the SFTP version exchange over `stream`.
    pub async fn new<S>(stream: S) -> Result<Self, LaunchError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let sftp = SftpSession::new(stream)
            .await
            .map_err(|e| LaunchError::Handshake(e.to_string()))?;
        Ok(SftpTransfer { sftp })
    }
}

#[async_trait]
impl TransferSession for SftpTransfer {
    async fn stat(&self, remote: &str) -> Result<FileInfo, FsError> {
        let metadata = self
            .sftp
            .metadata(remote)
            .await
            .map_err(|e| map_sftp_error(remote, e))?;
        Ok(metadata_to_info(path::base_name(remote), &metadata))
    }

    async fn open(&self, remote: &str) -> Result<Box<dyn RemoteFile>, FsError> {
        let file = self
            .sftp
            .open(remote)
            .await
            .map_err(|e| map_sftp_error(remote, e))?;
        Ok(Box::new(SftpFile {
            name: path::base_name(remote).to_string(),
            remote: remote.to_string(),
            file: Mutex::new(file),
        }))
    }

    async fn read_dir(&self, remote: &str) -> Result<Vec<FileInfo>, FsError> {
        let entries = self
            .sftp
            .read_dir(remote)
            .await
            .map_err(|e| map_sftp_error(remote, e))?;

        Ok(entries
            .filter(|entry| {
                let name = entry.file_name();
                name != "." && name != ".."
            })
            .map(|entry| metadata_to_info(&entry.file_name(), &entry.metadata()))
            .collect())
    }

    async fn close(&self) -> Result<(), FsError> {
        debug!("closing SFTP session");
        self.sftp
            .close()
            .await
            .map_err(|e| FsError::Remote(format!("SFTP close failed: {e}")))
    }
}

/// An open remote file.
///
/// Every method takes `&mut self` and goes through `Mutex::get_mut`, so the
/// mutex is never locked; it only makes the handle `Sync`.
struct SftpFile {
    name: String,
    remote: String,
    file: Mutex<File>,
}

#[async_trait]
impl RemoteFile for SftpFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let remote = &self.remote;
        self.file
            .get_mut()
            .read(buf)
            .await
            .map_err(|e| io_error(remote, e))
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        let remote = &self.remote;
        self.file
            .get_mut()
            .seek(pos)
            .await
            .map_err(|e| io_error(remote, e))
    }

    async fn stat(&mut self) -> Result<FileInfo, FsError> {
        let metadata = self
            .file
            .get_mut()
            .metadata()
            .await
            .map_err(|e| map_sftp_error(&self.remote, e))?;
        Ok(metadata_to_info(&self.name, &metadata))
    }

    async fn close(&mut self) -> Result<(), FsError> {
        let remote = &self.remote;
        self.file
            .get_mut()
            .shutdown()
            .await
            .map_err(|e| io_error(remote, e))
    }
}

fn metadata_to_info(name: &str, metadata: &Metadata) -> FileInfo {
    file_info(name, metadata.size, metadata.permissions, metadata.mtime)
}

/// Missing attributes default to zero, as SFTP servers may omit any of them.
fn file_info(name: &str, size: Option<u64>, mode: Option<u32>, mtime: Option<u32>) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        size: size.unwrap_or(0),
        mode: mode.unwrap_or(0),
        modified: mtime.and_then(|secs| DateTime::from_timestamp(i64::from(secs), 0)),
    }
}

fn map_sftp_error(remote: &str, e: SftpError) -> FsError {
    match e {
        SftpError::Status(status) => match status.status_code {
            StatusCode::NoSuchFile => FsError::NotFound(remote.to_string()),
            StatusCode::PermissionDenied => FsError::PermissionDenied(remote.to_string()),
            StatusCode::OpUnsupported => {
                FsError::Unsupported(format!("{remote}: {}", status.error_message))
            }
            _ => FsError::Remote(format!("{remote}: {}", status.error_message)),
        },
        other => FsError::Remote(format!("{remote}: {other}")),
    }
}

fn io_error(remote: &str, e: std::io::Error) -> FsError {
    match FsError::from(e) {
        FsError::NotFound(msg) => FsError::NotFound(format!("{remote}: {msg}")),
        FsError::Io(msg) => FsError::Io(format!("{remote}: {msg}")),
        other => other,
    }
}

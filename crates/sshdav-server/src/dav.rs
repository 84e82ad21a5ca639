//! `DavFileSystem` bridge over [`RemoteFs`].

use std::io::SeekFrom;
use std::time::SystemTime;

use bytes::{Buf, Bytes};
use dav_server::davpath::DavPath;
use dav_server::fs::{
    DavDirEntry, DavFile, DavFileSystem, DavMetaData, FsError as DavError, FsFuture, FsResult,
    FsStream, OpenOptions, ReadDirMeta,
};
use futures::stream;
use sshdav_core::{path, FileInfo, FsError, OpenFlags, RemoteFs, VirtualFile};
use tracing::debug;

/// Hands [`RemoteFs`] to the WebDAV handler.
#[derive(Clone, Debug)]
pub struct DavAdapter {
    fs: RemoteFs,
}

impl DavAdapter {
    pub fn new(fs: RemoteFs) -> Self {
        DavAdapter { fs }
    }
}

/// Map an adapter error onto the handler's error model.
pub(crate) fn to_dav_error(err: &FsError) -> DavError {
    match err {
        FsError::NotFound(_) => DavError::NotFound,
        FsError::PermissionDenied(_) | FsError::ReadOnly => DavError::Forbidden,
        FsError::Unsupported(_) => DavError::NotImplemented,
        _ => DavError::GeneralFailure,
    }
}

fn virtual_path(path: &DavPath) -> String {
    String::from_utf8_lossy(path.as_bytes()).into_owned()
}

fn open_flags(options: &OpenOptions) -> OpenFlags {
    OpenFlags {
        read: options.read,
        write: options.write,
        append: options.append,
        truncate: options.truncate,
        create: options.create,
        create_new: options.create_new,
    }
}

fn boxed_meta(info: FileInfo) -> Box<dyn DavMetaData> {
    Box::new(RemoteMeta(info))
}

impl DavFileSystem for DavAdapter {
    fn open<'a>(
        &'a self,
        path: &'a DavPath,
        options: OpenOptions,
    ) -> FsFuture<'a, Box<dyn DavFile>> {
        Box::pin(async move {
            let flags = open_flags(&options);
            let file = self.fs.open_file(&virtual_path(path), flags).await;

            // An upload must fail before the handler gets to report success
            // on an empty body.
            if flags.wants_write() {
                if let Some(err) = file.error() {
                    return Err(to_dav_error(err));
                }
            }
            Ok(Box::new(DavHandle { file }) as Box<dyn DavFile>)
        })
    }

    fn read_dir<'a>(
        &'a self,
        path: &'a DavPath,
        _meta: ReadDirMeta,
    ) -> FsFuture<'a, FsStream<Box<dyn DavDirEntry>>> {
        Box::pin(async move {
            let dir = virtual_path(path);
            let mut handle = self.fs.open_file(&dir, OpenFlags::read_only()).await;
            let listing = handle.readdir(0).await;
            if let Err(e) = handle.close().await {
                debug!(error = %e, "closing directory handle failed");
            }
            let entries = listing.map_err(|e| to_dav_error(&e))?;
            debug!(path = %dir, count = entries.len(), "listed");

            let fs = self.fs.clone();
            let entries = entries.into_iter().map(move |info| {
                let entry = RemoteDirEntry {
                    fs: fs.clone(),
                    path: path::join(&dir, &info.name),
                    info,
                };
                Ok::<_, DavError>(Box::new(entry) as Box<dyn DavDirEntry>)
            });
            Ok(Box::pin(stream::iter(entries)) as FsStream<Box<dyn DavDirEntry>>)
        })
    }

    fn metadata<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let info = self
                .fs
                .stat(&virtual_path(path))
                .await
                .map_err(|e| to_dav_error(&e))?;
            Ok(boxed_meta(info))
        })
    }

    fn create_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .mkdir(&virtual_path(path))
                .await
                .map_err(|e| to_dav_error(&e))
        })
    }

    fn remove_dir<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .remove_all(&virtual_path(path))
                .await
                .map_err(|e| to_dav_error(&e))
        })
    }

    fn remove_file<'a>(&'a self, path: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .remove_all(&virtual_path(path))
                .await
                .map_err(|e| to_dav_error(&e))
        })
    }

    fn rename<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        Box::pin(async move {
            self.fs
                .rename(&virtual_path(from), &virtual_path(to))
                .await
                .map_err(|e| to_dav_error(&e))
        })
    }

    fn copy<'a>(&'a self, from: &'a DavPath, to: &'a DavPath) -> FsFuture<'a, ()> {
        debug!(from = %virtual_path(from), to = %virtual_path(to), "refusing copy");
        Box::pin(async { Err(to_dav_error(&FsError::ReadOnly)) })
    }
}

/// Metadata as the handler sees it.
#[derive(Debug, Clone)]
struct RemoteMeta(FileInfo);

impl DavMetaData for RemoteMeta {
    fn len(&self) -> u64 {
        self.0.size
    }

    fn modified(&self) -> FsResult<SystemTime> {
        self.0
            .modified
            .map(SystemTime::from)
            .ok_or(DavError::GeneralFailure)
    }

    fn is_dir(&self) -> bool {
        self.0.is_dir()
    }

    fn is_symlink(&self) -> bool {
        self.0.is_symlink()
    }
}

/// One entry of a directory listing.
struct RemoteDirEntry {
    fs: RemoteFs,
    path: String,
    info: FileInfo,
}

impl DavDirEntry for RemoteDirEntry {
    fn name(&self) -> Vec<u8> {
        self.info.name.clone().into_bytes()
    }

    fn metadata<'a>(&'a self) -> FsFuture<'a, Box<dyn DavMetaData>> {
        Box::pin(async move {
            if !self.info.is_symlink() {
                return Ok(boxed_meta(self.info.clone()));
            }

            // Follow the link through an open handle. The handler skips
            // entries that still look like links, so a dangling or
            // unreadable one is shown as an empty file instead.
            let mut handle = self.fs.open_file(&self.path, OpenFlags::read_only()).await;
            let info = match handle.stat().await {
                Ok(target) => FileInfo {
                    name: self.info.name.clone(),
                    ..target
                },
                Err(e) => {
                    debug!(path = %self.path, error = %e, "symlink target unavailable");
                    self.info.unresolved_link()
                }
            };
            if let Err(e) = handle.close().await {
                debug!(path = %self.path, error = %e, "closing handle failed");
            }
            Ok(boxed_meta(info))
        })
    }
}

/// An open handle as the handler sees it. Writes are always refused.
#[derive(Debug)]
struct DavHandle {
    file: VirtualFile,
}

impl DavFile for DavHandle {
    fn metadata(&mut self) -> FsFuture<'_, Box<dyn DavMetaData>> {
        Box::pin(async move {
            let info = self.file.stat().await.map_err(|e| to_dav_error(&e))?;
            Ok(boxed_meta(info))
        })
    }

    fn write_buf(&mut self, buf: Box<dyn Buf + Send>) -> FsFuture<'_, ()> {
        let chunk = Bytes::copy_from_slice(buf.chunk());
        Box::pin(async move {
            self.file
                .write(&chunk)
                .await
                .map(|_| ())
                .map_err(|e| to_dav_error(&e))
        })
    }

    fn write_bytes(&mut self, buf: Bytes) -> FsFuture<'_, ()> {
        Box::pin(async move {
            self.file
                .write(&buf)
                .await
                .map(|_| ())
                .map_err(|e| to_dav_error(&e))
        })
    }

    fn read_bytes(&mut self, count: usize) -> FsFuture<'_, Bytes> {
        Box::pin(async move {
            let mut buf = vec![0u8; count];
            let n = self.file.read(&mut buf).await.map_err(|e| to_dav_error(&e))?;
            buf.truncate(n);
            Ok(Bytes::from(buf))
        })
    }

    fn seek(&mut self, pos: SeekFrom) -> FsFuture<'_, u64> {
        Box::pin(async move { self.file.seek(pos).await.map_err(|e| to_dav_error(&e)) })
    }

    fn flush(&mut self) -> FsFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

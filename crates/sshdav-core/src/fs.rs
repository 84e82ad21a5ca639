use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::FsError;
use crate::file::{ErrorFile, LiveFile, VirtualFile};
use crate::path;
use crate::traits::{FileInfo, OpenFlags, TransferSession};

/// Read-only view of a remote directory tree.
///
/// Every client path is cleaned and joined onto the session root. The
/// transfer session is shared by all clones; no extra locking is added here.
#[derive(Clone)]
pub struct RemoteFs {
    session: Arc<dyn TransferSession>,
    root: String,
}

impl RemoteFs {
    /// Serve `root` on the remote host. The root is cleaned once, here.
    pub fn new(session: Arc<dyn TransferSession>, root: &str) -> Self {
        RemoteFs {
            session,
            root: path::clean(root),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Remote path for a client path. `..` cannot climb above the root.
    pub fn resolve(&self, name: &str) -> String {
        let virtual_path = path::clean(&format!("/{name}"));
        path::join(&self.root, &virtual_path)
    }

    /// Metadata for a path. Errors from the remote side come back unchanged.
    #[instrument(skip(self), fields(path = %name))]
    pub async fn stat(&self, name: &str) -> Result<FileInfo, FsError> {
        let remote = self.resolve(name);
        let result = self.session.stat(&remote).await;
        match &result {
            Ok(info) => debug!(remote = %remote, size = info.size, mode = info.mode, "stat"),
            Err(e) => debug!(remote = %remote, error = %e, "stat failed"),
        }
        result
    }

    /// Open a path for reading. Always returns a handle.
    ///
    /// Failures are folded into an error handle instead of being returned,
    /// so a listing that opens each child never loses an entry. The error
    /// handle's `stat` reports what was learned before the failure.
    #[instrument(skip(self), fields(path = %name))]
    pub async fn open_file(&self, name: &str, flags: OpenFlags) -> VirtualFile {
        let remote = self.resolve(name);

        let stat = self.session.stat(&remote).await;

        if flags.wants_write() {
            debug!(remote = %remote, ?flags, "write access refused");
            return VirtualFile::Error(ErrorFile::replaying(FsError::ReadOnly, stat));
        }

        let info = match stat {
            Ok(info) => info,
            Err(e) => {
                debug!(remote = %remote, error = %e, "stat failed, returning error handle");
                return VirtualFile::Error(ErrorFile::replaying(e.clone(), Err(e)));
            }
        };

        // Opening a fifo or device would block the request indefinitely.
        if info.is_special() {
            debug!(remote = %remote, mode = info.mode, "special file, not opening");
            return VirtualFile::Error(ErrorFile::replaying(
                FsError::Unsupported(format!("{remote}: can't be opened")),
                Ok(info),
            ));
        }

        match self.session.open(&remote).await {
            Ok(file) => {
                debug!(remote = %remote, "opened");
                VirtualFile::Live(LiveFile::new(file, self.session.clone(), remote))
            }
            Err(e) => {
                debug!(remote = %remote, error = %e, "open failed, returning error handle");
                VirtualFile::Error(ErrorFile::replaying(e, Ok(info)))
            }
        }
    }

    #[instrument(skip(self), fields(path = %name))]
    pub async fn mkdir(&self, name: &str) -> Result<(), FsError> {
        debug!("refusing mkdir");
        Err(FsError::ReadOnly)
    }

    #[instrument(skip(self), fields(path = %name))]
    pub async fn remove_all(&self, name: &str) -> Result<(), FsError> {
        debug!("refusing remove_all");
        Err(FsError::ReadOnly)
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        debug!("refusing rename");
        Err(FsError::ReadOnly)
    }
}

impl std::fmt::Debug for RemoteFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFs")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTransfer;
    use std::io::SeekFrom;

    fn make_fs() -> (RemoteFs, Arc<MemoryTransfer>) {
        let mem = Arc::new(MemoryTransfer::new());
        mem.add_dir("/home/foo");
        mem.add_file("/home/foo/hello.txt", b"hello world");
        mem.add_dir("/home/foo/docs");
        mem.add_file("/home/foo/docs/a.md", b"# A");
        mem.add_file("/home/foo/docs/b.md", b"# B");
        mem.add_special("/home/foo/pipe", FileInfo::fifo("pipe"));
        mem.add_file("/home/foo/locked", b"secret");
        mem.fail_open(
            "/home/foo/locked",
            FsError::PermissionDenied("/home/foo/locked".to_string()),
        );
        mem.add_file("/etc/passwd", b"root:x:0:0");
        (RemoteFs::new(mem.clone(), "/home/foo/"), mem)
    }

    #[test]
    fn test_resolve() {
        let (fs, _) = make_fs();
        assert_eq!(fs.root(), "/home/foo");
        assert_eq!(fs.resolve("/"), "/home/foo");
        assert_eq!(fs.resolve(""), "/home/foo");
        assert_eq!(fs.resolve("/docs/a.md"), "/home/foo/docs/a.md");
        assert_eq!(fs.resolve("docs//./a.md"), "/home/foo/docs/a.md");
        assert_eq!(fs.resolve("/docs/"), "/home/foo/docs");
    }

    #[test]
    fn test_resolve_cannot_escape_root() {
        let (fs, _) = make_fs();
        assert_eq!(fs.resolve("/../../etc/passwd"), "/home/foo/etc/passwd");
        assert_eq!(fs.resolve("../.."), "/home/foo");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let (fs, _) = make_fs();
        for p in ["/a/../b", "x/y/", "/", "..", "/docs/a.md"] {
            assert_eq!(fs.resolve(p), fs.resolve(p));
        }
    }

    #[test]
    fn test_resolve_relative_root() {
        let mem = Arc::new(MemoryTransfer::new());
        let fs = RemoteFs::new(mem, "");
        assert_eq!(fs.root(), ".");
        assert_eq!(fs.resolve("/"), ".");
        assert_eq!(fs.resolve("/notes.txt"), "notes.txt");
    }

    #[tokio::test]
    async fn test_stat_propagates_errors() {
        let (fs, _) = make_fs();
        let info = fs.stat("/hello.txt").await.unwrap();
        assert_eq!(info.size, 11);

        let err = fs.stat("/missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_open_and_read() {
        let (fs, _) = make_fs();
        let mut file = fs.open_file("/hello.txt", OpenFlags::read_only()).await;
        assert!(file.is_live());

        let mut buf = [0u8; 5];
        assert_eq!(file.read(&mut buf).await.unwrap(), 5);
        assert_eq!(&buf, b"hello");

        assert_eq!(file.seek(SeekFrom::Start(6)).await.unwrap(), 6);
        let mut rest = [0u8; 16];
        let n = file.read(&mut rest).await.unwrap();
        assert_eq!(&rest[..n], b"world");

        assert_eq!(file.stat().await.unwrap().size, 11);
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_returns_error_handle() {
        let (fs, _) = make_fs();
        let mut file = fs.open_file("/missing", OpenFlags::read_only()).await;
        assert!(!file.is_live());

        let stat_err = file.stat().await.unwrap_err();
        assert!(stat_err.is_not_found());

        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf).await.unwrap_err(), stat_err);
        assert_eq!(file.readdir(0).await.unwrap_err(), stat_err);
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_pipe_keeps_stat() {
        let (fs, mem) = make_fs();
        let before = mem.call_count();
        let mut file = fs.open_file("/pipe", OpenFlags::read_only()).await;

        // stat only; the pipe itself is never opened
        assert_eq!(mem.call_count(), before + 1);
        assert!(matches!(file.error(), Some(FsError::Unsupported(_))));

        let info = file.stat().await.unwrap();
        assert!(info.is_special());
        let mut buf = [0u8; 4];
        assert!(file.read(&mut buf).await.is_err());
    }

    #[tokio::test]
    async fn test_open_failure_keeps_stat() {
        let (fs, _) = make_fs();
        let mut file = fs.open_file("/locked", OpenFlags::read_only()).await;

        assert!(matches!(file.error(), Some(FsError::PermissionDenied(_))));
        assert_eq!(file.stat().await.unwrap().size, 6);
    }

    #[tokio::test]
    async fn test_open_for_write_is_refused() {
        let (fs, _) = make_fs();
        let flags = OpenFlags {
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        };
        let mut file = fs.open_file("/hello.txt", flags).await;

        assert_eq!(file.error(), Some(&FsError::ReadOnly));
        assert_eq!(file.write(b"x").await, Err(FsError::ReadOnly));
        assert_eq!(file.stat().await.unwrap().size, 11);

        // creating a new file is refused the same way, stat still reports the truth
        let mut created = fs.open_file("/new.txt", flags).await;
        assert_eq!(created.error(), Some(&FsError::ReadOnly));
        assert!(created.stat().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_readdir() {
        let (fs, _) = make_fs();
        let mut dir = fs.open_file("/docs", OpenFlags::read_only()).await;

        let names: Vec<_> = dir
            .readdir(0)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);

        assert_eq!(dir.readdir(-1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_readdir_positive_count_unsupported() {
        let (fs, _) = make_fs();
        let mut dir = fs.open_file("/docs", OpenFlags::read_only()).await;
        let err = dir.readdir(1).await.unwrap_err();
        assert_eq!(
            err,
            FsError::Unsupported("unsupported call: readdir(1)".to_string())
        );
    }

    #[tokio::test]
    async fn test_readdir_lists_broken_entries() {
        let (fs, _) = make_fs();
        let mut root = fs.open_file("/", OpenFlags::read_only()).await;
        let entries = root.readdir(0).await.unwrap();

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"pipe"));
        assert!(names.contains(&"locked"));

        // each entry can be opened and stat'ed, whatever state it is in
        for entry in entries {
            let mut child = fs
                .open_file(&format!("/{}", entry.name), OpenFlags::read_only())
                .await;
            assert_eq!(child.stat().await.unwrap().name, entry.name);
        }
    }

    #[tokio::test]
    async fn test_mutations_are_refused_without_remote_calls() {
        let (fs, mem) = make_fs();
        let before = mem.call_count();

        assert_eq!(fs.mkdir("/new").await, Err(FsError::ReadOnly));
        assert_eq!(fs.remove_all("/hello.txt").await, Err(FsError::ReadOnly));
        assert_eq!(fs.rename("/hello.txt", "/bye.txt").await, Err(FsError::ReadOnly));
        assert_eq!(fs.mkdir("/../../etc").await, Err(FsError::ReadOnly));

        assert_eq!(mem.call_count(), before);
    }
}

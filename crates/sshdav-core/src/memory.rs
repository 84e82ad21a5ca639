//! In-memory [`TransferSession`] for tests.

use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::FsError;
use crate::path;
use crate::traits::{FileInfo, RemoteFile, TransferSession};

struct Node {
    info: FileInfo,
    content: Arc<Vec<u8>>,
    open_error: Option<FsError>,
    link: Option<String>,
}

const MAX_LINK_HOPS: usize = 8;

/// A remote filesystem held in memory.
///
/// Paths are stored cleaned; `/` always exists. Every trait call bumps a
/// counter so tests can assert that an operation never reached the session.
pub struct MemoryTransfer {
    nodes: RwLock<BTreeMap<String, Node>>,
    calls: AtomicUsize,
}

impl MemoryTransfer {
    /// Create a session containing only the root directory.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "/".to_string(),
            Node {
                info: FileInfo::dir("/", None),
                content: Arc::new(Vec::new()),
                open_error: None,
                link: None,
            },
        );
        MemoryTransfer {
            nodes: RwLock::new(nodes),
            calls: AtomicUsize::new(0),
        }
    }

    /// Add a directory (and any missing parents).
    pub fn add_dir(&self, dir_path: &str) {
        let name = path::base_name(&path::clean(dir_path)).to_string();
        self.insert(dir_path, FileInfo::dir(name, Some(Utc::now())), Vec::new());
    }

    /// Add a regular file (and any missing parent directories).
    pub fn add_file(&self, file_path: &str, content: &[u8]) {
        let name = path::base_name(&path::clean(file_path)).to_string();
        let info = FileInfo::file(name, content.len() as u64, Some(Utc::now()));
        self.insert(file_path, info, content.to_vec());
    }

    /// Add an entry with arbitrary metadata, e.g. a fifo or device.
    pub fn add_special(&self, entry_path: &str, info: FileInfo) {
        self.insert(entry_path, info, Vec::new());
    }

    /// Add a symbolic link to the absolute path `target`, which need not
    /// exist. Listings show the link itself; `stat` and `open` follow it.
    pub fn add_symlink(&self, link_path: &str, target: &str) {
        let cleaned = path::clean(link_path);
        let info = FileInfo::symlink(path::base_name(&cleaned), target.len() as u64);
        self.insert(link_path, info, Vec::new());

        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        if let Some(node) = nodes.get_mut(&cleaned) {
            node.link = Some(path::clean(target));
        }
    }

    /// Make `open` fail for an existing path while `stat` keeps working.
    pub fn fail_open(&self, entry_path: &str, err: FsError) {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        if let Some(node) = nodes.get_mut(&path::clean(entry_path)) {
            node.open_error = Some(err);
        }
    }

    /// Number of trait calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn insert(&self, entry_path: &str, info: FileInfo, content: Vec<u8>) {
        let cleaned = path::clean(entry_path);
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());

        let mut parent = parent_of(&cleaned);
        while let Some(dir) = parent {
            nodes.entry(dir.clone()).or_insert_with(|| Node {
                info: FileInfo::dir(path::base_name(&dir), None),
                content: Arc::new(Vec::new()),
                open_error: None,
                link: None,
            });
            parent = parent_of(&dir);
        }

        nodes.insert(
            cleaned,
            Node {
                info,
                content: Arc::new(content),
                open_error: None,
                link: None,
            },
        );
    }

    /// Find the node for `remote`, following links like `stat(2)`.
    fn lookup(&self, remote: &str) -> Result<(FileInfo, Arc<Vec<u8>>, Option<FsError>), FsError> {
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        let mut key = absolute(remote);
        let mut link_name = None;

        for _ in 0..MAX_LINK_HOPS {
            let node = nodes
                .get(&key)
                .ok_or_else(|| FsError::NotFound(remote.to_string()))?;
            match &node.link {
                Some(target) => {
                    link_name.get_or_insert_with(|| node.info.name.clone());
                    key = target.clone();
                }
                None => {
                    let mut info = node.info.clone();
                    if let Some(name) = link_name {
                        info.name = name;
                    }
                    return Ok((info, node.content.clone(), node.open_error.clone()));
                }
            }
        }
        Err(FsError::Remote(format!(
            "{remote}: too many levels of symbolic links"
        )))
    }

    fn bump(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemoryTransfer {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative remote paths are taken relative to `/`.
fn absolute(remote: &str) -> String {
    path::clean(&format!("/{remote}"))
}

fn parent_of(cleaned: &str) -> Option<String> {
    if cleaned == "/" || !cleaned.starts_with('/') {
        return None;
    }
    match cleaned.rsplit_once('/') {
        Some(("", _)) => Some("/".to_string()),
        Some((parent, _)) => Some(parent.to_string()),
        None => None,
    }
}

#[async_trait]
impl TransferSession for MemoryTransfer {
    async fn stat(&self, remote: &str) -> Result<FileInfo, FsError> {
        self.bump();
        self.lookup(remote).map(|(info, _, _)| info)
    }

    async fn open(&self, remote: &str) -> Result<Box<dyn RemoteFile>, FsError> {
        self.bump();
        let (info, content, open_error) = self.lookup(remote)?;
        if let Some(err) = open_error {
            return Err(err);
        }
        Ok(Box::new(MemoryFile {
            info,
            content,
            pos: 0,
        }))
    }

    async fn read_dir(&self, remote: &str) -> Result<Vec<FileInfo>, FsError> {
        self.bump();
        let dir = absolute(remote);
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        match nodes.get(&dir) {
            None => return Err(FsError::NotFound(remote.to_string())),
            Some(node) if !node.info.is_dir() => {
                return Err(FsError::Remote(format!("{remote}: not a directory")))
            }
            Some(_) => {}
        }

        // BTreeMap order gives a name-sorted listing.
        Ok(nodes
            .iter()
            .filter(|(p, _)| parent_of(p).as_deref() == Some(dir.as_str()))
            .map(|(_, n)| n.info.clone())
            .collect())
    }

    async fn close(&self) -> Result<(), FsError> {
        self.bump();
        Ok(())
    }
}

struct MemoryFile {
    info: FileInfo,
    content: Arc<Vec<u8>>,
    pos: u64,
}

#[async_trait]
impl RemoteFile for MemoryFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let start = (self.pos as usize).min(self.content.len());
        let n = buf.len().min(self.content.len() - start);
        buf[..n].copy_from_slice(&self.content[start..start + n]);
        self.pos += n as u64;
        Ok(n)
    }

    async fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        let len = self.content.len() as i64;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(delta) => len + delta,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
        };
        if target < 0 {
            return Err(FsError::Io("invalid seek to a negative position".to_string()));
        }
        self.pos = target as u64;
        Ok(self.pos)
    }

    async fn stat(&mut self) -> Result<FileInfo, FsError> {
        Ok(self.info.clone())
    }

    async fn close(&mut self) -> Result<(), FsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parents_are_created() {
        let mem = MemoryTransfer::new();
        mem.add_file("/a/b/c.txt", b"c");

        assert!(mem.stat("/a").await.unwrap().is_dir());
        assert!(mem.stat("/a/b").await.unwrap().is_dir());
        assert_eq!(mem.stat("/a/b/c.txt").await.unwrap().name, "c.txt");
    }

    #[tokio::test]
    async fn test_read_dir_direct_children_only() {
        let mem = MemoryTransfer::new();
        mem.add_file("/a/one", b"1");
        mem.add_file("/a/two", b"2");
        mem.add_file("/a/sub/three", b"3");

        let names: Vec<_> = mem
            .read_dir("/a")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["one", "sub", "two"]);
    }

    #[tokio::test]
    async fn test_read_dir_on_file_fails() {
        let mem = MemoryTransfer::new();
        mem.add_file("/f", b"x");
        assert!(matches!(mem.read_dir("/f").await, Err(FsError::Remote(_))));
        assert!(mem.read_dir("/nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_relative_paths_resolve_from_root() {
        let mem = MemoryTransfer::new();
        mem.add_file("/notes.txt", b"n");
        assert!(mem.stat("notes.txt").await.is_ok());
        assert!(mem.stat(".").await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_seek_semantics() {
        let mem = MemoryTransfer::new();
        mem.add_file("/f", b"0123456789");
        let mut f = mem.open("/f").await.unwrap();

        assert_eq!(f.seek(SeekFrom::End(-3)).await.unwrap(), 7);
        let mut buf = [0u8; 8];
        let n = f.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"789");
        assert_eq!(f.read(&mut buf).await.unwrap(), 0);

        assert_eq!(f.seek(SeekFrom::Current(-5)).await.unwrap(), 5);
        assert!(f.seek(SeekFrom::Current(-10)).await.is_err());
    }

    #[tokio::test]
    async fn test_symlinks_are_followed_except_in_listings() {
        let mem = MemoryTransfer::new();
        mem.add_file("/data/target.txt", b"target");
        mem.add_symlink("/data/link", "/data/target.txt");
        mem.add_symlink("/data/dangling", "/data/gone");

        let listed: Vec<_> = mem.read_dir("/data").await.unwrap();
        assert!(listed.iter().filter(|e| e.name != "target.txt").all(|e| e.is_symlink()));

        let info = mem.stat("/data/link").await.unwrap();
        assert_eq!(info.name, "link");
        assert!(info.is_file());
        assert_eq!(info.size, 6);

        let mut f = mem.open("/data/link").await.unwrap();
        let mut buf = [0u8; 16];
        let n = f.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"target");

        assert!(mem.stat("/data/dangling").await.unwrap_err().is_not_found());
        assert!(mem.open("/data/dangling").await.is_err());
    }

    #[tokio::test]
    async fn test_symlink_cycle() {
        let mem = MemoryTransfer::new();
        mem.add_symlink("/a", "/b");
        mem.add_symlink("/b", "/a");
        assert!(matches!(mem.stat("/a").await, Err(FsError::Remote(_))));
    }

    #[tokio::test]
    async fn test_call_counter() {
        let mem = MemoryTransfer::new();
        assert_eq!(mem.call_count(), 0);
        let _ = mem.stat("/").await;
        let _ = mem.read_dir("/").await;
        assert_eq!(mem.call_count(), 2);
    }
}

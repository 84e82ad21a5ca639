//! Read-only filesystem adapter over a remote file-transfer session.
//!
//! [`RemoteFs`] resolves client paths under a fixed session root and hands
//! out [`VirtualFile`] handles. Opening never fails outright: a path that
//! cannot be opened yields an error-shaped handle that still answers `stat`,
//! so directory listings keep showing the entry.

mod error;
mod file;
mod fs;
pub mod memory;
pub mod path;
mod traits;

pub use error::FsError;
pub use file::{ErrorFile, LiveFile, VirtualFile};
pub use fs::RemoteFs;
pub use memory::MemoryTransfer;
pub use traits::{FileInfo, OpenFlags, RemoteFile, TransferSession};

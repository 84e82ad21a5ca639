//! Remote side of sshdav: starts `ssh -s sftp` and speaks SFTP over its
//! standard streams.

mod error;
pub mod launcher;
mod sftp;
mod stream;

pub use error::LaunchError;
pub use launcher::{launch, ssh_args, RemoteSession};
pub use sftp::SftpTransfer;
pub use stream::ChildStream;

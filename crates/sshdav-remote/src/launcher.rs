//! Builds the `ssh` command line and supervises the subprocess.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::process::{Child, Command};
use tracing::{debug, info, instrument, warn};

use sshdav_config::ConnectionDescriptor;
use sshdav_core::TransferSession;

use crate::error::LaunchError;
use crate::sftp::SftpTransfer;
use crate::stream::ChildStream;

/// Arguments for `ssh`, in a fixed order:
/// `-F config`, `-i identity`, `-o option`..., `-l user`, `-p port`, host, `-s sftp`.
///
/// An inline password is refused before anything else is looked at.
pub fn ssh_args(descriptor: &ConnectionDescriptor) -> Result<Vec<String>, LaunchError> {
    let endpoint = &descriptor.endpoint;
    if endpoint.password.is_some() {
        return Err(LaunchError::PlaintextPassword);
    }
    if endpoint.host.is_empty() || endpoint.host.starts_with('-') {
        return Err(LaunchError::InvalidHost(endpoint.host.clone()));
    }

    let mut args = Vec::new();
    if let Some(config) = &descriptor.config_file {
        args.extend(["-F".to_string(), config.clone()]);
    }
    if let Some(identity) = &descriptor.identity_file {
        args.extend(["-i".to_string(), identity.clone()]);
    }
    for option in &descriptor.options {
        args.extend(["-o".to_string(), option.clone()]);
    }
    if let Some(user) = endpoint.user.as_deref().filter(|u| !u.is_empty()) {
        args.extend(["-l".to_string(), user.to_string()]);
    }
    if let Some(port) = endpoint.port {
        args.extend(["-p".to_string(), port.to_string()]);
    }
    args.push(endpoint.host.clone());
    args.extend(["-s".to_string(), "sftp".to_string()]);
    Ok(args)
}

/// The running `ssh` subprocess and the SFTP session on top of it.
pub struct RemoteSession {
    child: Child,
    transfer: Arc<SftpTransfer>,
}

impl RemoteSession {
    /// The shared transfer session.
    pub fn transfer(&self) -> Arc<dyn TransferSession> {
        self.transfer.clone()
    }

    /// OS process id of the `ssh` child, if it is still running.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Close the SFTP session, then wait for `ssh` to exit.
    pub async fn shutdown(mut self) -> Result<ExitStatus, LaunchError> {
        if let Err(e) = self.transfer.close().await {
            warn!(error = %e, "SFTP session did not close cleanly");
        }
        // Closing stdin lets ssh notice the end of the session.
        drop(self.child.stdin.take());
        let status = self.child.wait().await.map_err(LaunchError::Wait)?;
        info!(%status, "ssh subprocess exited");
        Ok(status)
    }
}

/// Start `ssh` for `descriptor` and complete the SFTP handshake.
///
/// stderr of the child goes straight to ours so ssh prompts and warnings stay
/// visible. Nothing is retried.
#[instrument(skip(descriptor), fields(host = %descriptor.endpoint.host, program = %descriptor.program))]
pub async fn launch(descriptor: &ConnectionDescriptor) -> Result<RemoteSession, LaunchError> {
    let args = ssh_args(descriptor)?;
    debug!(?args, "spawning ssh");

    let mut child = Command::new(&descriptor.program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            program: descriptor.program.clone(),
            source,
        })?;

    let stdin = child.stdin.take().ok_or(LaunchError::MissingPipe("stdin"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or(LaunchError::MissingPipe("stdout"))?;

    let transfer = match SftpTransfer::new(ChildStream::new(stdout, stdin)).await {
        Ok(transfer) => transfer,
        Err(e) => {
            if let Err(kill_err) = child.kill().await {
                debug!(error = %kill_err, "ssh subprocess already gone");
            }
            return Err(e);
        }
    };
    info!(pid = ?child.id(), "SFTP session established");

    Ok(RemoteSession {
        child,
        transfer: Arc::new(transfer),
    })
}

use std::path::PathBuf;

use sshdav_config::{BridgeConfig, ConnectionDescriptor, SshEndpoint, WebdavEndpoint};
use sshdav_core::RemoteFs;
use sshdav_server::ServerConfig;
use tracing::{info, warn};

use crate::error::BridgeError;
use crate::Cli;

fn find_config() -> Option<PathBuf> {
    // 1. SSHDAV_CONFIG environment variable
    if let Ok(path) = std::env::var("SSHDAV_CONFIG") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.config/sshdav/config.yaml
    if let Some(home) = dirs_next::home_dir() {
        let home_config = home.join(".config/sshdav/config.yaml");
        if home_config.exists() {
            return Some(home_config);
        }
    }

    None
}

/// Load the config file (if any) and lay the command line over it.
pub(crate) fn load_config(cli: &Cli) -> Result<BridgeConfig, BridgeError> {
    let mut config = match cli.config.clone().or_else(find_config) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            BridgeConfig::from_file(&path)?
        }
        None => BridgeConfig::default(),
    };
    config.merge_cli(
        cli.ssh_config.clone(),
        cli.ssh_identity.clone(),
        cli.ssh_program.clone(),
        cli.ssh_option.clone(),
    );
    let config = config.effective();
    config.validate_or_err()?;
    Ok(config)
}

/// Start ssh, serve WebDAV until a signal arrives, then tear down in reverse.
pub async fn run(cli: Cli) -> Result<(), BridgeError> {
    let config = load_config(&cli)?;
    let ssh = SshEndpoint::parse(&cli.ssh_url)?;
    let webdav = WebdavEndpoint::parse(&cli.webdav_url)?;

    let root = ssh.path.clone();
    let descriptor = ConnectionDescriptor::new(ssh, &config.ssh);
    let session = sshdav_remote::launch(&descriptor).await?;
    info!(pid = ?session.pid(), root = %root, "remote session ready");

    let fs = RemoteFs::new(session.transfer(), &root);
    let server_config = ServerConfig {
        host: webdav.host,
        port: webdav.port,
        prefix: webdav.prefix,
        autoindex: config.webdav.autoindex,
    };

    info!(
        "Hint: open Finder => `Go` => `Connect to Server` (or your file manager's equivalent) and enter {}",
        cli.webdav_url
    );
    let served = sshdav_server::serve(fs, server_config).await;

    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "ssh subprocess did not shut down cleanly");
    }
    served?;
    Ok(())
}

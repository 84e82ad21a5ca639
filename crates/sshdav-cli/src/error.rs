use sshdav_config::ConfigError;
use sshdav_remote::LaunchError;
use sshdav_server::ServerError;
use thiserror::Error;

/// Everything that can stop the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

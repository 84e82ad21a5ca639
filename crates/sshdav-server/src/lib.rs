//! WebDAV front end for sshdav.
//!
//! Bridges [`RemoteFs`] onto `dav-server`, mounts the handler in an Axum
//! router and serves it until SIGINT or SIGTERM.

mod dav;
mod routes;

use dav_server::memls::MemLs;
use dav_server::DavHandler;
use sshdav_core::RemoteFs;
use thiserror::Error;

pub use dav::DavAdapter;
pub use routes::build_router;

/// Server errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// URL path the share is mounted under, without trailing slash.
    pub prefix: String,
    /// Render HTML listings for GET on a collection.
    pub autoindex: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 80,
            prefix: String::new(),
            autoindex: false,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Build the WebDAV handler for `fs` with an in-memory lock manager.
pub fn dav_handler(fs: RemoteFs, config: &ServerConfig) -> DavHandler {
    let mut builder = DavHandler::builder()
        .filesystem(Box::new(DavAdapter::new(fs)))
        .locksystem(MemLs::new())
        .autoindex(config.autoindex);
    if !config.prefix.is_empty() {
        builder = builder.strip_prefix(config.prefix.clone());
    }
    builder.build_handler()
}

/// Serve `fs` over WebDAV with graceful shutdown on SIGTERM/SIGINT.
///
/// Returns once in-flight requests have drained.
pub async fn serve(fs: RemoteFs, config: ServerConfig) -> Result<(), ServerError> {
    let addr = config.addr();
    if !is_loopback_host(&config.host) {
        tracing::warn!(
            "serving on non-local address {} without authentication; anyone who can reach it can read the share",
            addr
        );
    }

    let app = build_router(dav_handler(fs, &config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("WebDAV server listening on http://{}{}/", addr, config.prefix);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("WebDAV server shut down gracefully");
    Ok(())
}

fn is_loopback_host(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<std::net::IpAddr>()
        .map(|ip| ip.is_loopback())
        .unwrap_or(false)
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received SIGINT, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}

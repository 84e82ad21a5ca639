//! Parsing of the two positional endpoints: `ssh://[user@]host[:port][/path]`
//! for the remote side and `http://host[:port][/prefix]` for the listener.

use std::borrow::Cow;

use url::{Host, Url};

use crate::types::Secret;
use crate::ConfigError;

const SSH_USAGE: &str = "expected ssh://[user@]host[:port][/path], e.g. ssh://foo@example.com:22/home/foo";
const WEBDAV_USAGE: &str = "expected http://host[:port][/prefix], e.g. http://127.0.0.1:8080";

/// The remote side of the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshEndpoint {
    /// Host name or address, without IPv6 brackets.
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    /// Inline password from the URL. Never used, only detected and refused.
    pub password: Option<Secret>,
    /// Remote directory served as `/`. Empty when the URL has no path.
    pub path: String,
}

impl SshEndpoint {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidEndpoint(input.to_string(), reason.to_string());

        let url = Url::parse(input).map_err(|e| invalid(&format!("{e}; {SSH_USAGE}")))?;
        if url.scheme() != "ssh" {
            return Err(invalid(SSH_USAGE));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(invalid(&format!("missing host; {SSH_USAGE}"))),
        };
        if host.is_empty() {
            return Err(invalid(&format!("missing host; {SSH_USAGE}")));
        }

        let user = match url.username() {
            "" => None,
            raw => Some(decode(raw).map_err(|e| invalid(e.as_str()))?.into_owned()),
        };
        let password = match url.password() {
            Some(raw) => Some(Secret::new(decode(raw).map_err(|e| invalid(e.as_str()))?)),
            None => None,
        };
        let path = decode(url.path()).map_err(|e| invalid(e.as_str()))?.into_owned();

        Ok(SshEndpoint {
            host,
            port: url.port(),
            user,
            password,
            path,
        })
    }
}

/// The local WebDAV listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebdavEndpoint {
    /// Host as it appears in a socket address (IPv6 keeps its brackets).
    pub host: String,
    pub port: u16,
    /// URL path prefix the handler is mounted under, without trailing slash.
    pub prefix: String,
}

impl WebdavEndpoint {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidEndpoint(input.to_string(), reason.to_string());

        let url = Url::parse(input).map_err(|e| invalid(&format!("{e}; {WEBDAV_USAGE}")))?;
        if url.scheme() != "http" {
            // TODO: serve https once a certificate option exists
            return Err(invalid(WEBDAV_USAGE));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid(&format!("missing host; {WEBDAV_USAGE}")))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        let prefix = decode(url.path())
            .map_err(|e| invalid(e.as_str()))?
            .trim_end_matches('/')
            .to_string();

        Ok(WebdavEndpoint { host, port, prefix })
    }
}

fn decode(raw: &str) -> Result<Cow<'_, str>, String> {
    urlencoding::decode(raw).map_err(|e| format!("invalid percent-encoding: {e}"))
}

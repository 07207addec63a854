//! Process-wide settings for the HTTP server.

use anyhow::{Context, Result};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Rio de Janeiro SPPO bus GPS feed.
pub const DEFAULT_UPSTREAM_URL: &str = "https://dados.mobilidade.rio/gps/sppo";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub upstream_url: String,
    pub timeout: Duration,
    pub max_concurrent_fetches: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

impl ServerConfig {
    /// Defaults with the port taken from `PORT`, if set.
    pub fn from_env() -> Result<Self> {
        let port = parse_port(std::env::var("PORT").ok().as_deref())?;
        Ok(Self {
            port,
            ..Self::default()
        })
    }

    /// Listens on every interface.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn parse_port(raw: Option<&str>) -> Result<u16> {
    match raw.map(str::trim) {
        None | Some("") => Ok(DEFAULT_PORT),
        Some(text) => text
            .parse()
            .with_context(|| format!("PORT must be a port number, got '{text}'")),
    }
}

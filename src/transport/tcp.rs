//! Outbound TCP connections
//!
//! Resolves a host, optionally restricted to one address family, and dials
//! it under a timeout.

use super::SocketOpts;
use crate::error::{NaiveSocksError, Result};
use crate::socks::TargetAddr;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;

/// Dials TCP connections with socket options and a timeout
#[derive(Debug, Clone)]
pub struct TcpConnector {
    /// Socket options to apply to connections
    socket_opts: SocketOpts,
    /// Connection timeout
    connect_timeout: Duration,
    /// Only use IPv6 addresses when resolving host names
    ipv6_only: bool,
}

impl TcpConnector {
    /// Create a new connector with default options
    pub fn with_defaults() -> Self {
        TcpConnector {
            socket_opts: SocketOpts::default(),
            connect_timeout: Duration::from_secs(crate::helper::DEFAULT_CONNECT_TIMEOUT_SECS),
            ipv6_only: false,
        }
    }

    /// Set socket options
    pub fn with_socket_opts(mut self, opts: SocketOpts) -> Self {
        self.socket_opts = opts;
        self
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Restrict host name resolution to IPv6
    pub fn with_ipv6_only(mut self, ipv6_only: bool) -> Self {
        self.ipv6_only = ipv6_only;
        self
    }

    /// Resolve `host:port` and try each usable address in turn
    pub async fn connect_host(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addrs = self.resolve(host, port).await?;
        self.connect_any(&addrs).await
    }

    /// Connect to a SOCKS5 destination
    pub async fn connect_target(&self, target: &TargetAddr) -> Result<TcpStream> {
        match target {
            TargetAddr::Ip(addr) => self.connect_addr(*addr).await,
            TargetAddr::Domain(domain, port) => self.connect_host(domain, *port).await,
        }
    }

    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<SocketAddr>> {
        let ipv6_only = self.ipv6_only;
        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
            .await?
            .filter(|addr| !ipv6_only || addr.is_ipv6())
            .collect();

        if addrs.is_empty() {
            return Err(NaiveSocksError::Transport(format!(
                "No usable address for {}:{}",
                host, port
            )));
        }
        Ok(addrs)
    }

    /// Dial `addrs` in order; the last failure is returned if none connects
    async fn connect_any(&self, addrs: &[SocketAddr]) -> Result<TcpStream> {
        let mut last_err = None;
        for addr in addrs {
            match self.connect_addr(*addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::debug!("Connection to {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| NaiveSocksError::Transport("No address to connect to".to_string())))
    }

    async fn connect_addr(&self, addr: SocketAddr) -> Result<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NaiveSocksError::Timeout(format!("connecting to {}", addr)))??;

        self.socket_opts.hint(&stream);

        tracing::debug!("TCP connection established to {}", addr);

        Ok(stream)
    }
}

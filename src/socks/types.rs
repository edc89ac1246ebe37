//! SOCKS5 type definitions
//!
//! The destination address travels in SOCKS5 form twice: from the
//! application to the local relay, and (substituted) from the local relay
//! to the server relay.

use super::consts::*;
use crate::error::{NaiveSocksError, ProtocolError, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Destination of a CONNECT request
///
/// Can be an IP address (v4 or v6) or a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetAddr {
    /// IP address with port
    Ip(SocketAddr),
    /// Domain name with port
    Domain(String, u16),
}

impl TargetAddr {
    /// Create a new TargetAddr from an IPv4 address and port
    pub fn ipv4(ip: Ipv4Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V4(ip), port))
    }

    /// Create a new TargetAddr from an IPv6 address and port
    pub fn ipv6(ip: Ipv6Addr, port: u16) -> Self {
        TargetAddr::Ip(SocketAddr::new(IpAddr::V6(ip), port))
    }

    /// Create a new TargetAddr from a domain name and port
    pub fn domain(domain: String, port: u16) -> Self {
        TargetAddr::Domain(domain, port)
    }

    /// Get the port number
    pub fn port(&self) -> u16 {
        match self {
            TargetAddr::Ip(addr) => addr.port(),
            TargetAddr::Domain(_, port) => *port,
        }
    }

    /// Get the address type byte for SOCKS5 protocol
    pub fn addr_type(&self) -> u8 {
        match self {
            TargetAddr::Ip(SocketAddr::V4(_)) => SOCKS5_ADDR_TYPE_IPV4,
            TargetAddr::Ip(SocketAddr::V6(_)) => SOCKS5_ADDR_TYPE_IPV6,
            TargetAddr::Domain(_, _) => SOCKS5_ADDR_TYPE_DOMAIN,
        }
    }

    /// Read `[len] addr port` for an already consumed `addr_type`
    pub async fn read_from<S>(stream: &mut S, addr_type: u8) -> Result<Self>
    where
        S: AsyncRead + Unpin,
    {
        let target = match addr_type {
            SOCKS5_ADDR_TYPE_IPV4 => {
                let mut addr = [0u8; 4];
                stream.read_exact(&mut addr).await?;
                TargetAddr::ipv4(Ipv4Addr::from(addr), read_port(stream).await?)
            }

            SOCKS5_ADDR_TYPE_DOMAIN => {
                let domain_len = stream.read_u8().await? as usize;
                if domain_len == 0 {
                    return Err(ProtocolError::InvalidDomain("empty domain name".to_string()).into());
                }

                let mut domain_buf = vec![0u8; domain_len];
                stream.read_exact(&mut domain_buf).await?;
                let domain = String::from_utf8(domain_buf).map_err(|e| {
                    ProtocolError::InvalidDomain(String::from_utf8_lossy(e.as_bytes()).into_owned())
                })?;

                TargetAddr::domain(domain, read_port(stream).await?)
            }

            SOCKS5_ADDR_TYPE_IPV6 => {
                let mut addr = [0u8; 16];
                stream.read_exact(&mut addr).await?;
                TargetAddr::ipv6(Ipv6Addr::from(addr), read_port(stream).await?)
            }

            other => return Err(ProtocolError::AddressTypeNotSupported(other).into()),
        };

        Ok(target)
    }

    /// Resolve the address to a SocketAddr
    ///
    /// For IP addresses, this returns immediately.
    /// For domain names, this performs DNS resolution.
    pub async fn resolve(&self) -> Result<SocketAddr> {
        match self {
            TargetAddr::Ip(addr) => Ok(*addr),
            TargetAddr::Domain(domain, port) => tokio::net::lookup_host((domain.as_str(), *port))
                .await?
                .next()
                .ok_or_else(|| {
                    NaiveSocksError::Transport(format!("No addresses found for domain: {}", domain))
                }),
        }
    }

    /// Serialize as `ATYP [len] addr port`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();

        match self {
            TargetAddr::Ip(SocketAddr::V4(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV4);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Ip(SocketAddr::V6(addr)) => {
                bytes.push(SOCKS5_ADDR_TYPE_IPV6);
                bytes.extend_from_slice(&addr.ip().octets());
                bytes.extend_from_slice(&addr.port().to_be_bytes());
            }
            TargetAddr::Domain(domain, port) => {
                let domain = &domain.as_bytes()[..domain.len().min(MAX_DOMAIN_LEN)];
                bytes.push(SOCKS5_ADDR_TYPE_DOMAIN);
                bytes.push(domain.len() as u8);
                bytes.extend_from_slice(domain);
                bytes.extend_from_slice(&port.to_be_bytes());
            }
        }

        bytes
    }
}

async fn read_port<S: AsyncRead + Unpin>(stream: &mut S) -> Result<u16> {
    Ok(stream.read_u16().await?)
}

impl fmt::Display for TargetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAddr::Ip(addr) => write!(f, "{}", addr),
            TargetAddr::Domain(domain, port) => write!(f, "{}:{}", domain, port),
        }
    }
}

impl From<SocketAddr> for TargetAddr {
    fn from(addr: SocketAddr) -> Self {
        TargetAddr::Ip(addr)
    }
}

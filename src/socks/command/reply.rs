//! SOCKS5 reply builder
//!
//! Constructs SOCKS5 reply messages.

use crate::error::{NaiveSocksError, ProtocolError, Result};
use crate::socks::consts::*;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Build and send a SOCKS5 reply
///
/// # SOCKS5 Reply Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// # Arguments
///
/// * `stream` - The stream to write to
/// * `reply_code` - The reply status code
/// * `bind_addr` - The bound address (optional, defaults to 0.0.0.0:0)
pub async fn build_reply<S>(
    stream: &mut S,
    reply_code: u8,
    bind_addr: Option<SocketAddr>,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let reply = reply_bytes(reply_code, bind_addr);

    stream.write_all(&reply).await?;
    stream.flush().await?;

    Ok(())
}

/// Send the success reply the local relay answers with before dialing
///
/// The announced bind address is always `0.0.0.0:2222`; it does not
/// describe a real socket.
pub async fn send_eager_reply<S>(stream: &mut S) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    build_reply(stream, SOCKS5_REPLY_SUCCEEDED, Some(EAGER_BIND_ADDR)).await
}

/// Reply code for a request the local relay refuses
///
/// Returns `None` when the request cannot be answered at all, e.g. because
/// the client already went away.
pub fn reply_code_for(error: &NaiveSocksError) -> Option<u8> {
    match error {
        NaiveSocksError::Protocol(ProtocolError::CommandNotSupported(_)) => {
            Some(SOCKS5_REPLY_COMMAND_NOT_SUPPORTED)
        }
        NaiveSocksError::Protocol(ProtocolError::AddressTypeNotSupported(_)) => {
            Some(SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED)
        }
        NaiveSocksError::Protocol(ProtocolError::InvalidDomain(_)) => {
            Some(SOCKS5_REPLY_GENERAL_FAILURE)
        }
        _ => None,
    }
}

fn reply_bytes(reply_code: u8, bind_addr: Option<SocketAddr>) -> Vec<u8> {
    let bind_addr =
        bind_addr.unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0));

    let mut reply = vec![SOCKS5_VERSION, reply_code, SOCKS5_RESERVED];

    match bind_addr {
        SocketAddr::V4(addr) => {
            reply.push(SOCKS5_ADDR_TYPE_IPV4);
            reply.extend_from_slice(&addr.ip().octets());
            reply.extend_from_slice(&addr.port().to_be_bytes());
        }
        SocketAddr::V6(addr) => {
            reply.push(SOCKS5_ADDR_TYPE_IPV6);
            reply.extend_from_slice(&addr.ip().octets());
            reply.extend_from_slice(&addr.port().to_be_bytes());
        }
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_reply_bytes_ipv4() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)), 8080);
        let reply = reply_bytes(SOCKS5_REPLY_SUCCEEDED, Some(addr));

        assert_eq!(reply[0], SOCKS5_VERSION);
        assert_eq!(reply[1], SOCKS5_REPLY_SUCCEEDED);
        assert_eq!(reply[2], SOCKS5_RESERVED);
        assert_eq!(reply[3], SOCKS5_ADDR_TYPE_IPV4);
        assert_eq!(&reply[4..8], &[192, 168, 1, 1]);
        assert_eq!(&reply[8..10], &8080u16.to_be_bytes());
    }

    #[test]
    fn test_reply_bytes_ipv6() {
        let addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 443);
        let reply = reply_bytes(SOCKS5_REPLY_SUCCEEDED, Some(addr));

        assert_eq!(reply[3], SOCKS5_ADDR_TYPE_IPV6);
        assert_eq!(reply.len(), 3 + 1 + 16 + 2);
    }

    #[test]
    fn test_reply_bytes_default_addr() {
        let reply = reply_bytes(SOCKS5_REPLY_GENERAL_FAILURE, None);
        assert_eq!(reply, vec![5, 1, 0, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_eager_reply_bytes() {
        let mut buffer = Vec::new();
        send_eager_reply(&mut buffer).await.unwrap();

        assert_eq!(buffer, vec![0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0x08, 0xAE]);
    }

    #[test]
    fn test_reply_code_for() {
        let err: NaiveSocksError = ProtocolError::CommandNotSupported(2).into();
        assert_eq!(reply_code_for(&err), Some(SOCKS5_REPLY_COMMAND_NOT_SUPPORTED));

        let err: NaiveSocksError = ProtocolError::AddressTypeNotSupported(9).into();
        assert_eq!(reply_code_for(&err), Some(SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED));

        let err = NaiveSocksError::Transport("gone".to_string());
        assert_eq!(reply_code_for(&err), None);
    }
}

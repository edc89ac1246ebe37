//! SOCKS5 request parser
//!
//! Parses the CONNECT request that follows method negotiation.

use crate::error::{ProtocolError, Result};
use crate::socks::consts::*;
use crate::socks::types::TargetAddr;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Parse a SOCKS5 request from the stream
///
/// # SOCKS5 Request Format
///
/// ```text
/// +----+-----+-------+------+----------+----------+
/// |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
/// +----+-----+-------+------+----------+----------+
/// | 1  |  1  | X'00' |  1   | Variable |    2     |
/// +----+-----+-------+------+----------+----------+
/// ```
///
/// Only CONNECT is accepted. Domain names are left unresolved; the server
/// relay resolves them on its side of the tunnel.
pub async fn parse_request<S>(stream: &mut S) -> Result<TargetAddr>
where
    S: AsyncRead + Unpin,
{
    // Read: VER CMD RSV ATYP
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;

    let version = header[0];
    let cmd_byte = header[1];
    let addr_type = header[3];

    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version).into());
    }

    if cmd_byte != SOCKS5_CMD_TCP_CONNECT {
        return Err(ProtocolError::CommandNotSupported(cmd_byte).into());
    }

    let target = TargetAddr::read_from(stream, addr_type).await?;

    debug!("Parsed SOCKS5 CONNECT to {}", target);

    Ok(target)
}

//! SOCKS5 method negotiation
//!
//! Only "no authentication" is offered.

use super::consts::*;
use crate::error::{ProtocolError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Read the client greeting and select method 0x00
///
/// A client that does not offer 0x00 gets `05 FF` and a
/// [`ProtocolError::NoAcceptableMethod`].
pub async fn negotiate<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    let version = buf[0];
    let num_methods = buf[1];

    if version != SOCKS5_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version).into());
    }

    let mut methods = vec![0u8; num_methods as usize];
    stream.read_exact(&mut methods).await?;
    trace!("Client offered methods {:?}", methods);

    let selected = if methods.contains(&SOCKS5_AUTH_METHOD_NONE) {
        SOCKS5_AUTH_METHOD_NONE
    } else {
        SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE
    };

    stream.write_all(&[SOCKS5_VERSION, selected]).await?;
    stream.flush().await?;

    if selected == SOCKS5_AUTH_METHOD_NOT_ACCEPTABLE {
        return Err(ProtocolError::NoAcceptableMethod.into());
    }

    Ok(())
}

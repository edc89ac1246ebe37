//! Ciphered duplex copy
//!
//! Shuttles bytes between a plain stream and a ciphered stream. Plain reads
//! are sealed into one relay frame each; ciphered bytes are buffered until a
//! whole frame is present, then opened and written out.

use crate::crypto::SessionCipher;
use crate::error::{NaiveSocksError, Result};
use crate::helper::DEFAULT_BUFFER_SIZE;
use crate::protocol::{encode_frame, take_frame, Role};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Plaintext byte counts for one relayed connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes read from the local stream and delivered to the remote one
    pub local_to_remote: u64,
    /// Bytes read from the remote stream and delivered to the local one
    pub remote_to_local: u64,
}

#[derive(Default)]
struct PumpStats {
    sealed: u64,
    opened: u64,
}

/// Relay between `local` and `remote` until either side closes
///
/// The initiator seals what it reads locally and opens what the remote side
/// sends; the responder does the inverse. Streams are not shut down here,
/// see [`Connection`](super::Connection) for that.
pub async fn run<L, R>(
    local: &mut L,
    remote: &mut R,
    cipher: &SessionCipher,
    role: Role,
) -> Result<RelayStats>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    match role {
        Role::Initiator => {
            let stats = pump(local, remote, cipher).await?;
            Ok(RelayStats {
                local_to_remote: stats.sealed,
                remote_to_local: stats.opened,
            })
        }
        Role::Responder => {
            let stats = pump(remote, local, cipher).await?;
            Ok(RelayStats {
                local_to_remote: stats.opened,
                remote_to_local: stats.sealed,
            })
        }
    }
}

async fn pump<P, C>(plain: &mut P, sealed: &mut C, cipher: &SessionCipher) -> Result<PumpStats>
where
    P: AsyncRead + AsyncWrite + Unpin,
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut plain_buf = vec![0u8; DEFAULT_BUFFER_SIZE];
    let mut frames = BytesMut::with_capacity(DEFAULT_BUFFER_SIZE);
    let mut stats = PumpStats::default();

    loop {
        frames.reserve(DEFAULT_BUFFER_SIZE);

        tokio::select! {
            res = plain.read(&mut plain_buf) => {
                let n = res?;
                if n == 0 {
                    debug!("Plain side closed");
                    break;
                }
                let frame = encode_frame(cipher, &plain_buf[..n])?;
                sealed.write_all(&frame).await?;
                stats.sealed += n as u64;
            }
            res = sealed.read_buf(&mut frames) => {
                let n = res?;
                if n == 0 {
                    if !frames.is_empty() {
                        return Err(NaiveSocksError::Transport(format!(
                            "ciphered side closed inside a frame ({} bytes pending)",
                            frames.len()
                        )));
                    }
                    debug!("Ciphered side closed");
                    break;
                }
                while let Some(payload) = take_frame(&mut frames) {
                    let data = cipher.decrypt(&payload)?;
                    plain.write_all(&data).await?;
                    stats.opened += data.len() as u64;
                }
            }
        }
    }

    debug!("Relay finished: {} bytes sealed, {} bytes opened", stats.sealed, stats.opened);
    Ok(stats)
}

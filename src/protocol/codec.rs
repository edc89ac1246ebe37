//! Wire framing for handshake messages and relay frames
//!
//! Both use a 2-byte big-endian length prefix. Handshake frames are passed
//! whole (prefix included) through the substitution cipher; relay frames
//! carry DES ciphertext behind a plain prefix.

use crate::crypto::{SessionCipher, SubstitutionCipher};
use crate::error::{ProtocolError, Result};
use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

/// Size of the length prefix
pub const FRAME_HEADER_LEN: usize = 2;

/// Largest payload a frame can carry
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

fn frame_len(len: usize) -> Result<[u8; FRAME_HEADER_LEN]> {
    let len = u16::try_from(len).map_err(|_| {
        ProtocolError::MalformedMessage(format!(
            "payload of {} bytes exceeds the {} byte frame limit",
            len, MAX_FRAME_LEN
        ))
    })?;
    Ok(len.to_be_bytes())
}

/// Write one substituted handshake message
pub async fn write_message<T: AsyncWrite + Unpin>(
    conn: &mut T,
    table: &SubstitutionCipher,
    payload: &[u8],
) -> Result<()> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.extend_from_slice(&frame_len(payload.len())?);
    buf.extend_from_slice(payload);
    table.encrypt_in_place(&mut buf);

    trace!("Write handshake message of length {}", payload.len());
    conn.write_all(&buf).await?;
    conn.flush().await?;
    Ok(())
}

/// Read one substituted handshake message
pub async fn read_message<T: AsyncRead + Unpin>(
    conn: &mut T,
    table: &SubstitutionCipher,
) -> Result<Vec<u8>> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    conn.read_exact(&mut header).await?;
    table.decrypt_in_place(&mut header);
    let len = u16::from_be_bytes(header) as usize;

    let mut payload = vec![0u8; len];
    conn.read_exact(&mut payload).await?;
    table.decrypt_in_place(&mut payload);

    trace!("Read handshake message of length {}", len);
    Ok(payload)
}

/// Encrypt `plaintext` into a length-prefixed relay frame
pub fn encode_frame(cipher: &SessionCipher, plaintext: &[u8]) -> Result<Vec<u8>> {
    let ciphertext = cipher.encrypt(plaintext);
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + ciphertext.len());
    frame.extend_from_slice(&frame_len(ciphertext.len())?);
    frame.extend_from_slice(&ciphertext);
    Ok(frame)
}

/// Split the next complete frame payload off the front of `buf`
///
/// Returns `None` until the whole frame has been buffered.
pub fn take_frame(buf: &mut BytesMut) -> Option<BytesMut> {
    if buf.len() < FRAME_HEADER_LEN {
        return None;
    }
    let len = u16::from_be_bytes([buf[0], buf[1]]) as usize;
    if buf.len() < FRAME_HEADER_LEN + len {
        buf.reserve(FRAME_HEADER_LEN + len - buf.len());
        return None;
    }

    buf.advance(FRAME_HEADER_LEN);
    Some(buf.split_to(len))
}

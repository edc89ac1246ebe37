//! Destination header between the two relays
//!
//! The local relay forwards the client's `ATYP [len] addr port` to the
//! server relay, passed through the substitution table.

use super::types::TargetAddr;
use crate::crypto::SubstitutionCipher;
use crate::error::Result;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tracing::trace;

/// Reader that unsubstitutes every byte it yields
///
/// Reads are passed straight through to the inner stream, so nothing beyond
/// what the caller asked for is consumed.
pub struct SubstitutedReader<'a, S> {
    inner: S,
    table: &'a SubstitutionCipher,
}

impl<'a, S> SubstitutedReader<'a, S> {
    /// Wrap `inner`, decoding with `table`
    pub fn new(inner: S, table: &'a SubstitutionCipher) -> Self {
        SubstitutedReader { inner, table }
    }

    /// Unwrap the inner stream
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for SubstitutedReader<'_, S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let start = buf.filled().len();
        let table = self.table;
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            table.decrypt_in_place(&mut buf.filled_mut()[start..]);
        }
        poll
    }
}

/// Send the substituted destination header
pub async fn write_target<S>(stream: &mut S, table: &SubstitutionCipher, target: &TargetAddr) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let header = table.encrypt(&target.to_bytes());
    stream.write_all(&header).await?;
    stream.flush().await?;
    trace!("Forwarded destination {}", target);
    Ok(())
}

/// Read the substituted destination header
///
/// ATYP, address and port are read in order, each only as far as needed.
pub async fn read_target<S>(stream: &mut S, table: &SubstitutionCipher) -> Result<TargetAddr>
where
    S: AsyncRead + Unpin,
{
    let mut reader = SubstitutedReader::new(stream, table);
    let addr_type = reader.read_u8().await?;
    let target = TargetAddr::read_from(&mut reader, addr_type).await?;
    trace!("Received destination {}", target);
    Ok(target)
}

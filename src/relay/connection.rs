//! Stream pair ownership
//!
//! A [`Connection`] owns both streams of one tunnelled connection and makes
//! sure they are shut down once, whichever step failed.

use super::engine::{self, RelayStats};
use crate::crypto::SessionCipher;
use crate::error::Result;
use crate::protocol::Role;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// The local and remote stream of one connection
///
/// There is no `Drop` impl: dropping a `Connection` that was never closed
/// releases both sockets through the owned streams, without a shutdown.
#[derive(Debug)]
pub struct Connection<L, R> {
    local: L,
    remote: R,
    closed: bool,
}

impl<L, R> Connection<L, R>
where
    L: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + AsyncWrite + Unpin,
{
    /// Take ownership of both streams
    pub fn new(local: L, remote: R) -> Self {
        Connection {
            local,
            remote,
            closed: false,
        }
    }

    /// The local-facing stream
    pub fn local_mut(&mut self) -> &mut L {
        &mut self.local
    }

    /// The remote-facing stream
    pub fn remote_mut(&mut self) -> &mut R {
        &mut self.remote
    }

    /// Whether [`close`](Self::close) already ran
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Relay until either side closes, then close both streams
    pub async fn relay(&mut self, cipher: &SessionCipher, role: Role) -> Result<RelayStats> {
        let result = engine::run(&mut self.local, &mut self.remote, cipher, role).await;
        self.close().await;
        result
    }

    /// Shut down both streams; later calls do nothing
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.local.shutdown().await {
            debug!("Local shutdown error: {}", e);
        }
        if let Err(e) = self.remote.shutdown().await {
            debug!("Remote shutdown error: {}", e);
        }
    }
}

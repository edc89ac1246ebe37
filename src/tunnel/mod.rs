//! Accept loops for both relay roles
//!
//! Each accepted connection gets its own task; a failure is logged and only
//! tears down that connection. The loop stops on the broadcast shutdown
//! signal.

mod local;
mod server;

pub use local::LocalRelay;
pub use server::ServerRelay;

use crate::transport::SocketOpts;
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Bind the listening socket for a relay
async fn bind_listener(address: &str, port: u16) -> Result<TcpListener> {
    TcpListener::bind((address, port))
        .await
        .with_context(|| format!("Failed to listen on {}:{}", address, port))
}

/// Accept until shutdown, spawning `handler` for every connection
async fn serve<F, Fut>(
    listener: TcpListener,
    socket_opts: SocketOpts,
    name: &'static str,
    mut shutdown_rx: broadcast::Receiver<bool>,
    handler: F,
) -> Result<()>
where
    F: Fn(TcpStream, SocketAddr) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    info!("{} relay listening on {}", name, listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                socket_opts.hint(&stream);
                debug!("Accepted connection from {}", peer);

                let task = handler(stream, peer);
                tokio::spawn(async move {
                    if let Err(e) = task.await {
                        error!("Connection from {} failed: {:#}", peer, e);
                    }
                });
            }
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received, stopping {} relay", name);
                break;
            }
        }
    }

    Ok(())
}

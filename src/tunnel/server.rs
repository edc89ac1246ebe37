//! Server relay
//!
//! Accepts tunnel connections from local relays and dials the destination
//! each one names.

use super::{bind_listener, serve};
use crate::config::Config;
use crate::crypto::SubstitutionCipher;
use crate::helper::{duration_from_secs, with_timeout};
use crate::protocol::{respond, Role};
use crate::relay::{Connection, RelayStats};
use crate::socks;
use crate::transport::{SocketOpts, TcpConnector};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug)]
struct ServerContext {
    table: SubstitutionCipher,
    connector: TcpConnector,
    handshake_timeout: u64,
}

/// The destination-facing end of the tunnel
#[derive(Debug)]
pub struct ServerRelay {
    listener: TcpListener,
    socket_opts: SocketOpts,
    context: Arc<ServerContext>,
}

impl ServerRelay {
    /// Listen on `bind_address:server_port`
    pub async fn bind(config: &Config) -> Result<Self> {
        let listener = bind_listener(&config.bind_address, config.server_port).await?;
        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);

        let connector = TcpConnector::with_defaults()
            .with_socket_opts(socket_opts.clone())
            .with_connect_timeout(duration_from_secs(config.connect_timeout));

        let context = ServerContext {
            table: SubstitutionCipher::new(config.password.as_bytes()),
            connector,
            handshake_timeout: config.handshake_timeout,
        };

        Ok(ServerRelay {
            listener,
            socket_opts,
            context: Arc::new(context),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the relay until shutdown
    pub async fn run(self, shutdown_rx: broadcast::Receiver<bool>) -> Result<()> {
        let context = self.context;
        serve(self.listener, self.socket_opts, "server", shutdown_rx, move |stream, peer| {
            handle_tunnel(stream, peer, context.clone())
        })
        .await
    }
}

async fn handle_tunnel(
    mut local: TcpStream,
    peer: SocketAddr,
    context: Arc<ServerContext>,
) -> Result<()> {
    let target = socks::read_target(&mut local, &context.table)
        .await
        .context("Failed to read destination")?;
    info!("{} connecting {}", peer, target);

    let remote = context
        .connector
        .connect_target(&target)
        .await
        .with_context(|| format!("Failed to reach {}", target))?;

    let mut conn = Connection::new(local, remote);
    let result = tunnel(&mut conn, &context).await;
    conn.close().await;

    let stats = result?;
    debug!(
        "{} done: {} bytes up, {} bytes down",
        target, stats.local_to_remote, stats.remote_to_local
    );
    Ok(())
}

async fn tunnel(
    conn: &mut Connection<TcpStream, TcpStream>,
    context: &ServerContext,
) -> Result<RelayStats> {
    let cipher = with_timeout(
        context.handshake_timeout,
        "handshake",
        respond(conn.local_mut(), &context.table),
    )
    .await
    .context("Handshake with local relay failed")?;

    Ok(conn.relay(&cipher, Role::Responder).await?)
}

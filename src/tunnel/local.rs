//! Local relay
//!
//! Accepts SOCKS5 clients and carries each CONNECT through the server relay.

use super::{bind_listener, serve};
use crate::config::Config;
use crate::crypto::SubstitutionCipher;
use crate::helper::{duration_from_secs, with_timeout};
use crate::protocol::{initiate, Role};
use crate::relay::{Connection, RelayStats};
use crate::socks::{self, TargetAddr};
use crate::transport::{SocketOpts, TcpConnector};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Shared state of every local connection task
#[derive(Debug)]
struct LocalContext {
    table: SubstitutionCipher,
    connector: TcpConnector,
    server: String,
    server_port: u16,
    handshake_timeout: u64,
}

/// The SOCKS5-facing end of the tunnel
#[derive(Debug)]
pub struct LocalRelay {
    listener: TcpListener,
    socket_opts: SocketOpts,
    context: Arc<LocalContext>,
}

impl LocalRelay {
    /// Listen on `bind_address:local_port`
    pub async fn bind(config: &Config) -> Result<Self> {
        let listener = bind_listener(&config.bind_address, config.local_port).await?;
        let socket_opts = SocketOpts::from_tcp_config(&config.tcp);

        let connector = TcpConnector::with_defaults()
            .with_socket_opts(socket_opts.clone())
            .with_connect_timeout(duration_from_secs(config.connect_timeout))
            .with_ipv6_only(config.ipv6);

        let context = LocalContext {
            table: SubstitutionCipher::new(config.password.as_bytes()),
            connector,
            server: config.server.clone(),
            server_port: config.server_port,
            handshake_timeout: config.handshake_timeout,
        };

        Ok(LocalRelay {
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
        info!(
            "Forwarding SOCKS5 clients to {}:{}",
            self.context.server, self.context.server_port
        );

        let context = self.context;
        serve(self.listener, self.socket_opts, "local", shutdown_rx, move |stream, peer| {
            handle_client(stream, peer, context.clone())
        })
        .await
    }
}

async fn handle_client(
    mut client: TcpStream,
    peer: SocketAddr,
    context: Arc<LocalContext>,
) -> Result<()> {
    let target = socks_front(&mut client).await?;
    info!("{} connecting {}", peer, target);

    let remote = context
        .connector
        .connect_host(&context.server, context.server_port)
        .await
        .with_context(|| format!("Failed to reach server {}:{}", context.server, context.server_port))?;

    let mut conn = Connection::new(client, remote);
    let result = tunnel(&mut conn, &target, &context).await;
    conn.close().await;

    let stats = result?;
    debug!(
        "{} done: {} bytes up, {} bytes down",
        target, stats.local_to_remote, stats.remote_to_local
    );
    Ok(())
}

/// Negotiate, parse the CONNECT request and answer eagerly
async fn socks_front(client: &mut TcpStream) -> Result<TargetAddr> {
    socks::negotiate(client)
        .await
        .context("SOCKS5 negotiation failed")?;

    let target = match socks::parse_request(client).await {
        Ok(target) => target,
        Err(e) => {
            if let Some(code) = socks::reply_code_for(&e) {
                socks::build_reply(client, code, None).await?;
            }
            return Err(e).context("Invalid SOCKS5 request");
        }
    };

    socks::send_eager_reply(client).await?;
    Ok(target)
}

async fn tunnel(
    conn: &mut Connection<TcpStream, TcpStream>,
    target: &TargetAddr,
    context: &LocalContext,
) -> Result<RelayStats> {
    socks::write_target(conn.remote_mut(), &context.table, target).await?;

    let cipher = with_timeout(
        context.handshake_timeout,
        "handshake",
        initiate(conn.remote_mut(), &context.table),
    )
    .await
    .context("Handshake with server failed")?;

    Ok(conn.relay(&cipher, Role::Initiator).await?)
}

//! Local relay and server relay over real TCP sockets

mod common;

use common::{socks5_mock, spawn_echo_server, TestConfigBuilder};
use naivesocks::tunnel::{LocalRelay, ServerRelay};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

const EAGER_REPLY: [u8; 10] = [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0x08, 0xAE];

/// Start both relays; returns the local relay's address
async fn start_tunnel(
    local_password: &str,
    server_password: &str,
    shutdown_tx: &broadcast::Sender<bool>,
) -> SocketAddr {
    let server_config = TestConfigBuilder::new().password(server_password).build();
    let server = ServerRelay::bind(&server_config).await.unwrap();
    let server_addr = server.local_addr().unwrap();

    let mut local_config = TestConfigBuilder::new()
        .password(local_password)
        .server_port(server_addr.port())
        .handshake_timeout(3)
        .build();
    local_config.connect_timeout = 1;
    let local = LocalRelay::bind(&local_config).await.unwrap();
    let local_addr = local.local_addr().unwrap();

    tokio::spawn(server.run(shutdown_tx.subscribe()));
    tokio::spawn(local.run(shutdown_tx.subscribe()));

    local_addr
}

async fn socks_connect(local_addr: SocketAddr, request: &[u8]) -> (TcpStream, [u8; 10]) {
    let mut client = TcpStream::connect(local_addr).await.unwrap();

    client
        .write_all(&socks5_mock::create_auth_request_no_auth())
        .await
        .unwrap();
    let mut method = [0u8; 2];
    client.read_exact(&mut method).await.unwrap();
    assert_eq!(method, [0x05, 0x00]);

    client.write_all(request).await.unwrap();
    let mut reply = [0u8; 10];
    client.read_exact(&mut reply).await.unwrap();

    (client, reply)
}

#[tokio::test]
async fn test_tunnel_to_echo_server() {
    let echo_addr = spawn_echo_server().await;
    let (shutdown_tx, _) = broadcast::channel(1);
    let local_addr = start_tunnel("barfoo!", "barfoo!", &shutdown_tx).await;

    let request = socks5_mock::create_connect_ipv4([127, 0, 0, 1], echo_addr.port());
    let (mut client, reply) = socks_connect(local_addr, &request).await;
    assert_eq!(reply, EAGER_REPLY);

    let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 253) as u8).collect();
    client.write_all(&payload).await.unwrap();

    let mut echoed = vec![0u8; payload.len()];
    tokio::time::timeout(Duration::from_secs(10), client.read_exact(&mut echoed))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(echoed, payload);

    let _ = shutdown_tx.send(true);
}

#[tokio::test]
async fn test_tunnel_resolves_domain_on_server_side() {
    let echo_addr = spawn_echo_server().await;
    let (shutdown_tx, _) = broadcast::channel(1);
    let local_addr = start_tunnel("barfoo!", "barfoo!", &shutdown_tx).await;

    let request = socks5_mock::create_connect_domain("localhost", echo_addr.port());
    let (mut client, reply) = socks_connect(local_addr, &request).await;
    assert_eq!(reply, EAGER_REPLY);

    client.write_all(b"ping").await.unwrap();
    let mut echoed = [0u8; 4];
    tokio::time::timeout(Duration::from_secs(10), client.read_exact(&mut echoed))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&echoed, b"ping");

    let _ = shutdown_tx.send(true);
}

#[tokio::test]
async fn test_password_mismatch_closes_connection() {
    let echo_addr = spawn_echo_server().await;
    let (shutdown_tx, _) = broadcast::channel(1);
    let local_addr = start_tunnel("barfoo!", "foobar?", &shutdown_tx).await;

    let request = socks5_mock::create_connect_ipv4([127, 0, 0, 1], echo_addr.port());
    let (mut client, reply) = socks_connect(local_addr, &request).await;
    assert_eq!(reply, EAGER_REPLY);

    // The tunnel never comes up, so the local relay closes without sending
    let mut buf = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(15), client.read_to_end(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);
    assert!(buf.is_empty());

    let _ = shutdown_tx.send(true);
}

#[tokio::test]
async fn test_unsupported_command_is_refused() {
    let (shutdown_tx, _) = broadcast::channel(1);
    let local_addr = start_tunnel("barfoo!", "barfoo!", &shutdown_tx).await;

    let mut request = socks5_mock::create_connect_ipv4([127, 0, 0, 1], 80);
    request[1] = 0x02; // BIND
    let (_client, reply) = socks_connect(local_addr, &request).await;

    assert_eq!(reply[0], 0x05);
    assert_eq!(reply[1], 0x07);

    let _ = shutdown_tx.send(true);
}

#[tokio::test]
async fn test_shutdown_stops_relay() {
    let config = TestConfigBuilder::new().build();
    let server = ServerRelay::bind(&config).await.unwrap();
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let handle = tokio::spawn(server.run(shutdown_rx));
    shutdown_tx.send(true).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}

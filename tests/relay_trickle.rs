//! Handshake and relay over streams that move only a few bytes at a time

mod common;

use bytes::BytesMut;
use common::{create_mock_stream_pair, Trickle};
use naivesocks::crypto::{SessionCipher, SessionKey, SubstitutionCipher};
use naivesocks::protocol::{encode_frame, initiate, respond, take_frame, Role};
use naivesocks::relay;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const REQUEST: &[u8] = b"GET / HTTP/1.1\r\n\r\n";
const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";

fn cipher() -> SessionCipher {
    SessionCipher::new(SessionKey::from_bytes(b"ABCDEFGH").unwrap())
}

#[tokio::test]
async fn test_trickled_relay_round_trip() {
    let (mut app, local) = create_mock_stream_pair();
    let (remote, mut peer) = create_mock_stream_pair();

    let relay = tokio::spawn(async move {
        let mut local = Trickle::new(local);
        let mut remote = Trickle::new(remote);
        relay::run(&mut local, &mut remote, &cipher(), Role::Initiator).await
    });

    // Local plaintext arrives at the peer as a series of frames
    app.write_all(REQUEST).await.unwrap();
    let mut sealed = BytesMut::new();
    let mut received = Vec::new();
    while received.len() < REQUEST.len() {
        peer.read_buf(&mut sealed).await.unwrap();
        while let Some(payload) = take_frame(&mut sealed) {
            received.extend(cipher().decrypt(&payload).unwrap());
        }
    }
    assert_eq!(received, REQUEST);

    // A reply frame is opened exactly even though it trickles in
    peer.write_all(&encode_frame(&cipher(), RESPONSE).unwrap())
        .await
        .unwrap();
    let mut reply = vec![0u8; RESPONSE.len()];
    app.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply, RESPONSE);

    drop(peer);
    let stats = tokio::time::timeout(Duration::from_secs(5), relay)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stats.local_to_remote, REQUEST.len() as u64);
    assert_eq!(stats.remote_to_local, RESPONSE.len() as u64);
}

#[tokio::test]
async fn test_trickled_handshake_then_relay() {
    let table = SubstitutionCipher::new(b"trickle");
    let (initiator_end, responder_end) = create_mock_stream_pair();
    let (mut app, local_plain) = create_mock_stream_pair();
    let (remote_plain, mut target) = create_mock_stream_pair();

    let initiator_table = table.clone();
    let initiator = tokio::spawn(async move {
        let mut tunnel = Trickle::new(initiator_end);
        let mut local = local_plain;
        let cipher = initiate(&mut tunnel, &initiator_table).await?;
        relay::run(&mut local, &mut tunnel, &cipher, Role::Initiator).await
    });

    let responder = tokio::spawn(async move {
        let mut tunnel = Trickle::new(responder_end);
        let mut remote = remote_plain;
        let cipher = respond(&mut tunnel, &table).await?;
        relay::run(&mut tunnel, &mut remote, &cipher, Role::Responder).await
    });

    app.write_all(REQUEST).await.unwrap();
    let mut request = vec![0u8; REQUEST.len()];
    target.read_exact(&mut request).await.unwrap();
    assert_eq!(request, REQUEST);

    target.write_all(RESPONSE).await.unwrap();
    let mut response = vec![0u8; RESPONSE.len()];
    app.read_exact(&mut response).await.unwrap();
    assert_eq!(response, RESPONSE);

    drop(app);
    let initiator_stats = tokio::time::timeout(Duration::from_secs(10), initiator)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(initiator_stats.local_to_remote, REQUEST.len() as u64);

    drop(target);
    let responder_stats = tokio::time::timeout(Duration::from_secs(10), responder)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(responder_stats.local_to_remote, REQUEST.len() as u64);
    assert_eq!(responder_stats.remote_to_local, RESPONSE.len() as u64);
}

//! End-to-end session scenarios, driven over real loopback sockets with a
//! virtual clock so heartbeat/idle-timeout behavior is deterministic.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use soupbin_core::env::Environment;
use soupbin_core::handler::{ClientHandler, ServerHandler, ServerOps};
use soupbin_core::session::{ClientSession, ServerSession};
use soupbin_core::storage::{LogEntry, Storage, StorageError};
use soupbin_proto::{packet_type, Frame, LoginAccept, LoginRequest};

#[derive(Clone, Default)]
struct TestStorage {
    inner: Arc<Mutex<HashMap<String, (Vec<LogEntry>, Vec<LogEntry>)>>>,
}

impl Storage for TestStorage {
    fn open(&self, name: &str) -> Result<(), StorageError> {
        self.inner.lock().unwrap().entry(name.to_string()).or_default();
        Ok(())
    }

    fn store_output(&self, name: &str, body: &[u8]) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entry(name.to_string()).or_default();
        let sequence = entry.1.len() as u64 + 1;
        entry.1.push(LogEntry { sequence, body: body.to_vec() });
        Ok(sequence)
    }

    fn load_output(&self, name: &str, from_sequence: u64) -> Result<Vec<LogEntry>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .get(name)
            .map(|(_, output)| output.iter().filter(|e| e.sequence >= from_sequence).cloned().collect())
            .unwrap_or_default())
    }

    fn store_input(&self, name: &str, body: &[u8]) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let entry = inner.entry(name.to_string()).or_default();
        let sequence = entry.0.len() as u64 + 1;
        entry.0.push(LogEntry { sequence, body: body.to_vec() });
        Ok(sequence)
    }

    fn load_input(&self, name: &str) -> Result<Vec<LogEntry>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.get(name).map(|(input, _)| input.clone()).unwrap_or_default())
    }
}

#[derive(Clone)]
struct TestEnv;

impl Environment for TestEnv {
    type Instant = tokio::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn wall_clock_secs(&self) -> u64 {
        0
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        buffer.fill(0);
    }
}

/// Authenticates exactly `user1`/`password1`/`session1`, matching the
/// documented test scenarios.
struct TestAuthHandler;

impl<S: Storage, E: Environment> ServerHandler<S, E> for TestAuthHandler {
    fn process_login(&mut self, ops: &mut ServerOps<'_, S, E>, body: &[u8]) {
        let Ok(login) = LoginRequest::decode(body) else {
            let _ = ops.reject_login(packet_type::REJECT_NOT_AUTHORIZED);
            return;
        };
        if login.username != "user1" || login.password != "password1" || login.session_name != "session1" {
            let _ = ops.reject_login(packet_type::REJECT_NOT_AUTHORIZED);
            return;
        }
        let _ = ops.open_session(&login.session_name);
        let Ok(next_sequence) = ops.next_output_sequence() else {
            return;
        };
        let accept = LoginAccept { session_name: login.session_name.clone(), sequence: next_sequence };
        let _ = ops.send_login_accept(&accept.encode());
        let _ = ops.replay_sequenced(login.sequence);
    }

    fn process_unsequenced(&mut self, _ops: &mut ServerOps<'_, S, E>, _body: &[u8]) {}
}

struct RecordingClientHandler {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl ClientHandler for RecordingClientHandler {
    fn process_sequenced(&mut self, body: &Bytes) {
        let _ = self.tx.send(body.clone());
    }
}

async fn bind_loopback() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr.to_string())
}

#[tokio::test]
async fn login_accept_replays_pre_seeded_output() {
    let (listener, addr) = bind_loopback().await;
    let storage = TestStorage::default();
    storage.open("server-session1").unwrap();
    storage.store_output("server-session1", b"hello").unwrap();
    storage.store_output("server-session1", b"world").unwrap();

    let server_storage = storage.clone();
    tokio::spawn(async move {
        let (stream, peer) = listener.accept().await.unwrap();
        let handler = TestAuthHandler;
        ServerSession::new(stream, peer, server_storage, TestEnv, handler).run().await;
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (session, _handle) = ClientSession::connect(
        &addr,
        "user1",
        "password1",
        "session1",
        TestStorage::default(),
        TestEnv,
        RecordingClientHandler { tx },
    )
    .await
    .unwrap();
    tokio::spawn(session.run());

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.as_ref(), b"hello");
    assert_eq!(second.as_ref(), b"world");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (listener, addr) = bind_loopback().await;
    tokio::spawn(async move {
        let (stream, peer) = listener.accept().await.unwrap();
        let handler = TestAuthHandler;
        ServerSession::new(stream, peer, TestStorage::default(), TestEnv, handler).run().await;
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let (session, _handle) = ClientSession::connect(
        &addr,
        "user1",
        "wrong-password",
        "session1",
        TestStorage::default(),
        TestEnv,
        RecordingClientHandler { tx },
    )
    .await
    .unwrap();
    let join = tokio::spawn(session.run());

    // The session should close promptly on rejection; no sequenced message
    // is ever delivered.
    assert!(tokio::time::timeout(Duration::from_secs(2), join).await.is_ok());
    assert!(rx.try_recv().is_err());
}

/// Reads raw frames off `stream` and reports each one's packet type over
/// `tx`, until the peer closes or the read errors.
async fn spy_on_frames(mut stream: TcpStream, tx: mpsc::UnboundedSender<u8>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                while let Ok((frame, consumed)) = Frame::decode(&buf) {
                    let _ = tx.send(frame.packet_type);
                    buf.drain(..consumed);
                }
            },
        }
    }
}

#[tokio::test(start_paused = true)]
async fn heartbeats_fire_on_the_configured_cadence_while_idle() {
    // Server side: a real ServerSession, spied on by a raw socket that
    // never sends a login request, so every frame it receives is a
    // heartbeat.
    let (server_listener, server_addr) = bind_loopback().await;
    tokio::spawn(async move {
        let (stream, peer) = server_listener.accept().await.unwrap();
        let handler = TestAuthHandler;
        ServerSession::new(stream, peer, TestStorage::default(), TestEnv, handler).run().await;
    });
    let server_spy = TcpStream::connect(&server_addr).await.unwrap();
    let (server_tx, mut server_rx) = mpsc::unbounded_channel();
    tokio::spawn(spy_on_frames(server_spy, server_tx));

    // Client side: a real ClientSession, spied on by a raw socket that
    // accepts the connection but never answers the login request, so every
    // frame it receives is a heartbeat too.
    let (client_listener, client_addr) = bind_loopback().await;
    let (client_tx, mut client_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let (stream, _peer) = client_listener.accept().await.unwrap();
        spy_on_frames(stream, client_tx).await;
    });
    let (tx, _rx) = mpsc::unbounded_channel();
    let (session, _handle) = ClientSession::connect(
        &client_addr,
        "user1",
        "password1",
        "session1",
        TestStorage::default(),
        TestEnv,
        RecordingClientHandler { tx },
    )
    .await
    .unwrap();
    tokio::spawn(session.run());

    // Advance the virtual clock well past several heartbeat intervals, in
    // small steps so each timer's reset-after-drain gets a chance to run
    // in between advances; a real clock would need to actually wait this
    // long.
    for _ in 0..6 {
        tokio::time::advance(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
    }

    let mut server_heartbeats = 0u32;
    while let Ok(seen_type) = server_rx.try_recv() {
        if seen_type == packet_type::SERVER_HEARTBEAT {
            server_heartbeats += 1;
        }
    }
    let mut client_heartbeats = 0u32;
    while let Ok(seen_type) = client_rx.try_recv() {
        if seen_type == packet_type::CLIENT_HEARTBEAT {
            client_heartbeats += 1;
        }
    }

    assert!(server_heartbeats >= 2, "expected >= 2 server heartbeats, saw {server_heartbeats}");
    assert!(client_heartbeats >= 2, "expected >= 2 client heartbeats, saw {client_heartbeats}");
}

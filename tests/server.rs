//! Subscriber line protocol over real TCP connections

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use subkv::server::Connection;
use subkv::{Broker, RedbStore, ServerConfig, SubscriberServer};

struct Harness {
    broker: Arc<Broker>,
    server: Arc<SubscriberServer>,
    addr: std::net::SocketAddr,
    _dir: tempfile::TempDir,
}

async fn start(config: ServerConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(Broker::new(RedbStore::open(dir.path()).unwrap()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Arc::new(SubscriberServer::new(config, Arc::clone(&broker)));
    let running = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = running.serve(listener, std::future::pending()).await;
    });

    Harness {
        broker,
        server,
        addr,
        _dir: dir,
    }
}

struct Peer {
    lines: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Peer {
    async fn connect(addr: std::net::SocketAddr) -> Self {
        let (read, writer) = TcpStream::connect(addr).await.unwrap().into_split();
        Self {
            lines: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    /// Next line from the server, `None` once it closed the connection
    async fn line(&mut self) -> Option<String> {
        let mut buf = String::new();
        let n = tokio::time::timeout(Duration::from_secs(5), self.lines.read_line(&mut buf))
            .await
            .expect("server did not answer")
            .unwrap_or(0);
        (n > 0).then(|| buf.trim_end().to_string())
    }
}

async fn wait_for_clients(broker: &Broker, expected: usize) {
    for _ in 0..200 {
        if broker.stats().await.registered_clients == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {expected} registered clients");
}

#[tokio::test]
async fn test_sub_acks_then_sends_catch_up() {
    let h = start(ServerConfig::default()).await;
    h.broker.set("k", "v1").await.unwrap();

    let mut peer = Peer::connect(h.addr).await;
    peer.send("SUB k\n").await;

    // The catch-up is queued before the ack but drained after it
    assert_eq!(peer.line().await.unwrap(), "OK");
    assert_eq!(peer.line().await.unwrap(), r#"{"key":"k","value":"v1"}"#);
}

#[tokio::test]
async fn test_sub_then_write_pushes_update() {
    let h = start(ServerConfig::default()).await;

    let mut peer = Peer::connect(h.addr).await;
    peer.send("SUB k\n").await;
    assert_eq!(peer.line().await.unwrap(), "OK");

    h.broker.set("k", "v2").await.unwrap();
    h.broker.set("k", "v3").await.unwrap();

    assert_eq!(peer.line().await.unwrap(), r#"{"key":"k","value":"v2"}"#);
    assert_eq!(peer.line().await.unwrap(), r#"{"key":"k","value":"v3"}"#);
}

#[tokio::test]
async fn test_invalid_lines_are_ignored() {
    let h = start(ServerConfig::default()).await;

    let mut peer = Peer::connect(h.addr).await;
    peer.send("HELLO\nSUB a b\n\nUNSUB k\n").await;

    // Only the valid command is acknowledged
    assert_eq!(peer.line().await.unwrap(), "OK");
    assert_eq!(h.server.stats().total_connections, 1);
}

#[tokio::test]
async fn test_unsub_stops_updates() {
    let h = start(ServerConfig::default()).await;

    let mut peer = Peer::connect(h.addr).await;
    peer.send("SUB a\nSUB b\nUNSUB a\n").await;
    for _ in 0..3 {
        assert_eq!(peer.line().await.unwrap(), "OK");
    }

    h.broker.set("a", "hidden").await.unwrap();
    h.broker.set("b", "shown").await.unwrap();

    assert_eq!(peer.line().await.unwrap(), r#"{"key":"b","value":"shown"}"#);
}

#[tokio::test]
async fn test_disconnect_unregisters_client() {
    let h = start(ServerConfig::default()).await;

    let mut peer = Peer::connect(h.addr).await;
    peer.send("SUB k\n").await;
    assert_eq!(peer.line().await.unwrap(), "OK");
    assert_eq!(h.broker.stats().await.subscriptions, 1);

    drop(peer);
    wait_for_clients(&h.broker, 0).await;

    assert_eq!(h.broker.stats().await.subscriptions, 0);
    h.broker.set("k", "after").await.unwrap();
    assert_eq!(h.broker.stats().await.deliveries, 0);
}

#[tokio::test]
async fn test_line_too_long_closes_connection() {
    let h = start(ServerConfig::default().max_line_length(16)).await;

    let mut peer = Peer::connect(h.addr).await;
    peer.send("SUB aaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\n").await;

    assert_eq!(peer.line().await, None);
    wait_for_clients(&h.broker, 0).await;
}

#[tokio::test]
async fn test_connection_limit() {
    let h = start(ServerConfig::default().max_connections(1)).await;

    let mut first = Peer::connect(h.addr).await;
    first.send("SUB k\n").await;
    assert_eq!(first.line().await.unwrap(), "OK");

    let mut second = Peer::connect(h.addr).await;
    assert_eq!(second.line().await, None);

    let stats = h.server.stats();
    assert_eq!(stats.total_connections, 1);
    assert_eq!(stats.rejected_connections, 1);
}

#[tokio::test]
async fn test_stalled_reader_hits_write_timeout() {
    let config = ServerConfig::default().write_timeout(Duration::from_millis(200));
    let h = start(config).await;

    let mut peer = Peer::connect(h.addr).await;
    peer.send("SUB k\n").await;
    assert_eq!(peer.line().await.unwrap(), "OK");

    // Far more than the socket buffers hold; the peer never reads again
    let value = "x".repeat(256 * 1024);
    for _ in 0..128 {
        h.broker.set("k", value.clone()).await.unwrap();
    }

    wait_for_clients(&h.broker, 0).await;
    assert_eq!(h.broker.stats().await.subscriptions, 0);
    drop(peer);
}

#[tokio::test]
async fn test_dropped_session_still_unregisters() {
    let dir = tempfile::tempdir().unwrap();
    let broker = Arc::new(Broker::new(RedbStore::open(dir.path()).unwrap()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _peer = TcpStream::connect(addr).await.unwrap();
    let (socket, peer_addr) = listener.accept().await.unwrap();

    let client = broker.register_client().await;
    let id = client.id;
    broker.subscribe(id, "k").await;

    let connection = Connection::new(
        client,
        socket,
        peer_addr,
        ServerConfig::default(),
        Arc::clone(&broker),
    );

    // The peer stays silent, so the session is cut short from outside
    let cut = tokio::time::timeout(Duration::from_millis(50), connection.run()).await;
    assert!(cut.is_err());

    wait_for_clients(&broker, 0).await;
    assert!(!broker.is_registered(id).await);
    assert!(!broker.is_subscribed(id, b"k").await);
    assert_eq!(broker.stats().await.subscriptions, 0);
}

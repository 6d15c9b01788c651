//! Subscriber connection handler
//!
//! One task per connection. A single loop multiplexes the two directions:
//! command lines from the peer and updates from the client's outbox, so
//! acknowledgements and updates share one ordered write path.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Error, Result};
use crate::protocol::{encode_update, Command, LineReader, ACK};
use crate::registry::{Broker, ClientHandle, ClientId};
use crate::server::config::ServerConfig;
use crate::session::{CloseReason, SessionState};

/// A subscriber connection registered with the broker
pub struct Connection {
    client: ClientHandle,
    socket: TcpStream,
    config: ServerConfig,
    broker: Arc<Broker>,
    state: SessionState,
}

impl Connection {
    /// Wrap an accepted socket and its freshly registered client
    pub fn new(
        client: ClientHandle,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        broker: Arc<Broker>,
    ) -> Self {
        let state = SessionState::new(client.id, peer_addr);
        Self {
            client,
            socket,
            config,
            broker,
            state,
        }
    }

    /// Serve the connection until the peer leaves, the client is evicted or
    /// a fatal error occurs
    ///
    /// The client is unregistered on every exit path, including when this
    /// future is dropped before completing.
    pub async fn run(self) -> Result<SessionState> {
        let Connection {
            mut client,
            socket,
            config,
            broker,
            mut state,
        } = self;
        let guard = UnregisterGuard::new(Arc::clone(&broker), client.id);

        let result = serve(&mut client, socket, &config, &broker, &mut state).await;
        if let Err(ref e) = result {
            state.close(match e {
                Error::Protocol(_) => CloseReason::ProtocolError,
                _ => CloseReason::IoError,
            });
        }

        broker.unregister_client(client.id).await;
        guard.disarm();
        state.finish();

        tracing::debug!(
            client_id = %state.client_id,
            peer = %state.peer_addr,
            reason = %state.close_reason.unwrap_or(CloseReason::PeerClosed),
            commands = state.stats.commands,
            updates_sent = state.stats.updates_sent,
            undelivered = client.queued(),
            bytes_sent = state.stats.bytes_sent,
            duration_ms = state.stats.duration.as_millis() as u64,
            "Session closed"
        );

        result.map(|_| state)
    }
}

/// Unregisters a client when dropped while still armed
///
/// `Drop` cannot await, so the unregistration is spawned onto the current
/// runtime. Outside a runtime there is nothing left to clean up for.
struct UnregisterGuard {
    broker: Option<Arc<Broker>>,
    client_id: ClientId,
}

impl UnregisterGuard {
    fn new(broker: Arc<Broker>, client_id: ClientId) -> Self {
        Self {
            broker: Some(broker),
            client_id,
        }
    }

    /// The client was unregistered on the normal path
    fn disarm(mut self) {
        self.broker = None;
    }
}

impl Drop for UnregisterGuard {
    fn drop(&mut self) {
        let Some(broker) = self.broker.take() else {
            return;
        };
        let client_id = self.client_id;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(client_id = %client_id, "Session dropped, unregistering");
                handle.spawn(async move {
                    broker.unregister_client(client_id).await;
                });
            }
            Err(_) => {
                tracing::warn!(client_id = %client_id, "Session dropped outside a runtime");
            }
        }
    }
}

async fn serve(
    client: &mut ClientHandle,
    socket: TcpStream,
    config: &ServerConfig,
    broker: &Broker,
    state: &mut SessionState,
) -> Result<()> {
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = LineReader::new(read_half, config.max_line_length);

    while state.is_active() {
        tokio::select! {
            update = client.recv() => {
                let Some(update) = update else {
                    state.close(CloseReason::Evicted);
                    break;
                };
                let frame = encode_update(&update)?;
                if !write_frame(&mut write_half, &frame, config, state).await? {
                    break;
                }
                state.stats.on_update(frame.len());
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    state.close(CloseReason::PeerClosed);
                    break;
                };
                state.stats.commands += 1;

                let Some(command) = Command::parse(&line) else {
                    tracing::trace!(client_id = %client.id, line = %line, "Ignoring line");
                    continue;
                };
                tracing::trace!(
                    client_id = %client.id,
                    key = %String::from_utf8_lossy(command.key()),
                    "Command received"
                );

                match &command {
                    Command::Subscribe(key) => {
                        broker.subscribe(client.id, key.clone()).await;
                    }
                    Command::Unsubscribe(key) => {
                        broker.unsubscribe(client.id, key).await;
                    }
                }
                write_frame(&mut write_half, ACK, config, state).await?;
            }
        }
    }

    let _ = write_half.shutdown().await;
    Ok(())
}

/// Write one frame within the configured timeout
///
/// Returns `Ok(false)` and closes the session when the peer does not accept
/// the bytes in time.
async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    frame: &[u8],
    config: &ServerConfig,
    state: &mut SessionState,
) -> Result<bool> {
    match tokio::time::timeout(config.write_timeout, writer.write_all(frame)).await {
        Ok(result) => {
            result?;
            Ok(true)
        }
        Err(_) => {
            tracing::warn!(
                client_id = %state.client_id,
                timeout_ms = config.write_timeout.as_millis() as u64,
                "Subscriber write timed out"
            );
            state.close(CloseReason::WriteTimeout);
            Ok(false)
        }
    }
}

use crate::error::RealtimeError;
use crate::packet::{Packet, ServerEvent, SocketPacket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Socket client options
#[derive(Debug, Clone)]
pub struct SocketClientOptions {
    /// How long `connect` waits for the namespace acknowledgement.
    pub connect_timeout: Duration,
    /// Socket.IO endpoint path on the server.
    pub path: String,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

impl Default for SocketClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            path: "/socket.io/".to_string(),
            event_buffer: 64,
        }
    }
}

struct Connection {
    outgoing: mpsc::Sender<Message>,
    reader: JoinHandle<()>,
}

/// Socket.IO client holding at most one live connection.
///
/// Server events are republished on a broadcast channel as [`ServerEvent`]s;
/// the caller decides what they mean.
#[derive(Clone)]
pub struct SocketClient {
    pub(crate) url: String,
    pub(crate) options: SocketClientOptions,
    connection: Arc<Mutex<Option<Connection>>>,
    // Bumped on every teardown so a stale reader cannot overwrite newer state.
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<ConnectionState>>,
    events: broadcast::Sender<ServerEvent>,
}

impl SocketClient {
    pub fn new(url: &str) -> Self {
        Self::new_with_options(url, SocketClientOptions::default())
    }

    pub fn new_with_options(url: &str, options: SocketClientOptions) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (events, _) = broadcast::channel(options.event_buffer.max(1));
        Self {
            url: url.to_string(),
            options,
            connection: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
            events,
        }
    }

    /// Receive every event the server pushes after `connect`.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn on_state_change(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// WebSocket URL of the Engine.IO endpoint derived from the base URL.
    pub fn endpoint_url(&self) -> Result<Url, RealtimeError> {
        let mut url = Url::parse(&self.url)?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            s => {
                return Err(RealtimeError::connection(format!(
                    "Unsupported URL scheme: {}",
                    s
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| RealtimeError::connection("cannot switch URL scheme"))?;
        url.set_path(&self.options.path);
        url.query_pairs_mut()
            .clear()
            .append_pair("EIO", "4")
            .append_pair("transport", "websocket");
        Ok(url)
    }

    /// Open a connection and wait until the default namespace is joined.
    ///
    /// Any existing connection is torn down first.
    pub async fn connect(&self) -> Result<(), RealtimeError> {
        self.disconnect().await;

        let url = self.endpoint_url()?;
        let generation = self.generation.load(Ordering::SeqCst);
        info!("Connecting socket to {}", url);
        self.state.send_replace(ConnectionState::Connecting);

        let ws_stream = match connect_async(url.as_str()).await {
            Ok((stream, _response)) => stream,
            Err(e) => {
                error!("WebSocket connection failed: {}", e);
                self.state.send_replace(ConnectionState::Disconnected);
                return Err(RealtimeError::WebSocket(e));
            }
        };

        let (mut write, mut read) = ws_stream.split();
        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(100);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), RealtimeError>>();

        // --- Writer task ---
        tokio::spawn(async move {
            debug!("Writer task started");
            while let Some(message) = outgoing_rx.recv().await {
                trace!("Writer task sending {:?}", message);
                if let Err(e) = write.send(message).await {
                    error!("Writer task: WebSocket send error: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
            debug!("Writer task finished");
        });

        // --- Reader task ---
        let reply_tx = outgoing_tx.clone();
        let events = self.events.clone();
        let state = self.state.clone();
        let current_generation = self.generation.clone();
        let reader = tokio::spawn(async move {
            debug!("Reader task started");
            let mut ready = Some(ready_tx);
            let is_current = || current_generation.load(Ordering::SeqCst) == generation;

            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(frame)) => {
                        debug!("Reader task received close frame: {:?}", frame);
                        break;
                    }
                    Ok(other) => {
                        trace!("Reader task ignoring non-text frame: {:?}", other);
                        continue;
                    }
                    Err(e) => {
                        error!("Reader task: WebSocket read error: {}", e);
                        break;
                    }
                };

                match Packet::decode(&text) {
                    Ok(Packet::Open(handshake)) => {
                        debug!("Engine open, sid={}", handshake.sid);
                        let connect = Packet::Message(SocketPacket::Connect(None)).encode();
                        if reply_tx.send(Message::Text(connect)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Packet::Ping) => {
                        trace!("Answering engine ping");
                        if reply_tx.send(Message::Text(Packet::Pong.encode())).await.is_err() {
                            break;
                        }
                    }
                    Ok(Packet::Message(SocketPacket::Connect(_))) => {
                        if is_current() {
                            state.send_replace(ConnectionState::Connected);
                        }
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Ok(()));
                        }
                    }
                    Ok(Packet::Message(SocketPacket::ConnectError(reason))) => {
                        warn!("Namespace connect rejected: {}", reason);
                        if let Some(tx) = ready.take() {
                            let _ = tx.send(Err(RealtimeError::protocol(format!(
                                "namespace connect rejected: {}",
                                reason
                            ))));
                        }
                        break;
                    }
                    Ok(Packet::Message(SocketPacket::Event(event))) => {
                        debug!("Received server event '{}'", event.name);
                        // No subscribers is not an error.
                        let _ = events.send(event);
                    }
                    Ok(Packet::Message(SocketPacket::Disconnect)) | Ok(Packet::Close) => {
                        debug!("Server closed the session");
                        break;
                    }
                    Ok(other) => trace!("Reader task ignoring packet {:?}", other),
                    Err(e) => warn!("Dropping malformed packet {:?}: {}", text, e),
                }
            }

            if is_current() {
                state.send_replace(ConnectionState::Disconnected);
            }
            if let Some(tx) = ready.take() {
                let _ = tx.send(Err(RealtimeError::connection(
                    "socket closed before namespace acknowledgement",
                )));
            }
            debug!("Reader task finished");
        });

        *self.connection.lock().await = Some(Connection {
            outgoing: outgoing_tx,
            reader,
        });

        match timeout(self.options.connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => {
                info!("Socket connected");
                Ok(())
            }
            Ok(Ok(Err(e))) => {
                self.disconnect().await;
                Err(e)
            }
            Ok(Err(_)) => {
                self.disconnect().await;
                Err(RealtimeError::connection("reader task ended unexpectedly"))
            }
            Err(_) => {
                self.disconnect().await;
                Err(RealtimeError::Timeout("namespace acknowledgement"))
            }
        }
    }

    /// Send a named event with a single JSON payload.
    pub async fn emit(&self, event: &str, payload: Value) -> Result<(), RealtimeError> {
        let packet = Packet::Message(SocketPacket::Event(ServerEvent::new(event, payload)));
        let guard = self.connection.lock().await;
        let connection = guard
            .as_ref()
            .ok_or_else(|| RealtimeError::connection("socket is not connected"))?;
        debug!("Emitting '{}'", event);
        connection
            .outgoing
            .send(Message::Text(packet.encode()))
            .await
            .map_err(|e| RealtimeError::connection(format!("failed to queue message: {}", e)))
    }

    /// Close the live connection, if any. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let existing = self.connection.lock().await.take();
        if let Some(connection) = existing {
            info!("Closing socket connection");
            let goodbye = Packet::Message(SocketPacket::Disconnect).encode();
            let _ = connection.outgoing.send(Message::Text(goodbye)).await;
            // The writer drains and closes once the reader's sender is dropped too.
            connection.reader.abort();
        }
        self.state.send_replace(ConnectionState::Disconnected);
    }
}

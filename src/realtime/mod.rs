//! Room event subscriber
//!
//! Wraps the socket transport: one connection per active room, joined by
//! emitting `join {token, roomId}`, with server events decoded into
//! [`RoomEvent`]s and republished on a broadcast channel.

mod event;

pub use event::*;

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, trace, warn};
use watchd_realtime::{ConnectionState, SocketClient, SocketClientOptions};

use crate::config::ClientOptions;
use crate::error::Result;

/// Name of the event emitted after connecting
pub const JOIN_EVENT: &str = "join";

#[derive(Default)]
struct Active {
    room_id: Option<i64>,
    pump: Option<JoinHandle<()>>,
    // Consumers bound to the live connection; aborted on disconnect.
    listeners: Vec<AbortHandle>,
}

/// Subscriber for the events of the active room
#[derive(Clone)]
pub struct RoomEventSubscriber {
    socket: SocketClient,
    events: broadcast::Sender<RoomEvent>,
    active: Arc<Mutex<Active>>,
}

impl RoomEventSubscriber {
    pub fn new(socket: SocketClient) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            socket,
            events,
            active: Arc::new(Mutex::new(Active::default())),
        }
    }

    /// Subscriber for the realtime server named in `options`
    pub fn from_options(options: &ClientOptions) -> Self {
        Self::new(SocketClient::new_with_options(
            &options.socket_url,
            SocketClientOptions::default(),
        ))
    }

    /// Receive decoded events of whichever room is connected
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.socket.connection_state()
    }

    /// Room of the live connection
    pub fn active_room(&self) -> Option<i64> {
        self.lock().room_id
    }

    /// Connect for `room_id` and join it with `token`.
    ///
    /// An existing connection is closed first; at most one is live.
    pub async fn connect(&self, token: &str, room_id: i64) -> Result<()> {
        self.disconnect().await;

        // Subscribe before connecting so nothing sent right after the join is missed.
        let raw = self.socket.subscribe();
        let pump = self.spawn_pump(raw);
        self.lock().pump = Some(pump);

        if let Err(e) = self.socket.connect().await {
            self.disconnect().await;
            return Err(e.into());
        }
        if let Err(e) = self
            .socket
            .emit(JOIN_EVENT, json!({ "token": token, "roomId": room_id }))
            .await
        {
            self.disconnect().await;
            return Err(e.into());
        }

        info!("Joined realtime events for room {}", room_id);
        self.lock().room_id = Some(room_id);
        Ok(())
    }

    /// Stop `listener` when the current connection closes.
    ///
    /// Without a live connection the listener is stopped right away.
    pub fn bind_listener(&self, listener: AbortHandle) {
        let mut active = self.lock();
        if active.room_id.is_none() {
            listener.abort();
            return;
        }
        active.listeners.retain(|l| !l.is_finished());
        active.listeners.push(listener);
    }

    /// Close the live connection, if any, and stop its bound listeners
    pub async fn disconnect(&self) {
        let (pump, listeners) = {
            let mut active = self.lock();
            active.room_id = None;
            (active.pump.take(), std::mem::take(&mut active.listeners))
        };
        if let Some(pump) = pump {
            pump.abort();
        }
        if !listeners.is_empty() {
            debug!("Stopping {} room event listeners", listeners.len());
        }
        for listener in listeners {
            listener.abort();
        }
        self.socket.disconnect().await;
    }

    fn spawn_pump(
        &self,
        mut raw: broadcast::Receiver<watchd_realtime::ServerEvent>,
    ) -> JoinHandle<()> {
        let events = self.events.clone();
        tokio::spawn(async move {
            loop {
                match raw.recv().await {
                    Ok(event) => match RoomEvent::decode(&event) {
                        Ok(Some(decoded)) => {
                            debug!("Room event '{}'", event.name);
                            let _ = events.send(decoded);
                        }
                        Ok(None) => trace!("Ignoring event '{}'", event.name),
                        Err(e) => warn!("Dropping malformed '{}' event: {}", event.name, e),
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Room event pump lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Active> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RoomEventSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomEventSubscriber")
            .field("active_room", &self.active_room())
            .finish_non_exhaustive()
    }
}

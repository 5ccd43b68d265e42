//! Realtime event subscriber for the watchd client
//!
//! This crate speaks just enough Socket.IO (over a raw WebSocket) to join a
//! server, emit events, and republish the named events the server pushes.

mod client;
mod error;
mod packet;

pub use client::{ConnectionState, SocketClient, SocketClientOptions};
pub use error::RealtimeError;
pub use packet::{Handshake, Packet, ServerEvent, SocketPacket};

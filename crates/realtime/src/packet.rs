//! Engine.IO v4 / Socket.IO v5 text framing.
//!
//! Only the subset a subscribing client needs is modelled: the engine
//! handshake, ping/pong, close, and the socket-level connect, disconnect,
//! event, ack and connect-error packets on the default namespace. Binary
//! attachments are not supported.

use crate::error::RealtimeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handshake data the server sends in the engine `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// An engine-level packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Message(SocketPacket),
    Noop,
}

/// A socket-level packet carried inside an engine `message`.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event(ServerEvent),
    Ack { id: u64, args: Vec<Value> },
    ConnectError(Value),
}

/// A named event with its JSON arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    pub name: String,
    pub args: Vec<Value>,
}

impl ServerEvent {
    pub fn new(name: &str, payload: Value) -> Self {
        Self {
            name: name.to_string(),
            args: vec![payload],
        }
    }

    /// First argument, which is where servers put the event payload.
    pub fn payload(&self) -> Option<&Value> {
        self.args.first()
    }
}

impl Packet {
    pub fn decode(text: &str) -> Result<Self, RealtimeError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| RealtimeError::protocol("empty engine packet"))?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Packet::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Packet::Close),
            '2' => Ok(Packet::Ping),
            '3' => Ok(Packet::Pong),
            '4' => SocketPacket::decode(rest).map(Packet::Message),
            '6' => Ok(Packet::Noop),
            other => Err(RealtimeError::protocol(format!(
                "unknown engine packet type '{}'",
                other
            ))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            // Serializing a plain derived struct cannot fail.
            Packet::Open(handshake) => format!(
                "0{}",
                serde_json::to_string(handshake).unwrap_or_default()
            ),
            Packet::Close => "1".to_string(),
            Packet::Ping => "2".to_string(),
            Packet::Pong => "3".to_string(),
            Packet::Message(packet) => format!("4{}", packet.encode()),
            Packet::Noop => "6".to_string(),
        }
    }
}

impl SocketPacket {
    fn decode(text: &str) -> Result<Self, RealtimeError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| RealtimeError::protocol("empty socket packet"))?;
        let mut rest = chars.as_str();

        // Non-default namespaces are prefixed as "/name,".
        if rest.starts_with('/') {
            rest = match rest.find(',') {
                Some(idx) => &rest[idx + 1..],
                None => "",
            };
        }

        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let (ack, body) = rest.split_at(digits);
        let ack_id = if ack.is_empty() {
            None
        } else {
            Some(ack.parse::<u64>().map_err(RealtimeError::protocol)?)
        };

        match kind {
            '0' => {
                if body.is_empty() {
                    Ok(SocketPacket::Connect(None))
                } else {
                    Ok(SocketPacket::Connect(Some(serde_json::from_str(body)?)))
                }
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let mut items: Vec<Value> = serde_json::from_str(body)?;
                if items.is_empty() {
                    return Err(RealtimeError::protocol("event packet without a name"));
                }
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(RealtimeError::protocol(format!(
                            "event name must be a string, got {}",
                            other
                        )))
                    }
                };
                Ok(SocketPacket::Event(ServerEvent { name, args: items }))
            }
            '3' => Ok(SocketPacket::Ack {
                id: ack_id.ok_or_else(|| RealtimeError::protocol("ack packet without an id"))?,
                args: serde_json::from_str(body)?,
            }),
            '4' => {
                if body.is_empty() {
                    Ok(SocketPacket::ConnectError(Value::Null))
                } else {
                    Ok(SocketPacket::ConnectError(serde_json::from_str(body)?))
                }
            }
            other => Err(RealtimeError::protocol(format!(
                "unsupported socket packet type '{}'",
                other
            ))),
        }
    }

    fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{}", auth),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event(event) => {
                let mut items = Vec::with_capacity(event.args.len() + 1);
                items.push(Value::String(event.name.clone()));
                items.extend(event.args.iter().cloned());
                format!("2{}", Value::Array(items))
            }
            SocketPacket::Ack { id, args } => format!("3{}{}", id, Value::Array(args.clone())),
            SocketPacket::ConnectError(data) => format!("4{}", data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_engine_open() {
        let packet = Packet::decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        match packet {
            Packet::Open(handshake) => {
                assert_eq!(handshake.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(handshake.ping_interval, 25000);
                assert_eq!(handshake.max_payload, Some(1_000_000));
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn decodes_ping_and_close() {
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping);
        assert_eq!(Packet::decode("1").unwrap(), Packet::Close);
        assert_eq!(Packet::Pong.encode(), "3");
    }

    #[test]
    fn decodes_namespace_ack() {
        let packet = Packet::decode(r#"40{"sid":"abc"}"#).unwrap();
        assert_eq!(
            packet,
            Packet::Message(SocketPacket::Connect(Some(json!({"sid": "abc"}))))
        );
    }

    #[test]
    fn decodes_event_with_payload() {
        let packet = Packet::decode(r#"42["match",{"movie_id":550,"movie_title":"Fight Club"}]"#)
            .unwrap();
        let Packet::Message(SocketPacket::Event(event)) = packet else {
            panic!("expected event packet");
        };
        assert_eq!(event.name, "match");
        assert_eq!(event.payload(), Some(&json!({"movie_id": 550, "movie_title": "Fight Club"})));
    }

    #[test]
    fn skips_namespace_and_ack_id() {
        let packet = Packet::decode(r#"42/rooms,17["partner_left",{"room_id":3}]"#).unwrap();
        let Packet::Message(SocketPacket::Event(event)) = packet else {
            panic!("expected event packet");
        };
        assert_eq!(event.name, "partner_left");
        assert_eq!(event.args, vec![json!({"room_id": 3})]);
    }

    #[test]
    fn encodes_event_in_wire_order() {
        let packet = Packet::Message(SocketPacket::Event(ServerEvent::new(
            "join",
            json!({"roomId": 7, "token": "t"}),
        )));
        assert_eq!(packet.encode(), r#"42["join",{"roomId":7,"token":"t"}]"#);
    }

    #[test]
    fn rejects_malformed_packets() {
        assert!(Packet::decode("").is_err());
        assert!(Packet::decode("9").is_err());
        assert!(Packet::decode("42[]").is_err());
        assert!(Packet::decode("42[1,2]").is_err());
        assert!(Packet::decode("42not-json").is_err());
    }

    #[test]
    fn connect_error_carries_reason() {
        let packet = Packet::decode(r#"44{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            packet,
            Packet::Message(SocketPacket::ConnectError(json!({"message": "Not authorized"})))
        );
    }
}

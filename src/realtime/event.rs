//! Typed room events

use serde::Deserialize;
use serde_json::Value;
use watchd_realtime::ServerEvent;

use crate::matches::MatchEvent;
use crate::rooms::RoomFilters;

/// Server event names
pub const MATCH_EVENT: &str = "match";
pub const FILTERS_UPDATED_EVENT: &str = "filters_updated";
pub const PARTNER_JOINED_EVENT: &str = "partner_joined";
pub const PARTNER_LEFT_EVENT: &str = "partner_left";
pub const ROOM_DISSOLVED_EVENT: &str = "room_dissolved";

/// An event pushed by the server for a room
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Every member accepted the same movie
    Match(MatchEvent),
    /// The room's filters changed; the feed is stale
    FiltersUpdated {
        room_id: i64,
        filters: Option<RoomFilters>,
    },
    PartnerJoined {
        room_id: i64,
        user_id: Option<i64>,
        name: Option<String>,
    },
    PartnerLeft {
        room_id: i64,
        user_id: Option<i64>,
        name: Option<String>,
    },
    /// The last member left
    RoomDissolved { room_id: i64 },
}

#[derive(Deserialize)]
struct FiltersPayload {
    #[serde(alias = "roomId")]
    room_id: i64,
    #[serde(default)]
    filters: Option<RoomFilters>,
}

#[derive(Deserialize)]
struct PartnerPayload {
    #[serde(alias = "roomId")]
    room_id: i64,
    #[serde(default, alias = "userId")]
    user_id: Option<i64>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct RoomPayload {
    #[serde(alias = "roomId")]
    room_id: i64,
}

impl RoomEvent {
    /// Decode a raw server event.
    ///
    /// Returns `Ok(None)` for event names this client does not handle.
    pub fn decode(event: &ServerEvent) -> Result<Option<Self>, serde_json::Error> {
        let payload = event.payload().cloned().unwrap_or(Value::Null);
        let decoded = match event.name.as_str() {
            MATCH_EVENT => RoomEvent::Match(serde_json::from_value(payload)?),
            FILTERS_UPDATED_EVENT => {
                let p: FiltersPayload = serde_json::from_value(payload)?;
                RoomEvent::FiltersUpdated {
                    room_id: p.room_id,
                    filters: p.filters,
                }
            }
            PARTNER_JOINED_EVENT => {
                let p: PartnerPayload = serde_json::from_value(payload)?;
                RoomEvent::PartnerJoined {
                    room_id: p.room_id,
                    user_id: p.user_id,
                    name: p.name,
                }
            }
            PARTNER_LEFT_EVENT => {
                let p: PartnerPayload = serde_json::from_value(payload)?;
                RoomEvent::PartnerLeft {
                    room_id: p.room_id,
                    user_id: p.user_id,
                    name: p.name,
                }
            }
            ROOM_DISSOLVED_EVENT => {
                let p: RoomPayload = serde_json::from_value(payload)?;
                RoomEvent::RoomDissolved { room_id: p.room_id }
            }
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    /// The room this event is scoped to; a match may omit it
    pub fn room_id(&self) -> Option<i64> {
        match self {
            RoomEvent::Match(m) => m.room_id,
            RoomEvent::FiltersUpdated { room_id, .. }
            | RoomEvent::PartnerJoined { room_id, .. }
            | RoomEvent::PartnerLeft { room_id, .. }
            | RoomEvent::RoomDissolved { room_id } => Some(*room_id),
        }
    }

    /// Whether the event concerns `room_id`; unscoped events concern every room
    pub fn concerns(&self, room_id: i64) -> bool {
        self.room_id().map_or(true, |id| id == room_id)
    }
}

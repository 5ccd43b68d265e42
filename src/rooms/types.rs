//! Types for rooms

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Created, waiting for a partner
    Waiting,
    /// Both members present
    Active,
    /// The last member left
    Dissolved,
    /// A status this client does not know yet
    #[serde(other)]
    Unknown,
}

/// Feed constraints of a room; `None` means unconstrained
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct RoomFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<BTreeSet<i64>>,

    #[serde(
        default,
        alias = "streamingServices",
        skip_serializing_if = "Option::is_none"
    )]
    pub streaming_services: Option<BTreeSet<String>>,

    /// Earliest release year
    #[serde(default, alias = "yearFrom", skip_serializing_if = "Option::is_none")]
    pub year_from: Option<i32>,

    #[serde(default, alias = "minRating", skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f64>,

    /// Maximum runtime in minutes
    #[serde(default, alias = "maxRuntime", skip_serializing_if = "Option::is_none")]
    pub max_runtime: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl RoomFilters {
    /// Whether any constraint narrows the feed
    pub fn is_active(&self) -> bool {
        self.genres.as_ref().map_or(false, |g| !g.is_empty())
            || self
                .streaming_services
                .as_ref()
                .map_or(false, |s| !s.is_empty())
            || self.year_from.is_some()
            || self.min_rating.map_or(false, |r| r > 0.0)
            || self.max_runtime.is_some()
            || self.language.as_ref().map_or(false, |l| !l.is_empty())
    }

    /// Add `genre` if absent, remove it otherwise
    pub fn toggle_genre(&mut self, genre: i64) {
        let genres = self.genres.get_or_insert_with(BTreeSet::new);
        if !genres.remove(&genre) {
            genres.insert(genre);
        }
    }

    /// Add `service` if absent, remove it otherwise
    pub fn toggle_streaming_service(&mut self, service: &str) {
        let services = self.streaming_services.get_or_insert_with(BTreeSet::new);
        if !services.remove(service) {
            services.insert(service.to_string());
        }
    }
}

/// A shared swiping session
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Room {
    pub id: i64,

    /// Join code, compared case-insensitively
    pub code: String,

    pub created_by: i64,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub status: Option<RoomStatus>,

    #[serde(default)]
    pub filters: Option<RoomFilters>,

    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl Room {
    pub fn is_dissolved(&self) -> bool {
        self.status == Some(RoomStatus::Dissolved)
    }

    /// Name to show; falls back to the join code
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Room {}", self.code),
        }
    }
}

/// A member of a room
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RoomMember {
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomResponse {
    pub room: Room,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomDetailResponse {
    pub room: Room,
    #[serde(default)]
    pub members: Vec<RoomMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomsListResponse {
    #[serde(default)]
    pub rooms: Vec<Room>,
}

/// Response of `DELETE /rooms/{id}/leave`
#[derive(Debug, Clone, Deserialize)]
pub struct LeaveRoomResponse {
    #[serde(default)]
    pub message: String,

    /// The caller was the last member; the room is gone
    #[serde(default)]
    pub dissolved: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteArchiveResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRoomRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<&'a RoomFilters>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JoinRoomRequest<'a> {
    pub code: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRoomNameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRoomFiltersRequest<'a> {
    pub filters: &'a RoomFilters,
}

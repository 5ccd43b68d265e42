//! Rooms: create, join, list and leave shared swiping sessions

mod types;

pub use types::*;

use crate::client::ApiClient;
use crate::error::{Error, Result};

/// Normalize a user-typed join code.
///
/// Codes are case-insensitive, so the result is trimmed and upper-cased.
/// An empty code is rejected before any request is made.
pub fn normalize_code(code: &str) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        return Err(Error::validation("Please enter an invite code."));
    }
    Ok(code.to_uppercase())
}

impl ApiClient {
    /// Create a room, optionally named and filtered
    pub async fn create_room(
        &self,
        name: Option<&str>,
        filters: Option<&RoomFilters>,
    ) -> Result<RoomResponse> {
        let body = CreateRoomRequest { name, filters };
        self.send(self.post("/rooms").json(&body)?).await
    }

    /// Join a room by code; the code is sent as given
    pub async fn join_room(&self, code: &str) -> Result<RoomResponse> {
        let body = JoinRoomRequest { code };
        self.send(self.post("/rooms/join").json(&body)?).await
    }

    /// Every room the user belongs to, dissolved ones included
    pub async fn get_rooms(&self) -> Result<RoomsListResponse> {
        self.send(self.get("/rooms")).await
    }

    /// A room and its members
    pub async fn get_room(&self, room_id: i64) -> Result<RoomDetailResponse> {
        self.send(self.get(&format!("/rooms/{}", room_id))).await
    }

    pub async fn update_room_name(&self, room_id: i64, name: &str) -> Result<RoomResponse> {
        let body = UpdateRoomNameRequest { name };
        self.send(self.patch(&format!("/rooms/{}", room_id)).json(&body)?)
            .await
    }

    pub async fn update_room_filters(
        &self,
        room_id: i64,
        filters: &RoomFilters,
    ) -> Result<RoomResponse> {
        let body = UpdateRoomFiltersRequest { filters };
        self.send(
            self.patch(&format!("/rooms/{}/filters", room_id))
                .json(&body)?,
        )
        .await
    }

    /// Leave a room; the last member leaving dissolves it
    pub async fn leave_room(&self, room_id: i64) -> Result<LeaveRoomResponse> {
        self.send(self.delete(&format!("/rooms/{}/leave", room_id)))
            .await
    }

    /// Remove a dissolved room from the archive
    pub async fn delete_from_archive(&self, room_id: i64) -> Result<DeleteArchiveResponse> {
        self.send(self.delete(&format!("/rooms/{}/archive", room_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_trimmed_and_upper_cased() {
        assert_eq!(normalize_code("  ab12cd \n").unwrap(), "AB12CD");
    }

    #[test]
    fn blank_code_is_rejected() {
        let err = normalize_code(" \t ").unwrap_err();
        assert_eq!(err.user_message(), "Please enter an invite code.");
    }
}

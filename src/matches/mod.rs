//! Matches and favorites

mod types;

pub use types::*;

use crate::auth::MessageResponse;
use crate::client::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// Every match of a room
    pub async fn get_matches(&self, room_id: i64) -> Result<MatchesResponse> {
        self.send(self.get(&format!("/matches/{}", room_id))).await
    }

    /// Set the watched flag of a match
    pub async fn update_match_watched(
        &self,
        match_id: i64,
        watched: bool,
    ) -> Result<UpdateMatchResponse> {
        let body = UpdateWatchedRequest { watched };
        self.send(self.patch(&format!("/matches/{}", match_id)).json(&body)?)
            .await
    }

    pub async fn add_favorite(&self, movie_id: i64) -> Result<MessageResponse> {
        let body = AddFavoriteRequest { movie_id };
        self.send(self.post("/matches/favorites").json(&body)?)
            .await
    }

    pub async fn remove_favorite(&self, movie_id: i64) -> Result<MessageResponse> {
        self.send(self.delete(&format!("/matches/favorites/{}", movie_id)))
            .await
    }

    /// The user's favorites across all rooms
    pub async fn get_favorites(&self) -> Result<FavoritesResponse> {
        self.send(self.get("/matches/favorites/list")).await
    }
}

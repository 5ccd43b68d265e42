//! Movie feed and swipes

mod types;

pub use types::*;
pub(crate) use types::{image_url, release_year};

use crate::client::ApiClient;
use crate::error::Result;

impl ApiClient {
    /// One page of a room's feed; pages start at 1
    pub async fn movie_feed(&self, room_id: i64, page: u32) -> Result<MovieFeedResponse> {
        self.send(
            self.get("/movies/feed")
                .query("roomId", room_id)
                .query("page", page),
        )
        .await
    }

    /// The single next movie of a room's stack
    pub async fn next_movie(&self, room_id: i64) -> Result<NextMovieResponse> {
        self.send(self.get(&format!("/movies/rooms/{}/next-movie", room_id)))
            .await
    }

    /// Record a swipe
    pub async fn submit_swipe(
        &self,
        movie_id: i64,
        room_id: i64,
        direction: SwipeDirection,
    ) -> Result<SwipeResponse> {
        let body = SwipeRequest {
            movie_id,
            room_id,
            direction,
        };
        self.send(self.post("/swipes").json(&body)?).await
    }
}

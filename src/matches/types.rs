//! Types for matches and favorites

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::movies::{image_url, release_year, StreamingOption};

/// Movie snapshot stored with a match or favorite
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

impl MatchMovie {
    pub fn poster_url(&self, image_base_url: &str) -> Option<String> {
        image_url(image_base_url, self.poster_path.as_deref())
    }

    pub fn backdrop_url(&self, image_base_url: &str) -> Option<String> {
        image_url(image_base_url, self.backdrop_path.as_deref())
    }

    pub fn release_year(&self) -> Option<&str> {
        release_year(self.release_date.as_deref())
    }
}

/// A movie every member of a room accepted
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Match {
    pub id: i64,
    pub room_id: i64,
    pub matched_at: DateTime<Utc>,
    pub movie: MatchMovie,
    #[serde(default)]
    pub streaming_options: Vec<StreamingOption>,
    #[serde(default)]
    pub watched: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchesResponse {
    #[serde(default)]
    pub matches: Vec<Match>,
}

/// Response of `PATCH /matches/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMatchResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub watched: Option<bool>,
}

/// Realtime notification of a new match
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchEvent {
    #[serde(alias = "movieId")]
    pub movie_id: i64,
    #[serde(alias = "movieTitle")]
    pub movie_title: String,
    #[serde(default, alias = "posterPath")]
    pub poster_path: Option<String>,
    #[serde(default, alias = "streamingOptions")]
    pub streaming_options: Vec<StreamingOption>,
    /// Room the match belongs to, when the server includes it
    #[serde(default, alias = "roomId")]
    pub room_id: Option<i64>,
}

impl MatchEvent {
    pub fn poster_url(&self, image_base_url: &str) -> Option<String> {
        image_url(image_base_url, self.poster_path.as_deref())
    }
}

/// A bookmarked movie, independent of rooms
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Favorite {
    pub movie: MatchMovie,
    #[serde(default)]
    pub streaming_options: Vec<StreamingOption>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FavoritesResponse {
    #[serde(default)]
    pub favorites: Vec<Favorite>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateWatchedRequest {
    pub watched: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddFavoriteRequest {
    pub movie_id: i64,
}

//! Types for movies, the feed and swipes

use serde::{Deserialize, Serialize};

/// Where a movie can be watched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingOption {
    /// e.g. `flatrate`, `rent`, `buy`
    pub monetization_type: String,
    /// e.g. `hd`, `4k`
    pub presentation_type: String,
    pub package: StreamingPackage,
}

impl StreamingOption {
    /// Stable identity for list diffing
    pub fn key(&self) -> String {
        format!(
            "{}{}{}",
            self.package.clear_name, self.monetization_type, self.presentation_type
        )
    }
}

/// A streaming provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingPackage {
    /// Display name of the provider
    pub clear_name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

impl StreamingPackage {
    /// Icon path slug: lower-case, spaces to dashes, only alphanumerics and dashes
    pub fn slug(&self) -> String {
        self.clear_name
            .trim()
            .to_lowercase()
            .replace(' ', "-")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect()
    }

    /// `{icons_base_url}/icons/{slug}.png`, or `None` for an empty slug
    pub fn icon_url(&self, icons_base_url: &str) -> Option<String> {
        let slug = self.slug();
        if slug.is_empty() {
            return None;
        }
        Some(format!(
            "{}/icons/{}.png",
            icons_base_url.trim_end_matches('/'),
            slug
        ))
    }
}

/// A movie offered in the feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Movie {
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
    #[serde(default)]
    pub streaming_options: Vec<StreamingOption>,
}

impl Movie {
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

/// Join an image base and a relative path
pub(crate) fn image_url(image_base_url: &str, path: Option<&str>) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    Some(format!("{}{}", image_base_url, path))
}

/// First four characters of an ISO date
pub(crate) fn release_year(date: Option<&str>) -> Option<&str> {
    date.filter(|d| d.len() >= 4).and_then(|d| d.get(..4))
}

/// One page of the feed
#[derive(Debug, Clone, Deserialize)]
pub struct MovieFeedResponse {
    pub page: u32,
    #[serde(default)]
    pub movies: Vec<Movie>,
}

/// Response of the single-movie endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct NextMovieResponse {
    #[serde(default)]
    pub movie: Option<Movie>,
    #[serde(default)]
    pub stack_empty: bool,
}

/// Swipe direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    /// Reject
    Left,
    /// Accept
    Right,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwipeRequest {
    pub movie_id: i64,
    pub room_id: i64,
    pub direction: SwipeDirection,
}

/// The recorded swipe
#[derive(Debug, Clone, Deserialize)]
pub struct SwipeInfo {
    pub user_id: i64,
    pub movie_id: i64,
    pub room_id: i64,
    pub direction: SwipeDirection,
}

/// Match outcome attached to a swipe response
#[derive(Debug, Clone, Deserialize)]
pub struct SwipeMatchInfo {
    pub is_match: bool,
    #[serde(default)]
    pub match_id: Option<i64>,
    #[serde(default)]
    pub movie_id: Option<i64>,
    #[serde(default)]
    pub movie_title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub streaming_options: Option<Vec<StreamingOption>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwipeResponse {
    pub swipe: SwipeInfo,
    #[serde(default, rename = "match")]
    pub match_info: Option<SwipeMatchInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn package(name: &str) -> StreamingPackage {
        StreamingPackage {
            clear_name: name.to_string(),
            icon: None,
        }
    }

    #[test]
    fn icon_slug_strips_punctuation() {
        assert_eq!(package(" Disney Plus ").slug(), "disney-plus");
        assert_eq!(package("Apple TV+").slug(), "apple-tv");
        assert_eq!(
            package("Netflix").icon_url("http://localhost:3000/"),
            Some("http://localhost:3000/icons/netflix.png".to_string())
        );
        assert_eq!(package("+++").icon_url("http://localhost:3000"), None);
    }

    #[test]
    fn movie_decodes_without_streaming_options() {
        let movie: Movie = serde_json::from_value(json!({
            "id": 550,
            "title": "Fight Club",
            "overview": "",
            "poster_path": "/p.jpg",
            "release_date": "1999-10-15",
            "vote_average": 8.4
        }))
        .unwrap();
        assert!(movie.streaming_options.is_empty());
        assert_eq!(movie.release_year(), Some("1999"));
        assert_eq!(
            movie.poster_url("https://img/w780"),
            Some("https://img/w780/p.jpg".to_string())
        );
        assert_eq!(movie.backdrop_url("https://img/w780"), None);
    }

    #[test]
    fn swipe_request_uses_camel_case() {
        let body = serde_json::to_value(SwipeRequest {
            movie_id: 1,
            room_id: 2,
            direction: SwipeDirection::Right,
        })
        .unwrap();
        assert_eq!(body, json!({"movieId": 1, "roomId": 2, "direction": "right"}));
    }

    #[test]
    fn short_release_date_has_no_year() {
        assert_eq!(release_year(Some("199")), None);
        assert_eq!(release_year(None), None);
    }
}

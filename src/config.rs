//! Configuration options for the watchd client

use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration options for the watchd client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the REST API, e.g. `http://localhost:3000/api`
    pub api_base_url: String,

    /// Base URL of the realtime server
    pub socket_url: String,

    /// Prefix for poster and backdrop paths
    pub image_base_url: String,

    /// Base URL serving streaming provider icons under `/icons/`
    pub icons_base_url: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Queue length at or below which a swipe triggers a refill
    pub feed_low_water_mark: usize,

    /// Minimum time a list loader reports as loading
    pub min_loading_duration: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            socket_url: "http://localhost:3000".to_string(),
            image_base_url: "https://image.tmdb.org/t/p/w780".to_string(),
            icons_base_url: "http://localhost:3000".to_string(),
            request_timeout: Some(Duration::from_secs(30)),
            feed_low_water_mark: 5,
            min_loading_duration: Some(Duration::from_millis(450)),
        }
    }
}

impl ClientOptions {
    /// Options pointing both REST and realtime at one server root.
    ///
    /// `server_url` is the origin (`http://host:3000`); the API lives under `/api`.
    pub fn for_server(server_url: &str) -> Self {
        let root = server_url.trim_end_matches('/');
        Self {
            api_base_url: format!("{}/api", root),
            socket_url: root.to_string(),
            icons_base_url: root.to_string(),
            ..Self::default()
        }
    }

    /// Overlay `WATCHD_API_URL`, `WATCHD_SOCKET_URL` and
    /// `WATCHD_REQUEST_TIMEOUT_SECS` on the defaults.
    pub fn from_env() -> Result<Self> {
        let mut options = Self::default();
        if let Ok(url) = std::env::var("WATCHD_API_URL") {
            url::Url::parse(&url)?;
            options.api_base_url = url;
        }
        if let Ok(url) = std::env::var("WATCHD_SOCKET_URL") {
            url::Url::parse(&url)?;
            options.icons_base_url = url.clone();
            options.socket_url = url;
        }
        if let Ok(secs) = std::env::var("WATCHD_REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|_| {
                Error::config(format!("WATCHD_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            options.request_timeout = Some(Duration::from_secs(secs));
        }
        Ok(options)
    }

    /// Set the REST API base URL
    pub fn with_api_base_url(mut self, value: &str) -> Self {
        self.api_base_url = value.to_string();
        self
    }

    /// Set the realtime server URL
    pub fn with_socket_url(mut self, value: &str) -> Self {
        self.socket_url = value.to_string();
        self
    }

    /// Set the image base URL
    pub fn with_image_base_url(mut self, value: &str) -> Self {
        self.image_base_url = value.to_string();
        self
    }

    /// Set the icons base URL
    pub fn with_icons_base_url(mut self, value: &str) -> Self {
        self.icons_base_url = value.to_string();
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the feed refill threshold
    pub fn with_feed_low_water_mark(mut self, value: usize) -> Self {
        self.feed_low_water_mark = value;
        self
    }

    /// Set the loader anti-flicker floor
    pub fn with_min_loading_duration(mut self, value: Option<Duration>) -> Self {
        self.min_loading_duration = value;
        self
    }
}

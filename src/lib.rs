//! watchd Rust Client Library
//!
//! A Rust client for watchd, the collaborative movie-matching service:
//! accounts and guest sessions, rooms, a swipe feed, matches, favorites and
//! realtime room events.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod matches;
pub mod movies;
pub mod realtime;
pub mod rooms;
pub mod store;
pub mod viewmodel;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::auth::SessionManager;
use crate::client::ApiClient;
use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::realtime::RoomEventSubscriber;
use crate::rooms::Room;
use crate::store::CredentialStore;
use crate::viewmodel::{FavoritesViewModel, FeedSession, MatchesViewModel, RoomsViewModel};

/// The main entry point for the watchd client
///
/// Owns the REST client, the session and the realtime subscriber, and builds
/// the view-models the screens need.
pub struct Watchd {
    /// Client options
    pub options: ClientOptions,
    api: ApiClient,
    session: SessionManager,
    events: RoomEventSubscriber,
}

impl Watchd {
    /// Create a new client, restoring any session persisted in `credentials`
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use watchd_client::{config::ClientOptions, store::MemoryCredentialStore, Watchd};
    ///
    /// let watchd = Watchd::new(
    ///     ClientOptions::for_server("http://localhost:3000"),
    ///     Arc::new(MemoryCredentialStore::new()),
    /// )
    /// .unwrap();
    /// assert!(!watchd.session().is_authenticated());
    /// ```
    pub fn new(options: ClientOptions, credentials: Arc<dyn CredentialStore>) -> Result<Self> {
        let api = ApiClient::new(options.clone(), credentials)?;
        let events = RoomEventSubscriber::from_options(&options);
        let session = SessionManager::new(api.clone());
        session.attach_realtime(events.clone());

        Ok(Self {
            options,
            api,
            session,
            events,
        })
    }

    /// Get a reference to the REST client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Get a reference to the session manager
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Get a reference to the realtime subscriber
    pub fn events(&self) -> &RoomEventSubscriber {
        &self.events
    }

    /// Tear the session down whenever a request answers 401.
    ///
    /// Must be called within a Tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        self.session.spawn_unauthorized_listener()
    }

    /// Swipe feed for `room`
    pub fn feed(&self, room: Room) -> FeedSession {
        FeedSession::new(self.api.clone(), room)
    }

    /// Open the feed of `room` with realtime events attached
    pub async fn enter_room(&self, room: Room) -> Result<(FeedSession, JoinHandle<()>)> {
        let session = self
            .session
            .current()
            .ok_or_else(|| Error::validation("Please sign in first."))?;
        let feed = self.feed(room);
        let event_loop = feed.attach(&self.events, &session.token).await?;
        Ok((feed, event_loop))
    }

    /// Leave the realtime channel of the current room; its feed stops receiving events
    pub async fn exit_room(&self) {
        self.events.disconnect().await;
    }

    pub fn rooms(&self) -> RoomsViewModel {
        RoomsViewModel::new(self.api.clone(), self.session.clone())
    }

    pub fn matches(&self, room_id: i64) -> MatchesViewModel {
        MatchesViewModel::new(self.api.clone(), room_id)
    }

    pub fn favorites(&self) -> FavoritesViewModel {
        FavoritesViewModel::new(self.api.clone())
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Session, SessionEvent, SessionManager, SessionState, User};
    pub use crate::client::ApiClient;
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::matches::{Favorite, Match, MatchEvent};
    pub use crate::movies::{Movie, SwipeDirection};
    pub use crate::realtime::{RoomEvent, RoomEventSubscriber};
    pub use crate::rooms::{Room, RoomFilters, RoomStatus};
    pub use crate::store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
    pub use crate::viewmodel::{
        FavoritesViewModel, FeedSession, FetchOutcome, MatchesViewModel, RoomsViewModel,
    };
    pub use crate::Watchd;
}

//! Room list management
//!
//! Every successful mutation re-fetches the whole list instead of patching it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use super::{Loader, StateStore};
use crate::auth::SessionManager;
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::rooms::{normalize_code, LeaveRoomResponse, Room, RoomFilters};

#[derive(Debug, Clone, Default)]
pub struct RoomsState {
    /// Rooms that are not dissolved
    pub rooms: Vec<Room>,
    /// Dissolved rooms
    pub archived: Vec<Room>,
    /// The room the user is in
    pub active_room: Option<Room>,
    /// Code from a deep link that arrived before sign-in
    pub pending_join_code: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl RoomsState {
    fn settle(&mut self) {
        self.is_loading = false;
    }
}

struct RoomsInner {
    api: ApiClient,
    session: SessionManager,
    state: StateStore<RoomsState>,
    list: Loader,
    archive: Loader,
}

/// View-model of the room list
#[derive(Clone)]
pub struct RoomsViewModel {
    inner: Arc<RoomsInner>,
}

impl RoomsViewModel {
    pub fn new(api: ApiClient, session: SessionManager) -> Self {
        let floor = api.options().min_loading_duration;
        Self {
            inner: Arc::new(RoomsInner {
                api,
                session,
                state: StateStore::new(RoomsState::default()),
                list: Loader::new(floor),
                archive: Loader::new(floor),
            }),
        }
    }

    pub fn state(&self) -> RoomsState {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<RoomsState> {
        self.inner.state.subscribe()
    }

    /// Load the rooms that are not dissolved
    pub async fn load(&self) -> Result<()> {
        self.inner.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        match self
            .inner
            .list
            .run(&self.inner.state, RoomsState::settle, self.inner.api.get_rooms())
            .await
        {
            None => Ok(()),
            Some(Ok(response)) => {
                let rooms: Vec<Room> = response
                    .rooms
                    .into_iter()
                    .filter(|room| !room.is_dissolved())
                    .collect();
                debug!("Loaded {} rooms", rooms.len());
                self.inner.state.update(|s| {
                    s.is_loading = false;
                    s.rooms = rooms;
                });
                Ok(())
            }
            Some(Err(e)) => Err(self.fail(e)),
        }
    }

    /// Load only dissolved rooms
    pub async fn load_archived(&self) -> Result<()> {
        self.inner.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        match self
            .inner
            .archive
            .run(&self.inner.state, RoomsState::settle, self.inner.api.get_rooms())
            .await
        {
            None => Ok(()),
            Some(Ok(response)) => {
                let archived: Vec<Room> = response
                    .rooms
                    .into_iter()
                    .filter(Room::is_dissolved)
                    .collect();
                self.inner.state.update(|s| {
                    s.is_loading = false;
                    s.archived = archived;
                });
                Ok(())
            }
            Some(Err(e)) => Err(self.fail(e)),
        }
    }

    pub async fn create_room(
        &self,
        name: Option<&str>,
        filters: Option<&RoomFilters>,
    ) -> Result<Room> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let response = self
            .inner
            .api
            .create_room(name, filters)
            .await
            .map_err(|e| self.fail(e))?;
        info!("Created room {}", response.room.id);
        self.refresh().await;
        Ok(response.room)
    }

    /// Join by code and make the room active.
    ///
    /// A blank code is rejected without a request.
    pub async fn join_room(&self, code: &str) -> Result<Room> {
        let code = normalize_code(code).map_err(|e| self.fail(e))?;
        let response = self
            .inner
            .api
            .join_room(&code)
            .await
            .map_err(|e| self.fail(e))?;
        info!("Joined room {}", response.room.id);
        let room = response.room;
        self.inner
            .state
            .update(|s| s.active_room = Some(room.clone()));
        self.refresh().await;
        Ok(room)
    }

    pub async fn leave_room(&self, room_id: i64) -> Result<LeaveRoomResponse> {
        let response = self
            .inner
            .api
            .leave_room(room_id)
            .await
            .map_err(|e| self.fail(e))?;
        if response.dissolved {
            info!("Room {} dissolved", room_id);
        }
        self.inner.state.update(|s| {
            if s.active_room.as_ref().map(|r| r.id) == Some(room_id) {
                s.active_room = None;
            }
        });
        self.refresh().await;
        Ok(response)
    }

    pub async fn rename_room(&self, room_id: i64, name: &str) -> Result<Room> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.fail(Error::validation("Please enter a room name.")));
        }
        let response = self
            .inner
            .api
            .update_room_name(room_id, name)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh().await;
        Ok(response.room)
    }

    pub async fn update_filters(&self, room_id: i64, filters: &RoomFilters) -> Result<Room> {
        let response = self
            .inner
            .api
            .update_room_filters(room_id, filters)
            .await
            .map_err(|e| self.fail(e))?;
        self.refresh().await;
        Ok(response.room)
    }

    /// Remove a dissolved room from the archive and reload the archive
    pub async fn delete_from_archive(&self, room_id: i64) -> Result<()> {
        self.inner
            .api
            .delete_from_archive(room_id)
            .await
            .map_err(|e| self.fail(e))?;
        if let Err(e) = self.load_archived().await {
            warn!("Archive refresh failed: {}", e);
        }
        Ok(())
    }

    pub fn select_room(&self, room: Option<Room>) {
        self.inner.state.update(|s| s.active_room = room);
    }

    /// Join from an external link.
    ///
    /// Without a session the code is kept until [`Self::resume_pending_join`].
    pub async fn handle_deep_link(&self, code: &str) -> Result<Option<Room>> {
        let code = normalize_code(code).map_err(|e| self.fail(e))?;
        if !self.inner.session.is_authenticated() {
            debug!("Holding join code until sign-in");
            self.inner
                .state
                .update(|s| s.pending_join_code = Some(code));
            return Ok(None);
        }
        self.join_room(&code).await.map(Some)
    }

    /// Join the held deep-link code once a session exists
    pub async fn resume_pending_join(&self) -> Result<Option<Room>> {
        if !self.inner.session.is_authenticated() {
            return Ok(None);
        }
        let code = self.inner.state.update(|s| s.pending_join_code.take());
        match code {
            Some(code) => self.join_room(&code).await.map(Some),
            None => Ok(None),
        }
    }

    // Reload after a confirmed mutation. A failure stays in `state.error`
    // and does not undo the mutation's result.
    async fn refresh(&self) {
        if let Err(e) = self.load().await {
            warn!("Room list refresh failed: {}", e);
        }
    }

    pub fn clear_error(&self) {
        self.inner.state.update(|s| s.error = None);
    }

    fn fail(&self, error: Error) -> Error {
        if !error.is_cancelled() {
            let message = error.user_message();
            self.inner.state.update(|s| {
                s.is_loading = false;
                s.error = Some(message);
            });
        }
        error
    }
}

/// Extract the join code from an invite link.
///
/// Accepts `watchd://join/<CODE>` and any URL carrying `?code=<CODE>`.
pub fn parse_join_link(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let from_query = url
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned());
    let from_path = || {
        if url.scheme() != "watchd" || url.host_str() != Some("join") {
            return None;
        }
        url.path_segments()?
            .find(|segment| !segment.is_empty())
            .map(str::to_string)
    };
    from_query
        .or_else(from_path)
        .and_then(|code| normalize_code(&code).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_custom_scheme_link() {
        assert_eq!(
            parse_join_link("watchd://join/ab12cd"),
            Some("AB12CD".to_string())
        );
    }

    #[test]
    fn parses_query_code() {
        assert_eq!(
            parse_join_link("https://watchd.app/join?code=xy98zz"),
            Some("XY98ZZ".to_string())
        );
    }

    #[test]
    fn rejects_links_without_code() {
        assert_eq!(parse_join_link("watchd://join/"), None);
        assert_eq!(parse_join_link("watchd://rooms/AB12CD"), None);
        assert_eq!(parse_join_link("not a url"), None);
    }
}

//! Matches of one room

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{Loader, StateStore};
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::matches::Match;

#[derive(Debug, Clone, Default)]
pub struct MatchesState {
    pub matches: Vec<Match>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl MatchesState {
    fn settle(&mut self) {
        self.is_loading = false;
    }
}

struct MatchesInner {
    api: ApiClient,
    room_id: i64,
    state: StateStore<MatchesState>,
    loader: Loader,
}

/// View-model of a room's match list
#[derive(Clone)]
pub struct MatchesViewModel {
    inner: Arc<MatchesInner>,
}

impl MatchesViewModel {
    pub fn new(api: ApiClient, room_id: i64) -> Self {
        let floor = api.options().min_loading_duration;
        Self {
            inner: Arc::new(MatchesInner {
                api,
                room_id,
                state: StateStore::new(MatchesState::default()),
                loader: Loader::new(floor),
            }),
        }
    }

    pub fn room_id(&self) -> i64 {
        self.inner.room_id
    }

    pub fn state(&self) -> MatchesState {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<MatchesState> {
        self.inner.state.subscribe()
    }

    /// Replace the list with the server's
    pub async fn load(&self) -> Result<()> {
        self.inner.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        let request = self.inner.api.get_matches(self.inner.room_id);
        match self
            .inner
            .loader
            .run(&self.inner.state, MatchesState::settle, request)
            .await
        {
            None => Ok(()),
            Some(Ok(response)) => {
                debug!(
                    "Loaded {} matches for room {}",
                    response.matches.len(),
                    self.inner.room_id
                );
                self.inner.state.update(|s| {
                    s.is_loading = false;
                    s.matches = response.matches;
                });
                Ok(())
            }
            Some(Err(e)) => Err(self.fail(e)),
        }
    }

    /// Set the watched flag; local state changes only after the server confirms
    pub async fn toggle_watched(&self, match_id: i64, watched: bool) -> Result<()> {
        self.inner
            .api
            .update_match_watched(match_id, watched)
            .await
            .map_err(|e| self.fail(e))?;
        self.inner.state.update(|s| {
            if let Some(m) = s.matches.iter_mut().find(|m| m.id == match_id) {
                m.watched = watched;
            }
        });
        Ok(())
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

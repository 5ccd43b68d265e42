//! Favorites across all rooms

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::{Loader, StateStore};
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::matches::Favorite;

#[derive(Debug, Clone, Default)]
pub struct FavoritesState {
    pub favorites: Vec<Favorite>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl FavoritesState {
    fn settle(&mut self) {
        self.is_loading = false;
    }
}

struct FavoritesInner {
    api: ApiClient,
    state: StateStore<FavoritesState>,
    loader: Loader,
}

/// View-model of the favorites list
#[derive(Clone)]
pub struct FavoritesViewModel {
    inner: Arc<FavoritesInner>,
}

impl FavoritesViewModel {
    pub fn new(api: ApiClient) -> Self {
        let floor = api.options().min_loading_duration;
        Self {
            inner: Arc::new(FavoritesInner {
                api,
                state: StateStore::new(FavoritesState::default()),
                loader: Loader::new(floor),
            }),
        }
    }

    pub fn state(&self) -> FavoritesState {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoritesState> {
        self.inner.state.subscribe()
    }

    pub fn is_favorite(&self, movie_id: i64) -> bool {
        self.inner
            .state
            .read(|s| s.favorites.iter().any(|f| f.movie.id == movie_id))
    }

    /// Replace the list with the server's
    pub async fn load(&self) -> Result<()> {
        self.inner.state.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        match self
            .inner
            .loader
            .run(&self.inner.state, FavoritesState::settle, self.inner.api.get_favorites())
            .await
        {
            None => Ok(()),
            Some(Ok(response)) => {
                debug!("Loaded {} favorites", response.favorites.len());
                self.inner.state.update(|s| {
                    s.is_loading = false;
                    s.favorites = response.favorites;
                });
                Ok(())
            }
            Some(Err(e)) => Err(self.fail(e)),
        }
    }

    /// Add or remove `movie_id`; returns whether it is now a favorite.
    ///
    /// Removal drops the entry locally. Addition reloads the list, since the
    /// server decides the new entry's position and contents.
    pub async fn toggle_favorite(&self, movie_id: i64) -> Result<bool> {
        if self.is_favorite(movie_id) {
            self.inner
                .api
                .remove_favorite(movie_id)
                .await
                .map_err(|e| self.fail(e))?;
            self.inner
                .state
                .update(|s| s.favorites.retain(|f| f.movie.id != movie_id));
            Ok(false)
        } else {
            self.inner
                .api
                .add_favorite(movie_id)
                .await
                .map_err(|e| self.fail(e))?;
            self.load().await?;
            Ok(true)
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

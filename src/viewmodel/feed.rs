//! Swipe feed of one room
//!
//! The session buffers a forward-only queue of movies. Pages are fetched one
//! at a time; a swipe removes the head of the queue before its request is
//! sent, and a filters change throws the whole buffer away.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use super::StateStore;
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::matches::MatchEvent;
use crate::movies::{Movie, SwipeDirection, SwipeResponse};
use crate::realtime::{RoomEvent, RoomEventSubscriber};
use crate::rooms::{Room, RoomMember};

/// Observable state of a feed session
#[derive(Debug, Clone)]
pub struct FeedState {
    pub room: Room,
    /// Pending movies, head first
    pub movies: VecDeque<Movie>,
    /// Next page to request, starting at 1
    pub page: u32,
    /// A page request is in flight
    pub is_fetching: bool,
    /// False once an empty page came back
    pub has_more: bool,
    /// Fetching while nothing is buffered
    pub is_loading: bool,
    pub members: Vec<RoomMember>,
    /// Match waiting to be dismissed
    pub current_match: Option<MatchEvent>,
    pub room_dissolved: bool,
    pub error: Option<String>,
    // Bumped on reset; a page fetched under an older value is dropped.
    generation: u64,
    // Identifies the fetch that owns `is_fetching`.
    fetch_id: u64,
    in_flight: Option<AbortHandle>,
}

impl FeedState {
    fn new(room: Room) -> Self {
        Self {
            room,
            movies: VecDeque::new(),
            page: 1,
            is_fetching: false,
            has_more: true,
            is_loading: false,
            members: Vec::new(),
            current_match: None,
            room_dissolved: false,
            error: None,
            generation: 0,
            fetch_id: 0,
            in_flight: None,
        }
    }

    fn finish_fetch(&mut self) {
        self.is_fetching = false;
        self.is_loading = false;
        self.in_flight = None;
    }

    /// The movie shown on top
    pub fn current_movie(&self) -> Option<&Movie> {
        self.movies.front()
    }
}

/// Result of [`FeedSession::fetch_next_page`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A fetch was in flight or the feed had ended
    Skipped,
    /// This many movies were appended
    Appended(usize),
    /// The page was empty; the feed has ended
    EndOfFeed,
    /// The feed was reset while the request ran
    Discarded,
    /// The request failed; the message is in the state
    Failed,
}

/// A swipe whose request is still running
#[derive(Debug)]
pub struct SwipeSubmission {
    /// The movie removed from the queue
    pub movie: Movie,
    /// The swipe request
    pub request: JoinHandle<Result<SwipeResponse>>,
    /// Refill started because the queue ran low
    pub refill: Option<JoinHandle<FetchOutcome>>,
}

// Releases the fetch flags if `fetch_next_page` is dropped mid-request.
struct FetchGuard<'a> {
    state: &'a StateStore<FeedState>,
    fetch_id: u64,
    request: AbortHandle,
    done: bool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.request.abort();
        self.state.update(|s| {
            if s.is_fetching && s.fetch_id == self.fetch_id {
                s.finish_fetch();
            }
        });
    }
}

struct FeedInner {
    api: ApiClient,
    room_id: i64,
    low_water_mark: usize,
    state: StateStore<FeedState>,
}

/// Feed and swipe session for one room
#[derive(Clone)]
pub struct FeedSession {
    inner: Arc<FeedInner>,
}

impl FeedSession {
    pub fn new(api: ApiClient, room: Room) -> Self {
        let low_water_mark = api.options().feed_low_water_mark;
        Self {
            inner: Arc::new(FeedInner {
                api,
                room_id: room.id,
                low_water_mark,
                state: StateStore::new(FeedState::new(room)),
            }),
        }
    }

    pub fn room_id(&self) -> i64 {
        self.inner.room_id
    }

    pub fn state(&self) -> FeedState {
        self.inner.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.inner.state.subscribe()
    }

    /// Load the first page and the member list
    pub async fn load(&self) -> FetchOutcome {
        let (outcome, ()) = tokio::join!(self.fetch_next_page(), self.fetch_room_members());
        outcome
    }

    /// Request the next page and append it to the queue.
    ///
    /// Does nothing while another fetch is in flight or after the feed ended.
    /// Only an empty page ends the feed; a short page does not.
    pub async fn fetch_next_page(&self) -> FetchOutcome {
        let room_id = self.inner.room_id;
        let ticket = self.inner.state.update(|s| {
            if s.is_fetching || !s.has_more {
                return None;
            }
            let page = s.page;
            let api = self.inner.api.clone();
            let request = tokio::spawn(async move { api.movie_feed(room_id, page).await });
            s.is_fetching = true;
            s.is_loading = s.movies.is_empty();
            s.fetch_id += 1;
            s.in_flight = Some(request.abort_handle());
            Some((page, s.generation, s.fetch_id, request))
        });
        let (page, generation, fetch_id, request) = match ticket {
            Some(ticket) => ticket,
            None => return FetchOutcome::Skipped,
        };

        debug!("Fetching feed page {} for room {}", page, room_id);
        let mut guard = FetchGuard {
            state: &self.inner.state,
            fetch_id,
            request: request.abort_handle(),
            done: false,
        };
        let result = request.await.unwrap_or(Err(Error::Cancelled));
        guard.done = true;

        self.inner.state.update(|s| {
            if s.generation != generation {
                debug!("Discarding feed page {} fetched before a reset", page);
                return FetchOutcome::Discarded;
            }
            s.finish_fetch();
            match result {
                Ok(response) if response.movies.is_empty() => {
                    info!("Feed for room {} ended at page {}", room_id, page);
                    s.has_more = false;
                    FetchOutcome::EndOfFeed
                }
                Ok(response) => {
                    let count = response.movies.len();
                    s.movies.extend(response.movies);
                    s.page += 1;
                    FetchOutcome::Appended(count)
                }
                Err(e) if e.is_cancelled() => FetchOutcome::Skipped,
                Err(e) => {
                    warn!("Feed page {} failed: {}", page, e);
                    s.error = Some(e.user_message());
                    FetchOutcome::Failed
                }
            }
        })
    }

    /// Swipe the head of the queue.
    ///
    /// The movie leaves the queue immediately and is not put back if the
    /// request fails. Must be called within a Tokio runtime.
    pub fn submit_swipe(&self, direction: SwipeDirection) -> Result<SwipeSubmission> {
        let low_water_mark = self.inner.low_water_mark;
        let (movie, needs_refill) = self
            .inner
            .state
            .update(|s| {
                let movie = s.movies.pop_front()?;
                Some((movie, s.movies.len() <= low_water_mark))
            })
            .ok_or(Error::EmptyQueue)?;

        let refill = if needs_refill {
            let session = self.clone();
            Some(tokio::spawn(async move { session.fetch_next_page().await }))
        } else {
            None
        };

        let session = self.clone();
        let movie_id = movie.id;
        let request = tokio::spawn(async move { session.post_swipe(movie_id, direction).await });

        Ok(SwipeSubmission {
            movie,
            request,
            refill,
        })
    }

    /// Swipe the head of the queue and wait for the request
    pub async fn swipe(&self, direction: SwipeDirection) -> Result<SwipeResponse> {
        let submission = self.submit_swipe(direction)?;
        submission.request.await.map_err(|_| Error::Cancelled)?
    }

    async fn post_swipe(&self, movie_id: i64, direction: SwipeDirection) -> Result<SwipeResponse> {
        let result = self
            .inner
            .api
            .submit_swipe(movie_id, self.inner.room_id, direction)
            .await;
        if let Err(e) = &result {
            if !e.is_cancelled() {
                warn!("Swipe on movie {} failed: {}", movie_id, e);
                let message = e.user_message();
                self.inner.state.update(|s| s.error = Some(message));
            }
        }
        result
    }

    /// Refresh the member list; failures are ignored
    pub async fn fetch_room_members(&self) {
        match self.inner.api.get_room(self.inner.room_id).await {
            Ok(detail) => self.inner.state.update(|s| {
                s.room = detail.room;
                s.members = detail.members;
            }),
            Err(e) => debug!("Ignoring member refresh failure: {}", e),
        }
    }

    /// Drop the buffered feed and fetch page 1 again.
    ///
    /// A page request still in flight is aborted first.
    pub async fn reset_feed(&self) -> FetchOutcome {
        self.inner.state.update(|s| {
            if let Some(request) = s.in_flight.take() {
                debug!("Aborting feed request of room {}", self.inner.room_id);
                request.abort();
            }
            s.movies.clear();
            s.page = 1;
            s.has_more = true;
            s.is_fetching = false;
            s.is_loading = false;
            s.generation += 1;
        });
        self.fetch_next_page().await
    }

    /// Apply a realtime event; events of other rooms are ignored
    pub async fn handle_event(&self, event: RoomEvent) {
        if !event.concerns(self.inner.room_id) {
            return;
        }
        match event {
            RoomEvent::Match(m) => {
                info!("Match on movie {} in room {}", m.movie_id, self.inner.room_id);
                self.inner.state.update(|s| s.current_match = Some(m));
            }
            RoomEvent::FiltersUpdated { filters, .. } => {
                info!("Filters of room {} changed; resetting feed", self.inner.room_id);
                self.inner.state.update(|s| s.room.filters = filters);
                self.reset_feed().await;
            }
            RoomEvent::PartnerJoined { .. } | RoomEvent::PartnerLeft { .. } => {
                self.fetch_room_members().await;
            }
            RoomEvent::RoomDissolved { .. } => {
                self.inner.state.update(|s| s.room_dissolved = true);
            }
        }
    }

    /// Feed events from `events` into [`Self::handle_event`] until the channel closes
    pub fn spawn_event_loop(&self, mut events: broadcast::Receiver<RoomEvent>) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => session.handle_event(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Feed event loop lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Connect `subscriber` to this room and start handling its events.
    ///
    /// The event loop stops when the subscriber disconnects or connects to
    /// another room.
    pub async fn attach(
        &self,
        subscriber: &RoomEventSubscriber,
        token: &str,
    ) -> Result<JoinHandle<()>> {
        let events = subscriber.subscribe();
        subscriber.connect(token, self.inner.room_id).await?;
        let event_loop = self.spawn_event_loop(events);
        subscriber.bind_listener(event_loop.abort_handle());
        Ok(event_loop)
    }

    pub fn dismiss_match(&self) {
        self.inner.state.update(|s| s.current_match = None);
    }

    pub fn clear_error(&self) {
        self.inner.state.update(|s| s.error = None);
    }
}

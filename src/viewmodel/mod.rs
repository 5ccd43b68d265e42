//! Observable state holders for the screens of the app
//!
//! Each view-model owns a [`StateStore`]: the current state behind a mutex
//! plus a `watch` channel. Every mutation goes through
//! [`StateStore::update`], which publishes a fresh snapshot to all
//! subscribers, so a presentation layer only needs to render the latest value
//! it receives.

mod favorites;
mod feed;
mod matches;
mod rooms;

pub use favorites::{FavoritesState, FavoritesViewModel};
pub use feed::{FeedSession, FeedState, FetchOutcome, SwipeSubmission};
pub use matches::{MatchesState, MatchesViewModel};
pub use rooms::{parse_join_link, RoomsState, RoomsViewModel};

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;

/// State plus subscriber list
#[derive(Debug)]
pub struct StateStore<S> {
    state: Mutex<S>,
    sender: watch::Sender<S>,
}

impl<S: Clone> StateStore<S> {
    pub fn new(initial: S) -> Self {
        let (sender, _) = watch::channel(initial.clone());
        Self {
            state: Mutex::new(initial),
            sender,
        }
    }

    /// Mutate the state and publish the result.
    ///
    /// Snapshots are published while the lock is held, so subscribers see
    /// updates in the order they were applied.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let out = f(&mut state);
        self.sender.send_replace(state.clone());
        out
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    pub fn snapshot(&self) -> S {
        self.read(S::clone)
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.sender.subscribe()
    }
}

/// Await `fut`, then pad the elapsed time up to `floor`.
pub(crate) async fn with_min_duration<F: Future>(floor: Option<Duration>, fut: F) -> F::Output {
    let started = Instant::now();
    let out = fut.await;
    if let Some(floor) = floor {
        let elapsed = started.elapsed();
        if elapsed < floor {
            tokio::time::sleep(floor - elapsed).await;
        }
    }
    out
}

/// Runs list loads where a newer load supersedes an older one.
///
/// A superseded or cancelled load yields `None` and must leave state alone.
/// If the newest load is cancelled or its future dropped, `settle` is applied
/// to `state` so the loading flag does not outlive it.
#[derive(Debug)]
pub(crate) struct Loader {
    generation: AtomicU64,
    floor: Option<Duration>,
}

impl Loader {
    pub(crate) fn new(floor: Option<Duration>) -> Self {
        Self {
            generation: AtomicU64::new(0),
            floor,
        }
    }

    pub(crate) async fn run<S, T, F>(
        &self,
        state: &StateStore<S>,
        settle: fn(&mut S),
        fut: F,
    ) -> Option<Result<T>>
    where
        S: Clone,
        F: Future<Output = Result<T>>,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut guard = LoadGuard {
            loader: self,
            ticket,
            state,
            settle,
            armed: true,
        };
        let result = with_min_duration(self.floor, fut).await;
        if !self.is_current(ticket) {
            debug!("Dropping superseded load {}", ticket);
            guard.armed = false;
            return None;
        }
        match result {
            // Left armed: the guard settles the state on drop.
            Err(e) if e.is_cancelled() => None,
            other => {
                guard.armed = false;
                Some(other)
            }
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

struct LoadGuard<'a, S: Clone> {
    loader: &'a Loader,
    ticket: u64,
    state: &'a StateStore<S>,
    settle: fn(&mut S),
    armed: bool,
}

impl<S: Clone> Drop for LoadGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed && self.loader.is_current(self.ticket) {
            debug!("Load {} ended without a result", self.ticket);
            self.state.update(self.settle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn update_publishes_snapshot() {
        let store = StateStore::new(0u32);
        let rx = store.subscribe();
        let seen = store.update(|n| {
            *n += 2;
            *n
        });
        assert_eq!(seen, 2);
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(store.snapshot(), 2);
    }

    #[tokio::test]
    async fn min_duration_pads_fast_calls() {
        let started = Instant::now();
        let out = with_min_duration(Some(Duration::from_millis(50)), async { 7 }).await;
        assert_eq!(out, 7);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    fn settle(loading: &mut bool) {
        *loading = false;
    }

    #[tokio::test]
    async fn cancelled_load_is_silent_but_settles() {
        let loader = Loader::new(None);
        let state = StateStore::new(true);
        let out = loader
            .run(&state, settle, async { Err::<(), _>(Error::Cancelled) })
            .await;
        assert!(out.is_none());
        assert!(!state.snapshot());
    }

    #[tokio::test]
    async fn dropped_newest_load_settles() {
        let loader = Loader::new(None);
        let state = StateStore::new(true);
        let pending = loader.run(&state, settle, std::future::pending::<Result<()>>());
        let timed_out = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert!(timed_out.is_err());
        assert!(!state.snapshot());
    }

    #[tokio::test]
    async fn dropped_superseded_load_leaves_state() {
        let loader = Loader::new(None);
        let state = StateStore::new(true);
        let mut stale = Box::pin(loader.run(&state, settle, std::future::pending::<Result<()>>()));
        assert!(tokio::time::timeout(Duration::from_millis(10), stale.as_mut())
            .await
            .is_err());

        let mut newer = Box::pin(loader.run(&state, settle, std::future::pending::<Result<()>>()));
        assert!(tokio::time::timeout(Duration::from_millis(10), newer.as_mut())
            .await
            .is_err());

        // The newer load still runs, so its flag stays set.
        drop(stale);
        assert!(state.snapshot());
        drop(newer);
        assert!(!state.snapshot());
    }

    #[tokio::test]
    async fn newer_load_supersedes_older() {
        let loader = std::sync::Arc::new(Loader::new(None));
        let state = std::sync::Arc::new(StateStore::new(true));
        let slow = {
            let loader = loader.clone();
            let state = state.clone();
            tokio::spawn(async move {
                loader
                    .run(&state, settle, async {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok::<_, Error>(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let fast = loader
            .run(&state, settle, async { Ok::<_, Error>(2) })
            .await;

        assert!(matches!(fast, Some(Ok(2))));
        assert!(slow.await.unwrap().is_none());
    }
}

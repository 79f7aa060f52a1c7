//! Cached view of the signed-in user's notes.
//!
//! Fetched lazily, invalidated eagerly. At most one request is in flight:
//! concurrent callers await the same shared future. Mutations never patch the
//! list locally; they call `invalidate()`, which always re-fetches in full.
//!
//! Each fetch runs on its own task and records its result there, so a
//! caller that stops waiting does not leave the cache stuck in `Loading`.
//!
//! The cache belongs to one session generation. When the token changes or the
//! user logs out, an in-flight fetch is abandoned and the cached list dropped.

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use notes_types::Note;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use crate::api::{ApiClient, ApiError};
use crate::session::{SessionState, SessionStore};

pub type NotesList = Arc<Vec<Note>>;
type FetchResult = Result<NotesList, ApiError>;
type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    /// Last fetch failed; previous data, if any, is still available
    Error,
}

/// What the view renders.
#[derive(Debug, Clone)]
pub struct NotesSnapshot {
    pub notes: Option<NotesList>,
    pub status: FetchStatus,
    pub is_stale: bool,
    pub error: Option<ApiError>,
    pub updated_at: Option<DateTime<Utc>>,
}

struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

struct QueryState {
    notes: Option<NotesList>,
    status: FetchStatus,
    stale: bool,
    error: Option<ApiError>,
    updated_at: Option<DateTime<Utc>>,
    /// Session generation the contents belong to
    generation: u64,
    in_flight: Option<InFlight>,
    next_fetch_id: u64,
}

impl QueryState {
    fn empty(generation: u64) -> Self {
        Self {
            notes: None,
            status: FetchStatus::Idle,
            stale: false,
            error: None,
            updated_at: None,
            generation,
            in_flight: None,
            next_fetch_id: 0,
        }
    }
}

pub struct NotesQuery {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    state: Arc<Mutex<QueryState>>,
}

impl NotesQuery {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Arc<Self> {
        let generation = session.generation();
        Arc::new(Self {
            api,
            session,
            state: Arc::new(Mutex::new(QueryState::empty(generation))),
        })
    }

    pub fn snapshot(&self) -> NotesSnapshot {
        let mut state = self.state.lock();
        self.sync_session(&mut state);
        NotesSnapshot {
            notes: state.notes.clone(),
            status: state.status,
            is_stale: state.stale,
            error: state.error.clone(),
            updated_at: state.updated_at,
        }
    }

    /// Cached notes when fresh, otherwise fetch (joining a request already in flight).
    ///
    /// `Ok(None)` means the query is disabled: the session is not hydrated and
    /// authenticated, or it changed while the request was pending. No request is
    /// made in that case.
    pub async fn fetch_notes(&self) -> Result<Option<NotesList>, ApiError> {
        self.load(false).await
    }

    /// Fetch even when the cache is fresh; still joins a request already in flight.
    pub async fn refetch(&self) -> Result<Option<NotesList>, ApiError> {
        self.load(true).await
    }

    /// Mark the cache stale and fetch again.
    ///
    /// A fetch started before this call is detached and its result discarded,
    /// so the list always reflects a request issued after the invalidation.
    pub async fn invalidate(&self) -> Result<Option<NotesList>, ApiError> {
        {
            let mut state = self.state.lock();
            self.sync_session(&mut state);
            state.stale = true;
            if state.in_flight.take().is_some() {
                log::debug!("[NOTES_QUERY] Detached superseded fetch");
            }
        }
        log::debug!("[NOTES_QUERY] Invalidated");
        self.load(true).await
    }

    async fn load(&self, force: bool) -> Result<Option<NotesList>, ApiError> {
        let fetch = {
            let mut state = self.state.lock();
            self.sync_session(&mut state);

            if !self.session.is_ready() {
                return Ok(None);
            }

            let joined = state
                .in_flight
                .as_ref()
                .map(|in_flight| in_flight.fetch.clone());

            match joined {
                Some(fetch) => fetch,
                None => {
                    if !force && !state.stale {
                        if let Some(notes) = &state.notes {
                            return Ok(Some(notes.clone()));
                        }
                    }

                    state.next_fetch_id += 1;
                    let id = state.next_fetch_id;
                    let fetch = self.start_fetch(id, state.generation);
                    state.status = FetchStatus::Loading;
                    state.in_flight = Some(InFlight {
                        id,
                        fetch: fetch.clone(),
                    });
                    log::debug!("[NOTES_QUERY] Fetch #{} started", id);
                    fetch
                }
            }
        };

        match fetch.await {
            Ok(notes) => Ok(Some(notes)),
            Err(ApiError::Cancelled) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Spawn fetch `id` and hand back a future any number of callers can await.
    ///
    /// Called with the state lock held; the task cannot settle before
    /// `in_flight` has been recorded.
    fn start_fetch(&self, id: u64, generation: u64) -> SharedFetch {
        let api = self.api.clone();
        let session = self.session.clone();
        let state = self.state.clone();

        let task = tokio::spawn(async move {
            let session_rx = session.subscribe();
            let result = tokio::select! {
                result = api.list_notes() => result.map(Arc::new),
                _ = session_moved_on(session_rx, generation) => Err(ApiError::Cancelled),
            };
            let current = session.generation();
            settle(&mut state.lock(), id, generation, current, &result);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                log::error!("[NOTES_QUERY] Fetch #{} task failed: {}", id, e);
                Err(ApiError::Cancelled)
            })
        }
        .boxed()
        .shared()
    }

    /// Drop everything cached for an earlier session generation.
    fn sync_session(&self, state: &mut QueryState) {
        let current = self.session.generation();
        if state.generation != current {
            log::debug!(
                "[NOTES_QUERY] Session changed ({} -> {}), clearing cache",
                state.generation,
                current
            );
            let next_fetch_id = state.next_fetch_id;
            *state = QueryState::empty(current);
            state.next_fetch_id = next_fetch_id;
        }
    }
}

/// Record a finished fetch unless it was superseded or its session ended.
fn settle(
    state: &mut QueryState,
    id: u64,
    generation: u64,
    current: u64,
    result: &FetchResult,
) {
    if state.in_flight.as_ref().map(|f| f.id) != Some(id) {
        // Detached by invalidate(), or the cache was reset for a new session
        return;
    }
    state.in_flight = None;

    if state.generation != generation || current != generation {
        return;
    }

    match result {
        Ok(notes) => {
            log::debug!("[NOTES_QUERY] Fetch #{} loaded {} notes", id, notes.len());
            state.notes = Some(notes.clone());
            state.status = FetchStatus::Idle;
            state.stale = false;
            state.error = None;
            state.updated_at = Some(Utc::now());
        }
        Err(ApiError::Cancelled) => {
            state.status = FetchStatus::Idle;
        }
        Err(e) => {
            log::warn!("[NOTES_QUERY] Fetch #{} failed: {}", id, e);
            state.status = FetchStatus::Error;
            state.error = Some(e.clone());
        }
    }
}

/// Resolves when the session generation differs from `generation`.
async fn session_moved_on(mut rx: watch::Receiver<SessionState>, generation: u64) {
    loop {
        if rx.borrow_and_update().generation() != generation {
            return;
        }
        if rx.changed().await.is_err() {
            // Store dropped: nothing left to cancel on
            std::future::pending::<()>().await;
        }
    }
}

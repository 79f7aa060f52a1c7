//! Wiring of one client instance: a single session shared by the API client,
//! the notes query and the flows.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError, HttpTransport, Transport};
use crate::config::Config;
use crate::flows::{AuthFlows, NoteFlows};
use crate::query::NotesQuery;
use crate::session::{FileStorage, SessionStorage, SessionStore};

pub struct AppState {
    pub session: Arc<SessionStore>,
    pub api: Arc<ApiClient>,
    pub notes_query: Arc<NotesQuery>,
    pub notes: NoteFlows,
    pub auth: AuthFlows,
}

impl AppState {
    /// HTTP transport and file-backed session storage from `config`.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(&config.api_base_url, config.http_timeout)?;
        let storage = FileStorage::new(&config.state_dir);
        Ok(Self::new(Arc::new(transport), Arc::new(storage)))
    }

    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn SessionStorage>) -> Self {
        let session = SessionStore::new(storage);
        let api = Arc::new(ApiClient::with_session(transport, session.clone()));
        let notes_query = NotesQuery::new(api.clone(), session.clone());
        let notes = NoteFlows::new(api.clone(), session.clone(), notes_query.clone());
        let auth = AuthFlows::new(api.clone(), session.clone());

        Self {
            session,
            api,
            notes_query,
            notes,
            auth,
        }
    }

    /// Restore the persisted session. Call once at start-up.
    pub fn bootstrap(&self) {
        self.session.hydrate();
    }
}

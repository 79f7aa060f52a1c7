//! In-memory stand-in for the notes API, used by unit tests.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use notes_types::{Note, NoteDraft, RegisterRequest};
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

use crate::api::{ApiError, ApiRequest, ApiResponse, Body, Transport};

pub struct FakeNotesServer {
    notes: Mutex<Vec<Note>>,
    requests: Mutex<Vec<ApiRequest>>,
    next_id: AtomicU64,
    network_down: AtomicBool,
    /// Next request with this method fails with (status, detail)
    fail_next: Mutex<Option<(Method, u16, String)>>,
    hold_lists: AtomicBool,
    release: Notify,
}

impl FakeNotesServer {
    pub const EMAIL: &'static str = "ada@example.com";
    pub const PASSWORD: &'static str = "correct horse";
    pub const TOKEN: &'static str = "token-ada";

    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            notes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            network_down: AtomicBool::new(false),
            fail_next: Mutex::new(None),
            hold_lists: AtomicBool::new(false),
            release: Notify::new(),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn list_count(&self) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.method == Method::GET && r.path == "/notes/")
            .count()
    }

    pub fn fail_network(&self, down: bool) {
        self.network_down.store(down, Ordering::SeqCst);
    }

    pub fn fail_next(&self, method: Method, status: u16, detail: &str) {
        *self.fail_next.lock() = Some((method, status, detail.to_string()));
    }

    /// Park `GET /notes/` until `release_lists` is called.
    pub fn hold_lists(&self, hold: bool) {
        self.hold_lists.store(hold, Ordering::SeqCst);
    }

    pub fn release_lists(&self) {
        self.release.notify_waiters();
    }

    pub fn seed(&self, title: &str, content: &str) -> Note {
        self.insert(NoteDraft::new(title, content))
    }

    pub fn titles(&self) -> Vec<String> {
        self.notes.lock().iter().map(|n| n.title.clone()).collect()
    }

    fn insert(&self, draft: NoteDraft) -> Note {
        let now = Utc::now();
        let note = Note {
            id: format!("note-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            title: draft.title,
            content: draft.content,
            owner_id: "u1".to_string(),
            created_on: now,
            last_modified: now,
        };
        self.notes.lock().push(note.clone());
        note
    }

    fn route(&self, request: &ApiRequest) -> ApiResponse {
        let path = request.path.as_str();

        if path == "/auth/login" {
            return self.login(request);
        }
        if path == "/auth/register" {
            return self.register(request);
        }

        let expected = format!("Bearer {}", Self::TOKEN);
        if request.header("Authorization") != Some(expected.as_str()) {
            return respond(401, json!({"detail": "Not authenticated"}));
        }

        match (request.method.clone(), path.strip_prefix("/notes/")) {
            (Method::GET, Some("")) => respond(200, json!(*self.notes.lock())),
            (Method::POST, Some("")) => match draft_of(request) {
                Some(draft) => respond(201, json!(self.insert(draft))),
                None => respond(422, json!({"detail": [{"msg": "field required"}]})),
            },
            (method, Some(id)) if !id.is_empty() => self.note_by_id(method, id, request),
            _ => respond(404, json!({"detail": "Not Found"})),
        }
    }

    fn note_by_id(&self, method: Method, id: &str, request: &ApiRequest) -> ApiResponse {
        let mut notes = self.notes.lock();
        let Some(index) = notes.iter().position(|n| n.id == id) else {
            return respond(404, json!({"detail": "Note not found"}));
        };

        match method {
            Method::GET => respond(200, json!(notes[index])),
            Method::PUT => {
                let Some(draft) = draft_of(request) else {
                    return respond(422, json!({"detail": [{"msg": "field required"}]}));
                };
                let note = &mut notes[index];
                note.title = draft.title;
                note.content = draft.content;
                note.last_modified = Utc::now().max(note.last_modified + Duration::milliseconds(1));
                respond(200, json!(note))
            }
            Method::DELETE => {
                notes.remove(index);
                ApiResponse {
                    status: 204,
                    body: String::new(),
                }
            }
            _ => respond(405, json!({"detail": "Method Not Allowed"})),
        }
    }

    fn login(&self, request: &ApiRequest) -> ApiResponse {
        let Body::Form(pairs) = &request.body else {
            return respond(422, json!({"detail": [{"msg": "form body required"}]}));
        };
        let field = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        };

        if field("username") == Some(Self::EMAIL) && field("password") == Some(Self::PASSWORD) {
            respond(200, json!({"access_token": Self::TOKEN, "token_type": "bearer"}))
        } else {
            respond(401, json!({"detail": "Incorrect email or password"}))
        }
    }

    fn register(&self, request: &ApiRequest) -> ApiResponse {
        let Body::Json(value) = &request.body else {
            return respond(422, json!({"detail": [{"msg": "json body required"}]}));
        };
        let Ok(body) = serde_json::from_value::<RegisterRequest>(value.clone()) else {
            return respond(422, json!({"detail": [{"msg": "field required"}]}));
        };
        if body.user_email == Self::EMAIL {
            return respond(400, json!({"detail": "Email already registered"}));
        }
        respond(
            201,
            json!({"user_id": "u2", "user_name": body.user_name, "user_email": body.user_email}),
        )
    }
}

fn draft_of(request: &ApiRequest) -> Option<NoteDraft> {
    match &request.body {
        Body::Json(value) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

fn respond(status: u16, body: serde_json::Value) -> ApiResponse {
    ApiResponse {
        status,
        body: body.to_string(),
    }
}

#[async_trait]
impl Transport for FakeNotesServer {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().push(request.clone());

        // Let concurrent callers interleave as they would over a socket
        tokio::task::yield_now().await;

        if self.network_down.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection refused".to_string()));
        }

        if request.method == Method::GET
            && request.path == "/notes/"
            && self.hold_lists.load(Ordering::SeqCst)
        {
            self.release.notified().await;
        }

        let injected = {
            let mut fail = self.fail_next.lock();
            match fail.as_ref() {
                Some((method, _, _)) if *method == request.method => fail.take(),
                _ => None,
            }
        };
        if let Some((_, status, detail)) = injected {
            return Ok(respond(status, json!({"detail": detail})));
        }

        Ok(self.route(&request))
    }
}

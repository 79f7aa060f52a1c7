//! Typed client for the notes HTTP API.

use notes_types::{LoginForm, Note, NoteDraft, RegisterRequest, TokenResponse, User};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::error::ApiError;
use super::middleware::{BearerAuth, RequestMiddleware};
use super::transport::{ApiRequest, ApiResponse, Body, Transport};
use crate::session::SessionStore;

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    middleware: Vec<Arc<dyn RequestMiddleware>>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            middleware: Vec::new(),
        }
    }

    /// Client whose requests carry the session's bearer token.
    pub fn with_session(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self::new(transport).with_middleware(Arc::new(BearerAuth::new(session)))
    }

    /// Append a middleware stage (builder pattern)
    pub fn with_middleware(mut self, middleware: Arc<dyn RequestMiddleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Run middleware, send, and turn non-success statuses into `ApiError::Http`.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        for stage in &self.middleware {
            stage.prepare(&mut request);
        }

        let method = request.method.clone();
        let path = request.path.clone();
        log::debug!("[API] {} {}", method, path);

        let resp = self.transport.send(request).await.map_err(|e| {
            log::warn!("[API] {} {} failed: {}", method, path, e);
            e
        })?;

        if !resp.is_success() {
            let err = ApiError::from_response(resp.status, &resp.body);
            log::warn!("[API] {} {} -> {}", method, path, err);
            return Err(err);
        }

        Ok(resp)
    }

    /// Generic call: `request(method, path, body)` decoded into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Body,
    ) -> Result<T, ApiError> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        self.execute(request).await?.json()
    }

    // ── Auth ─────────────────────────────────────────

    pub async fn login(&self, form: &LoginForm) -> Result<TokenResponse, ApiError> {
        let request = ApiRequest::post("/auth/login")
            .form(vec![
                ("username".to_string(), form.username.clone()),
                ("password".to_string(), form.password.clone()),
            ])
            .public();
        self.execute(request).await?.json()
    }

    pub async fn register(&self, body: &RegisterRequest) -> Result<User, ApiError> {
        let request = ApiRequest::post("/auth/register").json(body)?.public();
        self.execute(request).await?.json()
    }

    // ── Notes ────────────────────────────────────────

    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        self.request(Method::GET, "/notes/", Body::Empty).await
    }

    pub async fn get_note(&self, note_id: &str) -> Result<Note, ApiError> {
        self.request(Method::GET, &note_path(note_id), Body::Empty).await
    }

    pub async fn create_note(&self, draft: &NoteDraft) -> Result<Note, ApiError> {
        let request = ApiRequest::post("/notes/").json(draft)?;
        self.execute(request).await?.json()
    }

    pub async fn update_note(&self, note_id: &str, draft: &NoteDraft) -> Result<Note, ApiError> {
        let request = ApiRequest::put(note_path(note_id)).json(draft)?;
        self.execute(request).await?.json()
    }

    /// The server answers 204 with no body.
    pub async fn delete_note(&self, note_id: &str) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(note_path(note_id))).await?;
        Ok(())
    }
}

fn note_path(note_id: &str) -> String {
    format!("/notes/{}", urlencoding::encode(note_id))
}

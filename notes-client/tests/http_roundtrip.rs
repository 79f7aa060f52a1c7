//! End-to-end: real `reqwest` transport against a local axum stand-in for the notes API.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post, put};
use axum::{Form, Router};
use chrono::Utc;
use notes_client::flows::DeleteOutcome;
use notes_client::{AppState, Config};
use notes_types::{LoginForm, Note, NoteDraft};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct horse";
const TOKEN: &str = "jwt-ada";

#[derive(Default)]
struct ServerState {
    notes: Mutex<Vec<Note>>,
    list_requests: AtomicUsize,
    next_id: AtomicUsize,
}

type Shared = Arc<ServerState>;
type Rejection = (StatusCode, Json<Value>);

fn reject(status: StatusCode, detail: &str) -> Rejection {
    (status, Json(json!({ "detail": detail })))
}

fn authorize(headers: &HeaderMap) -> Result<(), Rejection> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(reject(StatusCode::UNAUTHORIZED, "Could not validate credentials")),
    }
}

// POST /auth/login
async fn login(Form(form): Form<LoginForm>) -> Result<Json<Value>, Rejection> {
    if form.username == EMAIL && form.password == PASSWORD {
        Ok(Json(json!({ "access_token": TOKEN, "token_type": "bearer" })))
    } else {
        Err(reject(StatusCode::UNAUTHORIZED, "Incorrect email or password"))
    }
}

// GET /notes/
async fn list_notes(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<Note>>, Rejection> {
    authorize(&headers)?;
    state.list_requests.fetch_add(1, Ordering::SeqCst);
    // Slow enough for concurrent callers to overlap
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(Json(state.notes.lock().clone()))
}

// POST /notes/
async fn create_note(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(draft): Json<NoteDraft>,
) -> Result<(StatusCode, Json<Note>), Rejection> {
    authorize(&headers)?;
    let now = Utc::now();
    let note = Note {
        id: format!("n{}", state.next_id.fetch_add(1, Ordering::SeqCst)),
        title: draft.title,
        content: draft.content,
        owner_id: "u1".to_string(),
        created_on: now,
        last_modified: now,
    };
    state.notes.lock().push(note.clone());
    Ok((StatusCode::CREATED, Json(note)))
}

// PUT /notes/:id
async fn update_note(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(draft): Json<NoteDraft>,
) -> Result<Json<Note>, Rejection> {
    authorize(&headers)?;
    let mut notes = state.notes.lock();
    let note = notes
        .iter_mut()
        .find(|n| n.id == id)
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Note not found"))?;
    note.title = draft.title;
    note.content = draft.content;
    note.last_modified = Utc::now();
    Ok(Json(note.clone()))
}

// DELETE /notes/:id
async fn delete_note(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, Rejection> {
    authorize(&headers)?;
    let mut notes = state.notes.lock();
    let before = notes.len();
    notes.retain(|n| n.id != id);
    if notes.len() == before {
        return Err(reject(StatusCode::NOT_FOUND, "Note not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn spawn_server() -> (String, Shared) {
    let state: Shared = Arc::new(ServerState::default());
    let app = Router::new()
        .route("/auth/login", post(login))
        .route("/notes/", get(list_notes).post(create_note))
        .route("/notes/:id", put(update_note).delete(delete_note))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

#[tokio::test]
async fn test_full_session_lifecycle_over_http() {
    let (base_url, server) = spawn_server().await;
    let state_dir = tempdir().unwrap();
    let config = Config::new(&base_url, state_dir.path().to_path_buf()).unwrap();

    let app = AppState::from_config(&config).unwrap();
    app.bootstrap();

    // Signed out: the query stays idle and sends nothing
    assert!(app.notes_query.fetch_notes().await.unwrap().is_none());
    assert_eq!(server.list_requests.load(Ordering::SeqCst), 0);

    app.auth.login(EMAIL, PASSWORD).await.unwrap();
    assert!(app.session.is_authenticated());

    // Two overlapping fetches share one request
    let (a, b) = tokio::join!(app.notes_query.fetch_notes(), app.notes_query.fetch_notes());
    assert!(a.unwrap().unwrap().is_empty());
    assert!(b.unwrap().unwrap().is_empty());
    assert_eq!(server.list_requests.load(Ordering::SeqCst), 1);

    let created = app
        .notes
        .create_note(&NoteDraft::new("Shopping List", "<p>eggs</p>"))
        .await
        .unwrap();
    let cached = app.notes_query.snapshot().notes.unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].title, "Shopping List");

    let updated = app
        .notes
        .update_note(&created.id, &NoteDraft::new("Shopping List", "<p>eggs, milk</p>"))
        .await
        .unwrap();
    assert!(updated.last_modified >= created.last_modified);
    assert_eq!(app.notes_query.snapshot().notes.unwrap()[0].content, "<p>eggs, milk</p>");

    let outcome = app
        .notes
        .delete_note(&created.id, &|_: &str| true)
        .await
        .unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(app.notes_query.snapshot().notes.unwrap().is_empty());

    // Deleting again is a server-reported error
    let err = app
        .notes
        .delete_note(&created.id, &|_: &str| true)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Note not found");

    // A restart restores the session from disk
    let restarted = AppState::from_config(&config).unwrap();
    restarted.bootstrap();
    assert!(restarted.session.is_authenticated());
    assert!(restarted.notes_query.fetch_notes().await.unwrap().is_some());

    // Logout clears the file as well
    restarted.auth.logout();
    let after_logout = AppState::from_config(&config).unwrap();
    after_logout.bootstrap();
    assert!(!after_logout.session.is_authenticated());
}

#[tokio::test]
async fn test_wrong_password_and_expired_token() {
    let (base_url, _server) = spawn_server().await;
    let state_dir = tempdir().unwrap();
    let config = Config::new(&base_url, state_dir.path().to_path_buf()).unwrap();

    let app = AppState::from_config(&config).unwrap();
    app.bootstrap();

    let err = app.auth.login(EMAIL, "wrong").await.unwrap_err();
    assert_eq!(err.user_message(), "Incorrect email or password");

    // A token the server no longer accepts: reported, session left alone
    app.session.set_token("revoked");
    let err = app.notes_query.fetch_notes().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(app.session.is_authenticated());
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let state_dir = tempdir().unwrap();
    let base_url = format!("http://127.0.0.1:{}", port);
    let config = Config::new(&base_url, state_dir.path().to_path_buf()).unwrap();
    let app = AppState::from_config(&config).unwrap();
    app.bootstrap();
    app.session.set_token(TOKEN);

    let err = app.notes_query.fetch_notes().await.unwrap_err();
    assert!(matches!(err, notes_client::api::ApiError::Network(_)));
    assert_eq!(
        err.user_message(),
        "Could not reach the server. Please check your connection and try again."
    );
}

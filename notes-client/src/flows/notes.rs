//! Create / update / delete, each followed by a full cache invalidation.
//!
//! Every flow validates first, issues exactly one API call, and only then
//! invalidates the notes query. Failures leave the cache and the user's edits
//! untouched; nothing is retried.

use notes_types::{Note, NoteDraft};
use std::sync::Arc;

use super::error::{FlowError, ValidationError};
use crate::api::ApiClient;
use crate::query::NotesQuery;
use crate::session::SessionStore;

pub const DELETE_CONFIRMATION: &str = "Are you sure you want to delete this note?";

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F: Fn(&str) -> bool> Confirm for F {
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined; nothing was sent
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit { note_id: String },
}

/// The open editing surface: the form state a view binds to.
#[derive(Debug, Clone)]
pub struct NoteEditor {
    mode: EditorMode,
    pub title: String,
    pub content: String,
    open: bool,
    error: Option<String>,
}

impl NoteEditor {
    pub fn create() -> Self {
        Self {
            mode: EditorMode::Create,
            title: String::new(),
            content: String::new(),
            open: true,
            error: None,
        }
    }

    pub fn edit(note: &Note) -> Self {
        Self {
            mode: EditorMode::Edit {
                note_id: note.id.clone(),
            },
            title: note.title.clone(),
            content: note.content.clone(),
            open: true,
            error: None,
        }
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Message from the last failed save, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn draft(&self) -> NoteDraft {
        NoteDraft::new(self.title.clone(), self.content.clone())
    }
}

pub struct NoteFlows {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
    query: Arc<NotesQuery>,
}

impl NoteFlows {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>, query: Arc<NotesQuery>) -> Self {
        Self {
            api,
            session,
            query,
        }
    }

    pub async fn create_note(&self, draft: &NoteDraft) -> Result<Note, FlowError> {
        validate_draft(draft)?;
        self.ensure_ready()?;

        let note = self.api.create_note(draft).await.map_err(|e| {
            log::warn!("[NOTES] Failed to create note: {}", e);
            FlowError::from(e)
        })?;
        log::info!("[NOTES] Created note {}", note.id);

        self.refresh().await;
        Ok(note)
    }

    pub async fn update_note(&self, note_id: &str, draft: &NoteDraft) -> Result<Note, FlowError> {
        if note_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("Note id").into());
        }
        validate_draft(draft)?;
        self.ensure_ready()?;

        let note = self.api.update_note(note_id, draft).await.map_err(|e| {
            log::warn!("[NOTES] Failed to update note {}: {}", note_id, e);
            FlowError::from(e)
        })?;
        log::info!("[NOTES] Updated note {}", note.id);

        self.refresh().await;
        Ok(note)
    }

    /// Delete after explicit confirmation. Declining sends nothing.
    pub async fn delete_note(
        &self,
        note_id: &str,
        confirm: &dyn Confirm,
    ) -> Result<DeleteOutcome, FlowError> {
        if note_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("Note id").into());
        }
        self.ensure_ready()?;

        if !confirm.confirm(DELETE_CONFIRMATION) {
            log::debug!("[NOTES] Delete of {} declined", note_id);
            return Ok(DeleteOutcome::Cancelled);
        }

        self.api.delete_note(note_id).await.map_err(|e| {
            log::warn!("[NOTES] Failed to delete note {}: {}", note_id, e);
            FlowError::from(e)
        })?;
        log::info!("[NOTES] Deleted note {}", note_id);

        self.refresh().await;
        Ok(DeleteOutcome::Deleted)
    }

    /// Submit the editor: create or update depending on its mode.
    ///
    /// Success closes the editor. Failure records the message on the editor and
    /// keeps the title and content as typed.
    pub async fn save(&self, editor: &mut NoteEditor) -> Result<Note, FlowError> {
        let draft = editor.draft();
        let result = match editor.mode() {
            EditorMode::Create => self.create_note(&draft).await,
            EditorMode::Edit { note_id } => self.update_note(note_id, &draft).await,
        };

        match &result {
            Ok(_) => {
                editor.error = None;
                editor.close();
            }
            Err(e) => editor.error = Some(e.user_message()),
        }
        result
    }

    fn ensure_ready(&self) -> Result<(), FlowError> {
        if self.session.is_ready() {
            Ok(())
        } else {
            Err(FlowError::NotAuthenticated)
        }
    }

    /// Post-mutation invalidation. A failed re-fetch lands in the query's error
    /// state; the mutation itself already succeeded.
    async fn refresh(&self) {
        if let Err(e) = self.query.invalidate().await {
            log::warn!("[NOTES] Refresh after mutation failed: {}", e);
        }
    }
}

fn validate_draft(draft: &NoteDraft) -> Result<(), ValidationError> {
    if draft.title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    Ok(())
}

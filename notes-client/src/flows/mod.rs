//! User-facing operations: validation, one API call, then cache invalidation.

pub mod auth;
pub mod error;
pub mod notes;

pub use auth::{AuthFlows, SignUpForm};
pub use error::{FlowError, ValidationError};
pub use notes::{Confirm, DeleteOutcome, EditorMode, NoteEditor, NoteFlows, DELETE_CONFIRMATION};

use crate::api::ApiError;

/// Client-side check that blocks a submission before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title cannot be empty.")]
    EmptyTitle,
    #[error("{0} cannot be empty.")]
    EmptyField(&'static str),
    #[error("Passwords do not match.")]
    PasswordMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The session is not hydrated and signed in
    #[error("not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl FlowError {
    /// Text shown next to the form or in place of the list.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::NotAuthenticated => "Please sign in to continue.".to_string(),
            Self::Api(e) => e.user_message(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_unauthorized())
    }
}

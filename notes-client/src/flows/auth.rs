//! Sign-in, sign-up and sign-out.

use notes_types::{LoginForm, RegisterRequest, User};
use std::sync::Arc;

use super::error::{FlowError, ValidationError};
use crate::api::ApiClient;
use crate::session::SessionStore;

/// Display name stored after login; the token response carries no profile.
const DEFAULT_USER_NAME: &str = "User";

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub user_name: String,
    pub user_email: String,
    pub password: String,
    pub confirm_password: String,
}

pub struct AuthFlows {
    api: Arc<ApiClient>,
    session: Arc<SessionStore>,
}

impl AuthFlows {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>) -> Self {
        Self { api, session }
    }

    /// Exchange credentials for a token and store it with a profile snapshot.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, FlowError> {
        require("Email", email)?;
        require("Password", password)?;

        let form = LoginForm {
            username: email.trim().to_string(),
            password: password.to_string(),
        };
        let token = self.api.login(&form).await.map_err(|e| {
            log::warn!("[AUTH] Login failed: {}", e);
            FlowError::from(e)
        })?;

        let user = User {
            id: String::new(),
            name: DEFAULT_USER_NAME.to_string(),
            email: form.username,
        };
        self.session.set_token(token.access_token);
        self.session.set_user(user.clone());
        log::info!("[AUTH] Signed in as {}", user.email);
        Ok(user)
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, form: &SignUpForm) -> Result<User, FlowError> {
        require("Username", &form.user_name)?;
        require("Email", &form.user_email)?;
        require("Password", &form.password)?;
        if form.password != form.confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }

        let body = RegisterRequest {
            user_name: form.user_name.trim().to_string(),
            user_email: form.user_email.trim().to_string(),
            password: form.password.clone(),
        };
        let user = self.api.register(&body).await.map_err(|e| {
            log::warn!("[AUTH] Registration failed: {}", e);
            FlowError::from(e)
        })?;
        log::info!("[AUTH] Registered {}", user.email);
        Ok(user)
    }

    /// Clear the session; the notes cache drops itself on the session change.
    pub fn logout(&self) {
        self.session.logout();
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

//! Request middleware run by `ApiClient` before every send.

use reqwest::header::AUTHORIZATION;
use std::sync::Arc;

use super::transport::ApiRequest;
use crate::session::SessionStore;

pub trait RequestMiddleware: Send + Sync {
    fn prepare(&self, request: &mut ApiRequest);
}

/// Attaches `Authorization: Bearer <token>` from the session at send time.
pub struct BearerAuth {
    session: Arc<SessionStore>,
}

impl BearerAuth {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }
}

impl RequestMiddleware for BearerAuth {
    fn prepare(&self, request: &mut ApiRequest) {
        if request.public {
            return;
        }
        if let Some(token) = self.session.token() {
            request.set_header(AUTHORIZATION.as_str(), format!("Bearer {}", token));
        }
    }
}

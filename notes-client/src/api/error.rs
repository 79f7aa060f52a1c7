use reqwest::StatusCode;

/// Fallback text when the server gives no usable detail.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Failure of a single API call.
///
/// `Clone` because one coalesced fetch hands the same outcome to every awaiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection, DNS, timeout)
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Http { status: u16, detail: Option<String> },
    /// The response arrived but its body did not match the expected shape
    #[error("unexpected response body: {0}")]
    Decode(String),
    /// Abandoned because the session changed while the request was in flight
    #[error("request cancelled by a session change")]
    Cancelled,
}

impl ApiError {
    /// Build an `Http` error from a non-success response, extracting the server's detail.
    pub fn from_response(status: u16, body: &str) -> Self {
        Self::Http {
            status,
            detail: extract_detail(body),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The server rejected the credentials (expired or revoked token).
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }

    /// Text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Could not reach the server. Please check your connection and try again."
                    .to_string()
            }
            Self::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Http { detail: None, .. } => GENERIC_ERROR_MESSAGE.to_string(),
            Self::Decode(_) => {
                "The server sent a response this client does not understand.".to_string()
            }
            Self::Cancelled => {
                "The request was cancelled because the session changed.".to_string()
            }
        }
    }
}

/// `{"detail": "msg"}` or a validation list `{"detail": [{"msg": ...}, ...]}`.
fn extract_detail(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    match json.get("detail")? {
        serde_json::Value::String(detail) if !detail.trim().is_empty() => Some(detail.clone()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

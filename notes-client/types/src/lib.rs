//! Wire types shared by the notes client and the notes HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =====================================================
// Account Types
// =====================================================

/// Profile snapshot of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Empty when the profile is only known from the login form
    #[serde(rename = "user_id", default)]
    pub id: String,
    #[serde(rename = "user_name")]
    pub name: String,
    #[serde(rename = "user_email")]
    pub email: String,
}

/// Body of `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub user_name: String,
    pub user_email: String,
    pub password: String,
}

/// Form fields of `POST /auth/login`. The server expects the email in `username`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Response of `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

// =====================================================
// Note Types
// =====================================================

/// A note as returned by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "note_id")]
    pub id: String,
    #[serde(rename = "note_title")]
    pub title: String,
    /// Rich-text markup produced by the editor
    #[serde(rename = "note_content", default)]
    pub content: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(with = "timestamp")]
    pub created_on: DateTime<Utc>,
    #[serde(rename = "last_update", with = "timestamp")]
    pub last_modified: DateTime<Utc>,
}

/// Title and body sent when creating or replacing a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteDraft {
    #[serde(rename = "note_title")]
    pub title: String,
    #[serde(rename = "note_content")]
    pub content: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self::new(note.title.clone(), note.content.clone())
    }
}

/// Serde adapter for server timestamps.
///
/// The API emits naive ISO-8601 values in UTC (`2024-05-01T09:30:00.123456`);
/// RFC 3339 values with an offset are accepted as well. Output is RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

//! Session data model shared by the manager, the API client, and storage.
//!
//! DESIGN
//! ======
//! Field names mirror the backend's camelCase JSON so the `user` storage key
//! and the login response decode into the same `UserProfile` type. Decoding
//! is lenient: any missing or `null` profile field falls back to empty, and
//! `_id` is accepted for `id`. Only a body that is not JSON, or a field of an
//! impossible type, fails.

#[cfg(test)]
#[path = "models_test.rs"]
mod models_test;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// School details attached to student accounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentInfo {
    /// Grade or form, e.g. `"Form 2"` or `"7"`.
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub grade: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub school: String,
}

/// Authenticated user's profile as returned by `/auth/login`.
///
/// Replaced wholesale on every login; never patched field by field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    /// Backend user id. Numeric ids are normalized to their decimal string.
    #[serde(alias = "_id", deserialize_with = "deserialize_lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub first_name: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub last_name: String,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub phone_number: String,
    /// Account role (`"student"`, `"teacher"`, `"parent"`, `"admin"`).
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_info: Option<StudentInfo>,
}

impl UserProfile {
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_owned()
    }
}

/// Access/refresh credential pair issued by a successful login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Client-held authentication state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_loading: bool,
}

impl Session {
    /// Fresh state at startup: nothing loaded yet, loading until hydrated.
    #[must_use]
    pub fn loading() -> Self {
        Self { is_loading: true, ..Self::default() }
    }

    /// True iff an access token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Drop identity and credentials, keeping the loading flag as is.
    pub fn clear_credentials(&mut self) {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
    }
}

/// Strings pass through, numbers become their decimal text, `null` is empty.
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        _ => Err(D::Error::custom("expected string or number")),
    }
}

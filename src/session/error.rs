//! Typed failures surfaced by the session manager.

use crate::api::ApiError;

pub const LOGIN_FALLBACK_MESSAGE: &str = "Login failed";
pub const REGISTRATION_FALLBACK_MESSAGE: &str = "Registration failed";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend could not be reached.
    #[error("network error: {0}")]
    NetworkFault(String),

    /// Login was refused. `message` is the backend's text, shown verbatim.
    #[error("{message}")]
    RejectedCredentials { message: String },

    /// Registration was refused. `errors` holds field-level details when sent.
    #[error("{message}")]
    ValidationFailed { message: String, errors: Option<serde_json::Value> },

    /// A newer login or a logout started while this call was in flight, so
    /// its result was discarded.
    #[error("superseded by a newer session change")]
    Superseded,

    /// No access token is held, or it was rejected and could not be refreshed.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The backend answered with a request failure outside the auth flow.
    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The backend reported success but its body was unusable.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SessionError {
    /// Map a failed `/auth/login` call.
    #[must_use]
    pub fn from_login(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { message, .. } => {
                Self::RejectedCredentials { message: message.unwrap_or_else(|| LOGIN_FALLBACK_MESSAGE.to_owned()) }
            }
            other => Self::from_transport(other),
        }
    }

    /// Map a failed `/auth/register` call. Message precedence: backend
    /// `message`, then the JSON of `errors`, then a generic fallback.
    #[must_use]
    pub fn from_register(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { message, errors, .. } => {
                let message = message
                    .or_else(|| errors.as_ref().and_then(|e| serde_json::to_string(e).ok()))
                    .unwrap_or_else(|| REGISTRATION_FALLBACK_MESSAGE.to_owned());
                Self::ValidationFailed { message, errors }
            }
            other => Self::from_transport(other),
        }
    }

    /// Map a failed authenticated request that was not an auth rejection.
    #[must_use]
    pub fn from_request(err: ApiError) -> Self {
        match err {
            ApiError::Rejected { status, message, .. } => Self::RequestFailed {
                status,
                message: message.unwrap_or_else(|| "request failed".to_owned()),
            },
            other => Self::from_transport(other),
        }
    }

    fn from_transport(err: ApiError) -> Self {
        match err {
            ApiError::Network(m) | ApiError::HttpClientBuild(m) => Self::NetworkFault(m),
            ApiError::Parse(m) => Self::MalformedResponse(m),
            ApiError::Rejected { status, .. } => Self::RequestFailed { status, message: "request failed".to_owned() },
        }
    }
}

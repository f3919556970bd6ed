//! Backend auth API boundary.
//!
//! DESIGN
//! ======
//! `AuthApi` is the seam between the session manager and the REST backend.
//! The production implementation is [`http::HttpAuthApi`]; tests substitute
//! scripted mocks. Every call reports either a transport fault
//! (`ApiError::Network`) or an application-level rejection carrying whatever
//! `message`/`errors` the backend sent.

pub mod http;

use crate::models::{TokenPair, UserProfile};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("request rejected with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
        errors: Option<serde_json::Value>,
    },

    /// A success response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

/// Payload of a successful `/auth/login`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct LoginGrant {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Credential-issuing backend operations.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange an email/password pair for a user and token pair.
    ///
    /// # Errors
    ///
    /// `Network` on transport failure, `Rejected` on a non-success status,
    /// `Parse` on a malformed success body.
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, ApiError>;

    /// Mint a new access token from `refresh_token`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`AuthApi::login`].
    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError>;

    /// Submit a registration form. The payload is passed through untouched.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`AuthApi::login`].
    async fn register(&self, payload: &serde_json::Value) -> Result<(), ApiError>;
}

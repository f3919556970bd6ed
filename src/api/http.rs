//! `reqwest` implementation of [`AuthApi`].
//!
//! Thin HTTP wrapper for `/auth/login`, `/auth/refresh` and `/auth/register`.
//! Body parsing lives in pure functions for testability.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use std::time::Duration;

use super::{ApiError, AuthApi, LoginGrant};
use crate::config::RequestTimeouts;

const LOGIN_PATH: &str = "/auth/login";
const REFRESH_PATH: &str = "/auth/refresh";
const REGISTER_PATH: &str = "/auth/register";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Build a client rooted at `base_url` (e.g. `http://localhost:5000/api`).
    ///
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the TLS backend cannot be initialized.
    pub fn new(base_url: &str, timeouts: RequestTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` (relative to the base URL) with a bearer access token and
    /// return the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Same taxonomy as the [`AuthApi`] calls; a 401 surfaces as `Rejected`
    /// so callers can refresh and retry.
    pub async fn get_json(&self, path: &str, access_token: &str) -> Result<serde_json::Value, ApiError> {
        let request = self.http.get(self.url(path)).bearer_auth(access_token);
        let text = self.execute(request).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// Send `request` and return the body of a 2xx response.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(parse_rejection(status.as_u16(), &text));
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, ApiError> {
        let body = LoginRequest { email, password };
        let request = self.http.post(self.url(LOGIN_PATH)).json(&body);
        let text = self.execute(request).await?;
        parse_login(&text)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let request = self
            .http
            .post(self.url(REFRESH_PATH))
            .bearer_auth(refresh_token);
        let text = self.execute(request).await?;
        parse_refresh(&text)
    }

    async fn register(&self, payload: &serde_json::Value) -> Result<(), ApiError> {
        let request = self.http.post(self.url(REGISTER_PATH)).json(payload);
        self.execute(request).await?;
        Ok(())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(serde::Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshData {
    access_token: String,
}

#[derive(Default, serde::Deserialize)]
struct ErrorBody {
    message: Option<String>,
    errors: Option<serde_json::Value>,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_login(json: &str) -> Result<LoginGrant, ApiError> {
    let envelope: Envelope<LoginGrant> = serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(envelope.data)
}

fn parse_refresh(json: &str) -> Result<String, ApiError> {
    let envelope: Envelope<RefreshData> = serde_json::from_str(json).map_err(|e| ApiError::Parse(e.to_string()))?;
    Ok(envelope.data.access_token)
}

/// Build a `Rejected` error from a non-success body. Bodies that are not JSON
/// (proxy error pages, empty bodies) yield no message.
fn parse_rejection(status: u16, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.filter(|m| !m.trim().is_empty());
    let errors = parsed.errors.filter(|e| !e.is_null());
    ApiError::Rejected { status, message, errors }
}

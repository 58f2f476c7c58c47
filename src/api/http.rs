//! reqwest-backed session store client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};

use crate::config::IntakeConfig;
use crate::error::ApiError;
use crate::session::model::{ProfilePatch, SessionEntity};

use super::SessionApi;

/// Cookie the session store uses to identify an anonymous patient.
pub const SESSION_COOKIE_NAME: &str = "anonymous_session";

/// Path of the anonymous session resource, relative to the API base URL.
const SESSION_PATH: &str = "anonymous-session";

/// HTTP client for `GET`/`PATCH /anonymous-session`.
pub struct HttpSessionApi {
    base_url: String,
    session_cookie: Option<SecretString>,
    client: reqwest::Client,
}

impl HttpSessionApi {
    pub fn new(
        base_url: impl Into<String>,
        session_cookie: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into(),
            session_cookie,
            client,
        })
    }

    pub fn from_config(config: &IntakeConfig) -> Result<Self, ApiError> {
        Self::new(
            config.api_url.clone(),
            config.session_cookie.clone(),
            config.http_timeout,
        )
    }

    fn url(&self) -> String {
        format!("{}/{SESSION_PATH}", self.base_url.trim_end_matches('/'))
    }

    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, self.url())
            .header(ACCEPT, "application/json");
        if let Some(cookie) = &self.session_cookie {
            request = request.header(
                COOKIE,
                format!("{SESSION_COOKIE_NAME}={}", cookie.expose_secret()),
            );
        }
        request
    }
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn current(&self) -> Result<SessionEntity, ApiError> {
        let resp = self
            .request(Method::GET)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }

        resp.json::<SessionEntity>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn patch(&self, patch: &ProfilePatch) -> Result<SessionEntity, ApiError> {
        let fields = patch.fields();
        tracing::debug!(?fields, "Patching anonymous session");

        let resp = self
            .request(Method::PATCH)
            .json(patch)
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let err = error_from_response(resp).await;
            tracing::warn!(error = %err, ?fields, "Session patch rejected");
            return Err(err);
        }

        resp.json::<SessionEntity>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

/// Turn a non-success response into `ApiError::Status`, preferring the
/// store's `{ "detail": ... }` message.
async fn error_from_response(resp: reqwest::Response) -> ApiError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    ApiError::Status {
        status: status.as_u16(),
        detail: parse_detail(&body).unwrap_or_else(|| format!("Error: {}", status.as_u16())),
    }
}

fn parse_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

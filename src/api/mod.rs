//! Session store API: the remote home of the anonymous patient profile.

pub mod http;

pub use http::HttpSessionApi;

use async_trait::async_trait;

use crate::error::ApiError;
use crate::session::model::{ProfilePatch, SessionEntity};

/// Remote session store.
///
/// Both calls carry the session credential implicitly; callers never
/// handle it.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Fetch the current entity. `ApiError::NotFound` if no session exists.
    async fn current(&self) -> Result<SessionEntity, ApiError>;

    /// Send a partial update and return the full updated entity.
    async fn patch(&self, patch: &ProfilePatch) -> Result<SessionEntity, ApiError>;
}

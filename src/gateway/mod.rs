//! Server boundary consumed by the catalog core.
//!
//! [`CatalogGateway`] is the only way the core reaches the backend. Two
//! implementations ship: [`http::HttpGateway`] talks to the real server and
//! [`local::LocalGateway`] resolves everything in-process for static mode.

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::query::{SearchHit, SearchQuery};

/// HTTP gateway.
pub mod http;
/// Zero-latency static-mode gateway.
pub mod local;

/// Why a backend call did not produce a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),
    /// Non-2xx status, or a 2xx body with `success: false`.
    #[error("server rejected the request (status {status:?})")]
    Rejected {
        /// HTTP status, when one was received.
        status: Option<u16>,
    },
    /// Response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
    /// No answer within the configured bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// Endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    /// Local persisted storage failed (static mode).
    #[error("local storage error: {0}")]
    Storage(String),
}

/// Result alias for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Signed-in user as reported by `GET /api/user`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    /// Whether a session exists.
    pub authenticated: bool,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Administrator flag.
    #[serde(default)]
    pub is_admin: bool,
    /// Librarian flag.
    #[serde(default)]
    pub is_librarian: bool,
}

/// Role badge derived from [`UserStatus`] flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full administrator.
    Admin,
    /// Staff allowed to edit the catalog.
    Librarian,
    /// Any other signed-in user.
    Student,
}

impl UserStatus {
    /// Role of a signed-in user; admin wins over librarian.
    pub fn role(&self) -> Option<Role> {
        if !self.authenticated {
            return None;
        }
        Some(if self.is_admin {
            Role::Admin
        } else if self.is_librarian {
            Role::Librarian
        } else {
            Role::Student
        })
    }

    /// True when catalog-editing controls should be shown.
    pub fn can_manage_catalog(&self) -> bool {
        matches!(self.role(), Some(Role::Admin | Role::Librarian))
    }
}

/// Backend operations the catalog core depends on.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    /// `GET /search?query=..&section=..`.
    async fn search(&self, query: &SearchQuery) -> GatewayResult<Vec<SearchHit>>;

    /// `POST /books/{id}/toggle-availability` with `{available}`.
    async fn set_availability(&self, id: &str, available: bool) -> GatewayResult<()>;

    /// Server-side delete of one book.
    async fn delete_book(&self, id: &str) -> GatewayResult<()>;

    /// `GET /api/user`.
    async fn current_user(&self) -> GatewayResult<UserStatus>;
}

/// Runs `fut` under `limit`; expiry becomes [`GatewayError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| GatewayError::Timeout(limit))?
}

//! TOML-backed configuration.
//!
//! Every key is optional:
//!
//! ```toml
//! debounce_ms = 300
//! request_timeout_ms = 10000
//!
//! [backend]
//! kind = "http"
//! base_url = "http://localhost:5000"
//! csrf_token = "..."
//! ```

use std::{path::Path, path::PathBuf, sync::Arc, time::Duration};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    gateway::{
        CatalogGateway, GatewayError,
        http::HttpGateway,
        local::{LocalGateway, sample_shelf},
    },
    persist::{LocalStore, PersistError, sqlite::SqliteLocalStore},
    runtime::handle::RuntimeConfig,
    search::{debounce::DEFAULT_QUIET, query::MIN_QUERY_LEN},
};

/// Problems loading configuration or building what it describes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid TOML for [`CatalogConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Local storage could not be opened.
    #[error(transparent)]
    Storage(#[from] PersistError),
    /// HTTP gateway could not be built.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Where catalog requests go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backend {
    /// Live server.
    Http {
        /// Server root, e.g. `http://localhost:5000`.
        base_url: String,
        /// Token sent as `X-CSRFToken` on non-GET requests.
        #[serde(default)]
        csrf_token: Option<String>,
    },
    /// No server: sample data and local auth storage.
    Local {
        /// SQLite file for auth state; in-memory when absent.
        #[serde(default)]
        storage_path: Option<PathBuf>,
    },
}

impl Default for Backend {
    fn default() -> Self {
        Self::Local { storage_path: None }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Debouncer quiet period in milliseconds.
    pub debounce_ms: u64,
    /// Minimum trimmed query length before searching.
    pub min_query_len: usize,
    /// Bound on every backend request in milliseconds.
    pub request_timeout_ms: u64,
    /// Runtime command channel capacity.
    pub command_queue: usize,
    /// Change-notification broadcast capacity.
    pub event_queue: usize,
    /// Default tracing filter; `RUST_LOG` overrides it.
    pub log_filter: String,
    /// Backend selection.
    pub backend: Backend,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        Self {
            debounce_ms: DEFAULT_QUIET.as_millis() as u64,
            min_query_len: MIN_QUERY_LEN,
            request_timeout_ms: runtime.request_timeout_ms,
            command_queue: runtime.command_queue,
            event_queue: runtime.event_queue,
            log_filter: "info".to_string(),
            backend: Backend::default(),
        }
    }
}

impl CatalogConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig {
            request_timeout_ms: self.request_timeout_ms,
            command_queue: self.command_queue,
            event_queue: self.event_queue,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Builds the gateway the backend section describes.
    pub fn gateway(&self) -> Result<Arc<dyn CatalogGateway>, ConfigError> {
        Ok(match &self.backend {
            Backend::Http {
                base_url,
                csrf_token,
            } => Arc::new(HttpGateway::new(base_url, csrf_token.clone())?),
            Backend::Local { storage_path } => {
                let storage: Box<dyn LocalStore> = match storage_path {
                    Some(path) => Box::new(SqliteLocalStore::open(path)?),
                    None => Box::new(SqliteLocalStore::open_in_memory()?),
                };
                Arc::new(LocalGateway::new(sample_shelf(), storage))
            }
        })
    }
}

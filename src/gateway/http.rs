//! `reqwest`-backed gateway speaking the backend's JSON routes.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::search::query::{SearchHit, SearchQuery};

use super::{CatalogGateway, GatewayError, GatewayResult, UserStatus};

const CSRF_HEADER: &str = "X-CSRFToken";

#[derive(Debug, Serialize)]
struct ToggleRequest {
    available: bool,
}

#[derive(Debug, Deserialize)]
struct ToggleResponse {
    success: bool,
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Malformed(value.to_string())
        } else {
            Self::Network(value.to_string())
        }
    }
}

/// Gateway for a live backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
    csrf_token: Option<String>,
}

impl HttpGateway {
    /// Builds a gateway rooted at `base_url`.
    ///
    /// The client keeps cookies so the session survives between calls.
    pub fn new(base_url: &str, csrf_token: Option<String>) -> GatewayResult<Self> {
        let base = Url::parse(base_url).map_err(|e| GatewayError::Endpoint(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::Endpoint(format!("{base_url} cannot be a base")));
        }
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self {
            client,
            base,
            csrf_token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> GatewayResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Endpoint(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn with_csrf(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.csrf_token {
            Some(token) => req.header(CSRF_HEADER, token),
            None => req,
        }
    }
}

fn ensure_success(resp: Response) -> GatewayResult<Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(GatewayError::Rejected {
            status: Some(status.as_u16()),
        })
    }
}

#[async_trait]
impl CatalogGateway for HttpGateway {
    async fn search(&self, query: &SearchQuery) -> GatewayResult<Vec<SearchHit>> {
        let url = self.endpoint(&["search"])?;
        let section = query.section_id().unwrap_or_default();
        debug!(%url, text = query.trimmed(), section, "search request");

        let resp = self
            .client
            .get(url)
            .query(&[("query", query.trimmed()), ("section", section)])
            .send()
            .await?;
        Ok(ensure_success(resp)?.json::<Vec<SearchHit>>().await?)
    }

    async fn set_availability(&self, id: &str, available: bool) -> GatewayResult<()> {
        let url = self.endpoint(&["books", id, "toggle-availability"])?;
        debug!(%url, available, "toggle request");

        let req = self.client.post(url).json(&ToggleRequest { available });
        let resp = ensure_success(self.with_csrf(req).send().await?)?;
        let status = resp.status().as_u16();
        let body = resp.json::<ToggleResponse>().await?;
        if body.success {
            Ok(())
        } else {
            Err(GatewayError::Rejected {
                status: Some(status),
            })
        }
    }

    async fn delete_book(&self, id: &str) -> GatewayResult<()> {
        let url = self.endpoint(&["books", id, "delete"])?;
        debug!(%url, "delete request");

        let req = self.client.post(url);
        ensure_success(self.with_csrf(req).send().await?)?;
        Ok(())
    }

    async fn current_user(&self) -> GatewayResult<UserStatus> {
        let url = self.endpoint(&["api", "user"])?;
        let resp = self.client.get(url).send().await?;
        Ok(ensure_success(resp)?.json::<UserStatus>().await?)
    }
}

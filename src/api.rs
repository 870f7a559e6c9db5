//! Fetch helper for the photo API.
//!
//! A page request goes to the listing endpoint when no search term is set and
//! to the search endpoint otherwise. Both response shapes are normalized into
//! a flat `Vec<PhotoRecord>`. Each call is exactly one HTTP attempt: no retry,
//! no backoff, no timeout.

use std::future::Future;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::{AccessKey, Configuration};
use crate::error::FetchError;
use crate::photo::PhotoRecord;

const LISTING_PATH: &str = "/photos";
const SEARCH_PATH: &str = "/search/photos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
    pub query: Option<String>,
}

impl PageRequest {
    pub fn listing(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            query: None,
        }
    }

    pub fn search(query: impl Into<String>, page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            query: Some(query.into()),
        }
    }
}

/// Anything that can produce one page of photos.
pub trait PhotoSource: Send + Sync + 'static {
    fn fetch_page(
        &self,
        request: PageRequest,
    ) -> impl Future<Output = Result<Vec<PhotoRecord>, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    results: Vec<PhotoRecord>,
}

/// Decode a listing response body: the body is the sequence itself.
pub fn decode_listing(body: &[u8]) -> Result<Vec<PhotoRecord>, FetchError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decode a search response body: the sequence lives under `results`.
pub fn decode_search(body: &[u8]) -> Result<Vec<PhotoRecord>, FetchError> {
    let envelope: SearchEnvelope = serde_json::from_slice(body)?;
    Ok(envelope.results)
}

#[derive(Debug, Clone)]
pub struct UnsplashClient {
    http: reqwest::Client,
    base_url: String,
    access_key: AccessKey,
}

impl UnsplashClient {
    pub fn new(base_url: impl Into<String>, access_key: AccessKey) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            access_key,
        })
    }

    pub fn from_config(cfg: &Configuration) -> Result<Self, FetchError> {
        Self::new(cfg.api_base_url.clone(), cfg.access_key.clone())
    }

    /// Endpoint URL (without query string) for `request`.
    pub fn endpoint(&self, request: &PageRequest) -> String {
        let path = if request.query.is_some() {
            SEARCH_PATH
        } else {
            LISTING_PATH
        };
        format!("{}{}", self.base_url, path)
    }

    /// Query parameters for `request`, in the order the API documents them.
    pub fn query_params(&self, request: &PageRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![("client_id", self.access_key.expose().to_string())];
        if let Some(query) = &request.query {
            params.push(("query", query.clone()));
        }
        params.push(("page", request.page.to_string()));
        params.push(("per_page", request.per_page.to_string()));
        params
    }
}

impl PhotoSource for UnsplashClient {
    #[instrument(skip(self, request), fields(page = request.page, query = ?request.query))]
    async fn fetch_page(&self, request: PageRequest) -> Result<Vec<PhotoRecord>, FetchError> {
        let url = self.endpoint(&request);
        let response = self
            .http
            .get(&url)
            .query(&self.query_params(&request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.bytes().await?;
        let photos = match request.query {
            Some(_) => decode_search(&body)?,
            None => decode_listing(&body)?,
        };
        debug!(count = photos.len(), "page fetched");
        Ok(photos)
    }
}

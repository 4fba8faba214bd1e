use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::{Credentials, http_client},
    error::Result,
};

pub const DEFAULT_RISK_KEYWORDS: [&str; 3] = ["bankruptcy", "lawsuit", "fraud"];

/// Quoted company name followed by the keywords OR-ed together.
pub fn build_query<S: AsRef<str>>(company_name: &str, keywords: &[S]) -> String {
    let keywords_query = keywords
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("\"{company_name}\" ({keywords_query})")
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsSource {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsResult {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub source: Option<NewsSource>,
}

impl NewsResult {
    pub fn source_name(&self) -> &str {
        self.source
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("Unknown source")
    }
}

/// Body of a successful search. A missing `news_results` key means "no results".
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct NewsPayload {
    #[serde(default)]
    pub news_results: Option<Vec<NewsResult>>,
}

#[async_trait]
pub trait NewsSearch: Send + Sync {
    /// `Ok(None)` when the search API answers with anything but 200.
    async fn search(&self, query: &str) -> Result<Option<NewsPayload>>;
}

/// Google News through SerpApi, fixed to US / English.
#[derive(Clone)]
pub struct SerpApi {
    client: reqwest::Client,
    credentials: Credentials,
}

impl SerpApi {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            credentials,
        })
    }
}

#[async_trait]
impl NewsSearch for SerpApi {
    async fn search(&self, query: &str) -> Result<Option<NewsPayload>> {
        info!(query, "searching news");
        let response = self
            .client
            .get(format!("{}/search.json", self.credentials.base_url))
            .query(&[
                ("engine", "google_news"),
                ("q", query),
                ("gl", "us"),
                ("hl", "en"),
                ("api_key", self.credentials.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode_search_response(status, &body)
    }
}

/// Maps a raw search response onto the `Option` contract of [`NewsSearch`].
pub fn decode_search_response(status: StatusCode, body: &str) -> Result<Option<NewsPayload>> {
    if status != StatusCode::OK {
        warn!(%status, "news search returned non-success status");
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(body)?))
}

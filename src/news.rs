//! The news module talks to the NewsAPI source catalog and article search endpoints.

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::constants::{
    HTTP_TIMEOUT_SECS, NEWS_API_BASE_URL, NEWS_API_KEY_HEADER, NEWS_LANGUAGE, NEWS_PAGE_SIZE,
    NEWS_SORT_BY, SEARCH_KEY_ENV_NAME, UNTITLED,
};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::models::{Article, DateRange, NewsSource};
use crate::retry::{Attempt, RetryPolicy, retry};

const STATUS_OK: &str = "ok";

/// Response envelope shared by every NewsAPI endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    sources: Vec<SourceRecord>,
    #[serde(default)]
    articles: Vec<ArticleRecord>,
}

#[derive(Debug, Deserialize)]
struct SourceRecord {
    id: Option<String>,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct SourceRef {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    url_to_image: Option<String>,
    #[serde(default)]
    source: SourceRef,
    #[serde(default)]
    published_at: Option<String>,
}

impl From<ArticleRecord> for Article {
    fn from(record: ArticleRecord) -> Self {
        Self {
            title: record.title.unwrap_or_else(|| UNTITLED.to_owned()),
            raw_content: record.content.filter(|content| !content.is_empty()),
            url: record.url.unwrap_or_default(),
            image_url: record.url_to_image.filter(|url| !url.is_empty()),
            source_name: record.source.name.unwrap_or_default(),
            published_at: record
                .published_at
                .as_deref()
                .and_then(|stamp| DateTime::parse_from_rfc3339(stamp).ok())
                .map(|stamp| stamp.with_timezone(&Utc)),
        }
    }
}

impl Envelope {
    fn into_ok(self) -> std::result::Result<Self, String> {
        if self.status == STATUS_OK {
            return Ok(self);
        }
        Err(match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("service reported {code}: {message}"),
            (None, Some(message)) => format!("service reported: {message}"),
            (Some(code), None) => format!("service reported {code}"),
            (None, None) => format!("service status {}", self.status),
        })
    }
}

/// Client for the news search service.
///
/// Construction never needs the API key; each request checks for it first and
/// fails with [`Error::MissingCredential`] before touching the network.
#[derive(Debug, Clone)]
pub struct NewsClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl NewsClient {
    /// Creates a client for the public NewsAPI endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Configuration(format!("HTTP client: {e}")))?;
        let base_url = Url::parse(NEWS_API_BASE_URL)
            .map_err(|e| Error::Configuration(format!("news API URL: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key: credentials.search_key().ok().map(str::to_owned),
            retry: RetryPolicy::default(),
        })
    }

    /// Points the client at another deployment of the API, e.g. a proxy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `base_url` is not a valid URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("news API URL {base_url}: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        self.base_url = base_url;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetches the catalog of available news sources.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] without sending a request when the search key
    /// is absent, and [`Error::SourceListUnavailable`] when the request fails or the
    /// service reports a non-`ok` status.
    pub async fn list_sources(&self) -> Result<Vec<NewsSource>> {
        let api_key = self.api_key()?;
        let envelope = self
            .get(api_key, "sources", &[])
            .await
            .map_err(Error::SourceListUnavailable)?;

        let sources: Vec<NewsSource> = envelope
            .sources
            .into_iter()
            .filter_map(|record| {
                let identifier = record.id.filter(|id| !id.is_empty())?;
                Some(NewsSource::new(record.name, identifier))
            })
            .collect();

        info!("Fetched {} news sources", sources.len());
        Ok(sources)
    }

    /// Searches English articles from `source_identifier` published within `range`,
    /// most relevant first, at most 30.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] without sending a request when the search key
    /// is absent, and [`Error::FetchFailed`] when the request fails or the service reports
    /// a non-`ok` status.
    pub async fn fetch(&self, source_identifier: &str, range: DateRange) -> Result<Vec<Article>> {
        let api_key = self.api_key()?;
        let query = [
            ("sources", source_identifier.to_owned()),
            ("from", range.start().to_string()),
            ("to", range.end().to_string()),
            ("language", NEWS_LANGUAGE.to_owned()),
            ("sortBy", NEWS_SORT_BY.to_owned()),
            ("pageSize", NEWS_PAGE_SIZE.to_string()),
        ];

        info!(
            "Searching articles from {source_identifier} between {} and {}",
            range.start(),
            range.end()
        );
        let envelope = self
            .get(api_key, "everything", &query)
            .await
            .map_err(Error::FetchFailed)?;

        let articles: Vec<Article> = envelope.articles.into_iter().map(Article::from).collect();
        info!("Found {} articles from {source_identifier}", articles.len());
        Ok(articles)
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or(Error::MissingCredential(SEARCH_KEY_ENV_NAME))
    }

    async fn get(
        &self,
        api_key: &str,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Envelope, String> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| format!("invalid endpoint {endpoint}: {e}"))?;

        retry(self.retry, endpoint, || {
            let request = self
                .http
                .get(url.clone())
                .header(NEWS_API_KEY_HEADER, api_key)
                .query(query);
            async move {
                let response = request.send().await.map_err(|e| {
                    classify(e.is_timeout() || e.is_connect() || e.is_request(), e.to_string())
                })?;
                let status = response.status();
                debug!("GET {endpoint} answered {status}");

                let body = response
                    .text()
                    .await
                    .map_err(|e| Attempt::Transient(format!("reading response: {e}")))?;
                match serde_json::from_str::<Envelope>(&body) {
                    Ok(envelope) => envelope.into_ok().map_err(|message| {
                        classify(is_transient_status(status), message)
                    }),
                    Err(e) => Err(classify(
                        is_transient_status(status),
                        format!("unexpected response (HTTP {status}): {e}"),
                    )),
                }
            }
        })
        .await
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn classify(transient: bool, message: String) -> Attempt<String> {
    if transient {
        Attempt::Transient(message)
    } else {
        Attempt::Fatal(message)
    }
}

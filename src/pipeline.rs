//! The pipeline module wires credentials, the news client, the normalizer and the
//! summarizer together. Every user action enters through [`AppState`].

use chrono::NaiveDate;
use log::{info, warn};

use crate::catalog::resolve;
use crate::constants::DEFAULT_SOURCE_ID;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::models::{Article, DateRange, NewsSource};
use crate::news::NewsClient;
use crate::normalize::{normalize, preview};
use crate::summarize::Summarizer;

/// Enum representing how the user picked a news source.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SourceSelection {
    /// A display name looked up in the catalog, with the default policy as fallback.
    Named(String),
    /// A source identifier used as is, without a catalog.
    Identifier(String),
}

impl Default for SourceSelection {
    fn default() -> Self {
        Self::Identifier(DEFAULT_SOURCE_ID.to_owned())
    }
}

/// One "fetch and summarize" request.
#[derive(Clone, Debug, Default)]
pub struct Query {
    pub source: SourceSelection,
    /// Picked dates; must be exactly two.
    pub dates: Vec<NaiveDate>,
    /// Summarize every article with content right away.
    pub summarize: bool,
}

/// Summary state of one article in a report.
#[derive(Debug)]
pub enum SummaryState {
    /// Not requested for this query.
    Skipped,
    Ready(String),
    Failed(Error),
}

/// What can be shown for an article body.
#[derive(Debug)]
pub enum ArticleBody {
    /// The provider sent no content; the article is never summarized.
    NoContent,
    Content {
        /// Display preview of the normalized text.
        preview: String,
        summary: SummaryState,
    },
}

/// One article with its display and summary state.
#[derive(Debug)]
pub struct ArticleReport {
    /// 1-based position in the service's relevance order.
    pub position: usize,
    pub article: Article,
    pub body: ArticleBody,
}

/// Result of a fetch action that was not aborted.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Nothing to show. `cause` is set when the search itself failed.
    NoArticles {
        source: String,
        cause: Option<Error>,
    },
    Found {
        source: String,
        articles: Vec<ArticleReport>,
    },
}

/// Application state shared by all user actions.
pub struct AppState {
    pub credentials: Credentials,
    pub news: NewsClient,
    pub summarizer: Summarizer,
    catalog: Vec<NewsSource>,
}

impl AppState {
    pub fn new(credentials: Credentials, news: NewsClient, summarizer: Summarizer) -> Self {
        Self {
            credentials,
            news,
            summarizer,
            catalog: Vec::new(),
        }
    }

    /// The catalog fetched by the last [`AppState::refresh_catalog`].
    pub fn catalog(&self) -> &[NewsSource] {
        &self.catalog
    }

    /// Replaces the catalog with a fresh copy from the news service.
    ///
    /// An unavailable catalog leaves it empty and is only logged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] when the search key is absent.
    pub async fn refresh_catalog(&mut self) -> Result<&[NewsSource]> {
        self.catalog = match self.news.list_sources().await {
            Ok(sources) => sources,
            Err(err @ Error::SourceListUnavailable(_)) => {
                warn!("{err}");
                Vec::new()
            }
            Err(err) => return Err(err),
        };
        Ok(&self.catalog)
    }

    /// Runs one fetch action: validate, resolve, fetch, normalize and optionally summarize.
    ///
    /// A failed or empty search yields [`SearchOutcome::NoArticles`]; a failed summary
    /// only marks its article.
    ///
    /// # Errors
    ///
    /// Aborts before any request with [`Error::InvalidDateRange`] or
    /// [`Error::MissingCredential`] (search key, or summarizer key when summaries are
    /// requested), and with [`Error::SourceListUnavailable`] when a
    /// source name cannot be resolved because the catalog is empty.
    pub async fn search(&mut self, query: &Query) -> Result<SearchOutcome> {
        let range = DateRange::from_endpoints(&query.dates)?;
        self.credentials.search_key()?;
        if query.summarize {
            self.summarizer.ensure_ready()?;
        }

        let (source_id, source_name) = self.select_source(&query.source).await?;

        let articles = match self.news.fetch(&source_id, range).await {
            Ok(articles) => articles,
            Err(err @ Error::FetchFailed(_)) => {
                warn!("{err}");
                return Ok(SearchOutcome::NoArticles {
                    source: source_name,
                    cause: Some(err),
                });
            }
            Err(err) => return Err(err),
        };

        if articles.is_empty() {
            warn!("No articles found for source: {source_name}");
            return Ok(SearchOutcome::NoArticles {
                source: source_name,
                cause: None,
            });
        }

        let mut reports = Vec::with_capacity(articles.len());
        for (index, article) in articles.into_iter().enumerate() {
            let body = self.article_body(&article, query.summarize).await;
            reports.push(ArticleReport {
                position: index + 1,
                article,
                body,
            });
        }

        info!("Prepared {} articles from {source_name}", reports.len());
        Ok(SearchOutcome::Found {
            source: source_name,
            articles: reports,
        })
    }

    /// Summarizes a single article from its normalized content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Summarization`] when the article has no content or the
    /// summarizer fails, and [`Error::MissingCredential`] when the backend needs a key.
    pub async fn summarize_article(&self, article: &Article) -> Result<String> {
        let content = normalize(article.raw_content.as_deref()).ok_or_else(|| {
            Error::Summarization(format!("\"{}\" has no content", article.title))
        })?;
        self.summarizer.summarize(&content).await
    }

    async fn select_source(&mut self, selection: &SourceSelection) -> Result<(String, String)> {
        match selection {
            SourceSelection::Identifier(identifier) => Ok((identifier.clone(), identifier.clone())),
            SourceSelection::Named(name) => {
                if self.catalog.is_empty() {
                    self.refresh_catalog().await?;
                }
                let source = resolve(name, &self.catalog).ok_or_else(|| {
                    Error::SourceListUnavailable(format!(
                        "no news sources to choose \"{name}\" from"
                    ))
                })?;
                Ok((source.identifier.clone(), source.display_name.clone()))
            }
        }
    }

    async fn article_body(&self, article: &Article, summarize: bool) -> ArticleBody {
        let Some(content) = normalize(article.raw_content.as_deref()) else {
            return ArticleBody::NoContent;
        };

        let summary = if summarize {
            match self.summarizer.summarize(&content).await {
                Ok(summary) => SummaryState::Ready(summary),
                Err(err) => {
                    warn!("Summary of \"{}\" failed: {err}", article.title);
                    SummaryState::Failed(err)
                }
            }
        } else {
            SummaryState::Skipped
        };

        ArticleBody::Content {
            preview: preview(&content),
            summary,
        }
    }
}

//! Error taxonomy shared by every stage of the pipeline.

use thiserror::Error;

/// Failures a pipeline stage can report.
///
/// Every variant carries enough context to be shown to the user as is;
/// [`Error::stage`] names the stage that produced it.
#[derive(Error, Debug)]
pub enum Error {
    /// A secret required by the requested operation is not configured.
    #[error("{0} is missing; add it to .env or the environment")]
    MissingCredential(&'static str),

    /// The caller supplied a date range with the wrong number of endpoints or with start after end.
    #[error("invalid date range: {0}")]
    InvalidDateRange(String),

    /// The news source catalog could not be retrieved.
    #[error("failed to retrieve news sources: {0}")]
    SourceListUnavailable(String),

    /// The article search request failed or was rejected by the service.
    #[error("failed to fetch articles: {0}")]
    FetchFailed(String),

    /// The summarization input was empty or the model call failed.
    #[error("failed to generate summary: {0}")]
    Summarization(String),

    /// Local configuration (URLs, backends, HTTP client) is unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Human-facing name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "credentials",
            Self::InvalidDateRange(_) => "date range",
            Self::SourceListUnavailable(_) => "news sources",
            Self::FetchFailed(_) => "article search",
            Self::Summarization(_) => "summarization",
            Self::Configuration(_) => "configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

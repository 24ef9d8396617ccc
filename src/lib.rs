//! The newsbrief library fetches news articles from the NewsAPI search service and
//! summarizes them with a locally served model or a hosted chat model.

pub mod catalog;
pub mod compose;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod models;
pub mod news;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod summarize;

pub use catalog::{default_source, resolve};
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use models::{Article, DateRange, NewsSource};
pub use news::NewsClient;
pub use normalize::{normalize, preview};
pub use pipeline::{AppState, Query, SearchOutcome, SourceSelection};
pub use summarize::{Summarizer, SummarizerConfig, SummarizerKind};

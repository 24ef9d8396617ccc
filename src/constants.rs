pub const SUMMARIZER_KEY_ENV_NAME: &str = "OPENAI_API_KEY";
pub const SEARCH_KEY_ENV_NAME: &str = "NEWS_API_KEY";

pub const NEWS_API_BASE_URL: &str = "https://newsapi.org/v2/";
pub const NEWS_API_KEY_HEADER: &str = "X-Api-Key";
pub const NEWS_LANGUAGE: &str = "en";
pub const NEWS_SORT_BY: &str = "relevancy";
/// Keeps a single query within the free tier volume limits.
pub const NEWS_PAGE_SIZE: u32 = 30;

pub const DEFAULT_SOURCE_ID: &str = "bbc-news";
pub const PREFERRED_SOURCE_NAME: &str = "BBC News";
pub const DEFAULT_RANGE_DAYS: i64 = 7;

pub const UNTITLED: &str = "Untitled";
pub const TRUNCATION_MARKER: &str = " [";
pub const PREVIEW_CHARS: usize = 1000;
pub const PREVIEW_ELLIPSIS: &str = "...";

pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";
pub const LOCAL_MAX_TOKENS: u32 = 130;
pub const LOCAL_MIN_TOKENS: u32 = 30;

pub const DEFAULT_REMOTE_MODEL: &str = "gpt-3.5-turbo";
pub const REMOTE_TEMPERATURE: f32 = 0.5;

pub const HTTP_TIMEOUT_SECS: u64 = 30;
pub const MODEL_TIMEOUT_SECS: u64 = 60;

pub(crate) const THINK_STRIPPER: &str = r"<think>[\s\S]*</think>\s*";

/// Matches an HTTP status as reqwest prints it, e.g. `404 Not Found`.
pub(crate) const HTTP_STATUS_PATTERN: &str = r"\b([1-5]\d\d) [A-Z]";

pub(crate) const REMOTE_PROMPT_TEMPLATE: &str =
    "Summarize this news article in 3 sentences:\n\n{text}";

pub(crate) const LOCAL_PROMPT_TEMPLATE: &str = r#"
Summarize the following news article for a digest.
Use between {min_tokens} and {max_tokens} tokens.
Your answer should contain only the summary.
Article:

{text}"#;

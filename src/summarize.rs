//! The summarize module turns normalized article text into a short summary,
//! either with a locally served model or with a hosted chat model.

use std::time::Duration;

use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, ChatProvider};
use llm::error::LLMError;
use log::{debug, info};
use once_cell::sync::{Lazy, OnceCell};
use rate_guard::{RateLimit, StdTokenBucket, TokenBucketBuilder};
use regex::Regex;

use crate::constants::{
    DEFAULT_LOCAL_MODEL, DEFAULT_REMOTE_MODEL, HTTP_STATUS_PATTERN, LOCAL_MAX_TOKENS,
    LOCAL_MIN_TOKENS, LOCAL_PROMPT_TEMPLATE, MODEL_TIMEOUT_SECS, REMOTE_PROMPT_TEMPLATE,
    REMOTE_TEMPERATURE, SUMMARIZER_KEY_ENV_NAME, THINK_STRIPPER,
};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::retry::{Attempt, RetryPolicy, retry};

static THINK_STRIPPER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(THINK_STRIPPER).expect("Failed to compile THINK_STRIPPER regex"));

static HTTP_STATUS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(HTTP_STATUS_PATTERN).expect("Failed to compile HTTP_STATUS_PATTERN regex")
});

/// Enum representing the summarization backend.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum SummarizerKind {
    /// A model served on this machine through Ollama
    Local,
    /// The hosted OpenAI chat API
    #[default]
    Remote,
}

impl std::str::FromStr for SummarizerKind {
    type Err = String;

    fn from_str(input: &str) -> std::result::Result<Self, Self::Err> {
        match input.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            _ => Err(format!("Invalid summarizer: {input}")),
        }
    }
}

/// Settings used to build a [`Summarizer`].
#[derive(Clone, Debug)]
pub struct SummarizerConfig {
    pub kind: SummarizerKind,
    /// Model name; each backend has its own default.
    pub model: Option<String>,
    /// Endpoint of the model service, e.g. `http://localhost:11434` for Ollama.
    pub base_url: Option<String>,
    /// Requests per minute; unlimited when absent.
    pub rpm: Option<u32>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            kind: SummarizerKind::default(),
            model: None,
            base_url: None,
            rpm: None,
            timeout: Duration::from_secs(MODEL_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

type ModelLoader = Box<dyn Fn() -> Result<Box<dyn ChatProvider>> + Send + Sync>;

/// A model built on first use and reused for every later call.
struct ModelHandle {
    model: OnceCell<Box<dyn ChatProvider>>,
    loader: ModelLoader,
}

impl ModelHandle {
    fn new(loader: ModelLoader) -> Self {
        Self {
            model: OnceCell::new(),
            loader,
        }
    }

    fn get(&self) -> Result<&dyn ChatProvider> {
        let model = self.model.get_or_try_init(|| {
            debug!("Loading summarization model");
            (self.loader)()
        })?;
        Ok(model.as_ref())
    }
}

/// Throttling and retry applied to every model call.
pub struct CallPolicy {
    rate_limiter: Option<StdTokenBucket>,
    retry: RetryPolicy,
}

impl CallPolicy {
    pub fn new(rpm: Option<u32>, retry: RetryPolicy) -> Self {
        let rate_limiter: Option<StdTokenBucket> = rpm.and_then(|rpm| {
            let capacity = u64::from(rpm.max(1));
            let refill_interval = Duration::from_secs_f64(60.0 / capacity as f64);

            TokenBucketBuilder::builder()
                .capacity(capacity)
                .refill_amount(1_u64)
                .refill_every(refill_interval)
                .with_time(rate_guard::StdTimeSource::new())
                .with_precision::<rate_guard::Nanos>()
                .build()
                .ok()
        });

        Self { rate_limiter, retry }
    }

    async fn acquire(&self) {
        if let Some(limiter) = &self.rate_limiter {
            while limiter.try_acquire(1).is_err() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

/// Summarizes with a locally served model, bounded to 130 tokens and sampled deterministically.
///
/// The 30-token minimum is only requested in the prompt; Ollama has no setting that
/// enforces it. Loading builds the HTTP client for the model service, so a missing
/// model shows up on the first summary.
pub struct LocalSummarizer {
    handle: ModelHandle,
    policy: CallPolicy,
}

impl LocalSummarizer {
    pub fn new(config: &SummarizerConfig) -> Self {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_owned());
        let base_url = config.base_url.clone();
        let timeout = config.timeout.as_secs();

        Self::with_loader(
            move || {
                info!("Loading local model {model}");
                let builder = LLMBuilder::new()
                    .backend(LLMBackend::Ollama)
                    .model(model.clone())
                    .max_tokens(LOCAL_MAX_TOKENS)
                    .temperature(0.0)
                    .timeout_seconds(timeout);
                let builder = match &base_url {
                    Some(url) => builder.base_url(url.clone()),
                    None => builder,
                };
                let provider: Box<dyn ChatProvider> = builder
                    .build()
                    .map_err(|e| Error::Configuration(format!("local model: {e}")))?;
                Ok(provider)
            },
            CallPolicy::new(config.rpm, config.retry),
        )
    }

    /// Builds a summarizer around an arbitrary model factory, invoked at most once.
    pub fn with_loader<F>(loader: F, policy: CallPolicy) -> Self
    where
        F: Fn() -> Result<Box<dyn ChatProvider>> + Send + Sync + 'static,
    {
        Self {
            handle: ModelHandle::new(Box::new(loader)),
            policy,
        }
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let model = self.handle.get()?;
        let prompt = LOCAL_PROMPT_TEMPLATE
            .replace("{min_tokens}", &LOCAL_MIN_TOKENS.to_string())
            .replace("{max_tokens}", &LOCAL_MAX_TOKENS.to_string())
            .replace("{text}", text);
        complete(model, prompt, &self.policy).await
    }
}

/// Summarizes in three sentences with the hosted chat model.
pub struct RemoteSummarizer {
    handle: ModelHandle,
    policy: CallPolicy,
}

impl RemoteSummarizer {
    /// The API key is only required when the first summary is requested.
    pub fn new(config: &SummarizerConfig, credentials: &Credentials) -> Self {
        let api_key = credentials.summarizer_key().ok().map(str::to_owned);
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_REMOTE_MODEL.to_owned());
        let base_url = config.base_url.clone();
        let timeout = config.timeout.as_secs();

        Self::with_loader(
            move || {
                let api_key = api_key
                    .clone()
                    .ok_or(Error::MissingCredential(SUMMARIZER_KEY_ENV_NAME))?;
                info!("Connecting to chat model {model}");
                let builder = LLMBuilder::new()
                    .backend(LLMBackend::OpenAI)
                    .api_key(api_key)
                    .model(model.clone())
                    .temperature(REMOTE_TEMPERATURE)
                    .timeout_seconds(timeout);
                let builder = match &base_url {
                    Some(url) => builder.base_url(url.clone()),
                    None => builder,
                };
                let provider: Box<dyn ChatProvider> = builder
                    .build()
                    .map_err(|e| Error::Configuration(format!("chat model: {e}")))?;
                Ok(provider)
            },
            CallPolicy::new(config.rpm, config.retry),
        )
    }

    /// Builds a summarizer around an arbitrary model factory, invoked at most once.
    pub fn with_loader<F>(loader: F, policy: CallPolicy) -> Self
    where
        F: Fn() -> Result<Box<dyn ChatProvider>> + Send + Sync + 'static,
    {
        Self {
            handle: ModelHandle::new(Box::new(loader)),
            policy,
        }
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let model = self.handle.get()?;
        let prompt = REMOTE_PROMPT_TEMPLATE.replace("{text}", text);
        complete(model, prompt, &self.policy).await
    }
}

/// Summarization capability with interchangeable backends.
pub enum Summarizer {
    Local(LocalSummarizer),
    RemoteChat(RemoteSummarizer),
}

impl Summarizer {
    /// Selects the backend named by `config.kind`. No model is contacted yet.
    pub fn from_config(config: &SummarizerConfig, credentials: &Credentials) -> Self {
        match config.kind {
            SummarizerKind::Local => Self::Local(LocalSummarizer::new(config)),
            SummarizerKind::Remote => Self::RemoteChat(RemoteSummarizer::new(config, credentials)),
        }
    }

    /// Builds the model handle now instead of on the first summary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] when the remote backend has no API key and
    /// [`Error::Configuration`] when the model cannot be built.
    pub fn ensure_ready(&self) -> Result<()> {
        let handle = match self {
            Self::Local(summarizer) => &summarizer.handle,
            Self::RemoteChat(summarizer) => &summarizer.handle,
        };
        handle.get().map(|_| ())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Local(_) => "local model",
            Self::RemoteChat(_) => "remote chat model",
        }
    }

    /// Summarizes normalized article text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Summarization`] without calling the model when `text` is blank,
    /// [`Error::MissingCredential`] when the remote backend has no API key, and
    /// [`Error::Summarization`] carrying the cause when the model call fails.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::Summarization(
                "nothing to summarize, the article text is empty".to_owned(),
            ));
        }

        debug!(
            "Summarizing {} characters with the {}",
            text.chars().count(),
            self.name()
        );
        match self {
            Self::Local(summarizer) => summarizer.summarize(text).await,
            Self::RemoteChat(summarizer) => summarizer.summarize(text).await,
        }
    }
}

/// Sends `prompt` as a single user message and cleans up the answer.
async fn complete(model: &dyn ChatProvider, prompt: String, policy: &CallPolicy) -> Result<String> {
    let messages = vec![ChatMessage::user().content(prompt).build()];
    let messages = &messages;

    let response = retry(policy.retry, "summarize", move || async move {
        policy.acquire().await;
        model.chat(messages).await.map_err(|err| {
            if is_transient(&err) {
                Attempt::Transient(err)
            } else {
                Attempt::Fatal(err)
            }
        })
    })
    .await
    .map_err(|err| Error::Summarization(format!("model call failed: {err}")))?;

    let text = response.text().unwrap_or_else(|| response.to_string());
    let summary = THINK_STRIPPER_REGEX
        .replace_all(&text, "")
        .trim()
        .to_owned();

    if summary.is_empty() {
        return Err(Error::Summarization(
            "the model returned an empty summary".to_owned(),
        ));
    }
    Ok(summary)
}

/// Ollama reports status failures as `HttpError`, the OpenAI backend as
/// `ResponseFormatError`. Transient: 429, 5xx, and an `HttpError` with no status.
fn is_transient(err: &LLMError) -> bool {
    match err {
        LLMError::HttpError(message) => http_status(message).is_none_or(is_transient_status),
        LLMError::ResponseFormatError { .. } => {
            http_status(&err.to_string()).is_some_and(is_transient_status)
        }
        _ => false,
    }
}

fn http_status(message: &str) -> Option<u16> {
    HTTP_STATUS_REGEX
        .captures(message)
        .and_then(|captures| captures.get(1))
        .and_then(|status| status.as_str().parse().ok())
}

fn is_transient_status(status: u16) -> bool {
    status == 429 || status >= 500
}

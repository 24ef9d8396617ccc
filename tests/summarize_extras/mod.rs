#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use llm::{
    chat::{ChatMessage, ChatProvider, ChatResponse, Tool},
    error::LLMError,
};
use newsbrief::Summarizer;
use newsbrief::retry::RetryPolicy;
use newsbrief::summarize::{CallPolicy, LocalSummarizer, RemoteSummarizer};

#[macro_export]
macro_rules! assert_responses {
    (
        $(
            $test_name:ident : response => $response:expr, result => $result:expr
        ),+ $(,)?
    ) => {
        $(
            #[tokio::test]
            async fn $test_name() {
                let stub = StubLlmProvider::new($response);
                let summarizer = local_summarizer(&stub);
                let result = summarizer
                    .summarize("Some article text.")
                    .await
                    .expect("Expected successful summary.");

                assert_that(&result).is_equal_to($result.to_owned());
            }
        )+
    }
}

/// Chat model double that answers with a fixed text after an optional number of HTTP failures.
#[derive(Clone)]
pub(crate) struct StubLlmProvider {
    response_content: String,
    failures_left: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    loads: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StubLlmProvider {
    pub fn new(response_content: &str) -> Self {
        StubLlmProvider {
            response_content: response_content.to_owned(),
            failures_left: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
            loads: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(response_content: &str, failures: usize) -> Self {
        let stub = Self::new(response_content);
        stub.failures_left.store(failures, Ordering::SeqCst);
        stub
    }

    /// Number of chat requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of times a summarizer built this model.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl ChatProvider for StubLlmProvider {
    fn chat<'life0, 'life1, 'async_trait>(
        &'life0 self,
        messages: &'life1 [ChatMessage],
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Box<dyn ChatResponse>, LLMError>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            #[derive(Debug)]
            struct StringResponse(String);

            impl ChatResponse for StringResponse {
                fn text(&self) -> Option<String> {
                    Some(self.0.clone())
                }

                fn tool_calls(&self) -> Option<Vec<llm::ToolCall>> {
                    panic!()
                }

                fn thinking(&self) -> Option<String> {
                    None
                }

                fn usage(&self) -> Option<llm::chat::Usage> {
                    None
                }
            }

            impl std::fmt::Display for StringResponse {
                fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(formatter, "{}", self.0)
                }
            }

            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts
                .lock()
                .expect("prompts lock")
                .extend(messages.iter().map(|message| message.content.clone()));

            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(LLMError::HttpError("connection reset".to_owned()));
            }

            Ok(Box::new(StringResponse(self.response_content.clone())) as Box<dyn ChatResponse>)
        })
    }

    fn chat_with_tools<'life0, 'life1, 'life2, 'async_trait>(
        &'life0 self,
        _messages: &'life1 [ChatMessage],
        _tools: Option<&'life2 [Tool]>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Box<dyn ChatResponse>, LLMError>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        'life2: 'async_trait,
        Self: 'async_trait,
    {
        panic!()
    }
}

pub(crate) fn instant_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
        max_jitter: Duration::ZERO,
    }
}

/// A local summarizer whose model is `stub`, counting how often it gets built.
pub(crate) fn local_summarizer(stub: &StubLlmProvider) -> Summarizer {
    local_summarizer_with_retry(stub, RetryPolicy::none())
}

pub(crate) fn local_summarizer_with_retry(stub: &StubLlmProvider, retry: RetryPolicy) -> Summarizer {
    let stub = stub.clone();
    Summarizer::Local(LocalSummarizer::with_loader(
        move || {
            stub.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(stub.clone()) as Box<dyn ChatProvider>)
        },
        CallPolicy::new(None, retry),
    ))
}

pub(crate) fn remote_summarizer(stub: &StubLlmProvider) -> Summarizer {
    let stub = stub.clone();
    Summarizer::RemoteChat(RemoteSummarizer::with_loader(
        move || {
            stub.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(stub.clone()) as Box<dyn ChatProvider>)
        },
        CallPolicy::new(None, RetryPolicy::none()),
    ))
}

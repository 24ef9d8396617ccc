mod summarize_extras;

use chrono::NaiveDate;
use newsbrief::pipeline::{ArticleBody, SummaryState};
use newsbrief::retry::RetryPolicy;
use newsbrief::{
    AppState, Credentials, Error, NewsClient, Query, SearchOutcome, SourceSelection, Summarizer,
    SummarizerConfig,
};
use serde_json::{Value, json};
use spectral::prelude::*;
use summarize_extras::{StubLlmProvider, local_summarizer};
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

fn state(server: &MockServer, credentials: Credentials, summarizer: Summarizer) -> AppState {
    let news = NewsClient::new(&credentials)
        .and_then(|client| client.with_base_url(&format!("{}/v2/", server.uri())))
        .expect("valid client")
        .with_retry(RetryPolicy::none());
    AppState::new(credentials, news, summarizer)
}

fn search_only() -> Credentials {
    Credentials::new(None, Some("search-key".to_owned()))
}

fn query(source: SourceSelection, summarize: bool) -> Query {
    Query {
        source,
        dates: vec![date(2024, 1, 1), date(2024, 1, 8)],
        summarize,
    }
}

fn articles_body(articles: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": "ok",
        "totalResults": 2,
        "articles": articles
    }))
}

fn bbc_articles() -> Value {
    json!([
        {
            "source": { "id": "bbc-news", "name": "BBC News" },
            "title": "Budget approved",
            "content": "Full text here. [+120 chars]",
            "url": "https://example.com/budget",
            "urlToImage": "https://example.com/budget.jpg",
            "publishedAt": "2024-01-03T09:15:00Z"
        },
        {
            "source": { "id": "bbc-news", "name": "BBC News" },
            "title": "Photo gallery",
            "content": null,
            "url": "https://example.com/gallery",
            "urlToImage": null,
            "publishedAt": "2024-01-02T18:00:00Z"
        }
    ])
}

async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v2/sources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "sources": [
                { "id": "wired", "name": "Wired" },
                { "id": "bbc-news", "name": "BBC News" }
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn articles_with_content_are_summarized_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("sources", "bbc-news"))
        .and(query_param("from", "2024-01-01"))
        .and(query_param("to", "2024-01-08"))
        .respond_with(articles_body(bbc_articles()))
        .expect(1)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("The budget passed.");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let outcome = state
        .search(&query(SourceSelection::default(), true))
        .await
        .expect("search runs");

    let SearchOutcome::Found { source, articles } = outcome else {
        panic!("expected articles");
    };
    assert_that(&source.as_str()).is_equal_to("bbc-news");
    assert_that(&articles).has_length(2);

    let first = articles.first().expect("first report");
    assert_that(&first.position).is_equal_to(1);
    match &first.body {
        ArticleBody::Content {
            preview,
            summary: SummaryState::Ready(summary),
        } => {
            assert_that(&preview.as_str()).is_equal_to("Full text here....");
            assert_that(&summary.as_str()).is_equal_to("The budget passed.");
        }
        other => panic!("unexpected body: {other:?}"),
    }

    let second = articles.get(1).expect("second report");
    assert_that(&second.position).is_equal_to(2);
    assert!(matches!(second.body, ArticleBody::NoContent));

    assert_that(&stub.calls()).is_equal_to(1);
    let prompts = stub.prompts();
    let prompt = prompts.first().expect("one prompt");
    assert_that(prompt).contains("Full text here.");
    assert!(!prompt.contains("[+120 chars]"));
}

#[tokio::test]
async fn summaries_can_be_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(articles_body(bbc_articles()))
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let outcome = state
        .search(&query(SourceSelection::default(), false))
        .await
        .expect("search runs");

    let SearchOutcome::Found { articles, .. } = outcome else {
        panic!("expected articles");
    };
    let first = articles.first().expect("first report");
    assert!(matches!(
        first.body,
        ArticleBody::Content {
            summary: SummaryState::Skipped,
            ..
        }
    ));
    assert_that(&stub.loads()).is_equal_to(0);
    assert_that(&stub.calls()).is_equal_to(0);
}

#[tokio::test]
async fn failed_summary_only_marks_its_article() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(articles_body(bbc_articles()))
        .mount(&server)
        .await;
    let stub = StubLlmProvider::failing("unused", 1);
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let outcome = state
        .search(&query(SourceSelection::default(), true))
        .await
        .expect("search runs");

    let SearchOutcome::Found { articles, .. } = outcome else {
        panic!("expected articles");
    };
    assert_that(&articles).has_length(2);
    assert!(matches!(
        articles.first().map(|report| &report.body),
        Some(ArticleBody::Content {
            summary: SummaryState::Failed(Error::Summarization(_)),
            ..
        })
    ));
}

#[tokio::test]
async fn invalid_date_ranges_send_no_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let picks = [
        vec![date(2024, 1, 8), date(2024, 1, 1)],
        vec![date(2024, 1, 1)],
        vec![date(2024, 1, 1), date(2024, 1, 4), date(2024, 1, 8)],
        vec![],
    ];
    for dates in picks {
        let query = Query {
            source: SourceSelection::default(),
            dates,
            summarize: true,
        };
        let result = state.search(&query).await;
        assert!(matches!(result, Err(Error::InvalidDateRange(_))));
    }
    assert_that(&stub.loads()).is_equal_to(0);
}

#[tokio::test]
async fn same_day_range_is_searched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("from", "2024-01-05"))
        .and(query_param("to", "2024-01-05"))
        .respond_with(articles_body(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let query = Query {
        source: SourceSelection::default(),
        dates: vec![date(2024, 1, 5), date(2024, 1, 5)],
        summarize: false,
    };

    assert!(state.search(&query).await.is_ok());
}

#[tokio::test]
async fn missing_search_key_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, Credentials::default(), local_summarizer(&stub));

    let result = state.search(&query(SourceSelection::default(), true)).await;

    assert!(matches!(result, Err(Error::MissingCredential("NEWS_API_KEY"))));
}

#[tokio::test]
async fn missing_summarizer_key_aborts_before_searching() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let credentials = search_only();
    let summarizer = Summarizer::from_config(&SummarizerConfig::default(), &credentials);
    let mut state = state(&server, credentials, summarizer);

    let result = state.search(&query(SourceSelection::default(), true)).await;

    assert!(matches!(result, Err(Error::MissingCredential("OPENAI_API_KEY"))));
}

#[tokio::test]
async fn empty_search_reports_no_articles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(articles_body(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let outcome = state
        .search(&query(SourceSelection::default(), true))
        .await
        .expect("search runs");

    match outcome {
        SearchOutcome::NoArticles { source, cause } => {
            assert_that(&source.as_str()).is_equal_to("bbc-news");
            assert!(cause.is_none());
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_that(&stub.calls()).is_equal_to(0);
}

#[tokio::test]
async fn failed_search_reports_no_articles_with_cause() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let outcome = state
        .search(&query(SourceSelection::default(), true))
        .await
        .expect("search failure is an outcome");

    match outcome {
        SearchOutcome::NoArticles { cause, .. } => {
            assert!(matches!(cause, Some(Error::FetchFailed(_))));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_that(&stub.calls()).is_equal_to(0);
}

#[tokio::test]
async fn named_source_is_resolved_through_the_catalog() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("sources", "wired"))
        .respond_with(articles_body(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));
    let named = query(SourceSelection::Named("Wired".to_owned()), false);

    let first = state.search(&named).await.expect("search runs");
    let second = state.search(&named).await.expect("catalog is reused");

    for outcome in [first, second] {
        match outcome {
            SearchOutcome::NoArticles { source, .. } => {
                assert_that(&source.as_str()).is_equal_to("Wired");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_that(&state.catalog().len()).is_equal_to(2);
}

#[tokio::test]
async fn unknown_name_falls_back_to_the_preferred_source() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("sources", "bbc-news"))
        .respond_with(articles_body(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let outcome = state
        .search(&query(SourceSelection::Named("Reuters".to_owned()), false))
        .await
        .expect("search runs");

    assert!(matches!(
        outcome,
        SearchOutcome::NoArticles { ref source, .. } if source == "BBC News"
    ));
}

#[tokio::test]
async fn named_source_without_catalog_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/sources"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(articles_body(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("unused");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let result = state
        .search(&query(SourceSelection::Named("Wired".to_owned()), false))
        .await;

    assert!(matches!(result, Err(Error::SourceListUnavailable(_))));
}

#[tokio::test]
async fn summarize_article_uses_normalized_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(articles_body(bbc_articles()))
        .mount(&server)
        .await;
    let stub = StubLlmProvider::new("The budget passed.");
    let mut state = state(&server, search_only(), local_summarizer(&stub));

    let SearchOutcome::Found { articles, .. } = state
        .search(&query(SourceSelection::default(), false))
        .await
        .expect("search runs")
    else {
        panic!("expected articles");
    };

    let with_content = &articles.first().expect("first report").article;
    let summary = state.summarize_article(with_content).await;
    assert_that(&summary.ok()).is_equal_to(Some("The budget passed.".to_owned()));

    let without_content = &articles.get(1).expect("second report").article;
    let result = state.summarize_article(without_content).await;
    assert!(matches!(result, Err(Error::Summarization(_))));
    assert_that(&stub.calls()).is_equal_to(1);
}

//! newsbrief is a CLI tool that fetches news articles from the NewsAPI search service
//! and summarizes them with a locally served model or a hosted chat model.
//!
//! The tool has three commands:
//! 1. `sources` - Lists the news sources known to the search service
//! 2. `fetch` - Fetches articles of one source and date range and writes a Markdown report
//! 3. `summarize` - Summarizes pasted text, a file or stdin

use std::fs;
use std::io::Read;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use env_logger::Builder;
use log::{LevelFilter, debug, warn};

use newsbrief::{
    AppState, Credentials, DateRange, NewsClient, Query, SourceSelection, Summarizer,
    SummarizerConfig, SummarizerKind,
    compose::{compose, render_outcome, render_sources},
    constants::{DEFAULT_RANGE_DAYS, NEWS_API_BASE_URL},
};

/// A CLI tool to fetch news articles and summarize them
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The command to execute (sources, fetch or summarize)
    #[command(subcommand)]
    command: Command,

    #[arg(long, short, action = clap::ArgAction::Count, help = "Output v(v...)erbosity: error (0), warn (1), info (2), debug (3), trace (4)", global = true, default_value_t = 2)]
    verbose: u8,

    /// Base URL of the news search API
    #[arg(long, global = true, default_value = NEWS_API_BASE_URL)]
    news_api_url: String,
}

#[derive(Args)]
struct SummarizerArgs {
    /// Summarization backend: "remote" (default) or "local"
    #[arg(long, short = 's', default_value = "remote")]
    summarizer: SummarizerKind,
    /// Model name (defaults: gpt-3.5-turbo for remote, llama3.2 for local)
    #[arg(long, short = 'm')]
    model: Option<String>,
    /// Endpoint of the model service, e.g. http://localhost:11434
    #[arg(long)]
    model_url: Option<String>,
    /// Rate limit: summaries per minute (default: no limit)
    #[arg(long, short = 'r')]
    rpm: Option<u32>,
}

impl SummarizerArgs {
    fn into_config(self) -> SummarizerConfig {
        SummarizerConfig {
            kind: self.summarizer,
            model: self.model,
            base_url: self.model_url,
            rpm: self.rpm,
            ..SummarizerConfig::default()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List the news sources available from the search service
    Sources,
    /// Fetch articles of a news source and summarize them
    Fetch {
        /// Display name of the source, resolved against the source list
        #[arg(long, conflicts_with = "source_id")]
        source: Option<String>,
        /// Source identifier used as is (default: bbc-news)
        #[arg(long)]
        source_id: Option<String>,
        /// Start and end date, e.g. 2024-01-01,2024-01-08 (default: the last 7 days)
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        dates: Option<Vec<NaiveDate>>,
        /// Only show article content, do not summarize
        #[arg(long)]
        no_summary: bool,
        /// Path to output file to compose the report to (default: stdout)
        #[arg(long, short)]
        output: Option<String>,
        #[command(flatten)]
        summarizer: SummarizerArgs,
    },
    /// Summarize the given text, a file or stdin
    Summarize {
        /// Text to summarize; read from stdin when neither text nor file is given
        text: Option<String>,
        /// Path to a file with the text to summarize
        #[arg(long, short, conflicts_with = "text")]
        file: Option<String>,
        #[command(flatten)]
        summarizer: SummarizerArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            3 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .init();

    if let Err(err) = dotenvy::dotenv() {
        debug!("{err} while loading .env");
    }
    let credentials = Credentials::load();

    match cli.command {
        Command::Sources => {
            let mut state = build_state(credentials, &cli.news_api_url, SummarizerConfig::default())?;
            handle_sources_command(&mut state).await
        }
        Command::Fetch {
            source,
            source_id,
            dates,
            no_summary,
            output,
            summarizer,
        } => {
            let mut state = build_state(credentials, &cli.news_api_url, summarizer.into_config())?;
            let query = Query {
                source: source_selection(source, source_id),
                dates: dates.unwrap_or_else(default_dates),
                summarize: !no_summary,
            };
            handle_fetch_command(&mut state, &query, output.as_deref()).await
        }
        Command::Summarize {
            text,
            file,
            summarizer,
        } => {
            let state = build_state(credentials, &cli.news_api_url, summarizer.into_config())?;
            handle_summarize_command(&state, text, file).await
        }
    }
}

fn build_state(
    credentials: Credentials,
    news_api_url: &str,
    summarizer_config: SummarizerConfig,
) -> Result<AppState> {
    let news = NewsClient::new(&credentials)?.with_base_url(news_api_url)?;
    let summarizer = Summarizer::from_config(&summarizer_config, &credentials);
    Ok(AppState::new(credentials, news, summarizer))
}

fn source_selection(source: Option<String>, source_id: Option<String>) -> SourceSelection {
    match (source, source_id) {
        (Some(name), _) => SourceSelection::Named(name),
        (None, Some(identifier)) => SourceSelection::Identifier(identifier),
        (None, None) => SourceSelection::default(),
    }
}

fn default_dates() -> Vec<NaiveDate> {
    let range = DateRange::last_days(Local::now().date_naive(), DEFAULT_RANGE_DAYS);
    vec![range.start(), range.end()]
}

async fn handle_sources_command(state: &mut AppState) -> Result<()> {
    let sources = state.refresh_catalog().await?;
    if sources.is_empty() {
        warn!("No news sources available");
    }
    compose(&render_sources(sources), None)
}

async fn handle_fetch_command(
    state: &mut AppState,
    query: &Query,
    output: Option<&str>,
) -> Result<()> {
    let outcome = state.search(query).await?;
    compose(&render_outcome(&outcome), output)
}

async fn handle_summarize_command(
    state: &AppState,
    text: Option<String>,
    file: Option<String>,
) -> Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(file)) => {
            fs::read_to_string(&file).context(format!("Failed to read text file: {file}"))?
        }
        (None, None) => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read text from stdin")?;
            text
        }
    };

    let summary = state
        .summarizer
        .summarize(&text)
        .await
        .with_context(|| format!("Summarizing with the {} failed", state.summarizer.name()))?;
    compose(&format!("{summary}\n"), None)
}

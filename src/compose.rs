//! The compose module renders a search outcome as a Markdown report and writes it out.

use std::fs::OpenOptions;
use std::io::Write;

use anyhow::{Context, Result};
use log::info;

use crate::models::NewsSource;
use crate::pipeline::{ArticleBody, ArticleReport, SearchOutcome, SummaryState};

/// Renders `outcome` as Markdown: a header line, then one section per article with
/// the content preview, the summary, the image, a link and the publish date.
pub fn render_outcome(outcome: &SearchOutcome) -> String {
    match outcome {
        SearchOutcome::NoArticles { source, cause } => {
            let mut markdown = format!("No articles found for source: {source}.\n");
            if let Some(cause) = cause {
                markdown.push_str(&format!("\n> {} failed: {cause}\n", cause.stage()));
            }
            markdown
        }
        SearchOutcome::Found { source, articles } => {
            let header = format!("Found {} articles from {source}\n\n", articles.len());
            articles
                .iter()
                .fold(header, |markdown, report| markdown + &render_article(report))
        }
    }
}

fn render_article(report: &ArticleReport) -> String {
    let article = &report.article;
    let mut markdown = format!("## {}. {}\n\n", report.position, article.title);

    match &report.body {
        ArticleBody::NoContent => markdown.push_str("No content available.\n\n"),
        ArticleBody::Content { preview, summary } => {
            markdown.push_str(&format!("#### Original Content\n\n{preview}\n\n"));
            match summary {
                SummaryState::Skipped => {}
                SummaryState::Ready(summary) => {
                    markdown.push_str(&format!("#### AI Summary\n\n{summary}\n\n"));
                }
                SummaryState::Failed(err) => {
                    markdown.push_str(&format!("> Failed to generate summary: {err}\n\n"));
                }
            }
        }
    }

    if let Some(image_url) = &article.image_url {
        markdown.push_str(&format!("![{}]({image_url})\n\n", article.source_name));
    }
    markdown.push_str(&format!("[Full Article]({})\n\n", article.url));
    if let Some(published_at) = article.published_at {
        markdown.push_str(&format!("Published: {}\n\n", published_at.date_naive()));
    }
    markdown
}

/// Renders the catalog one source per line as `name (identifier)`.
pub fn render_sources(sources: &[NewsSource]) -> String {
    sources
        .iter()
        .map(|source| format!("{} ({})\n", source.display_name, source.identifier))
        .collect()
}

/// Writes `content` to `output_path`, or to stdout when no path is given.
///
/// # Errors
///
/// Returns an error if the output file cannot be created or written.
pub fn compose(content: &str, output_path: Option<&str>) -> Result<()> {
    match output_path {
        Some(path) => {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(path)
                .with_context(|| format!("Failed to open output file: {path}"))?;
            file.write_all(content.as_bytes())?;
            info!("Composed report to {path}");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

//! Data models shared by the pipeline stages.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::error::{Error, Result};

/// A named news source from the service catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsSource {
    /// Human-facing name, e.g. "BBC News".
    pub display_name: String,
    /// Identifier the search endpoint expects, e.g. "bbc-news".
    pub identifier: String,
}

impl NewsSource {
    pub fn new(display_name: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            identifier: identifier.into(),
        }
    }
}

/// An inclusive range of calendar dates with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Builds a range from its two endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDateRange`] when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Builds a range from a list of picked dates, which must hold exactly two entries.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDateRange`] for any other number of endpoints or when
    /// the first endpoint is after the second.
    pub fn from_endpoints(endpoints: &[NaiveDate]) -> Result<Self> {
        match endpoints {
            [start, end] => Self::new(*start, *end),
            _ => Err(Error::InvalidDateRange(format!(
                "expected exactly two dates, got {}",
                endpoints.len()
            ))),
        }
    }

    /// The `days` days leading up to and including `end`.
    pub fn last_days(end: NaiveDate, days: i64) -> Self {
        let start = end
            .checked_sub_signed(Duration::days(days.max(0)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(self) -> NaiveDate {
        self.start
    }

    pub fn end(self) -> NaiveDate {
        self.end
    }
}

/// One news item returned by the search service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Body text as delivered, possibly ending in a provider truncation notice.
    pub raw_content: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub source_name: String,
    pub published_at: Option<DateTime<Utc>>,
}

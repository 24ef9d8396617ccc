//! The credentials module resolves the two service secrets from the process environment.

use std::fmt;

use log::debug;

use crate::constants::{SEARCH_KEY_ENV_NAME, SUMMARIZER_KEY_ENV_NAME};
use crate::error::{Error, Result};

/// Secrets for the summarization and news search services.
///
/// Absence is a valid state; operations that need a secret ask for it through
/// [`Credentials::summarizer_key`] or [`Credentials::search_key`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    summarizer_key: Option<String>,
    search_key: Option<String>,
}

impl Credentials {
    pub fn new(summarizer_key: Option<String>, search_key: Option<String>) -> Self {
        Self {
            summarizer_key: summarizer_key.filter(|key| !key.is_empty()),
            search_key: search_key.filter(|key| !key.is_empty()),
        }
    }

    /// Reads both secrets from the process environment. Never fails.
    pub fn load() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolves both secrets through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Self::new(lookup(SUMMARIZER_KEY_ENV_NAME), lookup(SEARCH_KEY_ENV_NAME));
        debug!(
            "Credentials loaded: {SUMMARIZER_KEY_ENV_NAME} {}, {SEARCH_KEY_ENV_NAME} {}",
            presence(credentials.summarizer_key.as_ref()),
            presence(credentials.search_key.as_ref()),
        );
        credentials
    }

    /// Returns the summarization service key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] naming `OPENAI_API_KEY` when it is not set.
    pub fn summarizer_key(&self) -> Result<&str> {
        self.summarizer_key
            .as_deref()
            .ok_or(Error::MissingCredential(SUMMARIZER_KEY_ENV_NAME))
    }

    /// Returns the news search service key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] naming `NEWS_API_KEY` when it is not set.
    pub fn search_key(&self) -> Result<&str> {
        self.search_key
            .as_deref()
            .ok_or(Error::MissingCredential(SEARCH_KEY_ENV_NAME))
    }
}

fn presence(value: Option<&String>) -> &'static str {
    if value.is_some() { "set" } else { "not set" }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("summarizer_key", &self.summarizer_key.as_ref().map(|_| "<redacted>"))
            .field("search_key", &self.search_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

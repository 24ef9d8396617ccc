//! Resolution of user-chosen source names against the fetched catalog.

use log::{debug, warn};

use crate::constants::PREFERRED_SOURCE_NAME;
use crate::models::NewsSource;

/// Finds the source whose display name is exactly `display_name`.
///
/// Falls back to [`default_source`] when nothing matches, so it only returns
/// `None` for an empty catalog.
pub fn resolve<'a>(display_name: &str, catalog: &'a [NewsSource]) -> Option<&'a NewsSource> {
    if let Some(source) = catalog
        .iter()
        .find(|source| source.display_name == display_name)
    {
        debug!("Resolved {display_name} to {}", source.identifier);
        return Some(source);
    }

    let fallback = default_source(catalog);
    if let Some(source) = fallback {
        warn!(
            "News source {display_name} not found, using {} instead",
            source.display_name
        );
    }
    fallback
}

/// The source selected when the user made no choice: "BBC News" if listed, else the first entry.
pub fn default_source(catalog: &[NewsSource]) -> Option<&NewsSource> {
    catalog
        .iter()
        .find(|source| source.display_name == PREFERRED_SOURCE_NAME)
        .or_else(|| catalog.first())
}

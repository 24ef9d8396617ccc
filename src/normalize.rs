//! Cleanup of article body text before it is displayed or summarized.

use crate::constants::{PREVIEW_CHARS, PREVIEW_ELLIPSIS, TRUNCATION_MARKER};

/// Removes the provider truncation notice (e.g. `" [+1234 chars]"`) from `raw_content`.
///
/// Keeps everything before the first `" ["`; absent content stays absent.
pub fn normalize(raw_content: Option<&str>) -> Option<String> {
    raw_content.map(|content| {
        content
            .split_once(TRUNCATION_MARKER)
            .map_or(content, |(kept, _)| kept)
            .to_owned()
    })
}

/// Display form of normalized content: the first 1000 characters followed by `"..."`.
///
/// The summarizer always gets the full normalized text, never this preview.
pub fn preview(normalized: &str) -> String {
    let cut = normalized
        .char_indices()
        .nth(PREVIEW_CHARS)
        .map_or(normalized.len(), |(index, _)| index);
    let mut shown = normalized.get(..cut).unwrap_or(normalized).to_owned();
    shown.push_str(PREVIEW_ELLIPSIS);
    shown
}

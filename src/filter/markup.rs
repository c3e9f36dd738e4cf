//! HTML-to-text extraction for comment bodies.
//!
//! Reddit renders comment markdown to HTML (`body_html`). The trigger pattern is
//! tested against the visible text of that HTML, so that markup such as links
//! or emphasis markers never affects matching.

use scraper::Html;
use thiserror::Error;
use tracing::debug;

/// Errors from extracting text from comment markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// Non-blank markup that the parser could only recover into an empty tree.
    #[error("malformed markup: {}", .0.join("; "))]
    Malformed(Vec<String>),
}

/// Extracts the visible text of an HTML fragment.
///
/// Text nodes are concatenated in document order. Comments (`<!-- SC_OFF -->`
/// and friends) are dropped and character references are decoded.
///
/// The parser recovers from stray `<`, unterminated entities and mismatched
/// tags the way browsers do; those diagnostics are logged and the recovered
/// text is returned.
pub fn to_plain_text(html: &str) -> Result<String, MarkupError> {
    let fragment = Html::parse_fragment(html);
    let text: String = fragment.root_element().text().collect();
    if fragment.errors.is_empty() {
        return Ok(text);
    }

    let diagnostics: Vec<String> = fragment.errors.iter().map(|e| e.to_string()).collect();
    if text.trim().is_empty() && !html.trim().is_empty() {
        return Err(MarkupError::Malformed(diagnostics));
    }
    debug!(?diagnostics, "Recovered from markup errors");
    Ok(text)
}

//! Text filtering for incoming comments.
//!
//! - [`markup`]: visible text of a comment's rendered HTML
//! - [`matcher`]: the compiled trigger pattern

pub mod markup;
pub mod matcher;

pub use markup::{MarkupError, to_plain_text};
pub use matcher::TextMatcher;

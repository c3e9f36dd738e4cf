//! The capability set the reply pipeline needs from Reddit.
//!
//! The pipeline depends only on this trait, so tests can drive it with an
//! in-memory double instead of the network.

use std::future::Future;

use futures::stream::BoxStream;

use crate::config::FeedTarget;
use crate::filter::{MarkupError, to_plain_text};
use crate::types::{Comment, CommentId, Identity, OwnReply};

use super::error::RedditApiError;

/// Operations against Reddit used by the reply pipeline.
///
/// # Stream contracts
///
/// - [`own_replies_newest_first`](RedditApi::own_replies_newest_first) is
///   finite and restartable: every call starts again from the newest reply,
///   and pages are fetched only as the stream is polled.
/// - [`stream_comments`](RedditApi::stream_comments) is effectively infinite
///   and not restartable. It ends only after yielding an error the client
///   could not recover from.
pub trait RedditApi: Send + Sync {
    /// Resolves the account the bot is logged in as.
    fn me(&self) -> impl Future<Output = Result<Identity, RedditApiError>> + Send;

    /// The comments written by `me`, newest first.
    fn own_replies_newest_first<'a>(
        &'a self,
        me: &Identity,
    ) -> BoxStream<'a, Result<OwnReply, RedditApiError>>;

    /// The live comment feed, oldest first within each batch.
    fn stream_comments<'a>(
        &'a self,
        feed: &FeedTarget,
    ) -> BoxStream<'a, Result<Comment, RedditApiError>>;

    /// Posts `body` as a reply to `target`, returning the new comment's id.
    fn reply(
        &self,
        target: &Comment,
        body: &str,
    ) -> impl Future<Output = Result<CommentId, RedditApiError>> + Send;

    /// The title of the submission `comment` belongs to. Used for log lines.
    fn submission_title(
        &self,
        comment: &Comment,
    ) -> impl Future<Output = Result<String, RedditApiError>> + Send;

    /// Extracts the visible text of comment markup.
    fn to_plain_text(&self, markup: &str) -> Result<String, MarkupError> {
        to_plain_text(markup)
    }
}

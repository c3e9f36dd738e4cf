//! Searching the bot's own comment history for an existing reply.
//!
//! The history is read newest first and the scan stops at the first own
//! comment older than the target: a reply to a comment can only have been
//! written after that comment. Scan cost is therefore bounded by the number of
//! replies the bot made since the target was posted, not by total history.

use futures::{Stream, StreamExt};
use tracing::trace;

use crate::reddit::{RedditApi, RedditApiError};
use crate::types::{Comment, CommentId, Identity, OwnReply};

/// Finds a reply to `target` in a newest-first stream of own comments.
///
/// Returns the id of the first reply found, or `None` if the scan reaches an
/// own comment strictly older than the target (or the end of the stream).
/// Own comments created at the same instant as the target are still checked.
pub async fn find_reply_to<S, E>(own_replies: S, target: &Comment) -> Result<Option<CommentId>, E>
where
    S: Stream<Item = Result<OwnReply, E>>,
{
    let mut own_replies = std::pin::pin!(own_replies);
    let mut scanned = 0usize;
    while let Some(reply) = own_replies.next().await {
        let reply = reply?;
        if reply.created_at < target.created_at {
            break;
        }
        scanned += 1;
        if reply.answers(&target.id) {
            trace!(scanned, reply = %reply.id, "Found existing reply");
            return Ok(Some(reply.id));
        }
    }
    trace!(scanned, "No existing reply");
    Ok(None)
}

/// The bot's own reply history, as seen through a [`RedditApi`].
pub struct SelfReplyIndex<'a, C> {
    client: &'a C,
    me: &'a Identity,
}

impl<'a, C: RedditApi> SelfReplyIndex<'a, C> {
    pub fn new(client: &'a C, me: &'a Identity) -> Self {
        SelfReplyIndex { client, me }
    }

    /// Returns the id of the bot's reply to `target`, if it made one.
    ///
    /// Each call opens a fresh history stream, so a reply posted a moment ago
    /// by this or another process is visible.
    pub async fn already_replied_to(
        &self,
        target: &Comment,
    ) -> Result<Option<CommentId>, RedditApiError> {
        find_reply_to(self.client.own_replies_newest_first(self.me), target).await
    }
}

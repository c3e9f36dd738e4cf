//! Consuming the comment feed.
//!
//! Every comment is logged, checked, and if eligible appended to the reply
//! queue. Ingest never waits on the cooldown and never posts anything.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::FeedTarget;
use crate::reddit::RedditApi;
use crate::types::Comment;

use super::BotError;
use super::context::BotContext;
use super::queue::ReplySender;
use super::report;

pub struct IngestLoop<C> {
    ctx: Arc<BotContext<C>>,
    queue: ReplySender,
}

impl<C: RedditApi + 'static> IngestLoop<C> {
    pub fn new(ctx: Arc<BotContext<C>>, queue: ReplySender) -> Self {
        IngestLoop { ctx, queue }
    }

    /// Consumes `feed` until shutdown.
    ///
    /// The feed is expected to be endless: a feed error, or the feed ending,
    /// is returned as an error.
    #[instrument(skip_all, fields(feed = %feed))]
    pub async fn run(
        mut self,
        feed: &FeedTarget,
        shutdown: &CancellationToken,
    ) -> Result<(), BotError> {
        info!("Listening for comments");
        let ctx = Arc::clone(&self.ctx);
        let mut comments = ctx.client.stream_comments(feed);
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping ingest");
                    return Ok(());
                }
                next = comments.next() => next,
            };
            match next {
                Some(Ok(comment)) => {
                    self.ingest(comment).await?;
                }
                Some(Err(e)) => return Err(BotError::Feed(e)),
                None => return Err(BotError::FeedEnded),
            }
        }
    }

    /// Handles one comment. Returns whether it was queued.
    pub async fn ingest(&mut self, comment: Comment) -> Result<bool, BotError> {
        report::spawn_log_received(Arc::clone(&self.ctx.client), comment.clone());

        if !self.ctx.should_reply(&comment).await.is_eligible() {
            return Ok(false);
        }
        let id = comment.id.clone();
        let sequence = self.queue.enqueue(comment)?;
        debug!(comment = %id, sequence, "Queued comment for reply");
        Ok(true)
    }
}

//! The reply pipeline.
//!
//! Two loops run concurrently and share a [`BotContext`]:
//!
//! - [`IngestLoop`] consumes the comment feed, checks each comment, and queues
//!   the eligible ones. It runs as fast as the feed delivers.
//! - [`DispatchLoop`] takes queued comments in order and replies to each one,
//!   waiting out the cooldown between attempts and re-checking eligibility
//!   right before posting.
//!
//! # Module Structure
//!
//! - [`gate`]: mutual exclusion and cooldown arithmetic for reply attempts
//! - [`history`]: search of the bot's own replies
//! - [`eligibility`]: the should-reply decision
//! - [`queue`]: FIFO hand-off between the loops
//! - [`report`]: comment summaries for the log

mod context;
mod dispatch;
mod eligibility;
pub mod gate;
pub mod history;
mod ingest;
mod queue;
mod report;


use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::{BotParams, ConfigError, FeedTarget};
use crate::filter::TextMatcher;
use crate::reddit::{RedditApi, RedditApiError};

pub use context::{BotContext, ReplySettings};
pub use dispatch::{DispatchLoop, DispatchOutcome};
pub use eligibility::{Eligibility, SkipReason};
pub use ingest::IngestLoop;
pub use queue::{QueueClosed, QueuedComment, ReplyReceiver, ReplySender, reply_queue};
pub use report::format_comment;

/// Errors that stop the bot.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("comment feed failed: {0}")]
    Feed(#[source] RedditApiError),

    #[error("comment feed ended")]
    FeedEnded,

    #[error(transparent)]
    QueueClosed(#[from] QueueClosed),

    #[error("dispatcher task failed: {0}")]
    Dispatcher(#[from] tokio::task::JoinError),
}

/// A configured bot, ready to run.
pub struct ReplyBot<C> {
    ctx: Arc<BotContext<C>>,
    feed: FeedTarget,
}

impl<C: RedditApi + 'static> ReplyBot<C> {
    pub fn new(
        client: Arc<C>,
        matcher: TextMatcher,
        feed: FeedTarget,
        settings: ReplySettings,
    ) -> Self {
        ReplyBot {
            ctx: Arc::new(BotContext::new(client, matcher, settings)),
            feed,
        }
    }

    pub fn from_params(client: Arc<C>, params: &BotParams) -> Result<Self, ConfigError> {
        Ok(Self::new(
            client,
            params.matcher()?,
            params.feed()?,
            ReplySettings::from_params(params),
        ))
    }

    pub fn context(&self) -> &Arc<BotContext<C>> {
        &self.ctx
    }

    /// Runs both loops until `shutdown` is cancelled or either loop fails.
    ///
    /// Returns `Ok(())` only after a requested shutdown.
    #[instrument(skip_all, fields(feed = %self.feed))]
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), BotError> {
        info!(
            pattern = self.ctx.matcher.as_str(),
            dry_run = self.ctx.settings.dry_run,
            "Starting reply bot"
        );
        let (sender, receiver) = reply_queue();

        // The dispatcher gets its own token so it can be stopped when ingest
        // fails without cancelling the caller's token.
        let dispatch_shutdown = shutdown.child_token();
        let dispatcher = DispatchLoop::new(Arc::clone(&self.ctx), receiver);
        let mut dispatch_task = tokio::spawn(dispatcher.run(dispatch_shutdown.clone()));

        let ingest = IngestLoop::new(Arc::clone(&self.ctx), sender);
        let ingest_result = tokio::select! {
            result = ingest.run(&self.feed, &shutdown) => result,
            joined = &mut dispatch_task => return joined?.map(drop),
        };

        dispatch_shutdown.cancel();
        let dispatch_result = dispatch_task.await?;
        info!("Reply bot stopped");
        ingest_result.and(dispatch_result.map(drop))
    }
}

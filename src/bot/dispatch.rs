//! Posting replies, one at a time, no faster than the cooldown allows.
//!
//! For each queued comment the dispatcher:
//!
//! 1. Sleeps until the cooldown since the last attempt has passed (whole
//!    seconds, rounded up). Shutdown interrupts this wait.
//! 2. Enters the [`ReplyGate`](super::gate::ReplyGate). If another attempt
//!    landed meanwhile, leaves and waits again.
//! 3. Re-checks eligibility, since time has passed since ingest.
//! 4. Posts the reply (or only logs it, in dry-run) and records the attempt.
//!
//! Steps 3 and 4 are never interrupted: an attempt that started completes.

use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::reddit::{RedditApi, RedditApiError};
use crate::types::CommentId;

use super::BotError;
use super::context::BotContext;
use super::eligibility::{Eligibility, SkipReason};
use super::gate::{GateGuard, cooldown_remaining};
use super::queue::{QueueClosed, QueuedComment, ReplyReceiver};
use super::report;

/// What happened to one queued comment.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The reply was posted.
    Replied { reply: CommentId },
    /// Dry-run: the reply was logged but not posted.
    DryRun,
    /// The final re-check failed.
    Skipped(SkipReason),
    /// Posting failed. Failed posts are not retried.
    Failed(RedditApiError),
}

pub struct DispatchLoop<C> {
    ctx: Arc<BotContext<C>>,
    queue: ReplyReceiver,
}

impl<C: RedditApi + 'static> DispatchLoop<C> {
    pub fn new(ctx: Arc<BotContext<C>>, queue: ReplyReceiver) -> Self {
        DispatchLoop { ctx, queue }
    }

    /// Dispatches queued comments in order until shutdown.
    ///
    /// On shutdown, entries not yet attempted are dropped. Returns how many,
    /// counting one that was waiting out its cooldown.
    #[instrument(skip_all)]
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<usize, BotError> {
        info!(
            cooldown_secs = self.ctx.settings.cooldown.as_secs_f64(),
            dry_run = self.ctx.settings.dry_run,
            "Dispatcher started"
        );
        let mut abandoned = 0;
        loop {
            let entry = tokio::select! {
                _ = shutdown.cancelled() => break,
                entry = self.queue.next() => match entry {
                    Some(entry) => entry,
                    None => return Err(BotError::QueueClosed(QueueClosed)),
                },
            };
            let guard = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(sequence = entry.sequence, "Dropping entry waiting on cooldown");
                    abandoned += 1;
                    break;
                }
                guard = self.wait_for_turn() => guard,
            };
            self.attempt(entry, guard).await;
        }

        abandoned += self.queue.abandon();
        info!(abandoned, "Shutdown requested, stopping dispatcher");
        Ok(abandoned)
    }

    /// Handles one entry: waits out the cooldown, then attempts the reply.
    pub async fn dispatch_one(&self, entry: QueuedComment) -> DispatchOutcome {
        let guard = self.wait_for_turn().await;
        self.attempt(entry, guard).await
    }

    /// Sleeps until the cooldown has passed, then returns the gate guard.
    async fn wait_for_turn(&self) -> GateGuard<'_> {
        let cooldown = self.ctx.settings.cooldown;
        loop {
            let last = self.ctx.gate.last_reply().await;
            if let Some(wait) = cooldown_remaining(last, Instant::now(), cooldown) {
                info!(wait_secs = wait.as_secs(), "Sleeping before next reply");
                sleep(wait).await;
            }

            let guard = self.ctx.gate.enter().await;
            if cooldown_remaining(guard.last_reply(), Instant::now(), cooldown).is_none() {
                return guard;
            }
        }
    }

    async fn attempt(&self, entry: QueuedComment, mut guard: GateGuard<'_>) -> DispatchOutcome {
        let comment = entry.comment;
        debug!(
            comment = %comment.id,
            sequence = entry.sequence,
            queued_secs = entry.enqueued_at.elapsed().as_secs(),
            "Dispatching comment"
        );

        if let Eligibility::Skip(reason) = self.ctx.recheck(&comment, &guard).await {
            info!(comment = %comment.id, reason = %reason, "Double check failed, not replying");
            return DispatchOutcome::Skipped(reason);
        }

        report::spawn_log_reply(Arc::clone(&self.ctx.client), comment.clone());

        let outcome = if self.ctx.settings.dry_run {
            info!(comment = %comment.id, "Dry run, not posting reply");
            DispatchOutcome::DryRun
        } else {
            match self.ctx.client.reply(&comment, &self.ctx.settings.reply).await {
                Ok(reply) => {
                    info!(comment = %comment.id, reply = %reply, "Posted reply");
                    DispatchOutcome::Replied { reply }
                }
                Err(e) => {
                    warn!(comment = %comment.id, error = %e, "Failed to post reply");
                    DispatchOutcome::Failed(e)
                }
            }
        };

        let answered = match outcome {
            DispatchOutcome::Replied { .. } | DispatchOutcome::DryRun => Some(comment.id),
            _ => None,
        };
        guard.record_attempt(Instant::now(), answered);
        outcome
    }
}

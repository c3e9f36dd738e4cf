//! Deciding whether a comment should be answered.
//!
//! The checks run cheapest first and stop at the first failure:
//!
//! 1. The comment's plain text matches the trigger pattern.
//! 2. The bot's identity can be resolved.
//! 3. The comment was not written by the bot.
//! 4. The bot has not already answered it.
//!
//! Every failure, including an API failure, yields a skip; errors never
//! escape. The same checks run at ingest and again right before replying.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::filter::MarkupError;
use crate::reddit::{RedditApi, RedditApiError};
use crate::types::{Comment, CommentId};

use super::context::BotContext;
use super::gate::GateGuard;
use super::history::SelfReplyIndex;

/// Outcome of an eligibility check.
#[derive(Debug)]
pub enum Eligibility {
    Eligible,
    Skip(SkipReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Why a comment is not answered.
#[derive(Debug)]
pub enum SkipReason {
    /// The comment text does not match the trigger pattern.
    NoMatch,
    /// The comment markup could not be turned into text.
    Unreadable(MarkupError),
    /// The bot's own identity could not be resolved.
    IdentityUnavailable(RedditApiError),
    /// The bot wrote the comment.
    OwnComment,
    /// The bot already answered; `reply` is its answer when known.
    AlreadyReplied { reply: Option<CommentId> },
    /// The bot's history could not be read.
    HistoryUnavailable(RedditApiError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMatch => write!(f, "no pattern match"),
            SkipReason::Unreadable(e) => write!(f, "unreadable markup: {}", e),
            SkipReason::IdentityUnavailable(e) => write!(f, "identity unavailable: {}", e),
            SkipReason::OwnComment => write!(f, "own comment"),
            SkipReason::AlreadyReplied { reply: Some(id) } => write!(f, "already replied ({})", id),
            SkipReason::AlreadyReplied { reply: None } => write!(f, "already replied"),
            SkipReason::HistoryUnavailable(e) => write!(f, "history unavailable: {}", e),
        }
    }
}

impl<C: RedditApi> BotContext<C> {
    /// Ingest-time check.
    pub async fn should_reply(&self, comment: &Comment) -> Eligibility {
        self.evaluate(comment, None).await
    }

    /// Dispatch-time check, made while holding the gate.
    ///
    /// Also consults the targets this process answered, which covers dry-run
    /// replies and replies the history listing has not caught up with.
    pub async fn recheck(&self, comment: &Comment, guard: &GateGuard<'_>) -> Eligibility {
        self.evaluate(comment, Some(guard)).await
    }

    async fn evaluate(&self, comment: &Comment, guard: Option<&GateGuard<'_>>) -> Eligibility {
        let text = match self.client.to_plain_text(&comment.body_html) {
            Ok(text) => text,
            Err(e) => {
                warn!(comment = %comment.id, error = %e, "Could not read comment markup");
                return Eligibility::Skip(SkipReason::Unreadable(e));
            }
        };
        if !self.matcher.matches(&text) {
            debug!(comment = %comment.id, "Comment does not match pattern");
            return Eligibility::Skip(SkipReason::NoMatch);
        }

        let me = match self.client.me().await {
            Ok(me) => me,
            Err(e) => {
                error!(error = %e, "Could not get own identity");
                return Eligibility::Skip(SkipReason::IdentityUnavailable(e));
            }
        };

        if comment.is_authored_by(&me) {
            info!(comment = %comment.id, "Comment is from myself");
            return Eligibility::Skip(SkipReason::OwnComment);
        }

        if guard.is_some_and(|g| g.has_answered(&comment.id)) {
            info!(comment = %comment.id, "Already replied to comment");
            return Eligibility::Skip(SkipReason::AlreadyReplied { reply: None });
        }

        match SelfReplyIndex::new(&*self.client, &me)
            .already_replied_to(comment)
            .await
        {
            Ok(None) => Eligibility::Eligible,
            Ok(Some(reply)) => {
                info!(comment = %comment.id, reply = %reply, "Already replied to comment");
                Eligibility::Skip(SkipReason::AlreadyReplied { reply: Some(reply) })
            }
            Err(e) => {
                warn!(comment = %comment.id, error = %e, "Could not read own comment history");
                Eligibility::Skip(SkipReason::HistoryUnavailable(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use crate::bot::context::ReplySettings;
    use crate::filter::TextMatcher;
    use crate::test_utils::{BOT_NAME, FakeReddit, comment, own_reply};

    fn context() -> BotContext<FakeReddit> {
        let (fake, _feed) = FakeReddit::new();
        BotContext::new(
            Arc::new(fake),
            TextMatcher::new(r"b[^a-z]*12").unwrap(),
            ReplySettings {
                reply: "Take your vitamins".to_string(),
                cooldown: Duration::from_secs(600),
                dry_run: false,
            },
        )
    }

    #[tokio::test]
    async fn matching_comment_is_eligible() {
        let ctx = context();
        let c = comment("x", Some("alice"), "<p>need B-12</p>", Utc::now());
        assert!(ctx.should_reply(&c).await.is_eligible());
    }

    #[tokio::test]
    async fn non_matching_comment_skips_network() {
        let ctx = context();
        let c = comment("x", Some("alice"), "<p>need B-complex</p>", Utc::now());
        assert!(matches!(
            ctx.should_reply(&c).await,
            Eligibility::Skip(SkipReason::NoMatch)
        ));
        assert_eq!(ctx.client.identity_lookups(), 0);
        assert_eq!(ctx.client.history_scans(), 0);
    }

    #[tokio::test]
    async fn matches_text_not_markup() {
        let ctx = context();
        let c = comment("x", Some("alice"), "<p>B<em>12</em></p>", Utc::now());
        assert!(ctx.should_reply(&c).await.is_eligible());
    }

    #[tokio::test]
    async fn sloppy_markup_still_matches() {
        let ctx = context();
        let c = comment("x", Some("alice"), "<p>is B12 < 3 a problem?</div>", Utc::now());
        assert!(ctx.should_reply(&c).await.is_eligible());
    }

    #[tokio::test]
    async fn unreadable_markup_is_skipped() {
        let ctx = context();
        ctx.client.set_markup_fails(true);
        let c = comment("x", Some("alice"), "<p>B12</p>", Utc::now());
        assert!(matches!(
            ctx.should_reply(&c).await,
            Eligibility::Skip(SkipReason::Unreadable(_))
        ));
    }

    #[tokio::test]
    async fn own_comment_is_skipped() {
        let ctx = context();
        let c = comment("x", Some(BOT_NAME.to_uppercase().as_str()), "<p>B12</p>", Utc::now());
        assert!(matches!(
            ctx.should_reply(&c).await,
            Eligibility::Skip(SkipReason::OwnComment)
        ));
        assert_eq!(ctx.client.history_scans(), 0);
    }

    #[tokio::test]
    async fn deleted_author_is_not_self() {
        let ctx = context();
        let c = comment("x", None, "<p>B12</p>", Utc::now());
        assert!(ctx.should_reply(&c).await.is_eligible());
    }

    #[tokio::test]
    async fn identity_failure_is_skipped() {
        let ctx = context();
        ctx.client.set_me(None);
        let c = comment("x", Some("alice"), "<p>B12</p>", Utc::now());
        assert!(matches!(
            ctx.should_reply(&c).await,
            Eligibility::Skip(SkipReason::IdentityUnavailable(_))
        ));
        assert_eq!(ctx.client.history_scans(), 0);
    }

    #[tokio::test]
    async fn existing_reply_is_skipped() {
        let ctx = context();
        let t = Utc::now();
        ctx.client
            .push_own_reply(own_reply("r1", "x", t + chrono::Duration::seconds(5)));
        let c = comment("x", Some("alice"), "<p>B12</p>", t);
        match ctx.should_reply(&c).await {
            Eligibility::Skip(SkipReason::AlreadyReplied { reply }) => {
                assert_eq!(reply, Some(CommentId::new("r1")));
            }
            other => panic!("expected AlreadyReplied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn history_failure_is_skipped() {
        let ctx = context();
        ctx.client.set_history_fails(true);
        let c = comment("x", Some("alice"), "<p>B12</p>", Utc::now());
        assert!(matches!(
            ctx.should_reply(&c).await,
            Eligibility::Skip(SkipReason::HistoryUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn recheck_honours_answered_targets() {
        let ctx = context();
        let c = comment("x", Some("alice"), "<p>B12</p>", Utc::now());
        let mut guard = ctx.gate.enter().await;
        assert!(ctx.recheck(&c, &guard).await.is_eligible());

        guard.record_attempt(tokio::time::Instant::now(), Some(c.id.clone()));
        assert!(matches!(
            ctx.recheck(&c, &guard).await,
            Eligibility::Skip(SkipReason::AlreadyReplied { reply: None })
        ));
    }

    #[tokio::test]
    async fn repeated_checks_agree() {
        let ctx = context();
        let c = comment("x", Some("alice"), "<p>B12</p>", Utc::now());
        assert!(ctx.should_reply(&c).await.is_eligible());
        assert!(ctx.should_reply(&c).await.is_eligible());
    }
}

//! Shared test utilities: an in-memory Reddit and comment builders.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use proptest::prelude::*;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::FeedTarget;
use crate::filter::{MarkupError, to_plain_text};
use crate::reddit::{RedditApi, RedditApiError};
use crate::types::{Comment, CommentId, Fullname, Identity, OwnReply, SubmissionId, ThingKind};

/// The account name the fake is logged in as.
pub const BOT_NAME: &str = "b12bot";

/// Builds a top-level comment on submission `s1`.
pub fn comment(
    id: &str,
    author: Option<&str>,
    body_html: &str,
    created_at: DateTime<Utc>,
) -> Comment {
    Comment {
        id: CommentId::new(id),
        author: author.map(Identity::new),
        body_html: body_html.to_string(),
        body: body_html.to_string(),
        created_at,
        parent: Fullname::new(ThingKind::Submission, "s1"),
        submission: SubmissionId::new("s1"),
        submission_title: None,
    }
}

/// A comment written by the bot at `created_at` in reply to `parent`.
pub fn own_reply(id: &str, parent: &str, created_at: DateTime<Utc>) -> OwnReply {
    OwnReply {
        id: CommentId::new(id),
        created_at,
        parent: Fullname::new(ThingKind::Comment, parent),
    }
}

/// A reply the fake accepted.
#[derive(Debug, Clone)]
pub struct PostedReply {
    pub target: CommentId,
    pub body: String,
    pub at: Instant,
}

/// An in-memory [`RedditApi`].
///
/// Successful replies are appended to the bot's own history, so later
/// eligibility checks see them exactly as they would on Reddit.
pub struct FakeReddit {
    me: Mutex<Option<Identity>>,
    own_replies: Mutex<Vec<OwnReply>>,
    feed: Mutex<Option<mpsc::UnboundedReceiver<Result<Comment, RedditApiError>>>>,
    posted: Mutex<Vec<PostedReply>>,
    reply_failures: Mutex<VecDeque<RedditApiError>>,
    history_fails: AtomicBool,
    markup_fails: AtomicBool,
    history_scans: AtomicUsize,
    identity_lookups: AtomicUsize,
    next_reply: AtomicUsize,
}

impl FakeReddit {
    /// Creates a fake logged in as [`BOT_NAME`], with a feed fed through the
    /// returned sender. Dropping the sender ends the feed.
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<Comment, RedditApiError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fake = FakeReddit {
            me: Mutex::new(Some(Identity::new(BOT_NAME))),
            own_replies: Mutex::new(Vec::new()),
            feed: Mutex::new(Some(rx)),
            posted: Mutex::new(Vec::new()),
            reply_failures: Mutex::new(VecDeque::new()),
            history_fails: AtomicBool::new(false),
            markup_fails: AtomicBool::new(false),
            history_scans: AtomicUsize::new(0),
            identity_lookups: AtomicUsize::new(0),
            next_reply: AtomicUsize::new(0),
        };
        (fake, tx)
    }

    /// Makes identity lookups fail (`None`) or succeed as `name`.
    pub fn set_me(&self, name: Option<&str>) {
        *self.me.lock().unwrap() = name.map(Identity::new);
    }

    /// Adds a reply to the bot's history as the newest entry.
    pub fn push_own_reply(&self, reply: OwnReply) {
        self.own_replies.lock().unwrap().insert(0, reply);
    }

    /// Makes the next reply call fail with `error`.
    pub fn fail_next_reply(&self, error: RedditApiError) {
        self.reply_failures.lock().unwrap().push_back(error);
    }

    pub fn set_history_fails(&self, fails: bool) {
        self.history_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_markup_fails(&self, fails: bool) {
        self.markup_fails.store(fails, Ordering::SeqCst);
    }

    pub fn posted(&self) -> Vec<PostedReply> {
        self.posted.lock().unwrap().clone()
    }

    /// Number of own-reply streams opened.
    pub fn history_scans(&self) -> usize {
        self.history_scans.load(Ordering::SeqCst)
    }

    pub fn identity_lookups(&self) -> usize {
        self.identity_lookups.load(Ordering::SeqCst)
    }
}

impl RedditApi for FakeReddit {
    async fn me(&self) -> Result<Identity, RedditApiError> {
        self.identity_lookups.fetch_add(1, Ordering::SeqCst);
        self.me
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RedditApiError::transient("identity unavailable"))
    }

    fn own_replies_newest_first<'a>(
        &'a self,
        _me: &Identity,
    ) -> BoxStream<'a, Result<OwnReply, RedditApiError>> {
        self.history_scans.fetch_add(1, Ordering::SeqCst);
        if self.history_fails.load(Ordering::SeqCst) {
            return stream::once(async { Err(RedditApiError::transient("history unavailable")) })
                .boxed();
        }
        let replies = self.own_replies.lock().unwrap().clone();
        stream::iter(replies.into_iter().map(Ok)).boxed()
    }

    fn stream_comments<'a>(
        &'a self,
        _feed: &FeedTarget,
    ) -> BoxStream<'a, Result<Comment, RedditApiError>> {
        match self.feed.lock().unwrap().take() {
            Some(rx) => stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed(),
            None => stream::empty().boxed(),
        }
    }

    async fn reply(&self, target: &Comment, body: &str) -> Result<CommentId, RedditApiError> {
        if let Some(error) = self.reply_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let n = self.next_reply.fetch_add(1, Ordering::SeqCst);
        let id = CommentId::new(format!("reply{}", n));
        self.push_own_reply(OwnReply {
            id: id.clone(),
            created_at: Utc::now(),
            parent: target.id.fullname(),
        });
        self.posted.lock().unwrap().push(PostedReply {
            target: target.id.clone(),
            body: body.to_string(),
            at: Instant::now(),
        });
        Ok(id)
    }

    async fn submission_title(&self, comment: &Comment) -> Result<String, RedditApiError> {
        Ok(comment
            .submission_title
            .clone()
            .unwrap_or_else(|| format!("Submission {}", comment.submission)))
    }

    fn to_plain_text(&self, markup: &str) -> Result<String, MarkupError> {
        if self.markup_fails.load(Ordering::SeqCst) {
            return Err(MarkupError::Malformed(vec!["injected".to_string()]));
        }
        to_plain_text(markup)
    }
}

// ─── Property-test generators ───

pub fn arb_comment_id() -> impl Strategy<Value = CommentId> {
    "[0-9a-z]{1,7}".prop_map(CommentId::new)
}

/// Timestamps within a few days of 2024-01-01, at whole seconds.
pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (1_704_067_200i64..1_704_326_400i64)
        .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap_or_default())
}

pub fn arb_own_reply() -> impl Strategy<Value = OwnReply> {
    (arb_comment_id(), arb_comment_id(), arb_timestamp()).prop_map(|(id, parent, at)| OwnReply {
        id,
        created_at: at,
        parent: parent.fullname(),
    })
}

/// A newest-first own-reply history.
pub fn arb_history() -> impl Strategy<Value = Vec<OwnReply>> {
    prop::collection::vec(arb_own_reply(), 0..20).prop_map(|mut replies| {
        replies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        replies
    })
}

//! Comment records observed on the feed and in the bot's own history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CommentId, Fullname, Identity, SubmissionId};

/// A comment observed on the live feed.
///
/// Comments are immutable snapshots: the bot never refreshes one after it has
/// been received, so later edits to the body are not seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// The comment's own id. Replies are attached to this comment.
    pub id: CommentId,

    /// The author, or `None` when the account has been deleted.
    pub author: Option<Identity>,

    /// The rendered HTML body. This is what the trigger pattern is tested against.
    pub body_html: String,

    /// The raw markdown body, used for log lines.
    pub body: String,

    /// When the comment was created.
    pub created_at: DateTime<Utc>,

    /// The comment or submission this comment replies to.
    pub parent: Fullname,

    /// The submission the comment thread belongs to.
    pub submission: SubmissionId,

    /// The submission title, when the listing that produced this comment carried it.
    pub submission_title: Option<String>,
}

impl Comment {
    /// Returns true if `who` wrote this comment.
    pub fn is_authored_by(&self, who: &Identity) -> bool {
        self.author.as_ref() == Some(who)
    }
}

/// A comment previously written by the bot itself.
///
/// Only the fields needed to decide whether the bot already answered a target
/// are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnReply {
    pub id: CommentId,
    pub created_at: DateTime<Utc>,
    pub parent: Fullname,
}

impl OwnReply {
    /// Returns true if this reply is attached directly to `target`.
    pub fn answers(&self, target: &CommentId) -> bool {
        self.parent.id() == target.as_str()
    }
}

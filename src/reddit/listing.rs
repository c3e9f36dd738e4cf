//! Wire types for Reddit's JSON API.
//!
//! Reddit wraps collections in a `Listing` envelope whose children are
//! `{ "kind": "t1", "data": { ... } }` things. Only the fields the bot reads
//! are declared; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::types::{Comment, CommentId, Fullname, Identity, OwnReply, SubmissionId, ThingKind};

use super::error::RedditApiError;

/// Placeholder Reddit uses for the author of a deleted comment.
const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    pub data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData<T> {
    pub children: Vec<Thing<T>>,
    /// Cursor for the next page, `None` on the last page.
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Thing<T> {
    pub kind: String,
    pub data: T,
}

/// A comment as returned by `/r/<sub>/comments` and `/user/<name>/comments`.
#[derive(Debug, Deserialize)]
pub(crate) struct CommentData {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_html: String,
    pub created_utc: f64,
    pub parent_id: String,
    pub link_id: String,
    #[serde(default)]
    pub link_title: Option<String>,
}

impl CommentData {
    fn created_at(&self) -> Result<DateTime<Utc>, RedditApiError> {
        let secs = self.created_utc.trunc() as i64;
        let nanos = (self.created_utc.fract() * 1e9) as u32;
        DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
            RedditApiError::permanent(format!(
                "comment {} has out-of-range created_utc {}",
                self.id, self.created_utc
            ))
        })
    }

    fn parent(&self) -> Result<Fullname, RedditApiError> {
        Fullname::parse(&self.parent_id).map_err(|e| RedditApiError::permanent(e.to_string()))
    }

    pub fn into_comment(self) -> Result<Comment, RedditApiError> {
        let created_at = self.created_at()?;
        let parent = self.parent()?;
        let link = Fullname::parse(&self.link_id)
            .map_err(|e| RedditApiError::permanent(e.to_string()))?;
        if link.kind() != ThingKind::Submission {
            return Err(RedditApiError::permanent(format!(
                "comment {} has non-submission link_id {}",
                self.id, self.link_id
            )));
        }
        let author = (self.author != DELETED_AUTHOR).then(|| Identity::new(self.author));

        Ok(Comment {
            id: CommentId::new(self.id),
            author,
            body_html: self.body_html,
            body: self.body,
            created_at,
            parent,
            submission: SubmissionId::new(link.id()),
            submission_title: self.link_title,
        })
    }

    pub fn into_own_reply(self) -> Result<OwnReply, RedditApiError> {
        Ok(OwnReply {
            created_at: self.created_at()?,
            parent: self.parent()?,
            id: CommentId::new(self.id),
        })
    }
}

/// A submission as returned by `/api/info`.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionData {
    pub title: String,
}

/// Response of `/api/v1/me`.
#[derive(Debug, Deserialize)]
pub(crate) struct MeData {
    pub name: String,
}

/// Response of `/api/v1/access_token`.
///
/// Failed password grants come back as HTTP 200 with only `error` set.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenData {
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub error: Option<String>,
}

/// Response of write endpoints called with `api_type=json`.
#[derive(Debug, Deserialize)]
pub(crate) struct JsonResponse<T> {
    pub json: JsonBody<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JsonBody<T> {
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
    pub data: Option<T>,
}

/// `data` of a successful `/api/comment` call.
#[derive(Debug, Deserialize)]
pub(crate) struct PostedThings {
    pub things: Vec<Thing<PostedComment>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostedComment {
    pub id: String,
}

/// Converts the `t1` children of a listing into domain values, skipping
/// any other kind. Children that fail to convert are logged and dropped.
pub(crate) fn comment_children<T>(
    listing: Listing<CommentData>,
    convert: impl Fn(CommentData) -> Result<T, RedditApiError>,
) -> (Vec<T>, Option<String>) {
    let items = listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == ThingKind::Comment.prefix())
        .filter_map(|thing| {
            let id = thing.data.id.clone();
            convert(thing.data)
                .inspect_err(|e| warn!(comment = %id, error = %e, "Skipping malformed comment"))
                .ok()
        })
        .collect();
    (items, listing.data.after)
}

//! Human-readable comment summaries for the log.
//!
//! Summaries need the submission title, which may cost an API call, so they
//! are produced on spawned tasks and never delay ingest or dispatch.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{Level, debug, info};

use crate::reddit::RedditApi;
use crate::types::Comment;

/// Fields are declared in key order so the JSON output is sorted.
#[derive(Serialize)]
struct CommentSummary<'a> {
    comment: &'a str,
    id: &'a str,
    title: String,
}

/// Renders `comment` as indented JSON with `comment`, `id` and `title` keys.
pub async fn format_comment<C: RedditApi>(client: &C, comment: &Comment) -> String {
    let title = match client.submission_title(comment).await {
        Ok(title) => title,
        Err(e) => format!("<unavailable: {}>", e),
    };
    let summary = CommentSummary {
        comment: &comment.body,
        id: comment.id.as_str(),
        title,
    };
    serde_json::to_string_pretty(&summary).unwrap_or_else(|e| format!("<unformattable: {}>", e))
}

/// Logs an ingested comment at debug level.
pub fn spawn_log_received<C: RedditApi + 'static>(
    client: Arc<C>,
    comment: Comment,
) -> Option<JoinHandle<()>> {
    if !tracing::enabled!(Level::DEBUG) {
        return None;
    }
    Some(tokio::spawn(async move {
        let summary = format_comment(&*client, &comment).await;
        debug!("Got comment with content {}", summary);
    }))
}

/// Logs a comment about to be answered.
pub fn spawn_log_reply<C: RedditApi + 'static>(client: Arc<C>, comment: Comment) -> JoinHandle<()> {
    tokio::spawn(async move {
        let summary = format_comment(&*client, &comment).await;
        info!("Replying to {}", summary);
    })
}

//! FIFO hand-off from ingest to dispatch.
//!
//! The queue is unbounded: ingest never blocks on a slow dispatcher, and
//! comments wait here for as long as the cooldown requires. Entries carry a
//! sequence number so logs can tie a dispatch back to its ingest.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::types::Comment;

/// A comment accepted at ingest, waiting for dispatch.
#[derive(Debug)]
pub struct QueuedComment {
    pub comment: Comment,
    pub sequence: u64,
    pub enqueued_at: Instant,
}

/// The dispatcher is gone; nothing will consume new entries.
#[derive(Debug, Error)]
#[error("reply queue closed")]
pub struct QueueClosed;

/// Creates a connected sender/receiver pair.
pub fn reply_queue() -> (ReplySender, ReplyReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ReplySender {
            tx,
            next_sequence: 0,
        },
        ReplyReceiver { rx },
    )
}

#[derive(Debug)]
pub struct ReplySender {
    tx: mpsc::UnboundedSender<QueuedComment>,
    next_sequence: u64,
}

impl ReplySender {
    /// Appends `comment` to the queue and returns its sequence number.
    pub fn enqueue(&mut self, comment: Comment) -> Result<u64, QueueClosed> {
        let sequence = self.next_sequence;
        self.tx
            .send(QueuedComment {
                comment,
                sequence,
                enqueued_at: Instant::now(),
            })
            .map_err(|_| QueueClosed)?;
        self.next_sequence += 1;
        Ok(sequence)
    }
}

#[derive(Debug)]
pub struct ReplyReceiver {
    rx: mpsc::UnboundedReceiver<QueuedComment>,
}

impl ReplyReceiver {
    /// Waits for the next entry. Returns `None` once every sender is gone and
    /// the queue is drained.
    pub async fn next(&mut self) -> Option<QueuedComment> {
        self.rx.recv().await
    }

    /// Stops accepting entries and discards the backlog, returning how many
    /// entries were dropped.
    pub fn abandon(&mut self) -> usize {
        self.rx.close();
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::comment;
    use chrono::Utc;

    #[tokio::test]
    async fn preserves_order_and_numbers_entries() {
        let (mut tx, mut rx) = reply_queue();
        for id in ["a", "b", "c"] {
            tx.enqueue(comment(id, Some("alice"), "B12", Utc::now()))
                .unwrap();
        }
        drop(tx);

        let mut seen = Vec::new();
        while let Some(entry) = rx.next().await {
            seen.push((entry.sequence, entry.comment.id.to_string()));
        }
        assert_eq!(
            seen,
            vec![
                (0, "a".to_string()),
                (1, "b".to_string()),
                (2, "c".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn closed_when_receiver_dropped() {
        let (mut tx, rx) = reply_queue();
        drop(rx);
        assert!(
            tx.enqueue(comment("a", None, "B12", Utc::now()))
                .is_err()
        );
    }

    #[tokio::test]
    async fn ends_when_sender_dropped() {
        let (mut tx, mut rx) = reply_queue();
        tx.enqueue(comment("a", None, "B12", Utc::now())).unwrap();
        drop(tx);
        assert!(rx.next().await.is_some());
        assert!(rx.next().await.is_none());
    }

    #[tokio::test]
    async fn abandon_counts_backlog() {
        let (mut tx, mut rx) = reply_queue();
        tx.enqueue(comment("a", None, "B12", Utc::now())).unwrap();
        tx.enqueue(comment("b", None, "B12", Utc::now())).unwrap();
        assert_eq!(rx.abandon(), 2);
        assert!(
            tx.enqueue(comment("c", None, "B12", Utc::now()))
                .is_err()
        );
    }
}

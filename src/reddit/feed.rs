//! Turning a polled listing into a live comment stream.
//!
//! Reddit has no push API for comments, so the live feed is built by polling
//! the newest page of a subreddit's comment listing:
//!
//! - Each poll fetches the newest 100 comments and yields, oldest first, the
//!   ones not seen before.
//! - A bounded set of recently seen ids keeps memory flat on busy feeds.
//! - While polls find nothing new, the delay between them doubles from 1s up
//!   to 16s; it drops back to 1s as soon as something new arrives.

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use crate::types::CommentId;

/// Number of recently seen ids remembered. Slightly more than three pages, so
/// ids that slide off the newest page are still recognized on the next poll.
pub const SEEN_CAPACITY: usize = 301;

/// Shortest delay between polls.
const MIN_POLL_DELAY: Duration = Duration::from_secs(1);

/// Longest delay between polls while the feed is quiet.
const MAX_POLL_DELAY: Duration = Duration::from_secs(16);

/// A bounded, insertion-ordered set of comment ids.
///
/// When full, inserting evicts the oldest id.
#[derive(Debug)]
pub struct SeenIds {
    order: VecDeque<CommentId>,
    members: HashSet<CommentId>,
    capacity: usize,
}

impl SeenIds {
    /// A set holding at most `capacity` ids (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SeenIds {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.members.contains(id)
    }

    /// Records `id`. Returns `false` if it was already present.
    pub fn insert(&mut self, id: CommentId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        if self.order.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.members.remove(&oldest);
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }
}

impl Default for SeenIds {
    fn default() -> Self {
        Self::new(SEEN_CAPACITY)
    }
}

/// Delay schedule between feed polls.
#[derive(Debug, Clone)]
pub struct QuietBackoff {
    current: Duration,
}

impl QuietBackoff {
    pub fn new() -> Self {
        QuietBackoff {
            current: MIN_POLL_DELAY,
        }
    }

    /// Returns the delay to wait before the next poll, then doubles it.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(MAX_POLL_DELAY);
        delay
    }

    /// Something new arrived: poll eagerly again.
    pub fn reset(&mut self) {
        self.current = MIN_POLL_DELAY;
    }
}

impl Default for QuietBackoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects the unseen entries of a newest-first page and returns them oldest
/// first, marking them as seen.
pub fn take_unseen<T>(
    seen: &mut SeenIds,
    newest_first: Vec<T>,
    id_of: impl Fn(&T) -> &CommentId,
) -> Vec<T> {
    newest_first
        .into_iter()
        .rev()
        .filter(|item| seen.insert(id_of(item).clone()))
        .collect()
}

//! Mutual exclusion and cooldown bookkeeping for reply attempts.
//!
//! The gate serializes the check-then-act sequence of dispatch: the final
//! eligibility re-check, the reply call, and the update of the last-reply
//! timestamp all happen while holding one [`GateGuard`]. The guard is never
//! held while sleeping out a cooldown, and the ingest path never takes it.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;

use crate::reddit::feed::SeenIds;
use crate::types::CommentId;

/// How many answered targets the gate remembers. Older targets fall back on
/// the history scan alone.
pub const ANSWERED_CAPACITY: usize = 1024;

#[derive(Debug)]
struct GateState {
    /// When the last reply attempt finished, or `None` before the first.
    last_reply: Option<Instant>,
    /// Recent targets this process answered (or pretended to, in dry-run).
    answered: SeenIds,
}

/// Shared reply gate.
#[derive(Debug)]
pub struct ReplyGate {
    state: Mutex<GateState>,
}

impl Default for ReplyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyGate {
    pub fn new() -> Self {
        Self::remembering(ANSWERED_CAPACITY)
    }

    /// A gate that remembers the last `capacity` answered targets.
    pub fn remembering(capacity: usize) -> Self {
        ReplyGate {
            state: Mutex::new(GateState {
                last_reply: None,
                answered: SeenIds::new(capacity),
            }),
        }
    }

    /// Time of the last reply attempt.
    ///
    /// Waits for any in-flight attempt to finish first, so the value is never
    /// stale by more than the attempt currently being made.
    pub async fn last_reply(&self) -> Option<Instant> {
        self.state.lock().await.last_reply
    }

    /// Acquires exclusive use of the gate.
    pub async fn enter(&self) -> GateGuard<'_> {
        GateGuard {
            state: self.state.lock().await,
        }
    }
}

/// Exclusive access to the gate; released on drop.
pub struct GateGuard<'a> {
    state: MutexGuard<'a, GateState>,
}

impl GateGuard<'_> {
    pub fn last_reply(&self) -> Option<Instant> {
        self.state.last_reply
    }

    /// Whether this process already answered `target`.
    pub fn has_answered(&self, target: &CommentId) -> bool {
        self.state.answered.contains(target)
    }

    /// Records a reply attempt that finished at `at`.
    ///
    /// `answered` is the target when the attempt counts as a reply (posted, or
    /// skipped for dry-run); failed attempts only advance the clock.
    pub fn record_attempt(&mut self, at: Instant, answered: Option<CommentId>) {
        self.state.last_reply = Some(at);
        if let Some(target) = answered {
            self.state.answered.insert(target);
        }
    }
}

/// Remaining cooldown at `now`, rounded up to whole seconds.
///
/// Returns `None` when no reply was made yet or the cooldown has elapsed.
pub fn cooldown_remaining(
    last_reply: Option<Instant>,
    now: Instant,
    cooldown: Duration,
) -> Option<Duration> {
    let elapsed = now.saturating_duration_since(last_reply?);
    let remaining = cooldown.checked_sub(elapsed).filter(|d| !d.is_zero())?;
    Some(ceil_to_seconds(remaining))
}

fn ceil_to_seconds(d: Duration) -> Duration {
    Duration::from_secs(d.as_secs() + u64::from(d.subsec_nanos() > 0))
}

//! Core domain types for the reply bot.
//!
//! This module contains the identifiers and records exchanged between the
//! Reddit client and the reply pipeline.

pub mod comment;
pub mod ids;

// Re-export commonly used types at the module level
pub use comment::{Comment, OwnReply};
pub use ids::{CommentId, Fullname, Identity, InvalidFullname, SubmissionId, ThingKind};

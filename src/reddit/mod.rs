//! Reddit API access.
//!
//! This module provides the [`RedditApi`] capability trait the reply pipeline is
//! written against, and [`RedditClient`], its implementation over Reddit's
//! OAuth HTTP API.
//!
//! Key features:
//! - Exponential backoff retry for transient failures
//! - Distinguishes transient vs permanent errors
//! - Live comment feed built from listing polls with a bounded seen-set
//! - Lazy pagination of the bot's own comment history

mod api;
mod client;
mod error;
pub mod feed;
mod listing;
mod retry;

pub use api::RedditApi;
pub use client::RedditClient;
pub use error::{ApiErrorKind, RedditApiError};
pub use retry::{RetryConfig, RetryPolicy, retry_with_backoff};

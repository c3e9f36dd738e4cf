//! State shared by the ingest and dispatch loops.

use std::sync::Arc;
use std::time::Duration;

use crate::config::BotParams;
use crate::filter::TextMatcher;

use super::gate::ReplyGate;

/// What to post and how often.
#[derive(Debug, Clone)]
pub struct ReplySettings {
    /// Reply markdown, posted verbatim.
    pub reply: String,
    /// Minimum time between reply attempts.
    pub cooldown: Duration,
    /// Log replies instead of posting them.
    pub dry_run: bool,
}

impl ReplySettings {
    pub fn from_params(params: &BotParams) -> Self {
        ReplySettings {
            reply: params.reply.clone(),
            cooldown: params.timeout,
            dry_run: params.dry_run,
        }
    }
}

/// Everything both loops need, shared behind an `Arc`.
pub struct BotContext<C> {
    pub client: Arc<C>,
    pub matcher: TextMatcher,
    pub gate: ReplyGate,
    pub settings: ReplySettings,
}

impl<C> BotContext<C> {
    pub fn new(client: Arc<C>, matcher: TextMatcher, settings: ReplySettings) -> Self {
        BotContext {
            client,
            matcher,
            gate: ReplyGate::new(),
            settings,
        }
    }
}

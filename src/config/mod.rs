//! Bot configuration.
//!
//! Configuration comes from two places:
//!
//! - A YAML params file (passed via `--params`) describing *what* the bot does:
//!   the trigger pattern, the reply text, the feed, the cooldown and dry-run.
//! - Environment variables (optionally loaded from a `.env` file) holding the
//!   script-app credentials: `CLIENT_ID`, `CLIENT_SECRET`, `USERNAME`,
//!   `PASSWORD` and an optional `VERSION`.
//!
//! Every error here is fatal: it is reported before any loop starts.

pub mod duration;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::filter::TextMatcher;

/// Default cooldown between replies (10 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Version reported in the user agent when `VERSION` is unset.
const DEFAULT_VERSION: &str = "0.0.0";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The params file could not be read.
    #[error("cannot read params file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The params file is not valid YAML or is missing fields.
    #[error("invalid params: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A required credential is not set.
    #[error("missing required setting {0} (set it in the environment or in .env)")]
    MissingSetting(&'static str),

    /// The trigger pattern does not compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The feed target names nothing.
    #[error("invalid subreddit {0:?}")]
    InvalidFeed(String),
}

/// A credential whose value must never reach a log line.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Returns the secret value. Only HTTP authentication should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(**********)")
    }
}

/// The behavioral parameters of the bot, read from the YAML params file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotParams {
    /// If true, all logic runs but no replies are posted.
    #[serde(default)]
    pub dry_run: bool,

    /// The comment pattern that triggers this bot (compiled case-insensitively).
    pub pattern: String,

    /// The reply markdown, posted verbatim.
    pub reply: String,

    /// The subreddit to stream comments from, or `u/<name>` for a user's profile feed.
    pub subreddit: String,

    /// The minimum amount of time between replies.
    #[serde(default = "default_timeout", deserialize_with = "duration::deserialize")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

impl BotParams {
    /// Parses params from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads and parses a YAML params file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text)
    }

    /// Compiles the trigger pattern.
    pub fn matcher(&self) -> Result<TextMatcher, ConfigError> {
        Ok(TextMatcher::new(&self.pattern)?)
    }

    /// Resolves the configured feed.
    pub fn feed(&self) -> Result<FeedTarget, ConfigError> {
        FeedTarget::parse(&self.subreddit)
    }
}

/// The feed the bot listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedTarget {
    /// All comments in a subreddit.
    Subreddit(String),
    /// Comments on a user's profile posts.
    User(String),
}

impl FeedTarget {
    /// Parses a feed name.
    ///
    /// The name is lowercased. If it contains `u/`, everything after the first
    /// `u/` names a user; otherwise the whole name is a subreddit. A leading
    /// `r/` or `/r/` is accepted for subreddits.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let lowered = name.trim().to_lowercase();
        let target = match lowered.split_once("u/") {
            Some((_, user)) => FeedTarget::User(user.trim_matches('/').to_string()),
            None => {
                let subreddit = lowered
                    .trim_start_matches('/')
                    .trim_start_matches("r/")
                    .trim_matches('/');
                FeedTarget::Subreddit(subreddit.to_string())
            }
        };
        match &target {
            FeedTarget::Subreddit(n) | FeedTarget::User(n) if n.is_empty() => {
                Err(ConfigError::InvalidFeed(name.to_string()))
            }
            _ => Ok(target),
        }
    }

    /// The subreddit whose comment listing serves this feed. A user's profile
    /// posts live in the `u_<name>` subreddit.
    pub fn subreddit_name(&self) -> String {
        match self {
            FeedTarget::Subreddit(name) => name.clone(),
            FeedTarget::User(name) => format!("u_{}", name),
        }
    }
}

impl fmt::Display for FeedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedTarget::Subreddit(name) => write!(f, "r/{}", name),
            FeedTarget::User(name) => write!(f, "u/{}", name),
        }
    }
}

/// Script-app credentials, read from the environment.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// The client id. See <https://www.reddit.com/prefs/apps>.
    pub client_id: String,
    /// The client secret.
    pub client_secret: Secret,
    /// The bot account's username.
    pub username: String,
    /// The bot account's password.
    pub password: Secret,
    /// The bot's version, reported in the user agent.
    pub version: String,
}

impl Credentials {
    /// Reads credentials from the process environment, after loading `.env`
    /// from the working directory if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; the variables may be set directly.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads credentials through `lookup`. Each setting is looked up by its
    /// upper-case name first, then its lower-case name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| -> Option<String> {
            lookup(key)
                .or_else(|| lookup(&key.to_lowercase()))
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingSetting(key));

        Ok(Credentials {
            client_id: require("CLIENT_ID")?,
            client_secret: Secret::new(require("CLIENT_SECRET")?),
            username: require("USERNAME")?,
            password: Secret::new(require("PASSWORD")?),
            version: get("VERSION").unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        })
    }

    /// The unique user agent string for the bot.
    pub fn user_agent(&self) -> String {
        format!("{}-{}-{}", self.username, self.client_id, self.version)
    }
}

/// Complete configuration: credentials plus params.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub credentials: Credentials,
    pub params: BotParams,
}

impl BotConfig {
    /// Loads params from `params_path` and credentials from the environment.
    pub fn load(params_path: &Path) -> Result<Self, ConfigError> {
        let params = BotParams::load(params_path)?;
        let credentials = Credentials::from_env()?;
        Ok(BotConfig {
            credentials,
            params,
        })
    }
}

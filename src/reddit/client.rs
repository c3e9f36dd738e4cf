//! HTTP client for Reddit's OAuth API.
//!
//! `RedditClient` authenticates as a script app with the password grant,
//! refreshes its bearer token shortly before it expires, and implements
//! [`RedditApi`] against `oauth.reddit.com`.

use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::{Credentials, FeedTarget};
use crate::types::{Comment, CommentId, Identity, OwnReply};

use super::api::RedditApi;
use super::error::RedditApiError;
use super::feed::{QuietBackoff, SeenIds, take_unseen};
use super::listing::{
    CommentData, JsonResponse, Listing, MeData, PostedThings, SubmissionData, TokenData,
    comment_children,
};
use super::retry::{RetryConfig, RetryPolicy, retry_with_backoff};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const OAUTH_BASE: &str = "https://oauth.reddit.com";

/// Page size for listings. Reddit caps listings at 100 items.
const PAGE_LIMIT: &str = "100";

/// Tokens are refreshed this long before Reddit says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Assumed token lifetime when Reddit does not state a usable one.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Timeout for a single HTTP request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// A Reddit API client logged in as the bot account.
pub struct RedditClient {
    http: reqwest::Client,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
}

impl RedditClient {
    /// Creates a client. No request is made until the first API call.
    pub fn new(credentials: Credentials) -> Result<Self, RedditApiError> {
        let http = reqwest::Client::builder()
            .user_agent(credentials.user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(RedditApiError::from_reqwest)?;
        Ok(RedditClient {
            http,
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Returns a valid bearer token, fetching a new one if needed.
    async fn bearer(&self) -> Result<String, RedditApiError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref()
            && Instant::now() < current.refresh_at
        {
            return Ok(current.value.clone());
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken, RedditApiError> {
        debug!(username = %self.credentials.username, "Fetching access token");
        let request = self
            .http
            .post(TOKEN_URL)
            .basic_auth(
                &self.credentials.client_id,
                Some(self.credentials.client_secret.expose()),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.expose()),
            ]);
        let data: TokenData = send_json(request).await?;

        match (data.access_token, data.error) {
            (Some(value), None) => Ok(AccessToken {
                value,
                refresh_at: refresh_deadline(Instant::now(), data.expires_in),
            }),
            (_, Some(error)) => Err(RedditApiError::permanent(format!(
                "token request rejected: {}",
                error
            ))),
            (None, None) => Err(RedditApiError::permanent(
                "token response carried no access token",
            )),
        }
    }

    /// Forgets the cached token so the next call fetches a new one.
    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RedditApiError> {
        let bearer = self.bearer().await?;
        let request = self
            .http
            .get(format!("{}{}", OAUTH_BASE, path))
            .bearer_auth(bearer)
            .query(&[("raw_json", "1")])
            .query(query);
        self.authorized(request).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, RedditApiError> {
        let bearer = self.bearer().await?;
        let request = self
            .http
            .post(format!("{}{}", OAUTH_BASE, path))
            .bearer_auth(bearer)
            .form(form);
        self.authorized(request).await
    }

    /// Sends an authorized request. A 401 means the token went stale early;
    /// it is dropped and the error is reported as transient so a retry
    /// re-authenticates.
    async fn authorized<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RedditApiError> {
        match send_json(request).await {
            Err(e) if e.status_code == Some(401) => {
                self.invalidate_token().await;
                Err(RedditApiError::transient(format!(
                    "access token rejected: {}",
                    e.message
                )))
            }
            other => other,
        }
    }

    async fn fetch_own_page(
        &self,
        me: &str,
        after: Option<&str>,
    ) -> Result<(Vec<OwnReply>, Option<String>), RedditApiError> {
        let path = format!("/user/{}/comments", me);
        let mut query = vec![("sort", "new"), ("limit", PAGE_LIMIT)];
        if let Some(after) = after {
            query.push(("after", after));
        }
        let listing: Listing<CommentData> = self.get(&path, &query).await?;
        Ok(comment_children(listing, CommentData::into_own_reply))
    }

    async fn fetch_newest_comments(&self, subreddit: &str) -> Result<Vec<Comment>, RedditApiError> {
        let path = format!("/r/{}/comments", subreddit);
        let listing: Listing<CommentData> = self.get(&path, &[("limit", PAGE_LIMIT)]).await?;
        let (comments, _) = comment_children(listing, CommentData::into_comment);
        Ok(comments)
    }
}

impl std::fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditClient")
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}

/// When a token issued at `now` with the given `expires_in` should be replaced.
fn refresh_deadline(now: Instant, expires_in: Option<u64>) -> Instant {
    let lifetime = expires_in.map_or(DEFAULT_TOKEN_LIFETIME, Duration::from_secs);
    now.checked_add(lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN))
        .unwrap_or_else(|| now + DEFAULT_TOKEN_LIFETIME.saturating_sub(TOKEN_EXPIRY_MARGIN))
}

/// Sends a request and decodes a JSON body, mapping non-2xx statuses to errors.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, RedditApiError> {
    let response = request.send().await.map_err(RedditApiError::from_reqwest)?;
    let response = check_status(response).await?;
    response.json().await.map_err(RedditApiError::from_reqwest)
}

async fn check_status(response: Response) -> Result<Response, RedditApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let message = if body.is_empty() {
        reason.to_string()
    } else {
        format!("{}: {}", reason, body.chars().take(200).collect::<String>())
    };
    Err(RedditApiError::from_status(status.as_u16(), message))
}

/// Pagination state for the own-reply stream.
struct OwnPages {
    buffer: VecDeque<OwnReply>,
    after: Option<String>,
    exhausted: bool,
}

/// Polling state for the live comment stream.
struct FeedPoll {
    subreddit: String,
    seen: SeenIds,
    pending: VecDeque<Comment>,
    backoff: QuietBackoff,
    first_poll: bool,
    failed: bool,
}

impl RedditApi for RedditClient {
    async fn me(&self) -> Result<Identity, RedditApiError> {
        let me: MeData = retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, || {
            self.get("/api/v1/me", &[])
        })
        .await?;
        Ok(Identity::new(me.name))
    }

    fn own_replies_newest_first<'a>(
        &'a self,
        me: &Identity,
    ) -> BoxStream<'a, Result<OwnReply, RedditApiError>> {
        let me = me.as_str().to_string();
        let initial = OwnPages {
            buffer: VecDeque::new(),
            after: None,
            exhausted: false,
        };

        stream::unfold(initial, move |mut pages| {
            let me = me.clone();
            async move {
                loop {
                    if let Some(reply) = pages.buffer.pop_front() {
                        return Some((Ok(reply), pages));
                    }
                    if pages.exhausted {
                        return None;
                    }

                    let after = pages.after.clone();
                    let fetched =
                        retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, || {
                            self.fetch_own_page(&me, after.as_deref())
                        })
                        .await;
                    match fetched {
                        Ok((replies, next)) => {
                            trace!(count = replies.len(), "Fetched own-reply page");
                            // A page of only malformed entries still advances the cursor.
                            pages.exhausted = next.is_none() || next == after;
                            pages.after = next;
                            pages.buffer.extend(replies);
                        }
                        Err(e) => {
                            pages.exhausted = true;
                            return Some((Err(e), pages));
                        }
                    }
                }
            }
        })
        .boxed()
    }

    fn stream_comments<'a>(
        &'a self,
        feed: &FeedTarget,
    ) -> BoxStream<'a, Result<Comment, RedditApiError>> {
        let initial = FeedPoll {
            subreddit: feed.subreddit_name(),
            seen: SeenIds::default(),
            pending: VecDeque::new(),
            backoff: QuietBackoff::new(),
            first_poll: true,
            failed: false,
        };

        stream::unfold(initial, move |mut poll| async move {
            loop {
                if let Some(comment) = poll.pending.pop_front() {
                    return Some((Ok(comment), poll));
                }
                if poll.failed {
                    return None;
                }
                if !poll.first_poll {
                    tokio::time::sleep(poll.backoff.next_delay()).await;
                }
                poll.first_poll = false;

                let fetched = retry_with_backoff(RetryConfig::FEED, RetryPolicy::RetryTransient, || {
                    self.fetch_newest_comments(&poll.subreddit)
                })
                .await;
                match fetched {
                    Ok(newest_first) => {
                        let fresh = take_unseen(&mut poll.seen, newest_first, |c| &c.id);
                        trace!(
                            subreddit = %poll.subreddit,
                            fresh = fresh.len(),
                            "Polled comment feed"
                        );
                        if !fresh.is_empty() {
                            poll.backoff.reset();
                        }
                        poll.pending.extend(fresh);
                    }
                    Err(e) => {
                        poll.failed = true;
                        return Some((Err(e), poll));
                    }
                }
            }
        })
        .boxed()
    }

    async fn reply(&self, target: &Comment, body: &str) -> Result<CommentId, RedditApiError> {
        let thing_id = target.id.fullname().to_string();
        let form = [
            ("api_type", "json"),
            ("thing_id", thing_id.as_str()),
            ("text", body),
        ];
        let response: JsonResponse<PostedThings> =
            retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::NoRetry, || {
                self.post_form("/api/comment", &form)
            })
            .await?;

        if !response.json.errors.is_empty() {
            return Err(RedditApiError::from_api_errors(&response.json.errors));
        }
        response
            .json
            .data
            .and_then(|data| data.things.into_iter().next())
            .map(|thing| CommentId::new(thing.data.id))
            .ok_or_else(|| RedditApiError::permanent("comment response carried no comment"))
    }

    async fn submission_title(&self, comment: &Comment) -> Result<String, RedditApiError> {
        if let Some(title) = &comment.submission_title {
            return Ok(title.clone());
        }
        let id = comment.submission.fullname().to_string();
        let query = [("id", id.as_str())];
        let listing: Listing<SubmissionData> =
            retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, || {
                self.get("/api/info", &query)
            })
            .await?;
        listing
            .data
            .children
            .into_iter()
            .next()
            .map(|thing| thing.data.title)
            .ok_or_else(|| RedditApiError::permanent(format!("submission {} not found", id)))
    }
}

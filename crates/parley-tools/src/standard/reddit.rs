use async_trait::async_trait;
use parley_core::{ExecutionResult, Tool, ToolId};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ENV_CLIENT_ID: &str = "REDDIT_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "REDDIT_CLIENT_SECRET";
pub const ENV_USER_AGENT: &str = "REDDIT_USER_AGENT";

/// Entry reported in place of titles when no credentials are configured.
pub const CREDENTIALS_MISSING: &str = "Error: Reddit API credentials not configured.";

/// Posts fetched when the caller gives no limit.
pub const DEFAULT_POST_LIMIT: u64 = 5;

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Reddit API credentials not configured")]
    MissingCredentials,
    #[error("{0}")]
    Request(String),
}

/// Where hot post titles come from.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Titles of up to `limit` hot posts in `subreddit`, hottest first.
    async fn hot_titles(&self, subreddit: &str, limit: u64) -> Result<Vec<String>, FetchError>;
}

/// Script-app credentials for the Reddit API.
#[derive(Clone)]
pub struct RedditCredentials {
    client_id: String,
    client_secret: String,
    user_agent: String,
}

impl RedditCredentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Read the three `REDDIT_*` variables through `lookup`. Returns `None`
    /// unless all of them are set and non-blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Some(Self::new(
            read(ENV_CLIENT_ID)?,
            read(ENV_CLIENT_SECRET)?,
            read(ENV_USER_AGENT)?,
        ))
    }

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Deserialize)]
struct Post {
    title: String,
}

/// Reddit API client using application-only OAuth.
///
/// Every fetch requests a fresh token; the scout makes one call per
/// question, so there is nothing worth caching.
#[derive(Clone)]
pub struct RedditClient {
    http: Client,
    credentials: Option<RedditCredentials>,
}

impl RedditClient {
    pub fn new(credentials: Option<RedditCredentials>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, credentials }
    }

    pub fn from_env() -> Self {
        Self::new(RedditCredentials::from_env())
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    async fn access_token(&self, credentials: &RedditCredentials) -> Result<String, FetchError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(reqwest::header::USER_AGENT, &credentials.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| FetchError::Request(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Request(format!("token request returned {status}")));
        }

        let token: AccessToken = response
            .json()
            .await
            .map_err(|e| FetchError::Request(format!("unreadable token response: {e}")))?;
        Ok(token.access_token)
    }
}

impl std::fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditClient")
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

#[async_trait]
impl PostSource for RedditClient {
    async fn hot_titles(&self, subreddit: &str, limit: u64) -> Result<Vec<String>, FetchError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(FetchError::MissingCredentials)?;
        let token = self.access_token(credentials).await?;

        let url = format!("{API_BASE}/r/{subreddit}/hot");
        debug!(subreddit, limit, "Fetching hot posts");
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, &credentials.user_agent)
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| FetchError::Request(format!("listing request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Request(format!(
                "r/{subreddit} returned {status}"
            )));
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| FetchError::Request(format!("unreadable listing: {e}")))?;
        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.title)
            .take(limit as usize)
            .collect())
    }
}

/// Hot post titles from one subreddit.
///
/// The payload always maps the subreddit name to a list of strings. When
/// there are no titles to report, the list holds one entry saying why, so
/// the agent relays it like any other result.
pub struct GetRedditNewsTool {
    id: ToolId,
    source: Arc<dyn PostSource>,
}

impl GetRedditNewsTool {
    pub fn new(source: Arc<dyn PostSource>) -> Self {
        Self {
            id: ToolId::new_unchecked("get_reddit_cs_news"),
            source,
        }
    }

    /// Backed by the live API with credentials from the environment.
    pub fn from_env() -> Self {
        Self::new(Arc::new(RedditClient::from_env()))
    }
}

/// `r/rust` and ` rust ` both name `rust`.
fn subreddit_name(raw: &str) -> &str {
    let name = raw.trim();
    name.strip_prefix("r/")
        .or_else(|| name.strip_prefix("/r/"))
        .unwrap_or(name)
}

#[async_trait]
impl Tool for GetRedditNewsTool {
    fn id(&self) -> &ToolId {
        &self.id
    }

    fn description(&self) -> &str {
        "Fetches the titles of the top hot posts from a subreddit."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "subreddit": { "type": "string", "pattern": "^(/?r/)?[A-Za-z0-9_]+$" },
                "limit": { "type": "integer", "minimum": 1, "maximum": 100 }
            },
            "required": ["subreddit"]
        })
    }

    async fn call(&self, input: Value) -> ExecutionResult {
        let subreddit = subreddit_name(
            input
                .get("subreddit")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        let limit = input
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_POST_LIMIT);
        info!(tool = "get_reddit_cs_news", subreddit, limit, "Fetching subreddit");

        let entries = match self.source.hot_titles(subreddit, limit).await {
            Ok(titles) if titles.is_empty() => {
                vec![format!("No recent hot posts found in r/{subreddit}.")]
            }
            Ok(titles) => titles,
            Err(FetchError::MissingCredentials) => {
                warn!(tool = "get_reddit_cs_news", "Reddit API credentials missing");
                vec![CREDENTIALS_MISSING.to_string()]
            }
            Err(FetchError::Request(e)) => {
                warn!(tool = "get_reddit_cs_news", subreddit, error = %e, "Reddit fetch failed");
                vec![format!("An unexpected error occurred. Details: {e}")]
            }
        };

        let mut payload = Map::new();
        payload.insert(subreddit.to_string(), json!(entries));
        ExecutionResult::success(Value::Object(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Fixed(Result<Vec<String>, FetchError>);

    #[async_trait]
    impl PostSource for Fixed {
        async fn hot_titles(&self, _: &str, limit: u64) -> Result<Vec<String>, FetchError> {
            self.0
                .clone()
                .map(|titles| titles.into_iter().take(limit as usize).collect())
        }
    }

    fn tool(source: Result<Vec<String>, FetchError>) -> GetRedditNewsTool {
        GetRedditNewsTool::new(Arc::new(Fixed(source)))
    }

    #[tokio::test]
    async fn titles_are_keyed_by_subreddit() {
        let titles = vec!["First".to_string(), "Second".to_string(), "Third".to_string()];
        let result = tool(Ok(titles))
            .call(json!({"subreddit": "r/rust", "limit": 2}))
            .await;
        assert_eq!(result.payload(), Some(&json!({"rust": ["First", "Second"]})));
    }

    #[tokio::test]
    async fn missing_credentials_are_reported_in_the_payload() {
        let client = RedditClient::new(RedditCredentials::from_lookup(|_| None));
        assert!(!client.has_credentials());

        let result = GetRedditNewsTool::new(Arc::new(client))
            .call(json!({"subreddit": "cscareerquestions", "limit": 3}))
            .await;
        assert_eq!(
            result.payload(),
            Some(&json!({"cscareerquestions": [CREDENTIALS_MISSING]}))
        );
    }

    #[tokio::test]
    async fn empty_listing_says_so() {
        let result = tool(Ok(Vec::new()))
            .call(json!({"subreddit": "compsci"}))
            .await;
        assert_eq!(
            result.payload(),
            Some(&json!({"compsci": ["No recent hot posts found in r/compsci."]}))
        );
    }

    #[tokio::test]
    async fn request_failures_keep_the_details() {
        let result = tool(Err(FetchError::Request("r/nope returned 404".into())))
            .call(json!({"subreddit": "nope"}))
            .await;
        assert_eq!(
            result.payload(),
            Some(&json!({"nope": ["An unexpected error occurred. Details: r/nope returned 404"]}))
        );
    }

    #[rstest]
    #[case(&[], false)]
    #[case(&[ENV_CLIENT_ID, ENV_CLIENT_SECRET], false)]
    #[case(&[ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_USER_AGENT], true)]
    fn credentials_need_all_three_variables(#[case] set: &[&str], #[case] present: bool) {
        let credentials =
            RedditCredentials::from_lookup(|name| set.contains(&name).then(|| "value".to_string()));
        assert_eq!(credentials.is_some(), present);
    }

    #[test]
    fn blank_variables_count_as_missing() {
        let credentials = RedditCredentials::from_lookup(|name| {
            Some(if name == ENV_USER_AGENT { "  " } else { "value" }.to_string())
        });
        assert!(credentials.is_none());
    }

    #[test]
    fn debug_hides_the_secret() {
        let credentials = RedditCredentials::new("id", "hunter2", "parley/0.2");
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }

    #[rstest]
    #[case("r/rust", "rust")]
    #[case("/r/rust", "rust")]
    #[case(" programming ", "programming")]
    fn subreddit_prefixes_are_stripped(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(subreddit_name(raw), expected);
    }
}

//! Rule-based completion clients for the `offline` provider.
//!
//! These clients need no model and no credentials. They drive the demo
//! scenarios from the command line and the shared test fixtures:
//!
//! - [`ToolReporter`] calls one tool with input taken from the user's text
//!   and reports the outcome back verbatim
//! - [`Router`] delegates on keywords and falls through to another client
//! - [`Drafter`] and [`Reviewer`] play the two sides of a review loop

use async_trait::async_trait;
use parley_core::{AgentId, Message, Role, ToolId, ToolOutcome};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use crate::completion::{Completion, CompletionClient, CompletionRequest};
use crate::error::CompletionError;

/// Words that make a message a greeting.
pub const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "greetings"];

/// Words that make a message a farewell.
pub const FAREWELL_WORDS: &[&str] = &["bye", "goodbye", "farewell", "later"];

const KNOWN_CITIES: &[&str] = &["new york", "london", "tokyo"];

type InputBuilder = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;
type PayloadFormat = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Calls a single tool, then answers with what it returned.
///
/// On a fresh turn the input builder runs over the latest user text. If it
/// yields nothing the client answers with its fallback text instead of
/// calling the tool. Once the tool outcome is the newest message, the
/// client replies with the payload (or its `report` field) or the error
/// message. A payload formatter, when set, gets the first say on a
/// successful payload.
#[derive(Clone)]
pub struct ToolReporter {
    tool: ToolId,
    input: InputBuilder,
    format: Option<PayloadFormat>,
    unhandled: String,
}

impl ToolReporter {
    pub fn new<F>(tool: ToolId, input: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            tool,
            input: Arc::new(input),
            format: None,
            unhandled: "Sorry, I can't help with that.".to_string(),
        }
    }

    /// Render successful payloads with `format`; `None` falls back to the
    /// plain report.
    pub fn with_format<F>(mut self, format: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.format = Some(Arc::new(format));
        self
    }

    /// Reply used when the input builder declines.
    pub fn with_unhandled(mut self, text: impl Into<String>) -> Self {
        self.unhandled = text.into();
        self
    }

    /// Reporter for `get_weather`, reading the city from the user's text.
    pub fn weather(tool: ToolId) -> Self {
        Self::new(tool, |text| extract_city(text).map(|city| json!({ "city": city })))
            .with_unhandled("I can tell you the weather in a city, for example: weather in London.")
    }

    /// Reporter for `say_hello`, passing a name when the user gave one.
    pub fn greeting(tool: ToolId) -> Self {
        Self::new(tool, |text| {
            Some(match extract_name(text) {
                Some(name) => json!({ "name": name }),
                None => json!({}),
            })
        })
    }

    /// Reporter for `get_reddit_cs_news`: reads `r/<name>` and an optional
    /// `limit N` from the user's text and lists the titles under the
    /// subreddit name.
    pub fn subreddit_scout(tool: ToolId) -> Self {
        Self::new(tool, |text| {
            let subreddit = extract_subreddit(text)?;
            Some(match extract_limit(text) {
                Some(limit) => json!({ "subreddit": subreddit, "limit": limit.clamp(1, 100) }),
                None => json!({ "subreddit": subreddit }),
            })
        })
        .with_format(bulleted_titles)
        .with_unhandled(
            "Tell me which subreddit to scout, for example: top posts from r/programming.",
        )
    }

    /// Reporter for a tool that takes no arguments.
    pub fn no_arguments(tool: ToolId) -> Self {
        Self::new(tool, |_| Some(json!({})))
    }

    fn own_outcome<'r>(&self, request: &'r CompletionRequest) -> Option<&'r Message> {
        request.last_message().filter(|m| {
            m.role() == Role::Tool
                && m.tool_id() == Some(&self.tool)
                && m.is_from_agent(&request.agent)
        })
    }
}

impl std::fmt::Debug for ToolReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolReporter")
            .field("tool", &self.tool)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionClient for ToolReporter {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        if let Some(message) = self.own_outcome(&request) {
            let outcome: ToolOutcome = serde_json::from_str(message.text())
                .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
            let formatted = match (&outcome, &self.format) {
                (ToolOutcome::Success { payload }, Some(format)) => format(payload),
                _ => None,
            };
            return Ok(Completion::text(
                formatted.unwrap_or_else(|| report_text(&outcome)),
            ));
        }

        let text = request.last_user_text().unwrap_or_default();
        match (self.input)(text) {
            Some(input) => Ok(Completion::tool_call(self.tool.clone(), input)),
            None => Ok(Completion::text(self.unhandled.clone())),
        }
    }
}

fn report_text(outcome: &ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Success { payload } => payload
            .get("report")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| outcome.payload_text())
            .unwrap_or_default(),
        ToolOutcome::Error { error_message } => error_message.clone(),
    }
}

// `{"rust": ["a", "b"]}` becomes a bulleted list under `r/rust:`.
fn bulleted_titles(payload: &Value) -> Option<String> {
    let (subreddit, titles) = payload.as_object()?.iter().next()?;
    let mut text = format!("r/{subreddit}:");
    for title in titles.as_array()? {
        text.push_str("\n- ");
        text.push_str(title.as_str()?);
    }
    Some(text)
}

struct Route {
    words: Vec<String>,
    target: AgentId,
}

/// Delegates a fresh user message to the first sub-agent whose keywords it
/// contains; anything else goes to the fallback client.
pub struct Router {
    routes: Vec<Route>,
    fallback: Arc<dyn CompletionClient>,
}

impl Router {
    pub fn new(fallback: Arc<dyn CompletionClient>) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    pub fn route<I, S>(mut self, words: I, target: AgentId) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.routes.push(Route {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
            target,
        });
        self
    }

    fn pick(&self, request: &CompletionRequest) -> Option<&AgentId> {
        let latest = request.last_message().filter(|m| m.role() == Role::User)?;
        let words = words_of(latest.text());
        self.routes
            .iter()
            .filter(|route| request.delegates.iter().any(|d| d.id == route.target))
            .find(|route| route.words.iter().any(|w| words.contains(w)))
            .map(|route| &route.target)
    }
}

#[async_trait]
impl CompletionClient for Router {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        match self.pick(&request) {
            Some(target) => {
                debug!(agent = %request.agent, target = %target, "Routing to delegate");
                Ok(Completion::delegate(target.clone()))
            }
            None => self.fallback.complete(request).await,
        }
    }
}

/// Writes numbered drafts of the user's task, folding in the latest
/// feedback from other agents.
#[derive(Debug, Clone, Default)]
pub struct Drafter;

#[async_trait]
impl CompletionClient for Drafter {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let task = request.last_user_text().unwrap_or_default().trim().to_string();
        let since_input = since_last_user(&request.history);
        let drafts = since_input
            .iter()
            .filter(|m| m.role() == Role::Agent && m.is_from_agent(&request.agent))
            .count();
        let feedback = since_input
            .iter()
            .rev()
            .find(|m| m.role() == Role::Agent && !m.is_from_agent(&request.agent));

        let text = match feedback {
            Some(feedback) => format!(
                "Draft {} of \"{task}\", revised after: {}",
                drafts + 1,
                feedback.text()
            ),
            None => format!("Draft {} of \"{task}\"", drafts + 1),
        };
        Ok(Completion::text(text))
    }
}

/// Gives feedback until enough drafts from other agents have arrived, then
/// answers with the approval keyword alone.
#[derive(Debug, Clone)]
pub struct Reviewer {
    approve_after: usize,
    keyword: String,
}

impl Reviewer {
    pub fn new(approve_after: usize) -> Self {
        Self {
            approve_after,
            keyword: "APPROVE".to_string(),
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = keyword.into();
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }
}

#[async_trait]
impl CompletionClient for Reviewer {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        let drafts = since_last_user(&request.history)
            .iter()
            .filter(|m| m.role() == Role::Agent && !m.is_from_agent(&request.agent))
            .count();

        if drafts >= self.approve_after {
            Ok(Completion::text(self.keyword.clone()))
        } else {
            Ok(Completion::text(format!(
                "Draft {drafts} needs work: use more concrete imagery and keep it brief."
            )))
        }
    }
}

fn since_last_user(history: &[Message]) -> &[Message] {
    match history.iter().rposition(|m| m.role() == Role::User) {
        Some(at) => &history[at + 1..],
        None => history,
    }
}

fn words_of(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True if `text` contains one of `words` as a whole word, ignoring case.
pub fn mentions_any(text: &str, words: &[&str]) -> bool {
    let found = words_of(text);
    words.iter().any(|w| found.iter().any(|f| f == w))
}

/// City named in a weather question.
///
/// Known cities are matched anywhere; otherwise the words after a final
/// " in " are taken, so "weather in Paris?" yields `Paris`.
pub fn extract_city(text: &str) -> Option<String> {
    if let Some(city) = KNOWN_CITIES
        .iter()
        .find(|c| positions_of(text, c).next().is_some())
    {
        return Some(title_case(city));
    }

    let at = positions_of(text, " in ").next_back()?;
    let city = text
        .get(at + 4..)?
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim();
    (!city.is_empty()).then(|| city.to_string())
}

/// Name to greet: one the user introduced themselves with, else the word
/// right after an opening greeting ("Hello there!" yields `there`).
pub fn extract_name(text: &str) -> Option<String> {
    let introduced = ["my name is ", "i'm ", "i am ", "this is "]
        .iter()
        .find_map(|lead| positions_of(text, lead).next().map(|at| at + lead.len()))
        .and_then(|start| text.get(start..))
        .and_then(first_word);
    if introduced.is_some() {
        return introduced;
    }

    let mut words = text.split_whitespace();
    let opener = words.next()?;
    if !mentions_any(opener, GREETING_WORDS) {
        return None;
    }
    words.next().and_then(first_word)
}

/// Subreddit named as `r/<name>` anywhere in the text.
pub fn extract_subreddit(text: &str) -> Option<String> {
    text.split_whitespace().find_map(|word| {
        let word = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
        let at = positions_of(word, "r/").next()?;
        let name = word.get(at + 2..)?;
        (!name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
            .then(|| name.to_string())
    })
}

/// Count given as `limit N` or `top N`.
pub fn extract_limit(text: &str) -> Option<u64> {
    ["limit", "top "].iter().find_map(|lead| {
        let at = positions_of(text, lead).next()?;
        let rest = text
            .get(at + lead.len()..)?
            .trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == '=');
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        digits.parse().ok()
    })
}

// Byte offsets in `text` where the lowercase ASCII `needle` starts, ignoring
// case. Offsets always index `text` itself, never a lowercased copy.
fn positions_of<'a>(
    text: &'a str,
    needle: &'a str,
) -> impl DoubleEndedIterator<Item = usize> + 'a {
    text.char_indices().map(|(at, _)| at).filter(move |&at| {
        text.get(at..at + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle))
    })
}

fn first_word(text: &str) -> Option<String> {
    let word: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '\'')
        .collect();
    (!word.is_empty()).then_some(word)
}

fn title_case(words: &str) -> String {
    words
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

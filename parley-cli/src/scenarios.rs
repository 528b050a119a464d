use futures::StreamExt;
use parley_agent::offline::ToolReporter;
use parley_agent::{Agent, AgentTeam, ParleyConfig, Runner, RunnerError, StopReason};
use parley_core::{Message, Role};
use parley_testing::fixtures;
use parley_tools::PostSource;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use crate::CliError;

pub const DEFAULT_TEAM_QUERIES: &[&str] = &[
    "Hello there!",
    "What is the weather in New York?",
    "Thanks, bye!",
];

pub const DEFAULT_WEATHER_QUERIES: &[&str] = &[
    "What is the weather like in London?",
    "How about Paris?",
    "Tell me the weather in New York",
];

pub const DEFAULT_REDDIT_QUERIES: &[&str] =
    &["Show me the top posts from r/cscareerquestions, limit 3"];

/// Root weather agent with its greeting and farewell specialists.
pub async fn run_team<W: Write>(
    config: ParleyConfig,
    queries: &[String],
    out: &mut W,
) -> Result<(), CliError> {
    let mut runner = fixtures::weather_runner(config).build()?;
    ask_each(&mut runner, queries, out).await
}

/// A lone weather agent with no delegates.
pub async fn run_weather<W: Write>(
    config: ParleyConfig,
    queries: &[String],
    out: &mut W,
) -> Result<(), CliError> {
    let get_weather = fixtures::tool_id("get_weather");
    let agent = Agent::new(
        fixtures::agent_id("weather_agent"),
        Arc::new(ToolReporter::weather(get_weather.clone())),
    )
    .with_description("Provides weather information for specific cities.")
    .with_instruction(
        "You are a helpful weather assistant. When the user asks for the weather in a specific \
         city, use the 'get_weather' tool. If the tool returns an error, inform the user politely.",
    )
    .with_tool(get_weather);

    let team = AgentTeam::new([config.configure(agent)])?;
    let mut runner = Runner::builder()
        .team(team)
        .tools(fixtures::standard_tools_with(&config))
        .config(config)
        .build()?;
    ask_each(&mut runner, queries, out).await
}

/// Subreddit scout reading hot posts from `source`.
pub async fn run_reddit<W: Write>(
    config: ParleyConfig,
    source: Arc<dyn PostSource>,
    queries: &[String],
    out: &mut W,
) -> Result<(), CliError> {
    let mut runner = fixtures::reddit_runner(config, source).build()?;
    ask_each(&mut runner, queries, out).await
}

/// Primary and critic taking turns until the critic approves.
pub async fn run_round_robin<W: Write>(
    config: ParleyConfig,
    task: &str,
    approve_after: usize,
    out: &mut W,
) -> Result<(), CliError> {
    let mut runner = fixtures::critic_runner(config, approve_after).build()?;
    let stop = stream_run(&mut runner, task, out).await?;
    match stop {
        StopReason::Terminated(reason) => writeln!(out, "--- Terminated: {reason}")?,
        StopReason::AwaitingInput => writeln!(out, "--- Awaiting input")?,
        StopReason::Cancelled => writeln!(out, "--- Cancelled")?,
    }
    Ok(())
}

async fn ask_each<W: Write>(
    runner: &mut Runner,
    queries: &[String],
    out: &mut W,
) -> Result<(), CliError> {
    for query in queries {
        match stream_run(runner, query, out).await? {
            StopReason::AwaitingInput => {}
            StopReason::Cancelled => {
                writeln!(out, "--- Cancelled")?;
                break;
            }
            StopReason::Terminated(reason) => {
                writeln!(out, "--- Terminated: {reason}")?;
                break;
            }
        }
    }
    info!(session = %runner.session_key(), "Session finished");
    Ok(())
}

/// Print every message of one run as it arrives.
async fn stream_run<W: Write>(
    runner: &mut Runner,
    task: &str,
    out: &mut W,
) -> Result<StopReason, CliError> {
    let token = runner.cancellation_token();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let mut last_agent: Option<Message> = None;
    let result: Result<(), CliError> = async {
        let stream = runner.run(task);
        futures::pin_mut!(stream);
        while let Some(message) = stream.next().await {
            let message = message.map_err(|e: RunnerError| {
                warn!(error = %e, code = e.error_code(), "Run failed");
                e
            })?;
            print_message(&message, out)?;
            if message.role() == Role::Agent {
                last_agent = Some(message);
            }
        }
        Ok(())
    }
    .await;
    watcher.abort();
    result?;

    if let Some(message) = last_agent {
        writeln!(out, "<<< {}: {}", message.author(), message.text())?;
    }
    Ok(runner.last_stop_reason().clone())
}

fn print_message<W: Write>(message: &Message, out: &mut W) -> std::io::Result<()> {
    match message.role() {
        Role::User => writeln!(out, "\n>>> User: {}", message.text()),
        Role::Tool | Role::Agent => writeln!(out, "    {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline() -> ParleyConfig {
        ParleyConfig::offline("offline-rules")
    }

    fn queries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn team_transcript_shows_delegated_greeting() {
        let mut out = Vec::new();
        run_team(offline(), &queries(DEFAULT_TEAM_QUERIES), &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains(">>> User: Hello there!"));
        assert!(text.contains("<<< greeting_agent: Hello, there!"));
        assert!(text.contains("<<< weather_agent_v2: The weather in New York is sunny"));
        assert!(text.contains("<<< farewell_agent: Goodbye! Have a great day."));
    }

    #[tokio::test]
    async fn weather_transcript_reports_unknown_city() {
        let mut out = Vec::new();
        run_weather(offline(), &queries(&["Weather in Paris?"]), &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<<< weather_agent: Sorry, I don't have weather information for 'Paris'."));
    }

    #[tokio::test]
    async fn reddit_transcript_lists_titles() {
        let posts = parley_testing::StaticPosts::new()
            .with_listing("cscareerquestions", ["Offer negotiation", "Weekly thread", "Layoffs"]);
        let mut out = Vec::new();
        run_reddit(
            offline(),
            Arc::new(posts),
            &queries(DEFAULT_REDDIT_QUERIES),
            &mut out,
        )
        .await
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<<< reddit_scout_agent: r/cscareerquestions:\n- Offer negotiation"));
        assert!(text.contains("- Layoffs"));
    }

    #[tokio::test]
    async fn reddit_without_credentials_says_so() {
        let client = parley_tools::RedditClient::new(None);
        let mut out = Vec::new();
        run_reddit(offline(), Arc::new(client), &queries(&["hot in r/rust"]), &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("- Error: Reddit API credentials not configured."));
    }

    #[tokio::test]
    async fn round_robin_ends_on_approval() {
        let mut out = Vec::new();
        run_round_robin(offline(), fixtures::POEM_TASK, 1, &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("<<< critic: APPROVE"));
        assert!(text.contains("--- Terminated: 'critic' said 'APPROVE'"));
    }
}

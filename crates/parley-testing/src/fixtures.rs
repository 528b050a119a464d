//! The weather team, the subreddit scout and the primary/critic pair, wired
//! to offline clients.
//!
//! Fixtures panic on invalid ids; they are meant for tests and demos where
//! every name is a literal.

use parley_agent::offline::{Drafter, FAREWELL_WORDS, GREETING_WORDS, Reviewer, Router, ToolReporter};
use parley_agent::{
    Agent, AgentTeam, ParleyConfig, Runner, RunnerBuilder, TerminationCondition,
};
use parley_core::{AgentId, SessionKey, ToolId};
use parley_tools::{GetRedditNewsTool, PostSource, ToolRegistry};
use std::sync::Arc;

pub const WEATHER_AGENT: &str = "weather_agent_v2";
pub const GREETING_AGENT: &str = "greeting_agent";
pub const FAREWELL_AGENT: &str = "farewell_agent";
pub const REDDIT_AGENT: &str = "reddit_scout_agent";
pub const PRIMARY_AGENT: &str = "primary";
pub const CRITIC_AGENT: &str = "critic";

/// App the subreddit scout's sessions live under.
pub const REDDIT_APP: &str = "reddit_scout_app";

/// Task the round-robin demo opens with.
pub const POEM_TASK: &str = "Write a short poem about the fall season.";

/// Keyword the critic approves with.
pub const APPROVE: &str = "APPROVE";

/// # Panics
///
/// If `name` is not a valid agent id.
pub fn agent_id(name: &str) -> AgentId {
    AgentId::parse(name).unwrap_or_else(|e| panic!("fixture agent id '{name}': {e}"))
}

/// # Panics
///
/// If `name` is not a valid tool id.
pub fn tool_id(name: &str) -> ToolId {
    ToolId::parse(name).unwrap_or_else(|e| panic!("fixture tool id '{name}': {e}"))
}

/// # Panics
///
/// If any component is not a valid identifier.
pub fn session_key(app: &str, user: &str, session: &str) -> SessionKey {
    SessionKey::parse(app, user, session)
        .unwrap_or_else(|e| panic!("fixture session key '{app}/{user}/{session}': {e}"))
}

/// Registry with the standard tools and the default timeout.
pub fn standard_tools() -> Arc<dyn ToolRegistry> {
    standard_tools_with(&ParleyConfig::default())
}

/// Registry with the standard tools, honouring `config.runner.tool_timeout`.
pub fn standard_tools_with(config: &ParleyConfig) -> Arc<dyn ToolRegistry> {
    let registry = config
        .tool_registry()
        .with_tools(parley_tools::standard::all())
        .unwrap_or_else(|e| panic!("standard tools: {e}"));
    Arc::new(registry)
}

/// The three weather agents, with any `[agents.*]` overrides applied.
///
/// The root answers weather questions itself and delegates greetings and
/// farewells to its two specialists.
pub fn weather_agents(config: &ParleyConfig) -> Vec<Agent> {
    let get_weather = tool_id("get_weather");
    let say_hello = tool_id("say_hello");
    let say_goodbye = tool_id("say_goodbye");

    let greeting = Agent::new(
        agent_id(GREETING_AGENT),
        Arc::new(ToolReporter::greeting(say_hello.clone())),
    )
    .with_description("Handles simple greetings and hellos using the 'say_hello' tool.")
    .with_instruction(
        "You are the Greeting Agent. Your only job is to say hello. \
         If the user says hi or hello, use the 'say_hello' tool and send back exactly its output.",
    )
    .with_tool(say_hello);

    let farewell = Agent::new(
        agent_id(FAREWELL_AGENT),
        Arc::new(ToolReporter::no_arguments(say_goodbye.clone())),
    )
    .with_description("Handles simple farewells and goodbyes using the 'say_goodbye' tool.")
    .with_instruction(
        "You are the Farewell Agent. Your only job is to say goodbye. \
         If the user is leaving, use the 'say_goodbye' tool and send back exactly its output.",
    )
    .with_tool(say_goodbye);

    let router = Router::new(Arc::new(ToolReporter::weather(get_weather.clone())))
        .route(GREETING_WORDS.iter(), agent_id(GREETING_AGENT))
        .route(FAREWELL_WORDS.iter(), agent_id(FAREWELL_AGENT));
    let root = Agent::new(agent_id(WEATHER_AGENT), Arc::new(router))
        .with_description(
            "The main coordinator agent. Handles weather requests and delegates greetings/farewells to specialists.",
        )
        .with_instruction(
            "You are the main Weather Agent coordinating a team. Use the 'get_weather' tool only for \
             specific weather requests. Delegate greetings to 'greeting_agent' and farewells to \
             'farewell_agent'. For anything else, say you cannot handle it.",
        )
        .with_tool(get_weather)
        .with_sub_agent(agent_id(GREETING_AGENT))
        .with_sub_agent(agent_id(FAREWELL_AGENT));

    [root, greeting, farewell]
        .into_iter()
        .map(|agent| config.configure(agent))
        .collect()
}

/// Weather team plus a registry holding its tools.
pub fn weather_team() -> (AgentTeam, Arc<dyn ToolRegistry>) {
    weather_team_with(&ParleyConfig::default())
}

pub fn weather_team_with(config: &ParleyConfig) -> (AgentTeam, Arc<dyn ToolRegistry>) {
    let team = AgentTeam::new(weather_agents(config))
        .unwrap_or_else(|e| panic!("weather team: {e}"));
    (team, standard_tools_with(config))
}

/// Builder for a single-agent conversation rooted at the weather agent.
pub fn weather_runner(config: ParleyConfig) -> RunnerBuilder {
    let (team, tools) = weather_team_with(&config);
    Runner::builder()
        .team(team)
        .tools(tools)
        .root_agent(agent_id(WEATHER_AGENT))
        .config(config)
}

/// The subreddit scout, with any `[agents.reddit_scout_agent]` overrides
/// applied.
pub fn reddit_agent(config: &ParleyConfig) -> Agent {
    let get_news = tool_id("get_reddit_cs_news");
    let scout = Agent::new(
        agent_id(REDDIT_AGENT),
        Arc::new(ToolReporter::subreddit_scout(get_news.clone())),
    )
    .with_description("Fetch and summarize top CS posts from Reddit subreddits.")
    .with_instruction(
        "You are a computer science subreddit scout. Your task is to fetch and present the top \
         hot post titles from the specified subreddit(s). Always call the get_reddit_cs_news tool \
         first and then format its output as a bulleted list under the subreddit name.",
    )
    .with_tool(get_news);
    config.configure(scout)
}

/// Builder for the subreddit scout reading posts from `source`, bound to a
/// session under [`REDDIT_APP`].
pub fn reddit_runner(config: ParleyConfig, source: Arc<dyn PostSource>) -> RunnerBuilder {
    let team = AgentTeam::new([reddit_agent(&config)])
        .unwrap_or_else(|e| panic!("reddit team: {e}"));
    let tools = config
        .tool_registry()
        .with_tool(Arc::new(GetRedditNewsTool::new(source)))
        .unwrap_or_else(|e| panic!("reddit tools: {e}"));
    Runner::builder()
        .team(team)
        .tools(Arc::new(tools))
        .root_agent(agent_id(REDDIT_AGENT))
        .session(session_key(REDDIT_APP, "user_1", "session_001"))
        .config(config)
}

/// A drafting agent and a critic that approves after `approve_after`
/// drafts per user input.
pub fn critic_agents(config: &ParleyConfig, approve_after: usize) -> Vec<Agent> {
    let primary = Agent::new(agent_id(PRIMARY_AGENT), Arc::new(Drafter))
        .with_description("Writes and revises drafts.")
        .with_instruction("You are a helpful AI assistant.");
    let critic = Agent::new(
        agent_id(CRITIC_AGENT),
        Arc::new(Reviewer::new(approve_after).with_keyword(APPROVE)),
    )
    .with_description("Reviews drafts.")
    .with_instruction(
        "Provide brief, constructive feedback. Respond with only 'APPROVE' when your feedback has been addressed.",
    );

    [primary, critic]
        .into_iter()
        .map(|agent| config.configure(agent))
        .collect()
}

/// # Panics
///
/// Never for the fixed ids used here.
pub fn critic_team(approve_after: usize) -> AgentTeam {
    AgentTeam::new(critic_agents(&ParleyConfig::default(), approve_after))
        .unwrap_or_else(|e| panic!("critic team: {e}"))
}

/// Builder for the primary/critic round-robin, ending when the critic
/// says [`APPROVE`].
pub fn critic_runner(config: ParleyConfig, approve_after: usize) -> RunnerBuilder {
    let team = AgentTeam::new(critic_agents(&config, approve_after))
        .unwrap_or_else(|e| panic!("critic team: {e}"));
    Runner::builder()
        .team(team)
        .tools(standard_tools_with(&config))
        .round_robin([agent_id(PRIMARY_AGENT), agent_id(CRITIC_AGENT)])
        .termination(TerminationCondition::text_mention(APPROVE))
        .config(config)
}

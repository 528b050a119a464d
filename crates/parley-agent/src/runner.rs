//! The conversation runner.
//!
//! A [`Runner`] binds an agent team, a tool registry and one session of a
//! session store to a [`TurnCoordinator`], and turns user input into a
//! stream of messages:
//!
//! ```rust,ignore
//! let mut runner = Runner::builder()
//!     .team(team)
//!     .tools(Arc::new(tools))
//!     .root_agent(AgentId::parse("weather_agent_v2")?)
//!     .build()?;
//!
//! let mut stream = std::pin::pin!(runner.run("What is the weather in London?"));
//! while let Some(message) = stream.next().await {
//!     println!("{}", message?);
//! }
//! ```
//!
//! Turns run strictly one after another and each holds the session lock
//! from start to finish, including while its messages are being yielded.
//! Reading the same session through the store from inside the consuming
//! loop therefore waits for the turn to end. Cancellation is cooperative:
//! the token is checked before every turn, never in the middle of one.

use futures::{Stream, StreamExt};
use parley_core::{AgentId, AppId, Message, Role, SessionId, SessionKey, UserId};
use parley_session::InMemorySessionStore;
use parley_tools::{InMemoryToolRegistry, ToolRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::{TurnContext, TurnLimits};
use crate::config::ParleyConfig;
use crate::coordinator::{
    CoordinatorState, DEFAULT_MAX_TURNS_SAFEGUARD, TurnCoordinator, TurnMode, TurnVerdict,
};
use crate::error::{AgentError, ConfigError, RunnerError};
use crate::team::AgentTeam;
use crate::termination::{TerminationCondition, TerminationReason};

/// Returned by [`RunOutcome::final_response`] when no agent spoke.
pub const NO_FINAL_RESPONSE: &str = "Agent did not produce a final response.";

/// Why the last run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Waiting for the next user message.
    AwaitingInput,
    /// A termination condition fired; the runner must be reset.
    Terminated(TerminationReason),
    /// The cancellation token was triggered.
    Cancelled,
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub messages: Vec<Message>,
    pub stop_reason: StopReason,
}

impl RunOutcome {
    /// Text of the last agent message.
    pub fn final_response(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role() == Role::Agent)
            .map(Message::text)
            .unwrap_or(NO_FINAL_RESPONSE)
    }
}

enum Step {
    Message(Message),
    Done(Result<Message, AgentError>),
}

/// Top-level conversation loop for one session.
pub struct Runner {
    team: Arc<AgentTeam>,
    tools: Arc<dyn ToolRegistry>,
    store: InMemorySessionStore,
    key: SessionKey,
    coordinator: TurnCoordinator,
    limits: TurnLimits,
    cancel: CancellationToken,
    last_stop: StopReason,
}

impl Runner {
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::default()
    }

    /// Run a task, streaming each message as soon as it is appended.
    ///
    /// Yields the user message first, then tool and agent messages in
    /// history order. Nothing happens until the stream is polled. A fatal
    /// error is yielded once and ends the stream.
    pub fn run(
        &mut self,
        task: impl Into<String>,
    ) -> impl Stream<Item = Result<Message, RunnerError>> + '_ {
        let task = task.into();

        async_stream::stream! {
            let team = Arc::clone(&self.team);
            let tools = Arc::clone(&self.tools);
            let store = self.store.clone();
            let key = self.key.clone();

            if let Err(err) = self.coordinator.accept_input() {
                warn!(session = %key, code = err.error_code(), "Rejected user input");
                yield Err(err);
                return;
            }

            store.get_or_create(&key);
            let user = Message::user(task);
            if let Err(err) = store.append(&key, user.clone()).await {
                self.coordinator.interrupt();
                yield Err(RunnerError::from(err));
                return;
            }
            info!(session = %key, "User message received");
            yield Ok(user);

            loop {
                if self.cancel.is_cancelled() {
                    info!(session = %key, turn = self.coordinator.turns_taken(), "Run cancelled");
                    self.cancel = CancellationToken::new();
                    self.coordinator.interrupt();
                    self.last_stop = StopReason::Cancelled;
                    break;
                }

                let agent_id = self.coordinator.next_participant().clone();
                let Some(agent) = team.get(&agent_id) else {
                    self.coordinator.interrupt();
                    self.last_stop = StopReason::AwaitingInput;
                    yield Err(RunnerError::from(AgentError::UnknownAgent(agent_id)));
                    break;
                };
                debug!(
                    session = %key,
                    agent = %agent_id,
                    turn = self.coordinator.turns_taken() + 1,
                    "Starting turn"
                );

                let mut session = match store.lock(&key).await {
                    Ok(session) => session,
                    Err(err) => {
                        self.coordinator.interrupt();
                        self.last_stop = StopReason::AwaitingInput;
                        yield Err(RunnerError::from(err));
                        break;
                    }
                };
                let (events, mut received) = mpsc::unbounded_channel();
                let mut ctx = TurnContext::new(team.as_ref(), tools.as_ref(), &mut session)
                    .with_limits(self.limits)
                    .with_events(events);

                let result = {
                    let mut turn = agent.respond(&mut ctx);
                    loop {
                        let step = tokio::select! {
                            biased;
                            Some(message) = received.recv() => Step::Message(message),
                            result = &mut turn => Step::Done(result),
                        };
                        match step {
                            Step::Message(message) => {
                                yield Ok(message);
                            }
                            Step::Done(result) => break result,
                        }
                    }
                };
                drop(ctx);
                drop(session);
                while let Ok(message) = received.try_recv() {
                    yield Ok(message);
                }

                let message = match result {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(
                            session = %key,
                            agent = %agent_id,
                            code = err.error_code(),
                            error = %err,
                            "Turn failed"
                        );
                        self.coordinator.interrupt();
                        self.last_stop = StopReason::AwaitingInput;
                        yield Err(RunnerError::from(err));
                        break;
                    }
                };

                match self.coordinator.complete_turn(&message) {
                    TurnVerdict::Continue => {}
                    TurnVerdict::AwaitInput => {
                        self.last_stop = StopReason::AwaitingInput;
                        break;
                    }
                    TurnVerdict::Terminated(reason) => {
                        self.last_stop = StopReason::Terminated(reason);
                        break;
                    }
                }
            }
        }
    }

    /// Drive [`run`](Self::run) to the end and collect what it produced.
    pub async fn run_to_completion(
        &mut self,
        task: impl Into<String>,
    ) -> Result<RunOutcome, RunnerError> {
        let mut messages = Vec::new();
        {
            let stream = self.run(task);
            futures::pin_mut!(stream);
            while let Some(message) = stream.next().await {
                messages.push(message?);
            }
        }
        Ok(RunOutcome {
            messages,
            stop_reason: self.last_stop.clone(),
        })
    }

    /// One-shot convenience: the final response text of a run.
    pub async fn ask(&mut self, task: impl Into<String>) -> Result<String, RunnerError> {
        let outcome = self.run_to_completion(task).await?;
        Ok(outcome.final_response().to_string())
    }

    /// Return to `AWAITING_INPUT` with the round-robin pointer on the first
    /// participant. Session history is kept.
    pub fn reset(&mut self) {
        info!(session = %self.key, "Runner reset");
        self.coordinator.reset();
        self.cancel = CancellationToken::new();
        self.last_stop = StopReason::AwaitingInput;
    }

    /// Token checked before each turn.
    ///
    /// A fresh token is installed once a cancellation is acknowledged, so
    /// fetch it again before the next run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn last_stop_reason(&self) -> &StopReason {
        &self.last_stop
    }

    pub fn state(&self) -> CoordinatorState {
        self.coordinator.state()
    }

    pub fn coordinator(&self) -> &TurnCoordinator {
        &self.coordinator
    }

    pub fn team(&self) -> &AgentTeam {
        &self.team
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.key
    }

    pub fn store(&self) -> &InMemorySessionStore {
        &self.store
    }

    /// The session's full history, across runs and resets.
    pub async fn history(&self) -> Result<Vec<Message>, RunnerError> {
        Ok(self.store.history(&self.key).await?)
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("session", &self.key)
            .field("state", &self.coordinator.state())
            .field("last_stop", &self.last_stop)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Runner`], reporting every setup problem before any turn.
#[derive(Default)]
pub struct RunnerBuilder {
    team: Option<Arc<AgentTeam>>,
    tools: Option<Arc<dyn ToolRegistry>>,
    store: Option<InMemorySessionStore>,
    session: Option<SessionKey>,
    mode: Option<TurnMode>,
    termination: TerminationCondition,
    limits: Option<TurnLimits>,
    safeguard: Option<Option<usize>>,
    cancel: Option<CancellationToken>,
    config: Option<ParleyConfig>,
}

impl RunnerBuilder {
    pub fn team(self, team: AgentTeam) -> Self {
        self.shared_team(Arc::new(team))
    }

    /// Share one team between several runners.
    pub fn shared_team(mut self, team: Arc<AgentTeam>) -> Self {
        self.team = Some(team);
        self
    }

    pub fn tools(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Use an existing store; defaults to a fresh one.
    pub fn store(mut self, store: InMemorySessionStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Bind to a session; defaults to a generated id under the configured app.
    pub fn session(mut self, key: SessionKey) -> Self {
        self.session = Some(key);
        self
    }

    /// Single mode: one turn by `root` per user message.
    pub fn root_agent(mut self, root: AgentId) -> Self {
        self.mode = Some(TurnMode::Single { root });
        self
    }

    /// Round-robin mode over `participants`, in order.
    pub fn round_robin(mut self, participants: impl IntoIterator<Item = AgentId>) -> Self {
        self.mode = Some(TurnMode::RoundRobin {
            participants: participants.into_iter().collect(),
        });
        self
    }

    pub fn termination(mut self, termination: TerminationCondition) -> Self {
        self.termination = termination;
        self
    }

    pub fn turn_limits(mut self, limits: TurnLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn max_turns_safeguard(mut self, safeguard: Option<usize>) -> Self {
        self.safeguard = Some(safeguard);
        self
    }

    /// Start with an externally owned token, e.g. a child of a host's
    /// shutdown token. After a cancellation is acknowledged the runner
    /// replaces it with a fresh one.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Take defaults from a configuration; it is validated by `build`.
    pub fn config(mut self, config: ParleyConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Runner, ConfigError> {
        if let Some(config) = &self.config {
            config.validate()?;
        }
        let runner_config = self.config.as_ref().map(|c| &c.runner);

        let team = self.team.ok_or(ConfigError::Missing("an agent team"))?;
        if team.is_empty() {
            return Err(ConfigError::Missing("at least one agent"));
        }

        let tools: Arc<dyn ToolRegistry> = match self.tools {
            Some(tools) => tools,
            None => Arc::new(
                runner_config
                    .map(|c| InMemoryToolRegistry::new().with_timeout(c.tool_timeout))
                    .unwrap_or_default(),
            ),
        };
        for agent in team.iter() {
            if let Some(tool) = agent.tools().find(|tool| !tools.contains(tool)) {
                return Err(ConfigError::UnregisteredTool {
                    agent: agent.id().clone(),
                    tool: tool.clone(),
                });
            }
        }

        let mode = match self.mode {
            Some(mode) => mode,
            None if team.len() == 1 => TurnMode::Single {
                root: team.ids()[0].clone(),
            },
            None => return Err(ConfigError::Missing("a root agent or round-robin participants")),
        };
        if let Some(unknown) = mode.participants().iter().find(|id| !team.contains(id)) {
            return Err(ConfigError::UnknownParticipant(unknown.clone()));
        }

        let limits = self
            .limits
            .or_else(|| runner_config.map(|c| c.turn_limits()))
            .unwrap_or_default();
        if limits.max_tool_rounds == 0 {
            return Err(ConfigError::invalid("max_tool_rounds", "must be greater than zero"));
        }

        let safeguard = self.safeguard.unwrap_or_else(|| {
            runner_config
                .map(|c| c.max_turns_safeguard)
                .unwrap_or(Some(DEFAULT_MAX_TURNS_SAFEGUARD))
        });
        if safeguard == Some(0) {
            return Err(ConfigError::invalid("max_turns_safeguard", "must be greater than zero"));
        }

        let coordinator =
            TurnCoordinator::new(mode, self.termination)?.with_max_turns_safeguard(safeguard);

        let key = match self.session {
            Some(key) => key,
            None => {
                let app = runner_config.map(|c| c.app_id.as_str()).unwrap_or("parley");
                SessionKey::new(
                    AppId::parse(app).map_err(|e| ConfigError::invalid("app_id", e.to_string()))?,
                    UserId::parse("user").map_err(|e| ConfigError::invalid("user_id", e.to_string()))?,
                    SessionId::generate(),
                )
            }
        };

        let store = self.store.unwrap_or_default();
        store.get_or_create(&key);

        info!(
            session = %key,
            agents = team.len(),
            round_robin = coordinator.mode().is_round_robin(),
            "Runner ready"
        );

        Ok(Runner {
            team,
            tools,
            store,
            key,
            coordinator,
            limits,
            cancel: self.cancel.unwrap_or_default(),
            last_stop: StopReason::AwaitingInput,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::completion::Completion;
    use crate::test_support::{Script, call, id, key, standard_tools, tool};
    use serde_json::json;

    fn texts(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(Message::text).collect()
    }

    fn critic_loop(critic_says: &'static str) -> Runner {
        let primary = Agent::new(
            id("primary"),
            Script::new((0..10).map(|i| Completion::text(format!("draft {i}")))),
        );
        let critic = Agent::new(
            id("critic"),
            Script::new((0..10).map(|_| Completion::text(critic_says))),
        );
        Runner::builder()
            .team(AgentTeam::new([primary, critic]).unwrap())
            .round_robin([id("primary"), id("critic")])
            .termination(TerminationCondition::text_mention("APPROVE"))
            .session(key())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn stream_yields_messages_in_history_order() {
        let team = AgentTeam::new([Agent::new(
            id("greeting_agent"),
            Script::new([call("say_hello", json!({"name": "there"})), Completion::text("Hello, there!")]),
        )
        .with_tool(tool("say_hello"))])
        .unwrap();
        let mut runner = Runner::builder()
            .team(team)
            .tools(Arc::new(standard_tools()))
            .session(key())
            .build()
            .unwrap();

        let streamed: Vec<Message> = runner
            .run("Hello there!")
            .map(|m| m.unwrap())
            .collect()
            .await;

        assert_eq!(streamed.len(), 3);
        assert_eq!(streamed[0].role(), Role::User);
        assert_eq!(streamed[1].role(), Role::Tool);
        assert_eq!(streamed[2].text(), "Hello, there!");
        assert_eq!(runner.history().await.unwrap(), streamed);
        assert_eq!(runner.last_stop_reason(), &StopReason::AwaitingInput);
        assert_eq!(runner.state(), CoordinatorState::AwaitingInput);
    }

    #[tokio::test]
    async fn round_robin_stops_on_exact_keyword() {
        let mut runner = critic_loop("APPROVE");
        let outcome = runner.run_to_completion("Write a haiku").await.unwrap();

        assert_eq!(texts(&outcome.messages), ["Write a haiku", "draft 0", "APPROVE"]);
        assert!(matches!(outcome.stop_reason, StopReason::Terminated(_)));
        assert_eq!(outcome.final_response(), "APPROVE");
        assert_eq!(runner.state(), CoordinatorState::Terminated);
    }

    #[tokio::test]
    async fn terminated_runner_rejects_input_until_reset() {
        let mut runner = critic_loop("APPROVE");
        runner.run_to_completion("Write a haiku").await.unwrap();

        let err = runner.run_to_completion("Another").await.unwrap_err();
        assert_eq!(err.error_code(), "CONVERSATION_TERMINATED");

        runner.reset();
        assert_eq!(runner.coordinator().next_participant(), &id("primary"));
        let outcome = runner.run_to_completion("Another").await.unwrap();
        assert_eq!(outcome.messages[1].author().agent_id(), Some(&id("primary")));

        // Earlier runs stay in the log.
        let history = runner.history().await.unwrap();
        assert_eq!(history.first().map(Message::text), Some("Write a haiku"));
        assert_eq!(history.len(), 6);
    }

    #[tokio::test]
    async fn safeguard_ends_a_conversation_nobody_approves() {
        let primary = Agent::new(id("primary"), Script::new([]));
        let critic = Agent::new(id("critic"), Script::new([]));
        let mut runner = Runner::builder()
            .team(AgentTeam::new([primary, critic]).unwrap())
            .round_robin([id("primary"), id("critic")])
            .termination(TerminationCondition::text_mention("APPROVE"))
            .max_turns_safeguard(Some(6))
            .build()
            .unwrap();

        let outcome = runner.run_to_completion("Go").await.unwrap();
        assert_eq!(outcome.messages.len(), 7);
        assert_eq!(
            outcome.stop_reason,
            StopReason::Terminated(TerminationReason::SafeguardReached { turns: 6 })
        );
    }

    #[tokio::test]
    async fn cancellation_is_acknowledged_before_the_next_turn() {
        let mut runner = critic_loop("revise");
        let token = runner.cancellation_token();

        let mut seen = Vec::new();
        {
            let stream = runner.run("Write a haiku");
            futures::pin_mut!(stream);
            while let Some(message) = stream.next().await {
                let message = message.unwrap();
                if message.role() == Role::Agent {
                    token.cancel();
                }
                seen.push(message);
            }
        }

        assert_eq!(texts(&seen), ["Write a haiku", "draft 0"]);
        assert_eq!(runner.last_stop_reason(), &StopReason::Cancelled);
        assert_eq!(runner.state(), CoordinatorState::AwaitingInput);
        assert!(!runner.cancellation_token().is_cancelled());
        assert_eq!(runner.coordinator().next_participant(), &id("critic"));
    }

    #[tokio::test]
    async fn delegation_cycle_is_surfaced_and_run_recovers() {
        let team = AgentTeam::new([
            Agent::new(id("a"), Script::new([Completion::delegate(id("b")), Completion::text("fine")]))
                .with_sub_agent(id("b")),
            Agent::new(id("b"), Script::new([Completion::delegate(id("a"))])).with_sub_agent(id("a")),
        ])
        .unwrap();
        let mut runner = Runner::builder()
            .team(team)
            .root_agent(id("a"))
            .build()
            .unwrap();

        let err = runner.run_to_completion("loop").await.unwrap_err();
        assert_eq!(err.error_code(), "DELEGATION_CYCLE");
        assert_eq!(runner.state(), CoordinatorState::AwaitingInput);

        assert_eq!(runner.ask("again").await.unwrap(), "fine");
    }

    #[test]
    fn final_response_falls_back_when_no_agent_spoke() {
        let outcome = RunOutcome {
            messages: vec![Message::user("hi")],
            stop_reason: StopReason::Cancelled,
        };
        assert_eq!(outcome.final_response(), NO_FINAL_RESPONSE);
    }

    #[test]
    fn builder_reports_setup_errors() {
        let solo = || Agent::new(id("solo"), Script::new([]));

        assert_eq!(
            Runner::builder().build().unwrap_err(),
            ConfigError::Missing("an agent team")
        );

        let err = Runner::builder()
            .team(AgentTeam::new([solo()]).unwrap())
            .round_robin([id("solo"), id("ghost")])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownParticipant(id("ghost")));

        let err = Runner::builder()
            .team(AgentTeam::new([solo().with_tool(tool("teleport"))]).unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "UNREGISTERED_TOOL");

        let err = Runner::builder()
            .team(AgentTeam::new([solo()]).unwrap())
            .config(ParleyConfig::default())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingModel);

        let err = Runner::builder()
            .team(AgentTeam::new([solo(), Agent::new(id("other"), Script::new([]))]).unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err.error_code(), "INCOMPLETE_RUNNER");
    }

    #[test]
    fn config_supplies_app_id_and_limits() {
        let mut config = ParleyConfig::offline("rules");
        config.runner.app_id = "weather_tutorial_app".into();
        config.runner.max_tool_rounds = 3;

        let runner = Runner::builder()
            .team(AgentTeam::new([Agent::new(id("solo"), Script::new([]))]).unwrap())
            .config(config)
            .build()
            .unwrap();
        assert_eq!(runner.session_key().app_id.as_str(), "weather_tutorial_app");
        assert_eq!(runner.limits.max_tool_rounds, 3);
        assert!(runner.store().contains(runner.session_key()));
    }
}

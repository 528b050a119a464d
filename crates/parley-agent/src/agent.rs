//! Agents and the per-turn context they respond in.

use futures::future::BoxFuture;
use parley_core::{AgentId, Message, ToolCall, ToolDescriptor, ToolError, ToolId, ToolOutcome};
use parley_session::SessionGuard;
use parley_tools::ToolRegistry;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::completion::{Completion, CompletionClient, CompletionRequest, DelegateDescriptor};
use crate::error::AgentError;
use crate::hooks::CompletionHook;
use crate::team::AgentTeam;

/// Response emitted when the completion service fails.
pub const DEGRADED_RESPONSE: &str = "I could not complete this request";

/// Per-turn limits on tool use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLimits {
    /// Failed tool or delegation attempts tolerated before the agent gives up.
    pub tool_retry_budget: usize,
    /// Tool calls allowed in one turn.
    pub max_tool_rounds: usize,
}

impl Default for TurnLimits {
    fn default() -> Self {
        Self {
            tool_retry_budget: 2,
            max_tool_rounds: 8,
        }
    }
}

/// State carried through one turn, including any delegation chain.
///
/// Holds the session lock for the whole turn. Every message an agent
/// produces is appended here and, when an event sink is attached, forwarded
/// to it in the same order.
pub struct TurnContext<'a> {
    team: &'a AgentTeam,
    tools: &'a dyn ToolRegistry,
    session: &'a mut SessionGuard,
    events: Option<UnboundedSender<Message>>,
    limits: TurnLimits,
    visited: Vec<AgentId>,
}

impl<'a> TurnContext<'a> {
    pub fn new(
        team: &'a AgentTeam,
        tools: &'a dyn ToolRegistry,
        session: &'a mut SessionGuard,
    ) -> Self {
        Self {
            team,
            tools,
            session,
            events: None,
            limits: TurnLimits::default(),
            visited: Vec::new(),
        }
    }

    pub fn with_limits(mut self, limits: TurnLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Forward every appended message to `events`.
    pub fn with_events(mut self, events: UnboundedSender<Message>) -> Self {
        self.events = Some(events);
        self
    }

    /// Agents that have responded in this turn, in order.
    pub fn visited(&self) -> &[AgentId] {
        &self.visited
    }

    pub fn history(&self) -> &[Message] {
        self.session.history()
    }

    fn record(&mut self, message: Message) -> Message {
        self.session.append(message.clone());
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(message.clone());
        }
        message
    }
}

/// A conversational actor with a fixed instruction, tool set and delegates.
///
/// # Example
/// ```rust,ignore
/// let greeter = Agent::new(AgentId::parse("greeting_agent")?, client)
///     .with_description("Handles simple greetings and hellos")
///     .with_instruction("Greet the user with the say_hello tool.")
///     .with_tool(ToolId::parse("say_hello")?);
/// ```
pub struct Agent {
    id: AgentId,
    description: String,
    instruction: String,
    tools: BTreeSet<ToolId>,
    sub_agents: Vec<AgentId>,
    client: Arc<dyn CompletionClient>,
    hooks: Vec<Arc<dyn CompletionHook>>,
}

impl Agent {
    pub fn new(id: AgentId, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            id,
            description: String::new(),
            instruction: String::new(),
            tools: BTreeSet::new(),
            sub_agents: Vec::new(),
            client,
            hooks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_tool(mut self, tool: ToolId) -> Self {
        self.tools.insert(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolId>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Declare a delegate. Order is kept; duplicates are ignored.
    pub fn with_sub_agent(mut self, agent: AgentId) -> Self {
        if !self.sub_agents.contains(&agent) {
            self.sub_agents.push(agent);
        }
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn CompletionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolId> {
        self.tools.iter()
    }

    pub fn sub_agents(&self) -> &[AgentId] {
        &self.sub_agents
    }

    pub fn can_use(&self, tool: &ToolId) -> bool {
        self.tools.contains(tool)
    }

    pub fn can_delegate_to(&self, agent: &AgentId) -> bool {
        self.sub_agents.contains(agent)
    }

    /// How this agent is advertised to a parent.
    pub fn descriptor(&self) -> DelegateDescriptor {
        DelegateDescriptor {
            id: self.id.clone(),
            description: self.description.clone(),
        }
    }

    /// Run one turn for this agent.
    ///
    /// Consults the completion client with the session history and this
    /// agent's instruction. Tool calls are executed through the registry and
    /// their outcomes appended as tool messages before asking again.
    /// Delegation hands the same context to the sub-agent and returns its
    /// message unchanged.
    ///
    /// # Errors
    ///
    /// [`AgentError::DelegationCycle`] if this agent already responded in
    /// the current turn. Tool and completion failures are not errors: they
    /// are folded back into the conversation.
    pub fn respond<'a, 'b>(
        &'a self,
        ctx: &'a mut TurnContext<'b>,
    ) -> BoxFuture<'a, Result<Message, AgentError>>
    where
        'b: 'a,
    {
        Box::pin(async move {
            if ctx.visited.contains(&self.id) {
                let mut chain = ctx.visited.clone();
                chain.push(self.id.clone());
                warn!(agent = %self.id, chain = ?chain, "Delegation cycle");
                return Err(AgentError::DelegationCycle { chain });
            }
            ctx.visited.push(self.id.clone());

            let team = ctx.team;
            let tools = self.tool_descriptors(ctx.tools);
            let delegates: Vec<DelegateDescriptor> = self
                .sub_agents
                .iter()
                .filter_map(|id| team.get(id))
                .map(Agent::descriptor)
                .collect();

            let mut observations = Vec::new();
            let mut failures = 0usize;
            let mut rounds = 0usize;

            loop {
                let request = CompletionRequest {
                    agent: self.id.clone(),
                    instruction: self.instruction.clone(),
                    history: ctx.history().to_vec(),
                    tools: tools.clone(),
                    delegates: delegates.clone(),
                    observations: observations.clone(),
                };

                let completion = match self.client.complete(request).await {
                    Ok(completion) => self.apply_hooks(completion),
                    Err(err) => {
                        warn!(
                            agent = %self.id,
                            error = %err,
                            code = err.error_code(),
                            "Completion failed, degrading response"
                        );
                        return Ok(ctx.record(Message::agent(self.id.clone(), DEGRADED_RESPONSE)));
                    }
                };

                match completion {
                    Completion::Text { text } => {
                        debug!(agent = %self.id, "Agent produced final response");
                        return Ok(ctx.record(Message::agent(self.id.clone(), text)));
                    }
                    Completion::ToolCall(call) => {
                        if rounds >= ctx.limits.max_tool_rounds {
                            warn!(agent = %self.id, rounds, "Tool round limit reached");
                            return Ok(ctx.record(Message::agent(
                                self.id.clone(),
                                format!(
                                    "{DEGRADED_RESPONSE}: stopped after {rounds} tool calls without a final response"
                                ),
                            )));
                        }
                        rounds += 1;

                        if let Err(err) = self.call_tool(ctx, call).await {
                            failures += 1;
                            if failures > ctx.limits.tool_retry_budget {
                                return Ok(self.give_up(ctx, &err.to_string()));
                            }
                        }
                    }
                    Completion::Delegate { agent: target } => {
                        match team.get(&target).filter(|_| self.can_delegate_to(&target)) {
                            Some(sub_agent) => {
                                info!(from = %self.id, to = %target, "Delegating turn");
                                return sub_agent.respond(ctx).await;
                            }
                            None => {
                                let failure =
                                    format!("Delegation to '{target}' failed: not a declared sub-agent");
                                warn!(agent = %self.id, target = %target, "Rejected delegation");
                                failures += 1;
                                if failures > ctx.limits.tool_retry_budget {
                                    return Ok(self.give_up(ctx, &failure));
                                }
                                observations.push(failure);
                            }
                        }
                    }
                }
            }
        })
    }

    /// Execute a tool call and append its outcome. Returns the error for
    /// calls that count against the retry budget.
    async fn call_tool(&self, ctx: &mut TurnContext<'_>, call: ToolCall) -> Result<(), ToolError> {
        let ToolCall { tool, input } = call;
        let result = if self.can_use(&tool) {
            ctx.tools.invoke(&tool, input).await
        } else {
            Err(ToolError::UnknownTool { tool: tool.clone() })
        };

        match result {
            Ok(result) => {
                debug!(agent = %self.id, tool = %tool, success = result.is_success(), "Tool returned");
                let outcome = ToolOutcome::from(result);
                ctx.record(Message::tool(self.id.clone(), tool, outcome.to_json_string()));
                Ok(())
            }
            Err(err) => {
                warn!(
                    agent = %self.id,
                    tool = %tool,
                    code = err.error_code(),
                    error = %err,
                    "Tool invocation failed"
                );
                let outcome = ToolOutcome::error(err.to_string());
                ctx.record(Message::tool(self.id.clone(), tool, outcome.to_json_string()));
                Err(err)
            }
        }
    }

    fn give_up(&self, ctx: &mut TurnContext<'_>, last_failure: &str) -> Message {
        warn!(agent = %self.id, error = %last_failure, "Retry budget exhausted");
        ctx.record(Message::agent(
            self.id.clone(),
            format!("{DEGRADED_RESPONSE}: {last_failure}"),
        ))
    }

    fn tool_descriptors(&self, registry: &dyn ToolRegistry) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .filter_map(|tool| registry.descriptor(tool))
            .collect()
    }

    fn apply_hooks(&self, completion: Completion) -> Completion {
        self.hooks
            .iter()
            .fold(completion, |completion, hook| hook.after_completion(&self.id, completion))
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("tools", &self.tools)
            .field("sub_agents", &self.sub_agents)
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::hooks::TruncateAtMarker;
    use crate::test_support::{Script, call, id, key, standard_tools, tool};
    use parley_core::{Role, ToolOutcome};
    use parley_session::InMemorySessionStore;
    use serde_json::json;

    async fn session() -> SessionGuard {
        let store = InMemorySessionStore::new();
        store.create_session(&key()).unwrap();
        store.append(&key(), Message::user("Hello there!")).await.unwrap();
        store.lock(&key()).await.unwrap()
    }

    fn outcome(message: &Message) -> ToolOutcome {
        serde_json::from_str(message.text()).unwrap()
    }

    #[tokio::test]
    async fn tool_result_is_folded_back_before_final_text() {
        let client = Script::new([
            call("say_hello", json!({"name": "there"})),
            Completion::text("Hello, there!"),
        ]);
        let team = AgentTeam::new([Agent::new(id("greeting_agent"), client.clone())
            .with_tool(tool("say_hello"))])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let agent = team.get(&id("greeting_agent")).unwrap();
        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = agent.respond(&mut ctx).await.unwrap();
        assert_eq!(reply.text(), "Hello, there!");

        let history = guard.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role(), Role::Tool);
        assert_eq!(
            outcome(&history[1]),
            ToolOutcome::Success {
                payload: json!("Hello, there!")
            }
        );

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        assert_eq!(requests[1].history.len(), 2);
    }

    #[tokio::test]
    async fn delegation_passes_the_sub_agent_message_through() {
        let team = AgentTeam::new([
            Agent::new(
                id("weather_agent_v2"),
                Script::new([Completion::delegate(id("greeting_agent"))]),
            )
            .with_sub_agent(id("greeting_agent")),
            Agent::new(
                id("greeting_agent"),
                Script::new([Completion::text("Hello, there!")]),
            )
            .with_description("Handles simple greetings and hellos"),
        ])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let root = team.get(&id("weather_agent_v2")).unwrap();
        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = root.respond(&mut ctx).await.unwrap();

        assert!(reply.is_from_agent(&id("greeting_agent")));
        assert_eq!(reply.text(), "Hello, there!");
        assert_eq!(ctx.visited(), [id("weather_agent_v2"), id("greeting_agent")]);
    }

    #[tokio::test]
    async fn delegation_loop_is_a_cycle_error() {
        let team = AgentTeam::new([
            Agent::new(id("a"), Script::new([Completion::delegate(id("b"))])).with_sub_agent(id("b")),
            Agent::new(id("b"), Script::new([Completion::delegate(id("a"))])).with_sub_agent(id("a")),
        ])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let err = team.get(&id("a")).unwrap().respond(&mut ctx).await.unwrap_err();
        assert_eq!(
            err,
            AgentError::DelegationCycle {
                chain: vec![id("a"), id("b"), id("a")]
            }
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_recorded_and_reported_back() {
        let client = Script::new([call("teleport", json!({})), Completion::text("I cannot do that.")]);
        let team = AgentTeam::new([Agent::new(id("greeting_agent"), client.clone())]).unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = team
            .get(&id("greeting_agent"))
            .unwrap()
            .respond(&mut ctx)
            .await
            .unwrap();
        assert_eq!(reply.text(), "I cannot do that.");

        let failed = &guard.history()[1];
        assert_eq!(failed.tool_id(), Some(&tool("teleport")));
        assert_eq!(
            outcome(failed),
            ToolOutcome::error("Tool 'teleport' not found in registry")
        );
    }

    #[tokio::test]
    async fn tools_outside_the_agent_set_are_unknown() {
        let client = Script::new([call("say_goodbye", json!({}))]);
        let team = AgentTeam::new([
            Agent::new(id("greeting_agent"), client).with_tool(tool("say_hello"))
        ])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        team.get(&id("greeting_agent"))
            .unwrap()
            .respond(&mut ctx)
            .await
            .unwrap();
        assert_eq!(
            outcome(&guard.history()[1]),
            ToolOutcome::error("Tool 'say_goodbye' not found in registry")
        );
    }

    #[tokio::test]
    async fn repeated_failures_exhaust_the_retry_budget() {
        let client = Script::new([
            call("missing", json!({})),
            call("missing", json!({})),
            call("missing", json!({})),
            Completion::text("never reached"),
        ]);
        let team = AgentTeam::new([Agent::new(id("primary"), client)]).unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = team.get(&id("primary")).unwrap().respond(&mut ctx).await.unwrap();
        assert_eq!(
            reply.text(),
            "I could not complete this request: Tool 'missing' not found in registry"
        );
        let tool_messages = guard.history().iter().filter(|m| m.role() == Role::Tool).count();
        assert_eq!(tool_messages, 3);
    }

    #[tokio::test]
    async fn handled_tool_failures_do_not_spend_the_budget() {
        let paris = || call("get_weather", json!({"city": "Paris"}));
        let client = Script::new([paris(), paris(), paris(), Completion::text("No data for Paris.")]);
        let team = AgentTeam::new([
            Agent::new(id("weather_agent_v2"), client).with_tool(tool("get_weather"))
        ])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = team
            .get(&id("weather_agent_v2"))
            .unwrap()
            .respond(&mut ctx)
            .await
            .unwrap();
        assert_eq!(reply.text(), "No data for Paris.");
        assert_eq!(
            outcome(&guard.history()[1]),
            ToolOutcome::error("Sorry, I don't have weather information for 'Paris'.")
        );
    }

    #[tokio::test]
    async fn completion_failure_degrades_the_response() {
        let team = AgentTeam::new([Agent::new(
            id("primary"),
            Script::failing(CompletionError::Unavailable("503".into())),
        )])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = team.get(&id("primary")).unwrap().respond(&mut ctx).await.unwrap();
        assert_eq!(reply.text(), DEGRADED_RESPONSE);
        assert_eq!(guard.history().last(), Some(&reply));
    }

    #[tokio::test]
    async fn undeclared_delegate_is_observed_not_followed() {
        let client = Script::new([
            Completion::delegate(id("farewell_agent")),
            Completion::text("Handled it myself."),
        ]);
        let team = AgentTeam::new([
            Agent::new(id("weather_agent_v2"), client.clone()),
            Agent::new(id("farewell_agent"), Script::new([])),
        ])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = team
            .get(&id("weather_agent_v2"))
            .unwrap()
            .respond(&mut ctx)
            .await
            .unwrap();
        assert_eq!(reply.text(), "Handled it myself.");
        assert_eq!(
            client.requests()[1].observations,
            ["Delegation to 'farewell_agent' failed: not a declared sub-agent"]
        );
    }

    #[tokio::test]
    async fn tool_rounds_are_capped() {
        let hello = || call("say_hello", json!({}));
        let team = AgentTeam::new([
            Agent::new(id("greeting_agent"), Script::new([hello(), hello()]))
                .with_tool(tool("say_hello")),
        ])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard).with_limits(TurnLimits {
            tool_retry_budget: 2,
            max_tool_rounds: 1,
        });
        let reply = team
            .get(&id("greeting_agent"))
            .unwrap()
            .respond(&mut ctx)
            .await
            .unwrap();
        assert!(reply.text().starts_with(DEGRADED_RESPONSE));
        assert!(reply.text().contains("1 tool calls"));
    }

    #[tokio::test]
    async fn hooks_rewrite_completions() {
        let team = AgentTeam::new([Agent::new(
            id("editor"),
            Script::new([Completion::text("Fixed.\n---END EDIT---\nMore?")]),
        )
        .with_hook(Arc::new(TruncateAtMarker::new("---END EDIT---")))])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;

        let mut ctx = TurnContext::new(&team, &tools, &mut guard);
        let reply = team.get(&id("editor")).unwrap().respond(&mut ctx).await.unwrap();
        assert_eq!(reply.text(), "Fixed.");
    }

    #[tokio::test]
    async fn events_mirror_appended_messages() {
        let team = AgentTeam::new([Agent::new(
            id("greeting_agent"),
            Script::new([call("say_hello", json!({})), Completion::text("Hi!")]),
        )
        .with_tool(tool("say_hello"))])
        .unwrap();
        let tools = standard_tools();
        let mut guard = session().await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        let mut ctx = TurnContext::new(&team, &tools, &mut guard).with_events(tx);
        team.get(&id("greeting_agent"))
            .unwrap()
            .respond(&mut ctx)
            .await
            .unwrap();
        drop(ctx);

        let mut seen = Vec::new();
        while let Ok(message) = rx.try_recv() {
            seen.push(message);
        }
        assert_eq!(seen.as_slice(), &guard.history()[1..]);
    }
}

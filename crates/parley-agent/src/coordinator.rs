//! The turn coordinator state machine.
//!
//! ```text
//! AWAITING_INPUT --user message--> AGENT_ACTIVE
//! AGENT_ACTIVE   --turn, no termination--> AWAITING_INPUT   (single mode)
//! AGENT_ACTIVE   --turn, no termination--> AGENT_ACTIVE     (round-robin)
//! AGENT_ACTIVE   --termination fires--> TERMINATED
//! ```
//!
//! The coordinator only decides; the runner executes turns and reports each
//! finished turn back through [`TurnCoordinator::complete_turn`].

use parley_core::{AgentId, Message};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

use crate::error::{ConfigError, RunnerError};
use crate::termination::{TerminationCondition, TerminationReason};

/// Default cap on consecutive round-robin turns for one user message.
pub const DEFAULT_MAX_TURNS_SAFEGUARD: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoordinatorState {
    AwaitingInput,
    AgentActive,
    Terminated,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinatorState::AwaitingInput => f.write_str("AWAITING_INPUT"),
            CoordinatorState::AgentActive => f.write_str("AGENT_ACTIVE"),
            CoordinatorState::Terminated => f.write_str("TERMINATED"),
        }
    }
}

/// How agents take turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnMode {
    /// One turn by the root agent per user message.
    Single { root: AgentId },
    /// Participants speak in cyclic order until termination.
    RoundRobin { participants: Vec<AgentId> },
}

impl TurnMode {
    /// Agents the mode schedules directly, in order.
    pub fn participants(&self) -> &[AgentId] {
        match self {
            TurnMode::Single { root } => std::slice::from_ref(root),
            TurnMode::RoundRobin { participants } => participants,
        }
    }

    pub fn is_round_robin(&self) -> bool {
        matches!(self, TurnMode::RoundRobin { .. })
    }
}

/// What the runner should do after a finished turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnVerdict {
    /// Run the next participant's turn.
    Continue,
    /// Stop and wait for the next user message.
    AwaitInput,
    /// The conversation is over.
    Terminated(TerminationReason),
}

/// Decides which agent acts next and when the conversation ends.
#[derive(Debug, Clone)]
pub struct TurnCoordinator {
    mode: TurnMode,
    termination: TerminationCondition,
    max_turns_safeguard: Option<usize>,
    state: CoordinatorState,
    next: usize,
    turns_taken: usize,
    turns_this_input: usize,
    terminated_by: Option<TerminationReason>,
}

impl TurnCoordinator {
    /// Create a coordinator in `AWAITING_INPUT`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] for a round-robin with no participants.
    pub fn new(mode: TurnMode, termination: TerminationCondition) -> Result<Self, ConfigError> {
        if mode.participants().is_empty() {
            return Err(ConfigError::Missing("at least one round-robin participant"));
        }
        Ok(Self {
            mode,
            termination,
            max_turns_safeguard: Some(DEFAULT_MAX_TURNS_SAFEGUARD),
            state: CoordinatorState::AwaitingInput,
            next: 0,
            turns_taken: 0,
            turns_this_input: 0,
            terminated_by: None,
        })
    }

    /// Cap consecutive round-robin turns per user message. `None` lets a
    /// conversation run until a condition fires or it is cancelled.
    pub fn with_max_turns_safeguard(mut self, safeguard: Option<usize>) -> Self {
        self.max_turns_safeguard = safeguard;
        self
    }

    pub fn mode(&self) -> &TurnMode {
        &self.mode
    }

    pub fn termination(&self) -> &TerminationCondition {
        &self.termination
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Agent turns completed since construction or the last reset.
    pub fn turns_taken(&self) -> usize {
        self.turns_taken
    }

    /// Agent that will take the next turn.
    pub fn next_participant(&self) -> &AgentId {
        let participants = self.mode.participants();
        &participants[self.next % participants.len()]
    }

    pub fn termination_reason(&self) -> Option<&TerminationReason> {
        self.terminated_by.as_ref()
    }

    /// A user message arrived: `AWAITING_INPUT -> AGENT_ACTIVE`.
    ///
    /// # Errors
    ///
    /// [`RunnerError::ConversationTerminated`] once the conversation ended.
    pub fn accept_input(&mut self) -> Result<(), RunnerError> {
        if let Some(reason) = &self.terminated_by {
            return Err(RunnerError::ConversationTerminated {
                reason: reason.clone(),
            });
        }
        self.state = CoordinatorState::AgentActive;
        self.turns_this_input = 0;
        debug!(next = %self.next_participant(), "Accepted user input");
        Ok(())
    }

    /// Record a finished turn whose final message is `latest`.
    ///
    /// Advances the round-robin pointer whatever the turn's outcome, then
    /// evaluates termination.
    pub fn complete_turn(&mut self, latest: &Message) -> TurnVerdict {
        self.turns_taken += 1;
        self.turns_this_input += 1;
        self.next = (self.next + 1) % self.mode.participants().len();

        if let Some(reason) = self.termination.evaluate(latest, self.turns_taken) {
            return self.terminate(reason);
        }

        if !self.mode.is_round_robin() {
            self.state = CoordinatorState::AwaitingInput;
            return TurnVerdict::AwaitInput;
        }

        match self.max_turns_safeguard {
            Some(limit) if self.turns_this_input >= limit => {
                self.terminate(TerminationReason::SafeguardReached {
                    turns: self.turns_this_input,
                })
            }
            _ => TurnVerdict::Continue,
        }
    }

    fn terminate(&mut self, reason: TerminationReason) -> TurnVerdict {
        info!(reason = %reason, turns = self.turns_taken, "Conversation terminated");
        self.state = CoordinatorState::Terminated;
        self.terminated_by = Some(reason.clone());
        TurnVerdict::Terminated(reason)
    }

    /// Leave `AGENT_ACTIVE` without completing a turn (cancellation or a
    /// fatal error). The pointer stays on the interrupted participant.
    pub fn interrupt(&mut self) {
        if self.state == CoordinatorState::AgentActive {
            self.state = CoordinatorState::AwaitingInput;
        }
    }

    /// Back to `AWAITING_INPUT` with the pointer on the first participant.
    pub fn reset(&mut self) {
        self.state = CoordinatorState::AwaitingInput;
        self.next = 0;
        self.turns_taken = 0;
        self.turns_this_input = 0;
        self.terminated_by = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> AgentId {
        AgentId::new_unchecked(name)
    }

    fn said(agent: &str, text: &str) -> Message {
        Message::agent(id(agent), text)
    }

    fn round_robin(termination: TerminationCondition) -> TurnCoordinator {
        TurnCoordinator::new(
            TurnMode::RoundRobin {
                participants: vec![id("primary"), id("critic")],
            },
            termination,
        )
        .unwrap()
    }

    #[test]
    fn single_mode_returns_to_awaiting_input() {
        let mut coordinator = TurnCoordinator::new(
            TurnMode::Single {
                root: id("weather_agent_v2"),
            },
            TerminationCondition::Never,
        )
        .unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::AwaitingInput);

        coordinator.accept_input().unwrap();
        assert_eq!(coordinator.state(), CoordinatorState::AgentActive);

        let verdict = coordinator.complete_turn(&said("weather_agent_v2", "Sunny"));
        assert_eq!(verdict, TurnVerdict::AwaitInput);
        assert_eq!(coordinator.state(), CoordinatorState::AwaitingInput);
        assert_eq!(coordinator.next_participant(), &id("weather_agent_v2"));
    }

    #[test]
    fn round_robin_cycles_participants() {
        let mut coordinator = round_robin(TerminationCondition::Never);
        coordinator.accept_input().unwrap();

        let mut speakers = Vec::new();
        for _ in 0..3 {
            speakers.push(coordinator.next_participant().to_string());
            let verdict = coordinator.complete_turn(&said("x", "draft"));
            assert_eq!(verdict, TurnVerdict::Continue);
        }
        assert_eq!(speakers, ["primary", "critic", "primary"]);
        assert_eq!(coordinator.turns_taken(), 3);
    }

    #[test]
    fn termination_is_checked_after_every_turn() {
        let mut coordinator = round_robin(TerminationCondition::text_mention("APPROVE"));
        coordinator.accept_input().unwrap();

        assert_eq!(coordinator.complete_turn(&said("primary", "draft")), TurnVerdict::Continue);
        let verdict = coordinator.complete_turn(&said("critic", "APPROVE"));
        assert!(matches!(verdict, TurnVerdict::Terminated(_)));
        assert_eq!(coordinator.state(), CoordinatorState::Terminated);

        let err = coordinator.accept_input().unwrap_err();
        assert_eq!(err.error_code(), "CONVERSATION_TERMINATED");
    }

    #[test]
    fn safeguard_bounds_endless_round_robin() {
        let mut coordinator = round_robin(TerminationCondition::Never).with_max_turns_safeguard(Some(5));
        coordinator.accept_input().unwrap();

        let mut verdict = TurnVerdict::Continue;
        let mut turns = 0;
        while verdict == TurnVerdict::Continue {
            verdict = coordinator.complete_turn(&said("x", "again"));
            turns += 1;
        }
        assert_eq!(turns, 5);
        assert_eq!(
            verdict,
            TurnVerdict::Terminated(TerminationReason::SafeguardReached { turns: 5 })
        );
    }

    #[test]
    fn reset_rewinds_pointer_and_clears_termination() {
        let mut coordinator = round_robin(TerminationCondition::max_turns(1));
        coordinator.accept_input().unwrap();
        coordinator.complete_turn(&said("primary", "draft"));
        assert_eq!(coordinator.state(), CoordinatorState::Terminated);
        assert_eq!(coordinator.next_participant(), &id("critic"));

        coordinator.reset();
        assert_eq!(coordinator.state(), CoordinatorState::AwaitingInput);
        assert_eq!(coordinator.next_participant(), &id("primary"));
        assert_eq!(coordinator.turns_taken(), 0);
        assert!(coordinator.termination_reason().is_none());
        assert!(coordinator.accept_input().is_ok());
    }

    #[test]
    fn empty_round_robin_is_rejected() {
        let err = TurnCoordinator::new(
            TurnMode::RoundRobin {
                participants: Vec::new(),
            },
            TerminationCondition::Never,
        )
        .unwrap_err();
        assert_eq!(err.error_code(), "INCOMPLETE_RUNNER");
    }

    #[test]
    fn interrupt_keeps_the_pointer() {
        let mut coordinator = round_robin(TerminationCondition::Never);
        coordinator.accept_input().unwrap();
        coordinator.complete_turn(&said("primary", "draft"));
        coordinator.interrupt();
        assert_eq!(coordinator.state(), CoordinatorState::AwaitingInput);
        assert_eq!(coordinator.next_participant(), &id("critic"));
    }
}

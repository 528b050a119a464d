//! Termination conditions for the turn loop.
//!
//! Conditions are checked after every agent turn against the newest agent
//! message and the number of turns taken so far. [`TextMention`] matches the
//! whole message text exactly, so an agent merely discussing the keyword
//! does not end the conversation.
//!
//! [`TextMention`]: TerminationCondition::TextMention

use parley_core::{AgentId, Message};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Predicate deciding when a conversation is over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TerminationCondition {
    /// The latest message's text equals the keyword (case-sensitive).
    TextMention(String),
    /// `n` agent turns have been taken.
    MaxTurns(usize),
    /// Never fires.
    #[default]
    Never,
    /// Fires when any inner condition fires; the first match wins.
    Any(Vec<TerminationCondition>),
}

impl TerminationCondition {
    pub fn text_mention(keyword: impl Into<String>) -> Self {
        TerminationCondition::TextMention(keyword.into())
    }

    pub fn max_turns(turns: usize) -> Self {
        TerminationCondition::MaxTurns(turns)
    }

    /// Logical OR. Nested `Any`s are flattened and `Never` is absorbed.
    pub fn or(self, other: TerminationCondition) -> Self {
        let mut conditions = Vec::new();
        for condition in [self, other] {
            match condition {
                TerminationCondition::Any(inner) => conditions.extend(inner),
                TerminationCondition::Never => {}
                single => conditions.push(single),
            }
        }
        match conditions.len() {
            0 => TerminationCondition::Never,
            1 => conditions.remove(0),
            _ => TerminationCondition::Any(conditions),
        }
    }

    /// Evaluate against the newest message after `turns_taken` turns.
    pub fn evaluate(&self, latest: &Message, turns_taken: usize) -> Option<TerminationReason> {
        match self {
            TerminationCondition::TextMention(keyword) => (latest.text() == keyword).then(|| {
                TerminationReason::TextMentioned {
                    keyword: keyword.clone(),
                    agent: latest.author().agent_id().cloned(),
                }
            }),
            TerminationCondition::MaxTurns(max) => (turns_taken >= *max)
                .then_some(TerminationReason::MaxTurnsReached { turns: turns_taken }),
            TerminationCondition::Never => None,
            TerminationCondition::Any(conditions) => conditions
                .iter()
                .find_map(|condition| condition.evaluate(latest, turns_taken)),
        }
    }
}

/// Which condition ended a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    TextMentioned {
        keyword: String,
        agent: Option<AgentId>,
    },
    MaxTurnsReached {
        turns: usize,
    },
    /// The round-robin safeguard stopped a conversation no condition ended.
    SafeguardReached {
        turns: usize,
    },
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::TextMentioned {
                keyword,
                agent: Some(agent),
            } => write!(f, "'{agent}' said '{keyword}'"),
            TerminationReason::TextMentioned {
                keyword,
                agent: None,
            } => write!(f, "'{keyword}' was mentioned"),
            TerminationReason::MaxTurnsReached { turns } => {
                write!(f, "maximum of {turns} turns reached")
            }
            TerminationReason::SafeguardReached { turns } => {
                write!(f, "safeguard stopped the conversation after {turns} turns")
            }
        }
    }
}

//! After-completion hooks.
//!
//! A hook sees every completion an agent receives before the agent acts on
//! it and may rewrite it. Hooks run in registration order.

use parley_core::AgentId;

use crate::completion::Completion;

pub trait CompletionHook: Send + Sync {
    fn after_completion(&self, agent: &AgentId, completion: Completion) -> Completion;
}

impl<F> CompletionHook for F
where
    F: Fn(&AgentId, Completion) -> Completion + Send + Sync,
{
    fn after_completion(&self, agent: &AgentId, completion: Completion) -> Completion {
        self(agent, completion)
    }
}

/// Marker editing agents close their output with.
pub const END_OF_EDIT_MARK: &str = "---END-OF-EDIT---";

/// Cuts text completions at the first occurrence of a marker.
///
/// Editing agents close their output with a marker such as
/// [`END_OF_EDIT_MARK`]; anything the model rambles on with afterwards is
/// dropped, along with trailing whitespace before the marker.
#[derive(Debug, Clone)]
pub struct TruncateAtMarker {
    marker: String,
}

impl TruncateAtMarker {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Truncate at [`END_OF_EDIT_MARK`].
    pub fn end_of_edit() -> Self {
        Self::new(END_OF_EDIT_MARK)
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl CompletionHook for TruncateAtMarker {
    fn after_completion(&self, agent: &AgentId, completion: Completion) -> Completion {
        match completion {
            Completion::Text { text } if !self.marker.is_empty() => match text.find(&self.marker) {
                Some(at) => {
                    tracing::debug!(agent = %agent, marker = %self.marker, "Truncated completion at marker");
                    Completion::text(text[..at].trim_end())
                }
                None => Completion::Text { text },
            },
            other => other,
        }
    }
}

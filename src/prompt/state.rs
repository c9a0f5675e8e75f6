//! Prompt slot state: idle, or awaiting the answer to one prompt key.

use crate::store::Promptable;

/// The outstanding-prompt slot of one conversation.
///
/// Transitions: `Idle → Awaiting(k)` when a prompt is created,
/// `Awaiting(k) → Idle` when the responder for `k` accepts the answer.
/// A rejected answer (or a missing responder) leaves the slot unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PromptState {
    #[default]
    Idle,
    Awaiting(String),
}

impl PromptState {
    /// Read the slot of `conversation_id` from any promptable state.
    /// An empty key counts as idle.
    pub fn of<S: Promptable + ?Sized>(state: &S, conversation_id: &str) -> Self {
        match state.prompt_key(conversation_id) {
            Some(key) if !key.is_empty() => Self::Awaiting(key.to_string()),
            _ => Self::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// The outstanding prompt key, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Awaiting(key) => Some(key),
        }
    }
}

impl std::fmt::Display for PromptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Awaiting(key) => write!(f, "awaiting({key})"),
        }
    }
}

//! State container traits.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::StoreError;

/// State that carries one outstanding-prompt slot per conversation.
pub trait Promptable {
    fn prompt_key(&self, conversation_id: &str) -> Option<&str>;
    fn set_prompt_key(&mut self, conversation_id: &str, prompt_key: Option<String>);
}

/// Application state held by a [`Store`].
///
/// Snapshots are immutable: the store clones the current state, applies an
/// action to the clone and publishes the result as a new snapshot.
pub trait AppState: Promptable + Clone + Send + Sync + 'static {
    /// Application-specific actions (use [`Infallible`] if there are none).
    type Action: fmt::Debug + Send + Sync + 'static;

    fn reduce(&mut self, action: &Self::Action);
}

/// An update request dispatched to the state container.
#[derive(Debug, Clone, PartialEq)]
pub enum Action<A> {
    /// Set (`Some`) or clear (`None`) the outstanding prompt key of one
    /// conversation.
    SetPromptKey {
        conversation_id: String,
        prompt_key: Option<String>,
    },
    /// Application-defined action, handed to [`AppState::reduce`].
    App(A),
}

impl<A> Action<A> {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SetPromptKey { .. } => "Set_PromptKey",
            Self::App(_) => "App",
        }
    }

    /// Reject actions no state could apply meaningfully.
    pub fn validate(&self) -> Result<(), StoreError> {
        match self {
            Self::SetPromptKey {
                conversation_id, ..
            } if conversation_id.is_empty() => Err(StoreError::Rejected {
                action: self.label().to_string(),
                reason: "prompt slot needs a conversation id".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Apply this action to `state`.
    pub fn apply<S>(&self, state: &mut S)
    where
        S: AppState<Action = A>,
    {
        match self {
            Self::SetPromptKey {
                conversation_id,
                prompt_key,
            } => state.set_prompt_key(conversation_id, prompt_key.clone()),
            Self::App(action) => state.reduce(action),
        }
    }
}

/// Shared state container: snapshot reads, dispatched writes, change notification.
#[async_trait]
pub trait Store<S: AppState>: Send + Sync {
    /// Current immutable snapshot.
    async fn get_state(&self) -> Arc<S>;

    /// Apply an action and publish the resulting snapshot.
    async fn dispatch(&self, action: Action<S::Action>) -> Result<(), StoreError>;

    /// Receiver notified with every new snapshot.
    fn subscribe(&self) -> watch::Receiver<Arc<S>>;
}

/// Conversational bookkeeping slice: outstanding prompt keys by conversation id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotData {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub prompt_keys: HashMap<String, String>,
}

impl Promptable for BotData {
    fn prompt_key(&self, conversation_id: &str) -> Option<&str> {
        self.prompt_keys.get(conversation_id).map(String::as_str)
    }

    fn set_prompt_key(&mut self, conversation_id: &str, prompt_key: Option<String>) {
        match prompt_key {
            Some(key) => {
                self.prompt_keys.insert(conversation_id.to_string(), key);
            }
            None => {
                self.prompt_keys.remove(conversation_id);
            }
        }
    }
}

/// `BotData` on its own is a usable state for bots without application data.
impl AppState for BotData {
    type Action = Infallible;

    fn reduce(&mut self, action: &Infallible) {
        match *action {}
    }
}

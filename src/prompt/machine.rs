//! The prompt state machine.
//!
//! [`Prompter`] holds the prompt creators (`text`, `choice`) and the slot
//! transitions (`set`, `clear`). [`Prompt`] adds the responder table, built
//! once from a factory that receives the `Prompter`, and routes answers to
//! it through [`Prompt::respond`].
//!
//! Slots are kept per conversation: every creator and transition takes the
//! [`Address`] of the conversation it acts on, usually the address of the
//! match that triggered it. While a conversation has a prompt outstanding
//! every inbound message of that conversation is consumed by the prompt,
//! whether or not the responder accepts it. A rejected answer is
//! dropped without feedback to the user; responders that want to re-ask
//! must send the guidance themselves.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::activity::{
    Activity, ActivityMeta, Address, ChannelAccount, Content, ConversationAccount, Message,
    SuggestedActions,
};
use crate::channels::Transport;
use crate::error::{DispatchError, Error, StoreError};
use crate::pipeline::{BoxRule, MessageMatch, Rule};
use crate::prompt::choice::ChoiceLists;
use crate::prompt::state::PromptState;
use crate::store::{Action, AppState, Store};

/// Decides whether an answer satisfies the outstanding prompt.
///
/// Receives the address of the answering conversation and the answer text.
/// Side effects (recording the answer, replying) happen before it resolves.
pub type Responder = Arc<dyn Fn(Address, String) -> BoxFuture<'static, bool> + Send + Sync>;

/// Responders keyed by prompt key.
pub type Responders = HashMap<String, Responder>;

/// Wrap an async closure as a [`Responder`].
pub fn responder<F, Fut>(f: F) -> Responder
where
    F: Fn(Address, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    Arc::new(move |address, text| f(address, text).boxed())
}

// ── Prompter ────────────────────────────────────────────────────────

/// Prompt creators and slot transitions.
pub struct Prompter<S: AppState> {
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store<S>>,
    choice_lists: Arc<ChoiceLists>,
    bot: ChannelAccount,
}

impl<S: AppState> Clone for Prompter<S> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            choice_lists: Arc::clone(&self.choice_lists),
            bot: self.bot.clone(),
        }
    }
}

impl<S: AppState> fmt::Debug for Prompter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompter")
            .field("transport", &self.transport.name())
            .field("choice_lists", &self.choice_lists.len())
            .field("bot", &self.bot)
            .finish()
    }
}

impl<S: AppState> Prompter<S> {
    /// `bot` is the account posted activities come from.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store<S>>,
        choice_lists: impl Into<Arc<ChoiceLists>>,
        bot: ChannelAccount,
    ) -> Self {
        Self {
            transport,
            store,
            choice_lists: choice_lists.into(),
            bot,
        }
    }

    pub fn choice_lists(&self) -> &ChoiceLists {
        &self.choice_lists
    }

    pub fn store(&self) -> &Arc<dyn Store<S>> {
        &self.store
    }

    /// Record `key` as the outstanding prompt of `address`'s conversation.
    pub async fn set(&self, address: &Address, key: &str) -> Result<(), StoreError> {
        self.store
            .dispatch(Action::SetPromptKey {
                conversation_id: address.conversation_id.clone(),
                prompt_key: Some(key.to_string()),
            })
            .await?;
        debug!(
            conversation = %address.conversation_id,
            prompt_key = key,
            "Prompt set"
        );
        Ok(())
    }

    /// Clear the outstanding prompt of `address`'s conversation.
    pub async fn clear(&self, address: &Address) -> Result<(), StoreError> {
        self.store
            .dispatch(Action::SetPromptKey {
                conversation_id: address.conversation_id.clone(),
                prompt_key: None,
            })
            .await?;
        debug!(conversation = %address.conversation_id, "Prompt cleared");
        Ok(())
    }

    /// Dispatch an application action to the store.
    pub async fn dispatch(&self, action: S::Action) -> Result<(), StoreError> {
        self.store.dispatch(Action::App(action)).await
    }

    /// Send content to `address`.
    pub async fn send(&self, address: &Address, content: impl Into<Content>) -> Result<(), Error> {
        self.transport.send_async(address, content.into()).await?;
        Ok(())
    }

    /// Free-text prompt: set `key` for `address`, then send `text` there.
    pub async fn text(
        &self,
        address: &Address,
        key: &str,
        text: impl Into<String>,
    ) -> Result<(), Error> {
        self.set(address, key).await?;
        self.send(address, text.into()).await
    }

    /// Choice prompt: set `key` for `address`, then post `text` with one
    /// `postBack` suggested action per entry of list `list`.
    ///
    /// An unknown list is a no-op: nothing is set and nothing is sent.
    pub async fn choice(
        &self,
        address: &Address,
        key: &str,
        list: &str,
        text: impl Into<String>,
    ) -> Result<(), Error> {
        let Some(choices) = self.choice_lists.get(list) else {
            warn!(prompt_key = key, choice_list = list, "Unknown choice list, prompt not sent");
            return Ok(());
        };

        self.set(address, key).await?;

        let activity = Activity::Message(Message {
            meta: ActivityMeta {
                id: Some(uuid::Uuid::new_v4().to_string()),
                from: self.bot.clone(),
                conversation: Some(ConversationAccount {
                    id: address.conversation_id.clone(),
                }),
                channel_id: Some(address.channel_id.clone()),
                timestamp: Some(Utc::now()),
            },
            text: text.into(),
            suggested_actions: Some(SuggestedActions::post_back(choices)),
        });
        self.transport.post_activity(activity).await?;
        Ok(())
    }

    /// Build a responder that resolves the answer against list `list`
    /// (case-insensitive, first entry wins) and hands the result to `f`.
    ///
    /// `f` receives `None` when the answer matches no entry, or when the list
    /// does not exist.
    pub fn choice_responder<F, Fut>(&self, list: &str, f: F) -> Responder
    where
        F: Fn(Address, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let lists = Arc::clone(&self.choice_lists);
        let list = list.to_string();
        responder(move |address: Address, text: String| {
            let choice = lists.find_choice(&list, &text).map(str::to_string);
            f(address, choice)
        })
    }
}

// ── Prompt ──────────────────────────────────────────────────────────

/// A [`Prompter`] plus the responders that answer its prompts.
pub struct Prompt<S: AppState> {
    prompter: Prompter<S>,
    responders: Responders,
}

impl<S: AppState> Prompt<S> {
    /// Build the responder table once, from a factory that may capture
    /// clones of the prompter.
    pub fn new<F>(prompter: Prompter<S>, factory: F) -> Self
    where
        F: FnOnce(&Prompter<S>) -> Responders,
    {
        let responders = factory(&prompter);
        Self {
            prompter,
            responders,
        }
    }

    pub fn prompter(&self) -> &Prompter<S> {
        &self.prompter
    }

    pub fn has_responder(&self, key: &str) -> bool {
        self.responders.contains_key(key)
    }

    /// Offer `message` to the prompt outstanding in its conversation.
    ///
    /// Returns `false` when that conversation has no prompt outstanding
    /// (normal routing should continue) and `true` otherwise, whether or not
    /// the answer was accepted. The slot is cleared only when the responder
    /// returns `true`. Slots of other conversations are never read or touched.
    pub async fn respond(&self, state: &S, message: &Message) -> Result<bool, Error> {
        let address = message.meta.address();
        let key = match PromptState::of(state, &address.conversation_id) {
            PromptState::Idle => return Ok(false),
            PromptState::Awaiting(key) => key,
        };

        match self.responders.get(&key) {
            Some(responder) => {
                if responder(address.clone(), message.text.clone()).await {
                    debug!(prompt_key = %key, "Prompt answered");
                    self.prompter.clear(&address).await?;
                } else {
                    debug!(prompt_key = %key, "Answer rejected, prompt still outstanding");
                }
            }
            None => {
                warn!(prompt_key = %key, "No responder registered for outstanding prompt");
            }
        }

        Ok(true)
    }

    /// Adapt [`respond`](Self::respond) into a message rule.
    ///
    /// Placed first in the message chain, it consumes every message of a
    /// conversation while that conversation has a prompt outstanding.
    pub fn rule<D>(self: &Arc<Self>) -> BoxRule<MessageMatch<S, D>>
    where
        D: Send + Sync + 'static,
    {
        Arc::new(PromptRule {
            prompt: Arc::clone(self),
        })
    }
}

impl<S: AppState> Deref for Prompt<S> {
    type Target = Prompter<S>;

    fn deref(&self) -> &Prompter<S> {
        &self.prompter
    }
}

struct PromptRule<S: AppState> {
    prompt: Arc<Prompt<S>>,
}

#[async_trait]
impl<S, D> Rule<MessageMatch<S, D>> for PromptRule<S>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    async fn call_handler_if_match(&self, m: &MessageMatch<S, D>) -> Result<bool, DispatchError> {
        self.prompt
            .respond(&m.state, &m.message)
            .await
            .map_err(|e| DispatchError::Handler(e.into()))
    }
}

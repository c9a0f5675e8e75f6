//! Match records threaded through the rule pipeline.
//!
//! Each stage produces a new record that embeds the previous one by value
//! and adds its own fields; nothing set by an earlier stage is changed.
//!
//! ```text
//! ActivityMatch ─► StateMatch ─┬─► MessageMatch
//!                              ├─► EventMatch
//!                              └─► TypingMatch
//! ```

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::activity::{Activity, Address, Content, EventActivity, Message, Typing};
use crate::channels::Transport;
use crate::error::ChannelError;
use crate::store::{AppState, Store};

// ── Activity match ──────────────────────────────────────────────────

/// Bare activity, as pulled from the transport.
#[derive(Debug, Clone)]
pub struct ActivityMatch {
    pub activity: Arc<Activity>,
}

impl ActivityMatch {
    pub fn new(activity: Activity) -> Self {
        Self {
            activity: Arc::new(activity),
        }
    }
}

// ── Replier ─────────────────────────────────────────────────────────

/// Reply functions bound to one address and the transport.
#[derive(Clone)]
pub struct Replier {
    address: Address,
    transport: Arc<dyn Transport>,
}

impl Replier {
    pub fn new(address: Address, transport: Arc<dyn Transport>) -> Self {
        Self { address, transport }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Fire-and-forget reply.
    pub fn reply(&self, content: impl Into<Content>) {
        self.transport.send(&self.address, content.into());
    }

    /// Reply and wait for the transport to accept it.
    pub async fn reply_async(&self, content: impl Into<Content>) -> Result<(), ChannelError> {
        self.transport.send_async(&self.address, content.into()).await
    }
}

impl fmt::Debug for Replier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replier")
            .field("address", &self.address)
            .field("transport", &self.transport.name())
            .finish()
    }
}

// ── State match ─────────────────────────────────────────────────────

/// Activity enriched with address, reply functions and a state snapshot.
///
/// `state` is captured once per activity; every downstream stage sees the
/// same snapshot even if the store changes meanwhile.
pub struct StateMatch<S: AppState, D> {
    pub activity: Arc<Activity>,
    pub address: Address,
    pub replier: Replier,
    /// Projection of `state` relevant to conversational bookkeeping.
    pub data: Arc<D>,
    pub state: Arc<S>,
    /// Back-reference for stages that need to read or update the container.
    pub store: Arc<dyn Store<S>>,
}

impl<S: AppState, D> StateMatch<S, D> {
    pub fn reply(&self, content: impl Into<Content>) {
        self.replier.reply(content);
    }

    pub async fn reply_async(&self, content: impl Into<Content>) -> Result<(), ChannelError> {
        self.replier.reply_async(content).await
    }
}

impl<S: AppState, D> Clone for StateMatch<S, D> {
    fn clone(&self) -> Self {
        Self {
            activity: Arc::clone(&self.activity),
            address: self.address.clone(),
            replier: self.replier.clone(),
            data: Arc::clone(&self.data),
            state: Arc::clone(&self.state),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: AppState + fmt::Debug, D: fmt::Debug> fmt::Debug for StateMatch<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMatch")
            .field("activity", &self.activity)
            .field("address", &self.address)
            .field("data", &self.data)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ── Narrowed matches ────────────────────────────────────────────────

/// A [`StateMatch`] whose activity is a message.
pub struct MessageMatch<S: AppState, D> {
    pub base: StateMatch<S, D>,
    pub message: Message,
    pub text: String,
}

/// A [`StateMatch`] whose activity is an event.
pub struct EventMatch<S: AppState, D> {
    pub base: StateMatch<S, D>,
    pub event: EventActivity,
}

/// A [`StateMatch`] whose activity is a typing notice.
pub struct TypingMatch<S: AppState, D> {
    pub base: StateMatch<S, D>,
    pub typing: Typing,
}

macro_rules! narrowed_match {
    ($name:ident { $($field:ident),* }) => {
        impl<S: AppState, D> Deref for $name<S, D> {
            type Target = StateMatch<S, D>;

            fn deref(&self) -> &Self::Target {
                &self.base
            }
        }

        impl<S: AppState, D> Clone for $name<S, D> {
            fn clone(&self) -> Self {
                Self {
                    base: self.base.clone(),
                    $($field: self.$field.clone()),*
                }
            }
        }

        impl<S: AppState + fmt::Debug, D: fmt::Debug> fmt::Debug for $name<S, D> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("base", &self.base)
                    $(.field(stringify!($field), &self.$field))*
                    .finish()
            }
        }
    };
}

narrowed_match!(MessageMatch { message, text });
narrowed_match!(EventMatch { event });
narrowed_match!(TypingMatch { typing });

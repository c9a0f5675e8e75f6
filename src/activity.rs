//! Conversational activities and the addresses derived from them.
//!
//! An [`Activity`] is one unit of traffic: a message, a structured event, a
//! typing notice, or anything else the channel forwards. It is immutable
//! once received; the pipeline only ever wraps it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel id used when an activity does not carry one.
pub const DEFAULT_CHANNEL_ID: &str = "default";

// ── Accounts ────────────────────────────────────────────────────────

/// A participant on the channel (user or bot).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The conversation an activity belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
}

// ── Activity ────────────────────────────────────────────────────────

/// Fields shared by every activity variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub from: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A text message, optionally offering suggested replies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(flatten)]
    pub meta: ActivityMeta,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<SuggestedActions>,
}

/// A structured, named event with an arbitrary payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventActivity {
    #[serde(flatten)]
    pub meta: ActivityMeta,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// "User is typing" notice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Typing {
    #[serde(flatten)]
    pub meta: ActivityMeta,
}

/// Any activity type the engine has no dedicated variant for.
///
/// Never carries `message`, `event` or `typing`: a malformed activity of a
/// known type fails to deserialize instead of landing here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOtherActivity")]
pub struct OtherActivity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub meta: ActivityMeta,
}

#[derive(Deserialize)]
struct RawOtherActivity {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    meta: ActivityMeta,
}

impl TryFrom<RawOtherActivity> for OtherActivity {
    type Error = String;

    fn try_from(raw: RawOtherActivity) -> Result<Self, Self::Error> {
        match raw.kind.as_str() {
            "message" | "event" | "typing" => {
                Err(format!("malformed activity of type `{}`", raw.kind))
            }
            _ => Ok(Self {
                kind: raw.kind,
                meta: raw.meta,
            }),
        }
    }
}

/// Inbound or outbound unit of conversational traffic, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Activity {
    Message(Message),
    Event(EventActivity),
    Typing(Typing),
    #[serde(untagged)]
    Other(OtherActivity),
}

impl Activity {
    /// Build an inbound text message from `user` in `conversation_id`.
    pub fn message(
        user: ChannelAccount,
        conversation_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::Message(Message {
            meta: ActivityMeta {
                id: Some(uuid::Uuid::new_v4().to_string()),
                from: user,
                conversation: Some(ConversationAccount {
                    id: conversation_id.into(),
                }),
                channel_id: None,
                timestamp: Some(Utc::now()),
            },
            text: text.into(),
            suggested_actions: None,
        })
    }

    /// The `type` discriminant as it appears on the wire.
    pub fn kind(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::Event(_) => "event",
            Self::Typing(_) => "typing",
            Self::Other(other) => &other.kind,
        }
    }

    pub fn meta(&self) -> &ActivityMeta {
        match self {
            Self::Message(m) => &m.meta,
            Self::Event(e) => &e.meta,
            Self::Typing(t) => &t.meta,
            Self::Other(o) => &o.meta,
        }
    }

    /// Derive the reply address for this activity.
    pub fn address(&self) -> Address {
        self.meta().address()
    }
}

impl ActivityMeta {
    /// Total: a missing channel id falls back to [`DEFAULT_CHANNEL_ID`], a
    /// missing conversation to the sender's id.
    pub fn address(&self) -> Address {
        Address {
            channel_id: self
                .channel_id
                .clone()
                .unwrap_or_else(|| DEFAULT_CHANNEL_ID.to_string()),
            conversation_id: self
                .conversation
                .as_ref()
                .map(|c| c.id.clone())
                .unwrap_or_else(|| self.from.id.clone()),
            user: self.from.clone(),
        }
    }
}

// ── Address ─────────────────────────────────────────────────────────

/// Identifies the conversation and recipient replies are sent to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub channel_id: String,
    pub conversation_id: String,
    pub user: ChannelAccount,
}

// ── Suggested actions ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardActionKind {
    PostBack,
}

/// A selectable reply affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardAction {
    #[serde(rename = "type")]
    pub kind: CardActionKind,
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedActions {
    pub actions: Vec<CardAction>,
}

impl SuggestedActions {
    /// One `postBack` action per choice, in order, titled and valued by the choice.
    pub fn post_back<I, T>(choices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let actions = choices
            .into_iter()
            .map(|choice| {
                let choice = choice.into();
                CardAction {
                    kind: CardActionKind::PostBack,
                    title: choice.clone(),
                    value: choice,
                }
            })
            .collect();
        Self { actions }
    }

    pub fn values(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.value.as_str()).collect()
    }
}

// ── Outbound content ────────────────────────────────────────────────

/// What a handler can send back: plain text or a fully formed activity.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Activity(Box<Activity>),
}

impl Content {
    /// The text carried by this content, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Activity(activity) => match activity.as_ref() {
                Activity::Message(m) => Some(&m.text),
                _ => None,
            },
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Activity> for Content {
    fn from(activity: Activity) -> Self {
        Self::Activity(Box::new(activity))
    }
}

//! Shape filters: narrow a `StateMatch` to a typed activity variant.
//!
//! A mismatch is an empty stream (the activity skips that sub-tree), never
//! an error.

use futures::StreamExt;
use futures::stream::{self, BoxStream};

use crate::activity::Activity;
use crate::pipeline::rules::Matcher;
use crate::pipeline::types::{EventMatch, MessageMatch, StateMatch, TypingMatch};
use crate::store::AppState;

pub fn as_message<S: AppState, D>(m: &StateMatch<S, D>) -> Option<MessageMatch<S, D>> {
    match m.activity.as_ref() {
        Activity::Message(message) => Some(MessageMatch {
            base: m.clone(),
            text: message.text.clone(),
            message: message.clone(),
        }),
        _ => None,
    }
}

pub fn as_event<S: AppState, D>(m: &StateMatch<S, D>) -> Option<EventMatch<S, D>> {
    match m.activity.as_ref() {
        Activity::Event(event) => Some(EventMatch {
            base: m.clone(),
            event: event.clone(),
        }),
        _ => None,
    }
}

pub fn as_typing<S: AppState, D>(m: &StateMatch<S, D>) -> Option<TypingMatch<S, D>> {
    match m.activity.as_ref() {
        Activity::Typing(typing) => Some(TypingMatch {
            base: m.clone(),
            typing: typing.clone(),
        }),
        _ => None,
    }
}

fn message_stream<S, D>(m: &StateMatch<S, D>) -> BoxStream<'static, MessageMatch<S, D>>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    stream::iter(as_message(m)).boxed()
}

fn event_stream<S, D>(m: &StateMatch<S, D>) -> BoxStream<'static, EventMatch<S, D>>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    stream::iter(as_event(m)).boxed()
}

fn typing_stream<S, D>(m: &StateMatch<S, D>) -> BoxStream<'static, TypingMatch<S, D>>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    stream::iter(as_typing(m)).boxed()
}

/// Matcher passing only message activities.
pub fn messages<S, D>() -> impl Matcher<StateMatch<S, D>, MessageMatch<S, D>>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    message_stream::<S, D>
}

/// Matcher passing only event activities.
pub fn events<S, D>() -> impl Matcher<StateMatch<S, D>, EventMatch<S, D>>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    event_stream::<S, D>
}

/// Matcher passing only typing notices.
pub fn typing<S, D>() -> impl Matcher<StateMatch<S, D>, TypingMatch<S, D>>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    typing_stream::<S, D>
}

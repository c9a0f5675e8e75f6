//! Dispatch observability hooks.
//!
//! The dispatcher reports each pipeline checkpoint as a [`DispatchEvent`] to
//! every registered [`DispatchHook`]. Hooks observe only; they cannot change
//! routing.

use std::fmt;

use serde::Serialize;
use tracing::{debug, error, info};

/// Counters for one dispatcher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub received: u64,
    pub matched: u64,
    pub unmatched: u64,
    pub errors: u64,
}

/// Pipeline checkpoint reported to hooks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// An activity was pulled from the stream.
    Received {
        activity_id: Option<String>,
        kind: String,
    },
    /// A handler matched and completed.
    Matched { kind: String },
    /// No rule matched; nothing ran.
    Unmatched { kind: String },
    /// Rule evaluation failed.
    Errored { kind: String, error: String },
    /// The activity stream ended.
    Completed { summary: DispatchSummary },
    /// The dispatcher stopped pulling because shutdown was requested.
    Cancelled { summary: DispatchSummary },
}

impl DispatchEvent {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Received { .. } => "received",
            Self::Matched { .. } => "matched",
            Self::Unmatched { .. } => "unmatched",
            Self::Errored { .. } => "errored",
            Self::Completed { .. } => "completed",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Observer of dispatch events.
pub trait DispatchHook: Send + Sync {
    fn on_event(&self, event: &DispatchEvent);
}

impl<F> DispatchHook for F
where
    F: Fn(&DispatchEvent) + Send + Sync,
{
    fn on_event(&self, event: &DispatchEvent) {
        self(event)
    }
}

/// Hook that turns dispatch events into `tracing` records.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingHook;

impl DispatchHook for TracingHook {
    fn on_event(&self, event: &DispatchEvent) {
        match event {
            DispatchEvent::Received { activity_id, kind } => {
                debug!(kind = %kind, activity_id = ?activity_id, "Activity received");
            }
            DispatchEvent::Matched { kind } => debug!(kind = %kind, "Activity handled"),
            DispatchEvent::Unmatched { kind } => debug!(kind = %kind, "No rule matched activity"),
            DispatchEvent::Errored { kind, error } => {
                error!(kind = %kind, error = %error, "Error handling activity");
            }
            DispatchEvent::Completed { summary } => info!(
                received = summary.received,
                matched = summary.matched,
                errors = summary.errors,
                "Activity stream completed"
            ),
            DispatchEvent::Cancelled { summary } => info!(
                received = summary.received,
                matched = summary.matched,
                errors = summary.errors,
                "Dispatcher cancelled"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn closures_are_hooks() {
        let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let hook = move |event: &DispatchEvent| sink.lock().unwrap().push(event.label());

        hook.on_event(&DispatchEvent::Matched {
            kind: "message".into(),
        });
        hook.on_event(&DispatchEvent::Completed {
            summary: DispatchSummary::default(),
        });
        assert_eq!(*seen.lock().unwrap(), vec!["matched", "completed"]);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = DispatchEvent::Errored {
            kind: "message".into(),
            error: "boom".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "errored");
        assert_eq!(json["error"], "boom");
        assert_eq!(event.to_string(), "errored");
    }
}

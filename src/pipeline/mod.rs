//! Activity routing pipeline.
//!
//! Every inbound activity flows through:
//! 1. `Transport::activities()`: the single ordered source
//! 2. `ContextEnricher`: address, reply functions, state snapshot
//! 3. Shape filters: message / event / typing narrowing
//! 4. The rule tree (`first`, `prepend`, `filter`, `run`): exactly one handler
//!
//! The `Dispatcher` drives the loop with one activity in flight at a time.

pub mod dispatcher;
pub mod enricher;
pub mod filters;
pub mod hooks;
pub mod rules;
pub mod text;
pub mod types;

pub use dispatcher::{ActivityRules, Dispatcher, DispatcherHandle};
pub use enricher::ContextEnricher;
pub use hooks::{DispatchEvent, DispatchHook, DispatchSummary, TracingHook};
pub use rules::{BoxRule, HandlerResult, Matcher, Rule, filter, first, prepend, run};
pub use text::{RegexMatch, TextContext, matches_regex, text_is};
pub use types::{ActivityMatch, EventMatch, MessageMatch, Replier, StateMatch, TypingMatch};

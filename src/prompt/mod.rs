//! Outstanding-prompt state machine, one slot per conversation.
//!
//! A handler calls a prompt creator (`text` or `choice`) to suspend normal
//! routing in its conversation; the next inbound message of that
//! conversation goes to the responder registered for the prompt key instead
//! of the message rules.

pub mod choice;
pub mod machine;
pub mod state;

pub use choice::ChoiceLists;
pub use machine::{Prompt, Prompter, Responder, Responders, responder};
pub use state::PromptState;

//! chat-rules: rule-based activity dispatch for conversational bots.

pub mod activity;
pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompt;
pub mod store;

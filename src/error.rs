//! Error types for chat-rules.

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Activity stream of channel {name} was already consumed")]
    StreamConsumed { name: String },

    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// State container errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Action {action} was rejected: {reason}")]
    Rejected { action: String, reason: String },
}

/// Errors raised while dispatching an activity through the rule tree.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Handler failed: {0:#}")]
    Handler(anyhow::Error),

    #[error("Dispatcher task aborted: {0}")]
    Aborted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_display_includes_context_chain() {
        let err = anyhow::anyhow!("disk full").context("saving profile");
        let dispatch = DispatchError::Handler(err);
        assert_eq!(
            dispatch.to_string(),
            "Handler failed: saving profile: disk full"
        );
    }

    #[test]
    fn channel_error_converts_into_top_level() {
        let err: Error = ChannelError::StreamConsumed { name: "cli".into() }.into();
        assert!(matches!(err, Error::Channel(ChannelError::StreamConsumed { .. })));
        assert_eq!(
            err.to_string(),
            "Channel error: Activity stream of channel cli was already consumed"
        );
    }
}

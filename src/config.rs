//! Configuration types.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::activity::ChannelAccount;
use crate::error::ConfigError;

/// What the dispatcher does after a handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Report the error and keep processing the next activity.
    #[default]
    Continue,
    /// Report the error and stop the dispatcher with that error.
    Halt,
}

impl FromStr for ErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" | "resume" => Ok(Self::Continue),
            "halt" | "stop" => Ok(Self::Halt),
            other => Err(ConfigError::InvalidValue {
                key: "CHAT_RULES_ERROR_POLICY".into(),
                message: format!("expected 'continue' or 'halt', got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => f.write_str("continue"),
            Self::Halt => f.write_str("halt"),
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    pub error_policy: ErrorPolicy,
}

/// Bot-level configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Account used as `from` on activities the bot posts.
    pub bot_id: String,
    pub bot_name: Option<String>,
    pub error_policy: ErrorPolicy,
    /// JSON file with the choice lists (`{ "name": ["a", "b"] }`).
    pub choices_path: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_id: "chat-rules".to_string(),
            bot_name: None,
            error_policy: ErrorPolicy::default(),
            choices_path: None,
        }
    }
}

impl BotConfig {
    /// Read configuration from `CHAT_RULES_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bot_id = lookup("CHAT_RULES_BOT_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.bot_id);

        let bot_name = lookup("CHAT_RULES_BOT_NAME").filter(|s| !s.trim().is_empty());

        let error_policy = match lookup("CHAT_RULES_ERROR_POLICY") {
            Some(value) => value.parse()?,
            None => defaults.error_policy,
        };

        let choices_path = lookup("CHAT_RULES_CHOICES")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bot_id,
            bot_name,
            error_policy,
            choices_path,
        })
    }

    /// The bot's channel account.
    pub fn bot_account(&self) -> ChannelAccount {
        let account = ChannelAccount::new(&self.bot_id);
        match &self.bot_name {
            Some(name) => account.with_name(name),
            None => account,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            error_policy: self.error_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = BotConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bot_id, "chat-rules");
        assert_eq!(config.error_policy, ErrorPolicy::Continue);
        assert!(config.choices_path.is_none());
        assert_eq!(config.bot_account(), ChannelAccount::new("chat-rules"));
    }

    #[test]
    fn reads_all_keys() {
        let config = BotConfig::from_lookup(lookup(&[
            ("CHAT_RULES_BOT_ID", "RecipeBot"),
            ("CHAT_RULES_BOT_NAME", "Recipe Bot"),
            ("CHAT_RULES_ERROR_POLICY", "HALT"),
            ("CHAT_RULES_CHOICES", "/etc/bot/choices.json"),
        ]))
        .unwrap();
        assert_eq!(config.bot_account().id, "RecipeBot");
        assert_eq!(config.bot_account().name.as_deref(), Some("Recipe Bot"));
        assert_eq!(config.dispatcher_config().error_policy, ErrorPolicy::Halt);
        assert_eq!(
            config.choices_path,
            Some(PathBuf::from("/etc/bot/choices.json"))
        );
    }

    #[test]
    fn rejects_unknown_error_policy() {
        let err = BotConfig::from_lookup(lookup(&[("CHAT_RULES_ERROR_POLICY", "retry")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn error_policy_display_round_trips() {
        for policy in [ErrorPolicy::Continue, ErrorPolicy::Halt] {
            assert_eq!(policy.to_string().parse::<ErrorPolicy>().unwrap(), policy);
        }
    }
}

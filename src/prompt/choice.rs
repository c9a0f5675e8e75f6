//! Named choice lists for choice-style prompts.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Read-only mapping from list name to its ordered choices.
///
/// Serialized as a plain JSON object: `{ "colors": ["Red", "Blue"] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChoiceLists(HashMap<String, Vec<String>>);

impl ChoiceLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a list. Builder-style, for construction time.
    pub fn with_list<I, T>(mut self, name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.insert(name, choices);
        self
    }

    pub fn insert<I, T>(&mut self, name: impl Into<String>, choices: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.0
            .insert(name.into(), choices.into_iter().map(Into::into).collect());
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve `text` against list `name`: case-insensitive equality, first
    /// entry wins. `None` when nothing matches or the list does not exist.
    pub fn find_choice(&self, name: &str, text: &str) -> Option<&str> {
        let wanted = text.to_lowercase();
        self.get(name)?
            .iter()
            .find(|choice| choice.to_lowercase() == wanted)
            .map(String::as_str)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::ParseError(format!("choice lists: {e}")))
    }

    /// Load lists from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

impl<K, V, T> FromIterator<(K, V)> for ChoiceLists
where
    K: Into<String>,
    V: IntoIterator<Item = T>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut lists = Self::new();
        for (name, choices) in iter {
            lists.insert(name, choices);
        }
        lists
    }
}

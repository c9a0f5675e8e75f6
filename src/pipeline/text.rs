//! Text helpers for message rules: regex matching and exact-text predicates.

use std::ops::Deref;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use regex::Regex;

use crate::pipeline::rules::Matcher;
use crate::pipeline::types::MessageMatch;
use crate::store::AppState;

/// Match records that carry inbound text.
pub trait TextContext {
    fn text(&self) -> &str;
}

impl<S: AppState, D> TextContext for MessageMatch<S, D> {
    fn text(&self) -> &str {
        &self.text
    }
}

/// A text match extended with regex capture groups.
#[derive(Debug, Clone)]
pub struct RegexMatch<M> {
    pub base: M,
    /// Capture groups; index 0 is the whole match.
    pub groups: Vec<Option<String>>,
}

impl<M> RegexMatch<M> {
    /// Capture group `index`, if it participated in the match.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }
}

impl<M> Deref for RegexMatch<M> {
    type Target = M;

    fn deref(&self) -> &M {
        &self.base
    }
}

impl<M: TextContext> TextContext for RegexMatch<M> {
    fn text(&self) -> &str {
        self.base.text()
    }
}

/// Matcher yielding a [`RegexMatch`] when the text matches `regex`.
pub struct RegexMatcher {
    regex: Regex,
}

impl<M> Matcher<M, RegexMatch<M>> for RegexMatcher
where
    M: TextContext + Clone + Send + Sync + 'static,
{
    fn matches(&self, input: &M) -> BoxStream<'static, RegexMatch<M>> {
        let matched = self.regex.captures(input.text()).map(|caps| RegexMatch {
            base: input.clone(),
            groups: caps
                .iter()
                .map(|g| g.map(|g| g.as_str().to_string()))
                .collect(),
        });
        stream::iter(matched).boxed()
    }
}

pub fn matches_regex(regex: Regex) -> RegexMatcher {
    RegexMatcher { regex }
}

/// Predicate: text equals `expected`, ignoring case and surrounding whitespace.
pub fn text_is<M: TextContext>(expected: &str) -> impl Fn(&M) -> bool + Send + Sync + use<M> {
    let expected = expected.trim().to_lowercase();
    move |m: &M| m.text().trim().to_lowercase() == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Said(&'static str);

    impl TextContext for Said {
        fn text(&self) -> &str {
            self.0
        }
    }

    #[tokio::test]
    async fn regex_matcher_captures_groups() {
        let matcher = matches_regex(Regex::new(r"(?i)^call me (\w+)$").unwrap());
        let found: Vec<RegexMatch<Said>> = matcher.matches(&Said("Call me Ishmael")).collect().await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].group(1), Some("Ishmael"));
        assert_eq!(found[0].text(), "Call me Ishmael");
    }

    #[tokio::test]
    async fn regex_matcher_yields_nothing_on_miss() {
        let matcher = matches_regex(Regex::new(r"^\d+$").unwrap());
        let found: Vec<RegexMatch<Said>> = matcher.matches(&Said("abc")).collect().await;
        assert!(found.is_empty());
    }

    #[test]
    fn text_is_ignores_case_and_whitespace() {
        let predicate = text_is::<Said>("Color");
        assert!(predicate(&Said("  color ")));
        assert!(predicate(&Said("COLOR")));
        assert!(!predicate(&Said("colors")));
    }
}

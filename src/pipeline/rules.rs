//! Rule combinators.
//!
//! A rule tree is a lazy decision tree over one match record, evaluated
//! top-to-bottom and left-to-right with first-match-commits semantics:
//! - `first(rules)` tries children in order and stops at the first match
//! - `prepend(matcher, rule)` transforms/narrows the match before delegating
//! - `filter(predicate, rule)` gates on a predicate
//! - `run(handler)` always matches and awaits the handler
//!
//! `call_handler_if_match` returns `Ok(true)` when some handler ran,
//! `Ok(false)` when nothing matched (no side effects), and `Err` when a
//! handler failed.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tracing::trace;

use crate::error::DispatchError;

/// Result type returned by `run` handlers.
pub type HandlerResult = anyhow::Result<()>;

/// Shared, immutable rule tree node.
pub type BoxRule<M> = Arc<dyn Rule<M>>;

/// A predicate-guarded handler over match records of type `M`.
#[async_trait]
pub trait Rule<M>: Send + Sync {
    async fn call_handler_if_match(&self, m: &M) -> Result<bool, DispatchError>;
}

/// Transform from one match record into zero or more narrowed records.
///
/// The returned stream is pulled lazily; an empty stream means "no match".
pub trait Matcher<I, O>: Send + Sync {
    fn matches(&self, input: &I) -> BoxStream<'static, O>;
}

impl<I, O, F> Matcher<I, O> for F
where
    F: Fn(&I) -> BoxStream<'static, O> + Send + Sync,
{
    fn matches(&self, input: &I) -> BoxStream<'static, O> {
        self(input)
    }
}

// ── first ───────────────────────────────────────────────────────────

struct First<M> {
    rules: Vec<BoxRule<M>>,
}

#[async_trait]
impl<M> Rule<M> for First<M>
where
    M: Send + Sync + 'static,
{
    async fn call_handler_if_match(&self, m: &M) -> Result<bool, DispatchError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.call_handler_if_match(m).await? {
                trace!(index, "first: rule matched");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Try `rules` in order; commit to the first one that matches.
pub fn first<M, I>(rules: I) -> BoxRule<M>
where
    M: Send + Sync + 'static,
    I: IntoIterator<Item = BoxRule<M>>,
{
    Arc::new(First {
        rules: rules.into_iter().collect(),
    })
}

// ── prepend ─────────────────────────────────────────────────────────

struct Prepend<I, O> {
    matcher: Box<dyn Matcher<I, O>>,
    inner: BoxRule<O>,
}

#[async_trait]
impl<I, O> Rule<I> for Prepend<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    async fn call_handler_if_match(&self, m: &I) -> Result<bool, DispatchError> {
        let mut matches = self.matcher.matches(m);
        while let Some(next) = matches.next().await {
            if self.inner.call_handler_if_match(&next).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Run `matcher` first, then evaluate `inner` on each produced match until one matches.
pub fn prepend<I, O, T>(matcher: T, inner: BoxRule<O>) -> BoxRule<I>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
    T: Matcher<I, O> + 'static,
{
    Arc::new(Prepend {
        matcher: Box::new(matcher),
        inner,
    })
}

// ── filter ──────────────────────────────────────────────────────────

struct Filter<M> {
    predicate: Box<dyn Fn(&M) -> bool + Send + Sync>,
    inner: BoxRule<M>,
}

#[async_trait]
impl<M> Rule<M> for Filter<M>
where
    M: Send + Sync + 'static,
{
    async fn call_handler_if_match(&self, m: &M) -> Result<bool, DispatchError> {
        if !(self.predicate)(m) {
            return Ok(false);
        }
        self.inner.call_handler_if_match(m).await
    }
}

/// Delegate to `inner` only when `predicate` holds.
pub fn filter<M, P>(predicate: P, inner: BoxRule<M>) -> BoxRule<M>
where
    M: Send + Sync + 'static,
    P: Fn(&M) -> bool + Send + Sync + 'static,
{
    Arc::new(Filter {
        predicate: Box::new(predicate),
        inner,
    })
}

// ── run ─────────────────────────────────────────────────────────────

struct Run<F> {
    handler: F,
}

#[async_trait]
impl<M, F, Fut> Rule<M> for Run<F>
where
    M: Clone + Send + Sync + 'static,
    F: Fn(M) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call_handler_if_match(&self, m: &M) -> Result<bool, DispatchError> {
        (self.handler)(m.clone())
            .await
            .map_err(DispatchError::Handler)?;
        Ok(true)
    }
}

/// Terminal rule: always matches and runs `handler` for its side effect.
pub fn run<M, F, Fut>(handler: F) -> BoxRule<M>
where
    M: Clone + Send + Sync + 'static,
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(Run { handler })
}

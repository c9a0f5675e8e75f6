//! Dispatcher: the single-consumer activity loop.
//!
//! Pulls one activity at a time from the transport, wraps it in an
//! [`ActivityMatch`], evaluates the rule tree and waits for the evaluation
//! (handlers and their sends included) to settle before pulling the next
//! one. No two activities are ever mid-handler at the same time.

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::channels::Transport;
use crate::config::{DispatcherConfig, ErrorPolicy};
use crate::error::{DispatchError, Error};
use crate::pipeline::enricher::ContextEnricher;
use crate::pipeline::filters;
use crate::pipeline::hooks::{DispatchEvent, DispatchHook, DispatchSummary, TracingHook};
use crate::pipeline::rules::{BoxRule, first, prepend};
use crate::pipeline::types::{ActivityMatch, EventMatch, MessageMatch, StateMatch, TypingMatch};
use crate::store::{AppState, Store};

/// Per-shape rule sets, evaluated in priority order:
/// messages, events, typing, then the catch-all `other`.
pub struct ActivityRules<S: AppState, D> {
    pub messages: Option<BoxRule<MessageMatch<S, D>>>,
    pub events: Option<BoxRule<EventMatch<S, D>>>,
    pub typing: Option<BoxRule<TypingMatch<S, D>>>,
    pub other: Option<BoxRule<StateMatch<S, D>>>,
}

impl<S: AppState, D> Default for ActivityRules<S, D> {
    fn default() -> Self {
        Self {
            messages: None,
            events: None,
            typing: None,
            other: None,
        }
    }
}

impl<S: AppState, D> ActivityRules<S, D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(mut self, rule: BoxRule<MessageMatch<S, D>>) -> Self {
        self.messages = Some(rule);
        self
    }

    pub fn events(mut self, rule: BoxRule<EventMatch<S, D>>) -> Self {
        self.events = Some(rule);
        self
    }

    pub fn typing(mut self, rule: BoxRule<TypingMatch<S, D>>) -> Self {
        self.typing = Some(rule);
        self
    }

    pub fn other(mut self, rule: BoxRule<StateMatch<S, D>>) -> Self {
        self.other = Some(rule);
        self
    }
}

/// Routes activities from a transport through a rule tree.
pub struct Dispatcher<S: AppState, D> {
    transport: Arc<dyn Transport>,
    enricher: ContextEnricher<S, D>,
    config: DispatcherConfig,
    hooks: Vec<Arc<dyn DispatchHook>>,
}

impl<S, D> Dispatcher<S, D>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    /// Create a dispatcher; `project` derives the `data` field of every match.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store<S>>,
        project: impl Fn(&S) -> D + Send + Sync + 'static,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            enricher: ContextEnricher::new(Arc::clone(&transport), store, project),
            transport,
            config,
            hooks: vec![Arc::new(TracingHook)],
        }
    }

    /// Register an additional observer.
    pub fn with_hook(mut self, hook: impl DispatchHook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    pub fn enricher(&self) -> &ContextEnricher<S, D> {
        &self.enricher
    }

    /// Compose the full rule tree: enrichment, then the first shape whose
    /// rule matches.
    pub fn build_rule(&self, rules: ActivityRules<S, D>) -> BoxRule<ActivityMatch> {
        let ActivityRules {
            messages,
            events,
            typing,
            other,
        } = rules;

        let shapes: Vec<BoxRule<StateMatch<S, D>>> = [
            messages.map(|rule| prepend(filters::messages::<S, D>(), rule)),
            events.map(|rule| prepend(filters::events::<S, D>(), rule)),
            typing.map(|rule| prepend(filters::typing::<S, D>(), rule)),
            other,
        ]
        .into_iter()
        .flatten()
        .collect();

        prepend(self.enricher.clone(), first(shapes))
    }

    /// Process activities until the stream ends.
    pub async fn run(&self, rules: ActivityRules<S, D>) -> Result<DispatchSummary, Error> {
        self.run_until(rules, std::future::pending::<()>()).await
    }

    /// Process activities until the stream ends or `shutdown` resolves.
    ///
    /// Shutdown is checked between activities: the activity in flight always
    /// finishes, nothing further is pulled.
    pub async fn run_until<F>(
        &self,
        rules: ActivityRules<S, D>,
        shutdown: F,
    ) -> Result<DispatchSummary, Error>
    where
        F: Future<Output = ()>,
    {
        let rule = self.build_rule(rules);
        let mut activities = self.transport.activities().await?;
        let mut summary = DispatchSummary::default();
        tokio::pin!(shutdown);

        info!(
            transport = self.transport.name(),
            error_policy = %self.config.error_policy,
            "Dispatcher ready and listening"
        );

        loop {
            let activity = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    self.emit(&DispatchEvent::Cancelled { summary });
                    break;
                }
                next = activities.next() => {
                    match next {
                        Some(activity) => activity,
                        None => {
                            self.emit(&DispatchEvent::Completed { summary });
                            break;
                        }
                    }
                }
            };

            let kind = activity.kind().to_string();
            summary.received += 1;
            self.emit(&DispatchEvent::Received {
                activity_id: activity.meta().id.clone(),
                kind: kind.clone(),
            });

            let m = ActivityMatch::new(activity);
            match rule.call_handler_if_match(&m).await {
                Ok(true) => {
                    summary.matched += 1;
                    self.emit(&DispatchEvent::Matched { kind });
                }
                Ok(false) => {
                    summary.unmatched += 1;
                    self.emit(&DispatchEvent::Unmatched { kind });
                }
                Err(e) => {
                    summary.errors += 1;
                    self.emit(&DispatchEvent::Errored {
                        kind,
                        error: e.to_string(),
                    });
                    if self.config.error_policy == ErrorPolicy::Halt {
                        return Err(e.into());
                    }
                }
            }
        }

        Ok(summary)
    }

    /// Run on a background task; the returned handle stops or awaits it.
    pub fn spawn(self, rules: ActivityRules<S, D>) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            let shutdown = async move {
                // A dropped handle detaches the dispatcher instead of stopping it.
                if shutdown_rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            self.run_until(rules, shutdown).await
        });

        DispatcherHandle {
            shutdown: Some(shutdown_tx),
            join,
        }
    }

    fn emit(&self, event: &DispatchEvent) {
        for hook in &self.hooks {
            hook.on_event(event);
        }
    }
}

/// Handle to a dispatcher running on a background task.
pub struct DispatcherHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<Result<DispatchSummary, Error>>,
}

impl DispatcherHandle {
    /// Stop pulling new activities and wait for the in-flight one to finish.
    pub async fn shutdown(mut self) -> Result<DispatchSummary, Error> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        Self::finish(self.join).await
    }

    /// Wait until the activity stream ends (or the dispatcher halts).
    pub async fn join(self) -> Result<DispatchSummary, Error> {
        let DispatcherHandle { shutdown, join } = self;
        let result = Self::finish(join).await;
        drop(shutdown);
        result
    }

    async fn finish(
        join: JoinHandle<Result<DispatchSummary, Error>>,
    ) -> Result<DispatchSummary, Error> {
        join.await
            .map_err(|e| Error::Dispatch(DispatchError::Aborted(e.to_string())))?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::activity::{Activity, ChannelAccount};
    use crate::channels::MemoryTransport;
    use crate::pipeline::rules::{Rule, run};
    use crate::store::{BotData, MemoryStore};

    fn dispatcher() -> (
        Dispatcher<BotData, BotData>,
        tokio::sync::mpsc::UnboundedSender<Activity>,
    ) {
        let (transport, tx) = MemoryTransport::new();
        let store = Arc::new(MemoryStore::<BotData>::default());
        let dispatcher = Dispatcher::<BotData, BotData>::new(
            transport,
            store,
            |s: &BotData| s.clone(),
            DispatcherConfig::default(),
        );
        (dispatcher, tx)
    }

    #[tokio::test]
    async fn empty_rule_set_matches_nothing() {
        let (dispatcher, _tx) = dispatcher();
        let rule = dispatcher.build_rule(ActivityRules::new());
        let m = ActivityMatch::new(Activity::message(ChannelAccount::new("u"), "c", "hi"));
        assert!(!rule.call_handler_if_match(&m).await.unwrap());
    }

    #[tokio::test]
    async fn messages_take_priority_over_catch_all() {
        let (dispatcher, _tx) = dispatcher();
        let hits: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let (on_message, on_other) = (Arc::clone(&hits), Arc::clone(&hits));

        let rules = ActivityRules::new()
            .messages(run(move |_m: MessageMatch<BotData, BotData>| {
                let hits = Arc::clone(&on_message);
                async move {
                    hits.lock().unwrap().push("message");
                    anyhow::Ok(())
                }
            }))
            .other(run(move |_m: StateMatch<BotData, BotData>| {
                let hits = Arc::clone(&on_other);
                async move {
                    hits.lock().unwrap().push("other");
                    anyhow::Ok(())
                }
            }));
        let rule = dispatcher.build_rule(rules);

        let m = ActivityMatch::new(Activity::message(ChannelAccount::new("u"), "c", "hi"));
        assert!(rule.call_handler_if_match(&m).await.unwrap());
        assert_eq!(*hits.lock().unwrap(), vec!["message"]);
    }

    #[tokio::test]
    async fn spawned_dispatcher_completes_when_stream_ends() {
        let (dispatcher, tx) = dispatcher();
        let events: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let sink = Arc::clone(&events);
        let handle = dispatcher
            .with_hook(move |e: &DispatchEvent| sink.lock().unwrap().push(e.label()))
            .spawn(ActivityRules::new());

        tx.send(Activity::message(ChannelAccount::new("u"), "c", "hi"))
            .unwrap();
        drop(tx);

        let summary = handle.join().await.unwrap();
        assert_eq!(summary.received, 1);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(*events.lock().unwrap(), vec!["received", "unmatched", "completed"]);
    }
}

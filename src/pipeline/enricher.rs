//! Context enricher: `ActivityMatch` → `StateMatch`.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};

use crate::channels::Transport;
use crate::pipeline::rules::Matcher;
use crate::pipeline::types::{ActivityMatch, Replier, StateMatch};
use crate::store::{AppState, Store};

/// Projection from the full state to the data the bot works with.
pub type Projection<S, D> = Arc<dyn Fn(&S) -> D + Send + Sync>;

/// Attaches address, reply functions and a state snapshot to an activity.
pub struct ContextEnricher<S: AppState, D> {
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store<S>>,
    project: Projection<S, D>,
}

impl<S: AppState, D> Clone for ContextEnricher<S, D> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            store: Arc::clone(&self.store),
            project: Arc::clone(&self.project),
        }
    }
}

impl<S, D> ContextEnricher<S, D>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn Store<S>>,
        project: impl Fn(&S) -> D + Send + Sync + 'static,
    ) -> Self {
        Self {
            transport,
            store,
            project: Arc::new(project),
        }
    }

    pub fn store(&self) -> &Arc<dyn Store<S>> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Build the enriched record. Reads the store exactly once.
    pub async fn enrich(&self, m: &ActivityMatch) -> StateMatch<S, D> {
        enrich(
            Arc::clone(&m.activity),
            Arc::clone(&self.transport),
            Arc::clone(&self.store),
            Arc::clone(&self.project),
        )
        .await
    }
}

async fn enrich<S, D>(
    activity: Arc<crate::activity::Activity>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn Store<S>>,
    project: Projection<S, D>,
) -> StateMatch<S, D>
where
    S: AppState,
{
    let address = activity.address();
    let state = store.get_state().await;
    let data = Arc::new(project(&state));

    StateMatch {
        activity,
        replier: Replier::new(address.clone(), transport),
        address,
        data,
        state,
        store,
    }
}

impl<S, D> Matcher<ActivityMatch, StateMatch<S, D>> for ContextEnricher<S, D>
where
    S: AppState,
    D: Send + Sync + 'static,
{
    fn matches(&self, input: &ActivityMatch) -> BoxStream<'static, StateMatch<S, D>> {
        let fut = enrich(
            Arc::clone(&input.activity),
            Arc::clone(&self.transport),
            Arc::clone(&self.store),
            Arc::clone(&self.project),
        );
        stream::once(fut).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Activity, ChannelAccount};
    use crate::channels::MemoryTransport;
    use crate::store::{Action, BotData, MemoryStore, Promptable};

    fn enricher() -> (ContextEnricher<BotData, Option<String>>, Arc<MemoryStore<BotData>>) {
        let (transport, _tx) = MemoryTransport::new();
        let store = Arc::new(MemoryStore::<BotData>::default());
        let enricher = ContextEnricher::<BotData, Option<String>>::new(
            transport,
            store.clone(),
            |s: &BotData| s.prompt_keys.get("c1").cloned(),
        );
        (enricher, store)
    }

    #[tokio::test]
    async fn enrich_attaches_address_state_and_projection() {
        let (enricher, store) = enricher();
        store
            .dispatch(Action::SetPromptKey {
                conversation_id: "c1".into(),
                prompt_key: Some("awaitingName".into()),
            })
            .await
            .unwrap();

        let m = ActivityMatch::new(Activity::message(ChannelAccount::new("alice"), "c1", "hi"));
        let enriched = enricher.enrich(&m).await;

        assert_eq!(enriched.address.conversation_id, "c1");
        assert_eq!(enriched.replier.address(), &enriched.address);
        assert_eq!(enriched.state.prompt_key("c1"), Some("awaitingName"));
        assert_eq!(enriched.data.as_deref(), Some("awaitingName"));
        assert!(Arc::ptr_eq(&enriched.activity, &m.activity));
    }

    #[tokio::test]
    async fn snapshot_is_not_affected_by_later_dispatches() {
        let (enricher, store) = enricher();
        let m = ActivityMatch::new(Activity::message(ChannelAccount::new("alice"), "c1", "hi"));
        let enriched = enricher.enrich(&m).await;

        store
            .dispatch(Action::SetPromptKey {
                conversation_id: "c1".into(),
                prompt_key: Some("later".into()),
            })
            .await
            .unwrap();

        assert_eq!(enriched.state.prompt_key("c1"), None);
        assert!(enriched.data.is_none());
    }

    #[tokio::test]
    async fn matcher_yields_exactly_one_record() {
        let (enricher, _store) = enricher();
        let m = ActivityMatch::new(Activity::message(ChannelAccount::new("alice"), "c1", "hi"));
        let records: Vec<_> = enricher.matches(&m).collect().await;
        assert_eq!(records.len(), 1);
    }
}

//! In-memory state container built on a `watch` channel.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{Action, AppState, Store};

/// Process-local [`Store`]; every dispatch publishes a fresh `Arc<S>`.
pub struct MemoryStore<S: AppState> {
    tx: watch::Sender<Arc<S>>,
}

impl<S: AppState> MemoryStore<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// Current snapshot without going through the async trait.
    pub fn snapshot(&self) -> Arc<S> {
        self.tx.borrow().clone()
    }
}

impl<S: AppState + Default> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

#[async_trait]
impl<S: AppState> Store<S> for MemoryStore<S> {
    async fn get_state(&self) -> Arc<S> {
        self.snapshot()
    }

    async fn dispatch(&self, action: Action<S::Action>) -> Result<(), StoreError> {
        action.validate()?;
        self.tx.send_modify(|current| {
            let mut next = S::clone(&**current);
            action.apply(&mut next);
            *current = Arc::new(next);
        });
        debug!(action = action.label(), "State updated");
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<Arc<S>> {
        self.tx.subscribe()
    }
}

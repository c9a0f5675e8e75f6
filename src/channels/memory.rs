//! In-process transport backed by an mpsc channel.
//!
//! Inbound activities are pushed through the sender returned by
//! [`MemoryTransport::new`]; everything the engine sends is recorded and can
//! be inspected with [`MemoryTransport::sent`]. Used for embedding the engine
//! behind another connector and for tests.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::activity::{Activity, Address, Content};
use crate::channels::{ActivityStream, Transport};
use crate::error::ChannelError;

/// One outbound operation recorded by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// `send` / `send_async` to an address.
    Send { address: Address, content: Content },
    /// `post_activity`.
    Post(Activity),
}

impl Outbound {
    /// Text of the outbound content, if it carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Send { content, .. } => content.text(),
            Self::Post(Activity::Message(m)) => Some(&m.text),
            Self::Post(_) => None,
        }
    }
}

pub struct MemoryTransport {
    /// Receiver side of the inbound channel, consumed once in `activities()`.
    inbound_rx: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Activity>>>,
    sent: Mutex<Vec<Outbound>>,
}

impl MemoryTransport {
    /// Create a transport and the sender that feeds its inbound stream.
    ///
    /// The stream ends once every clone of the sender is dropped.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<Activity>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            inbound_rx: tokio::sync::Mutex::new(Some(rx)),
            sent: Mutex::new(Vec::new()),
        });
        (transport, tx)
    }

    /// Snapshot of everything sent so far, in order.
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded outbound operations.
    pub fn take_sent(&self) -> Vec<Outbound> {
        std::mem::take(&mut *self.sent.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn record(&self, outbound: Outbound) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outbound);
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn activities(&self) -> Result<ActivityStream, ChannelError> {
        let rx = self
            .inbound_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| ChannelError::StreamConsumed {
                name: "memory".to_string(),
            })?;

        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    fn send(&self, address: &Address, content: Content) {
        self.record(Outbound::Send {
            address: address.clone(),
            content,
        });
    }

    async fn send_async(&self, address: &Address, content: Content) -> Result<(), ChannelError> {
        self.send(address, content);
        Ok(())
    }

    async fn post_activity(&self, activity: Activity) -> Result<(), ChannelError> {
        self.record(Outbound::Post(activity));
        Ok(())
    }
}

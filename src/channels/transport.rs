//! Transport trait shared by all activity sources/sinks.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::activity::{Activity, Address, Content};
use crate::error::ChannelError;

/// Lazy, unbounded stream of inbound activities.
pub type ActivityStream = Pin<Box<dyn Stream<Item = Activity> + Send>>;

/// Connector between the engine and a concrete messaging platform.
///
/// The engine never talks to the network itself: it pulls inbound
/// activities from [`Transport::activities`] and pushes outbound content
/// through the send methods.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (e.g. "cli", "memory").
    fn name(&self) -> &str;

    /// Take the inbound activity stream.
    ///
    /// The stream is not restartable: only the first call succeeds, later
    /// calls return [`ChannelError::StreamConsumed`].
    async fn activities(&self) -> Result<ActivityStream, ChannelError>;

    /// Fire-and-forget send to `address`.
    fn send(&self, address: &Address, content: Content);

    /// Send to `address` and wait until the transport accepted it.
    async fn send_async(&self, address: &Address, content: Content) -> Result<(), ChannelError>;

    /// Post a fully formed outbound activity (e.g. one carrying suggested actions).
    async fn post_activity(&self, activity: Activity) -> Result<(), ChannelError>;
}
